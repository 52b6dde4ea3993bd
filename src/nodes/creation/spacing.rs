//! Linear and geometric spacing nodes

use ndarray::Array1;

use super::{array_output, dtype_parameter};
use crate::constants::defaults;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
use crate::nodes::math_utils::linspace;

fn spacing_parameters(start: f64, stop: f64) -> Vec<ParameterDefinition> {
    vec![
        ParameterDefinition::new("Start", InterfaceParameter::float(start)).with_tooltip("First value"),
        ParameterDefinition::new("Stop", InterfaceParameter::float(stop)).with_tooltip("Last value"),
        ParameterDefinition::new(
            "Count",
            InterfaceParameter::integer(defaults::SAMPLE_COUNT, 1, defaults::MAX_COUNT),
        )
        .with_tooltip("Number of samples"),
        ParameterDefinition::new("Include Endpoint", InterfaceParameter::boolean(true))
            .with_tooltip("Whether the stop value is the last sample"),
        dtype_parameter(),
    ]
}

struct Spacing {
    start: f64,
    stop: f64,
    count: usize,
    endpoint: bool,
    dtype: DType,
}

impl Spacing {
    fn read(inputs: &NodeInputs) -> NodeResult<Self> {
        let count = inputs.integer("Count")?;
        if count <= 0 {
            return Err(NodeError::InvalidParameter {
                name: "Count".to_string(),
                reason: "count must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            start: inputs.float("Start")?,
            stop: inputs.float("Stop")?,
            count: count as usize,
            endpoint: inputs.boolean("Include Endpoint")?,
            dtype: inputs.choice("Data Type")?,
        })
    }
}

/// Evenly spaced samples over an interval
#[derive(Default)]
pub struct ArrayLinspaceFactory;

impl NodeFactory for ArrayLinspaceFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayLinspace",
            "Linspace Array",
            NodeCategory::creation(),
            "Creates evenly spaced samples over an interval",
        )
        .with_parameters(spacing_parameters(0.0, 10.0))
        .with_outputs(vec![array_output("The evenly spaced samples")])
        .with_tags(vec!["numpy", "creation", "linspace"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let s = Spacing::read(inputs)?;
            let values = linspace(s.start, s.stop, s.count, s.endpoint);
            Ok(vec![NumArray::new(Array1::from_vec(values).into_dyn(), s.dtype).into()])
        };
        run().context("Linspace array creation failed")
    }
}

/// Samples evenly spaced on a log scale
#[derive(Default)]
pub struct ArrayGeomspaceFactory;

impl NodeFactory for ArrayGeomspaceFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayGeomspace",
            "Geomspace Array",
            NodeCategory::creation(),
            "Creates samples evenly spaced on a geometric progression",
        )
        .with_parameters(spacing_parameters(1.0, 1000.0))
        .with_outputs(vec![array_output("The geometric progression")])
        .with_tags(vec!["numpy", "creation", "geomspace"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let s = Spacing::read(inputs)?;
            let values = geomspace(s.start, s.stop, s.count, s.endpoint)?;
            Ok(vec![NumArray::new(Array1::from_vec(values).into_dyn(), s.dtype).into()])
        };
        run().context("Geomspace array creation failed")
    }
}

/// Geometric progression between two non-zero values of the same sign
pub fn geomspace(start: f64, stop: f64, count: usize, endpoint: bool) -> NodeResult<Vec<f64>> {
    if start == 0.0 || stop == 0.0 {
        return Err(NodeError::InvalidParameter {
            name: "Start".to_string(),
            reason: "start and stop must both be non-zero".to_string(),
        });
    }
    if start.signum() != stop.signum() {
        return Err(NodeError::InvalidParameter {
            name: "Start".to_string(),
            reason: "start and stop must have the same sign".to_string(),
        });
    }

    let sign = start.signum();
    let exponents = linspace(start.abs().log10(), stop.abs().log10(), count, endpoint);
    let mut values: Vec<f64> = exponents.into_iter().map(|e| sign * 10f64.powf(e)).collect();

    // pin the ends so they match the inputs exactly
    if let Some(first) = values.first_mut() {
        *first = start;
    }
    if endpoint && count > 1 {
        values[count - 1] = stop;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::math_utils::approx_eq;

    fn inputs(start: f64, stop: f64, count: i64, endpoint: bool) -> NodeInputs {
        NodeInputs::new()
            .with("Start", NodeData::Float(start))
            .with("Stop", NodeData::Float(stop))
            .with("Count", NodeData::Integer(count))
            .with("Include Endpoint", NodeData::Boolean(endpoint))
            .with("Data Type", NodeData::String("float64".into()))
    }

    #[test]
    fn test_linspace_node() {
        let out = ArrayLinspaceFactory::process(&inputs(0.0, 10.0, 11, true)).unwrap();
        let array = out[0].as_array().unwrap();
        assert_eq!(array.len(), 11);
        assert_eq!(array.values[[5]], 5.0);
    }

    #[test]
    fn test_geomspace_values() {
        let values = geomspace(1.0, 1000.0, 4, true).unwrap();
        for (got, want) in values.iter().zip([1.0, 10.0, 100.0, 1000.0]) {
            assert!(approx_eq(*got, want));
        }
        let values = geomspace(-1.0, -100.0, 3, true).unwrap();
        assert!(approx_eq(values[1], -10.0));
        let values = geomspace(1.0, 100.0, 2, false).unwrap();
        assert!(approx_eq(values[1], 10.0));
    }

    #[test]
    fn test_geomspace_rejects_zero_and_sign_change() {
        assert!(geomspace(0.0, 10.0, 3, true).is_err());
        assert!(geomspace(-1.0, 10.0, 3, true).is_err());
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(ArrayLinspaceFactory::process(&inputs(0.0, 1.0, 0, true)).is_err());
    }
}
