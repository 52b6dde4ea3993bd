//! Evenly stepped range node

use log::warn;
use ndarray::Array1;

use super::{array_output, dtype_parameter};
use crate::constants::limits;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

/// Values from start (inclusive) to stop (exclusive) in fixed steps
#[derive(Default)]
pub struct ArrayArangeFactory;

impl NodeFactory for ArrayArangeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayArange",
            "Arange Array",
            NodeCategory::creation(),
            "Creates evenly stepped values within a half-open interval",
        )
        .with_parameters(vec![
            ParameterDefinition::new("Start", InterfaceParameter::float(0.0)).with_tooltip("First value"),
            ParameterDefinition::new("Stop", InterfaceParameter::float(10.0))
                .with_tooltip("End of the interval, not included"),
            ParameterDefinition::new("Step", InterfaceParameter::float(1.0)).with_tooltip("Spacing between values"),
            dtype_parameter(),
        ])
        .with_outputs(vec![array_output("The stepped values")])
        .with_tags(vec!["numpy", "creation", "range"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let start = inputs.float("Start")?;
            let stop = inputs.float("Stop")?;
            let step = inputs.float("Step")?;
            let dtype: DType = inputs.choice("Data Type")?;
            Ok(vec![arange(start, stop, step, dtype)?.into()])
        };
        run().context("Arange array creation failed")
    }
}

pub fn arange(start: f64, stop: f64, step: f64, dtype: DType) -> NodeResult<NumArray> {
    if !(step.is_finite() && step > 0.0) {
        return Err(NodeError::InvalidParameter {
            name: "Step".to_string(),
            reason: "step must be greater than 0".to_string(),
        });
    }
    if start >= stop {
        warn!("Arange start ({}) >= stop ({}), returning an empty array", start, stop);
        return Ok(NumArray::new(Array1::zeros(0).into_dyn(), dtype));
    }

    let span = ((stop - start) / step).ceil();
    if !span.is_finite() || span > limits::MAX_ELEMENTS as f64 {
        return Err(NodeError::InvalidParameter {
            name: "Step".to_string(),
            reason: format!(
                "range [{}, {}) in steps of {} has more than {} elements",
                start,
                stop,
                step,
                limits::MAX_ELEMENTS
            ),
        });
    }
    let count = span as usize;
    let values = (0..count).map(|i| start + step * i as f64).collect();
    Ok(NumArray::new(Array1::from_vec(values).into_dyn(), dtype))
}
