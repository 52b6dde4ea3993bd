//! Single-array elementwise nodes

use super::{error_mode_parameter, result_output};
use crate::errstate::{ErrStateGuard, ErrorMode};
use crate::error::{NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::NodeInputs;
use crate::nodes::math_utils::map_unary;

fn unary_metadata(node_type: &'static str, display_name: &'static str, description: &'static str) -> NodeMetadata {
    NodeMetadata::new(node_type, display_name, NodeCategory::arithmetic(), description)
        .with_inputs(vec![PortDefinition::required("Array", DataType::Array).with_description("Input array")])
        .with_outputs(vec![result_output(description)])
        .with_tags(vec!["numpy", "arithmetic", "elementwise"])
}

/// `keep_dtype` keeps the input dtype; transcendental results are always float64
fn apply(inputs: &NodeInputs, keep_dtype: bool, op: fn(f64) -> f64) -> NodeResult<Vec<NodeData>> {
    let array = inputs.array("Array")?;
    let values = map_unary(&array.values, op)?;
    let dtype = if keep_dtype { array.dtype } else { DType::Float64 };
    Ok(vec![NumArray::new(values, dtype).into()])
}

#[derive(Default)]
pub struct ArrayAbsFactory;

impl NodeFactory for ArrayAbsFactory {
    fn metadata() -> NodeMetadata {
        unary_metadata("ArrayAbs", "Absolute Value", "Absolute value of each element")
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        apply(inputs, true, f64::abs).context("Absolute value failed")
    }
}

/// Square root; negative inputs produce NaN handled per the selected mode
#[derive(Default)]
pub struct ArraySqrtFactory;

impl NodeFactory for ArraySqrtFactory {
    fn metadata() -> NodeMetadata {
        unary_metadata("ArraySqrt", "Square Root", "Square root of each element").with_parameters(vec![
            error_mode_parameter("Negative Values", "What to do when taking the root of a negative number"),
        ])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let mode: ErrorMode = inputs.choice("Negative Values")?;
            let _errstate = ErrStateGuard::modify(|s| s.with_invalid(mode));
            apply(inputs, false, f64::sqrt)
        };
        run().context("Square root failed")
    }
}

#[derive(Default)]
pub struct ArraySinFactory;

impl NodeFactory for ArraySinFactory {
    fn metadata() -> NodeMetadata {
        unary_metadata("ArraySin", "Sine", "Sine of each element, in radians")
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        apply(inputs, false, f64::sin).context("Sine failed")
    }
}

#[derive(Default)]
pub struct ArrayCosFactory;

impl NodeFactory for ArrayCosFactory {
    fn metadata() -> NodeMetadata {
        unary_metadata("ArrayCos", "Cosine", "Cosine of each element, in radians")
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        apply(inputs, false, f64::cos).context("Cosine failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::nodes::math_utils::approx_eq;

    fn array(values: Vec<f64>) -> NodeInputs {
        NodeInputs::new().with("Array", NumArray::from_vec(values))
    }

    fn first(out: &[NodeData]) -> &NumArray {
        out[0].as_array().unwrap()
    }

    #[test]
    fn test_abs_keeps_dtype() {
        let inputs = NodeInputs::new().with("Array", NumArray::from_vec(vec![-2.0, 3.0]).cast(DType::Int16));
        let out = ArrayAbsFactory::process(&inputs).unwrap();
        assert_eq!(first(&out).dtype, DType::Int16);
        assert_eq!(first(&out).values.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_sqrt_negative_modes() {
        let ignore = array(vec![4.0, -1.0]).with("Negative Values", NodeData::String("ignore".into()));
        let out = ArraySqrtFactory::process(&ignore).unwrap();
        assert_eq!(first(&out).values[[0]], 2.0);
        assert!(first(&out).values[[1]].is_nan());

        let raise = array(vec![-1.0]).with("Negative Values", NodeData::String("raise".into()));
        let err = ArraySqrtFactory::process(&raise).unwrap_err();
        assert!(matches!(err.root(), NodeError::FloatingPoint(_)));
    }

    #[test]
    fn test_trig() {
        let inputs = array(vec![0.0, std::f64::consts::FRAC_PI_2]);
        let sin = ArraySinFactory::process(&inputs).unwrap();
        let cos = ArrayCosFactory::process(&inputs).unwrap();
        assert!(approx_eq(first(&sin).values[[1]], 1.0));
        assert!(approx_eq(first(&cos).values[[0]], 1.0));
        assert_eq!(first(&cos).dtype, DType::Float64);
    }

    #[test]
    fn test_missing_input() {
        let err = ArrayAbsFactory::process(&NodeInputs::new()).unwrap_err();
        assert!(matches!(err.root(), NodeError::MissingInput(_)));
    }
}
