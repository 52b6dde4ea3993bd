//! Two-array elementwise nodes with numpy-style broadcasting

use super::{error_mode_parameter, result_output};
use crate::errstate::{ErrStateGuard, ErrorMode};
use crate::error::{NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::NodeInputs;
use crate::nodes::math_utils::broadcast_binary;

fn binary_metadata(
    node_type: &'static str,
    display_name: &'static str,
    description: &'static str,
    result: &str,
) -> NodeMetadata {
    NodeMetadata::new(node_type, display_name, NodeCategory::arithmetic(), description)
        .with_inputs(vec![
            PortDefinition::required("A", DataType::Array).with_description("First operand"),
            PortDefinition::required("B", DataType::Array).with_description("Second operand"),
        ])
        .with_outputs(vec![result_output(result)])
        .with_tags(vec!["numpy", "arithmetic", "elementwise"])
}

/// Combine the `A` and `B` ports; the result dtype is the promoted one
/// unless `dtype` forces another.
fn combine(
    inputs: &NodeInputs,
    division: bool,
    dtype: Option<DType>,
    op: impl Fn(f64, f64) -> f64,
) -> NodeResult<Vec<NodeData>> {
    let a = inputs.array("A")?;
    let b = inputs.array("B")?;
    let values = broadcast_binary(&a.values, &b.values, division, op)?;
    let dtype = dtype.unwrap_or_else(|| DType::promote(a.dtype, b.dtype));
    Ok(vec![NumArray::new(values, dtype).into()])
}

#[derive(Default)]
pub struct ArrayAddFactory;

impl NodeFactory for ArrayAddFactory {
    fn metadata() -> NodeMetadata {
        binary_metadata("ArrayAdd", "Array Add", "Adds two arrays elementwise", "A + B")
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        combine(inputs, false, None, |x, y| x + y).context("Array addition failed")
    }
}

#[derive(Default)]
pub struct ArraySubtractFactory;

impl NodeFactory for ArraySubtractFactory {
    fn metadata() -> NodeMetadata {
        binary_metadata("ArraySubtract", "Array Subtract", "Subtracts two arrays elementwise", "A - B")
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        combine(inputs, false, None, |x, y| x - y).context("Array subtraction failed")
    }
}

#[derive(Default)]
pub struct ArrayMultiplyFactory;

impl NodeFactory for ArrayMultiplyFactory {
    fn metadata() -> NodeMetadata {
        binary_metadata("ArrayMultiply", "Array Multiply", "Multiplies two arrays elementwise", "A * B")
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        combine(inputs, false, None, |x, y| x * y).context("Array multiplication failed")
    }
}

#[derive(Default)]
pub struct ArrayPowerFactory;

impl NodeFactory for ArrayPowerFactory {
    fn metadata() -> NodeMetadata {
        binary_metadata(
            "ArrayPower",
            "Array Power",
            "Raises A to the power B elementwise",
            "A ** B",
        )
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        combine(inputs, false, None, f64::powf).context("Array power failed")
    }
}

/// True division; zero divisors are handled per the selected mode
#[derive(Default)]
pub struct ArrayDivideFactory;

impl NodeFactory for ArrayDivideFactory {
    fn metadata() -> NodeMetadata {
        binary_metadata("ArrayDivide", "Array Divide", "Divides two arrays elementwise", "A / B")
            .with_parameters(vec![error_mode_parameter(
                "Zero Division",
                "What to do when dividing by zero",
            )])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let mode: ErrorMode = inputs.choice("Zero Division")?;
            let _errstate = ErrStateGuard::modify(|s| s.with_divide(mode).with_invalid(mode));
            combine(inputs, true, Some(DType::Float64), |x, y| x / y)
        };
        run().context("Array division failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errstate;
    use crate::error::NodeError;

    fn pair(a: Vec<f64>, b: Vec<f64>) -> NodeInputs {
        NodeInputs::new()
            .with("A", NumArray::from_vec(a))
            .with("B", NumArray::from_vec(b))
    }

    fn values(out: &[NodeData]) -> Vec<f64> {
        out[0].as_array().unwrap().values.iter().copied().collect()
    }

    #[test]
    fn test_add_and_subtract() {
        let inputs = pair(vec![1.0, 2.0], vec![10.0, 20.0]);
        assert_eq!(values(&ArrayAddFactory::process(&inputs).unwrap()), vec![11.0, 22.0]);
        assert_eq!(values(&ArraySubtractFactory::process(&inputs).unwrap()), vec![-9.0, -18.0]);
    }

    #[test]
    fn test_broadcast_with_scalar_array() {
        let inputs = NodeInputs::new()
            .with("A", NumArray::from_shape_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap())
            .with("B", NumArray::scalar(2.0));
        let out = ArrayMultiplyFactory::process(&inputs).unwrap();
        assert_eq!(out[0].as_array().unwrap().shape(), &[2, 2]);
        assert_eq!(values(&out), vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = ArrayAddFactory::process(&pair(vec![1.0, 2.0], vec![1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err.root(), NodeError::ShapeMismatch(_)));
    }

    #[test]
    fn test_integer_dtypes_are_kept() {
        let inputs = NodeInputs::new()
            .with("A", NumArray::from_vec(vec![3.0]).cast(DType::Int32))
            .with("B", NumArray::from_vec(vec![2.0]).cast(DType::Int32));
        let out = ArrayPowerFactory::process(&inputs).unwrap();
        assert_eq!(out[0].as_array().unwrap().dtype, DType::Int32);
        assert_eq!(values(&out), vec![9.0]);
    }

    #[test]
    fn test_divide_modes() {
        let inputs = pair(vec![1.0, 0.0, 4.0], vec![0.0, 0.0, 2.0]);

        let ignore = inputs.clone().with("Zero Division", NodeData::String("ignore".into()));
        let out = values(&ArrayDivideFactory::process(&ignore).unwrap());
        assert!(out[0].is_infinite());
        assert!(out[1].is_nan());
        assert_eq!(out[2], 2.0);

        let warn = inputs.clone().with("Zero Division", NodeData::String("warn".into()));
        assert!(ArrayDivideFactory::process(&warn).is_ok());

        let raise = inputs.with("Zero Division", NodeData::String("raise".into()));
        let err = ArrayDivideFactory::process(&raise).unwrap_err();
        assert!(matches!(err.root(), NodeError::FloatingPoint(_)));
    }

    #[test]
    fn test_divide_restores_settings() {
        let before = errstate::current();
        let raise = pair(vec![1.0], vec![0.0]).with("Zero Division", NodeData::String("raise".into()));
        assert!(ArrayDivideFactory::process(&raise).is_err());
        assert_eq!(errstate::current(), before);
    }
}
