//! Ones and zeros array nodes

use super::{array_output, dtype_parameter, filled, shape_parameter};
use crate::constants::defaults;
use crate::error::{NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::NodeInputs;

/// Creates an array of ones with the requested shape and data type
#[derive(Default)]
pub struct ArrayOnesFactory;

impl NodeFactory for ArrayOnesFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayOnes",
            "Ones Array",
            NodeCategory::creation(),
            "Creates an array of ones with the given shape and data type",
        )
        .with_parameters(vec![shape_parameter(defaults::SHAPE), dtype_parameter()])
        .with_outputs(vec![array_output("The created array of ones")])
        .with_tags(vec!["numpy", "creation", "ones"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        constant(inputs, 1.0).context("Ones array creation failed")
    }
}

/// Creates an array of zeros with the requested shape and data type
#[derive(Default)]
pub struct ArrayZerosFactory;

impl NodeFactory for ArrayZerosFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayZeros",
            "Zeros Array",
            NodeCategory::creation(),
            "Creates an array of zeros with the given shape and data type",
        )
        .with_parameters(vec![shape_parameter(defaults::SHAPE), dtype_parameter()])
        .with_outputs(vec![array_output("The created array of zeros")])
        .with_tags(vec!["numpy", "creation", "zeros"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        constant(inputs, 0.0).context("Zeros array creation failed")
    }
}

fn constant(inputs: &NodeInputs, value: f64) -> NodeResult<Vec<NodeData>> {
    let shape = inputs.shape("Shape")?;
    let dtype: DType = inputs.choice("Data Type")?;
    Ok(vec![filled(&shape, value, dtype)?.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;

    fn inputs(shape: &str, dtype: &str) -> NodeInputs {
        NodeInputs::new()
            .with("Shape", NodeData::String(shape.into()))
            .with("Data Type", NodeData::String(dtype.into()))
    }

    #[test]
    fn test_ones_metadata() {
        let metadata = ArrayOnesFactory::metadata();
        assert_eq!(metadata.node_type, "ArrayOnes");
        assert_eq!(metadata.parameters.len(), 2);
        assert_eq!(metadata.outputs.len(), 1);
    }

    #[test]
    fn test_ones_shapes() {
        let out = ArrayOnesFactory::process(&inputs("(2, 3)", "int32")).unwrap();
        let array = out[0].as_array().unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array.dtype, DType::Int32);
        assert!(array.values.iter().all(|&v| v == 1.0));

        let out = ArrayOnesFactory::process(&inputs("10", "float64")).unwrap();
        assert_eq!(out[0].as_array().unwrap().shape(), &[10]);

        let out = ArrayOnesFactory::process(&inputs("()", "float64")).unwrap();
        let scalar = out[0].as_array().unwrap();
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar.len(), 1);
    }

    #[test]
    fn test_zeros() {
        let out = ArrayZerosFactory::process(&inputs("(4,)", "bool")).unwrap();
        let array = out[0].as_array().unwrap();
        assert_eq!(array.shape(), &[4]);
        assert!(array.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bad_shape_is_reported_with_context() {
        let err = ArrayOnesFactory::process(&inputs("(1,a)", "float64")).unwrap_err();
        assert!(err.to_string().starts_with("Ones array creation failed"));
        assert!(matches!(err.root(), NodeError::Shape(_)));
    }

    #[test]
    fn test_negative_extent_rejected_by_constructor() {
        let err = ArrayOnesFactory::process(&inputs("(2, -3)", "float64")).unwrap_err();
        assert!(matches!(err.root(), NodeError::InvalidShape(_)));
    }
}
