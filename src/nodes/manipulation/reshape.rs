//! Reshape, flatten and transpose nodes

use ndarray::{Array1, ArrayD, IxDyn};

use super::{array_input, normalize_axes};
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::creation::array_output;
use crate::nodes::data::{NodeData, NumArray};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

#[derive(Default)]
pub struct ArrayReshapeFactory;

impl NodeFactory for ArrayReshapeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayReshape",
            "Reshape",
            NodeCategory::manipulation(),
            "Gives an array a new shape without changing its data",
        )
        .with_inputs(vec![array_input()])
        .with_parameters(vec![ParameterDefinition::new("New Shape", InterfaceParameter::shape("(-1,)"))
            .with_tooltip("Target shape, one dimension may be -1 to infer it, e.g. (2, -1)")])
        .with_outputs(vec![array_output("The reshaped array")])
        .with_tags(vec!["numpy", "manipulation", "reshape"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let target = inputs.shape("New Shape")?;
            let dims = target.resolve_reshape(array.len())?;
            let values = ArrayD::from_shape_vec(IxDyn(&dims), array.values.iter().copied().collect())
                .map_err(|e| NodeError::ShapeMismatch(e.to_string()))?;
            Ok(vec![NumArray::new(values, array.dtype).into()])
        };
        run().context("Reshape failed")
    }
}

#[derive(Default)]
pub struct ArrayFlattenFactory;

impl NodeFactory for ArrayFlattenFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayFlatten",
            "Flatten",
            NodeCategory::manipulation(),
            "Collapses an array into one dimension in row-major order",
        )
        .with_inputs(vec![array_input()])
        .with_outputs(vec![array_output("The flattened array")])
        .with_tags(vec!["numpy", "manipulation", "reshape"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let array = inputs.array("Array").context("Flatten failed")?;
        let flat = Array1::from_iter(array.values.iter().copied()).into_dyn();
        Ok(vec![NumArray::new(flat, array.dtype).into()])
    }
}

#[derive(Default)]
pub struct ArrayTransposeFactory;

impl NodeFactory for ArrayTransposeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayTranspose",
            "Transpose",
            NodeCategory::manipulation(),
            "Permutes the axes of an array",
        )
        .with_inputs(vec![array_input()])
        .with_parameters(vec![ParameterDefinition::new("Axes", InterfaceParameter::text(""))
            .with_tooltip("New axis order such as (1, 0, 2); empty reverses the axes")])
        .with_outputs(vec![array_output("The transposed array")])
        .with_tags(vec!["numpy", "manipulation", "transpose"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let values = match inputs.axes("Axes")? {
                None => array.values.t().as_standard_layout().into_owned(),
                Some(axes) => transpose(&array.values, &axes)?,
            };
            Ok(vec![NumArray::new(values, array.dtype).into()])
        };
        run().context("Transpose failed")
    }
}

/// Permute `values` by `axes`, which must name every axis exactly once
pub fn transpose(values: &ArrayD<f64>, axes: &[i64]) -> NodeResult<ArrayD<f64>> {
    if axes.len() != values.ndim() {
        return Err(NodeError::InvalidParameter {
            name: "Axes".to_string(),
            reason: format!("axes don't match array: got {} axes for {} dimensions", axes.len(), values.ndim()),
        });
    }
    let permutation = normalize_axes(axes, values.ndim())?;
    Ok(values
        .view()
        .permuted_axes(IxDyn(&permutation))
        .as_standard_layout()
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> NumArray {
        NumArray::from_shape_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap()
    }

    fn first(out: Vec<NodeData>) -> NumArray {
        out[0].as_array().cloned().unwrap()
    }

    #[test]
    fn test_reshape_infers_dimension() {
        let inputs = NodeInputs::new()
            .with("Array", matrix())
            .with("New Shape", NodeData::String("(3, -1)".into()));
        let out = first(ArrayReshapeFactory::process(&inputs).unwrap());
        assert_eq!(out.shape(), &[3, 2]);
        assert_eq!(out.values[[2, 1]], 6.0);
    }

    #[test]
    fn test_reshape_size_mismatch() {
        let inputs = NodeInputs::new()
            .with("Array", matrix())
            .with("New Shape", NodeData::String("(4,)".into()));
        let err = ArrayReshapeFactory::process(&inputs).unwrap_err();
        assert!(matches!(err.root(), NodeError::ShapeMismatch(_)));
    }

    #[test]
    fn test_flatten_row_major() {
        let transposed = NumArray::new(matrix().values.t().to_owned(), matrix().dtype);
        let out = first(ArrayFlattenFactory::process(&NodeInputs::new().with("Array", transposed)).unwrap());
        assert_eq!(out.values.iter().copied().collect::<Vec<_>>(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_default_and_explicit() {
        let inputs = NodeInputs::new()
            .with("Array", matrix())
            .with("Axes", NodeData::String(String::new()));
        let out = first(ArrayTransposeFactory::process(&inputs).unwrap());
        assert_eq!(out.shape(), &[3, 2]);
        assert_eq!(out.values[[2, 0]], 3.0);

        let cube = NumArray::from_shape_vec(&[1, 2, 3], (0..6).map(f64::from).collect()).unwrap();
        let permuted = transpose(&cube.values, &[2, 0, -2]).unwrap();
        assert_eq!(permuted.shape(), &[3, 1, 2]);
        assert_eq!(permuted[[2, 0, 1]], 5.0);
    }

    #[test]
    fn test_transpose_rejects_bad_axes() {
        let values = matrix().values;
        assert!(transpose(&values, &[0]).is_err());
        assert!(transpose(&values, &[0, 0]).is_err());
        assert!(transpose(&values, &[0, 2]).is_err());
    }
}
