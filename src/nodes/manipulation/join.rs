//! Concatenate, stack and split nodes

use ndarray::{ArrayView, Axis, IxDyn, Slice};

use super::array_input;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::creation::array_output;
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
use crate::nodes::math_utils::normalize_axis;

/// Upper bound on split sections
const MAX_SECTIONS: i64 = 100;

/// Parts exposed as output ports by the split node
const SPLIT_OUTPUTS: usize = 4;

fn joined_inputs() -> Vec<PortDefinition> {
    vec![
        PortDefinition::required("A", DataType::Array).with_description("First array"),
        PortDefinition::required("B", DataType::Array).with_description("Second array"),
        PortDefinition::optional("C", DataType::Array).with_description("Third array"),
        PortDefinition::optional("D", DataType::Array).with_description("Fourth array"),
    ]
}

fn axis_parameter(tooltip: &str) -> ParameterDefinition {
    ParameterDefinition::new("Axis", InterfaceParameter::integer(0, -10, 10)).with_tooltip(tooltip)
}

/// A and B followed by whichever of C and D are connected
fn collect_arrays(inputs: &NodeInputs) -> NodeResult<Vec<&NumArray>> {
    let mut arrays = vec![inputs.array("A")?, inputs.array("B")?];
    for name in ["C", "D"] {
        if let Some(array) = inputs.optional_array(name)? {
            arrays.push(array);
        }
    }
    Ok(arrays)
}

fn common_dtype(arrays: &[&NumArray]) -> DType {
    arrays
        .iter()
        .skip(1)
        .fold(arrays[0].dtype, |dtype, array| DType::promote(dtype, array.dtype))
}

#[derive(Default)]
pub struct ArrayConcatenateFactory;

impl NodeFactory for ArrayConcatenateFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayConcatenate",
            "Concatenate",
            NodeCategory::manipulation(),
            "Joins arrays along an existing axis",
        )
        .with_inputs(joined_inputs())
        .with_parameters(vec![axis_parameter("Axis to join along, 0 is the first")])
        .with_outputs(vec![array_output("The joined array")])
        .with_tags(vec!["numpy", "manipulation", "join"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let arrays = collect_arrays(inputs)?;
            let ndim = arrays[0].ndim();
            if ndim == 0 {
                return Err(NodeError::InvalidShape(
                    "zero-dimensional arrays cannot be concatenated".to_string(),
                ));
            }
            if let Some(other) = arrays.iter().find(|a| a.ndim() != ndim) {
                return Err(NodeError::ShapeMismatch(format!(
                    "all the input arrays must have same number of dimensions, got {} and {}",
                    ndim,
                    other.ndim()
                )));
            }
            let axis = normalize_axis(inputs.integer("Axis")?, ndim)?;
            let views: Vec<ArrayView<f64, IxDyn>> = arrays.iter().map(|a| a.values.view()).collect();
            let values = ndarray::concatenate(Axis(axis), &views)
                .map_err(|e| NodeError::ShapeMismatch(format!("shapes don't line up along axis {}: {}", axis, e)))?;
            Ok(vec![NumArray::new(values, common_dtype(&arrays)).into()])
        };
        run().context("Concatenate failed")
    }
}

#[derive(Default)]
pub struct ArrayStackFactory;

impl NodeFactory for ArrayStackFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayStack",
            "Stack",
            NodeCategory::manipulation(),
            "Joins same-shaped arrays along a new axis",
        )
        .with_inputs(joined_inputs())
        .with_parameters(vec![axis_parameter("Position of the new axis in the result")])
        .with_outputs(vec![array_output("The stacked array")])
        .with_tags(vec!["numpy", "manipulation", "join"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let arrays = collect_arrays(inputs)?;
            if let Some(other) = arrays.iter().find(|a| a.shape() != arrays[0].shape()) {
                return Err(NodeError::ShapeMismatch(format!(
                    "all input arrays must have the same shape, got {:?} and {:?}",
                    arrays[0].shape(),
                    other.shape()
                )));
            }
            let axis = normalize_axis(inputs.integer("Axis")?, arrays[0].ndim() + 1)?;
            let views: Vec<ArrayView<f64, IxDyn>> = arrays.iter().map(|a| a.values.view()).collect();
            let values = ndarray::stack(Axis(axis), &views).map_err(|e| NodeError::ShapeMismatch(e.to_string()))?;
            Ok(vec![NumArray::new(values, common_dtype(&arrays)).into()])
        };
        run().context("Stack failed")
    }
}

/// Boundaries of `sections` near-equal parts of `len`; the first
/// `len % sections` parts hold one extra element.
pub fn split_bounds(len: usize, sections: usize) -> Vec<(usize, usize)> {
    let base = len / sections;
    let extra = len % sections;
    let mut start = 0;
    (0..sections)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let bounds = (start, start + size);
            start += size;
            bounds
        })
        .collect()
}

#[derive(Default)]
pub struct ArraySplitFactory;

impl NodeFactory for ArraySplitFactory {
    fn metadata() -> NodeMetadata {
        let mut outputs: Vec<PortDefinition> = (1..=SPLIT_OUTPUTS)
            .map(|i| PortDefinition::optional(&format!("Part {}", i), DataType::Array))
            .collect();
        outputs[0] = outputs[0].clone().with_description("First part");
        outputs[SPLIT_OUTPUTS - 1] = outputs[SPLIT_OUTPUTS - 1]
            .clone()
            .with_description("Fourth part, None when there are fewer sections");

        NodeMetadata::new(
            "ArraySplit",
            "Split",
            NodeCategory::manipulation(),
            "Splits an array into near-equal parts along an axis",
        )
        .with_inputs(vec![array_input()])
        .with_parameters(vec![
            ParameterDefinition::new("Sections", InterfaceParameter::integer(2, 2, MAX_SECTIONS))
                .with_tooltip("Number of parts to split into"),
            axis_parameter("Axis to split along, 0 is the first"),
        ])
        .with_outputs(outputs)
        .with_tags(vec!["numpy", "manipulation", "split"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let sections = inputs.integer("Sections")?;
            if sections < 1 {
                return Err(NodeError::InvalidParameter {
                    name: "Sections".to_string(),
                    reason: "number sections must be larger than 0".to_string(),
                });
            }
            if array.ndim() == 0 {
                return Err(NodeError::InvalidShape("cannot split a zero-dimensional array".to_string()));
            }
            let axis = normalize_axis(inputs.integer("Axis")?, array.ndim())?;

            let mut parts: Vec<NodeData> = split_bounds(array.shape()[axis], sections as usize)
                .into_iter()
                .take(SPLIT_OUTPUTS)
                .map(|(start, end)| {
                    let part = array.values.slice_axis(Axis(axis), Slice::from(start..end)).to_owned();
                    NumArray::new(part, array.dtype).into()
                })
                .collect();
            parts.resize(SPLIT_OUTPUTS, NodeData::None);
            Ok(parts)
        };
        run().context("Split failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: NumArray, b: NumArray, axis: i64) -> NodeInputs {
        NodeInputs::new()
            .with("A", a)
            .with("B", b)
            .with("Axis", NodeData::Integer(axis))
    }

    fn matrix(values: Vec<f64>) -> NumArray {
        NumArray::from_shape_vec(&[2, 2], values).unwrap()
    }

    #[test]
    fn test_concatenate_axes() {
        let a = matrix(vec![1.0, 2.0, 3.0, 4.0]);
        let b = matrix(vec![5.0, 6.0, 7.0, 8.0]);
        let out = ArrayConcatenateFactory::process(&pair(a.clone(), b.clone(), 0)).unwrap();
        assert_eq!(out[0].as_array().unwrap().shape(), &[4, 2]);

        let out = ArrayConcatenateFactory::process(&pair(a, b, -1)).unwrap();
        let joined = out[0].as_array().unwrap();
        assert_eq!(joined.shape(), &[2, 4]);
        assert_eq!(joined.values[[1, 2]], 7.0);
    }

    #[test]
    fn test_concatenate_optional_inputs() {
        let inputs = pair(NumArray::from_vec(vec![1.0]), NumArray::from_vec(vec![2.0]), 0)
            .with("C", NumArray::from_vec(vec![3.0]))
            .with("D", NodeData::None);
        let out = ArrayConcatenateFactory::process(&inputs).unwrap();
        assert_eq!(out[0].as_array().unwrap().values.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_concatenate_mismatch() {
        let inputs = pair(matrix(vec![0.0; 4]), NumArray::from_vec(vec![1.0, 2.0, 3.0]), 0);
        assert!(ArrayConcatenateFactory::process(&inputs).is_err());
        let inputs = pair(matrix(vec![0.0; 4]), NumArray::from_shape_vec(&[1, 3], vec![0.0; 3]).unwrap(), 0);
        assert!(ArrayConcatenateFactory::process(&inputs).is_err());
    }

    #[test]
    fn test_stack_new_axis() {
        let a = NumArray::from_vec(vec![1.0, 2.0, 3.0]);
        let b = NumArray::from_vec(vec![4.0, 5.0, 6.0]).cast(DType::Int32);
        let out = ArrayStackFactory::process(&pair(a.clone(), b.clone(), 0)).unwrap();
        let stacked = out[0].as_array().unwrap();
        assert_eq!(stacked.shape(), &[2, 3]);
        assert_eq!(stacked.dtype, DType::Float64);

        let out = ArrayStackFactory::process(&pair(a, b, -1)).unwrap();
        assert_eq!(out[0].as_array().unwrap().shape(), &[3, 2]);
    }

    #[test]
    fn test_split_bounds_uneven() {
        assert_eq!(split_bounds(7, 3), vec![(0, 3), (3, 5), (5, 7)]);
        assert_eq!(split_bounds(2, 4), vec![(0, 1), (1, 2), (2, 2), (2, 2)]);
    }

    #[test]
    fn test_split_fills_missing_parts() {
        let inputs = NodeInputs::new()
            .with("Array", NumArray::from_vec((0..5).map(f64::from).collect()))
            .with("Sections", NodeData::Integer(2))
            .with("Axis", NodeData::Integer(0));
        let out = ArraySplitFactory::process(&inputs).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].as_array().unwrap().values.iter().copied().collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);
        assert_eq!(out[1].as_array().unwrap().len(), 2);
        assert_eq!(out[2], NodeData::None);
        assert_eq!(out[3], NodeData::None);
    }

    #[test]
    fn test_split_along_columns() {
        let inputs = NodeInputs::new()
            .with("Array", NumArray::from_shape_vec(&[2, 4], (0..8).map(f64::from).collect()).unwrap())
            .with("Sections", NodeData::Integer(4))
            .with("Axis", NodeData::Integer(1));
        let out = ArraySplitFactory::process(&inputs).unwrap();
        let last = out[3].as_array().unwrap();
        assert_eq!(last.shape(), &[2, 1]);
        assert_eq!(last.values[[1, 0]], 7.0);
    }
}
