//! Sum and maximum reductions

use ndarray::{ArrayD, Axis};

use super::{array_input, normalize_axes};
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::arithmetic::result_output;
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

fn reduction_parameters(verb: &str) -> Vec<ParameterDefinition> {
    vec![
        ParameterDefinition::new("Axis", InterfaceParameter::text(""))
            .with_tooltip(&format!("Axes to {} over, e.g. 0 or (0, 1); empty uses every element", verb)),
        ParameterDefinition::new("Keep Dims", InterfaceParameter::boolean(false))
            .with_tooltip("Keep reduced axes as length-one dimensions"),
    ]
}

/// Fold `values` over `axes` (every axis when `None`).
///
/// `keepdims` re-inserts each reduced axis with length one.
pub fn reduce(
    values: &ArrayD<f64>,
    axes: Option<&[i64]>,
    keepdims: bool,
    init: f64,
    combine: impl Fn(f64, f64) -> f64,
) -> NodeResult<ArrayD<f64>> {
    let mut axes = match axes {
        Some(axes) => normalize_axes(axes, values.ndim())?,
        None => (0..values.ndim()).collect(),
    };
    axes.sort_unstable();

    let mut reduced = values.clone();
    for &axis in axes.iter().rev() {
        reduced = reduced.fold_axis(Axis(axis), init, |&acc, &x| combine(acc, x));
    }
    if keepdims {
        for &axis in &axes {
            reduced = reduced.insert_axis(Axis(axis));
        }
    }
    Ok(reduced)
}

/// Integer sums widen to 64 bits and bools count as integers
fn sum_dtype(dtype: DType) -> DType {
    match dtype {
        DType::Float64 | DType::Float32 => dtype,
        DType::UInt64 | DType::UInt32 | DType::UInt16 | DType::UInt8 => DType::UInt64,
        _ => DType::Int64,
    }
}

#[derive(Default)]
pub struct ArraySumFactory;

impl NodeFactory for ArraySumFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArraySum",
            "Sum",
            NodeCategory::manipulation(),
            "Sums array elements over the given axes",
        )
        .with_inputs(vec![array_input()])
        .with_parameters(reduction_parameters("sum"))
        .with_outputs(vec![result_output("The sum, a 0-d array when every axis is reduced")])
        .with_tags(vec!["numpy", "manipulation", "reduction"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let axes = inputs.axes("Axis")?;
            let keepdims = inputs.boolean("Keep Dims")?;
            let values = reduce(&array.values, axes.as_deref(), keepdims, 0.0, |acc, x| acc + x)?;
            Ok(vec![NumArray::new(values, sum_dtype(array.dtype)).into()])
        };
        run().context("Sum failed")
    }
}

#[derive(Default)]
pub struct ArrayMaxFactory;

impl NodeFactory for ArrayMaxFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayMax",
            "Maximum",
            NodeCategory::manipulation(),
            "Largest array element over the given axes",
        )
        .with_inputs(vec![array_input()])
        .with_parameters(reduction_parameters("take the maximum"))
        .with_outputs(vec![result_output("The maximum, a 0-d array when every axis is reduced")])
        .with_tags(vec!["numpy", "manipulation", "reduction"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let axes = inputs.axes("Axis")?;
            let keepdims = inputs.boolean("Keep Dims")?;

            // maximum has no identity, so every reduced axis must be non-empty
            let reduced_axes = match &axes {
                Some(axes) => normalize_axes(axes, array.ndim())?,
                None => (0..array.ndim()).collect(),
            };
            if reduced_axes.iter().any(|&axis| array.shape()[axis] == 0) {
                return Err(NodeError::Computation(
                    "zero-size array to reduction operation maximum which has no identity".to_string(),
                ));
            }

            let values = reduce(&array.values, axes.as_deref(), keepdims, f64::NEG_INFINITY, |acc, x| {
                if acc.is_nan() || x.is_nan() {
                    f64::NAN
                } else {
                    acc.max(x)
                }
            })?;
            Ok(vec![NumArray::new(values, array.dtype).into()])
        };
        run().context("Maximum failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(array: NumArray, axis: &str, keepdims: bool) -> NodeInputs {
        NodeInputs::new()
            .with("Array", array)
            .with("Axis", NodeData::String(axis.into()))
            .with("Keep Dims", NodeData::Boolean(keepdims))
    }

    fn matrix() -> NumArray {
        NumArray::from_shape_vec(&[2, 3], vec![1.0, 5.0, 3.0, 4.0, 2.0, 6.0]).unwrap()
    }

    fn first(out: Vec<NodeData>) -> NumArray {
        out[0].as_array().cloned().unwrap()
    }

    #[test]
    fn test_sum_all_and_by_axis() {
        let total = first(ArraySumFactory::process(&inputs(matrix(), "", false)).unwrap());
        assert_eq!(total.ndim(), 0);
        assert_eq!(total.values.iter().next().copied(), Some(21.0));

        let rows = first(ArraySumFactory::process(&inputs(matrix(), "1", false)).unwrap());
        assert_eq!(rows.values.iter().copied().collect::<Vec<_>>(), vec![9.0, 12.0]);

        let cols = first(ArraySumFactory::process(&inputs(matrix(), "(-2,)", true)).unwrap());
        assert_eq!(cols.shape(), &[1, 3]);
    }

    #[test]
    fn test_sum_keepdims_over_every_axis() {
        let out = first(ArraySumFactory::process(&inputs(matrix(), "(0, 1)", true)).unwrap());
        assert_eq!(out.shape(), &[1, 1]);
        assert_eq!(out.values[[0, 0]], 21.0);
    }

    #[test]
    fn test_sum_widens_bool() {
        let flags = NumArray::from_vec(vec![1.0, 0.0, 1.0]).cast(DType::Bool);
        let out = first(ArraySumFactory::process(&inputs(flags, "", false)).unwrap());
        assert_eq!(out.dtype, DType::Int64);
        assert_eq!(out.values.iter().next().copied(), Some(2.0));
    }

    #[test]
    fn test_max_by_axis() {
        let out = first(ArrayMaxFactory::process(&inputs(matrix(), "0", false)).unwrap());
        assert_eq!(out.values.iter().copied().collect::<Vec<_>>(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_max_propagates_nan() {
        let out = first(ArrayMaxFactory::process(&inputs(NumArray::from_vec(vec![1.0, f64::NAN]), "", false)).unwrap());
        assert!(out.values.iter().next().unwrap().is_nan());
    }

    #[test]
    fn test_max_of_empty_fails() {
        let err = ArrayMaxFactory::process(&inputs(NumArray::from_vec(vec![]), "", false)).unwrap_err();
        assert!(matches!(err.root(), NodeError::Computation(_)));
    }

    #[test]
    fn test_repeated_axis() {
        assert!(ArraySumFactory::process(&inputs(matrix(), "(0, 0)", false)).is_err());
        assert!(ArraySumFactory::process(&inputs(matrix(), "2", false)).is_err());
    }
}
