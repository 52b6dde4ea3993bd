//! Matrix product and transpose nodes

use ndarray::{ArrayD, Ix1, Ix2};

use super::matrix_input;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::NodeInputs;

/// Matrix product with vector promotion: a 1-D left operand acts as a row,
/// a 1-D right operand as a column, and the promoted axis is dropped again.
pub fn matmul(a: &ArrayD<f64>, b: &ArrayD<f64>) -> NodeResult<ArrayD<f64>> {
    let mismatch = |k: usize, n: usize| {
        NodeError::ShapeMismatch(format!(
            "matmul: inner dimensions differ ({} vs {}) for shapes {:?} and {:?}",
            k,
            n,
            a.shape(),
            b.shape()
        ))
    };
    let dims_error = || {
        NodeError::InvalidShape(format!(
            "matmul needs 1-D or 2-D operands, got {} and {} dimensions",
            a.ndim(),
            b.ndim()
        ))
    };

    match (a.ndim(), b.ndim()) {
        (2, 2) => {
            let a = a.view().into_dimensionality::<Ix2>().map_err(|_| dims_error())?;
            let b = b.view().into_dimensionality::<Ix2>().map_err(|_| dims_error())?;
            if a.ncols() != b.nrows() {
                return Err(mismatch(a.ncols(), b.nrows()));
            }
            Ok(a.dot(&b).into_dyn())
        }
        (2, 1) => {
            let a = a.view().into_dimensionality::<Ix2>().map_err(|_| dims_error())?;
            let b = b.view().into_dimensionality::<Ix1>().map_err(|_| dims_error())?;
            if a.ncols() != b.len() {
                return Err(mismatch(a.ncols(), b.len()));
            }
            Ok(a.dot(&b).into_dyn())
        }
        (1, 2) => {
            let a = a.view().into_dimensionality::<Ix1>().map_err(|_| dims_error())?;
            let b = b.view().into_dimensionality::<Ix2>().map_err(|_| dims_error())?;
            if a.len() != b.nrows() {
                return Err(mismatch(a.len(), b.nrows()));
            }
            Ok(a.dot(&b).into_dyn())
        }
        (1, 1) => {
            let a = a.view().into_dimensionality::<Ix1>().map_err(|_| dims_error())?;
            let b = b.view().into_dimensionality::<Ix1>().map_err(|_| dims_error())?;
            if a.len() != b.len() {
                return Err(mismatch(a.len(), b.len()));
            }
            Ok(ArrayD::from_elem(ndarray::IxDyn(&[]), a.dot(&b)))
        }
        _ => Err(dims_error()),
    }
}

#[derive(Default)]
pub struct MatrixMultiplyFactory;

impl NodeFactory for MatrixMultiplyFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "MatrixMultiply",
            "Matrix Multiply",
            NodeCategory::linalg(),
            "Matrix product of two 1-D or 2-D arrays",
        )
        .with_inputs(vec![
            matrix_input("A", "Left matrix or vector"),
            matrix_input("B", "Right matrix or vector"),
        ])
        .with_outputs(vec![PortDefinition::required("Product", DataType::Array).with_description("A @ B")])
        .with_tags(vec!["numpy", "linalg", "matmul"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let a = inputs.array("A")?;
            let b = inputs.array("B")?;
            let product = matmul(&a.values, &b.values)?;
            Ok(vec![NumArray::new(product, DType::promote(a.dtype, b.dtype)).into()])
        };
        run().context("Matrix multiplication failed")
    }
}

#[derive(Default)]
pub struct MatrixTransposeFactory;

impl NodeFactory for MatrixTransposeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "MatrixTranspose",
            "Matrix Transpose",
            NodeCategory::linalg(),
            "Swaps the rows and columns of a matrix",
        )
        .with_inputs(vec![matrix_input("Matrix", "Matrix to transpose; vectors pass through")])
        .with_outputs(vec![PortDefinition::required("Transposed", DataType::Array)])
        .with_tags(vec!["numpy", "linalg", "transpose"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let matrix = inputs.array("Matrix")?;
            if matrix.ndim() > 2 {
                return Err(NodeError::InvalidShape(format!(
                    "expected a vector or matrix, got {} dimensions",
                    matrix.ndim()
                )));
            }
            let values = matrix.values.t().as_standard_layout().into_owned();
            Ok(vec![NumArray::new(values, matrix.dtype).into()])
        };
        run().context("Matrix transpose failed")
    }
}
