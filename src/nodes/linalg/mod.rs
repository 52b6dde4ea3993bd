//! Linear algebra nodes

pub mod decompose;
pub mod eigen;
pub mod norm;
pub mod products;
pub mod solve;
pub mod svd;

use ndarray::{Array2, Ix2};

use crate::error::{NodeError, NodeResult};
use crate::nodes::data::NumArray;
use crate::nodes::factory::{DataType, NodeRegistry, PortDefinition};

pub fn register_all(registry: &mut NodeRegistry) {
    registry.register::<products::MatrixMultiplyFactory>();
    registry.register::<products::MatrixTransposeFactory>();
    registry.register::<solve::MatrixDeterminantFactory>();
    registry.register::<solve::MatrixInverseFactory>();
    registry.register::<solve::LinearSolveFactory>();
    registry.register::<norm::MatrixNormFactory>();
    registry.register::<norm::MatrixRankFactory>();
    registry.register::<svd::MatrixSVDFactory>();
    registry.register::<eigen::EigenDecompositionFactory>();
}

pub(crate) fn matrix_input(name: &str, description: &str) -> PortDefinition {
    PortDefinition::required(name, DataType::Array).with_description(description)
}

/// Owned 2-D copy of `array`
pub(crate) fn to_matrix(array: &NumArray) -> NodeResult<Array2<f64>> {
    array
        .values
        .view()
        .into_dimensionality::<Ix2>()
        .map(|m| m.to_owned())
        .map_err(|_| NodeError::InvalidShape(format!("expected a 2-D matrix, got {} dimension(s)", array.ndim())))
}

/// 2-D, square and non-empty
pub(crate) fn to_square_matrix(array: &NumArray) -> NodeResult<Array2<f64>> {
    let matrix = to_matrix(array)?;
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(NodeError::InvalidShape(format!(
            "expected a square matrix, got shape ({}, {})",
            rows, cols
        )));
    }
    if rows == 0 {
        return Err(NodeError::InvalidShape("matrix must not be empty".to_string()));
    }
    Ok(matrix)
}
