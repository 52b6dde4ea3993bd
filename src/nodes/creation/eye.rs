//! Identity-like matrix node

use ndarray::Array2;

use super::{array_output, dtype_parameter};
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

/// Ones on one diagonal, zeros elsewhere
#[derive(Default)]
pub struct ArrayEyeFactory;

impl NodeFactory for ArrayEyeFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayEye",
            "Identity Matrix",
            NodeCategory::creation(),
            "Creates a matrix with ones on a diagonal and zeros elsewhere",
        )
        .with_parameters(vec![
            ParameterDefinition::new("Rows", InterfaceParameter::integer(3, 1, 1000)).with_tooltip("Number of rows"),
            ParameterDefinition::new("Columns", InterfaceParameter::integer(-1, -1, 1000))
                .with_tooltip("Number of columns, -1 for the same as rows"),
            ParameterDefinition::new("Diagonal Offset", InterfaceParameter::integer(0, -100, 100))
                .with_tooltip("0 is the main diagonal, positive above, negative below"),
            dtype_parameter(),
        ])
        .with_outputs(vec![array_output("The identity-like matrix")])
        .with_tags(vec!["numpy", "creation", "identity"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let rows = inputs.integer("Rows")?;
            let cols = inputs.integer("Columns")?;
            let k = inputs.integer("Diagonal Offset")?;
            let dtype: DType = inputs.choice("Data Type")?;
            if rows <= 0 {
                return Err(NodeError::InvalidParameter {
                    name: "Rows".to_string(),
                    reason: "matrix size must be greater than 0".to_string(),
                });
            }
            let cols = if cols <= 0 { rows } else { cols };
            Ok(vec![eye(rows as usize, cols as usize, k, dtype).into()])
        };
        run().context("Identity matrix creation failed")
    }
}

pub fn eye(rows: usize, cols: usize, k: i64, dtype: DType) -> NumArray {
    let matrix = Array2::from_shape_fn((rows, cols), |(i, j)| {
        if j as i64 - i as i64 == k {
            1.0
        } else {
            0.0
        }
    });
    NumArray::new(matrix.into_dyn(), dtype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_identity() {
        let m = eye(3, 3, 0, DType::Float64);
        assert_eq!(m.shape(), &[3, 3]);
        assert_eq!(m.values.sum(), 3.0);
        assert_eq!(m.values[[1, 1]], 1.0);
    }

    #[test]
    fn test_offset_and_rectangular() {
        let m = eye(2, 4, 1, DType::Int32);
        assert_eq!(m.values[[0, 1]], 1.0);
        assert_eq!(m.values[[1, 2]], 1.0);
        assert_eq!(m.values.sum(), 2.0);
        let m = eye(3, 3, -2, DType::Float64);
        assert_eq!(m.values[[2, 0]], 1.0);
        assert_eq!(m.values.sum(), 1.0);
    }

    #[test]
    fn test_columns_default_to_rows() {
        let inputs = NodeInputs::new()
            .with("Rows", NodeData::Integer(4))
            .with("Columns", NodeData::Integer(-1))
            .with("Diagonal Offset", NodeData::Integer(0))
            .with("Data Type", NodeData::String("float64".into()));
        let out = ArrayEyeFactory::process(&inputs).unwrap();
        assert_eq!(out[0].as_array().unwrap().shape(), &[4, 4]);
    }
}
