//! Diagonal construction and extraction node

use std::str::FromStr;

use ndarray::{Array1, Array2, Ix2};

use super::array_output;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagMode {
    /// 1-D input placed on a diagonal of a square matrix
    Create,
    /// 2-D input, diagonal read out as 1-D
    Extract,
}

impl FromStr for DiagMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(DiagMode::Create),
            "extract" => Ok(DiagMode::Extract),
            other => Err(format!("unknown diagonal mode '{}'", other)),
        }
    }
}

#[derive(Default)]
pub struct ArrayDiagFactory;

impl NodeFactory for ArrayDiagFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayDiag",
            "Diagonal",
            NodeCategory::creation(),
            "Builds a diagonal matrix from a vector or extracts a matrix diagonal",
        )
        .with_inputs(vec![PortDefinition::required("Array", DataType::Array)
            .with_description("Vector to place, or matrix to read")])
        .with_parameters(vec![
            ParameterDefinition::new(
                "Mode",
                InterfaceParameter::choice("create", vec!["create".into(), "extract".into()]),
            ),
            ParameterDefinition::new("Diagonal Offset", InterfaceParameter::integer(0, -100, 100))
                .with_tooltip("0 is the main diagonal, positive above, negative below"),
        ])
        .with_outputs(vec![array_output("Diagonal matrix or extracted diagonal")])
        .with_tags(vec!["numpy", "creation", "diagonal"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let mode: DiagMode = inputs.choice("Mode")?;
            let k = inputs.integer("Diagonal Offset")?;
            let values = match mode {
                DiagMode::Create => create(array, k)?,
                DiagMode::Extract => extract(array, k)?,
            };
            Ok(vec![NumArray::new(values, array.dtype).into()])
        };
        run().context("Diagonal operation failed")
    }
}

fn create(array: &NumArray, k: i64) -> NodeResult<ndarray::ArrayD<f64>> {
    if array.ndim() != 1 {
        return Err(NodeError::InvalidShape(
            "creating a diagonal matrix needs a 1-D input".to_string(),
        ));
    }
    let n = array.len() + k.unsigned_abs() as usize;
    let mut matrix = Array2::<f64>::zeros((n, n));
    for (i, &v) in array.values.iter().enumerate() {
        let (row, col) = if k >= 0 { (i, i + k as usize) } else { (i + (-k) as usize, i) };
        matrix[[row, col]] = v;
    }
    Ok(matrix.into_dyn())
}

fn extract(array: &NumArray, k: i64) -> NodeResult<ndarray::ArrayD<f64>> {
    let matrix = array
        .values
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| NodeError::InvalidShape("extracting a diagonal needs a 2-D input".to_string()))?;
    let (rows, cols) = matrix.dim();
    let (row0, col0) = if k >= 0 { (0, k as usize) } else { ((-k) as usize, 0) };

    let mut diagonal = Vec::new();
    let (mut r, mut c) = (row0, col0);
    while r < rows && c < cols {
        diagonal.push(matrix[[r, c]]);
        r += 1;
        c += 1;
    }
    Ok(Array1::from_vec(diagonal).into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(array: NumArray, mode: &str, k: i64) -> NodeResult<NumArray> {
        let inputs = NodeInputs::new()
            .with("Array", array)
            .with("Mode", NodeData::String(mode.into()))
            .with("Diagonal Offset", NodeData::Integer(k));
        let out = ArrayDiagFactory::process(&inputs)?;
        Ok(out[0].as_array().cloned().unwrap())
    }

    #[test]
    fn test_create_with_offset() {
        let m = run(NumArray::from_vec(vec![1.0, 2.0]), "create", 1).unwrap();
        assert_eq!(m.shape(), &[3, 3]);
        assert_eq!(m.values[[0, 1]], 1.0);
        assert_eq!(m.values[[1, 2]], 2.0);
        let m = run(NumArray::from_vec(vec![5.0]), "create", -1).unwrap();
        assert_eq!(m.values[[1, 0]], 5.0);
    }

    #[test]
    fn test_extract() {
        let m = NumArray::from_shape_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let d = run(m.clone(), "extract", 0).unwrap();
        assert_eq!(d.values.iter().copied().collect::<Vec<_>>(), vec![1.0, 5.0]);
        let d = run(m.clone(), "extract", 1).unwrap();
        assert_eq!(d.values.iter().copied().collect::<Vec<_>>(), vec![2.0, 6.0]);
        let d = run(m, "extract", -1).unwrap();
        assert_eq!(d.values.iter().copied().collect::<Vec<_>>(), vec![4.0]);
    }

    #[test]
    fn test_dimension_checks() {
        assert!(run(NumArray::scalar(1.0), "create", 0).is_err());
        assert!(run(NumArray::from_vec(vec![1.0]), "extract", 0).is_err());
    }
}
