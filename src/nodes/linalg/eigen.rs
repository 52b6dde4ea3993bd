//! Eigenvalue decomposition node

use std::fmt;
use std::str::FromStr;

use nalgebra::linalg::{Schur, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayD, Axis, IxDyn};

use super::svd::{check_finite, from_dmatrix, iteration_budget, to_dmatrix, SingularValueDecomposition};
use super::{matrix_input, to_square_matrix};
use crate::constants::tolerance;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

/// Eigenvalues split into real and imaginary parts.
///
/// `vectors` holds unit eigenvectors as columns. It is `None` when they were
/// not requested or when any eigenvalue is complex.
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    pub real: Array1<f64>,
    pub imaginary: Array1<f64>,
    pub vectors: Option<Array2<f64>>,
}

impl EigenDecomposition {
    pub fn new(matrix: &Array2<f64>, with_vectors: bool) -> NodeResult<Self> {
        let n = matrix.nrows();
        if n != matrix.ncols() || n == 0 {
            return Err(NodeError::InvalidShape(format!(
                "expected a non-empty square matrix, got shape ({}, {})",
                n,
                matrix.ncols()
            )));
        }
        check_finite(matrix)?;

        if is_symmetric(matrix) {
            let eigen = SymmetricEigen::try_new(to_dmatrix(matrix), f64::EPSILON, iteration_budget(matrix))
                .ok_or_else(|| NodeError::Computation("eigen solver did not converge".to_string()))?;
            return Ok(Self {
                real: eigen.eigenvalues.iter().copied().collect(),
                imaginary: Array1::zeros(n),
                vectors: with_vectors.then(|| from_dmatrix(&eigen.eigenvectors)),
            });
        }

        let schur = Schur::try_new(to_dmatrix(matrix), f64::EPSILON, iteration_budget(matrix))
            .ok_or_else(|| NodeError::Computation("eigen solver did not converge".to_string()))?;
        let values = schur.complex_eigenvalues();
        let real: Array1<f64> = values.iter().map(|c| c.re).collect();
        let imaginary: Array1<f64> = values.iter().map(|c| c.im).collect();

        let all_real = imaginary.iter().all(|im| im.abs() <= tolerance::NEGLIGIBLE);
        let vectors = if with_vectors && all_real {
            Some(real_eigenvectors(matrix, &real)?)
        } else {
            None
        };
        Ok(Self {
            real,
            imaginary,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    pub fn is_real(&self) -> bool {
        self.imaginary.iter().all(|im| im.abs() <= tolerance::NEGLIGIBLE)
    }

    fn modulus(&self, i: usize) -> f64 {
        self.real[i].hypot(self.imaginary[i])
    }

    /// Reorder values and their vectors together
    pub fn sort(&mut self, order: EigenOrder) {
        let mut index: Vec<usize> = (0..self.len()).collect();
        match order {
            EigenOrder::Unsorted => return,
            EigenOrder::Ascending => index.sort_by(|&a, &b| self.real[a].total_cmp(&self.real[b])),
            EigenOrder::Descending => index.sort_by(|&a, &b| self.real[b].total_cmp(&self.real[a])),
            EigenOrder::AbsAscending => index.sort_by(|&a, &b| self.modulus(a).total_cmp(&self.modulus(b))),
            EigenOrder::AbsDescending => index.sort_by(|&a, &b| self.modulus(b).total_cmp(&self.modulus(a))),
        }
        self.real = self.real.select(Axis(0), &index);
        self.imaginary = self.imaginary.select(Axis(0), &index);
        self.vectors = self.vectors.as_ref().map(|v| v.select(Axis(1), &index));
    }
}

fn is_symmetric(matrix: &Array2<f64>) -> bool {
    let scale = matrix.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let limit = 16.0 * f64::EPSILON * scale;
    matrix
        .indexed_iter()
        .all(|((i, j), v)| i >= j || (v - matrix[[j, i]]).abs() <= limit)
}

/// Unit null vectors of `A - lambda I`.
///
/// Eigenvalues that agree to within rounding share one SVD, and each member of
/// the group takes the next right singular vector from the end of its null
/// space, so a diagonalisable matrix gets independent vectors.
fn real_eigenvectors(matrix: &Array2<f64>, values: &Array1<f64>) -> NodeResult<Array2<f64>> {
    let n = matrix.nrows();
    let scale = values.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let mut vectors = Array2::zeros((n, n));
    let mut groups: Vec<(f64, SingularValueDecomposition, usize)> = Vec::new();

    for (j, &lambda) in values.iter().enumerate() {
        let index = match groups.iter().position(|(first, _, _)| (first - lambda).abs() <= 1e-8 * scale) {
            Some(index) => index,
            None => {
                let shifted = matrix - &(Array2::<f64>::eye(n) * lambda);
                groups.push((lambda, SingularValueDecomposition::new(&shifted)?, 0));
                groups.len() - 1
            }
        };
        let (_, svd, used) = &mut groups[index];
        let row = n - 1 - (*used).min(n - 1);
        *used += 1;
        vectors.column_mut(j).assign(&svd.vt.row(row));
    }
    Ok(vectors)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenOrder {
    Unsorted,
    Ascending,
    Descending,
    AbsAscending,
    AbsDescending,
}

impl EigenOrder {
    pub const ALL: [EigenOrder; 5] = [
        EigenOrder::Unsorted,
        EigenOrder::Ascending,
        EigenOrder::Descending,
        EigenOrder::AbsAscending,
        EigenOrder::AbsDescending,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EigenOrder::Unsorted => "none",
            EigenOrder::Ascending => "ascending",
            EigenOrder::Descending => "descending",
            EigenOrder::AbsAscending => "abs ascending",
            EigenOrder::AbsDescending => "abs descending",
        }
    }
}

impl FromStr for EigenOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|order| order.name() == wanted)
            .ok_or_else(|| format!("unknown sort order '{}'", s))
    }
}

impl fmt::Display for EigenOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn eigen_info(eigen: &EigenDecomposition, size: usize, order: EigenOrder, values_only: bool) -> String {
    let n = eigen.len();
    let real = &eigen.real;
    let min = real.iter().copied().fold(f64::INFINITY, f64::min);
    let max = real.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut info = vec![
        format!("Matrix size: {}x{}", size, size),
        format!("Eigenvalues: {}", n),
        format!("Sort: {}", order),
        format!("Real part range: [{:.6e}, {:.6e}]", min, max),
    ];

    let complex = eigen
        .imaginary
        .iter()
        .filter(|im| im.abs() > tolerance::NEGLIGIBLE)
        .count();
    if complex > 0 {
        info.push(format!("Complex eigenvalues: {}", complex));
    } else {
        info.push("All eigenvalues are real".to_string());
    }

    let moduli: Vec<f64> = (0..n).map(|i| eigen.modulus(i)).collect();
    let zeros = moduli.iter().filter(|&&m| m < tolerance::NEGLIGIBLE).count();
    if zeros > 0 {
        info.push(format!("Zero eigenvalues: {} (matrix is singular)", zeros));
    } else {
        let largest = moduli.iter().copied().fold(0.0, f64::max);
        let smallest = moduli.iter().copied().fold(f64::INFINITY, f64::min);
        info.push(format!("Condition estimate: {:.6e}", largest / smallest));
    }

    if complex == 0 {
        let positive = real.iter().filter(|&&v| v > tolerance::NEGLIGIBLE).count();
        let negative = real.iter().filter(|&&v| v < -tolerance::NEGLIGIBLE).count();
        info.push(format!("Positive: {}, negative: {}, zero: {}", positive, negative, zeros));
        let definiteness = if positive == n {
            "positive definite"
        } else if negative == n {
            "negative definite"
        } else if negative == 0 {
            "positive semi-definite"
        } else if positive == 0 {
            "negative semi-definite"
        } else {
            "indefinite"
        };
        info.push(format!("Matrix: {}", definiteness));
    }

    if values_only {
        info.push("Eigenvalues only".to_string());
    } else if eigen.vectors.is_none() {
        info.push("Eigenvectors omitted: complex eigenvectors are not representable".to_string());
    } else {
        info.push(format!("Eigenvectors: {}x{} (columns)", size, size));
    }
    info.join("\n")
}

#[derive(Default)]
pub struct EigenDecompositionFactory;

impl NodeFactory for EigenDecompositionFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "EigenDecomposition",
            "Eigen Decomposition",
            NodeCategory::linalg(),
            "Eigenvalues and eigenvectors of a square matrix",
        )
        .with_inputs(vec![matrix_input("Matrix", "Square matrix")])
        .with_parameters(vec![
            ParameterDefinition::new(
                "Sort",
                InterfaceParameter::choice(
                    EigenOrder::Descending.name(),
                    EigenOrder::ALL.iter().map(|o| o.name().to_string()).collect(),
                ),
            )
            .with_tooltip("Order by real part or by modulus; none keeps the solver order"),
            ParameterDefinition::new("Values Only", InterfaceParameter::boolean(false)),
        ])
        .with_outputs(vec![
            PortDefinition::required("Eigenvalues", DataType::Array).with_description("Real parts"),
            PortDefinition::required("Imaginary", DataType::Array).with_description("Imaginary parts, zero for real eigenvalues"),
            PortDefinition::optional("Eigenvectors", DataType::Array)
                .with_description("Unit eigenvectors as columns; None when any eigenvalue is complex"),
            PortDefinition::required("Info", DataType::String),
        ])
        .with_tags(vec!["numpy", "linalg", "eigen", "decomposition"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let matrix = to_square_matrix(inputs.array("Matrix")?)?;
            let order: EigenOrder = inputs.choice("Sort")?;
            let values_only = inputs.boolean("Values Only")?;

            let mut eigen = EigenDecomposition::new(&matrix, !values_only)?;
            eigen.sort(order);
            let info = eigen_info(&eigen, matrix.nrows(), order, values_only);

            let vectors = match (values_only, eigen.vectors) {
                (true, _) => NumArray::float(ArrayD::zeros(IxDyn(&[0]))).into(),
                (false, Some(vectors)) => NumArray::float(vectors.into_dyn()).into(),
                (false, None) => NodeData::None,
            };
            Ok(vec![
                NumArray::float(eigen.real.into_dyn()).into(),
                NumArray::float(eigen.imaginary.into_dyn()).into(),
                vectors,
                NodeData::String(info),
            ])
        };
        run().context("Eigen decomposition failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::math_utils::approx_eq;
    use ndarray::array;

    fn assert_eigenpairs(matrix: &Array2<f64>, eigen: &EigenDecomposition) {
        let vectors = eigen.vectors.as_ref().unwrap();
        for (j, &lambda) in eigen.real.iter().enumerate() {
            let v = vectors.column(j);
            let length = v.dot(&v).sqrt();
            assert!((length - 1.0).abs() < 1e-9);
            let residual = matrix.dot(&v) - &v * lambda;
            assert!(residual.iter().all(|r| r.abs() < 1e-8), "A v != {} v: {:?}", lambda, residual);
        }
    }

    #[test]
    fn test_symmetric_matrix() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let mut eigen = EigenDecomposition::new(&m, true).unwrap();
        eigen.sort(EigenOrder::Descending);
        assert!(approx_eq(eigen.real[0], 3.0));
        assert!(approx_eq(eigen.real[1], 1.0));
        assert!(eigen.is_real());
        assert_eigenpairs(&m, &eigen);
    }

    #[test]
    fn test_non_symmetric_real_eigenvalues() {
        let m = array![[4.0, 1.0], [2.0, 3.0]];
        let mut eigen = EigenDecomposition::new(&m, true).unwrap();
        eigen.sort(EigenOrder::Ascending);
        assert!(approx_eq(eigen.real[0], 2.0));
        assert!(approx_eq(eigen.real[1], 5.0));
        assert_eigenpairs(&m, &eigen);
    }

    #[test]
    fn test_repeated_eigenvalue_gets_independent_vectors() {
        let m = array![[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 3.0]];
        // break symmetry so the general path runs
        let m = &m + &array![[0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let eigen = EigenDecomposition::new(&m, true).unwrap();
        assert_eigenpairs(&m, &eigen);
        let vectors = eigen.vectors.unwrap();
        let gram = vectors.t().dot(&vectors);
        let twos: Vec<usize> = (0..3).filter(|&i| approx_eq(eigen.real[i], 2.0)).collect();
        assert_eq!(twos.len(), 2);
        assert!(gram[[twos[0], twos[1]]].abs() < 1e-8);
    }

    #[test]
    fn test_rotation_has_complex_pair() {
        let m = array![[0.0, -1.0], [1.0, 0.0]];
        let mut eigen = EigenDecomposition::new(&m, true).unwrap();
        eigen.sort(EigenOrder::AbsDescending);
        assert!(!eigen.is_real());
        assert!(eigen.vectors.is_none());
        assert!(eigen.real.iter().all(|r| r.abs() < 1e-12));
        let mut imaginary = eigen.imaginary.to_vec();
        imaginary.sort_by(f64::total_cmp);
        assert!(approx_eq(imaginary[0], -1.0));
        assert!(approx_eq(imaginary[1], 1.0));
    }

    #[test]
    fn test_sort_orders() {
        let m = array![[-5.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 3.0]];
        let order = |o: EigenOrder| {
            let mut eigen = EigenDecomposition::new(&m, false).unwrap();
            eigen.sort(o);
            eigen.real.iter().map(|v| v.round() as i64).collect::<Vec<_>>()
        };
        assert_eq!(order(EigenOrder::Ascending), vec![-5, 1, 3]);
        assert_eq!(order(EigenOrder::Descending), vec![3, 1, -5]);
        assert_eq!(order(EigenOrder::AbsAscending), vec![1, 3, -5]);
        assert_eq!(order(EigenOrder::AbsDescending), vec![-5, 3, 1]);
        assert_eq!("ABS descending".parse::<EigenOrder>(), Ok(EigenOrder::AbsDescending));
        assert!("sideways".parse::<EigenOrder>().is_err());
    }

    fn eigen_inputs(m: NumArray, sort: &str, values_only: bool) -> NodeInputs {
        NodeInputs::new()
            .with("Matrix", m)
            .with("Sort", NodeData::String(sort.into()))
            .with("Values Only", NodeData::Boolean(values_only))
    }

    #[test]
    fn test_eigen_node() {
        let m = NumArray::from_shape_vec(&[2, 2], vec![2.0, 0.0, 0.0, 3.0]).unwrap();
        let out = EigenDecompositionFactory::process(&eigen_inputs(m.clone(), "descending", false)).unwrap();
        assert_eq!(out.len(), 4);
        let values = &out[0].as_array().unwrap().values;
        assert!(approx_eq(values[[0]], 3.0));
        assert_eq!(out[2].as_array().unwrap().shape(), &[2, 2]);
        assert!(matches!(&out[3], NodeData::String(s) if s.contains("positive definite")));

        let out = EigenDecompositionFactory::process(&eigen_inputs(m, "none", true)).unwrap();
        assert_eq!(out[2].as_array().unwrap().shape(), &[0]);
    }

    #[test]
    fn test_eigen_node_complex_vectors_are_none() {
        let m = NumArray::from_shape_vec(&[2, 2], vec![0.0, -1.0, 1.0, 0.0]).unwrap();
        let out = EigenDecompositionFactory::process(&eigen_inputs(m, "descending", false)).unwrap();
        assert_eq!(out[2], NodeData::None);
        assert!(matches!(&out[3], NodeData::String(s) if s.contains("Complex eigenvalues: 2")));
    }

    #[test]
    fn test_eigen_node_needs_square() {
        let m = NumArray::from_shape_vec(&[2, 3], vec![0.0; 6]).unwrap();
        let err = EigenDecompositionFactory::process(&eigen_inputs(m, "descending", false)).unwrap_err();
        assert!(matches!(err.root(), NodeError::InvalidShape(_)));
    }
}
