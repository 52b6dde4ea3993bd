//! Singular value decomposition and the MatrixSVD node
//!
//! The factorisation itself runs in nalgebra; everything around it works on
//! ndarray so the nodes never see nalgebra types.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayD, Axis, IxDyn};

use super::{matrix_input, to_matrix};
use crate::constants::tolerance;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

pub(crate) fn to_dmatrix(matrix: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(matrix.nrows(), matrix.ncols(), |i, j| matrix[[i, j]])
}

pub(crate) fn from_dmatrix(matrix: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((matrix.nrows(), matrix.ncols()), |(i, j)| matrix[(i, j)])
}

/// Iterative solvers give up after this many sweeps instead of spinning
pub(crate) fn iteration_budget(matrix: &Array2<f64>) -> usize {
    tolerance::ITERATIONS_PER_DIMENSION * matrix.nrows().max(matrix.ncols()).max(4)
}

pub(crate) fn check_finite(matrix: &Array2<f64>) -> NodeResult<()> {
    if matrix.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(NodeError::Computation("matrix contains NaN or infinite values".to_string()))
    }
}

/// Thin SVD `A = U diag(s) Vt` with `s` in descending order.
///
/// For an `m x n` input with `k = min(m, n)`, `u` is `m x k` and `vt` is `k x n`.
#[derive(Debug, Clone)]
pub struct SingularValueDecomposition {
    pub u: Array2<f64>,
    pub singular_values: Array1<f64>,
    pub vt: Array2<f64>,
}

impl SingularValueDecomposition {
    pub fn new(matrix: &Array2<f64>) -> NodeResult<Self> {
        if matrix.is_empty() {
            return Err(NodeError::InvalidShape("matrix must not be empty".to_string()));
        }
        check_finite(matrix)?;

        let svd = nalgebra::linalg::SVD::try_new(to_dmatrix(matrix), true, true, f64::EPSILON, iteration_budget(matrix))
            .ok_or_else(|| NodeError::Computation("SVD did not converge".to_string()))?;
        let (u, v_t) = match (&svd.u, &svd.v_t) {
            (Some(u), Some(v_t)) => (from_dmatrix(u), from_dmatrix(v_t)),
            _ => return Err(NodeError::Computation("SVD returned no singular vectors".to_string())),
        };

        let s: Vec<f64> = svd.singular_values.iter().copied().collect();
        let mut order: Vec<usize> = (0..s.len()).collect();
        order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));

        Ok(Self {
            u: u.select(Axis(1), &order),
            singular_values: order.iter().map(|&i| s[i]).collect(),
            vt: v_t.select(Axis(0), &order),
        })
    }

    pub fn largest(&self) -> f64 {
        self.singular_values.iter().next().copied().unwrap_or(0.0)
    }

    pub fn smallest(&self) -> f64 {
        self.singular_values.iter().last().copied().unwrap_or(0.0)
    }

    /// `max(m, n) * eps * s_max`, the cutoff numpy uses for rank and pinv
    pub fn default_tolerance(&self) -> f64 {
        self.u.nrows().max(self.vt.ncols()) as f64 * f64::EPSILON * self.largest()
    }

    /// Singular values above `tolerance`; `None` picks the default cutoff
    pub fn rank(&self, tolerance: Option<f64>) -> usize {
        let tolerance = tolerance.unwrap_or_else(|| self.default_tolerance());
        self.singular_values.iter().filter(|&&s| s > tolerance).count()
    }

    /// 2-norm condition number, infinite when the smallest value vanishes
    pub fn condition_number(&self) -> f64 {
        let smallest = self.smallest();
        if smallest <= f64::EPSILON * self.largest() || smallest == 0.0 {
            f64::INFINITY
        } else {
            self.largest() / smallest
        }
    }

    /// `m x m` left basis, the thin `U` completed with orthonormal columns
    pub fn full_u(&self) -> Array2<f64> {
        complete_basis(&self.u)
    }

    /// `n x n` right basis, rows of the thin `Vt` completed the same way
    pub fn full_vt(&self) -> Array2<f64> {
        complete_basis(&self.vt.t().to_owned()).reversed_axes()
    }

    /// Minimum-norm least squares solution of `A X = B` through the pseudo-inverse.
    ///
    /// Returns the solution and the number of singular values kept.
    pub fn solve(&self, rhs: &Array2<f64>, tolerance: Option<f64>) -> NodeResult<(Array2<f64>, usize)> {
        if rhs.nrows() != self.u.nrows() {
            return Err(NodeError::ShapeMismatch(format!(
                "right-hand side has {} rows, matrix has {}",
                rhs.nrows(),
                self.u.nrows()
            )));
        }
        let tolerance = tolerance.unwrap_or_else(|| self.default_tolerance());
        let mut projected = self.u.t().dot(rhs);
        let mut kept = 0;
        for (mut row, &s) in projected.axis_iter_mut(Axis(0)).zip(self.singular_values.iter()) {
            if s > tolerance {
                row.mapv_inplace(|v| v / s);
                kept += 1;
            } else {
                row.fill(0.0);
            }
        }
        Ok((self.vt.t().dot(&projected), kept))
    }
}

/// Extend orthonormal columns to a full orthonormal basis (Gram-Schmidt on e_i)
fn complete_basis(columns: &Array2<f64>) -> Array2<f64> {
    let size = columns.nrows();
    let mut basis: Vec<Array1<f64>> = columns.columns().into_iter().map(|c| c.to_owned()).collect();

    for i in 0..size {
        if basis.len() >= size {
            break;
        }
        let mut candidate = Array1::zeros(size);
        candidate[i] = 1.0;
        // two passes keep the result orthogonal to working precision
        for _ in 0..2 {
            for q in &basis {
                let projection = q.dot(&candidate);
                candidate.scaled_add(-projection, q);
            }
        }
        let length = candidate.dot(&candidate).sqrt();
        if length > 1e-8 {
            basis.push(candidate / length);
        }
    }

    let mut full = Array2::zeros((size, basis.len()));
    for (j, q) in basis.iter().enumerate() {
        full.column_mut(j).assign(q);
    }
    full
}

/// Order of the singular values in the node outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingularOrder {
    Descending,
    Ascending,
}

impl SingularOrder {
    pub fn name(&self) -> &'static str {
        match self {
            SingularOrder::Descending => "descending",
            SingularOrder::Ascending => "ascending",
        }
    }
}

impl FromStr for SingularOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "descending" => Ok(SingularOrder::Descending),
            "ascending" => Ok(SingularOrder::Ascending),
            other => Err(format!("unknown order '{}'", other)),
        }
    }
}

impl fmt::Display for SingularOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Count of leading values whose squared sum reaches `fraction` of the total
fn energy_count(values: &Array1<f64>, fraction: f64) -> usize {
    let total: f64 = values.iter().map(|s| s * s).sum();
    if total == 0.0 {
        return 0;
    }
    let mut running = 0.0;
    for (i, s) in values.iter().enumerate() {
        running += s * s;
        if running / total >= fraction {
            return i + 1;
        }
    }
    values.len()
}

fn svd_info(svd: &SingularValueDecomposition, shape: (usize, usize), outputs: Option<(&[usize], &[usize])>) -> String {
    let s = &svd.singular_values;
    let k = s.len();
    let rank = svd.rank(None);
    let mut info = vec![
        format!("Matrix shape: ({}, {})", shape.0, shape.1),
        format!("Singular values: {}", k),
        format!("Largest: {:.6e}", svd.largest()),
        format!("Smallest: {:.6e}", svd.smallest()),
    ];

    let condition = svd.condition_number();
    if condition.is_finite() {
        info.push(format!("Condition number: {:.6e}", condition));
        if condition > 1e12 {
            info.push("Warning: matrix is ill-conditioned".to_string());
        }
    } else {
        info.push("Condition number: infinite (singular)".to_string());
    }

    info.push(format!("Numerical rank: {}", rank));
    info.push(if rank == shape.0.min(shape.1) {
        "Matrix: full rank".to_string()
    } else {
        format!("Matrix: rank deficient (missing {})", shape.0.min(shape.1) - rank)
    });

    let energy: f64 = s.iter().map(|v| v * v).sum();
    info.push(format!("Total energy: {:.6e}", energy));
    if energy > 0.0 {
        info.push(format!("Values for 90% energy: {}/{}", energy_count(s, 0.90), k));
        info.push(format!("Values for 99% energy: {}/{}", energy_count(s, 0.99), k));
    }

    match outputs {
        Some((u, vt)) => {
            info.push(format!("U shape: {:?}", u));
            info.push(format!("Vt shape: {:?}", vt));
        }
        None => info.push("Singular values only".to_string()),
    }
    info.join("\n")
}

#[derive(Default)]
pub struct MatrixSVDFactory;

impl NodeFactory for MatrixSVDFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "MatrixSVD",
            "Singular Value Decomposition",
            NodeCategory::linalg(),
            "Factor a matrix into U, singular values and Vt",
        )
        .with_inputs(vec![matrix_input("Matrix", "Matrix of any shape")])
        .with_parameters(vec![
            ParameterDefinition::new("Full Matrices", InterfaceParameter::boolean(false))
                .with_tooltip("Square U (m x m) and Vt (n x n) instead of the reduced factors"),
            ParameterDefinition::new("Values Only", InterfaceParameter::boolean(false))
                .with_tooltip("Skip U and Vt; both outputs become empty arrays"),
            ParameterDefinition::new(
                "Order",
                InterfaceParameter::choice(
                    SingularOrder::Descending.name(),
                    vec!["descending".into(), "ascending".into()],
                ),
            ),
        ])
        .with_outputs(vec![
            PortDefinition::required("U", DataType::Array).with_description("Left singular vectors as columns"),
            PortDefinition::required("Singular Values", DataType::Array),
            PortDefinition::required("Vt", DataType::Array).with_description("Right singular vectors as rows"),
            PortDefinition::required("Info", DataType::String),
        ])
        .with_tags(vec!["numpy", "linalg", "svd", "decomposition"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let matrix = to_matrix(inputs.array("Matrix")?)?;
            let full = inputs.boolean("Full Matrices")?;
            let values_only = inputs.boolean("Values Only")?;
            let order: SingularOrder = inputs.choice("Order")?;

            let svd = SingularValueDecomposition::new(&matrix)?;
            let k = svd.singular_values.len();
            let mut s = svd.singular_values.clone();
            if order == SingularOrder::Ascending {
                s.invert_axis(Axis(0));
            }

            if values_only {
                let empty = || NumArray::float(ArrayD::zeros(IxDyn(&[0])));
                let info = svd_info(&svd, matrix.dim(), None);
                return Ok(vec![
                    empty().into(),
                    NumArray::float(s.into_dyn()).into(),
                    empty().into(),
                    NodeData::String(info),
                ]);
            }

            let (mut u, mut vt) = if full {
                (svd.full_u(), svd.full_vt())
            } else {
                (svd.u.clone(), svd.vt.clone())
            };
            if order == SingularOrder::Ascending {
                // only the paired vectors move; completed basis vectors stay behind them
                let mut columns: Vec<usize> = (0..k).rev().collect();
                columns.extend(k..u.ncols());
                u = u.select(Axis(1), &columns);
                let mut rows: Vec<usize> = (0..k).rev().collect();
                rows.extend(k..vt.nrows());
                vt = vt.select(Axis(0), &rows);
            }

            let info = svd_info(&svd, matrix.dim(), Some((u.shape(), vt.shape())));
            Ok(vec![
                NumArray::float(u.into_dyn()).into(),
                NumArray::float(s.into_dyn()).into(),
                NumArray::float(vt.into_dyn()).into(),
                NodeData::String(info),
            ])
        };
        run().context("SVD failed")
    }
}
