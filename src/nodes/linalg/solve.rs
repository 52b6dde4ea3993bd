//! Determinant, inverse and linear system nodes

use std::str::FromStr;

use log::warn;
use ndarray::{concatenate, Array1, Array2, ArrayD, Axis, Ix1, IxDyn};

use super::decompose::LuDecomposition;
use super::svd::SingularValueDecomposition;
use super::{matrix_input, to_matrix, to_square_matrix};
use crate::constants::tolerance;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 0-d array
    Scalar,
    /// 1-element 1-D array
    Array,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar" => Ok(OutputFormat::Scalar),
            "array" => Ok(OutputFormat::Array),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Human-readable summary of what a determinant says about its matrix
pub fn describe_determinant(det: f64, size: usize) -> String {
    let mut lines = vec![format!("Determinant: {:.6e}", det)];

    if det.abs() < tolerance::SINGULAR_DETERMINANT {
        lines.push("Matrix: singular (not invertible)".to_string());
        lines.push("Rows/columns: linearly dependent".to_string());
    } else {
        lines.push("Matrix: non-singular (invertible)".to_string());
        lines.push("Rows/columns: linearly independent".to_string());
    }

    lines.push(
        if det > 0.0 {
            "Sign: positive (orientation preserved)"
        } else if det < 0.0 {
            "Sign: negative (orientation reversed)"
        } else {
            "Sign: zero (dimension collapsed)"
        }
        .to_string(),
    );

    let measure = match size {
        1 => "Length",
        2 => "Area",
        3 => "Volume",
        _ => "Hypervolume",
    };
    lines.push(format!("{} scale factor: {:.6}", measure, det.abs()));

    if det != 0.0 && det.abs() < 1e-10 {
        lines.push("Warning: determinant is close to zero, the matrix is nearly singular".to_string());
    } else if det.abs() > 1e10 {
        lines.push("Note: determinant is very large, watch numerical precision".to_string());
    }

    lines.join("\n")
}

#[derive(Default)]
pub struct MatrixDeterminantFactory;

impl NodeFactory for MatrixDeterminantFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "MatrixDeterminant",
            "Determinant",
            NodeCategory::linalg(),
            "Determinant of a square matrix, with a short description of the matrix",
        )
        .with_inputs(vec![matrix_input("Matrix", "Square matrix")])
        .with_parameters(vec![ParameterDefinition::new(
            "Output Format",
            InterfaceParameter::choice("scalar", vec!["scalar".into(), "array".into()]),
        )
        .with_tooltip("scalar gives a 0-d array, array wraps the value in a 1-element array")])
        .with_outputs(vec![
            PortDefinition::required("Determinant", DataType::Array),
            PortDefinition::required("Properties", DataType::String)
                .with_description("Invertibility, orientation and scale derived from the determinant"),
        ])
        .with_tags(vec!["numpy", "linalg", "determinant"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let matrix = to_square_matrix(inputs.array("Matrix")?)?;
            let format: OutputFormat = inputs.choice("Output Format")?;
            let det = LuDecomposition::new(&matrix)?.determinant();

            let values = match format {
                OutputFormat::Scalar => ArrayD::from_elem(IxDyn(&[]), det),
                OutputFormat::Array => Array1::from_vec(vec![det]).into_dyn(),
            };
            Ok(vec![
                NumArray::float(values).into(),
                NodeData::String(describe_determinant(det, matrix.nrows())),
            ])
        };
        run().context("Determinant failed")
    }
}

#[derive(Default)]
pub struct MatrixInverseFactory;

impl NodeFactory for MatrixInverseFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "MatrixInverse",
            "Matrix Inverse",
            NodeCategory::linalg(),
            "Inverse of a square non-singular matrix, with its condition number",
        )
        .with_inputs(vec![matrix_input("Matrix", "Square matrix")])
        .with_parameters(vec![
            ParameterDefinition::new("Check Condition", InterfaceParameter::boolean(true))
                .with_tooltip("Compute the 2-norm condition number and warn when it passes the threshold"),
            ParameterDefinition::new(
                "Condition Threshold",
                InterfaceParameter::float_range(1e12, 1.0, 1e16, 1e6),
            ),
        ])
        .with_outputs(vec![
            PortDefinition::required("Inverse", DataType::Array),
            PortDefinition::required("Condition Number", DataType::Float)
                .with_description("0 when the check is off"),
        ])
        .with_tags(vec!["numpy", "linalg", "inverse"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let matrix = to_square_matrix(inputs.array("Matrix")?)?;
            let check = inputs.boolean("Check Condition")?;
            let threshold = inputs.float("Condition Threshold")?;

            let condition = if check {
                let condition = SingularValueDecomposition::new(&matrix)?.condition_number();
                if condition > threshold {
                    warn!(
                        "Matrix is ill-conditioned (condition number {:.3e} > {:.3e}), the inverse may be inaccurate",
                        condition, threshold
                    );
                }
                condition
            } else {
                0.0
            };

            let inverse = LuDecomposition::new(&matrix)?.inverse()?;

            let n = matrix.nrows();
            if n <= VERIFY_LIMIT {
                let error = (matrix.dot(&inverse) - Array2::<f64>::eye(n))
                    .iter()
                    .fold(0.0_f64, |acc, v| acc.max(v.abs()));
                if error > 1e-10 {
                    warn!("Inverse check: max |A * inv(A) - I| = {:.3e}", error);
                }
            }

            Ok(vec![NumArray::float(inverse.into_dyn()).into(), NodeData::Float(condition)])
        };
        run().context("Matrix inversion failed")
    }
}

/// Matrices up to this size get an `A * inv(A) = I` check
const VERIFY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// LU for square systems, falling back to the pseudo-inverse when singular;
    /// least squares otherwise
    Auto,
    /// LU, square systems only
    Direct,
    /// Least squares with optional ridge regularisation
    LeastSquares,
    /// Pseudo-inverse through the SVD
    Svd,
}

impl SolveMethod {
    pub const ALL: [SolveMethod; 4] = [
        SolveMethod::Auto,
        SolveMethod::Direct,
        SolveMethod::LeastSquares,
        SolveMethod::Svd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SolveMethod::Auto => "auto",
            SolveMethod::Direct => "direct",
            SolveMethod::LeastSquares => "lstsq",
            SolveMethod::Svd => "svd",
        }
    }
}

impl FromStr for SolveMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.name() == wanted)
            .ok_or_else(|| format!("unknown solve method '{}'", s))
    }
}

/// Solution of `A X = B` and what it took to get there
#[derive(Debug, Clone)]
pub struct LinearSolution {
    pub solution: Array2<f64>,
    pub method: SolveMethod,
    pub rank: Option<usize>,
    pub notes: Vec<String>,
}

/// Solve `A X = B` with the given method.
///
/// `regularization` only affects least squares: it appends `sqrt(lambda) I`
/// under `A` and zero rows under `B`, which minimises
/// `|A x - b|^2 + lambda |x|^2`.
pub fn solve_system(
    a: &Array2<f64>,
    b: &Array2<f64>,
    method: SolveMethod,
    regularization: f64,
) -> NodeResult<LinearSolution> {
    let (rows, cols) = a.dim();
    if rows == 0 || cols == 0 {
        return Err(NodeError::InvalidShape("coefficient matrix must not be empty".to_string()));
    }
    if b.nrows() != rows {
        return Err(NodeError::ShapeMismatch(format!(
            "right-hand side has {} rows, matrix has {}",
            b.nrows(),
            rows
        )));
    }

    match method {
        SolveMethod::Auto if rows == cols => match solve_system(a, b, SolveMethod::Direct, 0.0) {
            Err(NodeError::SingularMatrix) => {
                warn!("Matrix is singular, falling back to the SVD pseudo-inverse");
                let mut fallback = solve_system(a, b, SolveMethod::Svd, 0.0)?;
                fallback.notes.insert(0, "Direct solve failed: singular matrix".to_string());
                Ok(fallback)
            }
            other => other,
        },
        SolveMethod::Auto => solve_system(a, b, SolveMethod::LeastSquares, regularization),
        SolveMethod::Direct => {
            if rows != cols {
                return Err(NodeError::InvalidShape(format!(
                    "direct solve needs a square matrix, got shape ({}, {}); use lstsq or svd",
                    rows, cols
                )));
            }
            Ok(LinearSolution {
                solution: LuDecomposition::new(a)?.solve(b)?,
                method,
                rank: None,
                notes: vec!["LU decomposition with partial pivoting".to_string()],
            })
        }
        SolveMethod::LeastSquares => {
            if !(0.0..=1.0).contains(&regularization) {
                return Err(NodeError::InvalidParameter {
                    name: "Regularization".to_string(),
                    reason: format!("{} is outside [0, 1]", regularization),
                });
            }
            let mut notes = Vec::new();
            let (solution, rank) = if regularization > 0.0 {
                let ridge = Array2::<f64>::eye(cols) * regularization.sqrt();
                let stacked_a = concatenate(Axis(0), &[a.view(), ridge.view()])
                    .map_err(|e| NodeError::InvalidShape(e.to_string()))?;
                let padding = Array2::<f64>::zeros((cols, b.ncols()));
                let stacked_b = concatenate(Axis(0), &[b.view(), padding.view()])
                    .map_err(|e| NodeError::InvalidShape(e.to_string()))?;
                notes.push(format!("Ridge regularization: {:.3e}", regularization));
                SingularValueDecomposition::new(&stacked_a)?.solve(&stacked_b, None)?
            } else {
                SingularValueDecomposition::new(a)?.solve(b, None)?
            };
            if rank < cols {
                notes.push(format!("Rank deficient: rank {} < {} unknowns, minimum-norm solution", rank, cols));
            }
            Ok(LinearSolution {
                solution,
                method,
                rank: Some(rank),
                notes,
            })
        }
        SolveMethod::Svd => {
            let svd = SingularValueDecomposition::new(a)?;
            let (solution, rank) = svd.solve(b, None)?;
            let mut notes = vec![format!("Tolerance: {:.3e}", svd.default_tolerance())];
            if rank > 0 {
                notes.push(format!(
                    "Effective condition number: {:.3e}",
                    svd.largest() / svd.singular_values[rank - 1]
                ));
            }
            if rank < rows.min(cols) {
                notes.push(format!("Rank deficient: {} of {} singular values kept", rank, rows.min(cols)));
            }
            Ok(LinearSolution {
                solution,
                method,
                rank: Some(rank),
                notes,
            })
        }
    }
}

/// Solves `A x = b` for a vector or a matrix of right-hand sides
#[derive(Default)]
pub struct LinearSolveFactory;

impl NodeFactory for LinearSolveFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "LinearSolve",
            "Linear Solve",
            NodeCategory::linalg(),
            "Solves the linear system A x = b exactly or in the least squares sense",
        )
        .with_inputs(vec![
            matrix_input("A", "Coefficient matrix; square for direct solves"),
            matrix_input("B", "Right-hand side, a vector or one column per system"),
        ])
        .with_parameters(vec![
            ParameterDefinition::new(
                "Method",
                InterfaceParameter::choice(
                    SolveMethod::Auto.name(),
                    SolveMethod::ALL.iter().map(|m| m.name().to_string()).collect(),
                ),
            )
            .with_tooltip("auto: LU for square systems, least squares otherwise"),
            ParameterDefinition::new("Regularization", InterfaceParameter::float_range(0.0, 0.0, 1.0, 1e-6))
                .with_tooltip("Ridge term for lstsq, 0 disables it"),
        ])
        .with_outputs(vec![
            PortDefinition::required("Solution", DataType::Array).with_description("x, one row per unknown"),
            PortDefinition::required("Residual", DataType::Array).with_description("b - A x, shaped like B"),
            PortDefinition::required("Info", DataType::String),
        ])
        .with_tags(vec!["numpy", "linalg", "solve", "lstsq"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let a = to_matrix(inputs.array("A")?)?;
            let b = inputs.array("B")?;
            let method: SolveMethod = inputs.choice("Method")?;
            let regularization = inputs.float("Regularization")?;

            let (rhs, vector) = match b.ndim() {
                1 => {
                    let column = b
                        .values
                        .view()
                        .into_dimensionality::<Ix1>()
                        .map_err(|e| NodeError::InvalidShape(e.to_string()))?;
                    (column.insert_axis(Axis(1)).to_owned(), true)
                }
                2 => (to_matrix(b)?, false),
                n => {
                    return Err(NodeError::InvalidShape(format!(
                        "right-hand side must be 1-D or 2-D, got {} dimensions",
                        n
                    )))
                }
            };

            let result = solve_system(&a, &rhs, method, regularization)?;
            let residual = &rhs - &a.dot(&result.solution);
            let residual_norm = residual.iter().map(|r| r * r).sum::<f64>().sqrt();

            let mut info = vec![
                format!("Method: {}", result.method.name()),
                format!("System: {} equations, {} unknowns", a.nrows(), a.ncols()),
                format!("Right-hand sides: {}", rhs.ncols()),
            ];
            if let Some(rank) = result.rank {
                info.push(format!("Rank: {}", rank));
            }
            info.extend(result.notes);
            info.push(format!("Residual norm: {:.6e}", residual_norm));
            if residual_norm > 1e-10 * (1.0 + rhs.iter().map(|v| v * v).sum::<f64>().sqrt()) {
                info.push("System has no exact solution; x minimises the residual".to_string());
            }

            let (solution, residual) = if vector {
                (
                    result.solution.index_axis_move(Axis(1), 0).into_dyn(),
                    residual.index_axis_move(Axis(1), 0).into_dyn(),
                )
            } else {
                (result.solution.into_dyn(), residual.into_dyn())
            };
            Ok(vec![
                NumArray::float(solution).into(),
                NumArray::float(residual).into(),
                NodeData::String(info.join("\n")),
            ])
        };
        run().context("Linear solve failed")
    }
}
