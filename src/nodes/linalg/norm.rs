//! Norm and rank nodes

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayD, ArrayView2, Axis, IxDyn};

use super::svd::SingularValueDecomposition;
use super::{matrix_input, to_matrix};
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
use crate::nodes::manipulation::normalize_axes;

/// Norm selected in the widget; `Custom` reads its order from the Order field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormKind {
    Frobenius,
    Nuclear,
    One,
    Two,
    Inf,
    NegOne,
    NegTwo,
    NegInf,
    Custom,
}

impl NormKind {
    pub const ALL: [NormKind; 9] = [
        NormKind::Frobenius,
        NormKind::Nuclear,
        NormKind::One,
        NormKind::Two,
        NormKind::Inf,
        NormKind::NegOne,
        NormKind::NegTwo,
        NormKind::NegInf,
        NormKind::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NormKind::Frobenius => "frobenius",
            NormKind::Nuclear => "nuclear",
            NormKind::One => "1",
            NormKind::Two => "2",
            NormKind::Inf => "inf",
            NormKind::NegOne => "-1",
            NormKind::NegTwo => "-2",
            NormKind::NegInf => "-inf",
            NormKind::Custom => "custom",
        }
    }

    pub fn order(&self, custom: f64) -> NormOrder {
        match self {
            NormKind::Frobenius => NormOrder::Frobenius,
            NormKind::Nuclear => NormOrder::Nuclear,
            NormKind::One => NormOrder::P(1.0),
            NormKind::Two => NormOrder::P(2.0),
            NormKind::Inf => NormOrder::P(f64::INFINITY),
            NormKind::NegOne => NormOrder::P(-1.0),
            NormKind::NegTwo => NormOrder::P(-2.0),
            NormKind::NegInf => NormOrder::P(f64::NEG_INFINITY),
            NormKind::Custom => NormOrder::P(custom),
        }
    }
}

impl FromStr for NormKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("unknown norm type '{}'", s))
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved norm order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormOrder {
    Frobenius,
    Nuclear,
    P(f64),
}

impl NormOrder {
    fn description(&self, matrix: bool) -> String {
        match (*self, matrix) {
            (NormOrder::Frobenius, false) => "Euclidean length".to_string(),
            (NormOrder::Frobenius, true) => "square root of the sum of squared entries".to_string(),
            (NormOrder::Nuclear, _) => "sum of singular values".to_string(),
            (NormOrder::P(p), false) if p == f64::INFINITY => "largest absolute value".to_string(),
            (NormOrder::P(p), false) if p == f64::NEG_INFINITY => "smallest absolute value".to_string(),
            (NormOrder::P(p), false) if p == 0.0 => "count of non-zero entries".to_string(),
            (NormOrder::P(p), false) => format!("p-norm with p = {}", p),
            (NormOrder::P(p), true) if p == 1.0 => "largest absolute column sum".to_string(),
            (NormOrder::P(p), true) if p == -1.0 => "smallest absolute column sum".to_string(),
            (NormOrder::P(p), true) if p == 2.0 => "largest singular value".to_string(),
            (NormOrder::P(p), true) if p == -2.0 => "smallest singular value".to_string(),
            (NormOrder::P(p), true) if p == f64::INFINITY => "largest absolute row sum".to_string(),
            (NormOrder::P(_), true) => "smallest absolute row sum".to_string(),
        }
    }

    /// The p a vector norm uses for this order
    fn vector_p(&self) -> NodeResult<f64> {
        match *self {
            NormOrder::Frobenius => Ok(2.0),
            NormOrder::Nuclear => Err(NodeError::InvalidParameter {
                name: "Norm Type".to_string(),
                reason: "the nuclear norm is only defined for matrices".to_string(),
            }),
            NormOrder::P(p) if p.is_nan() => Err(NodeError::InvalidParameter {
                name: "Order".to_string(),
                reason: "order must not be NaN".to_string(),
            }),
            NormOrder::P(p) => Ok(p),
        }
    }

    fn check_matrix(&self) -> NodeResult<()> {
        match *self {
            NormOrder::P(p) if ![1.0, -1.0, 2.0, -2.0, f64::INFINITY, f64::NEG_INFINITY].contains(&p) => {
                Err(NodeError::InvalidParameter {
                    name: "Order".to_string(),
                    reason: format!("order {} is not defined for matrices", p),
                })
            }
            _ => Ok(()),
        }
    }
}

/// `(sum |x|^p)^(1/p)`, with the usual limits at 0 and +-inf
pub fn vector_norm<'a>(values: impl IntoIterator<Item = &'a f64>, p: f64) -> f64 {
    let abs = values.into_iter().map(|v| v.abs());
    if p == f64::INFINITY {
        abs.fold(0.0, f64::max)
    } else if p == f64::NEG_INFINITY {
        abs.fold(f64::INFINITY, f64::min)
    } else if p == 0.0 {
        abs.filter(|&v| v != 0.0).count() as f64
    } else if p == 1.0 {
        abs.sum()
    } else if p == 2.0 {
        abs.map(|v| v * v).sum::<f64>().sqrt()
    } else {
        abs.map(|v| v.powf(p)).sum::<f64>().powf(1.0 / p)
    }
}

pub fn matrix_norm(matrix: ArrayView2<f64>, order: NormOrder) -> NodeResult<f64> {
    order.check_matrix()?;
    let extreme = |sums: Array1<f64>, largest: bool| {
        let fold: fn(f64, f64) -> f64 = if largest { f64::max } else { f64::min };
        sums.iter().copied().reduce(fold).unwrap_or(0.0)
    };
    let singular = || SingularValueDecomposition::new(&matrix.to_owned());

    Ok(match order {
        NormOrder::Frobenius => matrix.iter().map(|v| v * v).sum::<f64>().sqrt(),
        NormOrder::Nuclear => singular()?.singular_values.sum(),
        NormOrder::P(p) if p == 2.0 => singular()?.largest(),
        NormOrder::P(p) if p == -2.0 => singular()?.smallest(),
        NormOrder::P(p) if p.abs() == 1.0 => extreme(matrix.mapv(f64::abs).sum_axis(Axis(0)), p > 0.0),
        NormOrder::P(p) => extreme(matrix.mapv(f64::abs).sum_axis(Axis(1)), p > 0.0),
    })
}

/// Norm of `values` over `axes`.
///
/// No axes: vector norm for 1-D, matrix norm for 2-D, and the flattened
/// Frobenius norm for higher ranks. One axis gives vector norms along it, two
/// axes give matrix norms over those planes. `keepdims` leaves the reduced
/// axes in place with length one.
pub fn norm(values: &ArrayD<f64>, order: NormOrder, axes: Option<&[i64]>, keepdims: bool) -> NodeResult<ArrayD<f64>> {
    let ndim = values.ndim();
    let axes = match axes {
        Some(axes) => normalize_axes(axes, ndim)?,
        None => match ndim {
            0 => return Err(NodeError::InvalidShape("norm needs at least one dimension".to_string())),
            1 | 2 => (0..ndim).collect(),
            _ if order == NormOrder::Frobenius => {
                let value = vector_norm(values.iter(), 2.0);
                let shape = if keepdims { vec![1; ndim] } else { Vec::new() };
                return Ok(ArrayD::from_elem(IxDyn(&shape), value));
            }
            n => {
                return Err(NodeError::InvalidShape(format!(
                    "only the frobenius norm applies to {} dimensions without axes",
                    n
                )))
            }
        },
    };

    let mut result = match axes.as_slice() {
        &[axis] => {
            let p = order.vector_p()?;
            values.map_axis(Axis(axis), |lane| vector_norm(lane.iter(), p))
        }
        &[row, col] => matrix_norms(values, order, row, col)?,
        other => {
            return Err(NodeError::InvalidParameter {
                name: "Axis".to_string(),
                reason: format!("norm takes one or two axes, got {}", other.len()),
            })
        }
    };

    if keepdims {
        let mut sorted = axes.clone();
        sorted.sort_unstable();
        for axis in sorted {
            result = result.insert_axis(Axis(axis));
        }
    }
    Ok(result)
}

/// Matrix norm of every `(row, col)` plane, batched over the remaining axes
fn matrix_norms(values: &ArrayD<f64>, order: NormOrder, row: usize, col: usize) -> NodeResult<ArrayD<f64>> {
    order.check_matrix()?;
    let mut permutation: Vec<usize> = (0..values.ndim()).filter(|&d| d != row && d != col).collect();
    let batch_shape: Vec<usize> = permutation.iter().map(|&d| values.shape()[d]).collect();
    permutation.extend([row, col]);

    let (rows, cols) = (values.shape()[row], values.shape()[col]);
    let batch: usize = batch_shape.iter().product();
    let planes = values
        .view()
        .permuted_axes(IxDyn(&permutation))
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((batch, rows, cols))
        .map_err(|e| NodeError::InvalidShape(e.to_string()))?;

    let norms = planes
        .outer_iter()
        .map(|plane| matrix_norm(plane, order))
        .collect::<NodeResult<Vec<f64>>>()?;
    ArrayD::from_shape_vec(IxDyn(&batch_shape), norms).map_err(|e| NodeError::InvalidShape(e.to_string()))
}

#[derive(Default)]
pub struct MatrixNormFactory;

impl NodeFactory for MatrixNormFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "MatrixNorm",
            "Norm",
            NodeCategory::linalg(),
            "Vector or matrix norm, over the whole array or along axes",
        )
        .with_inputs(vec![matrix_input("Matrix", "Vector, matrix or stack of matrices")])
        .with_parameters(vec![
            ParameterDefinition::new(
                "Norm Type",
                InterfaceParameter::choice(
                    NormKind::Frobenius.name(),
                    NormKind::ALL.iter().map(|k| k.name().to_string()).collect(),
                ),
            )
            .with_tooltip("1 / inf use column / row sums for matrices, 2 / -2 the extreme singular values"),
            ParameterDefinition::new("Order", InterfaceParameter::float(2.0))
                .with_tooltip("p used by the custom norm type; 0 counts non-zero entries"),
            ParameterDefinition::new("Axis", InterfaceParameter::text(""))
                .with_tooltip("Empty for the whole array, one axis for vector norms, (a, b) for matrix norms"),
            ParameterDefinition::new("Keep Dims", InterfaceParameter::boolean(false)),
        ])
        .with_outputs(vec![
            PortDefinition::required("Norm", DataType::Array)
                .with_description("0-d array for a whole-array norm, otherwise one value per lane or plane"),
            PortDefinition::required("Info", DataType::String),
        ])
        .with_tags(vec!["numpy", "linalg", "norm"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Matrix")?;
            let kind: NormKind = inputs.choice("Norm Type")?;
            let order = kind.order(inputs.float("Order")?);
            let axes = inputs.axes("Axis")?;
            let keepdims = inputs.boolean("Keep Dims")?;
            if array.is_empty() {
                return Err(NodeError::InvalidShape("input must not be empty".to_string()));
            }
            if order == NormOrder::Nuclear && (axes.is_some() || array.ndim() != 2) {
                return Err(NodeError::InvalidParameter {
                    name: "Norm Type".to_string(),
                    reason: "the nuclear norm needs a 2-D matrix and no axis".to_string(),
                });
            }

            let values = norm(&array.values, order, axes.as_deref(), keepdims)?;
            let matrix = match &axes {
                Some(axes) => axes.len() == 2,
                None => array.ndim() == 2,
            };

            let mut info = vec![
                format!("Shape: {:?}", array.shape()),
                format!("Norm type: {} ({})", kind, order.description(matrix)),
                match &axes {
                    Some(axes) => format!("Axis: {:?}", axes),
                    None => "Axis: whole array".to_string(),
                },
            ];
            if values.len() == 1 {
                let value = values.iter().copied().next().unwrap_or(0.0);
                info.push(format!("Norm: {:.6e}", value));
                if order == NormOrder::Frobenius && axes.is_none() {
                    info.push(format!("RMS: {:.6e}", value / (array.len() as f64).sqrt()));
                }
                if value == 0.0 {
                    info.push("Zero input".to_string());
                } else if value > 1e10 {
                    info.push("Large norm, watch numerical precision".to_string());
                }
            } else {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                info.push(format!("Result shape: {:?}", values.shape()));
                info.push(format!("Range: [{:.6e}, {:.6e}]", min, max));
            }

            Ok(vec![NumArray::float(values).into(), NodeData::String(info.join("\n"))])
        };
        run().context("Norm failed")
    }
}

#[derive(Default)]
pub struct MatrixRankFactory;

impl NodeFactory for MatrixRankFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "MatrixRank",
            "Matrix Rank",
            NodeCategory::linalg(),
            "Number of singular values above a tolerance",
        )
        .with_inputs(vec![matrix_input("Matrix", "Matrix of any shape")])
        .with_parameters(vec![ParameterDefinition::new(
            "Tolerance",
            InterfaceParameter::float_range(-1.0, -1.0, 1.0, 1e-10),
        )
        .with_tooltip("Singular values at or below this are treated as zero; negative picks one from the matrix scale")])
        .with_outputs(vec![
            PortDefinition::required("Rank", DataType::Integer),
            PortDefinition::required("Info", DataType::String),
        ])
        .with_tags(vec!["numpy", "linalg", "rank"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Matrix")?;
            let tolerance = inputs.float("Tolerance")?;
            let matrix: Array2<f64> = match array.ndim() {
                1 => Array2::from_shape_vec((1, array.len()), array.values.iter().copied().collect())
                    .map_err(|e| NodeError::InvalidShape(e.to_string()))?,
                _ => to_matrix(array)?,
            };
            if matrix.is_empty() {
                return Err(NodeError::InvalidShape("matrix must not be empty".to_string()));
            }

            let svd = SingularValueDecomposition::new(&matrix)?;
            let cutoff = if tolerance < 0.0 { svd.default_tolerance() } else { tolerance };
            let r = svd.rank(Some(cutoff));
            let (rows, cols) = matrix.dim();
            let full = rows.min(cols);
            let property = if r == 0 {
                "zero matrix"
            } else if r < full {
                "rank deficient"
            } else if rows == cols {
                "full rank square (invertible)"
            } else {
                "full rank"
            };
            let info = [
                format!("Shape: ({}, {})", rows, cols),
                format!("Rank: {}", r),
                format!("Maximum possible rank: {}", full),
                format!("Tolerance: {:.3e}", cutoff),
                format!("Matrix: {}", property),
            ]
            .join("\n");

            Ok(vec![NodeData::Integer(r as i64), NodeData::String(info)])
        };
        run().context("Rank failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::math_utils::approx_eq;

    fn matrix() -> NumArray {
        NumArray::from_shape_vec(&[2, 2], vec![1.0, -2.0, 3.0, 4.0]).unwrap()
    }

    fn whole(values: &ArrayD<f64>, kind: NormKind) -> f64 {
        let out = norm(values, kind.order(2.0), None, false).unwrap();
        assert_eq!(out.ndim(), 0);
        out.iter().copied().next().unwrap()
    }

    #[test]
    fn test_matrix_norms() {
        let m = matrix().values;
        assert!(approx_eq(whole(&m, NormKind::Frobenius), 30f64.sqrt()));
        assert_eq!(whole(&m, NormKind::One), 6.0);
        assert_eq!(whole(&m, NormKind::NegOne), 4.0);
        assert_eq!(whole(&m, NormKind::Inf), 7.0);
        assert_eq!(whole(&m, NormKind::NegInf), 3.0);
    }

    #[test]
    fn test_spectral_and_nuclear_norms() {
        let diag = NumArray::from_shape_vec(&[2, 2], vec![3.0, 0.0, 0.0, -4.0]).unwrap().values;
        assert!(approx_eq(whole(&diag, NormKind::Two), 4.0));
        assert!(approx_eq(whole(&diag, NormKind::NegTwo), 3.0));
        assert!(approx_eq(whole(&diag, NormKind::Nuclear), 7.0));

        // singular values of [[1, -2], [3, 4]] satisfy s1 s2 = |det| = 10, s1^2 + s2^2 = 30
        let m = matrix().values;
        let (s1, s2) = (whole(&m, NormKind::Two), whole(&m, NormKind::NegTwo));
        assert!(approx_eq(s1 * s2, 10.0));
        assert!(approx_eq(s1 * s1 + s2 * s2, 30.0));
    }

    #[test]
    fn test_vector_norms() {
        let v = NumArray::from_vec(vec![3.0, -4.0]).values;
        assert_eq!(whole(&v, NormKind::Frobenius), 5.0);
        assert_eq!(whole(&v, NormKind::Two), 5.0);
        assert_eq!(whole(&v, NormKind::One), 7.0);
        assert_eq!(whole(&v, NormKind::Inf), 4.0);
        assert_eq!(whole(&v, NormKind::NegInf), 3.0);
        assert!(approx_eq(whole(&v, NormKind::NegOne), 12.0 / 7.0));
        assert!(approx_eq(whole(&v, NormKind::NegTwo), 12.0 / 5.0));
        assert!(norm(&v, NormOrder::Nuclear, None, false).is_err());
    }

    #[test]
    fn test_custom_order() {
        let v = NumArray::from_vec(vec![1.0, 2.0, 2.0]).values;
        let cube = norm(&v, NormKind::Custom.order(3.0), None, false).unwrap();
        assert!(approx_eq(cube.iter().copied().next().unwrap(), 17f64.cbrt()));
        let zero = norm(&NumArray::from_vec(vec![0.0, 5.0, 0.0]).values, NormOrder::P(0.0), None, false).unwrap();
        assert_eq!(zero.iter().copied().next(), Some(1.0));

        // a custom p is fine for vectors, not for matrices
        assert!(norm(&matrix().values, NormOrder::P(3.0), None, false).is_err());
        assert!(norm(&matrix().values, NormOrder::P(3.0), Some(&[1][..]), false).is_ok());
    }

    #[test]
    fn test_axis_and_keepdims() {
        let m = matrix().values;
        let rows = norm(&m, NormOrder::P(1.0), Some(&[1][..]), false).unwrap();
        assert_eq!(rows.shape(), &[2]);
        assert_eq!(rows.iter().copied().collect::<Vec<_>>(), vec![3.0, 7.0]);

        let columns = norm(&m, NormOrder::P(f64::INFINITY), Some(&[0][..]), true).unwrap();
        assert_eq!(columns.shape(), &[1, 2]);
        assert_eq!(columns.iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0]);

        let whole = norm(&m, NormOrder::Frobenius, None, true).unwrap();
        assert_eq!(whole.shape(), &[1, 1]);
    }

    #[test]
    fn test_stacked_matrix_norms() {
        // two 2x2 planes stacked along axis 0
        let stack = NumArray::from_shape_vec(&[2, 2, 2], vec![1.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 3.0]).unwrap();
        let out = norm(&stack.values, NormOrder::P(f64::INFINITY), Some(&[1, 2][..]), false).unwrap();
        assert_eq!(out.shape(), &[2]);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![1.0, 3.0]);

        let kept = norm(&stack.values, NormOrder::Frobenius, Some(&[-2, -1][..]), true).unwrap();
        assert_eq!(kept.shape(), &[2, 1, 1]);

        assert!(norm(&stack.values, NormOrder::P(1.0), None, false).is_err());
        assert!(approx_eq(
            norm(&stack.values, NormOrder::Frobenius, None, false).unwrap().iter().copied().next().unwrap(),
            15f64.sqrt()
        ));
        assert!(norm(&stack.values, NormOrder::Frobenius, Some(&[0, 1, 2][..]), false).is_err());
    }

    fn norm_inputs(m: NumArray, kind: &str) -> NodeInputs {
        NodeInputs::new()
            .with("Matrix", m)
            .with("Norm Type", NodeData::String(kind.into()))
            .with("Order", NodeData::Float(2.0))
            .with("Axis", NodeData::String(String::new()))
            .with("Keep Dims", NodeData::Boolean(false))
    }

    #[test]
    fn test_norm_node() {
        let inputs = norm_inputs(matrix(), "inf");
        let out = MatrixNormFactory::process(&inputs).unwrap();
        assert_eq!(out[0].as_f64(), Some(7.0));
        assert!(matches!(&out[1], NodeData::String(s) if s.contains("row sum")));

        let out = MatrixNormFactory::process(&norm_inputs(matrix(), "nuclear")).unwrap();
        assert!(matches!(&out[1], NodeData::String(s) if s.contains("singular values")));

        let bad = norm_inputs(matrix(), "spectral");
        assert!(MatrixNormFactory::process(&bad).is_err());
    }

    #[test]
    fn test_norm_node_axis_options() {
        let inputs = norm_inputs(matrix(), "2")
            .with("Axis", NodeData::String("1".into()))
            .with("Keep Dims", NodeData::Boolean(true));
        let out = MatrixNormFactory::process(&inputs).unwrap();
        assert_eq!(out[0].as_array().unwrap().shape(), &[2, 1]);

        let nuclear_axis = norm_inputs(matrix(), "nuclear").with("Axis", NodeData::String("0".into()));
        let err = MatrixNormFactory::process(&nuclear_axis).unwrap_err();
        assert!(matches!(err.root(), NodeError::InvalidParameter { .. }));

        let nuclear_vector = norm_inputs(NumArray::from_vec(vec![1.0, 2.0]), "nuclear");
        assert!(MatrixNormFactory::process(&nuclear_vector).is_err());
    }

    #[test]
    fn test_rank_node() {
        let inputs = NodeInputs::new()
            .with(
                "Matrix",
                NumArray::from_shape_vec(&[3, 2], vec![1.0, 2.0, 2.0, 4.0, 3.0, 6.0]).unwrap(),
            )
            .with("Tolerance", NodeData::Float(-1.0));
        let out = MatrixRankFactory::process(&inputs).unwrap();
        assert_eq!(out[0], NodeData::Integer(1));
        assert!(matches!(&out[1], NodeData::String(s) if s.contains("rank deficient")));

        let vector = inputs.clone().with("Matrix", NumArray::from_vec(vec![0.0, 2.0]));
        assert_eq!(MatrixRankFactory::process(&vector).unwrap()[0], NodeData::Integer(1));

        let loose = inputs
            .with("Matrix", NumArray::from_shape_vec(&[2, 2], vec![1.0, 0.0, 0.0, 1e-6]).unwrap())
            .with("Tolerance", NodeData::Float(1e-3));
        assert_eq!(MatrixRankFactory::process(&loose).unwrap()[0], NodeData::Integer(1));
        let zero = NodeInputs::new()
            .with("Matrix", NumArray::from_shape_vec(&[2, 3], vec![0.0; 6]).unwrap())
            .with("Tolerance", NodeData::Float(-1.0));
        assert_eq!(MatrixRankFactory::process(&zero).unwrap()[0], NodeData::Integer(0));
    }
}
