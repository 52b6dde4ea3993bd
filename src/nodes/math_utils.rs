//! Array helpers shared by the node implementations

use ndarray::{ArrayD, IxDyn, Zip};

use crate::errstate::EventCounts;
use crate::error::{NodeError, NodeResult};

/// Resolve a possibly negative axis against `ndim`
pub fn normalize_axis(axis: i64, ndim: usize) -> NodeResult<usize> {
    let resolved = if axis < 0 { axis + ndim as i64 } else { axis };
    if resolved < 0 || resolved >= ndim as i64 {
        return Err(NodeError::InvalidParameter {
            name: "axis".to_string(),
            reason: format!("axis {} is out of bounds for array of dimension {}", axis, ndim),
        });
    }
    Ok(resolved as usize)
}

/// Shape two operands broadcast to, following numpy's trailing-dimension rule
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> NodeResult<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut shape = vec![0; ndim];
    for i in 0..ndim {
        let da = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let db = if i < b.len() { b[b.len() - 1 - i] } else { 1 };
        shape[ndim - 1 - i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(NodeError::ShapeMismatch(format!(
                    "operands could not be broadcast together with shapes {:?} {:?}",
                    a, b
                )))
            }
        };
    }
    Ok(shape)
}

/// Apply `op` elementwise with broadcasting, reporting floating-point events
/// through the current error settings.
pub fn broadcast_binary(
    a: &ArrayD<f64>,
    b: &ArrayD<f64>,
    division: bool,
    op: impl Fn(f64, f64) -> f64,
) -> NodeResult<ArrayD<f64>> {
    let shape = broadcast_shape(a.shape(), b.shape())?;
    let no_broadcast = || {
        NodeError::ShapeMismatch(format!(
            "operands could not be broadcast together with shapes {:?} {:?}",
            a.shape(),
            b.shape()
        ))
    };
    let av = a.broadcast(IxDyn(&shape)).ok_or_else(no_broadcast)?;
    let bv = b.broadcast(IxDyn(&shape)).ok_or_else(no_broadcast)?;

    let mut events = EventCounts::default();
    let result = Zip::from(av).and(bv).map_collect(|&x, &y| {
        let r = op(x, y);
        events.observe_binary(x, y, r, division);
        r
    });
    events.report()?;
    Ok(result)
}

/// Apply `op` to every element, reporting floating-point events
pub fn map_unary(a: &ArrayD<f64>, op: impl Fn(f64) -> f64) -> NodeResult<ArrayD<f64>> {
    let mut events = EventCounts::default();
    let result = a.mapv(|x| {
        let r = op(x);
        events.observe_unary(x, r);
        r
    });
    events.report()?;
    Ok(result)
}

/// Evenly spaced samples over `[start, stop]`, or `[start, stop)` without endpoint
pub fn linspace(start: f64, stop: f64, count: usize, endpoint: bool) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let divisions = if endpoint { count - 1 } else { count };
            let step = (stop - start) / divisions as f64;
            let mut samples: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
            if endpoint {
                samples[count - 1] = stop;
            }
            samples
        }
    }
}

/// Approximate equality used throughout the tests
#[cfg(test)]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errstate::{with_settings, ErrorMode, FloatErrorSettings};

    #[test]
    fn test_normalize_axis() {
        assert_eq!(normalize_axis(-1, 3), Ok(2));
        assert_eq!(normalize_axis(0, 1), Ok(0));
        assert!(normalize_axis(3, 3).is_err());
        assert!(normalize_axis(-4, 3).is_err());
    }

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[3, 1], &[4]), Ok(vec![3, 4]));
        assert_eq!(broadcast_shape(&[], &[2, 2]), Ok(vec![2, 2]));
        assert!(broadcast_shape(&[3], &[4]).is_err());
    }

    #[test]
    fn test_broadcast_binary_row_plus_column() {
        let col = ArrayD::from_shape_vec(IxDyn(&[2, 1]), vec![10.0, 20.0]).unwrap();
        let row = ArrayD::from_shape_vec(IxDyn(&[3]), vec![1.0, 2.0, 3.0]).unwrap();
        let sum = broadcast_binary(&col, &row, false, |x, y| x + y).unwrap();
        assert_eq!(sum.shape(), &[2, 3]);
        assert_eq!(sum.iter().copied().collect::<Vec<_>>(), vec![11.0, 12.0, 13.0, 21.0, 22.0, 23.0]);
    }

    #[test]
    fn test_division_events_follow_settings() {
        let a = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap();
        let b = ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.0, 1.0]).unwrap();
        let raise = FloatErrorSettings::default().with_divide(ErrorMode::Raise);
        assert!(with_settings(raise, || broadcast_binary(&a, &b, true, |x, y| x / y)).is_err());
        let ignore = FloatErrorSettings::all(ErrorMode::Ignore);
        let result = with_settings(ignore, || broadcast_binary(&a, &b, true, |x, y| x / y)).unwrap();
        assert!(result[[0]].is_infinite());
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5, true), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(0.0, 1.0, 4, false), vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(linspace(2.0, 3.0, 1, true), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0, true).is_empty());
    }
}
