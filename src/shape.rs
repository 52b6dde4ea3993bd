//! Shape strings typed into node parameter fields
//!
//! Every shape-bearing node accepts the same notations:
//!
//! - `"10"`       a bare integer, one-dimensional extent
//! - `"(3, 3)"`   a parenthesised comma list
//! - `"(100,)"`   a one-element tuple, distinct from `"100"`
//! - `"3,3"`      a bare comma list
//! - `"()"`       the empty tuple, a zero-dimensional shape
//!
//! Parsing is permissive about signs: `"-1"` is accepted so reshape can infer
//! a dimension. Array construction rejects negative extents through
//! [`Shape::extents`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult, ShapeFormatError};

/// A parsed shape: a single extent or an explicit tuple of extents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// Bare integer, meaning a 1-D array of that length
    Extent(i64),
    /// Explicit N-D extent; empty for a 0-D array
    Dims(Vec<i64>),
}

/// Parse a shape string
pub fn parse_shape(input: &str) -> Result<Shape, ShapeFormatError> {
    let trimmed = input.trim();
    let fail = || ShapeFormatError::new(trimmed);

    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse().map(Shape::Extent).map_err(|_| fail());
    }

    if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.len() >= 2 {
        let inner = trimmed[1..trimmed.len() - 1].trim();
        if inner.is_empty() {
            return Ok(Shape::Dims(Vec::new()));
        }
        return parse_tokens(inner).map(Shape::Dims).ok_or_else(fail);
    }

    if trimmed.contains(',') {
        return parse_tokens(trimmed).map(Shape::Dims).ok_or_else(fail);
    }

    trimmed.parse().map(Shape::Extent).map_err(|_| fail())
}

/// Split on commas, drop empty tokens and parse the rest
fn parse_tokens(list: &str) -> Option<Vec<i64>> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<i64>().ok())
        .collect()
}

/// Parse an axis selection such as `"0"`, `"-1"` or `"(0, 1)"`.
///
/// An empty string or `"()"` selects every axis and yields `None`.
pub fn parse_axes(input: &str) -> Result<Option<Vec<i64>>, ShapeFormatError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match parse_shape(input)? {
        Shape::Extent(axis) => Ok(Some(vec![axis])),
        Shape::Dims(axes) if axes.is_empty() => Ok(None),
        Shape::Dims(axes) => Ok(Some(axes)),
    }
}

impl Shape {
    /// Raw dimension list, a bare extent becoming a single dimension
    pub fn dims(&self) -> Vec<i64> {
        match self {
            Shape::Extent(n) => vec![*n],
            Shape::Dims(dims) => dims.clone(),
        }
    }

    /// Number of dimensions the resulting array has
    pub fn ndim(&self) -> usize {
        match self {
            Shape::Extent(_) => 1,
            Shape::Dims(dims) => dims.len(),
        }
    }

    /// Extents usable by an array constructor. Negative sizes are rejected.
    pub fn extents(&self) -> NodeResult<Vec<usize>> {
        self.dims()
            .into_iter()
            .map(|d| {
                usize::try_from(d).map_err(|_| {
                    NodeError::InvalidShape(format!(
                        "negative dimensions are not allowed (got {} in {})",
                        d, self
                    ))
                })
            })
            .collect()
    }

    /// Total number of elements an array of this shape holds.
    ///
    /// The product of the non-zero extents must fit in `isize`, the bound
    /// ndarray places on every array shape, even when another extent is zero.
    pub fn element_count(&self) -> NodeResult<usize> {
        let extents = self.extents()?;
        let non_zero: Vec<usize> = extents.iter().copied().filter(|&d| d != 0).collect();
        match checked_product(&non_zero) {
            Some(product) if product <= isize::MAX as usize => {
                Ok(if non_zero.len() == extents.len() { product } else { 0 })
            }
            _ => Err(NodeError::InvalidShape(format!("shape {} is too large", self))),
        }
    }

    /// Resolve this shape as a reshape target for an array of `total` elements.
    ///
    /// At most one dimension may be `-1`; it is inferred from the others.
    pub fn resolve_reshape(&self, total: usize) -> NodeResult<Vec<usize>> {
        let dims = self.dims();
        let mut unknown = None;
        let mut known = Vec::with_capacity(dims.len());

        for (i, &d) in dims.iter().enumerate() {
            if d == -1 {
                if unknown.replace(i).is_some() {
                    return Err(NodeError::InvalidShape(
                        "can only specify one unknown dimension".to_string(),
                    ));
                }
                known.push(1);
            } else if d < 0 {
                return Err(NodeError::InvalidShape(format!(
                    "negative dimensions are not allowed (got {})",
                    d
                )));
            } else {
                known.push(d as usize);
            }
        }

        let product = checked_product(&known)
            .ok_or_else(|| NodeError::InvalidShape(format!("shape {} is too large", self)))?;

        if let Some(i) = unknown {
            if product == 0 || total % product != 0 {
                return Err(NodeError::ShapeMismatch(format!(
                    "cannot reshape array of size {} into shape {}",
                    total, self
                )));
            }
            known[i] = total / product;
        } else if product != total {
            return Err(NodeError::ShapeMismatch(format!(
                "cannot reshape array of size {} into shape {}",
                total, self
            )));
        }

        Ok(known)
    }
}

fn checked_product(extents: &[usize]) -> Option<usize> {
    extents.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

impl FromStr for Shape {
    type Err = ShapeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_shape(s)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Extent(n) => write!(f, "{}", n),
            Shape::Dims(dims) if dims.len() == 1 => write!(f, "({},)", dims[0]),
            Shape::Dims(dims) => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_string_is_bare_extent() {
        assert_eq!(parse_shape("10"), Ok(Shape::Extent(10)));
        assert_eq!(parse_shape("  100 "), Ok(Shape::Extent(100)));
        assert_eq!(parse_shape("007"), Ok(Shape::Extent(7)));
    }

    #[test]
    fn test_one_tuple_is_not_bare_extent() {
        assert_eq!(parse_shape("(5,)"), Ok(Shape::Dims(vec![5])));
        assert_eq!(parse_shape("(5)"), Ok(Shape::Dims(vec![5])));
        assert_ne!(parse_shape("(5,)"), parse_shape("5"));
    }

    #[test]
    fn test_empty_tuple() {
        assert_eq!(parse_shape("()"), Ok(Shape::Dims(vec![])));
        assert_eq!(parse_shape("(  )"), Ok(Shape::Dims(vec![])));
        assert_eq!(parse_shape("(,)"), Ok(Shape::Dims(vec![])));
    }

    #[test]
    fn test_comma_lists() {
        assert_eq!(parse_shape("(10, 10)"), Ok(Shape::Dims(vec![10, 10])));
        assert_eq!(parse_shape("3,3"), Ok(Shape::Dims(vec![3, 3])));
        assert_eq!(parse_shape("2, 3, 4,"), Ok(Shape::Dims(vec![2, 3, 4])));
        assert_eq!(parse_shape("(1,,2)"), Ok(Shape::Dims(vec![1, 2])));
    }

    #[test]
    fn test_negative_values_pass_the_parser() {
        assert_eq!(parse_shape("-1"), Ok(Shape::Extent(-1)));
        assert_eq!(parse_shape("(2, -1)"), Ok(Shape::Dims(vec![2, -1])));
    }

    #[test]
    fn test_malformed_shapes_fail() {
        for bad in ["abc", "(1,a)", "", "   ", "(3", "3)", "1.5", "(", "3 3"] {
            let err = parse_shape(bad).unwrap_err();
            assert_eq!(err.input, bad.trim());
        }
    }

    #[test]
    fn test_strict_integer_tokens() {
        // no digit separators, no non-ASCII digits, no values past i64
        for bad in ["1_000", "(1_000, 2)", "\u{ff13}", "(\u{0663},)", "9223372036854775808"] {
            assert!(parse_shape(bad).is_err(), "{:?} parsed", bad);
        }
        // a leading plus is an ordinary integer, and Unicode spaces are trimmed
        assert_eq!(parse_shape("+5").unwrap(), Shape::Extent(5));
        assert_eq!(parse_shape("\u{3000}(2, 3)\u{a0}").unwrap(), Shape::Dims(vec![2, 3]));
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["10", "(5,)", "()", "(10, 10)", "3,3", "(2, -1, 4)"] {
            let shape = parse_shape(text).unwrap();
            assert_eq!(parse_shape(&shape.to_string()), Ok(shape));
        }
        assert_eq!(Shape::Dims(vec![3, 3]).to_string(), "(3, 3)");
        assert_eq!(Shape::Dims(vec![]).to_string(), "()");
    }

    #[test]
    fn test_extents_reject_negative() {
        assert_eq!(Shape::Dims(vec![2, 3]).extents(), Ok(vec![2, 3]));
        assert!(matches!(
            Shape::Dims(vec![2, -3]).extents(),
            Err(NodeError::InvalidShape(_))
        ));
        assert_eq!(Shape::Dims(vec![]).element_count(), Ok(1));
        assert_eq!(Shape::Extent(0).element_count(), Ok(0));
    }

    #[test]
    fn test_element_count_overflow() {
        let huge = parse_shape("(4294967296, 4294967296)").unwrap();
        assert!(matches!(huge.element_count(), Err(NodeError::InvalidShape(_))));
        // ndarray bounds the non-zero extents even when the array is empty
        let empty = parse_shape("(0, 9223372036854775807, 2)").unwrap();
        assert!(empty.element_count().is_err());
        assert_eq!(parse_shape("(0, 1000)").unwrap().element_count(), Ok(0));
    }

    #[test]
    fn test_resolve_reshape() {
        assert_eq!(Shape::Dims(vec![2, -1]).resolve_reshape(6), Ok(vec![2, 3]));
        assert_eq!(Shape::Extent(-1).resolve_reshape(6), Ok(vec![6]));
        assert_eq!(Shape::Dims(vec![3, 2]).resolve_reshape(6), Ok(vec![3, 2]));
        assert!(Shape::Dims(vec![4, -1]).resolve_reshape(6).is_err());
        assert!(Shape::Dims(vec![-1, -1]).resolve_reshape(6).is_err());
        assert!(Shape::Dims(vec![5]).resolve_reshape(6).is_err());
    }

    #[test]
    fn test_parse_axes() {
        assert_eq!(parse_axes(""), Ok(None));
        assert_eq!(parse_axes("()"), Ok(None));
        assert_eq!(parse_axes("1"), Ok(Some(vec![1])));
        assert_eq!(parse_axes("-1"), Ok(Some(vec![-1])));
        assert_eq!(parse_axes("(0, 1)"), Ok(Some(vec![0, 1])));
        assert!(parse_axes("x").is_err());
    }
}
