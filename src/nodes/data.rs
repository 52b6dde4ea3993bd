//! Core data types that flow between nodes

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};

/// Element type tag carried by every array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float64,
    Float32,
    Int64,
    Int32,
    Int16,
    Int8,
    UInt64,
    UInt32,
    UInt16,
    UInt8,
    Bool,
}

impl DType {
    pub const ALL: [DType; 11] = [
        DType::Float64,
        DType::Float32,
        DType::Int64,
        DType::Int32,
        DType::Int16,
        DType::Int8,
        DType::UInt64,
        DType::UInt32,
        DType::UInt16,
        DType::UInt8,
        DType::Bool,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DType::Float64 => "float64",
            DType::Float32 => "float32",
            DType::Int64 => "int64",
            DType::Int32 => "int32",
            DType::Int16 => "int16",
            DType::Int8 => "int8",
            DType::UInt64 => "uint64",
            DType::UInt32 => "uint32",
            DType::UInt16 => "uint16",
            DType::UInt8 => "uint8",
            DType::Bool => "bool",
        }
    }

    /// Option list for dtype parameter widgets
    pub fn options() -> Vec<String> {
        Self::ALL.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float64 | DType::Float32)
    }

    /// Round a value through this element type.
    ///
    /// Integer types truncate toward zero and saturate at their bounds;
    /// NaN becomes zero.
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            DType::Float64 => value,
            DType::Float32 => value as f32 as f64,
            DType::Int64 => value as i64 as f64,
            DType::Int32 => value as i32 as f64,
            DType::Int16 => value as i16 as f64,
            DType::Int8 => value as i8 as f64,
            DType::UInt64 => value as u64 as f64,
            DType::UInt32 => value as u32 as f64,
            DType::UInt16 => value as u16 as f64,
            DType::UInt8 => value as u8 as f64,
            DType::Bool => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Result type of combining two arrays elementwise
    pub fn promote(a: DType, b: DType) -> DType {
        if a == b {
            a
        } else if a == DType::Float64 || b == DType::Float64 {
            DType::Float64
        } else if a.is_float() || b.is_float() {
            // float32 mixed with a wide integer loses precision, numpy widens
            DType::Float64
        } else {
            DType::Int64
        }
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| format!("unsupported data type '{}'", s.trim()))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// N-dimensional numeric array with its element type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumArray {
    pub values: ArrayD<f64>,
    pub dtype: DType,
}

impl NumArray {
    /// Wrap values, casting every element to `dtype`
    pub fn new(values: ArrayD<f64>, dtype: DType) -> Self {
        let values = if dtype == DType::Float64 {
            values
        } else {
            values.mapv(|v| dtype.cast(v))
        };
        Self { values, dtype }
    }

    pub fn float(values: ArrayD<f64>) -> Self {
        Self::new(values, DType::Float64)
    }

    /// One-dimensional float64 array
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self::float(Array1::from_vec(values).into_dyn())
    }

    /// Float64 array of the given shape; length must match
    pub fn from_shape_vec(shape: &[usize], values: Vec<f64>) -> NodeResult<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Self::float)
            .map_err(|e| NodeError::ShapeMismatch(e.to_string()))
    }

    /// Zero-dimensional array holding a single value
    pub fn scalar(value: f64) -> Self {
        Self::float(ArrayD::from_elem(IxDyn(&[]), value))
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same array re-tagged and re-cast
    pub fn cast(&self, dtype: DType) -> Self {
        Self::new(self.values.clone(), dtype)
    }
}

/// Values passed along node connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
    Array(NumArray),
    None,
}

impl NodeData {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeData::Float(_) => "Float",
            NodeData::Integer(_) => "Integer",
            NodeData::Boolean(_) => "Boolean",
            NodeData::String(_) => "String",
            NodeData::Array(_) => "Array",
            NodeData::None => "None",
        }
    }

    pub fn as_array(&self) -> Option<&NumArray> {
        match self {
            NodeData::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Numeric view of scalar data
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NodeData::Float(f) => Some(*f),
            NodeData::Integer(i) => Some(*i as f64),
            NodeData::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            NodeData::Array(a) if a.len() == 1 => a.values.iter().next().copied(),
            _ => None,
        }
    }
}

impl From<NumArray> for NodeData {
    fn from(array: NumArray) -> Self {
        NodeData::Array(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_cast() {
        assert_eq!(DType::Int32.cast(2.9), 2.0);
        assert_eq!(DType::Int8.cast(-3.7), -3.0);
        assert_eq!(DType::UInt8.cast(300.0), 255.0);
        assert_eq!(DType::UInt8.cast(-1.0), 0.0);
        assert_eq!(DType::Bool.cast(0.5), 1.0);
        assert_eq!(DType::Bool.cast(0.0), 0.0);
        assert_eq!(DType::Float32.cast(0.1), 0.1f32 as f64);
    }

    #[test]
    fn test_dtype_names_round_trip() {
        for dtype in DType::ALL {
            assert_eq!(dtype.name().parse::<DType>(), Ok(dtype));
        }
        assert!("complex128".parse::<DType>().is_err());
    }

    #[test]
    fn test_promote() {
        assert_eq!(DType::promote(DType::Int32, DType::Int32), DType::Int32);
        assert_eq!(DType::promote(DType::Int32, DType::Float32), DType::Float64);
        assert_eq!(DType::promote(DType::Int8, DType::UInt16), DType::Int64);
    }

    #[test]
    fn test_num_array_casts_on_construction() {
        let values = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.6, -2.2]).unwrap();
        let array = NumArray::new(values, DType::Int64);
        assert_eq!(array.values.as_slice().unwrap(), &[1.0, -2.0]);
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(NodeData::Integer(3).as_f64(), Some(3.0));
        assert_eq!(NodeData::Array(NumArray::scalar(2.5)).as_f64(), Some(2.5));
        assert_eq!(NodeData::String("x".into()).as_f64(), None);
    }
}
