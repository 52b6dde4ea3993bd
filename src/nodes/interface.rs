//! Parameter widgets declared by nodes and the values handed to `process`

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};
use crate::nodes::data::{NodeData, NumArray};
use crate::shape::{parse_axes, parse_shape, Shape};

/// Widget kinds a host renders for node parameters, with their defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InterfaceParameter {
    Float { default: f64, min: f64, max: f64, step: f64 },
    Integer { default: i64, min: i64, max: i64 },
    String { default: String },
    /// Free text interpreted as a shape, see [`crate::shape`]
    Shape { default: String },
    Boolean { default: bool },
    Enum { default: String, options: Vec<String> },
}

impl InterfaceParameter {
    /// Unbounded float field
    pub fn float(default: f64) -> Self {
        InterfaceParameter::Float {
            default,
            min: f64::MIN,
            max: f64::MAX,
            step: 0.001,
        }
    }

    pub fn float_range(default: f64, min: f64, max: f64, step: f64) -> Self {
        InterfaceParameter::Float { default, min, max, step }
    }

    pub fn integer(default: i64, min: i64, max: i64) -> Self {
        InterfaceParameter::Integer { default, min, max }
    }

    pub fn shape(default: &str) -> Self {
        InterfaceParameter::Shape {
            default: default.to_string(),
        }
    }

    pub fn text(default: &str) -> Self {
        InterfaceParameter::String {
            default: default.to_string(),
        }
    }

    pub fn boolean(default: bool) -> Self {
        InterfaceParameter::Boolean { default }
    }

    pub fn choice(default: &str, options: Vec<String>) -> Self {
        InterfaceParameter::Enum {
            default: default.to_string(),
            options,
        }
    }

    pub fn default_value(&self) -> NodeData {
        match self {
            InterfaceParameter::Float { default, .. } => NodeData::Float(*default),
            InterfaceParameter::Integer { default, .. } => NodeData::Integer(*default),
            InterfaceParameter::String { default }
            | InterfaceParameter::Shape { default }
            | InterfaceParameter::Enum { default, .. } => NodeData::String(default.clone()),
            InterfaceParameter::Boolean { default } => NodeData::Boolean(*default),
        }
    }

    /// Check a host-supplied value against this widget and normalise it
    pub fn validate(&self, name: &str, value: &NodeData) -> NodeResult<NodeData> {
        let invalid = |reason: String| NodeError::InvalidParameter {
            name: name.to_string(),
            reason,
        };

        match (self, value) {
            (InterfaceParameter::Float { min, max, .. }, _) => {
                let v = match value {
                    NodeData::Float(f) => *f,
                    NodeData::Integer(i) => *i as f64,
                    other => return Err(mismatch(name, "Float", other)),
                };
                if v.is_nan() {
                    return Err(invalid("NaN is not a number in range".to_string()));
                }
                if v < *min || v > *max {
                    return Err(invalid(format!("{} is outside [{}, {}]", v, min, max)));
                }
                Ok(NodeData::Float(v))
            }
            (InterfaceParameter::Integer { min, max, .. }, NodeData::Integer(v)) => {
                if v < min || v > max {
                    return Err(invalid(format!("{} is outside [{}, {}]", v, min, max)));
                }
                Ok(NodeData::Integer(*v))
            }
            (InterfaceParameter::Integer { .. }, other) => Err(mismatch(name, "Integer", other)),
            (InterfaceParameter::Boolean { .. }, NodeData::Boolean(b)) => Ok(NodeData::Boolean(*b)),
            (InterfaceParameter::Boolean { .. }, other) => Err(mismatch(name, "Boolean", other)),
            (InterfaceParameter::Enum { options, .. }, NodeData::String(s)) => {
                if options.iter().any(|o| o == s) {
                    Ok(NodeData::String(s.clone()))
                } else {
                    Err(invalid(format!("'{}' is not one of {:?}", s, options)))
                }
            }
            (InterfaceParameter::Shape { .. }, NodeData::String(s))
            | (InterfaceParameter::String { .. }, NodeData::String(s)) => Ok(NodeData::String(s.clone())),
            (_, other) => Err(mismatch(name, "String", other)),
        }
    }
}

fn mismatch(name: &str, expected: &'static str, got: &NodeData) -> NodeError {
    NodeError::TypeMismatch {
        name: name.to_string(),
        expected,
        got: got.type_name(),
    }
}

/// A named parameter with its widget and tooltip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub widget: InterfaceParameter,
    pub tooltip: Option<String>,
}

impl ParameterDefinition {
    pub fn new(name: &str, widget: InterfaceParameter) -> Self {
        Self {
            name: name.to_string(),
            widget,
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = Some(tooltip.to_string());
        self
    }
}

/// Port values and parameter values for one invocation, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeInputs {
    values: HashMap<String, NodeData>,
}

impl NodeInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<NodeData>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<NodeData>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values
            .get(name)
            .map_or(false, |v| !matches!(v, NodeData::None))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeData)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&NodeData> {
        self.values.get(name).filter(|v| !matches!(v, NodeData::None))
    }

    fn require(&self, name: &str) -> NodeResult<&NodeData> {
        self.get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    pub fn array(&self, name: &str) -> NodeResult<&NumArray> {
        match self.require(name)? {
            NodeData::Array(a) => Ok(a),
            other => Err(mismatch(name, "Array", other)),
        }
    }

    pub fn optional_array(&self, name: &str) -> NodeResult<Option<&NumArray>> {
        match self.get(name) {
            None => Ok(None),
            Some(NodeData::Array(a)) => Ok(Some(a)),
            Some(other) => Err(mismatch(name, "Array", other)),
        }
    }

    pub fn float(&self, name: &str) -> NodeResult<f64> {
        match self.require(name)? {
            NodeData::Float(f) => Ok(*f),
            NodeData::Integer(i) => Ok(*i as f64),
            other => Err(mismatch(name, "Float", other)),
        }
    }

    pub fn integer(&self, name: &str) -> NodeResult<i64> {
        match self.require(name)? {
            NodeData::Integer(i) => Ok(*i),
            other => Err(mismatch(name, "Integer", other)),
        }
    }

    pub fn boolean(&self, name: &str) -> NodeResult<bool> {
        match self.require(name)? {
            NodeData::Boolean(b) => Ok(*b),
            other => Err(mismatch(name, "Boolean", other)),
        }
    }

    pub fn string(&self, name: &str) -> NodeResult<&str> {
        match self.require(name)? {
            NodeData::String(s) => Ok(s.as_str()),
            other => Err(mismatch(name, "String", other)),
        }
    }

    pub fn shape(&self, name: &str) -> NodeResult<Shape> {
        Ok(parse_shape(self.string(name)?)?)
    }

    pub fn axes(&self, name: &str) -> NodeResult<Option<Vec<i64>>> {
        Ok(parse_axes(self.string(name)?)?)
    }

    /// Parse an enum-style string parameter
    pub fn choice<T: FromStr<Err = String>>(&self, name: &str) -> NodeResult<T> {
        self.string(name)?
            .parse()
            .map_err(|reason| NodeError::InvalidParameter {
                name: name.to_string(),
                reason,
            })
    }
}

impl FromIterator<(String, NodeData)> for NodeInputs {
    fn from_iter<I: IntoIterator<Item = (String, NodeData)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
