//! Error types for shape parsing, numeric error modes and node execution

use thiserror::Error;

use crate::errstate::FloatEvent;

/// Raised when a shape string matches none of the accepted notations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid shape format: \"{input}\". Use a form like \"100\", \"(100,)\" or \"(10, 10)\"")]
pub struct ShapeFormatError {
    /// The trimmed input that failed to parse
    pub input: String,
}

impl ShapeFormatError {
    pub fn new(input: impl Into<String>) -> Self {
        Self { input: input.into() }
    }
}

/// Raised when a floating-point event occurs while its error mode is `Raise`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("floating-point error: {event} encountered in {count} element(s)")]
pub struct FloatingPointError {
    pub event: FloatEvent,
    pub count: usize,
}

/// Everything that can go wrong while a node processes its inputs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error(transparent)]
    Shape(#[from] ShapeFormatError),

    #[error(transparent)]
    FloatingPoint(#[from] FloatingPointError),

    #[error("missing required input '{0}'")]
    MissingInput(String),

    #[error("input '{name}' expected {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("matrix is singular")]
    SingularMatrix,

    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<NodeError>,
    },

    #[error("{0}")]
    Computation(String),
}

impl NodeError {
    /// Wrap this error with a node-specific message prefix
    pub fn context(self, context: impl Into<String>) -> Self {
        NodeError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &NodeError {
        match self {
            NodeError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type used by node processing
pub type NodeResult<T> = Result<T, NodeError>;

/// Attach a context message to the error side of a node result
pub trait ResultExt<T> {
    fn context(self, context: &str) -> NodeResult<T>;
}

impl<T, E: Into<NodeError>> ResultExt<T> for Result<T, E> {
    fn context(self, context: &str) -> NodeResult<T> {
        self.map_err(|e| e.into().context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_names_input_and_forms() {
        let msg = ShapeFormatError::new("abc").to_string();
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("\"(100,)\""));
        assert!(msg.contains("\"(10, 10)\""));
    }

    #[test]
    fn test_context_wraps_and_root_unwraps() {
        let err = NodeError::SingularMatrix.context("Matrix inverse failed");
        assert_eq!(err.to_string(), "Matrix inverse failed: matrix is singular");
        assert_eq!(err.root(), &NodeError::SingularMatrix);
    }

    #[test]
    fn test_result_ext_converts_shape_errors() {
        let result: Result<(), ShapeFormatError> = Err(ShapeFormatError::new("x"));
        let err = result.context("Ones array creation failed").unwrap_err();
        assert!(matches!(err.root(), NodeError::Shape(_)));
    }
}
