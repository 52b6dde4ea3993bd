//! Nodle numeric node pack
//!
//! Array creation, arithmetic, manipulation, linear algebra and plotting
//! helper nodes over n-dimensional arrays, plus the shape-string parser and
//! scoped floating-point error handling they share.

pub mod config;
pub mod constants;
pub mod error;
pub mod errstate;
pub mod nodes;
pub mod shape;

// Re-export commonly used types
pub use config::PackConfig;
pub use error::{FloatingPointError, NodeError, NodeResult, ShapeFormatError};
pub use errstate::{ErrStateGuard, ErrorMode, FloatErrorSettings};
pub use nodes::{NodeData, NodeExecutor, NodeInputs, NumArray, REGISTRY};
pub use shape::{parse_axes, parse_shape, Shape};
