//! Node system - array data, node factories and the built-in numeric nodes

// Core node system modules
pub mod data;
pub mod execution;
pub mod factory;
pub mod interface;
pub mod math_utils;

// Node implementations
pub mod arithmetic;
pub mod creation;
pub mod linalg;
pub mod manipulation;
pub mod plot;

// Re-export core types
pub use data::{DType, NodeData, NumArray};
pub use execution::NodeExecutor;
pub use factory::{
    CatalogueEntry, DataType, NodeCategory, NodeFactory, NodeMetadata, NodeRegistry, PortDefinition, REGISTRY,
};
pub use interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
