//! Node factory system with self-registration and rich metadata

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::NodeResult;
use crate::nodes::data::NodeData;
use crate::nodes::interface::{NodeInputs, ParameterDefinition};

/// Data types that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Float,
    Integer,
    Boolean,
    String,
    /// N-dimensional numeric array
    Array,
    /// Any type (for generic ports)
    Any,
}

impl DataType {
    /// Check if this data type can connect to another
    pub fn can_connect_to(&self, other: &DataType) -> bool {
        self == other || *self == DataType::Any || *other == DataType::Any
    }

    /// Get a human-readable name for this data type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Float => "Float",
            DataType::Integer => "Integer",
            DataType::Boolean => "Boolean",
            DataType::String => "String",
            DataType::Array => "Array",
            DataType::Any => "Any",
        }
    }

    /// Whether a concrete value may travel through a port of this type
    pub fn accepts(&self, data: &NodeData) -> bool {
        match (self, data) {
            (DataType::Any, _) => true,
            (DataType::Float, NodeData::Float(_) | NodeData::Integer(_)) => true,
            (DataType::Integer, NodeData::Integer(_)) => true,
            (DataType::Boolean, NodeData::Boolean(_)) => true,
            (DataType::String, NodeData::String(_)) => true,
            (DataType::Array, NodeData::Array(_)) => true,
            _ => false,
        }
    }
}

/// Hierarchical category system for organizing nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeCategory {
    path: Vec<String>,
}

impl NodeCategory {
    /// Create a new category from path components
    pub fn new(path: &[&str]) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Get the category name (last component)
    pub fn name(&self) -> &str {
        self.path.last().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn parent(&self) -> Option<NodeCategory> {
        if self.path.len() > 1 {
            Some(NodeCategory {
                path: self.path[..self.path.len() - 1].to_vec(),
            })
        } else {
            None
        }
    }

    /// Check if this category is a child of another
    pub fn is_child_of(&self, other: &NodeCategory) -> bool {
        self.path.len() > other.path.len() && self.path[..other.path.len()] == other.path
    }

    /// Same category re-rooted under a different top-level name
    pub fn with_root(&self, root: &str) -> Self {
        let mut path = self.path.clone();
        match path.first_mut() {
            Some(first) => *first = root.to_string(),
            None => path.push(root.to_string()),
        }
        Self { path }
    }

    /// Host-facing category string, e.g. `NumPy/Array Creation`
    pub fn display_string(&self) -> String {
        self.path.join("/")
    }
}

// Standard categories
impl NodeCategory {
    pub fn creation() -> Self {
        Self::new(&["NumPy", "Array Creation"])
    }
    pub fn arithmetic() -> Self {
        Self::new(&["NumPy", "Array Arithmetic"])
    }
    pub fn scalar() -> Self {
        Self::new(&["NumPy", "Scalar Arithmetic"])
    }
    pub fn manipulation() -> Self {
        Self::new(&["NumPy", "Array Manipulation"])
    }
    pub fn linalg() -> Self {
        Self::new(&["NumPy", "Linear Algebra"])
    }
    pub fn plot_coordinates() -> Self {
        Self::new(&["NumPy", "Plot Coordinates"])
    }
}

/// Port definition for node creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDefinition {
    pub name: String,
    pub data_type: DataType,
    pub optional: bool,
    pub description: Option<String>,
}

impl PortDefinition {
    /// Create a required port
    pub fn required(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            optional: false,
            description: None,
        }
    }

    /// Create an optional port
    pub fn optional(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            optional: true,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Processing cost hint for scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingCost {
    Minimal, // elementwise, O(n)
    Low,
    Medium, // O(n^3) matrix work
    High,
}

/// Rich metadata for nodes - the single source of truth for node behavior
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetadata {
    pub node_type: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub category: NodeCategory,
    pub tags: Vec<&'static str>,
    pub inputs: Vec<PortDefinition>,
    pub parameters: Vec<ParameterDefinition>,
    pub outputs: Vec<PortDefinition>,
    pub processing_cost: ProcessingCost,
}

impl NodeMetadata {
    /// Create node metadata with sensible defaults
    pub fn new(
        node_type: &'static str,
        display_name: &'static str,
        category: NodeCategory,
        description: &'static str,
    ) -> Self {
        Self {
            node_type,
            display_name,
            description,
            version: "1.0",
            category,
            tags: vec![],
            inputs: vec![],
            parameters: vec![],
            outputs: vec![],
            processing_cost: ProcessingCost::Minimal,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<PortDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterDefinition>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PortDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_tags(mut self, tags: Vec<&'static str>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_processing_cost(mut self, cost: ProcessingCost) -> Self {
        self.processing_cost = cost;
        self
    }

    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Node factory trait: metadata plus the single library call behind it
pub trait NodeFactory: Send + Sync {
    /// Get comprehensive node metadata
    fn metadata() -> NodeMetadata
    where
        Self: Sized;

    /// Compute outputs, in the order declared by `metadata().outputs`
    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>>
    where
        Self: Sized;
}

type MetadataProvider = fn() -> NodeMetadata;
type NodeProcessor = fn(&NodeInputs) -> NodeResult<Vec<NodeData>>;

/// Serialisable summary of one registered node, for hosts building menus
#[derive(Debug, Clone, Serialize)]
pub struct CatalogueEntry {
    /// Unique host-facing name, `<prefix>_<node_type>`
    pub unique_name: String,
    pub display_name: &'static str,
    pub category: String,
    pub metadata: NodeMetadata,
}

/// Registry for managing node factories
pub struct NodeRegistry {
    metadata_providers: BTreeMap<String, MetadataProvider>,
    processors: BTreeMap<String, NodeProcessor>,
    categories: HashMap<NodeCategory, Vec<String>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            metadata_providers: BTreeMap::new(),
            processors: BTreeMap::new(),
            categories: HashMap::new(),
        }
    }

    /// Registry holding every node of this pack
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::nodes::creation::register_all(&mut registry);
        crate::nodes::arithmetic::register_all(&mut registry);
        crate::nodes::manipulation::register_all(&mut registry);
        crate::nodes::linalg::register_all(&mut registry);
        crate::nodes::plot::register_all(&mut registry);
        info!("Registered {} numeric node types", registry.len());
        registry
    }

    /// Register a node factory
    pub fn register<T: NodeFactory + 'static>(&mut self) {
        let metadata = T::metadata();
        let node_type = metadata.node_type.to_string();

        if self.processors.contains_key(&node_type) {
            warn!("Node type '{}' registered twice, replacing", node_type);
        } else {
            self.categories
                .entry(metadata.category.clone())
                .or_default()
                .push(node_type.clone());
        }

        debug!("Registering node type: {}", node_type);
        self.metadata_providers.insert(node_type.clone(), T::metadata);
        self.processors.insert(node_type, T::process);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.processors.contains_key(node_type)
    }

    pub fn metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.metadata_providers.get(node_type).map(|provider| provider())
    }

    pub fn processor(&self, node_type: &str) -> Option<NodeProcessor> {
        self.processors.get(node_type).copied()
    }

    /// All registered node types, sorted
    pub fn node_types(&self) -> Vec<&str> {
        self.processors.keys().map(|k| k.as_str()).collect()
    }

    /// Node types registered under a category, in registration order
    pub fn nodes_in_category(&self, category: &NodeCategory) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|types| types.iter().map(|t| t.as_str()).collect())
            .unwrap_or_default()
    }

    /// Categories in sorted order
    pub fn categories(&self) -> Vec<&NodeCategory> {
        let mut categories: Vec<_> = self.categories.keys().collect();
        categories.sort();
        categories
    }

    /// Host-facing listing of every node with `prefix` as the category root
    pub fn catalogue(&self, prefix: &str) -> Vec<CatalogueEntry> {
        self.metadata_providers
            .values()
            .map(|provider| {
                let mut metadata = provider();
                metadata.category = metadata.category.with_root(prefix);
                CatalogueEntry {
                    unique_name: format!("{}_{}", prefix, metadata.node_type),
                    display_name: metadata.display_name,
                    category: metadata.category.display_string(),
                    metadata,
                }
            })
            .collect()
    }
}

/// Process-wide registry of the built-in nodes
pub static REGISTRY: Lazy<NodeRegistry> = Lazy::new(NodeRegistry::builtin);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::creation::ones::ArrayOnesFactory;

    #[test]
    fn test_data_type_connections() {
        assert!(DataType::Array.can_connect_to(&DataType::Array));
        assert!(DataType::Any.can_connect_to(&DataType::Float));
        assert!(!DataType::Array.can_connect_to(&DataType::Float));
    }

    #[test]
    fn test_category_hierarchy() {
        let cat = NodeCategory::creation();
        assert_eq!(cat.name(), "Array Creation");
        assert_eq!(cat.parent(), Some(NodeCategory::new(&["NumPy"])));
        assert!(cat.is_child_of(&NodeCategory::new(&["NumPy"])));
        assert_eq!(cat.with_root("Np").display_string(), "Np/Array Creation");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = NodeRegistry::new();
        registry.register::<ArrayOnesFactory>();
        registry.register::<ArrayOnesFactory>();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("ArrayOnes"));
        assert_eq!(registry.nodes_in_category(&NodeCategory::creation()), vec!["ArrayOnes"]);
        assert!(registry.metadata("Nope").is_none());
    }

    #[test]
    fn test_catalogue_uses_prefix() {
        let mut registry = NodeRegistry::new();
        registry.register::<ArrayOnesFactory>();
        let entries = registry.catalogue("NumPy");
        assert_eq!(entries[0].unique_name, "NumPy_ArrayOnes");
        assert_eq!(entries[0].category, "NumPy/Array Creation");
    }
}
