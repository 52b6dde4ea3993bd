//! Single-node execution: schema checks, defaults and dispatch by node type

use log::{debug, error, warn};

use crate::error::{NodeError, NodeResult};
use crate::nodes::data::NodeData;
use crate::nodes::factory::{NodeMetadata, NodeRegistry, REGISTRY};
use crate::nodes::interface::NodeInputs;

/// Runs nodes from a registry on behalf of the host
pub struct NodeExecutor<'a> {
    registry: &'a NodeRegistry,
}

impl NodeExecutor<'static> {
    /// Executor over the process-wide built-in registry
    pub fn builtin() -> Self {
        Self { registry: &REGISTRY }
    }
}

impl<'a> NodeExecutor<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    /// Check ports against the schema and fill in parameter defaults
    pub fn prepare_inputs(&self, metadata: &NodeMetadata, provided: &NodeInputs) -> NodeResult<NodeInputs> {
        let mut prepared = NodeInputs::new();

        for port in &metadata.inputs {
            match provided.get(&port.name) {
                Some(value) if port.data_type.accepts(value) => prepared.insert(&port.name, value.clone()),
                Some(value) => {
                    return Err(NodeError::TypeMismatch {
                        name: port.name.clone(),
                        expected: port.data_type.name(),
                        got: value.type_name(),
                    })
                }
                None if port.optional => {}
                None => return Err(NodeError::MissingInput(port.name.clone())),
            }
        }

        for parameter in &metadata.parameters {
            let value = match provided.get(&parameter.name) {
                Some(value) => parameter.widget.validate(&parameter.name, value)?,
                None => parameter.widget.default_value(),
            };
            prepared.insert(&parameter.name, value);
        }

        for (name, _) in provided.iter() {
            let known = metadata.inputs.iter().any(|p| p.name == name) || metadata.parameter(name).is_some();
            if !known {
                debug!("{}: ignoring unknown input '{}'", metadata.node_type, name);
            }
        }

        Ok(prepared)
    }

    /// Execute one node and return its outputs in declaration order
    pub fn execute(&self, node_type: &str, provided: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let (metadata, processor) = match (self.registry.metadata(node_type), self.registry.processor(node_type)) {
            (Some(metadata), Some(processor)) => (metadata, processor),
            _ => return Err(NodeError::UnknownNodeType(node_type.to_string())),
        };

        let inputs = self.prepare_inputs(&metadata, provided)?;
        debug!("Executing {} node", node_type);

        match processor(&inputs) {
            Ok(outputs) => {
                if outputs.len() != metadata.outputs.len() {
                    warn!(
                        "{} produced {} outputs, schema declares {}",
                        node_type,
                        outputs.len(),
                        metadata.outputs.len()
                    );
                }
                Ok(outputs)
            }
            Err(e) => {
                error!("{} failed: {}", node_type, e);
                Err(e)
            }
        }
    }
}
