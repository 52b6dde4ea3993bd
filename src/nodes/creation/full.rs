//! Constant-filled array node

use super::{array_output, dtype_parameter, filled, shape_parameter};
use crate::constants::defaults;
use crate::error::{NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

/// Creates an array of the given shape filled with one value
#[derive(Default)]
pub struct ArrayFullFactory;

impl NodeFactory for ArrayFullFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayFull",
            "Filled Array",
            NodeCategory::creation(),
            "Creates an array of the given shape and data type filled with a value",
        )
        .with_parameters(vec![
            shape_parameter(defaults::SHAPE),
            ParameterDefinition::new("Fill Value", InterfaceParameter::float(1.0))
                .with_tooltip("Value written to every element"),
            dtype_parameter(),
        ])
        .with_outputs(vec![array_output("The filled array")])
        .with_tags(vec!["numpy", "creation", "full"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let shape = inputs.shape("Shape")?;
            let value = inputs.float("Fill Value")?;
            let dtype: DType = inputs.choice("Data Type")?;
            Ok(vec![filled(&shape, value, dtype)?.into()])
        };
        run().context("Filled array creation failed")
    }
}
