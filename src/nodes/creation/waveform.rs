//! Sampled sine and cosine nodes
//!
//! Both sample `amplitude * f(2π * frequency * x + phase) + offset` over a
//! linspace of `[start, stop]` with as many points as the shape holds.

use std::f64::consts::{PI, TAU};

use super::{array_output, sample_count, shape_parameter, shaped};
use crate::constants::defaults;
use crate::error::{NodeResult, ResultExt};
use crate::nodes::data::NodeData;
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
use crate::nodes::math_utils::linspace;

fn waveform_parameters() -> Vec<ParameterDefinition> {
    vec![
        shape_parameter(defaults::SIGNAL_SHAPE),
        ParameterDefinition::new("Start", InterfaceParameter::float(0.0)).with_tooltip("First sample position"),
        ParameterDefinition::new("Stop", InterfaceParameter::float(TAU)).with_tooltip("Last sample position"),
        ParameterDefinition::new("Amplitude", InterfaceParameter::float(1.0)),
        ParameterDefinition::new("Frequency", InterfaceParameter::float(1.0)),
        ParameterDefinition::new("Phase", InterfaceParameter::float(0.0)).with_tooltip("Phase in radians"),
        ParameterDefinition::new("Offset", InterfaceParameter::float(0.0)).with_tooltip("Vertical offset"),
    ]
}

fn sample(inputs: &NodeInputs, wave: fn(f64) -> f64) -> NodeResult<Vec<NodeData>> {
    let shape = inputs.shape("Shape")?;
    let count = sample_count(&shape)?;
    let amplitude = inputs.float("Amplitude")?;
    let frequency = inputs.float("Frequency")?;
    let phase = inputs.float("Phase")?;
    let offset = inputs.float("Offset")?;

    let samples = linspace(inputs.float("Start")?, inputs.float("Stop")?, count, true)
        .into_iter()
        .map(|x| amplitude * wave(2.0 * PI * frequency * x + phase) + offset)
        .collect();
    Ok(vec![shaped(&shape, samples)?.into()])
}

#[derive(Default)]
pub struct ArraySineFactory;

impl NodeFactory for ArraySineFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new("ArraySine", "Sine Array", NodeCategory::creation(), "Creates a sampled sine wave")
            .with_parameters(waveform_parameters())
            .with_outputs(vec![array_output("The sine samples")])
            .with_tags(vec!["numpy", "creation", "signal"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        sample(inputs, f64::sin).context("Sine array creation failed")
    }
}

#[derive(Default)]
pub struct ArrayCosineFactory;

impl NodeFactory for ArrayCosineFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayCosine",
            "Cosine Array",
            NodeCategory::creation(),
            "Creates a sampled cosine wave",
        )
        .with_parameters(waveform_parameters())
        .with_outputs(vec![array_output("The cosine samples")])
        .with_tags(vec!["numpy", "creation", "signal"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        sample(inputs, f64::cos).context("Cosine array creation failed")
    }
}
