//! Sampled exponential, power and logarithm curves
//!
//! Each node evaluates its function over a linspace of `[start, stop]` with as
//! many points as the shape holds. A curve that overflows or leaves the
//! function's domain is an error, never a silent NaN.

use std::f64::consts::PI;

use super::{array_output, sample_count, shape_parameter, shaped};
use crate::constants::defaults;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::NodeData;
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
use crate::nodes::math_utils::linspace;

fn range_parameters(start: f64, stop: f64) -> Vec<ParameterDefinition> {
    vec![
        shape_parameter(defaults::SIGNAL_SHAPE),
        ParameterDefinition::new("Start", InterfaceParameter::float(start)).with_tooltip("First sample position"),
        ParameterDefinition::new("Stop", InterfaceParameter::float(stop)).with_tooltip("Last sample position"),
    ]
}

fn invalid(name: &str, reason: &str) -> NodeError {
    NodeError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Sample `curve` over the node's range and lay the result out in its shape
fn sample_curve(inputs: &NodeInputs, curve: impl Fn(f64) -> f64) -> NodeResult<Vec<NodeData>> {
    let shape = inputs.shape("Shape")?;
    let count = sample_count(&shape)?;
    let samples: Vec<f64> = linspace(inputs.float("Start")?, inputs.float("Stop")?, count, true)
        .into_iter()
        .map(curve)
        .collect();
    if samples.iter().any(|v| !v.is_finite()) {
        return Err(NodeError::Computation(
            "result contains infinite or NaN values, adjust the parameter range".to_string(),
        ));
    }
    Ok(vec![shaped(&shape, samples)?.into()])
}

fn require_increasing(inputs: &NodeInputs) -> NodeResult<()> {
    if inputs.float("Start")? >= inputs.float("Stop")? {
        return Err(invalid("Start", "must be less than Stop"));
    }
    Ok(())
}

/// `coefficient * base^(rate * x) + offset`
#[derive(Default)]
pub struct ArrayExponentialFactory;

impl NodeFactory for ArrayExponentialFactory {
    fn metadata() -> NodeMetadata {
        let mut parameters = range_parameters(0.0, 5.0);
        parameters.extend([
            ParameterDefinition::new("Base", InterfaceParameter::float(2.718)).with_tooltip("2.718 approximates e"),
            ParameterDefinition::new("Rate", InterfaceParameter::float(1.0)).with_tooltip("Multiplies x in the exponent"),
            ParameterDefinition::new("Coefficient", InterfaceParameter::float(1.0)),
            ParameterDefinition::new("Offset", InterfaceParameter::float(0.0)),
        ]);
        NodeMetadata::new(
            "ArrayExponential",
            "Exponential Array",
            NodeCategory::creation(),
            "Samples coefficient * base^(rate * x) + offset",
        )
        .with_parameters(parameters)
        .with_outputs(vec![array_output("The exponential samples")])
        .with_tags(vec!["numpy", "creation", "function"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let base = inputs.float("Base")?;
            let rate = inputs.float("Rate")?;
            let coefficient = inputs.float("Coefficient")?;
            let offset = inputs.float("Offset")?;
            sample_curve(inputs, |x| coefficient * base.powf(rate * x) + offset)
        };
        run().context("Exponential array creation failed")
    }
}

/// Real part of `z^exponent`, so a negative base with a fractional exponent
/// gives `|z|^exponent * cos(exponent * pi)`
fn real_power(z: f64, exponent: f64) -> f64 {
    if z < 0.0 && exponent.fract() != 0.0 {
        z.abs().powf(exponent) * (exponent * PI).cos()
    } else {
        z.powf(exponent)
    }
}

/// `amplitude * (scale * x)^exponent + offset`
#[derive(Default)]
pub struct ArrayPowerFunctionFactory;

impl NodeFactory for ArrayPowerFunctionFactory {
    fn metadata() -> NodeMetadata {
        let mut parameters = range_parameters(0.0, 10.0);
        parameters.extend([
            ParameterDefinition::new("Exponent", InterfaceParameter::float(2.0)),
            ParameterDefinition::new("Scale", InterfaceParameter::float(1.0)).with_tooltip("Multiplies x before the power"),
            ParameterDefinition::new("Amplitude", InterfaceParameter::float(1.0)),
            ParameterDefinition::new("Offset", InterfaceParameter::float(0.0)),
        ]);
        NodeMetadata::new(
            "ArrayPowerFunction",
            "Power Function Array",
            NodeCategory::creation(),
            "Samples amplitude * (scale * x)^exponent + offset",
        )
        .with_parameters(parameters)
        .with_outputs(vec![array_output("The power function samples")])
        .with_tags(vec!["numpy", "creation", "function"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            require_increasing(inputs)?;
            let exponent = inputs.float("Exponent")?;
            let scale = inputs.float("Scale")?;
            let amplitude = inputs.float("Amplitude")?;
            let offset = inputs.float("Offset")?;
            sample_curve(inputs, |x| amplitude * real_power(scale * x, exponent) + offset)
        };
        run().context("Power function array creation failed")
    }
}

/// `amplitude * log_base(scale * x) + offset`
#[derive(Default)]
pub struct ArrayLogarithmFactory;

impl NodeFactory for ArrayLogarithmFactory {
    fn metadata() -> NodeMetadata {
        let mut parameters = range_parameters(0.1, 10.0);
        parameters.extend([
            ParameterDefinition::new("Base", InterfaceParameter::float(2.718))
                .with_tooltip("Positive and not 1; 2.718 approximates e"),
            ParameterDefinition::new("Scale", InterfaceParameter::float(1.0)).with_tooltip("Multiplies x inside the log"),
            ParameterDefinition::new("Amplitude", InterfaceParameter::float(1.0)),
            ParameterDefinition::new("Offset", InterfaceParameter::float(0.0)),
        ]);
        NodeMetadata::new(
            "ArrayLogarithm",
            "Logarithm Array",
            NodeCategory::creation(),
            "Samples amplitude * log_base(scale * x) + offset",
        )
        .with_parameters(parameters)
        .with_outputs(vec![array_output("The logarithm samples")])
        .with_tags(vec!["numpy", "creation", "function"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            if inputs.float("Start")? <= 0.0 || inputs.float("Stop")? <= 0.0 {
                return Err(invalid("Start", "start and stop must be positive"));
            }
            let base = inputs.float("Base")?;
            if base <= 0.0 || base == 1.0 {
                return Err(invalid("Base", "must be positive and not 1"));
            }
            require_increasing(inputs)?;

            let scale = inputs.float("Scale")?;
            let amplitude = inputs.float("Amplitude")?;
            let offset = inputs.float("Offset")?;
            let ln_base = base.ln();
            sample_curve(inputs, |x| amplitude * (scale * x).ln() / ln_base + offset)
        };
        run().context("Logarithm array creation failed")
    }
}
