//! Random array node

use std::str::FromStr;

use ndarray::{ArrayD, IxDyn};
use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{array_output, sample_count, shape_parameter};
use crate::constants::defaults;
use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{NodeCategory, NodeFactory, NodeMetadata};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    Uniform,
    Normal,
    RandInt,
}

impl FromStr for Distribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(Distribution::Uniform),
            "normal" => Ok(Distribution::Normal),
            "randint" => Ok(Distribution::RandInt),
            other => Err(format!("unknown distribution '{}'", other)),
        }
    }
}

#[derive(Default)]
pub struct ArrayRandomFactory;

impl NodeFactory for ArrayRandomFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "ArrayRandom",
            "Random Array",
            NodeCategory::creation(),
            "Creates an array of random samples",
        )
        .with_parameters(vec![
            shape_parameter(defaults::SHAPE),
            ParameterDefinition::new(
                "Distribution",
                InterfaceParameter::choice("uniform", vec!["uniform".into(), "normal".into(), "randint".into()]),
            )
            .with_tooltip("uniform: [min, max), normal: mean/std, randint: integers in [min, max]"),
            ParameterDefinition::new("Min", InterfaceParameter::float(0.0)),
            ParameterDefinition::new("Max", InterfaceParameter::float(1.0)),
            ParameterDefinition::new("Mean", InterfaceParameter::float(0.0)),
            ParameterDefinition::new("Std", InterfaceParameter::float_range(1.0, 0.001, 1000.0, 0.001)),
            ParameterDefinition::new("Seed", InterfaceParameter::integer(-1, -1, i64::MAX))
                .with_tooltip("Random seed, -1 for an unseeded generator"),
        ])
        .with_outputs(vec![array_output("The random samples")])
        .with_tags(vec!["numpy", "creation", "random"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let shape = inputs.shape("Shape")?;
            let distribution: Distribution = inputs.choice("Distribution")?;
            let seed = inputs.integer("Seed")?;
            let mut rng = if seed >= 0 {
                StdRng::seed_from_u64(seed as u64)
            } else {
                StdRng::from_os_rng()
            };

            let extents = shape.extents()?;
            let count = sample_count(&shape)?;
            let (samples, dtype) = match distribution {
                Distribution::Uniform => {
                    let (min, max) = (inputs.float("Min")?, inputs.float("Max")?);
                    (uniform(&mut rng, min, max, count)?, DType::Float64)
                }
                Distribution::Normal => {
                    let (mean, std) = (inputs.float("Mean")?, inputs.float("Std")?);
                    (normal(&mut rng, mean, std, count), DType::Float64)
                }
                Distribution::RandInt => {
                    let (min, max) = (inputs.float("Min")?, inputs.float("Max")?);
                    (randint(&mut rng, min, max, count)?, DType::Int64)
                }
            };

            let values = ArrayD::from_shape_vec(IxDyn(&extents), samples)
                .map_err(|e| NodeError::ShapeMismatch(e.to_string()))?;
            Ok(vec![NumArray::new(values, dtype).into()])
        };
        run().context("Random array creation failed")
    }
}

fn uniform(rng: &mut impl Rng, min: f64, max: f64, count: usize) -> NodeResult<Vec<f64>> {
    if min > max {
        return Err(NodeError::InvalidParameter {
            name: "Min".to_string(),
            reason: format!("min ({}) must not exceed max ({})", min, max),
        });
    }
    if min == max {
        return Ok(vec![min; count]);
    }
    let range = Uniform::new(min, max).map_err(|e| NodeError::InvalidParameter {
        name: "Max".to_string(),
        reason: format!("cannot sample uniformly from [{}, {}): {}", min, max, e),
    })?;
    Ok((0..count).map(|_| rng.sample(&range)).collect())
}

/// Box-Muller transform over two uniform samples
fn normal(rng: &mut impl Rng, mean: f64, std: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|_| {
            let u1 = 1.0 - rng.random::<f64>();
            let u2 = rng.random::<f64>();
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            mean + std * z
        })
        .collect()
}

/// Integers in `[min, max]`, truncated toward zero; `max < min` collapses to `min`
fn randint(rng: &mut impl Rng, min: f64, max: f64, count: usize) -> NodeResult<Vec<f64>> {
    for (name, value) in [("Min", min), ("Max", max)] {
        if !value.is_finite() {
            return Err(NodeError::InvalidParameter {
                name: name.to_string(),
                reason: format!("{} is not a finite bound", value),
            });
        }
    }
    let low = min as i64;
    let high = (max as i64).max(low);
    Ok((0..count).map(|_| rng.random_range(low..=high) as f64).collect())
}
