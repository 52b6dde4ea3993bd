//! Array-with-scalar nodes
//!
//! Each node combines the `Array` port with the `Scalar` parameter. The
//! non-commutative ones take an `Order` so `scalar - array` is reachable
//! without an extra negate node.

use std::str::FromStr;

use ndarray::{ArrayD, IxDyn};

use super::{error_mode_parameter, result_output};
use crate::errstate::{ErrStateGuard, ErrorMode};
use crate::error::{NodeResult, ResultExt};
use crate::nodes::data::{DType, NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
use crate::nodes::math_utils::broadcast_binary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// `array op scalar`
    ArrayFirst,
    /// `scalar op array`
    ScalarFirst,
}

impl Order {
    pub fn options() -> Vec<String> {
        vec!["array-scalar".into(), "scalar-array".into()]
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "array-scalar" => Ok(Order::ArrayFirst),
            "scalar-array" => Ok(Order::ScalarFirst),
            other => Err(format!("unknown operand order '{}'", other)),
        }
    }
}

fn scalar_metadata(node_type: &'static str, display_name: &'static str, description: &'static str) -> NodeMetadata {
    NodeMetadata::new(node_type, display_name, NodeCategory::scalar(), description)
        .with_inputs(vec![PortDefinition::required("Array", DataType::Array).with_description("Array operand")])
        .with_outputs(vec![result_output(description)])
        .with_tags(vec!["numpy", "arithmetic", "scalar"])
}

fn scalar_parameter(default: f64) -> ParameterDefinition {
    ParameterDefinition::new("Scalar", InterfaceParameter::float(default)).with_tooltip("Scalar operand")
}

fn order_parameter() -> ParameterDefinition {
    ParameterDefinition::new("Order", InterfaceParameter::choice("array-scalar", Order::options()))
        .with_tooltip("array-scalar computes array op scalar, scalar-array computes scalar op array")
}

/// The array dtype wins unless a fractional scalar forces integers to float64
fn result_dtype(array: DType, scalar: f64) -> DType {
    if array.is_float() || (scalar.is_finite() && scalar.fract() == 0.0) {
        array
    } else {
        DType::Float64
    }
}

/// Evaluate `op` between the array and the scalar, honouring `order`
fn with_scalar(
    array: &NumArray,
    scalar: f64,
    order: Order,
    division: bool,
    op: impl Fn(f64, f64) -> f64,
) -> NodeResult<ArrayD<f64>> {
    let scalar = ArrayD::from_elem(IxDyn(&[]), scalar);
    match order {
        Order::ArrayFirst => broadcast_binary(&array.values, &scalar, division, op),
        Order::ScalarFirst => broadcast_binary(&scalar, &array.values, division, op),
    }
}

/// Floored modulo; the result takes the sign of the divisor
pub fn floor_mod(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return f64::NAN;
    }
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

#[derive(Default)]
pub struct ScalarMultiplyFactory;

impl NodeFactory for ScalarMultiplyFactory {
    fn metadata() -> NodeMetadata {
        scalar_metadata("ScalarMultiply", "Scalar Multiply", "Multiplies every element by a scalar")
            .with_parameters(vec![scalar_parameter(1.0)])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let scalar = inputs.float("Scalar")?;
            let values = with_scalar(array, scalar, Order::ArrayFirst, false, |x, s| x * s)?;
            Ok(vec![NumArray::new(values, result_dtype(array.dtype, scalar)).into()])
        };
        run().context("Scalar multiplication failed")
    }
}

#[derive(Default)]
pub struct ScalarSubtractFactory;

impl NodeFactory for ScalarSubtractFactory {
    fn metadata() -> NodeMetadata {
        scalar_metadata("ScalarSubtract", "Scalar Subtract", "Subtracts between an array and a scalar")
            .with_parameters(vec![scalar_parameter(0.0), order_parameter()])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let scalar = inputs.float("Scalar")?;
            let order: Order = inputs.choice("Order")?;
            let values = with_scalar(array, scalar, order, false, |x, y| x - y)?;
            Ok(vec![NumArray::new(values, result_dtype(array.dtype, scalar)).into()])
        };
        run().context("Scalar subtraction failed")
    }
}

#[derive(Default)]
pub struct ScalarDivideFactory;

impl NodeFactory for ScalarDivideFactory {
    fn metadata() -> NodeMetadata {
        scalar_metadata("ScalarDivide", "Scalar Divide", "Divides between an array and a scalar").with_parameters(
            vec![
                scalar_parameter(1.0),
                order_parameter(),
                error_mode_parameter("Zero Division", "What to do when dividing by zero"),
            ],
        )
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let scalar = inputs.float("Scalar")?;
            let order: Order = inputs.choice("Order")?;
            let mode: ErrorMode = inputs.choice("Zero Division")?;
            let _errstate = ErrStateGuard::modify(|s| s.with_divide(mode).with_invalid(mode));
            let values = with_scalar(array, scalar, order, true, |x, y| x / y)?;
            Ok(vec![NumArray::float(values).into()])
        };
        run().context("Scalar division failed")
    }
}

#[derive(Default)]
pub struct ScalarModFactory;

impl NodeFactory for ScalarModFactory {
    fn metadata() -> NodeMetadata {
        scalar_metadata("ScalarMod", "Scalar Modulo", "Floored remainder between an array and a scalar")
            .with_parameters(vec![
                scalar_parameter(2.0),
                order_parameter(),
                error_mode_parameter("Zero Division", "What to do when taking a remainder by zero"),
            ])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let scalar = inputs.float("Scalar")?;
            let order: Order = inputs.choice("Order")?;
            let mode: ErrorMode = inputs.choice("Zero Division")?;
            let _errstate = ErrStateGuard::modify(|s| s.with_divide(mode).with_invalid(mode));
            let values = with_scalar(array, scalar, order, true, floor_mod)?;
            Ok(vec![NumArray::new(values, result_dtype(array.dtype, scalar)).into()])
        };
        run().context("Scalar modulo failed")
    }
}

#[derive(Default)]
pub struct ScalarPowerFactory;

impl NodeFactory for ScalarPowerFactory {
    fn metadata() -> NodeMetadata {
        scalar_metadata("ScalarPower", "Scalar Power", "Power between an array and a scalar").with_parameters(vec![
            scalar_parameter(2.0),
            order_parameter(),
            error_mode_parameter("Invalid Values", "What to do when a power has no real result"),
        ])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let scalar = inputs.float("Scalar")?;
            let order: Order = inputs.choice("Order")?;
            let mode: ErrorMode = inputs.choice("Invalid Values")?;
            let _errstate = ErrStateGuard::modify(|s| s.with_invalid(mode));
            let values = with_scalar(array, scalar, order, false, f64::powf)?;
            let dtype = if scalar < 0.0 { DType::Float64 } else { result_dtype(array.dtype, scalar) };
            Ok(vec![NumArray::new(values, dtype).into()])
        };
        run().context("Scalar power failed")
    }
}

/// Elementwise equality, optionally within an absolute tolerance
#[derive(Default)]
pub struct ScalarEqualFactory;

impl NodeFactory for ScalarEqualFactory {
    fn metadata() -> NodeMetadata {
        scalar_metadata("ScalarEqual", "Scalar Equal", "Compares every element with a scalar").with_parameters(vec![
            scalar_parameter(0.0),
            ParameterDefinition::new("Tolerance", InterfaceParameter::float_range(0.0, 0.0, f64::MAX, 1e-6))
                .with_tooltip("0 compares exactly, otherwise |a - scalar| <= tolerance"),
        ])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let scalar = inputs.float("Scalar")?;
            let tolerance = inputs.float("Tolerance")?;
            let values = if tolerance > 0.0 {
                array.values.mapv(|x| ((x - scalar).abs() <= tolerance) as u8 as f64)
            } else {
                array.values.mapv(|x| (x == scalar) as u8 as f64)
            };
            Ok(vec![NumArray::new(values, DType::Bool).into()])
        };
        run().context("Scalar comparison failed")
    }
}

#[derive(Default)]
pub struct ScalarLessEqualFactory;

impl NodeFactory for ScalarLessEqualFactory {
    fn metadata() -> NodeMetadata {
        scalar_metadata("ScalarLessEqual", "Scalar Less Equal", "Tests every element for <= against a scalar")
            .with_parameters(vec![scalar_parameter(0.0), order_parameter()])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let array = inputs.array("Array")?;
            let scalar = inputs.float("Scalar")?;
            let order: Order = inputs.choice("Order")?;
            let values = match order {
                Order::ArrayFirst => array.values.mapv(|x| (x <= scalar) as u8 as f64),
                Order::ScalarFirst => array.values.mapv(|x| (scalar <= x) as u8 as f64),
            };
            Ok(vec![NumArray::new(values, DType::Bool).into()])
        };
        run().context("Scalar comparison failed")
    }
}
