//! Elementwise arithmetic nodes

pub mod binary;
pub mod scalar;
pub mod unary;

use crate::errstate::ErrorMode;
use crate::nodes::factory::{DataType, NodeRegistry, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, ParameterDefinition};

pub fn register_all(registry: &mut NodeRegistry) {
    registry.register::<binary::ArrayAddFactory>();
    registry.register::<binary::ArraySubtractFactory>();
    registry.register::<binary::ArrayMultiplyFactory>();
    registry.register::<binary::ArrayDivideFactory>();
    registry.register::<binary::ArrayPowerFactory>();
    registry.register::<unary::ArrayAbsFactory>();
    registry.register::<unary::ArraySqrtFactory>();
    registry.register::<unary::ArraySinFactory>();
    registry.register::<unary::ArrayCosFactory>();
    registry.register::<scalar::ScalarMultiplyFactory>();
    registry.register::<scalar::ScalarSubtractFactory>();
    registry.register::<scalar::ScalarDivideFactory>();
    registry.register::<scalar::ScalarModFactory>();
    registry.register::<scalar::ScalarPowerFactory>();
    registry.register::<scalar::ScalarEqualFactory>();
    registry.register::<scalar::ScalarLessEqualFactory>();
}

/// Ignore / warn / raise selector for a floating-point event class
pub(crate) fn error_mode_parameter(name: &str, tooltip: &str) -> ParameterDefinition {
    ParameterDefinition::new(name, InterfaceParameter::choice(ErrorMode::Warn.name(), ErrorMode::options()))
        .with_tooltip(tooltip)
}

pub(crate) fn result_output(description: &str) -> PortDefinition {
    PortDefinition::required("Result", DataType::Array).with_description(description)
}
