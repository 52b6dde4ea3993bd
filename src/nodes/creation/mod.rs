//! Array creation nodes

pub mod arange;
pub mod diag;
pub mod eye;
pub mod full;
pub mod functions;
pub mod ones;
pub mod random;
pub mod spacing;
pub mod waveform;

use ndarray::{ArrayD, IxDyn};

use crate::constants::{defaults, limits};
use crate::error::{NodeError, NodeResult};
use crate::nodes::data::{DType, NumArray};
use crate::nodes::factory::{DataType, NodeRegistry, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, ParameterDefinition};
use crate::shape::Shape;

pub fn register_all(registry: &mut NodeRegistry) {
    registry.register::<ones::ArrayOnesFactory>();
    registry.register::<ones::ArrayZerosFactory>();
    registry.register::<full::ArrayFullFactory>();
    registry.register::<arange::ArrayArangeFactory>();
    registry.register::<spacing::ArrayLinspaceFactory>();
    registry.register::<spacing::ArrayGeomspaceFactory>();
    registry.register::<eye::ArrayEyeFactory>();
    registry.register::<diag::ArrayDiagFactory>();
    registry.register::<random::ArrayRandomFactory>();
    registry.register::<waveform::ArraySineFactory>();
    registry.register::<waveform::ArrayCosineFactory>();
    registry.register::<functions::ArrayExponentialFactory>();
    registry.register::<functions::ArrayPowerFunctionFactory>();
    registry.register::<functions::ArrayLogarithmFactory>();
}

pub(crate) fn shape_parameter(default: &str) -> ParameterDefinition {
    ParameterDefinition::new("Shape", InterfaceParameter::shape(default)).with_tooltip(defaults::SHAPE_TOOLTIP)
}

pub(crate) fn dtype_parameter() -> ParameterDefinition {
    ParameterDefinition::new("Data Type", InterfaceParameter::choice("float64", DType::options()))
        .with_tooltip("Element data type")
}

pub(crate) fn array_output(description: &str) -> PortDefinition {
    PortDefinition::required("Array", DataType::Array).with_description(description)
}

/// Refuse element counts a creation node should not allocate
pub(crate) fn check_element_count(count: usize) -> NodeResult<()> {
    if count > limits::MAX_ELEMENTS {
        return Err(NodeError::InvalidShape(format!(
            "{} elements exceeds the limit of {}",
            count,
            limits::MAX_ELEMENTS
        )));
    }
    Ok(())
}

/// Element count of `shape`, checked against the allocation limit
pub(crate) fn sample_count(shape: &Shape) -> NodeResult<usize> {
    let count = shape.element_count()?;
    check_element_count(count)?;
    Ok(count)
}

/// Array of `shape` with every element set to `value`
pub(crate) fn filled(shape: &Shape, value: f64, dtype: DType) -> NodeResult<NumArray> {
    sample_count(shape)?;
    let extents = shape.extents()?;
    Ok(NumArray::new(ArrayD::from_elem(IxDyn(&extents), value), dtype))
}

/// Lay `samples` out in `shape`; the caller sizes `samples` from the shape
pub(crate) fn shaped(shape: &Shape, samples: Vec<f64>) -> NodeResult<NumArray> {
    sample_count(shape)?;
    NumArray::from_shape_vec(&shape.extents()?, samples)
}
