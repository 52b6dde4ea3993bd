//! Array manipulation nodes: layout changes, reductions, joins and splits

pub mod join;
pub mod reduce;
pub mod reshape;

use crate::error::{NodeError, NodeResult};
use crate::nodes::factory::{DataType, NodeRegistry, PortDefinition};
use crate::nodes::math_utils::normalize_axis;

pub fn register_all(registry: &mut NodeRegistry) {
    registry.register::<reshape::ArrayReshapeFactory>();
    registry.register::<reshape::ArrayFlattenFactory>();
    registry.register::<reshape::ArrayTransposeFactory>();
    registry.register::<reduce::ArraySumFactory>();
    registry.register::<reduce::ArrayMaxFactory>();
    registry.register::<join::ArrayConcatenateFactory>();
    registry.register::<join::ArrayStackFactory>();
    registry.register::<join::ArraySplitFactory>();
}

pub(crate) fn array_input() -> PortDefinition {
    PortDefinition::required("Array", DataType::Array).with_description("Input array")
}

/// Resolve an axis list against `ndim`, rejecting repeats
pub(crate) fn normalize_axes(axes: &[i64], ndim: usize) -> NodeResult<Vec<usize>> {
    let mut resolved = Vec::with_capacity(axes.len());
    for &axis in axes {
        let axis = normalize_axis(axis, ndim)?;
        if resolved.contains(&axis) {
            return Err(NodeError::InvalidParameter {
                name: "axis".to_string(),
                reason: format!("repeated axis {}", axis),
            });
        }
        resolved.push(axis);
    }
    Ok(resolved)
}
