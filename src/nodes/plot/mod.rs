//! Coordinate transforms behind the plotting nodes

pub mod coords;

use crate::nodes::factory::NodeRegistry;

pub fn register_all(registry: &mut NodeRegistry) {
    registry.register::<coords::TernaryToCartesianFactory>();
    registry.register::<coords::PolarToCartesianFactory>();
}
