//! Ternary and polar coordinates to Cartesian points

use std::str::FromStr;

use ndarray::{Array2, Axis, Ix2};

use crate::error::{NodeError, NodeResult, ResultExt};
use crate::nodes::data::{NodeData, NumArray};
use crate::nodes::factory::{DataType, NodeCategory, NodeFactory, NodeMetadata, PortDefinition};
use crate::nodes::interface::{InterfaceParameter, NodeInputs, ParameterDefinition};
use crate::nodes::math_utils::broadcast_binary;

/// Height of the unit equilateral triangle
const TRIANGLE_HEIGHT: f64 = 0.866_025_403_784_438_6;

/// Map `(a, b, c)` rows onto the triangle (0,0), (1,0), (0.5, √3/2).
///
/// Components are used by magnitude; a row summing to zero maps to the origin.
pub fn ternary_to_cartesian(abc: &Array2<f64>) -> NodeResult<Array2<f64>> {
    if abc.ncols() != 3 {
        return Err(NodeError::InvalidShape(format!(
            "ternary data needs 3 columns, got {}",
            abc.ncols()
        )));
    }
    let mut points = Array2::zeros((abc.nrows(), 2));
    for (row, mut point) in abc.axis_iter(Axis(0)).zip(points.axis_iter_mut(Axis(0))) {
        let (a, b, c) = (row[0].abs(), row[1].abs(), row[2].abs());
        let total = match a + b + c {
            t if t == 0.0 => 1.0,
            t => t,
        };
        point[0] = 0.5 * (2.0 * b + c) / total;
        point[1] = TRIANGLE_HEIGHT * c / total;
    }
    Ok(points)
}

#[derive(Default)]
pub struct TernaryToCartesianFactory;

impl NodeFactory for TernaryToCartesianFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "TernaryToCartesian",
            "Ternary To Cartesian",
            NodeCategory::plot_coordinates(),
            "Projects three-component compositions onto an equilateral triangle",
        )
        .with_inputs(vec![PortDefinition::required("Data", DataType::Array)
            .with_description("n x 3 array of (a, b, c) components, or a single row of 3")])
        .with_outputs(vec![
            PortDefinition::required("Points", DataType::Array).with_description("n x 2 Cartesian points"),
            PortDefinition::required("X", DataType::Array),
            PortDefinition::required("Y", DataType::Array),
        ])
        .with_tags(vec!["plot", "ternary", "coordinates"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let data = inputs.array("Data")?;
            let abc = match data.ndim() {
                1 => data.values.view().insert_axis(Axis(0)).into_dimensionality::<Ix2>(),
                _ => data.values.view().into_dimensionality::<Ix2>(),
            }
            .map_err(|_| NodeError::InvalidShape(format!("ternary data must be 2-D, got shape {:?}", data.shape())))?;

            let points = ternary_to_cartesian(&abc.to_owned())?;
            let x = points.column(0).to_owned().into_dyn();
            let y = points.column(1).to_owned().into_dyn();
            Ok(vec![
                NumArray::float(points.into_dyn()).into(),
                NumArray::float(x).into(),
                NumArray::float(y).into(),
            ])
        };
        run().context("Ternary conversion failed")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Radians,
    Degrees,
}

impl FromStr for AngleUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "radians" => Ok(AngleUnit::Radians),
            "degrees" => Ok(AngleUnit::Degrees),
            other => Err(format!("unknown angle unit '{}'", other)),
        }
    }
}

#[derive(Default)]
pub struct PolarToCartesianFactory;

impl NodeFactory for PolarToCartesianFactory {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            "PolarToCartesian",
            "Polar To Cartesian",
            NodeCategory::plot_coordinates(),
            "Converts angle and radius samples to x and y",
        )
        .with_inputs(vec![
            PortDefinition::required("Theta", DataType::Array).with_description("Angles"),
            PortDefinition::required("R", DataType::Array).with_description("Radii, broadcast against theta"),
        ])
        .with_parameters(vec![ParameterDefinition::new(
            "Angle Unit",
            InterfaceParameter::choice("radians", vec!["radians".into(), "degrees".into()]),
        )])
        .with_outputs(vec![
            PortDefinition::required("X", DataType::Array),
            PortDefinition::required("Y", DataType::Array),
        ])
        .with_tags(vec!["plot", "polar", "coordinates"])
    }

    fn process(inputs: &NodeInputs) -> NodeResult<Vec<NodeData>> {
        let run = || -> NodeResult<Vec<NodeData>> {
            let theta = inputs.array("Theta")?;
            let r = inputs.array("R")?;
            let unit: AngleUnit = inputs.choice("Angle Unit")?;
            let theta = match unit {
                AngleUnit::Radians => theta.values.clone(),
                AngleUnit::Degrees => theta.values.mapv(f64::to_radians),
            };

            let x = broadcast_binary(&theta, &r.values, false, |t, r| r * t.cos())?;
            let y = broadcast_binary(&theta, &r.values, false, |t, r| r * t.sin())?;
            Ok(vec![NumArray::float(x).into(), NumArray::float(y).into()])
        };
        run().context("Polar conversion failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::math_utils::approx_eq;
    use ndarray::array;

    #[test]
    fn test_triangle_vertices() {
        let points = ternary_to_cartesian(&array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]).unwrap();
        assert_eq!(points.row(0).to_vec(), vec![0.0, 0.0]);
        assert_eq!(points.row(1).to_vec(), vec![1.0, 0.0]);
        assert!(approx_eq(points[[2, 0]], 0.5));
        assert!(approx_eq(points[[2, 1]], 3f64.sqrt() / 2.0));
    }

    #[test]
    fn test_rows_are_normalised() {
        let scaled = ternary_to_cartesian(&array![[2.0, 2.0, 2.0]]).unwrap();
        let unit = ternary_to_cartesian(&array![[1.0, 1.0, 1.0]]).unwrap();
        assert!(approx_eq(scaled[[0, 0]], unit[[0, 0]]));
        assert!(approx_eq(scaled[[0, 1]], unit[[0, 1]]));
        assert!(approx_eq(unit[[0, 0]], 0.5));
    }

    #[test]
    fn test_zero_row_maps_to_origin() {
        let points = ternary_to_cartesian(&array![[0.0, 0.0, 0.0]]).unwrap();
        assert_eq!(points.row(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_ternary_node_shapes() {
        let inputs = NodeInputs::new().with("Data", NumArray::from_vec(vec![0.0, 1.0, 0.0]));
        let out = TernaryToCartesianFactory::process(&inputs).unwrap();
        assert_eq!(out[0].as_array().unwrap().shape(), &[1, 2]);
        assert_eq!(out[1].as_f64(), Some(1.0));
        assert_eq!(out[2].as_f64(), Some(0.0));

        let bad = NodeInputs::new().with("Data", NumArray::from_shape_vec(&[2, 2], vec![0.0; 4]).unwrap());
        assert!(TernaryToCartesianFactory::process(&bad).is_err());
    }

    #[test]
    fn test_polar_degrees() {
        let inputs = NodeInputs::new()
            .with("Theta", NumArray::from_vec(vec![0.0, 90.0, 180.0]))
            .with("R", NumArray::scalar(2.0))
            .with("Angle Unit", NodeData::String("degrees".into()));
        let out = PolarToCartesianFactory::process(&inputs).unwrap();
        let x: Vec<f64> = out[0].as_array().unwrap().values.iter().copied().collect();
        let y: Vec<f64> = out[1].as_array().unwrap().values.iter().copied().collect();
        for (got, want) in x.iter().zip([2.0, 0.0, -2.0]) {
            assert!((got - want).abs() < 1e-12);
        }
        for (got, want) in y.iter().zip([0.0, 2.0, 0.0]) {
            assert!((got - want).abs() < 1e-12);
        }
    }
}
