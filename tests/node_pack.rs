use nodle_numeric::errstate::{self, ErrStateGuard, ErrorMode, FloatErrorSettings};
use nodle_numeric::nodes::{NodeCategory, NodeData, NodeExecutor, NodeInputs, NumArray, REGISTRY};
use nodle_numeric::{parse_axes, parse_shape, NodeError, Shape};

#[test]
fn registry_holds_every_category() {
    assert_eq!(REGISTRY.len(), 49);
    let expected = [
        (NodeCategory::creation(), 14),
        (NodeCategory::arithmetic(), 9),
        (NodeCategory::scalar(), 7),
        (NodeCategory::manipulation(), 8),
        (NodeCategory::linalg(), 9),
        (NodeCategory::plot_coordinates(), 2),
    ];
    for (category, count) in expected {
        assert_eq!(
            REGISTRY.nodes_in_category(&category).len(),
            count,
            "{}",
            category.display_string()
        );
    }
}

#[test]
fn catalogue_names_use_prefix() {
    let entries = REGISTRY.catalogue("Np");
    assert_eq!(entries.len(), REGISTRY.len());
    let ones = entries
        .iter()
        .find(|e| e.unique_name == "Np_ArrayOnes")
        .expect("ones node listed");
    assert_eq!(ones.category, "Np/Array Creation");
    assert!(entries.iter().all(|e| e.category.starts_with("Np/")));
}

#[test]
fn executor_fills_defaults_and_chains_nodes() {
    let executor = NodeExecutor::builtin();
    let eye = executor
        .execute("ArrayEye", &NodeInputs::new().with("Rows", NodeData::Integer(3)))
        .unwrap();
    let identity = eye[0].as_array().unwrap().clone();
    assert_eq!(identity.shape(), &[3, 3]);

    let inputs = NodeInputs::new()
        .with("A", identity.clone())
        .with("B", NumArray::from_vec(vec![1.0, 2.0, 3.0]));
    let product = executor.execute("MatrixMultiply", &inputs).unwrap();
    let values: Vec<f64> = product[0].as_array().unwrap().values.iter().copied().collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);

    let det = executor
        .execute("MatrixDeterminant", &NodeInputs::new().with("Matrix", identity))
        .unwrap();
    assert_eq!(det[0].as_f64(), Some(1.0));
}

#[test]
fn executor_rejects_bad_inputs() {
    let executor = NodeExecutor::builtin();

    let err = executor.execute("ArrayAbs", &NodeInputs::new()).unwrap_err();
    assert_eq!(err, NodeError::MissingInput("Array".into()));

    let err = executor
        .execute("ArrayAbs", &NodeInputs::new().with("Array", NodeData::String("x".into())))
        .unwrap_err();
    assert!(matches!(err, NodeError::TypeMismatch { .. }));

    let err = executor
        .execute(
            "ArrayOnes",
            &NodeInputs::new().with("Shape", NodeData::String("3 by 3".into())),
        )
        .unwrap_err();
    assert!(matches!(err.root(), NodeError::Shape(_)));
}

#[test]
fn shape_notations_through_public_api() {
    assert_eq!(parse_shape("10").unwrap(), Shape::Extent(10));
    assert_eq!(parse_shape("(100,)").unwrap(), Shape::Dims(vec![100]));
    assert_eq!(parse_shape(" 3, 3 ").unwrap(), Shape::Dims(vec![3, 3]));
    assert_eq!(parse_shape("()").unwrap(), Shape::Dims(vec![]));
    assert!(parse_shape("").is_err());
    assert!(parse_shape("(a, b)").is_err());
    assert_eq!(parse_axes("").unwrap(), None);
    assert_eq!(parse_axes("(1, 0)").unwrap(), Some(vec![1, 0]));
}

#[test]
fn node_error_modes_are_scoped() {
    let _outer = ErrStateGuard::new(FloatErrorSettings::all(ErrorMode::Raise));
    let executor = NodeExecutor::builtin();
    let inputs = NodeInputs::new()
        .with("A", NumArray::from_vec(vec![1.0, 0.0]))
        .with("B", NumArray::from_vec(vec![0.0, 0.0]))
        .with("Zero Division", NodeData::String("ignore".into()));

    let out = executor.execute("ArrayDivide", &inputs).unwrap();
    let values = &out[0].as_array().unwrap().values;
    assert_eq!(values[[0]], f64::INFINITY);
    assert!(values[[1]].is_nan());
    assert_eq!(errstate::current(), FloatErrorSettings::all(ErrorMode::Raise));

    let raising = inputs.with("Zero Division", NodeData::String("raise".into()));
    let err = executor.execute("ArrayDivide", &raising).unwrap_err();
    assert!(matches!(err.root(), NodeError::FloatingPoint(_)));
    assert_eq!(errstate::current(), FloatErrorSettings::all(ErrorMode::Raise));
}

#[test]
fn decomposition_nodes_run_with_defaults() {
    let executor = NodeExecutor::builtin();
    let matrix = NumArray::from_shape_vec(&[2, 2], vec![2.0, 1.0, 1.0, 2.0]).unwrap();

    let svd = executor
        .execute("MatrixSVD", &NodeInputs::new().with("Matrix", matrix.clone()))
        .unwrap();
    let singular: Vec<f64> = svd[1].as_array().unwrap().values.iter().copied().collect();
    assert!((singular[0] - 3.0).abs() < 1e-9 && (singular[1] - 1.0).abs() < 1e-9);

    let eigen = executor
        .execute("EigenDecomposition", &NodeInputs::new().with("Matrix", matrix.clone()))
        .unwrap();
    assert_eq!(eigen[2].as_array().unwrap().shape(), &[2, 2]);

    let solved = executor
        .execute(
            "LinearSolve",
            &NodeInputs::new()
                .with("A", matrix)
                .with("B", NumArray::from_vec(vec![3.0, 3.0])),
        )
        .unwrap();
    let x: Vec<f64> = solved[0].as_array().unwrap().values.iter().copied().collect();
    assert!(x.iter().all(|v| (v - 1.0).abs() < 1e-12));

    let curve = executor
        .execute("ArrayExponential", &NodeInputs::new().with("Shape", NodeData::String("(4,)".into())))
        .unwrap();
    assert_eq!(curve[0].as_array().unwrap().shape(), &[4]);
}
