use tube_engine::geom::{
    AnyCurve, ControlPoint, CubicBezier, GenericCurve, Line3, Point3, TessellationPath, TubeOptions,
};
use tube_engine::{Engine, EngineError};

fn loop_curve() -> AnyCurve {
    CubicBezier::from_points([
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ])
    .into()
}

#[test]
fn rebuild_without_curve_fails() {
    let mut engine = Engine::new();
    assert!(matches!(engine.rebuild(), Err(EngineError::NoCurve)));
    assert!(engine.sample_parameters().is_none());
    assert!(engine.last_tessellation().is_none());
}

#[test]
fn rebuild_fills_tube_and_marker_buffers() {
    let mut engine = Engine::new();
    engine.set_curve(loop_curve());
    engine
        .set_tube_options(TubeOptions::default().with_radius(0.1).with_slice_count(8))
        .expect("valid options");

    let tessellation = engine.rebuild().expect("rebuild succeeds");
    let stacks = tessellation.stack_count;
    let sample_count = tessellation.samples.len();
    assert!(stacks >= 4);

    assert_eq!(engine.mesh().vertex_count(), stacks * 8 + 2);
    assert_eq!(engine.mesh().triangle_count(), 8 * (stacks - 1) * 2 + 16);
    assert_eq!(engine.debug_points().vertex_count(), sample_count);
    assert_eq!(engine.debug_lines().line_count(), 2 * sample_count - 1);

    let params = engine.sample_parameters().expect("samples retained");
    assert_eq!(params.first(), Some(&0.0));
    assert_eq!(params.last(), Some(&1.0));
}

#[test]
fn moving_a_control_point_invalidates_until_rebuild() {
    let mut engine = Engine::new();
    engine.set_curve(loop_curve());
    engine.rebuild().unwrap();
    let before = engine.mesh().export();

    engine
        .update_control_point(1, Point3::new(2.0, -1.0, 0.5))
        .expect("index 1 exists");
    assert!(engine.last_tessellation().is_none());

    engine.rebuild().unwrap();
    assert_ne!(engine.mesh().export(), before);
    assert!(matches!(
        engine.update_control_point(4, Point3::ORIGIN),
        Err(EngineError::Curve(_))
    ));
}

#[test]
fn rebuild_is_destructive_and_repeatable() {
    let mut engine = Engine::new();
    engine.set_curve(loop_curve());
    engine.rebuild().unwrap();
    let first = engine.mesh().export();
    let first_samples = engine.sample_parameters();

    engine.rebuild().unwrap();
    assert_eq!(engine.mesh().export(), first);
    assert_eq!(engine.sample_parameters(), first_samples);

    engine.set_curve(Line3::new(Point3::ORIGIN, Point3::new(0.0, 3.0, 0.0)).into());
    let tessellation = engine.rebuild().unwrap();
    assert_eq!(tessellation.path, TessellationPath::StraightExtension);
    assert_eq!(engine.sample_parameters(), Some(vec![0.0, 1.0]));
}

#[test]
fn invalid_options_are_rejected_and_previous_kept() {
    let mut engine = Engine::new();
    let err = engine
        .set_tube_options(TubeOptions::default().with_radius(-2.0))
        .unwrap_err();
    assert!(matches!(err, EngineError::Tube(_)));
    assert_eq!(engine.tube_options(), &TubeOptions::default());
}

#[test]
fn generic_curve_tessellates_through_the_facade() {
    let control_points = vec![
        ControlPoint::new(Point3::new(0.0, 0.0, 0.0)),
        ControlPoint::with_weight(Point3::new(1.0, 1.0, 0.0), 2.0),
        ControlPoint::new(Point3::new(2.0, 0.0, 1.0)),
        ControlPoint::new(Point3::new(3.0, 1.0, 1.0)),
        ControlPoint::new(Point3::new(4.0, 0.0, 0.0)),
    ];
    let curve = GenericCurve::new(3, control_points).expect("valid spline");

    let mut engine = Engine::new();
    engine.set_curve(curve.into());
    engine
        .set_tube_options(TubeOptions::default().with_slice_count(10))
        .unwrap();
    let tessellation = engine.rebuild().unwrap();
    assert_eq!(tessellation.path, TessellationPath::Adaptive);
    assert!(tessellation.diagnostics.to_string().contains("Tessellation Diagnostics"));
    assert!(engine.mesh().validate().is_ok());
}
