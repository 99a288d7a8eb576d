use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geom::{
    CubicBezier, GenericCurve, Line3, ParametricCurve, Point3, SampleKind, SubdivisionSettings,
    TessellationPath, Tolerance, TubeMesh, TubeOptions, TubeTessellation, Vec3, is_straight,
    tessellate_tube, tube_mesh,
};

fn quarter_loop() -> CubicBezier {
    CubicBezier::from_points([
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ])
}

/// Velocity vanishes and reverses at `t = 1/3`.
fn cusp_curve() -> CubicBezier {
    CubicBezier::from_points([
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(-1.0, 1.0, 0.0),
        Point3::new(3.0, -3.0, 0.0),
    ])
}

fn random_bezier(rng: &mut StdRng) -> CubicBezier {
    let mut point = || {
        Point3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        )
    };
    CubicBezier::from_points([point(), point(), point(), point()])
}

fn assert_consistent(mesh: &TubeMesh, tessellation: &TubeTessellation, options: &TubeOptions) {
    let slices = options.slice_count;
    let stacks = tessellation.stack_count;

    mesh.validate().expect("committed mesh is consistent");
    assert_eq!(mesh.vertex_count(), stacks * slices + 2);
    assert_eq!(mesh.triangle_count(), slices * (stacks - 1) * 2 + 2 * slices);
    assert_eq!(
        stacks,
        tessellation.samples.ring_count(options.cusp_subdivision_count) + 2
    );
    assert_eq!(tessellation.frames.len(), stacks);

    let params = tessellation.samples.parameters();
    assert_eq!(params.first(), Some(&0.0));
    assert_eq!(params.last(), Some(&1.0));
    assert!(params.windows(2).all(|w| w[0] < w[1]), "samples must ascend: {params:?}");

    for (stack, frame) in tessellation.frames.iter().enumerate() {
        assert!(
            frame.is_orthonormal(Tolerance::FRAME),
            "frame {stack} is not orthonormal: {frame:?}"
        );
    }

    for ring in mesh.params()[..stacks * slices].chunks_exact(slices) {
        assert!(ring.iter().all(|&t| t == ring[0]), "ring mixes parameters");
    }
}

#[test]
fn quarter_loop_scenario() {
    let curve = quarter_loop();
    let options = TubeOptions::default().with_radius(0.1).with_slice_count(8);

    let (mesh, tessellation) = tube_mesh(&curve, &options).expect("tessellation succeeds");

    assert_eq!(tessellation.path, TessellationPath::Adaptive);
    assert!(tessellation.stack_count >= 4);
    assert_eq!(
        mesh.triangle_count(),
        8 * (tessellation.stack_count - 1) * 2 + 8 + 8
    );
    assert_eq!(tessellation.samples.cusp_count(), 0);
    assert_consistent(&mesh, &tessellation, &options);
}

#[test]
fn side_normals_point_away_from_the_curve() {
    let curve = quarter_loop();
    let options = TubeOptions::default().with_radius(0.1).with_slice_count(8);
    let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();

    let side = options.slice_count..(tessellation.stack_count - 1) * options.slice_count;
    for i in side {
        let position = Point3::from_array(mesh.positions()[i]);
        let center = curve.position_at(mesh.params()[i]);
        let normal = Vec3::from_array(mesh.normals()[i]);
        let offset = position.sub_point(center);
        assert!((offset.length() - 0.1).abs() < 1e-9);
        assert!((normal.dot(offset) - 0.1).abs() < 1e-9);
    }
}

#[test]
fn cap_rings_face_along_the_tangent() {
    let curve = quarter_loop();
    let options = TubeOptions::default().with_slice_count(6);
    let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();

    let start_tangent = curve.unit_tangent_at(0.0).unwrap();
    let end_tangent = curve.unit_tangent_at(1.0).unwrap();
    let last = tessellation.stack_count - 1;
    for slice in 0..6 {
        let start_normal = Vec3::from_array(mesh.normals()[slice]);
        let end_normal = Vec3::from_array(mesh.normals()[last * 6 + slice]);
        assert!(start_normal.dot(start_tangent) < -1.0 + 1e-9);
        assert!(end_normal.dot(end_tangent) > 1.0 - 1e-9);
    }
}

#[test]
fn straight_bezier_takes_straight_extension() {
    let curve = CubicBezier::from_points([
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(2.0, 2.0, 2.0),
        Point3::new(3.0, 3.0, 3.0),
    ]);
    assert!(curve.is_flat(Tolerance::LOOSE.eps));
    assert!(is_straight(&curve, Tolerance::LOOSE));

    let options = TubeOptions::default().with_slice_count(5);
    let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();

    assert_eq!(tessellation.path, TessellationPath::StraightExtension);
    assert_eq!(tessellation.stack_count, 4);
    assert_eq!(tessellation.stats.node_count, 0);
    assert_consistent(&mesh, &tessellation, &options);
}

#[test]
fn cusp_is_swept_instead_of_bisected_forever() {
    let curve = cusp_curve();
    assert!(curve.first_derivative_at(1.0 / 3.0).length() < 1e-12);

    let options = TubeOptions::default().with_slice_count(6);
    let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();
    let settings = SubdivisionSettings::for_curve(&options, curve.segment_count());

    assert!(tessellation.stats.cusp_count >= 1);
    assert_eq!(tessellation.stats.cusp_count, tessellation.samples.cusp_count());
    let narrowest = tessellation.stats.min_bisected_width.unwrap();
    assert!(narrowest >= settings.cusp_interval);

    let cusp = tessellation
        .samples
        .iter()
        .find(|s| s.is_cusp())
        .expect("a cusp sample is recorded");
    assert!((cusp.t - 1.0 / 3.0).abs() < 2.0 * settings.cusp_interval);
    if let SampleKind::Cusp {
        start_tangent,
        end_tangent,
    } = cusp.kind
    {
        assert!(start_tangent.dot(end_tangent) < 0.0, "tangent reverses across the cusp");
    }

    assert_consistent(&mesh, &tessellation, &options);
}

#[test]
fn cusp_rings_share_one_position() {
    let curve = cusp_curve();
    let options = TubeOptions::default().with_slice_count(4).with_cusp_subdivision_count(5);
    let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();

    let cusp = tessellation.samples.iter().find(|s| s.is_cusp()).unwrap();
    let first = tessellation.stack_of_sample(cusp.t, 5).unwrap();
    let center = curve.position_at(cusp.t);
    for stack in first..first + 5 {
        for slice in 0..4 {
            let position = Point3::from_array(mesh.positions()[stack * 4 + slice]);
            assert!((position.distance_to(center) - options.radius).abs() < 1e-9);
            assert_eq!(mesh.params()[stack * 4 + slice], cusp.t);
        }
    }
}

#[test]
fn retessellation_is_deterministic() {
    let curve = cusp_curve();
    let options = TubeOptions::default().with_slice_count(7).with_id(3);

    let (a, ta) = tube_mesh(&curve, &options).unwrap();
    let (b, tb) = tube_mesh(&curve, &options).unwrap();

    assert_eq!(a.export(), b.export());
    assert_eq!(ta.samples, tb.samples);
    assert!(a.ids().iter().all(|&id| id == 3));
}

#[test]
fn tessellating_into_a_used_mesh_replaces_it() {
    let mut mesh = TubeMesh::new();
    let options = TubeOptions::default().with_slice_count(6);
    tessellate_tube(&cusp_curve(), &options, &mut mesh).unwrap();
    let first_count = mesh.vertex_count();

    let line = Line3::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0));
    tessellate_tube(&line, &options, &mut mesh).unwrap();
    assert!(mesh.vertex_count() < first_count);
    assert_eq!(mesh.vertex_count(), 4 * 6 + 2);
}

#[test]
fn multi_span_curve_tightens_thresholds() {
    let points: Vec<Point3> = (0..7)
        .map(|i| {
            let a = f64::from(i) * 0.9;
            Point3::new(a.cos(), a.sin(), 0.2 * f64::from(i))
        })
        .collect();
    let curve = GenericCurve::from_points(3, &points).unwrap();
    assert_eq!(curve.segment_count(), 4);

    let options = TubeOptions::default().with_slice_count(6);
    let settings = SubdivisionSettings::for_curve(&options, curve.segment_count());
    assert!(settings.flatness_threshold > options.adaptive_epsilon);

    let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();
    assert_eq!(tessellation.path, TessellationPath::Adaptive);
    assert_consistent(&mesh, &tessellation, &options);
}

/// Long spline along X with one control point lifted far off the axis. The
/// bump sits between uniform samples and between the root interval's sample points.
#[test]
fn localized_bump_on_a_long_spline_is_not_straight() {
    let mut points: Vec<Point3> = (0..100).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
    points[10] = Point3::new(10.0, 20.0, 0.0);
    let curve = GenericCurve::from_points(3, &points).unwrap();
    assert!(!is_straight(&curve, Tolerance::LOOSE));

    let options = TubeOptions::default();
    let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();
    assert_eq!(tessellation.path, TessellationPath::Adaptive);
    assert!(tessellation.samples.len() > 2);
    assert_consistent(&mesh, &tessellation, &options);

    let peak = mesh
        .positions()
        .iter()
        .map(|p| p[1])
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(peak > 10.0, "bump missing from the tube, peak y = {peak}");
}

#[test]
fn random_beziers_keep_every_invariant() {
    let mut rng = StdRng::seed_from_u64(0x7_0b3);
    let options = TubeOptions::default().with_slice_count(5);

    for _ in 0..24 {
        let curve = random_bezier(&mut rng);
        let (mesh, tessellation) = tube_mesh(&curve, &options).unwrap();
        let settings = SubdivisionSettings::for_curve(&options, 1);

        assert_consistent(&mesh, &tessellation, &options);
        if let Some(narrowest) = tessellation.stats.min_bisected_width {
            assert!(narrowest >= settings.cusp_interval);
        }
        // Depth is bounded by halving down to the cusp interval.
        assert!(f64::from(tessellation.stats.max_depth) <= (1.0 / settings.cusp_interval).log2() + 1.0);
    }
}
