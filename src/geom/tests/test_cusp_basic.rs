use crate::geom::{Vec3, cusp_angle, cusp_rotation_axis, cusp_sweep_tangents};

#[test]
fn antiparallel_tangents_get_a_perpendicular_axis() {
    for t1 in [
        Vec3::X,
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(1.0, 2.0, 3.0).normalized().unwrap(),
    ] {
        let t2 = t1.neg();
        let axis = cusp_rotation_axis(t1, t2);
        assert!(axis.is_finite());
        assert!((axis.length() - 1.0).abs() < 1e-12);
        assert!(axis.dot(t1).abs() < 1e-12);
    }
}

#[test]
fn antiparallel_sweep_ends_reversed() {
    let t1 = Vec3::new(0.0, 0.6, 0.8);
    let tangents = cusp_sweep_tangents(t1, t1.neg(), 8);
    assert_eq!(tangents.len(), 8);
    assert!(tangents[0].sub(t1).length() < 1e-12);
    assert!(tangents[7].add(t1).length() < 1e-9);
    for tangent in &tangents {
        assert!((tangent.length() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn parallel_tangents_sweep_in_place() {
    let tangents = cusp_sweep_tangents(Vec3::Z, Vec3::Z.mul_scalar(5.0), 4);
    assert!(tangents.iter().all(|t| t.sub(Vec3::Z).length() < 1e-12));
    assert!(cusp_angle(Vec3::Z, Vec3::Z).abs() < 1e-12);
}

#[test]
fn sweep_angles_are_uniform() {
    let t1 = Vec3::X;
    let t2 = Vec3::new(-1.0, 1.0, 0.0).normalized().unwrap();
    let steps = 6;
    let tangents = cusp_sweep_tangents(t1, t2, steps);
    let theta = cusp_angle(t1, t2);

    for (i, tangent) in tangents.iter().enumerate() {
        let expected = theta * i as f64 / (steps - 1) as f64;
        assert!((cusp_angle(t1, *tangent) - expected).abs() < 1e-9);
        assert!(tangent.z.abs() < 1e-12, "rotation stays in the tangent plane");
    }
    assert!(tangents[steps - 1].sub(t2).length() < 1e-12);
}

#[test]
fn zero_tangent_borrows_the_other_direction() {
    let tangents = cusp_sweep_tangents(Vec3::ZERO, Vec3::Y, 3);
    assert!(tangents.iter().all(|t| t.sub(Vec3::Y).length() < 1e-12));
}
