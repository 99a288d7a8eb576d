//! Tessellation of many independent curves.
//!
//! Curves share no mutable state, so with the `parallel` feature each one is
//! tessellated on the rayon pool. Frame propagation stays sequential inside
//! every curve. Results keep the input order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::curve::ParametricCurve;
use super::mesh::TubeMesh;
use super::tube::{TubeError, TubeOptions, TubeTessellation, tube_mesh};

pub type TubeResult = Result<(TubeMesh, TubeTessellation), TubeError>;

#[cfg(feature = "parallel")]
pub fn tessellate_tubes<C>(curves: &[C], options: &TubeOptions) -> Vec<TubeResult>
where
    C: ParametricCurve + Sync,
{
    log::debug!("tessellating {} tubes in parallel", curves.len());
    curves.par_iter().map(|curve| tube_mesh(curve, options)).collect()
}

#[cfg(not(feature = "parallel"))]
pub fn tessellate_tubes<C>(curves: &[C], options: &TubeOptions) -> Vec<TubeResult>
where
    C: ParametricCurve + Sync,
{
    log::debug!("tessellating {} tubes", curves.len());
    curves.iter().map(|curve| tube_mesh(curve, options)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::bezier::CubicBezier;
    use crate::geom::core::Point3;

    #[test]
    fn matches_individual_tessellation_in_order() {
        let curves: Vec<CubicBezier> = (0..4)
            .map(|i| {
                let k = f64::from(i);
                CubicBezier::from_points([
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, k, 0.0),
                    Point3::new(2.0, -k, 1.0),
                    Point3::new(3.0, 0.0, k),
                ])
            })
            .collect();
        let options = TubeOptions::default().with_slice_count(6);

        let batch = tessellate_tubes(&curves, &options);
        assert_eq!(batch.len(), curves.len());
        for (curve, result) in curves.iter().zip(&batch) {
            let (mesh, tessellation) = result.as_ref().unwrap();
            let (single_mesh, single) = tube_mesh(curve, &options).unwrap();
            assert_eq!(mesh.positions(), single_mesh.positions());
            assert_eq!(tessellation.samples, single.samples);
        }
    }

    #[test]
    fn errors_stay_per_curve() {
        let curves = [CubicBezier::from_points([Point3::ORIGIN; 4])];
        let options = TubeOptions::default().with_radius(-1.0);
        let results = tessellate_tubes(&curves, &options);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(TubeError::InvalidRadius(_))));
    }
}
