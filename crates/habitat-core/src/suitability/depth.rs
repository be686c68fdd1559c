//! Bathymetric preference. Land cells (elevation above sea level) score 0.

use crate::grid::Grid;
use crate::species::SpeciesParameters;

/// Asymmetric Gaussian around `optimal_depth`, using the shallow tolerance
/// above the optimum and the deep tolerance below it. `bathymetry` is
/// elevation in metres, so depth = -bathymetry.
pub fn depth_suitability(bathymetry: f32, sp: &SpeciesParameters) -> f32 {
    if bathymetry.is_nan() {
        return f32::NAN;
    }
    if bathymetry > 0.0 {
        return 0.0;
    }
    let d = -(bathymetry as f64) - sp.optimal_depth;
    let sigma = if d < 0.0 { sp.depth_tolerance_shallow } else { sp.depth_tolerance_deep };
    let z = d / sigma;
    (-0.5 * z * z).exp() as f32
}

pub fn depth_grid(bathymetry: &Grid, sp: &SpeciesParameters) -> Grid {
    bathymetry.map(|b| depth_suitability(b, sp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesTable;
    use approx::assert_relative_eq;

    #[test]
    fn land_scores_zero() {
        let sp = SpeciesTable::builtin().get("bull_shark").unwrap().clone();
        assert_eq!(depth_suitability(0.5, &sp), 0.0);
        assert_eq!(depth_suitability(250.0, &sp), 0.0);
        // The waterline itself is water.
        assert!(depth_suitability(0.0, &sp) > 0.0);
    }

    #[test]
    fn optimum_and_asymmetry() {
        let sp = SpeciesTable::builtin().get("great_white").unwrap().clone();
        assert_eq!(depth_suitability(-50.0, &sp), 1.0);
        // 30 m shallower is one shallow σ, 30 m deeper is under a third of a deep σ.
        assert_relative_eq!(depth_suitability(-20.0, &sp), (-0.5f64).exp() as f32, epsilon = 1e-6);
        assert!(depth_suitability(-80.0, &sp) > depth_suitability(-20.0, &sp));
    }

    #[test]
    fn nan_propagates() {
        let sp = SpeciesTable::builtin().get("mako").unwrap().clone();
        assert!(depth_suitability(f32::NAN, &sp).is_nan());
    }
}
