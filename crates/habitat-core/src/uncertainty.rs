//! Per-cell prediction uncertainty and ensemble spread.
//!
//! Each factor carries a heuristic uncertainty in [0, 1] that grows as
//! conditions move away from what the response curve was fitted on. The
//! cell value is the weight-normalised root sum of squares
//! `sqrt(Σ (ŵ_i·u_i)²)`, so it also stays in [0, 1].

use serde::Serialize;

use crate::combine::HsiWeights;
use crate::environment::EnvironmentalGrid;
use crate::error::{HabitatError, Result};
use crate::grid::Grid;
use crate::species::SpeciesParameters;
use crate::suitability::FactorGrids;

/// Grows linearly with distance from the thermal optimum, in tolerances.
pub fn temperature_uncertainty(sst: f32, sp: &SpeciesParameters) -> f32 {
    let deviation = (sst as f64 - sp.optimal_temperature).abs() / sp.temperature_tolerance;
    (0.1 + 0.3 * deviation).min(1.0) as f32
}

pub fn productivity_uncertainty(productivity: f32) -> f32 {
    0.3 * (1.0 - productivity)
}

/// Flat water is the least constrained case; strong fronts are unambiguous.
pub fn frontal_uncertainty(gradient: f32) -> f32 {
    0.2 + 0.3 * (-5.0 * gradient.max(0.0)).exp()
}

pub fn depth_uncertainty(depth: f32) -> f32 {
    0.3 * (1.0 - depth)
}

/// Combined uncertainty for every cell of `factors`. NaN wherever the HSI
/// inputs are missing.
pub fn uncertainty_grid(
    env: &EnvironmentalGrid,
    factors: &FactorGrids,
    sp: &SpeciesParameters,
    weights: &HsiWeights,
) -> Grid {
    let total = weights.total();
    let w = weights.as_array().map(|w| (w / total) as f32);
    let mut out = Grid::filled(env.sst.width, env.sst.height, f32::NAN);
    for i in 0..out.len() {
        let [t, p, f, d] = factors.base().map(|g| g.data[i]);
        let (sst, g) = (env.sst.data[i], factors.gradient.data[i]);
        if [t, p, f, d, sst, g].iter().any(|v| v.is_nan()) {
            continue;
        }
        let u = [
            temperature_uncertainty(sst, sp),
            productivity_uncertainty(p),
            frontal_uncertainty(g),
            depth_uncertainty(d),
        ];
        let ss: f32 = u.iter().zip(w).map(|(u, w)| (w * u) * (w * u)).sum();
        out.data[i] = ss.sqrt();
    }
    out
}

/// Cellwise statistics across an ensemble of HSI grids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleSpread {
    pub mean: Grid,
    /// Population standard deviation.
    pub std: Grid,
    pub min: Grid,
    pub max: Grid,
}

/// Spread of `members` per cell. NaN members are skipped; a cell that is NaN
/// in every member stays NaN.
pub fn ensemble_spread(members: &[Grid]) -> Result<EnsembleSpread> {
    let first = members.first().ok_or(HabitatError::EmptyInput("ensemble members"))?;
    let expected = first.shape();
    for m in members {
        if m.shape() != expected {
            return Err(HabitatError::ShapeMismatch { layer: "ensemble member", expected, found: m.shape() });
        }
    }

    let (h, w) = expected;
    let mut spread = EnsembleSpread {
        mean: Grid::filled(w, h, f32::NAN),
        std: Grid::filled(w, h, f32::NAN),
        min: Grid::filled(w, h, f32::NAN),
        max: Grid::filled(w, h, f32::NAN),
    };
    for i in 0..first.len() {
        let values: Vec<f64> = members.iter().map(|m| m.data[i]).filter(|v| !v.is_nan()).map(f64::from).collect();
        if values.is_empty() {
            continue;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        spread.mean.data[i] = mean as f32;
        spread.std.data[i] = var.sqrt() as f32;
        spread.min.data[i] = values.iter().cloned().fold(f64::INFINITY, f64::min) as f32;
        spread.max.data[i] = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max) as f32;
    }
    Ok(spread)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesTable;
    use crate::suitability::SuitabilityConstants;
    use approx::assert_relative_eq;

    fn great_white() -> SpeciesParameters {
        SpeciesTable::builtin().get("great_white").unwrap().clone()
    }

    #[test]
    fn temperature_uncertainty_grows_off_optimum() {
        let sp = great_white();
        assert_relative_eq!(temperature_uncertainty(18.0, &sp), 0.1, epsilon = 1e-6);
        assert_relative_eq!(temperature_uncertainty(21.5, &sp), 0.4, epsilon = 1e-6);
        assert_eq!(temperature_uncertainty(60.0, &sp), 1.0);
    }

    #[test]
    fn strong_fronts_are_more_certain() {
        assert_relative_eq!(frontal_uncertainty(0.0), 0.5, epsilon = 1e-6);
        assert!(frontal_uncertainty(1.0) < frontal_uncertainty(0.1));
        assert!(frontal_uncertainty(10.0) >= 0.2);
    }

    #[test]
    fn grid_matches_weighted_root_sum_of_squares() {
        let sp = great_white();
        let env = EnvironmentalGrid::uniform(4, 18.0, 2.0, -50.0);
        let factors = FactorGrids::compute(&env, &sp, &SuitabilityConstants::default(), None);
        let weights = HsiWeights::default();
        let u = uncertainty_grid(&env, &factors, &sp, &weights);

        let p = factors.productivity.data[0];
        let expected = ((0.30f32 * 0.1).powi(2)
            + (0.25 * 0.3 * (1.0 - p)).powi(2)
            + (0.25f32 * 0.5).powi(2)
            + 0.0)
            .sqrt();
        for &v in &u.data {
            assert_relative_eq!(v, expected, epsilon = 1e-5);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn missing_inputs_give_missing_uncertainty() {
        let sp = great_white();
        let mut env = EnvironmentalGrid::uniform(4, 18.0, 2.0, -50.0);
        env.chlorophyll.set(1, 1, f32::NAN);
        let factors = FactorGrids::compute(&env, &sp, &SuitabilityConstants::default(), None);
        let u = uncertainty_grid(&env, &factors, &sp, &HsiWeights::default());
        assert!(u.get(1, 1).is_nan());
        assert!(!u.get(3, 3).is_nan());
    }

    #[test]
    fn ensemble_spread_is_cellwise() {
        let mut a = Grid::square(2, 0.2);
        let b = Grid::square(2, 0.6);
        a.set(0, 0, f32::NAN);
        let s = ensemble_spread(&[a, b]).unwrap();
        assert_relative_eq!(s.mean.get(1, 1), 0.4, epsilon = 1e-6);
        assert_relative_eq!(s.std.get(1, 1), 0.2, epsilon = 1e-6);
        assert_eq!(s.min.get(1, 1), 0.2);
        assert_eq!(s.max.get(1, 1), 0.6);
        // Only one member has data here.
        assert_eq!(s.mean.get(0, 0), 0.6);
        assert_eq!(s.std.get(0, 0), 0.0);
    }

    #[test]
    fn ensemble_needs_members_of_one_shape() {
        assert_eq!(ensemble_spread(&[]).unwrap_err(), HabitatError::EmptyInput("ensemble members"));
        let err = ensemble_spread(&[Grid::square(2, 0.0), Grid::filled(3, 2, 0.0)]).unwrap_err();
        assert!(matches!(err, HabitatError::ShapeMismatch { found: (2, 3), .. }));
    }
}
