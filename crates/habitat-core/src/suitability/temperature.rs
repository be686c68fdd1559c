//! Thermal suitability: asymmetric Gaussian around the species optimum.
//! The warm side decays faster, modelling metabolic stress.

use crate::grid::Grid;
use crate::species::SpeciesParameters;
use crate::suitability::SuitabilityConstants;

/// `exp(-(T - T_opt)² / 2σ²)` with σ = tolerance below the optimum and
/// tolerance × `warm_side_ratio` above it. Exactly 1.0 at `T_opt`.
pub fn temperature_suitability(sst: f32, sp: &SpeciesParameters, c: &SuitabilityConstants) -> f32 {
    if sst.is_nan() {
        return f32::NAN;
    }
    let d = sst as f64 - sp.optimal_temperature;
    let sigma = if d <= 0.0 {
        sp.temperature_tolerance
    } else {
        sp.temperature_tolerance * c.warm_side_ratio
    };
    let z = d / sigma;
    (-0.5 * z * z).exp() as f32
}

pub fn temperature_grid(sst: &Grid, sp: &SpeciesParameters, c: &SuitabilityConstants) -> Grid {
    sst.map(|t| temperature_suitability(t, sp, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesTable;
    use approx::assert_relative_eq;

    #[test]
    fn optimum_scores_exactly_one_for_every_species() {
        let c = SuitabilityConstants::default();
        for (id, sp) in SpeciesTable::builtin().iter() {
            let s = temperature_suitability(sp.optimal_temperature as f32, sp, &c);
            assert_eq!(s, 1.0, "{id}");
        }
    }

    #[test]
    fn strictly_decreasing_on_each_side() {
        let c = SuitabilityConstants::default();
        for (id, sp) in SpeciesTable::builtin().iter() {
            let t_opt = sp.optimal_temperature as f32;
            // Stay within ~4σ so f32 results do not underflow to equal zeros.
            let mut prev_cold = 1.0f32;
            let mut prev_warm = 1.0f32;
            for k in 1..=20 {
                let step = k as f32 * 0.5;
                let cold = temperature_suitability(t_opt - step, sp, &c);
                let warm = temperature_suitability(t_opt + step * 0.5, sp, &c);
                assert!(cold < prev_cold, "{id}: cold side not decreasing at -{step}");
                assert!(warm < prev_warm, "{id}: warm side not decreasing at +{}", step * 0.5);
                prev_cold = cold;
                prev_warm = warm;
            }
        }
    }

    #[test]
    fn warm_side_is_steeper() {
        let c = SuitabilityConstants::default();
        let sp = SpeciesTable::builtin().get("great_white").unwrap().clone();
        let cold = temperature_suitability(15.0, &sp, &c);
        let warm = temperature_suitability(21.0, &sp, &c);
        assert!(warm < cold);
        // One cold-side σ away: exp(-0.5).
        assert_relative_eq!(temperature_suitability(14.5, &sp, &c), (-0.5f64).exp() as f32, epsilon = 1e-6);
    }

    #[test]
    fn extremes_and_nan() {
        let c = SuitabilityConstants::default();
        let sp = SpeciesTable::builtin().get("tiger_shark").unwrap().clone();
        assert_eq!(temperature_suitability(1000.0, &sp, &c), 0.0);
        assert_eq!(temperature_suitability(-1000.0, &sp, &c), 0.0);
        assert!(temperature_suitability(f32::NAN, &sp, &c).is_nan());
    }
}
