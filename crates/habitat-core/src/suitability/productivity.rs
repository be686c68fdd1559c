//! Prey availability from surface chlorophyll.
//!
//! Primary production follows Eppley (1972) temperature scaling, is discounted
//! by one transfer efficiency per trophic step, and saturates through a
//! Michaelis-Menten response with the species' half-saturation constant.

use crate::grid::Grid;
use crate::species::SpeciesParameters;
use crate::suitability::SuitabilityConstants;

/// Energy reaching the species' trophic level: `chl·exp(k_T·sst)·eff^(TL-1)`.
/// Non-positive chlorophyll yields 0.
pub fn transferred_energy(chl: f32, sst: f32, sp: &SpeciesParameters, c: &SuitabilityConstants) -> f64 {
    if chl.is_nan() || sst.is_nan() {
        return f64::NAN;
    }
    if chl <= 0.0 {
        return 0.0;
    }
    let pp = chl as f64 * (c.eppley_coefficient * sst as f64).exp();
    pp * c.transfer_efficiency.powf(sp.trophic_level - 1.0)
}

/// `E / (E + K_half)`. Saturates to 1 if `E` overflows.
pub fn productivity_suitability(chl: f32, sst: f32, sp: &SpeciesParameters, c: &SuitabilityConstants) -> f32 {
    let e = transferred_energy(chl, sst, sp, c);
    if e.is_nan() {
        return f32::NAN;
    }
    if e.is_infinite() {
        return 1.0;
    }
    (e / (e + sp.productivity_half_saturation)) as f32
}

pub fn productivity_grid(chl: &Grid, sst: &Grid, sp: &SpeciesParameters, c: &SuitabilityConstants) -> Grid {
    chl.zip_map(sst, |a, t| productivity_suitability(a, t, sp, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesTable;
    use approx::assert_relative_eq;

    fn great_white() -> SpeciesParameters {
        SpeciesTable::builtin().get("great_white").unwrap().clone()
    }

    #[test]
    fn non_positive_chlorophyll_scores_zero() {
        let c = SuitabilityConstants::default();
        let sp = great_white();
        assert_eq!(productivity_suitability(0.0, 18.0, &sp, &c), 0.0);
        assert_eq!(productivity_suitability(-3.0, 18.0, &sp, &c), 0.0);
    }

    #[test]
    fn matches_hand_computed_value() {
        let c = SuitabilityConstants::default();
        let sp = great_white();
        // E = 2·exp(0.0633·18)·0.1^3.5
        let e = 2.0 * (0.0633f64 * 18.0).exp() * 0.1f64.powf(3.5);
        assert_relative_eq!(transferred_energy(2.0, 18.0, &sp, &c), e, max_relative = 1e-12);
        let s = productivity_suitability(2.0, 18.0, &sp, &c);
        assert_relative_eq!(s, (e / (e + 1.0e-4)) as f32, epsilon = 1e-6);
        assert!(s > 0.95 && s < 1.0);
    }

    #[test]
    fn increases_with_chlorophyll_and_temperature() {
        let c = SuitabilityConstants::default();
        let sp = SpeciesTable::builtin().get("bull_shark").unwrap().clone();
        let low = productivity_suitability(0.1, 20.0, &sp, &c);
        let high = productivity_suitability(1.0, 20.0, &sp, &c);
        let warm = productivity_suitability(0.1, 28.0, &sp, &c);
        assert!(low < high);
        assert!(low < warm);
    }

    #[test]
    fn overflow_saturates_and_nan_propagates() {
        let c = SuitabilityConstants { eppley_coefficient: 10.0, ..Default::default() };
        let sp = great_white();
        assert_eq!(productivity_suitability(f32::MAX, 1000.0, &sp, &c), 1.0);
        assert!(productivity_suitability(f32::NAN, 18.0, &sp, &c).is_nan());
        assert!(productivity_suitability(1.0, f32::NAN, &sp, &c).is_nan());
    }
}
