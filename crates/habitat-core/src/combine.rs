//! Weighted geometric mean of the base factors, with veto and NaN masking.

use serde::{Deserialize, Serialize};

use crate::error::{HabitatError, Result};
use crate::grid::Grid;
use crate::suitability::FactorGrids;

/// Exponents of the geometric mean. They are normalised by their sum, so only
/// the ratios matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsiWeights {
    pub temperature: f64,
    pub productivity: f64,
    pub frontal: f64,
    pub depth: f64,
}

impl Default for HsiWeights {
    fn default() -> Self {
        Self { temperature: 0.30, productivity: 0.25, frontal: 0.25, depth: 0.20 }
    }
}

impl HsiWeights {
    pub fn as_array(&self) -> [f64; 4] {
        [self.temperature, self.productivity, self.frontal, self.depth]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    pub fn validate(&self) -> Result<()> {
        let names = ["temperature", "productivity", "frontal", "depth"];
        for (name, w) in names.iter().zip(self.as_array()) {
            if !w.is_finite() || w < 0.0 {
                return Err(HabitatError::InvalidWeights(format!("{name} weight {w} must be finite and >= 0")));
            }
        }
        let total = self.total();
        if total <= 0.0 {
            return Err(HabitatError::InvalidWeights(format!("weights sum to {total}, need a positive total")));
        }
        Ok(())
    }
}

/// Combine one cell's factors, in weight order, then apply the multiplier.
///
/// NaN anywhere gives NaN; any factor at exactly 0 gives exactly 0.
pub fn combine_cell(factors: [f32; 4], weights: &HsiWeights, multiplier: f32) -> f32 {
    if factors.iter().any(|f| f.is_nan()) || multiplier.is_nan() {
        return f32::NAN;
    }
    debug_assert!(
        factors.iter().all(|f| (0.0..=1.0).contains(f)),
        "suitability factor outside [0, 1]: {factors:?}"
    );
    if factors.iter().any(|&f| f == 0.0) {
        return 0.0;
    }
    let total = weights.total();
    let log_mean: f64 = factors
        .iter()
        .zip(weights.as_array())
        .map(|(&s, w)| (w / total) * (s as f64).ln())
        .sum();
    let hsi = log_mean.exp() * multiplier as f64;
    hsi.clamp(0.0, 1.0) as f32
}

/// Grid form of [`combine_cell`]. All factor grids must share one shape.
pub fn combine_factors(factors: &FactorGrids, weights: &HsiWeights) -> Result<Grid> {
    let expected = factors.temperature.shape();
    for (layer, g) in factors.named() {
        if g.shape() != expected || g.len() != expected.0 * expected.1 {
            return Err(HabitatError::ShapeMismatch { layer, expected, found: g.shape() });
        }
    }
    let [t, p, f, d] = factors.base();
    let mut out = Grid::filled(expected.1, expected.0, 0.0);
    for i in 0..out.len() {
        out.data[i] = combine_cell([t.data[i], p.data[i], f.data[i], d.data[i]], weights, factors.synergy.data[i]);
    }
    Ok(out)
}
