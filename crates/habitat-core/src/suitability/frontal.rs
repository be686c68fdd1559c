//! Thermal-front association.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::species::SpeciesParameters;
use crate::suitability::SuitabilityConstants;

/// Shape of the frontal response around the gradient sigmoid `σ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontalResponse {
    /// `a·σ`: the score never exceeds the species' frontal affinity.
    #[default]
    Scaled,
    /// `(1 - a) + a·σ`: a front-indifferent species (`a = 0`) scores 1.
    Blended,
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Frontal suitability for one cell with `a` the species' frontal affinity
/// and `σ = 1/(1 + e^(-k·(g - g0)))`.
pub fn frontal_suitability(gradient: f32, sp: &SpeciesParameters, c: &SuitabilityConstants) -> f32 {
    if gradient.is_nan() {
        return f32::NAN;
    }
    let a = sp.frontal_affinity;
    let response = sigmoid(c.front_steepness * (gradient as f64 - c.front_threshold));
    let s = match c.front_response {
        FrontalResponse::Scaled => a * response,
        FrontalResponse::Blended => (1.0 - a) + a * response,
    };
    s as f32
}

/// Apply [`frontal_suitability`] to a precomputed gradient grid
/// (see [`crate::suitability::frontal_gradient`]).
pub fn frontal_grid(gradient: &Grid, sp: &SpeciesParameters, c: &SuitabilityConstants) -> Grid {
    gradient.map(|g| frontal_suitability(g, sp, c))
}
