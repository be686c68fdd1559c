//! Multiplicative modifier stage applied after the geometric mean.
//!
//! Interaction terms are summed onto 1.0 and the result is clamped to
//! `[min_multiplier, max_multiplier]`, so the stage adjusts the base HSI
//! without dominating it. Missing optional layers (or NaN cells in them)
//! contribute nothing.

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentalGrid;
use crate::error::{HabitatError, Result};
use crate::grid::Grid;
use crate::species::SpeciesParameters;

/// Gains and reference values for the synergy terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyConfig {
    pub temp_prod_gain: f64,
    pub front_depth_gain: f64,
    /// Scales the species' `thermoregulation` when cold surface water sits over good depth.
    pub temp_depth_gain: f64,
    pub coastal_gain: f64,
    /// e-folding distance of the coastal term, in cells.
    pub coastal_scale_cells: f64,
    pub current_gain: f64,
    /// m/s at which the current bonus reaches tanh(1).
    pub current_reference: f64,
    pub oxygen_penalty: f64,
    /// mg/L; no penalty above this.
    pub hypoxic_upper: f64,
    /// mg/L; full penalty below this.
    pub hypoxic_lower: f64,
    pub salinity_penalty: f64,
    /// PSU range with no penalty.
    pub salinity_min: f64,
    pub salinity_max: f64,
    /// PSU outside the range at which the penalty is full.
    pub salinity_span: f64,
    pub storm_penalty: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            temp_prod_gain: 0.2,
            front_depth_gain: 0.15,
            temp_depth_gain: 0.1,
            coastal_gain: 0.2,
            coastal_scale_cells: 3.0,
            current_gain: 0.1,
            current_reference: 0.5,
            oxygen_penalty: 0.3,
            hypoxic_upper: 4.0,
            hypoxic_lower: 2.0,
            salinity_penalty: 0.2,
            salinity_min: 30.0,
            salinity_max: 38.0,
            salinity_span: 5.0,
            storm_penalty: 0.3,
            min_multiplier: 0.5,
            max_multiplier: 1.5,
        }
    }
}

/// Per-cell values feeding [`SynergyConfig::multiplier`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SynergyInputs {
    pub temperature: f32,
    pub productivity: f32,
    pub frontal: f32,
    pub depth: f32,
    /// Distance to the nearest land cell, in cells. `None` if there is no land.
    pub land_distance: Option<f32>,
    pub current_speed: Option<f32>,
    pub dissolved_oxygen: Option<f32>,
    pub salinity: Option<f32>,
    pub storm_index: Option<f32>,
}

/// Drop NaN so missing optional values fall out of the sum.
#[inline]
fn present(v: Option<f32>) -> Option<f64> {
    v.filter(|x| !x.is_nan()).map(f64::from)
}

impl SynergyConfig {
    pub fn validate(&self) -> Result<()> {
        let bad = |name: &'static str, reason: &str| {
            Err(HabitatError::InvalidConstant { name, reason: reason.to_string() })
        };
        let finite = [
            ("temp_prod_gain", self.temp_prod_gain),
            ("front_depth_gain", self.front_depth_gain),
            ("temp_depth_gain", self.temp_depth_gain),
            ("coastal_gain", self.coastal_gain),
            ("current_gain", self.current_gain),
            ("oxygen_penalty", self.oxygen_penalty),
            ("salinity_penalty", self.salinity_penalty),
            ("storm_penalty", self.storm_penalty),
            ("salinity_min", self.salinity_min),
            ("salinity_max", self.salinity_max),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return bad(name, "must be finite");
            }
        }
        for (name, v) in [
            ("coastal_scale_cells", self.coastal_scale_cells),
            ("current_reference", self.current_reference),
            ("salinity_span", self.salinity_span),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return bad(name, "must be finite and > 0");
            }
        }
        if !(self.hypoxic_lower.is_finite() && self.hypoxic_upper.is_finite() && self.hypoxic_upper > self.hypoxic_lower) {
            return bad("hypoxic_upper", "must be greater than hypoxic_lower");
        }
        if self.salinity_min > self.salinity_max {
            return bad("salinity_min", "must not exceed salinity_max");
        }
        if !(self.min_multiplier >= 0.0 && self.min_multiplier <= 1.0) {
            return bad("min_multiplier", "must lie in [0, 1]");
        }
        if !(self.max_multiplier.is_finite() && self.max_multiplier >= 1.0) {
            return bad("max_multiplier", "must be finite and >= 1");
        }
        Ok(())
    }

    /// Sum of the interaction terms for one cell, before clamping.
    pub fn term_sum(&self, x: &SynergyInputs, sp: &SpeciesParameters) -> f64 {
        let (t, p) = (x.temperature as f64, x.productivity as f64);
        let (f, d) = (x.frontal as f64, x.depth as f64);
        let mut sum = 0.0;

        // Bonus for warm productive water, penalty for a cold bloom.
        let mut tp = 0.0;
        if t > 0.8 && p > 0.6 {
            tp += 0.5 * t * p;
        }
        if t < 0.3 && p > 0.8 {
            tp -= 0.3 * (1.0 - t) * p;
        }
        sum += self.temp_prod_gain * tp;

        if f > 0.7 && d > 0.6 {
            sum += self.front_depth_gain * 0.4 * f * d;
        }

        if t < 0.5 && d > 0.7 {
            sum += self.temp_depth_gain * 0.3 * sp.thermoregulation * (1.0 - t) * d;
        }

        if let Some(dist) = present(x.land_distance) {
            sum += self.coastal_gain * (sp.coastal_affinity - 0.5) * (-dist / self.coastal_scale_cells).exp();
        }
        if let Some(speed) = present(x.current_speed) {
            sum += self.current_gain * (speed.max(0.0) / self.current_reference).tanh();
        }
        if let Some(o2) = present(x.dissolved_oxygen) {
            let span = self.hypoxic_upper - self.hypoxic_lower;
            sum -= self.oxygen_penalty * ((self.hypoxic_upper - o2) / span).clamp(0.0, 1.0);
        }
        if let Some(s) = present(x.salinity) {
            let outside = (self.salinity_min - s).max(s - self.salinity_max).max(0.0);
            sum -= self.salinity_penalty * (outside / self.salinity_span).min(1.0);
        }
        if let Some(storm) = present(x.storm_index) {
            sum -= self.storm_penalty * storm.clamp(0.0, 1.0);
        }
        sum
    }

    /// `clamp(1 + Σ terms, min_multiplier, max_multiplier)`.
    pub fn multiplier(&self, x: &SynergyInputs, sp: &SpeciesParameters) -> f32 {
        (1.0 + self.term_sum(x, sp)).clamp(self.min_multiplier, self.max_multiplier) as f32
    }
}

/// Approximate Euclidean distance (8-neighbour chamfer, steps 1 and √2) from each cell
/// to the nearest land cell (`bathymetry > 0`). `None` when the grid has no land.
pub fn land_distance_cells(bathymetry: &Grid) -> Option<Grid> {
    let (h, w) = bathymetry.shape();
    let mut dist = bathymetry.map(|b| if b > 0.0 { 0.0 } else { f32::INFINITY });
    if !dist.data.iter().any(|&d| d == 0.0) {
        return None;
    }
    const DIAG: f32 = std::f32::consts::SQRT_2;

    // Forward pass: north-west neighbours.
    for r in 0..h {
        for c in 0..w {
            let mut best = dist.get(r, c);
            if c > 0 {
                best = best.min(dist.get(r, c - 1) + 1.0);
            }
            if r > 0 {
                best = best.min(dist.get(r - 1, c) + 1.0);
                if c > 0 {
                    best = best.min(dist.get(r - 1, c - 1) + DIAG);
                }
                if c + 1 < w {
                    best = best.min(dist.get(r - 1, c + 1) + DIAG);
                }
            }
            dist.set(r, c, best);
        }
    }
    // Backward pass: south-east neighbours.
    for r in (0..h).rev() {
        for c in (0..w).rev() {
            let mut best = dist.get(r, c);
            if c + 1 < w {
                best = best.min(dist.get(r, c + 1) + 1.0);
            }
            if r + 1 < h {
                best = best.min(dist.get(r + 1, c) + 1.0);
                if c + 1 < w {
                    best = best.min(dist.get(r + 1, c + 1) + DIAG);
                }
                if c > 0 {
                    best = best.min(dist.get(r + 1, c - 1) + DIAG);
                }
            }
            dist.set(r, c, best);
        }
    }
    Some(dist)
}

/// Multiplier grid for one species over `env`, given its base factor grids.
pub fn synergy_grid(
    temperature: &Grid,
    productivity: &Grid,
    frontal: &Grid,
    depth: &Grid,
    env: &EnvironmentalGrid,
    sp: &SpeciesParameters,
    cfg: &SynergyConfig,
) -> Grid {
    let land = land_distance_cells(&env.bathymetry);
    let at = |g: &Option<Grid>, i: usize| g.as_ref().map(|g| g.data[i]);
    let mut out = Grid::filled(temperature.width, temperature.height, 1.0);
    for i in 0..out.len() {
        let inputs = SynergyInputs {
            temperature: temperature.data[i],
            productivity: productivity.data[i],
            frontal: frontal.data[i],
            depth: depth.data[i],
            land_distance: at(&land, i),
            current_speed: at(&env.current_speed, i),
            dissolved_oxygen: at(&env.dissolved_oxygen, i),
            salinity: at(&env.salinity, i),
            storm_index: at(&env.storm_index, i),
        };
        out.data[i] = cfg.multiplier(&inputs, sp);
    }
    out
}
