//! Per-factor suitability functions.
//!
//! Every function here is elementwise, total over the reals, and maps into
//! [0, 1] (NaN in, NaN out). Behaviour is driven entirely by the
//! [`SpeciesParameters`] record and [`SuitabilityConstants`]; nothing
//! branches on a species name.

pub mod depth;
pub mod frontal;
pub mod gradient;
pub mod productivity;
pub mod synergy;
pub mod temperature;

pub use depth::{depth_grid, depth_suitability};
pub use frontal::{frontal_grid, frontal_suitability, FrontalResponse};
pub use gradient::{box_blur, frontal_gradient, gradient_magnitude, multiscale_gradient};
pub use productivity::{productivity_grid, productivity_suitability, transferred_energy};
pub use synergy::{land_distance_cells, synergy_grid, SynergyConfig, SynergyInputs};
pub use temperature::{temperature_grid, temperature_suitability};

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentalGrid;
use crate::error::{HabitatError, Result};
use crate::grid::Grid;
use crate::species::SpeciesParameters;

/// How per-scale gradient magnitudes are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleCombine {
    #[default]
    Mean,
    Max,
}

/// Empirical constants shared by all species. Defaults are literature values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityConstants {
    /// Eppley temperature coefficient k_T in `PP = chl·exp(k_T·sst)`.
    pub eppley_coefficient: f64,
    /// Energy retained per trophic step.
    pub transfer_efficiency: f64,
    /// Warm-side σ as a fraction of the species tolerance.
    pub warm_side_ratio: f64,
    pub front_steepness: f64,
    /// Sigmoid centre, °C per grid cell.
    pub front_threshold: f64,
    pub front_response: FrontalResponse,
    /// Box-blur radii in cells. Radius 0 means no smoothing.
    pub front_scales: Vec<usize>,
    pub front_scale_combine: ScaleCombine,
    pub front_sst_weight: f64,
    pub front_chl_weight: f64,
}

impl Default for SuitabilityConstants {
    fn default() -> Self {
        Self {
            eppley_coefficient: 0.0633,
            transfer_efficiency: 0.1,
            warm_side_ratio: 0.7,
            front_steepness: 8.0,
            front_threshold: 0.0,
            front_response: FrontalResponse::Scaled,
            front_scales: vec![1, 2, 3],
            front_scale_combine: ScaleCombine::Mean,
            front_sst_weight: 0.7,
            front_chl_weight: 0.3,
        }
    }
}

impl SuitabilityConstants {
    pub fn validate(&self) -> Result<()> {
        let bad = |name: &'static str, reason: &str| {
            Err(HabitatError::InvalidConstant { name, reason: reason.to_string() })
        };
        if !self.eppley_coefficient.is_finite() {
            return bad("eppley_coefficient", "must be finite");
        }
        if !(self.transfer_efficiency > 0.0 && self.transfer_efficiency <= 1.0) {
            return bad("transfer_efficiency", "must lie in (0, 1]");
        }
        if !(self.warm_side_ratio.is_finite() && self.warm_side_ratio > 0.0) {
            return bad("warm_side_ratio", "must be finite and > 0");
        }
        if !(self.front_steepness.is_finite() && self.front_steepness > 0.0) {
            return bad("front_steepness", "must be finite and > 0");
        }
        if !self.front_threshold.is_finite() {
            return bad("front_threshold", "must be finite");
        }
        if self.front_scales.is_empty() {
            return bad("front_scales", "at least one scale is required");
        }
        for (name, w) in [("front_sst_weight", self.front_sst_weight), ("front_chl_weight", self.front_chl_weight)] {
            if !(w.is_finite() && w >= 0.0) {
                return bad(name, "must be finite and >= 0");
            }
        }
        Ok(())
    }
}

/// The per-factor suitability grids behind one HSI grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorGrids {
    pub temperature: Grid,
    pub productivity: Grid,
    pub frontal: Grid,
    pub depth: Grid,
    /// Multiplier grid; all 1.0 when the synergy stage is disabled.
    pub synergy: Grid,
    /// Combined multi-scale gradient behind `frontal`, per grid cell.
    pub gradient: Grid,
}

impl FactorGrids {
    /// Evaluate every factor for `species` over `env`.
    pub fn compute(
        env: &EnvironmentalGrid,
        species: &SpeciesParameters,
        constants: &SuitabilityConstants,
        synergy: Option<&SynergyConfig>,
    ) -> Self {
        let temperature = temperature_grid(&env.sst, species, constants);
        let productivity = productivity_grid(&env.chlorophyll, &env.sst, species, constants);
        let gradient = frontal_gradient(&env.sst, &env.chlorophyll, constants);
        let frontal = frontal_grid(&gradient, species, constants);
        let depth = depth_grid(&env.bathymetry, species);

        let synergy = match synergy {
            Some(cfg) => synergy_grid(&temperature, &productivity, &frontal, &depth, env, species, cfg),
            None => Grid::filled(env.sst.width, env.sst.height, 1.0),
        };

        Self { temperature, productivity, frontal, depth, synergy, gradient }
    }

    /// The four base factors in weight order: temperature, productivity, frontal, depth.
    pub fn base(&self) -> [&Grid; 4] {
        [&self.temperature, &self.productivity, &self.frontal, &self.depth]
    }

    /// All grids with stable names, for rendering and reports.
    pub fn named(&self) -> [(&'static str, &Grid); 5] {
        [
            ("temperature", &self.temperature),
            ("productivity", &self.productivity),
            ("frontal", &self.frontal),
            ("depth", &self.depth),
            ("synergy", &self.synergy),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesTable;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn default_constants_validate() {
        SuitabilityConstants::default().validate().unwrap();
    }

    #[test]
    fn bad_constants_name_the_field() {
        let c = SuitabilityConstants { transfer_efficiency: 0.0, ..Default::default() };
        assert!(matches!(c.validate(), Err(HabitatError::InvalidConstant { name: "transfer_efficiency", .. })));
        let c = SuitabilityConstants { front_scales: vec![], ..Default::default() };
        assert!(matches!(c.validate(), Err(HabitatError::InvalidConstant { name: "front_scales", .. })));
    }

    #[test]
    fn constants_deserialize_with_defaults() {
        let c: SuitabilityConstants =
            serde_json::from_str(r#"{"front_steepness": 12.0, "front_scale_combine": "max", "front_response": "blended"}"#)
                .unwrap();
        assert_eq!(c.front_steepness, 12.0);
        assert_eq!(c.front_response, FrontalResponse::Blended);
        assert_eq!(c.front_scale_combine, ScaleCombine::Max);
        assert_eq!(c.eppley_coefficient, 0.0633);
    }

    /// Random scalar inputs across ±1000 never leave [0, 1] and never produce NaN.
    #[test]
    fn scalar_factors_bounded_for_extreme_inputs() {
        let table = SpeciesTable::builtin();
        let c = SuitabilityConstants::default();
        let mut rng = StdRng::seed_from_u64(42);
        for (_, sp) in table.iter() {
            for _ in 0..2000 {
                let t: f32 = rng.gen_range(-1000.0..1000.0);
                let chl: f32 = rng.gen_range(-1000.0..1000.0);
                let depth: f32 = rng.gen_range(-1000.0..1000.0);
                let g: f64 = rng.gen_range(0.0..1000.0);
                for s in [
                    temperature_suitability(t, sp, &c),
                    productivity_suitability(chl, t, sp, &c),
                    depth_suitability(depth, sp),
                    frontal_suitability(g as f32, sp, &c),
                ] {
                    assert!((0.0..=1.0).contains(&s), "factor {s} out of range for t={t} chl={chl}");
                }
            }
        }
    }

    #[test]
    fn factor_grids_share_the_environment_shape() {
        let table = SpeciesTable::builtin();
        let env = EnvironmentalGrid::uniform(6, 20.0, 0.5, -100.0);
        let f = FactorGrids::compute(
            &env,
            table.get("mako").unwrap(),
            &SuitabilityConstants::default(),
            None,
        );
        for (name, g) in f.named() {
            assert_eq!(g.shape(), (6, 6), "{name}");
        }
        assert!(f.synergy.data.iter().all(|&v| v == 1.0));
    }
}
