//! Pipeline entry point: environment + species → HSI grid + summary.

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::combine::{combine_factors, HsiWeights};
use crate::environment::EnvironmentalGrid;
use crate::error::{HabitatError, Result};
use crate::grid::Grid;
use crate::species::SpeciesTable;
use crate::suitability::{FactorGrids, SuitabilityConstants, SynergyConfig};
use crate::summary::{summarize, HsiSummary, SummaryConfig};
use crate::uncertainty::uncertainty_grid;

/// Everything tunable about a run. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsiConfig {
    pub weights: HsiWeights,
    pub constants: SuitabilityConstants,
    /// `None` disables the synergy stage.
    pub synergy: Option<SynergyConfig>,
    pub summary: SummaryConfig,
    /// Above this fraction of missing cells the result carries a warning.
    pub max_missing_fraction: f32,
}

impl Default for HsiConfig {
    fn default() -> Self {
        Self {
            weights: HsiWeights::default(),
            constants: SuitabilityConstants::default(),
            synergy: Some(SynergyConfig::default()),
            summary: SummaryConfig::default(),
            max_missing_fraction: 0.5,
        }
    }
}

impl HsiConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.constants.validate()?;
        if let Some(s) = &self.synergy {
            s.validate()?;
        }
        self.summary.validate()?;
        if !(0.0..=1.0).contains(&self.max_missing_fraction) {
            return Err(HabitatError::InvalidConstant {
                name: "max_missing_fraction",
                reason: format!("{} is outside [0, 1]", self.max_missing_fraction),
            });
        }
        Ok(())
    }
}

/// Non-fatal data problems attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    HighMissingFraction { fraction: f32, threshold: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HsiResult {
    pub species_id: String,
    pub bounds: Bounds,
    /// Combined index, [0, 1] or NaN where inputs were missing.
    pub hsi: Grid,
    pub factors: FactorGrids,
    /// Per-cell prediction uncertainty in [0, 1], NaN where `hsi` is.
    pub uncertainty: Grid,
    pub summary: HsiSummary,
    pub quality: Vec<DataQualityWarning>,
}

/// A species table plus a validated configuration.
#[derive(Debug, Clone)]
pub struct HsiEngine {
    table: SpeciesTable,
    config: HsiConfig,
}

impl HsiEngine {
    pub fn new(table: SpeciesTable, config: HsiConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { table, config })
    }

    pub fn table(&self) -> &SpeciesTable {
        &self.table
    }

    pub fn config(&self) -> &HsiConfig {
        &self.config
    }

    /// Score `species_id` over a `grid_resolution × grid_resolution` environment.
    ///
    /// Checks, in order: bounds, resolution, grid shape, species id.
    pub fn compute_hsi(
        &self,
        bounds: &Bounds,
        grid_resolution: usize,
        species_id: &str,
        env: &EnvironmentalGrid,
    ) -> Result<HsiResult> {
        bounds.validate()?;
        if grid_resolution == 0 {
            return Err(HabitatError::InvalidResolution(grid_resolution));
        }
        env.validate()?;
        let expected = (grid_resolution, grid_resolution);
        if env.shape() != expected {
            return Err(HabitatError::ShapeMismatch { layer: "sst", expected, found: env.shape() });
        }
        let species = self.table.get(species_id)?;
        let cfg = &self.config;

        tracing::debug!("Scoring {} on a {}x{} grid", species_id, grid_resolution, grid_resolution);

        let mut quality = Vec::new();
        let missing = env.nan_fraction();
        if missing > cfg.max_missing_fraction {
            tracing::warn!(
                "{:.1}% of cells are missing input data (threshold {:.1}%)",
                missing * 100.0,
                cfg.max_missing_fraction * 100.0
            );
            quality.push(DataQualityWarning::HighMissingFraction {
                fraction: missing,
                threshold: cfg.max_missing_fraction,
            });
        }

        let factors = FactorGrids::compute(env, species, &cfg.constants, cfg.synergy.as_ref());
        let hsi = combine_factors(&factors, &cfg.weights)?;
        let uncertainty = uncertainty_grid(env, &factors, species, &cfg.weights);
        let summary = summarize(&hsi, Some(&uncertainty), bounds, &cfg.summary);

        Ok(HsiResult {
            species_id: species_id.to_string(),
            bounds: *bounds,
            hsi,
            factors,
            uncertainty,
            summary,
            quality,
        })
    }
}

/// One-shot form of [`HsiEngine::compute_hsi`].
pub fn compute_hsi(
    table: &SpeciesTable,
    config: &HsiConfig,
    bounds: &Bounds,
    grid_resolution: usize,
    species_id: &str,
    env: &EnvironmentalGrid,
) -> Result<HsiResult> {
    HsiEngine::new(table.clone(), config.clone())?.compute_hsi(bounds, grid_resolution, species_id, env)
}
