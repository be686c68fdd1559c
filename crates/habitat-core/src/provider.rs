//! Environmental data supply and the fetch-then-fallback orchestration step.
//!
//! The numeric core never talks to a data source directly. Callers hand a
//! [`GridProvider`] to [`acquire_environment`], which decides (per
//! [`FallbackPolicy`]) whether to use, patch or replace what came back, and
//! records that decision as a [`Provenance`].

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::dates::DateRange;
use crate::environment::EnvironmentalGrid;
use crate::error::{HabitatError, ProviderError, Result};
use crate::grid::Grid;
use crate::synth::SyntheticFieldSynthesizer;

/// Supplier of raw environmental grids. Results may contain NaN cells.
pub trait GridProvider {
    /// Short label for logs.
    fn name(&self) -> &str;

    fn fetch(
        &self,
        bounds: &Bounds,
        dates: &DateRange,
        resolution: usize,
    ) -> std::result::Result<EnvironmentalGrid, ProviderError>;
}

/// Provider backed by the synthetic field generator.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticProvider {
    synth: SyntheticFieldSynthesizer,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self { synth: SyntheticFieldSynthesizer::new(seed) }
    }
}

impl GridProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        bounds: &Bounds,
        dates: &DateRange,
        resolution: usize,
    ) -> std::result::Result<EnvironmentalGrid, ProviderError> {
        self.synth
            .synthesize_environment(bounds, dates, resolution)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))
    }
}

/// In-memory provider returning a fixed grid or a fixed error. Used for
/// grids loaded from disk and as a test fixture.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    response: std::result::Result<EnvironmentalGrid, ProviderError>,
}

impl StaticProvider {
    pub fn new(grid: EnvironmentalGrid) -> Self {
        Self { response: Ok(grid) }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self { response: Err(error) }
    }
}

impl GridProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, _: &Bounds, _: &DateRange, _: usize) -> std::result::Result<EnvironmentalGrid, ProviderError> {
        self.response.clone()
    }
}

/// What to do when the provider fails or returns gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Provider errors propagate to the caller.
    Never,
    /// Replace the whole grid with synthetic data when the fetch fails.
    #[default]
    OnError,
    /// As `OnError`, and also patch NaN cells from synthetic data, or replace
    /// the grid outright when more than `max_missing_fraction` is missing.
    FillGaps { max_missing_fraction: f32 },
}

/// Where the grid handed to the engine came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Observed,
    GapFilled { filled_cells: usize },
    Synthetic { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcedEnvironment {
    pub grid: EnvironmentalGrid,
    pub provenance: Provenance,
}

/// Fetch from `provider`, then apply `policy`.
///
/// A grid of the wrong shape is an error under every policy.
pub fn acquire_environment(
    provider: &dyn GridProvider,
    synth: &SyntheticFieldSynthesizer,
    bounds: &Bounds,
    dates: &DateRange,
    resolution: usize,
    policy: FallbackPolicy,
) -> Result<SourcedEnvironment> {
    bounds.validate()?;
    if resolution == 0 {
        return Err(HabitatError::InvalidResolution(resolution));
    }

    let synthetic = |reason: String| -> Result<SourcedEnvironment> {
        let grid = synth.synthesize_environment(bounds, dates, resolution)?;
        Ok(SourcedEnvironment { grid, provenance: Provenance::Synthetic { reason } })
    };

    let mut grid = match provider.fetch(bounds, dates, resolution) {
        Ok(grid) => grid,
        Err(e) if policy == FallbackPolicy::Never => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Provider '{}' failed ({}); using synthetic fields", provider.name(), e);
            return synthetic(e.to_string());
        }
    };

    grid.validate()?;
    let expected = (resolution, resolution);
    if grid.shape() != expected {
        return Err(HabitatError::ShapeMismatch { layer: "sst", expected, found: grid.shape() });
    }

    let FallbackPolicy::FillGaps { max_missing_fraction } = policy else {
        tracing::debug!("Provider '{}' grid accepted as observed", provider.name());
        return Ok(SourcedEnvironment { grid, provenance: Provenance::Observed });
    };

    let missing = grid.nan_fraction();
    if missing == 0.0 {
        return Ok(SourcedEnvironment { grid, provenance: Provenance::Observed });
    }
    if missing > max_missing_fraction {
        tracing::warn!(
            "Provider '{}' grid is {:.1}% missing (limit {:.1}%); using synthetic fields",
            provider.name(),
            missing * 100.0,
            max_missing_fraction * 100.0
        );
        return synthetic(ProviderError::Incomplete { missing_fraction: missing }.to_string());
    }

    let fill = synth.synthesize_environment(bounds, dates, resolution)?;
    let filled_cells = fill_gaps(&mut grid, &fill);
    tracing::info!("Gap-filled {} cells from synthetic fields", filled_cells);
    Ok(SourcedEnvironment { grid, provenance: Provenance::GapFilled { filled_cells } })
}

/// Replace NaN cells of `grid` with the corresponding cells of `fill`.
///
/// Required layers are always patched; optional layers only when both grids
/// carry them. Returns the number of cells where any required layer was NaN.
pub fn fill_gaps(grid: &mut EnvironmentalGrid, fill: &EnvironmentalGrid) -> usize {
    let mut touched = vec![false; grid.sst.len()];
    for (dst, src) in [
        (&mut grid.sst, &fill.sst),
        (&mut grid.chlorophyll, &fill.chlorophyll),
        (&mut grid.bathymetry, &fill.bathymetry),
    ] {
        patch(dst, src, Some(&mut touched));
    }
    for (dst, src) in [
        (&mut grid.current_speed, &fill.current_speed),
        (&mut grid.dissolved_oxygen, &fill.dissolved_oxygen),
        (&mut grid.salinity, &fill.salinity),
        (&mut grid.storm_index, &fill.storm_index),
    ] {
        if let (Some(dst), Some(src)) = (dst.as_mut(), src.as_ref()) {
            patch(dst, src, None);
        }
    }
    touched.iter().filter(|&&t| t).count()
}

fn patch(dst: &mut Grid, src: &Grid, mut touched: Option<&mut Vec<bool>>) {
    for (i, (d, &s)) in dst.data.iter_mut().zip(&src.data).enumerate() {
        if d.is_nan() {
            *d = s;
            if let Some(t) = touched.as_deref_mut() {
                t[i] = true;
            }
        }
    }
}
