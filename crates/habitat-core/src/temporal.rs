//! Multi-period analysis: persistence blending, connectivity smoothing and
//! trends across a series of HSI results.

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::dates::DateRange;
use crate::engine::HsiEngine;
use crate::error::{HabitatError, Result};
use crate::grid::Grid;
use crate::provider::{acquire_environment, FallbackPolicy, GridProvider, Provenance};
use crate::synth::SyntheticFieldSynthesizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Weight of the previous period in [`temporal_persistence`].
    pub persistence_alpha: f32,
    /// Side length of the square connectivity kernel, in cells.
    pub connectivity_kernel: usize,
    pub connectivity_beta: f32,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self { persistence_alpha: 0.7, connectivity_kernel: 5, connectivity_beta: 0.1 }
    }
}

impl TemporalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.persistence_alpha) {
            return Err(HabitatError::InvalidConstant {
                name: "persistence_alpha",
                reason: "must lie in [0, 1]".into(),
            });
        }
        if self.connectivity_kernel == 0 {
            return Err(HabitatError::InvalidConstant {
                name: "connectivity_kernel",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.connectivity_beta.is_finite() && self.connectivity_beta >= 0.0) {
            return Err(HabitatError::InvalidConstant {
                name: "connectivity_beta",
                reason: "must be finite and >= 0".into(),
            });
        }
        Ok(())
    }
}

/// `α·previous + (1 − α)·current`. Cells with no previous value keep the
/// current one; NaN in `current` stays NaN.
pub fn temporal_persistence(current: &Grid, previous: Option<&Grid>, alpha: f32) -> Result<Grid> {
    let Some(prev) = previous else {
        return Ok(current.clone());
    };
    if prev.shape() != current.shape() {
        return Err(HabitatError::ShapeMismatch { layer: "previous", expected: current.shape(), found: prev.shape() });
    }
    Ok(current.zip_map(prev, |c, p| if p.is_nan() { c } else { alpha * p + (1.0 - alpha) * c }))
}

/// `clip(HSI + β·box_mean(HSI), 0, 1)` with a `kernel × kernel` window.
///
/// Off-grid and NaN neighbours contribute zero (the window is always divided
/// by `kernel²`), and NaN cells stay NaN.
pub fn spatial_connectivity(hsi: &Grid, kernel: usize, beta: f32) -> Grid {
    let (h, w) = hsi.shape();
    let k = kernel.max(1);
    let before = (k - 1) / 2;
    let after = k - 1 - before;
    let norm = (k * k) as f64;
    Grid::from_fn(w, h, |r, c| {
        let v = hsi.get(r, c);
        if v.is_nan() {
            return f32::NAN;
        }
        let mut sum = 0.0f64;
        for rr in r.saturating_sub(before)..=(r + after).min(h - 1) {
            for cc in c.saturating_sub(before)..=(c + after).min(w - 1) {
                let n = hsi.get(rr, cc);
                if !n.is_nan() {
                    sum += n as f64;
                }
            }
        }
        (v + beta * (sum / norm) as f32).clamp(0.0, 1.0)
    })
}

/// One period's headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub label: String,
    pub mean_hsi: Option<f32>,
    /// Cells above the suitability threshold.
    pub suitable_cells: usize,
}

impl PeriodSummary {
    /// Mean over non-NaN cells (`None` if there are none) and the count of
    /// cells above `threshold`.
    pub fn from_grid(label: impl Into<String>, hsi: &Grid, threshold: f32) -> Self {
        let (mut sum, mut n) = (0.0f64, 0usize);
        for &v in hsi.data.iter().filter(|v| !v.is_nan()) {
            sum += v as f64;
            n += 1;
        }
        Self {
            label: label.into(),
            mean_hsi: (n > 0).then(|| (sum / n as f64) as f32),
            suitable_cells: hsi.data.iter().filter(|&&v| v > threshold).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalTrend {
    /// Least-squares slope of mean HSI per period.
    pub hsi_trend: f64,
    /// Least-squares slope of suitable cell count per period.
    pub area_trend: f64,
    /// Population std of the period means.
    pub seasonal_variation: f64,
    pub best_period: String,
    pub worst_period: String,
    pub mean_hsi_range: (f32, f32),
}

fn linear_slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let sx: f64 = x.iter().sum();
    let sy: f64 = y.iter().sum();
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    let sxy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let denom = n * sxx - sx * sx;
    if denom.abs() < 1e-14 {
        return 0.0;
    }
    (n * sxy - sx * sy) / denom
}

/// Trend over periods in chronological order. Periods without a defined
/// mean are skipped; `None` if none remain.
pub fn analyze_trend(periods: &[PeriodSummary]) -> Option<TemporalTrend> {
    let usable: Vec<(usize, &PeriodSummary, f32)> =
        periods.iter().enumerate().filter_map(|(i, p)| p.mean_hsi.map(|m| (i, p, m))).collect();
    let (_, first, first_mean) = usable.first()?;

    let x: Vec<f64> = usable.iter().map(|&(i, _, _)| i as f64).collect();
    let means: Vec<f64> = usable.iter().map(|&(_, _, m)| m as f64).collect();
    let areas: Vec<f64> = usable.iter().map(|&(_, p, _)| p.suitable_cells as f64).collect();

    let avg = means.iter().sum::<f64>() / means.len() as f64;
    let variance = means.iter().map(|m| (m - avg) * (m - avg)).sum::<f64>() / means.len() as f64;

    // Earliest period wins ties.
    let (mut best, mut worst) = ((*first, *first_mean), (*first, *first_mean));
    for &(_, p, m) in &usable[1..] {
        if m > best.1 {
            best = (p, m);
        }
        if m < worst.1 {
            worst = (p, m);
        }
    }

    Some(TemporalTrend {
        hsi_trend: linear_slope(&x, &means),
        area_trend: linear_slope(&x, &areas),
        seasonal_variation: variance.sqrt(),
        best_period: best.0.label.clone(),
        worst_period: worst.0.label.clone(),
        mean_hsi_range: (worst.1, best.1),
    })
}

/// One month of a [`seasonal_series`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPeriod {
    pub dates: DateRange,
    pub provenance: Provenance,
    /// HSI after persistence blending and connectivity smoothing.
    pub hsi: Grid,
    pub summary: PeriodSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalSeries {
    pub species_id: String,
    pub periods: Vec<SeriesPeriod>,
    pub trend: Option<TemporalTrend>,
}

/// Score `species_id` month by month across `dates`.
///
/// Each month's HSI is blended with the previous month's adjusted grid, then
/// smoothed for connectivity. Periods are labelled `YYYY-MM`.
#[allow(clippy::too_many_arguments)]
pub fn seasonal_series(
    engine: &HsiEngine,
    provider: &dyn GridProvider,
    synth: &SyntheticFieldSynthesizer,
    bounds: &Bounds,
    grid_resolution: usize,
    species_id: &str,
    dates: &DateRange,
    policy: FallbackPolicy,
    temporal: &TemporalConfig,
) -> Result<SeasonalSeries> {
    temporal.validate()?;
    let threshold = engine.config().summary.suitable_threshold;
    let mut periods: Vec<SeriesPeriod> = Vec::new();

    for month in dates.months() {
        let label = month.start.format("%Y-%m").to_string();
        let sourced = acquire_environment(provider, synth, bounds, &month, grid_resolution, policy)?;
        let raw = engine.compute_hsi(bounds, grid_resolution, species_id, &sourced.grid)?;
        let blended =
            temporal_persistence(&raw.hsi, periods.last().map(|p| &p.hsi), temporal.persistence_alpha)?;
        let hsi = spatial_connectivity(&blended, temporal.connectivity_kernel, temporal.connectivity_beta);
        let summary = PeriodSummary::from_grid(label, &hsi, threshold);
        tracing::debug!("{}: mean HSI {:?}", summary.label, summary.mean_hsi);
        periods.push(SeriesPeriod { dates: month, provenance: sourced.provenance, hsi, summary });
    }

    let summaries: Vec<PeriodSummary> = periods.iter().map(|p| p.summary.clone()).collect();
    Ok(SeasonalSeries { species_id: species_id.to_string(), trend: analyze_trend(&summaries), periods })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn period(label: &str, mean: Option<f32>, cells: usize) -> PeriodSummary {
        PeriodSummary { label: label.into(), mean_hsi: mean, suitable_cells: cells }
    }

    #[test]
    fn persistence_blends_with_history() {
        let cur = Grid::square(2, 1.0);
        let mut prev = Grid::square(2, 0.0);
        prev.set(1, 1, f32::NAN);
        let out = temporal_persistence(&cur, Some(&prev), 0.7).unwrap();
        assert_relative_eq!(out.get(0, 0), 0.3, epsilon = 1e-6);
        assert_eq!(out.get(1, 1), 1.0);
        assert_eq!(temporal_persistence(&cur, None, 0.7).unwrap(), cur);
        assert!(temporal_persistence(&cur, Some(&Grid::square(3, 0.0)), 0.7).is_err());
    }

    #[test]
    fn connectivity_boosts_clustered_cells_and_clips() {
        let mut g = Grid::square(7, 0.0);
        for r in 2..5 {
            for c in 2..5 {
                g.set(r, c, 0.5);
            }
        }
        g.set(0, 6, 0.5);
        let out = spatial_connectivity(&g, 3, 0.1);
        // Centre of the block sees nine 0.5 cells; the isolated cell sees one.
        assert_relative_eq!(out.get(3, 3), 0.5 + 0.1 * 0.5, epsilon = 1e-6);
        assert_relative_eq!(out.get(0, 6), 0.5 + 0.1 * 0.5 / 9.0, epsilon = 1e-6);
        assert!(out.get(3, 3) > out.get(0, 6));

        let full = spatial_connectivity(&Grid::square(4, 1.0), 5, 0.5);
        assert!(full.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn trend_slopes_and_extremes() {
        let periods = [
            period("winter", Some(0.2), 10),
            period("spring", Some(0.4), 30),
            period("summer", Some(0.6), 50),
            period("fall", Some(0.4), 30),
        ];
        let t = analyze_trend(&periods).unwrap();
        assert_eq!(t.best_period, "summer");
        assert_eq!(t.worst_period, "winter");
        assert_eq!(t.mean_hsi_range, (0.2, 0.6));
        assert!(t.hsi_trend > 0.0);
        assert_relative_eq!(t.area_trend, 100.0 * t.hsi_trend, epsilon = 1e-6);
        assert!(t.seasonal_variation > 0.1);
    }

    #[test]
    fn undefined_periods_are_skipped() {
        assert!(analyze_trend(&[]).is_none());
        assert!(analyze_trend(&[period("a", None, 0)]).is_none());
        let t = analyze_trend(&[period("a", None, 0), period("b", Some(0.5), 3)]).unwrap();
        assert_eq!(t.best_period, "b");
        assert_eq!(t.hsi_trend, 0.0);
    }

    #[test]
    fn period_summary_skips_nan() {
        let mut g = Grid::square(2, 0.5);
        g.set(0, 0, f32::NAN);
        g.set(1, 1, 0.9);
        let p = PeriodSummary::from_grid("x", &g, 0.6);
        assert_relative_eq!(p.mean_hsi.unwrap(), 1.9 / 3.0, epsilon = 1e-6);
        assert_eq!(p.suitable_cells, 1);
        assert_eq!(PeriodSummary::from_grid("y", &Grid::square(2, f32::NAN), 0.6).mean_hsi, None);
    }

    #[test]
    fn seasonal_series_covers_each_month() {
        use crate::engine::HsiConfig;
        use crate::provider::SyntheticProvider;
        use crate::species::SpeciesTable;
        use chrono::NaiveDate;

        let engine = HsiEngine::new(SpeciesTable::builtin(), HsiConfig::default()).unwrap();
        let bounds = Bounds::new(-125.0, 32.0, -115.0, 42.0).unwrap();
        let dates = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
        .unwrap();
        let run = || {
            seasonal_series(
                &engine,
                &SyntheticProvider::new(7),
                &SyntheticFieldSynthesizer::new(7),
                &bounds,
                10,
                "great_white",
                &dates,
                FallbackPolicy::Never,
                &TemporalConfig::default(),
            )
            .unwrap()
        };
        let series = run();
        let labels: Vec<&str> = series.periods.iter().map(|p| p.summary.label.as_str()).collect();
        assert_eq!(labels, ["2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]);
        assert!(series.periods.iter().all(|p| p.provenance == Provenance::Observed));
        for p in &series.periods {
            assert!(p.hsi.data.iter().all(|v| v.is_nan() || (0.0..=1.0).contains(v)));
        }
        assert!(series.trend.is_some());
        assert_eq!(series, run());
    }

    #[test]
    fn config_validation() {
        TemporalConfig::default().validate().unwrap();
        assert!(TemporalConfig { persistence_alpha: 1.5, ..Default::default() }.validate().is_err());
        assert!(TemporalConfig { connectivity_kernel: 0, ..Default::default() }.validate().is_err());
    }
}
