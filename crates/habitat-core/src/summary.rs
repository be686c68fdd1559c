//! Reduce an HSI grid to a reportable summary.
//!
//! Statistics skip NaN cells. When no valid cell exists every statistic is
//! `None` (serialised as `null`) rather than a made-up zero.

use serde::{Deserialize, Serialize};

use crate::bounds::{Bounds, KM_PER_DEGREE};
use crate::error::{HabitatError, Result};
use crate::grid::Grid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Cells strictly above this count as suitable.
    pub suitable_threshold: f32,
    /// How many top cells to report.
    pub best_cells: usize,
    /// Cells strictly above this form high-suitability patches.
    pub patch_threshold: f32,
    pub max_patches: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { suitable_threshold: 0.4, best_cells: 5, patch_threshold: 0.6, max_patches: 5 }
    }
}

impl SummaryConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, t) in [("suitable_threshold", self.suitable_threshold), ("patch_threshold", self.patch_threshold)] {
            if !(0.0..=1.0).contains(&t) {
                return Err(HabitatError::InvalidConstant { name, reason: format!("{t} is outside [0, 1]") });
            }
        }
        Ok(())
    }
}

/// Cell counts per quality band. Bands partition [0, 1]:
/// `(0.8, 1]`, `(0.6, 0.8]`, `(0.4, 0.6]`, `(0.2, 0.4]`, `[0, 0.2]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityHistogram {
    pub excellent: usize,
    pub good: usize,
    pub moderate: usize,
    pub poor: usize,
    pub unsuitable: usize,
}

impl QualityHistogram {
    fn add(&mut self, v: f32) {
        if v > 0.8 {
            self.excellent += 1;
        } else if v > 0.6 {
            self.good += 1;
        } else if v > 0.4 {
            self.moderate += 1;
        } else if v > 0.2 {
            self.poor += 1;
        } else {
            self.unsuitable += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.moderate + self.poor + self.unsuitable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCell {
    pub row: usize,
    pub col: usize,
    pub lat: f64,
    pub lon: f64,
    pub hsi: f32,
}

/// A 4-connected region of high suitability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub cells: usize,
    pub mean_hsi: f32,
    pub peak_hsi: f32,
    /// Area-weighted centroid.
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub area_km2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsiSummary {
    pub mean: Option<f32>,
    pub max: Option<f32>,
    pub min: Option<f32>,
    /// Population standard deviation.
    pub std: Option<f32>,
    pub suitable_fraction: Option<f32>,
    /// Mean of the per-cell uncertainty grid, when one was supplied.
    pub mean_uncertainty: Option<f32>,
    pub quality_histogram: QualityHistogram,
    pub valid_cells: usize,
    pub total_cells: usize,
    pub best_cells: Vec<BestCell>,
    pub patches: Vec<Patch>,
}

/// Summarise `hsi`, whose cells are laid out over `bounds`.
pub fn summarize(hsi: &Grid, uncertainty: Option<&Grid>, bounds: &Bounds, config: &SummaryConfig) -> HsiSummary {
    let valid: Vec<(usize, f32)> =
        hsi.data.iter().enumerate().filter(|(_, v)| !v.is_nan()).map(|(i, &v)| (i, v)).collect();

    let mut quality_histogram = QualityHistogram::default();
    for &(_, v) in &valid {
        quality_histogram.add(v);
    }

    let (mean, max, min, std, suitable_fraction) = if valid.is_empty() {
        (None, None, None, None, None)
    } else {
        let n = valid.len() as f64;
        let mean = valid.iter().map(|&(_, v)| v as f64).sum::<f64>() / n;
        let variance = valid
            .iter()
            .map(|&(_, v)| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let suitable = valid.iter().filter(|&&(_, v)| v > config.suitable_threshold).count();
        (
            Some(mean as f32),
            hsi.finite_max(),
            hsi.finite_min(),
            Some(variance.sqrt() as f32),
            Some((suitable as f64 / n) as f32),
        )
    };

    HsiSummary {
        mean,
        max,
        min,
        std,
        suitable_fraction,
        mean_uncertainty: uncertainty.and_then(Grid::finite_mean),
        quality_histogram,
        valid_cells: valid.len(),
        total_cells: hsi.len(),
        best_cells: best_cells(hsi, valid, bounds, config.best_cells),
        patches: find_patches(hsi, bounds, config.patch_threshold, config.max_patches),
    }
}

fn best_cells(hsi: &Grid, mut valid: Vec<(usize, f32)>, bounds: &Bounds, n: usize) -> Vec<BestCell> {
    // Highest first; equal values keep row-major order.
    valid.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    valid
        .into_iter()
        .take(n)
        .map(|(i, v)| {
            let (row, col) = (i / hsi.width, i % hsi.width);
            let ll = bounds.cell_center(row, col, hsi.height, hsi.width);
            BestCell { row, col, lat: ll.lat, lon: ll.lon, hsi: v }
        })
        .collect()
}

/// 4-connected components of cells above `threshold`, largest first.
pub fn find_patches(hsi: &Grid, bounds: &Bounds, threshold: f32, max_patches: usize) -> Vec<Patch> {
    let (h, w) = hsi.shape();
    let (dy_km, _) = bounds.cell_size_km(h, w);
    let lon_step_km = bounds.width_deg() / w.max(1) as f64 * KM_PER_DEGREE;

    let mut seen = vec![false; hsi.len()];
    // (patch, first index) so ties sort deterministically.
    let mut found: Vec<(Patch, usize)> = Vec::new();
    let mut stack = Vec::new();

    for start in 0..hsi.len() {
        if seen[start] || hsi.data[start].is_nan() || hsi.data[start] <= threshold {
            continue;
        }
        seen[start] = true;
        stack.push(start);

        let (mut cells, mut sum, mut peak) = (0usize, 0.0f64, f32::NEG_INFINITY);
        let (mut area, mut lat_acc, mut lon_acc) = (0.0f64, 0.0f64, 0.0f64);
        while let Some(i) = stack.pop() {
            let (r, c) = (i / w, i % w);
            let v = hsi.data[i];
            let ll = bounds.cell_center(r, c, h, w);
            let a = dy_km * lon_step_km * ll.lat.to_radians().cos();
            cells += 1;
            sum += v as f64;
            peak = peak.max(v);
            area += a;
            lat_acc += a * ll.lat;
            lon_acc += a * ll.lon;

            let mut visit = |j: usize| {
                if !seen[j] && hsi.data[j] > threshold {
                    seen[j] = true;
                    stack.push(j);
                }
            };
            if r > 0 {
                visit(i - w);
            }
            if r + 1 < h {
                visit(i + w);
            }
            if c > 0 {
                visit(i - 1);
            }
            if c + 1 < w {
                visit(i + 1);
            }
        }

        let (centroid_lat, centroid_lon) = if area > 0.0 {
            (lat_acc / area, lon_acc / area)
        } else {
            let ll = bounds.cell_center(start / w, start % w, h, w);
            (ll.lat, ll.lon)
        };
        found.push((
            Patch {
                cells,
                mean_hsi: (sum / cells as f64) as f32,
                peak_hsi: peak,
                centroid_lat,
                centroid_lon,
                area_km2: area,
            },
            start,
        ));
    }

    found.sort_by(|(a, ia), (b, ib)| {
        b.cells.cmp(&a.cells).then(b.peak_hsi.total_cmp(&a.peak_hsi)).then(ia.cmp(ib))
    });
    found.into_iter().take(max_patches).map(|(p, _)| p).collect()
}
