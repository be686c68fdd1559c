//! Skill scores for an HSI grid against presence/absence observations.
//!
//! Observations are encoded as a grid of 1.0 (presence), 0.0 (absence) and
//! NaN (not surveyed). Unsurveyed or unscored cells are left out of every
//! statistic.

use serde::Serialize;

use crate::error::{HabitatError, Result};
use crate::grid::Grid;

/// Area under the ROC curve, via the rank-sum (Mann-Whitney) statistic with
/// tied scores given their average rank.
///
/// Pairs with a NaN score are skipped. `None` when the remaining labels are
/// all one class.
pub fn auc_roc(labels: &[bool], scores: &[f32]) -> Result<Option<f64>> {
    let mut pairs = scored_pairs(labels, scores)?;
    let n_pos = pairs.iter().filter(|p| p.1).count();
    let n_neg = pairs.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(None);
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut pos_rank_sum = 0.0f64;
    let mut i = 0;
    while i < pairs.len() {
        let mut j = i;
        while j + 1 < pairs.len() && pairs[j + 1].0 == pairs[i].0 {
            j += 1;
        }
        // 1-based ranks i+1 ..= j+1 share their mean.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        pos_rank_sum += rank * pairs[i..=j].iter().filter(|p| p.1).count() as f64;
        i = j + 1;
    }
    let (p, n) = (n_pos as f64, n_neg as f64);
    Ok(Some((pos_rank_sum - p * (p + 1.0) / 2.0) / (p * n)))
}

/// Precision and recall at every distinct score, highest threshold first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecisionRecall {
    pub thresholds: Vec<f32>,
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    /// `Σ (R_k - R_{k-1})·P_k` over the thresholds above.
    pub average_precision: f64,
}

/// Cells scoring at or above each threshold are predicted present.
/// `None` when there is no valid presence record.
pub fn precision_recall(labels: &[bool], scores: &[f32]) -> Result<Option<PrecisionRecall>> {
    let mut pairs = scored_pairs(labels, scores)?;
    let positives = pairs.iter().filter(|p| p.1).count();
    if positives == 0 {
        return Ok(None);
    }
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut out =
        PrecisionRecall { thresholds: Vec::new(), precision: Vec::new(), recall: Vec::new(), average_precision: 0.0 };
    let (mut tp, mut fp, mut last_recall) = (0usize, 0usize, 0.0f64);
    let mut i = 0;
    while i < pairs.len() {
        let threshold = pairs[i].0;
        while i < pairs.len() && pairs[i].0 == threshold {
            if pairs[i].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / positives as f64;
        out.average_precision += (recall - last_recall) * precision;
        last_recall = recall;
        out.thresholds.push(threshold);
        out.precision.push(precision);
        out.recall.push(recall);
    }
    Ok(Some(out))
}

fn scored_pairs(labels: &[bool], scores: &[f32]) -> Result<Vec<(f32, bool)>> {
    if labels.len() != scores.len() {
        return Err(HabitatError::LengthMismatch { what: "scores", expected: labels.len(), found: scores.len() });
    }
    Ok(scores.iter().zip(labels).filter(|(s, _)| !s.is_nan()).map(|(&s, &l)| (s, l)).collect())
}

/// Moran's I of a grid with binary queen-contiguity weights (8 neighbours).
///
/// NaN cells are dropped along with their links. `None` for fewer than four
/// valid cells, a constant field, or no linked pairs.
pub fn morans_i(grid: &Grid) -> Option<f32> {
    let (h, w) = grid.shape();
    let valid: Vec<(usize, f64)> =
        grid.data.iter().enumerate().filter(|(_, v)| v.is_finite()).map(|(i, &v)| (i, v as f64)).collect();
    if valid.len() < 4 || valid.iter().all(|&(_, v)| v == valid[0].1) {
        return None;
    }
    let mean = valid.iter().map(|(_, v)| v).sum::<f64>() / valid.len() as f64;
    let (mut w_sum, mut num, mut den) = (0.0f64, 0.0f64, 0.0f64);
    for &(i, vi) in &valid {
        let (ri, ci) = ((i / w) as i64, (i % w) as i64);
        den += (vi - mean) * (vi - mean);
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (rn, cn) = (ri + dr, ci + dc);
                if rn < 0 || cn < 0 || rn >= h as i64 || cn >= w as i64 {
                    continue;
                }
                let vj = grid.data[rn as usize * w + cn as usize];
                if vj.is_finite() {
                    num += (vi - mean) * (vj as f64 - mean);
                    w_sum += 1.0;
                }
            }
        }
    }
    if den == 0.0 || w_sum == 0.0 {
        return None;
    }
    let moran = (valid.len() as f64 / w_sum) * (num / den);
    moran.is_finite().then_some(moran as f32)
}

/// Skill of one HSI grid against an observation grid of the same shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub presences: usize,
    pub absences: usize,
    pub auc: Option<f64>,
    pub average_precision: Option<f64>,
    /// Spatial autocorrelation of `observed - hsi` over surveyed cells.
    /// Clustered residuals point at a missing covariate.
    pub residual_morans_i: Option<f32>,
}

pub fn validate_against(hsi: &Grid, observed: &Grid) -> Result<ValidationReport> {
    if hsi.shape() != observed.shape() {
        return Err(HabitatError::ShapeMismatch { layer: "observed", expected: hsi.shape(), found: observed.shape() });
    }
    let (mut labels, mut scores) = (Vec::new(), Vec::new());
    for (&o, &s) in observed.data.iter().zip(&hsi.data) {
        if !o.is_nan() {
            labels.push(o > 0.5);
            scores.push(s);
        }
    }
    let presences = labels.iter().filter(|&&l| l).count();
    let residuals = observed.zip_map(hsi, |o, s| o - s);

    Ok(ValidationReport {
        presences,
        absences: labels.len() - presences,
        auc: auc_roc(&labels, &scores)?,
        average_precision: precision_recall(&labels, &scores)?.map(|pr| pr.average_precision),
        residual_morans_i: morans_i(&residuals),
    })
}
