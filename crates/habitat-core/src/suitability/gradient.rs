//! Multi-scale gradient magnitude for front detection.
//!
//! Units are field units per grid cell. Each scale smooths the field with a
//! NaN-aware box blur, then takes finite differences: central in the interior,
//! forward/backward at edges and next to missing cells.

use crate::grid::Grid;
use crate::suitability::{ScaleCombine, SuitabilityConstants};

/// Box blur of the given radius, ignoring NaN neighbours. A NaN centre stays
/// NaN so missing cells are never filled in here.
pub fn box_blur(g: &Grid, radius: usize) -> Grid {
    if radius == 0 {
        return g.clone();
    }
    let (h, w) = g.shape();
    Grid::from_fn(w, h, |r, c| {
        if g.get(r, c).is_nan() {
            return f32::NAN;
        }
        let r0 = r.saturating_sub(radius);
        let r1 = (r + radius).min(h - 1);
        let c0 = c.saturating_sub(radius);
        let c1 = (c + radius).min(w - 1);
        let mut sum = 0.0f64;
        let mut n = 0u32;
        for rr in r0..=r1 {
            for cc in c0..=c1 {
                let v = g.get(rr, cc);
                if !v.is_nan() {
                    sum += v as f64;
                    n += 1;
                }
            }
        }
        (sum / n as f64) as f32
    })
}

/// One-axis derivative at a cell given its two neighbours (`None` when off-grid
/// or missing). Falls back to a one-sided difference, then to 0.
#[inline]
fn axis_derivative(prev: Option<f32>, centre: f64, next: Option<f32>) -> f64 {
    match (prev, next) {
        (Some(a), Some(b)) => (b as f64 - a as f64) / 2.0,
        (None, Some(b)) => b as f64 - centre,
        (Some(a), None) => centre - a as f64,
        (None, None) => 0.0,
    }
}

/// `|∇g|` per cell. NaN cells stay NaN.
pub fn gradient_magnitude(g: &Grid) -> Grid {
    let (h, w) = g.shape();
    let valid = |r: usize, c: usize| {
        let v = g.get(r, c);
        (!v.is_nan()).then_some(v)
    };
    Grid::from_fn(w, h, |r, c| {
        let z = g.get(r, c);
        if z.is_nan() {
            return f32::NAN;
        }
        let z = z as f64;
        let west = if c > 0 { valid(r, c - 1) } else { None };
        let east = if c + 1 < w { valid(r, c + 1) } else { None };
        let north = if r > 0 { valid(r - 1, c) } else { None };
        let south = if r + 1 < h { valid(r + 1, c) } else { None };
        let dx = axis_derivative(west, z, east);
        let dy = axis_derivative(north, z, south);
        (dx * dx + dy * dy).sqrt() as f32
    })
}

/// Gradient magnitude at each blur radius, merged per cell.
pub fn multiscale_gradient(g: &Grid, scales: &[usize], combine: ScaleCombine) -> Grid {
    let per_scale: Vec<Grid> = scales.iter().map(|&r| gradient_magnitude(&box_blur(g, r))).collect();
    let (h, w) = g.shape();
    if per_scale.is_empty() {
        return gradient_magnitude(g);
    }
    let mut out = Grid::filled(w, h, 0.0);
    for i in 0..out.len() {
        if g.data[i].is_nan() {
            out.data[i] = f32::NAN;
            continue;
        }
        let vals = per_scale.iter().map(|s| s.data[i]);
        out.data[i] = match combine {
            ScaleCombine::Mean => vals.sum::<f32>() / per_scale.len() as f32,
            ScaleCombine::Max => vals.fold(0.0, f32::max),
        };
    }
    out
}

/// Combined frontal gradient: `w_sst·|∇sst| + w_chl·|∇chl|`, each multi-scale.
/// The chlorophyll term is skipped entirely when its weight is zero.
pub fn frontal_gradient(sst: &Grid, chl: &Grid, c: &SuitabilityConstants) -> Grid {
    let g_sst = multiscale_gradient(sst, &c.front_scales, c.front_scale_combine);
    let w_sst = c.front_sst_weight as f32;
    if c.front_chl_weight == 0.0 {
        return g_sst.map(|v| w_sst * v);
    }
    let g_chl = multiscale_gradient(chl, &c.front_scales, c.front_scale_combine);
    let w_chl = c.front_chl_weight as f32;
    g_sst.zip_map(&g_chl, |a, b| w_sst * a + w_chl * b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_field_has_zero_gradient() {
        let g = Grid::square(8, 18.0);
        let m = multiscale_gradient(&g, &[1, 2, 3], ScaleCombine::Mean);
        assert!(m.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn linear_ramp_gives_unit_slope_everywhere() {
        // Interior uses central differences, edges one-sided; both see slope 1.
        let g = Grid::from_fn(6, 4, |_, c| c as f32);
        let m = gradient_magnitude(&g);
        for &v in &m.data {
            assert_relative_eq!(v, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn blur_skips_nan_neighbours_and_keeps_nan_centres() {
        let mut g = Grid::square(3, 1.0);
        g.set(0, 0, f32::NAN);
        g.set(2, 2, 10.0);
        let b = box_blur(&g, 1);
        assert!(b.get(0, 0).is_nan());
        // Centre averages the 8 valid cells: (7·1 + 10) / 8.
        assert_relative_eq!(b.get(1, 1), 17.0 / 8.0, epsilon = 1e-6);
    }

    #[test]
    fn max_combine_dominates_mean() {
        let g = Grid::from_fn(12, 12, |_, c| if c < 6 { 10.0 } else { 14.0 });
        let mean = multiscale_gradient(&g, &[1, 2, 3], ScaleCombine::Mean);
        let max = multiscale_gradient(&g, &[1, 2, 3], ScaleCombine::Max);
        for i in 0..mean.len() {
            assert!(max.data[i] >= mean.data[i] - 1e-6);
        }
        // The step produces a detectable front near the boundary.
        assert!(mean.get(6, 5) > 0.5);
    }

    #[test]
    fn chlorophyll_weight_zero_ignores_chlorophyll() {
        let sst = Grid::square(5, 20.0);
        let chl = Grid::from_fn(5, 5, |r, _| r as f32);
        let c = SuitabilityConstants { front_chl_weight: 0.0, ..Default::default() };
        assert!(frontal_gradient(&sst, &chl, &c).data.iter().all(|&v| v == 0.0));
        let c = SuitabilityConstants::default();
        assert!(frontal_gradient(&sst, &chl, &c).data.iter().all(|&v| v > 0.0));
    }
}
