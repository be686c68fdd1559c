//! Diagnostic visualizer: renders a synthetic scene's HSI and factor grids
//! as PNGs. Not part of the scoring pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use habitat_core::{
    Bounds, DateRange, Grid, HsiConfig, HsiEngine, SpeciesTable, SyntheticFieldSynthesizer,
};

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Render HSI diagnostics for a synthetic scene")]
struct Args {
    #[arg(short, long, default_value = "great_white")]
    species: String,

    /// west,south,east,north
    #[arg(long, default_value = "-125,32,-115,42", allow_hyphen_values = true)]
    bounds: String,

    #[arg(short, long, default_value = "200")]
    resolution: usize,

    #[arg(long, default_value = "42")]
    seed: u64,

    #[arg(long, default_value = "2024-06-01")]
    start: NaiveDate,

    #[arg(long, default_value = "2024-06-30")]
    end: NaiveDate,

    /// Images are upscaled by this factor.
    #[arg(long, default_value = "2")]
    scale: u32,

    #[arg(short, long, default_value = "data/debug")]
    out: PathBuf,
}

// ── Colour helpers ────────────────────────────────────────────────────────────

const MISSING: [u8; 3] = [255, 0, 255];

/// HSI [0, 1] → dark blue → teal → yellow → red.
fn hsi_color(v: f32) -> [u8; 3] {
    if v.is_nan() {
        return MISSING;
    }
    let stops: [(f32, [f32; 3]); 4] = [
        (0.0, [20.0, 24.0, 82.0]),
        (0.4, [32.0, 150.0, 140.0]),
        (0.7, [240.0, 220.0, 60.0]),
        (1.0, [200.0, 30.0, 30.0]),
    ];
    let v = v.clamp(0.0, 1.0);
    for w in stops.windows(2) {
        let ((a, ca), (b, cb)) = (w[0], w[1]);
        if v <= b {
            let t = (v - a) / (b - a);
            return [0usize, 1, 2].map(|i| (ca[i] + t * (cb[i] - ca[i])) as u8);
        }
    }
    [200, 30, 30]
}

/// Linear grey between `lo` and `hi`.
fn gray(v: f32, lo: f32, hi: f32) -> [u8; 3] {
    if v.is_nan() {
        return MISSING;
    }
    let t = ((v - lo) / (hi - lo).max(1e-6)).clamp(0.0, 1.0);
    let c = (t * 255.0) as u8;
    [c, c, c]
}

/// Bathymetry: land tan, ocean shaded by depth to 4000 m.
fn bathy_color(z: f32) -> [u8; 3] {
    if z.is_nan() {
        return MISSING;
    }
    if z > 0.0 {
        return [210, 180, 140];
    }
    let t = (-z / 4000.0).clamp(0.0, 1.0);
    [(90.0 * (1.0 - t)) as u8, (170.0 * (1.0 - t) + 30.0) as u8, (230.0 - 120.0 * t) as u8]
}

fn write_png(grid: &Grid, scale: u32, path: &Path, color: impl Fn(f32) -> [u8; 3]) -> Result<()> {
    let s = scale.max(1);
    let mut img = image::RgbImage::new(grid.width as u32 * s, grid.height as u32 * s);
    for r in 0..grid.height {
        for c in 0..grid.width {
            let px = image::Rgb(color(grid.get(r, c)));
            for dy in 0..s {
                for dx in 0..s {
                    img.put_pixel(c as u32 * s + dx, r as u32 * s + dy, px);
                }
            }
        }
    }
    img.save(path).with_context(|| format!("failed to save {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    let b: Vec<f64> = args
        .bounds
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .context("--bounds must be four numbers")?;
    let [west, south, east, north] = b[..] else {
        anyhow::bail!("--bounds needs exactly four values, got {}", b.len());
    };
    let bounds = Bounds::new(west, south, east, north)?;
    let dates = DateRange::new(args.start, args.end)?;
    let n = args.resolution;

    println!("Synthesizing {n}×{n} scene (seed {})…", args.seed);
    let env = SyntheticFieldSynthesizer::new(args.seed).synthesize_environment(&bounds, &dates, n)?;

    println!("Scoring {}…", args.species);
    let engine = HsiEngine::new(SpeciesTable::builtin(), HsiConfig::default())?;
    let result = engine.compute_hsi(&bounds, n, &args.species, &env)?;

    fs::create_dir_all(&args.out).with_context(|| format!("cannot create {}", args.out.display()))?;
    let out = |name: &str| args.out.join(name);

    write_png(&result.hsi, args.scale, &out("hsi.png"), hsi_color)?;
    for (name, grid) in result.factors.named() {
        let (lo, hi) = if name == "synergy" {
            (grid.finite_min().unwrap_or(0.0), grid.finite_max().unwrap_or(1.0))
        } else {
            (0.0, 1.0)
        };
        write_png(grid, args.scale, &out(&format!("factor_{name}.png")), |v| gray(v, lo, hi))?;
    }
    write_png(&result.uncertainty, args.scale, &out("uncertainty.png"), |v| gray(v, 0.0, 0.5))?;
    write_png(&env.sst, args.scale, &out("sst.png"), |v| gray(v, -2.0, 32.0))?;
    write_png(&env.bathymetry, args.scale, &out("bathymetry.png"), bathy_color)?;

    if let Some(mean) = result.summary.mean {
        println!("Mean HSI {mean:.3}, {} patches", result.summary.patches.len());
    }
    Ok(())
}
