//! Deterministic synthetic ocean fields.
//!
//! Each field is analytic climatology (latitude band, season, distance to a
//! synthetic coastline) plus low-frequency fBm, hard-clipped to the variable's
//! physical range. Output depends only on `(seed, bounds, dates, resolution)`.

pub mod fbm;

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::dates::DateRange;
use crate::environment::EnvironmentalGrid;
use crate::error::{HabitatError, Result};
use crate::grid::Grid;
use fbm::FieldNoise;

/// Variables the synthesizer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticVariable {
    SeaSurfaceTemperature,
    Chlorophyll,
    Bathymetry,
    CurrentSpeed,
    DissolvedOxygen,
}

impl SyntheticVariable {
    pub const ALL: [SyntheticVariable; 5] = [
        Self::SeaSurfaceTemperature,
        Self::Chlorophyll,
        Self::Bathymetry,
        Self::CurrentSpeed,
        Self::DissolvedOxygen,
    ];

    /// Hard physical range every output value is clipped to.
    pub fn range(self) -> (f32, f32) {
        match self {
            Self::SeaSurfaceTemperature => (-2.0, 32.0),
            Self::Chlorophyll => (0.01, 10.0),
            Self::Bathymetry => (-6000.0, 500.0),
            Self::CurrentSpeed => (0.0, 2.5),
            Self::DissolvedOxygen => (0.0, 12.0),
        }
    }

    fn salt(self) -> u64 {
        match self {
            Self::SeaSurfaceTemperature => 0x5357_0001,
            Self::Chlorophyll => 0xC41_0002,
            Self::Bathymetry => 0xBA7_0003,
            Self::CurrentSpeed => 0xC0_0004,
            Self::DissolvedOxygen => 0xD0_0005,
        }
    }
}

const COAST_SALT: u64 = 0xC0A5_7000;

/// SplitMix64 finaliser.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fold the request into one 64-bit seed.
fn request_seed(seed: u64, b: &Bounds, dates: &DateRange, salt: u64) -> u64 {
    [
        b.west.to_bits(),
        b.south.to_bits(),
        b.east.to_bits(),
        b.north.to_bits(),
        dates.start_day_number() as u64,
        dates.end_day_number() as u64,
        salt,
    ]
    .into_iter()
    .fold(splitmix64(seed), |h, v| splitmix64(h ^ v))
}

/// Sea-surface temperature climatology from latitude alone, °C.
fn latitude_sst(lat: f64) -> f64 {
    28.0 - 0.65 * (lat.abs() - 20.0).max(0.0)
}

/// Seasonal anomaly: warmest in August (north) / February (south).
fn seasonal_sst(lat: f64, month: u32) -> f64 {
    let peak = if lat >= 0.0 { 8.0 } else { 2.0 };
    3.5 * ((month as f64 - peak) * PI / 6.0).cos()
}

/// Spring bloom in chlorophyll, mg/m³: April (north) / October (south).
fn spring_bloom(lat: f64, month: u32) -> f64 {
    let peak = if lat >= 0.0 { 4.0 } else { 10.0 };
    let mut dm = (month as f64 - peak).abs();
    if dm > 6.0 {
        dm = 12.0 - dm;
    }
    0.8 * (-0.5 * dm * dm).exp()
}

/// Per-request geometry shared by every variable: cell centres and the
/// distance (degrees of longitude, positive offshore) to the coastline.
struct Scene {
    n: usize,
    lat: Vec<f64>,
    coast_distance: Vec<f64>,
    month: u32,
}

impl Scene {
    fn new(seed: u64, bounds: &Bounds, dates: &DateRange, n: usize) -> Self {
        let coast_seed = request_seed(seed, bounds, dates, COAST_SALT);
        let mut rng = StdRng::seed_from_u64(coast_seed);
        let fraction: f64 = rng.gen_range(0.75..0.9);
        let wobble = FieldNoise::new(coast_seed ^ 0x77, n, n);

        let mut lat = Vec::with_capacity(n * n);
        let mut coast_distance = Vec::with_capacity(n * n);
        for r in 0..n {
            let coast_lon = bounds.west + bounds.width_deg() * (fraction + 0.04 * wobble.sample(r as f64, 0.0));
            for c in 0..n {
                let ll = bounds.cell_center(r, c, n, n);
                lat.push(ll.lat);
                coast_distance.push(coast_lon - ll.lon);
            }
        }
        Self { n, lat, coast_distance, month: dates.mid_month() }
    }
}

/// Generator of reproducible, physically bounded fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticFieldSynthesizer {
    seed: u64,
}

impl SyntheticFieldSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// One `resolution × resolution` field for `variable`.
    pub fn synthesize(
        &self,
        variable: SyntheticVariable,
        bounds: &Bounds,
        dates: &DateRange,
        resolution: usize,
    ) -> Result<Grid> {
        bounds.validate()?;
        if resolution == 0 {
            return Err(HabitatError::InvalidResolution(resolution));
        }
        let scene = Scene::new(self.seed, bounds, dates, resolution);
        Ok(self.field(variable, &scene, bounds, dates))
    }

    /// SST, chlorophyll, bathymetry, current speed and dissolved oxygen.
    /// Salinity and storm index are left unset.
    pub fn synthesize_environment(
        &self,
        bounds: &Bounds,
        dates: &DateRange,
        resolution: usize,
    ) -> Result<EnvironmentalGrid> {
        bounds.validate()?;
        if resolution == 0 {
            return Err(HabitatError::InvalidResolution(resolution));
        }
        let scene = Scene::new(self.seed, bounds, dates, resolution);
        let f = |v| self.field(v, &scene, bounds, dates);
        EnvironmentalGrid::new(
            f(SyntheticVariable::SeaSurfaceTemperature),
            f(SyntheticVariable::Chlorophyll),
            f(SyntheticVariable::Bathymetry),
        )?
        .with_current_speed(f(SyntheticVariable::CurrentSpeed))?
        .with_dissolved_oxygen(f(SyntheticVariable::DissolvedOxygen))
    }

    fn field(&self, variable: SyntheticVariable, scene: &Scene, bounds: &Bounds, dates: &DateRange) -> Grid {
        let n = scene.n;
        let noise = FieldNoise::new(request_seed(self.seed, bounds, dates, variable.salt()), n, n);
        let (lo, hi) = variable.range();
        let month = scene.month;

        Grid::from_fn(n, n, |r, c| {
            let i = r * n + c;
            let lat = scene.lat[i];
            let d = scene.coast_distance[i];
            let offshore = d.max(0.0);
            let eddy = noise.sample(r as f64, c as f64);

            let value = match variable {
                SyntheticVariable::SeaSurfaceTemperature => {
                    latitude_sst(lat) + seasonal_sst(lat, month) - 4.5 * (-offshore / 1.8).exp() + 1.8 * eddy
                }
                SyntheticVariable::Chlorophyll => {
                    let base = 0.06
                        + 1.6 * (-offshore / 2.2).exp()
                        + 2.2 * (-offshore / 1.5).exp()
                        + 0.6 * spring_bloom(lat, month);
                    base * (0.5 * eddy).exp()
                }
                SyntheticVariable::Bathymetry => {
                    if d < 0.0 {
                        // Land rises inland from the coastline; keep it strictly above sea level.
                        (5.0 + 400.0 * (1.0 - (d / 1.5).exp()) + 40.0 * eddy).max(1.0)
                    } else {
                        (-(20.0 + 4000.0 * (1.0 - (-offshore / 3.0).exp())) + 150.0 * eddy).min(-1.0)
                    }
                }
                SyntheticVariable::CurrentSpeed => 0.2 + 0.6 * (-offshore / 2.0).exp() + 0.25 * eddy,
                SyntheticVariable::DissolvedOxygen => 9.0 - 0.15 * latitude_sst(lat) + 0.8 * eddy,
            };
            (value as f32).clamp(lo, hi)
        })
    }
}
