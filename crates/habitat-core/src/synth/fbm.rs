//! Low-frequency fBm used for synthetic ocean fields.
//!
//! Three octaves, gain 0.5, lacunarity 2, base frequency of about two cycles
//! across the grid. Values are normalised by the amplitude sum so they stay
//! close to [-1, 1].

use noise::{NoiseFn, Perlin};

const OCTAVES: u32 = 3;
const GAIN: f64 = 0.5;
const LACUNARITY: f64 = 2.0;
const CYCLES: f64 = 2.0;

pub struct FieldNoise {
    noise: Perlin,
    /// Sub-lattice offset so cell (0, 0) does not sit on a Perlin zero.
    offset: [f64; 2],
    freq_x: f64,
    freq_y: f64,
    amp_sum: f64,
}

impl FieldNoise {
    pub fn new(seed: u64, width: usize, height: usize) -> Self {
        let frac = |bits: u64| (bits & 0xFFFF) as f64 / 65_536.0 * 7.0 + 0.31;
        Self {
            noise: Perlin::new((seed ^ (seed >> 32)) as u32),
            offset: [frac(seed >> 8), frac(seed >> 24)],
            freq_x: CYCLES / width.max(1) as f64,
            freq_y: CYCLES / height.max(1) as f64,
            amp_sum: (0..OCTAVES).map(|i| GAIN.powi(i as i32)).sum(),
        }
    }

    /// Normalised fBm at grid cell `(row, col)`.
    pub fn sample(&self, row: f64, col: f64) -> f64 {
        let x = col * self.freq_x + self.offset[0];
        let y = row * self.freq_y + self.offset[1];
        let mut val = 0.0_f64;
        let mut amp = 1.0_f64;
        let mut freq = 1.0_f64;
        for _ in 0..OCTAVES {
            val += amp * self.noise.get([x * freq, y * freq]);
            amp *= GAIN;
            freq *= LACUNARITY;
        }
        (val / self.amp_sum).clamp(-1.0, 1.0)
    }
}
