//! Environmental covariate layers for one analysis request.
//!
//! Required layers: SST (°C), chlorophyll-a (mg/m³), bathymetry (m, negative
//! below sea level). Optional layers feed the synergy stage only.

use serde::{Deserialize, Serialize};

use crate::error::{HabitatError, Result};
use crate::grid::Grid;

/// Named collection of same-shape grids. Built through [`EnvironmentalGrid::new`]
/// so the shape invariant always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalGrid {
    pub sst: Grid,
    pub chlorophyll: Grid,
    /// Elevation relative to sea level; depth = -bathymetry.
    pub bathymetry: Grid,
    /// Surface current speed, m/s.
    #[serde(default)]
    pub current_speed: Option<Grid>,
    /// Dissolved oxygen, mg/L.
    #[serde(default)]
    pub dissolved_oxygen: Option<Grid>,
    /// Sea surface salinity, PSU.
    #[serde(default)]
    pub salinity: Option<Grid>,
    /// Storm activity, 0 (calm) to 1 (severe).
    #[serde(default)]
    pub storm_index: Option<Grid>,
}

impl EnvironmentalGrid {
    pub fn new(sst: Grid, chlorophyll: Grid, bathymetry: Grid) -> Result<Self> {
        let env = Self {
            sst,
            chlorophyll,
            bathymetry,
            current_speed: None,
            dissolved_oxygen: None,
            salinity: None,
            storm_index: None,
        };
        env.validate()?;
        Ok(env)
    }

    /// Uniform environment, handy for fixtures and scenario tests.
    pub fn uniform(n: usize, sst: f32, chlorophyll: f32, bathymetry: f32) -> Self {
        Self {
            sst: Grid::square(n, sst),
            chlorophyll: Grid::square(n, chlorophyll),
            bathymetry: Grid::square(n, bathymetry),
            current_speed: None,
            dissolved_oxygen: None,
            salinity: None,
            storm_index: None,
        }
    }

    pub fn with_current_speed(mut self, g: Grid) -> Result<Self> {
        self.current_speed = Some(g);
        self.validate()?;
        Ok(self)
    }

    pub fn with_dissolved_oxygen(mut self, g: Grid) -> Result<Self> {
        self.dissolved_oxygen = Some(g);
        self.validate()?;
        Ok(self)
    }

    pub fn with_salinity(mut self, g: Grid) -> Result<Self> {
        self.salinity = Some(g);
        self.validate()?;
        Ok(self)
    }

    pub fn with_storm_index(mut self, g: Grid) -> Result<Self> {
        self.storm_index = Some(g);
        self.validate()?;
        Ok(self)
    }

    /// `(rows, cols)` of every layer.
    pub fn shape(&self) -> (usize, usize) {
        self.sst.shape()
    }

    /// Check that every present layer matches the SST layer's shape.
    pub fn validate(&self) -> Result<()> {
        let expected = self.sst.shape();
        for (layer, grid) in self.layers() {
            if grid.shape() != expected || grid.data.len() != expected.0 * expected.1 {
                return Err(HabitatError::ShapeMismatch { layer, expected, found: grid.shape() });
            }
        }
        Ok(())
    }

    /// All present layers with their names, required layers first.
    pub fn layers(&self) -> Vec<(&'static str, &Grid)> {
        let mut out = vec![
            ("sst", &self.sst),
            ("chlorophyll", &self.chlorophyll),
            ("bathymetry", &self.bathymetry),
        ];
        let optional = [
            ("current_speed", &self.current_speed),
            ("dissolved_oxygen", &self.dissolved_oxygen),
            ("salinity", &self.salinity),
            ("storm_index", &self.storm_index),
        ];
        for (name, g) in optional {
            if let Some(g) = g {
                out.push((name, g));
            }
        }
        out
    }

    /// Fraction of cells where at least one required layer is NaN.
    pub fn nan_fraction(&self) -> f32 {
        let n = self.sst.len();
        if n == 0 {
            return 0.0;
        }
        let missing = (0..n)
            .filter(|&i| {
                self.sst.data[i].is_nan()
                    || self.chlorophyll.data[i].is_nan()
                    || self.bathymetry.data[i].is_nan()
            })
            .count();
        missing as f32 / n as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_layer_is_named() {
        let err = EnvironmentalGrid::new(Grid::square(4, 18.0), Grid::square(4, 1.0), Grid::filled(4, 3, -50.0))
            .unwrap_err();
        assert_eq!(
            err,
            HabitatError::ShapeMismatch { layer: "bathymetry", expected: (4, 4), found: (3, 4) }
        );

        let env = EnvironmentalGrid::uniform(4, 18.0, 1.0, -50.0);
        assert!(env.with_current_speed(Grid::square(5, 0.3)).is_err());
    }

    #[test]
    fn nan_fraction_counts_cells_not_values() {
        let mut env = EnvironmentalGrid::uniform(2, 18.0, 1.0, -50.0);
        env.sst.set(0, 0, f32::NAN);
        env.chlorophyll.set(0, 0, f32::NAN);
        env.bathymetry.set(1, 1, f32::NAN);
        assert!((env.nan_fraction() - 0.5).abs() < 1e-7);
    }

    #[test]
    fn optional_layers_are_listed_when_present() {
        let env = EnvironmentalGrid::uniform(3, 18.0, 1.0, -50.0)
            .with_storm_index(Grid::square(3, 0.2))
            .unwrap();
        let names: Vec<_> = env.layers().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["sst", "chlorophyll", "bathymetry", "storm_index"]);
    }
}
