use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 2D scalar raster stored as f32, row-major. NaN marks a missing cell.
/// Coordinates live on [`crate::bounds::Bounds`]; this type only knows its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Row-major cell values. Missing cells serialise as `null`.
    #[serde(with = "missing_as_null")]
    pub data: Vec<f32>,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Grid {
    /// Create a grid filled with the given value.
    pub fn filled(width: usize, height: usize, fill: f32) -> Self {
        Self { data: vec![fill; width * height], width, height }
    }

    /// Square `n × n` grid filled with `fill`.
    pub fn square(n: usize, fill: f32) -> Self {
        Self::filled(n, n, fill)
    }

    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for r in 0..height {
            for c in 0..width {
                data.push(f(r, c));
            }
        }
        Self { data, width, height }
    }

    /// `(rows, cols)`, the order used in shape-mismatch errors.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    /// Elementwise map into a new grid of the same shape.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self { data: self.data.iter().map(|&v| f(v)).collect(), width: self.width, height: self.height }
    }

    /// Elementwise combination of two same-shape grids.
    ///
    /// # Panics
    /// Panics if the shapes differ; callers validate shapes at the API boundary.
    pub fn zip_map(&self, other: &Grid, f: impl Fn(f32, f32) -> f32) -> Self {
        assert_eq!(self.shape(), other.shape(), "zip_map on grids of different shape");
        let data = self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect();
        Self { data, width: self.width, height: self.height }
    }

    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Fraction of NaN cells; 0 for an empty grid.
    pub fn nan_fraction(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.nan_count() as f32 / self.data.len() as f32
    }

    /// Minimum over non-NaN cells, `None` if there are none.
    pub fn finite_min(&self) -> Option<f32> {
        self.data.iter().cloned().filter(|v| !v.is_nan()).reduce(f32::min)
    }

    /// Maximum over non-NaN cells, `None` if there are none.
    pub fn finite_max(&self) -> Option<f32> {
        self.data.iter().cloned().filter(|v| !v.is_nan()).reduce(f32::max)
    }

    /// Mean over non-NaN cells, `None` if there are none.
    pub fn finite_mean(&self) -> Option<f32> {
        let (sum, n) = self
            .data
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
        (n > 0).then(|| (sum / n as f64) as f32)
    }
}

/// NaN <-> `null`, so a grid with gaps survives a JSON round trip.
mod missing_as_null {
    use super::*;

    pub fn serialize<S: Serializer>(data: &[f32], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(data.iter().map(|&v| (!v.is_nan()).then_some(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f32>, D::Error> {
        let cells = Vec::<Option<f32>>::deserialize(d)?;
        Ok(cells.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_is_row_major() {
        let g = Grid::from_fn(3, 2, |r, c| (r * 10 + c) as f32);
        assert_eq!(g.data, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(g.get(1, 2), 12.0);
        assert_eq!(g.shape(), (2, 3));
    }

    #[test]
    fn nan_statistics_skip_missing_cells() {
        let mut g = Grid::square(4, 1.0);
        g.set(0, 0, f32::NAN);
        g.set(3, 3, 5.0);
        assert_eq!(g.nan_count(), 1);
        assert!((g.nan_fraction() - 1.0 / 16.0).abs() < 1e-7);
        assert_eq!(g.finite_min(), Some(1.0));
        assert_eq!(g.finite_max(), Some(5.0));

        let all_nan = Grid::square(2, f32::NAN);
        assert_eq!(all_nan.finite_max(), None);
        assert_eq!(Grid::filled(0, 0, 0.0).nan_fraction(), 0.0);
    }

    #[test]
    fn missing_cells_survive_json() {
        let mut g = Grid::filled(3, 2, 18.5);
        g.set(0, 0, f32::NAN);
        g.set(1, 2, f32::NAN);
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.starts_with(r#"{"data":[null,18.5"#), "{json}");

        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.nan_count(), 2);
        assert!(back.get(0, 0).is_nan() && back.get(1, 2).is_nan());
        assert_eq!(back.get(0, 1), 18.5);
        assert_eq!(back.finite_mean(), Some(18.5));
        assert_eq!(Grid::square(2, f32::NAN).finite_mean(), None);
    }

    #[test]
    #[should_panic]
    fn zip_map_rejects_mismatched_shapes() {
        let a = Grid::filled(2, 3, 0.0);
        let b = Grid::filled(3, 2, 0.0);
        let _ = a.zip_map(&b, |x, y| x + y);
    }
}
