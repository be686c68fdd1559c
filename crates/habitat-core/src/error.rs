//! Error taxonomy for the habitat engine.
//!
//! Configuration problems fail fast at the call boundary with a message naming
//! the offending field. Data-quality problems are not errors; they travel on
//! [`crate::engine::HsiResult::quality`].

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HabitatError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HabitatError {
    #[error("invalid bounds (west={west}, south={south}, east={east}, north={north}): {reason}")]
    InvalidBounds {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
        reason: &'static str,
    },

    #[error("grid resolution must be positive, got {0}")]
    InvalidResolution(usize),

    #[error("unknown species id '{0}'")]
    UnknownSpecies(String),

    #[error("species '{id}': invalid {field}: {reason}")]
    InvalidSpecies {
        id: String,
        field: &'static str,
        reason: String,
    },

    #[error("invalid weight configuration: {0}")]
    InvalidWeights(String),

    #[error("invalid constant '{name}': {reason}")]
    InvalidConstant { name: &'static str, reason: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("layer '{layer}' has shape {found:?}, expected {expected:?} (rows, cols)")]
    ShapeMismatch {
        layer: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{what} has {found} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("no {0} supplied")]
    EmptyInput(&'static str),

    #[error("species table could not be parsed: {0}")]
    SpeciesTableFormat(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failures reported by a [`crate::provider::GridProvider`].
///
/// The core never swallows these; deciding to retry, fall back or abort is the
/// caller's job (see [`crate::provider::acquire_environment`]).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("grid provider unavailable: {0}")]
    Unavailable(String),

    #[error("grid provider returned incomplete data ({pct:.1}% missing)", pct = .missing_fraction * 100.0)]
    Incomplete { missing_fraction: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_field() {
        let e = HabitatError::InvalidSpecies {
            id: "mako".into(),
            field: "temperature_tolerance",
            reason: "must be > 0".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("mako") && msg.contains("temperature_tolerance"), "{msg}");

        let e = HabitatError::ShapeMismatch { layer: "sst", expected: (25, 25), found: (24, 25) };
        assert!(e.to_string().contains("sst"));
    }

    #[test]
    fn provider_errors_convert() {
        let e: HabitatError = ProviderError::Incomplete { missing_fraction: 0.75 }.into();
        assert!(e.to_string().contains("75.0%"), "{e}");
    }
}
