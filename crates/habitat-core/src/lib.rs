//! Habitat suitability index (HSI) for marine predators over a lat/lon grid.
//!
//! The pipeline is pure and synchronous: an [`EnvironmentalGrid`] and a
//! species record go in, an [`HsiResult`] comes out. Data acquisition sits
//! behind [`GridProvider`], with a deterministic synthetic fallback.

pub mod bounds;
pub mod combine;
pub mod compare;
pub mod dates;
pub mod engine;
pub mod environment;
pub mod error;
pub mod grid;
pub mod provider;
pub mod species;
pub mod suitability;
pub mod summary;
pub mod synth;
pub mod temporal;
pub mod uncertainty;
pub mod validation;

pub use bounds::{Bounds, LatLon};
pub use combine::{combine_cell, combine_factors, HsiWeights};
pub use compare::{compare_species, SpeciesComparison, SpeciesRanking};
pub use dates::DateRange;
pub use engine::{compute_hsi, DataQualityWarning, HsiConfig, HsiEngine, HsiResult};
pub use environment::EnvironmentalGrid;
pub use error::{HabitatError, ProviderError, Result};
pub use grid::Grid;
pub use provider::{
    acquire_environment, FallbackPolicy, GridProvider, Provenance, SourcedEnvironment, StaticProvider,
    SyntheticProvider,
};
pub use species::{SpeciesParameters, SpeciesTable};
pub use suitability::{FactorGrids, FrontalResponse, SuitabilityConstants, SynergyConfig};
pub use summary::{summarize, HsiSummary, SummaryConfig};
pub use synth::{SyntheticFieldSynthesizer, SyntheticVariable};
pub use temporal::{analyze_trend, seasonal_series, PeriodSummary, SeasonalSeries, TemporalConfig, TemporalTrend};
pub use uncertainty::{ensemble_spread, uncertainty_grid, EnsembleSpread};
pub use validation::{auc_roc, morans_i, precision_recall, validate_against, PrecisionRecall, ValidationReport};
