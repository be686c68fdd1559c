//! `habitat`: score shark habitat suitability from the command line.
//!
//! Environmental data comes from the synthetic provider unless `--grid`
//! points at a JSON-serialised `EnvironmentalGrid`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use habitat_core::{
    acquire_environment, compare_species, seasonal_series, validate_against, Bounds, DateRange, EnvironmentalGrid,
    FallbackPolicy, Grid, GridProvider, HsiConfig, HsiEngine, HsiSummary, Provenance, SpeciesTable, StaticProvider,
    SyntheticFieldSynthesizer, SyntheticProvider, TemporalConfig,
};

#[derive(Parser)]
#[command(name = "habitat")]
#[command(author, version, about = "Habitat suitability index for marine predators", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one species over a region.
    Score {
        /// Species id, e.g. great_white.
        #[arg(short, long)]
        species: String,

        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Score several species over the same region and rank them.
    Compare {
        /// Comma-separated species ids. Defaults to the whole table.
        #[arg(short, long, value_delimiter = ',')]
        species: Vec<String>,

        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Score one species month by month and report the trend.
    Seasonal {
        #[arg(short, long)]
        species: String,

        /// JSON `TemporalConfig`; defaults are used for missing fields.
        #[arg(long)]
        temporal: Option<PathBuf>,

        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Score one species and check it against presence/absence records.
    Validate {
        #[arg(short, long)]
        species: String,

        /// JSON `Grid` of 1 (presence), 0 (absence) or null (not surveyed).
        #[arg(long)]
        observed: PathBuf,

        #[command(flatten)]
        scene: SceneArgs,
    },
    /// List the species table.
    Species {
        #[arg(long)]
        species_table: Option<PathBuf>,
    },
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Args)]
struct SceneArgs {
    /// Region as west,south,east,north in degrees.
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    bounds: [f64; 4],

    /// Cells per side.
    #[arg(short, long, default_value = "25")]
    resolution: usize,

    /// First day, YYYY-MM-DD.
    #[arg(long)]
    start: NaiveDate,

    /// Last day, YYYY-MM-DD (inclusive).
    #[arg(long)]
    end: NaiveDate,

    /// Seed for synthetic fields.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// JSON `HsiConfig`; defaults are used for missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON species table replacing the built-in one.
    #[arg(long)]
    species_table: Option<PathBuf>,

    /// JSON `EnvironmentalGrid` to score instead of synthetic data.
    #[arg(long)]
    grid: Option<PathBuf>,

    /// What to do when the grid source fails or has gaps.
    #[arg(long, value_enum, default_value = "on-error")]
    fallback: Fallback,

    /// Missing fraction above which `fill-gaps` replaces the grid outright.
    #[arg(long, default_value = "0.5")]
    max_missing: f32,

    /// Write the full JSON result here instead of printing a summary.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Fallback {
    Never,
    OnError,
    FillGaps,
}

fn parse_bounds(s: &str) -> std::result::Result<[f64; 4], String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{p}': {e}")))
        .collect::<std::result::Result<_, _>>()?;
    match parts.as_slice() {
        &[w, s, e, n] => Ok([w, s, e, n]),
        _ => Err(format!("expected 4 comma-separated values, got {}", parts.len())),
    }
}

/// Everything a subcommand needs after the flags are resolved.
struct Scene {
    engine: HsiEngine,
    provider: Box<dyn GridProvider>,
    synth: SyntheticFieldSynthesizer,
    bounds: Bounds,
    dates: DateRange,
    resolution: usize,
    policy: FallbackPolicy,
}

impl SceneArgs {
    fn resolve(&self) -> Result<Scene> {
        let [west, south, east, north] = self.bounds;
        let bounds = Bounds::new(west, south, east, north).context("invalid --bounds")?;
        let dates = DateRange::new(self.start, self.end).context("invalid --start/--end")?;
        let config = match &self.config {
            Some(path) => read_json::<HsiConfig>(path)?,
            None => HsiConfig::default(),
        };
        let engine = HsiEngine::new(load_table(self.species_table.as_deref())?, config)
            .context("invalid configuration")?;
        let provider: Box<dyn GridProvider> = match &self.grid {
            Some(path) => Box::new(StaticProvider::new(read_json::<EnvironmentalGrid>(path)?)),
            None => Box::new(SyntheticProvider::new(self.seed)),
        };
        let policy = match self.fallback {
            Fallback::Never => FallbackPolicy::Never,
            Fallback::OnError => FallbackPolicy::OnError,
            Fallback::FillGaps => FallbackPolicy::FillGaps { max_missing_fraction: self.max_missing },
        };
        Ok(Scene {
            engine,
            provider,
            synth: SyntheticFieldSynthesizer::new(self.seed),
            bounds,
            dates,
            resolution: self.resolution,
            policy,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_table(path: Option<&Path>) -> Result<SpeciesTable> {
    let Some(path) = path else {
        return Ok(SpeciesTable::builtin());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    SpeciesTable::from_json(&text).with_context(|| format!("loading species table {}", path.display()))
}

/// Print `value` as pretty JSON, or write it to `output` when given.
fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct ScoreReport<'a> {
    species_id: &'a str,
    provenance: &'a Provenance,
    summary: &'a HsiSummary,
    quality: &'a [habitat_core::DataQualityWarning],
}

fn score(species: &str, args: &SceneArgs) -> Result<()> {
    let s = args.resolve()?;
    let sourced = acquire_environment(s.provider.as_ref(), &s.synth, &s.bounds, &s.dates, s.resolution, s.policy)
        .context("acquiring environmental data")?;
    let result = s
        .engine
        .compute_hsi(&s.bounds, s.resolution, species, &sourced.grid)
        .with_context(|| format!("scoring {species}"))?;

    if let Some(out) = &args.output {
        #[derive(Serialize)]
        struct Full<'a> {
            provenance: &'a Provenance,
            #[serde(flatten)]
            result: &'a habitat_core::HsiResult,
        }
        return emit(&Full { provenance: &sourced.provenance, result: &result }, Some(out.as_path()));
    }
    emit(
        &ScoreReport {
            species_id: &result.species_id,
            provenance: &sourced.provenance,
            summary: &result.summary,
            quality: &result.quality,
        },
        None,
    )
}

fn compare(species: &[String], args: &SceneArgs) -> Result<()> {
    let s = args.resolve()?;
    let ids: Vec<String> = if species.is_empty() {
        s.engine.table().ids().map(str::to_string).collect()
    } else {
        species.to_vec()
    };
    let sourced = acquire_environment(s.provider.as_ref(), &s.synth, &s.bounds, &s.dates, s.resolution, s.policy)
        .context("acquiring environmental data")?;
    let cmp = compare_species(&s.engine, &s.bounds, s.resolution, &ids, &sourced.grid)
        .context("comparing species")?;

    if args.output.is_some() {
        return emit(&cmp, args.output.as_deref());
    }
    for r in &cmp.ranking {
        let fmt = |v: Option<f32>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"));
        println!(
            "{}. {} ({})  mean {}  max {}  suitable {}  uncertainty {}",
            r.rank,
            r.name,
            r.scientific_name,
            fmt(r.mean_hsi),
            fmt(r.max_hsi),
            fmt(r.suitable_fraction),
            fmt(r.mean_uncertainty)
        );
    }
    Ok(())
}

fn validate(species: &str, observed: &Path, args: &SceneArgs) -> Result<()> {
    let s = args.resolve()?;
    let sourced = acquire_environment(s.provider.as_ref(), &s.synth, &s.bounds, &s.dates, s.resolution, s.policy)
        .context("acquiring environmental data")?;
    let result = s
        .engine
        .compute_hsi(&s.bounds, s.resolution, species, &sourced.grid)
        .with_context(|| format!("scoring {species}"))?;
    let observed = read_json::<Grid>(observed)?;
    let report = validate_against(&result.hsi, &observed).context("validating against observations")?;
    if report.auc.is_none() {
        tracing::warn!("Observations need both presences and absences for AUC");
    }
    emit(&report, args.output.as_deref())
}

fn seasonal(species: &str, temporal: Option<&Path>, args: &SceneArgs) -> Result<()> {
    let s = args.resolve()?;
    let temporal = match temporal {
        Some(path) => read_json::<TemporalConfig>(path)?,
        None => TemporalConfig::default(),
    };
    let series = seasonal_series(
        &s.engine,
        s.provider.as_ref(),
        &s.synth,
        &s.bounds,
        s.resolution,
        species,
        &s.dates,
        s.policy,
        &temporal,
    )
    .with_context(|| format!("seasonal series for {species}"))?;

    if args.output.is_some() {
        return emit(&series, args.output.as_deref());
    }
    let summaries: Vec<_> = series.periods.iter().map(|p| &p.summary).collect();
    emit(&serde_json::json!({ "species_id": series.species_id, "periods": summaries, "trend": series.trend }), None)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "habitat_core=info,warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Score { species, scene } => score(species, scene),
        Commands::Compare { species, scene } => compare(species, scene),
        Commands::Seasonal { species, temporal, scene } => seasonal(species, temporal.as_deref(), scene),
        Commands::Validate { species, observed, scene } => validate(species, observed, scene),
        Commands::Species { species_table } => {
            let table = load_table(species_table.as_deref())?;
            if table.is_empty() {
                bail!("species table is empty");
            }
            for (id, p) in table.iter() {
                println!(
                    "{id:<14} {:<24} {:<26} T_opt {:>5.1} °C  depth {:>5.0} m",
                    p.name, p.scientific_name, p.optimal_temperature, p.optimal_depth
                );
            }
            Ok(())
        }
        Commands::Config => emit(&HsiConfig::default(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_flag_parses_four_values() {
        assert_eq!(parse_bounds("-125,32,-115,42").unwrap(), [-125.0, 32.0, -115.0, 42.0]);
        assert_eq!(parse_bounds(" 1.5, 2 ,3,4").unwrap(), [1.5, 2.0, 3.0, 4.0]);
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
    }

    #[test]
    fn cli_accepts_negative_bounds_and_species_lists() {
        let cli = Cli::try_parse_from([
            "habitat",
            "compare",
            "--species",
            "great_white,mako",
            "--bounds",
            "-125,32,-115,42",
            "--start",
            "2024-06-01",
            "--end",
            "2024-06-30",
        ])
        .unwrap();
        match cli.command {
            Commands::Compare { species, scene } => {
                assert_eq!(species, ["great_white", "mako"]);
                assert_eq!(scene.bounds[0], -125.0);
                assert_eq!(scene.resolution, 25);
                assert!(scene.resolve().is_ok());
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn validate_requires_an_observation_file() {
        let mut args = vec![
            "habitat", "validate", "--species", "mako", "--bounds", "-125,32,-115,42", "--start", "2024-06-01",
            "--end", "2024-06-30",
        ];
        assert!(Cli::try_parse_from(args.clone()).is_err());

        args.extend(["--observed", "obs.json"]);
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Validate { species, observed, .. } => {
                assert_eq!(species, "mako");
                assert_eq!(observed, PathBuf::from("obs.json"));
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
