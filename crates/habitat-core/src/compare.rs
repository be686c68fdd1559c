//! Score several species over one environment and rank them.

#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::engine::{HsiEngine, HsiResult};
use crate::environment::EnvironmentalGrid;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRanking {
    /// 1-based.
    pub rank: usize,
    pub species_id: String,
    pub name: String,
    pub scientific_name: String,
    pub mean_hsi: Option<f32>,
    pub max_hsi: Option<f32>,
    pub suitable_fraction: Option<f32>,
    pub mean_uncertainty: Option<f32>,
    pub optimal_temperature: f64,
}

/// Per-species results in input order plus the ranking derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesComparison {
    pub results: Vec<HsiResult>,
    pub ranking: Vec<SpeciesRanking>,
}

/// Run [`HsiEngine::compute_hsi`] for every id in `species_ids`.
///
/// Ranking is by mean HSI, highest first; species with no defined mean go
/// last and ties keep input order. Any failing species fails the whole call.
pub fn compare_species(
    engine: &HsiEngine,
    bounds: &Bounds,
    grid_resolution: usize,
    species_ids: &[String],
    env: &EnvironmentalGrid,
) -> Result<SpeciesComparison> {
    tracing::debug!("Comparing {} species", species_ids.len());

    let score = |id: &String| engine.compute_hsi(bounds, grid_resolution, id, env);
    #[cfg(feature = "threading")]
    let results: Vec<HsiResult> = species_ids.par_iter().map(score).collect::<Result<_>>()?;
    #[cfg(not(feature = "threading"))]
    let results: Vec<HsiResult> = species_ids.iter().map(score).collect::<Result<_>>()?;

    let mut order: Vec<usize> = (0..results.len()).collect();
    order.sort_by(|&a, &b| {
        let (ma, mb) = (results[a].summary.mean, results[b].summary.mean);
        match (ma, mb) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then(a.cmp(&b))
    });

    let mut ranking = Vec::with_capacity(order.len());
    for (pos, i) in order.into_iter().enumerate() {
        let r = &results[i];
        let sp = engine.table().get(&r.species_id)?;
        ranking.push(SpeciesRanking {
            rank: pos + 1,
            species_id: r.species_id.clone(),
            name: sp.name.clone(),
            scientific_name: sp.scientific_name.clone(),
            mean_hsi: r.summary.mean,
            max_hsi: r.summary.max,
            suitable_fraction: r.summary.suitable_fraction,
            mean_uncertainty: r.summary.mean_uncertainty,
            optimal_temperature: sp.optimal_temperature,
        });
    }

    Ok(SpeciesComparison { results, ranking })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HsiConfig;
    use crate::error::HabitatError;
    use crate::species::SpeciesTable;

    const N: usize = 12;

    fn engine() -> HsiEngine {
        HsiEngine::new(SpeciesTable::builtin(), HsiConfig::default()).unwrap()
    }

    fn bounds() -> Bounds {
        Bounds::new(-125.0, 32.0, -115.0, 42.0).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cool_water_favours_great_white_over_tiger() {
        let env = EnvironmentalGrid::uniform(N, 18.0, 2.0, -50.0);
        let cmp = compare_species(&engine(), &bounds(), N, &ids(&["tiger_shark", "great_white"]), &env).unwrap();
        // Results stay in input order; ranking is by mean.
        assert_eq!(cmp.results[0].species_id, "tiger_shark");
        assert_eq!(cmp.ranking[0].species_id, "great_white");
        assert_eq!(cmp.ranking[0].rank, 1);
        assert_eq!(cmp.ranking[1].rank, 2);
        assert!(cmp.ranking[0].mean_hsi > cmp.ranking[1].mean_hsi);
    }

    #[test]
    fn ranking_is_sorted_and_covers_every_species() {
        let env = EnvironmentalGrid::uniform(N, 24.0, 1.0, -200.0);
        let table = SpeciesTable::builtin();
        let all: Vec<String> = table.ids().map(str::to_string).collect();
        let cmp = compare_species(&engine(), &bounds(), N, &all, &env).unwrap();
        assert_eq!(cmp.ranking.len(), all.len());
        for pair in cmp.ranking.windows(2) {
            assert!(pair[0].mean_hsi.unwrap() >= pair[1].mean_hsi.unwrap());
        }
    }

    #[test]
    fn all_missing_species_rank_last_in_input_order() {
        let mut env = EnvironmentalGrid::uniform(N, 18.0, 2.0, -50.0);
        env.sst.data.iter_mut().for_each(|v| *v = f32::NAN);
        let cmp = compare_species(&engine(), &bounds(), N, &ids(&["mako", "great_white"]), &env).unwrap();
        assert_eq!(cmp.ranking[0].species_id, "mako");
        assert!(cmp.ranking.iter().all(|r| r.mean_hsi.is_none()));
    }

    #[test]
    fn unknown_species_fails_the_comparison() {
        let env = EnvironmentalGrid::uniform(N, 18.0, 2.0, -50.0);
        let err = compare_species(&engine(), &bounds(), N, &ids(&["great_white", "megalodon"]), &env).unwrap_err();
        assert_eq!(err, HabitatError::UnknownSpecies("megalodon".into()));
        let empty = compare_species(&engine(), &bounds(), N, &[], &env).unwrap();
        assert!(empty.ranking.is_empty());
    }
}
