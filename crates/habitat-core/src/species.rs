//! Species ecological parameter records and the immutable lookup table.
//!
//! Built-in values follow published thermal and trophic estimates
//! (Jorgensen et al. 2010; Cortés 1999). Half-saturation constants are in
//! transferred-energy units: chlorophyll (mg/m³) after Eppley temperature
//! scaling and the trophic discount, so they are small numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HabitatError, Result};

/// Ecological parameters for one species. Immutable once in a [`SpeciesTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParameters {
    /// Common name, for reports.
    pub name: String,
    pub scientific_name: String,
    /// °C.
    pub optimal_temperature: f64,
    /// °C, Gaussian σ on the cold side.
    pub temperature_tolerance: f64,
    pub trophic_level: f64,
    /// Metres below sea level.
    pub optimal_depth: f64,
    pub depth_tolerance_shallow: f64,
    pub depth_tolerance_deep: f64,
    /// 0 = indifferent to fronts, 1 = strongly front-associated.
    pub frontal_affinity: f64,
    /// 0 = oceanic, 1 = strongly coastal.
    pub coastal_affinity: f64,
    pub productivity_half_saturation: f64,
    /// Ability to use deeper water to escape poor surface temperatures, 0 to 1.
    #[serde(default = "default_thermoregulation")]
    pub thermoregulation: f64,
}

fn default_thermoregulation() -> f64 {
    0.5
}

impl SpeciesParameters {
    /// Enforce the record invariants; `id` is only used in the error message.
    pub fn validate(&self, id: &str) -> Result<()> {
        let bad = |field: &'static str, reason: &str| {
            Err(HabitatError::InvalidSpecies { id: id.to_string(), field, reason: reason.to_string() })
        };
        let positive = [
            ("temperature_tolerance", self.temperature_tolerance),
            ("depth_tolerance_shallow", self.depth_tolerance_shallow),
            ("depth_tolerance_deep", self.depth_tolerance_deep),
            ("productivity_half_saturation", self.productivity_half_saturation),
        ];
        for (field, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return bad(field, "must be finite and > 0");
            }
        }
        if !self.optimal_temperature.is_finite() {
            return bad("optimal_temperature", "must be finite");
        }
        if !(self.trophic_level.is_finite() && self.trophic_level >= 1.0) {
            return bad("trophic_level", "must be >= 1");
        }
        if !(self.optimal_depth.is_finite() && self.optimal_depth >= 0.0) {
            return bad("optimal_depth", "must be finite and >= 0");
        }
        for (field, v) in [
            ("frontal_affinity", self.frontal_affinity),
            ("coastal_affinity", self.coastal_affinity),
            ("thermoregulation", self.thermoregulation),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return bad(field, "must lie in [0, 1]");
            }
        }
        Ok(())
    }
}

/// Immutable species-id → parameters table, validated on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SpeciesTable {
    entries: BTreeMap<String, SpeciesParameters>,
}

impl SpeciesTable {
    /// Build from `(id, record)` pairs, validating every record.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, SpeciesParameters)>) -> Result<Self> {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();
        for (id, p) in &entries {
            p.validate(id)?;
        }
        Ok(Self { entries })
    }

    /// Parse a JSON object of `{ "id": { ...record... } }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, SpeciesParameters> =
            serde_json::from_str(json).map_err(|e| HabitatError::SpeciesTableFormat(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// The literature-derived default table.
    pub fn builtin() -> Self {
        let rows: [(&str, &str, &str, [f64; 10]); 18] = [
            // id, name, scientific; T_opt, tol, TL, depth_opt, shallow, deep, front, coast, K_half, thermo
            ("great_white", "Great White Shark", "Carcharodon carcharias",
                [18.0, 3.5, 4.5, 50.0, 30.0, 100.0, 0.8, 0.6, 1.0e-4, 0.8]),
            ("tiger_shark", "Tiger Shark", "Galeocerdo cuvier",
                [25.0, 4.0, 4.2, 80.0, 40.0, 120.0, 0.6, 0.8, 2.0e-4, 0.3]),
            ("bull_shark", "Bull Shark", "Carcharhinus leucas",
                [27.0, 5.0, 4.0, 30.0, 15.0, 50.0, 0.4, 0.9, 4.0e-4, 0.3]),
            ("hammerhead", "Great Hammerhead Shark", "Sphyrna mokarran",
                [24.0, 3.0, 4.1, 60.0, 40.0, 120.0, 0.6, 0.5, 2.5e-4, 0.4]),
            ("mako", "Shortfin Mako Shark", "Isurus oxyrinchus",
                [20.0, 4.0, 4.3, 100.0, 80.0, 200.0, 0.9, 0.2, 1.5e-4, 0.9]),
            ("blue_shark", "Blue Shark", "Prionace glauca",
                [16.0, 4.0, 4.1, 150.0, 100.0, 200.0, 0.7, 0.1, 2.0e-4, 0.5]),
            // Filter feeders sit low in the food web and need far more transferred energy.
            ("whale_shark", "Whale Shark", "Rhincodon typus",
                [26.0, 3.0, 3.1, 30.0, 20.0, 80.0, 0.8, 0.4, 2.0e-3, 0.5]),
            ("basking_shark", "Basking Shark", "Cetorhinus maximus",
                [14.0, 4.0, 3.2, 20.0, 15.0, 80.0, 0.9, 0.3, 2.0e-3, 0.4]),
            ("thresher_shark", "Common Thresher Shark", "Alopias vulpinus",
                [19.0, 3.5, 4.2, 80.0, 60.0, 200.0, 0.7, 0.4, 2.0e-4, 0.7]),
            ("nurse_shark", "Nurse Shark", "Ginglymostoma cirratum",
                [26.0, 2.5, 4.1, 20.0, 15.0, 30.0, 0.2, 0.9, 3.0e-4, 0.2]),
            ("reef_shark", "Caribbean Reef Shark", "Carcharhinus perezi",
                [27.0, 2.0, 4.2, 40.0, 25.0, 40.0, 0.3, 0.8, 3.0e-4, 0.2]),
            ("lemon_shark", "Lemon Shark", "Negaprion brevirostris",
                [26.0, 3.5, 4.2, 20.0, 15.0, 40.0, 0.3, 0.9, 3.0e-4, 0.2]),
            ("blacktip_shark", "Blacktip Shark", "Carcharhinus limbatus",
                [25.0, 3.5, 4.2, 30.0, 20.0, 40.0, 0.5, 0.8, 3.0e-4, 0.3]),
            ("sandbar_shark", "Sandbar Shark", "Carcharhinus plumbeus",
                [22.0, 4.0, 4.1, 80.0, 50.0, 120.0, 0.4, 0.7, 2.5e-4, 0.4]),
            ("spinner_shark", "Spinner Shark", "Carcharhinus brevipinna",
                [24.0, 3.5, 4.2, 30.0, 20.0, 40.0, 0.5, 0.8, 3.0e-4, 0.3]),
            ("dusky_shark", "Dusky Shark", "Carcharhinus obscurus",
                [20.0, 4.5, 4.3, 100.0, 70.0, 180.0, 0.6, 0.6, 2.0e-4, 0.4]),
            ("silky_shark", "Silky Shark", "Carcharhinus falciformis",
                [24.0, 3.0, 4.3, 100.0, 80.0, 200.0, 0.7, 0.2, 2.0e-4, 0.4]),
            ("porbeagle_shark", "Porbeagle Shark", "Lamna nasus",
                [12.0, 4.0, 4.4, 150.0, 120.0, 300.0, 0.8, 0.3, 1.0e-4, 0.9]),
        ];
        let entries = rows.into_iter().map(|(id, name, sci, v)| {
            (
                id.to_string(),
                SpeciesParameters {
                    name: name.to_string(),
                    scientific_name: sci.to_string(),
                    optimal_temperature: v[0],
                    temperature_tolerance: v[1],
                    trophic_level: v[2],
                    optimal_depth: v[3],
                    depth_tolerance_shallow: v[4],
                    depth_tolerance_deep: v[5],
                    frontal_affinity: v[6],
                    coastal_affinity: v[7],
                    productivity_half_saturation: v[8],
                    thermoregulation: v[9],
                },
            )
        });
        Self { entries: entries.collect() }
    }

    /// Look up a species; unknown ids are an error, never a default species.
    pub fn get(&self, id: &str) -> Result<&SpeciesParameters> {
        self.entries.get(id).ok_or_else(|| HabitatError::UnknownSpecies(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpeciesParameters)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_records_are_valid() {
        let t = SpeciesTable::builtin();
        assert_eq!(t.len(), 18);
        for (id, p) in t.iter() {
            p.validate(id).unwrap();
        }
        let gw = t.get("great_white").unwrap();
        assert_eq!(gw.optimal_temperature, 18.0);
        assert_eq!(gw.temperature_tolerance, 3.5);
        assert_eq!(gw.optimal_depth, 50.0);
    }

    #[test]
    fn builtin_table_covers_reef_and_cold_water_species() {
        let t = SpeciesTable::builtin();
        for id in [
            "whale_shark", "basking_shark", "thresher_shark", "nurse_shark", "reef_shark", "lemon_shark",
            "blacktip_shark", "sandbar_shark", "spinner_shark", "dusky_shark", "silky_shark", "porbeagle_shark",
        ] {
            assert!(t.contains(id), "{id} missing");
        }
        assert_eq!(t.get("porbeagle_shark").unwrap().optimal_temperature, 12.0);
        assert_eq!(t.get("reef_shark").unwrap().scientific_name, "Carcharhinus perezi");
        let filter = t.get("whale_shark").unwrap();
        assert!(filter.trophic_level < t.get("great_white").unwrap().trophic_level);
    }

    #[test]
    fn thermoregulation_defaults_when_absent_from_json() {
        let mut v = serde_json::to_value(SpeciesTable::builtin().get("mako").unwrap()).unwrap();
        assert_eq!(v["thermoregulation"], 0.9);
        v.as_object_mut().unwrap().remove("thermoregulation");
        let t = SpeciesTable::from_json(&serde_json::json!({ "custom": v }).to_string()).unwrap();
        assert_eq!(t.get("custom").unwrap().thermoregulation, 0.5);
    }

    #[test]
    fn unknown_species_is_an_error() {
        let t = SpeciesTable::builtin();
        assert_eq!(t.get("megalodon"), Err(HabitatError::UnknownSpecies("megalodon".into())));
    }

    #[test]
    fn json_table_is_validated() {
        let mut p = SpeciesTable::builtin().get("mako").unwrap().clone();
        let ok = serde_json::json!({ "mako_variant": p }).to_string();
        let t = SpeciesTable::from_json(&ok).unwrap();
        assert!(t.contains("mako_variant"));

        p.temperature_tolerance = 0.0;
        let bad = serde_json::json!({ "mako_variant": p }).to_string();
        assert!(matches!(
            SpeciesTable::from_json(&bad),
            Err(HabitatError::InvalidSpecies { field: "temperature_tolerance", .. })
        ));

        assert!(matches!(SpeciesTable::from_json("[1, 2]"), Err(HabitatError::SpeciesTableFormat(_))));
    }

    #[test]
    fn trophic_level_below_one_rejected() {
        let mut p = SpeciesTable::builtin().get("bull_shark").unwrap().clone();
        p.trophic_level = 0.5;
        assert!(p.validate("bull_shark").is_err());
        p.trophic_level = 4.0;
        p.frontal_affinity = 1.2;
        assert!(p.validate("bull_shark").is_err());
    }
}
