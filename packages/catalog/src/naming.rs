//! File naming for hazard catalogs and derived map products.
//!
//! Every artifact of a run shares the stem
//! `TC_{region}_0300as_CHAZ_{model}_{period}_{scenario}_{n}ens_{category}_{wind}`
//! so that tiles, basin subsets, and global products of one configuration
//! can be found by pattern.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tc_hazard_catalog_models::BasinCode;

use crate::select::Extent;

/// Grid resolution tag embedded in every file name (300 arc-seconds).
pub const RESOLUTION_TAG: &str = "0300as";

/// Track model tag embedded in every file name.
pub const TRACK_MODEL_TAG: &str = "CHAZ";

/// Model name of catalogs that stack every model of a run.
pub const ALL_MODELS: &str = "ALL-MODELS";

/// Climate models driving the track simulations.
pub const CLIMATE_MODELS: &[&str] = &[
    "CESM2",
    "CNRM-CM6-1",
    "EC-Earth3",
    "IPSL-CM6A-LR",
    "MIROC6",
    "UKESM1-0-LL",
];

/// Simulation period.
///
/// Exactly one period, [`Period::Base`], computes the frequency baseline;
/// the others reuse it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Period {
    /// Historical baseline period.
    Base,
    /// First future period.
    Fut1,
    /// Second future period.
    Fut2,
}

impl Period {
    /// All periods, baseline first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Base, Self::Fut1, Self::Fut2]
    }

    /// Whether this period computes the frequency baseline.
    #[must_use]
    pub const fn is_baseline(self) -> bool {
        matches!(self, Self::Base)
    }
}

/// Spatial scope of an artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Whole-globe product.
    Global,
    /// A single basin subset.
    Basin(BasinCode),
    /// A spatial tile.
    Tile(Extent),
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Basin(code) => write!(f, "{code}"),
            Self::Tile(e) => write!(f, "{}_{}_{}_{}", e.lon_min, e.lon_max, e.lat_min, e.lat_max),
        }
    }
}

/// Components of an artifact file name.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardFileName {
    /// Spatial scope.
    pub region: Region,
    /// Climate model (e.g. `"CESM2"`, or `"ALL-MODELS"` for combined runs).
    pub model: String,
    /// Simulation period.
    pub period: Period,
    /// Emission scenario (e.g. `"ssp370"`).
    pub scenario: String,
    /// Number of ensemble members.
    pub ensembles: u32,
    /// Genesis-index category (e.g. `"CRH"`, `"SD"`).
    pub category: String,
    /// Wind model tag (e.g. `"H08"`).
    pub wind_model: String,
}

impl HazardFileName {
    /// Same name with a different spatial scope.
    #[must_use]
    pub fn with_region(&self, region: Region) -> Self {
        Self {
            region,
            ..self.clone()
        }
    }

    /// Same name for a different period.
    #[must_use]
    pub fn with_period(&self, period: Period) -> Self {
        Self {
            period,
            ..self.clone()
        }
    }

    /// Same name for a catalog stacking `model_count` models of this
    /// run: the model becomes [`ALL_MODELS`] and the ensembles add up.
    #[must_use]
    pub fn combined(&self, model_count: u32) -> Self {
        Self {
            model: ALL_MODELS.to_string(),
            ensembles: self.ensembles * model_count,
            ..self.clone()
        }
    }

    /// The part after the region: shared by every tile of one run.
    #[must_use]
    pub fn base_name(&self) -> String {
        format!(
            "{RESOLUTION_TAG}_{TRACK_MODEL_TAG}_{}_{}_{}_{}ens_{}_{}",
            self.model, self.period, self.scenario, self.ensembles, self.category, self.wind_model
        )
    }

    /// Full stem without extension.
    #[must_use]
    pub fn stem(&self) -> String {
        format!("TC_{}_{}", self.region, self.base_name())
    }

    /// Stem followed by `suffix` (e.g. `".msgpack"` or `"_return_periods.csv"`).
    #[must_use]
    pub fn file(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.stem())
    }
}

impl fmt::Display for HazardFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    fn name() -> HazardFileName {
        HazardFileName {
            region: Region::Global,
            model: "CESM2".to_string(),
            period: Period::Base,
            scenario: "ssp370".to_string(),
            ensembles: 80,
            category: "CRH".to_string(),
            wind_model: "H08".to_string(),
        }
    }

    #[test]
    fn renders_global_stem() {
        assert_eq!(
            name().stem(),
            "TC_global_0300as_CHAZ_CESM2_base_ssp370_80ens_CRH_H08"
        );
    }

    #[test]
    fn renders_basin_and_tile_regions() {
        let basin = name().with_region(Region::Basin(BasinCode::new("SP")));
        assert!(basin.file(".msgpack").starts_with("TC_SP_0300as"));

        let tile = name()
            .with_period(Period::Fut2)
            .with_region(Region::Tile(Extent::new(-180.0, -90.0, 0.0, 45.5).unwrap()));
        assert_eq!(
            tile.file("_exceedance_intensity.csv"),
            "TC_-180_-90_0_45.5_0300as_CHAZ_CESM2_fut2_ssp370_80ens_CRH_H08_exceedance_intensity.csv"
        );
    }

    #[test]
    fn combined_name_sums_ensembles() {
        let combined = name().combined(CLIMATE_MODELS.len() as u32);
        assert_eq!(
            combined.stem(),
            "TC_global_0300as_CHAZ_ALL-MODELS_base_ssp370_480ens_CRH_H08"
        );
    }

    #[test]
    fn period_parses_lowercase() {
        assert_eq!(Period::from_str("fut1").unwrap(), Period::Fut1);
        assert!(Period::from_str("fut3").is_err());
        assert!(Period::Base.is_baseline());
        assert_eq!(Period::all().len(), 3);
    }
}
