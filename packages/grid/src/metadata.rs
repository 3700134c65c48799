//! Metric families, column naming, and per-variable metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tc_hazard_grid_models::VariableMetadata;

/// Kind of statistic a tile holds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricFamily {
    /// Wind speed exceeded once per return period.
    ExceedanceIntensity,
    /// Return period of a wind speed threshold.
    ReturnPeriods,
}

impl MetricFamily {
    /// Column name prefix (`rp` or `thr`).
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ExceedanceIntensity => "rp",
            Self::ReturnPeriods => "thr",
        }
    }

    /// Physical unit of the values.
    #[must_use]
    pub const fn units(self) -> &'static str {
        match self {
            Self::ExceedanceIntensity => "m/s",
            Self::ReturnPeriods => "years",
        }
    }

    /// Description of the column for `label` (a return period or a
    /// threshold, as written in the column name).
    #[must_use]
    pub fn describe(self, label: &str) -> String {
        match self {
            Self::ExceedanceIntensity => format!("Exceedance intensity for RP={label} years"),
            Self::ReturnPeriods => format!("Return period for wind speed ≥ {label} m/s"),
        }
    }

    /// Metadata for every column of this family among `columns`.
    ///
    /// Columns without the family prefix are left out, so they end up with
    /// no metadata.
    #[must_use]
    pub fn metadata_for(self, columns: &[String]) -> BTreeMap<String, VariableMetadata> {
        let prefix = format!("{}_", self.prefix());
        columns
            .iter()
            .filter_map(|col| {
                let label = col.strip_prefix(&prefix)?.replace('p', ".");
                Some((
                    col.clone(),
                    VariableMetadata {
                        long_name: Some(self.describe(&label)),
                        units: Some(self.units().to_string()),
                    },
                ))
            })
            .collect()
    }
}

/// Column name `{prefix}_{value}` with `.` spelled `p`.
#[must_use]
pub fn metric_column_name(prefix: &str, value: f64) -> String {
    format!("{prefix}_{value}").replace('.', "p")
}
