#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Frequency correction of per-basin hazard subsets.
//!
//! Each basin subset gets one annual occurrence rate shared by all of its
//! events, derived from the basin's observed storm count. The rate is
//! computed once in the baseline period and recorded in a
//! [`FrequencyBaseline`]; future periods receive that value explicitly and
//! reuse it unchanged.

pub mod baseline;
pub mod correct;

pub use baseline::FrequencyBaseline;
pub use correct::{
    assign_frequency, base_frequency, correct_baseline, correct_period, correct_with_baseline,
    count_tracks,
};

use tc_hazard_basin::BasinCode;
use tc_hazard_catalog::naming::Period;

/// Errors that can occur during frequency correction.
#[derive(Debug, thiserror::Error)]
pub enum FrequencyError {
    /// A basin subset has no event with non-zero intensity, so the
    /// simulated frequency is zero.
    #[error("Basin {basin} has no tracks with non-zero intensity")]
    NoTracks {
        /// Basin with no tracks.
        basin: BasinCode,
    },

    /// A basin is missing from the configuration or the baseline.
    #[error("Unknown basin code: {code}")]
    UnknownBasin {
        /// The requested code.
        code: BasinCode,
    },

    /// A non-baseline period was corrected without a baseline.
    #[error("Period {period} requires a frequency baseline from the base period")]
    MissingBaseline {
        /// Period being corrected.
        period: Period,
    },

    /// A computed or recorded frequency is NaN, infinite, or negative.
    #[error("Invalid frequency {value} for basin {basin}")]
    NonFinite {
        /// Basin the frequency belongs to.
        basin: BasinCode,
        /// The offending value.
        value: f64,
    },

    /// Baseline file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Baseline file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
