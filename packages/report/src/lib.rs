#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reports over finished hazard maps.
//!
//! Summarises the spread of map values across climate models at a set of
//! named sites, and checks an output directory for the global products a
//! full run is expected to leave behind.

pub mod completeness;
pub mod sites;

pub use completeness::{CompletenessReport, OutputSpec, check_outputs, expected_outputs, missing_outputs};
pub use sites::{
    ScenarioInput, Site, SiteNeighbours, Statistic, SummaryRow, default_sites, nearest_sites,
    summarize_files, summarize_scenario, write_summary_csv,
};

use tc_hazard_grid::GridError;

/// Errors that can occur while building reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A metric table could not be read.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// A scenario was summarised without any model tables.
    #[error("No model tables for scenario {scenario}")]
    EmptyModels {
        /// Scenario label.
        scenario: String,
    },
}
