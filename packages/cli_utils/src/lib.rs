#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the hazard pipeline.
//!
//! Progress bars are keyed by pipeline [`Stage`] and exposed through the
//! [`ProgressCallback`] trait the library crates report to. [`init_logger`]
//! wraps the logger in `indicatif-log-bridge` so log lines print above the
//! bars instead of through them.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tc_hazard_catalog::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// A unit of pipeline work that gets its own progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Simulation periods of a `correct` run.
    Periods,
    /// Basin subsets of one period.
    Basins,
    /// Per-model catalogs stacked into a combined catalog.
    Models,
    /// Statistics tiles merged into a global map.
    Tiles,
}

impl Stage {
    /// Bar label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Periods => "Periods",
            Self::Basins => "Basins",
            Self::Models => "Models",
            Self::Tiles => "Tiles",
        }
    }

    /// Whether the item count is known before the stage starts.
    #[must_use]
    pub const fn counted_up_front(self) -> bool {
        matches!(self, Self::Periods | Self::Models)
    }

    fn bar_template(self) -> &'static str {
        if self.counted_up_front() {
            "{prefix:>8} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}] {msg}"
        } else {
            "{prefix:>8} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}] {msg}"
        }
    }
}

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style applied once the item count is known.
    counted: ProgressStyle,
}

impl IndicatifProgress {
    /// Adds a bar for `stage` to `multi`.
    ///
    /// With `total`, the bar starts counted. Without it, the bar spins
    /// until the stage reports its size through
    /// [`ProgressCallback::set_total`].
    #[must_use]
    pub fn for_stage(
        multi: &MultiProgress,
        stage: Stage,
        total: Option<u64>,
        message: &str,
    ) -> Arc<dyn ProgressCallback> {
        let counted = ProgressStyle::with_template(stage.bar_template())
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let bar = match total {
            Some(total) => {
                let bar = multi.add(ProgressBar::new(total));
                bar.set_style(counted.clone());
                bar
            }
            None => {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_style(
                    ProgressStyle::with_template("{prefix:>8} {spinner:.cyan} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_prefix(stage.label());
        bar.set_message(message.to_string());

        Arc::new(Self { bar, counted })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.counted.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Filter string for the logger: `RUST_LOG` when set and non-empty,
/// otherwise [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn log_filter(rust_log: Option<&str>) -> String {
    rust_log
        .map(str::trim)
        .filter(|filter| !filter.is_empty())
        .unwrap_or(DEFAULT_LOG_FILTER)
        .to_string()
}

/// Initializes the global logger behind `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every stage bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());
    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filter)
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
