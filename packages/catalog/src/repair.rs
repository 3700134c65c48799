//! Validation and repair of loaded intensity matrices.
//!
//! Catalogs written by earlier pipeline runs can carry negative column
//! indices in their sparse intensity matrix. Rather than refusing such a
//! catalog, the offending entries are dropped row by row and the run
//! continues with a warning.

use tc_hazard_catalog_models::{HazardCatalog, RepairReport};

/// Number of intensity entries with a negative or out-of-range column
/// index.
#[must_use]
pub fn validate(catalog: &HazardCatalog) -> usize {
    catalog.intensity().invalid_entries()
}

/// Removes invalid intensity entries in place.
///
/// Never fails. A non-clean report is logged at `warn` level.
pub fn repair(catalog: &mut HazardCatalog, label: &str) -> RepairReport {
    let report = catalog.intensity_mut().retain_valid();

    if report.is_clean() {
        log::debug!("{label}: intensity matrix has no invalid indices");
    } else {
        log::warn!(
            "{label}: dropped {} intensity entries with invalid column indices across {} events",
            report.removed,
            report.rows_affected
        );
    }

    report
}
