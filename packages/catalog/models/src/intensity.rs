//! Compressed sparse row storage for event-by-point wind intensities.
//!
//! Column indices are stored signed on purpose: catalogs written by
//! earlier pipeline runs are known to carry negative column indices, and
//! the repair pass needs to see them to remove them.

use serde::{Deserialize, Serialize};

/// Event-by-point intensity matrix in CSR layout.
///
/// Row `i` holds the non-zero intensities of event `i`; columns index the
/// catalog's grid points. Decoding goes through [`IntensityMatrix::from_csr`],
/// so a stored matrix with inconsistent row pointers fails to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCsr")]
pub struct IntensityMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<i64>,
    data: Vec<f64>,
}

/// Undecoded CSR buffers, as stored on disk.
#[derive(Deserialize)]
struct RawCsr {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<i64>,
    data: Vec<f64>,
}

impl TryFrom<RawCsr> for IntensityMatrix {
    type Error = MatrixLayoutError;

    fn try_from(raw: RawCsr) -> Result<Self, Self::Error> {
        Self::from_csr(raw.rows, raw.cols, raw.indptr, raw.indices, raw.data)
    }
}

/// Outcome of [`IntensityMatrix::retain_valid`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Number of stored entries dropped because their column index was
    /// negative or past the last column.
    pub removed: usize,
    /// Number of rows that lost at least one entry.
    pub rows_affected: usize,
}

impl RepairReport {
    /// Whether the repair changed anything.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.removed == 0
    }
}

/// Error returned when raw CSR buffers do not describe a valid matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixLayoutError {
    /// What is wrong with the buffers.
    pub message: String,
}

impl std::fmt::Display for MatrixLayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid CSR layout: {}", self.message)
    }
}

impl std::error::Error for MatrixLayoutError {}

impl IntensityMatrix {
    /// Creates an all-zero matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            indptr: vec![0; rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Builds a matrix from raw CSR buffers.
    ///
    /// Column indices are not range-checked here so that corrupted
    /// catalogs can still be loaded and repaired.
    ///
    /// # Errors
    ///
    /// Returns an error if `indptr` does not have `rows + 1` monotonically
    /// non-decreasing entries ending at `indices.len()`, or if `indices` and
    /// `data` differ in length.
    pub fn from_csr(
        rows: usize,
        cols: usize,
        indptr: Vec<usize>,
        indices: Vec<i64>,
        data: Vec<f64>,
    ) -> Result<Self, MatrixLayoutError> {
        if indptr.len() != rows + 1 {
            return Err(MatrixLayoutError {
                message: format!("indptr has {} entries, expected {}", indptr.len(), rows + 1),
            });
        }
        if indices.len() != data.len() {
            return Err(MatrixLayoutError {
                message: format!(
                    "{} column indices but {} values",
                    indices.len(),
                    data.len()
                ),
            });
        }
        if indptr.first() != Some(&0) || indptr.last() != Some(&indices.len()) {
            return Err(MatrixLayoutError {
                message: "indptr must start at 0 and end at the entry count".to_string(),
            });
        }
        if indptr.windows(2).any(|w| w[1] < w[0]) {
            return Err(MatrixLayoutError {
                message: "indptr is not monotonically non-decreasing".to_string(),
            });
        }

        Ok(Self {
            rows,
            cols,
            indptr,
            indices,
            data,
        })
    }

    /// Builds a matrix from per-row `(column, value)` lists. Zero values
    /// are not stored, and a column listed twice in one row keeps its
    /// largest value.
    #[must_use]
    pub fn from_rows(cols: usize, rows: &[Vec<(usize, f64)>]) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for row in rows {
            let mut sorted: Vec<(usize, f64)> =
                row.iter().copied().filter(|(_, v)| *v != 0.0).collect();
            sorted.sort_by_key(|(c, _)| *c);
            let start = indices.len();
            for (col, value) in sorted {
                let col = col as i64;
                if indices.len() > start && indices.last() == Some(&col) {
                    if let Some(last) = data.last_mut() {
                        *last = f64::max(*last, value);
                    }
                } else {
                    indices.push(col);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }

        Self {
            rows: rows.len(),
            cols,
            indptr,
            indices,
            data,
        }
    }

    /// Number of rows (events).
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (grid points).
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of explicitly stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Iterates the stored `(column, value)` entries of `row`, including
    /// any invalid column indices.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.rows()`.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (i64, f64)> + '_ {
        let range = self.indptr[row]..self.indptr[row + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    /// Iterates only the entries of `row` whose column index is in range.
    pub fn valid_row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let cols = self.cols;
        self.row(row).filter_map(move |(col, value)| {
            usize::try_from(col)
                .ok()
                .filter(|c| *c < cols)
                .map(|c| (c, value))
        })
    }

    /// Value at `(row, col)`, zero when not stored.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.valid_row(row)
            .find(|(c, _)| *c == col)
            .map_or(0.0, |(_, v)| v)
    }

    /// Largest intensity in `row`, zero for an empty row.
    #[must_use]
    pub fn row_max(&self, row: usize) -> f64 {
        self.valid_row(row).map(|(_, v)| v).fold(0.0, f64::max)
    }

    /// Whether `row` holds at least one non-zero intensity.
    #[must_use]
    pub fn row_has_nonzero(&self, row: usize) -> bool {
        self.valid_row(row).any(|(_, v)| v != 0.0)
    }

    /// Number of stored entries whose column index is negative or
    /// `>= cols`.
    #[must_use]
    pub fn invalid_entries(&self) -> usize {
        let cols = self.cols;
        self.indices
            .iter()
            .filter(|c| usize::try_from(**c).map_or(true, |c| c >= cols))
            .count()
    }

    /// Drops every entry with an out-of-range column index and rebuilds
    /// the row pointers.
    pub fn retain_valid(&mut self) -> RepairReport {
        let mut report = RepairReport::default();
        let mut indptr = Vec::with_capacity(self.rows + 1);
        let mut indices = Vec::with_capacity(self.indices.len());
        let mut data = Vec::with_capacity(self.data.len());
        indptr.push(0);

        for row in 0..self.rows {
            let before = indices.len();
            let stored = self.indptr[row + 1] - self.indptr[row];
            for (col, value) in self.valid_row(row) {
                indices.push(col as i64);
                data.push(value);
            }
            let removed = stored - (indices.len() - before);
            if removed > 0 {
                report.removed += removed;
                report.rows_affected += 1;
            }
            indptr.push(indices.len());
        }

        self.indptr = indptr;
        self.indices = indices;
        self.data = data;
        report
    }

    /// Keeps the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any row index is out of range.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for &row in rows {
            let range = self.indptr[row]..self.indptr[row + 1];
            indices.extend_from_slice(&self.indices[range.clone()]);
            data.extend_from_slice(&self.data[range]);
            indptr.push(indices.len());
        }

        Self {
            rows: rows.len(),
            cols: self.cols,
            indptr,
            indices,
            data,
        }
    }

    /// Keeps the given columns, renumbered `0..columns.len()` in the given
    /// order. Entries with invalid column indices are dropped.
    #[must_use]
    pub fn select_columns(&self, columns: &[usize]) -> Self {
        let mut remap = vec![None; self.cols];
        for (new, &old) in columns.iter().enumerate() {
            if old < self.cols {
                remap[old] = Some(new);
            }
        }

        let mut indptr = Vec::with_capacity(self.rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for row in 0..self.rows {
            let mut entries: Vec<(usize, f64)> = self
                .valid_row(row)
                .filter_map(|(col, value)| remap[col].map(|new| (new, value)))
                .collect();
            entries.sort_by_key(|(c, _)| *c);
            for (col, value) in entries {
                indices.push(col as i64);
                data.push(value);
            }
            indptr.push(indices.len());
        }

        Self {
            rows: self.rows,
            cols: columns.len(),
            indptr,
            indices,
            data,
        }
    }

    /// Stacks matrices with equal column counts on top of each other.
    ///
    /// # Errors
    ///
    /// Returns an error if the column counts differ.
    pub fn vstack(parts: &[&Self]) -> Result<Self, MatrixLayoutError> {
        let cols = parts.first().map_or(0, |m| m.cols);
        if let Some(bad) = parts.iter().find(|m| m.cols != cols) {
            return Err(MatrixLayoutError {
                message: format!("cannot stack {} columns onto {cols}", bad.cols),
            });
        }

        let mut out = Self::zeros(0, cols);
        for part in parts {
            let base = out.indices.len();
            out.indptr
                .extend(part.indptr.iter().skip(1).map(|p| p + base));
            out.indices.extend_from_slice(&part.indices);
            out.data.extend_from_slice(&part.data);
            out.rows += part.rows;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IntensityMatrix {
        IntensityMatrix::from_rows(
            3,
            &[vec![(0, 10.0), (2, 30.0)], vec![], vec![(1, 5.0), (1, 0.0)]],
        )
    }

    #[test]
    fn from_rows_skips_zeros() {
        let m = sample();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.nnz(), 3);
        assert!((m.get(0, 2) - 30.0).abs() < f64::EPSILON);
        assert!(m.get(1, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn from_rows_keeps_one_entry_per_column() {
        let m = IntensityMatrix::from_rows(2, &[vec![(1, 20.0), (0, 5.0), (1, 35.0)]]);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.row(0).collect::<Vec<_>>(), vec![(0, 5.0), (1, 35.0)]);
    }

    #[test]
    fn rejects_bad_indptr() {
        let err = IntensityMatrix::from_csr(2, 2, vec![0, 1], vec![0], vec![1.0]);
        assert!(err.is_err());
        let err = IntensityMatrix::from_csr(1, 2, vec![0, 2], vec![0], vec![1.0]);
        assert!(err.is_err());
    }

    #[test]
    fn retain_valid_drops_negative_and_overflowing_columns() {
        let mut m =
            IntensityMatrix::from_csr(2, 3, vec![0, 3, 4], vec![-1, 0, 2, 7], vec![9.0, 1.0, 2.0, 3.0])
                .unwrap();
        assert_eq!(m.invalid_entries(), 2);

        let report = m.retain_valid();
        assert_eq!(report.removed, 2);
        assert_eq!(report.rows_affected, 2);
        assert_eq!(m.invalid_entries(), 0);
        assert_eq!(m.row(0).collect::<Vec<_>>(), vec![(0, 1.0), (2, 2.0)]);
        assert_eq!(m.row(1).count(), 0);
    }

    #[test]
    fn retain_valid_on_clean_matrix_is_noop() {
        let mut m = sample();
        let before = m.clone();
        assert!(m.retain_valid().is_clean());
        assert_eq!(m, before);
    }

    #[test]
    fn select_columns_renumbers() {
        let m = sample().select_columns(&[2, 1]);
        assert_eq!(m.cols(), 2);
        assert!((m.get(0, 0) - 30.0).abs() < f64::EPSILON);
        assert!((m.get(2, 1) - 5.0).abs() < f64::EPSILON);
        assert!(!m.row_has_nonzero(1));
    }

    #[test]
    fn vstack_offsets_row_pointers() {
        let a = sample();
        let b = IntensityMatrix::from_rows(3, &[vec![(1, 7.0)]]);
        let stacked = IntensityMatrix::vstack(&[&a, &b]).unwrap();
        assert_eq!(stacked.rows(), 4);
        assert!((stacked.get(3, 1) - 7.0).abs() < f64::EPSILON);
        assert!((stacked.row_max(0) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vstack_rejects_column_mismatch() {
        let a = sample();
        let b = IntensityMatrix::zeros(1, 4);
        assert!(IntensityMatrix::vstack(&[&a, &b]).is_err());
    }
}
