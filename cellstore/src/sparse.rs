//! Labeled coordinate-format (COO) sparse matrix.
//!
//! [`SparseMatrix`] stores populated entries as `(row, col, value)` triplets
//! over an `n_rows × n_cols` grid. Row and column labels are optional: the
//! coordinate table codec and the storage layer need them, plain numeric
//! work does not.

use std::collections::HashMap;

use cellstore_core::{CellstoreError, Result, Summarizable};

/// A sparse matrix in COO (coordinate) format with optional dimension labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
    row_names: Option<Vec<String>>,
    col_names: Option<Vec<String>>,
}

impl SparseMatrix {
    /// Create an empty, unlabeled sparse matrix with the given dimensions.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
            n_rows,
            n_cols,
            row_names: None,
            col_names: None,
        }
    }

    /// Create an empty matrix whose shape is given by its labels.
    pub fn with_labels(row_names: Vec<String>, col_names: Vec<String>) -> Self {
        let mut m = Self::new(row_names.len(), col_names.len());
        m.row_names = Some(row_names);
        m.col_names = Some(col_names);
        m
    }

    /// Create a sparse matrix from triplet vectors.
    ///
    /// All three vectors must have the same length, and all indices must be
    /// within bounds.
    pub fn from_triplets(
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Vec<f64>,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self> {
        if rows.len() != cols.len() || cols.len() != values.len() {
            return Err(CellstoreError::Argument(
                "rows, cols, and values must have the same length".into(),
            ));
        }
        for (i, (&r, &c)) in rows.iter().zip(cols.iter()).enumerate() {
            if r >= n_rows || c >= n_cols {
                return Err(CellstoreError::Argument(format!(
                    "triplet {i} index ({r}, {c}) out of bounds for ({n_rows}, {n_cols})"
                )));
            }
        }
        Ok(Self {
            rows,
            cols,
            values,
            n_rows,
            n_cols,
            row_names: None,
            col_names: None,
        })
    }

    /// Build a labeled matrix from `(row_label, col_label, value)` entries.
    ///
    /// Every label used by an entry must appear in `row_names` / `col_names`.
    pub fn from_labeled_entries<'a, I>(
        entries: I,
        row_names: Vec<String>,
        col_names: Vec<String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str, f64)>,
    {
        let row_pos = positions(&row_names);
        let col_pos = positions(&col_names);
        let mut m = Self::with_labels(row_names.clone(), col_names.clone());
        for (r, c, v) in entries {
            let (Some(&ri), Some(&ci)) = (row_pos.get(r), col_pos.get(c)) else {
                return Err(CellstoreError::Argument(format!(
                    "entry ({r}, {c}) is outside the declared labels"
                )));
            };
            m.rows.push(ri);
            m.cols.push(ci);
            m.values.push(v);
        }
        Ok(m)
    }

    /// Attach row and column labels. Lengths must match the shape.
    pub fn set_labels(&mut self, row_names: Vec<String>, col_names: Vec<String>) -> Result<()> {
        if row_names.len() != self.n_rows {
            return Err(CellstoreError::Argument(format!(
                "row_names length ({}) does not match n_rows ({})",
                row_names.len(),
                self.n_rows
            )));
        }
        if col_names.len() != self.n_cols {
            return Err(CellstoreError::Argument(format!(
                "col_names length ({}) does not match n_cols ({})",
                col_names.len(),
                self.n_cols
            )));
        }
        self.row_names = Some(row_names);
        self.col_names = Some(col_names);
        Ok(())
    }

    /// Insert a single entry. Returns an error if indices are out of bounds.
    pub fn insert(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.n_rows || col >= self.n_cols {
            return Err(CellstoreError::Argument(format!(
                "index ({row}, {col}) out of bounds for ({}, {})",
                self.n_rows, self.n_cols
            )));
        }
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
        Ok(())
    }

    /// Get the value at `(row, col)`. Returns 0.0 if no entry is stored.
    ///
    /// This is an O(nnz) scan.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.find(row, col).unwrap_or(0.0)
    }

    /// Get the value stored at labeled coordinates, if any.
    pub fn get_labeled(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.row_names.as_ref()?.iter().position(|n| n == row)?;
        let c = self.col_names.as_ref()?.iter().position(|n| n == col)?;
        self.find(r, c)
    }

    fn find(&self, row: usize, col: usize) -> Option<f64> {
        (0..self.values.len())
            .find(|&i| self.rows[i] == row && self.cols[i] == col)
            .map(|i| self.values[i])
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Fraction of entries that are stored: `nnz / (n_rows * n_cols)`.
    pub fn density(&self) -> f64 {
        let total = self.n_rows as f64 * self.n_cols as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.values.len() as f64 / total
    }

    /// (n_rows, n_cols).
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Row labels, if attached.
    pub fn row_names(&self) -> Option<&[String]> {
        self.row_names.as_deref()
    }

    /// Column labels, if attached.
    pub fn col_names(&self) -> Option<&[String]> {
        self.col_names.as_deref()
    }

    /// Whether both axes carry labels.
    pub fn is_labeled(&self) -> bool {
        self.row_names.is_some() && self.col_names.is_some()
    }

    /// Iterate over stored triplets `(row, col, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.values.iter())
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Stored triplets ordered by `(row, col)`.
    pub fn sorted_triplets(&self) -> Vec<(usize, usize, f64)> {
        let mut t: Vec<_> = self.iter().collect();
        t.sort_by_key(|&(r, c, _)| (r, c));
        t
    }

    /// Stored entries as `(row_label, col_label, value)`.
    ///
    /// Fails with [`CellstoreError::Shape`] on an unlabeled matrix.
    pub fn labeled_triplets(&self) -> Result<Vec<(&str, &str, f64)>> {
        let (Some(rn), Some(cn)) = (&self.row_names, &self.col_names) else {
            return Err(CellstoreError::Shape(
                "matrix has no row/column labels".into(),
            ));
        };
        Ok(self
            .iter()
            .map(|(r, c, v)| (rn[r].as_str(), cn[c].as_str(), v))
            .collect())
    }

    /// Conform a labeled matrix to new row and column label sequences.
    ///
    /// Entries whose labels are absent from the new sequences are dropped;
    /// new labels get empty rows/columns.
    pub fn reindex(&self, row_names: &[String], col_names: &[String]) -> Result<Self> {
        let entries = self.labeled_triplets()?;
        let row_keep = positions(row_names);
        let col_keep = positions(col_names);
        Self::from_labeled_entries(
            entries
                .into_iter()
                .filter(|(r, c, _)| row_keep.contains_key(r) && col_keep.contains_key(c)),
            row_names.to_vec(),
            col_names.to_vec(),
        )
    }
}

/// Label → ordinal lookup for a label sequence.
pub(crate) fn positions(labels: &[String]) -> HashMap<&str, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect()
}

impl Summarizable for SparseMatrix {
    fn summary(&self) -> String {
        format!(
            "SparseMatrix: {}\u{00d7}{}, {} nonzeros ({:.2}% density)",
            self.n_rows,
            self.n_cols,
            self.nnz(),
            self.density() * 100.0
        )
    }
}
