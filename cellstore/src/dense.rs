//! Dense labeled matrix for per-axis annotation matrices.
//!
//! [`DenseMatrix`] stores a row-major matrix of `f64` values with row labels
//! (observation or feature ids) and column labels (embedding components,
//! e.g. `PC_1`, `PC_2`). It is the in-memory form of `obsm`/`varm` entries.

use cellstore_core::{CellstoreError, Result, Summarizable};

/// A dense, row-major matrix with labeled rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
    row_names: Vec<String>,
    col_names: Vec<String>,
}

impl DenseMatrix {
    /// Create a matrix from row-major 2D data.
    ///
    /// Each inner `Vec` is one row with `col_names.len()` values.
    pub fn new(
        data: Vec<Vec<f64>>,
        row_names: Vec<String>,
        col_names: Vec<String>,
    ) -> Result<Self> {
        let n_rows = data.len();
        let n_cols = col_names.len();

        if row_names.len() != n_rows {
            return Err(CellstoreError::Argument(format!(
                "row_names length ({}) does not match row count ({n_rows})",
                row_names.len()
            )));
        }

        let mut flat = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in data.iter().enumerate() {
            if row.len() != n_cols {
                return Err(CellstoreError::Argument(format!(
                    "row {i} has {} columns, expected {n_cols}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            data: flat,
            n_rows,
            n_cols,
            row_names,
            col_names,
        })
    }

    /// Build a matrix from named columns of equal length.
    pub fn from_columns(row_names: Vec<String>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let n_rows = row_names.len();
        let n_cols = columns.len();
        let mut data = vec![0.0; n_rows * n_cols];
        let mut col_names = Vec::with_capacity(n_cols);
        for (j, (name, values)) in columns.into_iter().enumerate() {
            if values.len() != n_rows {
                return Err(CellstoreError::Argument(format!(
                    "column '{name}' has {} values, expected {n_rows}",
                    values.len()
                )));
            }
            for (i, v) in values.into_iter().enumerate() {
                data[i * n_cols + j] = v;
            }
            col_names.push(name);
        }
        Ok(Self {
            data,
            n_rows,
            n_cols,
            row_names,
            col_names,
        })
    }

    /// (n_rows, n_cols).
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Get a single value by row and column index.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.n_rows && col < self.n_cols {
            Some(self.data[row * self.n_cols + col])
        } else {
            None
        }
    }

    /// One row's values.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.n_rows {
            let start = row * self.n_cols;
            Some(&self.data[start..start + self.n_cols])
        } else {
            None
        }
    }

    /// One column's values (copied, since data is row-major).
    pub fn column(&self, col: usize) -> Option<Vec<f64>> {
        if col >= self.n_cols {
            return None;
        }
        Some(
            (0..self.n_rows)
                .map(|r| self.data[r * self.n_cols + col])
                .collect(),
        )
    }

    /// Row labels.
    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    /// Column labels.
    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }
}

impl Summarizable for DenseMatrix {
    fn summary(&self) -> String {
        format!("DenseMatrix: {} rows \u{00d7} {} cols", self.n_rows, self.n_cols)
    }
}
