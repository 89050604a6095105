//! Row-indexed columnar table for observation and feature annotations.
//!
//! A [`DataFrame`] is an ordered list of typed [`ColumnData`] columns that
//! share one row index (observation or feature identifiers). Before a frame
//! is written to storage it goes through [`DataFrame::normalize`], which
//! maps every column onto one of the three storable types.

use std::collections::HashSet;

use cellstore_core::{CellstoreError, Result, Summarizable};

/// A metadata column with typed data.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Free-text string values.
    Strings(Vec<String>),
    /// Numeric (f64) values. NaN marks a missing value.
    Numeric(Vec<f64>),
    /// Integer values.
    Integer(Vec<i32>),
    /// Boolean flags.
    Logical(Vec<bool>),
    /// Categorical data stored as integer codes indexing into a category list.
    Categorical {
        codes: Vec<i32>,
        categories: Vec<String>,
    },
}

impl ColumnData {
    /// Number of elements in this column.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Strings(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Logical(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Whether the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Try to get as string slice. Returns `None` if not `Strings` variant.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ColumnData::Strings(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as numeric slice. Returns `None` if not `Numeric` variant.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as integer slice. Returns `None` if not `Integer` variant.
    pub fn as_integers(&self) -> Option<&[i32]> {
        match self {
            ColumnData::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Map onto a storable representation (strings, numeric or integer).
    ///
    /// Logical values become 1/0 integers. Categorical codes are expanded to
    /// their category strings; a code outside the category list becomes an
    /// empty string.
    pub fn normalized(&self) -> ColumnData {
        match self {
            ColumnData::Logical(v) => ColumnData::Integer(v.iter().map(|&b| i32::from(b)).collect()),
            ColumnData::Categorical { codes, categories } => ColumnData::Strings(
                codes
                    .iter()
                    .map(|&c| {
                        usize::try_from(c)
                            .ok()
                            .and_then(|i| categories.get(i))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Subset to the given positions.
    pub(crate) fn subset(&self, indices: &[usize]) -> Self {
        match self {
            ColumnData::Strings(v) => {
                ColumnData::Strings(indices.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Integer(v) => ColumnData::Integer(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Logical(v) => ColumnData::Logical(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical { codes, categories } => ColumnData::Categorical {
                codes: indices.iter().map(|&i| codes[i]).collect(),
                categories: categories.clone(),
            },
        }
    }
}

/// Columnar table keyed by a row index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFrame {
    index: Vec<String>,
    columns: Vec<(String, ColumnData)>,
}

impl DataFrame {
    /// Create a frame with the given row index and no columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the index contains duplicate identifiers.
    pub fn new(index: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(index.len());
        if let Some(dup) = index.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(CellstoreError::Argument(format!(
                "duplicate row identifier '{dup}'"
            )));
        }
        Ok(Self {
            index,
            columns: Vec::new(),
        })
    }

    /// Append a column. Its length must match the index.
    pub fn add_column(&mut self, name: &str, data: ColumnData) -> Result<()> {
        if data.len() != self.index.len() {
            return Err(CellstoreError::Argument(format!(
                "column '{}' length ({}) does not match row count ({})",
                name,
                data.len(),
                self.index.len()
            )));
        }
        if self.column(name).is_some() {
            return Err(CellstoreError::Argument(format!(
                "column '{name}' already exists"
            )));
        }
        self.columns.push((name.to_string(), data));
        Ok(())
    }

    /// Row identifiers.
    pub fn index(&self) -> &[String] {
        &self.index
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// All columns in insertion order.
    pub fn columns(&self) -> &[(String, ColumnData)] {
        &self.columns
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Copy of the frame with every column in storable form.
    pub fn normalize(&self) -> DataFrame {
        DataFrame {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.normalized()))
                .collect(),
        }
    }

    /// Keep only the rows at the given positions.
    pub fn subset_rows(&self, indices: &[usize]) -> Result<DataFrame> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows()) {
            return Err(CellstoreError::Argument(format!(
                "row {bad} out of bounds (n_rows={})",
                self.n_rows()
            )));
        }
        Ok(DataFrame {
            index: indices.iter().map(|&i| self.index[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.subset(indices)))
                .collect(),
        })
    }
}

impl Summarizable for DataFrame {
    fn summary(&self) -> String {
        format!(
            "DataFrame: {} rows \u{00d7} {} columns",
            self.n_rows(),
            self.columns.len()
        )
    }
}
