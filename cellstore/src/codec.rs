//! Conversion between labeled sparse matrices and a long-format coordinate table.
//!
//! A [`CoordinateTable`] holds one record per populated `(row, column)` pair:
//! two label columns (the index) plus one value column per source matrix.
//! [`to_table`] merges any number of matrices into one table, and
//! [`from_table`] splits a table back into one matrix per value column.
//!
//! The first matrix handed to [`to_table`] is canonical: its populated cells
//! seed the index. Every further matrix that is layer-compatible with it
//! (see [`are_layer_compatible`]) is copied positionally onto those records;
//! anything else is outer-joined on the labels, leaving `None` where a
//! matrix has no entry.

use std::collections::HashMap;

use cellstore_core::{CellstoreError, Result};

use crate::align::are_layer_compatible;
use crate::sparse::SparseMatrix;

/// One named column of a [`CoordinateTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum TableColumn {
    /// Coordinate labels (index columns).
    Labels(Vec<String>),
    /// Values; `None` marks a pair the source matrix did not populate.
    Values(Vec<Option<f64>>),
}

impl TableColumn {
    fn len(&self) -> usize {
        match self {
            TableColumn::Labels(v) => v.len(),
            TableColumn::Values(v) => v.len(),
        }
    }
}

/// Long-format table: label columns followed by value columns, all of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinateTable {
    len: usize,
    columns: Vec<(String, TableColumn)>,
}

impl CoordinateTable {
    /// Assemble a table from named columns.
    ///
    /// # Errors
    ///
    /// [`CellstoreError::Schema`] if column lengths differ or a name repeats.
    pub fn from_columns(columns: Vec<(String, TableColumn)>) -> Result<Self> {
        let len = columns.first().map_or(0, |(_, c)| c.len());
        for (i, (name, col)) in columns.iter().enumerate() {
            if col.len() != len {
                return Err(CellstoreError::Schema(format!(
                    "column '{name}' has {} records, expected {len}",
                    col.len()
                )));
            }
            if columns[..i].iter().any(|(n, _)| n == name) {
                return Err(CellstoreError::Schema(format!("duplicate column '{name}'")));
            }
        }
        Ok(Self { len, columns })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All columns in order.
    pub fn columns(&self) -> &[(String, TableColumn)] {
        &self.columns
    }

    /// Consume the table, returning its columns.
    pub fn into_columns(self) -> Vec<(String, TableColumn)> {
        self.columns
    }

    /// Names of every column.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Names of the label columns.
    pub fn label_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| matches!(c, TableColumn::Labels(_)))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Names of the value columns.
    pub fn value_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| matches!(c, TableColumn::Values(_)))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// A label column by name.
    pub fn labels(&self, name: &str) -> Option<&[String]> {
        self.columns.iter().find_map(|(n, c)| match c {
            TableColumn::Labels(v) if n == name => Some(v.as_slice()),
            _ => None,
        })
    }

    /// A value column by name.
    pub fn values(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.iter().find_map(|(n, c)| match c {
            TableColumn::Values(v) if n == name => Some(v.as_slice()),
            _ => None,
        })
    }
}

fn labels_of(m: &SparseMatrix, position: usize) -> Result<(&[String], &[String])> {
    match (m.row_names(), m.col_names()) {
        (Some(r), Some(c)) => Ok((r, c)),
        _ => Err(CellstoreError::Shape(format!(
            "input {position} is not a labeled sparse matrix"
        ))),
    }
}

/// Records under construction, keyed by `(row label, column label)`.
struct Join<'a> {
    rows: Vec<&'a str>,
    cols: Vec<&'a str>,
    positions: HashMap<(&'a str, &'a str), usize>,
    values: Vec<Vec<Option<f64>>>,
}

impl<'a> Join<'a> {
    fn seed(canonical: &'a SparseMatrix) -> Result<Self> {
        let (rn, cn) = labels_of(canonical, 0)?;
        let mut join = Join {
            rows: Vec::with_capacity(canonical.nnz()),
            cols: Vec::with_capacity(canonical.nnz()),
            positions: HashMap::with_capacity(canonical.nnz()),
            values: vec![Vec::with_capacity(canonical.nnz())],
        };
        for (r, c, v) in canonical.sorted_triplets() {
            join.upsert(0, rn[r].as_str(), cn[c].as_str(), v);
        }
        Ok(join)
    }

    /// Set column `k` at `(row, col)`, appending a record if the pair is new.
    fn upsert(&mut self, k: usize, row: &'a str, col: &'a str, value: f64) {
        let pos = match self.positions.get(&(row, col)) {
            Some(&pos) => pos,
            None => {
                let pos = self.rows.len();
                self.rows.push(row);
                self.cols.push(col);
                self.positions.insert((row, col), pos);
                for column in &mut self.values {
                    column.push(None);
                }
                pos
            }
        };
        self.values[k][pos] = Some(value);
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Merge one or more labeled sparse matrices into a coordinate table.
///
/// `index_names` names the row- and column-label columns. `value_names`, if
/// given, names the value columns in matrix order; otherwise they are
/// `value1`, `value2`, ….
///
/// # Errors
///
/// - [`CellstoreError::Argument`] if `matrices` is empty or names collide
/// - [`CellstoreError::Shape`] if any matrix lacks row/column labels
/// - [`CellstoreError::Arity`] if `value_names` does not match `matrices` in length
pub fn to_table(
    matrices: &[&SparseMatrix],
    index_names: (&str, &str),
    value_names: Option<&[&str]>,
) -> Result<CoordinateTable> {
    let Some((&canonical, rest)) = matrices.split_first() else {
        return Err(CellstoreError::Argument(
            "at least one matrix is required".into(),
        ));
    };
    for (i, m) in matrices.iter().enumerate() {
        labels_of(m, i)?;
    }
    let names: Vec<String> = match value_names {
        Some(names) if names.len() != matrices.len() => {
            return Err(CellstoreError::Arity {
                expected: matrices.len(),
                found: names.len(),
            });
        }
        Some(names) => names.iter().map(|n| n.to_string()).collect(),
        None => (1..=matrices.len()).map(|i| format!("value{i}")).collect(),
    };
    check_names(index_names, &names)?;

    let mut join = Join::seed(canonical)?;
    let canonical_len = join.len();

    for (offset, &m) in rest.iter().enumerate() {
        let k = offset + 1;
        join.values.push(vec![None; join.len()]);
        if are_layer_compatible(canonical, m) {
            log::trace!("layer '{}' shares the canonical layout; copying by position", names[k]);
            for (pos, (_, _, v)) in m.sorted_triplets().into_iter().enumerate().take(canonical_len) {
                join.values[k][pos] = Some(v);
            }
        } else {
            log::debug!("outer-joining layer '{}' ({} entries)", names[k], m.nnz());
            let (rn, cn) = labels_of(m, k)?;
            for (r, c, v) in m.sorted_triplets() {
                join.upsert(k, rn[r].as_str(), cn[c].as_str(), v);
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len() + 2);
    columns.push((
        index_names.0.to_string(),
        TableColumn::Labels(join.rows.iter().map(|s| s.to_string()).collect()),
    ));
    columns.push((
        index_names.1.to_string(),
        TableColumn::Labels(join.cols.iter().map(|s| s.to_string()).collect()),
    ));
    columns.extend(
        names
            .into_iter()
            .zip(join.values)
            .map(|(n, v)| (n, TableColumn::Values(v))),
    );
    CoordinateTable::from_columns(columns)
}

fn check_names(index_names: (&str, &str), value_names: &[String]) -> Result<()> {
    if index_names.0 == index_names.1 {
        return Err(CellstoreError::Argument(format!(
            "index columns must differ, got '{}' twice",
            index_names.0
        )));
    }
    for (i, name) in value_names.iter().enumerate() {
        if name == index_names.0 || name == index_names.1 || value_names[..i].contains(name) {
            return Err(CellstoreError::Argument(format!(
                "value column name '{name}' is not unique"
            )));
        }
    }
    Ok(())
}

/// Distinct labels in first-seen order, plus each record's ordinal.
fn universe(labels: &[String]) -> (Vec<String>, Vec<usize>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut distinct = Vec::new();
    let ordinals = labels
        .iter()
        .map(|l| {
            *seen.entry(l.as_str()).or_insert_with(|| {
                distinct.push(l.clone());
                distinct.len() - 1
            })
        })
        .collect();
    (distinct, ordinals)
}

/// Split a coordinate table into one named matrix per value column.
///
/// Row and column labels are the distinct values of the two index columns,
/// in first-seen order. Missing values are not stored.
///
/// # Errors
///
/// [`CellstoreError::Schema`] if the table has fewer than two label columns
/// or lacks either index column.
pub fn from_table_named(
    table: &CoordinateTable,
    index_names: (&str, &str),
) -> Result<Vec<(String, SparseMatrix)>> {
    let label_names = table.label_names();
    if label_names.len() < 2 {
        return Err(CellstoreError::Schema(format!(
            "a coordinate table needs two index columns, found {}",
            label_names.len()
        )));
    }
    let missing: Vec<&str> = [index_names.0, index_names.1]
        .into_iter()
        .filter(|n| !label_names.contains(n))
        .collect();
    let (Some(row_labels), Some(col_labels)) =
        (table.labels(index_names.0), table.labels(index_names.1))
    else {
        return Err(CellstoreError::Schema(format!(
            "index column(s) {missing:?} not present in table"
        )));
    };

    let (row_names, row_ord) = universe(row_labels);
    let (col_names, col_ord) = universe(col_labels);

    let mut out = Vec::new();
    for (name, column) in table.columns() {
        let TableColumn::Values(values) = column else {
            continue;
        };
        let mut m = SparseMatrix::with_labels(row_names.clone(), col_names.clone());
        for (i, v) in values.iter().enumerate() {
            if let Some(v) = v {
                m.insert(row_ord[i], col_ord[i], *v)?;
            }
        }
        out.push((name.clone(), m));
    }
    Ok(out)
}

/// Split a coordinate table into one matrix per value column.
///
/// See [`from_table_named`].
pub fn from_table(table: &CoordinateTable, index_names: (&str, &str)) -> Result<Vec<SparseMatrix>> {
    Ok(from_table_named(table, index_names)?
        .into_iter()
        .map(|(_, m)| m)
        .collect())
}
