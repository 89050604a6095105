//! Layer alignment checks and column padding for labeled sparse matrices.

use std::collections::HashSet;

use cellstore_core::{CellstoreError, Result};

use crate::sparse::SparseMatrix;

/// Whether `b` can share `a`'s coordinate table without an outer join.
///
/// True iff both matrices carry identical ordered row labels, identical
/// ordered column labels and the same number of stored entries. Occupied
/// coordinates are *not* compared: two matrices with equal labels and equal
/// nnz but different populated cells pass this check. Layers written by the
/// same ingestion share their sparsity pattern, which is the case this
/// check serves.
pub fn are_layer_compatible(a: &SparseMatrix, b: &SparseMatrix) -> bool {
    a.row_names() == b.row_names() && a.col_names() == b.col_names() && a.nnz() == b.nnz()
}

/// Extend `matrix` with empty columns for every name in `required_columns`
/// that it lacks.
///
/// Row labels and the existing column order are preserved; new columns are
/// appended in the order given. The matrix is returned unchanged when it
/// already has every required column.
///
/// # Errors
///
/// [`CellstoreError::Argument`] if `required_columns` is empty or the matrix
/// has no row/column labels.
pub fn pad(matrix: &SparseMatrix, required_columns: &[String]) -> Result<SparseMatrix> {
    if required_columns.is_empty() {
        return Err(CellstoreError::Argument(
            "required_columns must not be empty".into(),
        ));
    }
    let (Some(row_names), Some(col_names)) = (matrix.row_names(), matrix.col_names()) else {
        return Err(CellstoreError::Argument(
            "matrix must have row and column labels to be padded".into(),
        ));
    };

    let mut present: HashSet<&str> = col_names.iter().map(String::as_str).collect();
    let mut new_cols = col_names.to_vec();
    for name in required_columns {
        if present.insert(name.as_str()) {
            new_cols.push(name.clone());
        }
    }
    if new_cols.len() == col_names.len() {
        return Ok(matrix.clone());
    }

    SparseMatrix::from_labeled_entries(matrix.labeled_triplets()?, row_names.to_vec(), new_cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_table;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn labeled(entries: &[(&str, &str, f64)], rows: &[&str], cols: &[&str]) -> SparseMatrix {
        SparseMatrix::from_labeled_entries(entries.iter().copied(), names(rows), names(cols))
            .unwrap()
    }

    #[test]
    fn compatible_same_pattern() {
        let a = labeled(&[("r1", "c1", 1.0), ("r2", "c2", 2.0)], &["r1", "r2"], &["c1", "c2"]);
        let b = labeled(&[("r1", "c1", 5.0), ("r2", "c2", 6.0)], &["r1", "r2"], &["c1", "c2"]);
        assert!(are_layer_compatible(&a, &b));
    }

    #[test]
    fn incompatible_on_labels_or_nnz() {
        let a = labeled(&[("r1", "c1", 1.0)], &["r1", "r2"], &["c1", "c2"]);
        let reordered = labeled(&[("r1", "c1", 1.0)], &["r2", "r1"], &["c1", "c2"]);
        let denser = labeled(&[("r1", "c1", 1.0), ("r2", "c2", 9.0)], &["r1", "r2"], &["c1", "c2"]);
        assert!(!are_layer_compatible(&a, &reordered));
        assert!(!are_layer_compatible(&a, &denser));
    }

    #[test]
    fn compatible_despite_different_coordinates() {
        // Same labels, same nnz, different occupied cells: reported compatible,
        // and the positional merge pairs values from different cells.
        let a = labeled(&[("r1", "c1", 1.0)], &["r1", "r2"], &["c1", "c2"]);
        let b = labeled(&[("r2", "c2", 7.0)], &["r1", "r2"], &["c1", "c2"]);
        assert!(are_layer_compatible(&a, &b));

        let table = to_table(&[&a, &b], ("obs_id", "var_id"), None).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.labels("obs_id").unwrap(), &["r1"]);
        assert_eq!(table.labels("var_id").unwrap(), &["c1"]);
        assert_eq!(table.values("value2").unwrap(), &[Some(7.0)]);
    }

    #[test]
    fn pad_appends_missing_columns_in_order() {
        let m = labeled(&[("r1", "c2", 3.0)], &["r1", "r2"], &["c2"]);
        let p = pad(&m, &names(&["Y", "c2", "X"])).unwrap();
        assert_eq!(p.col_names().unwrap(), &["c2", "Y", "X"]);
        assert_eq!(p.row_names().unwrap(), &["r1", "r2"]);
        assert_eq!(p.shape(), (2, 3));
        assert_eq!(p.nnz(), 1);
        assert_eq!(p.get_labeled("r1", "c2"), Some(3.0));
    }

    #[test]
    fn pad_unchanged_when_complete() {
        let m = labeled(&[("r1", "c1", 3.0)], &["r1"], &["c1", "c2"]);
        assert_eq!(pad(&m, &names(&["c2"])).unwrap(), m);
    }

    #[test]
    fn pad_idempotent() {
        let m = labeled(&[("r1", "c1", 3.0)], &["r1"], &["c1"]);
        let req = names(&["X", "Y"]);
        let once = pad(&m, &req).unwrap();
        let twice = pad(&once, &req).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn pad_rejects_bad_arguments() {
        let m = labeled(&[], &["r1"], &["c1"]);
        assert!(matches!(pad(&m, &[]), Err(CellstoreError::Argument(_))));
        let unlabeled = SparseMatrix::new(1, 1);
        assert!(matches!(
            pad(&unlabeled, &names(&["X"])),
            Err(CellstoreError::Argument(_))
        ));
    }
}
