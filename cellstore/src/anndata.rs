//! AnnData-like in-memory container for one annotated single-cell dataset.
//!
//! # Structure
//!
//! - `obs` / `var` — per-cell and per-gene annotation frames; their indices
//!   declare the dataset's observation and feature ids
//! - `layers` — named sparse cells × genes matrices (raw counts, normalized, …)
//! - `obsm` / `varm` — dense per-axis matrices (e.g. PCA, UMAP embeddings)
//! - `obsp` / `varp` — sparse per-axis pairwise matrices (e.g. neighbour graphs)
//! - `uns` — unstructured string key-value annotations
//!
//! Every matrix is labeled and may only use ids declared by `obs`/`var`; the
//! adders reject anything else.
//!
//! # Example
//!
//! ```
//! use cellstore::anndata::AnnData;
//! use cellstore::frame::DataFrame;
//! use cellstore::sparse::SparseMatrix;
//!
//! let obs = DataFrame::new(vec!["cell_1".into(), "cell_2".into()]).unwrap();
//! let var = DataFrame::new(vec!["gene_a".into()]).unwrap();
//! let mut adata = AnnData::new(obs, var);
//!
//! let counts = SparseMatrix::from_labeled_entries(
//!     [("cell_2", "gene_a", 4.0)],
//!     vec!["cell_1".into(), "cell_2".into()],
//!     vec!["gene_a".into()],
//! )
//! .unwrap();
//! adata.add_layer("counts", counts).unwrap();
//! assert_eq!(adata.n_obs(), 2);
//! assert_eq!(adata.layer_names(), vec!["counts"]);
//! ```

use std::collections::{BTreeMap, HashSet};

use cellstore_core::{CellstoreError, Result, Summarizable};

use crate::dense::DenseMatrix;
use crate::frame::DataFrame;
use crate::sparse::SparseMatrix;

/// Which id axis a matrix's labels are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Obs,
    Var,
}

/// Annotated dataset held in memory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnData {
    obs: DataFrame,
    var: DataFrame,
    layers: Vec<(String, SparseMatrix)>,
    obsm: BTreeMap<String, DenseMatrix>,
    varm: BTreeMap<String, DenseMatrix>,
    obsp: BTreeMap<String, SparseMatrix>,
    varp: BTreeMap<String, SparseMatrix>,
    uns: BTreeMap<String, String>,
}

fn check_subset(labels: &[String], declared: &[String], what: &str) -> Result<()> {
    let declared: HashSet<&str> = declared.iter().map(String::as_str).collect();
    let unknown: Vec<&str> = labels
        .iter()
        .map(String::as_str)
        .filter(|l| !declared.contains(l))
        .take(5)
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(CellstoreError::Schema(format!(
            "{what} uses undeclared ids, e.g. {unknown:?}"
        )))
    }
}

fn sparse_labels<'m>(m: &'m SparseMatrix, name: &str) -> Result<(&'m [String], &'m [String])> {
    match (m.row_names(), m.col_names()) {
        (Some(r), Some(c)) => Ok((r, c)),
        _ => Err(CellstoreError::Argument(format!(
            "matrix '{name}' must carry row and column labels"
        ))),
    }
}

impl AnnData {
    /// A dataset with the given annotation frames and no matrices.
    pub fn new(obs: DataFrame, var: DataFrame) -> Self {
        Self {
            obs,
            var,
            ..Default::default()
        }
    }

    fn ids(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::Obs => self.obs.index(),
            Axis::Var => self.var.index(),
        }
    }

    /// Add a cells × genes layer. Replaces an existing layer of the same name.
    pub fn add_layer(&mut self, name: &str, layer: SparseMatrix) -> Result<()> {
        let (rows, cols) = sparse_labels(&layer, name)?;
        check_subset(rows, self.obs.index(), &format!("layer '{name}' rows"))?;
        check_subset(cols, self.var.index(), &format!("layer '{name}' columns"))?;
        match self.layers.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = layer,
            None => self.layers.push((name.to_string(), layer)),
        }
        Ok(())
    }

    /// Add a dense per-axis matrix (`obsm` or `varm`).
    pub fn add_axis_matrix(&mut self, axis: Axis, name: &str, matrix: DenseMatrix) -> Result<()> {
        check_subset(matrix.row_names(), self.ids(axis), &format!("matrix '{name}' rows"))?;
        let slot = match axis {
            Axis::Obs => &mut self.obsm,
            Axis::Var => &mut self.varm,
        };
        slot.insert(name.to_string(), matrix);
        Ok(())
    }

    /// Add a pairwise matrix over one axis (`obsp` or `varp`).
    pub fn add_pairwise(&mut self, axis: Axis, name: &str, matrix: SparseMatrix) -> Result<()> {
        let (rows, cols) = sparse_labels(&matrix, name)?;
        let ids = self.ids(axis);
        check_subset(rows, ids, &format!("pairwise '{name}' rows"))?;
        check_subset(cols, ids, &format!("pairwise '{name}' columns"))?;
        let slot = match axis {
            Axis::Obs => &mut self.obsp,
            Axis::Var => &mut self.varp,
        };
        slot.insert(name.to_string(), matrix);
        Ok(())
    }

    pub fn add_uns(&mut self, key: &str, value: &str) {
        self.uns.insert(key.to_string(), value.to_string());
    }

    /// Re-check every matrix against the declared ids.
    pub fn validate(&self) -> Result<()> {
        for (name, layer) in &self.layers {
            let (rows, cols) = sparse_labels(layer, name)?;
            check_subset(rows, self.obs.index(), &format!("layer '{name}' rows"))?;
            check_subset(cols, self.var.index(), &format!("layer '{name}' columns"))?;
        }
        for (axis, matrices) in [(Axis::Obs, &self.obsm), (Axis::Var, &self.varm)] {
            for (name, m) in matrices {
                check_subset(m.row_names(), self.ids(axis), &format!("matrix '{name}' rows"))?;
            }
        }
        for (axis, matrices) in [(Axis::Obs, &self.obsp), (Axis::Var, &self.varp)] {
            for (name, m) in matrices {
                let (rows, cols) = sparse_labels(m, name)?;
                check_subset(rows, self.ids(axis), &format!("pairwise '{name}' rows"))?;
                check_subset(cols, self.ids(axis), &format!("pairwise '{name}' columns"))?;
            }
        }
        Ok(())
    }

    pub fn n_obs(&self) -> usize {
        self.obs.n_rows()
    }

    pub fn n_vars(&self) -> usize {
        self.var.n_rows()
    }

    pub fn obs(&self) -> &DataFrame {
        &self.obs
    }

    pub fn var(&self) -> &DataFrame {
        &self.var
    }

    pub fn obs_names(&self) -> &[String] {
        self.obs.index()
    }

    pub fn var_names(&self) -> &[String] {
        self.var.index()
    }

    pub fn layers(&self) -> &[(String, SparseMatrix)] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&SparseMatrix> {
        self.layers.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn obsm(&self) -> &BTreeMap<String, DenseMatrix> {
        &self.obsm
    }

    pub fn varm(&self) -> &BTreeMap<String, DenseMatrix> {
        &self.varm
    }

    pub fn obsp(&self) -> &BTreeMap<String, SparseMatrix> {
        &self.obsp
    }

    pub fn varp(&self) -> &BTreeMap<String, SparseMatrix> {
        &self.varp
    }

    pub fn uns(&self) -> &BTreeMap<String, String> {
        &self.uns
    }
}

impl Summarizable for AnnData {
    fn summary(&self) -> String {
        let mut parts = vec![format!("AnnData: {} obs \u{00d7} {} vars", self.n_obs(), self.n_vars())];
        if !self.layers.is_empty() {
            parts.push(format!("layers: [{}]", self.layer_names().join(", ")));
        }
        for (label, keys) in [
            ("obsm", self.obsm.keys().map(String::as_str).collect::<Vec<_>>()),
            ("varm", self.varm.keys().map(String::as_str).collect()),
            ("obsp", self.obsp.keys().map(String::as_str).collect()),
            ("varp", self.varp.keys().map(String::as_str).collect()),
        ] {
            if !keys.is_empty() {
                parts.push(format!("{label}: [{}]", keys.join(", ")));
            }
        }
        parts.join("\n  ")
    }
}
