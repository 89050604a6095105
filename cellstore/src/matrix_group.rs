//! Typed groups of matrices: the assay group `X` and the per-axis
//! annotation groups `obsm`/`varm` and `obsp`/`varp`.

use std::collections::BTreeMap;

use cellstore_core::{CellstoreError, Result};

use crate::annotation::{AnnotationMatrix, AnnotationPairwiseMatrix};
use crate::array::{delegate_capabilities, QueryableArray, Records};
use crate::assay::AssayMatrix;
use crate::dense::DenseMatrix;
use crate::group::{Group, Member};
use crate::sparse::SparseMatrix;
use crate::store::Context;

/// Write `records` as array member `name`, creating the group on first use.
fn write_member(
    group: &mut Group,
    group_type: &str,
    name: &str,
    records: &Records,
    object_type: &str,
) -> Result<()> {
    group.ensure(group_type)?;
    let array = group.child_array(name);
    array.write_records(records, object_type)?;
    group.add_member(name, Member::Array(array))
}

fn member_array(group: &Group, name: &str) -> Result<QueryableArray> {
    group.array(name).cloned().ok_or_else(|| {
        CellstoreError::Argument(format!("'{}' has no matrix named '{name}'", group.uri()))
    })
}

/// Group of assay matrices sharing the `(obs_id, var_id)` coordinate space.
#[derive(Debug, Clone)]
pub struct AssayMatrixGroup {
    group: Group,
    dims: (String, String),
}

impl AssayMatrixGroup {
    /// Handle on the group at `uri`, loading members if it exists.
    pub fn open(uri: &str, ctx: &Context, dims: (&str, &str)) -> Result<Self> {
        Ok(Self {
            group: Group::open_or_new(uri, ctx)?,
            dims: (dims.0.to_string(), dims.1.to_string()),
        })
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn exists(&self) -> bool {
        self.group.exists()
    }

    /// Merge `layers` into records for assay matrix `name` and check them
    /// against any stored array. Nothing is written.
    pub fn stage(&self, name: &str, layers: &[(&str, &SparseMatrix)]) -> Result<Records> {
        let target = AssayMatrix::from_array(self.group.child_array(name), (&self.dims.0, &self.dims.1));
        let records = target.records(layers)?;
        target.array().check_records(&records)?;
        Ok(records)
    }

    /// Append staged records to assay matrix `name`.
    pub fn add_records(&mut self, name: &str, records: &Records) -> Result<()> {
        write_member(&mut self.group, "AssayMatrixGroup", name, records, AssayMatrix::OBJECT_TYPE)
    }

    /// Store `layers` as one assay matrix named `name`, creating the group on
    /// first use.
    pub fn add_layers(&mut self, name: &str, layers: &[(&str, &SparseMatrix)]) -> Result<()> {
        let records = self.stage(name, layers)?;
        log::info!(
            "Ingesting {} layers ({} coordinates) into '{}'",
            layers.len(),
            records.len(),
            self.group.object().child_uri(name)
        );
        self.add_records(name, &records)
    }

    /// The assay matrix `name`, carrying the group's active restriction.
    pub fn assay_matrix(&self, name: &str) -> Result<AssayMatrix> {
        Ok(AssayMatrix::from_array(
            member_array(&self.group, name)?,
            (&self.dims.0, &self.dims.1),
        ))
    }

    /// Names of the assay matrices.
    pub fn names(&self) -> Vec<String> {
        self.group.member_names()
    }

    /// Layer names stored in assay matrix `name`.
    pub fn layer_names(&self, name: &str) -> Result<Vec<String>> {
        self.assay_matrix(name)?.layer_names()
    }

    /// One layer of assay matrix `name`.
    pub fn get_layer(&self, name: &str, layer: &str) -> Result<SparseMatrix> {
        self.assay_matrix(name)?
            .to_layers(Some(&[layer]))?
            .into_iter()
            .next()
            .map(|(_, m)| m)
            .ok_or_else(|| CellstoreError::Schema(format!("no layer '{layer}' in '{name}'")))
    }

    /// Every layer of assay matrix `name`.
    pub fn to_layers(&self, name: &str) -> Result<Vec<(String, SparseMatrix)>> {
        self.assay_matrix(name)?.to_layers(None)
    }
}

delegate_capabilities!(AssayMatrixGroup, group);

/// Group of dense per-id matrices over one axis (`obsm` / `varm`).
#[derive(Debug, Clone)]
pub struct AnnotationMatrixGroup {
    group: Group,
    dimension: String,
}

impl AnnotationMatrixGroup {
    pub fn open(uri: &str, ctx: &Context, dimension: &str) -> Result<Self> {
        Ok(Self {
            group: Group::open_or_new(uri, ctx)?,
            dimension: dimension.to_string(),
        })
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn exists(&self) -> bool {
        self.group.exists()
    }

    /// Records for member `name`, checked against any stored array.
    pub fn stage(&self, name: &str, matrix: &DenseMatrix) -> Result<Records> {
        let target = AnnotationMatrix::from_array(self.group.child_array(name), &self.dimension);
        let records = target.records(matrix)?;
        target.array().check_records(&records)?;
        Ok(records)
    }

    pub fn add_records(&mut self, name: &str, records: &Records) -> Result<()> {
        write_member(
            &mut self.group,
            "AnnotationMatrixGroup",
            name,
            records,
            AnnotationMatrix::OBJECT_TYPE,
        )
    }

    pub fn add_matrix(&mut self, name: &str, matrix: &DenseMatrix) -> Result<()> {
        let records = self.stage(name, matrix)?;
        self.add_records(name, &records)
    }

    pub fn matrix(&self, name: &str) -> Result<AnnotationMatrix> {
        Ok(AnnotationMatrix::from_array(
            member_array(&self.group, name)?,
            &self.dimension,
        ))
    }

    pub fn names(&self) -> Vec<String> {
        self.group.member_names()
    }

    /// Every member matrix, honouring the active restriction.
    pub fn to_matrices(&self) -> Result<BTreeMap<String, DenseMatrix>> {
        self.names()
            .into_iter()
            .map(|name| {
                let m = self.matrix(&name)?.to_matrix()?;
                Ok((name, m))
            })
            .collect()
    }
}

delegate_capabilities!(AnnotationMatrixGroup, group);

/// Group of sparse pairwise matrices over one axis (`obsp` / `varp`).
#[derive(Debug, Clone)]
pub struct AnnotationPairwiseMatrixGroup {
    group: Group,
    dimension: String,
}

impl AnnotationPairwiseMatrixGroup {
    pub fn open(uri: &str, ctx: &Context, dimension: &str) -> Result<Self> {
        Ok(Self {
            group: Group::open_or_new(uri, ctx)?,
            dimension: dimension.to_string(),
        })
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn exists(&self) -> bool {
        self.group.exists()
    }

    pub fn stage(&self, name: &str, matrix: &SparseMatrix) -> Result<Records> {
        let target = AnnotationPairwiseMatrix::from_array(self.group.child_array(name), &self.dimension);
        let records = target.records(matrix)?;
        target.array().check_records(&records)?;
        Ok(records)
    }

    pub fn add_records(&mut self, name: &str, records: &Records) -> Result<()> {
        write_member(
            &mut self.group,
            "AnnotationPairwiseMatrixGroup",
            name,
            records,
            AnnotationPairwiseMatrix::OBJECT_TYPE,
        )
    }

    pub fn add_matrix(&mut self, name: &str, matrix: &SparseMatrix) -> Result<()> {
        let records = self.stage(name, matrix)?;
        self.add_records(name, &records)
    }

    pub fn matrix(&self, name: &str) -> Result<AnnotationPairwiseMatrix> {
        Ok(AnnotationPairwiseMatrix::from_array(
            member_array(&self.group, name)?,
            &self.dimension,
        ))
    }

    pub fn names(&self) -> Vec<String> {
        self.group.member_names()
    }

    pub fn to_matrices(&self) -> Result<BTreeMap<String, SparseMatrix>> {
        self.names()
            .into_iter()
            .map(|name| {
                let m = self.matrix(&name)?.to_matrix()?;
                Ok((name, m))
            })
            .collect()
    }
}

delegate_capabilities!(AnnotationPairwiseMatrixGroup, group);

#[cfg(test)]
mod tests {
    use super::*;
    use cellstore_core::{DimRanges, Sliceable};
    use tempfile::TempDir;

    fn ctx() -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let ctx = Context::open(dir.path()).unwrap();
        (dir, ctx)
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn layer(entries: &[(&str, &str, f64)]) -> SparseMatrix {
        SparseMatrix::from_labeled_entries(
            entries.iter().copied(),
            s(&["c1", "c2"]),
            s(&["g1", "g2"]),
        )
        .unwrap()
    }

    #[test]
    fn assay_group_layers() {
        let (_dir, ctx) = ctx();
        let mut x = AssayMatrixGroup::open("/X", &ctx, ("obs_id", "var_id")).unwrap();
        assert!(!x.exists());
        let counts = layer(&[("c1", "g1", 3.0), ("c2", "g2", 5.0)]);
        let logn = layer(&[("c1", "g1", 1.1), ("c2", "g2", 1.6)]);
        x.add_layers("data", &[("counts", &counts), ("logn", &logn)])
            .unwrap();

        assert_eq!(x.names(), s(&["data"]));
        assert_eq!(x.layer_names("data").unwrap(), s(&["counts", "logn"]));
        let got = x.get_layer("data", "logn").unwrap();
        assert_eq!(got.get_labeled("c2", "g2"), Some(1.6));
        assert!(x.get_layer("data", "nope").is_err());
        assert!(x.assay_matrix("missing").is_err());

        let reopened = AssayMatrixGroup::open("/X", &ctx, ("obs_id", "var_id")).unwrap();
        assert_eq!(reopened.to_layers("data").unwrap().len(), 2);
    }

    #[test]
    fn assay_group_slice() {
        let (_dir, ctx) = ctx();
        let mut x = AssayMatrixGroup::open("/X", &ctx, ("obs_id", "var_id")).unwrap();
        let counts = layer(&[("c1", "g1", 3.0), ("c2", "g2", 5.0)]);
        x.add_layers("data", &[("counts", &counts)]).unwrap();
        x.set_query(&DimRanges::from([("obs_id".to_string(), s(&["c2"]))]))
            .unwrap();
        let got = x.get_layer("data", "counts").unwrap();
        assert_eq!(got.nnz(), 1);
        assert_eq!(got.row_names().unwrap(), &s(&["c2"]));
    }

    #[test]
    fn staging_checks_without_writing() {
        let (_dir, ctx) = ctx();
        let mut x = AssayMatrixGroup::open("/X", &ctx, ("obs_id", "var_id")).unwrap();
        let counts = layer(&[("c1", "g1", 3.0), ("c2", "g2", 5.0)]);
        x.add_layers("data", &[("counts", &counts)]).unwrap();

        assert!(matches!(
            x.stage("data", &[("other", &counts)]),
            Err(CellstoreError::Schema(_))
        ));
        assert_eq!(x.layer_names("data").unwrap(), s(&["counts"]));

        let staged = x.stage("fresh", &[("counts", &counts)]).unwrap();
        assert_eq!(staged.len(), 2);
        assert!(!x.group().child_array("fresh").exists());
        x.add_records("fresh", &staged).unwrap();
        assert_eq!(x.names(), s(&["data", "fresh"]));
    }

    #[test]
    fn annotation_groups() {
        let (_dir, ctx) = ctx();
        let mut obsm = AnnotationMatrixGroup::open("/obsm", &ctx, "obs_id").unwrap();
        let umap = DenseMatrix::new(
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            s(&["c1", "c2"]),
            s(&["UMAP_1", "UMAP_2"]),
        )
        .unwrap();
        obsm.add_matrix("X_umap", &umap).unwrap();
        assert_eq!(obsm.to_matrices().unwrap()["X_umap"], umap);

        let mut obsp = AnnotationPairwiseMatrixGroup::open("/obsp", &ctx, "obs_id").unwrap();
        let graph = SparseMatrix::from_labeled_entries(
            [("c1", "c2", 1.0)],
            s(&["c1", "c2"]),
            s(&["c1", "c2"]),
        )
        .unwrap();
        obsp.add_matrix("connectivities", &graph).unwrap();
        assert_eq!(obsp.names(), s(&["connectivities"]));
        assert_eq!(
            obsp.matrix("connectivities")
                .unwrap()
                .to_matrix()
                .unwrap()
                .get_labeled("c1", "c2"),
            Some(1.0)
        );
    }
}
