//! Annotated datasets: the on-store counterpart of [`AnnData`].
//!
//! A [`Dataset`] is a group with fixed, typed members:
//!
//! | member | kind                              | dimensions                  |
//! |--------|-----------------------------------|-----------------------------|
//! | `obs`  | [`AnnotationDataframe`]           | `obs_id`                    |
//! | `var`  | [`AnnotationDataframe`]           | `var_id`                    |
//! | `X`    | [`AssayMatrixGroup`]              | `obs_id`, `var_id`          |
//! | `obsm` | [`AnnotationMatrixGroup`]         | `obs_id`                    |
//! | `varm` | [`AnnotationMatrixGroup`]         | `var_id`                    |
//! | `obsp` | [`AnnotationPairwiseMatrixGroup`] | `obs_id_i`, `obs_id_j`      |
//! | `varp` | [`AnnotationPairwiseMatrixGroup`] | `var_id_i`, `var_id_j`      |
//! | `misc` | [`Group`]                         | none; holds `uns` metadata  |
//!
//! [`Dataset::set_query`] slices by observation and feature ids and maps
//! each axis onto the dimensions every member declares, so that obs, var
//! and the layers read back mutually consistent subsets.

use std::collections::BTreeMap;

use cellstore_core::{CellstoreError, DimRanges, MetadataBearing, Result, Sliceable};

use crate::align;
use crate::annotation::AnnotationDataframe;
use crate::anndata::{AnnData, Axis};
use crate::array::Records;
use crate::group::{Group, Member};
use crate::matrix_group::{AnnotationMatrixGroup, AnnotationPairwiseMatrixGroup, AssayMatrixGroup};
use crate::object::{ENCODING_VERSION_KEY, OBJECT_TYPE_KEY};
use crate::sparse::SparseMatrix;
use crate::store::Context;

/// Observation id dimension.
pub const OBS_ID: &str = "obs_id";
/// Feature id dimension.
pub const VAR_ID: &str = "var_id";
/// Name of the assay matrix holding every layer under `X`.
pub const LAYERS_MATRIX: &str = "layers";

fn ranges(pairs: &[(&str, Option<&[String]>)]) -> DimRanges {
    pairs
        .iter()
        .filter_map(|(dim, ids)| ids.map(|ids| (dim.to_string(), ids.to_vec())))
        .collect()
}

fn apply<S: Sliceable>(target: &mut S, exists: bool, ranges: DimRanges) -> Result<()> {
    if exists && !ranges.is_empty() {
        target.set_query(&ranges)?;
    }
    Ok(())
}

/// Member payloads converted ahead of an ingest.
#[derive(Default)]
struct Staged {
    obs: Records,
    var: Records,
    layers: Option<Records>,
    obsm: Vec<(String, Records)>,
    varm: Vec<(String, Records)>,
    obsp: Vec<(String, Records)>,
    varp: Vec<(String, Records)>,
}

/// Handle on a stored annotated dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    group: Group,
    obs: AnnotationDataframe,
    var: AnnotationDataframe,
    x: AssayMatrixGroup,
    obsm: AnnotationMatrixGroup,
    varm: AnnotationMatrixGroup,
    obsp: AnnotationPairwiseMatrixGroup,
    varp: AnnotationPairwiseMatrixGroup,
    misc: Group,
}

impl Dataset {
    /// Handle on the dataset at `uri`, loading member handles for whatever
    /// already exists.
    pub fn open(uri: &str, ctx: &Context) -> Result<Self> {
        let group = Group::open_or_new(uri, ctx)?;
        let child = |name: &str| group.object().child_uri(name);
        Ok(Self {
            obs: AnnotationDataframe::new(&child("obs"), ctx, OBS_ID),
            var: AnnotationDataframe::new(&child("var"), ctx, VAR_ID),
            x: AssayMatrixGroup::open(&child("X"), ctx, (OBS_ID, VAR_ID))?,
            obsm: AnnotationMatrixGroup::open(&child("obsm"), ctx, OBS_ID)?,
            varm: AnnotationMatrixGroup::open(&child("varm"), ctx, VAR_ID)?,
            obsp: AnnotationPairwiseMatrixGroup::open(&child("obsp"), ctx, OBS_ID)?,
            varp: AnnotationPairwiseMatrixGroup::open(&child("varp"), ctx, VAR_ID)?,
            misc: Group::open_or_new(&child("misc"), ctx)?,
            group,
        })
    }

    pub fn uri(&self) -> &str {
        self.group.uri()
    }

    pub fn exists(&self) -> bool {
        self.group.exists()
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn obs(&self) -> &AnnotationDataframe {
        &self.obs
    }

    pub fn var(&self) -> &AnnotationDataframe {
        &self.var
    }

    pub fn x(&self) -> &AssayMatrixGroup {
        &self.x
    }

    pub fn obsm(&self) -> &AnnotationMatrixGroup {
        &self.obsm
    }

    pub fn varm(&self) -> &AnnotationMatrixGroup {
        &self.varm
    }

    pub fn obsp(&self) -> &AnnotationPairwiseMatrixGroup {
        &self.obsp
    }

    pub fn varp(&self) -> &AnnotationPairwiseMatrixGroup {
        &self.varp
    }

    pub fn misc(&self) -> &Group {
        &self.misc
    }

    /// Create the dataset group. Members are created as they are written.
    pub fn create(&self) -> Result<()> {
        self.group.create("Dataset")
    }

    /// Ingest `adata`: obs, var, every layer (padded to the full feature
    /// set), obsm/varm, obsp/varp and `uns` as metadata on `misc`.
    ///
    /// Every payload is converted and checked before the first write, so a
    /// rejected ingest leaves storage untouched.
    ///
    /// # Errors
    ///
    /// [`CellstoreError::Schema`] if the dataset already holds obs or var
    /// records; a dataset is ingested once.
    pub fn from_anndata(&mut self, adata: &AnnData) -> Result<()> {
        adata.validate()?;
        if self.obs.exists() || self.var.exists() {
            return Err(CellstoreError::Schema(format!(
                "'{}' already holds an ingested dataset",
                self.uri()
            )));
        }
        let staged = self.stage(adata)?;

        log::info!(
            "Writing {} obs \u{00d7} {} vars to '{}'",
            adata.n_obs(),
            adata.n_vars(),
            self.uri()
        );
        self.group.ensure("Dataset")?;
        self.obs
            .array()
            .write_records(&staged.obs, AnnotationDataframe::OBJECT_TYPE)?;
        self.group
            .add_member("obs", Member::Array(self.obs.array().clone()))?;
        self.var
            .array()
            .write_records(&staged.var, AnnotationDataframe::OBJECT_TYPE)?;
        self.group
            .add_member("var", Member::Array(self.var.array().clone()))?;

        if let Some(records) = &staged.layers {
            self.x.add_records(LAYERS_MATRIX, records)?;
            self.group.add_member("X", Member::Group(self.x.group().clone()))?;
        }
        for (key, records) in &staged.obsm {
            self.obsm.add_records(key, records)?;
        }
        for (key, records) in &staged.varm {
            self.varm.add_records(key, records)?;
        }
        for (key, records) in &staged.obsp {
            self.obsp.add_records(key, records)?;
        }
        for (key, records) in &staged.varp {
            self.varp.add_records(key, records)?;
        }
        for (name, group) in [
            ("obsm", self.obsm.group()),
            ("varm", self.varm.group()),
            ("obsp", self.obsp.group()),
            ("varp", self.varp.group()),
        ] {
            if group.exists() {
                let member = Member::Group(group.clone());
                self.group.add_member(name, member)?;
            }
        }

        self.misc.ensure("Group")?;
        let uns: Vec<(&str, &str)> = adata
            .uns()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !uns.is_empty() {
            self.misc.add_metadata(&uns)?;
        }
        self.group.add_member("misc", Member::Group(self.misc.clone()))?;
        Ok(())
    }

    /// Convert every member payload of `adata` and check it against the
    /// target array.
    fn stage(&self, adata: &AnnData) -> Result<Staged> {
        let obs = self.obs.records(adata.obs())?;
        self.obs.array().check_records(&obs)?;
        let var = self.var.records(adata.var())?;
        self.var.array().check_records(&var)?;

        let layers = if adata.layers().is_empty() {
            None
        } else {
            let mut padded = Vec::with_capacity(adata.layers().len());
            for (name, m) in adata.layers() {
                let m = if adata.var_names().is_empty() {
                    m.clone()
                } else {
                    align::pad(m, adata.var_names())?
                };
                padded.push((name.as_str(), m));
            }
            let refs: Vec<(&str, &SparseMatrix)> = padded.iter().map(|(n, m)| (*n, m)).collect();
            Some(self.x.stage(LAYERS_MATRIX, &refs)?)
        };

        let mut staged = Staged {
            obs,
            var,
            layers,
            ..Staged::default()
        };
        for (key, m) in adata.obsm() {
            staged.obsm.push((key.clone(), self.obsm.stage(key, m)?));
        }
        for (key, m) in adata.varm() {
            staged.varm.push((key.clone(), self.varm.stage(key, m)?));
        }
        for (key, m) in adata.obsp() {
            staged.obsp.push((key.clone(), self.obsp.stage(key, m)?));
        }
        for (key, m) in adata.varp() {
            staged.varp.push((key.clone(), self.varp.stage(key, m)?));
        }
        Ok(staged)
    }

    /// Export the dataset, honouring the active slice.
    ///
    /// Layers and pairwise matrices are conformed to the exported obs/var
    /// ids, in stored order.
    pub fn to_anndata(&self) -> Result<AnnData> {
        let obs = self.obs.to_dataframe(None)?;
        let var = self.var.to_dataframe(None)?;
        log::info!(
            "Exporting {} obs \u{00d7} {} vars from '{}'",
            obs.n_rows(),
            var.n_rows(),
            self.uri()
        );
        let obs_ids = obs.index().to_vec();
        let var_ids = var.index().to_vec();
        let mut adata = AnnData::new(obs, var);

        if self.x.group().member(LAYERS_MATRIX).is_some() {
            for (name, layer) in self.x.to_layers(LAYERS_MATRIX)? {
                adata.add_layer(&name, layer.reindex(&obs_ids, &var_ids)?)?;
            }
        }
        for (name, m) in self.obsm.to_matrices()? {
            adata.add_axis_matrix(Axis::Obs, &name, m)?;
        }
        for (name, m) in self.varm.to_matrices()? {
            adata.add_axis_matrix(Axis::Var, &name, m)?;
        }
        for (name, m) in self.obsp.to_matrices()? {
            adata.add_pairwise(Axis::Obs, &name, m.reindex(&obs_ids, &obs_ids)?)?;
        }
        for (name, m) in self.varp.to_matrices()? {
            adata.add_pairwise(Axis::Var, &name, m.reindex(&var_ids, &var_ids)?)?;
        }
        if self.misc.exists() {
            for (key, value) in self.misc.list_metadata(None)? {
                if key != OBJECT_TYPE_KEY && key != ENCODING_VERSION_KEY {
                    adata.add_uns(&key, &value);
                }
            }
        }
        Ok(adata)
    }

    /// Restrict every member to the given observation and/or feature ids.
    ///
    /// `None` leaves that axis as it was. Members not yet written are skipped.
    pub fn set_query(&mut self, obs_ids: Option<&[String]>, var_ids: Option<&[String]>) -> Result<()> {
        log::debug!(
            "'{}': slicing to {:?} obs, {:?} vars",
            self.uri(),
            obs_ids.map(<[String]>::len),
            var_ids.map(<[String]>::len)
        );
        let exists = self.obs.exists();
        apply(&mut self.obs, exists, ranges(&[(OBS_ID, obs_ids)]))?;
        let exists = self.var.exists();
        apply(&mut self.var, exists, ranges(&[(VAR_ID, var_ids)]))?;
        let exists = self.x.exists();
        apply(&mut self.x, exists, ranges(&[(OBS_ID, obs_ids), (VAR_ID, var_ids)]))?;
        let exists = self.obsm.exists();
        apply(&mut self.obsm, exists, ranges(&[(OBS_ID, obs_ids)]))?;
        let exists = self.varm.exists();
        apply(&mut self.varm, exists, ranges(&[(VAR_ID, var_ids)]))?;
        let exists = self.obsp.exists();
        apply(
            &mut self.obsp,
            exists,
            ranges(&[("obs_id_i", obs_ids), ("obs_id_j", obs_ids)]),
        )?;
        let exists = self.varp.exists();
        apply(
            &mut self.varp,
            exists,
            ranges(&[("var_id_i", var_ids), ("var_id_j", var_ids)]),
        )?;
        // the group view holds its own member handles
        let exists = self.group.exists();
        apply(
            &mut self.group,
            exists,
            ranges(&[
                (OBS_ID, obs_ids),
                (VAR_ID, var_ids),
                ("obs_id_i", obs_ids),
                ("obs_id_j", obs_ids),
                ("var_id_i", var_ids),
                ("var_id_j", var_ids),
            ]),
        )
    }

    /// Drop every member's restriction.
    pub fn clear_query(&mut self) {
        self.obs.clear_query();
        self.var.clear_query();
        self.x.clear_query();
        self.obsm.clear_query();
        self.varm.clear_query();
        self.obsp.clear_query();
        self.varp.clear_query();
        self.group.clear_query();
    }
}

impl MetadataBearing for Dataset {
    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.group.get_metadata(key)
    }

    fn add_metadata(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.group.add_metadata(entries)
    }

    fn list_metadata(&self, prefix: Option<&str>) -> Result<BTreeMap<String, String>> {
        self.group.list_metadata(prefix)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dense::DenseMatrix;
    use crate::frame::{ColumnData, DataFrame};
    use cellstore_core::Readable;
    use tempfile::TempDir;

    fn ctx() -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let ctx = Context::open(dir.path()).unwrap();
        (dir, ctx)
    }

    pub(crate) fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    /// Three cells, three genes, two layers, one embedding, one graph.
    pub(crate) fn pbmc() -> AnnData {
        let mut obs = DataFrame::new(s(&["a", "b", "c"])).unwrap();
        obs.add_column("n_counts", ColumnData::Numeric(vec![10.0, 20.0, 30.0]))
            .unwrap();
        obs.add_column(
            "louvain",
            ColumnData::Categorical {
                codes: vec![0, 1, 0],
                categories: s(&["T", "B"]),
            },
        )
        .unwrap();
        let mut var = DataFrame::new(s(&["g1", "g2", "g3"])).unwrap();
        var.add_column("highly_variable", ColumnData::Logical(vec![true, false, true]))
            .unwrap();

        let mut ad = AnnData::new(obs, var);
        let counts = SparseMatrix::from_labeled_entries(
            [("a", "g1", 1.0), ("a", "g3", 2.0), ("b", "g2", 3.0), ("c", "g1", 4.0)],
            s(&["a", "b", "c"]),
            s(&["g1", "g2", "g3"]),
        )
        .unwrap();
        // covers only g1 and g2; padded to the full feature set on ingest
        let spliced = SparseMatrix::from_labeled_entries(
            [("a", "g1", 0.5), ("b", "g2", 1.5), ("c", "g1", 2.5)],
            s(&["a", "b", "c"]),
            s(&["g1", "g2"]),
        )
        .unwrap();
        ad.add_layer("counts", counts).unwrap();
        ad.add_layer("spliced", spliced).unwrap();
        ad.add_axis_matrix(
            Axis::Obs,
            "X_pca",
            DenseMatrix::new(
                vec![vec![0.1, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]],
                s(&["a", "b", "c"]),
                s(&["PC_1", "PC_2"]),
            )
            .unwrap(),
        )
        .unwrap();
        ad.add_pairwise(
            Axis::Obs,
            "distances",
            SparseMatrix::from_labeled_entries(
                [("a", "b", 1.0), ("b", "c", 2.0)],
                s(&["a", "b", "c"]),
                s(&["a", "b", "c"]),
            )
            .unwrap(),
        )
        .unwrap();
        ad.add_uns("title", "pbmc3k");
        ad
    }

    fn stored(ctx: &Context) -> Dataset {
        let mut ds = Dataset::open("/pbmc", ctx).unwrap();
        ds.from_anndata(&pbmc()).unwrap();
        ds
    }

    #[test]
    fn round_trip() {
        let (_dir, ctx) = ctx();
        let ds = stored(&ctx);
        assert_eq!(ds.group().object().object_type().unwrap().as_deref(), Some("Dataset"));

        let back = Dataset::open("/pbmc", &ctx).unwrap().to_anndata().unwrap();
        assert_eq!(back.obs_names(), &s(&["a", "b", "c"]));
        assert_eq!(
            back.obs().column("louvain"),
            Some(&ColumnData::Strings(s(&["T", "B", "T"])))
        );
        assert_eq!(
            back.var().column("highly_variable"),
            Some(&ColumnData::Integer(vec![1, 0, 1]))
        );
        assert_eq!(back.layer_names(), vec!["counts", "spliced"]);
        let counts = back.layer("counts").unwrap();
        assert_eq!(counts.nnz(), 4);
        assert_eq!(counts.get_labeled("a", "g3"), Some(2.0));
        let spliced = back.layer("spliced").unwrap();
        assert_eq!(spliced.nnz(), 3);
        assert_eq!(spliced.col_names().unwrap(), &s(&["g1", "g2", "g3"]));
        assert_eq!(back.obsm()["X_pca"].get(2, 1), Some(0.6));
        assert_eq!(back.obsp()["distances"].get_labeled("b", "c"), Some(2.0));
        assert_eq!(back.uns().get("title").map(String::as_str), Some("pbmc3k"));
    }

    #[test]
    fn slice_is_consistent_across_members() {
        let (_dir, ctx) = ctx();
        let mut ds = stored(&ctx);
        ds.set_query(Some(s(&["a", "b"]).as_slice()), None).unwrap();

        assert_eq!(ds.obs().ids().unwrap(), s(&["a", "b"]));
        let ad = ds.to_anndata().unwrap();
        assert_eq!(ad.obs_names(), &s(&["a", "b"]));
        assert_eq!(ad.var_names(), &s(&["g1", "g2", "g3"]));
        for (_, layer) in ad.layers() {
            assert_eq!(layer.row_names().unwrap(), &s(&["a", "b"]));
            assert!(layer.labeled_triplets().unwrap().iter().all(|(r, _, _)| *r != "c"));
        }
        assert_eq!(ad.obsm()["X_pca"].row_names(), &s(&["a", "b"]));
        let distances = &ad.obsp()["distances"];
        assert_eq!(distances.nnz(), 1);
        assert_eq!(distances.get_labeled("a", "b"), Some(1.0));
    }

    #[test]
    fn slice_narrows_monotonically() {
        let (_dir, ctx) = ctx();
        let mut ds = stored(&ctx);
        ds.set_query(Some(s(&["a", "b", "c"]).as_slice()), Some(s(&["g1", "g2"]).as_slice()))
            .unwrap();
        let wide = ds.to_anndata().unwrap();
        ds.set_query(Some(s(&["a"]).as_slice()), None).unwrap();
        let narrow = ds.to_anndata().unwrap();

        assert!(narrow
            .obs_names()
            .iter()
            .all(|id| wide.obs_names().contains(id)));
        // the feature restriction survives the second call
        assert_eq!(narrow.var_names(), &s(&["g1", "g2"]));
        assert_eq!(narrow.layer("counts").unwrap().nnz(), 1);

        ds.clear_query();
        assert_eq!(ds.to_anndata().unwrap().n_obs(), 3);
    }

    #[test]
    fn unknown_dimension_keeps_prior_slice() {
        let (_dir, ctx) = ctx();
        let mut ds = stored(&ctx);
        ds.set_query(None, Some(s(&["g2"]).as_slice())).unwrap();

        let mut var = ds.var().clone();
        let bad = DimRanges::from([("obs_id".to_string(), s(&["a"]))]);
        assert!(matches!(
            var.set_query(&bad),
            Err(CellstoreError::UnknownDimension { .. })
        ));
        assert_eq!(var.ids().unwrap(), s(&["g2"]));
    }

    #[test]
    fn absent_members_are_skipped() {
        let (_dir, ctx) = ctx();
        let obs = DataFrame::new(s(&["a", "b"])).unwrap();
        let var = DataFrame::new(s(&["g1"])).unwrap();
        let mut ds = Dataset::open("/bare", &ctx).unwrap();
        ds.from_anndata(&AnnData::new(obs, var)).unwrap();
        assert!(!ds.x().exists());
        assert!(!ds.obsm().exists());

        ds.set_query(Some(s(&["b"]).as_slice()), Some(s(&["g1"]).as_slice()))
            .unwrap();
        let ad = ds.to_anndata().unwrap();
        assert_eq!(ad.obs_names(), &s(&["b"]));
        assert!(ad.layers().is_empty());
        assert!(ad.uns().is_empty());
    }

    #[test]
    fn second_ingest_is_rejected() {
        let (_dir, ctx) = ctx();
        let mut ds = stored(&ctx);
        assert!(matches!(ds.from_anndata(&pbmc()), Err(CellstoreError::Schema(_))));

        let mut extra = AnnData::new(
            DataFrame::new(s(&["d"])).unwrap(),
            DataFrame::new(s(&["g1"])).unwrap(),
        );
        extra
            .add_layer(
                "other",
                SparseMatrix::from_labeled_entries([("d", "g1", 1.0)], s(&["d"]), s(&["g1"]))
                    .unwrap(),
            )
            .unwrap();
        assert!(matches!(ds.from_anndata(&extra), Err(CellstoreError::Schema(_))));

        let reopened = Dataset::open("/pbmc", &ctx).unwrap();
        assert_eq!(reopened.obs().ids().unwrap(), s(&["a", "b", "c"]));
        assert_eq!(reopened.var().ids().unwrap(), s(&["g1", "g2", "g3"]));
        assert_eq!(
            reopened.x().layer_names(LAYERS_MATRIX).unwrap(),
            s(&["counts", "spliced"])
        );
        assert_eq!(reopened.to_anndata().unwrap().n_obs(), 3);
    }

    #[test]
    fn rejected_payload_writes_nothing() {
        let (_dir, ctx) = ctx();
        let mut ad = pbmc();
        // a column named like the dimension cannot be stored
        ad.add_axis_matrix(
            Axis::Obs,
            "X_bad",
            DenseMatrix::new(
                vec![vec![1.0], vec![2.0], vec![3.0]],
                s(&["a", "b", "c"]),
                s(&[OBS_ID]),
            )
            .unwrap(),
        )
        .unwrap();

        let mut ds = Dataset::open("/pbmc", &ctx).unwrap();
        assert!(matches!(ds.from_anndata(&ad), Err(CellstoreError::Schema(_))));
        assert!(!ds.exists());
        assert!(!ds.obs().exists());
        assert!(!ds.x().exists());

        // the store stays usable for a valid ingest
        ds.from_anndata(&pbmc()).unwrap();
        assert_eq!(ds.obs().ids().unwrap(), s(&["a", "b", "c"]));
    }

    #[test]
    fn featureless_layers_are_not_padded() {
        let (_dir, ctx) = ctx();
        let mut ad = AnnData::new(
            DataFrame::new(s(&["a"])).unwrap(),
            DataFrame::new(Vec::new()).unwrap(),
        );
        ad.add_layer("counts", SparseMatrix::with_labels(s(&["a"]), Vec::new()))
            .unwrap();

        let mut ds = Dataset::open("/empty", &ctx).unwrap();
        ds.from_anndata(&ad).unwrap();
        let back = ds.to_anndata().unwrap();
        assert_eq!(back.obs_names(), &s(&["a"]));
        assert_eq!(back.n_vars(), 0);
        assert_eq!(back.layer("counts").unwrap().nnz(), 0);
    }

    #[test]
    fn group_view_follows_slice() {
        let (_dir, ctx) = ctx();
        let mut ds = stored(&ctx);
        ds.set_query(Some(s(&["a"]).as_slice()), None).unwrap();

        let obs = ds.group().array("obs").unwrap().read().unwrap();
        assert_eq!(obs.dimension(OBS_ID).unwrap(), &["a"]);
        let layers = ds
            .group()
            .group("X")
            .unwrap()
            .array(LAYERS_MATRIX)
            .unwrap()
            .read()
            .unwrap();
        assert!(!layers.is_empty());
        assert!(layers.dimension(OBS_ID).unwrap().iter().all(|id| id == "a"));
        let graph = ds
            .group()
            .group("obsp")
            .unwrap()
            .array("distances")
            .unwrap()
            .read()
            .unwrap();
        assert!(graph.is_empty());
        let var = ds.group().array("var").unwrap().read().unwrap();
        assert_eq!(var.len(), 3);

        ds.clear_query();
        assert_eq!(ds.group().array("obs").unwrap().read().unwrap().len(), 3);
    }

    #[test]
    fn dataset_metadata() {
        let (_dir, ctx) = ctx();
        let ds = stored(&ctx);
        ds.add_metadata(&[("organism", "human")]).unwrap();
        let reopened = Dataset::open("/pbmc", &ctx).unwrap();
        assert_eq!(
            reopened.get_metadata("organism").unwrap().as_deref(),
            Some("human")
        );
        assert_eq!(reopened.x().layer_names(LAYERS_MATRIX).unwrap(), s(&["counts", "spliced"]));
    }
}
