//! Collections of annotated datasets sharing one store group.

use std::collections::BTreeMap;

use cellstore_core::{CellstoreError, MetadataBearing, Result};

use crate::anndata::AnnData;
use crate::dataset::Dataset;
use crate::group::{Group, Member, MemberKind};
use crate::store::Context;

/// Handle on a group of named [`Dataset`]s.
#[derive(Debug, Clone)]
pub struct DatasetCollection {
    group: Group,
    datasets: BTreeMap<String, Dataset>,
}

impl DatasetCollection {
    /// Handle on the collection at `uri`, opening every member dataset that
    /// already exists.
    pub fn open(uri: &str, ctx: &Context) -> Result<Self> {
        let group = Group::open_or_new(uri, ctx)?;
        let mut datasets = BTreeMap::new();
        if group.exists() {
            for (name, kind) in group.list_members()? {
                if kind == MemberKind::Group {
                    let ds = Dataset::open(&group.object().child_uri(&name), ctx)?;
                    datasets.insert(name, ds);
                }
            }
        }
        Ok(Self { group, datasets })
    }

    pub fn uri(&self) -> &str {
        self.group.uri()
    }

    pub fn exists(&self) -> bool {
        self.group.exists()
    }

    pub fn create(&self) -> Result<()> {
        self.group.create("DatasetCollection")
    }

    /// Ingest `adata` as a new member dataset named `name`.
    ///
    /// # Errors
    ///
    /// [`CellstoreError::Argument`] if the collection already has a dataset
    /// with that name.
    pub fn add_dataset(&mut self, name: &str, adata: &AnnData) -> Result<&mut Dataset> {
        if self.datasets.contains_key(name) {
            return Err(CellstoreError::Argument(format!(
                "'{}' already has a dataset named '{name}'",
                self.uri()
            )));
        }
        self.group.ensure("DatasetCollection")?;
        let mut ds = Dataset::open(&self.group.object().child_uri(name), self.group.object().ctx())?;
        ds.from_anndata(adata)?;
        self.group.add_member(name, Member::Group(ds.group().clone()))?;
        log::info!("Added dataset '{name}' to '{}'", self.uri());
        Ok(self.datasets.entry(name.to_string()).or_insert(ds))
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    pub fn dataset_mut(&mut self, name: &str) -> Option<&mut Dataset> {
        self.datasets.get_mut(name)
    }

    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    /// Slice every member dataset. See [`Dataset::set_query`].
    pub fn set_query(&mut self, obs_ids: Option<&[String]>, var_ids: Option<&[String]>) -> Result<()> {
        for ds in self.datasets.values_mut() {
            ds.set_query(obs_ids, var_ids)?;
        }
        Ok(())
    }

    pub fn clear_query(&mut self) {
        for ds in self.datasets.values_mut() {
            ds.clear_query();
        }
    }

    /// Export every member dataset, honouring the active slice.
    pub fn to_anndatas(&self) -> Result<Vec<(String, AnnData)>> {
        self.datasets
            .iter()
            .map(|(name, ds)| Ok((name.clone(), ds.to_anndata()?)))
            .collect()
    }
}

impl MetadataBearing for DatasetCollection {
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
