//! Base storage object: a URI inside a [`Context`], plus identity metadata.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use cellstore_core::{MetadataBearing, Result};

use crate::store::{child_path, node_path, Context, Mode, Session};

/// Metadata key recording which kind of object created a node.
pub const OBJECT_TYPE_KEY: &str = "cellstore_object_type";
/// Metadata key recording the layout version a node was written with.
pub const ENCODING_VERSION_KEY: &str = "cellstore_encoding_version";
/// Layout version written by this crate.
pub const ENCODING_VERSION: &str = "1";

/// A node in a store, identified by its path.
#[derive(Debug, Clone)]
pub struct StorageObject {
    uri: String,
    ctx: Context,
}

impl StorageObject {
    pub fn new(uri: &str, ctx: &Context) -> Self {
        Self {
            uri: node_path(uri),
            ctx: ctx.clone(),
        }
    }

    /// Node path within the store.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The open context this object lives in.
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Path of a child node named `name`.
    pub fn child_uri(&self, name: &str) -> String {
        child_path(&self.uri, name)
    }

    /// Whether the object has been created.
    pub fn exists(&self) -> bool {
        self.ctx.node_exists(&self.uri)
    }

    /// The object type recorded at creation, if the object exists.
    pub fn object_type(&self) -> Result<Option<String>> {
        if !self.exists() {
            return Ok(None);
        }
        self.get_metadata(OBJECT_TYPE_KEY)
    }

    pub(crate) fn session(&self, mode: Mode) -> Result<Session<'_>> {
        Session::open(&self.ctx, &self.uri, mode)
    }

    /// Create the node, stamping identity metadata.
    pub(crate) fn create_node(
        &self,
        object_type: &str,
        bookkeeping: Map<String, Value>,
    ) -> Result<Session<'_>> {
        let mut metadata = Map::new();
        metadata.insert(OBJECT_TYPE_KEY.into(), Value::String(object_type.into()));
        metadata.insert(ENCODING_VERSION_KEY.into(), Value::String(ENCODING_VERSION.into()));
        Session::create(&self.ctx, &self.uri, bookkeeping, metadata)
    }
}

impl MetadataBearing for StorageObject {
    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(self.session(Mode::Read)?.metadata().remove(key))
    }

    fn add_metadata(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.session(Mode::Write)?.put_metadata(entries)
    }

    fn list_metadata(&self, prefix: Option<&str>) -> Result<BTreeMap<String, String>> {
        let mut all = self.session(Mode::Read)?.metadata();
        if let Some(prefix) = prefix {
            all.retain(|k, _| k.starts_with(prefix));
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx() -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let ctx = Context::open(dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn identity_metadata_on_create() {
        let (_dir, ctx) = ctx();
        let obj = StorageObject::new("pbmc/", &ctx);
        assert_eq!(obj.uri(), "/pbmc");
        assert!(!obj.exists());
        assert_eq!(obj.object_type().unwrap(), None);

        drop(obj.create_node("Dataset", Map::new()).unwrap());
        assert!(obj.exists());
        assert_eq!(obj.object_type().unwrap().as_deref(), Some("Dataset"));
        assert_eq!(
            obj.get_metadata(ENCODING_VERSION_KEY).unwrap().as_deref(),
            Some(ENCODING_VERSION)
        );
    }

    #[test]
    fn metadata_prefix_filter() {
        let (_dir, ctx) = ctx();
        let obj = StorageObject::new("/node", &ctx);
        drop(obj.create_node("Group", Map::new()).unwrap());
        obj.add_metadata(&[("qc.min_genes", "200"), ("qc.max_mt", "5"), ("assay", "RNA")])
            .unwrap();

        let qc = obj.list_metadata(Some("qc.")).unwrap();
        assert_eq!(qc.len(), 2);
        assert_eq!(qc["qc.min_genes"], "200");
        assert_eq!(obj.get_metadata("assay").unwrap().as_deref(), Some("RNA"));
        assert_eq!(obj.get_metadata("missing").unwrap(), None);
        // identity keys plus the three added
        assert_eq!(obj.list_metadata(None).unwrap().len(), 5);
    }

    #[test]
    fn metadata_on_missing_object_fails() {
        let (_dir, ctx) = ctx();
        let obj = StorageObject::new("/ghost", &ctx);
        assert!(obj.get_metadata("k").is_err());
    }

    #[test]
    fn child_uri() {
        let (_dir, ctx) = ctx();
        assert_eq!(StorageObject::new("/", &ctx).child_uri("obs"), "/obs");
        assert_eq!(StorageObject::new("/ds", &ctx).child_uri("obs"), "/ds/obs");
    }
}
