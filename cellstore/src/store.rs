//! Boundary to the Zarr array storage engine.
//!
//! Every storage object is a Zarr group node whose attributes carry the
//! object's identity, schema or membership (under `cellstore`) and its user
//! metadata (under `metadata`). Array columns are one-dimensional Zarr
//! arrays stored as children of that node.
//!
//! Access goes through a [`Session`]: opened for [`Mode::Read`] or
//! [`Mode::Write`] before an operation and released when it is dropped,
//! including on early returns through `?`.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use zarrs::array::chunk_grid::ChunkGrid;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::{Group, GroupBuilder};
use zarrs::storage::{ReadableWritableListableStorage, ReadableWritableListableStorageTraits};

use cellstore_core::{CellstoreError, Result};

use crate::frame::ColumnData;

/// Attribute key holding cellstore's own bookkeeping.
pub(crate) const CELLSTORE_KEY: &str = "cellstore";
/// Attribute key holding user metadata.
pub(crate) const METADATA_KEY: &str = "metadata";

pub(crate) fn zarr_err(e: impl fmt::Display) -> CellstoreError {
    CellstoreError::Storage(format!("Zarr error: {e}"))
}

/// Join a child name onto a node path.
pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Normalize a node path to `/a/b` form.
pub(crate) fn node_path(uri: &str) -> String {
    let trimmed = uri.trim_matches('/');
    format!("/{trimmed}")
}

/// Open configuration shared by every object in one store.
#[derive(Clone)]
pub struct Context {
    root: PathBuf,
    store: ReadableWritableListableStorage,
}

impl Context {
    /// Open (creating if needed) a filesystem store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| {
            CellstoreError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let store: ReadableWritableListableStorage =
            Arc::new(FilesystemStore::new(path).map_err(zarr_err)?);
        log::debug!("opened store at {}", path.display());
        Ok(Self {
            root: path.to_path_buf(),
            store,
        })
    }

    /// Filesystem root of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn storage(&self) -> &ReadableWritableListableStorage {
        &self.store
    }

    /// Whether a cellstore node exists at `uri`.
    pub(crate) fn node_exists(&self, uri: &str) -> bool {
        Group::open(self.store.clone(), uri)
            .map(|g| g.attributes().contains_key(CELLSTORE_KEY))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("root", &self.root).finish()
    }
}

/// Access mode of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// An open node: scoped access to one object's attributes and columns.
pub(crate) struct Session<'a> {
    ctx: &'a Context,
    uri: &'a str,
    mode: Mode,
    node: Group<dyn ReadableWritableListableStorageTraits>,
}

impl<'a> Session<'a> {
    /// Open an existing node.
    pub(crate) fn open(ctx: &'a Context, uri: &'a str, mode: Mode) -> Result<Self> {
        let node = Group::open(ctx.storage().clone(), uri).map_err(zarr_err)?;
        if !node.attributes().contains_key(CELLSTORE_KEY) {
            return Err(CellstoreError::Storage(format!(
                "'{uri}' is not a cellstore object"
            )));
        }
        log::trace!("open '{uri}' ({mode:?})");
        Ok(Self { ctx, uri, mode, node })
    }

    /// Create a node with the given bookkeeping and metadata, opened for writing.
    pub(crate) fn create(
        ctx: &'a Context,
        uri: &'a str,
        cellstore: Map<String, Value>,
        metadata: Map<String, Value>,
    ) -> Result<Self> {
        let mut attributes = Map::new();
        attributes.insert(CELLSTORE_KEY.to_string(), Value::Object(cellstore));
        attributes.insert(METADATA_KEY.to_string(), Value::Object(metadata));
        let node = GroupBuilder::new()
            .attributes(attributes)
            .build(ctx.storage().clone(), uri)
            .map_err(zarr_err)?;
        node.store_metadata().map_err(zarr_err)?;
        log::debug!("created '{uri}'");
        Ok(Self {
            ctx,
            uri,
            mode: Mode::Write,
            node,
        })
    }

    fn require_write(&self) -> Result<()> {
        match self.mode {
            Mode::Write => Ok(()),
            Mode::Read => Err(CellstoreError::Argument(format!(
                "'{}' is open for reading only",
                self.uri
            ))),
        }
    }

    /// One entry of the `cellstore` bookkeeping object.
    pub(crate) fn bookkeeping(&self, key: &str) -> Option<&Value> {
        self.node
            .attributes()
            .get(CELLSTORE_KEY)
            .and_then(|v| v.get(key))
    }

    /// Replace one entry of the `cellstore` bookkeeping object.
    pub(crate) fn set_bookkeeping(&mut self, key: &str, value: Value) -> Result<()> {
        self.require_write()?;
        let attrs = self.node.attributes_mut();
        let entry = attrs
            .entry(CELLSTORE_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
        self.node.store_metadata().map_err(zarr_err)
    }

    /// User metadata as string pairs. Non-string values are rendered as JSON.
    pub(crate) fn metadata(&self) -> BTreeMap<String, String> {
        self.node
            .attributes()
            .get(METADATA_KEY)
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .map(|(k, v)| {
                        let s = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                        (k.clone(), s)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Insert or overwrite user metadata entries.
    pub(crate) fn put_metadata(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        self.require_write()?;
        let attrs = self.node.attributes_mut();
        let entry = attrs
            .entry(METADATA_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            for (k, v) in entries {
                map.insert(k.to_string(), Value::String(v.to_string()));
            }
        }
        self.node.store_metadata().map_err(zarr_err)
    }

    /// Overwrite the column `name` with `data`, chunked by `capacity` records.
    pub(crate) fn write_column(&self, name: &str, data: &ColumnData, capacity: u64) -> Result<()> {
        self.require_write()?;
        let path = child_path(self.uri, name);
        let n = data.len() as u64;
        let (data_type, fill_value) = match data {
            ColumnData::Strings(_) => (DataType::String, FillValue::from("")),
            ColumnData::Numeric(_) => (DataType::Float64, FillValue::from(f64::NAN)),
            ColumnData::Integer(_) => (DataType::Int32, FillValue::from(0i32)),
            ColumnData::Logical(_) | ColumnData::Categorical { .. } => {
                return Err(CellstoreError::Schema(format!(
                    "column '{name}' must be normalized before it is stored"
                )));
            }
        };
        let array = ArrayBuilder::new(
            vec![n],
            data_type,
            make_chunk_grid(capacity.min(n)),
            fill_value,
        )
        .build(self.ctx.storage().clone(), &path)
        .map_err(zarr_err)?;
        array.store_metadata().map_err(zarr_err)?;
        if n > 0 {
            let subset = array.subset_all();
            match data {
                ColumnData::Strings(v) => array.store_array_subset_elements::<String>(&subset, v),
                ColumnData::Numeric(v) => array.store_array_subset_elements::<f64>(&subset, v),
                ColumnData::Integer(v) => array.store_array_subset_elements::<i32>(&subset, v),
                ColumnData::Logical(_) | ColumnData::Categorical { .. } => Ok(()),
            }
            .map_err(zarr_err)?;
        }
        Ok(())
    }

    /// Read column `name`, or only the records in `range`.
    pub(crate) fn read_column(&self, name: &str, range: Option<Range<u64>>) -> Result<ColumnData> {
        let array = Array::open(self.ctx.storage().clone(), &child_path(self.uri, name))
            .map_err(zarr_err)?;
        let len = array.shape().first().copied().unwrap_or(0);
        let subset = match range {
            Some(r) if r.start >= r.end => None,
            Some(r) => Some(ArraySubset::new_with_ranges(&[r.start..r.end.min(len)])),
            None if len == 0 => None,
            None => Some(array.subset_all()),
        };
        let column = match (array.data_type(), subset) {
            (DataType::String, None) => ColumnData::Strings(Vec::new()),
            (DataType::Float64, None) => ColumnData::Numeric(Vec::new()),
            (DataType::Int32, None) => ColumnData::Integer(Vec::new()),
            (DataType::String, Some(s)) => ColumnData::Strings(
                array.retrieve_array_subset_elements::<String>(&s).map_err(zarr_err)?,
            ),
            (DataType::Float64, Some(s)) => ColumnData::Numeric(
                array.retrieve_array_subset_elements::<f64>(&s).map_err(zarr_err)?,
            ),
            (DataType::Int32, Some(s)) => ColumnData::Integer(
                array.retrieve_array_subset_elements::<i32>(&s).map_err(zarr_err)?,
            ),
            (other, _) => {
                return Err(CellstoreError::Storage(format!(
                    "column '{name}' of '{}' has unsupported type {other:?}",
                    self.uri
                )));
            }
        };
        Ok(column)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        log::trace!("close '{}' ({:?})", self.uri, self.mode);
    }
}

fn make_chunk_grid(chunk: u64) -> ChunkGrid {
    let nz = NonZeroU64::new(chunk).unwrap_or(NonZeroU64::MIN);
    ChunkGrid::from(vec![nz])
}
