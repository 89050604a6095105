//! Queryable arrays: typed columnar records addressed by labeled dimensions.
//!
//! A [`QueryableArray`] is one stored array with an immutable
//! [`ArraySchema`]. Reads can be narrowed with [`Sliceable::set_query`]: the
//! active restriction maps each dimension to the exact set of labels a
//! record's coordinate must belong to. The restriction lives on the handle
//! only; it is never persisted and other handles to the same URI do not see
//! it.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use cellstore_core::{
    CellstoreError, DimRanges, MetadataBearing, Readable, Result, Sliceable, Writable,
};

use crate::codec::{CoordinateTable, TableColumn};
use crate::frame::ColumnData;
use crate::object::StorageObject;
use crate::schema::{ArraySchema, AttributeType};
use crate::store::{Context, Mode, Session};

const KIND_KEY: &str = "kind";
const SCHEMA_KEY: &str = "schema";

/// Columnar payload of an array: dimension label columns plus attribute columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Records {
    dimensions: Vec<(String, Vec<String>)>,
    attributes: Vec<(String, ColumnData)>,
}

impl Records {
    fn expected_len(&self) -> Option<usize> {
        self.dimensions
            .first()
            .map(|(_, v)| v.len())
            .or_else(|| self.attributes.first().map(|(_, c)| c.len()))
    }

    fn check_new(&self, name: &str, len: usize) -> Result<()> {
        if self.dimension(name).is_some() || self.attribute(name).is_some() {
            return Err(CellstoreError::Schema(format!("duplicate field '{name}'")));
        }
        match self.expected_len() {
            Some(n) if n != len => Err(CellstoreError::Schema(format!(
                "field '{name}' has {len} records, expected {n}"
            ))),
            _ => Ok(()),
        }
    }

    /// Append a dimension (coordinate label) column.
    pub fn add_dimension(&mut self, name: &str, labels: Vec<String>) -> Result<()> {
        self.check_new(name, labels.len())?;
        self.dimensions.push((name.to_string(), labels));
        Ok(())
    }

    /// Append an attribute (value) column.
    pub fn add_attribute(&mut self, name: &str, data: ColumnData) -> Result<()> {
        self.check_new(name, data.len())?;
        self.attributes.push((name.to_string(), data));
        Ok(())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.expected_len().unwrap_or(0)
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> &[(String, Vec<String>)] {
        &self.dimensions
    }

    pub fn attributes(&self) -> &[(String, ColumnData)] {
        &self.attributes
    }

    /// A dimension column by name.
    pub fn dimension(&self, name: &str) -> Option<&[String]> {
        self.dimensions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// An attribute column by name.
    pub fn attribute(&self, name: &str) -> Option<&ColumnData> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Split into dimension and attribute columns.
    pub fn into_parts(self) -> (Vec<(String, Vec<String>)>, Vec<(String, ColumnData)>) {
        (self.dimensions, self.attributes)
    }

    /// Records from a coordinate table: label columns become dimensions and
    /// value columns numeric attributes, with missing values stored as NaN.
    ///
    /// NaN is the missing marker, so a stored NaN value reads back as absent.
    pub fn from_table(table: CoordinateTable) -> Result<Self> {
        let mut records = Records::default();
        for (name, column) in table.into_columns() {
            match column {
                TableColumn::Labels(labels) => records.add_dimension(&name, labels)?,
                TableColumn::Values(values) => records.add_attribute(
                    &name,
                    ColumnData::Numeric(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()),
                )?,
            }
        }
        Ok(records)
    }

    /// Coordinate table view of numeric records; NaN reads back as missing.
    pub fn into_table(self) -> Result<CoordinateTable> {
        let mut columns = Vec::with_capacity(self.dimensions.len() + self.attributes.len());
        for (name, labels) in self.dimensions {
            columns.push((name, TableColumn::Labels(labels)));
        }
        for (name, data) in self.attributes {
            let values: Vec<Option<f64>> = match data {
                ColumnData::Numeric(v) => v.into_iter().map(|x| (!x.is_nan()).then_some(x)).collect(),
                ColumnData::Integer(v) => v.into_iter().map(|x| Some(f64::from(x))).collect(),
                _ => {
                    return Err(CellstoreError::Schema(format!(
                        "attribute '{name}' is not numeric and cannot join a coordinate table"
                    )));
                }
            };
            columns.push((name, TableColumn::Values(values)));
        }
        CoordinateTable::from_columns(columns)
    }
}

fn concat(existing: ColumnData, new: &ColumnData) -> Result<ColumnData> {
    Ok(match (existing, new) {
        (ColumnData::Strings(mut a), ColumnData::Strings(b)) => {
            a.extend_from_slice(b);
            ColumnData::Strings(a)
        }
        (ColumnData::Numeric(mut a), ColumnData::Numeric(b)) => {
            a.extend_from_slice(b);
            ColumnData::Numeric(a)
        }
        (ColumnData::Integer(mut a), ColumnData::Integer(b)) => {
            a.extend_from_slice(b);
            ColumnData::Integer(a)
        }
        _ => {
            return Err(CellstoreError::Schema(
                "stored column type does not match the payload".into(),
            ));
        }
    })
}

fn into_labels(column: ColumnData, name: &str) -> Result<Vec<String>> {
    match column {
        ColumnData::Strings(v) => Ok(v),
        _ => Err(CellstoreError::Storage(format!(
            "dimension column '{name}' is not label-valued"
        ))),
    }
}

/// Handle on one stored array plus its active range restriction.
#[derive(Debug, Clone)]
pub struct QueryableArray {
    object: StorageObject,
    restriction: BTreeMap<String, BTreeSet<String>>,
}

impl QueryableArray {
    /// A handle on the array at `uri`. Nothing is created until the first write.
    pub fn new(uri: &str, ctx: &Context) -> Self {
        Self {
            object: StorageObject::new(uri, ctx),
            restriction: BTreeMap::new(),
        }
    }

    pub fn object(&self) -> &StorageObject {
        &self.object
    }

    pub fn uri(&self) -> &str {
        self.object.uri()
    }

    pub fn exists(&self) -> bool {
        self.object.exists()
    }

    /// Create the array with `schema` and no records.
    ///
    /// # Errors
    ///
    /// [`CellstoreError::Schema`] if an array already exists at this URI.
    pub fn create(&self, schema: &ArraySchema, object_type: &str) -> Result<()> {
        if self.exists() {
            return Err(CellstoreError::Schema(format!(
                "array '{}' already exists",
                self.uri()
            )));
        }
        let mut bookkeeping = Map::new();
        bookkeeping.insert(KIND_KEY.into(), Value::String("array".into()));
        bookkeeping.insert(
            SCHEMA_KEY.into(),
            serde_json::to_value(schema).map_err(|e| CellstoreError::Schema(e.to_string()))?,
        );
        let session = self.object.create_node(object_type, bookkeeping)?;
        for dim in schema.dimensions() {
            session.write_column(dim, &ColumnData::Strings(Vec::new()), schema.capacity())?;
        }
        for attr in schema.attributes() {
            let empty = match attr.dtype {
                AttributeType::Float64 => ColumnData::Numeric(Vec::new()),
                AttributeType::Int32 => ColumnData::Integer(Vec::new()),
                AttributeType::String => ColumnData::Strings(Vec::new()),
            };
            session.write_column(&attr.name, &empty, schema.capacity())?;
        }
        log::debug!("created array '{}' with dimensions {:?}", self.uri(), schema.dimensions());
        Ok(())
    }

    fn schema_in(session: &Session<'_>, uri: &str) -> Result<ArraySchema> {
        let value = session.bookkeeping(SCHEMA_KEY).ok_or_else(|| {
            CellstoreError::Storage(format!("'{uri}' is not an array"))
        })?;
        serde_json::from_value(value.clone()).map_err(|e| CellstoreError::Storage(e.to_string()))
    }

    /// The array's schema.
    pub fn schema(&self) -> Result<ArraySchema> {
        let session = self.object.session(Mode::Read)?;
        Self::schema_in(&session, self.uri())
    }

    /// Dimension names in order.
    pub fn dimnames(&self) -> Result<Vec<String>> {
        Ok(self.schema()?.dimensions().to_vec())
    }

    /// Attribute names in order.
    pub fn attrnames(&self) -> Result<Vec<String>> {
        Ok(self.schema()?.attribute_names())
    }

    /// Append `records`, creating the array from their layout on first write.
    ///
    /// # Errors
    ///
    /// [`CellstoreError::Schema`] if the payload does not match the schema of
    /// an existing array. Nothing is written in that case.
    pub fn write_records(&self, records: &Records, object_type: &str) -> Result<()> {
        if !self.exists() {
            self.create(&ArraySchema::for_records(records)?, object_type)?;
        }
        let session = self.object.session(Mode::Write)?;
        let schema = Self::schema_in(&session, self.uri())?;
        schema.check(records)?;

        log::info!("Writing {} records to '{}'", records.len(), self.uri());
        for (name, labels) in records.dimensions() {
            let merged = concat(session.read_column(name, None)?, &ColumnData::Strings(labels.clone()))?;
            session.write_column(name, &merged, schema.capacity())?;
        }
        for (name, data) in records.attributes() {
            let merged = concat(session.read_column(name, None)?, data)?;
            session.write_column(name, &merged, schema.capacity())?;
        }
        Ok(())
    }

    /// Check that `records` could be written, without touching storage.
    ///
    /// Against an existing array this is the append check; otherwise the
    /// payload must yield a valid schema.
    pub fn check_records(&self, records: &Records) -> Result<()> {
        if self.exists() {
            self.schema()?.check(records)
        } else {
            ArraySchema::for_records(records).map(drop)
        }
    }

    /// Read the records admitted by the active restriction.
    ///
    /// `attrs` selects attribute columns (all when `None`). Attribute
    /// retrieval is limited to the stored span covering the matched records.
    pub fn read_records(&self, attrs: Option<&[&str]>) -> Result<Records> {
        let session = self.object.session(Mode::Read)?;
        let schema = Self::schema_in(&session, self.uri())?;
        let attr_names: Vec<String> = match attrs {
            None => schema.attribute_names(),
            Some(names) => {
                let unknown: Vec<&str> = names
                    .iter()
                    .copied()
                    .filter(|n| schema.attribute(n).is_none())
                    .collect();
                if !unknown.is_empty() {
                    return Err(CellstoreError::Schema(format!(
                        "attribute(s) {unknown:?} not present in '{}'",
                        self.uri()
                    )));
                }
                names.iter().map(|n| n.to_string()).collect()
            }
        };

        let mut dims = Vec::with_capacity(schema.dimensions().len());
        for name in schema.dimensions() {
            dims.push((name.clone(), into_labels(session.read_column(name, None)?, name)?));
        }
        let total = dims.first().map_or(0, |(_, v)| v.len());

        let mut records = Records::default();
        if self.restriction.is_empty() {
            log::info!("Reading {total} records from '{}' into memory", self.uri());
            for (name, labels) in dims {
                records.add_dimension(&name, labels)?;
            }
            for name in &attr_names {
                records.add_attribute(name, session.read_column(name, None)?)?;
            }
            return Ok(records);
        }

        let matched: Vec<usize> = (0..total)
            .filter(|&i| {
                dims.iter().all(|(name, labels)| {
                    self.restriction
                        .get(name)
                        .map_or(true, |allowed| allowed.contains(&labels[i]))
                })
            })
            .collect();
        log::info!(
            "Reading {} of {total} records from '{}' into memory",
            matched.len(),
            self.uri()
        );

        let span = match (matched.first(), matched.last()) {
            (Some(&lo), Some(&hi)) => lo..hi + 1,
            _ => 0..0,
        };
        let local: Vec<usize> = matched.iter().map(|&i| i - span.start).collect();
        for (name, labels) in &dims {
            records.add_dimension(name, matched.iter().map(|&i| labels[i].clone()).collect())?;
        }
        for name in &attr_names {
            let column = session.read_column(name, Some(span.start as u64..span.end as u64))?;
            records.add_attribute(name, column.subset(&local))?;
        }
        Ok(records)
    }

    /// The active restriction, by dimension.
    pub fn query(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.restriction
    }
}

impl Sliceable for QueryableArray {
    /// Restrict reads to the given labels per dimension.
    ///
    /// Every key must be a declared dimension; otherwise nothing changes and
    /// [`CellstoreError::UnknownDimension`] lists the offending keys.
    fn set_query(&mut self, ranges: &DimRanges) -> Result<()> {
        let schema = self.schema()?;
        let unknown: Vec<String> = ranges
            .keys()
            .filter(|k| !schema.has_dimension(k))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(CellstoreError::UnknownDimension {
                uri: self.uri().to_string(),
                dimensions: unknown,
            });
        }
        for (dim, labels) in ranges {
            log::debug!("'{}': restricting {dim} to {} labels", self.uri(), labels.len());
            self.restriction
                .insert(dim.clone(), labels.iter().cloned().collect());
        }
        Ok(())
    }

    fn clear_query(&mut self) {
        self.restriction.clear();
    }
}

impl MetadataBearing for QueryableArray {
    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.object.get_metadata(key)
    }

    fn add_metadata(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.object.add_metadata(entries)
    }

    fn list_metadata(&self, prefix: Option<&str>) -> Result<BTreeMap<String, String>> {
        self.object.list_metadata(prefix)
    }
}

impl Readable for QueryableArray {
    type Output = Records;

    fn read(&self) -> Result<Records> {
        self.read_records(None)
    }
}

impl Writable for QueryableArray {
    type Input = Records;

    fn write(&self, data: &Records) -> Result<()> {
        self.write_records(data, "QueryableArray")
    }
}

/// Forward [`Sliceable`] and [`MetadataBearing`] to a wrapped handle field.
macro_rules! delegate_capabilities {
    ($ty:ty, $field:ident) => {
        impl cellstore_core::Sliceable for $ty {
            fn set_query(&mut self, ranges: &cellstore_core::DimRanges) -> cellstore_core::Result<()> {
                cellstore_core::Sliceable::set_query(&mut self.$field, ranges)
            }

            fn clear_query(&mut self) {
                cellstore_core::Sliceable::clear_query(&mut self.$field)
            }
        }

        impl cellstore_core::MetadataBearing for $ty {
            fn get_metadata(&self, key: &str) -> cellstore_core::Result<Option<String>> {
                cellstore_core::MetadataBearing::get_metadata(&self.$field, key)
            }

            fn add_metadata(&self, entries: &[(&str, &str)]) -> cellstore_core::Result<()> {
                cellstore_core::MetadataBearing::add_metadata(&self.$field, entries)
            }

            fn list_metadata(
                &self,
                prefix: Option<&str>,
            ) -> cellstore_core::Result<std::collections::BTreeMap<String, String>> {
                cellstore_core::MetadataBearing::list_metadata(&self.$field, prefix)
            }
        }
    };
}

pub(crate) use delegate_capabilities;
