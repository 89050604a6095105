//! Array schemas and role-based capacity hints.

use serde::{Deserialize, Serialize};

use cellstore_core::{CellstoreError, Result};

use crate::array::Records;
use crate::frame::ColumnData;

/// Records per storage chunk for arrays indexed by observation ids.
pub const OBSERVATION_CAPACITY: u64 = 10_000;
/// Records per storage chunk for arrays indexed by feature ids.
pub const FEATURE_CAPACITY: u64 = 2_000;
/// Records per storage chunk for everything else.
pub const GENERIC_CAPACITY: u64 = 1_000;

/// What an array is indexed by, which decides its capacity hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Observation,
    Feature,
    Generic,
}

impl Role {
    /// Infer the role from an array's leading dimension name.
    pub fn for_dimension(name: &str) -> Role {
        if name.starts_with("obs_id") {
            Role::Observation
        } else if name.starts_with("var_id") {
            Role::Feature
        } else {
            Role::Generic
        }
    }

    /// Storage chunk length, in records.
    pub fn capacity(self) -> u64 {
        match self {
            Role::Observation => OBSERVATION_CAPACITY,
            Role::Feature => FEATURE_CAPACITY,
            Role::Generic => GENERIC_CAPACITY,
        }
    }
}

/// Storable attribute element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Float64,
    Int32,
    String,
}

impl AttributeType {
    /// Element type of a column, which must already be normalized.
    pub fn of(column: &ColumnData) -> Result<Self> {
        match column {
            ColumnData::Numeric(_) => Ok(AttributeType::Float64),
            ColumnData::Integer(_) => Ok(AttributeType::Int32),
            ColumnData::Strings(_) => Ok(AttributeType::String),
            ColumnData::Logical(_) | ColumnData::Categorical { .. } => Err(CellstoreError::Schema(
                "logical and categorical columns must be normalized before ingest".into(),
            )),
        }
    }
}

/// One named, typed attribute (value column) of an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub dtype: AttributeType,
}

/// Dimension and attribute layout of a queryable array.
///
/// Dimensions are label-valued and define the array's coordinate space.
/// The schema is fixed when the array is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySchema {
    dimensions: Vec<String>,
    attributes: Vec<AttributeSpec>,
    capacity: u64,
}

impl ArraySchema {
    /// Build a schema. Dimension and attribute names must be distinct and at
    /// least one dimension is required.
    pub fn new(dimensions: Vec<String>, attributes: Vec<AttributeSpec>, capacity: u64) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(CellstoreError::Schema("an array needs at least one dimension".into()));
        }
        let mut names: Vec<&str> = dimensions.iter().map(String::as_str).collect();
        names.extend(attributes.iter().map(|a| a.name.as_str()));
        for (i, n) in names.iter().enumerate() {
            if names[..i].contains(n) {
                return Err(CellstoreError::Schema(format!("duplicate field name '{n}'")));
            }
        }
        Ok(Self {
            dimensions,
            attributes,
            capacity: capacity.max(1),
        })
    }

    /// Derive a schema from the first payload written to an array.
    ///
    /// The capacity follows the role of the leading dimension.
    pub fn for_records(records: &Records) -> Result<Self> {
        let dimensions: Vec<String> = records.dimensions().iter().map(|(n, _)| n.clone()).collect();
        let capacity = dimensions
            .first()
            .map_or(GENERIC_CAPACITY, |d| Role::for_dimension(d).capacity());
        let attributes = records
            .attributes()
            .iter()
            .map(|(name, col)| {
                Ok(AttributeSpec {
                    name: name.clone(),
                    dtype: AttributeType::of(col)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(dimensions, attributes, capacity)
    }

    /// Dimension names in order.
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// Attribute specs in order.
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    /// Attribute names in order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    /// Look up one attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether `name` is a declared dimension.
    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d == name)
    }

    /// Storage chunk length, in records.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Check that `records` carries exactly this schema's fields and types.
    pub fn check(&self, records: &Records) -> Result<()> {
        let dims: Vec<&str> = records.dimensions().iter().map(|(n, _)| n.as_str()).collect();
        if dims != self.dimensions.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(CellstoreError::Schema(format!(
                "dimensions {dims:?} do not match array dimensions {:?}",
                self.dimensions
            )));
        }
        if records.attributes().len() != self.attributes.len() {
            return Err(CellstoreError::Schema(format!(
                "payload has {} attributes, array declares {}",
                records.attributes().len(),
                self.attributes.len()
            )));
        }
        for (name, col) in records.attributes() {
            let Some(spec) = self.attribute(name) else {
                return Err(CellstoreError::Schema(format!(
                    "attribute '{name}' is not declared by the array"
                )));
            };
            let dtype = AttributeType::of(col)?;
            if dtype != spec.dtype {
                return Err(CellstoreError::Schema(format!(
                    "attribute '{name}' is {dtype:?}, array declares {:?}",
                    spec.dtype
                )));
            }
        }
        Ok(())
    }
}
