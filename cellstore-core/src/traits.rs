//! Capability traits implemented by cellstore's storage objects.
//!
//! Arrays, groups and datasets compose these instead of sharing a base
//! class: a group is [`Sliceable`] and [`MetadataBearing`] but not
//! [`Readable`], an annotation array is all four.

use std::collections::BTreeMap;

/// A slice request: dimension name → permitted coordinate labels.
pub type DimRanges = BTreeMap<String, Vec<String>>;

/// An object whose subsequent reads can be narrowed per dimension.
pub trait Sliceable {
    /// Restrict subsequent reads to the given labels on each named dimension.
    ///
    /// Dimensions not named keep their previous restriction.
    fn set_query(&mut self, ranges: &DimRanges) -> crate::Result<()>;

    /// Drop every active restriction.
    fn clear_query(&mut self);
}

/// An object carrying a string key-value metadata store.
pub trait MetadataBearing {
    /// Look up one metadata value.
    fn get_metadata(&self, key: &str) -> crate::Result<Option<String>>;

    /// Insert or overwrite metadata entries.
    fn add_metadata(&self, entries: &[(&str, &str)]) -> crate::Result<()>;

    /// All metadata entries, optionally only those whose key starts with `prefix`.
    fn list_metadata(&self, prefix: Option<&str>) -> crate::Result<BTreeMap<String, String>>;
}

/// An object that can be exported into an in-memory value.
pub trait Readable {
    /// The in-memory shape produced by a read.
    type Output;

    /// Read the object, honouring any active slice.
    fn read(&self) -> crate::Result<Self::Output>;
}

/// An object that can ingest an in-memory value.
pub trait Writable {
    /// The in-memory shape accepted by a write.
    type Input: ?Sized;

    /// Persist `data`, creating the underlying storage on first write.
    fn write(&self, data: &Self::Input) -> crate::Result<()>;
}

/// A type that can produce a summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
