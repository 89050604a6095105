//! Shared primitives for the cellstore workspace.
//!
//! - **Error types** — [`CellstoreError`] and [`Result`] for structured error handling
//! - **Traits** — capability traits ([`Sliceable`], [`MetadataBearing`],
//!   [`Readable`], [`Writable`]) composed by arrays, groups and datasets

pub mod error;
pub mod traits;

pub use error::{CellstoreError, Result};
pub use traits::*;
