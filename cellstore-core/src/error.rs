//! Structured error types for cellstore.

use thiserror::Error;

/// Unified error type for all cellstore operations.
#[derive(Debug, Error)]
pub enum CellstoreError {
    /// I/O error while preparing a storage context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed caller input (empty required argument, unlabeled matrix, etc.)
    #[error("invalid argument: {0}")]
    Argument(String),

    /// An input does not have the shape an operation requires.
    #[error("shape error: {0}")]
    Shape(String),

    /// A list of names does not line up with the list it describes.
    #[error("arity error: expected {expected} names, got {found}")]
    Arity { expected: usize, found: usize },

    /// Data cannot be reconciled with a declared or derived schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// A slice request names dimensions the array does not declare.
    #[error("unknown dimension(s) {dimensions:?} for array '{uri}'")]
    UnknownDimension { uri: String, dimensions: Vec<String> },

    /// Failure reported by the array storage engine.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Convenience alias used throughout cellstore.
pub type Result<T> = std::result::Result<T, CellstoreError>;
