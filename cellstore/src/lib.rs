//! Sliceable storage for annotated single-cell matrices.
//!
//! This crate persists single-cell data into Zarr arrays and reads back
//! dimension-sliced subsets:
//!
//! - **In-memory model** — [`SparseMatrix`] (labeled COO), [`DenseMatrix`],
//!   [`DataFrame`] and the [`AnnData`] container
//! - **Codec** — [`to_table`] / [`from_table`] between labeled sparse
//!   matrices and coordinate tables, with [`are_layer_compatible`] and [`pad`]
//! - **Storage objects** — [`QueryableArray`] with per-dimension range
//!   restriction, [`Group`] containers, and the typed annotation and assay
//!   arrays built on them
//! - **Datasets** — [`Dataset`] and [`DatasetCollection`], sliced by
//!   observation and feature ids
//!
//! # Quick start
//!
//! ```
//! use cellstore::{to_table, from_table, SparseMatrix};
//!
//! let counts = SparseMatrix::from_labeled_entries(
//!     [("cell_1", "gene_a", 3.0), ("cell_2", "gene_b", 1.0)],
//!     vec!["cell_1".into(), "cell_2".into()],
//!     vec!["gene_a".into(), "gene_b".into()],
//! )
//! .unwrap();
//!
//! let table = to_table(&[&counts], ("obs_id", "var_id"), None).unwrap();
//! assert_eq!(table.column_names(), vec!["obs_id", "var_id", "value1"]);
//!
//! let back = from_table(&table, ("obs_id", "var_id")).unwrap();
//! assert_eq!(back[0].get_labeled("cell_2", "gene_b"), Some(1.0));
//! ```

pub mod align;
pub mod anndata;
pub mod annotation;
pub mod array;
pub mod assay;
pub mod codec;
pub mod collection;
pub mod dataset;
pub mod dense;
pub mod frame;
pub mod group;
pub mod matrix_group;
pub mod object;
pub mod schema;
pub mod sparse;
pub mod store;

pub use align::{are_layer_compatible, pad};
pub use anndata::{AnnData, Axis};
pub use annotation::{AnnotationDataframe, AnnotationMatrix, AnnotationPairwiseMatrix};
pub use array::{QueryableArray, Records};
pub use assay::AssayMatrix;
pub use codec::{from_table, from_table_named, to_table, CoordinateTable, TableColumn};
pub use collection::DatasetCollection;
pub use dataset::Dataset;
pub use dense::DenseMatrix;
pub use frame::{ColumnData, DataFrame};
pub use group::{Group, Member, MemberKind};
pub use matrix_group::{AnnotationMatrixGroup, AnnotationPairwiseMatrixGroup, AssayMatrixGroup};
pub use object::StorageObject;
pub use schema::{ArraySchema, AttributeSpec, AttributeType, Role};
pub use sparse::SparseMatrix;
pub use store::{Context, Mode};

pub use cellstore_core::{
    CellstoreError, DimRanges, MetadataBearing, Readable, Result, Sliceable, Summarizable, Writable,
};
