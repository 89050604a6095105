//! Annotation arrays: per-axis tables, embeddings and pairwise graphs.
//!
//! Each adapter wraps one [`QueryableArray`] and converts between its
//! records and an in-memory value:
//!
//! - [`AnnotationDataframe`] ⇄ [`DataFrame`] (obs / var)
//! - [`AnnotationMatrix`] ⇄ [`DenseMatrix`] (obsm / varm)
//! - [`AnnotationPairwiseMatrix`] ⇄ [`SparseMatrix`] (obsp / varp)

use cellstore_core::{CellstoreError, Readable, Result, Writable};

use crate::array::{delegate_capabilities, QueryableArray, Records};
use crate::codec;
use crate::dense::DenseMatrix;
use crate::frame::{ColumnData, DataFrame};
use crate::sparse::SparseMatrix;
use crate::store::Context;

fn dimension_labels(records: &Records, dimension: &str, uri: &str) -> Result<Vec<String>> {
    records
        .dimension(dimension)
        .map(<[String]>::to_vec)
        .ok_or_else(|| {
            CellstoreError::Schema(format!("'{uri}' has no dimension '{dimension}'"))
        })
}

/// A table of per-id annotations, one attribute per column.
#[derive(Debug, Clone)]
pub struct AnnotationDataframe {
    array: QueryableArray,
    dimension: String,
}

impl AnnotationDataframe {
    pub const OBJECT_TYPE: &'static str = "AnnotationDataframe";

    pub fn new(uri: &str, ctx: &Context, dimension: &str) -> Self {
        Self::from_array(QueryableArray::new(uri, ctx), dimension)
    }

    /// Wrap an existing array handle, keeping its restriction.
    pub fn from_array(array: QueryableArray, dimension: &str) -> Self {
        Self {
            array,
            dimension: dimension.to_string(),
        }
    }

    pub fn array(&self) -> &QueryableArray {
        &self.array
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn exists(&self) -> bool {
        self.array.exists()
    }

    /// Normalize `df` into records, its index becoming the dimension column.
    pub fn records(&self, df: &DataFrame) -> Result<Records> {
        let df = df.normalize();
        let mut records = Records::default();
        records.add_dimension(&self.dimension, df.index().to_vec())?;
        for (name, column) in df.columns() {
            records.add_attribute(name, column.clone())?;
        }
        Ok(records)
    }

    /// Normalize `df` and write it.
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<()> {
        let records = self.records(df)?;
        log::debug!(
            "ingesting {} x {} annotation table into '{}'",
            records.len(),
            records.attributes().len(),
            self.array.uri()
        );
        self.array.write_records(&records, Self::OBJECT_TYPE)
    }

    /// Read the table back, optionally only the named columns.
    pub fn to_dataframe(&self, attrs: Option<&[&str]>) -> Result<DataFrame> {
        let (dimensions, attributes) = self.array.read_records(attrs)?.into_parts();
        let index = dimensions
            .into_iter()
            .find(|(n, _)| *n == self.dimension)
            .map(|(_, v)| v)
            .ok_or_else(|| {
                CellstoreError::Schema(format!(
                    "'{}' has no dimension '{}'",
                    self.array.uri(),
                    self.dimension
                ))
            })?;
        let mut df = DataFrame::new(index)?;
        for (name, column) in attributes {
            df.add_column(&name, column)?;
        }
        Ok(df)
    }

    /// Ids admitted by the active restriction, in stored order.
    pub fn ids(&self) -> Result<Vec<String>> {
        let records = self.array.read_records(Some(&[]))?;
        dimension_labels(&records, &self.dimension, self.array.uri())
    }
}

delegate_capabilities!(AnnotationDataframe, array);

impl Readable for AnnotationDataframe {
    type Output = DataFrame;

    fn read(&self) -> Result<DataFrame> {
        self.to_dataframe(None)
    }
}

impl Writable for AnnotationDataframe {
    type Input = DataFrame;

    fn write(&self, data: &DataFrame) -> Result<()> {
        self.from_dataframe(data)
    }
}

/// A dense per-id matrix (e.g. an embedding), one attribute per column.
#[derive(Debug, Clone)]
pub struct AnnotationMatrix {
    array: QueryableArray,
    dimension: String,
}

impl AnnotationMatrix {
    pub const OBJECT_TYPE: &'static str = "AnnotationMatrix";

    pub fn new(uri: &str, ctx: &Context, dimension: &str) -> Self {
        Self::from_array(QueryableArray::new(uri, ctx), dimension)
    }

    pub fn from_array(array: QueryableArray, dimension: &str) -> Self {
        Self {
            array,
            dimension: dimension.to_string(),
        }
    }

    pub fn array(&self) -> &QueryableArray {
        &self.array
    }

    /// One numeric attribute per matrix column.
    pub fn records(&self, matrix: &DenseMatrix) -> Result<Records> {
        let mut records = Records::default();
        records.add_dimension(&self.dimension, matrix.row_names().to_vec())?;
        for (j, name) in matrix.col_names().iter().enumerate() {
            let values = matrix.column(j).unwrap_or_default();
            records.add_attribute(name, ColumnData::Numeric(values))?;
        }
        Ok(records)
    }

    pub fn from_matrix(&self, matrix: &DenseMatrix) -> Result<()> {
        self.array.write_records(&self.records(matrix)?, Self::OBJECT_TYPE)
    }

    pub fn to_matrix(&self) -> Result<DenseMatrix> {
        let records = self.array.read_records(None)?;
        let rows = dimension_labels(&records, &self.dimension, self.array.uri())?;
        let (_, attributes) = records.into_parts();
        let columns = attributes
            .into_iter()
            .map(|(name, column)| match column {
                ColumnData::Numeric(v) => Ok((name, v)),
                ColumnData::Integer(v) => Ok((name, v.into_iter().map(f64::from).collect())),
                _ => Err(CellstoreError::Schema(format!(
                    "column '{name}' of '{}' is not numeric",
                    self.array.uri()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        DenseMatrix::from_columns(rows, columns)
    }
}

delegate_capabilities!(AnnotationMatrix, array);

impl Readable for AnnotationMatrix {
    type Output = DenseMatrix;

    fn read(&self) -> Result<DenseMatrix> {
        self.to_matrix()
    }
}

impl Writable for AnnotationMatrix {
    type Input = DenseMatrix;

    fn write(&self, data: &DenseMatrix) -> Result<()> {
        self.from_matrix(data)
    }
}

/// Attribute holding the edge weight of a pairwise matrix.
pub const PAIRWISE_VALUE: &str = "value";

/// A sparse id × id matrix over one axis (e.g. a neighbour graph).
///
/// Stored with dimensions `<dim>_i` and `<dim>_j`.
#[derive(Debug, Clone)]
pub struct AnnotationPairwiseMatrix {
    array: QueryableArray,
    dims: (String, String),
}

impl AnnotationPairwiseMatrix {
    pub const OBJECT_TYPE: &'static str = "AnnotationPairwiseMatrix";

    pub fn new(uri: &str, ctx: &Context, dimension: &str) -> Self {
        Self::from_array(QueryableArray::new(uri, ctx), dimension)
    }

    pub fn from_array(array: QueryableArray, dimension: &str) -> Self {
        Self {
            array,
            dims: (format!("{dimension}_i"), format!("{dimension}_j")),
        }
    }

    pub fn array(&self) -> &QueryableArray {
        &self.array
    }

    /// The `(<dim>_i, <dim>_j)` dimension names.
    pub fn dims(&self) -> (&str, &str) {
        (&self.dims.0, &self.dims.1)
    }

    /// One record per stored entry, weights under [`PAIRWISE_VALUE`].
    pub fn records(&self, matrix: &SparseMatrix) -> Result<Records> {
        let table = codec::to_table(&[matrix], self.dims(), Some(&[PAIRWISE_VALUE]))?;
        Records::from_table(table)
    }

    pub fn from_matrix(&self, matrix: &SparseMatrix) -> Result<()> {
        self.array.write_records(&self.records(matrix)?, Self::OBJECT_TYPE)
    }

    /// The stored matrix; labels are those present in the admitted records.
    pub fn to_matrix(&self) -> Result<SparseMatrix> {
        let table = self.array.read_records(Some(&[PAIRWISE_VALUE]))?.into_table()?;
        codec::from_table(&table, self.dims())?
            .into_iter()
            .next()
            .ok_or_else(|| {
                CellstoreError::Schema(format!(
                    "'{}' has no '{PAIRWISE_VALUE}' attribute",
                    self.array.uri()
                ))
            })
    }
}

delegate_capabilities!(AnnotationPairwiseMatrix, array);

impl Readable for AnnotationPairwiseMatrix {
    type Output = SparseMatrix;

    fn read(&self) -> Result<SparseMatrix> {
        self.to_matrix()
    }
}

impl Writable for AnnotationPairwiseMatrix {
    type Input = SparseMatrix;

    fn write(&self, data: &SparseMatrix) -> Result<()> {
        self.from_matrix(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellstore_core::{DimRanges, MetadataBearing, Sliceable};
    use tempfile::TempDir;

    fn ctx() -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let ctx = Context::open(dir.path()).unwrap();
        (dir, ctx)
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn obs() -> DataFrame {
        let mut df = DataFrame::new(s(&["c1", "c2", "c3"])).unwrap();
        df.add_column("n_genes", ColumnData::Integer(vec![100, 200, 300]))
            .unwrap();
        df.add_column("is_doublet", ColumnData::Logical(vec![false, true, false]))
            .unwrap();
        df.add_column(
            "cell_type",
            ColumnData::Categorical {
                codes: vec![0, 1, 5],
                categories: s(&["T", "B"]),
            },
        )
        .unwrap();
        df
    }

    #[test]
    fn dataframe_normalized_on_ingest() {
        let (_dir, ctx) = ctx();
        let a = AnnotationDataframe::new("/obs", &ctx, "obs_id");
        a.write(&obs()).unwrap();

        let back = a.read().unwrap();
        assert_eq!(back.index(), &s(&["c1", "c2", "c3"]));
        assert_eq!(back.column("is_doublet"), Some(&ColumnData::Integer(vec![0, 1, 0])));
        assert_eq!(
            back.column("cell_type"),
            Some(&ColumnData::Strings(s(&["T", "B", ""])))
        );
        assert_eq!(
            a.array().object().object_type().unwrap().as_deref(),
            Some("AnnotationDataframe")
        );
    }

    #[test]
    fn dataframe_slice_and_select() {
        let (_dir, ctx) = ctx();
        let mut a = AnnotationDataframe::new("/obs", &ctx, "obs_id");
        a.write(&obs()).unwrap();
        a.set_query(&DimRanges::from([("obs_id".to_string(), s(&["c3", "c1"]))]))
            .unwrap();

        assert_eq!(a.ids().unwrap(), s(&["c1", "c3"]));
        let df = a.to_dataframe(Some(&["n_genes"])).unwrap();
        assert_eq!(df.column_names(), vec!["n_genes"]);
        assert_eq!(df.column("n_genes"), Some(&ColumnData::Integer(vec![100, 300])));

        a.add_metadata(&[("note", "qc")]).unwrap();
        assert_eq!(a.get_metadata("note").unwrap().as_deref(), Some("qc"));
    }

    #[test]
    fn embedding_round_trip() {
        let (_dir, ctx) = ctx();
        let m = AnnotationMatrix::new("/obsm/X_pca", &ctx, "obs_id");
        let pca = DenseMatrix::new(
            vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            s(&["c1", "c2"]),
            s(&["PC_1", "PC_2"]),
        )
        .unwrap();
        m.write(&pca).unwrap();
        assert_eq!(m.read().unwrap(), pca);
    }

    #[test]
    fn embedding_over_wrong_dimension() {
        let (_dir, ctx) = ctx();
        let pca = DenseMatrix::new(vec![vec![0.1], vec![0.3]], s(&["c1", "c2"]), s(&["PC_1"]))
            .unwrap();
        AnnotationMatrix::new("/obsm/X_pca", &ctx, "obs_id")
            .write(&pca)
            .unwrap();

        let wrong = AnnotationMatrix::new("/obsm/X_pca", &ctx, "var_id");
        assert!(matches!(wrong.to_matrix(), Err(CellstoreError::Schema(_))));
    }

    #[test]
    fn pairwise_round_trip_and_slice() {
        let (_dir, ctx) = ctx();
        let mut p = AnnotationPairwiseMatrix::new("/obsp/distances", &ctx, "obs_id");
        assert_eq!(p.dims(), ("obs_id_i", "obs_id_j"));
        let graph = SparseMatrix::from_labeled_entries(
            [("c1", "c2", 0.5), ("c2", "c1", 0.5), ("c2", "c3", 1.5)],
            s(&["c1", "c2", "c3"]),
            s(&["c1", "c2", "c3"]),
        )
        .unwrap();
        p.write(&graph).unwrap();

        let back = p.read().unwrap();
        assert_eq!(back.nnz(), 3);
        assert_eq!(back.get_labeled("c2", "c3"), Some(1.5));

        p.set_query(&DimRanges::from([("obs_id_i".to_string(), s(&["c2"]))]))
            .unwrap();
        let sliced = p.read().unwrap();
        assert_eq!(sliced.nnz(), 2);
        assert_eq!(sliced.row_names().unwrap(), &s(&["c2"]));
    }

    #[test]
    fn pairwise_rejects_unlabeled() {
        let (_dir, ctx) = ctx();
        let p = AnnotationPairwiseMatrix::new("/obsp/g", &ctx, "obs_id");
        let bare = SparseMatrix::new(2, 2);
        assert!(matches!(p.write(&bare), Err(CellstoreError::Shape(_))));
        assert!(!p.array().exists());
    }
}
