//! Multi-layer assay matrices.
//!
//! An [`AssayMatrix`] stores any number of labeled sparse layers over the
//! same `(row, column)` coordinate space as one array: the two index
//! dimensions plus one `Float64` attribute per layer. Layers are merged into
//! a coordinate table on ingest and split back on export. A layer that has
//! no value at a coordinate populated by another layer is stored as NaN and
//! is absent from that layer on export. For the same reason a layer value
//! that is itself NaN does not survive the round trip: it reads back as an
//! unpopulated cell.

use cellstore_core::{Readable, Result, Writable};

use crate::array::{delegate_capabilities, QueryableArray, Records};
use crate::codec::{self, CoordinateTable};
use crate::sparse::SparseMatrix;
use crate::store::Context;

#[derive(Debug, Clone)]
pub struct AssayMatrix {
    array: QueryableArray,
    dims: (String, String),
}

impl AssayMatrix {
    pub const OBJECT_TYPE: &'static str = "AssayMatrix";

    pub fn new(uri: &str, ctx: &Context, dims: (&str, &str)) -> Self {
        Self::from_array(QueryableArray::new(uri, ctx), dims)
    }

    pub fn from_array(array: QueryableArray, dims: (&str, &str)) -> Self {
        Self {
            array,
            dims: (dims.0.to_string(), dims.1.to_string()),
        }
    }

    pub fn array(&self) -> &QueryableArray {
        &self.array
    }

    pub fn dims(&self) -> (&str, &str) {
        (&self.dims.0, &self.dims.1)
    }

    /// Merge `layers` into one record per populated coordinate.
    ///
    /// The first layer fixes the coordinate order; see [`codec::to_table`].
    pub fn records(&self, layers: &[(&str, &SparseMatrix)]) -> Result<Records> {
        let names: Vec<&str> = layers.iter().map(|(n, _)| *n).collect();
        let matrices: Vec<&SparseMatrix> = layers.iter().map(|(_, m)| *m).collect();
        let table = codec::to_table(&matrices, self.dims(), Some(names.as_slice()))?;
        Records::from_table(table)
    }

    /// Merge `layers` and append them as records.
    pub fn from_layers(&self, layers: &[(&str, &SparseMatrix)]) -> Result<()> {
        let records = self.records(layers)?;
        log::info!(
            "Ingesting {} layers ({} coordinates) into '{}'",
            layers.len(),
            records.len(),
            self.array.uri()
        );
        self.array.write_records(&records, Self::OBJECT_TYPE)
    }

    /// Layer names in stored order.
    pub fn layer_names(&self) -> Result<Vec<String>> {
        self.array.attrnames()
    }

    /// The admitted records as a coordinate table, optionally only some layers.
    pub fn to_table(&self, layers: Option<&[&str]>) -> Result<CoordinateTable> {
        self.array.read_records(layers)?.into_table()
    }

    /// Split the admitted records back into named layers.
    pub fn to_layers(&self, layers: Option<&[&str]>) -> Result<Vec<(String, SparseMatrix)>> {
        let table = self.to_table(layers)?;
        codec::from_table_named(&table, self.dims())
    }
}

delegate_capabilities!(AssayMatrix, array);

impl Readable for AssayMatrix {
    type Output = Vec<(String, SparseMatrix)>;

    fn read(&self) -> Result<Self::Output> {
        self.to_layers(None)
    }
}

impl Writable for AssayMatrix {
    type Input = [(String, SparseMatrix)];

    fn write(&self, data: &[(String, SparseMatrix)]) -> Result<()> {
        let layers: Vec<(&str, &SparseMatrix)> =
            data.iter().map(|(n, m)| (n.as_str(), m)).collect();
        self.from_layers(&layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellstore_core::{CellstoreError, DimRanges, Sliceable};
    use tempfile::TempDir;

    const DIMS: (&str, &str) = ("obs_id", "var_id");

    fn ctx() -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let ctx = Context::open(dir.path()).unwrap();
        (dir, ctx)
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn m(entries: &[(&str, &str, f64)]) -> SparseMatrix {
        SparseMatrix::from_labeled_entries(
            entries.iter().copied(),
            s(&["c1", "c2", "c3"]),
            s(&["g1", "g2"]),
        )
        .unwrap()
    }

    #[test]
    fn layers_round_trip() {
        let (_dir, ctx) = ctx();
        let a = AssayMatrix::new("/X/data", &ctx, DIMS);
        let counts = m(&[("c1", "g1", 1.0), ("c2", "g2", 2.0), ("c3", "g1", 3.0)]);
        let scaled = m(&[("c1", "g1", 0.1), ("c2", "g2", 0.2), ("c3", "g1", 0.3)]);
        a.from_layers(&[("counts", &counts), ("scaled", &scaled)])
            .unwrap();

        assert_eq!(a.layer_names().unwrap(), s(&["counts", "scaled"]));
        let layers = a.read().unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].0, "counts");
        assert_eq!(layers[1].1.get_labeled("c3", "g1"), Some(0.3));
        assert_eq!(layers[1].1.nnz(), 3);
    }

    #[test]
    fn disjoint_layers_keep_missing_cells_absent() {
        let (_dir, ctx) = ctx();
        let a = AssayMatrix::new("/X/data", &ctx, DIMS);
        let left = m(&[("c1", "g1", 1.0)]);
        let right = m(&[("c2", "g2", 9.0), ("c3", "g1", 4.0)]);
        a.from_layers(&[("left", &left), ("right", &right)]).unwrap();

        let table = a.to_table(None).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.values("left").unwrap(), &[Some(1.0), None, None]);
        assert_eq!(table.values("right").unwrap(), &[None, Some(9.0), Some(4.0)]);

        let layers = a.to_layers(None).unwrap();
        assert_eq!(layers[0].1.nnz(), 1);
        assert_eq!(layers[1].1.nnz(), 2);
        assert_eq!(layers[1].1.get_labeled("c1", "g1"), None);
    }

    #[test]
    fn nan_values_read_back_absent() {
        let (_dir, ctx) = ctx();
        let a = AssayMatrix::new("/X/data", &ctx, DIMS);
        let layer = m(&[("c1", "g1", f64::NAN), ("c2", "g2", 2.0)]);
        a.from_layers(&[("counts", &layer)]).unwrap();

        let (_, back) = a.to_layers(None).unwrap().remove(0);
        assert_eq!(back.nnz(), 1);
        assert_eq!(back.get_labeled("c1", "g1"), None);
        assert_eq!(back.get_labeled("c2", "g2"), Some(2.0));
    }

    #[test]
    fn sliced_layers() {
        let (_dir, ctx) = ctx();
        let mut a = AssayMatrix::new("/X/data", &ctx, DIMS);
        let counts = m(&[("c1", "g1", 1.0), ("c2", "g2", 2.0), ("c3", "g1", 3.0)]);
        a.from_layers(&[("counts", &counts)]).unwrap();
        a.set_query(&DimRanges::from([("var_id".to_string(), s(&["g1"]))]))
            .unwrap();
        let (_, layer) = a.to_layers(None).unwrap().remove(0);
        assert_eq!(layer.nnz(), 2);
        assert_eq!(layer.col_names().unwrap(), &s(&["g1"]));
    }

    #[test]
    fn later_write_must_match_layers() {
        let (_dir, ctx) = ctx();
        let a = AssayMatrix::new("/X/data", &ctx, DIMS);
        let counts = m(&[("c1", "g1", 1.0)]);
        a.from_layers(&[("counts", &counts)]).unwrap();
        assert!(matches!(
            a.from_layers(&[("other", &counts)]),
            Err(CellstoreError::Schema(_))
        ));
    }
}
