//! Coordinate table codec benchmarks.
//!
//! Measures `to_table` on layer-compatible inputs (positional copy) against
//! inputs that force the outer join, and `from_table` reassembly, at several
//! matrix sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cellstore::{from_table, to_table, SparseMatrix};

// =========================================================================
// Matrix generation — deterministic LCG, ~5% density
// =========================================================================

fn labels(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn random_layer(n_cells: usize, n_genes: usize, density: f64, seed: u64) -> SparseMatrix {
    let mut m = SparseMatrix::with_labels(labels("cell_", n_cells), labels("gene_", n_genes));
    let mut state = seed;
    for r in 0..n_cells {
        for c in 0..n_genes {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let u = (state >> 33) as f64 / (u32::MAX as f64);
            if u < density {
                m.insert(r, c, (u * 1000.0).floor() + 1.0).unwrap();
            }
        }
    }
    m
}

/// Same populated cells as `base`, values scaled.
fn scaled(base: &SparseMatrix, factor: f64) -> SparseMatrix {
    let (n_rows, n_cols) = base.shape();
    let mut m = SparseMatrix::with_labels(
        base.row_names().unwrap().to_vec(),
        base.col_names().unwrap().to_vec(),
    );
    for (r, c, v) in base.iter() {
        m.insert(r, c, v * factor).unwrap();
    }
    debug_assert_eq!(m.shape(), (n_rows, n_cols));
    m
}

const IDX: (&str, &str) = ("obs_id", "var_id");

// =========================================================================
// to_table
// =========================================================================

fn bench_to_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_table");

    for &n_cells in &[100, 1_000, 5_000] {
        let counts = random_layer(n_cells, 500, 0.05, 42);
        let normalized = scaled(&counts, 0.5);
        let other = random_layer(n_cells, 500, 0.05, 137);
        group.throughput(Throughput::Elements(counts.nnz() as u64));

        group.bench_with_input(BenchmarkId::new("compatible", n_cells), &n_cells, |b, _| {
            b.iter(|| to_table(black_box(&[&counts, &normalized]), IDX, None).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("outer_join", n_cells), &n_cells, |b, _| {
            b.iter(|| to_table(black_box(&[&counts, &other]), IDX, None).unwrap())
        });
    }

    group.finish();
}

// =========================================================================
// from_table
// =========================================================================

fn bench_from_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_table");

    for &n_cells in &[100, 1_000, 5_000] {
        let counts = random_layer(n_cells, 500, 0.05, 7);
        let normalized = scaled(&counts, 0.5);
        let table = to_table(&[&counts, &normalized], IDX, None).unwrap();
        group.throughput(Throughput::Elements(table.len() as u64));

        group.bench_with_input(BenchmarkId::new("two_layers", n_cells), &n_cells, |b, _| {
            b.iter(|| from_table(black_box(&table), IDX).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_to_table, bench_from_table);
criterion_main!(benches);
