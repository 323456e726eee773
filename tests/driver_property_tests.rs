//! Property-based and concrete end-to-end tests for the whole-matrix drivers.
//!
//! Grounded on `tests/simd_property_tests.rs.ref`'s shape: a bounded-dimension
//! strategy hitting small, lane-boundary, and mid-range sizes, run through
//! `proptest!` with an explicit `Config` (this crate's kernels are exact
//! floating-point arithmetic on random small matrices, so no Higham-style
//! error bound is needed — a fixed absolute tolerance suffices).

use blastile::driver::gemm;
use blastile::pointer::StorageOrder;
use blastile::simd::{Simd, SimdElement};
use blastile::storage::DynamicPanelMatrix;
use proptest::prelude::{prop_assert, Strategy};
use proptest::{proptest, test_runner::Config as ProptestConfig};

const DRIVER_PROP_CASES: u32 = 128;

fn dense_to_panel(rows: usize, columns: usize, data: &[f64]) -> DynamicPanelMatrix<f64> {
    let mut m = DynamicPanelMatrix::<f64>::zero(rows, columns);
    m.pack_from(data, rows, StorageOrder::ColumnMajor).unwrap();
    m
}

fn panel_to_dense(m: &DynamicPanelMatrix<f64>) -> Vec<f64> {
    let mut out = vec![0.0; m.rows() * m.columns()];
    m.unpack_to(&mut out, m.rows(), StorageOrder::ColumnMajor).unwrap();
    out
}

fn naive_gemm(m: usize, k: usize, n: usize, alpha: f64, a: &[f64], b: &[f64], beta: f64, c: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    for j in 0..n {
        for i in 0..m {
            let mut acc = 0.0;
            for p in 0..k {
                acc += a[i + p * m] * b[p + j * k];
            }
            out[i + j * m] = alpha * acc + beta * c[i + j * m];
        }
    }
    out
}

fn bounded_small_dimension() -> impl Strategy<Value = usize> {
    1_usize..=50
}

fn driver_prop_config() -> ProptestConfig {
    ProptestConfig {
        cases: DRIVER_PROP_CASES,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(driver_prop_config())]

    /// Property 8 (driver tiling invariant): for any `M, N, K` in `1..=50`,
    /// the whole-matrix GEMM driver matches a naive triple-loop reference.
    #[test]
    fn gemm_matches_naive_reference_across_bounded_shapes(
        m in bounded_small_dimension(),
        k in bounded_small_dimension(),
        n in bounded_small_dimension(),
    ) {
        let a: Vec<f64> = (0..m * k).map(|x| ((x % 11) as f64) * 0.37 - 2.0).collect();
        let b: Vec<f64> = (0..k * n).map(|x| ((x % 13) as f64) * 0.21 + 0.05).collect();
        let c: Vec<f64> = (0..m * n).map(|x| ((x % 9) as f64) * 0.11).collect();

        let pa = dense_to_panel(m, k, &a);
        let pb = dense_to_panel(k, n, &b);
        let pc = dense_to_panel(m, n, &c);
        let mut pd = DynamicPanelMatrix::<f64>::zero(m, n);

        gemm(1.3, &pa, &pb, 0.7, &pc, &mut pd).unwrap();

        let expected = naive_gemm(m, k, n, 1.3, &a, &b, 0.7, &c);
        let got = panel_to_dense(&pd);
        for (e, g) in expected.iter().zip(got.iter()) {
            prop_assert!((e - g).abs() < 1e-8, "expected {e}, got {g}");
        }
    }
}

/// `M mod 4T == 0` guard case from property 8: pick `M = 4T` exactly (`T`
/// being the row-register width for `f64` on this target) so the row-ladder
/// exhausts evenly and the `i + 4T != M` remainder branch never fires.
#[test]
fn gemm_tiling_exhausts_exactly_at_four_row_register_widths() {
    let lanes = <f64 as SimdElement>::Vector::LANES;
    let row_register_width = 3 * lanes;
    let m = 4 * row_register_width;
    let (k, n) = (17, 15);

    let a: Vec<f64> = (0..m * k).map(|x| ((x % 17) as f64) * 0.19 - 1.5).collect();
    let b: Vec<f64> = (0..k * n).map(|x| ((x % 19) as f64) * 0.23 + 0.1).collect();
    let c: Vec<f64> = (0..m * n).map(|x| ((x % 7) as f64) * 0.05).collect();

    let pa = dense_to_panel(m, k, &a);
    let pb = dense_to_panel(k, n, &b);
    let pc = dense_to_panel(m, n, &c);
    let mut pd = DynamicPanelMatrix::<f64>::zero(m, n);

    gemm(1.0, &pa, &pb, 1.0, &pc, &mut pd).unwrap();

    let expected = naive_gemm(m, k, n, 1.0, &a, &b, 1.0, &c);
    let got = panel_to_dense(&pd);
    for (e, g) in expected.iter().zip(got.iter()) {
        assert!((e - g).abs() < 1e-8, "expected {e}, got {g}");
    }
}

// ---------------------------------------------------------------------------
// Concrete end-to-end scenarios (spec.md §8), adapted from `gemm_nt` (A·Bᵀ)
// to this crate's `gemm` (A·B taking B already in `K x N` layout) — the two
// are the same computation once `B` is transposed on the way in.
// ---------------------------------------------------------------------------

fn scenario(m: usize, n: usize, k: usize) {
    let a: Vec<f64> = (0..m * k).map(|x| ((x % 5) as f64) - 2.0).collect();
    let b: Vec<f64> = (0..k * n).map(|x| ((x % 3) as f64) * 0.5 + 0.25).collect();
    let c: Vec<f64> = (0..m * n).map(|x| (x as f64) * 0.1).collect();

    let pa = dense_to_panel(m, k, &a);
    let pb = dense_to_panel(k, n, &b);
    let pc = dense_to_panel(m, n, &c);
    let mut pd = DynamicPanelMatrix::<f64>::zero(m, n);

    gemm(1.0, &pa, &pb, 1.0, &pc, &mut pd).unwrap();

    let expected = naive_gemm(m, k, n, 1.0, &a, &b, 1.0, &c);
    let got = panel_to_dense(&pd);
    for (e, g) in expected.iter().zip(got.iter()) {
        assert!((e - g).abs() <= 1e-10, "M={m} N={n} K={k}: expected {e}, got {g}");
    }
}

#[test]
fn scenario_m8_n8_k24() {
    scenario(8, 8, 24);
}

#[test]
fn scenario_m19_n15_k17_exercises_every_kernel_width() {
    scenario(19, 15, 17);
}

#[test]
fn scenario_m12_n1_k2_single_column_partial() {
    scenario(12, 1, 2);
}

#[test]
fn scenario_m3_n2_k11_fully_partial_first_iteration() {
    scenario(3, 2, 11);
}

#[test]
fn scenario_m19_n19_k19_square_every_width_and_remainder() {
    scenario(19, 19, 19);
}
