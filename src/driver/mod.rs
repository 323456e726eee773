//! Whole-matrix entry points: GEMM, GER, TRSM, TRMM, POTRF, SYRK.
//!
//! Every driver here validates operand shapes up front and returns
//! [`Error::ShapeMismatch`] before touching any output memory (spec.md §7's
//! all-or-nothing rule), then drives the same three-tier row-ladder the
//! original source's `gemm_nt_backend` uses (`examples/original_source/
//! include/blast/math/panel/Gemm.hpp`): the widest `RegisterTile` row count
//! that divides the remaining rows without leaving a pathological 1-row-wide
//! final block runs first, then progressively narrower tiles mop up the
//! remainder. Column chunks are fixed at `KN` columns — `3`, not `4` as in
//! the register-tile source, because a 3-row-register tile (`RM = 3`) at
//! `N = 4` columns needs `3*4 + 3 + 2 = 17` vector registers, one over the
//! 16-register budget non-`aarch64` targets get (see
//! `RegisterTile::REGISTER_CHECK`); `KN = 3` fits the budget on every target
//! this crate compiles for.
//!
//! A few operations (SYRK's `A^T` operand, POTRF's trailing-update operand)
//! need a transposed view of a sub-block of panel-packed storage.
//! `PanelMatrixPointer::trans()` only reinterprets memory correctly when
//! formed at a lane-aligned row position (its `at()` offset math assumes the
//! base is panel-aligned); `KN`-wide column chunks don't give that alignment
//! in general. Rather than thread a second alignment constraint through the
//! tiling ladder, these two drivers materialize the small transposed operand
//! into its own `DynamicPanelMatrix` with an ordinary scalar copy loop first
//! — cheap next to the `O(n^2 k)` GEMM work it feeds, and the same "copy
//! during packing" trick `StaticPanelMatrix::pack_from` already uses to
//! resolve a storage-order mismatch.

use crate::error::{Error, Result};
use crate::pointer::{column, row, MatrixPointer, Side, UpLo};
use crate::simd::{Simd, SimdElement};
use crate::storage::DynamicPanelMatrix;
use crate::tile::{IndexLane, RegisterTile};
use std::ops::{Div, Mul, Neg, Sub};

/// Column-chunk width used by every driver's inner tiling loop.
const KN: usize = 3;

/// `SimdElement` only guarantees pointwise vector arithmetic (spec.md §4.1);
/// [`potrf`] and [`trsm_right_upper`]'s scalar panel code and their `-T::ONE`
/// accumulation signs need ordinary scalar arithmetic on top of that. `f32`
/// and `f64` — the only two types this crate's `SimdElement` is implemented
/// for — already satisfy this via the standard library, so this is a
/// zero-cost bound, not a new capability.
trait Scalar: SimdElement + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self> + Neg<Output = Self> {}

impl<T> Scalar for T where T: SimdElement + Sub<Output = T> + Mul<Output = T> + Div<Output = T> + Neg<Output = T> {}

#[inline]
fn lanes_of<T: SimdElement>() -> usize {
    <T::Vector as Simd>::LANES
}

// =============================================================================
// GEMM
// =============================================================================

/// `D := alpha*A*B + beta*C`. `A` is `M x K`, `B` is `K x N`, `C`/`D` are
/// `M x N`. `C` and `D` may be the same matrix.
pub fn gemm<T: SimdElement>(
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    b: &DynamicPanelMatrix<T>,
    beta: T,
    c: &DynamicPanelMatrix<T>,
    d: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    let (m, k, n) = (a.rows(), a.columns(), b.columns());
    if b.rows() != k {
        return Err(Error::ShapeMismatch {
            op: "gemm",
            detail: format!("A is {m}x{k}, B is {}x{n} (inner dimensions must match)", b.rows()),
        });
    }
    if c.rows() != m || c.columns() != n {
        return Err(Error::ShapeMismatch {
            op: "gemm",
            detail: format!("C must be {m}x{n}, got {}x{}", c.rows(), c.columns()),
        });
    }
    if d.rows() != m || d.columns() != n {
        return Err(Error::ShapeMismatch {
            op: "gemm",
            detail: format!("D must be {m}x{n}, got {}x{}", d.rows(), d.columns()),
        });
    }

    let lanes = lanes_of::<T>();
    let mut i = 0;
    while i < m {
        if i + 2 * lanes < m && i + 4 * lanes != m {
            gemm_row_block::<T, 3>(alpha, a, b, beta, c, d, i, k, n);
            i += 3 * lanes;
        } else if i + 2 * lanes <= m {
            gemm_row_block::<T, 2>(alpha, a, b, beta, c, d, i, k, n);
            i += 2 * lanes;
        } else {
            gemm_row_block::<T, 1>(alpha, a, b, beta, c, d, i, k, n);
            i += lanes;
        }
    }
    Ok(())
}

fn gemm_row_block<T: SimdElement, const RM: usize>(
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    b: &DynamicPanelMatrix<T>,
    beta: T,
    c: &DynamicPanelMatrix<T>,
    d: &mut DynamicPanelMatrix<T>,
    i: usize,
    k: usize,
    n: usize,
) {
    let md = RegisterTile::<T, RM, KN>::rows().min(a.rows() - i);
    let mut j = 0;
    while j < n {
        let nd = KN.min(n - j);
        let mut tile = RegisterTile::<T, RM, KN>::new();
        // SAFETY: `a`/`b`/`c` are panel-packed with zero-padded trailing
        // rows, so full-width loads past `md`/`nd` within the current panel
        // stay in bounds; `d` is correctly shaped per the checks above.
        unsafe {
            tile.load_scaled_partial(beta, c.ptr().at(i as isize, j as isize), md, nd);
            tile.gemm_accumulate_partial(
                k,
                alpha,
                a.ptr().at(i as isize, 0),
                b.ptr().at(0, j as isize),
                md,
                nd,
            );
            tile.store_partial(d.ptr().at(i as isize, j as isize), md, nd);
        }
        j += nd;
    }
}

// =============================================================================
// GER
// =============================================================================

/// `A := A + alpha*x*y^T`, in place. `x` must be `M x 1`, `y` must be `1 x N`.
pub fn ger<T: SimdElement>(
    alpha: T,
    x: &DynamicPanelMatrix<T>,
    y: &DynamicPanelMatrix<T>,
    a: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    if x.columns() != 1 {
        return Err(Error::ShapeMismatch {
            op: "ger",
            detail: format!("x must be a column vector (Mx1), got {}x{}", x.rows(), x.columns()),
        });
    }
    if y.rows() != 1 {
        return Err(Error::ShapeMismatch {
            op: "ger",
            detail: format!("y must be a row vector (1xN), got {}x{}", y.rows(), y.columns()),
        });
    }
    let (m, n) = (x.rows(), y.columns());
    if a.rows() != m || a.columns() != n {
        return Err(Error::ShapeMismatch {
            op: "ger",
            detail: format!("A must be {m}x{n}, got {}x{}", a.rows(), a.columns()),
        });
    }

    let lanes = lanes_of::<T>();
    let mut i = 0;
    while i < m {
        if i + 2 * lanes < m && i + 4 * lanes != m {
            ger_row_block::<T, 3>(alpha, x, y, a, i, m, n);
            i += 3 * lanes;
        } else if i + 2 * lanes <= m {
            ger_row_block::<T, 2>(alpha, x, y, a, i, m, n);
            i += 2 * lanes;
        } else {
            ger_row_block::<T, 1>(alpha, x, y, a, i, m, n);
            i += lanes;
        }
    }
    Ok(())
}

fn ger_row_block<T: SimdElement, const RM: usize>(
    alpha: T,
    x: &DynamicPanelMatrix<T>,
    y: &DynamicPanelMatrix<T>,
    a: &mut DynamicPanelMatrix<T>,
    i: usize,
    m: usize,
    n: usize,
) {
    let md = RegisterTile::<T, RM, KN>::rows().min(m - i);
    let mut j = 0;
    while j < n {
        let nd = KN.min(n - j);
        let mut tile = RegisterTile::<T, RM, KN>::new();
        // SAFETY: `x`/`y`/`a` are panel-packed with zero-padded trailing
        // rows; `a`'s shape was checked above.
        unsafe {
            tile.load_scaled_partial(T::ONE, a.ptr().at(i as isize, j as isize), md, nd);
            tile.ger_partial(
                alpha,
                column(x.ptr().at(i as isize, 0)),
                row(y.ptr().at(0, j as isize)),
                md,
                nd,
            );
            tile.store_partial(a.ptr().at(i as isize, j as isize), md, nd);
        }
        j += nd;
    }
}

// =============================================================================
// TRSM (Right, Upper)
// =============================================================================

/// Dispatches on `(side, uplo)` to the implemented TRSM case. Only
/// `Side::Right, UpLo::Upper` is implemented at the register-tile layer (see
/// `SPEC_FULL.md`'s Open Question resolutions); every other combination
/// returns [`Error::Unsupported`] before touching any memory.
pub fn trsm<T: Scalar>(
    side: Side,
    uplo: UpLo,
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    b: &DynamicPanelMatrix<T>,
    x: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    match (side, uplo) {
        (Side::Right, UpLo::Upper) => trsm_right_upper(alpha, a, b, x),
        _ => Err(Error::Unsupported {
            op: "trsm",
            detail: format!("{side:?}/{uplo:?} is not implemented at the register-tile layer"),
        }),
    }
}

/// Solve `X*A = alpha*B` for upper-triangular `A` (`Side::Right`,
/// `UpLo::Upper` — the only combination implemented at the register-tile
/// layer; see `SPEC_FULL.md`'s Open Question resolutions). `A` is `N x N`
/// (only the upper triangle including the diagonal is read), `B`/`X` are
/// `M x N`. `B` and `X` may be the same matrix.
pub fn trsm_right_upper<T: Scalar>(
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    b: &DynamicPanelMatrix<T>,
    x: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    let (m, n) = (b.rows(), b.columns());
    if a.rows() != n || a.columns() != n {
        return Err(Error::ShapeMismatch {
            op: "trsm_right_upper",
            detail: format!("A must be {n}x{n}, got {}x{}", a.rows(), a.columns()),
        });
    }
    if x.rows() != m || x.columns() != n {
        return Err(Error::ShapeMismatch {
            op: "trsm_right_upper",
            detail: format!("X must be {m}x{n}, got {}x{}", x.rows(), x.columns()),
        });
    }

    for j in 0..n {
        for i in 0..m {
            x.set(i, j, alpha * b.get(i, j));
        }
    }

    let lanes = lanes_of::<T>();
    let mut j = 0;
    while j < n {
        let nd = KN.min(n - j);
        let mut i = 0;
        while i < m {
            if i + 2 * lanes < m && i + 4 * lanes != m {
                trsm_row_block::<T, 3>(a, x, i, j, nd, m);
                i += 3 * lanes;
            } else if i + 2 * lanes <= m {
                trsm_row_block::<T, 2>(a, x, i, j, nd, m);
                i += 2 * lanes;
            } else {
                trsm_row_block::<T, 1>(a, x, i, j, nd, m);
                i += lanes;
            }
        }
        j += nd;
    }
    Ok(())
}

fn trsm_row_block<T: Scalar, const RM: usize>(
    a: &DynamicPanelMatrix<T>,
    x: &mut DynamicPanelMatrix<T>,
    i: usize,
    j: usize,
    nd: usize,
    m: usize,
) {
    let md = RegisterTile::<T, RM, KN>::rows().min(m - i);
    let mut tile = RegisterTile::<T, RM, KN>::new();
    // SAFETY: `x` is panel-packed with zero-padded trailing rows; `a`'s
    // diagonal block was validated square by the caller.
    unsafe {
        tile.load_scaled_partial(T::ONE, x.ptr().at(i as isize, j as isize), md, nd);
        if j > 0 {
            tile.gemm_accumulate_partial(
                j,
                -T::ONE,
                x.ptr().at(i as isize, 0),
                a.ptr().at(0, j as isize),
                md,
                nd,
            );
        }
        tile.trsm_right_upper_partial(a.ptr().at(j as isize, j as isize), nd);
        tile.store_partial(x.ptr().at(i as isize, j as isize), md, nd);
    }
}

// =============================================================================
// TRMM
// =============================================================================

/// Dispatches on `(side, uplo)` to the implemented TRMM case. `a` is always
/// the triangular operand, `b` the general operand, matching spec.md's
/// `trmm(side, uplo, alpha, a, b, r)` surface regardless of which physical
/// argument order the underlying register-tile call needs. Only
/// `Side::Left, UpLo::Upper` and `Side::Right, UpLo::Lower` are implemented;
/// every other combination returns [`Error::Unsupported`] before touching
/// any memory.
pub fn trmm<T: SimdElement>(
    side: Side,
    uplo: UpLo,
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    b: &DynamicPanelMatrix<T>,
    r: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    match (side, uplo) {
        (Side::Left, UpLo::Upper) => trmm_left_upper(alpha, a, b, r),
        (Side::Right, UpLo::Lower) => trmm_right_lower(alpha, b, a, r),
        _ => Err(Error::Unsupported {
            op: "trmm",
            detail: format!("{side:?}/{uplo:?} is not implemented at the register-tile layer"),
        }),
    }
}

/// `R := R + alpha*A*B`, `A` upper-triangular `K x K` (only the upper
/// triangle is read), `B`/`R` general `K x N`. `R` is an accumulator, not
/// overwritten — zero it first for a plain `R := alpha*A*B`.
pub fn trmm_left_upper<T: SimdElement>(
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    b: &DynamicPanelMatrix<T>,
    r: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    let (k_dim, n) = (b.rows(), b.columns());
    if a.rows() != k_dim || a.columns() != k_dim {
        return Err(Error::ShapeMismatch {
            op: "trmm_left_upper",
            detail: format!("A must be {k_dim}x{k_dim}, got {}x{}", a.rows(), a.columns()),
        });
    }
    if r.rows() != k_dim || r.columns() != n {
        return Err(Error::ShapeMismatch {
            op: "trmm_left_upper",
            detail: format!("R must be {k_dim}x{n}, got {}x{}", r.rows(), r.columns()),
        });
    }

    let lanes = lanes_of::<T>();
    let mut i = 0;
    while i < k_dim {
        if i + 2 * lanes < k_dim && i + 4 * lanes != k_dim {
            trmm_left_row_block::<T, 3>(alpha, a, b, r, i, k_dim, n);
            i += 3 * lanes;
        } else if i + 2 * lanes <= k_dim {
            trmm_left_row_block::<T, 2>(alpha, a, b, r, i, k_dim, n);
            i += 2 * lanes;
        } else {
            trmm_left_row_block::<T, 1>(alpha, a, b, r, i, k_dim, n);
            i += lanes;
        }
    }
    Ok(())
}

fn trmm_left_row_block<T: SimdElement, const RM: usize>(
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    b: &DynamicPanelMatrix<T>,
    r: &mut DynamicPanelMatrix<T>,
    i: usize,
    k_dim: usize,
    n: usize,
) {
    let md = RegisterTile::<T, RM, KN>::rows().min(k_dim - i);
    let mut j = 0;
    while j < n {
        let nd = KN.min(n - j);
        let mut tile = RegisterTile::<T, RM, KN>::new();
        // SAFETY: `a`/`b` panel-padded; `r` shape checked above.
        unsafe {
            tile.load_scaled_partial(T::ONE, r.ptr().at(i as isize, j as isize), md, nd);
            tile.trmm_left_upper_partial(
                alpha,
                a.ptr().at(i as isize, i as isize),
                b.ptr().at(i as isize, j as isize),
                nd,
            );
            let tail_k = k_dim - (i + md);
            if tail_k > 0 {
                tile.gemm_accumulate_partial(
                    tail_k,
                    alpha,
                    a.ptr().at(i as isize, (i + md) as isize),
                    b.ptr().at((i + md) as isize, j as isize),
                    md,
                    nd,
                );
            }
            tile.store_partial(r.ptr().at(i as isize, j as isize), md, nd);
        }
        j += nd;
    }
}

/// `R := R + alpha*B*A`, `A` lower-triangular `K x K` (only the lower
/// triangle is read), `B`/`R` general `M x K`.
pub fn trmm_right_lower<T: SimdElement>(
    alpha: T,
    b: &DynamicPanelMatrix<T>,
    a: &DynamicPanelMatrix<T>,
    r: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    let (m, k_dim) = (b.rows(), b.columns());
    if a.rows() != k_dim || a.columns() != k_dim {
        return Err(Error::ShapeMismatch {
            op: "trmm_right_lower",
            detail: format!("A must be {k_dim}x{k_dim}, got {}x{}", a.rows(), a.columns()),
        });
    }
    if r.rows() != m || r.columns() != k_dim {
        return Err(Error::ShapeMismatch {
            op: "trmm_right_lower",
            detail: format!("R must be {m}x{k_dim}, got {}x{}", r.rows(), r.columns()),
        });
    }

    let lanes = lanes_of::<T>();
    let mut i = 0;
    while i < m {
        if i + 2 * lanes < m && i + 4 * lanes != m {
            trmm_right_row_block::<T, 3>(alpha, b, a, r, i, m, k_dim);
            i += 3 * lanes;
        } else if i + 2 * lanes <= m {
            trmm_right_row_block::<T, 2>(alpha, b, a, r, i, m, k_dim);
            i += 2 * lanes;
        } else {
            trmm_right_row_block::<T, 1>(alpha, b, a, r, i, m, k_dim);
            i += lanes;
        }
    }
    Ok(())
}

fn trmm_right_row_block<T: SimdElement, const RM: usize>(
    alpha: T,
    b: &DynamicPanelMatrix<T>,
    a: &DynamicPanelMatrix<T>,
    r: &mut DynamicPanelMatrix<T>,
    i: usize,
    m: usize,
    k_dim: usize,
) {
    let md = RegisterTile::<T, RM, KN>::rows().min(m - i);
    let mut j = 0;
    while j < k_dim {
        let nd = KN.min(k_dim - j);
        let mut tile = RegisterTile::<T, RM, KN>::new();
        // SAFETY: `b`/`a` panel-padded; `r` shape checked above.
        unsafe {
            tile.load_scaled_partial(T::ONE, r.ptr().at(i as isize, j as isize), md, nd);
            tile.trmm_right_lower_partial(
                alpha,
                b.ptr().at(i as isize, j as isize),
                a.ptr().at(j as isize, j as isize),
                nd,
            );
            let tail_k = k_dim - (j + nd);
            if tail_k > 0 {
                tile.gemm_accumulate_partial(
                    tail_k,
                    alpha,
                    b.ptr().at(i as isize, (j + nd) as isize),
                    a.ptr().at((j + nd) as isize, j as isize),
                    md,
                    nd,
                );
            }
            tile.store_partial(r.ptr().at(i as isize, j as isize), md, nd);
        }
        j += nd;
    }
}

// =============================================================================
// SYRK
// =============================================================================

/// `C := alpha*A*A^T + beta*C`, writing only the lower triangle of the
/// `M x M` output `C`. `A` is `M x K`. Not detailed at the register-tile
/// layer in the original source (see `SPEC_FULL.md`'s Open Question
/// resolutions) — driven by the same GEMM ladder as [`gemm`], finished with
/// [`RegisterTile::store_lower_partial`] instead of a plain store.
pub fn syrk<T: SimdElement>(
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    beta: T,
    c: &mut DynamicPanelMatrix<T>,
) -> Result<()> {
    let (m, k_dim) = (a.rows(), a.columns());
    if c.rows() != m || c.columns() != m {
        return Err(Error::ShapeMismatch {
            op: "syrk",
            detail: format!("C must be {m}x{m}, got {}x{}", c.rows(), c.columns()),
        });
    }

    let mut at = DynamicPanelMatrix::<T>::zero(k_dim, m);
    for col in 0..m {
        for row_idx in 0..k_dim {
            at.set(row_idx, col, a.get(col, row_idx));
        }
    }

    let lanes = lanes_of::<T>();
    let mut i = 0;
    while i < m {
        if i + 2 * lanes < m && i + 4 * lanes != m {
            syrk_row_block::<T, 3>(alpha, a, &at, beta, c, i, m, k_dim);
            i += 3 * lanes;
        } else if i + 2 * lanes <= m {
            syrk_row_block::<T, 2>(alpha, a, &at, beta, c, i, m, k_dim);
            i += 2 * lanes;
        } else {
            syrk_row_block::<T, 1>(alpha, a, &at, beta, c, i, m, k_dim);
            i += lanes;
        }
    }
    Ok(())
}

fn syrk_row_block<T: SimdElement, const RM: usize>(
    alpha: T,
    a: &DynamicPanelMatrix<T>,
    at: &DynamicPanelMatrix<T>,
    beta: T,
    c: &mut DynamicPanelMatrix<T>,
    i: usize,
    m: usize,
    k_dim: usize,
) {
    let md = RegisterTile::<T, RM, KN>::rows().min(m - i);
    let upper_bound = (i + md).min(m);
    let mut j = 0;
    while j < upper_bound {
        let nd = KN.min(upper_bound - j);
        let mut tile = RegisterTile::<T, RM, KN>::new();
        // SAFETY: `a`/`at` panel-padded; `c` shape checked by the caller.
        unsafe {
            tile.load_scaled_partial(beta, c.ptr().at(i as isize, j as isize), md, nd);
            tile.gemm_accumulate_partial(
                k_dim,
                alpha,
                a.ptr().at(i as isize, 0),
                at.ptr().at(0, j as isize),
                md,
                nd,
            );
            tile.store_lower_partial(c.ptr().at(i as isize, j as isize), md, nd);
        }
        j += nd;
    }
}

// =============================================================================
// POTRF
// =============================================================================

/// In-place Cholesky factorization: on success `A`'s lower triangle holds
/// `L` such that `A = L*L^T`; the strict upper triangle is left unmodified.
/// No pivoting. Blocked right-looking algorithm (panel width [`POTRF_BLOCK`]
/// columns) matching the structure of reference Cholesky implementations:
/// an unblocked scalar factorization of each panel, followed by a
/// register-tiled rank-`kb` update of the trailing submatrix — the same
/// split as LAPACK's `dpotrf` (unblocked `dpotf2` panel, blocked `dsyrk`
/// trailing update), grounded here in the absence of a dedicated blocked
/// driver in the original source (`blast`'s Cholesky support lives at the
/// reference/unblocked layer only).
pub fn potrf<T: Scalar>(a: &mut DynamicPanelMatrix<T>) -> Result<()>
where
    T::Vector: IndexLane<T>,
{
    let n = a.rows();
    if a.columns() != n {
        return Err(Error::ShapeMismatch {
            op: "potrf",
            detail: format!("A must be square, got {n}x{}", a.columns()),
        });
    }
    if n == 0 {
        return Ok(());
    }

    let mut k = 0;
    while k < n {
        let kb = POTRF_BLOCK.min(n - k);
        factor_panel_scalar(a, k, kb, n);
        if k + kb < n {
            update_trailing(a, k, kb, n);
        }
        k += kb;
    }
    Ok(())
}

/// Panel width for [`potrf`]'s unblocked scalar factorization step. Chosen
/// as a small literal rather than the SIMD lane width: a driver generic over
/// `T: SimdElement` cannot form `RegisterTile<T, _, { T::Vector::LANES }>` on
/// stable Rust (a const generic argument computed from a bound on the
/// function's own type parameter needs `generic_const_exprs`), and this step
/// is scalar anyway, so the lane width buys it nothing.
const POTRF_BLOCK: usize = 4;

fn factor_panel_scalar<T: Scalar>(a: &mut DynamicPanelMatrix<T>, k: usize, kb: usize, n: usize) {
    for jj in 0..kb {
        let j = k + jj;
        for p in k..j {
            let a_jp = a.get(j, p);
            for i in j..n {
                let v = a.get(i, j) - a.get(i, p) * a_jp;
                a.set(i, j, v);
            }
        }

        let pivot = a.get(j, j).sqrt();
        a.set(j, j, pivot);
        for i in (j + 1)..n {
            let v = a.get(i, j) / pivot;
            a.set(i, j, v);
        }
    }
}

fn update_trailing<T: Scalar>(a: &mut DynamicPanelMatrix<T>, k: usize, kb: usize, n: usize) {
    let start = k + kb;
    let tail = n - start;

    let mut pt = DynamicPanelMatrix::<T>::zero(kb, tail);
    for col in 0..tail {
        for row_idx in 0..kb {
            pt.set(row_idx, col, a.get(start + col, k + row_idx));
        }
    }

    let lanes = lanes_of::<T>();
    let mut i = 0;
    while i < tail {
        if i + 2 * lanes < tail && i + 4 * lanes != tail {
            potrf_trailing_row_block::<T, 3>(a, &pt, k, kb, start, i, tail);
            i += 3 * lanes;
        } else if i + 2 * lanes <= tail {
            potrf_trailing_row_block::<T, 2>(a, &pt, k, kb, start, i, tail);
            i += 2 * lanes;
        } else {
            potrf_trailing_row_block::<T, 1>(a, &pt, k, kb, start, i, tail);
            i += lanes;
        }
    }
}

fn potrf_trailing_row_block<T: Scalar, const RM: usize>(
    a: &mut DynamicPanelMatrix<T>,
    pt: &DynamicPanelMatrix<T>,
    k: usize,
    kb: usize,
    start: usize,
    i: usize,
    tail: usize,
) {
    let md = RegisterTile::<T, RM, KN>::rows().min(tail - i);
    let upper_bound = (i + md).min(tail);
    let mut j = 0;
    while j < upper_bound {
        let nd = KN.min(upper_bound - j);
        let mut tile = RegisterTile::<T, RM, KN>::new();
        // SAFETY: `a` panel-padded; `pt` is a freshly allocated, exactly
        // `kb x tail` panel matrix.
        unsafe {
            tile.load_scaled_partial(
                T::ONE,
                a.ptr().at((start + i) as isize, (start + j) as isize),
                md,
                nd,
            );
            tile.gemm_accumulate_partial(
                kb,
                -T::ONE,
                a.ptr().at((start + i) as isize, k as isize),
                pt.ptr().at(0, j as isize),
                md,
                nd,
            );
            tile.store_lower_partial(a.ptr().at((start + i) as isize, (start + j) as isize), md, nd);
        }
        j += nd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::StorageOrder;

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

    // Reference dense GEMM for the scale this module's tests run at.
    fn reference_gemm(m: usize, k: usize, n: usize, alpha: f64, a: &[f64], b: &[f64], beta: f64, c: &[f64]) -> Vec<f64> {
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

    #[test]
    fn gemm_matches_reference_on_a_ragged_shape() {
        let (m, k, n) = (13, 7, 5);
        let a: Vec<f64> = (0..m * k).map(|x| ((x % 7) as f64) * 0.5 - 1.0).collect();
        let b: Vec<f64> = (0..k * n).map(|x| ((x % 5) as f64) * 0.3 + 0.1).collect();
        let c: Vec<f64> = (0..m * n).map(|x| (x as f64) * 0.1).collect();

        let pa = dense_to_panel(m, k, &a);
        let pb = dense_to_panel(k, n, &b);
        let pc = dense_to_panel(m, n, &c);
        let mut pd = DynamicPanelMatrix::<f64>::zero(m, n);

        gemm(1.5, &pa, &pb, 0.5, &pc, &mut pd).unwrap();

        let expected = reference_gemm(m, k, n, 1.5, &a, &b, 0.5, &c);
        let got = panel_to_dense(&pd);
        for (e, g) in expected.iter().zip(got.iter()) {
            assert!((e - g).abs() < 1e-9, "expected {e}, got {g}");
        }
    }

    #[test]
    fn gemm_rejects_mismatched_inner_dimension() {
        let pa = DynamicPanelMatrix::<f64>::zero(4, 3);
        let pb = DynamicPanelMatrix::<f64>::zero(5, 2);
        let pc = DynamicPanelMatrix::<f64>::zero(4, 2);
        let mut pd = DynamicPanelMatrix::<f64>::zero(4, 2);
        let err = gemm(1.0, &pa, &pb, 0.0, &pc, &mut pd).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { op: "gemm", .. }));
    }

    #[test]
    fn ger_matches_reference_rank_one_update() {
        let (m, n) = (11, 6);
        let x: Vec<f64> = (0..m).map(|i| i as f64 + 1.0).collect();
        let y: Vec<f64> = (0..n).map(|j| (j as f64 + 1.0) * 0.5).collect();
        let a: Vec<f64> = (0..m * n).map(|v| v as f64 * 0.01).collect();

        let px = dense_to_panel(m, 1, &x);
        let py = dense_to_panel(1, n, &y);
        let mut pa = dense_to_panel(m, n, &a);

        ger(2.0, &px, &py, &mut pa).unwrap();

        let got = panel_to_dense(&pa);
        for i in 0..m {
            for j in 0..n {
                let expected = a[i + j * m] + 2.0 * x[i] * y[j];
                assert!((got[i + j * m] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn trsm_right_upper_solves_against_known_triangular_system() {
        // A is 4x4 upper-triangular; solve X*A = B and check X*A == B.
        let n = 4;
        let m = 6;
        let mut a_dense = vec![0.0; n * n];
        for j in 0..n {
            for i in 0..=j {
                a_dense[i + j * n] = if i == j { 2.0 + i as f64 } else { 0.3 * (i as f64 + 1.0) };
            }
        }
        let b: Vec<f64> = (0..m * n).map(|v| (v as f64) * 0.1 - 1.0).collect();

        let pa = dense_to_panel(n, n, &a_dense);
        let pb = dense_to_panel(m, n, &b);
        let mut px = DynamicPanelMatrix::<f64>::zero(m, n);

        trsm_right_upper(1.0, &pa, &pb, &mut px).unwrap();

        let x = panel_to_dense(&px);
        // Recompute X*A and compare against B.
        for i in 0..m {
            for j in 0..n {
                let mut acc = 0.0;
                for p in 0..n {
                    acc += x[i + p * m] * a_dense[p + j * n];
                }
                assert!((acc - b[i + j * m]).abs() < 1e-8, "row {i} col {j}: {acc} vs {}", b[i + j * m]);
            }
        }
    }

    #[test]
    fn potrf_recovers_a_known_factorization() {
        // Build A = L*L^T for a known lower-triangular L, then factor A and
        // compare against L up to sign (diag chosen positive so it's exact).
        let n = 9;
        let mut l = vec![0.0; n * n];
        for j in 0..n {
            for i in j..n {
                l[i + j * n] = if i == j { 1.0 + (i as f64) * 0.3 } else { 0.05 * ((i + j) as f64) };
            }
        }
        let mut a_dense = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let mut acc = 0.0;
                for p in 0..n {
                    acc += l[i + p * n] * l[j + p * n];
                }
                a_dense[i + j * n] = acc;
            }
        }

        let mut pa = dense_to_panel(n, n, &a_dense);
        potrf(&mut pa).unwrap();
        let got = panel_to_dense(&pa);

        for i in 0..n {
            for j in 0..=i {
                assert!((got[i + j * n] - l[i + j * n]).abs() < 1e-8, "L[{i}][{j}]: {} vs {}", got[i + j * n], l[i + j * n]);
            }
        }
    }

    #[test]
    fn syrk_matches_reference_lower_triangle() {
        let (m, k) = (10, 4);
        let a: Vec<f64> = (0..m * k).map(|v| (v as f64) * 0.07 - 0.3).collect();
        let c: Vec<f64> = (0..m * m).map(|v| (v as f64) * 0.01).collect();

        let pa = dense_to_panel(m, k, &a);
        let mut pc = dense_to_panel(m, m, &c);

        syrk(1.0, &pa, 0.0, &mut pc).unwrap();

        let got = panel_to_dense(&pc);
        for i in 0..m {
            for j in 0..=i {
                let mut acc = 0.0;
                for p in 0..k {
                    acc += a[i + p * m] * a[j + p * m];
                }
                assert!((got[i + j * m] - acc).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn trsm_dispatch_rejects_unimplemented_side_uplo() {
        let pa = DynamicPanelMatrix::<f64>::zero(4, 4);
        let pb = DynamicPanelMatrix::<f64>::zero(6, 4);
        let mut px = DynamicPanelMatrix::<f64>::zero(6, 4);
        let err = trsm(Side::Left, UpLo::Lower, 1.0, &pa, &pb, &mut px).unwrap_err();
        assert!(matches!(err, Error::Unsupported { op: "trsm", .. }));
    }

    #[test]
    fn trmm_dispatch_matches_direct_calls_for_both_implemented_cases() {
        let (k, n) = (5, 3);
        let mut a_upper = vec![0.0; k * k];
        for j in 0..k {
            for i in 0..=j {
                a_upper[i + j * k] = if i == j { 1.5 + i as f64 } else { 0.2 * (j as f64 + 1.0) };
            }
        }
        let b: Vec<f64> = (0..k * n).map(|v| (v as f64) * 0.1).collect();
        let pa = dense_to_panel(k, k, &a_upper);
        let pb = dense_to_panel(k, n, &b);

        let mut r_direct = DynamicPanelMatrix::<f64>::zero(k, n);
        trmm_left_upper(2.0, &pa, &pb, &mut r_direct).unwrap();
        let mut r_dispatch = DynamicPanelMatrix::<f64>::zero(k, n);
        trmm(Side::Left, UpLo::Upper, 2.0, &pa, &pb, &mut r_dispatch).unwrap();
        assert_eq!(panel_to_dense(&r_direct), panel_to_dense(&r_dispatch));

        let mut a_lower = vec![0.0; k * k];
        for j in 0..k {
            for i in j..k {
                a_lower[i + j * k] = if i == j { 1.5 + i as f64 } else { 0.2 * (i as f64 + 1.0) };
            }
        }
        let pa_lower = dense_to_panel(k, k, &a_lower);
        let pb_m: Vec<f64> = (0..n * k).map(|v| (v as f64) * 0.1).collect();
        let pb_m = dense_to_panel(n, k, &pb_m);

        let mut r_direct2 = DynamicPanelMatrix::<f64>::zero(n, k);
        trmm_right_lower(1.0, &pb_m, &pa_lower, &mut r_direct2).unwrap();
        let mut r_dispatch2 = DynamicPanelMatrix::<f64>::zero(n, k);
        trmm(Side::Right, UpLo::Lower, 1.0, &pa_lower, &pb_m, &mut r_dispatch2).unwrap();
        assert_eq!(panel_to_dense(&r_direct2), panel_to_dense(&r_dispatch2));
    }
}
