//! Register-resident matrix tile: the centerpiece of this crate.
//!
//! `RegisterTile<T, RM, N>` holds `RM * N` SIMD registers entirely in the
//! CPU's vector register file — `RM` is the number of register-rows (what
//! `spec.md` calls `M / W`), `N` the column count. Every loop here is over a
//! const generic bound, so the backend can (and on release builds, will)
//! unroll it fully; there is no heap allocation and no code path that isn't
//! straight-line SIMD.
//!
//! Grounded on `RegisterMatrix` in the original source
//! (`examples/original_source/include/blast/math/register_matrix/RegisterMatrix.hpp`),
//! with `RM` named explicitly as a const generic instead of being derived
//! from `M / SS` at the type level — Rust's const generics cannot express
//! that arithmetic relation on stable without `generic_const_exprs`, so
//! `RegisterTile<T, RM, N>` takes `RM` directly and reports `rows() == RM *
//! LANES`.

use crate::pointer::{column, row, ColumnVectorPointer, MatrixPointer, RowVectorPointer};
use crate::simd::{Simd, SimdElement};

#[cfg(target_arch = "aarch64")]
const REGISTER_BUDGET: usize = 32;

#[cfg(not(target_arch = "aarch64"))]
const REGISTER_BUDGET: usize = 16;

/// A compile-time-sized `RM * LANES` rows by `N` columns matrix of SIMD
/// registers. `storage_order` is always column-major (spec.md §4.3 — other
/// orders are not implemented at this layer).
#[derive(Clone)]
pub struct RegisterTile<T: SimdElement, const RM: usize, const N: usize> {
    v: [[T::Vector; N]; RM],
}

impl<T: SimdElement, const RM: usize, const N: usize> Default for RegisterTile<T, RM, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SimdElement, const RM: usize, const N: usize> RegisterTile<T, RM, N> {
    /// Register-pressure invariant (spec.md §3, §4.3): `RM*N` accumulators
    /// plus the worst-case extra headroom needed by `ger`/`potrf` must fit
    /// the target's vector register file. Violating it is a compile error —
    /// referencing this const forces its evaluation at monomorphization time.
    const REGISTER_CHECK: () = assert!(
        RM * N + RM + 2 <= REGISTER_BUDGET,
        "RegisterTile<T, RM, N> exceeds the target register file"
    );

    /// Lane count of the compiled-in SIMD backend for `T`.
    pub const LANES: usize = <T::Vector as Simd>::LANES;

    /// Logical row count `RM * LANES`.
    #[must_use]
    pub fn rows() -> usize {
        RM * Self::LANES
    }

    /// Logical column count.
    #[must_use]
    pub fn columns() -> usize {
        N
    }

    /// Number of register-rows (`M / W` in spec terms).
    #[must_use]
    pub fn panels() -> usize {
        RM
    }

    /// Zero-initialized tile.
    #[must_use]
    pub fn new() -> Self {
        let () = Self::REGISTER_CHECK;
        Self {
            v: [[T::Vector::zero(); N]; RM],
        }
    }

    /// Set every register to zero.
    pub fn reset(&mut self) {
        for row in &mut self.v {
            for reg in row.iter_mut() {
                *reg = T::Vector::zero();
            }
        }
    }

    /// Value of the logical element `(i, j)`. Test/debug use only — not on
    /// the hot path.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> T
    where
        T::Vector: IndexLane<T>,
    {
        self.v[i / Self::LANES][j].lane(i % Self::LANES)
    }

    /// Multiply every element by `alpha`.
    pub fn scale(&mut self, alpha: T) {
        let a = T::Vector::broadcast(alpha);
        for row in &mut self.v {
            for reg in row.iter_mut() {
                *reg = *reg * a;
            }
        }
    }

    /// `self += beta * A`, unconditional full-size load of `A`.
    ///
    /// # Safety
    /// `a.at(LANES*i, j)` must be a valid load for every `(i, j)` in range.
    pub unsafe fn axpy<PA: MatrixPointer<T>>(&mut self, beta: T, a: PA) {
        let beta_v = T::Vector::broadcast(beta);
        for j in 0..N {
            for i in 0..RM {
                let loaded = a.at((Self::LANES * i) as isize, j as isize).load();
                self.v[i][j] = beta_v.fmadd(loaded, self.v[i][j]);
            }
        }
    }

    /// Size-limited `axpy`, for tiles processing a partial `(m, n)` region.
    ///
    /// # Safety
    /// Same as [`RegisterTile::axpy`], restricted to the in-range entries.
    pub unsafe fn axpy_partial<PA: MatrixPointer<T>>(&mut self, beta: T, a: PA, m: usize, n: usize) {
        let beta_v = T::Vector::broadcast(beta);
        for j in 0..N {
            if j >= n {
                continue;
            }
            for i in 0..RM {
                if Self::LANES * i >= m {
                    continue;
                }
                let loaded = a.at((Self::LANES * i) as isize, j as isize).load();
                self.v[i][j] = beta_v.fmadd(loaded, self.v[i][j]);
            }
        }
    }

    /// `tile <- load(p)`: `v[i][j] = p(W*i, j).load()`.
    ///
    /// # Safety
    /// `p.at(LANES*i, j)` must be a valid full-width load for every `(i, j)`.
    pub unsafe fn load<P: MatrixPointer<T>>(&mut self, p: P) {
        for j in 0..N {
            for i in 0..RM {
                self.v[i][j] = p.at((Self::LANES * i) as isize, j as isize).load();
            }
        }
    }

    /// `tile <- beta * load(p)`.
    ///
    /// # Safety
    /// Same as [`RegisterTile::load`].
    pub unsafe fn load_scaled<P: MatrixPointer<T>>(&mut self, beta: T, p: P) {
        let beta_v = T::Vector::broadcast(beta);
        for j in 0..N {
            for i in 0..RM {
                let loaded = p.at((Self::LANES * i) as isize, j as isize).load();
                self.v[i][j] = beta_v * loaded;
            }
        }
    }

    /// `tile <- beta * load(p)` restricted to a logical `(m, n)` leading
    /// region; registers outside it are left untouched.
    ///
    /// # Safety
    /// `p` must be valid for full loads within the `(m, n)` region and for a
    /// masked load of the boundary row group when `m` is not a multiple of
    /// `LANES` and `P::ALIGNED && P::PADDED` does not hold.
    pub unsafe fn load_scaled_partial<P: MatrixPointer<T>>(&mut self, beta: T, p: P, m: usize, n: usize) {
        let beta_v = T::Vector::broadcast(beta);
        for j in 0..N {
            if j >= n {
                continue;
            }

            if P::ALIGNED && P::PADDED {
                for i in 0..RM {
                    if Self::LANES * i < m {
                        let loaded = p.at((Self::LANES * i) as isize, j as isize).load();
                        self.v[i][j] = beta_v * loaded;
                    }
                }
            } else {
                for i in 0..RM {
                    if Self::LANES * i + Self::LANES <= m {
                        let loaded = p.at((Self::LANES * i) as isize, j as isize).load();
                        self.v[i][j] = beta_v * loaded;
                    }
                }

                let rem = m % Self::LANES;
                if rem != 0 && m / Self::LANES < RM {
                    let mask = T::Vector::lanes_below(rem);
                    let loaded = p
                        .at((m - rem) as isize, j as isize)
                        .load_masked(mask);
                    self.v[m / Self::LANES][j] = beta_v * loaded;
                }
            }
        }
    }

    /// Unconditional store of every register.
    ///
    /// # Safety
    /// `p.at(LANES*i, j)` must be a valid aligned store for every `(i, j)`.
    pub unsafe fn store<P: MatrixPointer<T>>(&self, p: P) {
        for j in 0..N {
            for i in 0..RM {
                p.at((Self::LANES * i) as isize, j as isize).store(self.v[i][j]);
            }
        }
    }

    /// Store restricted to a logical `(m, n)` leading region.
    ///
    /// # Safety
    /// `p` must be valid for full stores within `(m, n)` and a masked store
    /// of the boundary row group.
    pub unsafe fn store_partial<P: MatrixPointer<T>>(&self, p: P, m: usize, n: usize) {
        for j in 0..N {
            if j >= n {
                continue;
            }
            for i in 0..RM {
                if Self::LANES * (i + 1) <= m {
                    p.at((Self::LANES * i) as isize, j as isize).store(self.v[i][j]);
                }
            }
        }

        let rem = m % Self::LANES;
        if rem != 0 {
            let i = m / Self::LANES;
            if i < RM {
                let mask = T::Vector::lanes_below(rem);
                for j in 0..n.min(N) {
                    p.at((Self::LANES * i) as isize, j as isize)
                        .store_masked(self.v[i][j], mask);
                }
            }
        }
    }

    /// Store only the lower-triangular part (`i >= j`).
    ///
    /// # Safety
    /// `p` must be valid for full and masked stores of every referenced
    /// `(i, j)`.
    pub unsafe fn store_lower<P: MatrixPointer<T>>(&self, p: P) {
        for j in 0..N {
            let mut ri = j / Self::LANES;
            let skip = j % Self::LANES;

            if skip != 0 && ri < RM {
                let mask = T::Vector::lanes_at_or_above(skip);
                p.at((Self::LANES * ri) as isize, j as isize)
                    .store_masked(self.v[ri][j], mask);
                ri += 1;
            }

            while ri < RM {
                p.at((Self::LANES * ri) as isize, j as isize).store(self.v[ri][j]);
                ri += 1;
            }
        }
    }

    /// Lower-triangular store restricted to a logical `(m, n)` leading
    /// region.
    ///
    /// # Safety
    /// `p` must be valid for masked stores of every referenced `(i, j)`.
    pub unsafe fn store_lower_partial<P: MatrixPointer<T>>(&self, p: P, m: usize, n: usize) {
        for j in 0..N {
            if j >= n {
                continue;
            }
            for ri in (j / Self::LANES)..RM {
                let skip = j as isize - (ri * Self::LANES) as isize;
                let rem = m as isize - (ri * Self::LANES) as isize;
                let mask = if skip > 0 {
                    T::Vector::lanes_in_range(skip as usize, rem.max(0) as usize)
                } else {
                    T::Vector::lanes_below(rem.max(0) as usize)
                };
                p.at((Self::LANES * ri) as isize, j as isize)
                    .store_masked(self.v[ri][j], mask);
            }
        }
    }

    /// Rank-1 update `tile += alpha * a * b^T`.
    ///
    /// # Safety
    /// `a.at(LANES*i)` must be valid for a full load for every `i < RM`;
    /// `b.at(j)` must be valid for a scalar read for every `j < N`.
    pub unsafe fn ger<PA: MatrixPointer<T>, PB: MatrixPointer<T>>(
        &mut self,
        alpha: T,
        a: ColumnVectorPointer<T, PA>,
        b: RowVectorPointer<T, PB>,
    ) {
        let mut ax = [T::Vector::zero(); RM];
        let alpha_v = T::Vector::broadcast(alpha);
        for i in 0..RM {
            ax[i] = alpha_v * a.load(i as isize * Self::LANES as isize);
        }

        for j in 0..N {
            let bx = b.broadcast(j as isize);
            for i in 0..RM {
                self.v[i][j] = ax[i].fmadd(bx, self.v[i][j]);
            }
        }
    }

    /// Size-limited rank-1 update.
    ///
    /// # Safety
    /// Same as [`RegisterTile::ger`], restricted to the in-range entries.
    pub unsafe fn ger_partial<PA: MatrixPointer<T>, PB: MatrixPointer<T>>(
        &mut self,
        alpha: T,
        a: ColumnVectorPointer<T, PA>,
        b: RowVectorPointer<T, PB>,
        m: usize,
        n: usize,
    ) {
        let mut ax = [T::Vector::zero(); RM];
        let alpha_v = T::Vector::broadcast(alpha);
        for i in 0..RM {
            if Self::LANES * i >= m {
                break;
            }
            ax[i] = alpha_v * a.load(i as isize * Self::LANES as isize);
        }

        for j in 0..N {
            if j >= n {
                continue;
            }
            let bx = b.broadcast(j as isize);
            for i in 0..RM {
                if Self::LANES * i >= m {
                    continue;
                }
                self.v[i][j] = ax[i].fmadd(bx, self.v[i][j]);
            }
        }
    }

    /// `K`-step accumulation `tile += alpha * A(:, 0:K) * B(0:K, :)`, walking
    /// `pa` along columns and `pb` along rows one step at a time.
    ///
    /// # Safety
    /// `pa`/`pb` must remain valid for `column`/`row` loads through all `k`
    /// steps of `hmove`/`vmove`.
    pub unsafe fn gemm_accumulate<PA: MatrixPointer<T>, PB: MatrixPointer<T>>(
        &mut self,
        k_steps: usize,
        alpha: T,
        mut pa: PA,
        mut pb: PB,
    ) {
        for _ in 0..k_steps {
            self.ger(alpha, column(pa), row(pb));
            pa.hmove(1);
            pb.vmove(1);
        }
    }

    /// Size-limited `K`-step accumulation.
    ///
    /// # Safety
    /// Same as [`RegisterTile::gemm_accumulate`], restricted to the
    /// in-range entries.
    pub unsafe fn gemm_accumulate_partial<PA: MatrixPointer<T>, PB: MatrixPointer<T>>(
        &mut self,
        k_steps: usize,
        alpha: T,
        mut pa: PA,
        mut pb: PB,
        m: usize,
        n: usize,
    ) {
        for _ in 0..k_steps {
            self.ger_partial(alpha, column(pa), row(pb), m, n);
            pa.hmove(1);
            pb.vmove(1);
        }
    }

    /// In-place Cholesky factorization of the leading `N x N` block
    /// (requires `rows() >= N`). No pivoting; undefined (NaN-propagating) if
    /// the input is not positive definite.
    pub fn potrf(&mut self)
    where
        T::Vector: IndexLane<T>,
    {
        self.potrf_partial(N);
    }

    /// Size-limited [`RegisterTile::potrf`]: factors only the leading `n`
    /// columns (`n <= N`), leaving columns `>= n` untouched. Needed when a
    /// driver's diagonal block isn't an exact multiple of a tile dimension —
    /// without it the unfactored padding columns would divide by zero.
    pub fn potrf_partial(&mut self, n: usize)
    where
        T::Vector: IndexLane<T>,
    {
        let n = n.min(N);
        assert!(Self::rows() >= n, "potrf: tile must have rows() >= n");

        for k in 0..n {
            for j in 0..k {
                let a_kj = self.get_lane(k / Self::LANES, j, k % Self::LANES);
                let a_kj_v = T::Vector::broadcast(a_kj);

                for i in (k / Self::LANES)..RM {
                    self.v[i][k] = a_kj_v.fnmadd(self.v[i][j], self.v[i][k]);
                }
            }

            let diag = self.get_lane(k / Self::LANES, k, k % Self::LANES);
            let sqrt_diag = diag.sqrt();

            for i in 0..RM {
                if i < k / Self::LANES {
                    self.v[i][k] = T::Vector::zero();
                } else {
                    self.v[i][k] = self.v[i][k] / T::Vector::broadcast(sqrt_diag);
                }
            }
        }
    }

    /// Solve `X * A = tile` in place for upper-triangular `A`, writing the
    /// solution `X` back into `tile` (spec.md §4.3 TRSM, `Right, Upper`
    /// case — the only side/uplo combination implemented at this layer).
    ///
    /// # Safety
    /// `a.at(k, j)` must be valid for a scalar read for every referenced
    /// `(k, j)` with `k <= j < N`.
    pub unsafe fn trsm_right_upper<PA: MatrixPointer<T>>(&mut self, a: PA) {
        for j in 0..N {
            for k in 0..j {
                let a_kj = a.unaligned().at(k as isize, j as isize).broadcast();
                for i in 0..RM {
                    self.v[i][j] = a_kj.fnmadd(self.v[i][k], self.v[i][j]);
                }
            }

            let a_jj = a.unaligned().at(j as isize, j as isize).broadcast();
            for i in 0..RM {
                self.v[i][j] = self.v[i][j] / a_jj;
            }
        }
    }

    /// `tile += alpha * A * B`, `A` upper-triangular `rows() x rows()`, `B`
    /// general `rows() x N`.
    ///
    /// # Safety
    /// `a`/`b` must remain valid through `rows()` steps of `hmove`/`vmove`.
    pub unsafe fn trmm_left_upper<PA: MatrixPointer<T>, PB: MatrixPointer<T>>(
        &mut self,
        alpha: T,
        mut a: PA,
        mut b: PB,
    ) {
        let alpha_v = T::Vector::broadcast(alpha);

        for _k in 0..Self::rows() {
            let mut ax = [T::Vector::zero(); RM];
            let ii = (_k + 1) / Self::LANES;
            let rem = (_k + 1) % Self::LANES;

            for i in 0..ii {
                ax[i] = alpha_v * a.at((Self::LANES * i) as isize, 0).load();
            }

            if rem != 0 {
                let mask = T::Vector::lanes_below(rem);
                ax[ii] = alpha_v * a.at((Self::LANES * ii) as isize, 0).load_masked(mask);
            }

            for j in 0..N {
                let bx = b.at(0, j as isize).broadcast();

                for i in 0..ii {
                    self.v[i][j] = ax[i].fmadd(bx, self.v[i][j]);
                }
                if rem != 0 {
                    self.v[ii][j] = ax[ii].fmadd(bx, self.v[ii][j]);
                }
            }

            a.hmove(1);
            b.vmove(1);
        }
    }

    /// `tile += alpha * B * A`, `A` lower-triangular `N x N`, `B` general
    /// `rows() x N`.
    ///
    /// # Safety
    /// `b`/`a` must remain valid through `N` steps of `hmove`/`vmove`.
    pub unsafe fn trmm_right_lower<PB: MatrixPointer<T>, PA: MatrixPointer<T>>(
        &mut self,
        alpha: T,
        mut b: PB,
        mut a: PA,
    ) {
        let alpha_v = T::Vector::broadcast(alpha);

        for k in 0..N {
            let mut bx = [T::Vector::zero(); RM];
            for i in 0..RM {
                bx[i] = alpha_v * b.at((Self::LANES * i) as isize, 0).load();
            }

            for j in 0..=k {
                let ax = a.at(0, j as isize).broadcast();
                for i in 0..RM {
                    self.v[i][j] = bx[i].fmadd(ax, self.v[i][j]);
                }
            }

            b.hmove(1);
            a.vmove(1);
        }
    }

    /// Size-limited [`RegisterTile::trsm_right_upper`], solving only the
    /// leading `n` columns (columns `>= n` are left untouched).
    ///
    /// # Safety
    /// Same as [`RegisterTile::trsm_right_upper`], restricted to `0..n`.
    pub unsafe fn trsm_right_upper_partial<PA: MatrixPointer<T>>(&mut self, a: PA, n: usize) {
        for j in 0..n.min(N) {
            for k in 0..j {
                let a_kj = a.unaligned().at(k as isize, j as isize).broadcast();
                for i in 0..RM {
                    self.v[i][j] = a_kj.fnmadd(self.v[i][k], self.v[i][j]);
                }
            }

            let a_jj = a.unaligned().at(j as isize, j as isize).broadcast();
            for i in 0..RM {
                self.v[i][j] = self.v[i][j] / a_jj;
            }
        }
    }

    /// Size-limited [`RegisterTile::trmm_left_upper`], touching only the
    /// leading `n` columns of `B`/the tile.
    ///
    /// # Safety
    /// Same as [`RegisterTile::trmm_left_upper`].
    pub unsafe fn trmm_left_upper_partial<PA: MatrixPointer<T>, PB: MatrixPointer<T>>(
        &mut self,
        alpha: T,
        mut a: PA,
        mut b: PB,
        n: usize,
    ) {
        let alpha_v = T::Vector::broadcast(alpha);
        let n = n.min(N);

        for _k in 0..Self::rows() {
            let mut ax = [T::Vector::zero(); RM];
            let ii = (_k + 1) / Self::LANES;
            let rem = (_k + 1) % Self::LANES;

            for i in 0..ii {
                ax[i] = alpha_v * a.at((Self::LANES * i) as isize, 0).load();
            }

            if rem != 0 {
                let mask = T::Vector::lanes_below(rem);
                ax[ii] = alpha_v * a.at((Self::LANES * ii) as isize, 0).load_masked(mask);
            }

            for j in 0..n {
                let bx = b.at(0, j as isize).broadcast();

                for i in 0..ii {
                    self.v[i][j] = ax[i].fmadd(bx, self.v[i][j]);
                }
                if rem != 0 {
                    self.v[ii][j] = ax[ii].fmadd(bx, self.v[ii][j]);
                }
            }

            a.hmove(1);
            b.vmove(1);
        }
    }

    /// Size-limited [`RegisterTile::trmm_right_lower`], touching only the
    /// leading `n` columns of `A`/the tile.
    ///
    /// # Safety
    /// Same as [`RegisterTile::trmm_right_lower`].
    pub unsafe fn trmm_right_lower_partial<PB: MatrixPointer<T>, PA: MatrixPointer<T>>(
        &mut self,
        alpha: T,
        mut b: PB,
        mut a: PA,
        n: usize,
    ) {
        let alpha_v = T::Vector::broadcast(alpha);
        let n = n.min(N);

        for k in 0..n {
            let mut bx = [T::Vector::zero(); RM];
            for i in 0..RM {
                bx[i] = alpha_v * b.at((Self::LANES * i) as isize, 0).load();
            }

            for j in 0..=k {
                let ax = a.at(0, j as isize).broadcast();
                for i in 0..RM {
                    self.v[i][j] = bx[i].fmadd(ax, self.v[i][j]);
                }
            }

            b.hmove(1);
            a.vmove(1);
        }
    }

    #[inline]
    fn get_lane(&self, ri: usize, j: usize, lane: usize) -> T
    where
        T::Vector: IndexLane<T>,
    {
        self.v[ri][j].lane(lane)
    }
}

/// Scalar lane access used only by `potrf` (diagonal pivot) and tests. Not on
/// the hot path — implemented via a round-trip through memory rather than a
/// dedicated extract instruction, since it is only ever called `O(N)` times
/// per tile, not per inner-loop iteration.
pub trait IndexLane<T> {
    fn lane(&self, i: usize) -> T;
}

impl<V: Simd> IndexLane<V::Elem> for V {
    fn lane(&self, i: usize) -> V::Elem {
        let mut buf = [V::Elem::ZERO; 64];
        debug_assert!(i < Self::LANES);
        // SAFETY: `buf` has room for up to 64 lanes, far beyond any real
        // target's native width; `store_unaligned` writes exactly `LANES`.
        unsafe { self.store_unaligned(buf.as_mut_ptr()) };
        buf[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::StorageOrder;
    use crate::storage::DynamicPanelMatrix;

    /// Property 1 (load/store round-trip): packing a random dense matrix,
    /// loading into a tile, storing into a panel buffer, unpacking, and
    /// comparing to the original must be bit-for-bit exact.
    #[test]
    fn load_store_round_trips_bit_for_bit() {
        let (m, n) = (RegisterTile::<f64, 2, 3>::rows(), RegisterTile::<f64, 2, 3>::columns());
        let dense: Vec<f64> = (0..m * n).map(|x| (x as f64) * 0.25 - 3.0).collect();

        let mut src = DynamicPanelMatrix::<f64>::zero(m, n);
        src.pack_from(&dense, m, StorageOrder::ColumnMajor).unwrap();
        let mut dst = DynamicPanelMatrix::<f64>::zero(m, n);

        let mut tile = RegisterTile::<f64, 2, 3>::new();
        // SAFETY: both panels are exactly `m x n`, matching the tile's shape.
        unsafe {
            tile.load(src.ptr());
            tile.store(dst.ptr());
        }

        let mut out = vec![0.0; m * n];
        dst.unpack_to(&mut out, m, StorageOrder::ColumnMajor).unwrap();

        for (orig, round_tripped) in dense.iter().zip(out.iter()) {
            assert_eq!(orig.to_bits(), round_tripped.to_bits(), "expected {orig}, got {round_tripped}");
        }
    }

    /// Property 2 (partial store zero-fill): after `store_partial(p, m, n)`,
    /// elements with `i >= m` or `j >= n` in the destination are unchanged
    /// from their prior value; elements within the region match the tile.
    #[test]
    fn store_partial_leaves_elements_outside_the_region_untouched() {
        type Tile = RegisterTile<f64, 2, 3>;
        let (full_m, full_n) = (Tile::rows(), Tile::columns());
        // Pick a ragged region: not a multiple of LANES, not the full tile.
        let (m, n) = (full_m - 1, full_n - 1);

        let dense: Vec<f64> = (0..full_m * full_n).map(|x| (x as f64) * 0.5 + 1.0).collect();
        let sentinel = -999.0_f64;
        let before: Vec<f64> = vec![sentinel; full_m * full_n];

        let mut src = DynamicPanelMatrix::<f64>::zero(full_m, full_n);
        src.pack_from(&dense, full_m, StorageOrder::ColumnMajor).unwrap();
        let mut dst = DynamicPanelMatrix::<f64>::zero(full_m, full_n);
        dst.pack_from(&before, full_m, StorageOrder::ColumnMajor).unwrap();

        let mut tile = Tile::new();
        // SAFETY: `src` is `full_m x full_n`, big enough for a full load;
        // `dst` is the same shape, big enough for the `(m, n)` partial store.
        unsafe {
            tile.load(src.ptr());
            tile.store_partial(dst.ptr(), m, n);
        }

        let mut out = vec![0.0; full_m * full_n];
        dst.unpack_to(&mut out, full_m, StorageOrder::ColumnMajor).unwrap();

        for j in 0..full_n {
            for i in 0..full_m {
                let idx = i + j * full_m;
                if i < m && j < n {
                    assert_eq!(out[idx], dense[idx], "expected tile value at ({i},{j})");
                } else {
                    assert_eq!(out[idx], sentinel, "element ({i},{j}) outside ({m},{n}) was overwritten");
                }
            }
        }
    }
}
