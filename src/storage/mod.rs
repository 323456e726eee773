//! Panel-packed matrix storage.
//!
//! Grounded on `StaticPanelMatrix`/`DynamicPanelMatrix` in the original
//! source (`examples/original_source/include/blast/math/panel/StaticPanelMatrix.hpp`,
//! `DynamicPanelMatrix.hpp`). A panel-packed matrix stores `LANES`-wide
//! panels contiguously so a [`crate::pointer::PanelMatrixPointer`] can load a
//! full register width with a single aligned instruction no matter where in
//! the matrix it sits. Padding elements (rows/columns beyond the logical
//! extent but inside the last panel) are kept zeroed, both to make masked
//! loads unnecessary on the padded fast path and to avoid denormal floats
//! from leftover garbage poisoning FMA throughput.
//!
//! Backing storage is a cache-line-aligned heap buffer rather than a plain
//! `Vec<T>` — `Vec`'s allocation is only aligned to `align_of::<T>()` (8
//! bytes for `f64`), which is not enough for `PanelMatrixPointer`'s aligned
//! loads/stores (32 bytes on the AVX2 backend).

use crate::error::{Error, Result};
use crate::pointer::{MatrixPointer, PanelMatrixPointer, StorageOrder};
use crate::simd::SimdElement;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Cache line size assumed for alignment of panel-packed storage. 64 bytes
/// covers every mainstream x86_64 and aarch64 target this crate compiles
/// SIMD backends for.
pub const CACHE_LINE_SIZE: usize = 64;

#[inline]
const fn div_ceil(a: usize, b: usize) -> usize {
    a / b + usize::from(a % b != 0)
}

/// Zero-initialized, cache-line-aligned heap buffer of `len` elements.
struct AlignedBuffer<T> {
    ptr: NonNull<T>,
    len: usize,
}

impl<T> AlignedBuffer<T> {
    fn layout(len: usize) -> Layout {
        Layout::from_size_align(len * std::mem::size_of::<T>(), CACHE_LINE_SIZE)
            .expect("panel matrix buffer layout overflow")
    }

    fn zeroed(len: usize) -> Self {
        if len == 0 {
            return Self {
                ptr: NonNull::dangling(),
                len: 0,
            };
        }
        let layout = Self::layout(len);
        // SAFETY: layout has non-zero size, cache-line alignment is a valid
        // power of two.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw.cast::<T>()) else {
            alloc::handle_alloc_error(layout);
        };
        Self { ptr, len }
    }

    fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` initialized elements of `T`
        // (zero-initialized at construction; `T` here is always `f32`/`f64`,
        // for which an all-zero bit pattern is a valid value).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: see `as_slice`; unique access via `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if self.len != 0 {
            // SAFETY: allocated with the same layout in `zeroed`.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), Self::layout(self.len)) };
        }
    }
}

// SAFETY: `AlignedBuffer<T>` owns its buffer exclusively; `T: Send + Sync`
// (guaranteed by `SimdElement`) makes the buffer itself `Send`/`Sync`.
unsafe impl<T: Send> Send for AlignedBuffer<T> {}
unsafe impl<T: Sync> Sync for AlignedBuffer<T> {}

/// Panel-packed matrix with compile-time-known dimensions, column-major.
///
/// Layout matches `StaticPanelMatrix<Type, M, N, columnMajor>`: `panels() =
/// ceil(M / LANES)` panels, each `spacing() = N * LANES` elements apart.
pub struct StaticPanelMatrix<T: SimdElement, const M: usize, const N: usize> {
    data: AlignedBuffer<T>,
}

impl<T: SimdElement, const M: usize, const N: usize> StaticPanelMatrix<T, M, N> {
    const LANES: usize = <T::Vector as crate::simd::Simd>::LANES;

    /// Panel count along the row axis.
    #[must_use]
    pub fn panels() -> usize {
        div_ceil(M, Self::LANES)
    }

    /// Element stride between consecutive panels.
    #[must_use]
    pub fn spacing() -> usize {
        N * Self::LANES
    }

    /// Zero-initialized matrix, including padding elements.
    #[must_use]
    pub fn zero() -> Self {
        let capacity = Self::panels() * Self::spacing();
        Self {
            data: AlignedBuffer::zeroed(capacity),
        }
    }

    #[must_use]
    pub fn rows() -> usize {
        M
    }

    #[must_use]
    pub fn columns() -> usize {
        N
    }

    fn element_index(&self, i: usize, j: usize) -> usize {
        i / Self::LANES * Self::spacing() + i % Self::LANES + j * Self::LANES
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data.as_slice()[self.element_index(i, j)]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let idx = self.element_index(i, j);
        self.data.as_mut_slice()[idx] = value;
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        self.data.as_slice()
    }

    #[must_use]
    pub fn data_mut(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    /// Aligned, padded panel pointer to the matrix origin.
    ///
    /// The pointer is formed from a shared reference the same way the
    /// original source's `ptr<aligned>(A, i, j)` works over a `const
    /// Matrix&` — reading through it is always sound; writing through it
    /// requires the caller to otherwise guarantee exclusivity. There is no
    /// separate mutable-pointer constructor: every driver in
    /// `crate::driver` obtains its output operand's pointer through this
    /// same method while holding `&mut DynamicPanelMatrix` (or `&mut
    /// StaticPanelMatrix`) at the call site, which is what actually
    /// establishes exclusivity, not the pointer type itself.
    ///
    /// # Safety
    /// The returned pointer is valid only as long as `self` is not moved or
    /// dropped.
    #[must_use]
    pub unsafe fn ptr(&self) -> PanelMatrixPointer<T, true, true> {
        PanelMatrixPointer::new(
            self.data.as_slice().as_ptr().cast_mut(),
            Self::spacing(),
            StorageOrder::ColumnMajor,
            0,
            0,
        )
    }

    /// Copy from a plain row-major or column-major dense buffer with leading
    /// dimension `ld`.
    pub fn pack_from(&mut self, src: &[T], ld: usize, order: StorageOrder) -> Result<()> {
        if src.len() < required_dense_len(M, N, ld, order) {
            return Err(Error::ShapeMismatch {
                op: "StaticPanelMatrix::pack_from",
                detail: format!("source buffer too small for {M}x{N}, ld={ld}"),
            });
        }
        for j in 0..N {
            for i in 0..M {
                let v = match order {
                    StorageOrder::ColumnMajor => src[i + ld * j],
                    StorageOrder::RowMajor => src[ld * i + j],
                };
                self.set(i, j, v);
            }
        }
        Ok(())
    }

    /// Copy into a plain dense buffer with leading dimension `ld`.
    pub fn unpack_to(&self, dst: &mut [T], ld: usize, order: StorageOrder) -> Result<()> {
        if dst.len() < required_dense_len(M, N, ld, order) {
            return Err(Error::ShapeMismatch {
                op: "StaticPanelMatrix::unpack_to",
                detail: format!("destination buffer too small for {M}x{N}, ld={ld}"),
            });
        }
        for j in 0..N {
            for i in 0..M {
                let v = self.get(i, j);
                match order {
                    StorageOrder::ColumnMajor => dst[i + ld * j] = v,
                    StorageOrder::RowMajor => dst[ld * i + j] = v,
                }
            }
        }
        Ok(())
    }
}

/// Panel-packed matrix with runtime dimensions, column-major.
///
/// Grounded on `DynamicPanelMatrix`; used by the whole-matrix drivers in
/// [`crate::driver`], which take `M`/`N`/`K` at call time rather than as
/// const generics.
pub struct DynamicPanelMatrix<T: SimdElement> {
    data: AlignedBuffer<T>,
    rows: usize,
    columns: usize,
    spacing: usize,
    panels: usize,
}

impl<T: SimdElement> DynamicPanelMatrix<T> {
    fn lanes() -> usize {
        <T::Vector as crate::simd::Simd>::LANES
    }

    /// Zero-initialized `rows x columns` panel-packed matrix, including
    /// padding elements.
    #[must_use]
    pub fn zero(rows: usize, columns: usize) -> Self {
        let lanes = Self::lanes();
        let panels = div_ceil(rows, lanes);
        let spacing = columns * lanes;
        Self {
            data: AlignedBuffer::zeroed(panels * spacing),
            rows,
            columns,
            spacing,
            panels,
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn spacing(&self) -> usize {
        self.spacing
    }

    #[must_use]
    pub fn panels(&self) -> usize {
        self.panels
    }

    fn element_index(&self, i: usize, j: usize) -> usize {
        let lanes = Self::lanes();
        i / lanes * self.spacing + i % lanes + j * lanes
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data.as_slice()[self.element_index(i, j)]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let idx = self.element_index(i, j);
        self.data.as_mut_slice()[idx] = value;
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        self.data.as_slice()
    }

    /// Aligned, padded panel pointer to the matrix origin. See
    /// [`StaticPanelMatrix::ptr`] for the shared-reference safety argument —
    /// the same "exclusivity comes from the caller holding `&mut Self`, not
    /// from a separate mutable-pointer type" contract applies here.
    ///
    /// # Safety
    /// The returned pointer is valid only as long as `self` is not moved or
    /// dropped.
    #[must_use]
    pub unsafe fn ptr(&self) -> PanelMatrixPointer<T, true, true> {
        PanelMatrixPointer::new(
            self.data.as_slice().as_ptr().cast_mut(),
            self.spacing,
            StorageOrder::ColumnMajor,
            0,
            0,
        )
    }

    /// Copy from a plain dense buffer with leading dimension `ld`.
    pub fn pack_from(&mut self, src: &[T], ld: usize, order: StorageOrder) -> Result<()> {
        if src.len() < required_dense_len(self.rows, self.columns, ld, order) {
            return Err(Error::ShapeMismatch {
                op: "DynamicPanelMatrix::pack_from",
                detail: format!(
                    "source buffer too small for {}x{}, ld={ld}",
                    self.rows, self.columns
                ),
            });
        }
        for j in 0..self.columns {
            for i in 0..self.rows {
                let v = match order {
                    StorageOrder::ColumnMajor => src[i + ld * j],
                    StorageOrder::RowMajor => src[ld * i + j],
                };
                self.set(i, j, v);
            }
        }
        Ok(())
    }

    /// Copy into a plain dense buffer with leading dimension `ld`.
    pub fn unpack_to(&self, dst: &mut [T], ld: usize, order: StorageOrder) -> Result<()> {
        if dst.len() < required_dense_len(self.rows, self.columns, ld, order) {
            return Err(Error::ShapeMismatch {
                op: "DynamicPanelMatrix::unpack_to",
                detail: format!(
                    "destination buffer too small for {}x{}, ld={ld}",
                    self.rows, self.columns
                ),
            });
        }
        for j in 0..self.columns {
            for i in 0..self.rows {
                let v = self.get(i, j);
                match order {
                    StorageOrder::ColumnMajor => dst[i + ld * j] = v,
                    StorageOrder::RowMajor => dst[ld * i + j] = v,
                }
            }
        }
        Ok(())
    }
}

fn required_dense_len(rows: usize, columns: usize, ld: usize, order: StorageOrder) -> usize {
    match order {
        StorageOrder::ColumnMajor => ld * columns.max(1) - ld + rows,
        StorageOrder::RowMajor => ld * rows.max(1) - ld + columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_panel_matrix_round_trips_through_pack_unpack() {
        let mut m = StaticPanelMatrix::<f64, 5, 3>::zero();
        let src: Vec<f64> = (0..15).map(|x| x as f64).collect();
        m.pack_from(&src, 5, StorageOrder::ColumnMajor).unwrap();

        let mut dst = vec![0.0_f64; 15];
        m.unpack_to(&mut dst, 5, StorageOrder::ColumnMajor).unwrap();
        assert_eq!(src, dst);
    }

    #[test]
    fn dynamic_panel_matrix_pack_rejects_undersized_source() {
        let mut m = DynamicPanelMatrix::<f32>::zero(4, 4);
        let src = vec![0.0_f32; 3];
        assert!(m.pack_from(&src, 4, StorageOrder::ColumnMajor).is_err());
    }

    #[test]
    fn static_panel_matrix_pads_with_zero() {
        let m = StaticPanelMatrix::<f64, 3, 2>::zero();
        assert!(m.data().iter().all(|&x| x == 0.0));
        assert_eq!(m.data().len(), StaticPanelMatrix::<f64, 3, 2>::panels() * StaticPanelMatrix::<f64, 3, 2>::spacing());
    }
}
