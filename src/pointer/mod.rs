//! Matrix pointer abstraction: decouples register-tile and driver code from
//! storage geometry.
//!
//! Two concrete pointer families implement [`MatrixPointer`], mirroring the
//! distinct `StaticPanelMatrixPointer`/`DynamicMatrixPointer` monomorphizations
//! of the original source rather than one type with every flag baked in:
//!
//! - [`DenseMatrixPointer`] walks a plain leading-dimension strided buffer.
//! - [`PanelMatrixPointer`] walks panel-packed storage, respecting panel
//!   boundaries in `hmove`/`vmove`.
//!
//! `ALIGNED` and `PADDED` are compile-time const generics, since the register
//! tile's load/store specialization needs them fixed at compile time.
//! `storage_order` is a runtime field: drivers build both a pointer and its
//! transpose from one call site, and threading storage order through the type
//! would force monomorphizing every driver twice for no benefit once inlined
//! (see `SPEC_FULL.md` §4 for the full rationale).

use crate::simd::{Simd, SimdElement};

/// Logical traversal order of a matrix's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOrder {
    ColumnMajor,
    RowMajor,
}

impl StorageOrder {
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            StorageOrder::ColumnMajor => StorageOrder::RowMajor,
            StorageOrder::RowMajor => StorageOrder::ColumnMajor,
        }
    }
}

/// Which side of `X` the triangular operand `A` appears on in a TRSM/TRMM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Whether a triangular operand's referenced half is upper or lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpLo {
    Lower,
    Upper,
}

/// A value-type handle into a matrix: base address, spacing, storage order,
/// and the compile-time alignment/padding guarantees the register tile relies
/// on to pick unmasked vs. masked load/store.
///
/// All offsetting methods return a new pointer; none mutate through `&self`.
/// `hmove`/`vmove` are the exception — they advance the pointer itself, used
/// by drivers stepping along the K dimension of a GEMM-style inner loop.
pub trait MatrixPointer<T: SimdElement>: Copy {
    /// Whether `get()` is always `LANES * size_of::<T>()`-aligned.
    const ALIGNED: bool;

    /// Whether a full-width load/store past the logical matrix edge is safe
    /// as long as it stays inside the allocated storage.
    const PADDED: bool;

    /// Same pointer family with `ALIGNED = false`, `PADDED` unchanged —
    /// the target-language expression of the source's `operator~`.
    type Unaligned: MatrixPointer<T>;

    fn storage_order(&self) -> StorageOrder;

    /// Offset by `(i, j)` in logical row/column indices.
    #[must_use]
    fn at(&self, i: isize, j: isize) -> Self;

    /// View over the transpose of the same memory: flips storage order only.
    #[must_use]
    fn trans(&self) -> Self;

    /// Drop the alignment guarantee.
    fn unaligned(&self) -> Self::Unaligned;

    /// Raw pointer to the currently pointed-to element.
    fn get(&self) -> *mut T;

    /// Advance along the major (column, for column-major storage) axis by
    /// `k` logical steps; for panel storage this respects panel boundaries.
    fn hmove(&mut self, k: isize);

    /// Advance along the minor (row, for column-major storage) axis by `k`
    /// logical steps; for panel storage this respects panel boundaries.
    fn vmove(&mut self, k: isize);

    /// Load a full SIMD vector at the pointed address.
    ///
    /// # Safety
    /// `get()` must be valid for reads of `LANES` elements (or, if
    /// `PADDED`, valid up to the end of the allocated panel).
    #[inline]
    unsafe fn load(&self) -> T::Vector {
        if Self::ALIGNED {
            T::Vector::load_aligned(self.get())
        } else {
            T::Vector::load_unaligned(self.get())
        }
    }

    /// Masked load; lanes where `mask` is false are zero.
    ///
    /// # Safety
    /// Same as [`MatrixPointer::load`].
    #[inline]
    unsafe fn load_masked(&self, mask: <T::Vector as Simd>::Mask) -> T::Vector {
        T::Vector::masked_load(self.get(), mask)
    }

    /// Store a full SIMD vector. Requires `ALIGNED`.
    ///
    /// # Safety
    /// `get()` must be valid for writes of `LANES` elements and aligned.
    #[inline]
    unsafe fn store(&self, v: T::Vector) {
        debug_assert!(Self::ALIGNED, "store() requires an aligned pointer");
        T::Vector::store_aligned(self.get(), v);
    }

    /// Masked store. Requires `ALIGNED`.
    ///
    /// # Safety
    /// Same as [`MatrixPointer::store`].
    #[inline]
    unsafe fn store_masked(&self, v: T::Vector, mask: <T::Vector as Simd>::Mask) {
        debug_assert!(Self::ALIGNED, "store_masked() requires an aligned pointer");
        T::Vector::masked_store(self.get(), v, mask);
    }

    /// Read the single scalar at the pointed address.
    ///
    /// # Safety
    /// `get()` must be valid for one read.
    #[inline]
    unsafe fn read(&self) -> T {
        *self.get()
    }

    /// Load the pointed scalar broadcast into every lane.
    ///
    /// # Safety
    /// `get()` must be valid for one read.
    #[inline]
    unsafe fn broadcast(&self) -> T::Vector {
        T::Vector::broadcast(self.read())
    }
}

#[inline]
fn is_lane_aligned<T>(ptr: *const T, lanes: usize) -> bool {
    (ptr as usize) % (lanes * std::mem::size_of::<T>()) == 0
}

// =============================================================================
// Dense (leading-dimension strided) matrix pointer
// =============================================================================

/// Pointer over a plain strided buffer with leading dimension `spacing`.
#[derive(Debug, Clone, Copy)]
pub struct DenseMatrixPointer<T, const ALIGNED: bool> {
    ptr: *mut T,
    spacing: isize,
    storage_order: StorageOrder,
}

impl<T: SimdElement, const ALIGNED: bool> DenseMatrixPointer<T, ALIGNED> {
    /// Build a pointer at the matrix origin.
    ///
    /// # Safety
    /// `ptr` must be valid over the full extent the caller will index with
    /// `at`/`hmove`/`vmove`; if `ALIGNED`, `ptr` must be lane-aligned.
    pub unsafe fn new(ptr: *mut T, spacing: usize, storage_order: StorageOrder) -> Self {
        let lanes = T::Vector::LANES;
        debug_assert!(
            !ALIGNED || is_lane_aligned(ptr, lanes),
            "DenseMatrixPointer::new: pointer is not lane-aligned"
        );
        Self {
            ptr,
            spacing: spacing as isize,
            storage_order,
        }
    }
}

impl<T: SimdElement, const ALIGNED: bool> MatrixPointer<T> for DenseMatrixPointer<T, ALIGNED> {
    const ALIGNED: bool = ALIGNED;
    const PADDED: bool = false;
    type Unaligned = DenseMatrixPointer<T, false>;

    #[inline]
    fn storage_order(&self) -> StorageOrder {
        self.storage_order
    }

    #[inline]
    fn at(&self, i: isize, j: isize) -> Self {
        let offset = match self.storage_order {
            StorageOrder::ColumnMajor => i + self.spacing * j,
            StorageOrder::RowMajor => self.spacing * i + j,
        };
        Self {
            // SAFETY: offset stays within the extent the caller guaranteed at `new`.
            ptr: unsafe { self.ptr.offset(offset) },
            spacing: self.spacing,
            storage_order: self.storage_order,
        }
    }

    #[inline]
    fn trans(&self) -> Self {
        Self {
            ptr: self.ptr,
            spacing: self.spacing,
            storage_order: self.storage_order.flip(),
        }
    }

    #[inline]
    fn unaligned(&self) -> Self::Unaligned {
        DenseMatrixPointer {
            ptr: self.ptr,
            spacing: self.spacing,
            storage_order: self.storage_order,
        }
    }

    #[inline]
    fn get(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    fn hmove(&mut self, k: isize) {
        let delta = match self.storage_order {
            StorageOrder::ColumnMajor => self.spacing * k,
            StorageOrder::RowMajor => k,
        };
        // SAFETY: caller-guaranteed extent, per `new`.
        self.ptr = unsafe { self.ptr.offset(delta) };
    }

    #[inline]
    fn vmove(&mut self, k: isize) {
        let delta = match self.storage_order {
            StorageOrder::RowMajor => self.spacing * k,
            StorageOrder::ColumnMajor => k,
        };
        // SAFETY: caller-guaranteed extent, per `new`.
        self.ptr = unsafe { self.ptr.offset(delta) };
    }
}

// =============================================================================
// Panel-packed matrix pointer
// =============================================================================

/// Pointer over panel-packed storage (see `spec.md` §3). `spacing` is the
/// stride between consecutive panel rows (column-major) or panel columns
/// (row-major), i.e. the owning container's `spacing()`.
#[derive(Debug, Clone, Copy)]
pub struct PanelMatrixPointer<T, const ALIGNED: bool, const PADDED: bool> {
    ptr: *mut T,
    spacing: isize,
    storage_order: StorageOrder,
}

impl<T: SimdElement, const ALIGNED: bool, const PADDED: bool>
    PanelMatrixPointer<T, ALIGNED, PADDED>
{
    /// Build a pointer at logical element `(i, j)` of a panel-packed matrix
    /// whose panel-row stride is `spacing`.
    ///
    /// # Safety
    /// `p00` must be the container's base pointer and valid over its full
    /// panel-packed extent; if `ALIGNED`, `p00` must be lane-aligned.
    pub unsafe fn new(
        p00: *mut T,
        spacing: usize,
        storage_order: StorageOrder,
        i: isize,
        j: isize,
    ) -> Self {
        let lanes = T::Vector::LANES;
        debug_assert!(
            !ALIGNED || is_lane_aligned(p00, lanes),
            "PanelMatrixPointer::new: base pointer is not lane-aligned"
        );
        let base = Self {
            ptr: p00,
            spacing: spacing as isize,
            storage_order,
        };
        base.at(i, j)
    }
}

impl<T: SimdElement, const ALIGNED: bool, const PADDED: bool> MatrixPointer<T>
    for PanelMatrixPointer<T, ALIGNED, PADDED>
{
    const ALIGNED: bool = ALIGNED;
    const PADDED: bool = PADDED;
    type Unaligned = PanelMatrixPointer<T, false, PADDED>;

    #[inline]
    fn storage_order(&self) -> StorageOrder {
        self.storage_order
    }

    #[inline]
    fn at(&self, i: isize, j: isize) -> Self {
        let lanes = T::Vector::LANES as isize;
        let offset = match self.storage_order {
            StorageOrder::ColumnMajor => i.div_euclid(lanes) * self.spacing + i.rem_euclid(lanes) + j * lanes,
            StorageOrder::RowMajor => i * lanes + j.div_euclid(lanes) * self.spacing + j.rem_euclid(lanes),
        };
        Self {
            // SAFETY: offset stays within the container's panel-packed extent.
            ptr: unsafe { self.ptr.offset(offset) },
            spacing: self.spacing,
            storage_order: self.storage_order,
        }
    }

    #[inline]
    fn trans(&self) -> Self {
        Self {
            ptr: self.ptr,
            spacing: self.spacing,
            storage_order: self.storage_order.flip(),
        }
    }

    #[inline]
    fn unaligned(&self) -> Self::Unaligned {
        PanelMatrixPointer {
            ptr: self.ptr,
            spacing: self.spacing,
            storage_order: self.storage_order,
        }
    }

    #[inline]
    fn get(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    fn hmove(&mut self, k: isize) {
        let lanes = T::Vector::LANES as isize;
        let delta = match self.storage_order {
            StorageOrder::ColumnMajor => lanes * k,
            StorageOrder::RowMajor => self.spacing * k.div_euclid(lanes) + k.rem_euclid(lanes),
        };
        // SAFETY: caller-guaranteed panel-packed extent, per `new`.
        self.ptr = unsafe { self.ptr.offset(delta) };
    }

    #[inline]
    fn vmove(&mut self, k: isize) {
        let lanes = T::Vector::LANES as isize;
        let delta = match self.storage_order {
            StorageOrder::RowMajor => lanes * k,
            StorageOrder::ColumnMajor => self.spacing * k.div_euclid(lanes) + k.rem_euclid(lanes),
        };
        // SAFETY: caller-guaranteed panel-packed extent, per `new`.
        self.ptr = unsafe { self.ptr.offset(delta) };
    }
}

// =============================================================================
// Vector pointer projections (spec.md §4.2 `column(p)`, `row(p)`)
// =============================================================================

/// Column-vector view narrowed from a matrix pointer: indices run along rows
/// at a fixed column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnVectorPointer<T, P>(P, std::marker::PhantomData<T>);

/// Row-vector view narrowed from a matrix pointer: indices run along columns
/// at a fixed row.
#[derive(Debug, Clone, Copy)]
pub struct RowVectorPointer<T, P>(P, std::marker::PhantomData<T>);

/// Narrow a matrix pointer to the column vector at its current position.
#[must_use]
pub fn column<T: SimdElement, P: MatrixPointer<T>>(p: P) -> ColumnVectorPointer<T, P> {
    ColumnVectorPointer(p, std::marker::PhantomData)
}

/// Narrow a matrix pointer to the row vector at its current position.
#[must_use]
pub fn row<T: SimdElement, P: MatrixPointer<T>>(p: P) -> RowVectorPointer<T, P> {
    RowVectorPointer(p, std::marker::PhantomData)
}

impl<T: SimdElement, P: MatrixPointer<T>> ColumnVectorPointer<T, P> {
    /// Offset to row `i` of the column vector, returning the underlying
    /// matrix pointer positioned there.
    #[must_use]
    pub fn at(&self, i: isize) -> P {
        self.0.at(i, 0)
    }

    /// Load `LANES` contiguous rows starting at `i`.
    ///
    /// # Safety
    /// Same contract as [`MatrixPointer::load`] at `(i, 0)`.
    pub unsafe fn load(&self, i: isize) -> T::Vector {
        self.at(i).load()
    }

    /// Masked load of `LANES` rows starting at `i`.
    ///
    /// # Safety
    /// Same contract as [`MatrixPointer::load_masked`] at `(i, 0)`.
    pub unsafe fn load_masked(&self, i: isize, mask: <T::Vector as Simd>::Mask) -> T::Vector {
        self.at(i).load_masked(mask)
    }
}

impl<T: SimdElement, P: MatrixPointer<T>> RowVectorPointer<T, P> {
    /// Offset to column `j` of the row vector, returning the underlying
    /// matrix pointer positioned there.
    #[must_use]
    pub fn at(&self, j: isize) -> P {
        self.0.at(0, j)
    }

    /// Broadcast-load the scalar at column `j` into every lane.
    ///
    /// # Safety
    /// `self.at(j).get()` must be valid for one read.
    pub unsafe fn broadcast(&self, j: isize) -> T::Vector {
        self.at(j).broadcast()
    }
}
