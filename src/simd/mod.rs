//! Compile-time SIMD vector abstraction.
//!
//! Every register-tile operation in this crate is written against the
//! [`Simd`] trait, never against a specific instruction set. Exactly one
//! concrete backend is compiled in for a given `(target, element type)` pair
//! — selection happens once, at compile time, via `cfg(target_feature)`, not
//! per call. A tile's inner loops must be branch-free straight-line SIMD with
//! no register spills, which rules out the runtime-dispatch pattern (cached
//! `OnceLock` + `is_x86_feature_detected!`) used for whole-vector distance
//! kernels elsewhere in this lineage.
//!
//! # Module structure
//!
//! - `x86_avx2` — 256-bit AVX2+FMA backend (`f32` × 8, `f64` × 4), `x86_64` only.
//! - `neon64` — 128-bit ARM NEON backend (`f32` × 4, `f64` × 2), `aarch64` only.
//! - `portable` — width-1 scalar fallback, always available.
//!
//! [`SimdElement::Vector`] resolves to whichever backend was selected for the
//! compiled target, so generic code over `T: SimdElement` never names a
//! backend directly.

#[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
mod x86_avx2;

#[cfg(target_arch = "aarch64")]
mod neon64;

mod portable;

/// A scalar type this crate can build register tiles over (`f32` or `f64`).
pub trait SimdElement:
    Copy + Clone + PartialEq + PartialOrd + std::fmt::Debug + Send + Sync + 'static
{
    /// The native SIMD vector type for this element on the compiled target.
    type Vector: Simd<Elem = Self>;

    /// Additive identity.
    const ZERO: Self;

    /// Multiplicative identity.
    const ONE: Self;

    fn sqrt(self) -> Self;
}

impl SimdElement for f32 {
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
    type Vector = x86_avx2::F32x8;

    #[cfg(all(target_arch = "aarch64", not(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))))]
    type Vector = neon64::F32x4;

    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"),
        target_arch = "aarch64"
    )))]
    type Vector = portable::ScalarF32;

    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline]
    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }
}

impl SimdElement for f64 {
    #[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
    type Vector = x86_avx2::F64x4;

    #[cfg(all(target_arch = "aarch64", not(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))))]
    type Vector = neon64::F64x2;

    #[cfg(not(any(
        all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"),
        target_arch = "aarch64"
    )))]
    type Vector = portable::ScalarF64;

    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
}

/// A compile-time-sized SIMD register holding `Self::LANES` lanes of `Elem`.
///
/// All operations are total: there is no failure mode at this layer (spec
/// §4.1). Pointer-taking operations are `unsafe` because the caller must
/// guarantee the pointer is valid for `LANES` elements (or, for the aligned
/// variants, aligned to `LANES * size_of::<Elem>()`).
pub trait Simd: Copy + Clone + std::fmt::Debug {
    /// Scalar element type held in each lane.
    type Elem: SimdElement<Vector = Self>;

    /// Lane-wise predicate mask produced by comparisons, consumed by
    /// `blend` and the masked load/store operations.
    type Mask: Copy + Clone;

    /// Number of lanes. `W` in spec terms.
    const LANES: usize;

    fn zero() -> Self;
    fn broadcast(value: Self::Elem) -> Self;

    /// Load `LANES` contiguous elements. No alignment requirement.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `LANES` elements.
    unsafe fn load_unaligned(ptr: *const Self::Elem) -> Self;

    /// Load `LANES` contiguous elements from an address known to be aligned
    /// to `LANES * size_of::<Elem>()`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `LANES` elements and aligned.
    unsafe fn load_aligned(ptr: *const Self::Elem) -> Self;

    /// Load lanes selected by `mask`; unselected lanes are zero.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `LANES` elements (masked-out lanes
    /// may still be touched by the underlying instruction on some targets).
    unsafe fn masked_load(ptr: *const Self::Elem, mask: Self::Mask) -> Self;

    /// Store `LANES` contiguous elements. No alignment requirement.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `LANES` elements.
    unsafe fn store_unaligned(self, ptr: *mut Self::Elem);

    /// Store `LANES` contiguous elements to an aligned address.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `LANES` elements and aligned.
    unsafe fn store_aligned(self, ptr: *mut Self::Elem);

    /// Store lanes selected by `mask`; unselected lanes of `ptr` are left
    /// untouched.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `LANES` elements.
    unsafe fn masked_store(self, ptr: *mut Self::Elem, mask: Self::Mask);

    /// `self * b + c`, one rounding.
    #[must_use]
    fn fmadd(self, b: Self, c: Self) -> Self;

    /// `c - self * b`, one rounding.
    #[must_use]
    fn fnmadd(self, b: Self, c: Self) -> Self;

    #[must_use]
    fn mul(self, rhs: Self) -> Self;

    #[must_use]
    fn div(self, rhs: Self) -> Self;

    /// `[0, 1, ..., LANES - 1]`.
    fn index_sequence() -> Self;

    /// Mask selecting lanes with index `< count` (lanes `0..count`).
    fn lanes_below(count: usize) -> Self::Mask;

    /// Mask selecting lanes with index `>= count`.
    fn lanes_at_or_above(count: usize) -> Self::Mask;

    /// Mask selecting lanes with index in `[lo, hi)`.
    fn lanes_in_range(lo: usize, hi: usize) -> Self::Mask;

    /// Lane-wise `self > rhs`.
    fn gt(self, rhs: Self) -> Self::Mask;

    /// Lane-wise select: `mask[i] ? b[i] : a[i]`, called as `a.blend(b, mask)`.
    fn blend(self, b: Self, mask: Self::Mask) -> Self;

    fn abs(self) -> Self;

    #[must_use]
    fn max(self, rhs: Self) -> Self;

    /// Horizontal maximum across all lanes.
    fn reduce_max(self) -> Self::Elem;
}

impl<V: Simd> std::ops::Mul for V {
    type Output = V;
    #[inline]
    fn mul(self, rhs: V) -> V {
        Simd::mul(self, rhs)
    }
}

impl<V: Simd> std::ops::Div for V {
    type Output = V;
    #[inline]
    fn div(self, rhs: V) -> V {
        Simd::div(self, rhs)
    }
}

impl<V: Simd> std::ops::MulAssign for V {
    #[inline]
    fn mul_assign(&mut self, rhs: V) {
        *self = Simd::mul(*self, rhs);
    }
}

impl<V: Simd> std::ops::DivAssign for V {
    #[inline]
    fn div_assign(&mut self, rhs: V) {
        *self = Simd::div(*self, rhs);
    }
}

/// Diagnostic label for the compiled-in backend, logged once at first use by
/// [`backend_name`]. Mirrors the informational role of the runtime
/// `SimdLevel` enum used for whole-vector distance dispatch elsewhere in this
/// lineage, but reflects a compile-time choice rather than a cached runtime
/// probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    X86Avx2,
    Neon64,
    Portable,
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
const COMPILED_BACKEND: Backend = Backend::X86Avx2;

#[cfg(all(target_arch = "aarch64", not(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))))]
const COMPILED_BACKEND: Backend = Backend::Neon64;

#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"),
    target_arch = "aarch64"
)))]
const COMPILED_BACKEND: Backend = Backend::Portable;

static BACKEND_LOGGED: std::sync::Once = std::sync::Once::new();

/// Returns the SIMD backend compiled into this build, logging it once.
#[inline]
#[must_use]
pub fn backend() -> Backend {
    BACKEND_LOGGED.call_once(|| {
        tracing::debug!(
            backend = ?COMPILED_BACKEND,
            f32_lanes = <f32 as SimdElement>::Vector::LANES,
            f64_lanes = <f64 as SimdElement>::Vector::LANES,
            "blastile: compiled-in SIMD backend"
        );
    });
    COMPILED_BACKEND
}
