//! ARM NEON backend: `f32` × 4 lanes (`F32x4`), `f64` × 2 lanes (`F64x2`).
//!
//! NEON is baseline on `aarch64` (no runtime feature probe needed, unlike
//! `x86_64`). NEON has no native masked-load/-store instruction, so masked
//! operations are synthesized lane-by-lane with `vgetq_lane`/`vsetq_lane`,
//! matching the reference `maskload`/`maskstore` helpers for `neon64` in the
//! original source this crate is grounded on.

use super::Simd;
use std::arch::aarch64::*;
use std::fmt;

// =============================================================================
// f32 x 4
// =============================================================================

#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct F32x4(float32x4_t);

impl fmt::Debug for F32x4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lanes = [0.0_f32; 4];
        unsafe { self.store_unaligned(lanes.as_mut_ptr()) };
        f.debug_tuple("F32x4").field(&lanes).finish()
    }
}

impl Simd for F32x4 {
    type Elem = f32;
    type Mask = [bool; 4];
    const LANES: usize = 4;

    #[inline]
    fn zero() -> Self {
        unsafe { Self(vdupq_n_f32(0.0)) }
    }

    #[inline]
    fn broadcast(value: f32) -> Self {
        unsafe { Self(vdupq_n_f32(value)) }
    }

    #[inline]
    unsafe fn load_unaligned(ptr: *const f32) -> Self {
        Self(vld1q_f32(ptr))
    }

    #[inline]
    unsafe fn load_aligned(ptr: *const f32) -> Self {
        Self(vld1q_f32(ptr))
    }

    #[inline]
    unsafe fn masked_load(ptr: *const f32, mask: Self::Mask) -> Self {
        let mut v = vdupq_n_f32(0.0);
        if mask[0] {
            v = vsetq_lane_f32::<0>(*ptr, v);
        }
        if mask[1] {
            v = vsetq_lane_f32::<1>(*ptr.add(1), v);
        }
        if mask[2] {
            v = vsetq_lane_f32::<2>(*ptr.add(2), v);
        }
        if mask[3] {
            v = vsetq_lane_f32::<3>(*ptr.add(3), v);
        }
        Self(v)
    }

    #[inline]
    unsafe fn store_unaligned(self, ptr: *mut f32) {
        vst1q_f32(ptr, self.0);
    }

    #[inline]
    unsafe fn store_aligned(self, ptr: *mut f32) {
        vst1q_f32(ptr, self.0);
    }

    #[inline]
    unsafe fn masked_store(self, ptr: *mut f32, mask: Self::Mask) {
        for lane in 0..4 {
            if mask[lane] {
                *ptr.add(lane) = get_lane_f32(self.0, lane);
            }
        }
    }

    #[inline]
    fn fmadd(self, b: Self, c: Self) -> Self {
        unsafe { Self(vfmaq_f32(c.0, self.0, b.0)) }
    }

    #[inline]
    fn fnmadd(self, b: Self, c: Self) -> Self {
        unsafe { Self(vfmsq_f32(c.0, self.0, b.0)) }
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(vmulq_f32(self.0, rhs.0)) }
    }

    #[inline]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(vdivq_f32(self.0, rhs.0)) }
    }

    #[inline]
    fn index_sequence() -> Self {
        unsafe { Self(vcvtq_f32_s32(vld1q_s32([0, 1, 2, 3].as_ptr()))) }
    }

    #[inline]
    fn lanes_below(count: usize) -> Self::Mask {
        std::array::from_fn(|i| i < count)
    }

    #[inline]
    fn lanes_at_or_above(count: usize) -> Self::Mask {
        std::array::from_fn(|i| i >= count)
    }

    #[inline]
    fn lanes_in_range(lo: usize, hi: usize) -> Self::Mask {
        std::array::from_fn(|i| i >= lo && i < hi)
    }

    #[inline]
    fn gt(self, rhs: Self) -> Self::Mask {
        std::array::from_fn(|i| unsafe { get_lane_f32(self.0, i) > get_lane_f32(rhs.0, i) })
    }

    #[inline]
    fn blend(self, b: Self, mask: Self::Mask) -> Self {
        let mut out = [0.0_f32; 4];
        for lane in 0..4 {
            out[lane] = unsafe {
                if mask[lane] {
                    get_lane_f32(b.0, lane)
                } else {
                    get_lane_f32(self.0, lane)
                }
            };
        }
        unsafe { Self::load_unaligned(out.as_ptr()) }
    }

    #[inline]
    fn abs(self) -> Self {
        unsafe { Self(vabsq_f32(self.0)) }
    }

    #[inline]
    fn max(self, rhs: Self) -> Self {
        unsafe { Self(vmaxq_f32(self.0, rhs.0)) }
    }

    #[inline]
    fn reduce_max(self) -> f32 {
        unsafe { vmaxvq_f32(self.0) }
    }
}

#[inline]
unsafe fn get_lane_f32(v: float32x4_t, lane: usize) -> f32 {
    match lane {
        0 => vgetq_lane_f32::<0>(v),
        1 => vgetq_lane_f32::<1>(v),
        2 => vgetq_lane_f32::<2>(v),
        _ => vgetq_lane_f32::<3>(v),
    }
}

// =============================================================================
// f64 x 2
// =============================================================================

#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct F64x2(float64x2_t);

impl fmt::Debug for F64x2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lanes = [0.0_f64; 2];
        unsafe { self.store_unaligned(lanes.as_mut_ptr()) };
        f.debug_tuple("F64x2").field(&lanes).finish()
    }
}

impl Simd for F64x2 {
    type Elem = f64;
    type Mask = [bool; 2];
    const LANES: usize = 2;

    #[inline]
    fn zero() -> Self {
        unsafe { Self(vdupq_n_f64(0.0)) }
    }

    #[inline]
    fn broadcast(value: f64) -> Self {
        unsafe { Self(vdupq_n_f64(value)) }
    }

    #[inline]
    unsafe fn load_unaligned(ptr: *const f64) -> Self {
        Self(vld1q_f64(ptr))
    }

    #[inline]
    unsafe fn load_aligned(ptr: *const f64) -> Self {
        Self(vld1q_f64(ptr))
    }

    #[inline]
    unsafe fn masked_load(ptr: *const f64, mask: Self::Mask) -> Self {
        let mut v = vdupq_n_f64(0.0);
        if mask[0] {
            v = vsetq_lane_f64::<0>(*ptr, v);
        }
        if mask[1] {
            v = vsetq_lane_f64::<1>(*ptr.add(1), v);
        }
        Self(v)
    }

    #[inline]
    unsafe fn store_unaligned(self, ptr: *mut f64) {
        vst1q_f64(ptr, self.0);
    }

    #[inline]
    unsafe fn store_aligned(self, ptr: *mut f64) {
        vst1q_f64(ptr, self.0);
    }

    #[inline]
    unsafe fn masked_store(self, ptr: *mut f64, mask: Self::Mask) {
        if mask[0] {
            *ptr = vgetq_lane_f64::<0>(self.0);
        }
        if mask[1] {
            *ptr.add(1) = vgetq_lane_f64::<1>(self.0);
        }
    }

    #[inline]
    fn fmadd(self, b: Self, c: Self) -> Self {
        unsafe { Self(vfmaq_f64(c.0, self.0, b.0)) }
    }

    #[inline]
    fn fnmadd(self, b: Self, c: Self) -> Self {
        unsafe { Self(vfmsq_f64(c.0, self.0, b.0)) }
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(vmulq_f64(self.0, rhs.0)) }
    }

    #[inline]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(vdivq_f64(self.0, rhs.0)) }
    }

    #[inline]
    fn index_sequence() -> Self {
        unsafe { Self(vld1q_f64([0.0, 1.0].as_ptr())) }
    }

    #[inline]
    fn lanes_below(count: usize) -> Self::Mask {
        [0 < count, 1 < count]
    }

    #[inline]
    fn lanes_at_or_above(count: usize) -> Self::Mask {
        [0 >= count, 1 >= count]
    }

    #[inline]
    fn lanes_in_range(lo: usize, hi: usize) -> Self::Mask {
        [0 >= lo && 0 < hi, 1 >= lo && 1 < hi]
    }

    #[inline]
    fn gt(self, rhs: Self) -> Self::Mask {
        unsafe {
            [
                vgetq_lane_f64::<0>(self.0) > vgetq_lane_f64::<0>(rhs.0),
                vgetq_lane_f64::<1>(self.0) > vgetq_lane_f64::<1>(rhs.0),
            ]
        }
    }

    #[inline]
    fn blend(self, b: Self, mask: Self::Mask) -> Self {
        unsafe {
            let lane0 = if mask[0] {
                vgetq_lane_f64::<0>(b.0)
            } else {
                vgetq_lane_f64::<0>(self.0)
            };
            let lane1 = if mask[1] {
                vgetq_lane_f64::<1>(b.0)
            } else {
                vgetq_lane_f64::<1>(self.0)
            };
            Self::load_unaligned([lane0, lane1].as_ptr())
        }
    }

    #[inline]
    fn abs(self) -> Self {
        unsafe { Self(vabsq_f64(self.0)) }
    }

    #[inline]
    fn max(self, rhs: Self) -> Self {
        unsafe { Self(vmaxq_f64(self.0, rhs.0)) }
    }

    #[inline]
    fn reduce_max(self) -> f64 {
        unsafe { vgetq_lane_f64::<0>(self.0).max(vgetq_lane_f64::<1>(self.0)) }
    }
}
