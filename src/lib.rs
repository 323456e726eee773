//! # `blastile`
//!
//! Register-tile dense linear-algebra micro-kernels: GEMM, TRSM, TRMM, GER,
//! and POTRF, monomorphic in `f32`/`f64`, for problem sizes where
//! dispatching to an external BLAS is not worth the call overhead.
//!
//! ## Layout
//!
//! - [`simd`] — the compile-time SIMD vector abstraction every kernel is
//!   written against (one backend per `(target, element type)` pair, chosen
//!   at compile time, never at runtime).
//! - [`pointer`] — [`pointer::MatrixPointer`], the trait unifying panel-packed
//!   and plain dense-strided addressing so the register tile and drivers
//!   don't need a separate code path per storage layout.
//! - [`tile`] — [`tile::RegisterTile`], the register-resident compute core:
//!   every FMA this crate issues happens inside one of its methods.
//! - [`storage`] — [`storage::StaticPanelMatrix`] and
//!   [`storage::DynamicPanelMatrix`], the cache-line-aligned panel-packed
//!   containers drivers operate on.
//! - [`driver`] — whole-matrix entry points (`gemm`, `trsm`, `trmm`, `ger`,
//!   `potrf`, `syrk`) that validate shapes and drive the register tile across
//!   an entire matrix.
//! - [`error`] — [`Error`]/[`Result`], this crate's only fallible surface;
//!   inner kernel preconditions are `debug_assert!`-guarded contract, not
//!   recoverable errors.
//!
//! ## Quick start
//!
//! ```rust
//! use blastile::driver::gemm;
//! use blastile::pointer::StorageOrder;
//! use blastile::storage::DynamicPanelMatrix;
//!
//! # fn main() -> blastile::Result<()> {
//! let a_dense = [1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0]; // 2x3, column-major
//! let b_dense = [1.0_f64, 0.0, 0.0, 1.0, 0.0, 1.0]; // 3x2, column-major
//!
//! let mut a = DynamicPanelMatrix::<f64>::zero(2, 3);
//! a.pack_from(&a_dense, 2, StorageOrder::ColumnMajor)?;
//! let mut b = DynamicPanelMatrix::<f64>::zero(3, 2);
//! b.pack_from(&b_dense, 3, StorageOrder::ColumnMajor)?;
//! let c = DynamicPanelMatrix::<f64>::zero(2, 2);
//! let mut d = DynamicPanelMatrix::<f64>::zero(2, 2);
//!
//! gemm(1.0, &a, &b, 0.0, &c, &mut d)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(
    test,
    allow(
        clippy::large_stack_arrays,
        clippy::doc_markdown,
        clippy::uninlined_format_args,
        clippy::single_match_else,
        clippy::cast_lossless,
        clippy::manual_assert
    )
)]

pub mod driver;
pub mod error;
pub mod pointer;
pub mod simd;
pub mod storage;
pub mod tile;

pub use error::{Error, Result};
pub use tile::RegisterTile;
