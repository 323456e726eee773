//! Error types for whole-matrix driver entry points.
//!
//! Inner register-tile operations never return a `Result` — their
//! preconditions (shape, alignment) are contract, enforced with
//! `debug_assert!` and UB-by-contract in release builds, per spec. Only the
//! whole-matrix drivers in [`crate::driver`] validate shapes on entry and
//! report a recoverable error before touching memory.

use thiserror::Error;

/// Errors a whole-matrix driver can report before it has written any output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Operand dimensions do not satisfy the operation's required relations
    /// (e.g. `cols(A) != rows(B)` for GEMM).
    #[error("shape mismatch in {op}: {detail}")]
    ShapeMismatch {
        /// Name of the operation that rejected the shapes (`"gemm"`, `"trsm"`, ...).
        op: &'static str,
        /// Human-readable description of the mismatched dimensions.
        detail: String,
    },

    /// The side/uplo (or storage-order) combination requested is not
    /// implemented at the register-tile layer.
    #[error("unsupported combination in {op}: {detail}")]
    Unsupported {
        /// Name of the operation that rejected the request.
        op: &'static str,
        /// Which combination was requested and why it is unsupported.
        detail: String,
    },
}

/// Convenience alias used throughout the crate's public driver surface.
pub type Result<T> = std::result::Result<T, Error>;
