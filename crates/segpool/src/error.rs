//! Allocation failure type.

use thiserror::Error;

/// The system allocator refused a request, even after refill degradation.
///
/// The originating resource stays usable; only the failed operation is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("out of memory allocating {bytes} bytes (alignment {align})")]
pub struct AllocError {
    /// Requested size in bytes.
    pub bytes: usize,
    /// Requested alignment.
    pub align: usize,
}
