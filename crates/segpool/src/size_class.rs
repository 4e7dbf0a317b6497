//! Size classes for the segregated free lists.
//!
//! Requests are rounded up to a multiple of `ALIGN` and served from one of
//! `N_FREE_LISTS` lists, one per multiple up to `MAX_BYTES`. Requests above
//! `MAX_BYTES` (or needing alignment above `ALIGN`) bypass the pool.

/// Alignment of every pooled block, and the granularity of size classes.
pub const ALIGN: usize = 8;

/// Largest request served from the pool.
pub const MAX_BYTES: usize = 128;

/// Number of free lists, one per `ALIGN` multiple up to `MAX_BYTES`.
pub const N_FREE_LISTS: usize = MAX_BYTES / ALIGN;

/// Rounds `bytes` up to the next multiple of [`ALIGN`].
#[must_use]
pub const fn round_up(bytes: usize) -> usize {
    (bytes + ALIGN - 1) & !(ALIGN - 1)
}

/// Free-list index for a request of `bytes` bytes, `1 <= bytes <= MAX_BYTES`.
///
/// `bytes` need not be rounded first: `list_index(9)` and `list_index(16)`
/// land on the same list.
#[must_use]
pub const fn list_index(bytes: usize) -> usize {
    (bytes + ALIGN - 1) / ALIGN - 1
}
