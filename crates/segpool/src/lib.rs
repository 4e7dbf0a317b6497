//! Segregated free-list pool allocation behind a polymorphic resource API.
//!
//! Requests of up to [`MAX_BYTES`](size_class::MAX_BYTES) bytes at alignment
//! [`ALIGN`](size_class::ALIGN) or below are served from per-size-class free
//! lists threaded through the pooled memory itself; anything larger or more
//! strictly aligned goes straight to the system allocator. The raw chunks
//! backing the lists are retained for the resource's whole lifetime and
//! released in bulk when it is dropped.
//!
//! Two resource variants wrap the same core state machine:
//! [`SynchronizedPoolResource`] serializes every operation behind a mutex,
//! [`UnsynchronizedPoolResource`] leaves serialization to the caller. Both
//! implement [`MemoryResource`], and [`PoolAllocator`] adapts any resource
//! to a typed allocation interface.

pub mod alloc;
pub mod error;
mod pool;
pub mod pool_resource;
pub mod resource;
pub mod size_class;

pub use alloc::PoolAllocator;
pub use error::AllocError;
pub use pool_resource::{SynchronizedPoolResource, UnsynchronizedPoolResource};
pub use resource::{default_resource, MemoryResource, SystemResource};
