//! The two pool resource variants.
//!
//! Both wrap one [`FreeListPool`]; they differ only in who serializes
//! access. The synchronized variant holds its mutex across the entire core
//! call, including the system-allocator interaction inside a refill, so the
//! chunk registry and the free lists always change together.

use std::cell::UnsafeCell;
use std::ptr::NonNull;

use parking_lot::Mutex;

use crate::error::AllocError;
use crate::pool::FreeListPool;
use crate::resource::{same_resource, MemoryResource};

/// Thread-safe pool resource: one mutex serializes every operation.
pub struct SynchronizedPoolResource {
    pool: Mutex<FreeListPool>,
}

impl SynchronizedPoolResource {
    /// Creates an empty resource: all list heads null, no chunks.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pool: Mutex::new(FreeListPool::new()),
        }
    }

    /// Chunks currently held for teardown.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.pool.lock().chunk_count()
    }

    /// Refills performed over the resource's lifetime.
    #[must_use]
    pub fn refill_count(&self) -> u64 {
        self.pool.lock().refill_count()
    }
}

impl Default for SynchronizedPoolResource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResource for SynchronizedPoolResource {
    fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.pool.lock().allocate(bytes, align)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, align: usize) {
        // SAFETY: contract forwarded from the trait.
        unsafe { self.pool.lock().deallocate(ptr, bytes, align) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_resource(self, other)
    }
}

/// Single-threaded pool resource: no lock, caller guarantees that no two
/// operations on the same resource overlap. The `UnsafeCell` keeps the type
/// `!Sync`, so the compiler enforces the single-thread part.
pub struct UnsynchronizedPoolResource {
    pool: UnsafeCell<FreeListPool>,
}

impl UnsynchronizedPoolResource {
    /// Creates an empty resource: all list heads null, no chunks.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pool: UnsafeCell::new(FreeListPool::new()),
        }
    }

    /// Chunks currently held for teardown.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.with_pool(FreeListPool::chunk_count)
    }

    /// Refills performed over the resource's lifetime.
    #[must_use]
    pub fn refill_count(&self) -> u64 {
        self.with_pool(FreeListPool::refill_count)
    }

    fn with_pool<R>(&self, f: impl FnOnce(&FreeListPool) -> R) -> R {
        // SAFETY: `!Sync` confines all access to one thread, and nothing in
        // the pool calls back out, so no overlapping borrow can exist.
        f(unsafe { &*self.pool.get() })
    }
}

impl Default for UnsynchronizedPoolResource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResource for UnsynchronizedPoolResource {
    fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: `!Sync` confines all access to one thread, and the pool
        // never reenters itself, so this is the only live borrow.
        let pool = unsafe { &mut *self.pool.get() };
        pool.allocate(bytes, align)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, align: usize) {
        // SAFETY: exclusive access as in `allocate`; pointer contract
        // forwarded from the trait.
        unsafe {
            let pool = &mut *self.pool.get();
            pool.deallocate(ptr, bytes, align);
        }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_resource(self, other)
    }
}
