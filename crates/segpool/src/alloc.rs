//! Typed adapter over a polymorphic memory resource.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::error::AllocError;
use crate::resource::{default_resource, MemoryResource};

/// A copyable, rebindable allocator for values of `T` that forwards every
/// request to a [`MemoryResource`] it does not own.
///
/// Two allocators compare equal iff they reference the same resource, so
/// storage may only move between allocators that compare equal.
pub struct PoolAllocator<'r, T> {
    resource: &'r dyn MemoryResource,
    _element: PhantomData<fn() -> T>,
}

impl<T> PoolAllocator<'static, T> {
    /// Binds to the process-wide [`default_resource`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_resource(default_resource())
    }
}

impl<T> Default for PoolAllocator<'static, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r, T> PoolAllocator<'r, T> {
    /// Binds to `resource` without taking ownership.
    #[must_use]
    pub fn with_resource(resource: &'r dyn MemoryResource) -> Self {
        Self {
            resource,
            _element: PhantomData,
        }
    }

    /// Returns storage for `n` values of `T`, aligned for `T`.
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        let bytes = mem::size_of::<T>()
            .checked_mul(n)
            .ok_or(AllocError {
                bytes: usize::MAX,
                align: mem::align_of::<T>(),
            })?;
        let raw = self.resource.allocate(bytes, mem::align_of::<T>())?;
        Ok(raw.cast())
    }

    /// Returns storage obtained from [`allocate`](Self::allocate) with the
    /// same `n`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `self.allocate(n)` (or an equal
    /// allocator) with identical `n`, and must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: *mut T, n: usize) {
        let bytes = mem::size_of::<T>().wrapping_mul(n);
        // SAFETY: a successful allocate proved the product fits; pointer
        // contract forwarded from the caller.
        unsafe { self.resource.deallocate(ptr.cast(), bytes, mem::align_of::<T>()) }
    }

    /// The resource this allocator forwards to.
    #[must_use]
    pub fn resource(&self) -> &'r dyn MemoryResource {
        self.resource
    }

    /// The same allocator viewed at element type `U`.
    #[must_use]
    pub fn cast<U>(&self) -> PoolAllocator<'r, U> {
        PoolAllocator {
            resource: self.resource,
            _element: PhantomData,
        }
    }
}

impl<T> Clone for PoolAllocator<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolAllocator<'_, T> {}

impl<'a, 'b, T, U> PartialEq<PoolAllocator<'b, U>> for PoolAllocator<'a, T> {
    fn eq(&self, other: &PoolAllocator<'b, U>) -> bool {
        std::ptr::addr_eq(
            self.resource as *const dyn MemoryResource,
            other.resource as *const dyn MemoryResource,
        )
    }
}

impl<T> Eq for PoolAllocator<'_, T> {}

impl<T> fmt::Debug for PoolAllocator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field(
                "resource",
                &(self.resource as *const dyn MemoryResource as *const u8),
            )
            .finish()
    }
}
