//! The segregated free-list state machine.
//!
//! One `FreeListPool` owns an array of per-size-class free-list heads plus
//! the registry of raw chunks backing them. A free block's first word holds
//! the link to the next free block of the same class; once handed out, the
//! same storage is the caller's payload. The pool itself is unsynchronized;
//! the wrappers in [`pool_resource`](crate::pool_resource) decide whether a
//! mutex guards it.

use std::alloc::Layout;
use std::ptr::{self, NonNull};

use crate::error::AllocError;
use crate::size_class::{list_index, round_up, ALIGN, MAX_BYTES, N_FREE_LISTS};

/// Number of nodes a refill tries to carve out of one chunk.
const REFILL_BATCH: usize = 20;

/// A free block viewed as a link.
#[repr(C)]
struct FreeNode {
    next: *mut FreeNode,
}

/// One raw allocation obtained from the system allocator.
///
/// Chunks are never split across size classes and never freed individually;
/// the registry drops them together when the pool goes away.
struct Chunk {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Chunk {
    /// Asks the system allocator for `size` bytes at pool alignment.
    /// Returns `None` on refusal.
    fn request(size: usize) -> Option<Chunk> {
        let layout = Layout::from_size_align(size, ALIGN).ok()?;
        // SAFETY: `size` is at least one rounded node, so the layout is
        // never zero-sized.
        let raw = unsafe { std::alloc::alloc(layout) };
        let ptr = NonNull::new(raw)?;
        Some(Chunk { ptr, layout })
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `std::alloc::alloc` with exactly this
        // layout, and a chunk is dropped at most once.
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// Segregated free-list pool state.
pub(crate) struct FreeListPool {
    /// One head per size class; null means empty.
    free_lists: [*mut FreeNode; N_FREE_LISTS],
    /// Chunks in acquisition order, released front to back on drop.
    chunks: Vec<Chunk>,
    /// Refills performed so far; each one registered exactly one chunk.
    refills: u64,
}

// SAFETY: every raw pointer stored in `free_lists` points into memory owned
// by `chunks`, so moving the pool to another thread moves exclusive
// ownership of everything those pointers reach.
unsafe impl Send for FreeListPool {}

impl FreeListPool {
    pub(crate) const fn new() -> Self {
        Self {
            free_lists: [ptr::null_mut(); N_FREE_LISTS],
            chunks: Vec::new(),
            refills: 0,
        }
    }

    /// Returns storage for `bytes` bytes aligned to `align`.
    ///
    /// Small requests pop the matching free list (refilling it when empty);
    /// large or over-aligned requests go straight to the system allocator
    /// and are not tracked by the chunk registry.
    pub(crate) fn allocate(
        &mut self,
        bytes: usize,
        align: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if bytes > MAX_BYTES || align > ALIGN {
            return allocate_large(bytes, align);
        }

        let rounded = round_up(bytes.max(1));
        let index = list_index(rounded);

        if let Some(head) = NonNull::new(self.free_lists[index]) {
            // SAFETY: every pointer on a free list refers to a free block of
            // at least `rounded` bytes inside a live chunk, and its first
            // word is the link to the next free block.
            self.free_lists[index] = unsafe { head.as_ref().next };
            return Ok(head.cast());
        }

        self.refill(rounded)
    }

    /// Returns storage previously obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `self.allocate(bytes, align)` with
    /// identical `bytes` and `align`, and must not be used afterwards.
    /// Mismatches are not detected.
    pub(crate) unsafe fn deallocate(&mut self, ptr: *mut u8, bytes: usize, align: usize) {
        if ptr.is_null() {
            return;
        }

        if bytes > MAX_BYTES || align > ALIGN {
            // Large blocks came straight from the system allocator and were
            // never registered; hand them back directly.
            // SAFETY: the matching allocate proved this layout valid, and
            // the caller promises the arguments match.
            unsafe {
                let layout = Layout::from_size_align_unchecked(bytes.max(1), align);
                std::alloc::dealloc(ptr, layout);
            }
            return;
        }

        let rounded = round_up(bytes.max(1));
        let index = list_index(rounded);
        let node = ptr.cast::<FreeNode>();
        // SAFETY: per the caller's promise this is a block of at least
        // `rounded >= ALIGN` bytes owned by this pool; writing the link
        // reuses its first word.
        unsafe {
            (*node).next = self.free_lists[index];
        }
        self.free_lists[index] = node;
    }

    /// Carves a fresh chunk into `REFILL_BATCH` nodes of `size` bytes (fewer
    /// under memory pressure), returning the first and threading the rest
    /// onto the matching free list.
    fn refill(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let mut n_obj = REFILL_BATCH;
        let chunk = self.chunk_alloc(size, &mut n_obj)?;
        self.refills += 1;

        if n_obj == 1 {
            return Ok(chunk);
        }

        let index = list_index(size);
        let base = chunk.as_ptr();
        // SAFETY: the chunk spans `n_obj * size` bytes, so every offset
        // `i * size` with `i < n_obj` is in bounds, and `size` is a multiple
        // of ALIGN so each node is sufficiently aligned for the link write.
        unsafe {
            let mut current = base.add(size).cast::<FreeNode>();
            self.free_lists[index] = current;
            for i in 2..n_obj {
                let next = base.add(i * size).cast::<FreeNode>();
                (*current).next = next;
                current = next;
            }
            (*current).next = ptr::null_mut();
        }

        Ok(chunk)
    }

    /// Acquires one chunk of `*n_obj * size` bytes, halving `*n_obj` each
    /// time the system allocator refuses. The single-node request failing
    /// too is the out-of-memory signal.
    fn chunk_alloc(&mut self, size: usize, n_obj: &mut usize) -> Result<NonNull<u8>, AllocError> {
        loop {
            match Chunk::request(size * *n_obj) {
                Some(chunk) => {
                    let ptr = chunk.ptr;
                    self.chunks.push(chunk);
                    return Ok(ptr);
                }
                None if *n_obj > 1 => *n_obj /= 2,
                None => {
                    return Err(AllocError {
                        bytes: size,
                        align: ALIGN,
                    })
                }
            }
        }
    }

    /// Chunks currently held for teardown.
    pub(crate) fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Refills performed over the pool's lifetime.
    pub(crate) fn refill_count(&self) -> u64 {
        self.refills
    }
}

/// Direct system-allocator path for `bytes > MAX_BYTES` or `align > ALIGN`.
/// The `Layout` carries the requested alignment, so over-aligned requests
/// are honoured.
fn allocate_large(bytes: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
    let Ok(layout) = Layout::from_size_align(bytes.max(1), align) else {
        return Err(AllocError { bytes, align });
    };
    // SAFETY: the layout is never zero-sized.
    let raw = unsafe { std::alloc::alloc(layout) };
    NonNull::new(raw).ok_or(AllocError { bytes, align })
}
