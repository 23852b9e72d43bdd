//! Raw, uninitialized storage for a fixed number of elements.
//!
//! An [`Arena`] owns one block obtained from an [`Allocator`] that is exactly
//! large enough for `capacity` values of `T`. It has no notion of which slots
//! hold constructed values: [`Sequence`](crate::Sequence) keeps that count and
//! must drop every live element before the arena holding it is dropped or
//! swapped away. Dropping an arena only frees the block.

use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use allocator_api2::alloc::{Allocator, Global};

use crate::error::TryReserveError;

/// Uninitialized memory for `capacity` elements of `T`.
///
/// `ptr` is `None` exactly when no block is held. Zero-sized types never
/// allocate and report a capacity of `usize::MAX`.
///
/// There is no `Clone`: two owners of one block would free it twice. Moving
/// out with [`core::mem::take`] leaves an empty arena behind.
pub struct Arena<T, A: Allocator = Global> {
    ptr: Option<NonNull<T>>,
    cap: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for Arena<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Arena<T, A> {}

const fn is_zst<T>() -> bool {
    mem::size_of::<T>() == 0
}

impl<T> Arena<T, Global> {
    /// An arena with no block.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Allocates a block for `capacity` elements from the global allocator.
    ///
    /// Aborts through `handle_alloc_error` if the allocator fails.
    pub fn allocate(capacity: usize) -> Self {
        Self::allocate_in(capacity, Global)
    }

    /// Allocates a block for `capacity` elements, reporting failure.
    pub fn try_allocate(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_allocate_in(capacity, Global)
    }
}

impl<T, A: Allocator> Arena<T, A> {
    /// An arena with no block that will allocate from `alloc`.
    pub const fn new_in(alloc: A) -> Self {
        Arena {
            ptr: None,
            cap: if is_zst::<T>() { usize::MAX } else { 0 },
            alloc,
            _marker: PhantomData,
        }
    }

    pub fn allocate_in(capacity: usize, alloc: A) -> Self {
        match Self::try_allocate_in(capacity, alloc) {
            Ok(arena) => arena,
            Err(err) => crate::utils::handle_reserve_error(err),
        }
    }

    /// Requests a block for exactly `capacity` elements.
    ///
    /// `capacity == 0` (or a zero-sized `T`) makes no allocator call.
    pub fn try_allocate_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        if capacity == 0 || is_zst::<T>() {
            return Ok(Self::new_in(alloc));
        }
        let layout = Layout::array::<T>(capacity).map_err(|_| TryReserveError::CapacityOverflow)?;
        let block = alloc
            .allocate(layout)
            .map_err(|_| TryReserveError::AllocError { layout })?;
        Ok(Arena {
            ptr: Some(block.cast::<T>()),
            cap: capacity,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Number of elements the block can hold.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Whether a block is currently held.
    #[inline]
    pub const fn is_allocated(&self) -> bool {
        self.ptr.is_some()
    }

    /// Start of the block, or a dangling well-aligned pointer when none is
    /// held.
    #[inline]
    pub const fn as_ptr(&self) -> *mut T {
        match self.ptr {
            Some(ptr) => ptr.as_ptr(),
            None => NonNull::dangling().as_ptr(),
        }
    }

    /// Address of slot `offset`.
    ///
    /// `offset == capacity` (one past the end) is allowed. Anything beyond is
    /// a caller bug and is only checked in debug builds.
    #[inline]
    pub fn slot(&self, offset: usize) -> *mut T {
        debug_assert!(
            offset <= self.cap,
            "slot {offset} out of range for arena of capacity {}",
            self.cap
        );
        self.as_ptr().wrapping_add(offset)
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Exchanges blocks, capacities and allocators. Never fails.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    fn current_layout(&self) -> Option<(NonNull<u8>, Layout)> {
        let ptr = self.ptr?;
        // The layout was valid when the block was allocated.
        let layout = unsafe {
            Layout::from_size_align_unchecked(mem::size_of::<T>() * self.cap, mem::align_of::<T>())
        };
        Some((ptr.cast(), layout))
    }
}

impl<T, A: Allocator + Default> Default for Arena<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, A: Allocator> Drop for Arena<T, A> {
    fn drop(&mut self) {
        if let Some((ptr, layout)) = self.current_layout() {
            unsafe { self.alloc.deallocate(ptr, layout) };
        }
    }
}

impl<T, A: Allocator> fmt::Debug for Arena<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("ptr", &self.as_ptr())
            .field("capacity", &self.cap)
            .finish()
    }
}
