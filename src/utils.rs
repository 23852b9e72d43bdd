use core::ptr;

use crate::error::TryReserveError;

// Emits a `tracing` event at TRACE level. Expands to nothing without the
// `tracing` feature.
macro_rules! trace_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    };
}

/// Moves `count` live elements from `src` into the uninitialized slots at `dst`.
///
/// A Rust move is a bitwise copy that cannot fail, so relocation always moves;
/// no element is ever cloned here and nothing can unwind halfway through.
/// After the call the slots at `src` are logically uninitialized: ownership
/// travelled with the bytes, so they must be freed without being dropped.
///
/// # Safety
///
/// `src` must point at `count` live elements, `dst` at `count` writable slots,
/// and the two ranges must not overlap.
#[inline]
pub(crate) unsafe fn relocate<T>(src: *const T, dst: *mut T, count: usize) {
    unsafe { ptr::copy_nonoverlapping(src, dst, count) };
}

/// Turns an allocation failure into the panic or abort the infallible
/// operations promise.
#[cold]
#[inline(never)]
pub(crate) fn handle_reserve_error(err: TryReserveError) -> ! {
    match err {
        TryReserveError::CapacityOverflow => panic!("capacity overflow"),
        TryReserveError::AllocError { layout } => alloc::alloc::handle_alloc_error(layout),
    }
}

/// Bumps a length counter once per element written, so that an unwinding
/// constructor leaves `len` covering exactly the elements already built.
pub(crate) struct SetLenOnDrop<'a> {
    len: &'a mut usize,
    local_len: usize,
}

impl<'a> SetLenOnDrop<'a> {
    #[inline]
    pub(crate) fn new(len: &'a mut usize) -> Self {
        SetLenOnDrop {
            local_len: *len,
            len,
        }
    }

    #[inline]
    pub(crate) fn current(&self) -> usize {
        self.local_len
    }

    #[inline]
    pub(crate) fn increment(&mut self) {
        self.local_len += 1;
    }
}

impl Drop for SetLenOnDrop<'_> {
    #[inline]
    fn drop(&mut self) {
        *self.len = self.local_len;
    }
}
