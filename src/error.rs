//! Allocation error type.

use core::alloc::Layout;
use core::fmt;

/// Errors reported by the fallible (`try_*`) operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested capacity does not fit in `isize::MAX` bytes.
    CapacityOverflow,
    /// The allocator could not provide a block.
    AllocError {
        /// Layout of the block that was requested.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow => {
                write!(f, "capacity overflow: requested capacity exceeds isize::MAX bytes")
            }
            Self::AllocError { layout } => {
                write!(
                    f,
                    "allocation failed: {} bytes with alignment {}",
                    layout.size(),
                    layout.align()
                )
            }
        }
    }
}

impl core::error::Error for TryReserveError {}
