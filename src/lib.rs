//! A growable, contiguous sequence built directly on raw allocated memory.
//!
//! The crate has two layers:
//!
//! - [`Arena<T, A>`](arena::Arena): an uninitialized block sized for a fixed
//!   number of `T`. It never constructs or drops elements.
//! - [`Sequence<T, A>`](containers::Sequence): owns one arena and tracks how
//!   many of its slots hold live elements. Growth, insertion and removal place
//!   and remove elements directly in the arena's memory.
//!
//! Allocation goes through the [`Allocator`] trait from `allocator-api2`, with
//! [`Global`] as the default.
//!
//! # Example
//!
//! ```
//! use rawseq::Sequence;
//!
//! let mut seq = Sequence::new();
//! seq.push(1);
//! seq.push(2);
//! seq.push(3);
//! assert_eq!(seq.capacity(), 4);
//!
//! seq.insert(1, 9);
//! assert_eq!(&seq[..], &[1, 9, 2, 3]);
//!
//! seq.erase(0);
//! assert_eq!(&seq[..], &[9, 2, 3]);
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![cfg_attr(feature = "nightly", feature(allocator_api))]

extern crate alloc;

#[macro_use]
mod utils;

pub mod arena;
pub mod containers;
pub mod error;
pub mod into_iter;

#[cfg(feature = "serde_support")]
pub mod serde;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use allocator_api2::alloc::{AllocError, Allocator, Global};
pub use arena::Arena;
pub use containers::Sequence;
pub use error::TryReserveError;
pub use into_iter::IntoIter;
