//! Test that rawseq works in a no_std environment.
//!
//! This crate verifies that the sequence compiles and works with only
//! `core` and `alloc` available.
//!
//! Build with: cargo build -p no-std-test --target thumbv7m-none-eabi

#![no_std]

extern crate alloc;

use alloc::string::String;

use rawseq::{Sequence, TryReserveError};

/// Test push, insert and erase work in no_std
pub fn test_mutation() -> bool {
    let mut seq = Sequence::new();
    seq.push(1u32);
    seq.push(2);
    seq.push(3);
    seq.insert(1, 9);
    if seq != [1, 9, 2, 3] {
        return false;
    }
    seq.erase(0);
    seq == [9, 2, 3] && seq.capacity() == 4
}

/// Test fallible growth reports errors instead of aborting in no_std
pub fn test_try_reserve() -> bool {
    let mut seq = Sequence::<u64>::new();
    if seq.try_reserve(8).is_err() || seq.capacity() != 8 {
        return false;
    }
    matches!(seq.try_reserve(usize::MAX), Err(TryReserveError::CapacityOverflow))
}

/// Test cloning and by-value iteration work in no_std
pub fn test_clone_roundtrip() -> bool {
    let mut original: Sequence<String> = Sequence::with_len(2);
    original[0].push_str("left");
    original[1].push_str("right");

    let copy = original.clone();
    let mut joined = String::new();
    for part in copy {
        joined.push_str(&part);
    }
    joined == "leftright" && original.len() == 2
}
