//! The growable sequence.
//!
//! [`Sequence<T, A>`] owns one [`Arena`] and a live count `len`. Slots
//! `[0, len)` hold constructed values, slots `[len, capacity)` are raw memory.
//! Every mutation first checks for spare capacity; when there is none it
//! allocates a larger arena, relocates the live elements into it and swaps the
//! arenas only after that has fully succeeded. At most one reallocation
//! happens per call.
//!
//! # Failure behaviour
//!
//! Element constructors (`Default`, `Clone`, user closures) may panic, and the
//! closure passed to [`Sequence::try_emplace`] may return an error. The
//! guarantees differ per operation:
//!
//! - Sized and cloned construction, the reallocating branch of
//!   [`Clone::clone_from`], [`Sequence::reserve`] and the relocating branch of
//!   insertion leave the sequence exactly as it was.
//! - The overlapping branch of `clone_from` assigns element by element. A
//!   panic part way leaves earlier slots holding new values and later slots
//!   holding old ones. Nothing leaks and nothing is dropped twice.
//! - In-place insertion builds the new value before touching any slot, then
//!   shifts with bitwise moves, so a failing constructor changes nothing.
//!
//! Relocation is a bitwise move and never runs user code, so `reserve` and
//! the relocating branch never clone.
//!
//! # Example
//!
//! ```
//! use rawseq::Sequence;
//!
//! let mut seq: Sequence<String> = Sequence::with_len(2);
//! seq[0].push_str("left");
//! seq.emplace(1, || String::from("middle"));
//! assert_eq!(&seq[..], &["left", "middle", ""]);
//! ```

use core::cmp;
use core::fmt::{self, Debug};
use core::mem::{self, ManuallyDrop};
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::slice;

use allocator_api2::alloc::{Allocator, Global};

use crate::arena::Arena;
use crate::error::TryReserveError;
use crate::utils::{SetLenOnDrop, handle_reserve_error, relocate};

pub struct Sequence<T, A: Allocator = Global> {
    buf: Arena<T, A>,
    len: usize,
}

impl<T> Sequence<T, Global> {
    /// An empty sequence. Does not allocate.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// `len` default-constructed elements in an arena of exactly `len` slots.
    ///
    /// If a `T::default()` call panics, the elements built so far are dropped,
    /// the arena is freed and the panic continues.
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        Self::with_len_in(len, Global)
    }

    pub fn try_with_len(len: usize) -> Result<Self, TryReserveError>
    where
        T: Default,
    {
        Self::try_with_len_in(len, Global)
    }

    pub fn from_slice(slice: &[T]) -> Self
    where
        T: Clone,
    {
        let mut seq = Self::with_capacity(slice.len());
        seq.extend_from_slice(slice);
        seq
    }
}

impl<T, A: Allocator> Sequence<T, A> {
    pub const fn new_in(alloc: A) -> Self {
        Sequence {
            buf: Arena::new_in(alloc),
            len: 0,
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Sequence {
            buf: Arena::allocate_in(capacity, alloc),
            len: 0,
        }
    }

    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        Ok(Sequence {
            buf: Arena::try_allocate_in(capacity, alloc)?,
            len: 0,
        })
    }

    pub fn with_len_in(len: usize, alloc: A) -> Self
    where
        T: Default,
    {
        match Self::try_with_len_in(len, alloc) {
            Ok(seq) => seq,
            Err(err) => handle_reserve_error(err),
        }
    }

    pub fn try_with_len_in(len: usize, alloc: A) -> Result<Self, TryReserveError>
    where
        T: Default,
    {
        let mut seq = Self::try_with_capacity_in(len, alloc)?;
        // Panics unwind through `seq`, whose drop cleans up the built prefix.
        unsafe { seq.construct_tail(len, T::default) };
        Ok(seq)
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Pointer to the first slot. Stable until the next reallocation.
    #[inline]
    pub const fn as_ptr(&self) -> *const T {
        self.buf.as_ptr()
    }

    #[inline]
    pub const fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Exchanges contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        self.buf.swap(&mut other.buf);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Removes and returns the last element, or `None` if empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { ptr::read(self.buf.slot(self.len)) })
    }

    /// Drops the element at `index`, shifting everything after it one slot
    /// toward the front.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn erase(&mut self, index: usize) {
        drop(self.remove(index));
    }

    /// Removes and returns the element at `index`, shifting everything after
    /// it one slot toward the front.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len;
        assert!(index < len, "index out of bounds: the len is {len} but the index is {index}");
        unsafe {
            let hole = self.buf.slot(index);
            let result = ptr::read(hole);
            ptr::copy(hole.add(1), hole, len - index - 1);
            self.len = len - 1;
            result
        }
    }

    /// Drops every element from `new_len` on. No-op if `new_len >= len`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        let tail = ptr::slice_from_raw_parts_mut(self.buf.slot(new_len), self.len - new_len);
        // Shrink first so a panicking destructor cannot cause a second drop.
        self.len = new_len;
        unsafe { ptr::drop_in_place(tail) };
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Splits into the arena and live count without dropping anything.
    pub(crate) fn into_raw_parts(self) -> (Arena<T, A>, usize) {
        let this = ManuallyDrop::new(self);
        let buf = unsafe { ptr::read(&this.buf) };
        (buf, this.len)
    }

    /// Writes values produced by `f` into `[len, new_len)`.
    ///
    /// `len` advances with every element, so a panic in `f` leaves exactly the
    /// built prefix live.
    ///
    /// # Safety
    ///
    /// `new_len` must not exceed the capacity.
    unsafe fn construct_tail(&mut self, new_len: usize, mut f: impl FnMut() -> T) {
        debug_assert!(new_len <= self.capacity());
        let base = self.buf.as_ptr();
        let mut guard = SetLenOnDrop::new(&mut self.len);
        while guard.current() < new_len {
            unsafe { base.add(guard.current()).write(f()) };
            guard.increment();
        }
    }
}

impl<T, A: Allocator + Clone> Sequence<T, A> {
    /// Grows the capacity to exactly `new_cap`. No-op if the capacity is
    /// already at least `new_cap`.
    ///
    /// Existing elements are moved into the new block, never cloned.
    pub fn reserve(&mut self, new_cap: usize) {
        if let Err(err) = self.try_reserve(new_cap) {
            handle_reserve_error(err);
        }
    }

    pub fn try_reserve(&mut self, new_cap: usize) -> Result<(), TryReserveError> {
        if new_cap <= self.capacity() {
            return Ok(());
        }
        let mut new_buf: Arena<T, A> =
            Arena::try_allocate_in(new_cap, self.buf.allocator().clone())?;
        unsafe { relocate(self.buf.as_ptr(), new_buf.as_ptr(), self.len) };
        trace_event!(
            old_capacity = self.buf.capacity(),
            new_capacity = new_cap,
            len = self.len,
            "sequence reserved"
        );
        // `new_buf` now holds the old block whose elements were moved out;
        // dropping it frees memory only.
        self.buf.swap(&mut new_buf);
        Ok(())
    }

    /// Shrinks by dropping the tail or grows by default-constructing new
    /// elements, reserving exactly `new_len` first.
    pub fn resize(&mut self, new_len: usize)
    where
        T: Default,
    {
        self.resize_with(new_len, T::default);
    }

    pub fn resize_with(&mut self, new_len: usize, f: impl FnMut() -> T) {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        self.reserve(new_len);
        unsafe { self.construct_tail(new_len, f) };
    }

    pub fn push(&mut self, value: T) {
        self.emplace_back(|| value);
    }

    /// Like [`push`](Self::push) but reports allocation failure. On failure
    /// the value is dropped.
    pub fn try_push(&mut self, value: T) -> Result<(), TryReserveError> {
        let len = self.len;
        self.try_emplace(len, || Ok(value)).map(|_| ())
    }

    /// Constructs an element at the end from `f` and returns it.
    pub fn emplace_back(&mut self, f: impl FnOnce() -> T) -> &mut T {
        let len = self.len;
        self.emplace(len, f)
    }

    pub fn insert(&mut self, index: usize, value: T) -> &mut T {
        self.emplace(index, || value)
    }

    pub fn try_insert(&mut self, index: usize, value: T) -> Result<&mut T, TryReserveError> {
        self.try_emplace(index, || Ok(value))
    }

    /// Constructs an element from `f` at `index`, shifting `[index, len)` one
    /// slot toward the tail, and returns it.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn emplace(&mut self, index: usize, f: impl FnOnce() -> T) -> &mut T {
        let slot = match self.emplace_raw(index, || Ok::<T, TryReserveError>(f())) {
            Ok(slot) => slot,
            Err(err) => handle_reserve_error(err),
        };
        unsafe { &mut *slot }
    }

    /// Fallible form of [`emplace`](Self::emplace). Both an allocation
    /// failure and an error from `f` leave the sequence unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn try_emplace<E>(
        &mut self,
        index: usize,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<&mut T, E>
    where
        E: From<TryReserveError>,
    {
        let slot = self.emplace_raw(index, f)?;
        Ok(unsafe { &mut *slot })
    }

    fn emplace_raw<E>(
        &mut self,
        index: usize,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<*mut T, E>
    where
        E: From<TryReserveError>,
    {
        let len = self.len;
        assert!(index <= len, "index out of bounds: the len is {len} but the index is {index}");
        if len == self.capacity() {
            self.emplace_with_relocate(index, f)?;
        } else {
            self.emplace_in_place(index, f)?;
        }
        self.len = len + 1;
        Ok(self.buf.slot(index))
    }

    fn emplace_with_relocate<E>(
        &mut self,
        index: usize,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<(), E>
    where
        E: From<TryReserveError>,
    {
        let len = self.len;
        let new_cap = if len == 0 {
            1
        } else {
            len.checked_mul(2).ok_or(TryReserveError::CapacityOverflow)?
        };
        let mut new_buf: Arena<T, A> =
            Arena::try_allocate_in(new_cap, self.buf.allocator().clone())?;
        // The new element goes into its final slot first. If `f` fails or
        // panics, `new_buf` is freed and the old arena was never touched.
        let value = f()?;
        unsafe {
            new_buf.slot(index).write(value);
            relocate(self.buf.as_ptr(), new_buf.as_ptr(), index);
            relocate(self.buf.slot(index), new_buf.slot(index + 1), len - index);
        }
        trace_event!(
            old_capacity = self.buf.capacity(),
            new_capacity = new_cap,
            len = len,
            index = index,
            "sequence relocated for insert"
        );
        self.buf.swap(&mut new_buf);
        Ok(())
    }

    fn emplace_in_place<E>(
        &mut self,
        index: usize,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<(), E> {
        let len = self.len;
        let value = f()?;
        unsafe {
            let slot = self.buf.slot(index);
            if index != len {
                ptr::copy(slot, slot.add(1), len - index);
            }
            slot.write(value);
        }
        Ok(())
    }

    pub fn extend_from_slice(&mut self, other: &[T])
    where
        T: Clone,
    {
        let needed = self
            .len
            .checked_add(other.len())
            .unwrap_or_else(|| handle_reserve_error(TryReserveError::CapacityOverflow));
        if needed > self.capacity() {
            self.reserve(cmp::max(needed, self.len.saturating_mul(2)));
        }
        let mut items = other.iter();
        unsafe { self.construct_tail(needed, || items.next().cloned().unwrap_unchecked()) };
    }
}

impl<T, A: Allocator> Drop for Sequence<T, A> {
    fn drop(&mut self) {
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
        // `buf` frees the block afterwards.
    }
}

impl<T, A: Allocator + Default> Default for Sequence<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Sequence<T, A> {
    /// Copies into an arena sized to exactly `self.len()`.
    ///
    /// A panicking `T::clone` drops the clones made so far and frees the new
    /// arena; `self` is not touched.
    fn clone(&self) -> Self {
        let mut seq = Self::with_capacity_in(self.len, self.buf.allocator().clone());
        let mut items = self.iter();
        unsafe { seq.construct_tail(self.len, || items.next().cloned().unwrap_unchecked()) };
        seq
    }

    fn clone_from(&mut self, source: &Self) {
        if source.len > self.capacity() {
            let mut tmp = Self::with_capacity_in(source.len, self.buf.allocator().clone());
            tmp.extend_from_slice(source);
            self.swap(&mut tmp);
            return;
        }
        let overlap = cmp::min(self.len, source.len);
        self.as_mut_slice()[..overlap].clone_from_slice(&source[..overlap]);
        if self.len > source.len {
            self.truncate(source.len);
        } else {
            let mut items = source[overlap..].iter();
            unsafe { self.construct_tail(source.len, || items.next().cloned().unwrap_unchecked()) };
        }
    }
}

impl<T, A: Allocator> Deref for Sequence<T, A> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Sequence<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator> AsRef<[T]> for Sequence<T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> AsMut<[T]> for Sequence<T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: PartialEq, A1: Allocator, A2: Allocator> PartialEq<Sequence<T, A2>> for Sequence<T, A1> {
    fn eq(&self, other: &Sequence<T, A2>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq<[T]> for Sequence<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, A: Allocator> PartialEq<&[T]> for Sequence<T, A> {
    fn eq(&self, other: &&[T]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: PartialEq, A: Allocator, const N: usize> PartialEq<[T; N]> for Sequence<T, A> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Eq, A: Allocator> Eq for Sequence<T, A> {}

impl<T: Debug, A: Allocator> Debug for Sequence<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl<T, A: Allocator + Clone> Extend<T> for Sequence<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if let Some(needed) = self.len.checked_add(lower) {
            if needed > self.capacity() {
                self.reserve(needed);
            }
        }
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator + Clone> Extend<&'a T> for Sequence<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        <Self as Extend<T>>::extend(self, iter.into_iter().copied());
    }
}

impl<T> FromIterator<T> for Sequence<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = Sequence::new();
        seq.extend(iter);
        seq
    }
}

impl<T: Clone> From<&[T]> for Sequence<T, Global> {
    fn from(slice: &[T]) -> Self {
        Self::from_slice(slice)
    }
}

impl<T, const N: usize> From<[T; N]> for Sequence<T, Global> {
    fn from(array: [T; N]) -> Self {
        let mut seq = Self::with_capacity(N);
        let array = ManuallyDrop::new(array);
        unsafe { relocate(array.as_ptr(), seq.as_mut_ptr(), N) };
        seq.len = N;
        seq
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Sequence<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Sequence<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
