//! Instrumented types for exercising construction, drop and allocation
//! behaviour. Available to downstream crates with the `test_utils` feature.
//!
//! - [`Census`] counts constructions, clones and drops of [`Tracked`] values
//!   and can make the k-th `clone` or `default` call panic.
//! - [`CountingAllocator`] wraps the global allocator, counts calls and live
//!   bytes, and can be told to start failing.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;

use allocator_api2::alloc::{AllocError, Allocator, Global};

#[derive(Default)]
struct Counts {
    constructed: Cell<usize>,
    dropped: Cell<usize>,
    clones: Cell<usize>,
    clone_calls: Cell<usize>,
    default_calls: Cell<usize>,
    fail_clone_at: Cell<Option<usize>>,
    fail_default_at: Cell<Option<usize>>,
}

/// Shared counters for a family of [`Tracked`] values.
#[derive(Clone, Default)]
pub struct Census(Rc<Counts>);

thread_local! {
    static AMBIENT: RefCell<Option<Census>> = const { RefCell::new(None) };
}

impl Census {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new tracked value counted by this census.
    pub fn spawn(&self, value: u32) -> Tracked {
        self.0.constructed.set(self.0.constructed.get() + 1);
        Tracked {
            value,
            census: self.clone(),
        }
    }

    /// Makes the `k`-th call to `Tracked::clone` (1-based, counted from now)
    /// panic before constructing anything.
    pub fn fail_clone_at(&self, k: usize) {
        self.0.clone_calls.set(0);
        self.0.fail_clone_at.set(Some(k));
    }

    /// Makes the `k`-th call to `Tracked::default` (1-based, counted from now)
    /// panic before constructing anything.
    pub fn fail_default_at(&self, k: usize) {
        self.0.default_calls.set(0);
        self.0.fail_default_at.set(Some(k));
    }

    /// Installs this census as the one `Tracked::default` reports to on the
    /// current thread until the guard is dropped.
    pub fn enter(&self) -> AmbientGuard {
        let previous = AMBIENT.with(|ambient| ambient.replace(Some(self.clone())));
        AmbientGuard { previous }
    }

    pub fn constructed(&self) -> usize {
        self.0.constructed.get()
    }

    pub fn dropped(&self) -> usize {
        self.0.dropped.get()
    }

    /// Successful clones.
    pub fn clones(&self) -> usize {
        self.0.clones.get()
    }

    pub fn live(&self) -> usize {
        self.constructed() - self.dropped()
    }
}

#[must_use]
pub struct AmbientGuard {
    previous: Option<Census>,
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        AMBIENT.with(|ambient| *ambient.borrow_mut() = previous);
    }
}

/// A value whose lifetime is reported to a [`Census`].
#[derive(Debug)]
pub struct Tracked {
    value: u32,
    census: Census,
}

impl Tracked {
    pub fn value(&self) -> u32 {
        self.value
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        let counts = &self.census.0;
        let call = counts.clone_calls.get() + 1;
        counts.clone_calls.set(call);
        if counts.fail_clone_at.get() == Some(call) {
            panic!("Tracked::clone failed on call {call}");
        }
        counts.clones.set(counts.clones.get() + 1);
        self.census.spawn(self.value)
    }
}

impl Default for Tracked {
    fn default() -> Self {
        let census = AMBIENT
            .with(|ambient| ambient.borrow().clone())
            .unwrap_or_else(|| panic!("Tracked::default called outside Census::enter"));
        let counts = &census.0;
        let call = counts.default_calls.get() + 1;
        counts.default_calls.set(call);
        if counts.fail_default_at.get() == Some(call) {
            panic!("Tracked::default failed on call {call}");
        }
        census.spawn(0)
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let counts = &self.census.0;
        counts.dropped.set(counts.dropped.get() + 1);
    }
}

impl std::fmt::Debug for Census {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Census")
            .field("constructed", &self.constructed())
            .field("dropped", &self.dropped())
            .field("clones", &self.clones())
            .finish()
    }
}

/// Global allocator wrapper that counts calls and live bytes.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    bytes_live: Cell<usize>,
    fail_after: Cell<Option<usize>>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `n` allocations, then fails every later one.
    pub fn failing_after(n: usize) -> Self {
        let alloc = Self::default();
        alloc.fail_after.set(Some(n));
        alloc
    }

    /// Successful allocations.
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.get()
    }

    pub fn bytes_live(&self) -> usize {
        self.bytes_live.get()
    }
}

unsafe impl Allocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if self.fail_after.get() == Some(self.allocations.get()) {
            return Err(AllocError);
        }
        let block = Global.allocate(layout)?;
        self.allocations.set(self.allocations.get() + 1);
        self.bytes_live.set(self.bytes_live.get() + layout.size());
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.set(self.deallocations.get() + 1);
        self.bytes_live.set(self.bytes_live.get() - layout.size());
        unsafe { Global.deallocate(ptr, layout) };
    }
}
