//! Pluggable table allocation
//!
//! Containers allocate their slot buffers through the [`TableAlloc`]
//! interface so callers can route storage into pools, arenas or
//! instrumented allocators. A process-wide default is used when `create`
//! is not handed an explicit allocator; fixed-buffer containers bypass
//! allocation entirely.

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

/// Allocation interface consumed by the hash containers.
///
/// `allocate` returns `None` on failure; containers surface that as
/// `CouldNotAlloc` and keep their previous buffer. The `tag` is the
/// container name, passed through for pool bookkeeping and diagnostics.
pub trait TableAlloc: Send + Sync + fmt::Debug {
    /// Allocate a buffer for the given layout. `None` signals failure.
    fn allocate(&self, layout: Layout, tag: &'static str) -> Option<NonNull<u8>>;

    /// Release a buffer previously returned by [`TableAlloc::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on the same allocator
    /// with the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Default allocator backed by `std::alloc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAlloc;

impl TableAlloc for SystemAlloc {
    fn allocate(&self, layout: Layout, _tag: &'static str) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // Safety: layout has non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // Safety: caller guarantees ptr/layout came from allocate above.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// Statistics collected by [`CountingAlloc`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Number of allocations served.
    pub alloc_calls: u64,
    /// Number of deallocations.
    pub free_calls: u64,
    /// Total bytes handed out.
    pub bytes_allocated: u64,
    /// Total bytes returned.
    pub bytes_freed: u64,
}

impl AllocStats {
    /// Bytes currently outstanding.
    pub fn live_bytes(&self) -> u64 {
        self.bytes_allocated.saturating_sub(self.bytes_freed)
    }
}

/// Instrumented wrapper around another allocator.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use setkit::memory::{CountingAlloc, SystemAlloc};
/// use setkit::{KeySet, TableConfig};
///
/// let alloc = Arc::new(CountingAlloc::new(Arc::new(SystemAlloc)));
/// let mut set = KeySet::<u64>::new();
/// set.create("tags", &TableConfig::default(), Some(alloc.clone())).unwrap();
/// assert!(alloc.stats().alloc_calls > 0);
/// ```
#[derive(Debug)]
pub struct CountingAlloc {
    inner: Arc<dyn TableAlloc>,
    alloc_calls: AtomicU64,
    free_calls: AtomicU64,
    bytes_allocated: AtomicU64,
    bytes_freed: AtomicU64,
}

impl CountingAlloc {
    /// Wrap an allocator.
    pub fn new(inner: Arc<dyn TableAlloc>) -> Self {
        Self {
            inner,
            alloc_calls: AtomicU64::new(0),
            free_calls: AtomicU64::new(0),
            bytes_allocated: AtomicU64::new(0),
            bytes_freed: AtomicU64::new(0),
        }
    }

    /// Snapshot the counters.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            alloc_calls: self.alloc_calls.load(Ordering::Relaxed),
            free_calls: self.free_calls.load(Ordering::Relaxed),
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            bytes_freed: self.bytes_freed.load(Ordering::Relaxed),
        }
    }
}

impl TableAlloc for CountingAlloc {
    fn allocate(&self, layout: Layout, tag: &'static str) -> Option<NonNull<u8>> {
        let ptr = self.inner.allocate(layout, tag)?;
        self.alloc_calls.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated
            .fetch_add(layout.size() as u64, Ordering::Relaxed);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.free_calls.fetch_add(1, Ordering::Relaxed);
        self.bytes_freed
            .fetch_add(layout.size() as u64, Ordering::Relaxed);
        // Safety: forwarded with the caller's own contract.
        unsafe { self.inner.deallocate(ptr, layout) };
    }
}

static DEFAULT_ALLOC: Lazy<RwLock<Arc<dyn TableAlloc>>> =
    Lazy::new(|| RwLock::new(Arc::new(SystemAlloc)));

/// Get the process-wide default allocator.
pub fn default_alloc() -> Arc<dyn TableAlloc> {
    DEFAULT_ALLOC.read().expect("default allocator lock").clone()
}

/// Replace the process-wide default allocator.
///
/// Containers capture the default at `create` time, so the change affects
/// containers created afterwards only.
pub fn set_default_alloc(alloc: Arc<dyn TableAlloc>) {
    *DEFAULT_ALLOC.write().expect("default allocator lock") = alloc;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_alloc_round_trip() {
        let alloc = SystemAlloc;
        let layout = Layout::array::<u64>(16).unwrap();
        let ptr = alloc.allocate(layout, "test").expect("allocation");
        unsafe { alloc.deallocate(ptr, layout) };
    }

    #[test]
    fn test_system_alloc_zero_size() {
        let alloc = SystemAlloc;
        let layout = Layout::array::<u64>(0).unwrap();
        assert!(alloc.allocate(layout, "test").is_none());
    }

    #[test]
    fn test_counting_alloc_tracks_bytes() {
        let counting = CountingAlloc::new(Arc::new(SystemAlloc));
        let layout = Layout::array::<u32>(8).unwrap();
        let ptr = counting.allocate(layout, "test").expect("allocation");

        let stats = counting.stats();
        assert_eq!(stats.alloc_calls, 1);
        assert_eq!(stats.bytes_allocated, layout.size() as u64);
        assert_eq!(stats.live_bytes(), layout.size() as u64);

        unsafe { counting.deallocate(ptr, layout) };
        let stats = counting.stats();
        assert_eq!(stats.free_calls, 1);
        assert_eq!(stats.live_bytes(), 0);
    }

    #[test]
    fn test_default_alloc_usable() {
        let alloc = default_alloc();
        let layout = Layout::array::<u8>(64).unwrap();
        let ptr = alloc.allocate(layout, "test").expect("allocation");
        unsafe { alloc.deallocate(ptr, layout) };
    }
}
