//! Hazard-pointer domain (component B): ties the thread-indexed slot table to a per-thread
//! retire list, exposing `protect`/`clear`/`retire`/`scan`. Generic over the retire-list shape the
//! way `oliver-giersch-hazptr`'s `Hp<S = LocalRetire>` is generic over its retire strategy.

use std::cell::UnsafeCell;

use crossbeam_utils::CachePadded;

use crate::config::Config;
use crate::instrumentation::{count_by, Counters};
use crate::thread_id::{thread_id, T_MAX};

use super::hazard::{Hazards, Slot};
use super::retire::ArrayRetireList;
use super::retire_index::IndexedRetireList;

/// The operations a per-thread retire list must support, independent of its internal shape.
pub(crate) trait RetireListImpl: Default {
    fn len(&self) -> usize;
    fn push(&mut self, ptr: usize, free: unsafe fn(usize));
    /// Frees every retiree no longer hazarded by another thread. Returns the count freed.
    fn scan(&mut self, hazards: &Hazards, thread: usize) -> usize;
    /// Frees every retiree unconditionally. Returns the count freed.
    fn destroy_all(&mut self) -> usize;
}

impl RetireListImpl for ArrayRetireList {
    fn len(&self) -> usize {
        self.len()
    }
    fn push(&mut self, ptr: usize, free: unsafe fn(usize)) {
        self.push(ptr, free)
    }
    fn scan(&mut self, hazards: &Hazards, thread: usize) -> usize {
        self.scan(hazards, thread)
    }
    fn destroy_all(&mut self) -> usize {
        self.destroy_all()
    }
}

impl RetireListImpl for IndexedRetireList {
    fn len(&self) -> usize {
        self.len()
    }
    fn push(&mut self, ptr: usize, free: unsafe fn(usize)) {
        self.push(ptr, free)
    }
    fn scan(&mut self, hazards: &Hazards, thread: usize) -> usize {
        self.scan(hazards, thread)
    }
    fn destroy_all(&mut self) -> usize {
        self.destroy_all()
    }
}

/// Selects which retire-list shape a [`Domain`] uses and that shape's default scan cadence.
pub trait RetireStrategy: Default {
    #[doc(hidden)]
    type List: RetireListImpl;

    /// Default reclamation threshold `R`, used when [`Config::retire_threshold`] is `None`.
    fn default_threshold(k: usize) -> usize;
}

/// The array-form retire list: `O(1)` append, a full linear scan on reclamation. Good default for
/// small `K` and moderate thread counts.
#[derive(Debug, Default)]
pub struct ArrayRetire;

impl RetireStrategy for ArrayRetire {
    type List = ArrayRetireList;

    fn default_threshold(k: usize) -> usize {
        T_MAX * k.max(1)
    }
}

/// The indexed-form retire list: an ordered index backed by [`crate::rbtree`], trading a
/// `O(log R)` push for a scan that costs one index probe per live hazard rather than one hazard
/// sweep per retiree.
#[derive(Debug, Default)]
pub struct IndexedRetire;

impl RetireStrategy for IndexedRetire {
    type List = IndexedRetireList;

    fn default_threshold(_k: usize) -> usize {
        0
    }
}

/// A hazard-pointer domain: the shared state one or more [`crate::list_set::OrderedSet`]s or
/// [`crate::list_set::WindowedSet`]s register hazards against and retire nodes into.
pub struct Domain<S: RetireStrategy = ArrayRetire> {
    hazards: Hazards,
    retire_lists: Vec<CachePadded<UnsafeCell<S::List>>>,
    threshold: usize,
    pub counters: Counters,
}

// SAFETY: `retire_lists[i]` is read and written only by the thread identified by thread id `i`
// (see `Domain::my_list`); no two threads ever access the same slot, so sharing `&Domain` across
// threads is sound even though `UnsafeCell` itself is not `Sync`.
unsafe impl<S: RetireStrategy> Sync for Domain<S> {}

impl<S: RetireStrategy> Domain<S> {
    pub fn new(config: Config) -> Self {
        let threshold = config
            .retire_threshold
            .unwrap_or_else(|| S::default_threshold(config.k));
        let retire_lists = (0..T_MAX)
            .map(|_| CachePadded::new(UnsafeCell::new(S::List::default())))
            .collect();
        Self {
            hazards: Hazards::new(config.k),
            retire_lists,
            threshold,
            counters: Counters::default(),
        }
    }

    /// Publishes `ptr` into the calling thread's `slot`.
    pub fn protect(&self, slot: Slot, ptr: usize) -> usize {
        self.hazards.protect(thread_id(), slot, ptr)
    }

    /// Publishes `ptr` into the calling thread's `slot` with the same `Release` ordering as
    /// [`Domain::protect`]; a distinct name for call sites where the release/re-validate pairing
    /// that makes hazard publication sound is the point being documented, not just the store.
    pub fn protect_release(&self, slot: Slot, ptr: usize) -> usize {
        self.protect(slot, ptr)
    }

    /// Clears every slot the calling thread owns.
    pub fn clear(&self) {
        self.hazards.clear(thread_id());
    }

    /// Retires `ptr`, appending it to the calling thread's retire list and invoking a scan once
    /// the list crosses the domain's reclamation threshold.
    pub fn retire<T>(&self, ptr: *mut T) {
        unsafe fn free<T>(addr: usize) {
            // SAFETY: the caller guarantees `addr` was produced by `Box::into_raw::<T>` and is
            // retired at most once.
            drop(Box::from_raw(addr as *mut T));
        }

        let list = self.my_list();
        list.push(ptr as usize, free::<T>);
        if list.len() > self.threshold {
            self.scan();
        }
    }

    /// Runs a reclamation scan over the calling thread's own retire list.
    pub fn scan(&self) {
        let thread = thread_id();
        let list = self.my_list();
        let freed = list.scan(&self.hazards, thread);
        count_by!(self.counters, nodes_destroyed, freed);
        tracing::trace!(thread, freed, "hazard-pointer scan complete");
    }

    fn my_list(&self) -> &mut S::List {
        // SAFETY: this slot is only ever touched by `thread_id()`'s own thread.
        unsafe { &mut *self.retire_lists[thread_id()].get() }
    }
}

impl<S: RetireStrategy> Default for Domain<S> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<S: RetireStrategy> Drop for Domain<S> {
    fn drop(&mut self) {
        let mut total = 0usize;
        for cell in &mut self.retire_lists {
            total += cell.get_mut().destroy_all();
        }
        count_by!(self.counters, nodes_destroyed, total);
        tracing::debug!(total_reclaimed = total, "hazard-pointer domain destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retire_below_threshold_does_not_scan() {
        let domain: Domain<ArrayRetire> = Domain::new(Config {
            k: 4,
            retire_threshold: Some(10),
        });
        let boxed = Box::into_raw(Box::new(0u8));
        domain.retire(boxed);
        // Below threshold: the retiree stays queued rather than being freed immediately.
        assert_eq!(domain.my_list().len(), 1);
    }

    #[test]
    fn retire_past_threshold_triggers_scan_and_frees_unprotected() {
        let domain: Domain<ArrayRetire> = Domain::new(Config {
            k: 4,
            retire_threshold: Some(0),
        });
        let boxed = Box::into_raw(Box::new(0u8));
        domain.retire(boxed);
        assert_eq!(domain.my_list().len(), 0);
    }
}
