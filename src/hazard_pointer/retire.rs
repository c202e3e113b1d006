//! Array-form retire list (component B, default retire strategy).
//!
//! Grounded closely on the course retire list this crate started from: a thread-local `Vec` of
//! `(pointer, free_fn)` pairs, where `free_fn` is a per-type free routine captured by the caller
//! of [`super::domain::Domain::retire`] at the call site. A scan pops every entry, checks it
//! against the hazard table, and keeps only the survivors.

#[cfg(not(feature = "check-loom"))]
use core::sync::atomic::{fence, Ordering};
#[cfg(feature = "check-loom")]
use loom::sync::atomic::{fence, Ordering};

use super::hazard::Hazards;

#[derive(Default)]
pub(crate) struct ArrayRetireList {
    inner: Vec<(usize, unsafe fn(usize))>,
}

impl ArrayRetireList {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn push(&mut self, ptr: usize, free: unsafe fn(usize)) {
        self.inner.push((ptr, free));
    }

    /// Probes every other thread's hazard slots for each retiree, freeing those with no match.
    /// Returns the number freed.
    pub fn scan(&mut self, hazards: &Hazards, thread: usize) -> usize {
        fence(Ordering::SeqCst);
        let mut survivors = Vec::with_capacity(self.inner.len());
        let mut freed = 0;
        while let Some((ptr, free)) = self.inner.pop() {
            if hazards.is_protected_by_any_other(thread, ptr) {
                survivors.push((ptr, free));
            } else {
                // SAFETY: no hazard slot publishes `ptr`, so no concurrent reader can be
                // dereferencing it; `free` was captured for exactly this pointer's type.
                unsafe {
                    free(ptr);
                }
                freed += 1;
            }
            fence(Ordering::Acquire);
        }
        self.inner = survivors;
        freed
    }

    /// Frees every remaining retiree unconditionally. Only safe to call once the owner asserts no
    /// mutator is active (the `Domain` teardown contract).
    pub fn destroy_all(&mut self) -> usize {
        let n = self.inner.len();
        for (ptr, free) in self.inner.drain(..) {
            // SAFETY: caller asserts no mutator is active.
            unsafe {
                free(ptr);
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn noop_free(_: usize) {}

    #[test]
    fn scan_frees_entries_with_no_hazard() {
        let hazards = Hazards::new(4);
        let mut list = ArrayRetireList::default();
        list.push(0x1000, noop_free);
        list.push(0x2000, noop_free);
        let freed = list.scan(&hazards, 0);
        assert_eq!(freed, 2);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn scan_keeps_entries_still_protected() {
        let hazards = Hazards::new(4);
        hazards.protect(1, super::super::hazard::Slot::Curr, 0x1000);
        let mut list = ArrayRetireList::default();
        list.push(0x1000, noop_free);
        list.push(0x2000, noop_free);
        let freed = list.scan(&hazards, 0);
        assert_eq!(freed, 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn destroy_all_frees_everything_unconditionally() {
        let mut list = ArrayRetireList::default();
        list.push(0x1, noop_free);
        list.push(0x2, noop_free);
        assert_eq!(list.destroy_all(), 2);
        assert_eq!(list.len(), 0);
    }
}
