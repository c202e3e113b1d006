//! Per-thread hazard-pointer slot table (component B, publication side).
//!
//! Each participating thread owns one row of slots. A thread publishes a pointer it is about to
//! dereference by storing it (with `Release`) into one of its own slots; a scanning thread reads
//! every other thread's row (with `Acquire`) to decide whether a retired pointer is still in use.
//! Rows are cache-line padded so publishing a hazard pointer on one thread never bounces the cache
//! line backing an unrelated thread's row.

use std::collections::HashSet;

use crossbeam_utils::CachePadded;

cfg_if::cfg_if! {
    if #[cfg(feature = "check-loom")] {
        use loom::sync::atomic::{AtomicUsize, Ordering};
    } else {
        use std::sync::atomic::{AtomicUsize, Ordering};
    }
}

use crate::thread_id::T_MAX;

const FREE: usize = 0;

/// Fixed per-thread slot count. The conservative discipline (4.D, discipline 1) needs three
/// (`Prev`, `Curr`, `Next`); the windowed discipline (discipline 2) needs the fourth (`Start`).
pub const MAX_K: usize = 4;

/// Symbolic hazard-slot indices (Data Model, "Hazard-pointer slot").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Prev = 0,
    Curr = 1,
    Next = 2,
    Start = 3,
}

/// The process-wide table of per-thread hazard-slot rows owned by one domain.
pub(crate) struct Hazards {
    k: usize,
    rows: Vec<CachePadded<[AtomicUsize; MAX_K]>>,
}

impl Hazards {
    pub fn new(k: usize) -> Self {
        assert!(
            (1..=MAX_K).contains(&k),
            "hazlist: k must be in 1..={MAX_K}, got {k}"
        );
        let rows = (0..T_MAX)
            .map(|_| {
                CachePadded::new([
                    AtomicUsize::new(FREE),
                    AtomicUsize::new(FREE),
                    AtomicUsize::new(FREE),
                    AtomicUsize::new(FREE),
                ])
            })
            .collect();
        Self { k, rows }
    }

    /// Publishes `ptr` into the calling thread's `slot`, returning it unchanged for convenience at
    /// call sites that both protect and use a pointer in one expression.
    pub fn protect(&self, thread: usize, slot: Slot, ptr: usize) -> usize {
        self.rows[thread][slot as usize].store(ptr, Ordering::Release);
        ptr
    }

    /// Clears every slot `thread` owns.
    pub fn clear(&self, thread: usize) {
        for i in 0..self.k {
            self.rows[thread][i].store(FREE, Ordering::Release);
        }
    }

    /// Returns `true` if any thread other than `exclude_thread` currently publishes `ptr`.
    pub fn is_protected_by_any_other(&self, exclude_thread: usize, ptr: usize) -> bool {
        if ptr == FREE {
            return false;
        }
        for (tid, row) in self.rows.iter().enumerate() {
            if tid == exclude_thread {
                continue;
            }
            for i in 0..self.k {
                if row[i].load(Ordering::Acquire) == ptr {
                    return true;
                }
            }
        }
        false
    }

    /// Collects every currently-published, non-free pointer across every thread other than
    /// `exclude_thread`. The indexed retire-list form transposes the scan's loop order this way:
    /// probe the index once per hazard instead of walking all hazards once per retiree.
    pub fn hazards_excluding(&self, exclude_thread: usize) -> HashSet<usize> {
        let mut set = HashSet::new();
        for (tid, row) in self.rows.iter().enumerate() {
            if tid == exclude_thread {
                continue;
            }
            for i in 0..self.k {
                let v = row[i].load(Ordering::Acquire);
                if v != FREE {
                    set.insert(v);
                }
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protect_is_visible_to_other_readers() {
        let h = Hazards::new(4);
        h.protect(0, Slot::Curr, 0xdead);
        assert!(h.is_protected_by_any_other(1, 0xdead));
        assert!(!h.is_protected_by_any_other(0, 0xdead));
    }

    #[test]
    fn clear_removes_all_of_a_threads_slots() {
        let h = Hazards::new(4);
        h.protect(0, Slot::Curr, 0x1);
        h.protect(0, Slot::Next, 0x2);
        h.clear(0);
        assert!(!h.is_protected_by_any_other(1, 0x1));
        assert!(!h.is_protected_by_any_other(1, 0x2));
    }

    #[test]
    fn hazards_excluding_collects_every_other_threads_slots() {
        let h = Hazards::new(4);
        h.protect(0, Slot::Curr, 0x1);
        h.protect(2, Slot::Next, 0x2);
        let set = h.hazards_excluding(0);
        assert!(!set.contains(&0x1));
        assert!(set.contains(&0x2));
    }
}
