//! Conservative find discipline (component D, discipline 1): on any inconsistency, restart the
//! whole traversal from the head. Uses three hazard slots (`Prev`, `Curr`, `Next`) and physically
//! unlinks logically-deleted nodes it passes over along the way.
//!
//! The cursor-and-restart shape follows the same pattern as an optimistic fine-grained list over
//! epoch-based reclamation, translated here onto hand-rolled hazard pointers: a `prev`/`curr` pair
//! is re-validated at every step rather than trusted across a dereference.

use std::cmp::Ordering as KeyOrder;

use crate::config::Config;
use crate::hazard_pointer::{ArrayRetire, Domain, RetireStrategy, Slot};
use crate::instrumentation::count;

use super::node::{is_marked, mark, unmark, Key, Node};

cfg_if::cfg_if! {
    if #[cfg(feature = "check-loom")] {
        use loom::sync::atomic::{AtomicUsize, Ordering};
    } else {
        use std::sync::atomic::{AtomicUsize, Ordering};
    }
}

const HEAD_KEY: Key = 0;
const TAIL_KEY: Key = Key::MAX;

/// A concurrent, lock-free ordered set of integer keys, reclaimed with hazard pointers using the
/// conservative find discipline.
///
/// Keys `0` and `usize::MAX` are reserved for the head/tail sentinels and may not be inserted.
pub struct OrderedSet<S: RetireStrategy = ArrayRetire> {
    head: *mut Node,
    tail: *mut Node,
    domain: Domain<S>,
}

// SAFETY: every node is reached only through atomic loads of `next` words and mutated only
// through CAS; no node is ever accessed through more than one path at a time without going
// through the hazard-pointer protocol first.
unsafe impl<S: RetireStrategy> Send for OrderedSet<S> {}
unsafe impl<S: RetireStrategy> Sync for OrderedSet<S> {}

struct FindResult {
    prev: *const AtomicUsize,
    curr: *mut Node,
    next: usize,
    found: bool,
}

impl<S: RetireStrategy> OrderedSet<S> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let tail = Node::new(TAIL_KEY, 0);
        let head = Node::new(HEAD_KEY, tail as usize);
        Self {
            head,
            tail,
            domain: Domain::new(config),
        }
    }

    /// A snapshot of this set's instrumentation counters (component E); all zero unless the
    /// `instrument` feature is enabled.
    pub fn counters(&self) -> crate::CountersSnapshot {
        self.domain.counters.snapshot()
    }

    /// Forces a reclamation scan over the calling thread's own retire list. Mutators never need
    /// this; it exists for callers that want a deterministic accounting of reclaimed nodes without
    /// waiting for the next `retire` to cross the threshold or for the set itself to drop.
    pub fn scan(&self) {
        self.domain.scan();
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: Key) -> bool {
        debug_assert!(key != HEAD_KEY && key != TAIL_KEY);
        let r = self.find(key);
        self.domain.clear();
        r.found
    }

    /// Inserts `key`. Returns `false` without modifying the set if `key` is already present.
    pub fn insert(&self, key: Key) -> bool {
        debug_assert!(
            key != HEAD_KEY && key != TAIL_KEY,
            "hazlist: key {key} collides with a sentinel"
        );
        let node = Node::new(key, 0);
        loop {
            let r = self.find(key);
            if r.found {
                // SAFETY: `node` was never linked or shared with another thread.
                unsafe {
                    drop(Box::from_raw(node));
                }
                self.domain.clear();
                return false;
            }

            // SAFETY: `node` is not yet reachable by any other thread; a relaxed store suffices.
            unsafe {
                (*node).next.store(r.curr as usize, Ordering::Relaxed);
            }

            count!(self.domain.counters, cas_attempts);
            let prev_ref = unsafe { &*r.prev };
            match prev_ref.compare_exchange(
                r.curr as usize,
                node as usize,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    count!(self.domain.counters, nodes_constructed);
                    self.domain.clear();
                    return true;
                }
                Err(_) => {
                    count!(self.domain.counters, logical_insert_retries);
                }
            }
        }
    }

    /// Removes `key`. Returns `false` without modifying the set if `key` is absent.
    pub fn delete(&self, key: Key) -> bool {
        debug_assert!(
            key != HEAD_KEY && key != TAIL_KEY,
            "hazlist: key {key} collides with a sentinel"
        );
        loop {
            let r = self.find(key);
            if !r.found {
                self.domain.clear();
                return false;
            }

            let expected = unmark(r.next);
            count!(self.domain.counters, cas_attempts);
            let curr_ref = unsafe { &(*r.curr).next };
            match curr_ref.compare_exchange(
                expected,
                mark(expected),
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // Logically deleted. Best-effort physical unlink; either outcome is correct,
                    // a later traversal unlinks it if this CAS loses.
                    count!(self.domain.counters, cas_attempts);
                    let prev_ref = unsafe { &*r.prev };
                    if prev_ref
                        .compare_exchange(
                            r.curr as usize,
                            expected,
                            Ordering::SeqCst,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        self.domain.retire(r.curr);
                    }
                    self.domain.clear();
                    return true;
                }
                Err(actual) => {
                    if is_marked(actual) {
                        // Another thread logically deleted it first.
                        self.domain.clear();
                        return true;
                    }
                    count!(self.domain.counters, logical_delete_retries);
                }
            }
        }
    }

    fn find(&self, key: Key) -> FindResult {
        'retry: loop {
            self.domain.protect(Slot::Prev, self.head as usize);
            let mut prev: *const AtomicUsize = unsafe { &(*self.head).next };
            let prev_next = unsafe { (*self.head).next.load(Ordering::Acquire) };
            let mut curr = unmark(prev_next) as *mut Node;

            loop {
                if curr == self.tail {
                    return FindResult {
                        prev,
                        curr,
                        next: 0,
                        found: false,
                    };
                }

                self.domain.protect(Slot::Curr, curr as usize);
                let prev_val = unsafe { (*prev).load(Ordering::Acquire) };
                if unmark(prev_val) != curr as usize {
                    count!(self.domain.counters, consistency_aborts);
                    continue 'retry;
                }

                unsafe {
                    Node::check_alive(curr);
                }
                let curr_next = unsafe { (*curr).next.load(Ordering::Acquire) };
                self.domain.protect(Slot::Next, unmark(curr_next));
                count!(self.domain.counters, traversal_steps);

                if is_marked(curr_next) {
                    count!(self.domain.counters, cas_attempts);
                    let prev_ref = unsafe { &*prev };
                    match prev_ref.compare_exchange(
                        curr as usize,
                        unmark(curr_next),
                        Ordering::Release,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => {
                            self.domain.retire(curr);
                            curr = unmark(curr_next) as *mut Node;
                            continue;
                        }
                        Err(_) => {
                            count!(self.domain.counters, retries);
                            continue 'retry;
                        }
                    }
                }

                let curr_key = unsafe { (*curr).key };
                match curr_key.cmp(&key) {
                    KeyOrder::Less => {
                        // `curr` is about to become the node `prev` points into; publish it to
                        // `Slot::Prev` before `Slot::Curr` moves past it, so it stays hazarded for
                        // as long as `prev` may still be dereferenced.
                        self.domain.protect(Slot::Prev, curr as usize);
                        prev = unsafe { &(*curr).next };
                        curr = unmark(curr_next) as *mut Node;
                    }
                    KeyOrder::Equal => {
                        return FindResult {
                            prev,
                            curr,
                            next: curr_next,
                            found: true,
                        };
                    }
                    KeyOrder::Greater => {
                        return FindResult {
                            prev,
                            curr,
                            next: curr_next,
                            found: false,
                        };
                    }
                }
            }
        }
    }
}

impl<S: RetireStrategy> Default for OrderedSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RetireStrategy> Drop for OrderedSet<S> {
    fn drop(&mut self) {
        // SAFETY: the caller asserts no mutator is active; walking raw `next` words and freeing
        // each node directly is sound because nothing else can be racing us.
        unsafe {
            let mut curr = self.head;
            while !curr.is_null() {
                let next_raw = (*curr).next.load(Ordering::Relaxed);
                let next = unmark(next_raw) as *mut Node;
                drop(Box::from_raw(curr));
                curr = next;
            }
        }
    }
}
