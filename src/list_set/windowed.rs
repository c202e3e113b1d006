//! Windowed find discipline (component D, discipline 2): tracks an explicit traversal origin
//! (`Start`) and collapses a run of consecutive logically-deleted nodes into a single predecessor
//! CAS instead of unlinking them one at a time.
//!
//! This crate always restarts a windowed find from the set's head rather than resuming from a
//! previous operation's `Start`: the data model allows resuming mid-list as a throughput
//! optimization, but correctness does not depend on it, and starting from head keeps this type's
//! invariants identical to [`super::conservative::OrderedSet`]'s.

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
/// windowed find discipline.
///
/// Keys `0` and `usize::MAX` are reserved for the head/tail sentinels and may not be inserted.
pub struct WindowedSet<S: RetireStrategy = ArrayRetire> {
    head: *mut Node,
    tail: *mut Node,
    domain: Domain<S>,
}

// SAFETY: see `OrderedSet`'s identical justification — all node access is mediated by atomics and
// the hazard-pointer protocol.
unsafe impl<S: RetireStrategy> Send for WindowedSet<S> {}
unsafe impl<S: RetireStrategy> Sync for WindowedSet<S> {}

struct FindResult {
    prev: *const AtomicUsize,
    curr: *mut Node,
    next: usize,
    found: bool,
}

impl<S: RetireStrategy> WindowedSet<S> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(mut config: Config) -> Self {
        config.k = config.k.max(4); // `Start` is the fourth slot.
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

    pub fn contains(&self, key: Key) -> bool {
        debug_assert!(key != HEAD_KEY && key != TAIL_KEY);
        let r = self.find(key);
        self.domain.clear();
        r.found
    }

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

            // SAFETY: `node` is not yet reachable by any other thread.
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
                        self.domain.clear();
                        return true;
                    }
                    count!(self.domain.counters, logical_delete_retries);
                }
            }
        }
    }

    /// Windowed find: publishes `self.head` into `Start`, then walks forward tracking the last
    /// unmarked predecessor's `next` field, collapsing any run of marked nodes it passes over into
    /// a single predecessor CAS.
    fn find(&self, key: Key) -> FindResult {
        'retry: loop {
            self.domain.protect(Slot::Start, self.head as usize);
            self.domain.protect(Slot::Prev, self.head as usize);
            let mut prev: *const AtomicUsize = unsafe { &(*self.head).next };
            let start_next = unsafe { (*self.head).next.load(Ordering::Acquire) };
            let mut curr = unmark(start_next) as *mut Node;
            let mut first_marked: Option<*mut Node> = None;

            loop {
                if curr == self.tail {
                    if let Some(first) = first_marked {
                        if !self.unlink_run(prev, first, curr as usize) {
                            continue 'retry;
                        }
                    }
                    return FindResult {
                        prev,
                        curr,
                        next: 0,
                        found: false,
                    };
                }

                self.domain.protect(Slot::Curr, curr as usize);
                unsafe {
                    Node::check_alive(curr);
                }
                let curr_next = unsafe { (*curr).next.load(Ordering::Acquire) };
                self.domain.protect(Slot::Next, unmark(curr_next));
                count!(self.domain.counters, traversal_steps);

                if is_marked(curr_next) {
                    if first_marked.is_none() {
                        first_marked = Some(curr);
                    }
                    curr = unmark(curr_next) as *mut Node;
                    continue;
                }

                if let Some(first) = first_marked.take() {
                    if !self.unlink_run(prev, first, curr as usize) {
                        count!(self.domain.counters, retries);
                        continue 'retry;
                    }
                }

                let curr_key = unsafe { (*curr).key };
                match curr_key.cmp(&key) {
                    KeyOrder::Less => {
                        // `curr` is about to become the node `prev` points into; publish it to
                        // `Slot::Prev` before `Slot::Curr` moves past it, so it stays hazarded for
                        // as long as `prev`/`pred` may still be dereferenced (including inside a
                        // later `unlink_run` call with this `prev` as its `pred`).
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

    /// CASes `*pred` from `first`'s address to `succ`, retiring every node in the run from `first`
    /// up to (but excluding) `succ` on success. Returns whether the CAS succeeded; on failure the
    /// caller restarts the whole find from `Start`.
    ///
    /// Caller must have `pred`'s owning node published in `Slot::Prev` before calling; `find`
    /// maintains that invariant for every `prev` it passes in here.
    fn unlink_run(&self, pred: *const AtomicUsize, first: *mut Node, succ: usize) -> bool {
        count!(self.domain.counters, cas_attempts);
        let pred_ref = unsafe { &*pred };
        match pred_ref.compare_exchange(first as usize, succ, Ordering::Release, Ordering::Relaxed)
        {
            Ok(_) => {
                let mut node = first;
                loop {
                    let next_raw = unsafe { (*node).next.load(Ordering::Acquire) };
                    let next = unmark(next_raw) as *mut Node;
                    self.domain.retire(node);
                    if next as usize == succ {
                        break;
                    }
                    node = next;
                }
                true
            }
            Err(_) => false,
        }
    }
}

impl<S: RetireStrategy> Default for WindowedSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RetireStrategy> Drop for WindowedSet<S> {
    fn drop(&mut self) {
        // SAFETY: see `OrderedSet::drop` — the caller asserts no mutator is active.
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
