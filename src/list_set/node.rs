//! Shared node layout and mark-bit helpers for both find disciplines (component D).
//!
//! A node's `next` word packs a raw node address together with a one-bit "logically deleted"
//! mark in its low bit, the same encoding `crossbeam-epoch`'s internal `sync::list` uses for its
//! Harris-style list. Packing the mark into the pointer itself is what makes the single CAS that
//! marks a node for deletion also a consistency check against concurrent insertion right after it.

use static_assertions::const_assert;

cfg_if::cfg_if! {
    if #[cfg(feature = "check-loom")] {
        use loom::sync::atomic::AtomicUsize;
    } else {
        use std::sync::atomic::AtomicUsize;
    }
}

/// A set member's key. Fixed-width unsigned integer matching a machine pointer, per the data
/// model — this keeps the mark bit and the key comparison both simple `usize` operations.
pub type Key = usize;

/// Debug-only guard value every live node carries. A traversal that dereferences a node asserts
/// this is still intact, turning a use-after-free into an immediate panic instead of silent
/// corruption.
const MAGIC: usize = 0xA5A5_A5A5_CAFE_F00D_u64 as usize;

pub(crate) struct Node {
    pub key: Key,
    pub next: AtomicUsize,
    magic: usize,
}

const_assert!(std::mem::align_of::<Node>() >= 2);

impl Node {
    /// Allocates a node with `next_raw` as its initial (unmarked) next word and returns an owning
    /// raw pointer. The caller is responsible for eventually retiring or directly freeing it.
    pub fn new(key: Key, next_raw: usize) -> *mut Node {
        Box::into_raw(Box::new(Node {
            key,
            next: AtomicUsize::new(next_raw),
            magic: MAGIC,
        }))
    }

    /// Panics if `ptr` does not carry this module's magic value — a use-after-free guard, not a
    /// synchronization mechanism.
    ///
    /// # Safety
    ///
    /// `ptr` must be either dangling-but-never-dereferenced or point at a live `Node` allocated by
    /// [`Node::new`].
    pub unsafe fn check_alive(ptr: *const Node) {
        debug_assert_eq!(
            (*ptr).magic,
            MAGIC,
            "hazlist: dereferenced a freed node at {:p} (use-after-free)",
            ptr
        );
    }
}

#[inline]
pub(crate) fn mark(p: usize) -> usize {
    p | 1
}

#[inline]
pub(crate) fn unmark(p: usize) -> usize {
    p & !1usize
}

#[inline]
pub(crate) fn is_marked(p: usize) -> bool {
    p & 1 != 0
}
