//! Indexed-form retire list (component C integration): an ordered index of retired pointers,
//! backed by the red-black tree in [`crate::rbtree`], used to accelerate a scan by transposing
//! its loop order — probe the index once per live hazard, instead of walking the hazard table
//! once per retiree.

use crate::rbtree::RbTree;

use super::hazard::Hazards;

#[derive(Default)]
pub(crate) struct IndexedRetireList {
    tree: RbTree<usize, unsafe fn(usize)>,
}

impl IndexedRetireList {
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn push(&mut self, ptr: usize, free: unsafe fn(usize)) {
        let inserted = self.tree.insert(ptr, free);
        debug_assert!(inserted, "hazlist: pointer {:#x} retired twice", ptr);
    }

    /// Collects every hazard published by another thread, then rebuilds the index from the
    /// survivors, freeing anything not in that set. Returns the number freed.
    pub fn scan(&mut self, hazards: &Hazards, thread: usize) -> usize {
        let protected = hazards.hazards_excluding(thread);
        let old = std::mem::take(&mut self.tree);
        let mut rebuilt = RbTree::new();
        let mut freed = 0;
        old.walk_and_destroy(|ptr, free| {
            if protected.contains(&ptr) {
                rebuilt.insert(ptr, free);
            } else {
                // SAFETY: no hazard slot publishes `ptr`.
                unsafe {
                    free(ptr);
                }
                freed += 1;
            }
        });
        self.tree = rebuilt;
        freed
    }

    /// Frees every remaining retiree unconditionally; see `ArrayRetireList::destroy_all`.
    pub fn destroy_all(&mut self) -> usize {
        let old = std::mem::take(&mut self.tree);
        let mut freed = 0;
        old.walk_and_destroy(|ptr, free| {
            freed += 1;
            // SAFETY: caller asserts no mutator is active.
            unsafe {
                free(ptr);
            }
        });
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn noop_free(_: usize) {}

    #[test]
    fn scan_frees_entries_with_no_hazard() {
        let hazards = Hazards::new(4);
        let mut list = IndexedRetireList::default();
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
        let mut list = IndexedRetireList::default();
        list.push(0x1000, noop_free);
        list.push(0x2000, noop_free);
        let freed = list.scan(&hazards, 0);
        assert_eq!(freed, 1);
        assert_eq!(list.len(), 1);
    }
}
