//! Thread-identity allocator (component A).
//!
//! Every thread that touches a [`crate::hazard_pointer::Domain`] is assigned a small, dense,
//! process-wide unique id the first time it calls [`thread_id`]. The id is cached in a
//! thread-local and reused for the remainder of the thread's life; ids are never returned to the
//! pool, so thread participation is append-only for the process lifetime.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Upper bound on the number of threads that may participate in any domain. Growing the thread
/// table at runtime is explicitly out of scope; this bound is a compile-time constant.
pub const T_MAX: usize = 128;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THIS_THREAD_ID: Cell<Option<usize>> = Cell::new(None);
}

/// Returns this thread's dense id, allocating one on first use.
///
/// # Panics
///
/// Panics if more than [`T_MAX`] distinct threads ever call this function over the process
/// lifetime. This is the "programmer misuse" class from the error-handling design: exceeding the
/// compile-time thread table is unrecoverable.
pub fn thread_id() -> usize {
    THIS_THREAD_ID.with(|cell| {
        if let Some(id) = cell.get() {
            return id;
        }
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        assert!(
            id < T_MAX,
            "hazlist: exceeded the maximum number of participating threads (T_MAX = {})",
            T_MAX
        );
        cell.set(Some(id));
        id
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn ids_are_dense_and_stable() {
        let id = thread_id();
        assert_eq!(thread_id(), id);
        assert_eq!(thread_id(), id);
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let seen = Mutex::new(HashSet::new());
        thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    let id = thread_id();
                    assert!(seen.lock().unwrap().insert(id), "duplicate thread id {id}");
                });
            }
        });
    }
}
