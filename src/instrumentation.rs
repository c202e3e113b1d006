//! Instrumentation hook (component E).
//!
//! A set of monotonic counters that, when the `instrument` feature is enabled, track retries, CAS
//! attempts, traversal steps, and logical/physical deletions. With the feature disabled every
//! counting site compiles away entirely — the [`count`] macro expands to nothing, so there is no
//! runtime cost and no counter is ever read on the fast path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-domain retry/CAS/traversal counters.
///
/// Present regardless of the `instrument` feature so that code can always hold a `&Counters`
/// without conditional compilation; the fields themselves only move when `instrument` is on.
#[derive(Debug, Default)]
pub struct Counters {
    pub retries: AtomicU64,
    pub consistency_aborts: AtomicU64,
    pub traversal_steps: AtomicU64,
    pub cas_attempts: AtomicU64,
    pub logical_delete_retries: AtomicU64,
    pub logical_insert_retries: AtomicU64,
    pub nodes_constructed: AtomicU64,
    pub nodes_destroyed: AtomicU64,
}

impl Counters {
    /// A consistent, not-necessarily-atomic-as-a-whole snapshot of all counters.
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            retries: self.retries.load(Ordering::Relaxed),
            consistency_aborts: self.consistency_aborts.load(Ordering::Relaxed),
            traversal_steps: self.traversal_steps.load(Ordering::Relaxed),
            cas_attempts: self.cas_attempts.load(Ordering::Relaxed),
            logical_delete_retries: self.logical_delete_retries.load(Ordering::Relaxed),
            logical_insert_retries: self.logical_insert_retries.load(Ordering::Relaxed),
            nodes_constructed: self.nodes_constructed.load(Ordering::Relaxed),
            nodes_destroyed: self.nodes_destroyed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`Counters`], cheap to pass around and compare in tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub retries: u64,
    pub consistency_aborts: u64,
    pub traversal_steps: u64,
    pub cas_attempts: u64,
    pub logical_delete_retries: u64,
    pub logical_insert_retries: u64,
    pub nodes_constructed: u64,
    pub nodes_destroyed: u64,
}

/// Bumps `$counters.$field` by one when the `instrument` feature is on; a no-op otherwise.
#[cfg(feature = "instrument")]
macro_rules! count {
    ($counters:expr, $field:ident) => {
        $counters.$field.fetch_add(1, ::std::sync::atomic::Ordering::Relaxed)
    };
}

#[cfg(not(feature = "instrument"))]
macro_rules! count {
    ($counters:expr, $field:ident) => {{
        let _ = &$counters;
    }};
}

pub(crate) use count;

/// Bumps `$counters.$field` by `$n` when the `instrument` feature is on; a no-op otherwise. Used
/// where a single operation accounts for more than one unit (e.g. a scan freeing several nodes).
#[cfg(feature = "instrument")]
macro_rules! count_by {
    ($counters:expr, $field:ident, $n:expr) => {
        $counters.$field.fetch_add($n as u64, ::std::sync::atomic::Ordering::Relaxed)
    };
}

#[cfg(not(feature = "instrument"))]
macro_rules! count_by {
    ($counters:expr, $field:ident, $n:expr) => {{
        let _ = (&$counters, $n);
    }};
}

pub(crate) use count_by;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_macro_updates_field_when_enabled() {
        let counters = Counters::default();
        count!(counters, retries);
        count!(counters, retries);
        let snap = counters.snapshot();
        #[cfg(feature = "instrument")]
        assert_eq!(snap.retries, 2);
        #[cfg(not(feature = "instrument"))]
        assert_eq!(snap.retries, 0);
    }

    #[test]
    fn count_by_macro_adds_n_when_enabled() {
        let counters = Counters::default();
        count_by!(counters, nodes_destroyed, 3usize);
        let snap = counters.snapshot();
        #[cfg(feature = "instrument")]
        assert_eq!(snap.nodes_destroyed, 3);
        #[cfg(not(feature = "instrument"))]
        assert_eq!(snap.nodes_destroyed, 0);
    }
}
