//! A concurrent, lock-free ordered set of integer keys, reclaimed with hazard pointers.
//!
//! Two public set types share the same node layout and [`hazard_pointer::Domain`] machinery but
//! differ in how their `find` walks the list and recovers from a concurrent mutation:
//!
//! - [`list_set::OrderedSet`] restarts the whole traversal from the head on any inconsistency
//!   (the conservative discipline).
//! - [`list_set::WindowedSet`] tracks an explicit traversal origin and collapses a run of
//!   logically-deleted nodes into a single predecessor CAS (the windowed discipline).
//!
//! Pick one per workload; mixing both disciplines over the same list is not supported; see the
//! design notes in the repository root for why.
//!
//! Both set types are generic over [`hazard_pointer::RetireStrategy`], selecting between the
//! default array-form retire list ([`hazard_pointer::ArrayRetire`]) and an index-backed one
//! ([`hazard_pointer::IndexedRetire`]) that trades a more expensive push for a cheaper scan.

pub mod config;
pub mod hazard_pointer;
pub mod list_set;

mod instrumentation;
mod rbtree;
mod thread_id;

pub use config::Config;
pub use instrumentation::{Counters, CountersSnapshot};
pub use thread_id::{thread_id, T_MAX};
