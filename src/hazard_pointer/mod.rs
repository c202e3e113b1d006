//! Hazard-pointer domain (components A/B/C wiring): per-thread publication slots, a pluggable
//! retire-list shape, and the scan that reclaims nodes no longer hazarded by anyone.

mod domain;
mod hazard;
mod retire;
mod retire_index;

pub use domain::{ArrayRetire, Domain, IndexedRetire, RetireStrategy};
pub use hazard::{Slot, MAX_K};
