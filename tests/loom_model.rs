//! Model-checked interleavings for the core protect/retire/scan/CAS race, gated behind the
//! `check-loom` feature the way the course retire list this crate started from already was.
//!
//! Loom explores every thread interleaving of a tiny workload, so these stay deliberately small
//! (two threads, a handful of keys) — anything larger makes the state space intractable.

#![cfg(feature = "check-loom")]

use hazlist::list_set::OrderedSet;

#[test]
fn two_threads_insert_disjoint_keys() {
    loom::model(|| {
        let set: OrderedSet = OrderedSet::new();
        let set = loom::sync::Arc::new(set);

        let handles: Vec<_> = (0..2)
            .map(|t| {
                let set = set.clone();
                loom::thread::spawn(move || {
                    assert!(set.insert(t * 2 + 1));
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert!(set.contains(1));
        assert!(set.contains(3));
    });
}

#[test]
fn concurrent_insert_and_delete_of_the_same_key_is_linearizable() {
    loom::model(|| {
        let set: OrderedSet = OrderedSet::new();
        let set = loom::sync::Arc::new(set);
        set.insert(7);

        let deleter = {
            let set = set.clone();
            loom::thread::spawn(move || set.delete(7))
        };
        let reader = {
            let set = set.clone();
            loom::thread::spawn(move || set.contains(7))
        };

        let deleted = deleter.join().unwrap();
        let _ = reader.join().unwrap();

        assert!(deleted);
        assert!(!set.contains(7));
    });
}

#[test]
fn concurrent_inserts_of_the_same_key_exactly_one_wins() {
    loom::model(|| {
        let set: OrderedSet = OrderedSet::new();
        let set = loom::sync::Arc::new(set);

        let a = {
            let set = set.clone();
            loom::thread::spawn(move || set.insert(1))
        };
        let b = {
            let set = set.clone();
            loom::thread::spawn(move || set.insert(1))
        };

        let a_won = a.join().unwrap();
        let b_won = b.join().unwrap();

        assert!(a_won != b_won, "exactly one of two racing inserts must win");
        assert!(set.contains(1));
    });
}
