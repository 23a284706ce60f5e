//! Property-based invariant tests for the mutation protocol.
//!
//! These verify the counting laws that must hold for **any** sequence of
//! writes:
//!
//! 1. The number of delivered Update records equals the number of writes
//!    whose value differs from the immediately preceding value; no-op
//!    writes deliver nothing.
//! 2. Every delivered record carries the previous committed value as
//!    `old_value` and the written value as `new_value`.
//! 3. A derivation runs at most once between two invalidations, no matter
//!    how many reads happen in between (memoization law).
//! 4. A veto-all interceptor makes the property fully write-inert.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use rxcell_core::{ChangeRecord, Modifier, Value};
use rxcell_runtime::{Reactive, ReactiveObject};

/// A read/write script against a single plain property.
#[derive(Debug, Clone)]
enum Op {
    Write(i64),
    Read,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![(-5i64..=5).prop_map(Op::Write), Just(Op::Read)],
        0..60,
    )
}

fn plain_counter(initial: i64) -> ReactiveObject {
    let object = ReactiveObject::new("prop");
    object
        .register_plain("n", Value::from(initial), Modifier::Reference)
        .unwrap();
    object
}

proptest! {
    // ── 1 & 2: update counting and record contents ──────────────────────

    #[test]
    fn updates_delivered_iff_value_changed(initial in -5i64..=5, writes in proptest::collection::vec(-5i64..=5, 0..60)) {
        let object = plain_counter(initial);
        let records: Rc<RefCell<Vec<ChangeRecord>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&records);
        let _sub = object.observe(move |rec| sink.borrow_mut().push(rec.clone()));

        let mut current = initial;
        let mut expected: Vec<(i64, i64)> = Vec::new();
        for &candidate in &writes {
            object.set("n", Value::from(candidate)).unwrap();
            if candidate != current {
                expected.push((current, candidate));
                current = candidate;
            }
        }

        let records = records.borrow();
        prop_assert_eq!(records.len(), expected.len());
        for (record, (old, new)) in records.iter().zip(&expected) {
            prop_assert_eq!(record.old_value.clone(), Some(Value::from(*old)));
            prop_assert_eq!(record.new_value.clone(), Value::from(*new));
        }
        prop_assert_eq!(object.get("n").unwrap(), Value::from(current));
    }

    // ── 3: memoization law ──────────────────────────────────────────────

    #[test]
    fn derivation_runs_at_most_once_per_invalidation(script in ops()) {
        let object = plain_counter(0);
        let evaluations = Rc::new(Cell::new(0u32));
        let tally = Rc::clone(&evaluations);
        object
            .register_computed("negated", move |scope: &ReactiveObject| {
                tally.set(tally.get() + 1);
                let n = scope.administration().get_value("n")?.as_int().unwrap_or(0);
                Ok(Value::from(-n))
            })
            .unwrap();

        // Shadow simulation: a read evaluates only when dirty; an
        // effective write makes the cell dirty.
        let mut current = 0i64;
        let mut dirty = true;
        let mut expected_evals = 0u32;
        for op in &script {
            match op {
                Op::Write(candidate) => {
                    object.set("n", Value::from(*candidate)).unwrap();
                    if *candidate != current {
                        current = *candidate;
                        dirty = true;
                    }
                }
                Op::Read => {
                    let got = object.get("negated").unwrap();
                    prop_assert_eq!(got, Value::from(-current));
                    if dirty {
                        expected_evals += 1;
                        dirty = false;
                    }
                }
            }
        }
        prop_assert_eq!(evaluations.get(), expected_evals);
    }

    // ── 4: veto-all interceptor ─────────────────────────────────────────

    #[test]
    fn veto_all_is_fully_write_inert(initial in -5i64..=5, writes in proptest::collection::vec(-100i64..=100, 0..40)) {
        let object = plain_counter(initial);
        let _veto = object.intercept(|_| None);
        let delivered = Rc::new(Cell::new(0u32));
        let tally = Rc::clone(&delivered);
        let _sub = object.observe(move |_| tally.set(tally.get() + 1));

        for &candidate in &writes {
            object.set("n", Value::from(candidate)).unwrap();
        }

        prop_assert_eq!(object.get("n").unwrap(), Value::from(initial));
        prop_assert_eq!(delivered.get(), 0);
    }

    // ── Transform composition ───────────────────────────────────────────

    #[test]
    fn transformed_value_reaches_cell_and_record(writes in proptest::collection::vec(-100i64..=100, 1..40)) {
        let object = plain_counter(0);
        let _clamp = object.intercept(|mut proposal| {
            let n = proposal.new_value.as_int().unwrap_or(0).clamp(-10, 10);
            proposal.new_value = Value::from(n);
            Some(proposal)
        });
        let records: Rc<RefCell<Vec<ChangeRecord>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&records);
        let _sub = object.observe(move |rec| sink.borrow_mut().push(rec.clone()));

        let mut current = 0i64;
        for &candidate in &writes {
            object.set("n", Value::from(candidate)).unwrap();
            let clamped = candidate.clamp(-10, 10);
            if clamped != current {
                current = clamped;
            }
        }

        prop_assert_eq!(object.get("n").unwrap(), Value::from(current));
        for record in records.borrow().iter() {
            let n = record.new_value.as_int().unwrap();
            prop_assert!((-10..=10).contains(&n));
        }
    }
}
