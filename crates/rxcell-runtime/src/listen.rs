#![forbid(unsafe_code)]

//! Post-commit listener registry and the RAII [`Subscription`] guard.
//!
//! Listeners are invoked synchronously, in registration order, only after
//! a mutation has been committed. The registry never catches a listener's
//! panic; observer failures surface to the caller of the triggering write
//! rather than being swallowed.
//!
//! Callbacks are held as `Weak` references. Dropping the [`Subscription`]
//! guard drops the only strong reference, and the dead entry is pruned
//! lazily during the next notification cycle.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rxcell_core::ChangeRecord;

type ListenerRc = Rc<dyn Fn(&ChangeRecord)>;
type ListenerWeak = Weak<dyn Fn(&ChangeRecord)>;

/// Ordered registry of post-commit change observers.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: RefCell<Vec<ListenerWeak>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a listener. The returned guard deregisters it on drop.
    pub(crate) fn register(&self, callback: impl Fn(&ChangeRecord) + 'static) -> Subscription {
        let strong: ListenerRc = Rc::new(callback);
        self.listeners.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of live listeners. Prunes dead entries as a side effect.
    pub(crate) fn live_count(&self) -> usize {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|weak| weak.strong_count() > 0);
        listeners.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    /// Deliver a committed change record to every live listener, in
    /// registration order. Callbacks run outside the registry borrow, so a
    /// listener may re-enter the mutation protocol.
    pub(crate) fn notify(&self, record: &ChangeRecord) {
        let callbacks: Vec<ListenerRc> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|weak| weak.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in &callbacks {
            callback(record);
        }
    }
}

/// RAII guard for a registered listener or interceptor.
///
/// Dropping the guard drops the strong reference to the callback, so the
/// `Weak` entry held by the owning chain fails to upgrade on its next run
/// and is pruned.
pub struct Subscription {
    /// Type-erased strong reference keeping the callback `Rc` alive.
    pub(crate) _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rxcell_core::{ChangeKind, ObjectRef, Value};
    use std::cell::Cell;

    fn record(value: i64) -> ChangeRecord {
        ChangeRecord {
            kind: ChangeKind::Update,
            name: Rc::from("count"),
            object: ObjectRef::new(Rc::from("o"), 1),
            new_value: Value::from(value),
            old_value: Some(Value::from(value - 1)),
        }
    }

    #[test]
    fn notifies_in_registration_order() {
        let registry = ListenerRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_a = Rc::clone(&log);
        let _a = registry.register(move |_| log_a.borrow_mut().push('A'));
        let log_b = Rc::clone(&log);
        let _b = registry.register(move |_| log_b.borrow_mut().push('B'));
        let log_c = Rc::clone(&log);
        let _c = registry.register(move |_| log_c.borrow_mut().push('C'));

        registry.notify(&record(1));
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn listener_sees_the_record() {
        let registry = ListenerRegistry::new();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let _sub = registry.register(move |rec| {
            seen_clone.set(rec.new_value.as_int().unwrap());
        });

        registry.notify(&record(42));
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn dropping_subscription_deregisters() {
        let registry = ListenerRegistry::new();
        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let sub = registry.register(move |_| calls_clone.set(calls_clone.get() + 1));

        registry.notify(&record(1));
        assert_eq!(calls.get(), 1);

        drop(sub);
        registry.notify(&record(2));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn dead_listeners_are_pruned_lazily() {
        let registry = ListenerRegistry::new();
        let _kept = registry.register(|_| {});
        let dropped = registry.register(|_| {});
        drop(dropped);

        assert_eq!(registry.live_count(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn empty_registry() {
        let registry = ListenerRegistry::new();
        assert!(registry.is_empty());
        registry.notify(&record(1)); // No listeners: nothing to do.
    }
}
