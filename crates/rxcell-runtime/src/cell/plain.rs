#![forbid(unsafe_code)]

//! Plain value cells.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rxcell_core::{Modifier, Value};
use tracing::trace;

use super::{SourceHandle, WeakComputed};
use crate::tracker;

struct PlainInner {
    name: Rc<str>,
    value: Value,
    modifier: Modifier,
    /// Computed cells that read this cell during their latest evaluation.
    dependents: Vec<WeakComputed>,
}

/// A single mutable slot holding a plain value and its comparison policy.
///
/// Cloning a `PlainCell` clones the handle; both handles share the same
/// slot.
#[derive(Clone)]
pub(crate) struct PlainCell {
    inner: Rc<RefCell<PlainInner>>,
}

impl PlainCell {
    pub(crate) fn new(name: Rc<str>, value: Value, modifier: Modifier) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PlainInner {
                name,
                value,
                modifier,
                dependents: Vec::new(),
            })),
        }
    }

    pub(crate) fn name(&self) -> Rc<str> {
        Rc::clone(&self.inner.borrow().name)
    }

    pub(crate) fn modifier(&self) -> Modifier {
        self.inner.borrow().modifier
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Untracked snapshot of the current value.
    pub(crate) fn current(&self) -> Value {
        self.inner.borrow().value.clone()
    }

    /// Tracked read: registers this cell with any enclosing evaluation
    /// frame and returns the current value.
    pub(crate) fn get(&self) -> Value {
        tracker::record_read(&SourceHandle::Plain(self.clone()));
        self.current()
    }

    /// Normalize a candidate under this cell's policy: `None` when the
    /// write is indistinguishable from the current value.
    pub(crate) fn prepare(&self, candidate: Value) -> Option<Value> {
        let inner = self.inner.borrow();
        inner.modifier.prepare(&inner.value, candidate)
    }

    /// Store a prepared value and eagerly mark dependent computed cells
    /// dirty.
    pub(crate) fn commit(&self, value: Value) {
        let dependents = {
            let mut inner = self.inner.borrow_mut();
            trace!(property = %inner.name, "plain cell commit");
            inner.value = value;
            live_dependents(&mut inner.dependents)
        };
        for dependent in dependents {
            dependent.mark_dirty();
        }
    }

    pub(crate) fn add_dependent(&self, reader: &WeakComputed) {
        self.inner.borrow_mut().dependents.push(Weak::clone(reader));
    }

    pub(crate) fn remove_dependent(&self, reader: &WeakComputed) {
        self.inner
            .borrow_mut()
            .dependents
            .retain(|weak| !Weak::ptr_eq(weak, reader) && weak.strong_count() > 0);
    }
}

/// Prune dead back-edges and upgrade the live ones.
pub(crate) fn live_dependents(dependents: &mut Vec<WeakComputed>) -> Vec<super::ComputedCell> {
    dependents.retain(|weak| weak.strong_count() > 0);
    dependents
        .iter()
        .filter_map(|weak| weak.upgrade().map(super::ComputedCell::from_handle))
        .collect()
}
