#![forbid(unsafe_code)]

//! Computed cells: lazy, memoized derivations with cycle detection.
//!
//! # State machine
//!
//! A computed cell is always in one of three states:
//!
//! - **Dirty**: the memo is stale (or was never produced). The next read
//!   evaluates the derivation under a fresh tracker frame, rewires the
//!   cell's dependency edges to exactly the cells read, memoizes the
//!   result, and transitions to Clean.
//! - **Clean**: the memo is valid and reads answer from it in O(1).
//! - **Evaluating**: the derivation is currently running. A read in this
//!   state is a cyclic dependency and fails; the cell is left Dirty once
//!   the in-flight evaluation unwinds.
//!
//! Invalidation is eager-mark, lazy-recompute: when a dependency commits,
//! Clean cells flip to Dirty and propagate transitively, but nothing is
//! recomputed until the next read.
//!
//! A derivation that returns an error or panics leaves the cell Dirty,
//! so the next read retries instead of reporting a spurious cycle.

use std::cell::RefCell;
use std::mem;
use std::rc::{Rc, Weak};

use rxcell_core::{ObjectRef, Result, RxError, Value};
use tracing::trace;

use super::{SourceHandle, plain::live_dependents};
use crate::object::ReactiveObject;
use crate::tracker;

pub(crate) type DeriveFn = Rc<dyn Fn(&ReactiveObject) -> Result<Value>>;
pub(crate) type SetterFn = Rc<dyn Fn(&ReactiveObject, Value) -> Result<()>>;
pub(crate) type WeakComputed = Weak<RefCell<ComputedInner>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellState {
    Clean,
    Dirty,
    Evaluating,
}

pub(crate) struct ComputedInner {
    name: Rc<str>,
    object: ObjectRef,
    derive: DeriveFn,
    setter: Option<SetterFn>,
    cached: Option<Value>,
    state: CellState,
    /// Cells read during the most recent evaluation.
    sources: Vec<SourceHandle>,
    /// Computed cells that read this cell during their latest evaluation.
    dependents: Vec<WeakComputed>,
}

/// A lazy, memoized derived property.
///
/// Cloning a `ComputedCell` clones the handle; both handles share the
/// same slot.
#[derive(Clone)]
pub(crate) struct ComputedCell {
    inner: Rc<RefCell<ComputedInner>>,
}

impl ComputedCell {
    pub(crate) fn new(
        name: Rc<str>,
        object: ObjectRef,
        derive: DeriveFn,
        setter: Option<SetterFn>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComputedInner {
                name,
                object,
                derive,
                setter,
                cached: None,
                state: CellState::Dirty,
                sources: Vec::new(),
                dependents: Vec::new(),
            })),
        }
    }

    pub(crate) fn from_handle(inner: Rc<RefCell<ComputedInner>>) -> Self {
        Self { inner }
    }

    pub(crate) fn name(&self) -> Rc<str> {
        Rc::clone(&self.inner.borrow().name)
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.inner.borrow().state == CellState::Dirty
    }

    /// Read the cell, recomputing if stale.
    pub(crate) fn get(&self, scope: &ReactiveObject) -> Result<Value> {
        let state = self.inner.borrow().state;
        match state {
            CellState::Evaluating => {
                let inner = self.inner.borrow();
                Err(RxError::CyclicDependency {
                    object: inner.object.name().to_string(),
                    name: inner.name.to_string(),
                })
            }
            CellState::Clean => {
                let value = self
                    .inner
                    .borrow()
                    .cached
                    .clone()
                    .expect("clean computed cell always holds a memoized value");
                tracker::record_read(&SourceHandle::Computed(self.clone()));
                Ok(value)
            }
            CellState::Dirty => self.evaluate(scope),
        }
    }

    /// Forward a write to the explicit setter, if one was registered.
    pub(crate) fn set(&self, scope: &ReactiveObject, value: Value) -> Result<()> {
        let setter = self.inner.borrow().setter.clone();
        match setter {
            Some(setter) => setter(scope, value),
            None => {
                let inner = self.inner.borrow();
                Err(RxError::ComputedNotWritable {
                    object: inner.object.name().to_string(),
                    name: inner.name.to_string(),
                })
            }
        }
    }

    /// Eagerly mark this cell (and, transitively, its dependents) stale.
    /// Already-dirty subgraphs are not revisited.
    pub(crate) fn mark_dirty(&self) {
        let dependents = {
            let mut inner = self.inner.borrow_mut();
            match inner.state {
                CellState::Clean => {
                    trace!(property = %inner.name, "computed cell invalidated");
                    inner.state = CellState::Dirty;
                    live_dependents(&mut inner.dependents)
                }
                // Dirty: dependents were already invalidated the first
                // time. Evaluating: derivations are pure reads; a commit
                // never lands mid-evaluation in the cooperative model.
                CellState::Dirty | CellState::Evaluating => Vec::new(),
            }
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

    /// Run the derivation under a fresh tracker frame, rewire dependency
    /// edges to exactly the cells it read, and memoize the result.
    fn evaluate(&self, scope: &ReactiveObject) -> Result<Value> {
        self.detach_sources();
        let derive = {
            let mut inner = self.inner.borrow_mut();
            inner.state = CellState::Evaluating;
            Rc::clone(&inner.derive)
        };
        // Evaluating must not outlive this call: a derivation that fails
        // or panics leaves the cell Dirty so the next read retries.
        let mut guard = StateGuard {
            inner: Some(Rc::clone(&self.inner)),
        };

        let (result, reads) = tracker::with_frame(|| derive(scope));
        let value = result?;
        guard.disarm();

        let reader = Rc::downgrade(&self.inner);
        for source in &reads {
            source.add_dependent(&reader);
        }
        {
            let mut inner = self.inner.borrow_mut();
            trace!(
                property = %inner.name,
                dependencies = reads.len(),
                "computed cell evaluated"
            );
            inner.sources = reads;
            inner.cached = Some(value.clone());
            inner.state = CellState::Clean;
        }
        tracker::record_read(&SourceHandle::Computed(self.clone()));
        Ok(value)
    }

    /// Drop the back-edges from the previous evaluation so the dependency
    /// set reflects only the upcoming pass.
    fn detach_sources(&self) {
        let sources = mem::take(&mut self.inner.borrow_mut().sources);
        let reader = Rc::downgrade(&self.inner);
        for source in sources {
            source.remove_dependent(&reader);
        }
    }
}

/// Restores `Dirty` on drop unless disarmed, so an evaluation that
/// unwinds never strands the cell in `Evaluating`.
struct StateGuard {
    inner: Option<Rc<RefCell<ComputedInner>>>,
}

impl StateGuard {
    fn disarm(&mut self) {
        self.inner = None;
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.borrow_mut().state = CellState::Dirty;
        }
    }
}
