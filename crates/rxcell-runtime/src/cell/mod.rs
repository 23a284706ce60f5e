#![forbid(unsafe_code)]

//! Reactive cells: the per-property slots owned by an administration.
//!
//! A cell is either a [`PlainCell`] (a mutable value plus its comparison
//! policy) or a [`ComputedCell`] (a lazy, memoized derivation). The
//! variant is fixed when the property is registered and never changes for
//! the object's lifetime.
//!
//! Cells form the dependency graph: every cell keeps weak back-edges to
//! the computed cells that read it during their most recent evaluation,
//! and a commit walks those edges to eagerly mark dependents dirty.

pub(crate) mod computed;
pub(crate) mod plain;

pub(crate) use computed::{ComputedCell, DeriveFn, SetterFn, WeakComputed};
pub(crate) use plain::PlainCell;

/// A registered cell, as stored in the administration's name registry.
#[derive(Clone)]
pub(crate) enum ReactiveCell {
    Plain(PlainCell),
    Computed(ComputedCell),
}

/// Handle to a cell in its role as a dependency source.
#[derive(Clone)]
pub(crate) enum SourceHandle {
    Plain(PlainCell),
    Computed(ComputedCell),
}

impl SourceHandle {
    /// Identity comparison: same underlying cell allocation.
    pub(crate) fn same_cell(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => a.ptr_eq(b),
            (Self::Computed(a), Self::Computed(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub(crate) fn add_dependent(&self, reader: &WeakComputed) {
        match self {
            Self::Plain(cell) => cell.add_dependent(reader),
            Self::Computed(cell) => cell.add_dependent(reader),
        }
    }

    pub(crate) fn remove_dependent(&self, reader: &WeakComputed) {
        match self {
            Self::Plain(cell) => cell.remove_dependent(reader),
            Self::Computed(cell) => cell.remove_dependent(reader),
        }
    }
}
