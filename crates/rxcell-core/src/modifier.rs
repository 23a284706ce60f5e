#![forbid(unsafe_code)]

//! Value-comparison policies for plain cells.
//!
//! A [`Modifier`] decides whether a candidate write is an effective change.
//! It is fixed per cell at registration time and applied by the mutation
//! protocol before a commit: a candidate indistinguishable from the current
//! value under the cell's policy is a silent no-op — no commit, no
//! notification.

use crate::value::Value;

/// Equality policy applied when normalizing a candidate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modifier {
    /// Scalars by value, composites by pointer identity.
    #[default]
    Reference,
    /// One structural level; composite elements compared by identity.
    Shallow,
    /// Full structural recursion.
    Deep,
}

impl Modifier {
    /// Whether `candidate` is indistinguishable from `current` under this
    /// policy.
    #[must_use]
    pub fn unchanged(self, current: &Value, candidate: &Value) -> bool {
        match self {
            Self::Reference => current.reference_eq(candidate),
            Self::Shallow => current.shallow_eq(candidate),
            Self::Deep => current.deep_eq(candidate),
        }
    }

    /// Normalize a candidate against the current value: returns `None` when
    /// the write is a no-op, or the value to commit.
    #[must_use]
    pub fn prepare(self, current: &Value, candidate: Value) -> Option<Value> {
        if self.unchanged(current, &candidate) {
            None
        } else {
            Some(candidate)
        }
    }
}
