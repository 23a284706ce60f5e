#![forbid(unsafe_code)]

//! Change records and pre-commit change proposals.
//!
//! A [`ChangeRecord`] is the immutable, post-commit description of a
//! mutation delivered to listeners and the diagnostic reporter. A
//! [`ChangeProposal`] is the same shape pre-commit: interceptors may
//! rewrite its `new_value` or veto it entirely; every other field is fixed
//! by the protocol.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Whether a mutation introduces a property or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Update,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Cheap diagnostic handle to a reactive object: its name plus a
/// process-unique id. Not an owning reference; equality is id equality.
#[derive(Debug, Clone)]
pub struct ObjectRef {
    name: Rc<str>,
    id: u64,
}

impl ObjectRef {
    #[must_use]
    pub fn new(name: Rc<str>, id: u64) -> Self {
        Self { name, id }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObjectRef {}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A committed mutation. `old_value` is present only for updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub name: Rc<str>,
    pub object: ObjectRef,
    pub new_value: Value,
    pub old_value: Option<Value>,
}

/// A pending mutation, as seen by the interceptor chain. Only `new_value`
/// is writable; the remaining fields are read-only.
#[derive(Debug, Clone)]
pub struct ChangeProposal {
    kind: ChangeKind,
    name: Rc<str>,
    object: ObjectRef,
    old_value: Option<Value>,
    /// The value that would be committed. Handlers may replace it.
    pub new_value: Value,
}

impl ChangeProposal {
    #[must_use]
    pub fn new(
        kind: ChangeKind,
        name: Rc<str>,
        object: ObjectRef,
        new_value: Value,
        old_value: Option<Value>,
    ) -> Self {
        Self {
            kind,
            name,
            object,
            old_value,
            new_value,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    #[must_use]
    pub fn old_value(&self) -> Option<&Value> {
        self.old_value.as_ref()
    }
}
