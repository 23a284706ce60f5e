#![forbid(unsafe_code)]

//! Reactive objects and the [`Reactive`] accessor trait.
//!
//! A [`ReactiveObject`] is the external structured value: it owns exactly
//! one [`Administration`], created lazily and idempotently on first use
//! and retained for the object's lifetime. Property access goes through
//! the [`Reactive`] trait, which dispatches by name through the shared
//! accessor installed when the property was registered.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use rxcell_core::{
    ChangeProposal, ChangeRecord, Modifier, ObjectRef, Result, RxError, Value,
};

use crate::accessor::Accessor;
use crate::admin::{AdminOptions, Administration};
use crate::listen::Subscription;

thread_local! {
    static NEXT_OBJECT_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_object_id() -> u64 {
    NEXT_OBJECT_ID.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

pub(crate) struct ObjectInner {
    name: Rc<str>,
    id: u64,
    options: AdminOptions,
    admin: OnceCell<Administration>,
    /// Shared accessors installed for this object's properties.
    accessors: RefCell<AHashMap<Rc<str>, Rc<Accessor>>>,
}

/// A structured value with reactive properties.
///
/// Cloning a `ReactiveObject` clones the handle; both handles share the
/// same administration.
pub struct ReactiveObject {
    pub(crate) inner: Rc<ObjectInner>,
}

impl Clone for ReactiveObject {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveObject")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("administered", &self.has_administration())
            .finish()
    }
}

impl ReactiveObject {
    /// Create an object with a diagnostic name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, AdminOptions::default())
    }

    /// Create an object with explicit administration options.
    #[must_use]
    pub fn with_options(name: impl Into<String>, options: AdminOptions) -> Self {
        let name: String = name.into();
        Self::build(Rc::from(name.as_str()), options)
    }

    /// Create an object with a generated diagnostic name.
    #[must_use]
    pub fn anonymous() -> Self {
        let id = next_object_id();
        let inner = Rc::new(ObjectInner {
            name: Rc::from(format!("ReactiveObject@{id}").as_str()),
            id,
            options: AdminOptions::default(),
            admin: OnceCell::new(),
            accessors: RefCell::new(AHashMap::new()),
        });
        Self { inner }
    }

    fn build(name: Rc<str>, options: AdminOptions) -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                name,
                id: next_object_id(),
                options,
                admin: OnceCell::new(),
                accessors: RefCell::new(AHashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(Rc::clone(&self.inner.name), self.inner.id)
    }

    /// The object's administration, created on first use. Creation is
    /// lazy and idempotent: every call returns the same instance.
    pub fn administration(&self) -> &Administration {
        self.inner.admin.get_or_init(|| {
            Administration::new(
                self.object_ref(),
                Rc::downgrade(&self.inner),
                self.inner.options,
            )
        })
    }

    /// Whether the administration has been created yet.
    #[must_use]
    pub fn has_administration(&self) -> bool {
        self.inner.admin.get().is_some()
    }

    pub(crate) fn install_accessor(&self, accessor: Rc<Accessor>) {
        self.inner
            .accessors
            .borrow_mut()
            .insert(accessor.name_key(), accessor);
    }

    /// Register a plain reactive property on this object.
    pub fn register_plain(
        &self,
        name: impl AsRef<str>,
        initial: Value,
        modifier: Modifier,
    ) -> Result<()> {
        self.administration().register_plain(name, initial, modifier)
    }

    /// Register a read-only computed property on this object.
    pub fn register_computed(
        &self,
        name: impl AsRef<str>,
        derive: impl Fn(&ReactiveObject) -> Result<Value> + 'static,
    ) -> Result<()> {
        self.administration().register_computed(name, derive)
    }

    /// Register a computed property with an explicit setter.
    pub fn register_computed_with_setter(
        &self,
        name: impl AsRef<str>,
        derive: impl Fn(&ReactiveObject) -> Result<Value> + 'static,
        setter: impl Fn(&ReactiveObject, Value) -> Result<()> + 'static,
    ) -> Result<()> {
        self.administration()
            .register_computed_with_setter(name, derive, setter)
    }

    /// Observe committed changes to any property of this object.
    pub fn observe(&self, callback: impl Fn(&ChangeRecord) + 'static) -> Subscription {
        self.administration().observe(callback)
    }

    /// Intercept pending changes to any property of this object.
    pub fn intercept(
        &self,
        handler: impl Fn(ChangeProposal) -> Option<ChangeProposal> + 'static,
    ) -> Subscription {
        self.administration().intercept(handler)
    }

    fn accessor(&self, name: &str) -> Result<Rc<Accessor>> {
        self.inner
            .accessors
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RxError::UnknownProperty {
                object: self.inner.name.to_string(),
                name: name.to_string(),
            })
    }
}

/// Name-based property access, dispatching through the administration's
/// cell registry via the shared accessor for that name.
pub trait Reactive {
    fn get(&self, name: &str) -> Result<Value>;
    fn set(&self, name: &str, value: Value) -> Result<()>;
}

impl Reactive for ReactiveObject {
    fn get(&self, name: &str) -> Result<Value> {
        let accessor = self.accessor(name)?;
        accessor.get(self)
    }

    fn set(&self, name: &str, value: Value) -> Result<()> {
        let accessor = self.accessor(name)?;
        accessor.set(self, value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
