#![forbid(unsafe_code)]

//! Shared accessor pairs and the process-wide accessor caches.
//!
//! An [`Accessor`] closes over a property *name* only — never over a
//! specific administration — so one accessor serves every reactive object
//! that declares a property of that name. [`AccessorFactory`] memoizes
//! them in two caches (plain and computed), bounding accessor allocation
//! to O(distinct names) rather than O(objects x properties).
//!
//! The runtime is single-threaded, so the caches are thread-local,
//! append-only maps keyed by immutable strings. A `Send`/`Sync`
//! reimplementation must replace them with a concurrent map; a racing
//! idempotent insert is harmless there because entries for the same name
//! are value-equivalent.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use rxcell_core::{Result, Value};

use crate::object::ReactiveObject;

/// Which cell shape an accessor was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Plain,
    Computed,
}

/// A get/set pair bound to a property name, shared across objects.
#[derive(Debug)]
pub struct Accessor {
    name: Rc<str>,
    kind: AccessorKind,
}

impl Accessor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    pub(crate) fn name_key(&self) -> Rc<str> {
        Rc::clone(&self.name)
    }

    /// Read through the target's administration. For computed properties
    /// this forces evaluation when the memo is stale.
    pub fn get(&self, target: &ReactiveObject) -> Result<Value> {
        target.administration().get_value(&self.name)
    }

    /// Write through the target's administration: the full mutation
    /// protocol for plain properties, setter forwarding for computed ones.
    pub fn set(&self, target: &ReactiveObject, value: Value) -> Result<()> {
        target.administration().set_value(&self.name, value)
    }
}

thread_local! {
    static PLAIN_CACHE: RefCell<AHashMap<Rc<str>, Rc<Accessor>>> =
        RefCell::new(AHashMap::new());
    static COMPUTED_CACHE: RefCell<AHashMap<Rc<str>, Rc<Accessor>>> =
        RefCell::new(AHashMap::new());
}

/// Mints and memoizes shared accessor pairs.
pub struct AccessorFactory;

impl AccessorFactory {
    /// The shared plain-cell accessor for `name`.
    #[must_use]
    pub fn plain(name: &str) -> Rc<Accessor> {
        PLAIN_CACHE.with(|cache| lookup(cache, name, AccessorKind::Plain))
    }

    /// The shared computed-cell accessor for `name`.
    #[must_use]
    pub fn computed(name: &str) -> Rc<Accessor> {
        COMPUTED_CACHE.with(|cache| lookup(cache, name, AccessorKind::Computed))
    }

    /// Number of distinct plain property names cached so far.
    #[must_use]
    pub fn plain_cache_size() -> usize {
        PLAIN_CACHE.with(|cache| cache.borrow().len())
    }

    /// Number of distinct computed property names cached so far.
    #[must_use]
    pub fn computed_cache_size() -> usize {
        COMPUTED_CACHE.with(|cache| cache.borrow().len())
    }
}

fn lookup(
    cache: &RefCell<AHashMap<Rc<str>, Rc<Accessor>>>,
    name: &str,
    kind: AccessorKind,
) -> Rc<Accessor> {
    if let Some(accessor) = cache.borrow().get(name) {
        return Rc::clone(accessor);
    }
    let key: Rc<str> = Rc::from(name);
    let accessor = Rc::new(Accessor {
        name: Rc::clone(&key),
        kind,
    });
    cache.borrow_mut().insert(key, Rc::clone(&accessor));
    accessor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
