#![forbid(unsafe_code)]

//! Per-object property administration and the mutation protocol.
//!
//! An [`Administration`] owns the `name → cell` registry for one reactive
//! object (insertion order is property declaration order), the interceptor
//! chain gating mutations before they commit, and the listener registry
//! notified after.
//!
//! # Mutation protocol
//!
//! A plain-cell write runs four steps:
//!
//! 1. If interceptors are registered, run the chain over an Update
//!    proposal. A veto aborts with no side effect; otherwise the possibly
//!    transformed value continues.
//! 2. Normalize the candidate under the cell's modifier. An unchanged
//!    value aborts with no side effect and no notification.
//! 3. Commit the value, eagerly invalidating dependent computed cells.
//! 4. If listeners exist or the diagnostic reporter is installed, deliver
//!    exactly one Update record (reporter before-hook, listeners in
//!    registration order, reporter after-hook).
//!
//! Writes to computed cells skip all four steps and forward to the cell's
//! explicit setter, which typically re-enters this protocol through plain
//! properties.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use rxcell_core::{
    ChangeKind, ChangeProposal, ChangeRecord, Modifier, ObjectRef, Result, RxError, Value, report,
};
use tracing::{debug, trace};

use crate::accessor::AccessorFactory;
use crate::cell::{ComputedCell, DeriveFn, PlainCell, ReactiveCell, SetterFn};
use crate::intercept::InterceptorChain;
use crate::listen::{ListenerRegistry, Subscription};
use crate::object::{ObjectInner, ReactiveObject};

/// Per-administration behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdminOptions {
    /// Route a value redefinition of an existing plain property
    /// (re-registration under the same name) through the full Update
    /// protocol, interceptors and notification included. When `false`
    /// (the default) the redefinition is committed silently, bypassing
    /// both the Add and the Update notification paths.
    pub notify_on_redefine: bool,
}

/// The per-object registry coordinating cells, interceptors, and
/// listeners. Created lazily by the owning [`ReactiveObject`], exactly
/// once, and retained for the object's lifetime.
pub struct Administration {
    object: ObjectRef,
    scope: Weak<ObjectInner>,
    cells: RefCell<IndexMap<Rc<str>, ReactiveCell>>,
    interceptors: InterceptorChain,
    listeners: ListenerRegistry,
    options: AdminOptions,
}

impl Administration {
    pub(crate) fn new(object: ObjectRef, scope: Weak<ObjectInner>, options: AdminOptions) -> Self {
        Self {
            object,
            scope,
            cells: RefCell::new(IndexMap::new()),
            interceptors: InterceptorChain::new(),
            listeners: ListenerRegistry::new(),
            options,
        }
    }

    /// Diagnostic name of the administered object.
    #[must_use]
    pub fn name(&self) -> &str {
        self.object.name()
    }

    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        self.object.clone()
    }

    #[must_use]
    pub fn options(&self) -> AdminOptions {
        self.options
    }

    /// Register a plain property.
    ///
    /// When interceptors are present the initial value first runs through
    /// the chain as an Add proposal; a veto aborts silently and nothing is
    /// installed. Re-registering an existing plain property is a value
    /// redefinition governed by [`AdminOptions::notify_on_redefine`];
    /// re-registering a computed property this way is an error.
    pub fn register_plain(
        &self,
        name: impl AsRef<str>,
        initial: Value,
        modifier: Modifier,
    ) -> Result<()> {
        let name = name.as_ref();
        let existing = self.cells.borrow().get(name).cloned();
        if let Some(cell) = existing {
            return match cell {
                ReactiveCell::Plain(plain) => self.redefine_plain(&plain, name, initial),
                ReactiveCell::Computed(_) => Err(self.incompatible(name)),
            };
        }

        let key: Rc<str> = Rc::from(name);
        let mut value = initial;
        if !self.interceptors.is_empty() {
            let proposal = ChangeProposal::new(
                ChangeKind::Add,
                Rc::clone(&key),
                self.object.clone(),
                value,
                None,
            );
            match self.interceptors.run(proposal) {
                None => {
                    trace!(object = %self.object, property = name, "add vetoed by interceptor");
                    return Ok(());
                }
                Some(transformed) => value = transformed,
            }
        }

        let cell = PlainCell::new(Rc::clone(&key), value.clone(), modifier);
        self.cells
            .borrow_mut()
            .insert(Rc::clone(&key), ReactiveCell::Plain(cell));
        self.scope_object()
            .install_accessor(AccessorFactory::plain(&key));

        if !self.listeners.is_empty() || report::enabled() {
            self.deliver(&ChangeRecord {
                kind: ChangeKind::Add,
                name: key,
                object: self.object.clone(),
                new_value: value,
                old_value: None,
            });
        }
        Ok(())
    }

    /// Register a read-only computed property. The derivation runs
    /// against the owning object and its dependencies are tracked
    /// automatically. Registration itself is silent: a computed cell has
    /// no externally observable initial value.
    pub fn register_computed(
        &self,
        name: impl AsRef<str>,
        derive: impl Fn(&ReactiveObject) -> Result<Value> + 'static,
    ) -> Result<()> {
        self.register_computed_cell(name.as_ref(), Rc::new(derive), None)
    }

    /// Register a computed property with an explicit setter. Writes to
    /// the property forward to the setter, which may in turn write plain
    /// properties and re-enter the mutation protocol.
    pub fn register_computed_with_setter(
        &self,
        name: impl AsRef<str>,
        derive: impl Fn(&ReactiveObject) -> Result<Value> + 'static,
        setter: impl Fn(&ReactiveObject, Value) -> Result<()> + 'static,
    ) -> Result<()> {
        self.register_computed_cell(name.as_ref(), Rc::new(derive), Some(Rc::new(setter)))
    }

    fn register_computed_cell(
        &self,
        name: &str,
        derive: DeriveFn,
        setter: Option<SetterFn>,
    ) -> Result<()> {
        if self.cells.borrow().contains_key(name) {
            return Err(self.incompatible(name));
        }
        let key: Rc<str> = Rc::from(name);
        let cell = ComputedCell::new(Rc::clone(&key), self.object.clone(), derive, setter);
        self.cells
            .borrow_mut()
            .insert(Rc::clone(&key), ReactiveCell::Computed(cell));
        self.scope_object()
            .install_accessor(AccessorFactory::computed(&key));
        Ok(())
    }

    /// Read a property through its cell: plain cells answer directly,
    /// computed cells run the lazy state machine. Either way the cell is
    /// registered as a dependency of any enclosing evaluation.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        let cell = self.lookup(name)?;
        match cell {
            ReactiveCell::Plain(plain) => Ok(plain.get()),
            ReactiveCell::Computed(computed) => computed.get(&self.scope_object()),
        }
    }

    /// Write a property through the mutation protocol.
    pub fn set_value(&self, name: &str, candidate: Value) -> Result<()> {
        let cell = self.lookup(name)?;
        match cell {
            ReactiveCell::Computed(computed) => computed.set(&self.scope_object(), candidate),
            ReactiveCell::Plain(plain) => self.set_plain(&plain, candidate),
        }
    }

    fn set_plain(&self, plain: &PlainCell, candidate: Value) -> Result<()> {
        let mut value = candidate;
        if !self.interceptors.is_empty() {
            let proposal = ChangeProposal::new(
                ChangeKind::Update,
                plain.name(),
                self.object.clone(),
                value,
                Some(plain.current()),
            );
            match self.interceptors.run(proposal) {
                None => {
                    trace!(
                        object = %self.object,
                        property = %plain.name(),
                        "update vetoed by interceptor"
                    );
                    return Ok(());
                }
                Some(transformed) => value = transformed,
            }
        }

        let Some(normalized) = plain.prepare(value) else {
            trace!(
                object = %self.object,
                property = %plain.name(),
                "no-op write short-circuited"
            );
            return Ok(());
        };

        let old_value = plain.current();
        plain.commit(normalized.clone());

        if !self.listeners.is_empty() || report::enabled() {
            self.deliver(&ChangeRecord {
                kind: ChangeKind::Update,
                name: plain.name(),
                object: self.object.clone(),
                new_value: normalized,
                old_value: Some(old_value),
            });
        }
        Ok(())
    }

    /// Value redefinition of an already-registered plain property.
    /// Dependent computed cells are invalidated either way; whether the
    /// write is announced is an explicit per-object option.
    fn redefine_plain(&self, plain: &PlainCell, name: &str, candidate: Value) -> Result<()> {
        if self.options.notify_on_redefine {
            return self.set_value(name, candidate);
        }
        if let Some(normalized) = plain.prepare(candidate) {
            trace!(object = %self.object, property = name, "silent value redefinition");
            plain.commit(normalized);
        }
        Ok(())
    }

    /// Register a post-commit listener. The subscription deregisters it
    /// on drop.
    pub fn observe(&self, callback: impl Fn(&ChangeRecord) + 'static) -> Subscription {
        self.listeners.register(callback)
    }

    /// Like [`observe`](Self::observe), with an explicit immediate-replay
    /// request. A whole-object observer has no current-state snapshot to
    /// replay, so `fire_immediately` fails fast.
    pub fn observe_with(
        &self,
        callback: impl Fn(&ChangeRecord) + 'static,
        fire_immediately: bool,
    ) -> Result<Subscription> {
        if fire_immediately {
            return Err(RxError::ImmediateReplayUnsupported);
        }
        Ok(self.observe(callback))
    }

    /// Register a pre-commit interceptor. The subscription deregisters it
    /// on drop.
    pub fn intercept(
        &self,
        handler: impl Fn(ChangeProposal) -> Option<ChangeProposal> + 'static,
    ) -> Subscription {
        self.interceptors.register(handler)
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.cells.borrow().contains_key(name)
    }

    /// Property names in declaration order.
    #[must_use]
    pub fn property_names(&self) -> Vec<Rc<str>> {
        self.cells.borrow().keys().cloned().collect()
    }

    /// Whether a computed property's memo is currently stale. Plain
    /// properties are never dirty.
    pub fn is_dirty(&self, name: &str) -> Result<bool> {
        match self.lookup(name)? {
            ReactiveCell::Plain(_) => Ok(false),
            ReactiveCell::Computed(computed) => Ok(computed.is_dirty()),
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.live_count()
    }

    #[must_use]
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.live_count()
    }

    /// Clone the cell handle out of the registry so no registry borrow is
    /// held while cell code runs (derivations and listeners re-enter).
    fn lookup(&self, name: &str) -> Result<ReactiveCell> {
        self.cells
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RxError::UnknownProperty {
                object: self.object.name().to_string(),
                name: name.to_string(),
            })
    }

    fn incompatible(&self, name: &str) -> RxError {
        RxError::IncompatibleRedefinition {
            object: self.object.name().to_string(),
            name: name.to_string(),
        }
    }

    fn scope_object(&self) -> ReactiveObject {
        ReactiveObject {
            inner: self
                .scope
                .upgrade()
                .expect("administration is owned by its object and never outlives it"),
        }
    }

    /// One committed mutation, one delivery: reporter before-hook,
    /// listeners in registration order, reporter after-hook.
    fn deliver(&self, record: &ChangeRecord) {
        debug!(
            object = %record.object,
            property = %record.name,
            kind = %record.kind,
            "change committed"
        );
        report::before_change(record);
        self.listeners.notify(record);
        report::after_change(record);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn object() -> ReactiveObject {
        ReactiveObject::new("widget")
    }

    #[test]
    fn register_and_read_plain() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();
        assert!(admin.has_property("count"));
        assert_eq!(admin.get_value("count").unwrap(), Value::from(0));
    }

    #[test]
    fn unknown_property_fails() {
        let object = object();
        let err = object.administration().get_value("missing").unwrap_err();
        assert!(matches!(err, RxError::UnknownProperty { .. }));
        let err = object
            .administration()
            .set_value("missing", Value::from(1))
            .unwrap_err();
        assert!(matches!(err, RxError::UnknownProperty { .. }));
    }

    #[test]
    fn declaration_order_is_preserved() {
        let object = object();
        let admin = object.administration();
        for name in ["zeta", "alpha", "mid"] {
            admin
                .register_plain(name, Value::Null, Modifier::Reference)
                .unwrap();
        }
        let names: Vec<_> = admin
            .property_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn update_delivers_old_and_new_value() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();

        let seen: Rc<RefCell<Vec<ChangeRecord>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = admin.observe(move |rec| sink.borrow_mut().push(rec.clone()));

        admin.set_value("count", Value::from(5)).unwrap();

        let records = seen.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::Update);
        assert_eq!(records[0].new_value, Value::from(5));
        assert_eq!(records[0].old_value, Some(Value::from(0)));
        assert_eq!(&*records[0].name, "count");
    }

    #[test]
    fn no_op_write_delivers_nothing() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();

        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let _sub = admin.observe(move |_| calls_clone.set(calls_clone.get() + 1));

        admin.set_value("count", Value::from(0)).unwrap();
        assert_eq!(calls.get(), 0);
        admin.set_value("count", Value::from(5)).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn veto_makes_property_write_inert() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();

        let notified = Rc::new(Cell::new(false));
        let flag = Rc::clone(&notified);
        let _listener = admin.observe(move |_| flag.set(true));
        let _veto = admin.intercept(|_| None);

        for candidate in [1, -3, 99] {
            admin.set_value("count", Value::from(candidate)).unwrap();
        }
        assert_eq!(admin.get_value("count").unwrap(), Value::from(0));
        assert!(!notified.get());
    }

    #[test]
    fn transformed_value_is_committed_and_announced() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();

        let _clamp = admin.intercept(|mut proposal| {
            let n = proposal.new_value.as_int().unwrap_or(0).min(10);
            proposal.new_value = Value::from(n);
            Some(proposal)
        });

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = admin.observe(move |rec: &ChangeRecord| sink.borrow_mut().push(rec.clone()));

        admin.set_value("count", Value::from(50)).unwrap();
        assert_eq!(admin.get_value("count").unwrap(), Value::from(10));
        assert_eq!(seen.borrow()[0].new_value, Value::from(10));
    }

    #[test]
    fn add_proposal_runs_through_interceptors() {
        let object = object();
        let admin = object.administration();
        let _veto_negative = admin.intercept(|proposal| {
            if proposal.new_value.as_int().is_some_and(|n| n < 0) {
                None
            } else {
                Some(proposal)
            }
        });

        admin
            .register_plain("ok", Value::from(1), Modifier::Reference)
            .unwrap();
        admin
            .register_plain("rejected", Value::from(-1), Modifier::Reference)
            .unwrap();

        assert!(admin.has_property("ok"));
        // Vetoed registration installs nothing, silently.
        assert!(!admin.has_property("rejected"));
    }

    #[test]
    fn add_record_has_no_old_value() {
        let object = object();
        let admin = object.administration();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = admin.observe(move |rec: &ChangeRecord| sink.borrow_mut().push(rec.clone()));

        admin
            .register_plain("count", Value::from(7), Modifier::Reference)
            .unwrap();

        let records = seen.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::Add);
        assert_eq!(records[0].new_value, Value::from(7));
        assert_eq!(records[0].old_value, None);
    }

    #[test]
    fn computed_registration_is_silent() {
        let object = object();
        let admin = object.administration();
        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let _sub = admin.observe(move |_| calls_clone.set(calls_clone.get() + 1));

        admin
            .register_computed("derived", |_| Ok(Value::from(1)))
            .unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn shape_redefinition_is_fatal() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();
        admin
            .register_computed("derived", |_| Ok(Value::from(1)))
            .unwrap();

        let err = admin
            .register_computed("count", |_| Ok(Value::Null))
            .unwrap_err();
        assert!(matches!(err, RxError::IncompatibleRedefinition { .. }));

        let err = admin
            .register_plain("derived", Value::from(0), Modifier::Reference)
            .unwrap_err();
        assert!(matches!(err, RxError::IncompatibleRedefinition { .. }));
    }

    #[test]
    fn silent_redefinition_by_default() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();

        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let _sub = admin.observe(move |_| calls_clone.set(calls_clone.get() + 1));

        admin
            .register_plain("count", Value::from(9), Modifier::Reference)
            .unwrap();
        assert_eq!(admin.get_value("count").unwrap(), Value::from(9));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn notify_on_redefine_routes_through_update_protocol() {
        let object = ReactiveObject::with_options(
            "widget",
            AdminOptions {
                notify_on_redefine: true,
            },
        );
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = admin.observe(move |rec: &ChangeRecord| sink.borrow_mut().push(rec.clone()));

        admin
            .register_plain("count", Value::from(9), Modifier::Reference)
            .unwrap();

        let records = seen.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::Update);
        assert_eq!(records[0].old_value, Some(Value::from(0)));
        assert_eq!(records[0].new_value, Value::from(9));
    }

    #[test]
    fn observe_with_rejects_immediate_replay() {
        let object = object();
        let admin = object.administration();
        let err = admin.observe_with(|_| {}, true).unwrap_err();
        assert!(matches!(err, RxError::ImmediateReplayUnsupported));
        assert!(admin.observe_with(|_| {}, false).is_ok());
    }

    #[test]
    fn subscription_counts_track_drops() {
        let object = object();
        let admin = object.administration();
        let listener = admin.observe(|_| {});
        let interceptor = admin.intercept(Some);
        assert_eq!(admin.listener_count(), 1);
        assert_eq!(admin.interceptor_count(), 1);

        drop(listener);
        drop(interceptor);
        assert_eq!(admin.listener_count(), 0);
        assert_eq!(admin.interceptor_count(), 0);
    }

    #[test]
    fn computed_write_without_setter_fails() {
        let object = object();
        let admin = object.administration();
        admin
            .register_computed("derived", |_| Ok(Value::from(1)))
            .unwrap();
        let err = admin.set_value("derived", Value::from(2)).unwrap_err();
        assert!(matches!(err, RxError::ComputedNotWritable { .. }));
    }

    #[test]
    fn computed_setter_reenters_the_protocol() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("celsius", Value::from(0), Modifier::Reference)
            .unwrap();
        admin
            .register_computed_with_setter(
                "fahrenheit",
                |scope| {
                    let c = scope
                        .administration()
                        .get_value("celsius")?
                        .as_int()
                        .unwrap_or(0);
                    Ok(Value::from(c * 9 / 5 + 32))
                },
                |scope, value| {
                    let f = value.as_int().unwrap_or(32);
                    scope
                        .administration()
                        .set_value("celsius", Value::from((f - 32) * 5 / 9))
                },
            )
            .unwrap();

        assert_eq!(admin.get_value("fahrenheit").unwrap(), Value::from(32));
        admin.set_value("fahrenheit", Value::from(212)).unwrap();
        assert_eq!(admin.get_value("celsius").unwrap(), Value::from(100));
        assert_eq!(admin.get_value("fahrenheit").unwrap(), Value::from(212));
    }

    #[test]
    fn listener_can_reenter_with_a_further_write() {
        let object = object();
        let admin = object.administration();
        admin
            .register_plain("count", Value::from(0), Modifier::Reference)
            .unwrap();
        admin
            .register_plain("echo", Value::from(0), Modifier::Reference)
            .unwrap();

        let scope = object.clone();
        let _mirror = admin.observe(move |rec: &ChangeRecord| {
            if &*rec.name == "count" {
                scope
                    .administration()
                    .set_value("echo", rec.new_value.clone())
                    .unwrap();
            }
        });

        admin.set_value("count", Value::from(3)).unwrap();
        assert_eq!(admin.get_value("echo").unwrap(), Value::from(3));
    }

    #[test]
    fn derivation_errors_surface_to_the_reader() {
        let object = object();
        let admin = object.administration();
        admin
            .register_computed("failing", |_| Err(RxError::derivation("no data yet")))
            .unwrap();

        let err = admin.get_value("failing").unwrap_err();
        assert_eq!(err.to_string(), "no data yet");
        // A failed evaluation leaves the memo stale, so the next read
        // retries.
        assert!(admin.is_dirty("failing").unwrap());
    }
}
