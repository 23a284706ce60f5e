#![forbid(unsafe_code)]

//! Injectable diagnostic reporter ("spy" side-channel).
//!
//! A [`MutationReporter`] observes every committed mutation: its
//! `before_change` hook runs just before listeners are notified and
//! `after_change` just after. It is purely observational — it cannot veto,
//! transform, or reorder anything, and it never sees vetoed or no-op
//! writes.
//!
//! The reporter is owned by the process, not by individual
//! administrations, with an explicit lifecycle: [`install`] activates one,
//! [`uninstall`] removes it and hands it back. The runtime is
//! single-threaded, so the slot is thread-local.

use std::cell::RefCell;
use std::rc::Rc;

use crate::change::ChangeRecord;

/// Before/after hooks invoked around every committed mutation.
pub trait MutationReporter {
    fn before_change(&self, record: &ChangeRecord);
    fn after_change(&self, record: &ChangeRecord);
}

thread_local! {
    static REPORTER: RefCell<Option<Rc<dyn MutationReporter>>> = const { RefCell::new(None) };
}

/// Install a reporter, replacing any previously installed one.
pub fn install(reporter: Rc<dyn MutationReporter>) {
    REPORTER.with(|slot| *slot.borrow_mut() = Some(reporter));
}

/// Remove the installed reporter, returning it if one was active.
pub fn uninstall() -> Option<Rc<dyn MutationReporter>> {
    REPORTER.with(|slot| slot.borrow_mut().take())
}

/// Whether a reporter is currently installed. Committed mutations are
/// reported (and records built) only when this is true or listeners exist.
#[must_use]
pub fn enabled() -> bool {
    REPORTER.with(|slot| slot.borrow().is_some())
}

/// Invoke the pre-notification hook, if a reporter is installed.
pub fn before_change(record: &ChangeRecord) {
    if let Some(reporter) = REPORTER.with(|slot| slot.borrow().clone()) {
        reporter.before_change(record);
    }
}

/// Invoke the post-notification hook, if a reporter is installed.
pub fn after_change(record: &ChangeRecord) {
    if let Some(reporter) = REPORTER.with(|slot| slot.borrow().clone()) {
        reporter.after_change(record);
    }
}
