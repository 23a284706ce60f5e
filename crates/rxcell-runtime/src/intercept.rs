#![forbid(unsafe_code)]

//! Pre-commit interceptor chain.
//!
//! Interceptors are a strict gate in front of the cell commit: each
//! handler receives the pending [`ChangeProposal`] and returns it (possibly
//! with a rewritten `new_value`) to let the mutation continue, or `None` to
//! veto it. Handlers run in registration order and the chain
//! short-circuits on the first veto, so no handler ever observes a change
//! that is later rolled back.
//!
//! Only `new_value` is taken from a handler's return; the proposal's kind,
//! property, target, and old value are fixed by the protocol.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rxcell_core::{ChangeProposal, Value};

use crate::listen::Subscription;

type HandlerRc = Rc<dyn Fn(ChangeProposal) -> Option<ChangeProposal>>;
type HandlerWeak = Weak<dyn Fn(ChangeProposal) -> Option<ChangeProposal>>;

/// Ordered chain of veto/transform handlers.
#[derive(Default)]
pub(crate) struct InterceptorChain {
    handlers: RefCell<Vec<HandlerWeak>>,
}

impl InterceptorChain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a handler. The returned guard deregisters it on drop.
    pub(crate) fn register(
        &self,
        handler: impl Fn(ChangeProposal) -> Option<ChangeProposal> + 'static,
    ) -> Subscription {
        let strong: HandlerRc = Rc::new(handler);
        self.handlers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of live handlers. Prunes dead entries as a side effect.
    pub(crate) fn live_count(&self) -> usize {
        let mut handlers = self.handlers.borrow_mut();
        handlers.retain(|weak| weak.strong_count() > 0);
        handlers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    /// Run the chain over a proposal. Returns the value to commit, or
    /// `None` if any handler vetoed. Handlers run outside the chain
    /// borrow.
    pub(crate) fn run(&self, mut proposal: ChangeProposal) -> Option<Value> {
        let handlers: Vec<HandlerRc> = {
            let mut handlers = self.handlers.borrow_mut();
            handlers.retain(|weak| weak.strong_count() > 0);
            handlers.iter().filter_map(Weak::upgrade).collect()
        };
        for handler in &handlers {
            match handler(proposal.clone()) {
                None => return None,
                Some(transformed) => proposal.new_value = transformed.new_value,
            }
        }
        Some(proposal.new_value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
