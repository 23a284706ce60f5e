#![forbid(unsafe_code)]

//! Administration core of the rxcell reactive runtime.
//!
//! Every [`ReactiveObject`] owns exactly one [`Administration`]: the
//! per-object registry mapping property names to reactive cells, plus the
//! interceptor chain that gates mutations before they commit and the
//! listener registry notified after. Derived properties are lazy,
//! memoized computed cells whose dependencies are collected by an ambient
//! evaluation-scope tracker during each recompute.
//!
//! # Architecture
//!
//! The runtime is single-threaded: cells are `Rc<RefCell<..>>` shared
//! handles, and reentrancy arises only from synchronous callbacks (a
//! listener or derivation triggering further reads and writes), never from
//! concurrent threads.
//!
//! A write flows `set` → interceptor chain (veto/transform) → modifier
//! normalization (no-op short-circuit) → cell commit → dependent
//! invalidation → listener notification. A read flows `get` → cell, where
//! a dirty computed cell recomputes under a fresh tracker frame and a
//! clean one answers from its memo, registering itself as a dependency of
//! any enclosing evaluation either way.
//!
//! # Invariants
//!
//! 1. At most one change record is delivered per committed mutation;
//!    vetoed and no-op writes deliver nothing.
//! 2. Listeners and interceptors run in registration order; the first
//!    veto wins and later handlers do not run.
//! 3. A computed cell's dependency set is exactly the set of cells read
//!    during its most recent evaluation.
//! 4. A cell's shape (plain or computed) is fixed for the object's
//!    lifetime.

pub mod accessor;
pub mod admin;
mod cell;
mod intercept;
mod listen;
pub mod object;
mod tracker;

pub use accessor::{Accessor, AccessorFactory, AccessorKind};
pub use admin::{AdminOptions, Administration};
pub use listen::Subscription;
pub use object::{Reactive, ReactiveObject};
