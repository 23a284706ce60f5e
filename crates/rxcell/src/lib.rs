#![forbid(unsafe_code)]

//! rxcell public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users: the
//! reactive object and administration API from `rxcell-runtime` plus the
//! value model and change vocabulary from `rxcell-core`.
//!
//! ```
//! use rxcell::prelude::*;
//!
//! let thermostat = ReactiveObject::new("thermostat");
//! thermostat
//!     .register_plain("celsius", Value::from(20), Modifier::Reference)
//!     .unwrap();
//! thermostat
//!     .register_computed("fahrenheit", |scope: &ReactiveObject| {
//!         let c = scope
//!             .administration()
//!             .get_value("celsius")?
//!             .as_int()
//!             .unwrap_or(0);
//!         Ok(Value::from(c * 9 / 5 + 32))
//!     })
//!     .unwrap();
//!
//! let _watch = thermostat.observe(|record| {
//!     println!("{} changed to {}", record.name, record.new_value);
//! });
//!
//! thermostat.set("celsius", Value::from(25)).unwrap();
//! assert_eq!(thermostat.get("fahrenheit").unwrap(), Value::from(77));
//! ```

pub use rxcell_core::{
    ChangeKind, ChangeProposal, ChangeRecord, Modifier, MutationReporter, ObjectRef, Result,
    RxError, Value, report,
};
pub use rxcell_runtime::{
    Accessor, AccessorFactory, AccessorKind, AdminOptions, Administration, Reactive,
    ReactiveObject, Subscription,
};

pub mod prelude {
    pub use rxcell_core::{
        ChangeKind, ChangeProposal, ChangeRecord, Modifier, ObjectRef, Result, RxError, Value,
    };
    pub use rxcell_runtime::{AdminOptions, Administration, Reactive, ReactiveObject, Subscription};
}
