#![forbid(unsafe_code)]

//! Value model and shared vocabulary for the rxcell reactive runtime.
//!
//! This crate holds everything the administration core needs that is not
//! itself runtime machinery:
//!
//! - [`Value`]: the dynamic tagged value stored in reactive cells.
//! - [`Modifier`]: the equality policy applied when a candidate value is
//!   normalized before a commit.
//! - [`ChangeRecord`] / [`ChangeProposal`]: the post-commit and pre-commit
//!   shapes of a mutation, shared by listeners, interceptors, and the
//!   diagnostic reporter.
//! - [`RxError`]: the misuse-error taxonomy. Application failures inside
//!   listeners or derivations are never wrapped here; they surface to the
//!   caller that triggered the read or write.
//! - [`report`]: the process-owned diagnostic reporter with an explicit
//!   install/uninstall lifecycle.

pub mod change;
pub mod error;
pub mod modifier;
pub mod report;
pub mod value;

pub use change::{ChangeKind, ChangeProposal, ChangeRecord, ObjectRef};
pub use error::{Result, RxError};
pub use modifier::Modifier;
pub use report::MutationReporter;
pub use value::Value;
