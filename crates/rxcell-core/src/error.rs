#![forbid(unsafe_code)]

//! Error taxonomy for the reactive runtime.
//!
//! Structural misuse is reported eagerly through [`RxError`]; application
//! failures raised inside listener callbacks or derivation bodies are not
//! wrapped by the core — listeners propagate panics to the triggering
//! writer, and derivations thread their own errors through
//! [`RxError::Other`] unchanged.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RxError>;

#[derive(Debug, Error)]
pub enum RxError {
    /// A property was re-registered with a different cell shape. Only the
    /// value of an existing plain cell may be replaced.
    #[error("property `{name}` on `{object}` is already registered with an incompatible cell shape")]
    IncompatibleRedefinition { object: String, name: String },

    /// A write reached a computed cell that has no explicit setter.
    #[error("computed property `{name}` on `{object}` has no setter and is read-only")]
    ComputedNotWritable { object: String, name: String },

    /// `observe` was asked to replay current state immediately. A
    /// whole-object observer has no meaningful snapshot to replay.
    #[error("whole-object observers do not support immediate replay of current state")]
    ImmediateReplayUnsupported,

    /// A derivation read a computed cell that is currently evaluating.
    #[error("cyclic dependency detected while evaluating computed property `{name}` on `{object}`")]
    CyclicDependency { object: String, name: String },

    /// A read or write named a property with no registered cell.
    #[error("unknown reactive property `{name}` on `{object}`")]
    UnknownProperty { object: String, name: String },

    /// An application-level failure raised inside a derivation, surfaced
    /// unchanged to the reader.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + 'static>),
}

impl RxError {
    /// Wrap an application failure message raised inside a derivation.
    #[must_use]
    pub fn derivation(message: impl Into<String>) -> Self {
        #[derive(Debug, Error)]
        #[error("{0}")]
        struct DerivationFailure(String);

        Self::Other(Box::new(DerivationFailure(message.into())))
    }

    /// Whether this error marks a structural misuse of the runtime (as
    /// opposed to a propagated application failure).
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misuse_classification() {
        let cyclic = RxError::CyclicDependency {
            object: "o".into(),
            name: "p".into(),
        };
        assert!(cyclic.is_misuse());
        assert!(!RxError::derivation("boom").is_misuse());
    }

    #[test]
    fn display_messages_name_the_site() {
        let err = RxError::UnknownProperty {
            object: "widget".into(),
            name: "count".into(),
        };
        let text = err.to_string();
        assert!(text.contains("widget"));
        assert!(text.contains("count"));
    }

    #[test]
    fn derivation_error_is_transparent() {
        assert_eq!(RxError::derivation("boom").to_string(), "boom");
    }
}
