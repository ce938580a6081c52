//! Error types for reference handles and context storage

use thiserror::Error;

/// Failures raised by the reference handle types.
///
/// Both variants signal a programmer (or code generator) error rather than a
/// recoverable condition: an operation either fully succeeds or fully fails
/// without mutating shared state, and nothing here is ever retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Dereference of a handle currently in the null state.
    #[error("attempt to access null reference")]
    NullReference,

    /// A conversion between handle kinds that the source handle's
    /// ownership state cannot support.
    #[error("{reason}")]
    IllegalReference {
        /// Why the conversion was rejected
        reason: &'static str,
    },
}

impl ReferenceError {
    /// Strong ownership was requested over a stack-resident instance.
    pub(crate) const fn non_heap() -> Self {
        ReferenceError::IllegalReference {
            reason: "reference to non-heap instance",
        }
    }

    /// An aliasing handle over a null pointer was asked for its shared storage.
    pub(crate) const fn unexpected_state() -> Self {
        ReferenceError::IllegalReference {
            reason: "unexpected state of value reference",
        }
    }
}

/// Failures of the execution context's module-global store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A module index past the end of the global store.
    #[error("unknown module index {index}")]
    UnknownModule {
        /// The out-of-range index
        index: usize,
    },

    /// A module name that was never registered.
    #[error("module `{module}` is not registered")]
    UnregisteredModule {
        /// The unknown module name
        module: String,
    },

    /// Stored globals exist but have a different type than requested.
    #[error("globals for module `{module}` have unexpected type")]
    GlobalTypeMismatch {
        /// The module whose globals were requested
        module: String,
    },
}

/// Result type alias for handle operations.
pub type Result<T> = std::result::Result<T, ReferenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_reference_message() {
        assert_eq!(
            ReferenceError::NullReference.to_string(),
            "attempt to access null reference"
        );
    }

    #[test]
    fn test_illegal_reference_messages() {
        assert_eq!(
            ReferenceError::non_heap().to_string(),
            "reference to non-heap instance"
        );
        assert_eq!(
            ReferenceError::unexpected_state().to_string(),
            "unexpected state of value reference"
        );
    }

    #[test]
    fn test_context_error_messages() {
        let err = ContextError::UnregisteredModule {
            module: "http".into(),
        };
        assert_eq!(err.to_string(), "module `http` is not registered");
    }
}
