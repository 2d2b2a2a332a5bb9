//! Root error type of the engine.
//!
//! Node-level failures during a walk never surface here; they become log
//! entries. What reaches a caller as [`TrellisError`] is a setup failure,
//! a document that could not be loaded, or an adapter misconfiguration.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

#[derive(Debug, Error, Clone)]
pub enum TrellisError {
    /// A rule of the schema model was broken (bad name, unsafe URL, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Orchestration or adapter failure.
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// Coarse classification, used by hosts to pick styling and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Security,
    Configuration,
    Internal,
}

pub type TrellisResult<T> = Result<T, TrellisError>;

impl TrellisError {
    /// Hints a host can show under the message.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(inner) => inner.suggestions(),
            Self::Application(inner) => inner.suggestions(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(inner) => inner.category(),
            Self::Application(inner) => inner.category(),
        }
    }

    /// Transient failures: a poisoned lock or a download that may succeed
    /// on a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Application(ApplicationError::LockPoisoned | ApplicationError::FetchFailed { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_lock_is_transient_and_internal() {
        let err = TrellisError::from(ApplicationError::LockPoisoned);
        assert!(err.is_transient());
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn unsafe_url_is_a_security_error() {
        let err = TrellisError::from(DomainError::UnsafeUrl {
            url: "http://127.0.0.1".into(),
            reason: "only HTTPS URLs are allowed".into(),
        });
        assert_eq!(err.category(), ErrorCategory::Security);
        assert!(!err.is_transient());
    }

    #[test]
    fn display_is_the_inner_message() {
        let inner = ApplicationError::NoOutputRoot;
        let expected = inner.to_string();
        assert_eq!(TrellisError::from(inner).to_string(), expected);
    }
}
