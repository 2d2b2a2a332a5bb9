//! Application layer errors.
//!
//! These errors represent failures in orchestration and I/O, not rule
//! violations. Rule violations are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// A download could not be completed.
    #[error("Download failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// A download exceeded the configured byte cap.
    #[error("Download from {url} is too large: {size} bytes (limit {limit})")]
    DownloadTooLarge { url: String, size: u64, limit: u64 },

    /// A content generator failed.
    #[error("{kind} generator failed: {reason}")]
    GeneratorFailed { kind: String, reason: String },

    /// A schema, variables or rules document could not be loaded.
    #[error("Failed to load {path}: {reason}")]
    DocumentLoad { path: PathBuf, reason: String },

    /// Shared state lock was poisoned.
    #[error("Internal lock poisoned")]
    LockPoisoned,

    /// Port/Adapter not configured.
    #[error("Required adapter not configured: {name}")]
    AdapterNotConfigured { name: &'static str },

    /// No output root was supplied for a run.
    #[error("No output directory selected")]
    NoOutputRoot,

    /// The filesystem cannot delete reliably, so undo is refused.
    #[error("Undo is not supported by this filesystem")]
    UndoUnsupported,
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Ensure the parent directory exists".into(),
            ],
            Self::FetchFailed { url, .. } => vec![
                format!("Could not download {}", url),
                "Check your network connection and that the URL is reachable".into(),
            ],
            Self::DownloadTooLarge { limit, .. } => vec![format!(
                "Downloads are capped at {} bytes; raise engine.max_download_bytes to allow more",
                limit
            )],
            Self::DocumentLoad { path, .. } => vec![
                format!("Check the syntax of {}", path.display()),
                "Schemas may be JSON (.json) or TOML (.toml)".into(),
            ],
            Self::LockPoisoned => vec![
                "Shared state is locked".into(),
                "Try again in a moment".into(),
            ],
            Self::AdapterNotConfigured { name } => vec![
                format!("Required component not configured: {}", name),
                "This is likely a configuration error".into(),
            ],
            Self::NoOutputRoot => vec!["Pass an output directory with --output".into()],
            Self::UndoUnsupported => vec![
                "Undo needs a filesystem with reliable delete support".into(),
                "Remove the created items manually".into(),
            ],
            Self::GeneratorFailed { .. } => vec!["Check the generator configuration".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FilesystemError { .. } | Self::LockPoisoned => ErrorCategory::Internal,
            Self::FetchFailed { .. } | Self::GeneratorFailed { .. } => ErrorCategory::Internal,
            Self::DownloadTooLarge { .. } => ErrorCategory::Security,
            Self::DocumentLoad { .. } => ErrorCategory::Validation,
            Self::AdapterNotConfigured { .. } | Self::UndoUnsupported => {
                ErrorCategory::Configuration
            }
            Self::NoOutputRoot => ErrorCategory::Validation,
        }
    }
}
