// ============================================================================
// domain/error.rs - RULE VIOLATIONS RAISED BY PURE DOMAIN LOGIC
// ============================================================================

use thiserror::Error;

use crate::error::ErrorCategory;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (they are copied into log entries)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Name safety
    // ========================================================================
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    // ========================================================================
    // Control flow
    // ========================================================================
    #[error("Invalid repeat variable name '{name}': use letters, digits and '_', not starting with a digit")]
    InvalidLoopVariable { name: String },

    #[error("Repeat count {count} exceeds maximum of {max}")]
    RepeatLimitExceeded { count: u64, max: u64 },

    #[error("Maximum schema depth of {max} exceeded")]
    DepthExceeded { max: usize },

    // ========================================================================
    // Download targets
    // ========================================================================
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL '{url}' is not allowed: {reason}")]
    UnsafeUrl { url: String, reason: String },

    // ========================================================================
    // Variable rules
    // ========================================================================
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidName { name, .. } => vec![
                format!("'{}' cannot be used as a file or folder name", name),
                "Avoid path separators, '..', reserved device names and <>:\"|?*".into(),
            ],
            Self::InvalidLoopVariable { .. } => vec![
                "Use a simple identifier for repeat_as, e.g. 'i' or 'item'".into(),
            ],
            Self::RepeatLimitExceeded { max, .. } => vec![
                format!("Keep repeat counts at or below {}", max),
                "Split very large repetitions into nested repeats".into(),
            ],
            Self::DepthExceeded { max } => vec![format!(
                "Flatten the schema; nesting deeper than {} levels is refused",
                max
            )],
            Self::InvalidUrl { .. } => vec!["Check the URL syntax, e.g. https://example.com/file".into()],
            Self::UnsafeUrl { .. } => vec![
                "Only public HTTPS hosts can be downloaded from".into(),
                "Private, loopback and link-local addresses are blocked".into(),
            ],
            Self::InvalidPattern { .. } => vec![
                "Simplify the pattern; nested quantifiers are refused".into(),
            ],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsafeUrl { .. } => ErrorCategory::Security,
            Self::InvalidPattern { reason, .. } if reason.contains("security") => {
                ErrorCategory::Security
            }
            _ => ErrorCategory::Validation,
        }
    }
}
