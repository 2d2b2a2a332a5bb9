//! Command errors and their mapping to exit codes.
//!
//! Node-level failures inside a run are *not* errors here: the engine
//! reports them in the activity log and the command still succeeds,
//! unless `--strict` turns them into [`CliError::RunHadErrors`].

use std::error::Error as _;
use std::path::PathBuf;

use owo_colors::{OwoColorize, Style};
use thiserror::Error;

use trellis_core::error::{ErrorCategory as CoreCategory, TrellisError};

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// An input file named on the command line does not exist.
    #[error("{what} not found: {path}")]
    FileNotFound { what: &'static str, path: PathBuf },

    #[error("Run finished with {errors} node error(s)")]
    RunHadErrors { errors: usize },

    #[error("{count} variable(s) failed validation")]
    ValidationFailed { count: usize },

    #[error("Schema has {count} error(s)")]
    SchemaInvalid { count: usize },

    #[error("Record {path} lists no items")]
    EmptyRecord { path: PathBuf },

    /// The settings file is missing, unreadable or holds bad values.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Raised by the engine or one of its adapters. Displayed as-is since
    /// core messages already name the path or URL involved.
    #[error("{0}")]
    Core(#[from] TrellisError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt failed: {message}")]
    Prompt { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    /// The binary was built without a cargo feature the command needs.
    #[error("Feature not available: {feature}")]
    FeatureNotAvailable { feature: &'static str },
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            context: source.to_string(),
            source,
        }
    }
}

/// What kind of failure a [`CliError`] is; decides the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input: arguments, schema content, variable values.
    UserError,
    NotFound,
    Configuration,
    Internal,
}

impl ErrorCategory {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::UserError => 2,
            Self::NotFound => 3,
            Self::Configuration => 4,
        }
    }
}

impl From<CoreCategory> for ErrorCategory {
    fn from(category: CoreCategory) -> Self {
        match category {
            CoreCategory::Validation | CoreCategory::Security => Self::UserError,
            CoreCategory::Configuration => Self::Configuration,
            CoreCategory::Internal => Self::Internal,
        }
    }
}

impl CliError {
    pub fn category(&self) -> ErrorCategory {
        use ErrorCategory::*;
        match self {
            Self::FileNotFound { .. } => NotFound,
            Self::ConfigError { .. } | Self::FeatureNotAvailable { .. } => Configuration,
            Self::Core(core) => core.category().into(),
            Self::Io { .. } => Internal,
            Self::RunHadErrors { .. }
            | Self::ValidationFailed { .. }
            | Self::SchemaInvalid { .. }
            | Self::EmptyRecord { .. }
            | Self::Prompt { .. }
            | Self::Cancelled => UserError,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }

    /// Hints printed under the message.
    pub fn suggestions(&self) -> Vec<String> {
        let mut hints: Vec<String> = match self {
            Self::FileNotFound { what, path } => vec![
                format!("No {} at '{}'", what.to_lowercase(), path.display()),
                "Paths are resolved relative to the current directory".into(),
            ],
            Self::RunHadErrors { .. } => vec![
                "See the error entries in the log above".into(),
                "Run 'trellis check <SCHEMA>' to find schema problems".into(),
                "Drop --strict to treat node errors as warnings".into(),
            ],
            Self::ValidationFailed { .. } => vec![
                "Fix the values listed above and run validate again".into(),
                "Pass values with --var KEY=VALUE or --vars FILE".into(),
            ],
            Self::SchemaInvalid { .. } => vec!["Warnings alone do not fail 'trellis check'".into()],
            Self::EmptyRecord { .. } => {
                vec!["The run may have been a dry run, or created nothing".into()]
            }
            Self::ConfigError { .. } => vec![
                format!(
                    "Settings are read from {}",
                    crate::config::AppConfig::config_path().display()
                ),
                "TRELLIS_* environment variables override file values".into(),
            ],
            Self::Core(core) => core.suggestions(),
            Self::Io { .. } => vec!["Check permissions on the paths involved".into()],
            Self::Prompt { .. } => vec![
                "Confirmation needs an interactive terminal".into(),
                "Pass --yes to skip the prompt".into(),
            ],
            Self::Cancelled => vec!["No changes were made".into()],
            Self::FeatureNotAvailable { feature } => vec![format!(
                "Rebuild with it enabled: cargo install trellis-cli --features {feature}"
            )],
        };
        if matches!(self, Self::Core(core) if core.is_transient()) {
            hints.push("This may be temporary; try the command again".into());
        }
        hints
    }

    /// Report with ANSI colours, for a terminal stderr.
    pub fn format_colored(&self, verbose: bool) -> String {
        self.render(verbose, true)
    }

    pub fn format_plain(&self, verbose: bool) -> String {
        self.render(verbose, false)
    }

    /// Headline, then the cause chain when verbose, then suggestions.
    /// Without `-v` a closing line says how to get the chain.
    fn render(&self, verbose: bool, color: bool) -> String {
        let paint = |text: &str, style: Style| match color {
            true => text.style(style).to_string(),
            false => text.to_owned(),
        };
        let red = Style::new().red();
        let dim = Style::new().dimmed();

        let mut lines = vec![
            String::new(),
            format!("{} {}", paint("Error:", red.bold()), paint(&self.to_string(), red)),
        ];
        if verbose {
            let chain = std::iter::successors(self.source(), |&err| err.source());
            lines.extend(chain.map(|err| paint(&format!("  Caused by: {err}"), dim)));
        }

        let hints = self.suggestions();
        if !hints.is_empty() {
            lines.push(String::new());
            lines.push(paint("Suggestions:", Style::new().yellow().bold()));
            lines.extend(hints.iter().map(|hint| format!("  {hint}")));
        }
        if !verbose {
            lines.push(String::new());
            lines.push(paint("Use -v / --verbose for more details.", dim));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Emit one tracing event; internal and config failures at ERROR,
    /// the rest at WARN.
    pub fn log(&self) {
        let category = self.category();
        if matches!(category, ErrorCategory::Internal | ErrorCategory::Configuration) {
            tracing::error!(?category, error = %self, "command failed");
        } else {
            tracing::warn!(?category, error = %self, "command failed");
        }
        if let Some(source) = self.source() {
            tracing::debug!(%source, "caused by");
        }
    }
}

/// Attach a call-site description while converting into [`CliError`].
pub trait IntoCli<T> {
    fn with_cli_context<S: Into<String>>(self, context: impl FnOnce() -> S) -> CliResult<T>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<S: Into<String>>(self, context: impl FnOnce() -> S) -> CliResult<T> {
        self.map_err(|source| CliError::Io {
            context: context().into(),
            source,
        })
    }
}

impl<T> IntoCli<T> for Result<T, TrellisError> {
    /// The description only goes to the debug log.
    fn with_cli_context<S: Into<String>>(self, context: impl FnOnce() -> S) -> CliResult<T> {
        self.map_err(|core| {
            tracing::debug!(context = %context().into(), "engine error");
            CliError::Core(core)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use trellis_core::application::ApplicationError;
    use trellis_core::domain::DomainError;

    fn disk_full() -> CliError {
        CliError::Io {
            context: "writing record".into(),
            source: io::Error::other("disk full"),
        }
    }

    #[test]
    fn exit_codes_by_category() {
        let cases = [
            (CliError::ValidationFailed { count: 1 }, 2),
            (CliError::SchemaInvalid { count: 1 }, 2),
            (CliError::Cancelled, 2),
            (
                CliError::FileNotFound {
                    what: "Schema",
                    path: PathBuf::from("missing.json"),
                },
                3,
            ),
            (
                CliError::ConfigError {
                    message: "x".into(),
                    source: None,
                },
                4,
            ),
            (disk_full(), 1),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{err}");
        }
    }

    #[test]
    fn strict_failure_points_at_check() {
        let err = CliError::RunHadErrors { errors: 3 };
        assert!(err.suggestions().iter().any(|s| s.contains("trellis check")));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn prompt_failure_suggests_yes() {
        let err = CliError::Prompt {
            message: "not a terminal".into(),
        };
        assert!(err.suggestions().iter().any(|s| s.contains("--yes")));
    }

    #[test]
    fn core_suggestions_are_forwarded() {
        let core: TrellisError = ApplicationError::NoOutputRoot.into();
        let expected = core.suggestions();
        assert_eq!(CliError::Core(core).suggestions(), expected);
    }

    #[test]
    fn transient_core_errors_suggest_retry() {
        let err = CliError::Core(ApplicationError::LockPoisoned.into());
        assert!(err.suggestions().iter().any(|s| s.contains("try the command again")));
    }

    #[test]
    fn security_errors_are_user_errors() {
        let core: TrellisError = DomainError::UnsafeUrl {
            url: "http://127.0.0.1/".into(),
            reason: "loopback".into(),
        }
        .into();
        assert_eq!(CliError::Core(core).category(), ErrorCategory::UserError);
    }

    #[test]
    fn plain_report_layout() {
        let err = CliError::FileNotFound {
            what: "Schema",
            path: PathBuf::from("/tmp/x.json"),
        };
        let s = err.format_plain(false);
        assert!(s.starts_with("\nError: Schema not found: /tmp/x.json\n"));
        assert!(s.contains("\nSuggestions:\n"));
        assert!(s.ends_with("Use -v / --verbose for more details.\n"));
    }

    #[test]
    fn verbose_report_shows_cause() {
        let s = disk_full().format_plain(true);
        assert!(s.contains("Caused by: disk full"));
        assert!(!s.contains("--verbose"));
    }

    #[test]
    fn colored_report_carries_escapes() {
        let err = CliError::Cancelled;
        assert!(err.format_colored(false).contains("\u{1b}["));
        assert!(!err.format_plain(false).contains("\u{1b}["));
    }

    #[test]
    fn io_context_is_kept() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        match result.with_cli_context(|| "reading record") {
            Err(CliError::Io { context, .. }) => assert_eq!(context, "reading record"),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn core_results_wrap_as_core() {
        let result: Result<(), TrellisError> = Err(ApplicationError::UndoUnsupported.into());
        assert!(matches!(result.with_cli_context(|| "undoing"), Err(CliError::Core(_))));
    }
}
