//! Flags shared by every subcommand.
//!
//! Flattened into [`super::Cli`] with `global = true`, so
//! `trellis -v create ...` and `trellis create ... -v` mean the same thing.

use std::path::PathBuf;

use clap::{ArgAction, Args, ValueEnum};

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase logging verbosity: `-v` info, `-vv` debug, `-vvv` trace.
    ///
    /// Also prints the cause chain of a failing command.
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "More log output (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Only errors: the log level drops to ERROR and progress, summaries and
    /// non-error log entries are hidden.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Print errors only"
    )]
    pub quiet: bool,

    /// No ANSI colour.  `NO_COLOR` with any value other than a false literal
    /// (`0`, `false`, `no`, `off`) has the same effect.
    #[arg(
        long = "no-color",
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new(),
        help = "Disable colored output"
    )]
    pub no_color: bool,

    /// Read this TOML file instead of the platform default; it must exist.
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        value_name = "FILE",
        help = "Configuration file"
    )]
    pub config: Option<PathBuf>,

    /// `json` prints the engine's result object on stdout and switches
    /// tracing output to JSON lines on stderr.
    #[arg(
        long = "output-format",
        global = true,
        value_enum,
        default_value = "auto",
        help = "Result format"
    )]
    pub output_format: OutputFormat,
}

impl GlobalArgs {
    /// Whether error reports include every `source()` in the chain.
    pub fn wants_error_chain(&self) -> bool {
        self.verbose > 0
    }
}

/// How results are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `human` on a terminal, `plain` otherwise.
    #[default]
    Auto,
    /// Coloured log lines and trees.
    Human,
    /// The same text without colour.
    Plain,
    /// The engine result as pretty JSON.
    Json,
}

impl OutputFormat {
    /// Parse the `output.format` config value; unknown values mean `auto`.
    pub fn from_setting(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value.trim(), true).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_case_insensitively() {
        assert_eq!(OutputFormat::from_setting("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_setting(" plain "), OutputFormat::Plain);
        assert_eq!(OutputFormat::from_setting("fancy"), OutputFormat::Auto);
    }
}
