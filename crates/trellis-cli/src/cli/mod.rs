//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "trellis",
    bin_name = "trellis",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Schema-driven project structure generation",
    long_about = "Trellis materializes a folder/file schema onto disk: variables, \
                  conditionals, repeats, downloads, generated assets and \
                  post-create hooks, with a diff preview and undo.",
    after_help = "EXAMPLES:\n\
        \x20 trellis create schema.json -o . --var PROJECT=demo\n\
        \x20 trellis preview schema.json -o . --vars vars.toml --overwrite\n\
        \x20 trellis create schema.json -o . --record run.json && trellis undo run.json\n\
        \x20 trellis completions bash > /usr/share/bash-completion/completions/trellis",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Materialize a schema under an output directory.
    #[command(
        visible_alias = "c",
        about = "Create a structure from a schema",
        after_help = "EXAMPLES:\n\
            \x20 trellis create schema.json -o ./out --var PROJECT=demo\n\
            \x20 trellis create schema.toml -o ./out --vars vars.json --dry-run\n\
            \x20 trellis create schema.json -o ./out --record run.json --strict"
    )]
    Create(CreateArgs),

    /// Show what `create` would do without writing anything.
    #[command(
        visible_alias = "p",
        about = "Preview a schema as a diff tree",
        after_help = "EXAMPLES:\n\
            \x20 trellis preview schema.json -o ./out\n\
            \x20 trellis preview schema.json -o ./out --overwrite --output-format json"
    )]
    Preview(PreviewArgs),

    /// Remove what a recorded `create` run produced.
    #[command(
        about = "Undo a recorded run",
        after_help = "EXAMPLES:\n\
            \x20 trellis undo run.json --dry-run\n\
            \x20 trellis undo run.json --yes"
    )]
    Undo(UndoArgs),

    /// Check variable values against validation rules.
    #[command(
        about = "Validate variables against rules",
        after_help = "EXAMPLES:\n\
            \x20 trellis validate --rules rules.json --var NAME=demo\n\
            \x20 trellis validate --rules rules.toml --vars vars.toml"
    )]
    Validate(ValidateArgs),

    /// Lint a schema without touching the filesystem.
    #[command(
        about = "Lint a schema",
        after_help = "EXAMPLES:\n\
            \x20 trellis check schema.json\n\
            \x20 trellis check schema.json --var PROJECT=demo"
    )]
    Check(CheckArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 trellis completions bash > ~/.local/share/bash-completion/completions/trellis\n\
            \x20 trellis completions zsh  > ~/.zfunc/_trellis\n\
            \x20 trellis completions fish > ~/.config/fish/completions/trellis.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Trellis configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 trellis config get engine.max_depth\n\
            \x20 trellis config list\n\
            \x20 trellis config path"
    )]
    Config(ConfigCommands),
}

// ── shared variable input ─────────────────────────────────────────────────────

/// Variable sources shared by several subcommands.
///
/// File values are read first; `--var` pairs override them.
#[derive(Debug, Default, Args)]
pub struct VarArgs {
    /// A single variable, repeatable.
    #[arg(
        long = "var",
        value_name = "KEY=VALUE",
        value_parser = parse_key_val,
        help = "Set a variable (repeatable)"
    )]
    pub vars: Vec<(String, String)>,

    /// A JSON or TOML table of variables.
    #[arg(
        long = "vars",
        value_name = "FILE",
        help = "Read variables from a JSON or TOML file"
    )]
    pub vars_file: Option<PathBuf>,
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

// ── create ────────────────────────────────────────────────────────────────────

/// Arguments for `trellis create`.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Schema document (JSON or TOML).
    #[arg(value_name = "SCHEMA", help = "Schema file (.json or .toml)")]
    pub schema: PathBuf,

    /// Directory the root node is created in.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        help = "Output directory"
    )]
    pub output: PathBuf,

    #[command(flatten)]
    pub vars: VarArgs,

    /// Value for `%PROJECT_NAME%`.
    #[arg(
        long = "project-name",
        value_name = "NAME",
        help = "Project name (defaults to the root folder name)"
    )]
    pub project_name: Option<String>,

    /// Replace files that already exist.
    #[arg(long = "overwrite", help = "Overwrite existing files")]
    pub overwrite: bool,

    /// Log what would happen without writing.
    #[arg(long = "dry-run", help = "Show what would be created without creating")]
    pub dry_run: bool,

    /// Skip the schema's post-create hooks.
    #[arg(long = "no-hooks", help = "Do not run post-create hooks")]
    pub no_hooks: bool,

    /// Where to write the list of created items for `trellis undo`.
    #[arg(
        long = "record",
        value_name = "FILE",
        help = "Write created items to FILE for a later undo"
    )]
    pub record: Option<PathBuf>,

    /// Fail (exit 2) when any node reported an error.
    #[arg(long = "strict", help = "Exit with an error if any node failed")]
    pub strict: bool,
}

// ── preview ───────────────────────────────────────────────────────────────────

/// Arguments for `trellis preview`.
#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Schema document (JSON or TOML).
    #[arg(value_name = "SCHEMA", help = "Schema file (.json or .toml)")]
    pub schema: PathBuf,

    /// Directory the root node would be created in.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        help = "Output directory"
    )]
    pub output: PathBuf,

    #[command(flatten)]
    pub vars: VarArgs,

    /// Value for `%PROJECT_NAME%`.
    #[arg(long = "project-name", value_name = "NAME", help = "Project name")]
    pub project_name: Option<String>,

    /// Classify existing files as overwrites instead of skips.
    #[arg(long = "overwrite", help = "Preview with overwrite enabled")]
    pub overwrite: bool,
}

// ── undo ──────────────────────────────────────────────────────────────────────

/// Arguments for `trellis undo`.
#[derive(Debug, Args)]
pub struct UndoArgs {
    /// Record written by `trellis create --record`.
    #[arg(value_name = "RECORD", help = "Record file from a previous create")]
    pub record: PathBuf,

    /// Report what would be deleted.
    #[arg(long = "dry-run", help = "Show what would be deleted without deleting")]
    pub dry_run: bool,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long = "yes", help = "Delete without asking")]
    pub yes: bool,
}

// ── validate ──────────────────────────────────────────────────────────────────

/// Arguments for `trellis validate`.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Rules keyed by variable name.
    #[arg(
        long = "rules",
        value_name = "FILE",
        help = "Validation rules (.json or .toml)"
    )]
    pub rules: PathBuf,

    #[command(flatten)]
    pub vars: VarArgs,
}

// ── check ─────────────────────────────────────────────────────────────────────

/// Arguments for `trellis check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Schema document (JSON or TOML).
    #[arg(value_name = "SCHEMA", help = "Schema file (.json or .toml)")]
    pub schema: PathBuf,

    #[command(flatten)]
    pub vars: VarArgs,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `trellis completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `trellis config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `engine.max_depth`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────
