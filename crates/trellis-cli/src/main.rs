//! # Trellis CLI
//!
//! Host application for the Trellis schema engine: create, preview and
//! undo folder/file structures described by a schema document.
//!
//! ## Startup
//!
//! ```text
//!  .env ──► clap ──► tracing ──► AppConfig ──► OutputManager ──► command
//!            │                      │                               │
//!            └─ usage error (2)     └─ config error (4)             └─ CliError ─► exit code
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! |  0   | Success (node errors are logged, not fatal)          |
//! |  1   | Internal / system error                              |
//! |  2   | Usage error, `--strict` node errors, failed validation or lint |
//! |  3   | Input file not found                                 |
//! |  4   | Configuration error                                  |

use std::io::IsTerminal as _;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // RUST_LOG and TRELLIS_* may come from a .env file; a missing file is fine.
    let _ = dotenvy::dotenv();

    // --help / --version arrive here too; only real usage errors go to stderr.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let rendered = e.render();
            if e.use_stderr() {
                eprintln!("{}", rendered.ansi());
            } else {
                print!("{rendered}");
            }
            return ExitCode::from(e.exit_code().clamp(0, 255) as u8);
        }
    };

    if let Err(e) = init_logging(&cli.global) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::from(1);
    }
    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        format = ?cli.global.output_format,
        "CLI started"
    );

    let verbose = cli.global.wants_error_chain();
    let outcome = AppConfig::load(cli.global.config.as_ref())
        .map_err(|e| CliError::ConfigError {
            message: e.to_string(),
            source: Some(e.into()),
        })
        .and_then(|config| {
            let output = OutputManager::new(&cli.global, &config);
            run(cli.command, config, output)
        });

    match outcome {
        Ok(()) => {
            info!("Trellis finished");
            ExitCode::SUCCESS
        }
        Err(e) => report(&e, verbose),
    }
}

/// Dispatch to the correct command handler.
#[instrument(skip_all)]
fn run(command: Commands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match command {
        Commands::Create(args) => commands::create::execute(args, config, output),
        Commands::Preview(args) => commands::preview::execute(args, config, output),
        Commands::Undo(args) => commands::undo::execute(args, config, output),
        Commands::Validate(args) => commands::validate::execute(args, config, output),
        Commands::Check(args) => commands::check::execute(args, config, output),
        Commands::Completions(args) => commands::completions::execute(args),
        Commands::Config(cmd) => commands::config::execute(cmd, config, output),
    }
}

/// Print `err` to stderr and map it to the process exit code.
///
/// stderr is used so the message survives stdout redirection, and it is
/// coloured only when stderr itself is a terminal.
fn report(err: &CliError, verbose: bool) -> ExitCode {
    err.log();
    let message = if std::io::stderr().is_terminal() {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{message}");
    ExitCode::from(err.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_version_matches_cargo() {
        assert_eq!(Cli::command().get_version(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn every_command_is_reachable() {
        let cmd = Cli::command();
        let names: Vec<_> = cmd.get_subcommands().map(|c| c.get_name().to_owned()).collect();
        for expected in [
            "create",
            "preview",
            "undo",
            "validate",
            "check",
            "completions",
            "config",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn short_aliases() {
        assert!(matches!(
            Cli::try_parse_from(["trellis", "c", "s.json", "-o", "out"]).map(|c| c.command),
            Ok(Commands::Create(_))
        ));
        assert!(matches!(
            Cli::try_parse_from(["trellis", "p", "s.json", "-o", "out"]).map(|c| c.command),
            Ok(Commands::Preview(_))
        ));
    }
}
