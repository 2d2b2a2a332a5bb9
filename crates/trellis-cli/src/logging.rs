//! Tracing subscriber initialisation.
//!
//! The library crates only emit events; this binary is the one place a
//! subscriber is installed.
//!
//! | Flags     | Level |
//! |-----------|-------|
//! | (none)    | WARN  |
//! | `-v`      | INFO  |
//! | `-vv`     | DEBUG |
//! | `-vvv`    | TRACE |
//! | `--quiet` | ERROR |
//!
//! A set `RUST_LOG` replaces the table entirely.  Events always go to
//! stderr; with `--output-format json` they are JSON lines so that stdout
//! carries nothing but the command's own JSON document.

use std::io::IsTerminal as _;

use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::cli::{GlobalArgs, OutputFormat};

/// Crates whose events pass the default filter.
const TARGETS: [&str; 3] = ["trellis", "trellis_core", "trellis_adapters"];

/// Install the global subscriber.  Fails if one is already installed.
pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(level_for(args.verbose, args.quiet)));

    let json = args.output_format == OutputFormat::Json;
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_ansi(!args.no_color && std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber already set: {e}"))
}

fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

/// Everything outside our crates stays at WARN.
fn default_filter(level: LevelFilter) -> EnvFilter {
    TARGETS
        .iter()
        .fold(EnvFilter::new("warn"), |filter, target| {
            match format!("{target}={level}").parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_table() {
        let cases = [
            (0, false, LevelFilter::WARN),
            (1, false, LevelFilter::INFO),
            (2, false, LevelFilter::DEBUG),
            (3, false, LevelFilter::TRACE),
            (10, false, LevelFilter::TRACE),
            (0, true, LevelFilter::ERROR),
            (3, true, LevelFilter::ERROR),
        ];
        for (verbose, quiet, expected) in cases {
            assert_eq!(level_for(verbose, quiet), expected, "-v x{verbose}, quiet={quiet}");
        }
    }

    #[test]
    fn default_filter_names_every_crate() {
        let rendered = default_filter(LevelFilter::DEBUG).to_string().to_lowercase();
        for target in TARGETS {
            assert!(rendered.contains(&format!("{target}=debug")), "{rendered}");
        }
    }
}
