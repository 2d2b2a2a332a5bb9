//! Command handlers, one module per subcommand.
//!
//! Handlers translate arguments into engine calls and print the results.
//! The helpers below are the only place adapters are wired together.

use std::path::Path;

use tracing::debug;

use trellis_adapters::{
    BuiltinGenerators, HttpFetcher, LocalFilesystem, SchemaLoader, ShellHookRunner,
};
use trellis_core::application::StructureService;
use trellis_core::application::services::structure_service::Variables;
use trellis_core::domain::{SchemaTree, canonical_key};

use crate::cli::VarArgs;
use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

pub mod check;
pub mod completions;
pub mod config;
pub mod create;
pub mod preview;
pub mod undo;
pub mod validate;

/// A service backed by the real filesystem, network, generators and shell.
pub(crate) fn build_service(config: &AppConfig) -> StructureService {
    let fetcher = HttpFetcher::new().with_user_agent(concat!("trellis/", env!("CARGO_PKG_VERSION")));
    StructureService::new(Box::new(LocalFilesystem::new()))
        .with_fetcher(Box::new(fetcher))
        .with_generator(Box::new(BuiltinGenerators::new()))
        .with_hook_runner(Box::new(ShellHookRunner::new()))
        .with_limits(config.engine.clone())
}

/// Fail with exit code 3 before any loader sees a missing file.
pub(crate) fn require_file(what: &'static str, path: &Path) -> CliResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::FileNotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

pub(crate) fn load_schema(path: &Path) -> CliResult<SchemaTree> {
    require_file("Schema", path)?;
    let tree = SchemaLoader::new().load_schema(path)?;
    debug!(schema = %path.display(), "Schema loaded");
    Ok(tree)
}

/// Merge `--vars FILE` with `--var` pairs; pairs win. Keys are stored in
/// canonical `%NAME%` form so `name` and `NAME` are the same variable.
pub(crate) fn collect_variables(args: &VarArgs) -> CliResult<Variables> {
    let from_file = match &args.vars_file {
        Some(path) => {
            require_file("Variables file", path)?;
            SchemaLoader::new().load_variables(path)?
        }
        None => Variables::new(),
    };
    let variables = from_file
        .into_iter()
        .chain(args.vars.iter().cloned())
        .map(|(key, value)| (canonical_key(&key), value))
        .collect();
    Ok(variables)
}
