//! `trellis validate`: check variable values against a rules file.

use tracing::instrument;

use trellis_adapters::SchemaLoader;

use super::{build_service, collect_variables, require_file};
use crate::{
    cli::ValidateArgs,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[instrument(skip_all, fields(rules = %args.rules.display()))]
pub fn execute(args: ValidateArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    require_file("Rules file", &args.rules)?;
    let rules = SchemaLoader::new().load_rules(&args.rules)?;
    let variables = collect_variables(&args.vars)?;

    let errors = build_service(&config).validate(&variables, &rules);

    if output.is_json() {
        output.json(&errors)?;
    } else if errors.is_empty() {
        output.success(&format!("All {} rule(s) passed", rules.len()))?;
    } else {
        for error in &errors {
            output.error(&format!("{}: {}", error.variable_name, error.message))?;
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::ValidationFailed {
            count: errors.len(),
        })
    }
}
