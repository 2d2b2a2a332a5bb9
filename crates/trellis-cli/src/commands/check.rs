//! `trellis check`: lint a schema without touching the filesystem.
//!
//! Warnings (such as undefined variables) are printed but do not fail the
//! command; errors exit with code 2.

use tracing::instrument;

use super::{build_service, collect_variables, load_schema};
use crate::{
    cli::CheckArgs,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[instrument(skip_all, fields(schema = %args.schema.display()))]
pub fn execute(args: CheckArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let tree = load_schema(&args.schema)?;
    let variables = collect_variables(&args.vars)?;

    let report = build_service(&config).check(&tree, &variables);

    if output.is_json() {
        output.json(&report)?;
    } else if report.is_clean() {
        output.success("Schema is clean")?;
    } else {
        output.schema_report(&report)?;
        output.print("")?;
        output.field("Errors", report.errors.len())?;
        output.field("Warnings", report.warnings.len())?;
    }

    if report.has_errors() {
        return Err(CliError::SchemaInvalid {
            count: report.errors.len(),
        });
    }
    Ok(())
}
