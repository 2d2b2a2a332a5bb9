//! `trellis preview`: the diff a `create` would produce.

use tracing::instrument;

use super::{build_service, collect_variables, load_schema};
use crate::{
    cli::PreviewArgs,
    config::AppConfig,
    error::{CliResult, IntoCli},
    output::OutputManager,
};

#[instrument(skip_all, fields(schema = %args.schema.display(), output = %args.output.display()))]
pub fn execute(args: PreviewArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let tree = load_schema(&args.schema)?;
    let variables = collect_variables(&args.vars)?;
    let project_name = args
        .project_name
        .as_deref()
        .or(config.defaults.project_name.as_deref());
    let overwrite = args.overwrite || config.defaults.overwrite;

    let diff = build_service(&config)
        .preview(&tree, &args.output, &variables, project_name, overwrite)
        .with_cli_context(|| "computing preview")?;

    if output.is_json() {
        output.json(&diff)?;
        return Ok(());
    }

    output.diff_tree(&diff.root)?;

    let summary = &diff.summary;
    output.print("")?;
    output.header("Preview")?;
    output.field("Create", summary.creates)?;
    output.field("Overwrite", summary.overwrites)?;
    output.field("Skip", summary.skips)?;
    output.field("Unchanged", summary.unchanged_folders)?;
    for warning in &summary.warnings {
        output.warning(warning)?;
    }
    Ok(())
}
