//! Implementation of the `trellis create` command.
//!
//! Responsibility: turn CLI arguments into a `create` call on the core
//! service, persist the undo record, and display the activity log.  No
//! business logic lives here.

use tracing::{info, instrument};

use trellis_adapters::SchemaLoader;
use trellis_core::application::CreateOptions;
use trellis_core::domain::CreateResult;

use super::{build_service, collect_variables, load_schema};
use crate::{
    cli::CreateArgs,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Execute the `trellis create` command.
///
/// Dispatch sequence:
/// 1. Load the schema and variables
/// 2. Merge flags with `[defaults]` from the config
/// 3. Run the engine (behind a spinner on a terminal)
/// 4. Write the undo record if `--record` was given
/// 5. Print the log and summary
/// 6. Under `--strict`, fail when any node reported an error
#[instrument(skip_all, fields(schema = %args.schema.display(), output = %args.output.display()))]
pub fn execute(args: CreateArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let tree = load_schema(&args.schema)?;
    let variables = collect_variables(&args.vars)?;

    let options = CreateOptions {
        dry_run: args.dry_run,
        overwrite: args.overwrite || config.defaults.overwrite,
        run_hooks: !args.no_hooks && config.defaults.run_hooks,
    };
    let project_name = args
        .project_name
        .as_deref()
        .or(config.defaults.project_name.as_deref());

    let service = build_service(&config);
    let spinner = output.spinner("Creating structure...");
    let result = service.create(&tree, &args.output, &variables, project_name, options);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = result.with_cli_context(|| "creating structure")?;

    info!(
        folders = result.summary.folders_created,
        files = result.summary.files_created,
        errors = result.summary.errors,
        "Create finished"
    );

    let recorded = match &args.record {
        Some(path) if !args.dry_run => {
            SchemaLoader::new().save_record(path, &result.created_items)?;
            Some(path)
        }
        _ => None,
    };

    if output.is_json() {
        output.json(&result)?;
    } else {
        render(&result, args.dry_run, &output)?;
        if let Some(path) = recorded {
            output.info(&format!(
                "Recorded {} item(s) to {}; run 'trellis undo {}' to remove them",
                result.created_items.len(),
                path.display(),
                path.display()
            ))?;
        } else if args.record.is_some() {
            output.info("Dry run: no record written")?;
        }
    }

    if args.strict && result.summary.errors > 0 {
        return Err(CliError::RunHadErrors {
            errors: result.summary.errors,
        });
    }
    Ok(())
}

fn render(result: &CreateResult, dry_run: bool, output: &OutputManager) -> CliResult<()> {
    output.log_entries(&result.logs)?;

    let summary = &result.summary;
    output.print("")?;
    output.header(if dry_run { "Dry run summary" } else { "Summary" })?;
    output.field("Folders", summary.folders_created)?;
    output.field("Files", summary.files_created)?;
    if summary.files_downloaded > 0 {
        output.field("Downloaded", summary.files_downloaded)?;
    }
    if summary.files_generated > 0 {
        output.field("Generated", summary.files_generated)?;
    }
    output.field("Skipped", summary.skipped)?;
    output.field("Errors", summary.errors)?;
    if summary.hooks_executed > 0 || summary.hooks_failed > 0 {
        output.field(
            "Hooks",
            format!("{} ran, {} failed", summary.hooks_executed, summary.hooks_failed),
        )?;
    }
    output.print("")?;

    if summary.errors > 0 {
        output.warning(&format!("Finished with {} error(s)", summary.errors))?;
    } else if dry_run {
        output.success("Dry run complete; nothing was written")?;
    } else {
        output.success("Structure created")?;
    }
    Ok(())
}
