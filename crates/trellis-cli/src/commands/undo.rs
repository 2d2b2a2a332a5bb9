//! `trellis undo`: remove what a recorded `create` run made.
//!
//! Items recorded as pre-existing are never deleted, and folders go only
//! once they are empty; see the engine's undo executor.

use std::path::Path;

use tracing::{info, instrument};

use trellis_adapters::SchemaLoader;

use super::{build_service, require_file};
use crate::{
    cli::UndoArgs,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

#[instrument(skip_all, fields(record = %args.record.display(), dry_run = args.dry_run))]
pub fn execute(args: UndoArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    require_file("Record", &args.record)?;
    let items = SchemaLoader::new().load_record(&args.record)?;
    if items.is_empty() {
        return Err(CliError::EmptyRecord { path: args.record });
    }

    if !args.dry_run && !args.yes && !confirm(&args.record, items.len())? {
        return Err(CliError::Cancelled);
    }

    let result = build_service(&config)
        .undo(&items, args.dry_run)
        .with_cli_context(|| "undoing run")?;
    info!(
        files = result.summary.files_deleted,
        folders = result.summary.folders_deleted,
        "Undo finished"
    );

    if output.is_json() {
        output.json(&result)?;
        return Ok(());
    }

    output.log_entries(&result.logs)?;
    let summary = &result.summary;
    output.print("")?;
    output.header(if args.dry_run { "Dry run summary" } else { "Summary" })?;
    output.field("Files", summary.files_deleted)?;
    output.field("Folders", summary.folders_deleted)?;
    output.field("Skipped", summary.items_skipped)?;
    output.field("Errors", summary.errors)?;
    output.print("")?;
    if summary.errors > 0 {
        output.warning(&format!("Undo finished with {} error(s)", summary.errors))?;
    } else if !args.dry_run {
        output.success("Undo complete")?;
    }
    Ok(())
}

#[cfg(feature = "interactive")]
fn confirm(record: &Path, count: usize) -> CliResult<bool> {
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Delete up to {count} item(s) listed in {}?",
            record.display()
        ))
        .default(false)
        .interact()
        .map_err(|e| CliError::Prompt {
            message: e.to_string(),
        })
}

#[cfg(not(feature = "interactive"))]
fn confirm(_record: &Path, _count: usize) -> CliResult<bool> {
    Err(CliError::FeatureNotAvailable {
        feature: "interactive",
    })
}
