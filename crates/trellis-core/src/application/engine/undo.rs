//! Reverse a previous materialization.
//!
//! Only items the run actually created are touched; anything recorded as
//! `pre_existed` was overwritten, not created, and is never deleted.
//! Folders are removed deepest-first and only once they are empty.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::application::ApplicationError;
use crate::application::ports::Filesystem;
use crate::domain::{CreatedItem, ItemType, LogEntry, LogType, UndoResult};
use crate::error::TrellisResult;

#[instrument(skip_all, fields(items = items.len(), dry_run = dry_run))]
pub(crate) fn undo(
    items: &[CreatedItem],
    fs: &dyn Filesystem,
    dry_run: bool,
) -> TrellisResult<UndoResult> {
    if !fs.supports_delete() {
        return Err(ApplicationError::UndoUnsupported.into());
    }

    let mut run = UndoRun {
        fs,
        dry_run,
        result: UndoResult::default(),
        gone: HashSet::new(),
    };

    let mut files = Vec::new();
    let mut folders = Vec::new();
    for item in items {
        if item.pre_existed {
            run.skip(
                format!("Skipped (pre-existed): {}", item.path.display()),
                Some("This item existed before creation and was overwritten".into()),
            );
            continue;
        }
        match item.item_type {
            ItemType::File => files.push(item.path.as_path()),
            ItemType::Folder => folders.push(item.path.as_path()),
        }
    }

    for path in files.into_iter().rev() {
        run.file(path);
    }

    // Deepest first; ties by path so duplicates end up adjacent.
    folders.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| a.cmp(b))
    });
    folders.dedup();
    for path in folders {
        run.folder(path);
    }

    let summary = &run.result.summary;
    info!(
        files = summary.files_deleted,
        folders = summary.folders_deleted,
        skipped = summary.items_skipped,
        errors = summary.errors,
        "undo finished"
    );
    Ok(run.result)
}

struct UndoRun<'a> {
    fs: &'a dyn Filesystem,
    dry_run: bool,
    result: UndoResult,
    /// Paths deleted so far (or that a dry run would have deleted).
    gone: HashSet<PathBuf>,
}

impl UndoRun<'_> {
    fn log(&mut self, log_type: LogType, message: String, details: Option<String>) {
        self.result.logs.push(LogEntry::new(log_type, message, details));
    }

    fn skip(&mut self, message: String, details: Option<String>) {
        self.result.summary.items_skipped += 1;
        self.log(LogType::Info, message, details);
    }

    fn fail(&mut self, message: String, error: impl std::fmt::Display) {
        warn!(%message, %error, "undo step failed");
        self.result.summary.errors += 1;
        self.log(LogType::Error, message, Some(format!("Error: {}", error)));
    }

    fn file(&mut self, path: &Path) {
        let shown = path.display().to_string();
        match self.fs.entry(path) {
            Ok(Some(entry)) if entry.is_file() => {}
            Ok(Some(_)) => {
                return self.skip(
                    format!("Not a file, skipped: {}", shown),
                    Some("The path now holds a folder".into()),
                );
            }
            Ok(None) => return self.skip(format!("File already deleted: {}", shown), None),
            Err(e) => return self.fail(format!("Failed to inspect file: {}", shown), e),
        }

        if self.dry_run {
            self.result.summary.files_deleted += 1;
            self.gone.insert(path.to_path_buf());
            return self.log(LogType::Info, format!("Would delete file: {}", shown), None);
        }
        match self.fs.remove_file(path) {
            Ok(()) => {
                self.result.summary.files_deleted += 1;
                self.gone.insert(path.to_path_buf());
                self.log(LogType::Success, format!("Deleted file: {}", shown), None);
            }
            Err(e) => self.fail(format!("Failed to delete file: {}", shown), e),
        }
    }

    fn folder(&mut self, path: &Path) {
        let shown = path.display().to_string();
        match self.fs.entry(path) {
            Ok(Some(entry)) if entry.is_dir() => {}
            Ok(Some(_)) => {
                return self.skip(
                    format!("Not a folder, skipped: {}", shown),
                    Some("The path now holds a file".into()),
                );
            }
            Ok(None) => return self.skip(format!("Folder already deleted: {}", shown), None),
            Err(e) => return self.fail(format!("Failed to inspect folder: {}", shown), e),
        }

        let remaining = match self.fs.list_dir(path) {
            Ok(names) => names
                .into_iter()
                .filter(|name| !self.gone.contains(&path.join(name)))
                .count(),
            Err(e) => return self.fail(format!("Failed to read folder: {}", shown), e),
        };
        if remaining > 0 {
            return self.skip(
                format!("Folder not empty, skipped: {}", shown),
                Some("Only empty folders are deleted to prevent data loss".into()),
            );
        }

        if self.dry_run {
            self.result.summary.folders_deleted += 1;
            self.gone.insert(path.to_path_buf());
            return self.log(LogType::Info, format!("Would delete folder: {}", shown), None);
        }
        match self.fs.remove_dir(path) {
            Ok(()) => {
                self.result.summary.folders_deleted += 1;
                self.gone.insert(path.to_path_buf());
                self.log(LogType::Success, format!("Deleted folder: {}", shown), None);
            }
            Err(e) => self.fail(format!("Failed to delete folder: {}", shown), e),
        }
    }
}
