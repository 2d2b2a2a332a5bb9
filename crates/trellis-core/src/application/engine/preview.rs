//! Dry-run diff strategy.
//!
//! Visits exactly the nodes a real run would (the walker decides that) and
//! classifies each one instead of writing it:
//!
//! | Node   | Exists | overwrite | Action      |
//! |--------|--------|-----------|-------------|
//! | folder | no     | any       | `create`    |
//! | folder | yes    | any       | `unchanged` |
//! | file   | no     | any       | `create`    |
//! | file   | yes    | `true`    | `overwrite` |
//! | file   | yes    | `false`   | `skip`      |

use std::path::Path;

use tracing::{debug, instrument};
use uuid::Uuid;

use super::diff::{compute_hunks, is_binary_content, truncate_content};
use super::walker::{Cursor, LeafStrategy, Walker};
use crate::application::ports::{Entry, Filesystem};
use crate::domain::{
    DiffAction, DiffNode, DiffNodeType, DiffResult, DiffSummary, EngineLimits, FileNode,
    FileSource, LogEntry, LogType, NodeKind, SchemaTree, VariableScope, render_content,
    substitute, validate_download_url,
};

pub(crate) struct Preview<'a> {
    fs: &'a dyn Filesystem,
    limits: &'a EngineLimits,
    overwrite: bool,
    summary: DiffSummary,
}

pub(crate) struct PlannedFolder {
    name: String,
    rel: String,
    action: DiffAction,
}

#[instrument(skip_all, fields(root = %output_root.display(), overwrite = overwrite))]
pub(crate) fn preview(
    tree: &SchemaTree,
    output_root: &Path,
    scope: &VariableScope<'_>,
    fs: &dyn Filesystem,
    limits: &EngineLimits,
    overwrite: bool,
) -> DiffResult {
    let strategy = Preview {
        fs,
        limits,
        overwrite,
        summary: DiffSummary::default(),
    };
    let mut walker = Walker::new(strategy, limits);
    let mut items = walker.walk_root(&tree.root, &Cursor::root(output_root), scope);
    let strategy = walker.into_strategy();

    let root = if items.len() == 1 {
        items.remove(0)
    } else {
        node(
            DiffNodeType::Folder,
            "[root]".to_string(),
            ".".to_string(),
            DiffAction::Unchanged,
            items,
        )
    };
    debug!(
        total = strategy.summary.total_items,
        creates = strategy.summary.creates,
        "preview finished"
    );
    DiffResult {
        root,
        summary: strategy.summary,
    }
}

fn node(
    node_type: DiffNodeType,
    name: String,
    path: String,
    action: DiffAction,
    children: Vec<DiffNode>,
) -> DiffNode {
    DiffNode {
        id: Uuid::new_v4().to_string(),
        node_type,
        name,
        path,
        action,
        existing_content: None,
        new_content: None,
        diff_hunks: None,
        url: None,
        is_binary: false,
        children: (!children.is_empty()).then_some(children),
    }
}

impl Preview<'_> {
    fn warn(&mut self, message: String) {
        debug!(%message, "preview warning");
        self.summary.warnings.push(message);
    }

    fn lookup(&mut self, at: &Cursor) -> Option<Entry> {
        if at.virtual_subtree {
            return None;
        }
        match self.fs.entry(&at.path) {
            Ok(entry) => entry,
            Err(e) => {
                self.warn(format!("Could not inspect {}: {}", at.display(), e));
                None
            }
        }
    }

    /// Current content of a file about to be overwritten.
    fn existing(&mut self, at: &Cursor, entry: Entry) -> Existing {
        if entry.size > self.limits.max_preview_bytes {
            return Existing::Placeholder(format!("[File too large to diff: {} bytes]", entry.size));
        }
        match self.fs.read_file(&at.path) {
            Ok(bytes) if is_binary_content(&bytes) => Existing::Binary,
            Ok(bytes) => Existing::Text(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                self.warn(format!("Could not read {}: {}", at.display(), e));
                Existing::Unreadable
            }
        }
    }
}

enum Existing {
    Text(String),
    Binary,
    Placeholder(String),
    Unreadable,
}

impl LeafStrategy for Preview<'_> {
    type Item = DiffNode;
    type Folder = PlannedFolder;

    fn dry_run(&self) -> bool {
        true
    }

    fn report(&mut self, entry: LogEntry) {
        match entry.log_type {
            LogType::Error | LogType::Warning => {
                let message = match entry.details {
                    Some(details) => format!("{}: {}", entry.message, details),
                    None => entry.message,
                };
                self.warn(message);
            }
            LogType::Info | LogType::Success => debug!(message = %entry.message, "preview"),
        }
    }

    fn enter_folder(&mut self, name: &str, at: &Cursor) -> Option<(PlannedFolder, bool)> {
        let (action, is_virtual) = match self.lookup(at) {
            Some(entry) if entry.is_dir() => (DiffAction::Unchanged, false),
            Some(_) => {
                self.warn(format!(
                    "Cannot create folder {}: a file with this name already exists",
                    at.display()
                ));
                return None;
            }
            None => (DiffAction::Create, true),
        };
        let planned = PlannedFolder {
            name: name.to_string(),
            rel: at.display().to_string(),
            action,
        };
        Some((planned, is_virtual))
    }

    fn exit_folder(&mut self, folder: PlannedFolder, children: Vec<DiffNode>) -> Option<DiffNode> {
        self.summary.total_items += 1;
        match folder.action {
            DiffAction::Create => self.summary.creates += 1,
            _ => self.summary.unchanged_folders += 1,
        }
        Some(node(
            DiffNodeType::Folder,
            folder.name,
            folder.rel,
            folder.action,
            children,
        ))
    }

    fn file(
        &mut self,
        name: &str,
        file: &FileNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
    ) -> Option<DiffNode> {
        let existing = self.lookup(at);
        let action = match existing {
            Some(entry) if entry.is_dir() => {
                self.warn(format!(
                    "Cannot create file {}: a folder with this name already exists",
                    at.display()
                ));
                return None;
            }
            Some(_) if self.overwrite => DiffAction::Overwrite,
            Some(_) => DiffAction::Skip,
            None => DiffAction::Create,
        };

        self.summary.total_items += 1;
        match action {
            DiffAction::Create => self.summary.creates += 1,
            DiffAction::Overwrite => self.summary.overwrites += 1,
            _ => self.summary.skips += 1,
        }

        let mut out = node(
            DiffNodeType::File,
            name.to_string(),
            at.display().to_string(),
            action,
            Vec::new(),
        );

        let new_text = match file.source() {
            FileSource::Url(raw) => {
                let resolved = substitute(raw, scope);
                if let Err(e) = validate_download_url(&resolved) {
                    self.warn(format!("Invalid URL for {}: {}", at.display(), e));
                }
                out.new_content = Some(format!("[Content from URL: {}]", resolved));
                out.url = Some(resolved);
                out.is_binary = true;
                None
            }
            FileSource::Generate { kind, .. } => {
                out.new_content = Some(format!("[Generated {}]", kind.noun()));
                out.is_binary = true;
                None
            }
            FileSource::Inline(content) => {
                let (text, template_error) =
                    render_content(content.unwrap_or_default(), file.is_template(), scope);
                if let Some(e) = template_error {
                    self.warn(format!("Template error in {}: {}", at.display(), e));
                }
                out.new_content = Some(truncate_content(&text, self.limits.max_diff_content));
                Some(text)
            }
        };

        if let (DiffAction::Overwrite, Some(entry)) = (action, existing) {
            match self.existing(at, entry) {
                Existing::Text(old) => {
                    if let Some(new) = new_text.as_deref() {
                        out.diff_hunks = Some(compute_hunks(&old, new, self.limits.max_diff_lines));
                    }
                    out.existing_content = Some(truncate_content(&old, self.limits.max_diff_content));
                }
                Existing::Binary => out.is_binary = true,
                Existing::Placeholder(text) => out.existing_content = Some(text),
                Existing::Unreadable => {}
            }
        }
        Some(out)
    }

    fn group(&mut self, label: String, at: &Cursor, children: Vec<DiffNode>) -> Option<DiffNode> {
        if children.is_empty() {
            return None;
        }
        Some(node(
            DiffNodeType::Folder,
            label,
            at.display().to_string(),
            DiffAction::Unchanged,
            children,
        ))
    }

    fn invalid_name(&mut self, kind: NodeKind, at: &Cursor) -> Option<DiffNode> {
        let node_type = match kind {
            NodeKind::File => DiffNodeType::File,
            _ => DiffNodeType::Folder,
        };
        Some(node(
            node_type,
            "[invalid name]".to_string(),
            at.display().to_string(),
            DiffAction::Skip,
            Vec::new(),
        ))
    }
}
