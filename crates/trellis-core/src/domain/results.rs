//! Result shapes produced by the engine.
//!
//! These are serialized as-is by hosts, so field names are part of the
//! contract.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Activity log
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub log_type: LogType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    pub fn new(log_type: LogType, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            log_type,
            message: message.into(),
            details,
        }
    }
}

// ============================================================================
// Materialization
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub folders_created: usize,
    pub files_created: usize,
    pub files_downloaded: usize,
    #[serde(default)]
    pub files_generated: usize,
    pub errors: usize,
    pub skipped: usize,
    pub hooks_executed: usize,
    pub hooks_failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Folder,
    File,
}

/// Something a real run wrote, recorded for undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    pub path: PathBuf,
    pub item_type: ItemType,
    /// `true` when the item existed before the run and was overwritten.
    pub pre_existed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResult {
    pub command: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResult {
    pub logs: Vec<LogEntry>,
    pub summary: ResultSummary,
    #[serde(default)]
    pub hook_results: Vec<HookResult>,
    #[serde(default)]
    pub created_items: Vec<CreatedItem>,
}

// ============================================================================
// Preview
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffAction {
    Create,
    Overwrite,
    Skip,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffNodeType {
    Folder,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineType {
    Add,
    Remove,
    Context,
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffNode {
    pub id: String,
    pub node_type: DiffNodeType,
    pub name: String,
    pub path: String,
    pub action: DiffAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_hunks: Option<Vec<DiffHunk>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub is_binary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DiffNode>>,
}

impl DiffNode {
    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&DiffNode> {
        if self.name == name {
            return Some(self);
        }
        self.children
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find_map(|c| c.find(name))
    }

    /// Every file node in the subtree, depth-first.
    pub fn files(&self) -> Vec<&DiffNode> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a DiffNode>) {
        if self.node_type == DiffNodeType::File {
            out.push(self);
        }
        for child in self.children.as_deref().unwrap_or_default() {
            child.collect_files(out);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_items: usize,
    pub creates: usize,
    pub overwrites: usize,
    pub skips: usize,
    pub unchanged_folders: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub root: DiffNode,
    pub summary: DiffSummary,
}

// ============================================================================
// Undo
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoSummary {
    pub files_deleted: usize,
    pub folders_deleted: usize,
    pub items_skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoResult {
    pub logs: Vec<LogEntry>,
    pub summary: UndoSummary,
}
