//! The single control-flow evaluator shared by materialize and preview.
//!
//! ```text
//!            ┌────────────────────────────┐
//!            │          Walker            │
//!            │  depth guard, names,       │
//!            │  if/else baton, repeat     │
//!            └─────────────┬──────────────┘
//!                          │ leaf events
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!        Materializer               Preview
//!      (writes, downloads)     (classifies, diffs)
//! ```
//!
//! Everything that decides *which* nodes are visited lives here, so the two
//! strategies cannot drift apart. Strategies only decide what a visited
//! folder or file means.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::{
    DomainError, EngineLimits, FileNode, FolderNode, LogEntry, LogType, NodeKind, RepeatCount,
    RepeatNode, SchemaNode, VariableScope, is_truthy, parse_repeat_count, substitute,
    validate_loop_variable, validate_name,
};

/// Where the walk currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cursor {
    /// Filesystem path of the current node.
    pub path: PathBuf,
    /// Path relative to the output root, `/`-separated, for logs.
    pub rel: String,
    /// An ancestor folder does not exist yet (dry runs only).
    pub virtual_subtree: bool,
}

impl Cursor {
    pub fn root(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            rel: String::new(),
            virtual_subtree: false,
        }
    }

    pub fn descend(&self, name: &str) -> Self {
        let rel = if self.rel.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.rel, name)
        };
        Self {
            path: self.path.join(name),
            rel,
            virtual_subtree: self.virtual_subtree,
        }
    }

    /// Relative path for display, `.` at the root.
    pub fn display(&self) -> &str {
        if self.rel.is_empty() { "." } else { &self.rel }
    }
}

/// What a strategy does with the nodes the walker decides to visit.
pub(crate) trait LeafStrategy {
    /// Per-node output (a diff node, or nothing).
    type Item;
    /// State carried from [`Self::enter_folder`] to [`Self::exit_folder`].
    type Folder;

    fn dry_run(&self) -> bool;

    fn report(&mut self, entry: LogEntry);

    /// Handle a folder before its children. `None` stops descent. The flag
    /// marks the folder's subtree as virtual.
    fn enter_folder(&mut self, name: &str, at: &Cursor) -> Option<(Self::Folder, bool)>;

    fn exit_folder(&mut self, folder: Self::Folder, children: Vec<Self::Item>) -> Option<Self::Item>;

    fn file(
        &mut self,
        name: &str,
        node: &FileNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
    ) -> Option<Self::Item>;

    /// Wrap the output of a taken `if`, `else` or `repeat`.
    fn group(&mut self, label: String, at: &Cursor, children: Vec<Self::Item>) -> Option<Self::Item>;

    /// Stand-in for a node whose name failed validation.
    fn invalid_name(&mut self, kind: NodeKind, at: &Cursor) -> Option<Self::Item>;
}

pub(crate) struct Walker<'l, S> {
    strategy: S,
    limits: &'l EngineLimits,
}

impl<'l, S: LeafStrategy> Walker<'l, S> {
    pub fn new(strategy: S, limits: &'l EngineLimits) -> Self {
        Self { strategy, limits }
    }

    pub fn into_strategy(self) -> S {
        self.strategy
    }

    pub fn walk_root(
        &mut self,
        root: &SchemaNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
    ) -> Vec<S::Item> {
        self.walk_list(std::slice::from_ref(root), at, scope, 0)
    }

    /// Walk one sibling list. Every list starts a fresh if/else chain.
    fn walk_list(
        &mut self,
        nodes: &[SchemaNode],
        at: &Cursor,
        scope: &VariableScope<'_>,
        depth: usize,
    ) -> Vec<S::Item> {
        let mut items = Vec::new();
        let mut last_if = None;
        for node in nodes {
            let (item, next) = self.walk_node(node, at, scope, depth, last_if);
            last_if = next;
            items.extend(item);
        }
        items
    }

    /// Returns the node's item and the baton for the next sibling: the
    /// condition of an `if`, `None` after anything else.
    fn walk_node(
        &mut self,
        node: &SchemaNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
        depth: usize,
        last_if: Option<bool>,
    ) -> (Option<S::Item>, Option<bool>) {
        if depth > self.limits.max_depth {
            warn!(depth, path = at.display(), "schema depth limit hit");
            self.log(
                LogType::Error,
                "Maximum schema depth exceeded",
                Some(format!(
                    "{} (at {})",
                    DomainError::DepthExceeded {
                        max: self.limits.max_depth
                    },
                    at.display()
                )),
            );
            return (None, None);
        }

        match node {
            SchemaNode::Folder(folder) => (self.folder(folder, at, scope, depth), None),
            SchemaNode::File(file) => (self.file(file, at, scope), None),
            SchemaNode::If(branch) => {
                let taken = scope.get(&branch.condition_var).is_some_and(is_truthy);
                debug!(var = %branch.condition_var, taken, "if");
                let item = if taken {
                    let children = self.walk_list(&branch.children, at, scope, depth + 1);
                    self.strategy
                        .group(format!("[if {}]", branch.condition_var), at, children)
                } else {
                    None
                };
                (item, Some(taken))
            }
            SchemaNode::Else(branch) => {
                let item = match last_if {
                    Some(false) => {
                        let children = self.walk_list(&branch.children, at, scope, depth + 1);
                        self.strategy.group("[else]".to_string(), at, children)
                    }
                    Some(true) => None,
                    None => {
                        warn!(path = at.display(), "orphaned else");
                        self.log(
                            LogType::Warning,
                            "Skipped orphaned else block (no preceding if)",
                            Some("Else blocks must immediately follow an if block".into()),
                        );
                        None
                    }
                };
                (item, None)
            }
            SchemaNode::Repeat(repeat) => (self.repeat(repeat, at, scope, depth), None),
        }
    }

    fn folder(
        &mut self,
        node: &FolderNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
        depth: usize,
    ) -> Option<S::Item> {
        let resolved = substitute(&node.name, scope);
        let name = match validate_name(&resolved) {
            Ok(name) => name,
            Err(e) => return self.reject(NodeKind::Folder, &node.name, e, at),
        };
        let here = at.descend(name);
        let (folder, is_virtual) = self.strategy.enter_folder(name, &here)?;
        let inner = Cursor {
            virtual_subtree: here.virtual_subtree || is_virtual,
            ..here
        };
        let children = self.walk_list(&node.children, &inner, scope, depth + 1);
        self.strategy.exit_folder(folder, children)
    }

    fn file(&mut self, node: &FileNode, at: &Cursor, scope: &VariableScope<'_>) -> Option<S::Item> {
        let resolved = substitute(&node.name, scope);
        let name = match validate_name(&resolved) {
            Ok(name) => name,
            Err(e) => return self.reject(NodeKind::File, &node.name, e, at),
        };
        let here = at.descend(name);
        self.strategy.file(name, node, &here, scope)
    }

    fn repeat(
        &mut self,
        node: &RepeatNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
        depth: usize,
    ) -> Option<S::Item> {
        let as_var = match validate_loop_variable(node.repeat_as.trim()) {
            Ok(name) => name,
            Err(e) => {
                self.log(
                    LogType::Error,
                    format!("Invalid repeat variable name: '{}'", node.repeat_as),
                    Some(e.to_string()),
                );
                return None;
            }
        };

        let resolved = substitute(&node.repeat_count, scope);
        let count = match parse_repeat_count(&resolved, self.limits.max_repeat) {
            RepeatCount::Times(0) => {
                self.log(
                    LogType::Info,
                    "Skipping repeat block (count is 0)",
                    Some(format!("Count '{}' resolved to 0", node.repeat_count)),
                );
                return None;
            }
            RepeatCount::Times(n) => n,
            RepeatCount::Invalid(value) => {
                self.log(
                    LogType::Warning,
                    format!("Invalid repeat count: '{}'", value),
                    Some(format!(
                        "Count must be a non-negative integer (resolved from '{}')",
                        node.repeat_count
                    )),
                );
                return None;
            }
            RepeatCount::TooLarge(e) => {
                self.log(
                    LogType::Error,
                    "Repeat count exceeds maximum",
                    Some(e.to_string()),
                );
                return None;
            }
        };

        let verb = if self.strategy.dry_run() {
            "Would repeat"
        } else {
            "Repeating"
        };
        self.log(
            LogType::Info,
            format!("{} {} times (as %{}%)", verb, count, as_var),
            None,
        );

        let one_based = format!("{}_1", as_var);
        let mut items = Vec::new();
        for i in 0..count {
            let iteration = scope
                .child()
                .with(as_var, i.to_string())
                .with(&one_based, (i + 1).to_string());
            items.extend(self.walk_list(&node.children, at, &iteration, depth + 1));
        }
        self.strategy
            .group(format!("[repeat {} as {}]", count, as_var), at, items)
    }

    fn reject(
        &mut self,
        kind: NodeKind,
        raw: &str,
        error: DomainError,
        at: &Cursor,
    ) -> Option<S::Item> {
        warn!(%kind, raw, %error, "rejected name");
        self.log(
            LogType::Error,
            format!("Invalid name: {}", raw),
            Some(error.to_string()),
        );
        self.strategy.invalid_name(kind, at)
    }

    fn log(&mut self, log_type: LogType, message: impl Into<String>, details: Option<String>) {
        self.strategy.report(LogEntry::new(log_type, message, details));
    }
}
