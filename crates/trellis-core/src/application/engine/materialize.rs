//! Real (and dry-run) materialization strategy.
//!
//! Every failure is caught at the node that caused it and turned into an
//! error log entry; siblings and ancestors keep going.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::archive::{self, ArchiveKind};
use super::diff::is_binary_content;
use super::walker::{Cursor, LeafStrategy, Walker};
use crate::application::ApplicationError;
use crate::application::ports::{ContentGenerator, Fetcher, Filesystem, GenerateRequest, HookRunner};
use crate::domain::{
    CreateResult, CreatedItem, EngineLimits, FileNode, FileSource, GeneratorKind, ItemType,
    LogEntry, LogType, NodeKind, SchemaNode, SchemaTree, VariableScope, render_content,
    substitute, validate_download_url, validate_name,
};
use crate::error::TrellisResult;

/// Flags for a materialization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub dry_run: bool,
    pub overwrite: bool,
    /// Run `post_create` hooks after the walk.
    pub run_hooks: bool,
}

/// Optional collaborators a run may use.
#[derive(Clone, Copy, Default)]
pub(crate) struct Collaborators<'a> {
    pub fetcher: Option<&'a dyn Fetcher>,
    pub generator: Option<&'a dyn ContentGenerator>,
    pub hooks: Option<&'a dyn HookRunner>,
}

pub(crate) struct Materializer<'a> {
    fs: &'a dyn Filesystem,
    with: Collaborators<'a>,
    limits: &'a EngineLimits,
    options: CreateOptions,
    result: CreateResult,
}

/// Walk `tree` under `output_root`, then run its hooks.
#[instrument(skip_all, fields(root = %output_root.display(), dry_run = options.dry_run, overwrite = options.overwrite))]
pub(crate) fn materialize(
    tree: &SchemaTree,
    output_root: &Path,
    scope: &VariableScope<'_>,
    fs: &dyn Filesystem,
    with: Collaborators<'_>,
    limits: &EngineLimits,
    options: CreateOptions,
) -> CreateResult {
    let strategy = Materializer {
        fs,
        with,
        limits,
        options,
        result: CreateResult::default(),
    };
    let mut walker = Walker::new(strategy, limits);
    let root = Cursor::root(output_root);
    walker.walk_root(&tree.root, &root, scope);
    let mut strategy = walker.into_strategy();

    if options.run_hooks {
        let working_dir = hook_working_dir(tree, output_root, scope, fs);
        strategy.run_hooks(tree.post_create_hooks(), &working_dir, scope);
    }

    let summary = &strategy.result.summary;
    info!(
        folders = summary.folders_created,
        files = summary.files_created,
        downloads = summary.files_downloaded,
        generated = summary.files_generated,
        skipped = summary.skipped,
        errors = summary.errors,
        "materialization finished"
    );
    strategy.result
}

/// Hooks run inside the root folder when it exists, else in the output root.
fn hook_working_dir(
    tree: &SchemaTree,
    output_root: &Path,
    scope: &VariableScope<'_>,
    fs: &dyn Filesystem,
) -> PathBuf {
    if let SchemaNode::Folder(folder) = &tree.root {
        let name = substitute(&folder.name, scope);
        if validate_name(&name).is_ok() {
            let candidate = output_root.join(&name);
            if matches!(fs.entry(&candidate), Ok(Some(e)) if e.is_dir()) {
                return candidate;
            }
        }
    }
    output_root.to_path_buf()
}

impl<'a> Materializer<'a> {
    fn push(&mut self, log_type: LogType, message: String, details: Option<String>) {
        self.result
            .logs
            .push(LogEntry::new(log_type, message, details));
    }

    fn fail(&mut self, message: String, details: impl Into<String>) {
        self.result.summary.errors += 1;
        self.push(LogType::Error, message, Some(details.into()));
    }

    fn record(&mut self, at: &Cursor, item_type: ItemType, pre_existed: bool) {
        self.result.created_items.push(CreatedItem {
            path: at.path.clone(),
            item_type,
            pre_existed,
        });
    }

    fn write(&mut self, at: &Cursor, bytes: &[u8], pre_existed: bool) -> TrellisResult<()> {
        self.fs.write_file(&at.path, bytes)?;
        self.record(at, ItemType::File, pre_existed);
        Ok(())
    }

    fn download(&mut self, name: &str, raw_url: &str, at: &Cursor, scope: &VariableScope<'_>, pre_existed: bool) {
        let resolved = substitute(raw_url, scope);
        let url = match validate_download_url(&resolved) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %resolved, error = %e, "download target rejected");
                return self.fail(format!("Download failed: {}", name), e.to_string());
            }
        };

        if self.options.dry_run {
            self.result.summary.files_downloaded += 1;
            return self.push(
                LogType::Info,
                format!("Would download: {}", name),
                Some(url.to_string()),
            );
        }

        let Some(fetcher) = self.with.fetcher else {
            let e = ApplicationError::AdapterNotConfigured { name: "fetcher" };
            return self.fail(format!("Download failed: {}", name), e.to_string());
        };
        let limits = self.limits.fetch_limits();
        let bytes = match fetcher.fetch(&url, &limits) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(format!("Download failed: {}", name), e.to_string()),
        };
        // Second cap, on what actually arrived.
        if bytes.len() as u64 > limits.max_bytes {
            let e = ApplicationError::DownloadTooLarge {
                url: url.to_string(),
                size: bytes.len() as u64,
                limit: limits.max_bytes,
            };
            return self.fail(format!("Download failed: {}", name), e.to_string());
        }
        debug!(url = %url, bytes = bytes.len(), "downloaded");

        let (bytes, processed) = match ArchiveKind::detect(name) {
            Some(kind) => match archive::process(kind, &bytes, scope) {
                Ok(out) => (out, true),
                Err(reason) => {
                    self.push(
                        LogType::Warning,
                        format!("Could not process archive: {}", name),
                        Some(format!("{}; saved unmodified", reason)),
                    );
                    (bytes, false)
                }
            },
            None => (substitute_text(bytes, scope), false),
        };

        if let Err(e) = self.write(at, &bytes, pre_existed) {
            return self.fail(format!("Failed to save file: {}", name), e.to_string());
        }
        self.result.summary.files_downloaded += 1;
        let message = if processed {
            format!("Downloaded & processed: {}", name)
        } else {
            format!("Downloaded: {}", name)
        };
        self.push(
            LogType::Success,
            message,
            Some(format!("{} ({} bytes)", url, bytes.len())),
        );
    }

    fn generate(
        &mut self,
        name: &str,
        kind: GeneratorKind,
        node: &FileNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
        pre_existed: bool,
    ) {
        if self.options.dry_run {
            self.result.summary.files_generated += 1;
            return self.push(
                LogType::Info,
                format!("Would generate {}: {}", kind.noun(), name),
                Some(at.display().to_string()),
            );
        }

        let Some(generator) = self.with.generator else {
            let e = ApplicationError::AdapterNotConfigured { name: "generator" };
            return self.fail(format!("Generator failed: {}", name), e.to_string());
        };
        let config = node.generate_config.as_deref().map(|c| substitute(c, scope));
        let content = node.content.as_deref().map(|c| substitute(c, scope));
        let request = GenerateRequest {
            kind,
            file_name: name,
            config: config.as_deref(),
            content: content.as_deref(),
        };
        let bytes = match generator.generate(&request) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(format!("Generator failed: {}", name), e.to_string()),
        };
        if let Err(e) = self.write(at, &bytes, pre_existed) {
            return self.fail(format!("Failed to save file: {}", name), e.to_string());
        }
        self.result.summary.files_generated += 1;
        self.push(
            LogType::Success,
            format!("Generated {}: {}", kind.noun(), name),
            Some(at.display().to_string()),
        );
    }

    fn inline(
        &mut self,
        name: &str,
        node: &FileNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
        pre_existed: bool,
    ) {
        let content = node.content.as_deref().unwrap_or_default();
        let (text, template_error) = render_content(content, node.is_template(), scope);
        if let Some(e) = template_error {
            warn!(path = at.display(), error = %e, "template error, writing plain substitution");
            self.push(
                LogType::Warning,
                format!("Template error in {}", name),
                Some(e.to_string()),
            );
        }
        if self.options.dry_run {
            self.result.summary.files_created += 1;
            return self.push(
                LogType::Info,
                format!("Would create file: {}", name),
                Some(at.display().to_string()),
            );
        }
        if let Err(e) = self.write(at, text.as_bytes(), pre_existed) {
            return self.fail(format!("Failed to create file: {}", name), e.to_string());
        }
        self.result.summary.files_created += 1;
        self.push(
            LogType::Success,
            format!("Created file: {}", name),
            Some(format!("{} ({} bytes)", at.display(), text.len())),
        );
    }

    fn run_hooks(&mut self, hooks: &[String], working_dir: &Path, scope: &VariableScope<'_>) {
        if hooks.is_empty() {
            return;
        }
        let dir = format!("Working directory: {}", working_dir.display());

        if self.options.dry_run {
            for command in hooks {
                let resolved = substitute(command, scope);
                self.push(
                    LogType::Info,
                    format!("Would run hook: {}", resolved),
                    Some(dir.clone()),
                );
            }
            return;
        }

        let Some(runner) = self.with.hooks else {
            warn!(count = hooks.len(), "no hook runner available");
            return self.push(
                LogType::Warning,
                "Hooks skipped".to_string(),
                Some(format!(
                    "{} post-create hook(s) not run: this host cannot run commands",
                    hooks.len()
                )),
            );
        };

        for command in hooks {
            let resolved = substitute(command, scope);
            info!(command = %resolved, "running hook");
            let result = runner.run(&resolved, working_dir);
            if result.success {
                self.result.summary.hooks_executed += 1;
                let details = Some(result.stdout.trim().to_string()).filter(|s| !s.is_empty());
                self.push(
                    LogType::Success,
                    format!("Hook succeeded: {}", resolved),
                    details,
                );
            } else {
                self.result.summary.hooks_failed += 1;
                let details = match result.stderr.trim() {
                    "" => format!("Exit code: {:?}", result.exit_code),
                    stderr => stderr.to_string(),
                };
                self.push(
                    LogType::Error,
                    format!("Hook failed: {}", resolved),
                    Some(details),
                );
            }
            self.result.hook_results.push(result);
        }
    }
}

/// Substitute variables in downloaded text; binary payloads pass through.
fn substitute_text(bytes: Vec<u8>, scope: &VariableScope<'_>) -> Vec<u8> {
    if is_binary_content(&bytes) {
        return bytes;
    }
    match String::from_utf8(bytes) {
        Ok(text) => substitute(&text, scope).into_bytes(),
        Err(e) => e.into_bytes(),
    }
}

impl LeafStrategy for Materializer<'_> {
    type Item = ();
    type Folder = ();

    fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn report(&mut self, entry: LogEntry) {
        if entry.log_type == LogType::Error {
            self.result.summary.errors += 1;
        }
        self.result.logs.push(entry);
    }

    fn enter_folder(&mut self, name: &str, at: &Cursor) -> Option<((), bool)> {
        let planned = |this: &mut Self| {
            this.result.summary.folders_created += 1;
            this.push(
                LogType::Info,
                format!("Would create folder: {}", name),
                Some(at.display().to_string()),
            );
            Some(((), true))
        };

        if at.virtual_subtree {
            return planned(self);
        }

        match self.fs.entry(&at.path) {
            Ok(Some(entry)) if entry.is_dir() => {
                self.push(
                    LogType::Info,
                    format!("Folder exists: {}", name),
                    Some(at.display().to_string()),
                );
                Some(((), false))
            }
            Ok(Some(_)) => {
                self.fail(
                    format!("Failed to create folder: {}", name),
                    "A file with this name already exists",
                );
                None
            }
            Ok(None) if self.options.dry_run => planned(self),
            Ok(None) => match self.fs.create_dir_all(&at.path) {
                Ok(()) => {
                    self.result.summary.folders_created += 1;
                    self.record(at, ItemType::Folder, false);
                    self.push(
                        LogType::Success,
                        format!("Created folder: {}", name),
                        Some(at.display().to_string()),
                    );
                    Some(((), false))
                }
                Err(e) => {
                    self.fail(format!("Failed to create folder: {}", name), e.to_string());
                    None
                }
            },
            Err(e) => {
                self.fail(format!("Failed to create folder: {}", name), e.to_string());
                None
            }
        }
    }

    fn exit_folder(&mut self, _folder: (), _children: Vec<()>) -> Option<()> {
        None
    }

    fn file(
        &mut self,
        name: &str,
        node: &FileNode,
        at: &Cursor,
        scope: &VariableScope<'_>,
    ) -> Option<()> {
        let existing = if at.virtual_subtree {
            None
        } else {
            match self.fs.entry(&at.path) {
                Ok(entry) => entry,
                Err(e) => {
                    self.fail(format!("Failed to create file: {}", name), e.to_string());
                    return None;
                }
            }
        };

        if let Some(entry) = existing {
            if entry.is_dir() {
                self.fail(
                    format!("Failed to create file: {}", name),
                    "A folder with this name already exists",
                );
                return None;
            }
            if !self.options.overwrite {
                debug!(path = at.display(), "skipping existing file");
                self.result.summary.skipped += 1;
                self.push(
                    LogType::Warning,
                    format!("Skipped (exists): {}", name),
                    Some(at.display().to_string()),
                );
                return None;
            }
        }
        let pre_existed = existing.is_some();

        match node.source() {
            FileSource::Url(url) => self.download(name, url, at, scope, pre_existed),
            FileSource::Generate { kind, .. } => {
                self.generate(name, kind, node, at, scope, pre_existed)
            }
            FileSource::Inline(_) => self.inline(name, node, at, scope, pre_existed),
        }
        None
    }

    fn group(&mut self, _label: String, _at: &Cursor, _children: Vec<()>) -> Option<()> {
        None
    }

    fn invalid_name(&mut self, _kind: NodeKind, _at: &Cursor) -> Option<()> {
        None
    }
}
