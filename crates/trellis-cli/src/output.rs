//! Output management and formatting.
//!
//! Everything a command prints goes through [`OutputManager`], which owns
//! the colour / quiet / format decisions.  Tracing output never comes through
//! here; it goes to stderr via the subscriber.
//!
//! | Format  | Results                          | Colour |
//! |---------|----------------------------------|--------|
//! | `human` | log lines, trees, summaries      | yes    |
//! | `plain` | same text                        | no     |
//! | `json`  | the engine result, pretty-printed| no     |

use std::io::{self, IsTerminal};
use std::time::Duration;

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Style};
use serde::Serialize;

use trellis_core::application::{Issue, SchemaReport};
use trellis_core::domain::{DiffAction, DiffLineType, DiffNode, DiffNodeType, LogEntry, LogType};

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

/// Manages CLI output based on configuration.
pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded config.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        // The flag wins; `auto` defers to the config file, then to the TTY.
        let requested = match args.output_format {
            OutputFormat::Auto => OutputFormat::from_setting(&config.output.format),
            explicit => explicit,
        };
        let resolved_format = if requested == OutputFormat::Auto {
            if io::stdout().is_terminal() {
                OutputFormat::Human
            } else {
                OutputFormat::Plain
            }
        } else {
            requested
        };

        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color
                || config.output.no_color
                || resolved_format != OutputFormat::Human,
            term: Term::stdout(),
        }
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        self.mark("\u{2713}", Style::new().green(), msg, false)
    }

    /// `✗ <msg>`.  Written in quiet mode too; errors must always be visible.
    pub fn error(&self, msg: &str) -> io::Result<()> {
        self.mark("\u{2717}", Style::new().red(), msg, true)
    }

    /// `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        self.mark("\u{26a0}", Style::new().yellow(), msg, false)
    }

    /// `ℹ <msg>`.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        self.mark("\u{2139}", Style::new().blue(), msg, false)
    }

    fn mark(&self, symbol: &str, style: Style, msg: &str, always: bool) -> io::Result<()> {
        if self.quiet && !always {
            return Ok(());
        }
        let line = format!("{} {}", self.paint(symbol, style.bold()), self.paint(msg, style));
        self.term.write_line(&line)
    }

    /// Bold cyan header line.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(&self.paint(text, Style::new().cyan().bold()))
    }

    /// Pretty JSON on stdout.  Printed even in quiet mode: in JSON mode the
    /// document *is* the result.
    pub fn json<T: Serialize>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value)?;
        self.term.write_line(&text)
    }

    /// `label: value` with the label padded to line up a summary block.
    pub fn field(&self, label: &str, value: impl std::fmt::Display) -> io::Result<()> {
        let label = format!("{label:<14}");
        self.print(&format!("  {} {value}", self.paint(&label, Style::new().dimmed())))
    }

    // ── Engine results ────────────────────────────────────────────────────

    /// One activity log line, with its details indented underneath.
    pub fn log_entry(&self, entry: &LogEntry) -> io::Result<()> {
        match entry.log_type {
            LogType::Success => self.success(&entry.message)?,
            LogType::Error => self.error(&entry.message)?,
            LogType::Warning => self.warning(&entry.message)?,
            LogType::Info => self.info(&entry.message)?,
        }
        if let Some(details) = &entry.details {
            // Error details stay visible in quiet mode with their entry.
            let quiet_error = self.quiet && entry.log_type == LogType::Error;
            for line in details.lines() {
                let line = format!("    {}", self.paint(line, Style::new().dimmed()));
                if quiet_error {
                    self.term.write_line(&line)?;
                } else {
                    self.print(&line)?;
                }
            }
        }
        Ok(())
    }

    pub fn log_entries(&self, entries: &[LogEntry]) -> io::Result<()> {
        entries.iter().try_for_each(|entry| self.log_entry(entry))
    }

    /// Render a preview tree, hunks included, one node per line.
    pub fn diff_tree(&self, root: &DiffNode) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut lines = Vec::new();
        self.diff_lines(root, 0, &mut lines);
        lines.iter().try_for_each(|line| self.term.write_line(line))
    }

    fn diff_lines(&self, node: &DiffNode, depth: usize, out: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let (badge, style) = action_badge(node.action);
        let name = match node.node_type {
            DiffNodeType::Folder => format!("{}/", node.name),
            DiffNodeType::File => node.name.clone(),
        };
        let mut line = format!("{indent}{} {}", self.paint(badge, style), name);
        if let Some(url) = &node.url {
            line.push_str(&format!(" {}", self.paint(&format!("<- {url}"), Style::new().dimmed())));
        } else if node.is_binary && node.node_type == DiffNodeType::File {
            line.push_str(&format!(" {}", self.paint("(binary)", Style::new().dimmed())));
        }
        out.push(line);

        for hunk in node.diff_hunks.iter().flatten() {
            out.push(format!(
                "{indent}    {}",
                self.paint(
                    &format!(
                        "@@ -{},{} +{},{} @@",
                        hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
                    ),
                    Style::new().cyan()
                )
            ));
            for diff_line in &hunk.lines {
                let (sign, style) = match diff_line.line_type {
                    DiffLineType::Add => ("+", Style::new().green()),
                    DiffLineType::Remove => ("-", Style::new().red()),
                    DiffLineType::Context => (" ", Style::new()),
                    DiffLineType::Truncated => ("", Style::new().dimmed()),
                };
                out.push(format!(
                    "{indent}    {}",
                    self.paint(&format!("{sign}{}", diff_line.content), style)
                ));
            }
        }

        for child in node.children.iter().flatten() {
            self.diff_lines(child, depth + 1, out);
        }
    }

    /// Errors then warnings of a lint report.
    pub fn schema_report(&self, report: &SchemaReport) -> io::Result<()> {
        for issue in &report.errors {
            self.error(&issue_line(issue))?;
        }
        for issue in &report.warnings {
            self.warning(&issue_line(issue))?;
        }
        Ok(())
    }

    /// Spinner on stderr for long runs; `None` when it would only be noise.
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.quiet || self.resolved_format != OutputFormat::Human {
            return None;
        }
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner().with_style(style);
        bar.set_message(message.to_owned());
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.no_color {
            text.to_owned()
        } else {
            text.style(style).to_string()
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// `true` if ANSI colours are enabled.
    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    /// `true` if quiet mode suppresses most output.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// `true` when results should be emitted as JSON.
    pub fn is_json(&self) -> bool {
        self.resolved_format == OutputFormat::Json
    }

    /// The resolved (non-Auto) output format.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }
}

fn action_badge(action: DiffAction) -> (&'static str, Style) {
    match action {
        DiffAction::Create => ("+", Style::new().green().bold()),
        DiffAction::Overwrite => ("~", Style::new().yellow().bold()),
        DiffAction::Skip => ("-", Style::new().dimmed()),
        DiffAction::Unchanged => ("=", Style::new().dimmed()),
    }
}

fn issue_line(issue: &Issue) -> String {
    match &issue.node_path {
        Some(path) => format!("{} ({})", issue.message, path),
        None => issue.message.clone(),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use trellis_core::domain::{DiffHunk, DiffLine};

    fn make_manager(quiet: bool, no_color: bool, format: OutputFormat) -> OutputManager {
        let args = GlobalArgs {
            verbose: 0,
            quiet,
            no_color,
            config: None,
            output_format: format,
        };
        OutputManager::new(&args, &AppConfig::default())
    }

    fn file(name: &str, action: DiffAction) -> DiffNode {
        DiffNode {
            id: name.to_owned(),
            node_type: DiffNodeType::File,
            name: name.to_owned(),
            path: name.to_owned(),
            action,
            existing_content: None,
            new_content: None,
            diff_hunks: None,
            url: None,
            is_binary: false,
            children: None,
        }
    }

    #[test]
    fn quiet_suppresses_print() {
        let out = make_manager(true, true, OutputFormat::Plain);
        assert!(out.print("hello").is_ok());
        assert!(out.is_quiet());
    }

    #[test]
    fn error_not_suppressed_in_quiet_mode() {
        let out = make_manager(true, true, OutputFormat::Plain);
        assert!(out.error("something went wrong").is_ok());
    }

    #[test]
    fn color_follows_flag_and_format() {
        assert!(make_manager(false, false, OutputFormat::Human).supports_color());
        assert!(!make_manager(false, true, OutputFormat::Human).supports_color());
        assert!(!make_manager(false, false, OutputFormat::Plain).supports_color());
        assert!(!make_manager(false, false, OutputFormat::Json).supports_color());
    }

    #[test]
    fn config_format_applies_when_flag_is_auto() {
        let args = GlobalArgs {
            verbose: 0,
            quiet: false,
            no_color: false,
            config: None,
            output_format: OutputFormat::Auto,
        };
        let mut config = AppConfig::default();
        config.output.format = "json".into();
        assert!(OutputManager::new(&args, &config).is_json());
    }

    #[test]
    fn diff_lines_render_badges_and_hunks() {
        let out = make_manager(false, true, OutputFormat::Plain);
        let mut changed = file("README.md", DiffAction::Overwrite);
        changed.diff_hunks = Some(vec![DiffHunk {
            old_start: 1,
            old_count: 1,
            new_start: 1,
            new_count: 1,
            lines: vec![
                DiffLine {
                    line_type: DiffLineType::Remove,
                    content: "old".into(),
                },
                DiffLine {
                    line_type: DiffLineType::Add,
                    content: "new".into(),
                },
            ],
        }]);
        let mut root = file("demo", DiffAction::Create);
        root.node_type = DiffNodeType::Folder;
        root.children = Some(vec![changed, file("src.rs", DiffAction::Skip)]);

        let mut lines = Vec::new();
        out.diff_lines(&root, 0, &mut lines);
        assert_eq!(
            lines,
            vec![
                "+ demo/",
                "  ~ README.md",
                "      @@ -1,1 +1,1 @@",
                "      -old",
                "      +new",
                "  - src.rs",
            ]
        );
    }

    #[test]
    fn issue_lines_include_node_path() {
        let issue = Issue {
            kind: trellis_core::application::IssueKind::InvalidName,
            message: "Invalid name".into(),
            node_path: Some("demo/..".into()),
        };
        assert_eq!(issue_line(&issue), "Invalid name (demo/..)");
    }

    #[test]
    fn no_spinner_outside_human_mode() {
        let out = make_manager(false, true, OutputFormat::Plain);
        assert!(out.spinner("working").is_none());
    }

    #[test]
    fn format_accessor_returns_resolved() {
        let out = make_manager(false, false, OutputFormat::Plain);
        assert_eq!(out.format(), OutputFormat::Plain);
    }
}
