//! Static checks over a schema, without touching any filesystem.
//!
//! Every branch is inspected regardless of conditions, and repeat bodies are
//! checked once with their loop variables treated as bound.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::variables::{BUILTIN_NAMES, bare_name};
use crate::domain::{
    EngineLimits, FileNode, FileSource, RepeatCount, SchemaNode, SchemaTree, VariableScope,
    extract_template_variables, extract_variables, parse_repeat_count, render_template,
    substitute, transforms::has_tokens, validate_download_url, validate_loop_variable,
    validate_name,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UndefinedVariable,
    DuplicateName,
    InvalidName,
    InvalidUrl,
    InvalidLoopVariable,
    InvalidRepeatCount,
    OrphanedElse,
    GeneratorExtension,
    ConflictingSources,
    TemplateSyntax,
    DepthExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl SchemaReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All issues of one kind, errors first.
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .filter(move |i| i.kind == kind)
    }
}

/// Lint `tree` against the variables a caller would supply.
pub fn check_schema(
    tree: &SchemaTree,
    supplied: &VariableScope<'_>,
    limits: &EngineLimits,
) -> SchemaReport {
    let mut lint = Lint {
        supplied,
        limits,
        report: SchemaReport::default(),
        undefined: BTreeMap::new(),
        bound: Vec::new(),
    };
    lint.list(std::slice::from_ref(&tree.root), "", 0);

    for command in tree.post_create_hooks() {
        lint.variables_in(command, "[hooks]");
    }

    for (name, path) in std::mem::take(&mut lint.undefined) {
        lint.warning(
            IssueKind::UndefinedVariable,
            format!("Variable %{}% is used but never defined", name),
            &path,
        );
    }
    debug!(
        errors = lint.report.errors.len(),
        warnings = lint.report.warnings.len(),
        "schema checked"
    );
    lint.report
}

struct Lint<'s, 'p> {
    supplied: &'s VariableScope<'p>,
    limits: &'s EngineLimits,
    report: SchemaReport,
    /// First path each undefined variable was seen at.
    undefined: BTreeMap<String, String>,
    /// Loop variables of enclosing repeats, uppercased.
    bound: Vec<String>,
}

impl Lint<'_, '_> {
    fn error(&mut self, kind: IssueKind, message: String, path: &str) {
        self.report.errors.push(issue(kind, message, path));
    }

    fn warning(&mut self, kind: IssueKind, message: String, path: &str) {
        self.report.warnings.push(issue(kind, message, path));
    }

    fn is_defined(&self, name: &str) -> bool {
        self.supplied.contains(name)
            || BUILTIN_NAMES.contains(&name)
            || self.bound.iter().any(|b| b == name)
    }

    fn variables_in(&mut self, text: &str, path: &str) {
        self.used(extract_variables(text), path);
    }

    fn used(&mut self, names: BTreeSet<String>, path: &str) {
        for name in names {
            if !self.is_defined(&name) {
                self.undefined
                    .entry(name)
                    .or_insert_with(|| path.to_string());
            }
        }
    }

    /// Directive syntax does not depend on values, so an empty set is enough.
    fn template(&mut self, content: &str, path: &str) {
        if let Err(e) = render_template(content, &BTreeMap::<String, String>::new()) {
            self.warning(
                IssueKind::TemplateSyntax,
                format!("{}; the file will be written without template processing", e),
                path,
            );
        }
        self.used(extract_template_variables(content), path);
    }

    /// Substituted name when it no longer contains tokens.
    fn resolved(&self, raw: &str) -> Option<String> {
        let name = substitute(raw, self.supplied);
        (!has_tokens(&name)).then_some(name)
    }

    fn list(&mut self, nodes: &[SchemaNode], parent: &str, depth: usize) {
        if depth > self.limits.max_depth {
            self.error(
                IssueKind::DepthExceeded,
                format!("Schema nests deeper than {} levels", self.limits.max_depth),
                parent,
            );
            return;
        }

        let mut seen = HashSet::new();
        let mut after_if = false;
        for node in nodes {
            let path = child_path(parent, &label(node));
            match node {
                SchemaNode::Folder(folder) => self.name(&folder.name, &path, &mut seen),
                SchemaNode::File(file) => {
                    self.name(&file.name, &path, &mut seen);
                    self.file(file, &path);
                }
                SchemaNode::If(branch) => {
                    self.variables_in(&format!("%{}%", bare_name(&branch.condition_var)), &path);
                }
                SchemaNode::Else(_) if !after_if => {
                    self.warning(
                        IssueKind::OrphanedElse,
                        "Else block does not directly follow an if block and will be skipped"
                            .into(),
                        &path,
                    );
                }
                SchemaNode::Else(_) => {}
                SchemaNode::Repeat(repeat) => {
                    self.variables_in(&repeat.repeat_count, &path);
                    if let Err(e) = validate_loop_variable(repeat.repeat_as.trim()) {
                        self.error(IssueKind::InvalidLoopVariable, e.to_string(), &path);
                    }
                    if let Some(count) = self.resolved(&repeat.repeat_count) {
                        match parse_repeat_count(&count, self.limits.max_repeat) {
                            RepeatCount::Times(_) => {}
                            RepeatCount::Invalid(v) => self.warning(
                                IssueKind::InvalidRepeatCount,
                                format!("Repeat count '{}' is not a non-negative integer", v),
                                &path,
                            ),
                            RepeatCount::TooLarge(e) => {
                                self.error(IssueKind::InvalidRepeatCount, e.to_string(), &path)
                            }
                        }
                    }
                }
            }
            after_if = matches!(node, SchemaNode::If(_));

            if let SchemaNode::Repeat(repeat) = node {
                let var = repeat.repeat_as.trim().to_uppercase();
                self.bound.push(format!("{}_1", var));
                self.bound.push(var);
                self.list(&repeat.children, &path, depth + 1);
                self.bound.truncate(self.bound.len() - 2);
            } else {
                let inner = match node {
                    SchemaNode::Folder(_) => path.as_str(),
                    _ => parent,
                };
                self.list(node.children(), inner, depth + 1);
            }
        }
    }

    fn name(&mut self, raw: &str, path: &str, seen: &mut HashSet<String>) {
        self.variables_in(raw, path);
        let Some(name) = self.resolved(raw) else {
            return;
        };
        if let Err(e) = validate_name(&name) {
            self.error(IssueKind::InvalidName, e.to_string(), path);
        } else if !self.in_repeat_with_tokens(raw) && !seen.insert(name.clone()) {
            self.error(
                IssueKind::DuplicateName,
                format!("'{}' appears more than once in the same folder", name),
                path,
            );
        }
    }

    /// Names built from loop variables differ per iteration, so sibling
    /// duplicates among them cannot be judged statically.
    fn in_repeat_with_tokens(&self, raw: &str) -> bool {
        !self.bound.is_empty() && raw.contains('%')
    }

    fn file(&mut self, file: &FileNode, path: &str) {
        for text in [&file.content, &file.url, &file.generate_config]
            .into_iter()
            .flatten()
        {
            self.variables_in(text, path);
        }
        if let (true, Some(content)) = (file.is_template(), file.content.as_deref()) {
            self.template(content, path);
        }

        let sources = [file.url.is_some(), file.generate.is_some(), file.content.is_some()]
            .iter()
            .filter(|&&set| set)
            .count();
        if sources > 1 {
            self.warning(
                IssueKind::ConflictingSources,
                "File has several content sources; url wins over generate, which wins over content"
                    .into(),
                path,
            );
        }

        match file.source() {
            FileSource::Url(raw) => {
                if let Some(url) = self.resolved(raw) {
                    if let Err(e) = validate_download_url(&url) {
                        self.error(IssueKind::InvalidUrl, e.to_string(), path);
                    }
                }
            }
            FileSource::Generate { kind, .. } => {
                let ext = file
                    .name
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_ascii_lowercase());
                let matches = ext
                    .as_deref()
                    .is_some_and(|ext| kind.extensions().contains(&ext));
                if !matches {
                    self.warning(
                        IssueKind::GeneratorExtension,
                        format!(
                            "The {} generator writes {} files; expected one of: .{}",
                            kind,
                            kind.noun(),
                            kind.extensions().join(", .")
                        ),
                        path,
                    );
                }
            }
            FileSource::Inline(_) => {}
        }
    }
}

fn issue(kind: IssueKind, message: String, path: &str) -> Issue {
    Issue {
        kind,
        message,
        node_path: (!path.is_empty()).then(|| path.to_string()),
    }
}

fn label(node: &SchemaNode) -> String {
    match node {
        SchemaNode::Folder(f) => f.name.clone(),
        SchemaNode::File(f) => f.name.clone(),
        SchemaNode::If(b) => format!("[if {}]", b.condition_var),
        SchemaNode::Else(_) => "[else]".to_string(),
        SchemaNode::Repeat(r) => format!("[repeat {} as {}]", r.repeat_count, r.repeat_as),
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Variables a schema references, for prompting before a run.
pub fn referenced_variables(tree: &SchemaTree) -> BTreeSet<String> {
    fn collect(node: &SchemaNode, out: &mut BTreeSet<String>) {
        let texts: Vec<&str> = match node {
            SchemaNode::Folder(f) => vec![f.name.as_str()],
            SchemaNode::File(f) => [Some(&f.name), f.content.as_ref(), f.url.as_ref(), f.generate_config.as_ref()]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            SchemaNode::If(b) => {
                out.insert(bare_name(&b.condition_var));
                vec![]
            }
            SchemaNode::Else(_) => vec![],
            SchemaNode::Repeat(r) => vec![r.repeat_count.as_str()],
        };
        for text in texts {
            out.extend(extract_variables(text));
        }
        if let SchemaNode::File(FileNode {
            template: Some(true),
            content: Some(content),
            ..
        }) = node
        {
            out.extend(extract_template_variables(content));
        }
        for child in node.children() {
            collect(child, out);
        }
    }

    let mut out = BTreeSet::new();
    collect(&tree.root, &mut out);
    for command in tree.post_create_hooks() {
        out.extend(extract_variables(command));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeneratorKind;

    fn check(root: SchemaNode, vars: &[(&str, &str)]) -> SchemaReport {
        check_schema(
            &SchemaTree::new(root),
            &VariableScope::from_pairs(vars.iter().copied()),
            &EngineLimits::default(),
        )
    }

    #[test]
    fn clean_schema() {
        let report = check(
            SchemaNode::folder(
                "%PROJ%",
                vec![SchemaNode::file_with_content("README.md", "Made %YEAR%")],
            ),
            &[("PROJ", "demo")],
        );
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn undefined_variables_reported_once() {
        let report = check(
            SchemaNode::folder(
                "%PROJ%",
                vec![
                    SchemaNode::file_with_content("a", "%PROJ% %OWNER%"),
                    SchemaNode::file_with_content("b", "%OWNER%"),
                ],
            ),
            &[],
        );
        let names: Vec<_> = report
            .of_kind(IssueKind::UndefinedVariable)
            .map(|i| i.message.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Variable %OWNER% is used but never defined",
                "Variable %PROJ% is used but never defined"
            ]
        );
        assert!(!report.has_errors());
    }

    #[test]
    fn loop_variables_count_as_defined() {
        let report = check(
            SchemaNode::repeat("2", "item", vec![SchemaNode::file("f-%ITEM_1%")]),
            &[],
        );
        assert_eq!(report.of_kind(IssueKind::UndefinedVariable).count(), 0);
    }

    #[test]
    fn duplicates_and_bad_names() {
        let report = check(
            SchemaNode::folder(
                "root",
                vec![
                    SchemaNode::file("a.txt"),
                    SchemaNode::file("%N%"),
                    SchemaNode::file("CON"),
                ],
            ),
            &[("N", "a.txt")],
        );
        assert_eq!(report.of_kind(IssueKind::DuplicateName).count(), 1);
        let bad: Vec<_> = report.of_kind(IssueKind::InvalidName).collect();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].node_path.as_deref(), Some("root/CON"));
    }

    #[test]
    fn orphaned_else_and_bad_repeat() {
        let report = check(
            SchemaNode::folder(
                "root",
                vec![
                    SchemaNode::else_branch(vec![]),
                    SchemaNode::repeat("lots", "i", vec![]),
                    SchemaNode::repeat("1", "1x", vec![]),
                ],
            ),
            &[],
        );
        assert_eq!(report.of_kind(IssueKind::OrphanedElse).count(), 1);
        assert_eq!(report.of_kind(IssueKind::InvalidRepeatCount).count(), 1);
        assert_eq!(report.of_kind(IssueKind::InvalidLoopVariable).count(), 1);
    }

    #[test]
    fn unsafe_urls_and_generator_extensions() {
        let mut download = FileNode::new("data.json");
        download.url = Some("http://127.0.0.1/data.json".into());
        let mut image = FileNode::new("logo.txt");
        image.generate = Some(GeneratorKind::Image);

        let report = check(
            SchemaNode::folder(
                "root",
                vec![SchemaNode::File(download), SchemaNode::File(image)],
            ),
            &[],
        );
        assert_eq!(report.of_kind(IssueKind::InvalidUrl).count(), 1);
        assert_eq!(report.of_kind(IssueKind::GeneratorExtension).count(), 1);
    }

    #[test]
    fn referenced_variables_include_conditions_and_hooks() {
        let tree = SchemaTree::new(SchemaNode::folder(
            "%PROJ%",
            vec![SchemaNode::if_var("tests", vec![SchemaNode::file("%i%")])],
        ))
        .with_hooks(vec!["git init %REPO%".into()]);
        let vars: Vec<_> = referenced_variables(&tree).into_iter().collect();
        assert_eq!(vars, vec!["PROJ", "REPO", "TESTS"]);
    }

    fn template_file(name: &str, content: &str) -> SchemaNode {
        let mut file = FileNode::new(name);
        file.content = Some(content.into());
        file.template = Some(true);
        SchemaNode::File(file)
    }

    #[test]
    fn template_directives_are_checked() {
        let report = check(
            SchemaNode::folder(
                "root",
                vec![
                    template_file("ok.md", "{{if USE_NPM}}npm{{endif}}"),
                    template_file("broken.md", "{{for f in FEATURES}}{{f}}"),
                    // Not a template: directives are plain text.
                    SchemaNode::file_with_content("plain.md", "{{if NOPE}}"),
                ],
            ),
            &[("USE_NPM", "1")],
        );
        let syntax: Vec<_> = report.of_kind(IssueKind::TemplateSyntax).collect();
        assert_eq!(syntax.len(), 1);
        assert_eq!(syntax[0].node_path.as_deref(), Some("root/broken.md"));
        assert!(syntax[0].message.starts_with("Unclosed {{for f in FEATURES}} block"));

        let undefined: Vec<_> = report
            .of_kind(IssueKind::UndefinedVariable)
            .map(|i| i.message.as_str())
            .collect();
        assert_eq!(undefined, ["Variable %FEATURES% is used but never defined"]);
    }

    #[test]
    fn referenced_variables_include_template_directives() {
        let tree = SchemaTree::new(SchemaNode::folder(
            "root",
            vec![template_file("a.md", "{{for p in PKGS}}{{p}}{{endfor}}{{if CI}}%NAME%{{endif}}")],
        ));
        let vars: Vec<_> = referenced_variables(&tree).into_iter().collect();
        assert_eq!(vars, vec!["CI", "NAME", "PKGS"]);
    }
}
