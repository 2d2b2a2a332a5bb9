//! The parsed schema tree consumed by the engine.
//!
//! Nodes are a closed sum type tagged by `type` on the wire:
//!
//! ```json
//! { "type": "folder", "name": "%PROJ%", "children": [
//!     { "type": "file", "name": "README.md", "content": "Hello %PROJ%" },
//!     { "type": "if", "condition_var": "TESTS", "children": [ ... ] },
//!     { "type": "else", "children": [ ... ] },
//!     { "type": "repeat", "repeat_count": "3", "repeat_as": "i", "children": [ ... ] }
//! ] }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A complete schema: the root node plus optional lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTree {
    pub root: SchemaNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<SchemaHooks>,
}

impl SchemaTree {
    pub fn new(root: SchemaNode) -> Self {
        Self { root, hooks: None }
    }

    pub fn with_hooks(mut self, post_create: Vec<String>) -> Self {
        self.hooks = Some(SchemaHooks { post_create });
        self
    }

    /// Commands to run after a successful real materialization.
    pub fn post_create_hooks(&self) -> &[String] {
        self.hooks
            .as_ref()
            .map(|h| h.post_create.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaHooks {
    #[serde(default)]
    pub post_create: Vec<String>,
}

/// One node of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaNode {
    Folder(FolderNode),
    File(FileNode),
    If(IfNode),
    Else(ElseNode),
    Repeat(RepeatNode),
}

impl SchemaNode {
    pub fn folder(name: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self::Folder(FolderNode {
            name: name.into(),
            children,
            attributes: BTreeMap::new(),
        })
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::File(FileNode::new(name))
    }

    pub fn file_with_content(name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut file = FileNode::new(name);
        file.content = Some(content.into());
        Self::File(file)
    }

    pub fn if_var(condition_var: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self::If(IfNode {
            condition_var: condition_var.into(),
            children,
        })
    }

    pub fn else_branch(children: Vec<SchemaNode>) -> Self {
        Self::Else(ElseNode { children })
    }

    pub fn repeat(count: impl Into<String>, as_var: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self::Repeat(RepeatNode {
            repeat_count: count.into(),
            repeat_as: as_var.into(),
            children,
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Folder(_) => NodeKind::Folder,
            Self::File(_) => NodeKind::File,
            Self::If(_) => NodeKind::If,
            Self::Else(_) => NodeKind::Else,
            Self::Repeat(_) => NodeKind::Repeat,
        }
    }

    /// Child nodes, empty for files.
    pub fn children(&self) -> &[SchemaNode] {
        match self {
            Self::Folder(n) => &n.children,
            Self::File(_) => &[],
            Self::If(n) => &n.children,
            Self::Else(n) => &n.children,
            Self::Repeat(n) => &n.children,
        }
    }
}

/// Discriminant of [`SchemaNode`], for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Folder,
    File,
    If,
    Else,
    Repeat,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Folder => "folder",
            Self::File => "file",
            Self::If => "if",
            Self::Else => "else",
            Self::Repeat => "repeat",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    pub name: String,
    #[serde(default)]
    pub children: Vec<SchemaNode>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<GeneratorKind>,
    #[serde(
        default,
        alias = "generateConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub generate_config: Option<String>,
    /// Expand `{{if}}`/`{{for}}` directives in inline content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl FileNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: None,
            url: None,
            generate: None,
            generate_config: None,
            template: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn is_template(&self) -> bool {
        self.template == Some(true)
    }

    /// Where the bytes of this file come from.
    ///
    /// A URL wins over a generator, which wins over inline content.
    pub fn source(&self) -> FileSource<'_> {
        if let Some(url) = self.url.as_deref() {
            FileSource::Url(url)
        } else if let Some(kind) = self.generate {
            FileSource::Generate {
                kind,
                config: self.generate_config.as_deref(),
            }
        } else {
            FileSource::Inline(self.content.as_deref())
        }
    }
}

/// Resolved content source of a file node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource<'a> {
    Url(&'a str),
    Generate {
        kind: GeneratorKind,
        config: Option<&'a str>,
    },
    Inline(Option<&'a str>),
}

/// Built-in binary generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Image,
    Sqlite,
}

impl GeneratorKind {
    /// Noun used in log messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Sqlite => "database",
        }
    }

    /// File extensions this generator's output is expected to carry.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Image => &["png", "jpg", "jpeg"],
            Self::Sqlite => &["db", "sqlite", "sqlite3"],
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfNode {
    /// Variable name without `%` delimiters.
    pub condition_var: String,
    #[serde(default)]
    pub children: Vec<SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseNode {
    #[serde(default)]
    pub children: Vec<SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatNode {
    /// Count expression; may contain `%VAR%` tokens.
    pub repeat_count: String,
    #[serde(default = "default_repeat_as")]
    pub repeat_as: String,
    #[serde(default)]
    pub children: Vec<SchemaNode>,
}

fn default_repeat_as() -> String {
    "i".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_precedence() {
        let mut file = FileNode::new("a.png");
        file.content = Some("text".into());
        assert_eq!(file.source(), FileSource::Inline(Some("text")));

        file.generate = Some(GeneratorKind::Image);
        assert!(matches!(
            file.source(),
            FileSource::Generate {
                kind: GeneratorKind::Image,
                ..
            }
        ));

        file.url = Some("https://example.com/a.png".into());
        assert_eq!(file.source(), FileSource::Url("https://example.com/a.png"));
    }

    #[test]
    fn children_of_file_is_empty() {
        assert!(SchemaNode::file("x").children().is_empty());
        let folder = SchemaNode::folder("f", vec![SchemaNode::file("x")]);
        assert_eq!(folder.children().len(), 1);
        assert_eq!(folder.kind(), NodeKind::Folder);
    }

    #[test]
    fn hooks_default_to_empty() {
        let tree = SchemaTree::new(SchemaNode::folder("root", vec![]));
        assert!(tree.post_create_hooks().is_empty());
        let tree = tree.with_hooks(vec!["git init".into()]);
        assert_eq!(tree.post_create_hooks(), ["git init".to_string()]);
    }

    #[test]
    fn generator_nouns() {
        assert_eq!(GeneratorKind::Image.noun(), "image");
        assert_eq!(GeneratorKind::Sqlite.noun(), "database");
        assert_eq!(GeneratorKind::Sqlite.to_string(), "sqlite");
    }
}
