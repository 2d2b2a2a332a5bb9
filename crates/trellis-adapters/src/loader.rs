//! Loading schema documents, variable files, rule files and run records.
//!
//! Every document may be JSON or TOML; the extension decides, and anything
//! that is not `.toml` is read as JSON.
//!
//! # Schema document
//!
//! Either a full tree or a bare root node:
//!
//! ```json
//! {
//!   "root": { "type": "folder", "name": "%NAME%", "children": [] },
//!   "hooks": { "post_create": ["git init"] }
//! }
//! ```
//!
//! # Variables file
//!
//! A flat table. Keys in any case, with or without `%`; scalar values are
//! stringified (`true`, `3`).
//!
//! # Rules file
//!
//! ```toml
//! [NAME]
//! required = true
//! maxLength = 40
//! pattern = "^[a-z-]+$"
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, instrument};
use trellis_core::{
    application::ApplicationError,
    domain::{CreatedItem, SchemaNode, SchemaTree, ValidationRule},
    error::{TrellisError, TrellisResult},
};

/// Document syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaDocument {
    Tree(SchemaTree),
    Node(SchemaNode),
}

/// Scalar accepted in a variables file.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Stateless loader for the documents the engine consumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaLoader;

impl SchemaLoader {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn load_schema(&self, path: &Path) -> TrellisResult<SchemaTree> {
        let text = read(path)?;
        let tree = self
            .parse_schema(&text, DocumentFormat::from_path(path))
            .map_err(|reason| load_error(path, reason))?;
        debug!(hooks = tree.post_create_hooks().len(), "schema loaded");
        Ok(tree)
    }

    /// Parse schema text. Errors carry the parser's message.
    pub fn parse_schema(&self, text: &str, format: DocumentFormat) -> Result<SchemaTree, String> {
        Ok(match parse::<SchemaDocument>(text, format)? {
            SchemaDocument::Tree(tree) => tree,
            SchemaDocument::Node(node) => SchemaTree::new(node),
        })
    }

    pub fn load_variables(&self, path: &Path) -> TrellisResult<BTreeMap<String, String>> {
        let text = read(path)?;
        let raw: BTreeMap<String, Scalar> = parse(&text, DocumentFormat::from_path(path))
            .map_err(|reason| load_error(path, reason))?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| (k, v.into_string()))
            .collect())
    }

    pub fn load_rules(&self, path: &Path) -> TrellisResult<BTreeMap<String, ValidationRule>> {
        let text = read(path)?;
        parse(&text, DocumentFormat::from_path(path)).map_err(|reason| load_error(path, reason))
    }

    /// Items recorded by a previous `create`, for undo.
    pub fn load_record(&self, path: &Path) -> TrellisResult<Vec<CreatedItem>> {
        let text = read(path)?;
        parse(&text, DocumentFormat::Json).map_err(|reason| load_error(path, reason))
    }

    pub fn save_record(&self, path: &Path, items: &[CreatedItem]) -> TrellisResult<()> {
        let json = serde_json::to_string_pretty(items).map_err(|e| load_error(path, e.to_string()))?;
        fs::write(path, json).map_err(|e| io_error(path, e))
    }
}

fn parse<T: DeserializeOwned>(text: &str, format: DocumentFormat) -> Result<T, String> {
    match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        DocumentFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
    }
}

fn read(path: &Path) -> TrellisResult<String> {
    fs::read_to_string(path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, e: std::io::Error) -> TrellisError {
    ApplicationError::FilesystemError {
        path: PathBuf::from(path),
        reason: e.to_string(),
    }
    .into()
}

fn load_error(path: &Path, reason: String) -> TrellisError {
    ApplicationError::DocumentLoad {
        path: PathBuf::from(path),
        reason,
    }
    .into()
}
