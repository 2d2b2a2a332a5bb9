// ============================================================================
//  DOMAIN LAYER
// ============================================================================

//! Core domain layer for Trellis.
//!
//! Pure rules with no I/O: the schema model, variable environments and
//! substitution, name and URL safety, truthiness, validation rules, and the
//! result shapes every run produces. All filesystem and network access goes
//! through the ports in `crate::application::ports`.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or external calls
//! - **Immutable inputs**: the walker never mutates a schema or a parent scope

pub mod conditions;
pub mod error;
pub mod limits;
pub mod naming;
pub mod results;
pub mod rules;
pub mod schema;
pub mod templating;
pub mod transforms;
pub mod url_guard;
pub mod variables;

pub use conditions::{RepeatCount, is_truthy, parse_repeat_count, validate_loop_variable};
pub use error::DomainError;
pub use limits::{EngineLimits, FetchLimits};
pub use naming::validate_name;
pub use results::{
    CreateResult, CreatedItem, DiffAction, DiffHunk, DiffLine, DiffLineType, DiffNode,
    DiffNodeType, DiffResult, DiffSummary, HookResult, ItemType, LogEntry, LogType,
    ResultSummary, UndoResult, UndoSummary,
};
pub use rules::{PatternLimits, ValidationError, ValidationRule, validate_variables};
pub use schema::{
    ElseNode, FileNode, FileSource, FolderNode, GeneratorKind, IfNode, NodeKind, RepeatNode,
    SchemaHooks, SchemaNode, SchemaTree,
};
pub use templating::{
    TemplateError, extract_template_variables, render_content, render_template,
};
pub use transforms::{extract_variables, substitute, substitute_with};
pub use url_guard::validate_download_url;
pub use variables::{VariableScope, VariableSource, canonical_key};
