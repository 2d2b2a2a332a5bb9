//! Application layer for Trellis.
//!
//! This layer contains:
//! - **Engine**: the tree walker and its materialize/preview strategies, undo
//! - **Lint**: static schema checks that never touch a filesystem
//! - **Services**: [`StructureService`], the entry point hosts call
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! Business rules (substitution, naming, truthiness) live in `crate::domain`;
//! this layer decides the order they are applied in and where side effects go.

pub mod engine;
pub mod error;
pub mod lint;
pub mod ports;
pub mod services;

pub use engine::CreateOptions;
pub use lint::{Issue, IssueKind, SchemaReport, check_schema, referenced_variables};
pub use services::StructureService;

// Re-export port traits (for adapter implementation)
pub use ports::{ContentGenerator, Fetcher, Filesystem, GenerateRequest, HookRunner};

pub use error::ApplicationError;
