//! Trellis Core - schema execution engine
//!
//! Turns a declarative schema tree (folders, files, `if`/`else`, `repeat`)
//! into a directory structure, a dry-run diff, or an undo of a previous run.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          trellis-cli (host)             │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │           StructureService              │
//! │ create · preview · undo · validate ·    │
//! │ check                                   │
//! └──────────────────┬──────────────────────┘
//!                    │ drives
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   Engine: Walker<Materializer|Preview>  │
//! │      undo executor · archive rewrite    │
//! └──────────────────┬──────────────────────┘
//!                    │ side effects through
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │  Ports: Filesystem · Fetcher ·          │
//! │  ContentGenerator · HookRunner          │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │          trellis-adapters               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The domain layer (schema model, substitution, naming, truthiness, rules)
//! sits under all of it and performs no I/O.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_core::prelude::*;
//!
//! let tree = SchemaTree::new(SchemaNode::folder(
//!     "%NAME%",
//!     vec![SchemaNode::file_with_content("README.md", "# %NAME%")],
//! ));
//!
//! let service = StructureService::new(filesystem); // impl Filesystem
//! let vars = Variables::from([("NAME".into(), "demo".into())]);
//! let result = service
//!     .create(&tree, "./output", &vars, None, CreateOptions::default())
//!     .unwrap();
//! assert_eq!(result.summary.errors, 0);
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        CreateOptions, SchemaReport, StructureService,
        ports::{ContentGenerator, Fetcher, Filesystem, HookRunner},
        services::structure_service::Variables,
    };
    pub use crate::domain::{
        CreateResult, CreatedItem, DiffResult, EngineLimits, LogEntry, LogType, SchemaNode,
        SchemaTree, UndoResult, ValidationError, ValidationRule, VariableScope,
    };
    pub use crate::error::{TrellisError, TrellisResult};
}

