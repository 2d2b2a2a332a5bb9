//! Infrastructure adapters for Trellis.
//!
//! This crate implements the ports defined in `trellis_core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod fetcher;
pub mod filesystem;
pub mod generators;
pub mod hooks;
pub mod loader;

// Re-export commonly used adapters
pub use fetcher::HttpFetcher;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use generators::BuiltinGenerators;
pub use hooks::ShellHookRunner;
pub use loader::{DocumentFormat, SchemaLoader};
