//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the engine needs from its host. The
//! `trellis-adapters` crate provides implementations.

use std::path::Path;

use url::Url;

use crate::domain::{FetchLimits, GeneratorKind, HookResult};
use crate::error::TrellisResult;

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Metadata returned by [`Filesystem::entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Size in bytes; zero for directories.
    pub size: u64,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Port for filesystem operations.
///
/// Implemented by:
/// - `trellis_adapters::filesystem::LocalFilesystem` (production)
/// - `trellis_adapters::filesystem::MemoryFilesystem` (testing, sandboxed hosts)
///
/// Paths handed to this port are always output-root joined with names
/// that already passed `validate_name`.
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()>;

    /// Create or truncate a file with the given bytes.
    fn write_file(&self, path: &Path, content: &[u8]) -> TrellisResult<()>;

    /// Read a whole file.
    fn read_file(&self, path: &Path) -> TrellisResult<Vec<u8>>;

    /// Stat a path. `Ok(None)` when nothing is there.
    fn entry(&self, path: &Path) -> TrellisResult<Option<Entry>>;

    /// Names of the direct children of a directory.
    fn list_dir(&self, path: &Path) -> TrellisResult<Vec<String>>;

    fn remove_file(&self, path: &Path) -> TrellisResult<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> TrellisResult<()>;

    /// Whether deletes are reliable enough to support undo.
    fn supports_delete(&self) -> bool {
        true
    }

    fn exists(&self, path: &Path) -> bool {
        matches!(self.entry(path), Ok(Some(_)))
    }
}

/// Port for downloads.
///
/// Implementations must enforce `limits.timeout` and stop reading once
/// more than `limits.max_bytes` have arrived. The engine validates the URL
/// before calling and rechecks the byte count afterwards.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url, limits: &FetchLimits) -> TrellisResult<Vec<u8>>;
}

/// Input to a [`ContentGenerator`]. Config and content are already
/// substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateRequest<'a> {
    pub kind: GeneratorKind,
    pub file_name: &'a str,
    pub config: Option<&'a str>,
    pub content: Option<&'a str>,
}

/// Port for binary content generators.
pub trait ContentGenerator: Send + Sync {
    fn generate(&self, request: &GenerateRequest<'_>) -> TrellisResult<Vec<u8>>;
}

/// Port for post-create hooks.
///
/// A failing command is reported in the returned [`HookResult`], never
/// as a panic.
pub trait HookRunner: Send + Sync {
    fn run(&self, command: &str, working_dir: &Path) -> HookResult;
}
