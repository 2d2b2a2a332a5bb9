//! Local filesystem adapter using std::fs.

use std::io;
use std::path::Path;

use trellis_core::{
    application::{
        ApplicationError,
        ports::{Entry, EntryKind, Filesystem},
    },
    error::{TrellisError, TrellisResult},
};

/// Production filesystem implementation using `std::fs`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()> {
        std::fs::create_dir_all(path).map_err(|e| map_io_error(path, e, "create directory"))
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> TrellisResult<()> {
        std::fs::write(path, content).map_err(|e| map_io_error(path, e, "write file"))
    }

    fn read_file(&self, path: &Path) -> TrellisResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| map_io_error(path, e, "read file"))
    }

    fn entry(&self, path: &Path) -> TrellisResult<Option<Entry>> {
        // symlink_metadata: a dangling link still occupies the name.
        match std::fs::symlink_metadata(path) {
            Ok(meta) => {
                let kind = if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                let size = if meta.is_dir() { 0 } else { meta.len() };
                Ok(Some(Entry { kind, size }))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error(path, e, "inspect path")),
        }
    }

    fn list_dir(&self, path: &Path) -> TrellisResult<Vec<String>> {
        let entries = std::fs::read_dir(path).map_err(|e| map_io_error(path, e, "list directory"))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| map_io_error(path, e, "list directory"))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn remove_file(&self, path: &Path) -> TrellisResult<()> {
        std::fs::remove_file(path).map_err(|e| map_io_error(path, e, "remove file"))
    }

    fn remove_dir(&self, path: &Path) -> TrellisResult<()> {
        std::fs::remove_dir(path).map_err(|e| map_io_error(path, e, "remove directory"))
    }
}

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> TrellisError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: format!("Failed to {}: {}", operation, e),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_read_and_stat() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let file = dir.path().join("a.txt");

        assert_eq!(fs.entry(&file).unwrap(), None);
        fs.write_file(&file, b"hello").unwrap();
        assert_eq!(fs.read_file(&file).unwrap(), b"hello");

        let entry = fs.entry(&file).unwrap().unwrap();
        assert!(entry.is_file());
        assert_eq!(entry.size, 5);
        assert!(fs.entry(dir.path()).unwrap().unwrap().is_dir());
    }

    #[test]
    fn list_and_remove() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let sub = dir.path().join("nested/deeper");
        fs.create_dir_all(&sub).unwrap();
        fs.write_file(&dir.path().join("nested/b.txt"), b"").unwrap();

        assert_eq!(
            fs.list_dir(&dir.path().join("nested")).unwrap(),
            vec!["b.txt".to_string(), "deeper".to_string()]
        );

        // Non-empty directories are refused.
        assert!(fs.remove_dir(&dir.path().join("nested")).is_err());
        fs.remove_dir(&sub).unwrap();
        fs.remove_file(&dir.path().join("nested/b.txt")).unwrap();
        fs.remove_dir(&dir.path().join("nested")).unwrap();
        assert!(!fs.exists(&dir.path().join("nested")));
    }

    #[test]
    fn errors_name_the_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.txt");
        let err = LocalFilesystem::new().read_file(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }
}
