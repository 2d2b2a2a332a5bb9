//! In-memory filesystem adapter for tests and sandboxed hosts.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use trellis_core::{
    application::{
        ApplicationError,
        ports::{Entry, EntryKind, Filesystem},
    },
    error::TrellisResult,
};

/// In-memory filesystem. Clones share the same contents.
#[derive(Debug, Clone)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, Vec<u8>>,
    directories: BTreeSet<PathBuf>,
    /// Makes `supports_delete` report false (hosts without undo).
    deletes_disabled: bool,
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryFilesystemInner::default())),
        }
    }

    /// A filesystem that refuses undo, like a host that cannot delete.
    pub fn without_delete() -> Self {
        let fs = Self::new();
        if let Ok(mut inner) = fs.inner.write() {
            inner.deletes_disabled = true;
        }
        fs
    }

    /// File content as text (testing helper).
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.inner
            .read()
            .map(|inner| inner.directories.contains(path.as_ref()))
            .unwrap_or(false)
    }

    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path.as_ref()))
            .unwrap_or(false)
    }

    /// All file paths, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All directory paths, sorted.
    pub fn list_directories(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.directories.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Clear all contents.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.files.clear();
            inner.directories.clear();
        }
    }

    fn read(&self) -> TrellisResult<RwLockReadGuard<'_, MemoryFilesystemInner>> {
        self.inner
            .read()
            .map_err(|_| ApplicationError::LockPoisoned.into())
    }

    fn write(&self) -> TrellisResult<RwLockWriteGuard<'_, MemoryFilesystemInner>> {
        self.inner
            .write()
            .map_err(|_| ApplicationError::LockPoisoned.into())
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

fn fs_error(path: &Path, reason: &str) -> ApplicationError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;

        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            if inner.files.contains_key(&current) {
                return Err(fs_error(&current, "A file with this name already exists").into());
            }
            inner.directories.insert(current.clone());
        }

        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> TrellisResult<()> {
        let mut inner = self.write()?;

        if inner.directories.contains(path) {
            return Err(fs_error(path, "A directory with this name already exists").into());
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(fs_error(path, "Parent directory does not exist").into());
            }
        }

        inner.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> TrellisResult<Vec<u8>> {
        let inner = self.read()?;
        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| fs_error(path, "File not found").into())
    }

    fn entry(&self, path: &Path) -> TrellisResult<Option<Entry>> {
        let inner = self.read()?;
        if let Some(bytes) = inner.files.get(path) {
            return Ok(Some(Entry {
                kind: EntryKind::File,
                size: bytes.len() as u64,
            }));
        }
        Ok(inner.directories.contains(path).then_some(Entry {
            kind: EntryKind::Directory,
            size: 0,
        }))
    }

    fn list_dir(&self, path: &Path) -> TrellisResult<Vec<String>> {
        let inner = self.read()?;
        if !inner.directories.contains(path) {
            return Err(fs_error(path, "Directory not found").into());
        }
        let children = inner
            .files
            .keys()
            .chain(inner.directories.iter())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect::<BTreeSet<_>>();
        Ok(children.into_iter().collect())
    }

    fn remove_file(&self, path: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;
        match inner.files.remove(path) {
            Some(_) => Ok(()),
            None => Err(fs_error(path, "File not found").into()),
        }
    }

    fn remove_dir(&self, path: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;
        if !inner.directories.contains(path) {
            return Err(fs_error(path, "Directory not found").into());
        }
        let occupied = inner
            .files
            .keys()
            .chain(inner.directories.iter())
            .any(|p| p.parent() == Some(path));
        if occupied {
            return Err(fs_error(path, "Directory not empty").into());
        }
        inner.directories.remove(path);
        Ok(())
    }

    fn supports_delete(&self) -> bool {
        self.inner
            .read()
            .map(|inner| !inner.deletes_disabled)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_parent() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_file(Path::new("/out/a.txt"), b"x").is_err());

        fs.create_dir_all(Path::new("/out")).unwrap();
        fs.write_file(Path::new("/out/a.txt"), b"x").unwrap();
        assert_eq!(fs.read_to_string("/out/a.txt").as_deref(), Some("x"));
        assert!(fs.is_dir("/"));
    }

    #[test]
    fn files_and_folders_cannot_share_a_name() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/out/dir")).unwrap();
        fs.write_file(Path::new("/out/file"), b"").unwrap();

        assert!(fs.write_file(Path::new("/out/dir"), b"").is_err());
        assert!(fs.create_dir_all(Path::new("/out/file/sub")).is_err());
    }

    #[test]
    fn entry_reports_kind_and_size() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/o")).unwrap();
        fs.write_file(Path::new("/o/f"), b"abc").unwrap();

        let file = fs.entry(Path::new("/o/f")).unwrap().unwrap();
        assert_eq!((file.kind, file.size), (EntryKind::File, 3));
        assert!(fs.entry(Path::new("/o")).unwrap().unwrap().is_dir());
        assert_eq!(fs.entry(Path::new("/o/missing")).unwrap(), None);
    }

    #[test]
    fn list_dir_returns_direct_children_only() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/o/sub/deep")).unwrap();
        fs.write_file(Path::new("/o/a.txt"), b"").unwrap();
        fs.write_file(Path::new("/o/sub/b.txt"), b"").unwrap();

        assert_eq!(
            fs.list_dir(Path::new("/o")).unwrap(),
            vec!["a.txt".to_string(), "sub".to_string()]
        );
    }

    #[test]
    fn remove_dir_only_when_empty() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/o/sub")).unwrap();
        fs.write_file(Path::new("/o/sub/x"), b"").unwrap();

        assert!(fs.remove_dir(Path::new("/o/sub")).is_err());
        fs.remove_file(Path::new("/o/sub/x")).unwrap();
        fs.remove_dir(Path::new("/o/sub")).unwrap();
        assert!(!fs.exists(Path::new("/o/sub")));
    }

    #[test]
    fn clones_share_state() {
        let fs = MemoryFilesystem::new();
        let other = fs.clone();
        fs.create_dir_all(Path::new("/shared")).unwrap();
        assert!(other.is_dir("/shared"));

        assert!(fs.supports_delete());
        assert!(!MemoryFilesystem::without_delete().supports_delete());
    }
}
