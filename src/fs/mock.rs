// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified: SystemTime },
    Dir,
}

/// In-memory filesystem.
///
/// Every write stamps the file with a logical clock that advances one second
/// per write, so "newer than" comparisons are deterministic in tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
    clock: Arc<Mutex<u64>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock().insert(PathBuf::from("."), MockEntry::Dir);
        fs
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> SystemTime {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + *clock)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let modified = self.tick();
        self.insert_file(path.as_ref(), content.into(), modified);
    }

    /// Add a file with an explicit modification time.
    pub fn add_file_at(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        self.insert_file(path.as_ref(), content.into(), modified);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        Self::ensure_dirs(&mut entries, path.as_ref());
    }

    /// All file paths currently stored, in order.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File { .. }))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn insert_file(&self, path: &Path, content: Vec<u8>, modified: SystemTime) {
        let mut entries = self.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut entries, parent);
        }
        entries.insert(path.to_path_buf(), MockEntry::File { content, modified });
    }

    fn ensure_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, dir: &Path) {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(path) {
            Some(MockEntry::File { content, .. }) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8 in {:?}: {}", path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Tests use absolute paths throughout.
        Ok(path.to_path_buf())
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        match self.lock().get(path) {
            Some(MockEntry::File { modified, .. }) => Some(*modified),
            _ => None,
        }
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match self.lock().remove(path) {
            Some(MockEntry::File { .. }) => Ok(()),
            _ => Err(anyhow!("Not a file: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.lock();
        if !matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("Not a directory: {:?}", path));
        }
        entries.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.lock();
        match entries.get(path) {
            Some(MockEntry::Dir) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(path) && p.as_path() != path)
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
