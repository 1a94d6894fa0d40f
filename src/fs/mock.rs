// src/fs/mock.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use super::FileSystem;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // child names
}

/// In-memory filesystem for resolver and config tests.
///
/// Paths are stored as given, without a leading `./`. The root directory is
/// `"."`, and parent directories are created implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        entries.insert(path.clone(), MockEntry::File(content.into()));
        link_to_parent(&mut entries, &path);
    }

    /// Add an (empty) directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        ensure_dir(&mut entries, path.as_ref());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(Path::new("."))
    } else {
        Some(parent)
    }
}

fn ensure_dir(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    link_to_parent(entries, path);
}

/// Register `path` as a child of its parent, creating the parent if needed.
fn link_to_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    if parent == path {
        return;
    }
    ensure_dir(entries, parent);

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn walk_files(&self, base: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
        let entries = self.lock();
        if !matches!(entries.get(base), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", base));
        }

        let mut files = Vec::new();
        for (path, entry) in entries.iter() {
            if !matches!(entry, MockEntry::File(_)) {
                continue;
            }
            let rel = if base == Path::new(".") {
                path.as_path()
            } else {
                match path.strip_prefix(base) {
                    Ok(rel) => rel,
                    Err(_) => continue,
                }
            };
            let depth = rel.components().count();
            if depth == 0 || max_depth.is_some_and(|max| depth > max) {
                continue;
            }
            files.push(path.clone());
        }
        files.sort();
        Ok(files)
    }
}
