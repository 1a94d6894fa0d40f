// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;
use walkdir::WalkDir;

pub mod mock;

/// Abstract filesystem interface used by glob resolution and config loading.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Every regular file below `base` (not `base` itself), at most
    /// `max_depth` levels down. `None` means unlimited.
    ///
    /// Directory symlinks are not followed; symlinks to files are returned.
    fn walk_files(&self, base: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>>;
}

/// Implementation backed by `std::fs`, walking directories with `walkdir`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn walk_files(&self, base: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
        let mut walker = WalkDir::new(base).follow_links(false).min_depth(1);
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(base = ?base, error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if is_file {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}
