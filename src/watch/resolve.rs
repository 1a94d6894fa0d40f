// src/watch/resolve.rs

//! Glob pattern resolution: turning a [`WatchSpec`] into concrete paths.
//!
//! Resolution happens once, when a watcher starts. Files created afterwards
//! are never picked up.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::errors::{Result, WatchError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::MatchedPath;

/// Turns glob patterns into the paths a watcher should subscribe to.
pub trait GlobResolver: Send + Sync + Debug {
    fn resolve(&self, patterns: &[String]) -> Result<Vec<MatchedPath>>;
}

/// Resolver that walks a [`FileSystem`] and matches entries with `globset`.
///
/// Patterns are relative to `root`. `*` and `?` never cross a `/`; `**`
/// does. For each pattern only the literal leading directory (everything
/// before the first component with a glob metacharacter) is walked, and
/// only as deep as the pattern can reach. Directory symlinks are not
/// descended into.
#[derive(Debug, Clone)]
pub struct FsGlobResolver {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl Default for FsGlobResolver {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl FsGlobResolver {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            root: PathBuf::from("."),
        }
    }

    /// Resolve patterns against `root` instead of the working directory.
    /// Returned paths are then prefixed with `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_pattern(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = pattern.trim_start_matches("./");
        let matcher = compile(pattern)?;
        let (base, rest) = split_base(pattern);
        let base_path = self.under_root(&base);

        if rest.is_empty() {
            // No metacharacters: the pattern names a single path.
            return Ok(if self.fs.exists(&base_path) {
                vec![base_path]
            } else {
                Vec::new()
            });
        }

        if !self.fs.is_dir(&base_path) {
            debug!(pattern, base = ?base_path, "glob base directory missing; no matches");
            return Ok(Vec::new());
        }

        let max_depth = if rest.split('/').any(|part| part == "**") {
            None
        } else {
            Some(rest.split('/').count())
        };

        let mut matches: Vec<PathBuf> = self
            .fs
            .walk_files(&base_path, max_depth)
            .map_err(|err| WatchError::Resolve(format!("{err:#}")))?
            .into_iter()
            .map(strip_cur_dir)
            .filter(|entry| matcher.is_match(self.relative(entry)))
            .collect();

        matches.sort();
        matches.dedup();
        Ok(matches)
    }

    fn under_root(&self, rel: &str) -> PathBuf {
        if self.root == Path::new(".") {
            if rel.is_empty() {
                PathBuf::from(".")
            } else {
                PathBuf::from(rel)
            }
        } else {
            self.root.join(rel)
        }
    }

    /// Path to feed the matcher: relative to `root` when possible.
    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

impl GlobResolver for FsGlobResolver {
    fn resolve(&self, patterns: &[String]) -> Result<Vec<MatchedPath>> {
        let mut resolved = Vec::new();
        for pattern in patterns {
            let paths = self.resolve_pattern(pattern)?;
            debug!(pattern = %pattern, matches = paths.len(), "resolved glob pattern");
            resolved.extend(paths.into_iter().map(MatchedPath::new));
        }
        Ok(resolved)
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| WatchError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(glob.compile_matcher())
}

/// Check that every pattern compiles, without touching the filesystem.
pub fn validate_patterns(patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        compile(pattern.trim_start_matches("./"))?;
    }
    Ok(())
}

fn is_literal(component: &str) -> bool {
    !component.contains(['*', '?', '[', '{', '\\'])
}

/// Split a pattern into its literal leading directory and the remainder.
///
/// `"src/**/*.rs"` -> `("src", "**/*.rs")`, `"*.go"` -> `("", "*.go")`,
/// `"docs/index.md"` -> `("docs/index.md", "")`.
fn split_base(pattern: &str) -> (String, String) {
    let mut parts = pattern.split('/').peekable();
    let mut base = Vec::new();
    while let Some(part) = parts.next_if(|part| is_literal(part)) {
        base.push(part);
    }
    let rest: Vec<&str> = parts.collect();
    (base.join("/"), rest.join("/"))
}

/// Walking `"."` yields `./name`; keep resolved paths in the same shape as
/// the patterns that produced them.
fn strip_cur_dir(path: PathBuf) -> PathBuf {
    match path.strip_prefix(".") {
        Ok(stripped) if !stripped.as_os_str().is_empty() => stripped.to_path_buf(),
        _ => path,
    }
}
