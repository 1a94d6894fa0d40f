// src/types.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::ModifyKind;

/// Name of a watch group (the `[group.<name>]` key in the config).
pub type GroupName = String;

/// Ordered glob patterns belonging to one watcher. Duplicates are allowed.
pub type WatchSpec = Vec<String>;

/// Group name -> patterns. Read once when orchestration starts.
pub type GroupTable = BTreeMap<GroupName, WatchSpec>;

/// A concrete path produced by glob resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPath {
    pub path: PathBuf,
    pub parent: PathBuf,
}

impl MatchedPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let parent = parent_dir(&path);
        Self { path, parent }
    }
}

/// Parent directory of `path`, with `"."` standing in for the empty parent of
/// a bare file name.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Coarse kind of a filesystem notification.
///
/// Only reported in diagnostics; watchers treat every kind the same.
/// Access events never become a `ChangeOp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
    Other,
}

impl ChangeOp {
    /// Classify a `notify` event kind.
    ///
    /// Returns `None` for access events (open, read, close): nothing on disk
    /// changed, and a command that reads its own inputs would otherwise
    /// retrigger itself.
    pub fn from_kind(kind: &EventKind) -> Option<Self> {
        let op = match kind {
            EventKind::Access(_) => return None,
            EventKind::Create(_) => ChangeOp::Create,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeOp::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => ChangeOp::Chmod,
            EventKind::Modify(_) => ChangeOp::Write,
            EventKind::Remove(_) => ChangeOp::Remove,
            EventKind::Any | EventKind::Other => ChangeOp::Other,
        };
        Some(op)
    }
}

/// One change notification on one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub op: ChangeOp,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, op: ChangeOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

/// Lifecycle of a single watcher.
///
/// `Created -> Resolving -> Subscribing -> Watching -> Closing -> Closed`,
/// with `Failed` reachable from `Resolving` and `Subscribing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Created,
    Resolving,
    Subscribing,
    Watching,
    Closing,
    Closed,
    Failed,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatcherState::Created => "created",
            WatcherState::Resolving => "resolving",
            WatcherState::Subscribing => "subscribing",
            WatcherState::Watching => "watching",
            WatcherState::Closing => "closing",
            WatcherState::Closed => "closed",
            WatcherState::Failed => "failed",
        };
        f.write_str(s)
    }
}
