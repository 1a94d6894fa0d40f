// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Setup failures (bad patterns, failed subscriptions) surface as
//! [`WatchError`] to whoever started the watch. Errors reported by a running
//! subscription are carried over the same type but only ever logged.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to resolve glob patterns: {0}")]
    Resolve(String),

    #[error("Failed to create file subscription: {0}")]
    Subscribe(String),

    #[error("Failed to watch {path:?}: {reason}")]
    Register { path: PathBuf, reason: String },

    #[error("File watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchError>;
