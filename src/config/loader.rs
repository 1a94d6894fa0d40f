// src/config/loader.rs

use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Read and deserialize a config file without validating it.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs.read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a config file from disk and validate it.
///
/// This is the entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks that there is at least one group, that every group has a
///   command and patterns, and that every pattern compiles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    load_and_validate_with(&RealFileSystem, path)
}

/// [`load_and_validate`] over an arbitrary [`FileSystem`].
pub fn load_and_validate_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(fs, path)?;
    ConfigFile::try_from(raw_config)
}

/// `Globwatch.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Globwatch.toml")
}
