// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{GroupName, GroupTable};
use crate::watch::WatchOptions;

/// Configuration exactly as read from a TOML file:
///
/// ```toml
/// [config]
/// throttle_ms = 50
/// watch_parents = true
///
/// [group.build]
/// watch = ["src/**/*.rs"]
/// cmd = "cargo build"
/// ```
///
/// Turn it into a [`ConfigFile`] with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are the group names (e.g. `"build"`, `"docs"`).
    #[serde(default)]
    pub group: BTreeMap<GroupName, GroupConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Minimum milliseconds between two triggers of the same group.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Also watch the parent directory of every matched file.
    #[serde(default = "default_watch_parents")]
    pub watch_parents: bool,
}

fn default_throttle_ms() -> u64 {
    50
}

fn default_watch_parents() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            watch_parents: default_watch_parents(),
        }
    }
}

/// `[group.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    /// Glob patterns, relative to the directory holding the config file.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Shell command run when any watched file changes.
    pub cmd: String,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    group: BTreeMap<GroupName, GroupConfig>,
}

impl ConfigFile {
    /// Only `validate` should call this.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        group: BTreeMap<GroupName, GroupConfig>,
    ) -> Self {
        Self { config, group }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn groups(&self) -> &BTreeMap<GroupName, GroupConfig> {
        &self.group
    }

    /// Group name -> watch patterns, as consumed by `watch_groups`.
    pub fn group_table(&self) -> GroupTable {
        self.group
            .iter()
            .map(|(name, g)| (name.clone(), g.watch.clone()))
            .collect()
    }

    /// Group name -> shell command.
    pub fn commands(&self) -> BTreeMap<GroupName, String> {
        self.group
            .iter()
            .map(|(name, g)| (name.clone(), g.cmd.clone()))
            .collect()
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            throttle: Duration::from_millis(self.config.throttle_ms),
            watch_parents: self.config.watch_parents,
        }
    }
}
