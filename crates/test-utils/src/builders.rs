use std::collections::BTreeMap;

use globwatch::config::{ConfigFile, ConfigSection, GroupConfig, RawConfigFile};
use globwatch::types::GroupTable;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                group: BTreeMap::new(),
            },
        }
    }

    pub fn with_group(mut self, name: &str, cmd: &str, watch: &[&str]) -> Self {
        self.config.group.insert(
            name.to_string(),
            GroupConfig {
                watch: watch.iter().map(|s| s.to_string()).collect(),
                cmd: cmd.to_string(),
            },
        );
        self
    }

    pub fn with_throttle_ms(mut self, ms: u64) -> Self {
        self.config.config.throttle_ms = ms;
        self
    }

    pub fn with_watch_parents(mut self, val: bool) -> Self {
        self.config.config.watch_parents = val;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `GroupTable`.
#[derive(Default)]
pub struct GroupTableBuilder {
    table: GroupTable,
}

impl GroupTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, name: &str, patterns: &[&str]) -> Self {
        self.table.insert(
            name.to_string(),
            patterns.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn build(self) -> GroupTable {
        self.table
    }
}
