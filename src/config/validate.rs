// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchError};
use crate::watch::resolve::validate_patterns;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.group))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_groups(cfg)?;
    validate_groups(cfg)?;
    Ok(())
}

fn ensure_has_groups(cfg: &RawConfigFile) -> Result<()> {
    if cfg.group.is_empty() {
        return Err(WatchError::Config(
            "config must contain at least one [group.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_groups(cfg: &RawConfigFile) -> Result<()> {
    for (name, group) in cfg.group.iter() {
        if group.cmd.trim().is_empty() {
            return Err(WatchError::Config(format!(
                "group '{name}' has an empty `cmd`"
            )));
        }
        if group.watch.is_empty() {
            return Err(WatchError::Config(format!(
                "group '{name}' must have at least one `watch` pattern"
            )));
        }
        validate_patterns(&group.watch)?;
    }
    Ok(())
}
