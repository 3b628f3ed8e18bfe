// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{QueueError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = QueueError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_cache(cfg)?;
    validate_execution(cfg)?;
    validate_metrics(cfg)?;
    Ok(())
}

fn validate_cache(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cache.jobs == 0 {
        return Err(QueueError::ConfigError(
            "[cache].jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.cache.dependents == 0 {
        return Err(QueueError::ConfigError(
            "[cache].dependents must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_execution(cfg: &RawConfigFile) -> Result<()> {
    if cfg.execution.progress_interval == 0 {
        return Err(QueueError::ConfigError(
            "[execution].progress_interval must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_metrics(cfg: &RawConfigFile) -> Result<()> {
    let namespace = &cfg.metrics.namespace;
    if namespace.is_empty() {
        return Err(QueueError::ConfigError(
            "[metrics].namespace must not be empty".to_string(),
        ));
    }
    if let Some(bad) = namespace
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(QueueError::ConfigError(format!(
            "[metrics].namespace '{}' contains invalid character '{}'",
            namespace, bad
        )));
    }
    Ok(())
}
