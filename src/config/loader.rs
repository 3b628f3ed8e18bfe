// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults for omitted sections and keys.
/// - Rejects zero cache capacities, a zero progress interval and metric
///   namespaces prometheus would refuse.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Bootqueue.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Bootqueue.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueueError;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let cfg = load_and_validate(file.path()).unwrap();

        assert_eq!(cfg, ConfigFile::default());
        assert_eq!(cfg.store.path, None);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.jobs, 2048);
        assert_eq!(cfg.cache.dependents, 1024);
        assert_eq!(cfg.metrics.namespace, "bootstrap");
        assert_eq!(cfg.execution.progress_interval, 2500);
    }

    #[test]
    fn reads_every_section() {
        let file = write_config(
            r#"
            [store]
            path = "state/bootstrap.db"
            sync = true

            [cache]
            enabled = false
            jobs = 16
            dependents = 8

            [metrics]
            namespace = "avm_bootstrap"

            [execution]
            progress_interval = 10
            "#,
        );
        let cfg = load_and_validate(file.path()).unwrap();

        assert_eq!(cfg.store.path, Some(PathBuf::from("state/bootstrap.db")));
        assert!(cfg.store.sync);

        let options = cfg.scheduler_options();
        assert!(!options.caching);
        assert_eq!(options.jobs_cache_size.get(), 16);
        assert_eq!(options.dependents_cache_size.get(), 8);
        assert_eq!(options.metrics_namespace, "avm_bootstrap");
        assert_eq!(cfg.execution.progress_interval, 10);
    }

    #[test]
    fn unknown_keys_are_toml_errors() {
        let file = write_config("[cache]\nsize = 3\n");
        let err = load_and_validate(file.path()).unwrap_err();
        assert!(matches!(err, QueueError::TomlError(_)), "got {err:?}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, QueueError::Io(_)), "got {err:?}");
    }

    #[test]
    fn default_path_is_relative_bootqueue_toml() {
        assert_eq!(default_config_path(), PathBuf::from("Bootqueue.toml"));
    }
}
