//! On-disk application configuration.
//!
//! The file lives at `<platform config dir>/hmd-world/config.toml` unless an
//! explicit path overrides it (the `--config` command-line flag). A missing
//! file means defaults; a present-but-malformed file is an error, so a typo
//! never silently discards tuned HMD parameters.

mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolved config location with load/save against it.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Resolve the config path: an explicit override wins, otherwise the
    /// per-user platform location.
    pub fn resolve(override_path: Option<PathBuf>) -> Result<Self> {
        let path = match override_path {
            Some(path) => path,
            None => dirs::config_dir()
                .context("could not determine the platform config directory")?
                .join("hmd-world")
                .join("config.toml"),
        };
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config, or fall back to defaults when the file does not
    /// exist yet.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("malformed config {}", self.path.display()))?;
        info!(path = %self.path.display(), "config loaded");
        Ok(config)
    }

    /// Write the config, creating the directory on first save.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in_temp(name: &str) -> ConfigStore {
        let path = std::env::temp_dir()
            .join(format!("hmd_config_test_{}_{name}", std::process::id()))
            .join("config.toml");
        ConfigStore::resolve(Some(path)).unwrap()
    }

    #[test]
    fn missing_file_loads_defaults() {
        let store = store_in_temp("missing");
        let config = store.load().unwrap();
        assert_eq!(config.scene_path, AppConfig::default().scene_path);
    }

    #[test]
    fn save_then_load_round_trips_and_creates_the_directory() {
        let store = store_in_temp("round_trip");
        let mut config = AppConfig::default();
        config.hmd.interpupillary_distance = 0.061;
        config.window_size = (960, 600);

        store.save(&config).unwrap();
        let back = store.load().unwrap();
        assert_eq!(back.hmd.interpupillary_distance, 0.061);
        assert_eq!(back.window_size, (960, 600));

        std::fs::remove_dir_all(store.path().parent().unwrap()).unwrap();
    }

    #[test]
    fn malformed_file_is_an_error_not_a_silent_reset() {
        let store = store_in_temp("malformed");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "scene_path = [not toml").unwrap();

        assert!(store.load().is_err());

        std::fs::remove_dir_all(store.path().parent().unwrap()).unwrap();
    }
}
