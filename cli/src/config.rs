use anyhow::{Context, Result};
use directories::ProjectDirs;
use saveguard_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// On-disk application config. The layout (hotkeys/paths/features sections)
/// matches the original config.json format so existing configs keep
/// working; the CLI itself only consumes `paths` and `features`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub hotkeys: Hotkeys,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub features: Features,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotkeys {
    pub quick_backup: String,
    pub quick_restore: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub source_path: PathBuf,
    pub backup_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Features {
    pub md5_deduplication: bool,
    #[serde(default)]
    pub auto_load_after_restore: bool,
    #[serde(default)]
    pub auto_save_before_backup: bool,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            quick_backup: "f7".to_string(),
            quick_restore: "f8".to_string(),
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("saves"),
            backup_root: PathBuf::from("backups"),
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self {
            md5_deduplication: true,
            auto_load_after_restore: false,
            auto_save_before_backup: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hotkeys: Hotkeys::default(),
            paths: Paths::default(),
            features: Features::default(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "saveguard")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    /// Loads the config file, writing the defaults on first run.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config = serde_json::from_str(&data)
                .with_context(|| format!("config file {} is not valid JSON", path.display()))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            info!(path = %path.display(), "wrote default config");
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Resolves the engine configuration. A relative backup root is taken
    /// relative to the current directory, as the original did.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let backup_root = if self.paths.backup_root.is_absolute() {
            self.paths.backup_root.clone()
        } else {
            std::env::current_dir()?.join(&self.paths.backup_root)
        };

        let mut config = EngineConfig::new(self.paths.source_path.clone(), backup_root);
        config.dedup_enabled = self.features.md5_deduplication;
        config.auto_load_after_restore = self.features.auto_load_after_restore;
        config.auto_save_before_backup = self.features.auto_save_before_backup;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_defaults_and_reloads_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let created = AppConfig::load_or_create(&path).unwrap();
        assert!(created.features.md5_deduplication);
        assert!(path.exists());

        let reloaded = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(reloaded.hotkeys.quick_backup, "f7");
        assert_eq!(reloaded.paths.backup_root, PathBuf::from("backups"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"paths": {"source_path": "/tmp/saves", "backup_root": "/tmp/backups"}}"#,
        )
        .unwrap();

        let config = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(config.paths.source_path, PathBuf::from("/tmp/saves"));
        assert!(config.features.md5_deduplication);
        assert!(!config.features.auto_save_before_backup);
    }
}
