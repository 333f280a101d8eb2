use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything the engine needs to know about one backup root. Constructed
/// once by the caller and handed to `BackupManager`; there is no ambient
/// global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The live save directory that gets backed up and restored over.
    pub source_path: PathBuf,
    /// Root holding the content store, the ledger and snapshot directories.
    pub backup_root: PathBuf,
    /// Content-addressed dedup snapshots when true, full copies when false.
    pub dedup_enabled: bool,
    /// Run the load-game hook after a restore completes.
    pub auto_load_after_restore: bool,
    /// Run the exit-game hook before a backup (and load-game after).
    pub auto_save_before_backup: bool,
}

impl EngineConfig {
    pub fn new(source_path: PathBuf, backup_root: PathBuf) -> Self {
        Self {
            source_path,
            backup_root,
            dedup_enabled: true,
            auto_load_after_restore: false,
            auto_save_before_backup: false,
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.backup_root.join("backups.json")
    }

    pub fn repository_path(&self) -> PathBuf {
        self.backup_root.join("repository")
    }
}
