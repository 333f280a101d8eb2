use crate::backup::{SnapshotBuilder, copy_tree};
use crate::catalog::{BackupCatalog, Snapshot};
use crate::config::EngineConfig;
use crate::hooks::{GameLifecycle, StatusSink};
use crate::restore::SnapshotRestorer;
use crate::stats::{StatsCalculator, StorageStats};
use crate::store::ContentStore;
use crate::types::{RestoreReport, SnapshotKind, dir_timestamp, sanitize_name};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

/// Entry point for every backup-root operation.
///
/// Owns the content store and the ledger location and wires the builder,
/// restorer and stats calculator together with the configured lifecycle
/// hooks and status sink. The engine performs no internal locking: the
/// caller must keep at most one create or restore in flight per backup
/// root.
pub struct BackupManager {
    config: EngineConfig,
    store: ContentStore,
    status: Arc<dyn StatusSink>,
    lifecycle: Arc<dyn GameLifecycle>,
}

impl BackupManager {
    pub async fn new(
        config: EngineConfig,
        status: Arc<dyn StatusSink>,
        lifecycle: Arc<dyn GameLifecycle>,
    ) -> Result<Self> {
        fs::create_dir_all(&config.backup_root).await?;
        let store = ContentStore::new(config.repository_path());
        store.init().await?;

        Ok(Self {
            config,
            store,
            status,
            lifecycle,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn catalog(&self) -> Result<BackupCatalog> {
        BackupCatalog::load(self.config.ledger_path()).await
    }

    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let catalog = self.catalog().await?;
        Ok(catalog.list().into_iter().cloned().collect())
    }

    pub async fn create_backup(&self, name: &str) -> Result<Snapshot> {
        self.create_backup_with(name, self.config.dedup_enabled).await
    }

    /// Same as `create_backup` with an explicit mode, overriding the
    /// configured default for this one invocation.
    pub async fn create_backup_with(&self, name: &str, dedup: bool) -> Result<Snapshot> {
        if self.config.auto_save_before_backup {
            self.run_hook("exit game", self.lifecycle.exit_game().await);
        }

        let builder = SnapshotBuilder::new(&self.store, &self.config.backup_root);
        let snapshot = builder
            .create(&self.config.source_path, name, dedup)
            .await?;
        self.commit(snapshot.clone()).await?;

        if self.config.auto_save_before_backup {
            self.run_hook("load game", self.lifecycle.load_game().await);
        }

        self.status
            .report(&format!("Backup complete: {}", snapshot.name));
        Ok(snapshot)
    }

    pub async fn quick_backup(&self) -> Result<Snapshot> {
        if self.config.auto_save_before_backup {
            self.run_hook("exit game", self.lifecycle.exit_game().await);
        }

        let builder = SnapshotBuilder::new(&self.store, &self.config.backup_root);
        let snapshot = builder
            .quick_create(&self.config.source_path, self.config.dedup_enabled)
            .await?;
        self.commit(snapshot.clone()).await?;

        if self.config.auto_save_before_backup {
            self.run_hook("load game", self.lifecycle.load_game().await);
        }

        self.status
            .report(&format!("Quick backup complete: {}", snapshot.name));
        Ok(snapshot)
    }

    pub async fn restore_backup(&self, storage_path: &Path) -> Result<RestoreReport> {
        let catalog = self.catalog().await?;
        let snapshot = catalog
            .find_by_path(storage_path)
            .ok_or_else(|| Error::SnapshotNotFound {
                path: storage_path.display().to_string(),
            })?
            .clone();
        self.restore_snapshot(&snapshot).await
    }

    /// Restores the snapshot with the greatest `created_at` timestamp.
    pub async fn quick_restore(&self) -> Result<RestoreReport> {
        let catalog = self.catalog().await?;
        let snapshot = catalog.latest().ok_or(Error::NoSnapshots)?.clone();
        self.restore_snapshot(&snapshot).await
    }

    async fn restore_snapshot(&self, snapshot: &Snapshot) -> Result<RestoreReport> {
        if self.config.auto_load_after_restore {
            self.run_hook("exit game", self.lifecycle.exit_game().await);
        }

        let restorer = SnapshotRestorer::new(&self.store);
        let report = restorer
            .restore(snapshot, &self.config.source_path)
            .await?;

        if self.config.auto_load_after_restore {
            self.run_hook("load game", self.lifecycle.load_game().await);
        }

        if report.is_clean() {
            self.status.report(&format!(
                "Restored {} files from {}",
                report.restored_count, snapshot.name
            ));
        } else {
            self.status.report(&format!(
                "Restored {} files from {} ({} corrupted, {} missing, {} invalid paths skipped)",
                report.restored_count,
                snapshot.name,
                report.corrupted_paths.len(),
                report.missing_paths.len(),
                report.invalid_paths.len(),
            ));
        }
        Ok(report)
    }

    /// Removes the ledger entry and the snapshot's own storage directory.
    /// Content-store blobs are never touched; other snapshots may still
    /// reference them.
    pub async fn delete_backup(&self, storage_path: &Path) -> Result<String> {
        let mut catalog = self.catalog().await?;
        let snapshot = catalog
            .remove(storage_path)
            .ok_or_else(|| Error::SnapshotNotFound {
                path: storage_path.display().to_string(),
            })?;

        if fs::try_exists(&snapshot.storage_path).await? {
            fs::remove_dir_all(&snapshot.storage_path).await?;
        }
        catalog.save().await?;

        self.status
            .report(&format!("Deleted backup: {}", snapshot.name));
        Ok(snapshot.name)
    }

    /// Renames the ledger entry, returning the old name. The storage
    /// directory keeps its original (timestamped) name.
    pub async fn rename_backup(&self, storage_path: &Path, new_name: &str) -> Result<String> {
        let mut catalog = self.catalog().await?;
        let old_name = catalog
            .rename(storage_path, new_name)
            .ok_or_else(|| Error::SnapshotNotFound {
                path: storage_path.display().to_string(),
            })?;
        catalog.save().await?;

        self.status
            .report(&format!("Renamed backup: {old_name} -> {new_name}"));
        Ok(old_name)
    }

    /// Creates a new snapshot sharing the source's content. Dedup snapshots
    /// only need their metadata list copied; the blobs stay shared. Legacy
    /// snapshots are copied wholesale.
    pub async fn duplicate_backup(&self, storage_path: &Path) -> Result<Snapshot> {
        let mut catalog = self.catalog().await?;
        let source = catalog
            .find_by_path(storage_path)
            .ok_or_else(|| Error::SnapshotNotFound {
                path: storage_path.display().to_string(),
            })?
            .clone();

        let new_name = format!("{} copy", source.name);
        let new_dir = self.config.backup_root.join(format!(
            "{}_{}",
            sanitize_name(&new_name),
            dir_timestamp()
        ));

        match source.kind {
            SnapshotKind::Dedup => {
                let metadata_src = source.metadata_file();
                if !fs::try_exists(&metadata_src).await? {
                    return Err(Error::MetadataMissing {
                        path: metadata_src.display().to_string(),
                    });
                }
                let copy = Snapshot::new(new_name, new_dir, SnapshotKind::Dedup);
                fs::create_dir_all(copy.storage_path.join("metadata")).await?;
                fs::copy(&metadata_src, copy.metadata_file()).await?;
                catalog.append(copy.clone());
                catalog.save().await?;

                self.status.report(&format!("Duplicated backup: {}", copy.name));
                Ok(copy)
            }
            SnapshotKind::Legacy => {
                copy_tree(&source.storage_path, &new_dir).await?;
                let copy = Snapshot::new(new_name, new_dir, SnapshotKind::Legacy);
                catalog.append(copy.clone());
                catalog.save().await?;

                self.status.report(&format!("Duplicated backup: {}", copy.name));
                Ok(copy)
            }
        }
    }

    pub async fn storage_stats(&self) -> Result<StorageStats> {
        let catalog = self.catalog().await?;
        StatsCalculator::new(&self.store, &catalog).compute().await
    }

    async fn commit(&self, snapshot: Snapshot) -> Result<()> {
        let mut catalog = self.catalog().await?;
        catalog.append(snapshot);
        catalog.save().await
    }

    fn run_hook(&self, what: &str, outcome: crate::hooks::HookOutcome) {
        if outcome.ok {
            info!(hook = what, "lifecycle hook succeeded");
        } else {
            warn!(hook = what, message = %outcome.message, "lifecycle hook failed");
            self.status.report(&outcome.message);
        }
    }
}
