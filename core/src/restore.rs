use crate::backup::{copy_tree, set_file_mtime};
use crate::catalog::Snapshot;
use crate::store::ContentStore;
use crate::types::{ContentHash, RestoreReport, SnapshotKind, dir_timestamp};
use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tokio::fs;
use tracing::{info, warn};

/// Reconstructs a target tree from a snapshot, verifying blob integrity for
/// dedup snapshots.
///
/// The tree is built in a hidden stage directory beside the target and only
/// swapped into place once the corruption-threshold check has passed, so an
/// aborted restore leaves the previous target contents untouched.
pub struct SnapshotRestorer<'a> {
    store: &'a ContentStore,
}

impl<'a> SnapshotRestorer<'a> {
    pub fn new(store: &'a ContentStore) -> Self {
        Self { store }
    }

    pub async fn restore(&self, snapshot: &Snapshot, target: &Path) -> Result<RestoreReport> {
        if !fs::try_exists(&snapshot.storage_path).await? {
            return Err(Error::SnapshotNotFound {
                path: snapshot.storage_path.display().to_string(),
            });
        }

        let stage = stage_dir(target);
        fs::create_dir_all(&stage).await?;

        let result = match snapshot.kind {
            SnapshotKind::Dedup => self.restore_dedup(snapshot, &stage).await,
            SnapshotKind::Legacy => self.restore_legacy(snapshot, &stage).await,
        };

        match result {
            Ok(report) => {
                if fs::try_exists(target).await? {
                    fs::remove_dir_all(target).await?;
                }
                fs::rename(&stage, target).await?;
                info!(
                    snapshot = %snapshot.name,
                    restored = report.restored_count,
                    "restore complete"
                );
                Ok(report)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&stage).await;
                Err(e)
            }
        }
    }

    async fn restore_dedup(&self, snapshot: &Snapshot, stage: &Path) -> Result<RestoreReport> {
        let records = snapshot.load_records().await?;
        let mut report = RestoreReport {
            total_records: records.len(),
            ..RestoreReport::default()
        };

        for record in &records {
            if !is_safe_relative(&record.path) {
                warn!(path = %record.path, "rejecting unsafe record path");
                report.invalid_paths.push(record.path.clone());
                continue;
            }

            if !self.store.exists(&record.hash).await {
                report.missing_paths.push(record.path.clone());
                continue;
            }

            let data = self.store.get(&record.hash).await?;
            if data.len() as u64 != record.size || ContentHash::from_data(&data) != record.hash {
                report.corrupted_paths.push(record.path.clone());
                continue;
            }

            let dest = stage.join(&record.path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&dest, &data).await?;
            if let Ok(offset) = Duration::try_from_secs_f64(record.mtime) {
                set_file_mtime(&dest, UNIX_EPOCH + offset)?;
            }
            report.restored_count += 1;
        }

        if !report.corrupted_paths.is_empty() {
            warn!(count = report.corrupted_paths.len(), "corrupted store entries detected");
        }
        if !report.missing_paths.is_empty() {
            warn!(count = report.missing_paths.len(), "store entries missing");
        }
        if !report.invalid_paths.is_empty() {
            warn!(count = report.invalid_paths.len(), "invalid record paths rejected");
        }

        // More than half the records corrupted means the store itself is in
        // bad shape; abandon the restore instead of handing back a husk.
        if report.corrupted_paths.len() * 2 > report.total_records {
            return Err(Error::ExcessiveCorruption { report });
        }

        Ok(report)
    }

    /// Legacy snapshots carry no per-file metadata, so the stored tree is
    /// copied verbatim with no hash verification.
    async fn restore_legacy(&self, snapshot: &Snapshot, stage: &Path) -> Result<RestoreReport> {
        let data_dir = snapshot.data_dir();
        if !fs::try_exists(&data_dir).await? {
            return Err(Error::DataMissing {
                path: data_dir.display().to_string(),
            });
        }

        let copied = copy_tree(&data_dir, stage).await?;
        Ok(RestoreReport {
            restored_count: copied,
            total_records: copied,
            ..RestoreReport::default()
        })
    }
}

fn stage_dir(target: &Path) -> PathBuf {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let base = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "restore".to_string());
    parent.join(format!(".{}.restore-{}", base, dir_timestamp()))
}

/// A record path may only descend from the target: relative, no parent
/// traversal, no root or drive prefix.
fn is_safe_relative(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
