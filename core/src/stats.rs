use crate::catalog::BackupCatalog;
use crate::store::ContentStore;
use crate::types::SnapshotKind;
use crate::{Error, Result};
use serde::Serialize;
use tracing::warn;

/// Storage accounting: what the store holds versus what the same snapshots
/// would occupy without deduplication.
///
/// Legacy snapshots carry no per-file metadata, so they are excluded from
/// the theoretical totals. This understates the real savings; it is a known
/// limitation of the ledger format, not something to paper over here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    pub snapshot_count: usize,
    pub dedup_snapshot_count: usize,
    pub store_size_bytes: u64,
    pub total_logical_files: usize,
    pub theoretical_size_bytes: u64,
    pub saved_bytes: u64,
    pub saved_percent: f64,
}

pub struct StatsCalculator<'a> {
    store: &'a ContentStore,
    catalog: &'a BackupCatalog,
}

impl<'a> StatsCalculator<'a> {
    pub fn new(store: &'a ContentStore, catalog: &'a BackupCatalog) -> Self {
        Self { store, catalog }
    }

    pub async fn compute(&self) -> Result<StorageStats> {
        let usage = self.store.usage().await?;

        let mut stats = StorageStats {
            snapshot_count: self.catalog.len(),
            store_size_bytes: usage.bytes,
            ..StorageStats::default()
        };

        for snapshot in self.catalog.iter() {
            if snapshot.kind != SnapshotKind::Dedup {
                continue;
            }
            stats.dedup_snapshot_count += 1;

            let records = match snapshot.load_records().await {
                Ok(records) => records,
                Err(Error::MetadataMissing { path }) => {
                    warn!(snapshot = %snapshot.name, path, "metadata missing, excluded from stats");
                    continue;
                }
                Err(e) => return Err(e),
            };
            stats.total_logical_files += records.len();
            stats.theoretical_size_bytes += records.iter().map(|r| r.size).sum::<u64>();
        }

        stats.saved_bytes = stats
            .theoretical_size_bytes
            .saturating_sub(stats.store_size_bytes);
        stats.saved_percent = if stats.theoretical_size_bytes > 0 {
            stats.saved_bytes as f64 / stats.theoretical_size_bytes as f64 * 100.0
        } else {
            0.0
        };

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::SnapshotBuilder;
    use std::path::PathBuf;
    use tokio::fs;

    async fn setup(dir: &tempfile::TempDir) -> (ContentStore, PathBuf, PathBuf) {
        let root = dir.path().to_path_buf();
        let store = ContentStore::new(root.join("repository"));
        store.init().await.unwrap();
        let source = root.join("source");
        fs::create_dir_all(source.join("b")).await.unwrap();
        fs::write(source.join("a.txt"), b"hello").await.unwrap();
        fs::write(source.join("b/c.txt"), b"world").await.unwrap();
        (store, root, source)
    }

    #[tokio::test]
    async fn duplicate_snapshots_double_theoretical_but_not_store_size() {
        let dir = tempfile::tempdir().unwrap();
        let (store, root, source) = setup(&dir).await;
        let builder = SnapshotBuilder::new(&store, &root);

        let mut catalog = BackupCatalog::load(root.join("backups.json")).await.unwrap();
        catalog.append(builder.create(&source, "one", true).await.unwrap());
        catalog.append(builder.create(&source, "two", true).await.unwrap());

        let stats = StatsCalculator::new(&store, &catalog).compute().await.unwrap();
        assert_eq!(stats.snapshot_count, 2);
        assert_eq!(stats.dedup_snapshot_count, 2);
        assert_eq!(stats.total_logical_files, 4);
        assert_eq!(stats.theoretical_size_bytes, 20);
        assert_eq!(stats.store_size_bytes, 10);
        assert_eq!(stats.saved_bytes, 10);
        assert!((stats.saved_percent - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn legacy_snapshots_are_counted_but_not_measured() {
        let dir = tempfile::tempdir().unwrap();
        let (store, root, source) = setup(&dir).await;
        let builder = SnapshotBuilder::new(&store, &root);

        let mut catalog = BackupCatalog::load(root.join("backups.json")).await.unwrap();
        catalog.append(builder.create(&source, "full copy", false).await.unwrap());

        let stats = StatsCalculator::new(&store, &catalog).compute().await.unwrap();
        assert_eq!(stats.snapshot_count, 1);
        assert_eq!(stats.dedup_snapshot_count, 0);
        assert_eq!(stats.total_logical_files, 0);
        assert_eq!(stats.theoretical_size_bytes, 0);
        assert_eq!(stats.saved_percent, 0.0);
    }
}
