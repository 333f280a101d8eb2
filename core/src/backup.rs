use crate::catalog::Snapshot;
use crate::store::ContentStore;
use crate::types::{FileRecord, SnapshotKind, dir_timestamp, sanitize_name};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

const DEFAULT_NAME: &str = "Unnamed backup";

/// Walks a source tree and turns it into a snapshot: either per-file
/// records backed by the content store (dedup) or a full byte-for-byte
/// copy (legacy). The catalog entry is returned to the caller; persisting
/// it is the caller's job so that a snapshot only appears in the ledger
/// after its data is fully on disk.
pub struct SnapshotBuilder<'a> {
    store: &'a ContentStore,
    backup_root: &'a Path,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(store: &'a ContentStore, backup_root: &'a Path) -> Self {
        Self { store, backup_root }
    }

    pub async fn create(&self, source: &Path, name: &str, dedup: bool) -> Result<Snapshot> {
        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_NAME } else { name };

        let dir_name = format!("{}_{}", sanitize_name(name), dir_timestamp());
        self.build(source, name, self.backup_root.join(dir_name), dedup)
            .await
    }

    /// Same algorithm as `create` with an auto-generated name, for
    /// hotkey-style invocation without user-entered text.
    pub async fn quick_create(&self, source: &Path, dedup: bool) -> Result<Snapshot> {
        let timestamp = dir_timestamp();
        let name = format!("Quick backup {timestamp}");
        self.build(
            source,
            &name,
            self.backup_root.join(format!("quick_{timestamp}")),
            dedup,
        )
        .await
    }

    async fn build(
        &self,
        source: &Path,
        name: &str,
        storage_path: PathBuf,
        dedup: bool,
    ) -> Result<Snapshot> {
        if !fs::try_exists(source).await? {
            return Err(Error::SourceMissing {
                path: source.display().to_string(),
            });
        }

        let snapshot = if dedup {
            let records = self.collect_records(source).await?;
            let metadata_dir = storage_path.join("metadata");
            fs::create_dir_all(&metadata_dir).await?;
            let data = serde_json::to_vec_pretty(&records)?;
            fs::write(metadata_dir.join("files.json"), data).await?;

            info!(name, files = records.len(), "created dedup snapshot");
            Snapshot::new(name, storage_path, SnapshotKind::Dedup)
        } else {
            let data_dir = storage_path.join("data");
            let copied = copy_tree(source, &data_dir).await?;

            info!(name, files = copied, "created legacy snapshot");
            Snapshot::new(name, storage_path, SnapshotKind::Legacy)
        };

        Ok(snapshot)
    }

    /// Hashes and stores every file under `source`. An empty tree yields an
    /// empty record list, which is a valid backup.
    async fn collect_records(&self, source: &Path) -> Result<Vec<FileRecord>> {
        let mut records = Vec::new();

        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| Error::Other(format!("path outside source tree: {e}")))?;

            let data = fs::read(entry.path()).await?;
            let hash = self.store.put(&data).await?;

            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            let mtime = metadata
                .modified()?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            debug!(path = %relative.display(), hash = %hash, "recorded file");
            records.push(FileRecord {
                path: relative.to_string_lossy().into_owned(),
                hash,
                size: data.len() as u64,
                mtime,
            });
        }

        Ok(records)
    }
}

/// Copies a directory tree byte for byte, preserving file modification
/// times. Returns the number of files copied.
pub(crate) async fn copy_tree(source: &Path, target: &Path) -> Result<usize> {
    fs::create_dir_all(target).await?;
    let mut copied = 0;

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::Other(format!("path outside source tree: {e}")))?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).await?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(entry.path(), &dest).await?;

            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            if let Ok(modified) = metadata.modified() {
                set_file_mtime(&dest, modified)?;
            }
            copied += 1;
        }
    }

    Ok(copied)
}

pub(crate) fn set_file_mtime(path: &Path, mtime: SystemTime) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(mtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_source(root: &Path) {
        fs::create_dir_all(root.join("b")).await.unwrap();
        fs::write(root.join("a.txt"), b"hello").await.unwrap();
        fs::write(root.join("b").join("c.txt"), b"world").await.unwrap();
    }

    #[tokio::test]
    async fn dedup_create_records_every_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_source(&source).await;

        let store = ContentStore::new(dir.path().join("repository"));
        store.init().await.unwrap();
        let builder = SnapshotBuilder::new(&store, dir.path());

        let snapshot = builder.create(&source, "first", true).await.unwrap();
        assert_eq!(snapshot.kind, SnapshotKind::Dedup);
        assert_eq!(snapshot.name, "first");

        let records = snapshot.load_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.usage().await.unwrap().entries, 2);
    }

    #[tokio::test]
    async fn identical_contents_grow_the_store_by_distinct_hashes_only() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_source(&source).await;

        let store = ContentStore::new(dir.path().join("repository"));
        store.init().await.unwrap();
        let builder = SnapshotBuilder::new(&store, dir.path());

        builder.create(&source, "first", true).await.unwrap();
        builder.create(&source, "second", true).await.unwrap();
        assert_eq!(store.usage().await.unwrap().entries, 2);

        // Changing one file introduces exactly one new entry; the other
        // entry keeps being shared.
        fs::write(source.join("a.txt"), b"hello2").await.unwrap();
        builder.quick_create(&source, true).await.unwrap();
        assert_eq!(store.usage().await.unwrap().entries, 3);
    }

    #[tokio::test]
    async fn empty_source_is_a_valid_backup() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(&source).await.unwrap();

        let store = ContentStore::new(dir.path().join("repository"));
        store.init().await.unwrap();
        let builder = SnapshotBuilder::new(&store, dir.path());

        let snapshot = builder.create(&source, "empty", true).await.unwrap();
        assert!(snapshot.load_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_source_fails_before_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("repository"));
        store.init().await.unwrap();
        let builder = SnapshotBuilder::new(&store, dir.path());

        let result = builder
            .create(&dir.path().join("nope"), "doomed", true)
            .await;
        assert!(matches!(result, Err(Error::SourceMissing { .. })));
        assert_eq!(store.usage().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn legacy_create_copies_the_whole_tree() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_source(&source).await;

        let store = ContentStore::new(dir.path().join("repository"));
        store.init().await.unwrap();
        let builder = SnapshotBuilder::new(&store, dir.path());

        let snapshot = builder.create(&source, "old style", false).await.unwrap();
        assert_eq!(snapshot.kind, SnapshotKind::Legacy);

        let copied = fs::read(snapshot.data_dir().join("b").join("c.txt"))
            .await
            .unwrap();
        assert_eq!(copied, b"world");
        // Legacy mode never touches the content store.
        assert_eq!(store.usage().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn snapshot_directory_name_is_sanitized_and_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_source(&source).await;

        let store = ContentStore::new(dir.path().join("repository"));
        store.init().await.unwrap();
        let builder = SnapshotBuilder::new(&store, dir.path());

        let snapshot = builder.create(&source, "boss: one/two?", true).await.unwrap();
        let dir_name = snapshot
            .storage_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(dir_name.starts_with("boss onetwo_"));
        assert!(!dir_name.contains(':'));
        assert!(!dir_name.contains('/'));
    }
}
