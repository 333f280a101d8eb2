use crate::types::{FileRecord, SnapshotKind, ledger_timestamp};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// One backup instance as recorded in the ledger. Field names match the
/// persisted `backups.json` schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    #[serde(rename = "date")]
    pub created_at: String,
    #[serde(rename = "path")]
    pub storage_path: PathBuf,
    #[serde(rename = "type")]
    pub kind: SnapshotKind,
}

impl Snapshot {
    pub fn new(name: impl Into<String>, storage_path: PathBuf, kind: SnapshotKind) -> Self {
        Self {
            name: name.into(),
            created_at: ledger_timestamp(),
            storage_path,
            kind,
        }
    }

    /// Location of the per-file metadata list (dedup snapshots only).
    pub fn metadata_file(&self) -> PathBuf {
        self.storage_path.join("metadata").join("files.json")
    }

    /// Location of the full data copy (legacy snapshots only).
    pub fn data_dir(&self) -> PathBuf {
        self.storage_path.join("data")
    }

    /// Loads this snapshot's file records.
    ///
    /// A missing metadata file or an unparsable top level is fatal. A single
    /// record missing required fields (or carrying an invalid digest) is
    /// skipped with a warning; the remaining records are still usable.
    pub async fn load_records(&self) -> Result<Vec<FileRecord>> {
        let path = self.metadata_file();
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::MetadataMissing {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let values: Vec<serde_json::Value> =
            serde_json::from_slice(&raw).map_err(|_| Error::MetadataCorrupt {
                path: path.display().to_string(),
            })?;

        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<FileRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(snapshot = %self.name, error = %e, "skipping incomplete file record");
                }
            }
        }
        Ok(records)
    }
}

/// Persisted, ordered ledger of every known snapshot.
///
/// The ledger is a single JSON array; the whole file is rewritten on save
/// (temp file then rename). Entries are unique by storage path.
pub struct BackupCatalog {
    ledger_path: PathBuf,
    snapshots: Vec<Snapshot>,
}

impl BackupCatalog {
    /// Loads the ledger. A missing file is an empty catalog; a file that
    /// fails to parse is `MetadataCorrupt`, never silently empty.
    pub async fn load(ledger_path: PathBuf) -> Result<Self> {
        let snapshots = match fs::read(&ledger_path).await {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| {
                warn!(path = %ledger_path.display(), error = %e, "catalog ledger failed to parse");
                Error::MetadataCorrupt {
                    path: ledger_path.display().to_string(),
                }
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            ledger_path,
            snapshots,
        })
    }

    pub async fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.snapshots)?;
        let tmp = self.ledger_path.with_extension("json.tmp");
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &self.ledger_path).await?;
        Ok(())
    }

    pub fn append(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.storage_path == path)
    }

    pub fn remove(&mut self, path: &Path) -> Option<Snapshot> {
        let idx = self.snapshots.iter().position(|s| s.storage_path == path)?;
        Some(self.snapshots.remove(idx))
    }

    /// Renames a snapshot in place, returning the old name.
    pub fn rename(&mut self, path: &Path, new_name: &str) -> Option<String> {
        let snapshot = self.snapshots.iter_mut().find(|s| s.storage_path == path)?;
        let old = std::mem::replace(&mut snapshot.name, new_name.to_string());
        Some(old)
    }

    /// Snapshots ordered most recent first. `created_at` is fixed-width
    /// ISO-8601, so string order is chronological order.
    pub fn list(&self) -> Vec<&Snapshot> {
        let mut snapshots: Vec<_> = self.snapshots.iter().collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    /// The snapshot with the lexicographically greatest `created_at`.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.iter().max_by(|a, b| a.created_at.cmp(&b.created_at))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, date: &str, path: &str) -> Snapshot {
        Snapshot {
            name: name.to_string(),
            created_at: date.to_string(),
            storage_path: PathBuf::from(path),
            kind: SnapshotKind::Dedup,
        }
    }

    #[tokio::test]
    async fn missing_ledger_is_an_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = BackupCatalog::load(dir.path().join("backups.json"))
            .await
            .unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn corrupt_ledger_is_not_silently_emptied() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("backups.json");
        std::fs::write(&ledger, b"{ not json").unwrap();

        assert!(matches!(
            BackupCatalog::load(ledger).await,
            Err(Error::MetadataCorrupt { .. })
        ));
    }

    #[tokio::test]
    async fn save_and_reload_preserves_wire_format() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("backups.json");

        let mut catalog = BackupCatalog::load(ledger.clone()).await.unwrap();
        catalog.append(snapshot("first", "2026-01-01T00:00:00.000000Z", "/b/first_x"));
        catalog.save().await.unwrap();

        let text = std::fs::read_to_string(&ledger).unwrap();
        assert!(text.contains("\"type\": \"md5\""));
        assert!(text.contains("\"date\": \"2026-01-01T00:00:00.000000Z\""));

        let reloaded = BackupCatalog::load(ledger).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.list()[0].name, "first");
    }

    #[tokio::test]
    async fn list_orders_by_created_at_descending() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = BackupCatalog::load(dir.path().join("backups.json"))
            .await
            .unwrap();
        catalog.append(snapshot("old", "2026-01-01T00:00:00.000000Z", "/b/old"));
        catalog.append(snapshot("new", "2026-03-01T00:00:00.000000Z", "/b/new"));
        catalog.append(snapshot("mid", "2026-02-01T00:00:00.000000Z", "/b/mid"));

        let names: Vec<_> = catalog.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["new", "mid", "old"]);
        assert_eq!(catalog.latest().unwrap().name, "new");
    }

    #[tokio::test]
    async fn rename_returns_old_name_and_remove_drops_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = BackupCatalog::load(dir.path().join("backups.json"))
            .await
            .unwrap();
        catalog.append(snapshot("before", "2026-01-01T00:00:00.000000Z", "/b/one"));

        let old = catalog.rename(Path::new("/b/one"), "after").unwrap();
        assert_eq!(old, "before");
        assert_eq!(catalog.find_by_path(Path::new("/b/one")).unwrap().name, "after");

        let removed = catalog.remove(Path::new("/b/one")).unwrap();
        assert_eq!(removed.name, "after");
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn incomplete_records_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let snap_dir = dir.path().join("snap");
        std::fs::create_dir_all(snap_dir.join("metadata")).unwrap();
        std::fs::write(
            snap_dir.join("metadata").join("files.json"),
            r#"[
                {"path": "a.txt", "md5": "5d41402abc4b2a76b9719d911017c592", "size": 5, "mtime": 1.0},
                {"path": "broken.txt", "size": 5},
                {"path": "bad-digest.txt", "md5": "zz", "size": 1, "mtime": 1.0}
            ]"#,
        )
        .unwrap();

        let snap = Snapshot::new("s", snap_dir, SnapshotKind::Dedup);
        let records = snap.load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "a.txt");
    }

    #[tokio::test]
    async fn unparsable_metadata_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let snap_dir = dir.path().join("snap");
        std::fs::create_dir_all(snap_dir.join("metadata")).unwrap();
        std::fs::write(snap_dir.join("metadata").join("files.json"), b"{}").unwrap();

        let snap = Snapshot::new("s", snap_dir.clone(), SnapshotKind::Dedup);
        assert!(matches!(
            snap.load_records().await,
            Err(Error::MetadataCorrupt { .. })
        ));

        std::fs::remove_file(snap_dir.join("metadata").join("files.json")).unwrap();
        assert!(matches!(
            snap.load_records().await,
            Err(Error::MetadataMissing { .. })
        ));
    }
}
