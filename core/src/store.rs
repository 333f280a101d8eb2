use crate::types::ContentHash;
use crate::{Error, Result};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const TMP_SUFFIX: &str = "tmp";

/// Flat repository of unique file contents, one file per distinct hash.
///
/// Entries are written to a temporary name and renamed into place, so a
/// crash mid-write never leaves a truncated blob under its final hash-named
/// path. Entries are never deleted; snapshots may share them freely.
pub struct ContentStore {
    root: PathBuf,
}

/// Aggregate size of the store, used by the stats calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreUsage {
    pub entries: u64,
    pub bytes: u64,
}

impl ContentStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.as_str())
    }

    /// Stores `data` under its content hash. Idempotent: if the entry
    /// already exists the bytes are not rewritten.
    pub async fn put(&self, data: &[u8]) -> Result<ContentHash> {
        let hash = ContentHash::from_data(data);
        let path = self.entry_path(&hash);

        if fs::try_exists(&path).await? {
            return Ok(hash);
        }

        let tmp = path.with_extension(TMP_SUFFIX);
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;

        debug!(hash = %hash, bytes = data.len(), "stored new content entry");
        Ok(hash)
    }

    pub async fn get(&self, hash: &ContentHash) -> Result<Bytes> {
        match fs::read(self.entry_path(hash)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobMissing {
                hash: hash.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, hash: &ContentHash) -> bool {
        fs::try_exists(self.entry_path(hash)).await.unwrap_or(false)
    }

    pub async fn size_of(&self, hash: &ContentHash) -> Result<u64> {
        match fs::metadata(self.entry_path(hash)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobMissing {
                hash: hash.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Scans the store directory, skipping temporary files left by an
    /// interrupted write.
    pub async fn usage(&self) -> Result<StoreUsage> {
        let mut usage = StoreUsage::default();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(usage),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == TMP_SUFFIX) {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                usage.entries += 1;
                usage.bytes += meta.len();
            }
        }

        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.init().await.unwrap();

        let hash = store.put(b"hello").await.unwrap();
        assert!(store.exists(&hash).await);
        assert_eq!(store.get(&hash).await.unwrap().as_ref(), b"hello");
        assert_eq!(store.size_of(&hash).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn put_is_idempotent_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.init().await.unwrap();

        let first = store.put(b"same bytes").await.unwrap();
        let second = store.put(b"same bytes").await.unwrap();
        assert_eq!(first, second);

        let usage = store.usage().await.unwrap();
        assert_eq!(usage.entries, 1);
        assert_eq!(usage.bytes, 10);

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![first.to_string()]);
    }

    #[tokio::test]
    async fn missing_entry_reports_blob_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.init().await.unwrap();

        let absent = ContentHash::from_data(b"never stored");
        assert!(!store.exists(&absent).await);
        assert!(matches!(
            store.get(&absent).await,
            Err(Error::BlobMissing { .. })
        ));
        assert!(matches!(
            store.size_of(&absent).await,
            Err(Error::BlobMissing { .. })
        ));
    }
}
