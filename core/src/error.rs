use crate::types::RestoreReport;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Source directory not found: {path}")]
    SourceMissing { path: String },

    #[error("Snapshot not found: {path}")]
    SnapshotNotFound { path: String },

    #[error("No snapshots available")]
    NoSnapshots,

    #[error("Snapshot metadata file not found: {path}")]
    MetadataMissing { path: String },

    #[error("Snapshot metadata is corrupt: {path}")]
    MetadataCorrupt { path: String },

    #[error("Snapshot data directory not found: {path}")]
    DataMissing { path: String },

    #[error("Blob not found in content store: {hash}")]
    BlobMissing { hash: String },

    #[error(
        "Restore aborted: {}/{} records failed integrity checks",
        .report.corrupted_paths.len(),
        .report.total_records
    )]
    ExcessiveCorruption { report: RestoreReport },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
