pub mod backup;
pub mod catalog;
pub mod config;
pub mod error;
pub mod hooks;
pub mod manager;
pub mod restore;
pub mod stats;
pub mod store;
pub mod types;

pub use catalog::{BackupCatalog, Snapshot};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use manager::BackupManager;
pub use types::*;
