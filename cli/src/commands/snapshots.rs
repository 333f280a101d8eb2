use anyhow::{Result, anyhow};
use clap::Args;
use saveguard_core::{BackupManager, SnapshotKind};
use std::path::Path;

#[derive(Args)]
pub struct SnapshotsCommand {
    #[arg(long, help = "Output format (table, json)")]
    format: Option<String>,
}

impl SnapshotsCommand {
    pub async fn run(&self, manager: &BackupManager) -> Result<()> {
        let snapshots = manager.list_snapshots().await?;

        if snapshots.is_empty() {
            println!("No snapshots found");
            return Ok(());
        }

        match self.format.as_deref().unwrap_or("table") {
            "table" => {
                println!("{:<28} {:<8} {:<30} {}", "Date", "Mode", "Name", "Path");
                println!("{:-<100}", "");
                for snapshot in snapshots {
                    let mode = match snapshot.kind {
                        SnapshotKind::Dedup => "dedup",
                        SnapshotKind::Legacy => "legacy",
                    };
                    println!(
                        "{:<28} {:<8} {:<30} {}",
                        snapshot.created_at,
                        mode,
                        snapshot.name,
                        snapshot.storage_path.display()
                    );
                }
            }
            "json" => {
                println!("{}", serde_json::to_string_pretty(&snapshots)?);
            }
            other => {
                return Err(anyhow!("Unsupported format: {other}"));
            }
        }

        Ok(())
    }
}

pub async fn run_delete(manager: &BackupManager, path: &Path) -> Result<()> {
    let name = manager.delete_backup(path).await?;
    println!("Deleted backup: {name}");
    Ok(())
}

pub async fn run_rename(manager: &BackupManager, path: &Path, new_name: &str) -> Result<()> {
    let old_name = manager.rename_backup(path, new_name).await?;
    println!("Renamed backup: {old_name} -> {new_name}");
    Ok(())
}

pub async fn run_duplicate(manager: &BackupManager, path: &Path) -> Result<()> {
    let copy = manager.duplicate_backup(path).await?;
    println!("Duplicated backup: {}", copy.name);
    println!("  Path: {}", copy.storage_path.display());
    Ok(())
}
