use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use saveguard_core::{BackupManager, Snapshot, SnapshotKind};
use std::time::Duration;

#[derive(Args)]
pub struct BackupCommand {
    #[arg(long, help = "Backup name")]
    name: Option<String>,

    #[arg(long, help = "Full-copy snapshot, skipping deduplication for this run")]
    legacy: bool,
}

impl BackupCommand {
    pub async fn run(&self, manager: &BackupManager) -> Result<()> {
        let dedup = if self.legacy {
            false
        } else {
            manager.config().dedup_enabled
        };

        let pb = spinner("Creating backup...");
        let snapshot = manager
            .create_backup_with(self.name.as_deref().unwrap_or(""), dedup)
            .await?;
        pb.finish_and_clear();

        print_summary(&snapshot);
        Ok(())
    }
}

pub async fn run_quick(manager: &BackupManager) -> Result<()> {
    let pb = spinner("Creating quick backup...");
    let snapshot = manager.quick_backup().await?;
    pb.finish_and_clear();

    print_summary(&snapshot);
    Ok(())
}

fn print_summary(snapshot: &Snapshot) {
    println!("Backup created: {}", snapshot.name);
    println!("  Date: {}", snapshot.created_at);
    println!("  Path: {}", snapshot.storage_path.display());
    println!(
        "  Mode: {}",
        match snapshot.kind {
            SnapshotKind::Dedup => "deduplicated",
            SnapshotKind::Legacy => "full copy",
        }
    );
}

pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}
