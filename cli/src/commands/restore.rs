use super::backup::spinner;
use anyhow::Result;
use saveguard_core::{BackupManager, RestoreReport};
use std::path::Path;

pub async fn run(manager: &BackupManager, path: &Path) -> Result<()> {
    let pb = spinner("Restoring snapshot...");
    let report = manager.restore_backup(path).await?;
    pb.finish_and_clear();

    print_report(&report);
    Ok(())
}

pub async fn run_quick(manager: &BackupManager) -> Result<()> {
    let pb = spinner("Restoring latest snapshot...");
    let report = manager.quick_restore().await?;
    pb.finish_and_clear();

    print_report(&report);
    Ok(())
}

fn print_report(report: &RestoreReport) {
    println!("Restored {} files", report.restored_count);

    if !report.corrupted_paths.is_empty() {
        println!("  Corrupted (skipped): {}", report.corrupted_paths.len());
        for path in &report.corrupted_paths {
            println!("    {path}");
        }
    }
    if !report.missing_paths.is_empty() {
        println!("  Missing from store (skipped): {}", report.missing_paths.len());
        for path in &report.missing_paths {
            println!("    {path}");
        }
    }
    if !report.invalid_paths.is_empty() {
        println!("  Invalid paths (rejected): {}", report.invalid_paths.len());
        for path in &report.invalid_paths {
            println!("    {path}");
        }
    }
}
