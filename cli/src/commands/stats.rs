use anyhow::Result;
use saveguard_core::BackupManager;

pub async fn run(manager: &BackupManager) -> Result<()> {
    let stats = manager.storage_stats().await?;

    println!("Snapshots:        {} ({} deduplicated)", stats.snapshot_count, stats.dedup_snapshot_count);
    println!("Store size:       {}", format_size(stats.store_size_bytes as f64));
    println!("Logical files:    {}", stats.total_logical_files);
    println!("Without dedup:    {}", format_size(stats.theoretical_size_bytes as f64));
    println!(
        "Saved:            {} ({:.1}%)",
        format_size(stats.saved_bytes as f64),
        stats.saved_percent
    );
    Ok(())
}

fn format_size(mut size: f64) -> String {
    for unit in ["B", "KB", "MB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} GB")
}
