mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{backup::BackupCommand, snapshots::SnapshotsCommand};
use config::AppConfig;
use saveguard_core::BackupManager;
use saveguard_core::hooks::{LogStatusSink, NoopLifecycle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(
    name = "saveguard",
    about = "Content-addressed backup for game save directories",
    long_about = "Saveguard snapshots a save directory into a deduplicating \
                  content store and restores any snapshot with integrity checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "SAVEGUARD_CONFIG", help = "Config file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new backup of the save directory")]
    Backup(BackupCommand),

    #[command(about = "Create a backup with an auto-generated name")]
    QuickBackup,

    #[command(about = "Restore a snapshot over the save directory")]
    Restore {
        #[arg(help = "Storage path of the snapshot to restore")]
        path: PathBuf,
    },

    #[command(about = "Restore the most recent snapshot")]
    QuickRestore,

    #[command(about = "List snapshots")]
    Snapshots(SnapshotsCommand),

    #[command(about = "Delete a snapshot (shared data is kept)")]
    Delete {
        #[arg(help = "Storage path of the snapshot to delete")]
        path: PathBuf,
    },

    #[command(about = "Rename a snapshot")]
    Rename {
        #[arg(help = "Storage path of the snapshot")]
        path: PathBuf,

        #[arg(help = "New snapshot name")]
        new_name: String,
    },

    #[command(about = "Duplicate a snapshot")]
    Duplicate {
        #[arg(help = "Storage path of the snapshot to duplicate")]
        path: PathBuf,
    },

    #[command(about = "Show storage statistics")]
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_path);
    let app_config = AppConfig::load_or_create(&config_path)?;

    let manager = BackupManager::new(
        app_config.engine_config()?,
        Arc::new(LogStatusSink),
        Arc::new(NoopLifecycle),
    )
    .await?;

    match cli.command {
        Commands::Backup(ref cmd) => cmd.run(&manager).await,
        Commands::QuickBackup => commands::backup::run_quick(&manager).await,
        Commands::Restore { ref path } => commands::restore::run(&manager, path).await,
        Commands::QuickRestore => commands::restore::run_quick(&manager).await,
        Commands::Snapshots(ref cmd) => cmd.run(&manager).await,
        Commands::Delete { ref path } => commands::snapshots::run_delete(&manager, path).await,
        Commands::Rename { ref path, ref new_name } => {
            commands::snapshots::run_rename(&manager, path, new_name).await
        }
        Commands::Duplicate { ref path } => {
            commands::snapshots::run_duplicate(&manager, path).await
        }
        Commands::Stats => commands::stats::run(&manager).await,
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "saveguard_core={level},saveguard_cli={level}"
        )))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default subscriber failed");
}
