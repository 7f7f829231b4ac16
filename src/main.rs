use activity_snapshot::{init_telemetry, App, ImportMode, SnapshotConfig, TransferOutcome};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "activity-snapshot")]
#[command(about = "Export and import the activity record store as a single JSON snapshot")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,

    /// Record store data file
    #[arg(long, global = true, help = "JSON file holding the stored records")]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every stored record to <app>_backup_<millis>.json
    Export {
        /// Directory receiving the snapshot
        #[arg(long, help = "Directory to write the snapshot into")]
        output_dir: Option<PathBuf>,
    },
    /// Import a snapshot file into the record store
    Import {
        /// Snapshot produced by `export`
        file: PathBuf,
        /// Replace or merge the stored records
        #[arg(long, value_enum, help = "How imported records combine with stored ones")]
        mode: Option<ImportMode>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    SnapshotConfig::load_env_file()?;
    let mut config = SnapshotConfig::load(cli.config.as_deref())?;
    if let Some(data_file) = cli.data_file {
        config.storage.data_file = data_file;
    }

    init_telemetry(&config.observability)?;

    match cli.command {
        Commands::Export { output_dir } => {
            if let Some(output_dir) = output_dir {
                config.export.output_dir = output_dir;
            }
            tokio::runtime::Runtime::new()?.block_on(async { export_command(&config).await })
        }
        Commands::Import { file, mode } => {
            if let Some(mode) = mode {
                config.storage.import_mode = mode;
            }
            tokio::runtime::Runtime::new()?.block_on(async { import_command(&config, file).await })
        }
    }
}

async fn export_command(config: &SnapshotConfig) -> Result<()> {
    let app = App::from_config(config);
    let report = app.export().await?;

    match report.outcome {
        TransferOutcome::Succeeded if report.files.is_empty() => {
            bail!(
                "Snapshot could not be written to {}",
                config.export.output_dir.display()
            )
        }
        TransferOutcome::Succeeded => {
            for file in &report.files {
                println!("Exported records to {}", file.display());
            }
            Ok(())
        }
        TransferOutcome::Failed => match report.state.export_error {
            Some(e) => bail!("Export failed: {e}"),
            None => bail!("Export failed"),
        },
        TransferOutcome::Rejected => bail!("Another export is already running"),
    }
}

async fn import_command(config: &SnapshotConfig, file: PathBuf) -> Result<()> {
    let app = App::from_config(config);
    let report = app.import(&file).await?;

    match report.outcome {
        TransferOutcome::Succeeded => {
            println!(
                "Imported {} into {} ({:?} mode)",
                file.display(),
                config.storage.data_file.display(),
                config.storage.import_mode
            );
            println!("Activity views reloaded (generation {})", report.reload_generation);
            Ok(())
        }
        TransferOutcome::Failed => match report.state.import_error {
            Some(e) => bail!("Import failed: {e}"),
            None => bail!("Import failed"),
        },
        TransferOutcome::Rejected => bail!("Another import is already running"),
    }
}
