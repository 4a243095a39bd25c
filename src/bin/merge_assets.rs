use std::path::PathBuf;

use asset_registry::config::DEFAULT_CONFIG_FILE;
use asset_registry::utils::logger;
use asset_registry::utils::validation::{validate_file_extensions, Validate};
use asset_registry::{AppConfig, MergeMode, MergeUploader, SnapshotStore};
use clap::Parser;

#[derive(Parser)]
#[command(name = "merge-assets")]
#[command(about = "Merge raw assets into assets as described by a CSV file")]
struct Args {
    /// CSV file with id, ids_to_merge, asset_id, name, asset_type, tags and address columns
    file: PathBuf,

    /// Only report what would change
    #[arg(long)]
    validate: bool,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    let mode = if args.validate {
        MergeMode::Validate
    } else {
        MergeMode::Update
    };
    tracing::info!("🚀 Merging assets from {} ({:?})", args.file.display(), mode);

    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            e.report("Failed to load configuration");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        e.report("Configuration validation failed");
        std::process::exit(1);
    }

    let file_name = args.file.to_string_lossy().into_owned();
    if let Err(e) = validate_file_extensions("file", &[file_name], &["csv"]) {
        e.report("Unsupported merge file");
        std::process::exit(e.exit_code());
    }

    let data = tokio::fs::read(&args.file).await?;
    let store = SnapshotStore::from_config(&config.storage);
    let registry = store.load_registry().await?;

    let report = match MergeUploader::new(&registry).process(&data, mode).await {
        Ok(report) => report,
        Err(e) => {
            e.report("Merge failed");
            std::process::exit(e.exit_code());
        }
    };

    for message in &report.messages {
        println!("{message}");
    }

    if mode == MergeMode::Update {
        if let Err(e) = store.save_registry(&registry).await {
            e.report("Failed to save registry snapshot");
            std::process::exit(e.exit_code());
        }
        tracing::info!("💾 Saved registry to {}", config.snapshot_path().display());
    }

    if report.aborted {
        eprintln!("❌ Merge aborted after {} rows", report.rows_processed);
        std::process::exit(1);
    }

    println!("✅ Processed {} rows", report.rows_processed);
    Ok(())
}
