use asset_registry::config::DEFAULT_CONFIG_FILE;
use asset_registry::core::split::{GeocodingOutcome, Resolution, SplitReport};
use asset_registry::domain::model::Id;
use asset_registry::utils::{logger, validation::Validate};
use asset_registry::{AppConfig, GeocodioClient, LocationSplitter, SnapshotStore, SplitOptions};
use clap::Parser;

#[derive(Parser)]
#[command(name = "regenerate-locations")]
#[command(about = "Split a Location wrongly shared by several assets back into per-asset Locations")]
struct Args {
    /// ID of the overloaded Location
    location_id: Id,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Report what would change without saving anything
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Regenerating locations for Location {}", args.location_id);
    tracing::info!("📁 Loading configuration from: {}", args.config);

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

    let store = SnapshotStore::from_config(&config.storage);
    let registry = store.load_registry().await?;
    let geocoder = GeocodioClient::new(&config.geocoder)?;

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be saved");
    }

    let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::from(&config.repair));
    let result = splitter.split_location(args.location_id, args.dry_run).await;

    if !args.dry_run {
        if let Err(e) = store.save_registry(&registry).await {
            e.report("Failed to save registry snapshot");
            std::process::exit(e.exit_code());
        }
        tracing::info!("💾 Saved registry to {}", config.snapshot_path().display());
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            e.report("Location split failed");
            std::process::exit(e.exit_code());
        }
    };

    display_report(&report);

    println!(
        "✅ Handled {} of {} assets at Location {}",
        report.handled, report.total, report.location_id
    );
    Ok(())
}

fn display_report(report: &SplitReport) {
    for outcome in &report.outcomes {
        let resolution = match &outcome.resolution {
            Resolution::Matched(id) => format!("matched existing Location {id}"),
            Resolution::CreatedFromCoordinates(Some(id)) => {
                format!("new Location {id} from raw coordinates")
            }
            Resolution::CreatedFromCoordinates(None) => {
                "new Location from raw coordinates (not saved)".to_string()
            }
            Resolution::Unlinked => "unlinked, no usable location".to_string(),
            Resolution::FellBackToOriginal(id) => format!("kept on Location {id}"),
        };
        let geocoding = match outcome.geocoding {
            GeocodingOutcome::NotNeeded => "",
            GeocodingOutcome::Succeeded => ", re-geocoded",
            GeocodingOutcome::Failed => ", geocoding failed",
        };
        tracing::info!(
            "📍 Asset {} (raw asset {}): {}{}",
            outcome.asset_id,
            outcome.raw_asset_id,
            resolution,
            geocoding
        );
    }

    if !report.skipped.is_empty() {
        tracing::info!("⏭️ Skipped hidden assets: {:?}", report.skipped);
    }
}
