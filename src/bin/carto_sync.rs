use asset_registry::config::DEFAULT_CONFIG_FILE;
use asset_registry::core::carto::{CartoField, CartoRecord, CartoSql};
use asset_registry::domain::model::Id;
use asset_registry::utils::error::Result;
use asset_registry::utils::{logger, validation::Validate};
use asset_registry::{AppConfig, CartoClient, InMemoryRegistry, SnapshotStore};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "carto-sync")]
#[command(about = "Publish registry assets to the Carto asset table")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: String,

    /// Print the SQL instead of sending it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Insert assets as new Carto rows
    Push {
        #[arg(required = true)]
        asset_ids: Vec<Id>,
    },
    /// Rewrite existing Carto rows from the registry
    Update {
        #[arg(required = true)]
        asset_ids: Vec<Id>,
    },
    /// Remove one asset's row
    Delete { asset_id: Id },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

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

    let registry = SnapshotStore::from_config(&config.storage)
        .load_registry()
        .await?;
    let sql = CartoSql::new(config.carto.table_name.clone());

    let statements = match build_statements(&registry, &sql, &args.command).await {
        Ok(statements) => statements,
        Err(e) => {
            e.report("Could not build Carto statements");
            std::process::exit(e.exit_code());
        }
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - SQL is printed, not sent");
        for statement in &statements {
            println!("{statement}");
        }
        return Ok(());
    }

    let client = match CartoClient::new(&config.carto) {
        Ok(client) => client,
        Err(e) => {
            e.report("Carto client setup failed");
            std::process::exit(e.exit_code());
        }
    };

    for statement in &statements {
        if let Err(e) = client.execute(statement).await {
            e.report("Carto query failed");
            std::process::exit(e.exit_code());
        }
    }

    tracing::info!("✅ Sent {} statements to Carto", statements.len());
    Ok(())
}

async fn build_statements(
    registry: &InMemoryRegistry,
    sql: &CartoSql,
    command: &Command,
) -> Result<Vec<String>> {
    match command {
        Command::Push { asset_ids } => {
            let mut records = Vec::with_capacity(asset_ids.len());
            for id in asset_ids {
                records.push(CartoRecord::load(registry, *id).await?);
            }
            Ok(vec![sql.insert_statement(&records, &CartoField::ALL)?])
        }
        Command::Update { asset_ids } => {
            let mut statements = Vec::with_capacity(asset_ids.len());
            for id in asset_ids {
                let record = CartoRecord::load(registry, *id).await?;
                statements.push(sql.update_statement(&record, &CartoField::ALL)?);
            }
            Ok(statements)
        }
        Command::Delete { asset_id } => Ok(vec![sql.delete_statement(*asset_id)?]),
    }
}
