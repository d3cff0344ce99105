//! One-shot reminder sweep, for cron-style scheduling.

use billboard_backend::server::config::ServerConfig;
use billboard_backend::server::core_services::CoreServices;
use billboard_backend::server::logging::init_logging;
use billboard_backend::version::VERSION;

use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Print what would be sent for each active contract without sending anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = ServerConfig::load(args.config.as_deref())?;
    init_logging(&config.log_dir, "sweep.log");
    info!(version = VERSION, dry_run = args.dry_run, "Starting reminder sweep.");

    let services = CoreServices::build(&config).await?;

    let outcome = if args.dry_run {
        dry_run(&services).await
    } else {
        match services.sweep.run().await {
            Ok(summary) => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Reminder sweep failed.");
                Err(e.into())
            }
        }
    };

    services.shutdown().await?;
    outcome
}

async fn dry_run(services: &CoreServices) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let contracts = services.store.as_store().list_active_contracts().await?;
    let mut previews = Vec::with_capacity(contracts.len());
    for contract in contracts {
        if let Some(preview) = services.sweep.preview(contract.id).await? {
            previews.push(preview);
        }
    }
    println!("{}", serde_json::to_string_pretty(&previews)?);
    Ok(())
}
