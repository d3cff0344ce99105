use billboard_backend::server::config::ServerConfig;
use billboard_backend::server::core_services::CoreServices;
use billboard_backend::server::logging::init_logging;
use billboard_backend::version::VERSION;
use billboard_backend::web::{AppState, create_router};

use axum::http::HeaderValue;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = ServerConfig::load(args.config.as_deref())?;
    init_logging(&config.log_dir, "server.log");
    info!("Starting billboard server, version: {}", VERSION);

    let Some(jwt_secret) = config.jwt_secret.clone() else {
        error!("JWT_SECRET must be set to serve the admin API.");
        return Err("JWT_SECRET is not set".into());
    };

    let services = match CoreServices::build(&config).await {
        Ok(services) => services,
        Err(e) => {
            error!(error = %e, "Failed to start core services.");
            return Err(e.into());
        }
    };

    let periodic_handle = config.sweep_interval().map(|period| {
        let sweep = services.sweep.clone();
        tokio::spawn(async move { sweep.start_periodic(period).await })
    });
    if periodic_handle.is_none() {
        info!("No sweep interval configured; reminders run only when triggered.");
    }

    let allowed_origin = match config.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => Some(origin),
        Some(Err(e)) => {
            warn!(error = %e, "Ignoring unusable FRONTEND_URL; allowing any origin.");
            None
        }
        None => None,
    };

    let app_state = Arc::new(AppState {
        sweep: services.sweep.clone(),
        jwt_secret,
    });
    let router = create_router(app_state, allowed_origin);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "HTTP server listening.");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal.");
            }
            info!("Shutdown signal received.");
        })
        .await?;

    if let Some(handle) = periodic_handle {
        handle.abort();
    }
    if let Err(e) = services.shutdown().await {
        warn!(error = %e, "Failed to close the contract store cleanly.");
    }
    info!("Server stopped.");
    Ok(())
}
