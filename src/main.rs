use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod observability;
mod page;
mod rewrite;
mod server;

use config::Config;
use observability::{AccessLogger, MetricsCollector};
use server::RedirectServer;

#[derive(Parser, Debug)]
#[command(name = "version-redirect")]
#[command(about = "Rewrites stale versioned application URLs to the installed version")]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    #[arg(short, long)]
    validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting version redirect service");

    // Load configuration
    let config = Config::load(&args.config).await?;

    if args.validate_config {
        info!("Configuration is valid");
        return Ok(());
    }

    // Initialize components
    let metrics_collector = Arc::new(MetricsCollector::new(&config.metrics)?);
    let logger = Arc::new(AccessLogger::new(&config.logging)?);

    let redirect_server = Arc::new(RedirectServer::new(
        config.clone(),
        metrics_collector.clone(),
        logger,
    )?);

    // Start metrics server if enabled
    let metrics_task = if config.metrics.enabled {
        let metrics_collector = metrics_collector.clone();
        let metrics_config = config.metrics.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = metrics_collector.start_server(&metrics_config).await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start the main server
    let host = config.server.host.clone();
    let port = config.server.port;

    let server_task = tokio::spawn(async move {
        if let Err(e) = redirect_server.start().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        current_version = %config.redirect.current_version,
        document_root = %config.redirect.document_root,
        "Redirect service started"
    );
    info!("Server listening on {}:{}", host, port);

    // Handle shutdown gracefully
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = server_task => {
            error!("Main server task exited unexpectedly");
        }
    }

    if let Some(metrics_task) = metrics_task {
        metrics_task.abort();
    }

    info!("Version redirect service shutdown complete");
    Ok(())
}
