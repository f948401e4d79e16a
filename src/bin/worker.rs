use anyhow::Result;
use clap::Parser;

use datadock::config::AppConfig;
use datadock::http::app_server::{AppServer, AppState};

#[derive(Parser)]
#[command(name = "datadock-worker", about = "Datadock CSV ingest worker")]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Datadock ingest worker");

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    tracing::info!(storage_root = %config.storage.root, "Configuration loaded");

    let app = AppServer::worker(AppState::from_config(&config));

    let addr = format!("{}:{}", config.worker.host, config.worker.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Worker listening on {}", addr);

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown())
        .await?;

    tracing::info!("Worker shutdown complete");

    Ok(())
}

async fn shutdown() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping worker...");
}
