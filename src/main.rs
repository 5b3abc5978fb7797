use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recap_server::{
    backend::GatewayClient,
    config::Config,
    server::{build_router, AppState},
    storage::SqliteStorage,
};

/// Tiered AI summarization service
#[derive(Debug, Parser)]
#[command(name = "recap-server", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "RECAP_BIND", default_value = "127.0.0.1:8787")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Recap server starting..."
    );

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Initialize gateway client
    let gateway = match GatewayClient::new(&config.gateway, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.gateway.base_url, "Gateway client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize gateway client");
            return Err(e.into());
        }
    };

    // Create application state (validates the model catalog)
    let state = Arc::new(AppState::new(config, storage, gateway)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    info!(bind = %cli.bind, "Server ready, accepting requests");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        recap_server::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        recap_server::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
