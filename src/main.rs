//! Main entry point for the Common Ground matchmaking service
//!
//! This is the production entry point that initializes and runs the
//! complete matchmaking service with proper error handling, logging,
//! and graceful shutdown.

use anyhow::Result;
use clap::Parser;
use common_ground::config::AppConfig;
use common_ground::server;
use common_ground::service::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Common Ground Matchmaking Service - interest-overlap pairing and chat relay
#[derive(Parser)]
#[command(
    name = "common-ground",
    version,
    about = "A real-time matchmaking service pairing users by interest overlap",
    long_about = "Common Ground is a Rust-based matchmaking service that registers user \
                 connections over WebSocket, queues waiting users with their declared \
                 interests, pairs them with an overlap-scoring algorithm, and relays \
                 direct messages and typing indicators between matched peers."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Bind port override
    #[arg(short, long, value_name = "PORT", help = "Override server bind port")]
    port: Option<u16>,

    /// Match score threshold override
    #[arg(
        long,
        value_name = "SCORE",
        help = "Override the minimum overlap score a pairing must exceed"
    )]
    score_threshold: Option<f64>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Common Ground Matchmaking Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Bind: {}", config.bind_address());
    info!(
        "   Score threshold: {}",
        config.matching.score_threshold
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    // Start with file- or environment-based config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(threshold) = args.score_threshold {
        config.matching.score_threshold = threshold;
    }

    common_ground::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    // Display startup information
    display_startup_banner(&config);

    // Initialize application state
    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    // Start background services
    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let app_state = Arc::new(app_state);

    info!("✅ Common Ground Matchmaking Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    // Serve until a shutdown signal arrives
    if let Err(e) = server::serve(app_state.clone(), wait_for_shutdown_signal()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    // Begin graceful shutdown
    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    let shutdown_timeout = config.shutdown_timeout();
    let shutdown_future = async {
        match Arc::try_unwrap(app_state) {
            Ok(mut state) => {
                if let Err(e) = state.shutdown().await {
                    warn!("Shutdown reported an error: {}", e);
                }
            }
            Err(state) => {
                // Another task still holds the state; stop accepting work and
                // let the process exit reclaim the rest.
                warn!("Application state still shared at shutdown");
                let stats = state.matchmaker().get_stats();
                info!("Final service statistics: {:?}", stats);
            }
        }
    };

    match tokio::time::timeout(shutdown_timeout, shutdown_future).await {
        Ok(()) => {
            info!("✅ Graceful shutdown completed successfully");
        }
        Err(_) => {
            warn!("⚠️  Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("🛑 Common Ground Matchmaking Service stopped");
    Ok(())
}
