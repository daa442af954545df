//! records-api - CRUD HTTP facade over a Supabase `records` table
//!
//! Serves health, metrics and records endpoints. Request metrics go to a
//! Prometheus registry when the native backend is enabled and fall back to
//! in-process JSON aggregates otherwise.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use records_api::{
    api::ApiServer,
    config::{ConfigManager, LogFormat, LoggingConfig},
    data::{ClientHandle, SupabaseRecordsRepository},
    metrics::Metrics,
    ShutdownCoordinator,
};

/// CLI arguments for records-api
#[derive(Parser, Debug)]
#[command(name = "records-api")]
#[command(about = "CRUD HTTP API over a Supabase records table")]
#[command(version)]
#[command(long_about = "
records-api - CRUD HTTP API over a Supabase records table

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  HOST                       - Bind host (e.g., 0.0.0.0)
  APP_PORT                   - Bind port (e.g., 3001)
  LOG_LEVEL                  - Log level (trace, debug, info, warn, error)
  CORS_ALLOW_ORIGINS         - Comma separated origins, or *
  SUPABASE_URL               - Project URL
  SUPABASE_SERVICE_ROLE_KEY  - Service role key (preferred)
  SUPABASE_ANON_KEY          - Anon key (used when no service role key is set)
  SUPABASE_SCHEMA            - Database schema (default: public)
  SUPABASE_TABLE             - Records table (default: records)
  METRICS_NATIVE_BACKEND     - Use the Prometheus backend (true/false)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 0.0.0.0:3001)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Log output format
    #[arg(long, help = "Log format (json or pretty)")]
    pub log_format: Option<String>,

    /// Serve metrics from the in-process JSON store only
    #[arg(long, help = "Disable the Prometheus metrics backend")]
    pub no_native_metrics: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Priority: CLI args > environment > config file > defaults
    let mut config = ConfigManager::load(&args.config)?;

    let log_format = args
        .log_format
        .as_deref()
        .map(str::parse::<LogFormat>)
        .transpose()?;
    let log_level = if args.verbose {
        Some("debug")
    } else {
        args.log_level.as_deref()
    };
    config.merge_with_cli_args(
        args.bind.as_deref(),
        args.port,
        log_level,
        log_format,
        args.no_native_metrics,
    )?;

    init_tracing(&config.logging)?;
    info!("Configuration loaded from {}", ConfigManager::source(&args.config));

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("Configuration summary:");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  CORS origins: {}", config.server.cors_allow_origins.join(", "));
        info!(
            "  Shutdown timeout: {}",
            humantime::format_duration(config.server.shutdown_timeout)
        );
        info!(
            "  Supabase: {}",
            if config.supabase.is_configured() {
                "configured"
            } else {
                "not configured"
            }
        );
        info!("  Schema/table: {}.{}", config.supabase.schema, config.supabase.table);
        info!(
            "  Native metrics backend: {}",
            if config.metrics.native_backend {
                "enabled"
            } else {
                "disabled"
            }
        );
        return Ok(());
    }

    info!(
        "Starting records-api v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.server.bind_addr
    );

    let metrics = Arc::new(Metrics::with_config(&config.metrics));
    info!("Metrics backend: {}", metrics.mode().as_str());

    if !config.supabase.is_configured() {
        warn!("Supabase is not configured; record endpoints will return configuration errors");
    }
    let client = Arc::new(ClientHandle::new(config.supabase.clone()));
    let store = Arc::new(SupabaseRecordsRepository::new(client.clone()));

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let server = ApiServer::new(
        config.server.bind_addr,
        metrics,
        store,
        config.server.cors_allow_origins.clone(),
    );
    let mut server_handle = tokio::spawn(server.start(shutdown_coordinator.subscribe()));

    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    let server_exit = tokio::select! {
        result = shutdown_coordinator.listen_for_signals() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
            }
            None
        }
        result = &mut server_handle => Some(result),
    };

    if let Some(result) = server_exit {
        client.close();
        return match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow::anyhow!("Server task failed: {}", e)),
        };
    }

    info!("Initiating graceful shutdown...");
    shutdown_coordinator.drain(server_handle).await;

    client.close();
    info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init(),
    }
    .context("Failed to initialize tracing")?;

    Ok(())
}
