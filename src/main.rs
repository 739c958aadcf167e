//! Trento Web - environment and node topology for SAP infrastructure
//!
//! This application serves the environment/node topology discovered through
//! Consul, with health filtering, filter vocabularies and per-node check
//! reports.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use config::LogFormat;
use trento_web::{
    api, config,
    services::{AgentClient, Backend, ConsulClient},
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    // Check for --help flag
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    // Check for --version flag
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Trento Web {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if let Some(pos) = args.iter().position(|arg| arg == "--write-config") {
        let path = args
            .get(pos + 1)
            .map(PathBuf::from)
            .context("--write-config requires a path")?;
        AppConfig::create_default_config(&path)
            .with_context(|| format!("Failed to write configuration to {:?}", path))?;
        println!("Default configuration written to {:?}", path);
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must outlive the server so file logs get flushed
    let _log_guard = init_logging(&config);

    info!("Trento Web starting up");
    info!("Configuration loaded successfully");

    info!("Initializing Consul client: {}", config.consul.url);
    let consul = Arc::new(
        ConsulClient::new(&config.consul).context("Failed to initialize Consul client")?,
    );

    let agent = AgentClient::new(&config.checks).context("Failed to initialize check agent client")?;
    match config.checks.service_name {
        Some(ref service) => info!("Check endpoints resolved through service '{}'", service),
        None => info!("Check endpoints on port {}", config.checks.port),
    }

    let backend = Backend::from_consul(consul, agent)
        .with_health_concurrency(config.topology.health_concurrency);
    info!(
        "Health lookups limited to {} concurrent requests",
        backend.health_concurrency()
    );

    let state = AppState {
        config: config.clone(),
        backend,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server is ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Trento Web stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize logging based on configuration
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Compact => subscriber
            .with(fmt::layer().compact().with_target(false))
            .init(),
        LogFormat::Pretty => subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
    }
}

fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_target(true).with_writer(writer))
            .init(),
        LogFormat::Compact => subscriber
            .with(fmt::layer().compact().with_target(false).with_writer(writer))
            .init(),
        LogFormat::Pretty => subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .init(),
    }
}

fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_target(true)) // Console
            .with(fmt::layer().json().with_target(true).with_writer(writer)) // File
            .init(),
        LogFormat::Compact => subscriber
            .with(fmt::layer().compact().with_target(false)) // Console
            .with(fmt::layer().compact().with_target(false).with_writer(writer)) // File
            .init(),
        LogFormat::Pretty => subscriber
            .with(fmt::layer().with_target(true)) // Console
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer),
            ) // File
            .init(),
    }
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    api::router(state)
        .layer(CompressionLayer::new())
        .layer(trace_layer)
        .layer(cors)
}

/// Print help message
fn print_help() {
    println!(
        r#"Trento Web {}

USAGE:
    trento-web [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --write-config <PATH>   Write a configuration file with default values
                            to PATH and exit

ENVIRONMENT:
    TRENTO_CONFIG       Path to configuration file (default: config.yaml)
    TRENTO_HOST         Address to listen on
    TRENTO_PORT         Port to listen on
    CONSUL_HTTP_ADDR    Consul agent address (default: 127.0.0.1:8500)
    CONSUL_HTTP_TOKEN   Consul ACL token
    CONSUL_CACERT       CA bundle for Consul TLS
    TRENTO_CHECKS_PORT  Port of the per-node check agent (default: 8700)
    TRENTO_LOG_FORMAT   pretty, compact or json
    RUST_LOG            Log filter (overrides logging.level)

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by TRENTO_CONFIG environment variable
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/trento-web/config.yaml
    5. $XDG_CONFIG_HOME/trento-web/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
