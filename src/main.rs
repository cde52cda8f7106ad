//! vsp-aggregator - version 0.1.0
//!
//! Voting service aggregator with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use vsp_aggregator::cli::{Args, Commands};
use vsp_aggregator::commands::{command_config, command_providers, command_refresh};
use vsp_aggregator::config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_MAX_IDLE_PER_HOST, DEFAULT_PORT,
};
use vsp_aggregator::fetcher::HttpFetcher;
use vsp_aggregator::handlers::app_router;
use vsp_aggregator::refresher::{refresh_all, run_refresh_loop};
use vsp_aggregator::state::AppState;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("Logging initialized with level: {}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config { output, format } = command {
            return Ok(command_config(output.clone(), *format)?);
        }

        let config = load_validated_config(&args)?;
        setup_logging(&config);

        return match command {
            Commands::Refresh { provider } => Ok(command_refresh(config, provider.clone()).await?),
            Commands::Providers { network } => Ok(command_providers(&config, network.clone())?),
            Commands::Config { .. } => Ok(()),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    setup_logging(&config);

    info!("Starting vsp-aggregator");

    let bind_ip_str = config
        .bind
        .clone()
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let refresh_interval = config.refresh_interval();

    let fetcher = HttpFetcher::new(
        &config.user_agent(),
        config.max_idle_per_host.unwrap_or(DEFAULT_MAX_IDLE_PER_HOST),
    )?;
    debug!("HTTP client initialized with user agent {}", config.user_agent());

    let tls_paths = if config.enable_tls.unwrap_or(false) {
        // Both paths are present once validate_effective_config() has passed.
        config.tls_cert_path.clone().zip(config.tls_key_path.clone())
    } else {
        None
    };

    let state = AppState::new(config, Arc::new(fetcher))?.shared();
    info!("Tracking {} providers", state.providers.len());

    // Warm the store before accepting requests
    info!("Performing initial refresh cycle");
    refresh_all(&state).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_task = tokio::spawn(run_refresh_loop(
        state.clone(),
        refresh_interval,
        shutdown_rx,
    ));

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;
    let app = app_router(state.clone());
    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    let served: Result<(), Box<dyn std::error::Error>> = if let Some((cert_path, key_path)) =
        tls_paths
    {
        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!("vsp-aggregator listening on https://{}:{}", bind_ip_str, port);

        let server = axum_server::bind_rustls(addr, tls_config).serve(service);

        tokio::select! {
            result = server => result.map_err(|e| Box::new(e) as Box<dyn std::error::Error>),
            _ = shutdown_signal() => Ok(()),
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!("vsp-aggregator listening on http://{}:{}", bind_ip_str, port);

        axum::serve(listener, service)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    };

    // Stop scheduling refresh cycles; a cycle already running completes first.
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh_task.await {
        error!("Refresh loop terminated abnormally: {}", e);
    }

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("vsp-aggregator stopped gracefully");
    Ok(())
}
