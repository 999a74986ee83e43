// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use scan_gateway::api::{create_router, AppState};
use scan_gateway::config::{load_app_config, AppConfig, ConfigValidator};
use scan_gateway::health::HealthChecker;
use scan_gateway::metrics::MetricsCollector;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "scan-gateway")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "HTTP gateway for nmap and OpenVAS/GVM", long_about = None)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "SCAN_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_app_config(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.log_json {
        config.observability.log_json = true;
    }

    init_tracing(&config)?;

    for warning in ConfigValidator::generate_validation_report(&config).warnings {
        warn!("{}", warning);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("scan-gateway-worker")
        .enable_all()
        .build()?;

    info!("Tokio runtime initialized with {} worker threads", num_cpus::get());

    runtime.block_on(serve(config))
}

fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.observability.log_level))
        .context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.observability.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    info!("Scan Gateway v{} - Starting", env!("CARGO_PKG_VERSION"));
    info!(
        nmap = %config.scanner.nmap_path,
        engine_container = %config.engine.container_name,
        engine = %format!("{}:{}", config.engine.host, config.engine.port),
        "Configuration loaded"
    );

    let metrics = MetricsCollector::new(config.observability.metrics_enabled);
    let state = Arc::new(AppState::from_config(&config, metrics));

    let engine_configured = state.gvm.is_configured();
    if !engine_configured {
        warn!("GVM_PASSWORD is not set; engine endpoints will return 503");
    }

    let health = Arc::new(HealthChecker::new(env!("CARGO_PKG_VERSION").to_string()));
    health.refresh(&state.scanner, engine_configured).await;
    let health_task = health
        .clone()
        .start_periodic_checks(HEALTH_CHECK_INTERVAL, state.scanner.clone(), engine_configured);

    let app = create_router(state, health);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("[SUCCESS] Listening on {}", address);

    let server = axum::serve(listener, app);
    if config.server.graceful_shutdown {
        server
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;
    } else {
        server.await.context("Server error")?;
    }

    health_task.abort();
    info!("Scan Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
