//! Paygate gateway server
//!
//! Wires the stores, the plugin registries and the HTTP surface
//! together. Plugins are registered explicitly here and reconciled with
//! their persisted mirrors before the listener opens; any mismatch
//! aborts startup.

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paygate_api::{create_router, AppState};
use paygate_core::channels::alfabank::{
    AlfaBankChannelFactory, ALFABANK_CHANNEL_ID, ALFABANK_CHANNEL_KEY,
};
use paygate_core::{
    CardInstrument, PluginRegistry, TransactionService, VisaMasterRouterFactory,
    CARD_INSTRUMENT_ID, CARD_INSTRUMENT_KEY, VISAMASTER_ROUTER_ID, VISAMASTER_ROUTER_KEY,
};
use paygate_store::Stores;

use crate::config::ServerConfig;

/// Paygate - card payment gateway
#[derive(Parser, Debug)]
#[command(name = "paygate-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "PAYGATE_CONFIG", default_value = "./paygate.yml")]
    config: String,

    /// Override the bind port
    #[arg(short, long, env = "PAYGATE_PORT")]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long, env = "PAYGATE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(&args.config)?;
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(level) = args.log_level {
        server_config.logging.level = level;
    }

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config,
        "starting paygate"
    );

    let stores = init_stores(&server_config.database).await?;

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(
            server_config.http_client.connect_timeout_secs,
        ))
        .timeout(Duration::from_secs(server_config.http_client.timeout_secs))
        .build()?;

    let registry = build_registry(&server_config, &stores, http)?;
    registry
        .reconcile(&*stores.channels, &*stores.instruments, &*stores.routers)
        .await
        .map_err(|e| anyhow::anyhow!("plugin reconciliation failed: {e}"))?;

    tracing::info!("plugin registries reconciled");

    let registry = Arc::new(registry);
    let service = TransactionService::new(stores.clone(), registry);
    let state = Arc::new(AppState::new(stores, service));
    let app = create_router(state);

    let addr = server_config.server.socket_addr()?;
    tracing::info!(addr = %addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_logging(config: &config::LoggingSettings) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber.with(fmt::layer().with_target(true)).init();
        }
    }

    Ok(())
}

async fn init_stores(config: &config::DatabaseSettings) -> anyhow::Result<Stores> {
    if config.dsn.is_empty() {
        tracing::warn!("no database dsn configured, using in-memory stores");
        return Ok(Stores::in_memory());
    }

    tracing::info!("connecting to database");
    let pool = paygate_store::postgres::connect(&config.dsn, config.max_connections).await?;
    paygate_store::postgres::migrate(&pool).await?;
    tracing::info!("database ready");

    Ok(Stores::postgres(pool))
}

fn build_registry(
    config: &ServerConfig,
    stores: &Stores,
    http: reqwest::Client,
) -> anyhow::Result<PluginRegistry> {
    let registry = PluginRegistry::builder()
        .bank_channel(
            ALFABANK_CHANNEL_ID,
            ALFABANK_CHANNEL_KEY,
            Arc::new(AlfaBankChannelFactory::new(
                http,
                config.acquirer.base_url.clone(),
                stores.sessions.clone(),
                stores.transactions.clone(),
            )),
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .instrument(
            CARD_INSTRUMENT_ID,
            CARD_INSTRUMENT_KEY,
            Arc::new(CardInstrument::new(stores.cards.clone())),
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .router(
            VISAMASTER_ROUTER_ID,
            VISAMASTER_ROUTER_KEY,
            Arc::new(VisaMasterRouterFactory::new(stores.accounts.clone())),
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .build();

    Ok(registry)
}

/// Wait for Ctrl+C or SIGTERM, then allow in-flight requests to finish.
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received ctrl+c, shutting down");
        }
        _ = terminate => {
            tracing::info!("received sigterm, shutting down");
        }
    }

    tracing::info!(
        timeout_secs = timeout.as_secs(),
        "waiting for in-flight requests"
    );
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["paygate-server", "--port", "9000"]);
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.config, "./paygate.yml");
    }
}
