//! Exprdle Game Server
//!
//! Serves expression-guessing games over WebSocket.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use exprdle::{
    VERSION,
    network::server::{GameServer, ServerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid server configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Exprdle Server v{}", VERSION);
    info!(
        "Rules: {} characters, {} attempts",
        config.game.expression_length, config.game.max_attempts
    );

    let server = std::sync::Arc::new(
        GameServer::from_config(config).context("failed to initialise game server")?,
    );

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await.context("game server failed")?;
    info!("Server stopped");
    Ok(())
}
