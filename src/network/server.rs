//! WebSocket Game Server
//!
//! Async WebSocket server for game connections.
//! Each text frame carries one JSON request and gets exactly one reply.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::game::service::{GameConfig, GameService};
use crate::game::target::{CorpusTargetProvider, TargetError, TargetProvider};
use crate::game::validator::ArithmeticValidator;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::router::Router;
use crate::store::MemoryStore;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Sessions idle this long are evicted.
    pub session_ttl: Duration,
    /// How often idle sessions are swept.
    pub sweep_interval: Duration,
    /// Target corpus file; the built-in corpus when unset.
    pub corpus_path: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Server version string.
    pub version: String,
    /// Game rules.
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60),
            corpus_path: None,
            log_level: "info".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            game: GameConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable holds an unusable value.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn non_zero(key: &str, value: &str, n: u64) -> Result<u64, ConfigError> {
    if n == 0 {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(n)
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("EXPRDLE_BIND_ADDR") {
            config.bind_addr = parse_var("EXPRDLE_BIND_ADDR", &v)?;
        }
        if let Some(v) = lookup("EXPRDLE_MAX_CONNECTIONS") {
            config.max_connections = parse_var("EXPRDLE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("EXPRDLE_SESSION_TTL_SECS") {
            let secs = non_zero("EXPRDLE_SESSION_TTL_SECS", &v, parse_var("EXPRDLE_SESSION_TTL_SECS", &v)?)?;
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("EXPRDLE_SWEEP_INTERVAL_SECS") {
            let secs = non_zero("EXPRDLE_SWEEP_INTERVAL_SECS", &v, parse_var("EXPRDLE_SWEEP_INTERVAL_SECS", &v)?)?;
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("EXPRDLE_CORPUS") {
            config.corpus_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("EXPRDLE_LOG") {
            config.log_level = v;
        }
        if let Some(v) = lookup("EXPRDLE_MAX_ATTEMPTS") {
            let n = non_zero("EXPRDLE_MAX_ATTEMPTS", &v, parse_var("EXPRDLE_MAX_ATTEMPTS", &v)?)?;
            config.game.max_attempts = n as usize;
        }

        Ok(config)
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(std::io::Error),

    /// Listener I/O failure after binding.
    #[error("Listener error: {0}")]
    Io(#[from] std::io::Error),

    /// Target corpus could not be loaded.
    #[error("Target corpus error: {0}")]
    Targets(#[from] TargetError),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
    /// Requests answered.
    requests: u64,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Request router.
    router: Arc<Router>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server around an existing router.
    pub fn new(config: ServerConfig, router: Arc<Router>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            router,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Create a server with an in-memory store and the configured corpus.
    pub fn from_config(config: ServerConfig) -> Result<Self, GameServerError> {
        let length = config.game.expression_length;
        let targets: Arc<dyn TargetProvider> = match &config.corpus_path {
            Some(path) => Arc::new(CorpusTargetProvider::from_file(path, length)?),
            None => Arc::new(CorpusTargetProvider::builtin(length)?),
        };

        let service = Arc::new(GameService::new(Arc::new(MemoryStore::new()), config.game.clone()));
        let router = Arc::new(Router::new(service, targets, Arc::new(ArithmeticValidator)));

        Ok(Self::new(config, router))
    }

    /// Bind the configured address and run until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(GameServerError::BindFailed)?;
        self.serve(listener).await
    }

    /// Run on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server v{} listening on {}", self.config.version, listener.local_addr()?);

        let sweep_router = self.router.clone();
        let ttl = self.config.session_ttl;
        let every = self.config.sweep_interval;
        let sweep_handle = tokio::spawn(async move {
            Self::run_sweep_loop(sweep_router, ttl, every).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                Self::reject_connection(stream, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        sweep_handle.abort();

        Ok(())
    }

    /// Tell an over-limit client why it is refused, then close.
    fn reject_connection(stream: TcpStream, addr: SocketAddr) {
        tokio::spawn(async move {
            let mut ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    debug!("Handshake with rejected client {} failed: {}", addr, e);
                    return;
                }
            };

            let reply = ServerMessage::error(ErrorCode::ServerOverloaded, "Server is at capacity");
            match reply.to_json() {
                Ok(text) => {
                    if let Err(e) = ws_stream.send(Message::Text(text)).await {
                        debug!("Failed to notify rejected client {}: {}", addr, e);
                    }
                }
                Err(e) => error!("Failed to serialize message: {}", e),
            }
            let _ = ws_stream.close(None).await;
        });
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let router = self.router.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                    requests: 0,
                });
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => router.handle(client_msg).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::error(ErrorCode::InvalidInput, "Invalid message format")
                                    }
                                };

                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                        client.requests += 1;
                                    }
                                }

                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::error(
                                    ErrorCode::InvalidInput,
                                    "Binary frames are not supported",
                                )).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong frames are answered by the protocol layer
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let the writer flush queued replies, then close
            drop(msg_tx);
            let _ = sender_task.await;

            // Remove client
            {
                let mut clients = clients.write().await;
                if let Some(client) = clients.remove(&addr) {
                    info!(
                        "Client {} cleaned up after {:?} ({} requests, idle {:?})",
                        addr,
                        client.connected_at.elapsed(),
                        client.requests,
                        client.last_activity.elapsed(),
                    );
                }
            }
        });
    }

    /// Periodically evict idle sessions.
    async fn run_sweep_loop(router: Arc<Router>, ttl: Duration, every: Duration) {
        let ttl = match chrono::Duration::from_std(ttl) {
            Ok(d) => d,
            Err(e) => {
                warn!("Session TTL out of range, sweeping disabled: {}", e);
                return;
            }
        };
        let mut interval = interval(every);

        loop {
            interval.tick().await;

            let Some(cutoff) = chrono::Utc::now().checked_sub_signed(ttl) else {
                continue;
            };

            match router.service().evict_idle(cutoff).await {
                Ok(0) => {}
                Ok(n) => info!("Evicted {} idle sessions", n),
                Err(e) => error!("Session sweep failed: {}", e),
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get stored session count.
    pub async fn session_count(&self) -> usize {
        self.router.service().session_count().await.unwrap_or(0)
    }
}
