//! WebSocket Backend Server
//!
//! Async WebSocket server for game clients. Each text frame is one
//! stateless request routed through the [`RequestManager`]; the reply goes
//! back on the same connection. A background task refreshes the catalog.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::CatalogRefresher;
use crate::error::PbxError;
use crate::network::protocol::{ClientRequest, ServerResponse};
use crate::request::RequestManager;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// How often the catalog is refreshed.
    pub catalog_refresh: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            catalog_refresh: Duration::from_secs(300),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `PBX_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("PBX_BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind_addr),
            max_connections: std::env::var("PBX_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            catalog_refresh: std::env::var("PBX_CATALOG_REFRESH_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.catalog_refresh),
            version: defaults.version,
        }
    }
}

/// Backend server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Requests answered on this connection.
    requests: u64,
}

/// Answer one text frame.
pub fn respond(manager: &RequestManager, text: &str) -> ServerResponse {
    let request = match ClientRequest::from_json(text) {
        Ok(r) => r,
        Err(e) => {
            return ServerResponse::failure(&PbxError::MalformedRequest(format!("invalid request frame: {}", e)), None)
        }
    };
    let request_id = request.correlation_id();
    let result = manager.dispatch(&request.request_type, &request.params);
    ServerResponse::from_result(&result, Some(request_id))
}

/// The backend server.
pub struct BackendServer {
    /// Server configuration.
    config: ServerConfig,
    /// Request routing.
    manager: Arc<RequestManager>,
    /// Periodic catalog refresh, if any.
    refresher: Option<Arc<CatalogRefresher>>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl BackendServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, manager: Arc<RequestManager>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            manager,
            refresher: None,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Refresh the catalog in the background while running.
    pub fn with_refresher(mut self, refresher: Arc<CatalogRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Bind the configured address and run.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!("Backend server listening on {}", listener.local_addr()?);

        let refresh_handle = self.refresher.clone().map(|refresher| {
            let period = self.config.catalog_refresh;
            tokio::spawn(async move {
                Self::run_refresh_loop(refresher, period).await;
            })
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

        if let Some(handle) = refresh_handle {
            handle.abort();
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let manager = self.manager.clone();
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
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerResponse>(64);

            clients.write().await.insert(addr, ConnectedClient { connected_at: Instant::now(), requests: 0 });

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize response: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let response = respond(&manager, &text);
                                if let Some(client) = clients.write().await.get_mut(&addr) {
                                    client.requests += 1;
                                }
                                if msg_tx.send(response).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                debug!("Binary frame from {}", addr);
                                let err = PbxError::MalformedRequest("binary frames are not supported".into());
                                let _ = msg_tx.send(ServerResponse::failure(&err, None)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Let queued responses drain before closing.
            drop(msg_tx);
            let _ = sender_task.await;

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    "Client {} cleaned up after {:?}, {} requests",
                    addr,
                    client.connected_at.elapsed(),
                    client.requests
                );
            }
        });
    }

    /// Periodically refresh the catalog.
    async fn run_refresh_loop(refresher: Arc<CatalogRefresher>, period: Duration) {
        let mut ticker = interval(period);
        // The first tick fires immediately; startup already refreshed.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let job = refresher.clone();
            match tokio::task::spawn_blocking(move || job.refresh()).await {
                Ok(Ok(report)) if !report.new_versions.is_empty() => {
                    info!("Catalog refresh found {} new builds", report.new_versions.len());
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Catalog refresh failed: {}", e),
                Err(e) => error!("Catalog refresh task failed: {}", e),
            }
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get current connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::handlers::testing::Fixture;
    use tokio_tungstenite::connect_async;

    #[test]
    fn test_respond_to_frames() {
        let fixture = Fixture::new();

        let ok = respond(&fixture.manager, r#"{"requestType":"authGame","params":{"gameID":"TEST-1.2.0.0"},"requestId":"r-7"}"#);
        assert_eq!(ok.response_code, "PBX200");
        assert_eq!(ok.request_id.as_deref(), Some("r-7"));
        assert_eq!(ok.response_msg, None);

        let unknown = respond(&fixture.manager, r#"{"requestType":"dance","params":{}}"#);
        assert_eq!(unknown.response_code, "PBX401");
        assert!(unknown.request_id.is_some());

        let garbage = respond(&fixture.manager, "not json");
        assert_eq!(garbage.response_code, "PBX401");
        assert_eq!(garbage.request_id, None);
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.catalog_refresh, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let fixture = Fixture::new();
        let server = BackendServer::new(ServerConfig::default(), Arc::new(fixture.manager));
        assert_eq!(server.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_websocket_round_trip() {
        let fixture = Fixture::new();
        let server = Arc::new(BackendServer::new(ServerConfig::default(), Arc::new(fixture.manager)));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = server.clone();
        let handle = tokio::spawn(async move { running.serve(listener).await });

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        ws.send(Message::Text(
            r#"{"requestType":"authGame","params":{"gameID":"TEST-1.0.0.0"},"requestId":"abc"}"#.into(),
        ))
        .await
        .unwrap();

        let reply = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break ServerResponse::from_json(&text).unwrap(),
                _ => continue,
            }
        };
        assert_eq!(reply.response_code, "PBX200");
        assert_eq!(reply.request_id.as_deref(), Some("abc"));
        assert_eq!(reply.response_msg.as_deref(), Some("Update available: latest version is v1.2.0.0"));

        server.shutdown();
        assert!(handle.await.unwrap().is_ok());
    }
}
