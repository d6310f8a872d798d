/// Transport client for the trends server
///
/// Wraps the WebSocket push channel (automatic reconnection, heartbeat,
/// typed event parsing, outbound refresh requests) and the request/response
/// HTTP calls for keyword search and manual updates.
use crate::shared::types::{
    ConnectedGreeting, DataUpdate, SearchResponse, ServerMessage, UpdateResponse, UpdateStatus,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

/// All errors generated by the transport client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Typed events parsed from the push channel
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Informational greeting sent right after connecting
    Connected { message: String },
    /// Authoritative state replacement
    DataUpdate(DataUpdate),
    /// Server-side progress report with a severity
    UpdateStatus(UpdateStatus),
}

/// Parse one wire message into a typed event.
///
/// Unknown events are skipped so newer servers can add event kinds without
/// breaking older dashboards; malformed payloads are logged and dropped.
pub fn parse_server_message(text: &str) -> Option<ServerEvent> {
    let envelope: ServerMessage = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!("failed to parse server message: {e}");
            debug!("raw message: {text}");
            return None;
        }
    };

    match envelope.event.as_str() {
        "connected" => {
            let greeting: ConnectedGreeting =
                serde_json::from_value(envelope.data).unwrap_or_default();
            Some(ServerEvent::Connected {
                message: greeting.message,
            })
        }
        "data_update" => match serde_json::from_value::<DataUpdate>(envelope.data) {
            Ok(update) => Some(ServerEvent::DataUpdate(update)),
            Err(e) => {
                error!("malformed data_update payload: {e}");
                None
            }
        },
        "update_status" => match serde_json::from_value::<UpdateStatus>(envelope.data) {
            Ok(status) => Some(ServerEvent::UpdateStatus(status)),
            Err(e) => {
                error!("malformed update_status payload: {e}");
                None
            }
        },
        other => {
            debug!("ignoring unknown server event: {other}");
            None
        }
    }
}

/// Connection status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// Outbound requests the dashboard can emit over the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Ask the server to fetch fresh data and push a `data_update`
    RequestUpdate,
}

impl ClientCommand {
    fn event_name(&self) -> &'static str {
        match self {
            ClientCommand::RequestUpdate => "request_update",
        }
    }

    fn to_wire(self) -> String {
        json!({ "event": self.event_name() }).to_string()
    }
}

/// Push channel client configuration
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket server URL
    pub url: String,
    /// Ping interval to keep the connection alive
    pub ping_interval: Duration,
    /// Reconnection delay after disconnect
    pub reconnect_delay: Duration,
    /// Maximum channel buffer size for events
    pub channel_buffer_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/ws".to_string(),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            channel_buffer_size: 256,
        }
    }
}

impl SocketConfig {
    /// Create a new configuration with a custom URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set ping interval
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set channel buffer size
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

/// WebSocket client for the dashboard push channel
pub struct SocketClient {
    config: SocketConfig,
}

impl SocketClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(SocketConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: SocketConfig) -> Self {
        Self { config }
    }

    /// Start the connection loop.
    ///
    /// Returns a receiver for typed server events, a receiver for connection
    /// status updates, and a sender for outbound commands. A `request_update`
    /// is emitted automatically after every successful connect so a fresh
    /// session (or a reconnect) always asks for the current state.
    pub fn start(
        self,
    ) -> (
        mpsc::Receiver<ServerEvent>,
        mpsc::Receiver<ConnectionStatus>,
        mpsc::Sender<ClientCommand>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_buffer_size);
        let (status_tx, status_rx) = mpsc::channel(16);
        let (command_tx, command_rx) = mpsc::channel(16);

        tokio::spawn(run_socket_loop(self.config, event_tx, status_tx, command_rx));

        (event_rx, status_rx, command_tx)
    }
}

impl Default for SocketClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Main connection loop with auto-reconnect
async fn run_socket_loop(
    config: SocketConfig,
    event_tx: mpsc::Sender<ServerEvent>,
    status_tx: mpsc::Sender<ConnectionStatus>,
    mut command_rx: mpsc::Receiver<ClientCommand>,
) {
    info!("starting push channel client for {}", config.url);

    loop {
        let _ = status_tx.send(ConnectionStatus::Reconnecting).await;

        match connect_async(&config.url).await {
            Ok((ws_stream, _)) => {
                info!("connected to {}", config.url);
                let _ = status_tx.send(ConnectionStatus::Connected).await;

                let (mut write, mut read) = ws_stream.split();

                // Initial-load request; the server answers with a data_update
                if let Err(e) = write
                    .send(Message::text(ClientCommand::RequestUpdate.to_wire()))
                    .await
                {
                    warn!("failed to send initial refresh request: {e}");
                }

                let mut ping = tokio::time::interval(config.ping_interval);
                ping.tick().await; // consume the immediate first tick

                loop {
                    tokio::select! {
                        msg = read.next() => {
                            let Some(msg) = msg else { break };
                            match msg {
                                Ok(Message::Text(text)) => {
                                    if let Some(event) = parse_server_message(&text) {
                                        if event_tx.send(event).await.is_err() {
                                            warn!("event receiver dropped, stopping client");
                                            return;
                                        }
                                    }
                                }
                                Ok(Message::Close(_)) => {
                                    info!("server closed connection");
                                    break;
                                }
                                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                                    // Heartbeats - tungstenite answers these automatically
                                }
                                Err(e) => {
                                    error!("websocket error: {e}");
                                    break;
                                }
                                _ => {}
                            }
                        }
                        command = command_rx.recv() => {
                            let Some(command) = command else { return };
                            debug!("emitting {:?}", command);
                            if let Err(e) = write.send(Message::text(command.to_wire())).await {
                                warn!("failed to emit {:?}: {e}", command);
                                break;
                            }
                        }
                        _ = ping.tick() => {
                            if write.send(Message::Ping(vec![].into())).await.is_err() {
                                debug!("failed to send ping, connection likely dead");
                                break;
                            }
                        }
                    }
                }

                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
                warn!("connection closed, will reconnect");
            }
            Err(e) => {
                error!("failed to connect to {}: {e}", config.url);
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
        }

        debug!("waiting {:?} before reconnecting", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    keyword: &'a str,
}

#[derive(Serialize)]
struct ManualUpdateRequest<'a> {
    keywords: &'a [String],
}

/// Request/response client for the search and update endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base: Url::parse(base)?,
            http,
        })
    }

    /// `POST /api/search` - fetch posts matching one keyword
    pub async fn search(&self, keyword: &str) -> Result<SearchResponse, TransportError> {
        let url = self.base.join("/api/search")?;
        let response = self
            .http
            .post(url)
            .json(&SearchRequest { keyword })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// `POST /api/update` - push the tracked keyword snapshot and trigger a refresh
    pub async fn manual_update(&self, keywords: &[String]) -> Result<UpdateResponse, TransportError> {
        let url = self.base.join("/api/update")?;
        let response = self
            .http
            .post(url)
            .json(&ManualUpdateRequest { keywords })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::UpdateStatusKind;

    #[test]
    fn test_config_builder() {
        let config = SocketConfig::new("ws://localhost:8080/ws")
            .with_ping_interval(Duration::from_secs(15))
            .with_reconnect_delay(Duration::from_secs(5))
            .with_channel_buffer_size(500);

        assert_eq!(config.url, "ws://localhost:8080/ws");
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.channel_buffer_size, 500);
    }

    #[test]
    fn test_default_config() {
        let config = SocketConfig::default();
        assert_eq!(config.url, "ws://127.0.0.1:5000/ws");
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.channel_buffer_size, 256);
    }

    #[test]
    fn test_command_wire_format() {
        let wire = ClientCommand::RequestUpdate.to_wire();
        let value: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(value["event"], "request_update");
    }

    #[test]
    fn test_parse_data_update() {
        let event = parse_server_message(
            r#"{
                "event": "data_update",
                "data": {
                    "keywords": [{"keyword": "AI", "count": 2}],
                    "posts": [],
                    "last_updated": "2025-06-01 10:00:00"
                }
            }"#,
        );

        match event {
            Some(ServerEvent::DataUpdate(update)) => {
                assert_eq!(update.keywords.len(), 1);
                assert!(update.posts.is_empty());
            }
            other => panic!("expected DataUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_update_status() {
        let event = parse_server_message(
            r#"{"event": "update_status", "data": {"status": "complete", "message": "Data updated!"}}"#,
        );

        match event {
            Some(ServerEvent::UpdateStatus(status)) => {
                assert_eq!(status.status, UpdateStatusKind::Complete);
                assert_eq!(status.message, "Data updated!");
            }
            other => panic!("expected UpdateStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_connected_without_payload() {
        // Greeting data is optional; missing payload still yields the event
        match parse_server_message(r#"{"event": "connected"}"#) {
            Some(ServerEvent::Connected { message }) => assert_eq!(message, ""),
            other => panic!("expected Connected, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_and_malformed() {
        assert!(parse_server_message(r#"{"event": "heartbeat", "data": {}}"#).is_none());
        assert!(parse_server_message("not json at all").is_none());
        assert!(
            parse_server_message(r#"{"event": "update_status", "data": {"status": "bogus"}}"#)
                .is_none()
        );
    }
}
