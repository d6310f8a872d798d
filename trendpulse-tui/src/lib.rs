/// TrendPulse - Shared Library
///
/// This library provides the pieces the `dashboard` binary is assembled from:
/// - Core data types for the payloads the trends server pushes and serves
/// - Client-side stores, reconciliation, and the event dispatch function
/// - Transport client for the push channel and the search/update endpoints
/// - Renderer and chart adapter mapping state snapshots to terminal widgets
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::types::{
    ConnectedGreeting, DataUpdate, Post, SearchResponse, ServerMessage, SortKey, Trend,
    UpdateResponse, UpdateStatus, UpdateStatusKind,
};

pub use shared::state::{
    DEFAULT_KEYWORDS, DashboardEvent, DashboardState, DashboardStats, Effect, HISTORY_WINDOW,
    HistoryPoint, StatusLevel, StatusLine,
};

pub use shared::transport::{
    ApiClient, ClientCommand, ConnectionStatus, ServerEvent, SocketClient, SocketConfig,
    TransportError, parse_server_message,
};

pub use shared::{charts, render};
