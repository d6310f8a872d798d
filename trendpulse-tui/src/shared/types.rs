/// Core data types for dashboard payloads
///
/// These types match the JSON message format the trends server uses: an
/// `{event, data}` envelope on the push channel, and plain request/response
/// bodies on the search and update HTTP endpoints.
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Server message envelope from the push channel
///
/// Top-level structure wrapping all pushed event types
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerMessage {
    /// Event name: "connected", "data_update", "update_status"
    pub event: String,
    /// Event-specific data (deserialize based on `event` field)
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A single tracked social post
///
/// Posts are identified by `id` and never mutated client-side; a push update
/// replaces the whole store, a search result only appends novel ids.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    /// Server-side identifier; the store is deduplicated by this
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subreddit: String,
    /// Tracked keyword this post matched
    #[serde(default)]
    pub keyword_matched: String,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub comments: u64,
    /// Server-computed popularity score; never recomputed client-side
    #[serde(default)]
    pub engagement: f64,
    /// Creation time reported by the server
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
}

/// Keyword frequency entry, replaced wholesale on every push update
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Trend {
    pub keyword: String,
    pub count: u64,
    #[serde(default)]
    pub engagement: f64,
    /// Heat label assigned by the server ("🔥", "📈", "📊")
    #[serde(default = "default_trend_label")]
    pub trend: String,
}

fn default_trend_label() -> String {
    "📊".to_string()
}

/// `data_update` payload: the authoritative server state
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DataUpdate {
    #[serde(default)]
    pub keywords: Vec<Trend>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// `connected` greeting payload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConnectedGreeting {
    #[serde(default)]
    pub message: String,
}

/// Severity reported by `update_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatusKind {
    Updating,
    Complete,
    Error,
}

/// `update_status` payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateStatus {
    pub status: UpdateStatusKind,
    #[serde(default)]
    pub message: String,
}

/// Response body of `POST /api/search`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    pub status: String,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub count: u64,
}

impl SearchResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Response body of `POST /api/update`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl UpdateResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Active ordering of the posts list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum SortKey {
    /// Descending by server engagement score
    #[default]
    #[display("engagement")]
    Engagement,
    /// Descending by creation time
    #[display("recent")]
    Recent,
    /// Descending by upvotes
    #[display("upvotes")]
    Upvotes,
}

impl SortKey {
    /// Next key in the cycle the sort hotkey walks through
    pub fn next(&self) -> Self {
        match self {
            SortKey::Engagement => SortKey::Recent,
            SortKey::Recent => SortKey::Upvotes,
            SortKey::Upvotes => SortKey::Engagement,
        }
    }
}
