//! Client-side stores and reconciliation.
//!
//! Every mutation flows through [`DashboardState::dispatch`], which applies
//! one event at a time in arrival order and hands any follow-up side effect
//! back to the caller. Push updates replace the post and trend stores
//! wholesale (last-write-wins); search results merge additively by post id.

use crate::shared::transport::{ConnectionStatus, ServerEvent, TransportError};
use crate::shared::types::{
    DataUpdate, Post, SearchResponse, SortKey, Trend, UpdateResponse, UpdateStatusKind,
};
use chrono::{DateTime, Duration, Utc};
use derive_more::{Constructor, Display};
use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Capacity of the rolling post-count window feeding the trend chart
pub const HISTORY_WINDOW: usize = 5;

/// Seed keywords, matching the server's defaults
pub const DEFAULT_KEYWORDS: [&str; 5] = ["GPT", "ChatGPT", "OpenAI", "AI", "Machine Learning"];

/// One sample of the post-count time series
#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct HistoryPoint {
    /// HH:MM label of when the sample was taken
    pub label: String,
    pub count: usize,
}

/// Severity of a transient status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StatusLevel {
    #[display("info")]
    Info,
    #[display("success")]
    Success,
    #[display("error")]
    Error,
}

impl StatusLevel {
    /// How long a message of this severity stays on screen; errors linger
    pub fn ttl(&self) -> Duration {
        match self {
            StatusLevel::Info => Duration::seconds(2),
            StatusLevel::Success => Duration::seconds(3),
            StatusLevel::Error => Duration::seconds(5),
        }
    }
}

/// Transient message shown at the bottom of the dashboard
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub message: String,
    pub level: StatusLevel,
    pub raised_at: DateTime<Utc>,
}

impl StatusLine {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.raised_at > self.level.ttl()
    }
}

/// Stats derived from the stores after every mutation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DashboardStats {
    pub total_posts: usize,
    pub active_keywords: usize,
    pub avg_engagement: f64,
}

impl DashboardStats {
    /// One-decimal engagement readout; bare zero when the store is empty
    pub fn avg_engagement_display(&self) -> String {
        if self.total_posts == 0 {
            "0".to_string()
        } else {
            format!("{:.1}", self.avg_engagement)
        }
    }
}

/// Everything that can happen to the dashboard, in one place.
///
/// Server pushes, user input, and request completions all enter dispatch as
/// values of this type, so ordering is exactly arrival order.
#[derive(Debug)]
pub enum DashboardEvent {
    /// Push channel connection state changed
    Connection(ConnectionStatus),
    /// Typed event from the push channel
    Server(ServerEvent),
    /// User submitted a keyword from the input line
    KeywordSubmitted(String),
    /// User removed a tracked keyword
    KeywordRemoved(String),
    /// User cycled the posts sort order
    SortCycled,
    /// User toggled the auto-refresh timer
    AutoRefreshToggled,
    /// User asked for a refresh over the push channel
    RefreshRequested,
    /// User asked for a server-side update via the HTTP endpoint
    ManualUpdateRequested,
    /// User activated a keyword-cloud entry
    CloudSearchRequested(String),
    /// A search call completed (late responses are still applied)
    SearchFinished {
        keyword: String,
        outcome: Result<SearchResponse, TransportError>,
    },
    /// A manual update call completed
    ManualUpdateFinished(Result<UpdateResponse, TransportError>),
    /// User dismissed the status line
    StatusDismissed,
    /// Periodic tick for status expiry
    Tick,
}

/// Side effects dispatch hands back to the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send `request_update` over the push channel
    EmitRefresh,
    /// POST /api/search for the keyword
    Search(String),
    /// POST /api/update with the current keyword snapshot
    PushKeywords(Vec<String>),
}

/// The dashboard stores plus the UI-visible flags derived from them
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Tracked keywords, insertion-ordered, unique, never empty strings
    pub keywords: IndexSet<String>,
    /// Post store; no two posts share an id
    pub posts: Vec<Post>,
    /// Trend store, replaced wholesale on every push update
    pub trends: Vec<Trend>,
    /// Rolling post-count window; len ≤ HISTORY_WINDOW, FIFO order
    pub history: VecDeque<HistoryPoint>,
    pub sort_key: SortKey,
    pub connected: bool,
    pub auto_refresh: bool,
    /// Last-updated text as reported by the server
    pub last_updated: Option<String>,
    /// When the last push update arrived client-side
    pub last_update_at: Option<DateTime<Utc>>,
    pub status: Option<StatusLine>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            posts: Vec::new(),
            trends: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_WINDOW),
            sort_key: SortKey::default(),
            connected: false,
            auto_refresh: true,
            last_updated: None,
            last_update_at: None,
            status: None,
        }
    }

    /// Apply one event and return the side effect the caller should run.
    pub fn dispatch(&mut self, event: DashboardEvent, now: DateTime<Utc>) -> Option<Effect> {
        match event {
            DashboardEvent::Connection(status) => {
                let was_connected = self.connected;
                self.connected = matches!(status, ConnectionStatus::Connected);
                if self.connected && !was_connected {
                    self.raise_status("Connected to server", StatusLevel::Success, now);
                } else if !self.connected && was_connected {
                    self.raise_status("Disconnected from server", StatusLevel::Error, now);
                }
                None
            }
            DashboardEvent::Server(ServerEvent::Connected { message }) => {
                debug!(%message, "server greeting");
                None
            }
            DashboardEvent::Server(ServerEvent::DataUpdate(update)) => {
                self.apply_push_update(update, now);
                None
            }
            DashboardEvent::Server(ServerEvent::UpdateStatus(status)) => {
                let level = match status.status {
                    UpdateStatusKind::Updating => StatusLevel::Info,
                    UpdateStatusKind::Complete => StatusLevel::Success,
                    UpdateStatusKind::Error => StatusLevel::Error,
                };
                self.raise_status(status.message, level, now);
                None
            }
            DashboardEvent::KeywordSubmitted(raw) => {
                let added = self.add_keyword(&raw)?;
                self.raise_status(format!("Added keyword: {added}"), StatusLevel::Success, now);
                Some(Effect::Search(added))
            }
            DashboardEvent::KeywordRemoved(keyword) => {
                if self.remove_keyword(&keyword) {
                    self.raise_status(format!("Removed keyword: {keyword}"), StatusLevel::Info, now);
                }
                None
            }
            DashboardEvent::SortCycled => {
                self.sort_key = self.sort_key.next();
                None
            }
            DashboardEvent::AutoRefreshToggled => {
                self.auto_refresh = !self.auto_refresh;
                if self.auto_refresh {
                    self.raise_status(
                        "Auto-refresh enabled (every 5 minutes)",
                        StatusLevel::Success,
                        now,
                    );
                } else {
                    self.raise_status("Auto-refresh disabled", StatusLevel::Info, now);
                }
                None
            }
            DashboardEvent::RefreshRequested => {
                self.raise_status("Refreshing...", StatusLevel::Info, now);
                Some(Effect::EmitRefresh)
            }
            DashboardEvent::ManualUpdateRequested => {
                Some(Effect::PushKeywords(self.keyword_snapshot()))
            }
            DashboardEvent::CloudSearchRequested(keyword) => {
                self.raise_status(format!("Searching for \"{keyword}\""), StatusLevel::Info, now);
                Some(Effect::Search(keyword))
            }
            DashboardEvent::SearchFinished { keyword, outcome } => {
                match outcome {
                    Ok(response) if response.is_success() => {
                        let added = self.apply_search_result(&response);
                        debug!(keyword = %keyword, added, "search results merged");
                        self.raise_status(
                            format!("Found {} posts for \"{}\"", response.count, keyword),
                            StatusLevel::Success,
                            now,
                        );
                    }
                    Ok(response) => {
                        warn!(keyword = %keyword, status = %response.status, "search rejected");
                        self.raise_status("Search failed", StatusLevel::Error, now);
                    }
                    Err(error) => {
                        warn!(keyword = %keyword, %error, "search request failed");
                        self.raise_status("Search failed", StatusLevel::Error, now);
                    }
                }
                None
            }
            DashboardEvent::ManualUpdateFinished(outcome) => {
                match outcome {
                    Ok(response) => {
                        let level = if response.is_success() {
                            StatusLevel::Success
                        } else {
                            StatusLevel::Error
                        };
                        self.raise_status(response.message, level, now);
                    }
                    Err(error) => {
                        warn!(%error, "manual update failed");
                        self.raise_status("Update failed", StatusLevel::Error, now);
                    }
                }
                None
            }
            DashboardEvent::StatusDismissed => {
                self.status = None;
                None
            }
            DashboardEvent::Tick => {
                if self.status.as_ref().is_some_and(|s| s.is_expired(now)) {
                    self.status = None;
                }
                None
            }
        }
    }

    /// Replace both stores with the payload contents and extend the chart
    /// history window. Push updates are authoritative: no merging.
    pub fn apply_push_update(&mut self, update: DataUpdate, now: DateTime<Utc>) {
        let count = update.posts.len();
        self.trends = update.keywords;
        self.posts = update.posts;
        self.last_updated = update.last_updated;
        self.last_update_at = Some(now);

        self.history
            .push_back(HistoryPoint::new(now.format("%H:%M").to_string(), count));
        while self.history.len() > HISTORY_WINDOW {
            self.history.pop_front();
        }
    }

    /// Additively merge search results, skipping posts already present by id.
    /// Returns how many posts were appended.
    pub fn apply_search_result(&mut self, response: &SearchResponse) -> usize {
        if !response.is_success() {
            return 0;
        }

        let known: HashSet<&str> = self.posts.iter().map(|p| p.id.as_str()).collect();
        let fresh: Vec<Post> = response
            .posts
            .iter()
            .filter(|p| !known.contains(p.id.as_str()))
            .cloned()
            .collect();

        let added = fresh.len();
        self.posts.extend(fresh);
        added
    }

    /// Trim and insert; empty or already-tracked keywords are no-ops.
    /// Returns the accepted keyword so the caller can kick off a search.
    pub fn add_keyword(&mut self, raw: &str) -> Option<String> {
        let keyword = raw.trim();
        if keyword.is_empty() || self.keywords.contains(keyword) {
            return None;
        }
        self.keywords.insert(keyword.to_string());
        Some(keyword.to_string())
    }

    /// Idempotent removal; returns whether the keyword was present.
    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        self.keywords.shift_remove(keyword)
    }

    pub fn keyword_snapshot(&self) -> Vec<String> {
        self.keywords.iter().cloned().collect()
    }

    pub fn stats(&self) -> DashboardStats {
        let total_posts = self.posts.len();
        let avg_engagement = if total_posts == 0 {
            0.0
        } else {
            self.posts.iter().map(|p| p.engagement).sum::<f64>() / total_posts as f64
        };

        DashboardStats {
            total_posts,
            active_keywords: self.keywords.len(),
            avg_engagement,
        }
    }

    /// Stable-sorted view of the post store per the active sort key.
    /// Ties keep their original relative order.
    pub fn sorted_posts(&self) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.iter().collect();
        match self.sort_key {
            SortKey::Engagement => posts.sort_by(|a, b| b.engagement.total_cmp(&a.engagement)),
            SortKey::Recent => posts.sort_by(|a, b| b.created.cmp(&a.created)),
            SortKey::Upvotes => posts.sort_by(|a, b| b.upvotes.cmp(&a.upvotes)),
        }
        posts
    }

    /// Seconds since the last push update arrived
    pub fn update_age_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_update_at.map(|at| (now - at).num_seconds().max(0))
    }

    fn raise_status(&mut self, message: impl Into<String>, level: StatusLevel, now: DateTime<Utc>) {
        self.status = Some(StatusLine {
            message: message.into(),
            level,
            raised_at: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::UpdateStatus;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn post(id: &str, engagement: f64) -> Post {
        Post {
            id: id.to_string(),
            title: format!("post {id}"),
            subreddit: "artificial".to_string(),
            keyword_matched: "AI".to_string(),
            upvotes: engagement as u64,
            comments: 0,
            engagement,
            created: at(0),
            url: String::new(),
        }
    }

    fn trend(keyword: &str, count: u64) -> Trend {
        Trend {
            keyword: keyword.to_string(),
            count,
            engagement: 0.0,
            trend: "📊".to_string(),
        }
    }

    fn update(ids: &[&str]) -> DataUpdate {
        DataUpdate {
            keywords: vec![trend("AI", ids.len() as u64)],
            posts: ids.iter().map(|id| post(id, 10.0)).collect(),
            last_updated: Some("2025-06-01 12:00:00".to_string()),
        }
    }

    fn search_response(status: &str, ids: &[&str]) -> SearchResponse {
        SearchResponse {
            status: status.to_string(),
            posts: ids.iter().map(|id| post(id, 10.0)).collect(),
            count: ids.len() as u64,
        }
    }

    #[test]
    fn test_push_update_replaces_stores() {
        let mut state = DashboardState::new();

        state.apply_push_update(update(&["a", "b", "c"]), at(0));
        assert_eq!(state.posts.len(), 3);

        // A later update fully replaces, never merges
        state.apply_push_update(update(&["d"]), at(60));
        let ids: Vec<&str> = state.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["d"]);
        assert_eq!(state.trends.len(), 1);
        assert_eq!(state.trends[0].count, 1);
    }

    #[test]
    fn test_history_window_caps_at_five() {
        let mut state = DashboardState::new();

        for i in 0..6 {
            let ids: Vec<String> = (0..=i).map(|n| format!("p{n}")).collect();
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            state.apply_push_update(update(&ids), at(i as i64 * 60));
        }

        assert_eq!(state.history.len(), HISTORY_WINDOW);
        // After six pushes of sizes 1..=6, the window holds the last five
        let counts: Vec<usize> = state.history.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_search_result_merges_additively() {
        let mut state = DashboardState::new();
        state.apply_push_update(update(&["a", "b"]), at(0));

        let added = state.apply_search_result(&search_response("success", &["b", "c", "d"]));
        assert_eq!(added, 2);

        let ids: Vec<&str> = state.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_search_result_non_success_is_ignored() {
        let mut state = DashboardState::new();
        state.apply_push_update(update(&["a"]), at(0));

        let added = state.apply_search_result(&search_response("error", &["b"]));
        assert_eq!(added, 0);
        assert_eq!(state.posts.len(), 1);
    }

    #[test]
    fn test_avg_engagement() {
        let mut state = DashboardState::new();
        assert_eq!(state.stats().avg_engagement, 0.0);
        assert_eq!(state.stats().avg_engagement_display(), "0");

        state.posts = vec![post("a", 10.0), post("b", 20.0), post("c", 30.0)];
        let stats = state.stats();
        assert_eq!(stats.avg_engagement, 20.0);
        assert_eq!(stats.avg_engagement_display(), "20.0");
    }

    #[test]
    fn test_sort_by_engagement_is_stable() {
        let mut state = DashboardState::new();
        state.posts = vec![post("1", 5.0), post("2", 50.0), post("3", 5.0)];
        state.sort_key = SortKey::Engagement;

        let ids: Vec<&str> = state.sorted_posts().iter().map(|p| p.id.as_str()).collect();
        // Ties keep original relative order: 1 before 3
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn test_sort_by_recent_and_upvotes() {
        let mut state = DashboardState::new();
        let mut a = post("a", 1.0);
        a.created = at(0);
        a.upvotes = 5;
        let mut b = post("b", 2.0);
        b.created = at(120);
        b.upvotes = 50;
        let mut c = post("c", 3.0);
        c.created = at(60);
        c.upvotes = 20;
        state.posts = vec![a, b, c];

        state.sort_key = SortKey::Recent;
        let ids: Vec<&str> = state.sorted_posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        state.sort_key = SortKey::Upvotes;
        let ids: Vec<&str> = state.sorted_posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_add_keyword_trims_and_dedupes() {
        let mut state = DashboardState::new();
        let before = state.keywords.len();

        // Already tracked (seed set): no-op
        assert_eq!(state.add_keyword("AI"), None);
        // Whitespace only: no-op
        assert_eq!(state.add_keyword("   "), None);
        assert_eq!(state.keywords.len(), before);

        // Trimmed insert
        assert_eq!(state.add_keyword("  rust  "), Some("rust".to_string()));
        assert!(state.keywords.contains("rust"));
    }

    #[test]
    fn test_remove_keyword_is_idempotent() {
        let mut state = DashboardState::new();
        assert!(state.remove_keyword("AI"));
        assert!(!state.remove_keyword("AI"));
        assert!(!state.keywords.contains("AI"));
    }

    #[test]
    fn test_dispatch_keyword_submitted_effects() {
        let mut state = DashboardState::new();

        // Fresh keyword triggers a search side effect
        let effect = state.dispatch(DashboardEvent::KeywordSubmitted(" rust ".to_string()), at(0));
        assert_eq!(effect, Some(Effect::Search("rust".to_string())));

        // Duplicate add is a no-op: no search issued, no status raised
        state.status = None;
        let effect = state.dispatch(DashboardEvent::KeywordSubmitted("rust".to_string()), at(1));
        assert_eq!(effect, None);
        assert!(state.status.is_none());
    }

    #[test]
    fn test_dispatch_refresh_and_manual_update_effects() {
        let mut state = DashboardState::new();

        let effect = state.dispatch(DashboardEvent::RefreshRequested, at(0));
        assert_eq!(effect, Some(Effect::EmitRefresh));

        let effect = state.dispatch(DashboardEvent::ManualUpdateRequested, at(0));
        assert_eq!(effect, Some(Effect::PushKeywords(state.keyword_snapshot())));
    }

    #[test]
    fn test_dispatch_applies_updates_in_arrival_order() {
        let mut state = DashboardState::new();

        // The later-arriving update wins regardless of payload timestamps
        let mut first = update(&["a", "b"]);
        first.last_updated = Some("2025-06-01 12:05:00".to_string());
        let mut second = update(&["c"]);
        second.last_updated = Some("2025-06-01 12:01:00".to_string());

        let _ = state.dispatch(DashboardEvent::Server(ServerEvent::DataUpdate(first)), at(0));
        let _ = state.dispatch(DashboardEvent::Server(ServerEvent::DataUpdate(second)), at(10));

        let ids: Vec<&str> = state.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
        assert_eq!(state.last_updated.as_deref(), Some("2025-06-01 12:01:00"));
    }

    #[test]
    fn test_dispatch_update_status_levels() {
        let mut state = DashboardState::new();

        for (kind, level) in [
            (UpdateStatusKind::Updating, StatusLevel::Info),
            (UpdateStatusKind::Complete, StatusLevel::Success),
            (UpdateStatusKind::Error, StatusLevel::Error),
        ] {
            let _ = state.dispatch(
                DashboardEvent::Server(ServerEvent::UpdateStatus(UpdateStatus {
                    status: kind,
                    message: "msg".to_string(),
                })),
                at(0),
            );
            assert_eq!(state.status.as_ref().unwrap().level, level);
        }
    }

    #[test]
    fn test_status_line_expiry() {
        let line = StatusLine {
            message: "Connected".to_string(),
            level: StatusLevel::Info,
            raised_at: at(0),
        };
        assert!(!line.is_expired(at(1)));
        assert!(line.is_expired(at(3)));

        // Errors linger longer than info
        let error = StatusLine {
            message: "Search failed".to_string(),
            level: StatusLevel::Error,
            raised_at: at(0),
        };
        assert!(!error.is_expired(at(4)));
        assert!(error.is_expired(at(6)));

        let mut state = DashboardState::new();
        state.status = Some(line);
        let _ = state.dispatch(DashboardEvent::Tick, at(3));
        assert!(state.status.is_none());
    }

    #[test]
    fn test_connection_status_transitions() {
        let mut state = DashboardState::new();

        let _ = state.dispatch(DashboardEvent::Connection(ConnectionStatus::Connected), at(0));
        assert!(state.connected);
        assert_eq!(state.status.as_ref().unwrap().level, StatusLevel::Success);

        let _ = state.dispatch(DashboardEvent::Connection(ConnectionStatus::Disconnected), at(1));
        assert!(!state.connected);
        assert_eq!(state.status.as_ref().unwrap().level, StatusLevel::Error);

        // Reconnecting keeps the indicator down without raising a new status
        state.status = None;
        let _ = state.dispatch(DashboardEvent::Connection(ConnectionStatus::Reconnecting), at(2));
        assert!(!state.connected);
        assert!(state.status.is_none());
    }

    #[test]
    fn test_search_finished_merges_and_reports() {
        let mut state = DashboardState::new();
        state.apply_push_update(update(&["a"]), at(0));

        let _ = state.dispatch(
            DashboardEvent::SearchFinished {
                keyword: "rust".to_string(),
                outcome: Ok(search_response("success", &["a", "b"])),
            },
            at(5),
        );

        assert_eq!(state.posts.len(), 2);
        let status = state.status.as_ref().unwrap();
        assert_eq!(status.level, StatusLevel::Success);
        assert!(status.message.contains("rust"));

        // Rejected search: stores untouched, error surfaced
        let _ = state.dispatch(
            DashboardEvent::SearchFinished {
                keyword: "rust".to_string(),
                outcome: Ok(search_response("error", &["z"])),
            },
            at(6),
        );
        assert_eq!(state.posts.len(), 2);
        assert_eq!(state.status.as_ref().unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn test_update_age() {
        let mut state = DashboardState::new();
        assert_eq!(state.update_age_secs(at(0)), None);

        state.apply_push_update(update(&["a"]), at(0));
        assert_eq!(state.update_age_secs(at(42)), Some(42));
    }
}
