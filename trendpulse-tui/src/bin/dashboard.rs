/// TrendPulse Dashboard - terminal UI for live social trend data
///
/// Connects to the trends server push channel, reconciles pushed state and
/// search results into the in-memory stores, and renders the trending list,
/// post feed, stats, charts, and keyword cloud.
///
/// Keys: [q] quit, [i] add keyword, [Tab]/[d] select/remove keyword,
/// [s] cycle sort, [r] refresh, [u] manual update, [a] auto-refresh toggle,
/// [←]/[→]/[Enter] pick and search a cloud keyword, [x] dismiss status.
use std::{env, error::Error, io, sync::Arc, time::Duration, time::Instant};

use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
};
use tokio::sync::{Mutex, mpsc};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use trendpulse_tui::{
    ApiClient, ClientCommand, DashboardEvent, DashboardState, Effect, SocketClient, SocketConfig,
    charts, render,
};

/// Environment-driven endpoints and timings
#[derive(Debug, Clone)]
struct Config {
    ws_url: String,
    api_url: String,
    auto_refresh: Duration,
}

impl Config {
    fn from_env() -> Self {
        let ws_url =
            env::var("TRENDS_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:5000/ws".to_string());
        let api_url =
            env::var("TRENDS_API_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
        let auto_refresh = env::var("AUTO_REFRESH_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        Self {
            ws_url,
            api_url,
            auto_refresh,
        }
    }
}

/// Logs go to a file so they never bleed into the alternate screen
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("trendpulse-tui.log")
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .try_init();
    }
}

/// Interaction mode for the keyword input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Insert,
}

struct App {
    state: Arc<Mutex<DashboardState>>,
    api: ApiClient,
    commands: mpsc::Sender<ClientCommand>,
    mode: InputMode,
    input: String,
    selected_keyword: Option<usize>,
    selected_cloud: Option<usize>,
    last_refresh: Instant,
    auto_period: Duration,
}

impl App {
    /// Run one event through dispatch and execute the resulting side effect
    async fn apply(&self, event: DashboardEvent) {
        let effect = self.state.lock().await.dispatch(event, Utc::now());
        if let Some(effect) = effect {
            self.run_effect(effect).await;
        }
    }

    async fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::EmitRefresh => {
                if self.commands.send(ClientCommand::RequestUpdate).await.is_err() {
                    warn!("push channel command receiver dropped");
                }
            }
            Effect::Search(keyword) => {
                let api = self.api.clone();
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    let outcome = api.search(&keyword).await;
                    let _ = state
                        .lock()
                        .await
                        .dispatch(DashboardEvent::SearchFinished { keyword, outcome }, Utc::now());
                });
            }
            Effect::PushKeywords(keywords) => {
                let api = self.api.clone();
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    let outcome = api.manual_update(&keywords).await;
                    let _ = state
                        .lock()
                        .await
                        .dispatch(DashboardEvent::ManualUpdateFinished(outcome), Utc::now());
                });
            }
        }
    }
}

fn cycle(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(i) => (i + 1) % len,
        None => 0,
    })
}

fn cycle_back(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let config = Config::from_env();

    // Restore the terminal even when a draw panics
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: Config,
) -> Result<(), Box<dyn Error>> {
    let state = Arc::new(Mutex::new(DashboardState::new()));
    let api = ApiClient::new(&config.api_url)?;

    let socket = SocketClient::with_config(SocketConfig::new(config.ws_url.clone()));
    let (mut server_rx, mut status_rx, command_tx) = socket.start();

    // Server events feed the same dispatch function as user input
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = server_rx.recv().await {
                let _ = state
                    .lock()
                    .await
                    .dispatch(DashboardEvent::Server(event), Utc::now());
            }
        });
    }
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                let _ = state
                    .lock()
                    .await
                    .dispatch(DashboardEvent::Connection(status), Utc::now());
            }
        });
    }

    let mut app = App {
        state,
        api,
        commands: command_tx,
        mode: InputMode::Normal,
        input: String::new(),
        selected_keyword: None,
        selected_cloud: None,
        last_refresh: Instant::now(),
        auto_period: config.auto_refresh,
    };

    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        if event::poll(Duration::from_millis(5))? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut app, key).await {
                    return Ok(());
                }
            }
        }

        // Auto-refresh: a single restartable timer; suppressed while disabled
        let auto_refresh = { app.state.lock().await.auto_refresh };
        if auto_refresh && app.last_refresh.elapsed() >= app.auto_period {
            app.apply(DashboardEvent::RefreshRequested).await;
            app.last_refresh = Instant::now();
        }

        if last_tick.elapsed() >= tick_rate {
            app.apply(DashboardEvent::Tick).await;

            let snapshot = { app.state.lock().await.clone() };
            let cloud = charts::cloud_entries(&snapshot.trends);

            // Selections can outlive the data they pointed at
            if app.selected_keyword.is_some_and(|i| i >= snapshot.keywords.len()) {
                app.selected_keyword = None;
            }
            if app.selected_cloud.is_some_and(|i| i >= cloud.len()) {
                app.selected_cloud = None;
            }

            terminal.draw(|f| ui(f, &snapshot, &cloud, &app))?;
            last_tick = Instant::now();
        }
    }
}

/// Translate one key press into dispatch events; returns true to quit
async fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if app.mode == InputMode::Insert {
        match key.code {
            KeyCode::Esc => {
                app.input.clear();
                app.mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                let buffer = std::mem::take(&mut app.input);
                app.mode = InputMode::Normal;
                app.apply(DashboardEvent::KeywordSubmitted(buffer)).await;
            }
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('i') => app.mode = InputMode::Insert,
        KeyCode::Char('s') => app.apply(DashboardEvent::SortCycled).await,
        KeyCode::Char('r') => app.apply(DashboardEvent::RefreshRequested).await,
        KeyCode::Char('u') => app.apply(DashboardEvent::ManualUpdateRequested).await,
        KeyCode::Char('a') => {
            app.apply(DashboardEvent::AutoRefreshToggled).await;
            // Re-enabling restarts the period from now
            if app.state.lock().await.auto_refresh {
                app.last_refresh = Instant::now();
            }
        }
        KeyCode::Char('x') => app.apply(DashboardEvent::StatusDismissed).await,
        KeyCode::Tab => {
            let len = app.state.lock().await.keywords.len();
            app.selected_keyword = cycle(app.selected_keyword, len);
        }
        KeyCode::Char('d') => {
            if let Some(idx) = app.selected_keyword {
                let keyword = app.state.lock().await.keywords.get_index(idx).cloned();
                if let Some(keyword) = keyword {
                    app.apply(DashboardEvent::KeywordRemoved(keyword)).await;
                }
                app.selected_keyword = None;
            }
        }
        KeyCode::Left | KeyCode::Right => {
            let len = charts::cloud_entries(&app.state.lock().await.trends).len();
            app.selected_cloud = if key.code == KeyCode::Right {
                cycle(app.selected_cloud, len)
            } else {
                cycle_back(app.selected_cloud, len)
            };
        }
        KeyCode::Enter => {
            if let Some(idx) = app.selected_cloud {
                let keyword = {
                    let state = app.state.lock().await;
                    charts::cloud_entries(&state.trends)
                        .get(idx)
                        .map(|e| e.keyword.clone())
                };
                if let Some(keyword) = keyword {
                    app.apply(DashboardEvent::CloudSearchRequested(keyword)).await;
                }
            }
        }
        _ => {}
    }

    false
}

fn ui(f: &mut Frame, state: &DashboardState, cloud: &[charts::CloudEntry], app: &App) {
    let now = Utc::now();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .split(f.area());

    render::render_status_bar(f, chunks[0], state);
    render::render_stats(f, chunks[1], state, now);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    render::render_posts(f, main[0], state);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(main[1]);

    render::render_trending(f, right[0], state);
    charts::render_trend_chart(f, right[1], &state.history);
    charts::render_engagement_chart(f, right[2], &state.posts);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[3]);

    let input = match app.mode {
        InputMode::Insert => Some(app.input.as_str()),
        InputMode::Normal => None,
    };
    render::render_keywords(f, bottom[0], state, app.selected_keyword, input);
    charts::render_keyword_cloud(f, bottom[1], cloud, app.selected_cloud);

    render::render_status_message(f, chunks[4], state.status.as_ref(), now);
}
