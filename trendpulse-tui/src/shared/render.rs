//! Renderer: pure mapping from a dashboard state snapshot to ratatui widgets.
//!
//! Every panel reads from the snapshot passed in by the caller; nothing here
//! mutates stores or reaches into ambient globals, so panels can be exercised
//! against hand-built states.

use crate::shared::state::{DashboardState, StatusLevel, StatusLine};
use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph, Wrap},
};

// Palette shared across panels
pub const C_POSITIVE: Color = Color::Rgb(0, 255, 127);
pub const C_NEGATIVE: Color = Color::Rgb(255, 69, 58);
pub const C_ACCENT: Color = Color::Rgb(100, 149, 237);
pub const C_GOLD: Color = Color::Rgb(255, 215, 0);
pub const C_DIM: Color = Color::Rgb(128, 128, 150);
pub const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
pub const C_HEADER: Color = Color::Rgb(138, 43, 226);
pub const C_BG: Color = Color::Rgb(15, 15, 25);

/// Fixed 7-color palette for keyword tags
/// (purple, blue, green, yellow, red, indigo, pink)
const KEYWORD_PALETTE: [Color; 7] = [
    Color::Rgb(168, 85, 247),
    Color::Rgb(59, 130, 246),
    Color::Rgb(34, 197, 94),
    Color::Rgb(234, 179, 8),
    Color::Rgb(239, 68, 68),
    Color::Rgb(99, 102, 241),
    Color::Rgb(236, 72, 153),
];

/// Deterministic tag color: the keyword's first character indexes the fixed
/// palette, so the same keyword always renders with the same color. Empty
/// keywords fall back to the neutral default.
pub fn keyword_color(keyword: &str) -> Color {
    match keyword.chars().next() {
        Some(c) => KEYWORD_PALETTE[(c as usize) % KEYWORD_PALETTE.len()],
        None => C_DIM,
    }
}

/// Rank treatment for the trending list: the top three ranks stand out
pub fn rank_style(index: usize) -> Style {
    if index < 3 {
        Style::default().fg(C_GOLD).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_DIM)
    }
}

/// Status line color by severity
pub fn status_color(level: StatusLevel) -> Color {
    match level {
        StatusLevel::Info => C_ACCENT,
        StatusLevel::Success => C_POSITIVE,
        StatusLevel::Error => C_NEGATIVE,
    }
}

/// Standard rounded panel frame with a centered bold title
pub(crate) fn panel_block(title: &str, accent: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(accent))
        .title_top(
            Line::styled(
                title,
                Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center),
        )
        .style(Style::default().bg(C_BG))
}

/// Centered italic placeholder inside a panel frame
pub(crate) fn placeholder(f: &mut Frame, area: Rect, block: Block, message: &str) {
    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            message,
            Style::default().fg(C_DIM).add_modifier(Modifier::ITALIC),
        )),
    ])
    .block(block)
    .alignment(Alignment::Center);

    f.render_widget(text, area);
}

/// Top status bar: connection indicator, last-updated text, title, key help
pub fn render_status_bar(f: &mut Frame, area: Rect, state: &DashboardState) {
    let status_symbol = if state.connected { "●" } else { "○" };
    let status_color = if state.connected { C_POSITIVE } else { C_NEGATIVE };
    let status_text = if state.connected {
        "CONNECTED"
    } else {
        "DISCONNECTED"
    };

    let status = Span::styled(
        format!(" {} {} ", status_symbol, status_text),
        Style::default()
            .fg(status_color)
            .add_modifier(Modifier::BOLD),
    );

    let updated = Span::styled(
        match &state.last_updated {
            Some(timestamp) => format!(" ⏱  {} ", timestamp),
            None => " ⏱  never updated ".to_string(),
        },
        Style::default().fg(C_ACCENT),
    );

    let title = Span::styled(
        " ◆ TRENDPULSE ◆ ",
        Style::default().fg(C_GOLD).add_modifier(Modifier::BOLD),
    );

    let help = Span::styled(
        " [Q] Quit [I] Add [S] Sort [R] Refresh [A] Auto [U] Update ",
        Style::default().fg(C_DIM),
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(C_HEADER))
        .style(Style::default().bg(C_BG));

    let paragraph = Paragraph::new(Line::from(vec![status, updated, title, help]))
        .block(block)
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

/// Stats row: post count, keyword count, average engagement, update age
pub fn render_stats(f: &mut Frame, area: Rect, state: &DashboardState, now: DateTime<Utc>) {
    let stats = state.stats();
    let age = match state.update_age_secs(now) {
        Some(secs) => format!("{secs}s ago"),
        None => "—".to_string(),
    };

    let line = Line::from(vec![
        Span::styled("  Posts: ", Style::default().fg(C_DIM)),
        Span::styled(
            stats.total_posts.to_string(),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   Keywords: ", Style::default().fg(C_DIM)),
        Span::styled(
            stats.active_keywords.to_string(),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   Avg Engagement: ", Style::default().fg(C_DIM)),
        Span::styled(
            stats.avg_engagement_display(),
            Style::default().fg(C_GOLD).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   Updated: ", Style::default().fg(C_DIM)),
        Span::styled(age, Style::default().fg(C_ACCENT)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(C_DIM))
        .style(Style::default().bg(C_BG));

    f.render_widget(Paragraph::new(line).block(block), area);
}

/// Trending list: trend store in received order, ranked
pub fn render_trending(f: &mut Frame, area: Rect, state: &DashboardState) {
    let title = format!(" 🔥 TRENDING ({}) ", state.trends.len());
    let block = panel_block(&title, C_NEGATIVE);

    if state.trends.is_empty() {
        placeholder(f, area, block, "No trends yet");
        return;
    }

    let items: Vec<ListItem> = state
        .trends
        .iter()
        .take(area.height.saturating_sub(2) as usize)
        .enumerate()
        .map(|(idx, trend)| {
            let line = Line::from(vec![
                Span::styled(format!(" #{:<2}", idx + 1), rank_style(idx)),
                Span::styled(format!("{} ", trend.trend), Style::default().fg(C_BRIGHT)),
                Span::styled(
                    format!("{:<16}", trend.keyword),
                    Style::default()
                        .fg(keyword_color(&trend.keyword))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {} posts • {:.0} engagement", trend.count, trend.engagement),
                    Style::default().fg(C_DIM),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

/// Posts feed: stable-sorted copy of the post store per the active sort key
pub fn render_posts(f: &mut Frame, area: Rect, state: &DashboardState) {
    let title = format!(
        " 📰 POSTS ({}) — sort: {} ",
        state.posts.len(),
        state.sort_key
    );
    let block = panel_block(&title, C_ACCENT);

    if state.posts.is_empty() {
        placeholder(f, area, block, "No posts found. Try adding more keywords.");
        return;
    }

    let items: Vec<ListItem> = state
        .sorted_posts()
        .into_iter()
        .take(area.height.saturating_sub(2) as usize)
        .enumerate()
        .map(|(idx, post)| {
            let zebra = if idx % 2 == 0 {
                Color::Rgb(25, 25, 35)
            } else {
                Color::Rgb(20, 20, 30)
            };

            let line = Line::from(vec![
                Span::styled(
                    format!(" {} ", post.created.format("%H:%M")),
                    Style::default().fg(C_DIM).bg(zebra),
                ),
                Span::styled(
                    format!("[{}] ", post.keyword_matched),
                    Style::default()
                        .fg(keyword_color(&post.keyword_matched))
                        .bg(zebra)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("r/{} ", post.subreddit),
                    Style::default().fg(C_DIM).bg(zebra),
                ),
                Span::styled(
                    format!("{} ", post.title),
                    Style::default().fg(C_BRIGHT).bg(zebra),
                ),
                Span::styled(
                    format!("▲{} ", post.upvotes),
                    Style::default().fg(C_POSITIVE).bg(zebra),
                ),
                Span::styled(
                    format!("💬{} ", post.comments),
                    Style::default().fg(C_ACCENT).bg(zebra),
                ),
                Span::styled(
                    format!("{:>6.0} ", post.engagement),
                    Style::default()
                        .fg(C_GOLD)
                        .bg(zebra)
                        .add_modifier(Modifier::BOLD),
                ),
            ]);

            ListItem::new(line).style(Style::default().bg(zebra))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

/// Keyword panel: tracked-keyword chips plus the input line in insert mode
pub fn render_keywords(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    selected: Option<usize>,
    input: Option<&str>,
) {
    let title = format!(" 🏷  KEYWORDS ({}) ", state.keywords.len());
    let block = panel_block(&title, C_HEADER);

    let mut chips = Vec::new();
    for (idx, keyword) in state.keywords.iter().enumerate() {
        let mut style = Style::default()
            .fg(Color::Black)
            .bg(keyword_color(keyword))
            .add_modifier(Modifier::BOLD);
        if selected == Some(idx) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        chips.push(Span::styled(format!(" {} ", keyword), style));
        chips.push(Span::raw(" "));
    }

    let footer = match input {
        Some(buffer) => Line::from(vec![
            Span::styled(" ❯ ", Style::default().fg(C_POSITIVE)),
            Span::styled(buffer.to_string(), Style::default().fg(C_BRIGHT)),
            Span::styled("▏", Style::default().fg(C_POSITIVE)),
        ]),
        None => Line::from(Span::styled(
            " [i] add · [Tab] select · [d] remove selected ",
            Style::default().fg(C_DIM),
        )),
    };

    let paragraph = Paragraph::new(vec![Line::from(chips), footer])
        .wrap(Wrap { trim: true })
        .block(block);

    f.render_widget(paragraph, area);
}

/// Transient status message, styled by severity; nothing when expired
pub fn render_status_message(
    f: &mut Frame,
    area: Rect,
    status: Option<&StatusLine>,
    now: DateTime<Utc>,
) {
    let Some(status) = status else { return };
    if status.is_expired(now) {
        return;
    }

    let symbol = match status.level {
        StatusLevel::Info => "ℹ",
        StatusLevel::Success => "✔",
        StatusLevel::Error => "✖",
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} {} ", symbol, status.message),
            Style::default()
                .fg(status_color(status.level))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("({})  [x] dismiss", status.raised_at.format("%H:%M")),
            Style::default().fg(C_DIM),
        ),
    ]);

    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_color_is_deterministic() {
        let first = keyword_color("AI");
        let second = keyword_color("AI");
        assert_eq!(first, second);

        // Same first character maps to the same palette slot
        assert_eq!(keyword_color("Alpha"), keyword_color("Atlas"));
    }

    #[test]
    fn test_keyword_color_empty_falls_back() {
        assert_eq!(keyword_color(""), C_DIM);
    }

    #[test]
    fn test_rank_style_distinguishes_top_three() {
        for idx in 0..3 {
            assert!(rank_style(idx).add_modifier.contains(Modifier::BOLD));
        }
        assert!(!rank_style(3).add_modifier.contains(Modifier::BOLD));
        assert_eq!(rank_style(3).fg, Some(C_DIM));
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(StatusLevel::Info), C_ACCENT);
        assert_eq!(status_color(StatusLevel::Success), C_POSITIVE);
        assert_eq!(status_color(StatusLevel::Error), C_NEGATIVE);
    }
}
