//! Chart adapter: turns the stores into chart-ready series and draws them.
//!
//! The post-count window renders as a line chart, engagement as a
//! three-bucket bar chart, and the trend store as a weighted keyword cloud.

use crate::shared::render::{
    C_ACCENT, C_BRIGHT, C_DIM, C_GOLD, C_HEADER, keyword_color, panel_block, placeholder,
};
use crate::shared::state::{HISTORY_WINDOW, HistoryPoint};
use crate::shared::types::{Post, Trend};
use itertools::Itertools;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Chart, Dataset, GraphType, Paragraph, Wrap},
};
use std::collections::VecDeque;

/// Cloud weights map counts linearly onto [16, 36]
pub const CLOUD_MIN_WEIGHT: u16 = 16;
pub const CLOUD_WEIGHT_SPAN: u16 = 20;
/// At most this many cloud entries are shown
pub const CLOUD_LIMIT: usize = 12;

/// Engagement bucket a post falls into: high > 100, 50 < medium ≤ 100, low ≤ 50
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementBand {
    High,
    Medium,
    Low,
}

impl EngagementBand {
    pub fn of(engagement: f64) -> Self {
        if engagement > 100.0 {
            EngagementBand::High
        } else if engagement > 50.0 {
            EngagementBand::Medium
        } else {
            EngagementBand::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EngagementBand::High => "high",
            EngagementBand::Medium => "medium",
            EngagementBand::Low => "low",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            EngagementBand::High => Color::Rgb(34, 197, 94),
            EngagementBand::Medium => Color::Rgb(249, 115, 22),
            EngagementBand::Low => Color::Rgb(239, 68, 68),
        }
    }
}

/// Post counts per engagement band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandCounts {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

pub fn engagement_bands(posts: &[Post]) -> BandCounts {
    let mut counts = BandCounts::default();
    for post in posts {
        match EngagementBand::of(post.engagement) {
            EngagementBand::High => counts.high += 1,
            EngagementBand::Medium => counts.medium += 1,
            EngagementBand::Low => counts.low += 1,
        }
    }
    counts
}

/// One sized keyword-cloud entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEntry {
    pub keyword: String,
    pub count: u64,
    /// Visual weight in [16, 36]; larger counts weigh more
    pub weight: u16,
}

/// Build the cloud: drop zero counts, sort descending by count (stable),
/// cap at [`CLOUD_LIMIT`], and map the count range linearly onto the weight
/// range. A degenerate range (max == min) pins every weight to the minimum.
pub fn cloud_entries(trends: &[Trend]) -> Vec<CloudEntry> {
    let mut top: Vec<&Trend> = trends.iter().filter(|t| t.count > 0).collect();
    top.sort_by(|a, b| b.count.cmp(&a.count));
    top.truncate(CLOUD_LIMIT);

    let Some((min, max)) = top.iter().map(|t| t.count).minmax().into_option() else {
        return Vec::new();
    };

    top.into_iter()
        .map(|t| {
            let weight = if max == min {
                CLOUD_MIN_WEIGHT
            } else {
                let scale = (t.count - min) as f64 / (max - min) as f64;
                (CLOUD_MIN_WEIGHT as f64 + CLOUD_WEIGHT_SPAN as f64 * scale).round() as u16
            };
            CloudEntry {
                keyword: t.keyword.clone(),
                count: t.count,
                weight,
            }
        })
        .collect()
}

/// Map a cloud weight onto terminal emphasis tiers
pub fn weight_style(weight: u16, keyword: &str) -> Style {
    let style = Style::default().fg(keyword_color(keyword));
    if weight >= 30 {
        style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else if weight >= 23 {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

/// Post-count time series over the rolling history window
pub fn render_trend_chart(f: &mut Frame, area: Rect, history: &VecDeque<HistoryPoint>) {
    let block = panel_block(" 📈 POSTS OVER TIME ", C_ACCENT);

    if history.is_empty() {
        placeholder(f, area, block, "Waiting for data...");
        return;
    }

    let points: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.count as f64))
        .collect();
    let max_count = history.iter().map(|p| p.count).max().unwrap_or(0).max(1) as f64;

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(C_ACCENT))
        .data(&points);

    let x_labels: Vec<Span> = history
        .iter()
        .map(|p| Span::styled(p.label.clone(), Style::default().fg(C_DIM)))
        .collect();

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, (HISTORY_WINDOW - 1) as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default().bounds([0.0, max_count]).labels(vec![
                Span::styled("0", Style::default().fg(C_DIM)),
                Span::styled(format!("{max_count:.0}"), Style::default().fg(C_DIM)),
            ]),
        );

    f.render_widget(chart, area);
}

/// Three-bucket engagement distribution of the current post store
pub fn render_engagement_chart(f: &mut Frame, area: Rect, posts: &[Post]) {
    let block = panel_block(" 📊 ENGAGEMENT MIX ", C_GOLD);

    if posts.is_empty() {
        placeholder(f, area, block, "Waiting for data...");
        return;
    }

    let counts = engagement_bands(posts);
    let bars: Vec<Bar> = [
        (EngagementBand::High, counts.high),
        (EngagementBand::Medium, counts.medium),
        (EngagementBand::Low, counts.low),
    ]
    .into_iter()
    .map(|(band, value)| {
        Bar::default()
            .label(Line::from(band.label()))
            .value(value)
            .style(Style::default().fg(band.color()))
            .value_style(
                Style::default()
                    .fg(C_BRIGHT)
                    .bg(band.color())
                    .add_modifier(Modifier::BOLD),
            )
    })
    .collect();

    let chart = BarChart::default()
        .block(block)
        .bar_width(8)
        .bar_gap(2)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

/// Weighted keyword cloud; the selected entry is highlighted for activation
pub fn render_keyword_cloud(
    f: &mut Frame,
    area: Rect,
    entries: &[CloudEntry],
    selected: Option<usize>,
) {
    let block = panel_block(" ☁  KEYWORD CLOUD ", C_HEADER);

    if entries.is_empty() {
        placeholder(f, area, block, "Add keywords to see cloud");
        return;
    }

    let mut spans = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let mut style = weight_style(entry.weight, &entry.keyword);
        if selected == Some(idx) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(
            format!(" {} {} ", entry.keyword, entry.count),
            style,
        ));
        spans.push(Span::raw(" "));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: true })
        .block(block);

    f.render_widget(paragraph, area);
}
