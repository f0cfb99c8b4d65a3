// src/ui/widgets/session_panel.rs
//! Session status panel widget.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::audio::{SessionPhase, TrackKey, TrackMetadata, TrackRequest};

/// Snapshot of the controller taken once per frame.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub current: Option<TrackKey>,
    pub metadata: Option<TrackMetadata>,
    pub pending: Option<TrackRequest>,
    pub muted: bool,
    pub ducked: bool,
    pub user_interacted: bool,
    pub retry_count: u32,
    pub global_volume: f32,
    pub normal_volume: f32,
    pub player_volume: Option<f32>,
}

/// Render the session panel.
pub fn render_session_panel(f: &mut Frame<'_>, area: Rect, view: &SessionView) {
    f.render_widget(
        Block::default().borders(Borders::ALL).title("2: Session"),
        area,
    );

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    let mut lines = vec![
        format!(
            "Track: {}",
            view.current.as_ref().map_or("none", TrackKey::as_str)
        ),
    ];
    if let Some(meta) = &view.metadata {
        if let Some(title) = &meta.title {
            lines.push(format!("Title: {}", title));
        }
        lines.push(format!("Loop length: {}s", meta.duration.as_secs()));
        if let Some(rate) = meta.sample_rate {
            lines.push(format!("Sample rate: {} Hz", rate));
        }
        if let Some(channels) = meta.channels {
            lines.push(format!("Channels: {}", channels));
        }
    }
    if let Some(pending) = &view.pending {
        lines.push(format!("Pending: {} (#{})", pending.key, pending.seq));
    }
    if !view.user_interacted {
        lines.push("Waiting for a key press before audio can start".to_string());
    }
    if view.retry_count > 0 {
        lines.push(format!("Retry: {}", view.retry_count));
    }
    lines.push(format!(
        "Base volume: {:.0}%  Player volume: {}",
        view.normal_volume * 100.0,
        view.player_volume
            .map_or_else(|| "-".to_string(), |v| format!("{:.0}%", v * 100.0))
    ));
    f.render_widget(
        Paragraph::new(lines.join("\n")).wrap(Wrap { trim: true }),
        inner[0],
    );

    let (label, color) = phase_label(view.phase);
    let mut status = vec![Span::styled(
        format!(" {} ", label),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    if view.muted {
        status.push(Span::styled(" muted ", Style::default().fg(Color::Red)));
    }
    if view.ducked {
        status.push(Span::styled(" ducked ", Style::default().fg(Color::Yellow)));
    }
    f.render_widget(
        Paragraph::new(Line::from(status)).alignment(Alignment::Center),
        inner[1],
    );

    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC))
            .ratio(f64::from(view.global_volume).clamp(0.0, 1.0))
            .label(format!("Global volume {:.0}%", view.global_volume * 100.0)),
        inner[2],
    );
}

fn phase_label(phase: SessionPhase) -> (&'static str, Color) {
    match phase {
        SessionPhase::Idle => ("⏹ idle", Color::Gray),
        SessionPhase::Transitioning => ("… switching", Color::Cyan),
        SessionPhase::Playing => ("⏵ playing", Color::Green),
        SessionPhase::PlayingMuted => ("⏵ playing (muted)", Color::Red),
        SessionPhase::Paused => ("⏸ paused", Color::Yellow),
        SessionPhase::AwaitingInteraction => ("⏳ waiting for input", Color::Cyan),
        SessionPhase::Failed => ("✖ failed", Color::Red),
    }
}
