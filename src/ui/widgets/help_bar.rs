// src/ui/widgets/help_bar.rs
//! Key help line.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYS: &[(&str, &str)] = &[
    ("⏎", "play"),
    ("r", "restart"),
    ("␣", "pause"),
    ("m", "mute"),
    ("d", "duck"),
    ("+/-", "volume"),
    ("p", "preload"),
    ("s", "stop all"),
    ("q", "quit"),
];

pub fn render_help_bar(f: &mut Frame<'_>, area: Rect, status: &str) {
    let mut spans = Vec::with_capacity(KEYS.len() * 3);
    for (key, label) in KEYS {
        spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(format!(" {}", label)));
        spans.push(Span::raw("  "));
    }

    let title = if status.is_empty() {
        "3: Keys".to_string()
    } else {
        format!("3: Keys | {}", status)
    };
    f.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}
