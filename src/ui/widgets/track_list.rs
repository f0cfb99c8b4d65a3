// src/ui/widgets/track_list.rs
//! Catalog track list widget.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::audio::TrackKey;
use crate::ui::icons::icon_for_track;

/// Render the catalog tracks, marking the active and cached ones.
pub fn render_track_list(
    f: &mut Frame<'_>,
    area: Rect,
    tracks: &[TrackKey],
    current: Option<&TrackKey>,
    cached: &[TrackKey],
    state: &mut ListState,
) {
    let items: Vec<ListItem> = tracks
        .iter()
        .map(|key| {
            let icon = icon_for_track(current == Some(key), cached.contains(key));
            ListItem::new(format!("{} {}", icon, key))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("1: Tracks"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, state);
}
