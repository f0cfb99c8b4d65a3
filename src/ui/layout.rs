// src/ui/layout.rs
//! Layout computation for the UI panels.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Visibility state for UI sections.
#[derive(Debug, Clone, Copy)]
pub struct SectionVisibility {
    pub tracks: bool,
    pub session: bool,
    pub help: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            tracks: true,
            session: true,
            help: true,
        }
    }
}

impl SectionVisibility {
    /// Toggle a section by number (1-3).
    pub fn toggle(&mut self, section: usize) {
        match section {
            1 => self.tracks = !self.tracks,
            2 => self.session = !self.session,
            3 => self.help = !self.help,
            _ => {}
        }
    }
}

/// A column of the main area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Tracks,
    Session,
}

/// Computed layout areas for rendering.
pub struct ComputedLayout {
    /// Bottom key help line (if visible)
    pub help_area: Option<Rect>,
    /// Visible columns, left to right
    pub columns: Vec<(Section, Rect)>,
}

/// Compute the layout based on total area and section visibility.
pub fn compute_layout(area: Rect, visibility: &SectionVisibility) -> ComputedLayout {
    let (main_area, help_area) = if visibility.help {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);
        (vertical_chunks[0], Some(vertical_chunks[1]))
    } else {
        (area, None)
    };

    let mut sections = Vec::new();
    let mut weights = Vec::new();

    if visibility.tracks {
        sections.push(Section::Tracks);
        weights.push(30u16);
    }
    if visibility.session {
        sections.push(Section::Session);
        weights.push(70u16);
    }

    let sum: u16 = weights.iter().copied().sum();
    let constraints: Vec<Constraint> = weights
        .into_iter()
        .map(|w| Constraint::Percentage((w as u32 * 100 / sum.max(1) as u32) as u16))
        .collect();
    let rects = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(main_area);

    ComputedLayout {
        help_area,
        columns: sections.into_iter().zip(rects.iter().copied()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_sections_get_no_area() {
        let mut visibility = SectionVisibility::default();
        visibility.toggle(1);
        visibility.toggle(3);

        let layout = compute_layout(Rect::new(0, 0, 100, 40), &visibility);
        assert!(layout.help_area.is_none());
        assert_eq!(layout.columns.len(), 1);
        assert_eq!(layout.columns[0].0, Section::Session);
        assert_eq!(layout.columns[0].1.width, 100);
    }

    #[test]
    fn default_layout_has_both_columns_and_help() {
        let layout = compute_layout(Rect::new(0, 0, 100, 40), &SectionVisibility::default());
        assert_eq!(layout.help_area.map(|r| r.height), Some(3));
        let sections: Vec<Section> = layout.columns.iter().map(|(s, _)| *s).collect();
        assert_eq!(sections, vec![Section::Tracks, Section::Session]);
    }
}
