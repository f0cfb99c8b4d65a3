// src/ui/keybindings.rs
//! Keyboard input handling and key mappings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map digit/shifted-digit keys to section number (1..3).
pub fn map_key_to_digit(k: &KeyEvent) -> Option<usize> {
    if let KeyCode::Char(c) = k.code {
        match c {
            '1' | '!' => Some(1),
            '2' | '@' => Some(2),
            '3' | '#' => Some(3),
            _ => None,
        }
    } else {
        None
    }
}

/// Check if the key event is a shifted symbol (!, @, #).
pub fn is_shifted_symbol(key: &KeyEvent) -> bool {
    matches!(
        key.code,
        KeyCode::Char('!') | KeyCode::Char('@') | KeyCode::Char('#')
    )
}

/// Actions derived from key events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Up,
    Down,
    /// Play the selected track
    Play,
    /// Play the selected track from the start, even if it is active
    Restart,
    TogglePause,
    ToggleMute,
    ToggleDuck,
    VolumeUp,
    VolumeDown,
    PreloadAll,
    ForceStopAll,
    Quit,
    ToggleSection(usize),
    None,
}

/// Convert a key event to an action.
pub fn key_to_action(key: &KeyEvent) -> Action {
    // Check for section toggle first
    if let Some(d) = map_key_to_digit(key) {
        if key.modifiers.contains(KeyModifiers::SHIFT) || is_shifted_symbol(key) {
            return Action::ToggleSection(d);
        }
    }

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Enter | KeyCode::Right => Action::Play,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('m') => Action::ToggleMute,
        KeyCode::Char('d') => Action::ToggleDuck,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::VolumeUp,
        KeyCode::Char('-') => Action::VolumeDown,
        KeyCode::Char('p') => Action::PreloadAll,
        KeyCode::Char('s') => Action::ForceStopAll,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn playback_keys() {
        assert_eq!(key_to_action(&key(KeyCode::Enter)), Action::Play);
        assert_eq!(key_to_action(&key(KeyCode::Char('r'))), Action::Restart);
        assert_eq!(key_to_action(&key(KeyCode::Char(' '))), Action::TogglePause);
        assert_eq!(key_to_action(&key(KeyCode::Char('m'))), Action::ToggleMute);
        assert_eq!(key_to_action(&key(KeyCode::Char('s'))), Action::ForceStopAll);
    }

    #[test]
    fn shifted_digits_toggle_sections() {
        assert_eq!(key_to_action(&key(KeyCode::Char('@'))), Action::ToggleSection(2));
        let shifted = KeyEvent::new(KeyCode::Char('3'), KeyModifiers::SHIFT);
        assert_eq!(key_to_action(&shifted), Action::ToggleSection(3));
        assert_eq!(key_to_action(&key(KeyCode::Char('1'))), Action::None);
    }
}
