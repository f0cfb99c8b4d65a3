// src/ui/icons.rs
//! Icons for entries in the track list.

/// Icon for a catalog track.
pub fn icon_for_track(is_current: bool, is_cached: bool) -> &'static str {
    match (is_current, is_cached) {
        (true, _) => "\u{f04b}", // play
        (false, true) => "\u{f1c7}", // audio file
        (false, false) => "\u{f15b}", // blank file
    }
}
