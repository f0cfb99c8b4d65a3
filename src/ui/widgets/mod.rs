// src/ui/widgets/mod.rs
//! Custom widgets for the bgmusic UI.

pub mod help_bar;
pub mod session_panel;
pub mod track_list;

// Re-export widget rendering functions
pub use help_bar::render_help_bar;
pub use session_panel::{render_session_panel, SessionView};
pub use track_list::render_track_list;
