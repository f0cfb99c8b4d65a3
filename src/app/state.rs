// src/app/state.rs
//! Application state management.

use crossterm::event::KeyEvent;
use ratatui::{widgets::ListState, Frame};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::{
    audio::{AudioSessionController, PlayerFactory, SessionPhase, TrackKey, TrackLoader},
    ui::{
        keybindings::{key_to_action, Action},
        layout::{compute_layout, Section, SectionVisibility},
        widgets::{render_help_bar, render_session_panel, render_track_list, SessionView},
    },
};

/// Step applied by the volume keys.
const VOLUME_STEP: f32 = 0.1;

/// Main application state.
pub struct App<L, F: PlayerFactory> {
    /// Background music controller
    pub controller: AudioSessionController<L, F>,
    /// Runtime the controller's async work is spawned on
    runtime: Handle,
    /// Catalog keys, in display order
    pub tracks: Vec<TrackKey>,
    /// List widget state
    pub state: ListState,
    /// Currently selected index
    pub selected: usize,
    /// Last action, shown in the help bar
    pub status: String,
    /// Section visibility state
    pub visibility: SectionVisibility,
}

impl<L: TrackLoader, F: PlayerFactory> App<L, F> {
    /// Create a new application instance and request the first track.
    ///
    /// The request is held until the first key press when the controller
    /// waits for a user gesture.
    pub fn new(controller: AudioSessionController<L, F>, runtime: Handle, tracks: Vec<TrackKey>) -> Self {
        let mut state = ListState::default();
        state.select(Some(0));

        let app = Self {
            controller,
            runtime,
            tracks,
            state,
            selected: 0,
            status: String::new(),
            visibility: SectionVisibility::default(),
        };
        if let Some(first) = app.tracks.first().cloned() {
            app.play(first, false);
        }
        app
    }

    /// Handle a key event and return true if the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(&key);
        if action == Action::None {
            return false;
        }
        debug!(?action, "Key action");

        // Any key press is a user gesture; mute registers it itself
        if action != Action::ToggleMute {
            self.controller.register_user_interaction();
        }

        match action {
            Action::ToggleSection(d) => {
                self.visibility.toggle(d);
            }
            Action::Down => {
                if self.selected + 1 < self.tracks.len() {
                    self.selected += 1;
                }
            }
            Action::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            Action::Play | Action::Restart => {
                if let Some(key) = self.tracks.get(self.selected).cloned() {
                    let force_restart = action == Action::Restart;
                    self.status = if force_restart {
                        format!("restarting {}", key)
                    } else {
                        format!("requested {}", key)
                    };
                    self.play(key, force_restart);
                }
            }
            Action::TogglePause => {
                if self.controller.phase() == SessionPhase::Paused {
                    let controller = self.controller.clone();
                    self.runtime.spawn(async move { controller.resume().await });
                    self.status = "resumed".into();
                } else {
                    self.controller.pause();
                    self.status = "paused".into();
                }
            }
            Action::ToggleMute => {
                let muted = !self.controller.is_muted();
                self.controller.set_muted(muted);
                self.status = if muted { "muted".into() } else { "unmuted".into() };
            }
            Action::ToggleDuck => {
                if self.controller.is_ducked() {
                    self.controller.restore_volume();
                    self.status = "volume restored".into();
                } else {
                    self.controller.duck_volume();
                    self.status = "ducked".into();
                }
            }
            Action::VolumeUp | Action::VolumeDown => {
                let step = if action == Action::VolumeUp { VOLUME_STEP } else { -VOLUME_STEP };
                let volume = (self.controller.global_volume() + step).clamp(0.0, 1.0);
                self.controller.set_global_volume(volume);
                self.status = format!("global volume {:.0}%", volume * 100.0);
            }
            Action::PreloadAll => {
                let controller = self.controller.clone();
                let keys = self.tracks.clone();
                self.runtime.spawn(async move {
                    let loaded = controller.preload_set(keys.iter()).await;
                    info!(loaded, total = keys.len(), "Preloaded background music");
                });
                self.status = "preloading all tracks".into();
            }
            Action::ForceStopAll => {
                AudioSessionController::<L, F>::force_stop_all();
                self.status = "stopped all".into();
            }
            Action::Quit => {
                self.controller.cleanup();
                return true; // Signal to quit
            }
            Action::None => {}
        }

        self.state.select(Some(self.selected));
        false
    }

    /// Snapshot of the controller for rendering.
    pub fn session_view(&self) -> SessionView {
        let current = self.controller.current_track();
        let metadata = current
            .as_ref()
            .and_then(|key| self.controller.cached_asset(key))
            .and_then(|asset| asset.metadata.clone());
        SessionView {
            phase: self.controller.phase(),
            current,
            metadata,
            pending: self.controller.pending_request(),
            muted: self.controller.is_muted(),
            ducked: self.controller.is_ducked(),
            user_interacted: self.controller.has_user_interacted(),
            retry_count: self.controller.retry_count(),
            global_volume: self.controller.global_volume(),
            normal_volume: self.controller.normal_volume(),
            player_volume: self.controller.player_volume(),
        }
    }

    /// Draw the application UI.
    pub fn draw(&mut self, f: &mut Frame<'_>) {
        let layout = compute_layout(f.area(), &self.visibility);
        let view = self.session_view();
        let cached = self.controller.cached_tracks();

        for (section, area) in layout.columns {
            match section {
                Section::Tracks => render_track_list(
                    f,
                    area,
                    &self.tracks,
                    view.current.as_ref(),
                    &cached,
                    &mut self.state,
                ),
                Section::Session => render_session_panel(f, area, &view),
            }
        }

        if let Some(help_area) = layout.help_area {
            render_help_bar(f, help_area, &self.status);
        }
    }

    fn play(&self, key: TrackKey, force_restart: bool) {
        let controller = self.controller.clone();
        self.runtime.spawn(async move {
            controller.play_track(key.as_str(), force_restart).await;
        });
    }
}
