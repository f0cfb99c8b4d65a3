// src/error.rs
//! Error types for bgmusic.
//!
//! Collaborators report failures through these enums; the session controller
//! matches on them and never hands them back to its own callers.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a track key into a playable asset.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The key has no entry in the track catalog.
    #[error("No background music registered for track '{0}'")]
    UnknownTrack(String),

    /// The catalog names a file that does not exist.
    #[error("Track asset not found: {0}")]
    MissingAsset(PathBuf),

    /// The file exists but is not an audio file.
    #[error("Track asset {path} is not audio (detected {mime})")]
    NotAudio { path: PathBuf, mime: String },

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tag/format probing failed.
    #[error("Failed to probe track asset: {0}")]
    Probe(#[from] lofty::error::LoftyError),

    /// The blocking load task did not complete.
    #[error("Track load task failed: {0}")]
    Task(String),
}

/// Failure reported by a player backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The platform refused to start audio without a prior user gesture.
    #[error("Autoplay blocked: {0}")]
    AutoplayBlocked(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    Device(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Transient rejection from the platform player.
    #[error("Playback rejected: {0}")]
    Rejected(String),

    /// The handle was already disposed.
    #[error("Player handle has been disposed")]
    Disposed,
}

impl PlaybackError {
    /// Whether this failure carries the platform's autoplay-block signature.
    pub fn is_autoplay_block(&self) -> bool {
        matches!(self, PlaybackError::AutoplayBlocked(_))
    }
}

/// Configuration file loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
