// src/audio/player.rs
//! Player collaborator contracts.
//!
//! The session controller never touches a concrete audio backend; it builds
//! handles through a [`PlayerFactory`] and drives them through
//! [`PlayerHandle`].

use std::future::Future;

use super::loader::TrackAsset;
use crate::error::PlaybackError;

/// Status reported by a player outside of direct calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    /// The backend hit an error while playing.
    Error(String),
    /// The source ran out. Not expected while looping.
    Finished,
}

/// Callback for [`PlayerStatus`] changes. May run on a backend thread and
/// must not block.
pub type StatusObserver = Box<dyn Fn(PlayerStatus) + Send + Sync + 'static>;

/// A controllable playback handle for one asset.
pub trait PlayerHandle: Send + Sync + 'static {
    /// Start or continue playback.
    fn play(&self) -> impl Future<Output = Result<(), PlaybackError>> + Send;

    /// Pause without releasing anything.
    fn pause(&self);

    /// Halt output.
    fn stop(&self);

    /// Release the underlying resources. Idempotent; a disposed handle
    /// never produces sound again.
    fn dispose(&self);

    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    fn set_looping(&self, looping: bool);

    fn is_looping(&self) -> bool;

    /// Register an observer for status changes.
    fn subscribe(&self, observer: StatusObserver);
}

/// Builds player handles from resolved assets.
pub trait PlayerFactory: Send + Sync + 'static {
    type Handle: PlayerHandle;

    fn create(&self, asset: &TrackAsset) -> Result<Self::Handle, PlaybackError>;
}
