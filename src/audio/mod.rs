// src/audio/mod.rs
//! Audio module - track catalog, asset loading, players and the background
//! music session controller.

pub mod cache;
pub mod loader;
pub mod metadata;
pub mod player;
pub mod rodio_backend;
pub mod session;
pub mod track;

// Re-export commonly used types
pub use cache::TrackAssetCache;
pub use loader::{CatalogLoader, TrackAsset, TrackLoader};
pub use metadata::TrackMetadata;
pub use player::{PlayerFactory, PlayerHandle, PlayerStatus, StatusObserver};
pub use rodio_backend::{RodioBackend, RodioPlayer};
pub use session::{force_stop_all, AudioSessionController, SessionPhase, SessionSettings};
pub use track::{TrackCatalog, TrackKey, TrackRequest};
