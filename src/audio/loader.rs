// src/audio/loader.rs
//! Resolution of track keys into playable assets.

use std::future::Future;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::metadata::{probe_track, TrackMetadata};
use super::track::{TrackCatalog, TrackKey};
use crate::error::LoadError;
use crate::fs::detect_file_type;

/// A resolved, playable track asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAsset {
    pub key: TrackKey,
    pub path: PathBuf,
    pub mime: String,
    /// Format details, when the asset could be probed.
    pub metadata: Option<TrackMetadata>,
}

/// Turns a track key into playable asset data.
///
/// A failure means "no music for this key"; the caller decides what that
/// implies.
pub trait TrackLoader: Send + Sync + 'static {
    fn load(&self, key: &TrackKey) -> impl Future<Output = Result<TrackAsset, LoadError>> + Send;
}

/// Loads assets from disk through a [`TrackCatalog`].
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    catalog: TrackCatalog,
}

impl CatalogLoader {
    pub fn new(catalog: TrackCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }
}

impl TrackLoader for CatalogLoader {
    async fn load(&self, key: &TrackKey) -> Result<TrackAsset, LoadError> {
        let path = self
            .catalog
            .path_for(key)
            .ok_or_else(|| LoadError::UnknownTrack(key.to_string()))?;
        let key = key.clone();

        // Sniffing and probing both hit the disk
        tokio::task::spawn_blocking(move || inspect_asset(key, path))
            .await
            .map_err(|e| LoadError::Task(e.to_string()))?
    }
}

fn inspect_asset(key: TrackKey, path: PathBuf) -> Result<TrackAsset, LoadError> {
    if !path.is_file() {
        return Err(LoadError::MissingAsset(path));
    }

    let file_type = detect_file_type(&path)?;
    if !file_type.is_audio() {
        return Err(LoadError::NotAudio {
            path,
            mime: file_type.mime,
        });
    }

    // Tags are optional for playback; rodio may still decode what lofty cannot read
    let metadata = match probe_track(&path) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!(track = %key, path = %path.display(), "Could not probe track asset: {}", e);
            None
        }
    };

    debug!(track = %key, mime = %file_type.mime, "Resolved track asset");
    Ok(TrackAsset {
        key,
        path,
        mime: file_type.mime,
        metadata,
    })
}
