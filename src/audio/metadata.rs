// src/audio/metadata.rs
//! Track asset probing using Lofty.

use std::path::Path;
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;

use crate::error::LoadError;

/// Format details of a track asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    /// Title from the primary tag, if any.
    pub title: Option<String>,
    /// Length of one loop iteration.
    pub duration: Duration,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Channel count.
    pub channels: Option<u8>,
}

/// Probe `path` for its format details. Blocking; call it off the async
/// executor.
pub fn probe_track(path: &Path) -> Result<TrackMetadata, LoadError> {
    let tagged_file = Probe::open(path)?.read()?;

    let title = tagged_file
        .primary_tag()
        .and_then(|tag| tag.title().map(|t| t.into_owned()));

    let props = tagged_file.properties();

    Ok(TrackMetadata {
        title,
        duration: props.duration(),
        sample_rate: props.sample_rate(),
        channels: props.channels(),
    })
}
