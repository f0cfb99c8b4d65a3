// src/audio/track.rs
//! Track identifiers and the static catalog mapping them to asset files.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Level tracks shipped with the game, keyed by level name.
const BUILTIN_TRACKS: &[(&str, &str)] = &[
    ("farm", "farm_bg.mp3"),
    ("forest", "forest_bg.mp3"),
    ("jungle", "jungle_bg.mp3"),
    ("desert", "desert_bg.mp3"),
    ("ocean", "ocean_bg.mp3"),
    ("savannah", "savannah_bg.mp3"),
    ("arctic", "arctic_bg.mp3"),
    ("birds", "birds_bg.mp3"),
    ("insects", "insects_bg.mp3"),
];

/// Normalized identifier of a loopable music track (trimmed, lower-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey(String);

impl TrackKey {
    /// Normalize `raw`; returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrackKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TrackKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for TrackKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One request to play a track. `seq` orders requests: a larger value always
/// supersedes a smaller one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    pub key: TrackKey,
    pub force_restart: bool,
    pub seq: u64,
}

/// Lookup table from track key to asset file name, resolved against an asset
/// directory.
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    asset_dir: PathBuf,
    entries: BTreeMap<TrackKey, String>,
}

impl TrackCatalog {
    /// Catalog of the built-in level tracks under `asset_dir`.
    pub fn builtin(asset_dir: impl Into<PathBuf>) -> Self {
        let entries = BUILTIN_TRACKS
            .iter()
            .filter_map(|(key, file)| TrackKey::parse(key).map(|k| (k, file.to_string())))
            .collect();
        Self {
            asset_dir: asset_dir.into(),
            entries,
        }
    }

    /// Add or replace entries. Keys are normalized; blank keys are skipped.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, file) in overrides {
            if let Some(key) = TrackKey::parse(key) {
                self.entries.insert(key, file.clone());
            }
        }
        self
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Full path of the asset registered for `key`.
    pub fn path_for(&self, key: &TrackKey) -> Option<PathBuf> {
        self.entries.get(key).map(|file| self.asset_dir.join(file))
    }

    /// All registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &TrackKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_trimmed_and_lowercased() {
        let key = TrackKey::parse("  Farm \n").unwrap();
        assert_eq!(key.as_str(), "farm");
        assert_eq!(key, TrackKey::parse("FARM").unwrap());
    }

    #[test]
    fn blank_keys_are_rejected() {
        assert!(TrackKey::parse("").is_none());
        assert!(TrackKey::parse("   ").is_none());
    }

    #[test]
    fn builtin_catalog_resolves_level_tracks() {
        let catalog = TrackCatalog::builtin("/assets");
        let ocean = TrackKey::parse("Ocean").unwrap();
        assert_eq!(
            catalog.path_for(&ocean),
            Some(PathBuf::from("/assets/ocean_bg.mp3"))
        );
        assert_eq!(catalog.len(), 9);
        assert!(catalog.path_for(&TrackKey::parse("menu").unwrap()).is_none());
    }

    #[test]
    fn overrides_are_normalized_and_replace_builtins() {
        let mut extra = BTreeMap::new();
        extra.insert(" Menu ".to_string(), "menu_theme.ogg".to_string());
        extra.insert("farm".to_string(), "farm_v2.ogg".to_string());
        extra.insert("  ".to_string(), "ignored.ogg".to_string());

        let catalog = TrackCatalog::builtin("a").with_overrides(&extra);

        assert_eq!(
            catalog.path_for(&TrackKey::parse("menu").unwrap()),
            Some(PathBuf::from("a/menu_theme.ogg"))
        );
        assert_eq!(
            catalog.path_for(&TrackKey::parse("farm").unwrap()),
            Some(PathBuf::from("a/farm_v2.ogg"))
        );
        assert_eq!(catalog.len(), 10);
    }
}
