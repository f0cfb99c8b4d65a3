// src/audio/cache.rs
//! Memoized track assets.
//!
//! Entries are never evicted: the track universe is small and fixed, and an
//! asset that resolved once is never loaded again. Concurrent requests for
//! the same key share a single in-flight load.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use super::loader::TrackAsset;
use super::track::TrackKey;
use crate::error::LoadError;

type Slot = Arc<OnceCell<Arc<TrackAsset>>>;

#[derive(Default)]
pub struct TrackAssetCache {
    slots: Mutex<HashMap<TrackKey, Slot>>,
}

impl TrackAssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached asset for `key`, without loading.
    pub fn get(&self, key: &TrackKey) -> Option<Arc<TrackAsset>> {
        self.slots.lock().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Return the cached asset for `key`, running `load` if it is absent.
    ///
    /// A failed load leaves the slot empty so a later call can try again.
    pub async fn get_or_load<F, Fut>(&self, key: &TrackKey, load: F) -> Result<Arc<TrackAsset>, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TrackAsset, LoadError>>,
    {
        let slot = self.slot(key);
        let asset = slot
            .get_or_try_init(|| async move { load().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(asset))
    }

    /// Keys with a resolved asset, sorted.
    pub fn keys(&self) -> Vec<TrackKey> {
        let mut keys: Vec<TrackKey> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &TrackKey) -> Slot {
        Arc::clone(self.slots.lock().entry(key.clone()).or_default())
    }
}
