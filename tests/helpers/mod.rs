//! Test helpers for bgmusic integration tests
//!
//! Provides in-memory collaborators for the session controller:
//! - FakeLoader: counts loads, can delay or fail per key
//! - FakeFactory / FakeHandle: scripted play outcomes, records volume and
//!   disposal, and counts moments where two players were audible at once

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use bgmusic::audio::{
    AudioSessionController, PlayerFactory, PlayerHandle, PlayerStatus, SessionSettings, StatusObserver,
    TrackAsset, TrackKey, TrackLoader,
};
use bgmusic::error::{LoadError, PlaybackError};

pub type TestController = AudioSessionController<FakeLoader, FakeFactory>;

/// Loader that serves every key except the ones marked missing.
#[derive(Clone, Default)]
pub struct FakeLoader {
    shared: Arc<LoaderShared>,
}

#[derive(Default)]
struct LoaderShared {
    loads: Mutex<HashMap<String, usize>>,
    delays: Mutex<HashMap<String, Duration>>,
    missing: Mutex<HashSet<String>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loads of `key` take `delay`.
    pub fn with_delay(self, key: &str, delay: Duration) -> Self {
        self.shared.delays.lock().insert(key.to_string(), delay);
        self
    }

    /// Make loads of `key` fail.
    pub fn with_missing(self, key: &str) -> Self {
        self.shared.missing.lock().insert(key.to_string());
        self
    }

    /// Number of loads started for `key`.
    pub fn loads(&self, key: &str) -> usize {
        self.shared.loads.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.shared.loads.lock().values().sum()
    }
}

impl TrackLoader for FakeLoader {
    async fn load(&self, key: &TrackKey) -> Result<TrackAsset, LoadError> {
        *self.shared.loads.lock().entry(key.to_string()).or_default() += 1;

        let delay = self.shared.delays.lock().get(key.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let missing = self.shared.missing.lock().contains(key.as_str());
        if missing {
            return Err(LoadError::UnknownTrack(key.to_string()));
        }
        Ok(TrackAsset {
            key: key.clone(),
            path: PathBuf::from(format!("{}_bg.mp3", key)),
            mime: "audio/mpeg".to_string(),
            metadata: None,
        })
    }
}

/// Factory producing [`FakeHandle`]s and keeping the state of each one.
#[derive(Clone, Default)]
pub struct FakeFactory {
    shared: Arc<FactoryShared>,
}

#[derive(Default)]
struct FactoryShared {
    handles: Mutex<Vec<Arc<HandleState>>>,
    /// Outcomes for upcoming `play` calls, across all handles. Empty means
    /// success.
    script: Mutex<VecDeque<Result<(), PlaybackError>>>,
    fail_create: AtomicBool,
    violations: AtomicUsize,
}

impl FactoryShared {
    fn audible(&self) -> usize {
        self.handles.lock().iter().filter(|h| h.is_audible()).count()
    }

    fn check_audible(&self) {
        if self.audible() > 1 {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next `play` calls.
    pub fn script_play<I>(&self, outcomes: I)
    where
        I: IntoIterator<Item = Result<(), PlaybackError>>,
    {
        self.shared.script.lock().extend(outcomes);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.shared.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Number of handles created so far.
    pub fn created(&self) -> usize {
        self.shared.handles.lock().len()
    }

    pub fn handle(&self, index: usize) -> Arc<HandleState> {
        Arc::clone(&self.shared.handles.lock()[index])
    }

    pub fn last(&self) -> Option<Arc<HandleState>> {
        self.shared.handles.lock().last().cloned()
    }

    /// Handles currently producing sound.
    pub fn audible(&self) -> usize {
        self.shared.audible()
    }

    /// Times two handles were audible together.
    pub fn violations(&self) -> usize {
        self.shared.violations.load(Ordering::SeqCst)
    }
}

impl PlayerFactory for FakeFactory {
    type Handle = FakeHandle;

    fn create(&self, asset: &TrackAsset) -> Result<FakeHandle, PlaybackError> {
        if self.shared.fail_create.load(Ordering::SeqCst) {
            return Err(PlaybackError::Device("no output device".into()));
        }
        let state = Arc::new(HandleState {
            key: asset.key.clone(),
            volume: Mutex::new(1.0),
            playing: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            play_calls: AtomicUsize::new(0),
            observers: Mutex::new(Vec::new()),
        });
        self.shared.handles.lock().push(Arc::clone(&state));
        Ok(FakeHandle {
            state,
            factory: Arc::clone(&self.shared),
        })
    }
}

/// Observable state of one fake player.
pub struct HandleState {
    pub key: TrackKey,
    volume: Mutex<f32>,
    playing: AtomicBool,
    disposed: AtomicBool,
    looping: AtomicBool,
    play_calls: AtomicUsize,
    observers: Mutex<Vec<StatusObserver>>,
}

impl HandleState {
    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn is_audible(&self) -> bool {
        self.is_playing() && !self.is_disposed() && self.volume() > 0.0
    }

    /// Simulate the source running out.
    pub fn finish(&self) {
        self.playing.store(false, Ordering::SeqCst);
        for observer in self.observers.lock().iter() {
            observer(PlayerStatus::Finished);
        }
    }
}

pub struct FakeHandle {
    state: Arc<HandleState>,
    factory: Arc<FactoryShared>,
}

impl PlayerHandle for FakeHandle {
    async fn play(&self) -> Result<(), PlaybackError> {
        self.state.play_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.is_disposed() {
            return Err(PlaybackError::Disposed);
        }
        let outcome = self.factory.script.lock().pop_front().unwrap_or(Ok(()));
        outcome?;
        self.state.playing.store(true, Ordering::SeqCst);
        self.factory.check_audible();
        Ok(())
    }

    fn pause(&self) {
        self.state.playing.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.state.playing.store(false, Ordering::SeqCst);
    }

    fn dispose(&self) {
        self.state.disposed.store(true, Ordering::SeqCst);
        self.state.playing.store(false, Ordering::SeqCst);
        self.state.observers.lock().clear();
    }

    fn set_volume(&self, volume: f32) {
        *self.state.volume.lock() = volume.clamp(0.0, 1.0);
        self.factory.check_audible();
    }

    fn volume(&self) -> f32 {
        self.state.volume()
    }

    fn set_looping(&self, looping: bool) {
        self.state.looping.store(looping, Ordering::SeqCst);
    }

    fn is_looping(&self) -> bool {
        self.state.is_looping()
    }

    fn subscribe(&self, observer: StatusObserver) {
        self.state.observers.lock().push(observer);
    }
}

/// Controller over fresh fakes.
pub fn controller_with(settings: SessionSettings) -> (TestController, FakeLoader, FakeFactory) {
    controller_over(FakeLoader::new(), settings)
}

/// Controller over `loader` and a fresh factory.
pub fn controller_over(loader: FakeLoader, settings: SessionSettings) -> (TestController, FakeLoader, FakeFactory) {
    let factory = FakeFactory::new();
    let controller = AudioSessionController::new(loader.clone(), factory.clone(), settings);
    (controller, loader, factory)
}

/// Controller that has already seen a user gesture.
pub fn unlocked_controller() -> (TestController, FakeLoader, FakeFactory) {
    let (controller, loader, factory) = controller_with(SessionSettings::default());
    controller.register_user_interaction();
    (controller, loader, factory)
}

/// Let spawned work run. Timers further out than a few milliseconds stay
/// pending.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Let spawned work run, including backoff sleeps.
pub async fn settle_for(duration: Duration) {
    tokio::time::sleep(duration).await;
}
