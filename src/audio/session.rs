// src/audio/session.rs
//! Background music session controller.
//!
//! Owns at most one live player at a time. Every path that builds a new
//! player first disposes the previous one, so two tracks are never audible
//! together. Failures end in silence, never in an error returned to the
//! caller.
//!
//! Requests are numbered. The newest request always wins: a switch that
//! finds a newer request after one of its suspension points abandons its
//! work, and the single `pending` slot holds the newest unserved request,
//! whether it is waiting for a user gesture or for the in-flight switch to
//! finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use super::cache::TrackAssetCache;
use super::loader::{TrackAsset, TrackLoader};
use super::player::{PlayerFactory, PlayerHandle, PlayerStatus, StatusObserver};
use super::track::{TrackKey, TrackRequest};
use crate::config::Config;
use crate::error::{LoadError, PlaybackError};

/// Tunables for an [`AudioSessionController`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Base volume before the global multiplier and ducking.
    pub normal_volume: f32,
    pub global_volume: f32,
    /// Fraction of the full volume kept while ducked.
    pub duck_factor: f32,
    pub start_muted: bool,
    /// Hold requests until a user gesture has been observed.
    pub require_user_gesture: bool,
    /// Retries after the first failed start.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// Added to the delay for every retry already made.
    pub retry_step: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            normal_volume: 0.8,
            global_volume: 1.0,
            duck_factor: 0.1,
            start_muted: false,
            require_user_gesture: true,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            retry_step: Duration::from_millis(500),
        }
    }
}

impl SessionSettings {
    /// Delay before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay + self.retry_step * attempt
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            normal_volume: config.volume.normal,
            global_volume: config.volume.global,
            duck_factor: config.volume.duck_factor,
            start_muted: config.playback.start_muted,
            require_user_gesture: config.playback.require_user_gesture,
            max_retries: config.playback.max_retries,
            retry_base_delay: Duration::from_millis(config.playback.retry_base_delay_ms),
            retry_step: Duration::from_millis(config.playback.retry_step_ms),
        }
    }
}

/// Coarse state of the controller, for display and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session.
    Idle,
    /// A track switch (or a first start) is in flight.
    Transitioning,
    Playing,
    /// A session exists but the controller is muted.
    PlayingMuted,
    Paused,
    /// A request is held until the user interacts.
    AwaitingInteraction,
    /// Retries exhausted; the session is silent.
    Failed,
}

/// The one live player and what it is playing.
struct ActiveSession<H> {
    id: u64,
    key: TrackKey,
    handle: Arc<H>,
    /// Set by the status observer when the source runs out.
    ended: Arc<AtomicBool>,
    started: bool,
    paused: bool,
    failed: bool,
    /// A start loop (attempts plus backoff) is running for this session.
    starting: bool,
}

struct ControllerState<H> {
    session: Option<ActiveSession<H>>,
    muted: bool,
    global_volume: f32,
    normal_volume: f32,
    ducked: bool,
    /// Sequence number of the request that owns the in-flight switch.
    transition: Option<u64>,
    user_interacted: bool,
    /// The player refused to start before any user gesture.
    autoplay_blocked: bool,
    pending: Option<TrackRequest>,
    retry_count: u32,
    /// Newest request sequence number; anything older is superseded.
    latest_seq: u64,
    next_session_id: u64,
}

impl<H> ControllerState<H> {
    fn full_volume(&self) -> f32 {
        self.normal_volume * self.global_volume
    }

    fn live_volume(&self, duck_factor: f32) -> f32 {
        if self.ducked {
            self.full_volume() * duck_factor
        } else {
            self.full_volume()
        }
    }

    fn owned_session(&mut self, id: u64) -> Option<&mut ActiveSession<H>> {
        self.session.as_mut().filter(|s| s.id == id)
    }
}

/// What to do with a freshly admitted request.
enum Admission<H> {
    Deferred(TrackRequest),
    Coalesced(TrackRequest),
    Resume(ResumeTarget<H>),
    Switch(TrackRequest),
}

/// How a queued switch starts once its turn comes.
enum SwitchStart<H> {
    Superseded,
    Resume(ResumeTarget<H>),
    Fresh,
}

struct ResumeTarget<H> {
    id: u64,
    key: TrackKey,
    handle: Arc<H>,
}

enum FailureAction {
    Stale,
    Deferred,
    Retry(Duration),
    GiveUp,
}

enum StartOutcome {
    Playing,
    /// Paused or muted while the start was in flight.
    Silenced,
    Stale,
}

struct Inner<L, F: PlayerFactory> {
    loader: L,
    factory: F,
    cache: TrackAssetCache,
    settings: SessionSettings,
    state: Mutex<ControllerState<F::Handle>>,
}

/// Controls the single background music track.
///
/// Cheap to clone; clones share the same session. Construct one at the
/// application root and hand it to whatever needs music.
pub struct AudioSessionController<L, F: PlayerFactory> {
    inner: Arc<Inner<L, F>>,
}

impl<L, F: PlayerFactory> Clone for AudioSessionController<L, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: TrackLoader, F: PlayerFactory> AudioSessionController<L, F> {
    pub fn new(loader: L, factory: F, settings: SessionSettings) -> Self {
        let state = ControllerState {
            session: None,
            muted: settings.start_muted,
            global_volume: settings.global_volume.clamp(0.0, 1.0),
            normal_volume: settings.normal_volume.clamp(0.0, 1.0),
            ducked: false,
            transition: None,
            user_interacted: false,
            autoplay_blocked: false,
            pending: None,
            retry_count: 0,
            latest_seq: 0,
            next_session_id: 0,
        };
        let inner = Arc::new(Inner {
            loader,
            factory,
            cache: TrackAssetCache::new(),
            settings,
            state: Mutex::new(state),
        });

        let weak: Weak<dyn Teardown> = Arc::downgrade(&inner) as Weak<dyn Teardown>;
        registry::register(weak);

        Self { inner }
    }

    /// Play the track for `key`, switching away from whatever is playing.
    ///
    /// Asking for the active track again only makes sure it is playing at
    /// full volume, unless `force_restart` is set.
    pub async fn play_track(&self, key: &str, force_restart: bool) {
        let Some(key) = TrackKey::parse(key) else {
            warn!("Ignoring play request with an empty track key");
            return;
        };
        debug!(track = %key, force_restart, "Play requested");

        let admission = self.inner.admit(key, force_restart);
        self.serve(admission).await;
    }

    /// Serve a request that was held back, under its original sequence
    /// number. Does nothing if a newer request arrived in the meantime.
    async fn replay(&self, request: TrackRequest) {
        match self.inner.readmit(request) {
            Some(admission) => self.serve(admission).await,
            None => debug!("Pending request superseded before it could be served"),
        }
    }

    async fn serve(&self, admission: Admission<F::Handle>) {
        match admission {
            Admission::Deferred(request) => {
                debug!(track = %request.key, "No user interaction yet; deferring playback")
            }
            Admission::Coalesced(request) => {
                debug!(track = %request.key, "Track switch in flight; request queued behind it")
            }
            Admission::Resume(target) => self.resume_session(target).await,
            Admission::Switch(request) => self.run_transition(request).await,
        }
    }

    /// Note a genuine user gesture. Serves the pending request, if any.
    pub fn register_user_interaction(&self) {
        if let Some(request) = self.inner.unlock() {
            self.spawn_request(request);
        }
    }

    /// Pause the active player without releasing it.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if let Some(session) = state.session.as_mut() {
            session.handle.pause();
            session.paused = true;
            debug!(track = %session.key, "Background music paused");
        }
    }

    /// Resume the active player at full volume, retrying like a fresh start.
    pub async fn resume(&self) {
        let Some(target) = self.inner.prepare_resume(None) else {
            return;
        };
        debug!(track = %target.key, "Resuming background music");
        self.play_with_retry(target.handle, &target.key, target.id).await;
    }

    /// Mute or unmute. Counts as a user interaction.
    pub fn set_muted(&self, muted: bool) {
        self.inner.state.lock().muted = muted;
        info!(muted, "Background music mute changed");

        self.register_user_interaction();
        if muted {
            self.pause();
        } else {
            self.spawn_resume();
        }
    }

    /// Drop the live player to a fraction of its volume while a foreground
    /// sound plays.
    pub fn duck_volume(&self) {
        let duck_factor = self.inner.settings.duck_factor;
        let mut state = self.inner.state.lock();
        if state.muted {
            return;
        }
        let volume = state.full_volume() * duck_factor;
        let Some(session) = state.session.as_ref() else {
            return;
        };
        session.handle.set_volume(volume);
        trace!(track = %session.key, volume, "Ducked background music");
        state.ducked = true;
    }

    /// Undo [`duck_volume`](Self::duck_volume).
    pub fn restore_volume(&self) {
        let mut state = self.inner.state.lock();
        if state.muted {
            return;
        }
        let volume = state.full_volume();
        let Some(session) = state.session.as_ref() else {
            return;
        };
        session.handle.set_volume(volume);
        trace!(track = %session.key, volume, "Restored background music volume");
        state.ducked = false;
    }

    /// Set the global multiplier, clamped into `[0, 1]`, and apply it live.
    pub fn set_global_volume(&self, volume: f32) {
        if volume.is_nan() {
            warn!("Ignoring NaN global volume");
            return;
        }
        let mut state = self.inner.state.lock();
        state.global_volume = volume.clamp(0.0, 1.0);
        self.inner.apply_live_volume(&state);
    }

    /// Set the base volume preference, clamped into `[0, 1]`, and apply it live.
    pub fn set_normal_volume(&self, volume: f32) {
        if volume.is_nan() {
            warn!("Ignoring NaN base volume");
            return;
        }
        let mut state = self.inner.state.lock();
        state.normal_volume = volume.clamp(0.0, 1.0);
        self.inner.apply_live_volume(&state);
    }

    /// Resolve and cache the asset for `key` without playing it. Returns
    /// whether the asset is available.
    pub async fn preload_track(&self, key: &str) -> bool {
        let Some(key) = TrackKey::parse(key) else {
            return false;
        };
        match self.resolve(&key).await {
            Ok(_) => true,
            Err(e) => {
                warn!(track = %key, "Could not preload background music: {}", e);
                false
            }
        }
    }

    /// Preload several tracks concurrently. Returns how many are available.
    pub async fn preload_set<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        let results = futures::future::join_all(keys.iter().map(|k| self.preload_track(k))).await;
        results.into_iter().filter(|ok| *ok).count()
    }

    /// Dispose the active session and forget pending and in-flight work.
    pub fn cleanup(&self) {
        self.inner.reset();
    }

    /// Silence every live controller in the process.
    pub fn force_stop_all() {
        force_stop_all();
    }

    /// Key of the active session.
    pub fn current_track(&self) -> Option<TrackKey> {
        self.inner.state.lock().session.as_ref().map(|s| s.key.clone())
    }

    /// True when a session exists and the controller is not muted.
    pub fn is_playing(&self) -> bool {
        let state = self.inner.state.lock();
        !state.muted && state.session.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.inner.state.lock();
        if state.transition.is_some() {
            return SessionPhase::Transitioning;
        }
        match &state.session {
            None if state.pending.is_some() => SessionPhase::AwaitingInteraction,
            None => SessionPhase::Idle,
            Some(s) if s.ended.load(Ordering::SeqCst) => SessionPhase::Idle,
            Some(_) if state.pending.is_some() => SessionPhase::AwaitingInteraction,
            Some(_) if state.muted => SessionPhase::PlayingMuted,
            Some(s) if s.failed => SessionPhase::Failed,
            Some(s) if s.paused => SessionPhase::Paused,
            Some(s) if s.started => SessionPhase::Playing,
            // First start still in flight
            Some(_) => SessionPhase::Transitioning,
        }
    }

    pub fn pending_request(&self) -> Option<TrackRequest> {
        self.inner.state.lock().pending.clone()
    }

    /// Retry number of the latest start attempt.
    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retry_count
    }

    pub fn is_muted(&self) -> bool {
        self.inner.state.lock().muted
    }

    pub fn is_ducked(&self) -> bool {
        self.inner.state.lock().ducked
    }

    pub fn has_user_interacted(&self) -> bool {
        self.inner.state.lock().user_interacted
    }

    pub fn global_volume(&self) -> f32 {
        self.inner.state.lock().global_volume
    }

    pub fn normal_volume(&self) -> f32 {
        self.inner.state.lock().normal_volume
    }

    /// Volume currently set on the live player.
    pub fn player_volume(&self) -> Option<f32> {
        self.inner.state.lock().session.as_ref().map(|s| s.handle.volume())
    }

    /// Tracks whose assets are cached.
    pub fn cached_tracks(&self) -> Vec<TrackKey> {
        self.inner.cache.keys()
    }

    /// Cached asset for `key`, if it has been resolved.
    pub fn cached_asset(&self, key: &TrackKey) -> Option<Arc<TrackAsset>> {
        self.inner.cache.get(key)
    }

    async fn resolve(&self, key: &TrackKey) -> Result<Arc<TrackAsset>, LoadError> {
        if let Some(asset) = self.inner.cache.get(key) {
            trace!(track = %key, "Track asset cache hit");
            return Ok(asset);
        }
        let loader = &self.inner.loader;
        self.inner
            .cache
            .get_or_load(key, || async move {
                debug!(track = %key, "Loading track asset");
                loader.load(key).await
            })
            .await
    }

    /// Serve `first`, then anything that queued up behind it, while holding
    /// the transition slot.
    async fn run_transition(&self, first: TrackRequest) {
        let owner = first.seq;
        let _guard = TransitionGuard {
            inner: Arc::clone(&self.inner),
            owner,
        };

        let mut request = first;
        loop {
            self.switch_to(&request).await;
            match self.inner.next_queued(owner) {
                Some(next) => {
                    debug!(track = %next.key, "Serving request queued during switch");
                    request = next;
                }
                None => break,
            }
        }
    }

    async fn switch_to(&self, request: &TrackRequest) {
        match self.inner.begin_switch(request) {
            SwitchStart::Superseded => {
                debug!(track = %request.key, "Switch superseded before it started");
                return;
            }
            SwitchStart::Resume(target) => {
                self.resume_session(target).await;
                return;
            }
            SwitchStart::Fresh => {}
        }

        let asset = match self.resolve(&request.key).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!(track = %request.key, "No background music for track: {}", e);
                return;
            }
        };
        if self.inner.is_superseded(request.seq) {
            debug!(track = %request.key, "Switch superseded while loading");
            return;
        }

        let handle = match self.inner.factory.create(&asset) {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                warn!(track = %request.key, "Failed to create background music player: {}", e);
                return;
            }
        };
        handle.set_looping(true);
        let ended = Arc::new(AtomicBool::new(false));
        handle.subscribe(session_observer(request.key.clone(), Arc::clone(&ended)));

        let Some((id, audible)) = self.inner.install(request, Arc::clone(&handle), ended) else {
            handle.dispose();
            debug!(track = %request.key, "Switch superseded; discarded unused player");
            return;
        };
        info!(track = %request.key, "Background music session created");

        if audible {
            self.play_with_retry(handle, &request.key, id).await;
        } else {
            debug!(track = %request.key, "Muted; session created silent");
        }
    }

    async fn resume_session(&self, target: ResumeTarget<F::Handle>) {
        let Some(target) = self.inner.prepare_resume(Some(target.id)) else {
            trace!(track = %target.key, "Same track requested while muted or gone");
            return;
        };
        debug!(track = %target.key, "Same track already loaded; resuming");
        self.play_with_retry(target.handle, &target.key, target.id).await;
    }

    /// Start `handle`, retrying with linear backoff. Stops as soon as session
    /// `id` is no longer the active one.
    async fn play_with_retry(&self, handle: Arc<F::Handle>, key: &TrackKey, id: u64) {
        if !self.inner.claim_start(id) {
            debug!(track = %key, "Start already in progress; it will pick up the resume");
            return;
        }
        let _start = StartGuard {
            inner: Arc::clone(&self.inner),
            id,
        };

        let mut attempt = 0;
        loop {
            if !self.inner.begin_attempt(id, attempt) {
                debug!(track = %key, attempt, "Start abandoned; session no longer wants playback");
                return;
            }

            let err = match handle.play().await {
                Ok(()) => {
                    match self.inner.finish_start(id) {
                        StartOutcome::Playing => info!(track = %key, attempt, "Background music playing"),
                        StartOutcome::Silenced => {
                            handle.pause();
                            debug!(track = %key, "Paused or muted during start; holding silent");
                        }
                        StartOutcome::Stale => {
                            handle.dispose();
                            debug!(track = %key, "Session superseded during start; silenced stale player");
                        }
                    }
                    return;
                }
                Err(err) => err,
            };

            match self.inner.on_start_failure(id, &err, attempt) {
                FailureAction::Stale => {
                    debug!(track = %key, "Start failed for a superseded session: {}", err);
                    return;
                }
                FailureAction::Deferred => {
                    info!(track = %key, "Autoplay blocked; waiting for user interaction");
                    return;
                }
                FailureAction::Retry(delay) => {
                    warn!(
                        track = %key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Failed to start background music: {}; retrying",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                FailureAction::GiveUp => {
                    error!(
                        track = %key,
                        attempts = attempt + 1,
                        "Giving up on background music: {}",
                        err
                    );
                    return;
                }
            }
        }
    }

    fn spawn_request(&self, request: TrackRequest) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let this = self.clone();
                runtime.spawn(async move { this.replay(request).await });
            }
            Err(_) => {
                warn!(track = %request.key, "No async runtime; keeping request pending");
                self.inner.restore_pending(request);
            }
        }
    }

    fn spawn_resume(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let this = self.clone();
                runtime.spawn(async move { this.resume().await });
            }
            Err(_) => warn!("No async runtime; cannot resume background music"),
        }
    }
}

impl<L: TrackLoader, F: PlayerFactory> Inner<L, F> {
    fn admit(&self, key: TrackKey, force_restart: bool) -> Admission<F::Handle> {
        let mut state = self.state.lock();
        state.latest_seq += 1;
        let request = TrackRequest {
            key,
            force_restart,
            seq: state.latest_seq,
        };
        self.route(&mut state, request)
    }

    /// Route a held-back request again, unless it has been superseded.
    fn readmit(&self, request: TrackRequest) -> Option<Admission<F::Handle>> {
        let mut state = self.state.lock();
        if state.latest_seq != request.seq {
            return None;
        }
        Some(self.route(&mut state, request))
    }

    fn route(
        &self,
        state: &mut ControllerState<F::Handle>,
        request: TrackRequest,
    ) -> Admission<F::Handle> {
        let resumable = !request.force_restart
            && state
                .session
                .as_ref()
                .is_some_and(|s| s.key == request.key && !s.ended.load(Ordering::SeqCst));
        if !resumable {
            // Never let the old track overlap whatever comes next
            self.teardown_session(state, "new track requested");
        }

        if self.gated(state) {
            state.pending = Some(request.clone());
            return Admission::Deferred(request);
        }
        if state.transition.is_some() {
            state.pending = Some(request.clone());
            return Admission::Coalesced(request);
        }

        state.pending = None;
        if resumable {
            if let Some(target) = state.session.as_ref().map(resume_target) {
                return Admission::Resume(target);
            }
        }
        state.transition = Some(request.seq);
        Admission::Switch(request)
    }

    fn begin_switch(&self, request: &TrackRequest) -> SwitchStart<F::Handle> {
        let mut state = self.state.lock();
        if state.latest_seq != request.seq {
            return SwitchStart::Superseded;
        }
        if !request.force_restart {
            let same = state
                .session
                .as_ref()
                .filter(|s| s.key == request.key && !s.ended.load(Ordering::SeqCst))
                .map(resume_target);
            if let Some(target) = same {
                return SwitchStart::Resume(target);
            }
        }
        self.teardown_session(&mut state, "switching tracks");
        SwitchStart::Fresh
    }

    fn is_superseded(&self, seq: u64) -> bool {
        self.state.lock().latest_seq != seq
    }

    /// Make `handle` the active session unless a newer request arrived.
    fn install(
        &self,
        request: &TrackRequest,
        handle: Arc<F::Handle>,
        ended: Arc<AtomicBool>,
    ) -> Option<(u64, bool)> {
        let mut state = self.state.lock();
        if state.latest_seq != request.seq {
            return None;
        }
        self.teardown_session(&mut state, "replaced");

        state.ducked = false;
        state.retry_count = 0;
        handle.set_volume(state.full_volume());

        state.next_session_id += 1;
        let id = state.next_session_id;
        state.session = Some(ActiveSession {
            id,
            key: request.key.clone(),
            handle,
            ended,
            started: false,
            paused: false,
            failed: false,
            starting: false,
        });
        Some((id, !state.muted))
    }

    /// Next queued request for transition `owner`, or release the slot.
    fn next_queued(&self, owner: u64) -> Option<TrackRequest> {
        let mut state = self.state.lock();
        if state.transition != Some(owner) {
            return None;
        }
        if !self.gated(&state) {
            if let Some(next) = state.pending.take() {
                return Some(next);
            }
        }
        state.transition = None;
        None
    }

    /// Record the first gesture and hand back a pending request that can be
    /// served right now.
    fn unlock(&self) -> Option<TrackRequest> {
        let mut state = self.state.lock();
        if !state.user_interacted {
            state.user_interacted = true;
            info!("First user interaction; audio unlocked");
        }
        if state.muted || state.transition.is_some() {
            return None;
        }
        state.pending.take()
    }

    fn restore_pending(&self, request: TrackRequest) {
        let mut state = self.state.lock();
        if state.pending.is_none() && state.latest_seq == request.seq {
            state.pending = Some(request);
        }
    }

    /// Bring the session back to full volume for a new start. With `id`,
    /// only that session qualifies.
    fn prepare_resume(&self, id: Option<u64>) -> Option<ResumeTarget<F::Handle>> {
        let mut state = self.state.lock();
        if state.muted {
            return None;
        }
        let volume = state.full_volume();
        let session = state.session.as_mut().filter(|s| id.is_none_or(|id| s.id == id))?;
        session.handle.set_volume(volume);
        session.paused = false;
        session.failed = false;
        let target = resume_target(session);
        state.ducked = false;
        Some(target)
    }

    /// Mark session `id` as having a start loop. False if one is already
    /// running or the session is gone.
    fn claim_start(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        match state.owned_session(id) {
            Some(session) if !session.starting => {
                session.starting = true;
                true
            }
            _ => false,
        }
    }

    fn begin_attempt(&self, id: u64, attempt: u32) -> bool {
        let mut state = self.state.lock();
        if state.muted {
            return false;
        }
        match state.owned_session(id) {
            Some(session) if !session.paused => {}
            _ => return false,
        }
        state.retry_count = attempt;
        true
    }

    fn finish_start(&self, id: u64) -> StartOutcome {
        let mut state = self.state.lock();
        let muted = state.muted;
        let Some(session) = state.owned_session(id) else {
            return StartOutcome::Stale;
        };
        if muted || session.paused {
            return StartOutcome::Silenced;
        }
        session.started = true;
        session.failed = false;
        state.retry_count = 0;
        StartOutcome::Playing
    }

    fn on_start_failure(&self, id: u64, err: &PlaybackError, attempt: u32) -> FailureAction {
        let mut state = self.state.lock();
        let interacted = state.user_interacted;
        let latest_seq = state.latest_seq;
        let Some(session) = state.owned_session(id) else {
            return FailureAction::Stale;
        };

        if err.is_autoplay_block() && !interacted {
            let request = TrackRequest {
                key: session.key.clone(),
                force_restart: false,
                seq: latest_seq,
            };
            state.pending = Some(request);
            state.autoplay_blocked = true;
            return FailureAction::Deferred;
        }
        if attempt < self.settings.max_retries {
            return FailureAction::Retry(self.settings.backoff(attempt));
        }
        session.failed = true;
        FailureAction::GiveUp
    }

    /// Requests wait for a user gesture.
    fn gated(&self, state: &ControllerState<F::Handle>) -> bool {
        !state.user_interacted && (self.settings.require_user_gesture || state.autoplay_blocked)
    }

    fn apply_live_volume(&self, state: &ControllerState<F::Handle>) {
        if state.muted {
            return;
        }
        if let Some(session) = state.session.as_ref() {
            session.handle.set_volume(state.live_volume(self.settings.duck_factor));
        }
    }
}

impl<L, F: PlayerFactory> Inner<L, F> {
    /// Stop, silence and release the active player, if any.
    fn teardown_session(&self, state: &mut ControllerState<F::Handle>, reason: &str) {
        let Some(session) = state.session.take() else {
            return;
        };
        dispose_handle(session.handle.as_ref());
        state.ducked = false;
        state.retry_count = 0;
        debug!(track = %session.key, reason, "Disposed background music session");
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        self.teardown_session(&mut state, "cleanup");
        state.transition = None;
        state.retry_count = 0;
        state.pending = None;
        // In-flight switches must see that they were superseded
        state.latest_seq += 1;
        info!("Background music cleaned up");
    }
}

impl<L, F: PlayerFactory> Drop for Inner<L, F> {
    fn drop(&mut self) {
        if let Some(session) = self.state.get_mut().session.take() {
            dispose_handle(session.handle.as_ref());
        }
    }
}

fn dispose_handle<H: PlayerHandle>(handle: &H) {
    handle.pause();
    handle.stop();
    handle.set_volume(0.0);
    handle.dispose();
}

fn resume_target<H>(session: &ActiveSession<H>) -> ResumeTarget<H> {
    ResumeTarget {
        id: session.id,
        key: session.key.clone(),
        handle: Arc::clone(&session.handle),
    }
}

fn session_observer(key: TrackKey, ended: Arc<AtomicBool>) -> StatusObserver {
    Box::new(move |status: PlayerStatus| match status {
        PlayerStatus::Error(message) => {
            warn!(track = %key, "Background music playback error: {}", message)
        }
        PlayerStatus::Finished => {
            ended.store(true, Ordering::SeqCst);
            debug!(track = %key, "Looping track reached its end");
        }
    })
}

/// Releases the transition slot if the owning future is dropped early.
struct TransitionGuard<L, F: PlayerFactory> {
    inner: Arc<Inner<L, F>>,
    owner: u64,
}

impl<L, F: PlayerFactory> Drop for TransitionGuard<L, F> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if state.transition == Some(self.owner) {
            state.transition = None;
        }
    }
}

/// Clears the session's start claim when the start loop ends, however it ends.
struct StartGuard<L, F: PlayerFactory> {
    inner: Arc<Inner<L, F>>,
    id: u64,
}

impl<L, F: PlayerFactory> Drop for StartGuard<L, F> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if let Some(session) = state.owned_session(self.id) {
            session.starting = false;
        }
    }
}

trait Teardown: Send + Sync {
    fn teardown(&self);
}

impl<L: TrackLoader, F: PlayerFactory> Teardown for Inner<L, F> {
    fn teardown(&self) {
        self.reset();
    }
}

/// Silence every live controller in the process, without needing a
/// reference to any of them.
pub fn force_stop_all() {
    let controllers = registry::live();
    for controller in &controllers {
        controller.teardown();
    }
    warn!(controllers = controllers.len(), "Force-stopped all background music");
}

mod registry {
    use std::sync::{Arc, Weak};

    use parking_lot::Mutex;

    use super::Teardown;

    static CONTROLLERS: Mutex<Vec<Weak<dyn Teardown>>> = parking_lot::const_mutex(Vec::new());

    pub(super) fn register(controller: Weak<dyn Teardown>) {
        let mut controllers = CONTROLLERS.lock();
        controllers.retain(|c| c.strong_count() > 0);
        controllers.push(controller);
    }

    pub(super) fn live() -> Vec<Arc<dyn Teardown>> {
        let mut controllers = CONTROLLERS.lock();
        controllers.retain(|c| c.strong_count() > 0);
        controllers.iter().filter_map(Weak::upgrade).collect()
    }
}
