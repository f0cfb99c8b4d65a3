// src/audio/rodio_backend.rs
//! Player backend using rodio.
//!
//! The output stream is not `Send`, so a dedicated thread owns it for the
//! lifetime of the backend; players only hold sinks attached to its handle.

use std::fs::File;
use std::future::Future;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rodio::source::EmptyCallback;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, trace};

use super::loader::TrackAsset;
use super::player::{PlayerFactory, PlayerHandle, PlayerStatus, StatusObserver};
use super::track::TrackKey;
use crate::error::PlaybackError;

/// Factory for [`RodioPlayer`]s on the default output device.
pub struct RodioBackend {
    handle: OutputStreamHandle,
    /// Dropping this sender lets the output thread exit and close the stream.
    _shutdown: Sender<()>,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn new() -> Result<Self, PlaybackError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("bgmusic-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if ready_tx.send(Ok(handle)).is_err() {
                        return;
                    }
                    // Park until the backend goes away; the stream must stay alive
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(PlaybackError::Device(e.to_string())));
                }
            })
            .map_err(|e| PlaybackError::Device(e.to_string()))?;

        let handle = ready_rx
            .recv()
            .map_err(|_| PlaybackError::Device("audio output thread exited".into()))??;
        debug!("Opened default audio output");

        Ok(Self {
            handle,
            _shutdown: shutdown_tx,
        })
    }
}

impl PlayerFactory for RodioBackend {
    type Handle = RodioPlayer;

    fn create(&self, asset: &TrackAsset) -> Result<RodioPlayer, PlaybackError> {
        let sink = Sink::try_new(&self.handle).map_err(|e| PlaybackError::Device(e.to_string()))?;
        Ok(RodioPlayer::new(asset, sink))
    }
}

/// One sink playing one asset file.
///
/// The file is decoded lazily on the first `play`, so the loop flag set
/// before that call decides whether the source repeats.
pub struct RodioPlayer {
    key: TrackKey,
    path: PathBuf,
    sink: Mutex<Sink>,
    /// Whether a source is queued on the sink.
    primed: AtomicBool,
    disposed: AtomicBool,
    looping: AtomicBool,
    observers: Arc<Mutex<Vec<StatusObserver>>>,
}

impl RodioPlayer {
    fn new(asset: &TrackAsset, sink: Sink) -> Self {
        // Sinks start playing as soon as a source is queued
        sink.pause();
        Self {
            key: asset.key.clone(),
            path: asset.path.clone(),
            sink: Mutex::new(sink),
            primed: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn start(&self) -> Result<(), PlaybackError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(PlaybackError::Disposed);
        }

        let sink = self.sink.lock();
        if !self.primed.load(Ordering::SeqCst) {
            let file = File::open(&self.path)
                .map_err(|e| PlaybackError::Decode(format!("{}: {}", self.path.display(), e)))?;
            let source =
                Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode(e.to_string()))?;

            if self.looping.load(Ordering::SeqCst) {
                sink.append(source.repeat_infinite());
            } else {
                sink.append(source);
                let observers = Arc::clone(&self.observers);
                sink.append(EmptyCallback::<f32>::new(Box::new(move || {
                    notify(&observers, PlayerStatus::Finished);
                })));
            }
            self.primed.store(true, Ordering::SeqCst);
            trace!(track = %self.key, "Queued source on sink");
        }

        sink.play();
        Ok(())
    }
}

fn notify(observers: &Mutex<Vec<StatusObserver>>, status: PlayerStatus) {
    for observer in observers.lock().iter() {
        observer(status.clone());
    }
}

impl PlayerHandle for RodioPlayer {
    fn play(&self) -> impl Future<Output = Result<(), PlaybackError>> + Send {
        std::future::ready(self.start())
    }

    fn pause(&self) {
        self.sink.lock().pause();
    }

    fn stop(&self) {
        // Stopping empties the queue; the next play decodes again
        self.sink.lock().stop();
        self.primed.store(false, Ordering::SeqCst);
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let sink = self.sink.lock();
        sink.set_volume(0.0);
        sink.stop();
        self.observers.lock().clear();
        debug!(track = %self.key, "Disposed rodio player");
    }

    fn set_volume(&self, volume: f32) {
        if !self.disposed.load(Ordering::SeqCst) {
            self.sink.lock().set_volume(volume.clamp(0.0, 1.0));
        }
    }

    fn volume(&self) -> f32 {
        self.sink.lock().volume()
    }

    fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::SeqCst);
    }

    fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    fn subscribe(&self, observer: StatusObserver) {
        self.observers.lock().push(observer);
    }
}
