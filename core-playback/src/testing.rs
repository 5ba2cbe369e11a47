//! Test doubles for the page-side bridges.
//!
//! [`FakeAudioElement`] behaves like a browser audio element closely enough
//! to exercise the controller: assigning a source emits `loadstart`, `play()`
//! flips `paused` and emits `play` before its request settles, and `pause()`
//! rejects a pending request with [`AudioError::Aborted`]. With a loader
//! attached, the source is fetched through an [`HttpClient`] on the first
//! play request, so network failures surface the way they do in a browser.

use async_trait::async_trait;
use bridge_traits::{
    AudioElement, AudioError, AudioEvent, AudioEventSink, HttpClient, HttpRequest, MediaAction,
    MediaActionHandler, MediaMetadata, MediaPlaybackState, MediaSessionSurface,
    RequestDestination, UserNotifier,
};
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// How the next play requests settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayBehavior {
    /// Resolve immediately.
    Resolve,
    /// Stay pending until [`FakeAudioElement::resolve_pending`] or a pause.
    Hold,
    /// Reject with the given error.
    Reject(AudioError),
}

struct FakeState {
    source: Option<String>,
    source_loaded: bool,
    paused: bool,
    current_time: f64,
    duration: Option<f64>,
    media_duration: f64,
    volume: f64,
    playback_rate: f64,
    behavior: PlayBehavior,
    pending: Option<oneshot::Sender<Result<(), AudioError>>>,
    play_calls: usize,
}

pub struct FakeAudioElement {
    state: Mutex<FakeState>,
    sink: Mutex<Option<Weak<dyn AudioEventSink>>>,
    loader: Option<Arc<dyn HttpClient>>,
}

impl Default for FakeAudioElement {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAudioElement {
    /// An element whose sources load instantly with a 300 second duration.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                source: None,
                source_loaded: false,
                paused: true,
                current_time: 0.0,
                duration: None,
                media_duration: 300.0,
                volume: 1.0,
                playback_rate: 1.0,
                behavior: PlayBehavior::Resolve,
                pending: None,
                play_calls: 0,
            }),
            sink: Mutex::new(None),
            loader: None,
        }
    }

    pub fn with_duration(self, seconds: f64) -> Self {
        self.state.lock().media_duration = seconds;
        self
    }

    /// Fetch sources through `loader` on the first play request.
    pub fn with_loader(mut self, loader: Arc<dyn HttpClient>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn set_play_behavior(&self, behavior: PlayBehavior) {
        self.state.lock().behavior = behavior;
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    pub fn has_pending_play(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Resolve a held play request.
    pub fn resolve_pending(&self) {
        let pending = self.state.lock().pending.take();
        if let Some(sender) = pending {
            let _ = sender.send(Ok(()));
        }
    }

    /// Reject a held play request.
    pub fn reject_pending(&self, error: AudioError) {
        let pending = self.state.lock().pending.take();
        if let Some(sender) = pending {
            let _ = sender.send(Err(error));
        }
    }

    /// Advance playback to `seconds` and emit `timeupdate`.
    pub fn advance_to(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
        self.emit(AudioEvent::TimeUpdate {
            current_time: seconds,
        });
    }

    /// Play to the end: `timeupdate`, `pause`, `ended`.
    pub fn finish(&self) {
        let end = {
            let mut state = self.state.lock();
            let end = state.duration.unwrap_or(state.current_time);
            state.current_time = end;
            state.paused = true;
            end
        };
        self.emit(AudioEvent::TimeUpdate { current_time: end });
        self.emit(AudioEvent::Pause);
        self.emit(AudioEvent::Ended);
    }

    /// Deliver an arbitrary event to the registered sink.
    pub fn emit(&self, event: AudioEvent) {
        let sink = self.sink.lock().as_ref().and_then(Weak::upgrade);
        if let Some(sink) = sink {
            sink.on_event(event);
        }
    }

    fn mark_loaded(&self) {
        let duration = {
            let mut state = self.state.lock();
            state.source_loaded = true;
            state.duration = Some(state.media_duration);
            state.media_duration
        };
        self.emit(AudioEvent::LoadedMetadata { duration });
        self.emit(AudioEvent::CanPlay);
    }

    async fn load_source(&self, loader: &dyn HttpClient, url: String) -> Result<(), AudioError> {
        let request = HttpRequest::get(url).destination(RequestDestination::Audio);
        match loader.execute(request).await {
            Ok(response) if response.is_success() => {
                self.mark_loaded();
                Ok(())
            }
            Ok(response) => {
                let message = format!("HTTP {}", response.status);
                self.emit(AudioEvent::Error {
                    message: message.clone(),
                });
                Err(AudioError::NotSupported(message))
            }
            Err(error) => {
                let message = error.to_string();
                self.emit(AudioEvent::Error {
                    message: message.clone(),
                });
                Err(AudioError::Network(message))
            }
        }
    }
}

#[async_trait]
impl AudioElement for FakeAudioElement {
    fn set_event_sink(&self, sink: Weak<dyn AudioEventSink>) {
        *self.sink.lock() = Some(sink);
    }

    fn set_source(&self, url: &str) {
        let pending = {
            let mut state = self.state.lock();
            state.source = Some(url.to_string());
            state.source_loaded = false;
            state.paused = true;
            state.current_time = 0.0;
            state.duration = None;
            state.pending.take()
        };
        if let Some(sender) = pending {
            let _ = sender.send(Err(AudioError::Aborted));
        }

        self.emit(AudioEvent::LoadStart);
        if self.loader.is_none() {
            self.mark_loaded();
        }
    }

    fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    async fn play(&self) -> Result<(), AudioError> {
        let (source, loaded) = {
            let mut state = self.state.lock();
            state.play_calls += 1;
            (state.source.clone(), state.source_loaded)
        };
        let Some(source) = source else {
            return Err(AudioError::NotSupported("no source".to_string()));
        };

        if !loaded {
            if let Some(loader) = &self.loader {
                self.load_source(loader.as_ref(), source).await?;
            }
        }

        let (was_paused, receiver) = {
            let mut state = self.state.lock();
            match state.behavior.clone() {
                PlayBehavior::Reject(error) => return Err(error),
                PlayBehavior::Resolve => (std::mem::replace(&mut state.paused, false), None),
                PlayBehavior::Hold => {
                    let (sender, receiver) = oneshot::channel();
                    state.pending = Some(sender);
                    (std::mem::replace(&mut state.paused, false), Some(receiver))
                }
            }
        };

        if was_paused {
            self.emit(AudioEvent::Play);
        }
        match receiver {
            None => Ok(()),
            Some(receiver) => receiver.await.unwrap_or(Err(AudioError::Aborted)),
        }
    }

    fn pause(&self) {
        let (was_paused, pending) = {
            let mut state = self.state.lock();
            (std::mem::replace(&mut state.paused, true), state.pending.take())
        };
        if let Some(sender) = pending {
            let _ = sender.send(Err(AudioError::Aborted));
        }
        if !was_paused {
            self.emit(AudioEvent::Pause);
        }
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().playback_rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.state.lock().playback_rate = rate;
    }
}

/// Collects alerts instead of showing them.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }
}

impl UserNotifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Now-playing surface that records what it was told and lets tests
/// trigger the registered actions.
#[derive(Default)]
pub struct RecordingMediaSession {
    metadata: Mutex<Option<MediaMetadata>>,
    states: Mutex<Vec<MediaPlaybackState>>,
    handlers: Mutex<HashMap<MediaAction, MediaActionHandler>>,
}

impl RecordingMediaSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> Option<MediaMetadata> {
        self.metadata.lock().clone()
    }

    pub fn last_state(&self) -> Option<MediaPlaybackState> {
        self.states.lock().last().copied()
    }

    pub fn has_handler(&self, action: MediaAction) -> bool {
        self.handlers.lock().contains_key(&action)
    }

    /// Invoke the handler registered for `action`, as the platform would.
    /// Returns `false` when none is registered.
    pub async fn trigger(&self, action: MediaAction) -> bool {
        let handler = self.handlers.lock().get(&action).cloned();
        match handler {
            Some(handler) => {
                handler().await;
                true
            }
            None => false,
        }
    }
}

impl MediaSessionSurface for RecordingMediaSession {
    fn set_metadata(&self, metadata: MediaMetadata) {
        *self.metadata.lock() = Some(metadata);
    }

    fn set_playback_state(&self, state: MediaPlaybackState) {
        self.states.lock().push(state);
    }

    fn set_action_handler(&self, action: MediaAction, handler: MediaActionHandler) {
        self.handlers.lock().insert(action, handler);
    }
}
