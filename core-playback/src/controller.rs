//! # Playback Session Controller
//!
//! Owns the single audio element and the [`PlaybackSession`] for one page
//! load. Views receive the controller as an `Arc` and drive it through the
//! transport operations below; the element reports back through
//! [`AudioEventSink`], which routes every event through the
//! [dispatch table](crate::transitions).
//!
//! ## Failure handling
//!
//! No operation returns an error to its caller. A rejected play request
//! moves the session to Errored and shows one alert. Rejections that belong
//! to a superseded load, or that were caused by a racing `pause()`, are
//! logged and dropped.
//!
//! ## Locking
//!
//! The session sits behind a `parking_lot::Mutex` that is released before
//! every call into the audio element (the element may emit events
//! synchronously) and before every `.await`.

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::media_session::MediaSessionBridge;
use crate::session::{to_millis, PlaybackRate, PlaybackSession, TransportState};
use crate::transitions::{self, Effect, PLAY_FAILED_MESSAGE};
use bridge_traits::{
    AudioElement, AudioError, AudioEvent, AudioEventSink, MediaPlaybackState, MediaSessionSurface,
    UserNotifier,
};
use core_library::Episode;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, trace, warn};

/// What a call to [`PlaybackController::load`] ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The play request resolved.
    Started,
    /// Source assigned without a play request (autoplay disabled).
    Ready,
    /// A pause aborted the play request.
    Interrupted,
    /// A newer load or a clear replaced this one.
    Superseded,
    /// The play request was rejected; the session is Errored.
    Failed(PlaybackError),
}

pub struct PlaybackController {
    audio: Arc<dyn AudioElement>,
    notifier: Arc<dyn UserNotifier>,
    config: PlaybackConfig,
    session: Mutex<PlaybackSession>,
    /// Bumped by every load and clear
    generation: AtomicU64,
    events: Option<EventBus>,
    media: RwLock<Option<Arc<MediaSessionBridge>>>,
}

impl PlaybackController {
    /// Build a controller around `audio`. Fails when `config` does not
    /// validate.
    pub fn new(
        audio: Arc<dyn AudioElement>,
        notifier: Arc<dyn UserNotifier>,
        config: PlaybackConfig,
    ) -> Result<Arc<Self>> {
        Self::build(audio, notifier, config, None)
    }

    pub fn with_event_bus(
        audio: Arc<dyn AudioElement>,
        notifier: Arc<dyn UserNotifier>,
        config: PlaybackConfig,
        events: EventBus,
    ) -> Result<Arc<Self>> {
        Self::build(audio, notifier, config, Some(events))
    }

    fn build(
        audio: Arc<dyn AudioElement>,
        notifier: Arc<dyn UserNotifier>,
        config: PlaybackConfig,
        events: Option<EventBus>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let session = PlaybackSession::new();
        audio.set_volume(session.volume);
        audio.set_playback_rate(session.playback_rate.as_f64());

        Ok(Arc::new_cyclic(|weak: &Weak<Self>| {
            let sink: Weak<dyn AudioEventSink> = weak.clone();
            audio.set_event_sink(sink);
            Self {
                audio,
                notifier,
                config,
                session: Mutex::new(session),
                generation: AtomicU64::new(0),
                events,
                media: RwLock::new(None),
            }
        }))
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Copy of the session for views.
    pub fn snapshot(&self) -> PlaybackSession {
        self.session.lock().clone()
    }

    pub fn transport(&self) -> TransportState {
        self.session.lock().transport
    }

    /// Connect the platform now-playing surface and register its action
    /// handlers. Replaces any previously attached surface.
    pub fn attach_media_session(
        self: &Arc<Self>,
        surface: Arc<dyn MediaSessionSurface>,
    ) -> Arc<MediaSessionBridge> {
        let bridge = Arc::new(MediaSessionBridge::new(surface, self.config.media.clone()));
        bridge.register_handlers(Arc::downgrade(self), self.config.seek_step_secs);

        let (state, episode) = {
            let session = self.session.lock();
            (session.transport.media_state(), session.current_episode.clone())
        };
        if let Some(episode) = episode {
            bridge.publish_metadata(&episode);
        }
        bridge.sync_state(state);

        *self.media.write() = Some(bridge.clone());
        bridge
    }

    pub fn media_session(&self) -> Option<Arc<MediaSessionBridge>> {
        self.media.read().clone()
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Bind `episode`, assign its source and (with autoplay) start playback.
    #[instrument(skip(self, episode), fields(episode_id = %episode.id))]
    pub async fn load(&self, episode: Episode) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let url = episode.audio_url.clone();
        let loading = PlaybackEvent::Loading {
            episode_id: episode.id.clone(),
            title: episode.title.clone(),
        };

        let (volume, rate) = {
            let mut session = self.session.lock();
            session.bind(episode);
            session.play_requested = self.config.autoplay;
            (session.volume, session.playback_rate)
        };
        info!(url = %url, autoplay = self.config.autoplay, "Loading episode");
        self.publish(loading);
        self.sync_media(MediaPlaybackState::Paused);

        self.audio.set_source(&url);
        self.audio.set_volume(volume);
        self.audio.set_playback_rate(rate.as_f64());

        let outcome = if self.config.autoplay {
            self.request_play(generation, Some(&url)).await
        } else {
            LoadOutcome::Ready
        };

        if matches!(outcome, LoadOutcome::Started | LoadOutcome::Ready) {
            self.publish_metadata(generation);
        }
        outcome
    }

    /// Unbind the episode, pause the element and return to Idle.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let had_episode = {
            let mut session = self.session.lock();
            let had_episode = session.has_episode();
            session.unbind();
            had_episode
        };

        self.audio.pause();
        self.sync_media(MediaPlaybackState::None);
        if had_episode {
            info!("Episode cleared");
            self.publish(PlaybackEvent::Cleared);
        }
    }

    /// Request playback. Ignored in Idle and Errored; from Ended the
    /// position restarts at zero.
    #[instrument(skip(self))]
    pub async fn play(&self) {
        let (generation, restart) = {
            let mut session = self.session.lock();
            match session.transport {
                TransportState::Idle | TransportState::Errored | TransportState::Playing => {
                    debug!(state = %session.transport, "Play ignored");
                    return;
                }
                TransportState::Ended => session.set_position(0.0),
                TransportState::Loading | TransportState::Paused => {}
            }
            session.play_requested = true;
            (
                self.generation.load(Ordering::SeqCst),
                session.transport == TransportState::Ended,
            )
        };

        if restart {
            self.audio.set_current_time(0.0);
        }
        self.request_play(generation, None).await;
    }

    pub fn pause(&self) {
        {
            let mut session = self.session.lock();
            if !session.has_episode() {
                return;
            }
            session.play_requested = false;
        }
        self.audio.pause();
    }

    /// Pause when playing, otherwise request playback. No-op without an
    /// episode.
    pub async fn toggle_play_pause(&self) {
        let playing = {
            let session = self.session.lock();
            if !session.has_episode() {
                return;
            }
            session.is_playing()
        };

        if playing {
            self.pause();
        } else {
            self.play().await;
        }
    }

    async fn request_play(&self, generation: u64, reload_source: Option<&str>) -> LoadOutcome {
        let mut attempt = 1;
        loop {
            let result = self.audio.play().await;

            if !self.is_current(generation) {
                debug!(?result, "Ignoring play result of a superseded load");
                return LoadOutcome::Superseded;
            }

            let error = match result {
                Ok(()) => {
                    self.session.lock().play_requested = false;
                    return LoadOutcome::Started;
                }
                Err(AudioError::Aborted) => {
                    debug!("Play request aborted by pause");
                    return LoadOutcome::Interrupted;
                }
                Err(error) => error,
            };

            let Some(url) = reload_source else {
                return self.fail_playback(generation, error);
            };
            if !self.config.retry.should_retry(attempt, &error) {
                return self.fail_playback(generation, error);
            }

            warn!(attempt, error = %error, "Play request failed, retrying");
            tokio::time::sleep(self.config.retry.delay).await;
            if !self.is_current(generation) {
                return LoadOutcome::Superseded;
            }
            {
                let mut session = self.session.lock();
                if !session.play_requested {
                    return LoadOutcome::Interrupted;
                }
                session.transport = TransportState::Loading;
                session.loading = true;
            }
            self.audio.set_source(url);
            attempt += 1;
        }
    }

    fn fail_playback(&self, generation: u64, error: AudioError) -> LoadOutcome {
        let error = PlaybackError::from(error);
        let effects = {
            let mut session = self.session.lock();
            if !self.is_current(generation) {
                return LoadOutcome::Superseded;
            }
            transitions::enter_errored(&mut session, PLAY_FAILED_MESSAGE, error.to_string())
        };

        warn!(error = %error, "Play request rejected");
        self.apply(effects);
        LoadOutcome::Failed(error)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    // ========================================================================
    // Position
    // ========================================================================

    /// Seek to `fraction` of the duration, clamped to `[0, 1]`. No-op while
    /// the duration is unknown.
    pub fn seek(&self, fraction: f64) {
        self.seek_with(|session| session.seek_target(fraction));
    }

    /// Seek relative to the current position, clamped to `[0, duration]`.
    pub fn seek_by(&self, delta_seconds: f64) {
        self.seek_with(|session| session.seek_by_target(delta_seconds));
    }

    fn seek_with<F>(&self, target: F)
    where
        F: FnOnce(&PlaybackSession) -> Option<f64>,
    {
        let (position, event) = {
            let mut session = self.session.lock();
            let Some(episode_id) = session.episode_id() else {
                return;
            };
            let Some(position) = target(&session) else {
                debug!("Seek ignored");
                return;
            };
            session.set_position(position);
            let event = PlaybackEvent::PositionChanged {
                episode_id,
                position_ms: to_millis(session.position_seconds),
                duration_ms: session.duration_seconds.map(to_millis),
            };
            (session.position_seconds, event)
        };

        self.audio.set_current_time(position);
        self.publish(event);
    }

    // ========================================================================
    // Volume & Rate
    // ========================================================================

    /// Set the volume in percent, clamped to `[0, 100]`.
    pub fn set_volume(&self, percent: f64) {
        if percent.is_nan() {
            return;
        }
        self.apply_volume(percent.clamp(0.0, 100.0) / 100.0);
    }

    /// Mute, or unmute to full volume. The level before muting is not
    /// remembered.
    pub fn toggle_mute(&self) {
        let volume = self.session.lock().volume;
        self.apply_volume(if volume > 0.0 { 0.0 } else { 1.0 });
    }

    fn apply_volume(&self, volume: f64) {
        self.session.lock().volume = volume;
        self.audio.set_volume(volume);
        self.publish(PlaybackEvent::VolumeChanged {
            volume_percent: (volume * 100.0).round() as u8,
        });
    }

    /// Set the playback speed. Rates outside 1.0, 1.5 and 2.0 are rejected
    /// and leave the session unchanged.
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        let rate = PlaybackRate::try_from(rate)?;
        self.apply_rate(rate);
        Ok(())
    }

    pub(crate) fn apply_rate(&self, rate: PlaybackRate) {
        self.session.lock().playback_rate = rate;
        self.audio.set_playback_rate(rate.as_f64());
        self.publish(PlaybackEvent::RateChanged {
            rate_percent: rate.percent(),
        });
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Route an element event through the dispatch table and perform the
    /// resulting effects.
    pub fn handle_event(&self, event: AudioEvent) {
        let (effects, state) = {
            let mut session = self.session.lock();
            let effects = transitions::dispatch(&mut session, &event);
            (effects, session.transport)
        };
        trace!(event = %event.kind(), state = %state, "Audio event");
        self.apply(effects);
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Alert(message) => self.notifier.alert(&message),
                Effect::SyncMediaState(state) => self.sync_media(state),
                Effect::Publish(event) => self.publish(event),
            }
        }
    }

    fn sync_media(&self, state: MediaPlaybackState) {
        if let Some(bridge) = self.media_session() {
            bridge.sync_state(state);
        }
    }

    fn publish_metadata(&self, generation: u64) {
        let Some(bridge) = self.media_session() else {
            return;
        };
        let episode = {
            let session = self.session.lock();
            if !self.is_current(generation) {
                return;
            }
            session.current_episode.clone()
        };
        if let Some(episode) = episode {
            bridge.publish_metadata(&episode);
        }
    }

    fn publish(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.events {
            // No subscribers is fine
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

impl AudioEventSink for PlaybackController {
    fn on_event(&self, event: AudioEvent) {
        self.handle_event(event);
    }
}
