//! Audio event dispatch table
//!
//! Every lifecycle event the audio element emits maps to one pure transition
//! function. A transition mutates the session and returns the side effects
//! the controller performs once the session lock is released. Repeated
//! delivery of the same event is harmless: a transition that finds the
//! session already in its target state returns no effects.

use crate::session::{to_millis, PlaybackSession, TransportState};
use bridge_traits::{AudioEvent, AudioEventKind, MediaPlaybackState};
use core_runtime::events::PlaybackEvent;

/// Shown when the element reports an error outside a play request.
pub const PLAYBACK_ERROR_MESSAGE: &str = "An error occurred during audio playback";

/// Shown when a play request is rejected.
pub const PLAY_FAILED_MESSAGE: &str = "Could not play this episode";

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Blocking user-visible message
    Alert(String),
    /// Mirror transport state to the now-playing surface
    SyncMediaState(MediaPlaybackState),
    /// Publish on the event bus
    Publish(PlaybackEvent),
}

pub type Transition = fn(&mut PlaybackSession, &AudioEvent) -> Vec<Effect>;

pub const DISPATCH_TABLE: [(AudioEventKind, Transition); 8] = [
    (AudioEventKind::LoadStart, on_load_start),
    (AudioEventKind::CanPlay, on_can_play),
    (AudioEventKind::Play, on_play),
    (AudioEventKind::Pause, on_pause),
    (AudioEventKind::Ended, on_ended),
    (AudioEventKind::TimeUpdate, on_time_update),
    (AudioEventKind::LoadedMetadata, on_loaded_metadata),
    (AudioEventKind::Error, on_error),
];

pub fn transition_for(kind: AudioEventKind) -> Transition {
    DISPATCH_TABLE
        .iter()
        .find(|(entry, _)| *entry == kind)
        .map(|(_, transition)| *transition)
        .unwrap_or(ignore)
}

/// Route `event` through the table.
pub fn dispatch(session: &mut PlaybackSession, event: &AudioEvent) -> Vec<Effect> {
    transition_for(event.kind())(session, event)
}

fn ignore(_session: &mut PlaybackSession, _event: &AudioEvent) -> Vec<Effect> {
    Vec::new()
}

fn on_load_start(session: &mut PlaybackSession, _event: &AudioEvent) -> Vec<Effect> {
    if session.has_episode() {
        session.loading = true;
    }
    Vec::new()
}

fn on_can_play(session: &mut PlaybackSession, _event: &AudioEvent) -> Vec<Effect> {
    let Some(episode_id) = session.episode_id() else {
        return Vec::new();
    };
    let was_loading = std::mem::replace(&mut session.loading, false);
    let mut effects = Vec::new();

    // Autoplay declined or disabled: ready but not playing
    if session.transport == TransportState::Loading && !session.play_requested {
        session.transport = TransportState::Paused;
        effects.push(Effect::SyncMediaState(MediaPlaybackState::Paused));
    }
    if was_loading {
        effects.push(Effect::Publish(PlaybackEvent::Ready { episode_id }));
    }
    effects
}

fn on_play(session: &mut PlaybackSession, _event: &AudioEvent) -> Vec<Effect> {
    let Some(episode_id) = session.episode_id() else {
        return Vec::new();
    };
    if session.transport == TransportState::Playing {
        return Vec::new();
    }

    session.transport = TransportState::Playing;
    vec![
        Effect::SyncMediaState(MediaPlaybackState::Playing),
        Effect::Publish(PlaybackEvent::Started { episode_id }),
    ]
}

fn on_pause(session: &mut PlaybackSession, _event: &AudioEvent) -> Vec<Effect> {
    let Some(episode_id) = session.episode_id() else {
        return Vec::new();
    };
    if !matches!(
        session.transport,
        TransportState::Playing | TransportState::Loading
    ) {
        return Vec::new();
    }

    session.transport = TransportState::Paused;
    session.play_requested = false;
    vec![
        Effect::SyncMediaState(MediaPlaybackState::Paused),
        Effect::Publish(PlaybackEvent::Paused {
            episode_id,
            position_ms: to_millis(session.position_seconds),
        }),
    ]
}

fn on_ended(session: &mut PlaybackSession, _event: &AudioEvent) -> Vec<Effect> {
    let Some(episode_id) = session.episode_id() else {
        return Vec::new();
    };
    if session.transport == TransportState::Ended {
        return Vec::new();
    }

    session.transport = TransportState::Ended;
    session.play_requested = false;
    session.loading = false;
    if let Some(duration) = session.duration_seconds {
        session.set_position(duration);
    }
    vec![
        Effect::SyncMediaState(MediaPlaybackState::Paused),
        Effect::Publish(PlaybackEvent::Completed { episode_id }),
    ]
}

fn on_time_update(session: &mut PlaybackSession, event: &AudioEvent) -> Vec<Effect> {
    let AudioEvent::TimeUpdate { current_time } = event else {
        return Vec::new();
    };
    let Some(episode_id) = session.episode_id() else {
        return Vec::new();
    };

    let before = session.position_seconds;
    session.set_position(*current_time);
    if session.position_seconds == before {
        return Vec::new();
    }
    vec![position_changed(session, episode_id)]
}

fn on_loaded_metadata(session: &mut PlaybackSession, event: &AudioEvent) -> Vec<Effect> {
    let AudioEvent::LoadedMetadata { duration } = event else {
        return Vec::new();
    };
    let Some(episode_id) = session.episode_id() else {
        return Vec::new();
    };

    let before = session.duration_seconds;
    session.set_duration(*duration);
    if session.duration_seconds == before {
        return Vec::new();
    }
    vec![position_changed(session, episode_id)]
}

fn on_error(session: &mut PlaybackSession, event: &AudioEvent) -> Vec<Effect> {
    let AudioEvent::Error { message } = event else {
        return Vec::new();
    };
    if !session.has_episode() {
        return Vec::new();
    }
    session.loading = false;

    // The outstanding play request rejects with the same failure and
    // decides between retry and Errored.
    if session.play_requested {
        return Vec::new();
    }
    enter_errored(session, PLAYBACK_ERROR_MESSAGE, message.clone())
}

/// Move to Errored. Alerts only when the session was not already there.
pub fn enter_errored(session: &mut PlaybackSession, alert: &str, detail: String) -> Vec<Effect> {
    if session.transport == TransportState::Errored {
        return Vec::new();
    }

    session.transport = TransportState::Errored;
    session.loading = false;
    session.play_requested = false;
    vec![
        Effect::Alert(alert.to_string()),
        Effect::SyncMediaState(MediaPlaybackState::None),
        Effect::Publish(PlaybackEvent::Error {
            episode_id: session.episode_id(),
            message: detail,
            recoverable: true,
        }),
    ]
}

fn position_changed(session: &PlaybackSession, episode_id: String) -> Effect {
    Effect::Publish(PlaybackEvent::PositionChanged {
        episode_id,
        position_ms: to_millis(session.position_seconds),
        duration_ms: session.duration_seconds.map(to_millis),
    })
}
