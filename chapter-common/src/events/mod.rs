//! Event types for the session event system
//!
//! Discrete happenings (state transitions, queue growth, errors) travel over
//! the [`EventBus`]. Continuous state (position, metadata, button glyph) is
//! published separately as latest-value snapshots, see [`SessionSnapshot`].

mod playback_types;
mod snapshot;

pub use playback_types::{ButtonGlyph, PlaybackRate, PlaybackState};
pub use snapshot::{NowPlayingMetadata, SessionSnapshot};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Why the queue grew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    /// Explicit append from the presentation layer
    UserAppend,
    /// Default item added by a play request on an empty queue
    PlayRequest,
    /// Next item resolved after reaching the last queued index
    Prefetch,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::UserAppend => write!(f, "UserAppend"),
            QueueChangeTrigger::PlayRequest => write!(f, "PlayRequest"),
            QueueChangeTrigger::Prefetch => write!(f, "Prefetch"),
        }
    }
}

/// Session event types
///
/// Every event carries the id of the session that produced it and a UTC
/// timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Playback state changed
    PlaybackStateChanged {
        session_id: Uuid,
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The engine moved to another queued item
    ItemChanged {
        session_id: Uuid,
        item_id: String,
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Items were appended to the queue (and mirrored to the engine)
    QueueAppended {
        session_id: Uuid,
        item_ids: Vec<String>,
        queue_len: usize,
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The catalog could not resolve the item after `after_item_id`
    PrefetchFailed {
        session_id: Uuid,
        after_item_id: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate forwarded to the engine
    RateChanged {
        session_id: Uuid,
        rate: PlaybackRate,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Engine reported an error; session is now in the error state
    PlaybackError {
        session_id: Uuid,
        /// Human-readable message for the user-facing layer
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session torn down; no further events follow
    SessionClosed {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Short event name, used for logging
    pub fn event_type(&self) -> &str {
        match self {
            SessionEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            SessionEvent::ItemChanged { .. } => "ItemChanged",
            SessionEvent::QueueAppended { .. } => "QueueAppended",
            SessionEvent::PrefetchFailed { .. } => "PrefetchFailed",
            SessionEvent::RateChanged { .. } => "RateChanged",
            SessionEvent::PlaybackError { .. } => "PlaybackError",
            SessionEvent::SessionClosed { .. } => "SessionClosed",
        }
    }
}

/// Central event distribution bus for session events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use chapter_common::events::{EventBus, PlaybackState, SessionEvent};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SessionEvent::PlaybackStateChanged {
///     session_id: uuid::Uuid::new_v4(),
///     old_state: PlaybackState::Paused,
///     new_state: PlaybackState::Playing,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped (the subscriber then sees `Lagged`).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_changed(new_state: PlaybackState) -> SessionEvent {
        SessionEvent::PlaybackStateChanged {
            session_id: Uuid::nil(),
            old_state: PlaybackState::Idle,
            new_state,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(8);
        bus.emit_lossy(state_changed(PlaybackState::Playing));

        // Late subscribers do not see earlier events
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fan_out_to_many_subscribers() {
        let bus = EventBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit_lossy(state_changed(PlaybackState::Preparing));

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                SessionEvent::PlaybackStateChanged { new_state, .. } => {
                    assert_eq!(new_state, PlaybackState::Preparing)
                }
                other => panic!("Unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        bus.emit_lossy(state_changed(PlaybackState::Playing));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(state_changed(PlaybackState::Paused)).unwrap();
        assert_eq!(json["type"], "PlaybackStateChanged");
        assert_eq!(json["new_state"], "paused");
        assert_eq!(state_changed(PlaybackState::Paused).event_type(), "PlaybackStateChanged");
    }
}
