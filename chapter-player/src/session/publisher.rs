//! State publisher
//!
//! Fan-out of session state to any number of observers. Continuous values
//! (position, metadata, button glyph, full snapshot) go through `watch`
//! channels: an observer that falls behind only ever sees the latest value,
//! and publishing never waits on anyone. Discrete happenings go through the
//! [`EventBus`].
//!
//! Dropping the publisher closes every channel, which is how observers learn
//! that the session has ended.

use chapter_common::events::{
    ButtonGlyph, EventBus, NowPlayingMetadata, SessionEvent, SessionSnapshot,
};
use tokio::sync::{broadcast, watch};
use tracing::trace;
use uuid::Uuid;

pub struct StatePublisher {
    position_tx: watch::Sender<u64>,
    metadata_tx: watch::Sender<Option<NowPlayingMetadata>>,
    button_tx: watch::Sender<ButtonGlyph>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    event_bus: EventBus,
    session_id: Uuid,
}

impl StatePublisher {
    pub fn new(session_id: Uuid, event_capacity: usize) -> Self {
        let (position_tx, _) = watch::channel(0);
        let (metadata_tx, _) = watch::channel(None);
        let (button_tx, _) = watch::channel(ButtonGlyph::default());
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            position_tx,
            metadata_tx,
            button_tx,
            snapshot_tx,
            event_bus: EventBus::new(event_capacity),
            session_id,
        }
    }

    /// Receivers for a new observer
    pub fn observers(&self) -> SessionObservers {
        SessionObservers {
            session_id: self.session_id,
            position_rx: self.position_tx.subscribe(),
            metadata_rx: self.metadata_tx.subscribe(),
            button_rx: self.button_tx.subscribe(),
            snapshot_rx: self.snapshot_tx.subscribe(),
            event_bus: self.event_bus.clone(),
        }
    }

    /// Publish the position in milliseconds
    pub fn publish_position(&self, position_ms: u64) {
        self.position_tx.send_replace(position_ms);
    }

    /// Publish metadata; returns false when it equals the current value
    pub fn publish_metadata(&self, metadata: Option<NowPlayingMetadata>) -> bool {
        self.metadata_tx.send_if_modified(|current| {
            if *current == metadata {
                return false;
            }
            *current = metadata;
            true
        })
    }

    pub fn publish_button(&self, button: ButtonGlyph) {
        self.button_tx.send_if_modified(|current| {
            if *current == button {
                return false;
            }
            *current = button;
            true
        });
    }

    /// Publish a snapshot; observers are only woken when it changed
    pub fn publish_snapshot(&self, snapshot: SessionSnapshot) -> bool {
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }

    /// Emit a discrete event (lossy when nobody listens)
    pub fn emit(&self, event: SessionEvent) {
        trace!(event_type = event.event_type(), "Session event");
        self.event_bus.emit_lossy(event);
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

/// Read side of a session, cloneable and shareable across tasks
#[derive(Clone)]
pub struct SessionObservers {
    session_id: Uuid,
    position_rx: watch::Receiver<u64>,
    metadata_rx: watch::Receiver<Option<NowPlayingMetadata>>,
    button_rx: watch::Receiver<ButtonGlyph>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    event_bus: EventBus,
}

impl SessionObservers {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Latest position in milliseconds
    pub fn position(&self) -> watch::Receiver<u64> {
        self.position_rx.clone()
    }

    /// Current item metadata, only ever set for items with a known duration
    pub fn metadata(&self) -> watch::Receiver<Option<NowPlayingMetadata>> {
        self.metadata_rx.clone()
    }

    pub fn button(&self) -> watch::Receiver<ButtonGlyph> {
        self.button_rx.clone()
    }

    pub fn snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to future session events
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_bus.subscribe()
    }
}
