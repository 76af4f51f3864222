//! Engine events (internal, not exposed to observers)
//!
//! The engine pushes these to the session core. They are converted into
//! `SessionEvent`s and snapshots before anything reaches an observer.

use tokio::sync::mpsc;

use crate::error::EngineErrorKind;

/// Engine buffering state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Nothing loaded
    Idle,
    /// Loading data for the current position
    Buffering,
    /// Able to render immediately
    Ready,
    /// Reached the end of the last source
    Ended,
}

/// Events pushed by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Play-when-ready flag or buffering state changed
    StateChanged {
        play_when_ready: bool,
        buffer_state: BufferState,
    },

    /// The engine moved to another source in its list
    ItemBoundaryCrossed { new_index: usize },

    /// The engine failed; no retry is attempted
    Error {
        kind: EngineErrorKind,
        message: String,
    },
}

/// Delivery end of the engine event channel
///
/// The only thing an engine can do with a sink is deliver one of the
/// [`EngineEvent`] variants to the control task, from any thread. Events sent
/// after the session has shut down are dropped.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSink {
    /// Create a sink and the receiver the control task listens on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn state_changed(&self, play_when_ready: bool, buffer_state: BufferState) {
        self.deliver(EngineEvent::StateChanged {
            play_when_ready,
            buffer_state,
        });
    }

    pub fn item_boundary_crossed(&self, new_index: usize) {
        self.deliver(EngineEvent::ItemBoundaryCrossed { new_index });
    }

    pub fn error(&self, kind: EngineErrorKind, message: impl Into<String>) {
        self.deliver(EngineEvent::Error {
            kind,
            message: message.into(),
        });
    }

    fn deliver(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Engine event dropped, session already closed");
        }
    }
}
