//! Notification boundary
//!
//! The session decides when the persistent notification is visible and what
//! it shows; presenting it is someone else's job. Rendered while the session
//! is preparing, playing or paused; hidden in every other state.

use chapter_common::events::{PlaybackState, SessionSnapshot};
use tracing::{debug, info};

pub trait NotificationSurface: Send {
    /// Show or refresh the notification
    fn render(&mut self, snapshot: &SessionSnapshot);

    /// Remove the notification if it is shown
    fn hide(&mut self);
}

/// Whether a notification belongs on screen in `state`
pub fn is_visible_in(state: PlaybackState) -> bool {
    matches!(
        state,
        PlaybackState::Preparing | PlaybackState::Playing | PlaybackState::Paused
    )
}

/// Surface that only logs what it would present
#[derive(Debug, Default)]
pub struct TracingNotificationSurface {
    visible: bool,
}

impl TracingNotificationSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl NotificationSurface for TracingNotificationSurface {
    fn render(&mut self, snapshot: &SessionSnapshot) {
        let title = snapshot
            .metadata
            .as_ref()
            .map(|m| m.title.as_str())
            .unwrap_or("");
        if !self.visible {
            info!(state = %snapshot.state, title, "Notification shown");
            self.visible = true;
        } else {
            debug!(state = %snapshot.state, title, button = ?snapshot.button, "Notification updated");
        }
    }

    fn hide(&mut self) {
        if self.visible {
            info!("Notification hidden");
            self.visible = false;
        }
    }
}
