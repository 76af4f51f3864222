//! Session handle
//!
//! The injected entry point to a running session. Cloneable; every clone
//! feeds the same control task. Commands are fire-and-forget: they return
//! once queued, and their outcome is observed through `SessionObservers`.

use chapter_common::events::{PlaybackRate, SessionSnapshot};
use chapter_common::PlayableItem;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use super::commands::{CustomCommand, SessionCommand, TransportCommand};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    session_id: Uuid,
}

impl SessionHandle {
    pub(crate) fn new(tx: mpsc::Sender<SessionCommand>, session_id: Uuid) -> Self {
        Self { tx, session_id }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        debug!(command = command.name(), "Queueing session command");
        self.tx.send(command).await.map_err(|_| Error::SessionClosed)
    }

    async fn transport(&self, command: TransportCommand) -> Result<()> {
        self.send(SessionCommand::Transport(command)).await
    }

    pub async fn play_or_toggle(&self) -> Result<()> {
        self.transport(TransportCommand::PlayOrToggle).await
    }

    pub async fn play_from_item(&self, item: PlayableItem) -> Result<()> {
        self.transport(TransportCommand::PlayFromItem(item)).await
    }

    pub async fn fast_forward(&self) -> Result<()> {
        self.transport(TransportCommand::FastForward).await
    }

    pub async fn fast_rewind(&self) -> Result<()> {
        self.transport(TransportCommand::FastRewind).await
    }

    pub async fn seek_to_seconds(&self, seconds: u32) -> Result<()> {
        self.transport(TransportCommand::SeekToSeconds(seconds)).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.transport(TransportCommand::Stop).await
    }

    /// The user swiped the notification away
    pub async fn notification_dismissed(&self) -> Result<()> {
        info!(session_id = %self.session_id, "Notification dismissed, stopping");
        self.transport(TransportCommand::Stop).await
    }

    /// Change the playback rate
    ///
    /// # Errors
    /// `InvalidRate` unless `rate` is one of 0.5, 1.0, 1.5 or 2.0. Nothing is
    /// sent in that case.
    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        let rate = PlaybackRate::try_from(rate)?;
        self.send(SessionCommand::Custom(CustomCommand::SetRate(rate)))
            .await
    }

    pub async fn append_items(&self, items: Vec<PlayableItem>) -> Result<()> {
        self.send(SessionCommand::Custom(CustomCommand::AppendItems(items)))
            .await
    }

    /// Snapshot reflecting every command sent before this call
    pub async fn current_snapshot(&self) -> Result<SessionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Query(reply_tx)).await?;
        reply_rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Tear the session down and wait until the engine is released
    ///
    /// Calling this on an already closed session is not an error.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.send(SessionCommand::Shutdown(ack_tx)).await.is_err() {
            debug!(session_id = %self.session_id, "Session already closed");
            return Ok(());
        }
        // Dropped sender means another shutdown won the race
        let _ = ack_rx.await;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
