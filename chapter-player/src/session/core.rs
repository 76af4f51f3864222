//! Playback session core
//!
//! The state machine. Owns the playback state, the queue and the engine, and
//! is only ever touched from the control task, so none of it is locked.
//!
//! Transitions:
//!
//! | From | Trigger | To |
//! |---|---|---|
//! | Idle / Error | play_or_toggle, play_from_item | Preparing (`engine.prepare`) |
//! | Preparing | engine ready, play-when-ready | Playing |
//! | Preparing | engine ready, not play-when-ready | Paused |
//! | Playing | pause command / engine paused | Paused |
//! | Paused / Stopped | play command / engine playing | Playing |
//! | Playing / Paused | stop command | Stopped (`engine.stop(false)`) |
//! | any prepared | engine ended | Stopped |
//! | any | engine error, engine command failure | Error |
//!
//! Crossing into the last queued item triggers one pre-fetch of the item
//! that follows it. A failed pre-fetch is logged and the queue simply ends.

use chapter_common::config::SessionConfig;
use chapter_common::events::{
    ButtonGlyph, NowPlayingMetadata, PlaybackRate, PlaybackState, QueueChangeTrigger,
    SessionEvent, SessionSnapshot,
};
use chapter_common::time::{millis_to_secs, now, secs_to_millis};
use chapter_common::PlayableItem;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::commands::{CustomCommand, TransportCommand};
use super::publisher::StatePublisher;
use crate::catalog::Catalog;
use crate::error::{EngineError, Error, Result};
use crate::notification::{is_visible_in, NotificationSurface};
use crate::playback::{BufferState, Engine, EngineEvent, QueueManager};

pub struct SessionCore {
    session_id: Uuid,
    state: PlaybackState,
    engine: Box<dyn Engine>,
    queue: QueueManager,
    catalog: Box<dyn Catalog>,
    notification: Box<dyn NotificationSurface>,
    publisher: StatePublisher,
    rate: PlaybackRate,
    current_index: Option<usize>,
    /// Last metadata handed to observers
    metadata: Option<NowPlayingMetadata>,
    position_ms: u64,
    last_error: Option<String>,
    closed: bool,
}

impl SessionCore {
    pub fn new(
        config: &SessionConfig,
        engine: Box<dyn Engine>,
        catalog: Box<dyn Catalog>,
        notification: Box<dyn NotificationSurface>,
        publisher: StatePublisher,
    ) -> Self {
        Self {
            session_id: publisher.session_id(),
            state: PlaybackState::Idle,
            engine,
            queue: QueueManager::new(config.duplicate_policy),
            catalog,
            notification,
            publisher,
            rate: PlaybackRate::Normal,
            current_index: None,
            metadata: None,
            position_ms: 0,
            last_error: None,
            closed: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn publisher(&self) -> &StatePublisher {
        &self.publisher
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ========================================================================
    // Command dispatch
    // ========================================================================

    pub fn handle_transport(&mut self, command: TransportCommand) {
        let result = match command {
            TransportCommand::PlayOrToggle => self.play_or_toggle(),
            TransportCommand::PlayFromItem(item) => self.play_from_item(item),
            TransportCommand::FastForward => self.fast_forward(),
            TransportCommand::FastRewind => self.fast_rewind(),
            TransportCommand::SeekToSeconds(seconds) => self.seek_to_seconds(seconds),
            TransportCommand::Stop => self.stop(),
        };
        self.settle(result);
    }

    pub fn handle_custom(&mut self, command: CustomCommand) {
        let result = match command {
            CustomCommand::SetRate(rate) => self.set_rate(rate),
            CustomCommand::AppendItems(items) => self.append_items(items),
        };
        self.settle(result);
    }

    /// Route a command outcome: engine failures enter the error state,
    /// everything else is logged and absorbed
    fn settle(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(Error::Engine(err)) => self.enter_error(err),
            Err(err) if err.is_absorbed() => {
                info!(session_id = %self.session_id, state = %self.state, "{}", err);
            }
            Err(err) => {
                warn!(session_id = %self.session_id, state = %self.state, "Command failed: {}", err);
            }
        }
        self.publish();
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Toggle play/pause, or prepare when nothing is prepared
    pub fn play_or_toggle(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Idle => self.prepare_queue(0, 0),
            PlaybackState::Error => {
                let index = self.current_index.unwrap_or(0);
                self.prepare_queue(index, self.position_ms)
            }
            state if state.is_pause_enabled() => {
                self.engine.pause()?;
                self.set_state(PlaybackState::Paused);
                Ok(())
            }
            state if state.is_play_enabled() => {
                self.engine.play()?;
                self.set_state(PlaybackState::Playing);
                Ok(())
            }
            state => Err(Error::CommandRejected(format!(
                "neither play nor pause is valid while {}",
                state
            ))),
        }
    }

    /// Play `item`, appending it when it is not queued yet
    pub fn play_from_item(&mut self, item: PlayableItem) -> Result<()> {
        let index = match self.queue.find_by_id(&item.id) {
            Some(index) => index,
            None => {
                self.append_with_trigger(vec![item], QueueChangeTrigger::PlayRequest)?;
                self.queue.len() - 1
            }
        };
        self.prepare_at(index, 0)
    }

    /// Prepare from the queue, pulling the catalog default into an empty one
    fn prepare_queue(&mut self, start_index: usize, start_position_ms: u64) -> Result<()> {
        if self.queue.is_empty() {
            let item = self.catalog.default_item()?;
            debug!(id = %item.id, "Queue empty, loading default item");
            self.append_with_trigger(vec![item], QueueChangeTrigger::PlayRequest)?;
        }
        self.prepare_at(start_index, start_position_ms)
    }

    fn prepare_at(&mut self, start_index: usize, start_position_ms: u64) -> Result<()> {
        self.queue.item_at(start_index)?;
        let sources = self.queue.sources();
        self.engine
            .prepare(&sources, start_index, start_position_ms, true)?;

        self.last_error = None;
        self.position_ms = start_position_ms;
        self.set_current_index(start_index);
        self.set_state(PlaybackState::Preparing);
        Ok(())
    }

    pub fn seek_to_seconds(&mut self, seconds: u32) -> Result<()> {
        self.require_prepared("seek")?;
        let position_ms = secs_to_millis(seconds as u64);
        debug!(position_ms, "Seeking");
        self.engine.seek_to(position_ms)?;
        Ok(())
    }

    pub fn fast_forward(&mut self) -> Result<()> {
        self.require_prepared("fast forward")?;
        self.engine.fast_forward()?;
        Ok(())
    }

    pub fn fast_rewind(&mut self) -> Result<()> {
        self.require_prepared("rewind")?;
        self.engine.rewind()?;
        Ok(())
    }

    /// Stop without discarding the position
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.engine.stop(false)?;
                self.set_state(PlaybackState::Stopped);
                Ok(())
            }
            state => Err(Error::CommandRejected(format!("stop is not valid while {}", state))),
        }
    }

    fn require_prepared(&self, action: &str) -> Result<()> {
        if self.state.is_prepared() {
            Ok(())
        } else {
            Err(Error::CommandRejected(format!(
                "{} ignored, nothing prepared ({})",
                action, self.state
            )))
        }
    }

    // ========================================================================
    // Custom commands
    // ========================================================================

    pub fn set_rate(&mut self, rate: PlaybackRate) -> Result<()> {
        self.engine.set_rate(rate.as_f32())?;
        self.rate = rate;
        info!(session_id = %self.session_id, %rate, "Playback rate changed");
        self.publisher.emit(SessionEvent::RateChanged {
            session_id: self.session_id,
            rate,
            timestamp: now(),
        });
        Ok(())
    }

    /// Append items; live engines receive the new sources without interruption
    pub fn append_items(&mut self, items: Vec<PlayableItem>) -> Result<()> {
        self.append_with_trigger(items, QueueChangeTrigger::UserAppend)
    }

    fn append_with_trigger(
        &mut self,
        items: Vec<PlayableItem>,
        trigger: QueueChangeTrigger,
    ) -> Result<()> {
        let item_ids = self.queue.append(items, self.engine.as_mut())?;
        if item_ids.is_empty() {
            return Ok(());
        }
        debug_assert!(self.queue.is_aligned_with(self.engine.as_ref()));
        self.publisher.emit(SessionEvent::QueueAppended {
            session_id: self.session_id,
            item_ids,
            queue_len: self.queue.len(),
            trigger,
            timestamp: now(),
        });
        Ok(())
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        if self.closed {
            return;
        }
        match event {
            EngineEvent::StateChanged {
                play_when_ready,
                buffer_state,
            } => self.on_engine_state(play_when_ready, buffer_state),
            EngineEvent::ItemBoundaryCrossed { new_index } => self.on_item_boundary(new_index),
            EngineEvent::Error { kind, message } => {
                self.enter_error(EngineError::new(kind, message));
            }
        }
        self.publish();
    }

    fn on_engine_state(&mut self, play_when_ready: bool, buffer_state: BufferState) {
        let next = match (self.state, buffer_state) {
            (state, BufferState::Ended) if state.is_prepared() => PlaybackState::Stopped,
            (PlaybackState::Preparing, BufferState::Ready) if play_when_ready => {
                PlaybackState::Playing
            }
            (PlaybackState::Preparing, BufferState::Ready) => PlaybackState::Paused,
            (PlaybackState::Playing, _) if !play_when_ready => PlaybackState::Paused,
            (PlaybackState::Paused | PlaybackState::Stopped, BufferState::Ready)
                if play_when_ready =>
            {
                PlaybackState::Playing
            }
            (state, _) => state,
        };
        self.set_state(next);
    }

    fn on_item_boundary(&mut self, new_index: usize) {
        if new_index >= self.queue.len() {
            warn!(
                new_index,
                queue_len = self.queue.len(),
                "Engine crossed into an item the queue does not hold"
            );
            return;
        }

        self.set_current_index(new_index);
        if self.queue.is_last_index(new_index) {
            self.prefetch_after(new_index);
        }
    }

    /// Resolve and append the item following the one at `index`
    fn prefetch_after(&mut self, index: usize) {
        let after_id = match self.queue.item_at(index) {
            Ok(item) => item.id.clone(),
            Err(err) => {
                warn!("Pre-fetch skipped: {}", err);
                return;
            }
        };

        let result = self
            .catalog
            .next_after(&after_id)
            .and_then(|item| self.append_with_trigger(vec![item], QueueChangeTrigger::Prefetch));

        match result {
            Ok(()) => debug!(after = %after_id, queue_len = self.queue.len(), "Pre-fetch appended"),
            Err(err) => {
                warn!(after = %after_id, "Pre-fetch failed, queue ends here: {}", err);
                self.publisher.emit(SessionEvent::PrefetchFailed {
                    session_id: self.session_id,
                    after_item_id: after_id,
                    reason: err.to_string(),
                    timestamp: now(),
                });
            }
        }
    }

    // ========================================================================
    // State and publication
    // ========================================================================

    fn enter_error(&mut self, err: EngineError) {
        error!(session_id = %self.session_id, kind = %err.kind, "{}", err);
        let message = err.user_message();
        self.last_error = Some(message.clone());
        self.set_state(PlaybackState::Error);
        self.publisher.emit(SessionEvent::PlaybackError {
            session_id: self.session_id,
            message,
            timestamp: now(),
        });
    }

    fn set_state(&mut self, new_state: PlaybackState) {
        if new_state == self.state {
            return;
        }
        let old_state = self.state;
        self.state = new_state;
        info!(
            session_id = %self.session_id,
            %old_state,
            %new_state,
            "Playback state changed"
        );
        self.publisher.emit(SessionEvent::PlaybackStateChanged {
            session_id: self.session_id,
            old_state,
            new_state,
            timestamp: now(),
        });
        self.publisher.publish_button(ButtonGlyph::from(new_state));
    }

    fn set_current_index(&mut self, index: usize) {
        let Ok(item) = self.queue.item_at(index) else {
            return;
        };
        let item_id = item.id.clone();

        // Items without a known duration keep the previous metadata
        if let Some(metadata) = NowPlayingMetadata::from_item(item) {
            self.publisher.publish_metadata(Some(metadata.clone()));
            self.metadata = Some(metadata);
        }

        if self.current_index != Some(index) {
            self.current_index = Some(index);
            self.publisher.emit(SessionEvent::ItemChanged {
                session_id: self.session_id,
                item_id,
                index,
                timestamp: now(),
            });
        }
    }

    /// Sample the engine position
    pub fn engine_position_ms(&self) -> u64 {
        self.engine.current_position_ms()
    }

    /// Publish a new position sample (already filtered by the ticker)
    pub fn publish_position(&mut self, position_ms: u64) {
        self.position_ms = position_ms;
        self.publisher.publish_position(position_ms);
        self.publisher.publish_snapshot(self.snapshot());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            position_secs: millis_to_secs(self.position_ms),
            metadata: self.metadata.clone(),
            button: ButtonGlyph::from(self.state),
            rate: self.rate.as_f32(),
            state: self.state,
            queue_len: self.queue.len(),
            current_index: self.current_index,
            last_error: self.last_error.clone(),
        }
    }

    /// Push the snapshot to observers and sync the notification
    fn publish(&mut self) {
        let snapshot = self.snapshot();
        if is_visible_in(self.state) {
            self.notification.render(&snapshot);
        } else {
            self.notification.hide();
        }
        self.publisher.publish_snapshot(snapshot);
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Release the engine and hide the notification; idempotent
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(err) = self.engine.stop(true) {
            warn!("Engine stop during shutdown failed: {}", err);
        }
        self.engine.release();
        self.notification.hide();

        info!(session_id = %self.session_id, "Session closed");
        self.publisher.emit(SessionEvent::SessionClosed {
            session_id: self.session_id,
            timestamp: now(),
        });
    }
}
