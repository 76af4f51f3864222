//! In-process simulated engine
//!
//! Stands in for a real media engine: keeps a source list, advances a
//! wall-clock position scaled by the playback rate, crosses item boundaries
//! once an item's known duration has elapsed and reports `Ended` after the
//! last item. No audio device is touched.
//!
//! Every facade call is recorded so tests (and the demo binary) can inspect
//! exactly what the session asked of the engine through an [`EngineProbe`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::engine::{Engine, EngineResult, MediaSource};
use super::events::{BufferState, EngineEventSink};
use crate::error::{EngineError, EngineErrorKind};

/// One recorded facade call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Prepare {
        sources: Vec<String>,
        start_index: usize,
        start_position_ms: u64,
        play_when_ready: bool,
    },
    AppendSources(Vec<String>),
    Play,
    Pause,
    Stop { reset: bool },
    SeekTo(u64),
    FastForward,
    Rewind,
    SetRate(f32),
    Release,
}

#[derive(Debug)]
struct SimState {
    sources: Vec<MediaSource>,
    index: usize,
    /// Position at `anchor`, or the frozen position when not rendering
    anchor_position_ms: u64,
    /// Set while the position is advancing
    anchor: Option<Instant>,
    rate: f32,
    play_when_ready: bool,
    buffer_state: BufferState,
    released: bool,
    calls: Vec<EngineCall>,
    fail_next: Option<EngineError>,
}

impl SimState {
    fn new() -> Self {
        Self {
            sources: Vec::new(),
            index: 0,
            anchor_position_ms: 0,
            anchor: None,
            rate: 1.0,
            play_when_ready: false,
            buffer_state: BufferState::Idle,
            released: false,
            calls: Vec::new(),
            fail_next: None,
        }
    }

    fn current_duration_ms(&self) -> Option<u64> {
        self.sources
            .get(self.index)
            .and_then(|source| source.duration_hint_ms)
    }

    fn position_ms(&self) -> u64 {
        let raw = match self.anchor {
            Some(anchor) => {
                let elapsed = anchor.elapsed().as_millis() as f64 * self.rate as f64;
                self.anchor_position_ms.saturating_add(elapsed as u64)
            }
            None => self.anchor_position_ms,
        };
        match self.current_duration_ms() {
            Some(duration) => raw.min(duration),
            None => raw,
        }
    }

    fn is_rendering(&self) -> bool {
        self.play_when_ready && self.buffer_state == BufferState::Ready
    }

    /// Re-anchor after any change to position, rate or rendering state
    fn set_position(&mut self, position_ms: u64) {
        self.anchor_position_ms = match self.current_duration_ms() {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        self.anchor = self.is_rendering().then(Instant::now);
    }

    fn freeze(&mut self) {
        let position = self.position_ms();
        self.anchor_position_ms = position;
        self.anchor = None;
    }

    /// Record a command and consume a pending injected failure
    fn begin(&mut self, call: EngineCall) -> EngineResult<()> {
        self.calls.push(call);
        if self.released {
            return Err(EngineError::new(
                EngineErrorKind::Unexpected,
                "engine already released",
            ));
        }
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn uris(sources: &[MediaSource]) -> Vec<String> {
    sources.iter().map(|s| s.uri.clone()).collect()
}

/// Simulated media engine
pub struct SimulatedEngine {
    state: Arc<Mutex<SimState>>,
    sink: EngineEventSink,
    fast_forward_ms: u64,
    rewind_ms: u64,
}

impl SimulatedEngine {
    /// Create an engine delivering its events to `sink`
    ///
    /// `fast_forward_ms` / `rewind_ms` are the engine-native skip increments.
    pub fn new(sink: EngineEventSink, fast_forward_ms: u64, rewind_ms: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
            sink,
            fast_forward_ms,
            rewind_ms,
        }
    }

    /// Inspection and fault-injection handle sharing this engine's state
    pub fn probe(&self) -> EngineProbe {
        EngineProbe {
            state: Arc::clone(&self.state),
            sink: self.sink.clone(),
        }
    }

    /// Spawn the task that advances playback through item boundaries
    ///
    /// The task checks progress every `period` and exits once the engine is
    /// released.
    pub fn spawn_driver(&self, period: Duration) -> JoinHandle<()> {
        let probe = self.probe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if probe.is_released() {
                    debug!("Simulated engine released, driver exiting");
                    break;
                }
                probe.advance();
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Engine for SimulatedEngine {
    fn prepare(
        &mut self,
        sources: &[MediaSource],
        start_index: usize,
        start_position_ms: u64,
        play_when_ready: bool,
    ) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::Prepare {
            sources: uris(sources),
            start_index,
            start_position_ms,
            play_when_ready,
        })?;

        if start_index >= sources.len() {
            return Err(EngineError::new(
                EngineErrorKind::SourceUnavailable,
                format!(
                    "start index {} outside source list of {}",
                    start_index,
                    sources.len()
                ),
            ));
        }

        state.sources = sources.to_vec();
        state.index = start_index;
        state.play_when_ready = play_when_ready;
        state.buffer_state = BufferState::Buffering;
        state.anchor = None;
        state.anchor_position_ms = start_position_ms;
        self.sink.state_changed(play_when_ready, BufferState::Buffering);

        state.buffer_state = BufferState::Ready;
        state.set_position(start_position_ms);
        self.sink.state_changed(play_when_ready, BufferState::Ready);

        debug!(
            sources = sources.len(),
            start_index, start_position_ms, play_when_ready, "Simulated engine prepared"
        );
        Ok(())
    }

    fn append_sources(&mut self, sources: &[MediaSource]) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::AppendSources(uris(sources)))?;
        state.sources.extend_from_slice(sources);
        trace!(total = state.sources.len(), "Sources appended");
        Ok(())
    }

    fn play(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::Play)?;

        let position = match state.buffer_state {
            BufferState::Ended => 0,
            _ => state.position_ms(),
        };
        if state.buffer_state != BufferState::Ready {
            state.buffer_state = BufferState::Buffering;
            self.sink.state_changed(true, BufferState::Buffering);
            state.buffer_state = BufferState::Ready;
        }
        state.play_when_ready = true;
        state.set_position(position);
        self.sink.state_changed(true, BufferState::Ready);
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::Pause)?;
        state.freeze();
        state.play_when_ready = false;
        let buffer_state = state.buffer_state;
        self.sink.state_changed(false, buffer_state);
        Ok(())
    }

    fn stop(&mut self, reset_position: bool) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::Stop {
            reset: reset_position,
        })?;
        state.freeze();
        state.play_when_ready = false;
        state.buffer_state = BufferState::Idle;
        if reset_position {
            state.sources.clear();
            state.index = 0;
            state.anchor_position_ms = 0;
        }
        self.sink.state_changed(false, BufferState::Idle);
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::SeekTo(position_ms))?;
        let leaving_end = state.buffer_state == BufferState::Ended;
        if leaving_end {
            state.buffer_state = BufferState::Ready;
        }
        state.set_position(position_ms);
        if leaving_end {
            // Leaving Ended is a state change
            let play_when_ready = state.play_when_ready;
            self.sink.state_changed(play_when_ready, BufferState::Ready);
        }
        Ok(())
    }

    fn fast_forward(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::FastForward)?;
        let target = state.position_ms().saturating_add(self.fast_forward_ms);
        state.set_position(target);
        Ok(())
    }

    fn rewind(&mut self) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::Rewind)?;
        let target = state.position_ms().saturating_sub(self.rewind_ms);
        state.set_position(target);
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> EngineResult<()> {
        let mut state = self.lock();
        state.begin(EngineCall::SetRate(rate))?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(EngineError::new(
                EngineErrorKind::Unexpected,
                format!("invalid rate {}", rate),
            ));
        }
        let position = state.position_ms();
        state.rate = rate;
        state.set_position(position);
        Ok(())
    }

    fn current_position_ms(&self) -> u64 {
        self.lock().position_ms()
    }

    fn current_item_index(&self) -> usize {
        self.lock().index
    }

    fn source_count(&self) -> usize {
        self.lock().sources.len()
    }

    fn release(&mut self) {
        let mut state = self.lock();
        state.calls.push(EngineCall::Release);
        state.freeze();
        state.play_when_ready = false;
        state.buffer_state = BufferState::Idle;
        state.released = true;
        debug!("Simulated engine released");
    }
}

/// Shared view into a [`SimulatedEngine`]
///
/// Clones observe the same engine. Usable after the engine itself has been
/// moved into a session.
#[derive(Clone)]
pub struct EngineProbe {
    state: Arc<Mutex<SimState>>,
    sink: EngineEventSink,
}

impl EngineProbe {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every facade call received so far, oldest first
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn source_count(&self) -> usize {
        self.lock().sources.len()
    }

    pub fn source_uris(&self) -> Vec<String> {
        uris(&self.lock().sources)
    }

    pub fn position_ms(&self) -> u64 {
        self.lock().position_ms()
    }

    pub fn current_index(&self) -> usize {
        self.lock().index
    }

    pub fn rate(&self) -> f32 {
        self.lock().rate
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    /// Move the position without recording a facade call
    pub fn set_position_ms(&self, position_ms: u64) {
        self.lock().set_position(position_ms);
    }

    /// Make the next command fail with `err`
    pub fn fail_next_command(&self, err: EngineError) {
        self.lock().fail_next = Some(err);
    }

    /// Report an asynchronous engine failure; the engine drops to idle
    pub fn inject_error(&self, kind: EngineErrorKind, message: impl Into<String>) {
        let message = message.into();
        {
            let mut state = self.lock();
            state.freeze();
            state.play_when_ready = false;
            state.buffer_state = BufferState::Idle;
        }
        warn!(%kind, %message, "Injected engine error");
        self.sink.error(kind, message);
    }

    /// Jump to another source as if playback had run into it
    pub fn cross_to_item(&self, new_index: usize) {
        {
            let mut state = self.lock();
            state.index = new_index;
            state.set_position(0);
        }
        self.sink.item_boundary_crossed(new_index);
    }

    /// Advance through any boundary the current position has reached
    pub fn advance(&self) {
        let mut state = self.lock();
        if !state.is_rendering() {
            return;
        }
        let Some(duration) = state.current_duration_ms() else {
            return;
        };
        if state.position_ms() < duration {
            return;
        }

        if state.index + 1 < state.sources.len() {
            state.index += 1;
            state.set_position(0);
            let index = state.index;
            drop(state);
            debug!(index, "Simulated engine crossed item boundary");
            self.sink.item_boundary_crossed(index);
        } else {
            state.freeze();
            state.buffer_state = BufferState::Ended;
            let play_when_ready = state.play_when_ready;
            drop(state);
            debug!("Simulated engine reached end of sources");
            self.sink.state_changed(play_when_ready, BufferState::Ended);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::events::EngineEvent;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn source(uri: &str, secs: u64) -> MediaSource {
        MediaSource {
            uri: uri.to_string(),
            duration_hint_ms: Some(secs * 1000),
        }
    }

    fn engine() -> (SimulatedEngine, UnboundedReceiver<EngineEvent>) {
        let (sink, rx) = EngineEventSink::channel();
        (SimulatedEngine::new(sink, 15_000, 15_000), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_prepare_reports_buffering_then_ready() {
        let (mut engine, mut rx) = engine();
        engine.prepare(&[source("a", 90)], 0, 0, true).unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                EngineEvent::StateChanged {
                    play_when_ready: true,
                    buffer_state: BufferState::Buffering
                },
                EngineEvent::StateChanged {
                    play_when_ready: true,
                    buffer_state: BufferState::Ready
                },
            ]
        );
        assert_eq!(engine.source_count(), 1);
    }

    #[tokio::test]
    async fn test_prepare_past_end_fails() {
        let (mut engine, _rx) = engine();
        let err = engine.prepare(&[source("a", 90)], 1, 0, true).unwrap_err();
        assert_eq!(err.kind, EngineErrorKind::SourceUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_advances_with_rate() {
        let (mut engine, _rx) = engine();
        engine.prepare(&[source("a", 90)], 0, 0, true).unwrap();
        engine.set_rate(2.0).unwrap();

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(engine.current_position_ms(), 2000);

        engine.pause().unwrap();
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(engine.current_position_ms(), 2000);
    }

    #[tokio::test]
    async fn test_skip_increments_clamp() {
        let (mut engine, _rx) = engine();
        engine.prepare(&[source("a", 20)], 0, 0, false).unwrap();

        engine.fast_forward().unwrap();
        assert_eq!(engine.current_position_ms(), 15_000);
        engine.fast_forward().unwrap();
        assert_eq!(engine.current_position_ms(), 20_000);
        engine.rewind().unwrap();
        assert_eq!(engine.current_position_ms(), 5_000);
        engine.rewind().unwrap();
        assert_eq!(engine.current_position_ms(), 0);
    }

    #[tokio::test]
    async fn test_advance_crosses_boundary_then_ends() {
        let (mut engine, mut rx) = engine();
        let probe = engine.probe();
        engine
            .prepare(&[source("a", 10), source("b", 10)], 0, 0, true)
            .unwrap();
        drain(&mut rx);

        probe.set_position_ms(10_000);
        probe.advance();
        assert_eq!(drain(&mut rx), vec![EngineEvent::ItemBoundaryCrossed { new_index: 1 }]);
        assert_eq!(engine.current_item_index(), 1);

        probe.set_position_ms(10_000);
        probe.advance();
        assert_eq!(
            drain(&mut rx),
            vec![EngineEvent::StateChanged {
                play_when_ready: true,
                buffer_state: BufferState::Ended
            }]
        );
    }

    #[tokio::test]
    async fn test_calls_are_recorded_and_failures_injected() {
        let (mut engine, _rx) = engine();
        let probe = engine.probe();
        probe.fail_next_command(EngineError::new(EngineErrorKind::RendererFault, "no sink"));

        assert!(engine.play().is_err());
        assert!(engine.pause().is_ok());
        engine.release();
        assert!(engine.seek_to(1).is_err());

        assert_eq!(
            probe.calls(),
            vec![
                EngineCall::Play,
                EngineCall::Pause,
                EngineCall::Release,
                EngineCall::SeekTo(1)
            ]
        );
        assert!(probe.is_released());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_after_end_reports_ready() {
        let (mut engine, mut rx) = engine();
        let probe = engine.probe();
        engine.prepare(&[source("a", 10)], 0, 0, true).unwrap();
        probe.set_position_ms(10_000);
        probe.advance();
        drain(&mut rx);

        engine.seek_to(2_000).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![EngineEvent::StateChanged {
                play_when_ready: true,
                buffer_state: BufferState::Ready
            }]
        );
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(engine.current_position_ms(), 3_000);

        // Seeking while already ready stays silent
        engine.seek_to(1_000).unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_stop_with_reset_clears_sources() {
        let (mut engine, _rx) = engine();
        engine.prepare(&[source("a", 10)], 0, 0, true).unwrap();
        engine.stop(false).unwrap();
        assert_eq!(engine.source_count(), 1);
        engine.stop(true).unwrap();
        assert_eq!(engine.source_count(), 0);
    }
}
