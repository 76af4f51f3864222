//! Engine facade
//!
//! Thin command interface to an opaque media engine. Commands are
//! fire-and-forget: a returned error means the engine refused the command
//! outright, not that playback later failed (that arrives as an
//! [`EngineEvent::Error`](super::EngineEvent::Error)). No retries are
//! attempted at this boundary.

use chapter_common::PlayableItem;

use crate::error::EngineError;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// One entry in the engine's source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    /// Locator the engine loads
    pub uri: String,
    /// Known duration, if the catalog supplied one
    pub duration_hint_ms: Option<u64>,
}

impl From<&PlayableItem> for MediaSource {
    fn from(item: &PlayableItem) -> Self {
        Self {
            uri: item.source.clone(),
            duration_hint_ms: (item.duration_secs > 0).then(|| item.duration_ms()),
        }
    }
}

/// Command side of a media engine
///
/// Implementations deliver events through an
/// [`EngineEventSink`](super::EngineEventSink) handed to them at construction;
/// if the engine runs its own threads it is responsible for sending events
/// through the sink rather than calling into the session directly.
pub trait Engine: Send {
    /// Replace the source list and start buffering at `start_index`
    fn prepare(
        &mut self,
        sources: &[MediaSource],
        start_index: usize,
        start_position_ms: u64,
        play_when_ready: bool,
    ) -> EngineResult<()>;

    /// Append to the tail of the source list without interrupting playback
    fn append_sources(&mut self, sources: &[MediaSource]) -> EngineResult<()>;

    fn play(&mut self) -> EngineResult<()>;

    fn pause(&mut self) -> EngineResult<()>;

    /// `reset_position = true` discards buffered state; `false` keeps the
    /// position for a later resume
    fn stop(&mut self, reset_position: bool) -> EngineResult<()>;

    fn seek_to(&mut self, position_ms: u64) -> EngineResult<()>;

    /// Engine-native skip forward by its configured increment
    fn fast_forward(&mut self) -> EngineResult<()>;

    /// Engine-native skip backward by its configured increment
    fn rewind(&mut self) -> EngineResult<()>;

    /// Playback parameter channel, separate from transport commands
    fn set_rate(&mut self, rate: f32) -> EngineResult<()>;

    fn current_position_ms(&self) -> u64;

    fn current_item_index(&self) -> usize;

    /// Length of the engine's source list
    fn source_count(&self) -> usize;

    /// Free engine resources; no command is valid afterwards
    fn release(&mut self);
}
