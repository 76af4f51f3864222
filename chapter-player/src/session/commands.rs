//! Session command set
//!
//! A closed set of commands accepted by the control task. Transport commands
//! are the media-session actions; custom commands travel on a separate path
//! because the host media session has no first-class action for them.

use chapter_common::events::{PlaybackRate, SessionSnapshot};
use chapter_common::PlayableItem;
use tokio::sync::oneshot;

/// Media-session transport actions
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Play, pause or prepare depending on the current state
    PlayOrToggle,
    /// Play a specific item, appending it first when it is not queued
    PlayFromItem(PlayableItem),
    FastForward,
    FastRewind,
    SeekToSeconds(u32),
    Stop,
}

/// Out-of-band commands
#[derive(Debug, Clone, PartialEq)]
pub enum CustomCommand {
    SetRate(PlaybackRate),
    AppendItems(Vec<PlayableItem>),
}

/// Everything the control task receives from a `SessionHandle`
#[derive(Debug)]
pub enum SessionCommand {
    Transport(TransportCommand),
    Custom(CustomCommand),
    /// Reply with the snapshot as of every previously sent command
    Query(oneshot::Sender<SessionSnapshot>),
    /// Tear the session down; the sender is signalled once teardown is done
    Shutdown(oneshot::Sender<()>),
}

impl SessionCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Transport(TransportCommand::PlayOrToggle) => "play_or_toggle",
            SessionCommand::Transport(TransportCommand::PlayFromItem(_)) => "play_from_item",
            SessionCommand::Transport(TransportCommand::FastForward) => "fast_forward",
            SessionCommand::Transport(TransportCommand::FastRewind) => "fast_rewind",
            SessionCommand::Transport(TransportCommand::SeekToSeconds(_)) => "seek_to_seconds",
            SessionCommand::Transport(TransportCommand::Stop) => "stop",
            SessionCommand::Custom(CustomCommand::SetRate(_)) => "set_rate",
            SessionCommand::Custom(CustomCommand::AppendItems(_)) => "append_items",
            SessionCommand::Query(_) => "query",
            SessionCommand::Shutdown(_) => "shutdown",
        }
    }
}
