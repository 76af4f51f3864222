//! Published state model
//!
//! What observers see: the metadata of the current item and the latest
//! snapshot of the whole session. Both are recomputed by the session core;
//! consumers only ever get the most recent value.

use serde::{Deserialize, Serialize};

use super::playback_types::{ButtonGlyph, PlaybackRate, PlaybackState};
use crate::human_time::format_secs_mss;
use crate::item::PlayableItem;

/// Display metadata for the item currently loaded in the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingMetadata {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub artwork: String,
    /// Total duration formatted as `M:SS`
    pub duration_str: String,
    /// Total duration in seconds (seek bar maximum)
    pub total_secs: u64,
}

impl NowPlayingMetadata {
    /// Build display metadata for an item
    ///
    /// Returns `None` until a duration is known (zero duration), so observers
    /// never size a seek bar to zero.
    pub fn from_item(item: &PlayableItem) -> Option<Self> {
        if item.duration_secs == 0 {
            return None;
        }

        Some(Self {
            id: item.id.clone(),
            title: item.title.trim().to_string(),
            subtitle: item.subtitle.trim().to_string(),
            artwork: item.artwork.clone(),
            duration_str: format_secs_mss(item.duration_secs),
            total_secs: item.duration_secs,
        })
    }
}

/// Latest published bundle of session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current position in whole seconds
    pub position_secs: u64,
    /// Current item metadata (None when nothing with a duration is loaded)
    pub metadata: Option<NowPlayingMetadata>,
    pub button: ButtonGlyph,
    pub rate: f32,
    pub state: PlaybackState,
    pub queue_len: usize,
    pub current_index: Option<usize>,
    /// Human-readable message of the last engine error
    pub last_error: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            position_secs: 0,
            metadata: None,
            button: ButtonGlyph::ShowPlay,
            rate: PlaybackRate::Normal.as_f32(),
            state: PlaybackState::Idle,
            queue_len: 0,
            current_index: None,
            last_error: None,
        }
    }
}
