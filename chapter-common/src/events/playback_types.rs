//! Playback-related type definitions
//!
//! Supporting types for playback state, rate and the play/pause glyph.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Playback state enumeration
///
/// Exactly one value is live at a time; the session core is the only writer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl PlaybackState {
    /// An item has been handed to the engine and not torn down
    pub fn is_prepared(&self) -> bool {
        matches!(
            self,
            PlaybackState::Preparing
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Stopped
        )
    }

    /// `play()` is a valid transport action from this state
    pub fn is_play_enabled(&self) -> bool {
        matches!(self, PlaybackState::Paused | PlaybackState::Stopped)
    }

    /// `pause()` is a valid transport action from this state
    pub fn is_pause_enabled(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Preparing => write!(f, "preparing"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Which glyph the play/pause button should show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ButtonGlyph {
    #[default]
    ShowPlay,
    ShowPause,
}

impl From<PlaybackState> for ButtonGlyph {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Playing => ButtonGlyph::ShowPause,
            _ => ButtonGlyph::ShowPlay,
        }
    }
}

/// Supported playback rates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackRate {
    Half,
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackRate {
    /// All supported rates, slowest first
    pub const ALL: [PlaybackRate; 4] = [
        PlaybackRate::Half,
        PlaybackRate::Normal,
        PlaybackRate::OneAndHalf,
        PlaybackRate::Double,
    ];

    pub fn as_f32(&self) -> f32 {
        match self {
            PlaybackRate::Half => 0.5,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }
}

impl TryFrom<f32> for PlaybackRate {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        PlaybackRate::ALL
            .into_iter()
            .find(|rate| (rate.as_f32() - value).abs() < f32::EPSILON)
            .ok_or(Error::InvalidRate(value))
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.as_f32())
    }
}
