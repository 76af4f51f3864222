//! # Chapter Common Library
//!
//! Shared code for the chapter playback workspace including:
//! - Playable item model and its parcel (flatten/reconstruct) form
//! - Playback state, rate and button glyph types
//! - Session events, published snapshots and the EventBus
//! - Configuration loading and resolution
//! - Duration formatting utilities

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod item;
pub mod time;

pub use error::{Error, Result};
pub use item::{ParcelValue, PlayableItem};
