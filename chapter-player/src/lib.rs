//! # Chapter Player Library (chapter-player)
//!
//! Playback session controller for book chapters.
//!
//! **Purpose:** Drive a media engine through an opaque command/event facade,
//! keep an append-only chapter queue index-aligned with the engine's source
//! list, pre-fetch the next chapter when the last queued one starts, and
//! republish engine state as latest-value snapshots for any number of
//! observers.
//!
//! **Architecture:** One control task owns all mutable session state and
//! multiplexes commands, engine events and the position ticker.

pub mod catalog;
pub mod error;
pub mod notification;
pub mod playback;
pub mod session;

pub use error::{EngineError, EngineErrorKind, Error, Result};
pub use session::{SessionBuilder, SessionHandle, SessionObservers};
