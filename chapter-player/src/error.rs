//! Error types for chapter-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Category of an engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Source could not be loaded (missing, network, unsupported)
    SourceUnavailable,
    /// A renderer component failed
    RendererFault,
    /// Unexpected runtime failure inside the engine
    Unexpected,
    /// Engine ran out of memory or another resource
    OutOfResources,
    /// Failure in a remote component
    RemoteFault,
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorKind::SourceUnavailable => write!(f, "source unavailable"),
            EngineErrorKind::RendererFault => write!(f, "renderer fault"),
            EngineErrorKind::Unexpected => write!(f, "unexpected"),
            EngineErrorKind::OutOfResources => write!(f, "out of resources"),
            EngineErrorKind::RemoteFault => write!(f, "remote fault"),
        }
    }
}

/// Error reported by the engine, surfaced verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Engine error ({kind}): {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Message for the user-facing layer
    pub fn user_message(&self) -> String {
        match self.kind {
            EngineErrorKind::SourceUnavailable => {
                "This chapter could not be loaded. Check your connection and try again.".to_string()
            }
            EngineErrorKind::OutOfResources => {
                "Playback stopped: the device ran out of resources.".to_string()
            }
            _ => "Something went wrong during playback.".to_string(),
        }
    }
}

/// Main error type for chapter-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared crate (config, parcel, rate validation)
    #[error(transparent)]
    Common(#[from] chapter_common::Error),

    /// Engine command or event failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Command not valid in the current state (absorbed, logged)
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// Queue index past the end (contract violation)
    #[error("Queue index {index} out of range (queue length {len})")]
    QueueIndexOutOfRange { index: usize, len: usize },

    /// Catalog could not resolve an item (absorbed, logged)
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),

    /// Append refused by the duplicate policy
    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),

    /// The control task has shut down
    #[error("Session closed")]
    SessionClosed,
}

impl Error {
    /// Errors the session absorbs without changing playback state
    pub fn is_absorbed(&self) -> bool {
        matches!(self, Error::CommandRejected(_) | Error::ResolutionFailed(_))
    }
}

/// Convenience Result type using chapter-player Error
pub type Result<T> = std::result::Result<T, Error>;
