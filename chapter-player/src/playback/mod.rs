//! Engine facade and queue management

pub mod engine;
pub mod events;
pub mod queue_manager;
pub mod simulated;

pub use engine::{Engine, EngineResult, MediaSource};
pub use events::{BufferState, EngineEvent, EngineEventSink};
pub use queue_manager::QueueManager;
pub use simulated::{EngineCall, EngineProbe, SimulatedEngine};
