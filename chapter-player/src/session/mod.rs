//! Playback session
//!
//! A session is one control task that exclusively owns the [`SessionCore`]
//! (state, queue, engine) and the [`PositionTicker`]. It multiplexes three
//! inputs: commands from [`SessionHandle`]s, events from the engine, and the
//! ticker interval. Because everything happens on that one task, no session
//! state is ever shared or locked.

pub mod commands;
pub mod core;
pub mod handle;
pub mod publisher;
pub mod ticker;

pub use commands::{CustomCommand, SessionCommand, TransportCommand};
pub use handle::SessionHandle;
pub use publisher::{SessionObservers, StatePublisher};
pub use ticker::PositionTicker;

use chapter_common::config::SessionConfig;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use self::core::SessionCore;
use crate::catalog::{Catalog, StaticCatalog};
use crate::notification::{NotificationSurface, TracingNotificationSurface};
use crate::playback::{Engine, EngineEvent, EngineEventSink, EngineProbe, SimulatedEngine};

/// Buffered commands per session before senders wait
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Assembles and spawns a session
pub struct SessionBuilder {
    config: SessionConfig,
    catalog: Box<dyn Catalog>,
    notification: Box<dyn NotificationSurface>,
}

impl SessionBuilder {
    /// Start from a config, the built-in sample book and a logging notification
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            catalog: Box::new(StaticCatalog::sample_book()),
            notification: Box::new(TracingNotificationSurface::new()),
        }
    }

    pub fn catalog(mut self, catalog: impl Catalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn notification(mut self, notification: impl NotificationSurface + 'static) -> Self {
        self.notification = Box::new(notification);
        self
    }

    /// Spawn the control task around `engine`
    ///
    /// `engine_events` must be the receiving end of the sink the engine was
    /// built with. Requires a running tokio runtime.
    pub fn spawn(
        self,
        engine: Box<dyn Engine>,
        engine_events: mpsc::UnboundedReceiver<EngineEvent>,
    ) -> (SessionHandle, SessionObservers) {
        let session_id = Uuid::new_v4();
        let publisher = StatePublisher::new(session_id, self.config.event_capacity);
        let observers = publisher.observers();
        let ticker = PositionTicker::new(self.config.position_interval());
        let core = SessionCore::new(
            &self.config,
            engine,
            self.catalog,
            self.notification,
            publisher,
        );

        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        tokio::spawn(run_control_loop(core, ticker, rx, engine_events));
        info!(%session_id, "Session started");

        (SessionHandle::new(tx, session_id), observers)
    }

    /// Spawn a session around a [`SimulatedEngine`] with its driver task
    pub fn spawn_simulated(self) -> (SessionHandle, SessionObservers, EngineProbe) {
        let (sink, engine_events) = EngineEventSink::channel();
        let engine = SimulatedEngine::new(sink, self.config.fast_forward_ms, self.config.rewind_ms);
        let probe = engine.probe();
        let _driver = engine.spawn_driver(self.config.position_interval());
        let (handle, observers) = self.spawn(Box::new(engine), engine_events);
        (handle, observers, probe)
    }
}

/// Control task body
///
/// Engine events are drained before the next command so that a command never
/// acts on a state the engine has already moved past.
async fn run_control_loop(
    mut core: SessionCore,
    mut ticker: PositionTicker,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut engine_events: mpsc::UnboundedReceiver<EngineEvent>,
) {
    let mut shutdown_ack: Option<oneshot::Sender<()>> = None;

    loop {
        tokio::select! {
            biased;

            Some(event) = engine_events.recv() => {
                core.handle_engine_event(event);
            }

            command = commands.recv() => match command {
                Some(SessionCommand::Transport(command)) => core.handle_transport(command),
                Some(SessionCommand::Custom(command)) => core.handle_custom(command),
                Some(SessionCommand::Query(reply)) => {
                    let _ = reply.send(core.snapshot());
                }
                Some(SessionCommand::Shutdown(ack)) => {
                    shutdown_ack = Some(ack);
                    break;
                }
                None => {
                    debug!(session_id = %core.session_id(), "All session handles dropped");
                    break;
                }
            },

            _ = ticker.tick(), if !ticker.is_cancelled() => {
                if let Some(position_ms) = ticker.observe(core.engine_position_ms()) {
                    core.publish_position(position_ms);
                }
            }
        }
    }

    ticker.cancel();
    core.shutdown();
    // Observers see their channels close once the core is gone
    drop(core);
    commands.close();

    if let Some(ack) = shutdown_ack {
        let _ = ack.send(());
    }
}
