//! Controller event types
//!
//! Every input to the controller (user commands, engine callbacks, priority
//! callbacks, progress ticks, queries) becomes one `ControllerEvent` on the
//! service's single queue, so transitions never run concurrently.

use crate::command::Command;
use crate::error::Result;
use crate::observer::{ConnectionObserver, ObserverId, PlaybackObserver};
use cadence_common::{PlaybackState, Track};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Engine error codes reported with `EngineEvent::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    /// Stream container not suitable for progressive playback
    NotValidForProgressive,
    /// The engine's backing media server died
    ServerDied,
    /// Unspecified engine failure
    Unknown,
    /// Engine-specific code
    Other(i32),
}

impl std::fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorCode::NotValidForProgressive => write!(f, "not valid for progressive playback"),
            EngineErrorCode::ServerDied => write!(f, "server died"),
            EngineErrorCode::Unknown => write!(f, "unknown"),
            EngineErrorCode::Other(code) => write!(f, "code {}", code),
        }
    }
}

/// Lifecycle callbacks from the render engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Asynchronous prepare `load_id` finished, `start()` is now allowed
    Prepared { load_id: u64 },
    /// Asynchronous prepare `load_id` failed
    LoadFailed { load_id: u64, reason: String },
    /// Current track played to its end
    Completed,
    /// Decode/render failure
    Error { code: EngineErrorCode, extra: i32 },
}

/// Asynchronous grant/revoke reported by the priority arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityChange {
    Gained,
    Lost { can_duck: bool },
}

/// Read-only queries and observer (un)registration, answered on a oneshot
pub enum Query {
    State(oneshot::Sender<PlaybackState>),
    CurrentTrack(oneshot::Sender<Option<Track>>),
    RegisterConnection(Arc<dyn ConnectionObserver>, oneshot::Sender<ObserverId>),
    UnregisterConnection(ObserverId, oneshot::Sender<bool>),
    RegisterState(Arc<dyn PlaybackObserver>, oneshot::Sender<ObserverId>),
    UnregisterState(ObserverId, oneshot::Sender<bool>),
}

/// One entry on the controller's serialized event queue
pub enum ControllerEvent {
    /// User or dispatch-layer command, with an optional reply slot
    Command(Command, Option<oneshot::Sender<Result<()>>>),
    Engine(EngineEvent),
    Priority(PriorityChange),
    /// Progress timer fired; carries the generation it was armed with
    ProgressTick(u64),
    Query(Query),
    /// Stop everything and end the event loop
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Queue `event` if the controller's queue still exists
fn enqueue(tx: &mpsc::WeakUnboundedSender<ControllerEvent>, event: ControllerEvent) -> bool {
    match tx.upgrade() {
        Some(tx) => tx.send(event).is_ok(),
        None => false,
    }
}

/// Handle the render engine uses to report its callbacks
///
/// Holds only a weak sender: collaborators never keep the controller's
/// queue open on their own.
#[derive(Clone)]
pub struct EngineEventSink {
    tx: mpsc::WeakUnboundedSender<ControllerEvent>,
}

impl EngineEventSink {
    pub(crate) fn new(tx: &mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { tx: tx.downgrade() }
    }

    /// Queue an engine callback; returns false once the controller is gone
    pub fn send(&self, event: EngineEvent) -> bool {
        enqueue(&self.tx, ControllerEvent::Engine(event))
    }

    pub fn prepared(&self, load_id: u64) -> bool {
        self.send(EngineEvent::Prepared { load_id })
    }

    pub fn completed(&self) -> bool {
        self.send(EngineEvent::Completed)
    }

    pub fn load_failed(&self, load_id: u64, reason: impl Into<String>) -> bool {
        self.send(EngineEvent::LoadFailed {
            load_id,
            reason: reason.into(),
        })
    }

    pub fn error(&self, code: EngineErrorCode, extra: i32) -> bool {
        self.send(EngineEvent::Error { code, extra })
    }
}

/// Handle the priority arbiter uses to report grants and revocations
#[derive(Clone)]
pub struct PriorityEventSink {
    tx: mpsc::WeakUnboundedSender<ControllerEvent>,
}

impl PriorityEventSink {
    pub(crate) fn new(tx: &mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { tx: tx.downgrade() }
    }

    pub fn gained(&self) -> bool {
        enqueue(&self.tx, ControllerEvent::Priority(PriorityChange::Gained))
    }

    pub fn lost(&self, can_duck: bool) -> bool {
        enqueue(&self.tx, ControllerEvent::Priority(PriorityChange::Lost { can_duck }))
    }
}
