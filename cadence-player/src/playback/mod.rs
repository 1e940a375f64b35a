//! Playback state machine and queue resolution

pub mod controller;
pub mod events;
pub mod queue;
pub mod ticker;

pub use controller::{Foreground, PlaybackController};
pub use events::{ControllerEvent, EngineErrorCode, EngineEvent, EngineEventSink, PriorityChange, PriorityEventSink};
pub use queue::{resolve_next, resolve_previous, QueueEffect, Resolution, ShuffleHistory};
pub use ticker::ProgressTicker;
