//! # Cadence Player Library (cadence-player)
//!
//! Playback orchestration for a single-user audio player.
//!
//! **Purpose:** Turn user intent (play, pause, skip, seek, mode changes) and
//! asynchronous callbacks from a render engine and an audio priority arbiter
//! into one consistent playback state, and broadcast every change to
//! registered observers.
//!
//! **Architecture:** A single-owner state machine (`PlaybackController`)
//! driven by one serialized event queue (`ControllerService`). Queue
//! selection, priority arbitration, rendering and observer delivery sit
//! behind small traits so each can be replaced or faked in tests.

pub mod command;
pub mod engine;
pub mod error;
pub mod observer;
pub mod playback;
pub mod priority;
pub mod service;

pub use command::Command;
pub use engine::{RenderEngine, SimulatedEngine};
pub use error::{Error, Result};
pub use observer::{ConnectionObserver, ObserverId, ObserverRegistry, PlaybackObserver};
pub use playback::{EngineErrorCode, EngineEvent, Foreground, PlaybackController, PriorityChange};
pub use priority::{AudioPriorityArbiter, NoopArbiter, PlatformArbiter, PriorityPlatform};
pub use service::{ControllerHandle, ControllerService};
