//! Render engine collaborator
//!
//! The controller never decodes or renders audio itself. It drives an engine
//! through this trait and receives the engine's lifecycle callbacks through
//! an [`EngineEventSink`] handed over once by the service.

pub mod simulated;

use crate::error::Result;
use crate::playback::events::EngineEventSink;

pub use simulated::SimulatedEngine;

/// Audio decode/render engine driven by the controller
///
/// `prepare_async` must return immediately and later deliver exactly one of
/// `Prepared` or `LoadFailed` through the sink, tagged with the `load_id` it
/// was called with. `start` before `Prepared` is a contract violation.
pub trait RenderEngine: Send {
    /// Receive the callback sink (called once by the service before any command)
    fn attach(&mut self, sink: EngineEventSink);

    /// Return to the idle state, dropping any loaded source
    fn reset(&mut self);

    /// Set the source to load
    fn set_source(&mut self, locator: &str) -> Result<()>;

    /// Begin asynchronous prepare of the current source
    fn prepare_async(&mut self, load_id: u64) -> Result<()>;

    /// Start or resume rendering
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn seek_to(&mut self, position_ms: u64);

    /// Per-channel output volume (0.0-1.0)
    fn set_volume(&mut self, left: f32, right: f32);

    fn set_looping(&mut self, looping: bool);

    fn is_looping(&self) -> bool;

    fn is_playing(&self) -> bool;

    /// Elapsed position of the current source in milliseconds
    fn current_position(&self) -> u64;

    /// Free all engine resources; `reset` re-allocates
    fn release(&mut self);
}
