//! Error types for cadence-player
//!
//! None of these are fatal to the controller: failures are absorbed into a
//! Stopped state plus an observer notification, and rejected commands leave
//! the state untouched.

use cadence_common::PlaybackState;
use thiserror::Error;

/// Main error type for cadence-player
#[derive(Error, Debug)]
pub enum Error {
    /// Engine could not open or prepare a track
    #[error("Source load failed for '{locator}': {reason}")]
    SourceLoad { locator: String, reason: String },

    /// Decode/render failure reported by the engine mid-playback
    #[error("Engine runtime error: {0}")]
    EngineRuntime(String),

    /// Play/next/previous issued before any playlist was set
    #[error("No playlist loaded")]
    EmptyPlaylist,

    /// Command not valid in the current playback state
    #[error("Command '{command}' not valid while {state}")]
    InvalidCommandInState {
        command: &'static str,
        state: PlaybackState,
    },

    /// Requested track index outside the playlist
    #[error("Track index {index} out of range (playlist has {len} tracks)")]
    TrackIndexOutOfRange { index: usize, len: usize },

    /// Engine asked to start before its prepared callback arrived
    #[error("Render engine started before prepare completed")]
    EngineNotPrepared,

    /// Too many commands waiting for a prepare to finish
    #[error("Deferred command queue full ({0} pending)")]
    DeferredQueueFull(usize),

    /// Controller event loop has shut down
    #[error("Controller is no longer running")]
    ControllerClosed,

    /// Text command could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Shared library errors (configuration, input validation)
    #[error(transparent)]
    Common(#[from] cadence_common::Error),
}

/// Convenience Result type using cadence-player Error
pub type Result<T> = std::result::Result<T, Error>;
