//! # Cadence Common Library
//!
//! Shared code for the Cadence playback controller including:
//! - Playback vocabulary (tracks, playback/priority states, play modes)
//! - Observer notification payloads
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{
    ConnectionSnapshot, PlayMode, PlaybackNotification, PlaybackState, PriorityState, Track,
};
