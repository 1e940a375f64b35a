//! Playback vocabulary and observer notification payloads

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Playback state enumeration
///
/// Exactly one value at any time; only the controller moves between them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Engine released, nothing loaded
    #[default]
    Stopped,
    /// Source handed to the engine, waiting for the prepared callback
    Preparing,
    /// Playing (the engine may be paused underneath while priority is lost)
    Playing,
    /// Paused by the user, engine keeps its resources
    Paused,
}

impl PlaybackState {
    /// True when a track is loaded and prepared (Playing or Paused)
    pub fn has_loaded_track(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Preparing => write!(f, "preparing"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Audio priority held by the controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriorityState {
    /// No priority, must not produce sound
    #[default]
    NoneNoDuck,
    /// No priority, may keep playing at reduced volume
    NoneCanDuck,
    /// Exclusive priority, full volume
    Held,
}

impl PriorityState {
    /// Output volume implied by this priority, or `None` when playback must pause
    pub fn volume(&self, duck_volume: f32) -> Option<f32> {
        match self {
            PriorityState::NoneNoDuck => None,
            PriorityState::NoneCanDuck => Some(duck_volume),
            PriorityState::Held => Some(1.0),
        }
    }
}

impl std::fmt::Display for PriorityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityState::NoneNoDuck => write!(f, "none_no_duck"),
            PriorityState::NoneCanDuck => write!(f, "none_can_duck"),
            PriorityState::Held => write!(f, "held"),
        }
    }
}

/// Next/previous selection policy
///
/// `next()` cycles RepeatSingle -> RepeatAll -> Sequential -> Shuffle -> RepeatSingle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    RepeatSingle,
    #[default]
    RepeatAll,
    Sequential,
    Shuffle,
}

impl PlayMode {
    /// All modes in cycle order
    pub const ALL: [PlayMode; 4] = [
        PlayMode::RepeatSingle,
        PlayMode::RepeatAll,
        PlayMode::Sequential,
        PlayMode::Shuffle,
    ];

    /// The mode following this one in the fixed cycle
    pub fn next(self) -> PlayMode {
        match self {
            PlayMode::RepeatSingle => PlayMode::RepeatAll,
            PlayMode::RepeatAll => PlayMode::Sequential,
            PlayMode::Sequential => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::RepeatSingle,
        }
    }
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMode::RepeatSingle => write!(f, "repeat_single"),
            PlayMode::RepeatAll => write!(f, "repeat_all"),
            PlayMode::Sequential => write!(f, "sequential"),
            PlayMode::Shuffle => write!(f, "shuffle"),
        }
    }
}

impl FromStr for PlayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "repeat_single" | "single" => Ok(PlayMode::RepeatSingle),
            "repeat_all" | "repeat" => Ok(PlayMode::RepeatAll),
            "sequential" => Ok(PlayMode::Sequential),
            "shuffle" => Ok(PlayMode::Shuffle),
            other => Err(Error::InvalidInput(format!("unknown play mode '{}'", other))),
        }
    }
}

/// A playable track reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Stable identifier, used to tell tracks apart across playlist changes
    pub id: Uuid,
    pub title: String,
    /// Source locator handed to the render engine (path or URL)
    pub locator: String,
}

impl Track {
    /// Create a track with a fresh identifier
    pub fn new(title: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            locator: locator.into(),
        }
    }
}

/// State replayed to a connection observer when it registers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSnapshot {
    pub state: PlaybackState,
    /// Present only while Playing or Paused
    pub track: Option<Track>,
    pub position_ms: u64,
    pub mode: PlayMode,
}

/// Notifications delivered to playback-state observers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PlaybackNotification {
    /// Playback (re)started
    Played,

    /// Paused by the user
    Paused,

    /// Stopped, engine and priority released
    Stopped,

    /// A new track started loading
    NewSong { track: Track },

    /// Play mode changed
    ModeChanged { mode: PlayMode },

    /// Periodic position update while Playing
    Progress { position_ms: u64 },

    /// Load or render failure, followed by `Stopped`
    Error { message: String },
}

impl PlaybackNotification {
    /// Get notification type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PlaybackNotification::Played => "Played",
            PlaybackNotification::Paused => "Paused",
            PlaybackNotification::Stopped => "Stopped",
            PlaybackNotification::NewSong { .. } => "NewSong",
            PlaybackNotification::ModeChanged { .. } => "ModeChanged",
            PlaybackNotification::Progress { .. } => "Progress",
            PlaybackNotification::Error { .. } => "Error",
        }
    }
}

/// A notification stamped with its delivery time, for logs and external sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(flatten)]
    pub notification: PlaybackNotification,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl NotificationRecord {
    pub fn now(notification: PlaybackNotification) -> Self {
        Self {
            notification,
            timestamp: chrono::Utc::now(),
        }
    }
}
