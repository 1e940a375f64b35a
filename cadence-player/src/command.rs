//! Controller commands
//!
//! The command surface exposed to the dispatch layer, plus parsing from the
//! short text actions used by the demo binary (`play 2`, `next`, `seek 30000`).

use crate::error::{Error, Result};
use cadence_common::Track;
use std::str::FromStr;

/// A request to change playback
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play the given playlist index, or the pending track when `None`
    Play(Option<usize>),
    Pause,
    Stop,
    Next { from_user: bool },
    Previous { from_user: bool },
    Seek(u64),
    ChangeMode,
    SetPlaylist(Vec<Track>),
}

impl Command {
    /// Short name used in logs and rejection errors
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play(_) => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Next { .. } => "next",
            Command::Previous { .. } => "previous",
            Command::Seek(_) => "seek",
            Command::ChangeMode => "change_mode",
            Command::SetPlaylist(_) => "set_playlist",
        }
    }

    /// Whether this command must wait for a pending prepare to finish
    pub fn waits_for_prepare(&self) -> bool {
        matches!(
            self,
            Command::Play(_)
                | Command::Pause
                | Command::Next { .. }
                | Command::Previous { .. }
                | Command::Seek(_)
        )
    }
}

impl FromStr for Command {
    type Err = Error;

    /// Parse a text action; skips from the text surface are user-initiated
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let action = parts
            .next()
            .ok_or_else(|| Error::InvalidCommand("empty command".to_string()))?
            .to_ascii_lowercase();
        let argument = parts.next();
        if parts.next().is_some() {
            return Err(Error::InvalidCommand(format!("too many arguments in '{}'", s.trim())));
        }

        let command = match (action.as_str(), argument) {
            ("play", None) => Command::Play(None),
            ("play", Some(index)) => Command::Play(Some(parse_number(index, "track index")?)),
            ("pause", None) => Command::Pause,
            ("stop", None) => Command::Stop,
            ("next", None) => Command::Next { from_user: true },
            ("previous" | "prev", None) => Command::Previous { from_user: true },
            ("seek", Some(ms)) => Command::Seek(parse_number(ms, "seek position")?),
            ("seek", None) => {
                return Err(Error::InvalidCommand("seek needs a position in ms".to_string()))
            }
            ("mode", None) => Command::ChangeMode,
            (other, None) => return Err(Error::InvalidCommand(format!("unknown action '{}'", other))),
            (other, Some(_)) => {
                return Err(Error::InvalidCommand(format!("'{}' takes no argument", other)))
            }
        };
        Ok(command)
    }
}

fn parse_number<T: FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::InvalidCommand(format!("invalid {} '{}'", what, text)))
}
