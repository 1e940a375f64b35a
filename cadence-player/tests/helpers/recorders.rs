//! Observers that capture what the controller tells them

use cadence_common::{ConnectionSnapshot, PlayMode, PlaybackNotification, Track};
use cadence_player::{ConnectionObserver, PlaybackObserver};
use std::sync::Mutex;

/// Records every playback notification in delivery order
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PlaybackNotification>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<PlaybackNotification> {
        self.events.lock().unwrap().clone()
    }

    /// Notification types in order, e.g. `["NewSong", "Played"]`
    pub fn types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.event_type().to_string())
            .collect()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.event_type() == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn push(&self, notification: PlaybackNotification) {
        self.events.lock().unwrap().push(notification);
    }
}

impl PlaybackObserver for RecordingObserver {
    fn on_played(&self) {
        self.push(PlaybackNotification::Played);
    }

    fn on_paused(&self) {
        self.push(PlaybackNotification::Paused);
    }

    fn on_stopped(&self) {
        self.push(PlaybackNotification::Stopped);
    }

    fn on_new_song(&self, track: &Track) {
        self.push(PlaybackNotification::NewSong { track: track.clone() });
    }

    fn on_mode_changed(&self, mode: PlayMode) {
        self.push(PlaybackNotification::ModeChanged { mode });
    }

    fn on_progress(&self, position_ms: u64) {
        self.push(PlaybackNotification::Progress { position_ms });
    }

    fn on_error(&self, message: &str) {
        self.push(PlaybackNotification::Error {
            message: message.to_string(),
        });
    }
}

/// Panics on every notification
pub struct PanickingObserver;

impl PlaybackObserver for PanickingObserver {
    fn on_played(&self) {
        panic!("observer failure on played");
    }

    fn on_new_song(&self, _track: &Track) {
        panic!("observer failure on new song");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected(ConnectionSnapshot),
    Disconnected,
}

/// Connection observer standing in for a display
#[derive(Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<ConnectionEvent>>,
}

impl RecordingDisplay {
    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectionObserver for RecordingDisplay {
    fn on_connected(&self, snapshot: &ConnectionSnapshot) {
        self.events
            .lock()
            .unwrap()
            .push(ConnectionEvent::Connected(snapshot.clone()));
    }

    fn on_disconnected(&self) {
        self.events.lock().unwrap().push(ConnectionEvent::Disconnected);
    }
}
