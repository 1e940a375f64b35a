//! Test helper modules for cadence-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - FakeEngine: scripted render engine that records every call
//! - FakeArbiter: priority arbiter with a configurable initial state
//! - RecordingObserver / RecordingDisplay: capture notifications in order

#![allow(dead_code)]

pub mod fakes;
pub mod recorders;

pub use fakes::{ArbiterProbe, EngineCall, EngineProbe, FakeArbiter, FakeEngine};
pub use recorders::{ConnectionEvent, PanickingObserver, RecordingDisplay, RecordingObserver};

use cadence_common::config::PlayerSettings;
use cadence_common::{PlayMode, PriorityState, Track};
use cadence_player::{EngineEvent, PlaybackController};
use std::sync::Arc;

/// Controller wired to fakes, plus the handles used to inspect them
pub struct Harness {
    pub controller: PlaybackController,
    pub engine: EngineProbe,
    pub arbiter: ArbiterProbe,
    pub observer: Arc<RecordingObserver>,
    pub tracks: Vec<Track>,
}

impl Harness {
    /// Three-track playlist, priority held from the start
    pub fn new(mode: PlayMode) -> Self {
        Self::with(mode, PriorityState::Held, settings(mode))
    }

    pub fn with(mode: PlayMode, initial_priority: PriorityState, mut settings: PlayerSettings) -> Self {
        settings.default_mode = mode;
        let (engine, engine_probe) = FakeEngine::new();
        let (arbiter, arbiter_probe) = FakeArbiter::new(initial_priority);
        let mut controller = PlaybackController::new(Box::new(engine), Box::new(arbiter), settings);

        let observer = Arc::new(RecordingObserver::default());
        controller.register_state_observer(observer.clone());

        let tracks = tracks(&["A", "B", "C"]);
        controller
            .set_playlist(tracks.clone())
            .expect("playlist accepted");

        Self {
            controller,
            engine: engine_probe,
            arbiter: arbiter_probe,
            observer,
            tracks,
        }
    }

    /// Deliver the engine's prepared callback for the latest prepare
    pub fn prepared(&mut self) {
        let load_id = self.engine.load_id().expect("a prepare was started");
        self.controller
            .handle_engine_event(EngineEvent::Prepared { load_id });
    }

    /// Play to the end of the current track and deliver the completion
    pub fn complete(&mut self) {
        self.engine.finish_track();
        self.controller.handle_engine_event(EngineEvent::Completed);
    }

    /// Start playing `index` and finish the prepare
    pub fn play_prepared(&mut self, index: usize) {
        self.controller.play(Some(index)).expect("play accepted");
        self.prepared();
    }
}

/// Default settings with a fixed shuffle seed
pub fn settings(mode: PlayMode) -> PlayerSettings {
    PlayerSettings {
        default_mode: mode,
        shuffle_seed: Some(42),
        ..PlayerSettings::default()
    }
}

/// Tracks named after `titles`, with file-like locators
pub fn tracks(titles: &[&str]) -> Vec<Track> {
    titles
        .iter()
        .map(|title| Track::new(*title, format!("/music/{}.flac", title.to_lowercase())))
        .collect()
}
