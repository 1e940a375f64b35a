//! Playback controller state machine
//!
//! **Responsibilities:**
//! - Playback state transitions (play, pause, stop, seek, next/previous)
//! - Reacting to render engine callbacks (prepared, completed, errors)
//! - Applying audio priority grants and revocations to the engine
//! - Progress ticks and observer notification
//!
//! The controller is a plain single-owner struct: every method takes
//! `&mut self` and runs to completion. `ControllerService` feeds it from one
//! queue; tests may drive it directly.

use super::events::{ControllerEvent, EngineEvent, EngineEventSink, PriorityChange, PriorityEventSink};
use super::queue::{resolve_next, resolve_previous, QueueEffect, ShuffleHistory};
use super::ticker::ProgressTicker;
use crate::command::Command;
use crate::engine::RenderEngine;
use crate::error::{Error, Result};
use crate::observer::{ConnectionObserver, ObserverId, ObserverRegistry, PlaybackObserver};
use crate::priority::AudioPriorityArbiter;
use cadence_common::config::PlayerSettings;
use cadence_common::{
    ConnectionSnapshot, PlayMode, PlaybackNotification, PlaybackState, PriorityState, Track,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Foreground-equivalent status, held only while actively serving the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Foreground {
    /// Track title being prepared
    Loading(String),
    /// Track title being played
    Playing(String),
}

/// Playback controller - owns playback state, playlist, mode and priority
pub struct PlaybackController {
    engine: Box<dyn RenderEngine>,
    arbiter: Box<dyn AudioPriorityArbiter>,
    settings: PlayerSettings,

    state: PlaybackState,
    priority: PriorityState,
    mode: PlayMode,

    /// Empty until the first accepted `set_playlist`
    playlist: Vec<Track>,
    /// Index of the track loaded in the engine
    current_index: usize,
    /// Index the next play request will load
    pending_index: usize,
    /// Track loaded in the engine, kept across playlist replacement
    current_track: Option<Track>,
    history: ShuffleHistory,
    rng: StdRng,

    /// False after a full release, until the next load re-allocates
    engine_allocated: bool,
    foreground: Option<Foreground>,

    /// Commands received while Preparing, replayed after the prepare
    deferred: VecDeque<Command>,
    /// Bumped on every prepare; prepare callbacks carrying another value are stale
    load_generation: u64,

    connection_observers: ObserverRegistry<dyn ConnectionObserver>,
    state_observers: ObserverRegistry<dyn PlaybackObserver>,
    ticker: ProgressTicker,
}

impl PlaybackController {
    /// Create a stopped controller with an empty playlist
    pub fn new(
        engine: Box<dyn RenderEngine>,
        arbiter: Box<dyn AudioPriorityArbiter>,
        settings: PlayerSettings,
    ) -> Self {
        let settings = settings.validated();
        let rng = match settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let priority = arbiter.initial_state();
        info!(
            "Creating playback controller (mode={}, priority={})",
            settings.default_mode, priority
        );

        Self {
            engine,
            arbiter,
            state: PlaybackState::Stopped,
            priority,
            mode: settings.default_mode,
            playlist: Vec::new(),
            current_index: 0,
            pending_index: 0,
            current_track: None,
            history: ShuffleHistory::new(),
            rng,
            engine_allocated: false,
            foreground: None,
            deferred: VecDeque::new(),
            load_generation: 0,
            connection_observers: ObserverRegistry::new("connection"),
            state_observers: ObserverRegistry::new("playback"),
            ticker: ProgressTicker::new(Duration::from_millis(settings.progress_interval_ms)),
            settings,
        }
    }

    /// Wire engine, arbiter and ticker to the service's event queue
    pub(crate) fn attach(&mut self, tx: &UnboundedSender<ControllerEvent>) {
        self.engine.attach(EngineEventSink::new(tx));
        self.arbiter.attach(PriorityEventSink::new(tx));
        self.ticker.attach(tx);
    }

    // === Queries ===

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn priority(&self) -> PriorityState {
        self.priority
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn has_playlist(&self) -> bool {
        !self.playlist.is_empty()
    }

    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn pending_index(&self) -> usize {
        self.pending_index
    }

    /// Track loaded in the engine, if any
    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn shuffle_history(&self) -> &ShuffleHistory {
        &self.history
    }

    pub fn foreground(&self) -> Option<&Foreground> {
        self.foreground.as_ref()
    }

    pub fn is_engine_allocated(&self) -> bool {
        self.engine_allocated
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn is_progress_armed(&self) -> bool {
        self.ticker.is_armed()
    }

    /// Generation of the pending progress tick (for driving ticks by hand)
    pub fn progress_generation(&self) -> u64 {
        self.ticker.generation()
    }

    /// Identifier of the most recent prepare handed to the engine
    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }

    /// Current state as replayed to connection observers
    pub fn snapshot(&self) -> ConnectionSnapshot {
        let loaded = self.state.has_loaded_track();
        ConnectionSnapshot {
            state: self.state,
            track: if loaded { self.current_track.clone() } else { None },
            position_ms: if loaded && self.engine_allocated {
                self.engine.current_position()
            } else {
                0
            },
            mode: self.mode,
        }
    }

    // === Command surface ===

    pub fn play(&mut self, index: Option<usize>) -> Result<()> {
        self.handle_command(Command::Play(index))
    }

    pub fn pause(&mut self) -> Result<()> {
        self.handle_command(Command::Pause)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.handle_command(Command::Stop)
    }

    pub fn next(&mut self, from_user: bool) -> Result<()> {
        self.handle_command(Command::Next { from_user })
    }

    pub fn previous(&mut self, from_user: bool) -> Result<()> {
        self.handle_command(Command::Previous { from_user })
    }

    pub fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.handle_command(Command::Seek(position_ms))
    }

    pub fn change_mode(&mut self) -> Result<()> {
        self.handle_command(Command::ChangeMode)
    }

    pub fn set_playlist(&mut self, tracks: Vec<Track>) -> Result<()> {
        self.handle_command(Command::SetPlaylist(tracks))
    }

    /// Entry point for every command; defers engine commands while Preparing
    pub fn handle_command(&mut self, command: Command) -> Result<()> {
        if self.state == PlaybackState::Preparing && command.waits_for_prepare() {
            return self.defer(command);
        }
        self.execute(command)
    }

    fn defer(&mut self, command: Command) -> Result<()> {
        let pending = self.deferred.len();
        if pending >= self.settings.max_deferred_commands {
            warn!("Rejecting '{}' while preparing: {} commands already deferred", command.name(), pending);
            return Err(Error::DeferredQueueFull(pending));
        }
        debug!("Deferring '{}' until prepare completes", command.name());
        self.deferred.push_back(command);
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        trace!("Executing '{}' in state {}", command.name(), self.state);
        match command {
            Command::Play(index) => self.process_play(index),
            Command::Pause => self.process_pause(),
            Command::Stop => self.stop_playback(false),
            Command::Next { from_user } => self.process_skip(true, from_user),
            Command::Previous { from_user } => self.process_skip(false, from_user),
            Command::Seek(position_ms) => self.process_seek(position_ms),
            Command::ChangeMode => {
                self.process_change_mode();
                Ok(())
            }
            Command::SetPlaylist(tracks) => self.process_set_playlist(tracks),
        }
    }

    fn replay_deferred(&mut self) {
        while self.state != PlaybackState::Preparing {
            let Some(command) = self.deferred.pop_front() else {
                break;
            };
            debug!("Replaying deferred '{}'", command.name());
            if let Err(e) = self.execute(command) {
                warn!("Deferred command failed: {}", e);
            }
        }
    }

    fn process_play(&mut self, index: Option<usize>) -> Result<()> {
        let len = self.playlist.len();
        if len == 0 {
            return Err(Error::EmptyPlaylist);
        }
        if let Some(index) = index {
            if index >= len {
                return Err(Error::TrackIndexOutOfRange { index, len });
            }
            self.pending_index = index;
        }

        self.request_priority();

        let target_id = self.playlist[self.pending_index].id;
        let same_track = self
            .current_track
            .as_ref()
            .map(|track| track.id == target_id)
            .unwrap_or(false);

        match self.state {
            PlaybackState::Stopped => self.load_pending(),
            PlaybackState::Playing | PlaybackState::Paused if !same_track => self.load_pending(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Playing => self.restart_current(),
            PlaybackState::Preparing => Err(Error::InvalidCommandInState {
                command: "play",
                state: self.state,
            }),
        }
    }

    /// Hand the pending track to the engine and begin the async prepare
    fn load_pending(&mut self) -> Result<()> {
        let index = self.pending_index;
        let track = self.playlist[index].clone();

        self.state = PlaybackState::Stopped;
        self.ticker.cancel();
        self.relax_resources(false);

        self.current_index = index;
        self.current_track = Some(track.clone());

        // Allocates on first use, otherwise clears the previous source
        self.engine.reset();
        self.engine_allocated = true;

        if let Err(e) = self.engine.set_source(&track.locator) {
            return self.fail_load(e);
        }
        self.engine.set_looping(self.mode == PlayMode::RepeatSingle);

        self.state = PlaybackState::Preparing;
        self.foreground = Some(Foreground::Loading(track.title.clone()));

        self.load_generation += 1;
        if let Err(e) = self.engine.prepare_async(self.load_generation) {
            return self.fail_load(e);
        }

        info!("Preparing track {} '{}' ({})", index, track.title, track.locator);
        self.state_observers
            .broadcast(&PlaybackNotification::NewSong { track });
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.state = PlaybackState::Playing;
        self.enter_foreground();
        self.configure_and_start()?;
        self.ticker.arm();
        info!("Playback state changed: paused -> playing");
        self.state_observers.broadcast(&PlaybackNotification::Played);
        Ok(())
    }

    fn restart_current(&mut self) -> Result<()> {
        self.engine.seek_to(0);
        self.configure_and_start()?;
        self.ticker.arm();
        info!("Restarting current track from the beginning");
        self.state_observers.broadcast(&PlaybackNotification::Played);
        Ok(())
    }

    fn process_pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Err(Error::InvalidCommandInState {
                command: "pause",
                state: self.state,
            });
        }

        self.state = PlaybackState::Paused;
        self.ticker.cancel();
        self.engine.pause();
        // Engine stays allocated and priority stays held
        self.relax_resources(false);

        info!("Playback state changed: playing -> paused");
        self.state_observers.broadcast(&PlaybackNotification::Paused);
        Ok(())
    }

    /// Stop and release everything; `force` also stops from Stopped
    fn stop_playback(&mut self, force: bool) -> Result<()> {
        let active = matches!(
            self.state,
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Preparing
        );
        if !active && !force {
            return Err(Error::InvalidCommandInState {
                command: "stop",
                state: self.state,
            });
        }

        let old_state = self.state;
        self.state = PlaybackState::Stopped;
        self.ticker.cancel();
        if !self.deferred.is_empty() {
            debug!("Discarding {} deferred commands", self.deferred.len());
            self.deferred.clear();
        }
        self.relax_resources(true);
        self.release_priority();

        info!("Playback state changed: {} -> stopped", old_state);
        self.state_observers.broadcast(&PlaybackNotification::Stopped);
        Ok(())
    }

    fn process_skip(&mut self, forward: bool, from_user: bool) -> Result<()> {
        let len = self.playlist.len();
        if len == 0 {
            return Err(Error::EmptyPlaylist);
        }
        if self.state == PlaybackState::Preparing {
            return Err(Error::InvalidCommandInState {
                command: if forward { "next" } else { "previous" },
                state: self.state,
            });
        }

        let resolution = if forward {
            resolve_next(self.mode, self.pending_index, len, &mut self.history, from_user, &mut self.rng)
        } else {
            resolve_previous(self.mode, self.pending_index, len, &mut self.history, from_user, &mut self.rng)
        };
        debug!(
            "Resolved {} (mode={}, from_user={}): {:?}",
            if forward { "next" } else { "previous" },
            self.mode,
            from_user,
            resolution
        );

        match resolution.effect {
            QueueEffect::Advance => {
                self.pending_index = resolution.index;
                self.process_play(None)
            }
            QueueEffect::StopAtEnd => {
                self.pending_index = resolution.index;
                info!("Reached end of playlist in sequential mode");
                if self.state.has_loaded_track() {
                    self.stop_playback(false)
                } else {
                    Ok(())
                }
            }
            QueueEffect::LoopCurrent => self.loop_current(),
        }
    }

    /// Replay the loaded track without moving the queue
    fn loop_current(&mut self) -> Result<()> {
        if self.engine_allocated {
            self.engine.set_looping(true);
        }
        match self.state {
            PlaybackState::Playing => {
                self.request_priority();
                self.restart_current()
            }
            PlaybackState::Paused => {
                self.request_priority();
                self.engine.seek_to(0);
                self.resume()
            }
            _ => self.process_play(None),
        }
    }

    fn process_seek(&mut self, position_ms: u64) -> Result<()> {
        if !self.state.has_loaded_track() {
            return Err(Error::InvalidCommandInState {
                command: "seek",
                state: self.state,
            });
        }
        debug!("Seeking to {} ms", position_ms);
        self.engine.seek_to(position_ms);
        Ok(())
    }

    fn process_change_mode(&mut self) {
        self.mode = self.mode.next();
        if self.engine_allocated {
            self.engine.set_looping(self.mode == PlayMode::RepeatSingle);
        }
        info!("Play mode changed to {}", self.mode);
        self.state_observers
            .broadcast(&PlaybackNotification::ModeChanged { mode: self.mode });
    }

    fn process_set_playlist(&mut self, tracks: Vec<Track>) -> Result<()> {
        if tracks.is_empty() {
            return Err(Error::EmptyPlaylist);
        }

        self.playlist = tracks;
        self.pending_index = 0;
        self.history.clear();
        self.current_index = self
            .current_track
            .as_ref()
            .and_then(|current| self.playlist.iter().position(|t| t.id == current.id))
            .unwrap_or(0);

        info!("Playlist replaced ({} tracks)", self.playlist.len());
        Ok(())
    }

    // === Engine callbacks ===

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Prepared { load_id } => {
                if !self.is_current_load(load_id) {
                    debug!("Ignoring stale prepared callback for load {}", load_id);
                    return;
                }
                self.on_prepared();
            }
            EngineEvent::LoadFailed { load_id, reason } => {
                if !self.is_current_load(load_id) {
                    debug!("Ignoring stale load failure for load {}: {}", load_id, reason);
                    return;
                }
                let locator = self
                    .current_track
                    .as_ref()
                    .map(|t| t.locator.clone())
                    .unwrap_or_default();
                let _ = self.fail_load(Error::SourceLoad { locator, reason });
            }
            EngineEvent::Completed => {
                if self.state != PlaybackState::Playing {
                    debug!("Ignoring completion in state {}", self.state);
                    return;
                }
                debug!("Track completed, advancing");
                if let Err(e) = self.process_skip(true, false) {
                    warn!("Advance after completion failed: {}", e);
                }
            }
            EngineEvent::Error { code, extra } => {
                error!("Render engine error: {}, extra={}", code, extra);
                let err = Error::EngineRuntime(format!("{} (extra={})", code, extra));
                self.fail(&err);
            }
        }
    }

    /// True while Preparing the load `load_id` was issued for
    fn is_current_load(&self, load_id: u64) -> bool {
        self.state == PlaybackState::Preparing && load_id == self.load_generation
    }

    fn on_prepared(&mut self) {
        self.state = PlaybackState::Playing;
        self.enter_foreground();
        if let Err(e) = self.configure_and_start() {
            error!("Engine refused to start after prepare: {}", e);
            self.fail(&e);
            return;
        }
        self.ticker.arm();

        info!("Playback state changed: preparing -> playing");
        self.state_observers.broadcast(&PlaybackNotification::Played);
        self.replay_deferred();
    }

    /// Apply priority-derived volume and (re)start, or pause without priority
    ///
    /// Leaves `state` alone: losing priority pauses the engine but the
    /// controller stays Playing so a later grant resumes by itself.
    fn configure_and_start(&mut self) -> Result<()> {
        match self.priority.volume(self.settings.duck_volume) {
            None => {
                if self.engine.is_playing() {
                    debug!("No audio priority, pausing engine");
                    self.engine.pause();
                }
                return Ok(());
            }
            Some(volume) => self.engine.set_volume(volume, volume),
        }

        if !self.engine.is_playing() {
            self.engine.start()?;
        }
        Ok(())
    }

    fn fail_load(&mut self, err: Error) -> Result<()> {
        error!("{}", err);
        self.fail(&err);
        Err(err)
    }

    /// Absorb a failure: notify, then force Stopped
    fn fail(&mut self, err: &Error) {
        self.state_observers.broadcast(&PlaybackNotification::Error {
            message: err.to_string(),
        });
        let _ = self.stop_playback(true);
    }

    // === Priority callbacks ===

    pub fn handle_priority_change(&mut self, change: PriorityChange) {
        let new_priority = match change {
            PriorityChange::Gained => PriorityState::Held,
            PriorityChange::Lost { can_duck: true } => PriorityState::NoneCanDuck,
            PriorityChange::Lost { can_duck: false } => PriorityState::NoneNoDuck,
        };
        if new_priority == self.priority {
            trace!("Audio priority already {}", new_priority);
            return;
        }

        info!("Audio priority {} -> {}", self.priority, new_priority);
        self.priority = new_priority;

        if self.state == PlaybackState::Playing {
            if let Err(e) = self.configure_and_start() {
                error!("Failed to apply audio priority change: {}", e);
                self.fail(&e);
            }
        }
    }

    fn request_priority(&mut self) {
        if self.priority != PriorityState::Held {
            let accepted = self.arbiter.request_priority();
            debug!("Requested audio priority (accepted={})", accepted);
        }
    }

    fn release_priority(&mut self) {
        if self.priority == PriorityState::Held && self.arbiter.release_priority() {
            self.priority = PriorityState::NoneNoDuck;
            debug!("Released audio priority");
        }
    }

    // === Progress ===

    pub fn handle_progress_tick(&mut self, generation: u64) {
        if !self.ticker.accept(generation) {
            trace!("Dropping stale progress tick {}", generation);
            return;
        }
        if self.state != PlaybackState::Playing {
            return;
        }
        let position_ms = self.engine.current_position();
        self.state_observers
            .broadcast(&PlaybackNotification::Progress { position_ms });
        self.ticker.arm();
    }

    // === Resources ===

    fn enter_foreground(&mut self) {
        if let Some(track) = &self.current_track {
            self.foreground = Some(Foreground::Playing(track.title.clone()));
        }
    }

    /// Drop the foreground status and, when asked, the engine itself
    fn relax_resources(&mut self, release_engine: bool) {
        self.foreground = None;
        if release_engine && self.engine_allocated {
            self.engine.reset();
            self.engine.release();
            self.engine_allocated = false;
        }
    }

    /// Force Stopped and give everything back (controller teardown)
    pub fn shutdown(&mut self) {
        info!("Shutting down playback controller");
        if self.state != PlaybackState::Stopped {
            let _ = self.stop_playback(true);
        } else {
            self.ticker.cancel();
            self.relax_resources(true);
            self.release_priority();
        }
    }

    // === Observers ===

    /// Register a connection observer and replay the current state to it
    pub fn register_connection_observer(&mut self, observer: Arc<dyn ConnectionObserver>) -> ObserverId {
        let id = self.connection_observers.register(Arc::clone(&observer));
        let snapshot = self.snapshot();
        debug!("Connection observer {} registered ({})", id, snapshot.state);
        self.connection_observers
            .notify_one(observer.as_ref(), |o| o.on_connected(&snapshot));
        id
    }

    /// Deliver the disconnect notification, then remove the observer
    pub fn unregister_connection_observer(&mut self, id: ObserverId) -> bool {
        let Some(observer) = self.connection_observers.get(id).cloned() else {
            return false;
        };
        self.connection_observers
            .notify_one(observer.as_ref(), |o| o.on_disconnected());
        self.connection_observers.unregister(id);
        debug!("Connection observer {} unregistered", id);
        true
    }

    pub fn register_state_observer(&mut self, observer: Arc<dyn PlaybackObserver>) -> ObserverId {
        self.state_observers.register(observer)
    }

    pub fn unregister_state_observer(&mut self, id: ObserverId) -> bool {
        self.state_observers.unregister(id).is_some()
    }
}
