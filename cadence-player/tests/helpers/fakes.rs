//! Scripted collaborators for driving the controller without real audio

use cadence_common::PriorityState;
use cadence_player::error::{Error, Result};
use cadence_player::playback::{EngineEventSink, PriorityEventSink};
use cadence_player::{AudioPriorityArbiter, RenderEngine};
use std::sync::{Arc, Mutex, MutexGuard};

/// One call made by the controller on the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Reset,
    SetSource(String),
    PrepareAsync(u64),
    Start,
    Pause,
    SeekTo(u64),
    SetVolume(f32, f32),
    SetLooping(bool),
    Release,
}

#[derive(Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    sink: Option<EngineEventSink>,
    source: Option<String>,
    prepared: bool,
    load_id: Option<u64>,
    playing: bool,
    looping: bool,
    volume: (f32, f32),
    position_ms: u64,
    failing_sources: Vec<String>,
}

/// Render engine whose prepare completes only when the test says so
///
/// `prepare_async` marks the source ready; the `Prepared` callback itself is
/// delivered by the test.
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    pub fn new() -> (Self, EngineProbe) {
        let state = Arc::new(Mutex::new(EngineState {
            volume: (1.0, 1.0),
            ..EngineState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            EngineProbe { state },
        )
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }
}

impl RenderEngine for FakeEngine {
    fn attach(&mut self, sink: EngineEventSink) {
        self.lock().sink = Some(sink);
    }

    fn reset(&mut self) {
        let mut state = self.lock();
        state.calls.push(EngineCall::Reset);
        state.source = None;
        state.prepared = false;
        state.playing = false;
        state.looping = false;
        state.position_ms = 0;
    }

    fn set_source(&mut self, locator: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(EngineCall::SetSource(locator.to_string()));
        if state.failing_sources.iter().any(|s| s == locator) {
            return Err(Error::SourceLoad {
                locator: locator.to_string(),
                reason: "unreadable".to_string(),
            });
        }
        state.source = Some(locator.to_string());
        Ok(())
    }

    fn prepare_async(&mut self, load_id: u64) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(EngineCall::PrepareAsync(load_id));
        state.prepared = state.source.is_some();
        state.load_id = Some(load_id);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.lock();
        if !state.prepared {
            return Err(Error::EngineNotPrepared);
        }
        state.calls.push(EngineCall::Start);
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        state.calls.push(EngineCall::Pause);
        state.playing = false;
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut state = self.lock();
        state.calls.push(EngineCall::SeekTo(position_ms));
        state.position_ms = position_ms;
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        let mut state = self.lock();
        state.calls.push(EngineCall::SetVolume(left, right));
        state.volume = (left, right);
    }

    fn set_looping(&mut self, looping: bool) {
        let mut state = self.lock();
        state.calls.push(EngineCall::SetLooping(looping));
        state.looping = looping;
    }

    fn is_looping(&self) -> bool {
        self.lock().looping
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn current_position(&self) -> u64 {
        self.lock().position_ms
    }

    fn release(&mut self) {
        self.lock().calls.push(EngineCall::Release);
    }
}

/// Test-side view of a [`FakeEngine`]
#[derive(Clone)]
pub struct EngineProbe {
    state: Arc<Mutex<EngineState>>,
}

impl EngineProbe {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn is_looping(&self) -> bool {
        self.lock().looping
    }

    pub fn volume(&self) -> (f32, f32) {
        self.lock().volume
    }

    pub fn source(&self) -> Option<String> {
        self.lock().source.clone()
    }

    pub fn set_position(&self, position_ms: u64) {
        self.lock().position_ms = position_ms;
    }

    /// Identifier passed to the latest `prepare_async`
    pub fn load_id(&self) -> Option<u64> {
        self.lock().load_id
    }

    /// Make `set_source` fail for `locator`
    pub fn fail_source(&self, locator: &str) {
        self.lock().failing_sources.push(locator.to_string());
    }

    /// Rendering ran off the end of the source
    pub fn finish_track(&self) {
        self.lock().playing = false;
    }

    /// Sink attached by the service, if any
    pub fn sink(&self) -> Option<EngineEventSink> {
        self.lock().sink.clone()
    }
}

struct ArbiterState {
    sink: Option<PriorityEventSink>,
    requests: usize,
    releases: usize,
    release_result: bool,
}

/// Arbiter that accepts every request and never calls back on its own
pub struct FakeArbiter {
    initial: PriorityState,
    state: Arc<Mutex<ArbiterState>>,
}

impl FakeArbiter {
    pub fn new(initial: PriorityState) -> (Self, ArbiterProbe) {
        let state = Arc::new(Mutex::new(ArbiterState {
            sink: None,
            requests: 0,
            releases: 0,
            release_result: true,
        }));
        (
            Self {
                initial,
                state: Arc::clone(&state),
            },
            ArbiterProbe { state },
        )
    }
}

impl AudioPriorityArbiter for FakeArbiter {
    fn attach(&mut self, sink: PriorityEventSink) {
        self.state.lock().unwrap().sink = Some(sink);
    }

    fn request_priority(&mut self) -> bool {
        self.state.lock().unwrap().requests += 1;
        true
    }

    fn release_priority(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.releases += 1;
        state.release_result
    }

    fn initial_state(&self) -> PriorityState {
        self.initial
    }
}

/// Test-side view of a [`FakeArbiter`]
#[derive(Clone)]
pub struct ArbiterProbe {
    state: Arc<Mutex<ArbiterState>>,
}

impl ArbiterProbe {
    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn releases(&self) -> usize {
        self.state.lock().unwrap().releases
    }

    /// What `release_priority` reports from now on
    pub fn set_release_result(&self, released: bool) {
        self.state.lock().unwrap().release_result = released;
    }

    pub fn sink(&self) -> Option<PriorityEventSink> {
        self.state.lock().unwrap().sink.clone()
    }
}
