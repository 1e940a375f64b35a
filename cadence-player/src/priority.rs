//! Audio priority arbitration
//!
//! Wraps the platform mechanism that decides which application may produce
//! sound. Requests are fire-and-forget: `request_priority` returning true only
//! means the platform accepted the request. Grants and revocations arrive
//! later through the [`PriorityEventSink`] and are what actually change the
//! controller's `PriorityState`.

use crate::playback::events::PriorityEventSink;
use cadence_common::PriorityState;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Platform audio priority mechanism as seen by the controller
pub trait AudioPriorityArbiter: Send {
    /// Receive the callback sink (called once by the service)
    fn attach(&mut self, sink: PriorityEventSink);

    /// Ask for exclusive priority; true if the request was accepted
    fn request_priority(&mut self) -> bool;

    /// Give priority back; true if the release was accepted
    fn release_priority(&mut self) -> bool;

    /// Priority state to assume before any callback arrives
    fn initial_state(&self) -> PriorityState {
        PriorityState::NoneNoDuck
    }
}

/// Arbiter for platforms without priority arbitration
///
/// Priority is permanently held: requests and releases are accepted by
/// nobody and no callbacks are ever delivered.
#[derive(Debug, Default)]
pub struct NoopArbiter;

impl AudioPriorityArbiter for NoopArbiter {
    fn attach(&mut self, _sink: PriorityEventSink) {}

    fn request_priority(&mut self) -> bool {
        false
    }

    fn release_priority(&mut self) -> bool {
        false
    }

    fn initial_state(&self) -> PriorityState {
        PriorityState::Held
    }
}

/// Platform side of the adapter: the raw request/abandon calls
pub trait PriorityPlatform: Send {
    fn request(&mut self) -> bool;

    fn abandon(&mut self) -> bool;
}

/// Adapter connecting a [`PriorityPlatform`] to the controller
///
/// The platform reports focus changes through the [`ArbiterCallbacks`]
/// handle obtained from [`PlatformArbiter::callbacks`], which forwards them
/// into the controller's queue once the service has attached its sink.
pub struct PlatformArbiter<P: PriorityPlatform> {
    platform: P,
    sink: Arc<Mutex<Option<PriorityEventSink>>>,
}

impl<P: PriorityPlatform> PlatformArbiter<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            sink: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for the platform's focus-change listener
    pub fn callbacks(&self) -> ArbiterCallbacks {
        ArbiterCallbacks {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<P: PriorityPlatform> AudioPriorityArbiter for PlatformArbiter<P> {
    fn attach(&mut self, sink: PriorityEventSink) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = Some(sink);
        }
    }

    fn request_priority(&mut self) -> bool {
        let accepted = self.platform.request();
        debug!("Audio priority request accepted={}", accepted);
        accepted
    }

    fn release_priority(&mut self) -> bool {
        let released = self.platform.abandon();
        debug!("Audio priority release accepted={}", released);
        released
    }
}

/// Cloneable handle through which the platform reports focus changes
#[derive(Clone)]
pub struct ArbiterCallbacks {
    sink: Arc<Mutex<Option<PriorityEventSink>>>,
}

impl ArbiterCallbacks {
    /// Priority granted; false if no controller is listening
    pub fn gained(&self) -> bool {
        self.with_sink(|sink| sink.gained())
    }

    /// Priority lost; `can_duck` allows playing on at reduced volume
    pub fn lost(&self, can_duck: bool) -> bool {
        self.with_sink(|sink| sink.lost(can_duck))
    }

    fn with_sink(&self, f: impl FnOnce(&PriorityEventSink) -> bool) -> bool {
        match self.sink.lock() {
            Ok(slot) => slot.as_ref().map(f).unwrap_or(false),
            Err(_) => false,
        }
    }
}
