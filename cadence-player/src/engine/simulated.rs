//! Timer-driven stand-in for a real render engine
//!
//! Used by the demo binary: "prepares" a source after a fixed delay and
//! reports completion once the configured track length has elapsed.
//! Must be driven from inside a tokio runtime.

use super::RenderEngine;
use crate::error::{Error, Result};
use crate::playback::events::EngineEventSink;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, trace, warn};

/// Simulated engine with a fixed prepare delay and track length
pub struct SimulatedEngine {
    sink: Option<EngineEventSink>,
    prepare_delay: Duration,
    track_length_ms: u64,
    /// Report `LoadFailed` for locators that are not existing files
    check_files: bool,

    source: Option<String>,
    /// Set by the prepare task just before it reports `Prepared`
    prepared: Arc<AtomicBool>,
    looping: bool,
    volume: (f32, f32),

    /// Position accumulated before the current run
    base_position_ms: u64,
    /// Set while rendering
    started_at: Option<Instant>,

    prepare_task: Option<JoinHandle<()>>,
    completion_task: Option<JoinHandle<()>>,
}

impl SimulatedEngine {
    pub fn new(prepare_delay: Duration, track_length_ms: u64) -> Self {
        Self {
            sink: None,
            prepare_delay,
            track_length_ms,
            check_files: false,
            source: None,
            prepared: Arc::new(AtomicBool::new(false)),
            looping: false,
            volume: (1.0, 1.0),
            base_position_ms: 0,
            started_at: None,
            prepare_task: None,
            completion_task: None,
        }
    }

    /// Fail the prepare of locators that do not exist on disk
    pub fn with_file_check(mut self, check_files: bool) -> Self {
        self.check_files = check_files;
        self
    }

    /// Current output volume
    pub fn volume(&self) -> (f32, f32) {
        self.volume
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.prepare_task.take() {
            task.abort();
        }
        self.abort_completion();
    }

    fn abort_completion(&mut self) {
        if let Some(task) = self.completion_task.take() {
            task.abort();
        }
    }

    fn position_now(&self) -> u64 {
        let running = self
            .started_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        (self.base_position_ms + running).min(self.track_length_ms)
    }

    fn schedule_completion(&mut self) {
        self.abort_completion();
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let remaining = self.track_length_ms.saturating_sub(self.base_position_ms);
        self.completion_task = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(remaining)).await;
            sink.completed();
        }));
    }
}

impl RenderEngine for SimulatedEngine {
    fn attach(&mut self, sink: EngineEventSink) {
        self.sink = Some(sink);
    }

    fn reset(&mut self) {
        self.abort_tasks();
        self.source = None;
        self.prepared.store(false, Ordering::SeqCst);
        self.looping = false;
        self.base_position_ms = 0;
        self.started_at = None;
    }

    fn set_source(&mut self, locator: &str) -> Result<()> {
        if locator.trim().is_empty() {
            return Err(Error::SourceLoad {
                locator: locator.to_string(),
                reason: "empty locator".to_string(),
            });
        }
        self.source = Some(locator.to_string());
        Ok(())
    }

    fn prepare_async(&mut self, load_id: u64) -> Result<()> {
        let locator = self.source.clone().ok_or_else(|| Error::SourceLoad {
            locator: String::new(),
            reason: "no source set".to_string(),
        })?;
        let Some(sink) = self.sink.clone() else {
            warn!("Simulated engine has no event sink, prepare will never complete");
            return Ok(());
        };

        let missing = self.check_files && !Path::new(&locator).exists();
        let delay = self.prepare_delay;
        let prepared = Arc::clone(&self.prepared);
        debug!("Simulated prepare {} of {} ({:?})", load_id, locator, delay);
        self.prepare_task = Some(tokio::spawn(async move {
            sleep(delay).await;
            if missing {
                sink.load_failed(load_id, format!("{} does not exist", locator));
            } else {
                prepared.store(true, Ordering::SeqCst);
                sink.prepared(load_id);
            }
        }));
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if !self.prepared.load(Ordering::SeqCst) {
            return Err(Error::EngineNotPrepared);
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
            if !self.looping {
                self.schedule_completion();
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.base_position_ms = self.position_now();
        self.started_at = None;
        self.abort_completion();
    }

    fn seek_to(&mut self, position_ms: u64) {
        self.base_position_ms = position_ms.min(self.track_length_ms);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
            if !self.looping {
                self.schedule_completion();
            }
        }
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        trace!("Simulated volume {:.2}/{:.2}", left, right);
        self.volume = (left, right);
    }

    fn set_looping(&mut self, looping: bool) {
        if self.started_at.is_some() {
            self.base_position_ms = self.current_position();
            self.started_at = Some(Instant::now());
        }
        self.looping = looping;
        if looping {
            self.abort_completion();
        } else if self.started_at.is_some() {
            self.schedule_completion();
        }
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    fn current_position(&self) -> u64 {
        if self.looping && self.track_length_ms > 0 {
            let running = self
                .started_at
                .map(|at| at.elapsed().as_millis() as u64)
                .unwrap_or(0);
            return (self.base_position_ms + running) % self.track_length_ms;
        }
        self.position_now()
    }

    fn release(&mut self) {
        self.reset();
        self.volume = (1.0, 1.0);
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
