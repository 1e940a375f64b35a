//! Progress tick scheduling
//!
//! At most one tick is armed at a time. The sleeping task only holds a weak
//! sender to the controller's queue, so it quietly ends when the controller
//! has gone away. Each arm gets a new generation; the controller ignores any
//! tick whose generation is no longer current, which makes `cancel` effective
//! even for a tick already sitting in the queue.

use super::events::ControllerEvent;
use tokio::sync::mpsc::{UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::trace;

pub struct ProgressTicker {
    interval: Duration,
    /// Absent when the controller is driven directly (no event loop)
    scheduler: Option<WeakUnboundedSender<ControllerEvent>>,
    generation: u64,
    armed: bool,
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            scheduler: None,
            generation: 0,
            armed: false,
            task: None,
        }
    }

    /// Connect to the controller's event queue through a non-owning handle
    pub fn attach(&mut self, tx: &UnboundedSender<ControllerEvent>) {
        self.scheduler = Some(tx.downgrade());
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Generation of the currently armed tick
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Arm a tick unless one is already pending
    pub fn arm(&mut self) {
        if self.armed {
            return;
        }
        self.generation = self.generation.wrapping_add(1);
        self.armed = true;

        let Some(weak) = self.scheduler.clone() else {
            return;
        };
        let generation = self.generation;
        let interval = self.interval;
        self.task = Some(tokio::spawn(async move {
            sleep(interval).await;
            match weak.upgrade() {
                Some(tx) => {
                    let _ = tx.send(ControllerEvent::ProgressTick(generation));
                }
                None => trace!("Controller gone, progress tick dropped"),
            }
        }));
    }

    /// Consume a fired tick; true if it is the armed one
    pub fn accept(&mut self, generation: u64) -> bool {
        if !self.armed || generation != self.generation {
            return false;
        }
        self.armed = false;
        self.task = None;
        true
    }

    /// Drop any pending tick
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.armed {
            // Invalidate a tick that already reached the queue
            self.generation = self.generation.wrapping_add(1);
        }
        self.armed = false;
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
