//! Controller event loop and its handle
//!
//! `ControllerService::spawn` moves a [`PlaybackController`] onto a tokio
//! task that owns it exclusively. User commands, engine callbacks, priority
//! callbacks and progress ticks all arrive on one unbounded queue and are
//! handled one at a time, in arrival order.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::observer::{ConnectionObserver, ObserverId, PlaybackObserver};
use crate::playback::events::{ControllerEvent, Query};
use crate::playback::PlaybackController;
use cadence_common::{PlaybackState, Track};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Owner of the controller's event loop task
pub struct ControllerService {
    handle: ControllerHandle,
    task: JoinHandle<()>,
}

impl ControllerService {
    /// Wire the controller's collaborators to a fresh queue and start the loop
    pub fn spawn(mut controller: PlaybackController) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        controller.attach(&tx);

        let task = tokio::spawn(run_event_loop(controller, rx));
        info!("Playback controller service started");

        Self {
            handle: ControllerHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Shut the controller down and wait for the loop to finish
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
        if let Err(e) = self.task.await {
            warn!("Controller task ended abnormally: {}", e);
        }
    }
}

async fn run_event_loop(
    mut controller: PlaybackController,
    mut rx: mpsc::UnboundedReceiver<ControllerEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            ControllerEvent::Command(command, reply) => {
                let name = command.name();
                let result = controller.handle_command(command);
                if let Err(e) = &result {
                    debug!("Command '{}' rejected: {}", name, e);
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            ControllerEvent::Engine(event) => controller.handle_engine_event(event),
            ControllerEvent::Priority(change) => controller.handle_priority_change(change),
            ControllerEvent::ProgressTick(generation) => controller.handle_progress_tick(generation),
            ControllerEvent::Query(query) => answer_query(&mut controller, query),
            ControllerEvent::Shutdown(reply) => {
                controller.shutdown();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                break;
            }
        }
    }

    // Every handle dropped without an explicit shutdown
    if controller.state() != PlaybackState::Stopped || controller.is_engine_allocated() {
        controller.shutdown();
    }
    info!("Playback controller event loop stopped");
}

fn answer_query(controller: &mut PlaybackController, query: Query) {
    match query {
        Query::State(reply) => {
            let _ = reply.send(controller.state());
        }
        Query::CurrentTrack(reply) => {
            let _ = reply.send(controller.current_track().cloned());
        }
        Query::RegisterConnection(observer, reply) => {
            let _ = reply.send(controller.register_connection_observer(observer));
        }
        Query::UnregisterConnection(id, reply) => {
            let _ = reply.send(controller.unregister_connection_observer(id));
        }
        Query::RegisterState(observer, reply) => {
            let _ = reply.send(controller.register_state_observer(observer));
        }
        Query::UnregisterState(id, reply) => {
            let _ = reply.send(controller.unregister_state_observer(id));
        }
    }
}

/// Cloneable async front end to a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl ControllerHandle {
    /// Send a command and wait for it to be accepted or rejected
    pub async fn send(&self, command: Command) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerEvent::Command(command, Some(reply_tx)))
            .map_err(|_| Error::ControllerClosed)?;
        reply_rx.await.map_err(|_| Error::ControllerClosed)?
    }

    /// Queue a command without waiting for its outcome
    pub fn dispatch(&self, command: Command) -> Result<()> {
        self.tx
            .send(ControllerEvent::Command(command, None))
            .map_err(|_| Error::ControllerClosed)
    }

    pub async fn play(&self, index: Option<usize>) -> Result<()> {
        self.send(Command::Play(index)).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    pub async fn next(&self, from_user: bool) -> Result<()> {
        self.send(Command::Next { from_user }).await
    }

    pub async fn previous(&self, from_user: bool) -> Result<()> {
        self.send(Command::Previous { from_user }).await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.send(Command::Seek(position_ms)).await
    }

    pub async fn change_mode(&self) -> Result<()> {
        self.send(Command::ChangeMode).await
    }

    pub async fn set_playlist(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(Command::SetPlaylist(tracks)).await
    }

    pub async fn get_state(&self) -> Result<PlaybackState> {
        self.query(Query::State).await
    }

    pub async fn current_track(&self) -> Result<Option<Track>> {
        self.query(Query::CurrentTrack).await
    }

    pub async fn register_connection_observer(
        &self,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<ObserverId> {
        self.query(|reply| Query::RegisterConnection(observer, reply)).await
    }

    pub async fn unregister_connection_observer(&self, id: ObserverId) -> Result<bool> {
        self.query(|reply| Query::UnregisterConnection(id, reply)).await
    }

    pub async fn register_state_observer(&self, observer: Arc<dyn PlaybackObserver>) -> Result<ObserverId> {
        self.query(|reply| Query::RegisterState(observer, reply)).await
    }

    pub async fn unregister_state_observer(&self, id: ObserverId) -> Result<bool> {
        self.query(|reply| Query::UnregisterState(id, reply)).await
    }

    /// Stop playback, release resources and end the event loop
    ///
    /// Returns once the controller has shut down, or immediately if it
    /// already has.
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(ControllerEvent::Shutdown(Some(reply_tx))).is_ok() {
            let _ = reply_rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Query) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerEvent::Query(make(reply_tx)))
            .map_err(|_| Error::ControllerClosed)?;
        reply_rx.await.map_err(|_| Error::ControllerClosed)
    }
}
