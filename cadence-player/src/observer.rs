//! Observer registry
//!
//! One generic registry type serves both observer sets (connection-lifecycle
//! and playback-state). Delivery is sequential in registration order and each
//! observer call is isolated: a panicking observer is logged and skipped, the
//! rest still receive the notification.

use cadence_common::{ConnectionSnapshot, PlayMode, PlaybackNotification, Track};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display connected to the controller
///
/// `on_connected` receives the current state right after registration;
/// `on_disconnected` is delivered right before removal.
pub trait ConnectionObserver: Send + Sync {
    fn on_connected(&self, snapshot: &ConnectionSnapshot);

    fn on_disconnected(&self);
}

/// Receiver of playback-state notifications
///
/// Implementations should return quickly: calls run on the controller's
/// event loop.
pub trait PlaybackObserver: Send + Sync {
    fn on_played(&self) {}

    fn on_paused(&self) {}

    fn on_stopped(&self) {}

    fn on_new_song(&self, _track: &Track) {}

    fn on_mode_changed(&self, _mode: PlayMode) {}

    fn on_progress(&self, _position_ms: u64) {}

    /// Load or render failure; always followed by `on_stopped`
    fn on_error(&self, _message: &str) {}
}

/// Invoke the observer callback matching a notification
pub fn deliver(notification: &PlaybackNotification, observer: &dyn PlaybackObserver) {
    match notification {
        PlaybackNotification::Played => observer.on_played(),
        PlaybackNotification::Paused => observer.on_paused(),
        PlaybackNotification::Stopped => observer.on_stopped(),
        PlaybackNotification::NewSong { track } => observer.on_new_song(track),
        PlaybackNotification::ModeChanged { mode } => observer.on_mode_changed(*mode),
        PlaybackNotification::Progress { position_ms } => observer.on_progress(*position_ms),
        PlaybackNotification::Error { message } => observer.on_error(message),
    }
}

/// Set of registered observers of one kind
pub struct ObserverRegistry<O: ?Sized> {
    /// Registration order is delivery order
    entries: Vec<(ObserverId, Arc<O>)>,
    name: &'static str,
}

impl<O: ?Sized> ObserverRegistry<O> {
    /// Create an empty registry; `name` only appears in logs
    pub fn new(name: &'static str) -> Self {
        Self {
            entries: Vec::new(),
            name,
        }
    }

    pub fn register(&mut self, observer: Arc<O>) -> ObserverId {
        let id = ObserverId::new();
        self.entries.push((id, observer));
        id
    }

    /// Remove an observer, returning it if it was registered
    pub fn unregister(&mut self, id: ObserverId) -> Option<Arc<O>> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, id: ObserverId) -> Option<&Arc<O>> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, observer)| observer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call `f` on every observer in registration order
    ///
    /// Returns the number of observers whose call panicked.
    pub fn notify_all<F>(&self, f: F) -> usize
    where
        F: Fn(&O),
    {
        let mut faults = 0;
        for (id, observer) in &self.entries {
            if !notify_isolated(observer.as_ref(), &f) {
                warn!("{} observer {} panicked during notification, skipping", self.name, id);
                faults += 1;
            }
        }
        faults
    }

    /// Call `f` on a single observer with the same fault isolation
    pub fn notify_one<F>(&self, observer: &O, f: F) -> bool
    where
        F: Fn(&O),
    {
        let ok = notify_isolated(observer, &f);
        if !ok {
            warn!("{} observer panicked during notification", self.name);
        }
        ok
    }
}

fn notify_isolated<O: ?Sized, F: Fn(&O)>(observer: &O, f: &F) -> bool {
    catch_unwind(AssertUnwindSafe(|| f(observer))).is_ok()
}

impl ObserverRegistry<dyn PlaybackObserver> {
    /// Deliver a tagged notification to every playback observer
    pub fn broadcast(&self, notification: &PlaybackNotification) -> usize {
        self.notify_all(|observer| deliver(notification, observer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl PlaybackObserver for Recorder {
        fn on_played(&self) {
            self.log.lock().unwrap().push(format!("{}:played", self.label));
        }

        fn on_progress(&self, position_ms: u64) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:progress:{}", self.label, position_ms));
        }
    }

    struct Panicker;

    impl PlaybackObserver for Panicker {
        fn on_played(&self) {
            panic!("observer failure");
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ObserverRegistry<dyn PlaybackObserver> = ObserverRegistry::new("state");
        registry.register(Arc::new(Recorder { label: "a", log: log.clone() }));
        registry.register(Arc::new(Recorder { label: "b", log: log.clone() }));

        registry.broadcast(&PlaybackNotification::Progress { position_ms: 42 });

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:progress:42".to_string(), "b:progress:42".to_string()]
        );
    }

    #[test]
    fn test_panicking_observer_does_not_block_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ObserverRegistry<dyn PlaybackObserver> = ObserverRegistry::new("state");
        registry.register(Arc::new(Panicker));
        registry.register(Arc::new(Recorder { label: "after", log: log.clone() }));

        let faults = registry.broadcast(&PlaybackNotification::Played);

        assert_eq!(faults, 1);
        assert_eq!(*log.lock().unwrap(), vec!["after:played".to_string()]);
    }

    #[test]
    fn test_unregister_by_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry: ObserverRegistry<dyn PlaybackObserver> = ObserverRegistry::new("state");
        let first = registry.register(Arc::new(Recorder { label: "a", log: log.clone() }));
        let second = registry.register(Arc::new(Recorder { label: "b", log: log.clone() }));
        assert_ne!(first, second);

        assert!(registry.unregister(first).is_some());
        assert!(registry.unregister(first).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(second).is_some());

        registry.broadcast(&PlaybackNotification::Played);
        assert_eq!(*log.lock().unwrap(), vec!["b:played".to_string()]);
    }

    #[test]
    fn test_same_observer_registered_twice_gets_two_entries() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let observer: Arc<dyn PlaybackObserver> = Arc::new(Recorder { label: "x", log: log.clone() });
        let mut registry: ObserverRegistry<dyn PlaybackObserver> = ObserverRegistry::new("state");
        registry.register(observer.clone());
        registry.register(observer);

        registry.broadcast(&PlaybackNotification::Played);
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
