//! Asynchronous resource load gating
//!
//! Loaders run on other threads and report through a [`LoadNotifier`]
//! (a cloneable channel sender). The renderer drains the channel at the top
//! of every update; completion marks the resource ready and forces a redraw,
//! failure closes the gate for good. Only pending resources change state;
//! reports for unexpected or already settled resources are logged and
//! dropped. Frames are skipped while any expected resource is not ready.

use std::collections::HashMap;

use crossbeam::channel::{unbounded, Receiver, Sender};

/// Message sent by a loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// The named resource is usable
    Finished(String),
    /// The named resource will never become usable
    Failed {
        /// Resource name
        resource: String,
        /// Human readable cause
        reason: String,
    },
}

/// State of one expected resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Not reported yet
    Pending,
    /// Finished loading
    Ready,
    /// Failed; the gate stays closed
    Failed(String),
}

/// Sending half handed to loader threads
#[derive(Debug, Clone)]
pub struct LoadNotifier {
    sender: Sender<LoadEvent>,
}

impl LoadNotifier {
    /// Report that `resource` finished loading
    pub fn finished(&self, resource: impl Into<String>) {
        self.send(LoadEvent::Finished(resource.into()));
    }

    /// Report that `resource` failed to load
    pub fn failed(&self, resource: impl Into<String>, reason: impl Into<String>) {
        self.send(LoadEvent::Failed {
            resource: resource.into(),
            reason: reason.into(),
        });
    }

    fn send(&self, event: LoadEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("Load gate dropped before the loader reported");
        }
    }
}

/// Events applied by one [`LoadGate::drain`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    /// Resources that became ready
    pub finished: usize,
    /// Resources that failed
    pub failed: usize,
}

/// Tracks expected resources and the events reported for them
#[derive(Debug)]
pub struct LoadGate {
    sender: Sender<LoadEvent>,
    receiver: Receiver<LoadEvent>,
    resources: HashMap<String, LoadStatus>,
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadGate {
    /// Create an open gate expecting nothing
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            resources: HashMap::new(),
        }
    }

    /// A notifier for loader threads
    pub fn notifier(&self) -> LoadNotifier {
        LoadNotifier {
            sender: self.sender.clone(),
        }
    }

    /// Register a resource that must finish before frames are rendered
    pub fn expect(&mut self, resource: impl Into<String>) {
        let resource = resource.into();
        log::debug!("Waiting for resource '{}'", resource);
        self.resources.insert(resource, LoadStatus::Pending);
    }

    /// Apply every queued event
    pub fn drain(&mut self) -> LoadProgress {
        let mut progress = LoadProgress::default();
        for event in self.receiver.try_iter() {
            match event {
                LoadEvent::Finished(resource) => match self.resources.get_mut(&resource) {
                    Some(status) if *status == LoadStatus::Pending => {
                        log::info!("Resource '{}' loaded", resource);
                        *status = LoadStatus::Ready;
                        progress.finished += 1;
                    }
                    Some(_) => log::debug!("Ignoring repeated completion of '{}'", resource),
                    None => log::warn!("Completion reported for unexpected resource '{}'", resource),
                },
                LoadEvent::Failed { resource, reason } => match self.resources.get_mut(&resource) {
                    Some(status) if *status == LoadStatus::Pending => {
                        log::warn!("Resource '{}' failed to load: {}", resource, reason);
                        *status = LoadStatus::Failed(reason);
                        progress.failed += 1;
                    }
                    Some(_) => log::debug!("Ignoring late failure of '{}': {}", resource, reason),
                    None => log::warn!("Failure reported for unexpected resource '{}': {}", resource, reason),
                },
            }
        }
        progress
    }

    /// Whether every expected resource is ready
    pub fn is_ready(&self) -> bool {
        self.resources.values().all(|status| *status == LoadStatus::Ready)
    }

    /// Whether any resource failed
    pub fn has_failed(&self) -> bool {
        self.resources
            .values()
            .any(|status| matches!(status, LoadStatus::Failed(_)))
    }

    /// Status of a resource
    pub fn status(&self, resource: &str) -> Option<&LoadStatus> {
        self.resources.get(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_gate_is_ready() {
        assert!(LoadGate::new().is_ready());
    }

    #[test]
    fn test_completion_from_another_thread_opens_gate() {
        let mut gate = LoadGate::new();
        gate.expect("volume");
        assert!(!gate.is_ready());

        let notifier = gate.notifier();
        std::thread::spawn(move || notifier.finished("volume"))
            .join()
            .unwrap();

        assert_eq!(gate.drain(), LoadProgress { finished: 1, failed: 0 });
        assert!(gate.is_ready());
        assert_eq!(gate.drain(), LoadProgress::default());
    }

    #[test]
    fn test_failure_keeps_gate_closed() {
        let mut gate = LoadGate::new();
        gate.expect("volume");
        let notifier = gate.notifier();

        notifier.failed("volume", "truncated file");
        notifier.finished("volume");
        gate.drain();

        assert!(!gate.is_ready());
        assert!(gate.has_failed());
        assert_eq!(gate.status("volume"), Some(&LoadStatus::Failed("truncated file".to_string())));
    }

    #[test]
    fn test_unexpected_failure_leaves_gate_open() {
        let mut gate = LoadGate::new();
        gate.notifier().failed("stray", "not found");

        assert_eq!(gate.drain(), LoadProgress::default());
        assert!(gate.is_ready());
        assert!(!gate.has_failed());
        assert_eq!(gate.status("stray"), None);
    }

    #[test]
    fn test_failure_after_completion_is_ignored() {
        let mut gate = LoadGate::new();
        gate.expect("volume");
        let notifier = gate.notifier();

        notifier.finished("volume");
        notifier.failed("volume", "late error");
        let progress = gate.drain();

        assert_eq!(progress, LoadProgress { finished: 1, failed: 0 });
        assert!(gate.is_ready());
        assert_eq!(gate.status("volume"), Some(&LoadStatus::Ready));
    }

    #[test]
    fn test_unexpected_completion_is_ignored() {
        let mut gate = LoadGate::new();
        gate.notifier().finished("stray");

        assert_eq!(gate.drain().finished, 0);
        assert!(gate.status("stray").is_none());
    }
}
