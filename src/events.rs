//! Notifications emitted after committed subtree mutations.
//!
//! External collaborators (search indexing, exports) reconcile their own
//! copies of the path space from these events. Delivery is fire-and-forget:
//! events are emitted after the store commit, outside any failure path, and
//! a notifier must never block the mutating call.

use crate::path::Path;

/// A committed change to the shape of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// A subtree was relocated; every affected node is listed as an
    /// (old path, new path) pair.
    SubtreeMoved { moved_paths: Vec<(Path, Path)> },
    /// A subtree was duplicated; pairs map each source path to its copy.
    SubtreeCopied { copied_paths: Vec<(Path, Path)> },
    /// A subtree was deleted along with all attribute rows scoped to it.
    SubtreeDeleted { removed_paths: Vec<Path> },
}

/// Sink for tree events. Implementations hand the event to an asynchronous
/// consumer of their choosing and return immediately.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &TreeEvent);
}

/// Discards every event. The default when no collaborator is wired up.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &TreeEvent) {}
}

/// Buffers events in memory. Useful in tests and as a stand-in consumer.
#[derive(Debug, Default)]
pub struct BufferingNotifier {
    events: std::sync::Mutex<Vec<TreeEvent>>,
}

impl BufferingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns every buffered event.
    pub fn take(&self) -> Vec<TreeEvent> {
        match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }
}

impl Notifier for BufferingNotifier {
    fn notify(&self, event: &TreeEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
