//! Wait-group for a dynamic set of in-flight sub-tasks.
//!
//! A [`TaskTracker`] hands out one [`TaskTicket`] per sub-task. Once every
//! outstanding ticket has been marked done, completion callbacks fire and
//! [`TaskTracker::wait`] returns. Tickets may be added while others are still
//! in flight; completion fires each time the outstanding set drains.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{trace, warn};

use crate::sync::lock;

type CompletionCallback = Box<dyn FnOnce() + Send>;

struct TrackerInner {
    name: String,
    next_id: AtomicU64,
    pending: Mutex<BTreeMap<u64, String>>,
    callbacks: Mutex<Vec<CompletionCallback>>,
    remaining: watch::Sender<usize>,
}

impl TrackerInner {
    fn finish(&self, id: u64) {
        // Publish under the lock so concurrent finishes can not reorder counts
        let (label, remaining) = {
            let mut pending = lock(&self.pending);
            let label = pending.remove(&id);
            if label.is_some() {
                self.remaining.send_replace(pending.len());
            }
            (label, pending.len())
        };
        let Some(label) = label else {
            return;
        };

        trace!(
            target: "turn_scheduler::tracker",
            tracker = %self.name,
            task = %label,
            remaining,
            "task finished"
        );

        if remaining == 0 {
            let callbacks = std::mem::take(&mut *lock(&self.callbacks));
            for callback in callbacks {
                callback();
            }
        }
    }
}

/// Tracks in-flight sub-tasks of one logical operation.
///
/// Cloning yields another handle to the same tracker.
#[derive(Clone)]
pub struct TaskTracker {
    inner: Arc<TrackerInner>,
}

impl TaskTracker {
    pub fn new(name: impl Into<String>) -> Self {
        let (remaining, _) = watch::channel(0);
        Self {
            inner: Arc::new(TrackerInner {
                name: name.into(),
                next_id: AtomicU64::new(0),
                pending: Mutex::new(BTreeMap::new()),
                callbacks: Mutex::new(Vec::new()),
                remaining,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registers a sub-task and returns the ticket that completes it.
    pub fn track(&self, label: impl Into<String>) -> TaskTicket {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let label = label.into();
        {
            let mut pending = lock(&self.inner.pending);
            pending.insert(id, label.clone());
            self.inner.remaining.send_replace(pending.len());
        }

        TaskTicket {
            id,
            label,
            tracker: Some(Arc::clone(&self.inner)),
        }
    }

    /// Runs `callback` once nothing is outstanding; immediately if that is already the case.
    pub fn on_complete(&self, callback: impl FnOnce() + Send + 'static) {
        // Hold the pending lock so a concurrent `finish` can not drain the
        // callbacks between the check and the push.
        let pending = lock(&self.inner.pending);
        if pending.is_empty() {
            drop(pending);
            callback();
        } else {
            lock(&self.inner.callbacks).push(Box::new(callback));
        }
    }

    /// Completes once every tracked sub-task is done.
    pub async fn wait(&self) {
        let mut remaining = self.inner.remaining.subscribe();
        // The sender lives in `self`, so the channel can not close here.
        let _ = remaining.wait_for(|count| *count == 0).await;
    }

    pub fn pending(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Labels of the sub-tasks still in flight, in tracking order.
    pub fn pending_labels(&self) -> Vec<String> {
        lock(&self.inner.pending).values().cloned().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }
}

impl fmt::Debug for TaskTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTracker")
            .field("name", &self.inner.name)
            .field("pending", &self.pending_labels())
            .finish()
    }
}

/// Completion token for one tracked sub-task.
///
/// Dropping a ticket without calling [`done`](Self::done) still completes it,
/// with a warning.
pub struct TaskTicket {
    id: u64,
    label: String,
    tracker: Option<Arc<TrackerInner>>,
}

impl TaskTicket {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Marks the sub-task as finished.
    pub fn done(mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.finish(self.id);
        }
    }
}

impl Drop for TaskTicket {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            warn!(
                target: "turn_scheduler::tracker",
                tracker = %tracker.name,
                task = %self.label,
                "task ticket dropped without completion"
            );
            tracker.finish(self.id);
        }
    }
}

impl fmt::Debug for TaskTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTicket")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}
