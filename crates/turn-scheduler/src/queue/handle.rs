use std::fmt;
use std::sync::Arc;

use super::Shared;
use crate::action::{ActionArg, ActionId, ActionName, ActionRecord, Lifecycle, Rejection};

/// The running action, as seen by its handler.
///
/// A handler must eventually call exactly one of [`resolve`](Self::resolve)
/// or [`reject`](Self::reject). The handle is cheap to clone and may be moved
/// into a spawned task to settle the action later; the queue stays on this
/// action until then.
pub struct ActionHandle<K, A> {
    record: ActionRecord<K, A>,
    shared: Arc<Shared<K, A>>,
}

impl<K: ActionName, A: ActionArg> ActionHandle<K, A> {
    pub(super) fn new(record: ActionRecord<K, A>, shared: Arc<Shared<K, A>>) -> Self {
        Self { record, shared }
    }

    pub fn id(&self) -> ActionId {
        self.record.id()
    }

    pub fn name(&self) -> K {
        self.record.name()
    }

    pub fn args(&self) -> &[A] {
        self.record.args()
    }

    pub fn issuer(&self) -> Option<K> {
        self.record.issuer()
    }

    pub fn record(&self) -> &ActionRecord<K, A> {
        &self.record
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.record.lifecycle()
    }

    /// Schedules a child action issued by this one.
    ///
    /// While this action is running, children run right after it settles, in
    /// the order they were scheduled, ahead of anything planned earlier.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the vocabulary or has no handler.
    pub fn schedule(&self, name: K, args: impl IntoIterator<Item = A>) -> ActionRecord<K, A> {
        self.shared
            .schedule(name, args.into_iter().collect(), Some(self.record.name()))
    }

    /// Completes the action successfully.
    ///
    /// Undoable actions join the history; any other action clears it.
    ///
    /// # Panics
    ///
    /// Panics if the action was already resolved or rejected.
    pub fn resolve(&self) {
        self.shared.resolve(&self.record);
    }

    /// Declines the action. Children it scheduled are discarded and never run.
    ///
    /// # Panics
    ///
    /// Panics if the action was already resolved or rejected.
    pub fn reject(&self, reason: impl Into<String>) {
        self.shared.reject(&self.record, Rejection::new(reason));
    }
}

impl<K, A> Clone for ActionHandle<K, A> {
    fn clone(&self) -> Self {
        Self {
            record: self.record.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: fmt::Debug, A: fmt::Debug> fmt::Debug for ActionHandle<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionHandle").field(&self.record).finish()
    }
}
