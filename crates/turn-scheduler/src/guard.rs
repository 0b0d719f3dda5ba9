//! Asynchronous gates consulted before every dequeue.
//!
//! Guards are the only place the queue truly waits on the outside world: a
//! renderer can attach one that resolves once the previous action's animation
//! has finished. Guards run sequentially in the order they were attached, each
//! seeing the action that just finished and the one about to start.

use async_trait::async_trait;

use crate::action::{ActionArg, ActionName, ActionRecord};

/// Gate between two consecutive actions.
///
/// A guard may delay the queue for as long as it needs, but it only ever sees
/// read-only records and can not reorder or drop planned actions.
#[async_trait]
pub trait Guard<K: ActionName, A: ActionArg>: Send + Sync {
    /// Returns a human-readable name for this guard (used in logging and debugging).
    fn name(&self) -> &'static str {
        "guard"
    }

    /// Completes when `next` may start.
    ///
    /// `previous` is the action that finished last (resolved or rejected), or
    /// `None` before the first action of the queue's life.
    async fn check(&self, previous: Option<&ActionRecord<K, A>>, next: &ActionRecord<K, A>);
}

/// Adapter turning an async closure into a [`Guard`].
///
/// The closure receives owned clones of the records.
pub struct FnGuard<F> {
    name: &'static str,
    check: F,
}

impl<F> FnGuard<F> {
    pub fn new(name: &'static str, check: F) -> Self {
        Self { name, check }
    }
}

#[async_trait]
impl<K, A, F, Fut> Guard<K, A> for FnGuard<F>
where
    K: ActionName,
    A: ActionArg,
    F: Fn(Option<ActionRecord<K, A>>, ActionRecord<K, A>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn check(&self, previous: Option<&ActionRecord<K, A>>, next: &ActionRecord<K, A>) {
        (self.check)(previous.cloned(), next.clone()).await
    }
}
