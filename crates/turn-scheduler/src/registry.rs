//! Handler registry binding each action name to exactly one handler.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use crate::action::{ActionArg, ActionName, ActionRecord, Vocabulary};
use crate::queue::ActionHandle;

/// Handler invoked when an action reaches the head of the queue.
///
/// It must eventually call [`ActionHandle::resolve`] or
/// [`ActionHandle::reject`], either before returning or later from another task.
pub type Handler<K, A> = Arc<dyn Fn(ActionHandle<K, A>) + Send + Sync>;

/// Reverses the effect of a resolved action.
pub type UndoFn<K, A> = Arc<dyn Fn(ActionRecord<K, A>) -> BoxFuture<'static, ()> + Send + Sync>;

struct HandlerEntry<K, A> {
    description: String,
    handler: Handler<K, A>,
    undo: Option<UndoFn<K, A>>,
}

/// Registry of action handlers for one queue.
///
/// The vocabulary is fixed at construction. Each name may be bound once;
/// binding an unknown name or rebinding a name is a programming error.
///
/// # Design
///
/// The registry is mutable only while an [`ActionQueueBuilder`](crate::ActionQueueBuilder)
/// owns it. `build()` moves it behind an `Arc` and it is never written again.
pub struct HandlerRegistry<K, A> {
    vocabulary: Vocabulary<K>,
    entries: HashMap<K, HandlerEntry<K, A>>,
}

impl<K: ActionName, A: ActionArg> HandlerRegistry<K, A> {
    pub fn new(vocabulary: Vocabulary<K>) -> Self {
        Self {
            vocabulary,
            entries: HashMap::new(),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary<K> {
        &self.vocabulary
    }

    /// Binds the handler for `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the vocabulary or already has a handler.
    pub fn set_handler<F>(&mut self, name: K, description: impl Into<String>, handler: F)
    where
        F: Fn(ActionHandle<K, A>) + Send + Sync + 'static,
    {
        assert!(
            self.vocabulary.contains(name),
            "cannot bind handler: unknown action `{name}`"
        );
        assert!(
            !self.entries.contains_key(&name),
            "handler for `{name}` is already bound"
        );

        self.entries.insert(
            name,
            HandlerEntry {
                description: description.into(),
                handler: Arc::new(handler),
                undo: None,
            },
        );
    }

    /// Makes `name` undoable: resolved `name` actions join the undo history.
    ///
    /// # Panics
    ///
    /// Panics if `name` has no handler yet or is already undoable.
    pub fn enable_undo<F, Fut>(&mut self, name: K, undo: F)
    where
        F: Fn(ActionRecord<K, A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Some(entry) = self.entries.get_mut(&name) else {
            panic!("cannot enable undo: no handler bound for `{name}`");
        };
        assert!(entry.undo.is_none(), "undo for `{name}` is already enabled");

        entry.undo = Some(Arc::new(move |record| -> BoxFuture<'static, ()> {
            Box::pin(undo(record))
        }));
    }

    /// Declared names without a handler, in vocabulary order.
    ///
    /// Each missing name is logged at warn level. Never mutates the registry.
    pub fn check_handlers(&self) -> Vec<K> {
        let missing: Vec<K> = self
            .vocabulary
            .iter()
            .filter(|name| !self.entries.contains_key(name))
            .collect();

        for name in &missing {
            warn!(
                target: "turn_scheduler::registry",
                action = %name,
                "no handler bound for declared action"
            );
        }

        missing
    }

    pub fn is_bound(&self, name: K) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn is_undoable(&self, name: K) -> bool {
        self.entries
            .get(&name)
            .is_some_and(|entry| entry.undo.is_some())
    }

    /// Human-readable description given when the handler was bound.
    pub fn describe(&self, name: K) -> Option<&str> {
        self.entries
            .get(&name)
            .map(|entry| entry.description.as_str())
    }

    /// Bound handlers as `(name, description, undoable)`, in vocabulary order.
    pub fn handlers(&self) -> impl Iterator<Item = (K, &str, bool)> + '_ {
        self.vocabulary.iter().filter_map(|name| {
            self.entries
                .get(&name)
                .map(|entry| (name, entry.description.as_str(), entry.undo.is_some()))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn handler(&self, name: K) -> Option<Handler<K, A>> {
        self.entries
            .get(&name)
            .map(|entry| Arc::clone(&entry.handler))
    }

    pub(crate) fn undo(&self, name: K) -> Option<UndoFn<K, A>> {
        self.entries.get(&name).and_then(|entry| entry.undo.clone())
    }
}
