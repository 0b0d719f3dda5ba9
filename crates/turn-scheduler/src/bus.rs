//! Fan-out action bus: every handler bound to a name reacts to each call.
//!
//! Unlike the [`ActionQueue`](crate::ActionQueue), many handlers may bind to
//! one name and calls are not serialized. [`ActionBus::execute`] hands every
//! handler a [`TaskTicket`] and settles once all of them are done.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::action::{ActionArg, ActionName, Vocabulary};
use crate::error::{Result, SchedulerError};
use crate::sync::lock;
use crate::tracker::{TaskTicket, TaskTracker};

type BusHandlerFn<K, A> = Arc<dyn Fn(BusCall<K, A>, TaskTicket) + Send + Sync>;

struct BusHandler<K, A> {
    description: String,
    run: BusHandlerFn<K, A>,
}

struct UndoEntry<K> {
    name: K,
    run: Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>,
}

type UndoStack<K> = Arc<Mutex<Vec<UndoEntry<K>>>>;

/// One invocation of a bus action, shared by all of its handlers.
pub struct BusCall<K, A> {
    name: K,
    args: Arc<[A]>,
    undo: UndoStack<K>,
}

impl<K: ActionName, A: ActionArg> BusCall<K, A> {
    pub fn name(&self) -> K {
        self.name
    }

    pub fn args(&self) -> &[A] {
        &self.args
    }

    /// Pushes an entry onto the bus's global undo stack.
    pub fn push_undo<F, Fut>(&self, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        lock(&self.undo).push(UndoEntry {
            name: self.name,
            run: Box::new(move || -> BoxFuture<'static, ()> { Box::pin(undo()) }),
        });
    }
}

impl<K: Copy, A> Clone for BusCall<K, A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            args: Arc::clone(&self.args),
            undo: Arc::clone(&self.undo),
        }
    }
}

impl<K: fmt::Debug, A: fmt::Debug> fmt::Debug for BusCall<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusCall")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

/// Broadcasts named actions to every bound handler.
pub struct ActionBus<K, A> {
    vocabulary: Vocabulary<K>,
    handlers: HashMap<K, Vec<BusHandler<K, A>>>,
    undo: UndoStack<K>,
}

impl<K: ActionName, A: ActionArg> ActionBus<K, A> {
    pub fn new(vocabulary: Vocabulary<K>) -> Self {
        Self {
            vocabulary,
            handlers: HashMap::new(),
            undo: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends a handler for `name`.
    ///
    /// The handler signals completion by calling [`TaskTicket::done`], either
    /// before returning or later from another task. `description` labels the
    /// handler in logs while it is pending.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the vocabulary.
    pub fn add_handler<F>(&mut self, name: K, description: impl Into<String>, handler: F)
    where
        F: Fn(BusCall<K, A>, TaskTicket) + Send + Sync + 'static,
    {
        assert!(
            self.vocabulary.contains(name),
            "cannot bind bus handler: unknown action `{name}`"
        );

        self.handlers.entry(name).or_default().push(BusHandler {
            description: description.into(),
            run: Arc::new(handler),
        });
    }

    /// Runs every handler bound to `name` and waits until all signalled completion.
    ///
    /// Handlers are started in binding order but their completion order is
    /// unspecified. Separate calls are not serialized against each other.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NoHandlers`] if nothing is bound to `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the vocabulary.
    pub async fn execute(&self, name: K, args: impl IntoIterator<Item = A>) -> Result<()> {
        assert!(
            self.vocabulary.contains(name),
            "cannot execute unknown action `{name}`"
        );
        let handlers = self
            .handlers
            .get(&name)
            .filter(|handlers| !handlers.is_empty())
            .ok_or_else(|| SchedulerError::NoHandlers {
                name: name.to_string(),
            })?;

        let call = BusCall {
            name,
            args: args.into_iter().collect(),
            undo: Arc::clone(&self.undo),
        };
        debug!(
            target: "turn_scheduler::bus",
            action = %name,
            args = ?call.args,
            handlers = handlers.len(),
            "executing bus action"
        );

        // Track everything before running anything, so a handler finishing
        // synchronously can not complete the call early.
        let tracker = TaskTracker::new(name.to_string());
        let tickets: Vec<TaskTicket> = handlers
            .iter()
            .map(|handler| tracker.track(handler.description.clone()))
            .collect();

        for (handler, ticket) in handlers.iter().zip(tickets) {
            (handler.run)(call.clone(), ticket);
        }
        tracker.wait().await;

        debug!(target: "turn_scheduler::bus", action = %name, "bus action settled");
        Ok(())
    }

    /// Pops the global undo stack and awaits the entry.
    ///
    /// Returns `false` when there was nothing to undo.
    pub async fn undo_last_action(&self) -> bool {
        let entry = lock(&self.undo).pop();
        let Some(entry) = entry else {
            return false;
        };

        info!(target: "turn_scheduler::bus", action = %entry.name, "undoing bus action");
        (entry.run)().await;
        true
    }

    pub fn undo_depth(&self) -> usize {
        lock(&self.undo).len()
    }

    pub fn handler_count(&self, name: K) -> usize {
        self.handlers.get(&name).map_or(0, Vec::len)
    }

    /// Declared names with no handler at all, in vocabulary order.
    pub fn check_handlers(&self) -> Vec<K> {
        let missing: Vec<K> = self
            .vocabulary
            .iter()
            .filter(|name| self.handler_count(*name) == 0)
            .collect();

        for name in &missing {
            warn!(
                target: "turn_scheduler::bus",
                action = %name,
                "no bus handler bound for declared action"
            );
        }

        missing
    }
}
