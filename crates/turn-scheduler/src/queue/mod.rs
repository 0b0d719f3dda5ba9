//! Stack-ordered action queue with undo history and guards.
//!
//! An [`ActionQueue`] runs one action at a time. Actions scheduled by the
//! running action are buffered as its children and run right after it,
//! ahead of anything that was already planned, so an action's own sub-plan
//! unwinds depth-first before its siblings.
//!
//! State lives behind a mutex shared by the queue, every [`ActionHandle`],
//! and a background driver task spawned by [`ActionQueueBuilder::build`].
//! `schedule`, `resolve` and `reject` update that state at the call site and
//! wake the driver, which awaits guards and invokes handlers.

mod driver;
mod handle;
mod snapshot;
mod state;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::action::{
    ActionArg, ActionId, ActionName, ActionRecord, Lifecycle, Rejection, Vocabulary,
};
use crate::config::QueueConfig;
use crate::error::{Result, SchedulerError};
use crate::events::QueueEvent;
use crate::guard::{FnGuard, Guard};
use crate::registry::HandlerRegistry;
use crate::sync::lock;

pub use handle::ActionHandle;
pub use snapshot::{ActionSummary, HandlerSummary, QueueSnapshot};

use state::QueueState;

/// Coarse queue state, observable through [`ActionQueue::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum QueueStatus {
    /// Nothing active, nothing planned.
    Idle,
    /// An action is planned, waiting on guards, or running.
    Busy,
}

/// State shared by the queue, its handles and the driver task.
pub(crate) struct Shared<K, A> {
    registry: HandlerRegistry<K, A>,
    guards: Vec<Box<dyn Guard<K, A>>>,
    config: QueueConfig,
    state: Mutex<QueueState<K, A>>,
    wake: Notify,
    status: watch::Sender<QueueStatus>,
    events: broadcast::Sender<QueueEvent<K, A>>,
}

impl<K: ActionName, A: ActionArg> Shared<K, A> {
    fn publish(&self, event: QueueEvent<K, A>) {
        // No subscribers is the common case
        let _ = self.events.send(event);
    }

    pub(crate) fn schedule(&self, name: K, args: Vec<A>, issuer: Option<K>) -> ActionRecord<K, A> {
        assert!(
            self.registry.vocabulary().contains(name),
            "cannot schedule unknown action `{name}`"
        );
        assert!(
            self.registry.is_bound(name),
            "cannot schedule `{name}`: no handler bound"
        );

        let record = {
            let mut state = lock(&self.state);
            let record = ActionRecord::new(ActionId(state.next_id()), name, args, issuer);
            let buffered = state.active.is_some();
            if buffered {
                state.children.push(record.clone());
            } else {
                state.plan.push_back(record.clone());
            }
            self.status.send_if_modified(|status| {
                let changed = *status != QueueStatus::Busy;
                *status = QueueStatus::Busy;
                changed
            });

            debug!(
                target: "turn_scheduler::queue",
                action = %record,
                issuer = ?issuer,
                buffered,
                "action scheduled"
            );
            self.publish(QueueEvent::Scheduled {
                action: record.clone(),
                buffered,
            });
            record
        };

        self.wake.notify_one();
        record
    }

    pub(crate) fn resolve(&self, record: &ActionRecord<K, A>) {
        record.settle(Lifecycle::Resolved);
        let undoable = self.registry.is_undoable(record.name());

        {
            let mut state = lock(&self.state);
            debug_assert!(
                state
                    .active_record()
                    .is_some_and(|active| active.id() == record.id())
            );
            state.active = None;
            state.last_finished = Some(record.clone());

            if undoable {
                let dropped = state.push_history(record.clone(), self.config.history_limit);
                if dropped > 0 {
                    debug!(
                        target: "turn_scheduler::queue",
                        dropped,
                        "history limit reached, dropped oldest entries"
                    );
                }
            } else if !state.history.is_empty() {
                let dropped = state.history.len();
                state.history.clear();
                debug!(
                    target: "turn_scheduler::queue",
                    action = %record,
                    dropped,
                    "non-undoable action cleared history"
                );
                self.publish(QueueEvent::HistoryCleared { dropped });
            }

            debug!(
                target: "turn_scheduler::queue",
                action = %record,
                undoable,
                "action resolved"
            );
            self.publish(QueueEvent::Resolved {
                action: record.clone(),
                undoable,
            });
        }

        self.wake.notify_one();
    }

    pub(crate) fn reject(&self, record: &ActionRecord<K, A>, rejection: Rejection) {
        record.settle(Lifecycle::Rejected(rejection.clone()));

        {
            let mut state = lock(&self.state);
            state.active = None;
            state.last_finished = Some(record.clone());
            let discarded: Vec<_> = state.children.drain(..).collect();

            warn!(
                target: "turn_scheduler::queue",
                action = %record,
                reason = %rejection,
                discarded = discarded.len(),
                "action rejected"
            );
            self.publish(QueueEvent::Rejected {
                action: record.clone(),
                rejection,
            });

            for child in discarded {
                child.discard();
                debug!(
                    target: "turn_scheduler::queue",
                    action = %child,
                    issuer = %record,
                    "child of rejected action discarded"
                );
                self.publish(QueueEvent::Discarded { action: child });
            }
        }

        self.wake.notify_one();
    }

    fn active_since(&self) -> Option<(ActionRecord<K, A>, Instant)> {
        lock(&self.state)
            .active
            .as_ref()
            .map(|active| (active.record.clone(), active.started))
    }

    async fn undo_last_action(&self) -> Result<ActionRecord<K, A>> {
        let record = lock(&self.state)
            .history
            .pop_back()
            .ok_or(SchedulerError::EmptyHistory)?;

        info!(
            target: "turn_scheduler::queue",
            action = %record,
            "undoing action"
        );
        if let Some(undo) = self.registry.undo(record.name()) {
            undo(record.clone()).await;
        }
        self.publish(QueueEvent::Undone {
            action: record.clone(),
        });

        Ok(record)
    }
}

/// Builder for an [`ActionQueue`].
///
/// Handlers, undo functions and guards can only be added here; the built
/// queue's handler table is sealed.
pub struct ActionQueueBuilder<K, A> {
    registry: HandlerRegistry<K, A>,
    guards: Vec<Box<dyn Guard<K, A>>>,
    config: QueueConfig,
}

impl<K: ActionName, A: ActionArg> ActionQueueBuilder<K, A> {
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the handler for `name`. See [`HandlerRegistry::set_handler`].
    pub fn handler<F>(mut self, name: K, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionHandle<K, A>) + Send + Sync + 'static,
    {
        self.registry.set_handler(name, description, handler);
        self
    }

    /// Makes `name` undoable. See [`HandlerRegistry::enable_undo`].
    pub fn undo<F, Fut>(mut self, name: K, undo: F) -> Self
    where
        F: Fn(ActionRecord<K, A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.registry.enable_undo(name, undo);
        self
    }

    /// Attaches a guard. Guards run in the order they were attached.
    pub fn guard(mut self, guard: impl Guard<K, A> + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    /// Attaches an async closure as a guard.
    pub fn guard_fn<F, Fut>(self, name: &'static str, check: F) -> Self
    where
        F: Fn(Option<ActionRecord<K, A>>, ActionRecord<K, A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.guard(FnGuard::new(name, check))
    }

    /// Seals the handler table and spawns the driver task.
    ///
    /// Declared actions without a handler are reported at warn level.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn build(self) -> ActionQueue<K, A> {
        self.registry.check_handlers();

        let (status, _) = watch::channel(QueueStatus::Idle);
        let (events, _) = broadcast::channel(self.config.event_buffer_size.max(1));
        let shared = Arc::new(Shared {
            registry: self.registry,
            guards: self.guards,
            config: self.config,
            state: Mutex::new(QueueState::new()),
            wake: Notify::new(),
            status,
            events,
        });

        info!(
            target: "turn_scheduler::queue",
            handlers = shared.registry.len(),
            guards = shared.guards.len(),
            "action queue started"
        );
        let driver = tokio::spawn(driver::run(Arc::clone(&shared)));

        ActionQueue {
            shared,
            driver: Some(driver),
        }
    }
}

/// Sequences named actions one at a time.
///
/// Dropping the queue stops its driver task; planned actions are abandoned.
/// Use [`shutdown`](Self::shutdown) to stop it and observe a driver panic.
pub struct ActionQueue<K: ActionName, A: ActionArg> {
    shared: Arc<Shared<K, A>>,
    driver: Option<JoinHandle<()>>,
}

impl<K: ActionName, A: ActionArg> ActionQueue<K, A> {
    pub fn builder(vocabulary: Vocabulary<K>) -> ActionQueueBuilder<K, A> {
        ActionQueueBuilder {
            registry: HandlerRegistry::new(vocabulary),
            guards: Vec::new(),
            config: QueueConfig::default(),
        }
    }

    /// Schedules `name` from outside any handler.
    ///
    /// Runs after everything already planned. If an action is running right
    /// now, the new one is buffered as that action's child instead.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the vocabulary or has no handler.
    pub fn schedule(&self, name: K, args: impl IntoIterator<Item = A>) -> ActionRecord<K, A> {
        self.shared.schedule(name, args.into_iter().collect(), None)
    }

    /// Pops the most recent undoable action and awaits its undo function.
    ///
    /// Does not resume or alter the plan.
    pub async fn undo_last_action(&self) -> Result<ActionRecord<K, A>> {
        self.shared.undo_last_action().await
    }

    /// Undoes actions until one named `target` is on top of history.
    ///
    /// Returns the undone actions, most recent first; empty when `target` is
    /// already on top. Fails without undoing anything if history holds no
    /// `target` action.
    pub async fn undo_until(&self, target: K) -> Result<Vec<ActionRecord<K, A>>> {
        let present = lock(&self.shared.state)
            .history
            .iter()
            .any(|record| record.name() == target);
        if !present {
            return Err(SchedulerError::NotInHistory {
                name: target.to_string(),
            });
        }

        let mut undone = Vec::new();
        loop {
            let on_top = lock(&self.shared.state)
                .history
                .back()
                .map(|record| record.name() == target);
            match on_top {
                Some(true) => break,
                Some(false) => undone.push(self.shared.undo_last_action().await?),
                // Something else undid the target concurrently
                None => {
                    return Err(SchedulerError::NotInHistory {
                        name: target.to_string(),
                    });
                }
            }
        }

        Ok(undone)
    }

    /// Resolved undoable actions, oldest first.
    pub fn history(&self) -> Vec<ActionRecord<K, A>> {
        lock(&self.shared.state).history.iter().cloned().collect()
    }

    pub fn active(&self) -> Option<ActionRecord<K, A>> {
        lock(&self.shared.state).active_record().cloned()
    }

    pub fn status(&self) -> QueueStatus {
        *self.shared.status.borrow()
    }

    /// Completes once nothing is active and nothing is planned.
    ///
    /// A handler or guard that never settles keeps this pending forever;
    /// wrap it in `tokio::time::timeout` to detect stalls.
    pub async fn wait_idle(&self) {
        let mut status = self.shared.status.subscribe();
        // The sender lives in `self.shared`, so the channel can not close here.
        let _ = status.wait_for(|status| *status == QueueStatus::Idle).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent<K, A>> {
        self.shared.events.subscribe()
    }

    pub fn registry(&self) -> &HandlerRegistry<K, A> {
        &self.shared.registry
    }

    /// Declared actions without a handler. See [`HandlerRegistry::check_handlers`].
    pub fn check_handlers(&self) -> Vec<K> {
        self.shared.registry.check_handlers()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::capture(&self.shared)
    }

    /// Human-readable dump of history, active action, children, plan and handlers.
    pub fn debug_dump(&self) -> String {
        self.snapshot().to_string()
    }

    /// Stops the driver once it reaches its next wait point.
    ///
    /// Returns an error if the driver panicked, which happens when a handler
    /// invoked by it panics.
    pub async fn shutdown(mut self) -> Result<()> {
        lock(&self.shared.state).shutdown = true;
        self.shared.wake.notify_one();

        let Some(driver) = self.driver.take() else {
            return Ok(());
        };
        driver.await.map_err(SchedulerError::DriverJoin)?;

        info!(target: "turn_scheduler::queue", "action queue stopped");
        Ok(())
    }
}

impl<K: ActionName, A: ActionArg> Drop for ActionQueue<K, A> {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            lock(&self.shared.state).shutdown = true;
            driver.abort();
        }
    }
}
