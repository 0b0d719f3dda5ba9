//! Action scheduling and undo engine for turn-based simulations.
//!
//! This crate sequences named, parameterized actions through a single queue,
//! keeps an undo history of the reversible ones, and lets asynchronous guards
//! hold the queue between actions (for example while an animation catches up).
//!
//! Modules are organized by responsibility:
//! - [`action`] defines the action record, its lifecycle and the vocabulary of names
//! - [`registry`] binds exactly one handler (and optional undo) to each name
//! - [`guard`] provides the async gate consulted before every dequeue
//! - [`queue`] hosts the stack-ordered [`ActionQueue`] and its driver task
//! - [`bus`] is the fan-out sibling where many handlers react to one name
//! - [`tracker`] joins a dynamic set of in-flight sub-tasks
//! - [`events`] carries lifecycle notifications for observers
pub mod action;
pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod queue;
pub mod registry;
mod sync;
pub mod tracker;

pub use action::{
    ActionArg, ActionId, ActionName, ActionRecord, Lifecycle, Rejection, Vocabulary,
};
pub use bus::{ActionBus, BusCall};
pub use config::QueueConfig;
pub use error::{Result, SchedulerError};
pub use events::QueueEvent;
pub use guard::{FnGuard, Guard};
pub use queue::{
    ActionHandle, ActionQueue, ActionQueueBuilder, ActionSummary, HandlerSummary, QueueSnapshot,
    QueueStatus,
};
pub use registry::HandlerRegistry;
pub use tracker::{TaskTicket, TaskTracker};
