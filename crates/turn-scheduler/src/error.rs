//! Recoverable errors surfaced by the scheduler API.
//!
//! Contract violations (double resolution, unknown action names, duplicate
//! handlers) are not represented here: they panic at the call site.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("undo history is empty")]
    EmptyHistory,

    #[error("no `{name}` action in undo history")]
    NotInHistory { name: String },

    #[error("no handlers bound to `{name}`")]
    NoHandlers { name: String },

    #[error("action queue driver failed")]
    DriverJoin(#[source] tokio::task::JoinError),
}
