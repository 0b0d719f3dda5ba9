//! Error types raised while executing a plan.

use thiserror::Error;

use crate::TaskId;

/// Errors surfaced by [`Planner::execute`](crate::Planner::execute).
#[derive(Debug, Error)]
pub enum PlannerError {
    /// A task implementation failed. The remaining ticks were not started.
    #[error("{task} failed during tick {tick}")]
    TaskFailed {
        task: TaskId,
        tick: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

pub type Result<T> = std::result::Result<T, PlannerError>;
