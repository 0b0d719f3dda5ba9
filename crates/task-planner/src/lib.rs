//! Resource-dependency task planner.
//!
//! Callers register tasks together with the resources each one touches. A task
//! depends on the most recently registered task that touched any of the same
//! resources, which yields a DAG hanging off a virtual root. The planner then
//! buckets tasks into ticks:
//!
//! - **Barrier ticks**: a tick is a barrier, every task in it finishes before the next tick starts
//! - **Latest possible**: a task runs in the last tick that still leaves room for its dependents
//! - **Opaque resources**: identities are only compared, never dereferenced
//!
//! # Architecture
//!
//! - [`Planner`]: arena of tasks plus the "latest user per resource" map
//! - [`ExecutionPlan`]: tick buckets produced by [`Planner::execution_plan`]
//! - [`PlannerError`]: failure of a task while executing a plan

mod error;
mod plan;
mod planner;

pub use error::{PlannerError, Result};
pub use plan::ExecutionPlan;
pub use planner::{Planner, TaskFuture, TaskId};
