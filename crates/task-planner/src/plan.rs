//! Tick buckets produced by the planner.

use std::fmt;

use crate::TaskId;

/// Ordered tick buckets. Tasks sharing a bucket may run concurrently.
///
/// Within a bucket tasks are listed in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    ticks: Vec<Vec<TaskId>>,
}

impl ExecutionPlan {
    pub(crate) fn new(ticks: Vec<Vec<TaskId>>) -> Self {
        Self { ticks }
    }

    /// Returns the tick buckets in execution order.
    pub fn ticks(&self) -> &[Vec<TaskId>] {
        &self.ticks
    }

    /// Returns the tick a task was assigned to, if it is part of this plan.
    pub fn tick_of(&self, task: TaskId) -> Option<usize> {
        self.ticks.iter().position(|bucket| bucket.contains(&task))
    }

    /// Number of ticks.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Iterates over `(tick, bucket)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[TaskId])> + '_ {
        self.ticks
            .iter()
            .enumerate()
            .map(|(tick, bucket)| (tick, bucket.as_slice()))
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (tick, bucket) in self.iter() {
            let names: Vec<String> = bucket.iter().map(ToString::to_string).collect();
            writeln!(f, "tick {}: [{}]", tick, names.join(", "))?;
        }
        Ok(())
    }
}
