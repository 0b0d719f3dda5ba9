//! Dependency graph construction and tick execution.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use futures::future::{BoxFuture, try_join_all};
use tracing::debug;

use crate::{ExecutionPlan, PlannerError, Result};

/// Future returned by a task implementation.
pub type TaskFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

type TaskImpl<'a> = Box<dyn FnOnce() -> TaskFuture<'a> + Send + 'a>;

/// Arena index of the virtual root every dependency chain starts from.
const ROOT: usize = 0;

/// Handle to a task registered with a [`Planner`].
///
/// Ids are handed out in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    /// Zero-based registration index.
    pub const fn index(self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.index())
    }
}

struct TaskNode<'a> {
    run: Option<TaskImpl<'a>>,
    depth: usize,
    children: Vec<usize>,
}

impl TaskNode<'_> {
    fn root() -> Self {
        Self {
            run: None,
            depth: 0,
            children: Vec::new(),
        }
    }
}

/// Builds a resource-dependency DAG and executes it tick by tick.
///
/// # Semantics
///
/// - A new task becomes a child of the latest task that touched each of its
///   resources (or of the virtual root if none did)
/// - Its depth is one more than its deepest parent
/// - Tasks that share a resource therefore never share a tick, and the one
///   registered first always runs first
///
/// The planner is single use: [`execute`](Self::execute) consumes it.
pub struct Planner<'a, R> {
    nodes: Vec<TaskNode<'a>>,
    latest: HashMap<R, usize>,
}

impl<'a, R> Planner<'a, R>
where
    R: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            nodes: vec![TaskNode::root()],
            latest: HashMap::new(),
        }
    }

    /// Registers a task touching `resources`.
    ///
    /// A task without resources hangs directly off the virtual root.
    pub fn add_task<I, F, Fut>(&mut self, resources: I, task: F) -> TaskId
    where
        I: IntoIterator<Item = R>,
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'a,
    {
        let index = self.nodes.len();
        let mut depth = 0;

        for resource in resources {
            let parent = self.latest.get(&resource).copied().unwrap_or(ROOT);
            // Same resource listed twice
            if parent == index {
                continue;
            }

            let siblings = &mut self.nodes[parent].children;
            if !siblings.contains(&index) {
                siblings.push(index);
            }
            depth = depth.max(self.nodes[parent].depth + 1);
            self.latest.insert(resource, index);
        }

        if depth == 0 {
            self.nodes[ROOT].children.push(index);
            depth = 1;
        }

        let run: TaskImpl<'a> = Box::new(move || -> TaskFuture<'a> { Box::pin(task()) });
        self.nodes.push(TaskNode {
            run: Some(run),
            depth,
            children: Vec::new(),
        });

        let id = TaskId(index);
        debug!(target: "task_planner", task = %id, depth, "task registered");
        id
    }

    /// Longest-path distance of a task from the virtual root (at least 1).
    pub fn depth(&self, task: TaskId) -> usize {
        self.nodes[task.0].depth
    }

    /// Tasks that must wait for `task` because they share a resource with it.
    pub fn children(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes[task.0].children.iter().map(|&index| TaskId(index))
    }

    /// Depth of the deepest task, which is also the number of ticks in the plan.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assigns every task to the latest tick that does not delay its dependents.
    ///
    /// Leaves land in the final tick; every other task lands one tick before
    /// its earliest child. The number of ticks always equals [`max_depth`](Self::max_depth).
    pub fn execution_plan(&self) -> ExecutionPlan {
        let max_depth = self.max_depth();
        let mut ticks = vec![0; self.nodes.len()];

        // Children are always registered after their parents, so a reverse
        // sweep has every child's tick before it reaches the parent.
        for index in (1..self.nodes.len()).rev() {
            ticks[index] = self.nodes[index]
                .children
                .iter()
                .map(|&child| ticks[child])
                .min()
                .map_or(max_depth - 1, |earliest| earliest - 1);
        }

        let mut buckets = vec![Vec::new(); max_depth];
        for (index, &tick) in ticks.iter().enumerate().skip(1) {
            buckets[tick].push(TaskId(index));
        }

        ExecutionPlan::new(buckets)
    }

    /// Runs the plan: ticks in order, tasks within a tick concurrently.
    ///
    /// The first failing task aborts its tick and every later tick.
    pub async fn execute(mut self) -> Result<()> {
        let plan = self.execution_plan();
        debug!(
            target: "task_planner",
            tasks = self.len(),
            ticks = plan.len(),
            "executing plan"
        );

        for (tick, bucket) in plan.iter() {
            let runs = bucket.iter().filter_map(|&task| {
                let run = self.nodes[task.0].run.take()?;
                Some(async move { run().await.map_err(|error| (task, error)) })
            });

            try_join_all(runs)
                .await
                .map_err(|(task, error)| PlannerError::TaskFailed {
                    task,
                    tick,
                    source: error.into(),
                })?;
        }

        Ok(())
    }
}

impl<R> Default for Planner<'_, R>
where
    R: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Planner<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depths: Vec<usize> = self.nodes.iter().skip(1).map(|node| node.depth).collect();
        f.debug_struct("Planner")
            .field("depths", &depths)
            .field("resources", &self.latest.len())
            .finish()
    }
}
