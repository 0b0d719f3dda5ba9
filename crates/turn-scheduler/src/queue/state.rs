use std::collections::VecDeque;
use std::time::Instant;

use crate::action::{ActionArg, ActionName, ActionRecord};

/// The action whose handler currently owns the queue.
pub(crate) struct Active<K, A> {
    pub record: ActionRecord<K, A>,
    pub started: Instant,
}

/// Mutable queue state, guarded by the mutex in [`Shared`](super::Shared).
pub(crate) struct QueueState<K, A> {
    next_id: u64,
    /// Actions waiting to run, head first.
    pub plan: VecDeque<ActionRecord<K, A>>,
    /// Actions scheduled while `active` was running, in scheduling order.
    pub children: Vec<ActionRecord<K, A>>,
    pub active: Option<Active<K, A>>,
    /// Last action to resolve or reject; handed to guards as `previous`.
    pub last_finished: Option<ActionRecord<K, A>>,
    /// Resolved undoable actions, most recent last.
    pub history: VecDeque<ActionRecord<K, A>>,
    pub shutdown: bool,
}

impl<K: ActionName, A: ActionArg> QueueState<K, A> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            plan: VecDeque::new(),
            children: Vec::new(),
            active: None,
            last_finished: None,
            history: VecDeque::new(),
            shutdown: false,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Moves the finished action's children ahead of everything already planned.
    ///
    /// The first child scheduled ends up at the head of the plan.
    pub fn splice_children(&mut self) -> usize {
        let count = self.children.len();
        for child in self.children.drain(..).rev() {
            self.plan.push_front(child);
        }
        count
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.plan.is_empty() && self.children.is_empty()
    }

    pub fn active_record(&self) -> Option<&ActionRecord<K, A>> {
        self.active.as_ref().map(|active| &active.record)
    }

    /// Pushes onto history, dropping the oldest entries past `limit`.
    ///
    /// Returns how many entries were dropped.
    pub fn push_history(&mut self, record: ActionRecord<K, A>, limit: Option<usize>) -> usize {
        self.history.push_back(record);
        let Some(limit) = limit else {
            return 0;
        };

        let mut dropped = 0;
        while self.history.len() > limit {
            self.history.pop_front();
            dropped += 1;
        }
        dropped
    }
}
