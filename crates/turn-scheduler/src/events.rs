//! Lifecycle notifications published by the action queue.
//!
//! Observers (persistence, replays, on-screen inspectors) subscribe through
//! [`ActionQueue::subscribe`](crate::ActionQueue::subscribe). Publishing is
//! best effort: having no subscribers is normal, and a lagging subscriber
//! misses events rather than slowing the queue down.

use crate::action::{ActionRecord, Rejection};

#[derive(Clone, Debug)]
pub enum QueueEvent<K, A> {
    /// Accepted by `schedule`. `buffered` is true when it was queued as a
    /// child of the running action instead of appended to the plan.
    Scheduled {
        action: ActionRecord<K, A>,
        buffered: bool,
    },
    /// Dequeued after every guard settled; its handler is about to run.
    Started { action: ActionRecord<K, A> },
    Resolved {
        action: ActionRecord<K, A>,
        undoable: bool,
    },
    Rejected {
        action: ActionRecord<K, A>,
        rejection: Rejection,
    },
    /// Child of a rejected action; it will never run.
    Discarded { action: ActionRecord<K, A> },
    Undone { action: ActionRecord<K, A> },
    /// A non-undoable action resolved and wiped `dropped` history entries.
    HistoryCleared { dropped: usize },
    /// Nothing active and nothing planned.
    Idle,
}
