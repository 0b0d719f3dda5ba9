//! Background task that advances the queue.
//!
//! The driver is the only place guards are awaited and handlers invoked.
//! Handlers that resolve synchronously just wake it again, so long chains of
//! actions never recurse on the stack.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::state::{Active, QueueState};
use super::{ActionHandle, QueueStatus, Shared};
use crate::action::{ActionArg, ActionName};
use crate::events::QueueEvent;
use crate::sync::lock;

/// Main driver loop.
pub(super) async fn run<K: ActionName, A: ActionArg>(shared: Arc<Shared<K, A>>) {
    loop {
        advance(&shared).await;
        if lock(&shared.state).shutdown {
            break;
        }
        wait_for_wake(&shared).await;
    }

    debug!(target: "turn_scheduler::queue", "driver stopped");
}

/// Starts planned actions until one is left running or the plan is empty.
async fn advance<K: ActionName, A: ActionArg>(shared: &Arc<Shared<K, A>>) {
    loop {
        let (previous, next) = {
            let mut state = lock(&shared.state);
            if state.shutdown || state.active.is_some() {
                return;
            }

            let spliced = state.splice_children();
            if spliced > 0 {
                trace!(
                    target: "turn_scheduler::queue",
                    spliced,
                    planned = state.plan.len(),
                    "children moved ahead of plan"
                );
            }

            match state.plan.front() {
                Some(next) => (state.last_finished.clone(), next.clone()),
                None => {
                    mark_idle(shared, &state);
                    return;
                }
            }
        };

        for guard in &shared.guards {
            let check = guard.check(previous.as_ref(), &next);
            with_stall_warning(shared.config.stall_warning_after, check, |elapsed| {
                warn!(
                    target: "turn_scheduler::queue",
                    guard = guard.name(),
                    action = %next,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "guard has not settled"
                );
            })
            .await;
        }

        let (record, handler) = {
            let mut state = lock(&shared.state);
            if state.shutdown {
                return;
            }
            // Only the driver pops, and nothing is buffered while no action is active
            let Some(record) = state.plan.pop_front() else {
                return;
            };
            debug_assert_eq!(record.id(), next.id());

            record.start();
            state.active = Some(Active {
                record: record.clone(),
                started: Instant::now(),
            });

            debug!(
                target: "turn_scheduler::queue",
                action = %record,
                remaining = state.plan.len(),
                "action started"
            );
            shared.publish(QueueEvent::Started {
                action: record.clone(),
            });
            (record.clone(), shared.registry.handler(record.name()))
        };

        let Some(handler) = handler else {
            panic!("no handler bound for `{}`", record.name());
        };
        handler(ActionHandle::new(record, Arc::clone(shared)));
    }
}

fn mark_idle<K: ActionName, A: ActionArg>(shared: &Shared<K, A>, state: &QueueState<K, A>) {
    if !state.is_idle() {
        return;
    }

    let changed = shared.status.send_if_modified(|status| {
        let changed = *status != QueueStatus::Idle;
        *status = QueueStatus::Idle;
        changed
    });
    if changed {
        debug!(target: "turn_scheduler::queue", "queue idle");
        shared.publish(QueueEvent::Idle);
    }
}

async fn wait_for_wake<K: ActionName, A: ActionArg>(shared: &Shared<K, A>) {
    let stall = shared.config.stall_warning_after;
    match (shared.active_since(), stall) {
        (Some((record, started)), Some(after)) => {
            if tokio::time::timeout(after, shared.wake.notified())
                .await
                .is_err()
            {
                warn!(
                    target: "turn_scheduler::queue",
                    action = %record,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "action has not settled"
                );
            }
        }
        _ => shared.wake.notified().await,
    }
}

/// Awaits `fut`, calling `on_stall` with the elapsed time every `after` it stays pending.
///
/// Never cancels `fut`.
pub(crate) async fn with_stall_warning<F>(
    after: Option<Duration>,
    fut: F,
    mut on_stall: impl FnMut(Duration),
) -> F::Output
where
    F: Future,
{
    let Some(after) = after else {
        return fut.await;
    };

    tokio::pin!(fut);
    let started = Instant::now();
    loop {
        match tokio::time::timeout(after, &mut fut).await {
            Ok(output) => return output,
            Err(_) => on_stall(started.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stall_warning_fires_until_future_settles() {
        let mut stalls = Vec::new();

        let value = with_stall_warning(
            Some(Duration::from_millis(100)),
            async {
                tokio::time::sleep(Duration::from_millis(350)).await;
                7
            },
            |elapsed| stalls.push(elapsed.as_millis()),
        )
        .await;

        assert_eq!(value, 7);
        assert_eq!(stalls.len(), 3);
    }

    #[tokio::test]
    async fn no_threshold_means_plain_await() {
        let mut stalls = 0;
        let value = with_stall_warning(None, async { "done" }, |_| stalls += 1).await;

        assert_eq!(value, "done");
        assert_eq!(stalls, 0);
    }
}
