//! Shared fixtures for queue integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use turn_scheduler::{ActionArg, ActionName, ActionQueue, ActionRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Act {
    MoveUnit,
    BuyUnit,
    ConquerHex,
    CaptureCapital,
    EndTurn,
}

/// Ordered log of what handlers and guards observed.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Hands a value (usually an action handle) from a handler to the test body.
pub struct Slot<T>(Arc<Mutex<Option<T>>>);

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub fn put(&self, value: T) {
        *self.0.lock().unwrap() = Some(value);
    }

    pub fn take(&self) -> Option<T> {
        self.0.lock().unwrap().take()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// `NAME(args)` for journal entries.
pub fn describe<K: ActionName, A: ActionArg>(record: &ActionRecord<K, A>) -> String {
    let args: Vec<String> = record.args().iter().map(|arg| format!("{arg:?}")).collect();
    format!("{}({})", record.name(), args.join(","))
}

pub async fn settle<K: ActionName, A: ActionArg>(queue: &ActionQueue<K, A>) {
    tokio::time::timeout(Duration::from_secs(1), queue.wait_idle())
        .await
        .expect("queue should become idle");
}

/// Waits until the driver has started an action and returns it.
pub async fn wait_active<K: ActionName, A: ActionArg>(
    queue: &ActionQueue<K, A>,
) -> ActionRecord<K, A> {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Some(active) = queue.active() {
                return active;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("an action should become active")
}
