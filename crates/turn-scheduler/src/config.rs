//! Queue configuration structures and loaders.
use std::env;
use std::time::Duration;

/// Tunables for an [`ActionQueue`](crate::ActionQueue).
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Capacity of the lifecycle event channel.
    pub event_buffer_size: usize,
    /// Oldest undo entries are dropped past this length. `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Warn when an action or guard has been pending this long.
    pub stall_warning_after: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 100,
            history_limit: None,
            stall_warning_after: None,
        }
    }
}

impl QueueConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `TURN_QUEUE_EVENT_BUFFER` - Event channel capacity (default: 100)
    /// - `TURN_QUEUE_HISTORY_LIMIT` - Maximum undo history length (default: unbounded)
    /// - `TURN_QUEUE_STALL_WARN_MS` - Stall warning threshold in milliseconds (default: off)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(capacity) = read_env::<usize>("TURN_QUEUE_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        config.history_limit = read_env::<usize>("TURN_QUEUE_HISTORY_LIMIT");

        config.stall_warning_after = read_env::<u64>("TURN_QUEUE_STALL_WARN_MS")
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis);

        config
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn with_stall_warning(mut self, after: Duration) -> Self {
        self.stall_warning_after = Some(after);
        self
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
