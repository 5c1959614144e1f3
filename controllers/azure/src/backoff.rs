//! # Fibonacci Backoff
//!
//! Failed reconciles are requeued on a Fibonacci schedule counted in minutes:
//! 1m, 1m, 2m, 3m, 5m, 8m, then 10m for every further failure. The schedule
//! is tracked per resource and starts over after a successful reconcile.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Fibonacci backoff over whole minutes, capped at a maximum
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Backoff starting at `min_minutes` and never exceeding `max_minutes`
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Current delay, advancing the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_minutes * 60);
        let next = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next.min(self.max_minutes);
        delay
    }

    /// Start the sequence over
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// Entries untouched this long belong to resources that are gone
const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Per-resource backoff state, keyed by `kind/namespace/name`
///
/// An entry is dropped on success, when its resource is released, or once it
/// has been idle for longer than any backoff could last.
#[derive(Debug)]
pub struct ResourceBackoffs {
    states: Mutex<HashMap<String, (FibonacciBackoff, Instant)>>,
    stale_after: Duration,
}

impl Default for ResourceBackoffs {
    fn default() -> Self {
        Self::with_stale_after(STALE_AFTER)
    }
}

impl ResourceBackoffs {
    pub(crate) fn with_stale_after(stale_after: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            stale_after,
        }
    }

    /// Delay before retrying `key` after another failure
    pub fn next_delay(&self, key: &str) -> Duration {
        match self.states.lock() {
            Ok(mut states) => {
                let now = Instant::now();
                states.retain(|k, (_, last)| k == key || now.duration_since(*last) < self.stale_after);
                let (backoff, last) = states
                    .entry(key.to_string())
                    .or_insert_with(|| (FibonacciBackoff::default(), now));
                *last = now;
                backoff.next_backoff()
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                Duration::from_secs(60)
            }
        }
    }

    /// Forget the failures of `key`
    pub fn reset(&self, key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(key);
        }
    }

    /// Number of resources currently backing off
    pub fn len(&self) -> usize {
        self.states.lock().map_or(0, |states| states.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(backoff: &mut FibonacciBackoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| backoff.next_backoff().as_secs() / 60).collect()
    }

    #[test]
    fn test_sequence_caps_at_ten_minutes() {
        let mut backoff = FibonacciBackoff::default();
        assert_eq!(minutes(&mut backoff, 9), vec![1, 1, 2, 3, 5, 8, 10, 10, 10]);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = FibonacciBackoff::default();
        minutes(&mut backoff, 4);
        backoff.reset();
        assert_eq!(minutes(&mut backoff, 3), vec![1, 1, 2]);
    }

    #[test]
    fn test_resource_backoffs_are_independent() {
        let backoffs = ResourceBackoffs::default();
        assert_eq!(backoffs.next_delay("Redis/default/a"), Duration::from_secs(60));
        assert_eq!(backoffs.next_delay("Redis/default/a"), Duration::from_secs(60));
        assert_eq!(backoffs.next_delay("Redis/default/a"), Duration::from_secs(120));
        assert_eq!(backoffs.next_delay("Redis/default/b"), Duration::from_secs(60));

        backoffs.reset("Redis/default/a");
        assert_eq!(backoffs.next_delay("Redis/default/a"), Duration::from_secs(60));
    }

    #[test]
    fn test_idle_entries_are_dropped() {
        let backoffs = ResourceBackoffs::with_stale_after(Duration::ZERO);
        backoffs.next_delay("Redis/default/gone");
        backoffs.next_delay("Redis/default/gone");
        assert_eq!(backoffs.len(), 1);

        backoffs.next_delay("Redis/default/other");
        assert_eq!(backoffs.len(), 1);

        let backoffs = ResourceBackoffs::default();
        backoffs.next_delay("Redis/default/a");
        backoffs.next_delay("Redis/default/b");
        assert_eq!(backoffs.len(), 2);
        backoffs.reset("Redis/default/a");
        assert_eq!(backoffs.len(), 1);
    }
}
