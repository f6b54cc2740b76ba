//! Exponential backoff implementations

use std::{iter::Iterator, time::Duration};

/// Exponential backoff iterator
///
/// This struct implements the iterator trait and returns monotonically increasing values until a specified limit of iterations, specified by the `limit` field, is reached.
/// Each element in the Iterator is the previous element multiplied by the `multiplier` property.
#[derive(Debug, Clone)]
pub struct Backoff {
    retries: u32,
    limit: u32,
    multiplier: u32,
    initial: Duration,
    current: Duration,
}

impl Backoff {
    /// Creates a new instance starting at `initial` which yields at most `limit` values
    pub fn new(initial: Duration, multiplier: u32, limit: u32) -> Self {
        Self {
            retries: 0,
            limit,
            multiplier,
            initial,
            current: initial,
        }
    }

    /// Starts over from the initial delay, e.g. after an attempt succeeded
    pub fn reset(&mut self) {
        self.retries = 0;
        self.current = self.initial;
    }

    /// Number of values handed out since creation or the last reset
    pub fn attempts(&self) -> u32 {
        self.retries.min(self.limit)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(25), 2, 13)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        self.retries += 1;

        if self.retries > self.limit {
            None
        } else {
            self.current *= self.multiplier;
            Some(self.current)
        }
    }
}
