use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped temperature observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    /// Degrees Celsius
    pub value: f64,
}

/// Ordered history of readings, insertion order = arrival order.
///
/// Readings are never mutated, deduplicated or reordered; duplicate and
/// out-of-order timestamps are accepted as-is. Retention is a fixed-capacity
/// window: once full, each append drops the oldest reading.
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl ReadingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// History pre-populated with `seed` readings, oldest first.
    pub fn with_seed(capacity: usize, seed: impl IntoIterator<Item = Reading>) -> Self {
        let mut history = Self::new(capacity);
        for reading in seed {
            history.append(reading);
        }
        history
    }

    /// Append one reading, evicting the oldest if the window is full.
    pub fn append(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Snapshot of all readings, oldest first.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }
}
