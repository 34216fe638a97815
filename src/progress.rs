use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Counters of a single detail run. Never decrease within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounters {
    pub processed: usize,
    pub succeeded: usize,
    pub total: usize,
}

impl ProgressCounters {
    pub fn failed(&self) -> usize {
        self.processed - self.succeeded
    }
}

/// Shared between all workers of a run.
///
/// The lock only ever covers the increment itself; callers log from the returned snapshot
/// after the guard is gone.
#[derive(Debug)]
pub struct ProgressTracker {
    counters: Mutex<ProgressCounters>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        ProgressTracker {
            counters: Mutex::new(ProgressCounters {
                total,
                ..Default::default()
            }),
        }
    }

    /// Counts one finished fetch and returns the counters as they are right after it.
    pub fn record(&self, succeeded: bool) -> ProgressCounters {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.processed += 1;
        if succeeded {
            counters.succeeded += 1;
        }
        *counters
    }

    pub fn snapshot(&self) -> ProgressCounters {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
