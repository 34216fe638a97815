use std::collections::BTreeMap;

use crate::model::{ErrorKind, FetchResult};

/// Results split by outcome. Borrows from the result set it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<'a> {
    pub successes: Vec<&'a FetchResult>,
    pub failures: Vec<&'a FetchResult>,
    pub error_histogram: BTreeMap<ErrorKind, usize>,
}

/// Partitions `results` by their variant and counts failures per [`ErrorKind`].
/// Order within each side follows `results`.
pub fn classify(results: &[FetchResult]) -> Classification<'_> {
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    let mut error_histogram = BTreeMap::new();

    for result in results {
        match result.error_kind() {
            None => successes.push(result),
            Some(kind) => {
                failures.push(result);
                *error_histogram.entry(kind).or_insert(0) += 1;
            }
        }
    }

    Classification {
        successes,
        failures,
        error_histogram,
    }
}
