//! services/client/src/app/tasks.rs
//!
//! Request identity for in-flight backend calls. Each spawned exchange
//! takes a monotonic id at send time; only the most recently issued
//! request of a component may commit its resolution, so a slow response
//! overtaken by a newer request is discarded instead of appearing out of
//! order.

use std::sync::atomic::{AtomicU64, Ordering};

pub type RequestId = u64;

/// Issues monotonically increasing request ids and answers whether an id
/// is still the latest one issued.
#[derive(Debug, Default)]
pub struct RequestTracker {
    issued: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the next request id, superseding all earlier ones.
    pub fn begin(&self) -> RequestId {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True while `id` is the most recent request issued.
    pub fn is_current(&self, id: RequestId) -> bool {
        self.issued.load(Ordering::SeqCst) == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_newer_request_supersedes_an_older_one() {
        let tracker = RequestTracker::new();
        let first = tracker.begin();
        assert!(tracker.is_current(first));

        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }
}
