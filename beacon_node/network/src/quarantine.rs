//! Missing-ancestor tracking and backfill scheduling (C2). The actual by-root fetch over the
//! p2p transport is out of scope; [`RequestManager`] is the seam the quarantine loop calls into.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use types::Hash256;

/// Holding area for blocks whose parent root is unknown. A root is re-offered to
/// [`RequestManager`] only after `retry_after` has elapsed since it was last requested, so a
/// single slow peer response doesn't cause the second ticker to re-request on every tick.
pub struct Quarantine {
    /// Missing parent root -> time it was last handed to the request manager, or `None` if it
    /// has never been requested yet.
    entries: HashMap<Hash256, Option<Instant>>,
    retry_after: Duration,
}

impl Quarantine {
    pub fn new(retry_after: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            retry_after,
        }
    }

    /// Records that `root` is a known parent of a quarantined block but is itself unavailable.
    pub fn add_missing(&mut self, root: Hash256) {
        self.entries.entry(root).or_insert(None);
    }

    /// Called once the block for `root` has been imported (or is now known-invalid): it no
    /// longer needs backfill.
    pub fn resolve(&mut self, root: Hash256) {
        self.entries.remove(&root);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the deduplicated set of roots that have not been requested recently, marking them
    /// as requested as of `now`.
    pub fn check_missing(&mut self, now: Instant) -> Vec<Hash256> {
        let retry_after = self.retry_after;
        let mut due = Vec::new();
        for (root, last_requested) in self.entries.iter_mut() {
            let is_due = match last_requested {
                None => true,
                Some(t) => now.duration_since(*t) >= retry_after,
            };
            if is_due {
                due.push(*root);
                *last_requested = Some(now);
            }
        }
        due
    }
}

/// Issues peer-parallel by-root requests for quarantined ancestors. Completions are handed to
/// the processor's block queue (`beacon_processor`) -- never written back to the DAG directly by
/// this component (§4.2).
#[async_trait]
pub trait RequestManager: Send + Sync {
    async fn fetch_ancestor_blocks(&self, roots: Vec<Hash256>);
}

/// A `RequestManager` that logs and drops every request. Used wherever the real peer-parallel
/// by-root fetcher isn't wired up; the quarantine loop still runs and still dedups/retries roots,
/// it just has nowhere real to send them.
#[derive(Default)]
pub struct NullRequestManager;

#[async_trait]
impl RequestManager for NullRequestManager {
    async fn fetch_ancestor_blocks(&self, roots: Vec<Hash256>) {
        tracing::debug!(count = roots.len(), "no request manager configured, dropping ancestor fetch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_newly_added_roots_once() {
        let mut q = Quarantine::new(Duration::from_secs(10));
        let root = Hash256::repeat_byte(1);
        q.add_missing(root);

        let t0 = Instant::now();
        assert_eq!(q.check_missing(t0), vec![root]);
        assert!(q.check_missing(t0).is_empty());
    }

    #[test]
    fn re_offers_after_retry_window() {
        let mut q = Quarantine::new(Duration::from_secs(10));
        let root = Hash256::repeat_byte(2);
        q.add_missing(root);

        let t0 = Instant::now();
        assert_eq!(q.check_missing(t0), vec![root]);
        assert!(q.check_missing(t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(q.check_missing(t0 + Duration::from_secs(11)), vec![root]);
    }

    #[test]
    fn resolve_removes_entry() {
        let mut q = Quarantine::new(Duration::from_secs(10));
        let root = Hash256::repeat_byte(3);
        q.add_missing(root);
        q.resolve(root);
        assert!(q.is_empty());
        assert!(q.check_missing(Instant::now()).is_empty());
    }
}
