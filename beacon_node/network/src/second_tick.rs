//! Wires the quarantine/backfill loop (C2) onto the generic [`timer::SecondTickHandler`] driver
//! (C6): once per second, if the sync manager isn't already mid-sync, ask the quarantine for
//! roots due for a retry and hand them to the request manager.

use crate::quarantine::{Quarantine, RequestManager};
use lighthouse_network::SyncStatus;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use task_executor::TaskExecutor;
use timer::SecondTickHandler;

pub struct QuarantineTickHandler<R> {
    quarantine: Mutex<Quarantine>,
    request_manager: Arc<R>,
    sync_status: Arc<dyn SyncStatus>,
}

impl<R: RequestManager + 'static> QuarantineTickHandler<R> {
    pub fn new(
        quarantine: Quarantine,
        request_manager: Arc<R>,
        sync_status: Arc<dyn SyncStatus>,
    ) -> Self {
        Self {
            quarantine: Mutex::new(quarantine),
            request_manager,
            sync_status,
        }
    }

    pub fn add_missing(&self, root: types::Hash256) {
        self.quarantine.lock().add_missing(root);
    }

    pub fn resolve(&self, root: types::Hash256) {
        self.quarantine.lock().resolve(root);
    }
}

impl<R: RequestManager + 'static> SecondTickHandler for QuarantineTickHandler<R> {
    fn handle_tick(&self, executor: &TaskExecutor) {
        if self.sync_status.is_syncing() {
            return;
        }

        let due = self.quarantine.lock().check_missing(Instant::now());
        if due.is_empty() {
            return;
        }

        let request_manager = self.request_manager.clone();
        executor.spawn(
            async move { request_manager.fetch_ancestor_blocks(due).await },
            "quarantine_backfill_fetch",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use types::Hash256;

    struct CountingRequestManager(AtomicUsize);

    #[async_trait]
    impl RequestManager for CountingRequestManager {
        async fn fetch_ancestor_blocks(&self, roots: Vec<Hash256>) {
            self.0.fetch_add(roots.len(), Ordering::SeqCst);
        }
    }

    struct NotSyncing;
    impl SyncStatus for NotSyncing {
        fn sync_queue_len(&self) -> u64 {
            0
        }
        fn is_syncing(&self) -> bool {
            false
        }
    }

    struct Syncing;
    impl SyncStatus for Syncing {
        fn sync_queue_len(&self) -> u64 {
            1_000
        }
        fn is_syncing(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn dispatches_missing_roots_when_not_syncing() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _signal, _rx) = task_executor::build(rt);
        let request_manager = Arc::new(CountingRequestManager(AtomicUsize::new(0)));
        let handler = QuarantineTickHandler::new(
            Quarantine::new(Duration::from_secs(10)),
            request_manager.clone(),
            Arc::new(NotSyncing),
        );
        handler.add_missing(Hash256::repeat_byte(1));

        handler.handle_tick(&executor);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(request_manager.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn skips_dispatch_while_syncing() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _signal, _rx) = task_executor::build(rt);
        let request_manager = Arc::new(CountingRequestManager(AtomicUsize::new(0)));
        let handler = QuarantineTickHandler::new(
            Quarantine::new(Duration::from_secs(10)),
            request_manager.clone(),
            Arc::new(Syncing),
        );
        handler.add_missing(Hash256::repeat_byte(2));

        handler.handle_tick(&executor);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(request_manager.0.load(Ordering::SeqCst), 0);
    }
}
