//! The worker pool that sits between the gossip/RPC message router (C8) and the chain/DAG
//! (out of scope: block import, state-transition, fork choice). Messages arrive as [`Work`]
//! items over a bounded channel; a small pool of rayon threads (for CPU-bound verification) and
//! the tokio executor (for anything that awaits the DAG) drain them and report a
//! [`lighthouse_network::ValidationResult`] back to the gossip layer.

mod rayon_manager;
mod work;

pub use rayon_manager::RayonManager;
pub use work::{Work, WorkEvent};

use lighthouse_network::ValidationResult;
use std::sync::Arc;
use task_executor::TaskExecutor;
use tokio::sync::mpsc;

/// The chain/DAG boundary (§1's "out of scope" block-pool + fork-choice DAG). `beacon_processor`
/// never touches block verification itself; it only calls into this trait and forwards whatever
/// verdict comes back to the gossip layer.
pub trait Processor: Send + Sync + 'static {
    fn process_gossip_block(&self, block: &[u8]) -> ValidationResult;
    fn process_gossip_attestation(&self, subnet_id: types::SubnetId, attestation: &[u8]) -> ValidationResult;
    fn process_gossip_aggregate(&self, aggregate: &[u8]) -> ValidationResult;
    fn process_gossip_attester_slashing(&self, attester_slashing: &[u8]) -> ValidationResult;
    fn process_gossip_proposer_slashing(&self, proposer_slashing: &[u8]) -> ValidationResult;
    fn process_gossip_voluntary_exit(&self, voluntary_exit: &[u8]) -> ValidationResult;
    fn process_rpc_block(&self, block: &[u8]);

    /// Recomputes fork choice against `wall_slot`, possibly changing the DAG head (§4.5 step 5).
    fn update_head(&self, wall_slot: types::Slot);

    /// The DAG's currently finalized epoch, read for the slot scheduler's finalization-delay
    /// metric (§4.5 step 4).
    fn finalized_epoch(&self) -> types::Epoch;
}

/// A `Processor` that accepts every gossip item, never touches fork choice, and reports a
/// finalized epoch of zero. Used wherever the chain/DAG isn't wired up yet; lets the rest of the
/// orchestration core (slot scheduler, message router) run end-to-end against a real queue and
/// rayon pool without a real block-pool/fork-choice implementation behind it.
#[derive(Default)]
pub struct NoopProcessor;

impl Processor for NoopProcessor {
    fn process_gossip_block(&self, _block: &[u8]) -> ValidationResult {
        ValidationResult::Accept
    }

    fn process_gossip_attestation(&self, _subnet_id: types::SubnetId, _attestation: &[u8]) -> ValidationResult {
        ValidationResult::Accept
    }

    fn process_gossip_aggregate(&self, _aggregate: &[u8]) -> ValidationResult {
        ValidationResult::Accept
    }

    fn process_gossip_attester_slashing(&self, _attester_slashing: &[u8]) -> ValidationResult {
        ValidationResult::Accept
    }

    fn process_gossip_proposer_slashing(&self, _proposer_slashing: &[u8]) -> ValidationResult {
        ValidationResult::Accept
    }

    fn process_gossip_voluntary_exit(&self, _voluntary_exit: &[u8]) -> ValidationResult {
        ValidationResult::Accept
    }

    fn process_rpc_block(&self, _block: &[u8]) {}

    fn update_head(&self, _wall_slot: types::Slot) {}

    fn finalized_epoch(&self) -> types::Epoch {
        types::Epoch::new(0)
    }
}

/// Handle held by producers (the gossip router, RPC handlers) to enqueue work. Cloning is cheap;
/// every clone shares the same bounded channel, so a slow processor applies backpressure to all
/// producers rather than just one.
#[derive(Clone)]
pub struct BeaconProcessorSend(mpsc::Sender<WorkEvent>);

impl BeaconProcessorSend {
    pub async fn send(&self, event: WorkEvent) -> Result<(), String> {
        self.0
            .send(event)
            .await
            .map_err(|_| "beacon processor queue closed".to_string())
    }

    pub fn try_send(&self, event: WorkEvent) -> Result<(), String> {
        self.0
            .try_send(event)
            .map_err(|_| "beacon processor queue full or closed".to_string())
    }
}

/// Default bound on the work queue. Past this, producers see `try_send` fail rather than the
/// queue growing without limit during a sync burst.
pub const DEFAULT_QUEUE_LEN: usize = 16_384;

/// Spawns the processor's drain loop onto `executor` and returns the handle producers use to
/// enqueue work. `is_syncing` is polled once per item so that sync-droppable work (attestations,
/// aggregates) is discarded rather than queued while catching up (§4/§7).
pub fn spawn<P: Processor, S: Fn() -> bool + Send + Sync + 'static>(
    executor: &TaskExecutor,
    processor: Arc<P>,
    is_syncing: S,
) -> BeaconProcessorSend {
    let (tx, mut rx) = mpsc::channel::<WorkEvent>(DEFAULT_QUEUE_LEN);
    let rayon_manager = RayonManager::default();

    executor.spawn(
        async move {
            while let Some(event) = rx.recv().await {
                if event.work.drop_during_sync() && is_syncing() {
                    metrics::inc_counter(&DROPPED_DURING_SYNC_TOTAL);
                    continue;
                }

                let label = event.work.label();
                metrics::inc_counter(&PROCESSED_TOTAL);
                let processor = processor.clone();
                let result_tx = event.result_tx;
                let pool = rayon_manager.low_priority_threadpool.clone();
                let work = event.work;

                pool.spawn(move || {
                    let result = run(&*processor, work, label);
                    if let (Some(tx), Some(result)) = (result_tx, result) {
                        let _ = tx.send(result);
                    }
                });
            }
        },
        "beacon_processor",
    );

    BeaconProcessorSend(tx)
}

fn run<P: Processor>(processor: &P, work: Work, label: &'static str) -> Option<ValidationResult> {
    match work {
        Work::GossipBlock { block, .. } => Some(processor.process_gossip_block(&block)),
        Work::GossipAttestation {
            subnet_id,
            attestation,
        } => Some(processor.process_gossip_attestation(subnet_id, &attestation)),
        Work::GossipAggregate { aggregate } => {
            Some(processor.process_gossip_aggregate(&aggregate))
        }
        Work::GossipAttesterSlashing { attester_slashing } => {
            Some(processor.process_gossip_attester_slashing(&attester_slashing))
        }
        Work::GossipProposerSlashing { proposer_slashing } => {
            Some(processor.process_gossip_proposer_slashing(&proposer_slashing))
        }
        Work::GossipVoluntaryExit { voluntary_exit } => {
            Some(processor.process_gossip_voluntary_exit(&voluntary_exit))
        }
        Work::RpcBlock { block } => {
            processor.process_rpc_block(&block);
            None
        }
    }
    .inspect(|_| tracing::trace!(work = label, "processed beacon processor item"))
}

static PROCESSED_TOTAL: std::sync::LazyLock<metrics::Result<metrics::IntCounter>> =
    std::sync::LazyLock::new(|| {
        metrics::try_create_int_counter(
            "beacon_processor_processed_total",
            "Count of items drained from the beacon processor queue",
        )
    });

static DROPPED_DURING_SYNC_TOTAL: std::sync::LazyLock<metrics::Result<metrics::IntCounter>> =
    std::sync::LazyLock::new(|| {
        metrics::try_create_int_counter(
            "beacon_processor_dropped_during_sync_total",
            "Count of sync-droppable items discarded while the node is syncing",
        )
    });

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProcessor {
        blocks: AtomicUsize,
    }

    impl Processor for CountingProcessor {
        fn process_gossip_block(&self, _block: &[u8]) -> ValidationResult {
            self.blocks.fetch_add(1, Ordering::SeqCst);
            ValidationResult::Accept
        }

        fn process_gossip_attestation(
            &self,
            _subnet_id: types::SubnetId,
            _attestation: &[u8],
        ) -> ValidationResult {
            ValidationResult::Accept
        }

        fn process_gossip_aggregate(&self, _aggregate: &[u8]) -> ValidationResult {
            ValidationResult::Accept
        }

        fn process_gossip_attester_slashing(&self, _attester_slashing: &[u8]) -> ValidationResult {
            ValidationResult::Accept
        }

        fn process_gossip_proposer_slashing(&self, _proposer_slashing: &[u8]) -> ValidationResult {
            ValidationResult::Accept
        }

        fn process_gossip_voluntary_exit(&self, _voluntary_exit: &[u8]) -> ValidationResult {
            ValidationResult::Accept
        }

        fn process_rpc_block(&self, _block: &[u8]) {}

        fn update_head(&self, _wall_slot: types::Slot) {}

        fn finalized_epoch(&self) -> types::Epoch {
            types::Epoch::new(0)
        }
    }

    #[tokio::test]
    async fn drops_attestations_while_syncing() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _signal, _shutdown_rx) = task_executor::build(rt);
        let processor = Arc::new(CountingProcessor {
            blocks: AtomicUsize::new(0),
        });
        let sender = spawn(&executor, processor.clone(), || true);

        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        sender
            .send(WorkEvent::new(
                Work::GossipAttestation {
                    subnet_id: 0,
                    attestation: vec![],
                },
                result_tx,
            ))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(result_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn processes_blocks_regardless_of_sync_state() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _signal, _shutdown_rx) = task_executor::build(rt);
        let processor = Arc::new(CountingProcessor {
            blocks: AtomicUsize::new(0),
        });
        let sender = spawn(&executor, processor.clone(), || true);

        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        sender
            .send(WorkEvent::new(
                Work::GossipBlock {
                    peer: types::Hash256::ZERO,
                    block: vec![1, 2, 3],
                },
                result_tx,
            ))
            .await
            .unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_millis(200), result_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, ValidationResult::Accept);
        assert_eq!(processor.blocks.load(Ordering::SeqCst), 1);
    }
}
