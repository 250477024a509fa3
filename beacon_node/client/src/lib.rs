//! Lifecycle / bootstrap (C7): the largest single component of the orchestration core. Resolves
//! one of three genesis sources (§4.7 step 2) into a [`genesis::GenesisOutcome`], wires together
//! the quarantine/backfill loop, the slot scheduler (which itself owns the gossip gate and
//! subnet manager -- §5), the second ticker, and the gossip message router, then hands control
//! to the slot scheduler's tick loop until the process is asked to stop.
//!
//! Everything this crate does not itself implement -- the DB, the ChainDAG/fork-choice, the p2p
//! swarm, BLS, the validator pool -- is referenced only through the traits `network`,
//! `beacon_processor`, `lighthouse_network` and `eth1` expose (§1). `Client` is therefore generic
//! over those collaborators; a production binary supplies the real implementations; this crate's
//! own tests exercise it with the null/noop ones each of those crates already provides.

pub mod config;
pub mod status;
mod weak_subjectivity;

pub use config::{check_network_conflicts, ClientConfig, NetworkConfigConflict};
pub use status::{current as node_status, set_running, set_stopping, NodeStatus};
pub use weak_subjectivity::{
    is_within_weak_subjectivity_period, weak_subjectivity_period, WeakSubjectivityCheckpoint,
};

use beacon_processor::Processor;
use eth1::Eth1Monitor;
use genesis::GenesisOutcome;
use lighthouse_network::{GossipService, NetworkGlobals, SyncStatus};
use network::{install_message_validators, Quarantine, QuarantineTickHandler, RequestManager, SlotScheduler, ValidatorDuties};
use slot_clock::{BeaconClock, SystemTimeSlotClock};
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;
use types::{ChainSpec, ForkDigest};

/// The three genesis sources the lifecycle tries, in priority order (§4.7 step 2). A checkpoint
/// the operator supplied always wins; a baked network blob is tried next; live deposit-contract
/// monitoring is the fallback of last resort.
pub enum GenesisSource<'a> {
    Checkpoint {
        state_bytes: &'a [u8],
        block_bytes: Option<&'a [u8]>,
    },
    Baked(&'a eth2_network_config::Eth2NetworkConfig),
    Eth1Monitor,
}

/// Fatal startup errors (§7): configuration errors, genesis-source errors, and a stale
/// weak-subjectivity checkpoint are the only paths that abort the process; everything past this
/// point is logged-and-continued.
#[derive(Debug)]
pub enum ClientError {
    Genesis(String),
    WeakSubjectivity(String),
    Io(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Genesis(e) => write!(f, "genesis initialization failed: {e}"),
            ClientError::WeakSubjectivity(e) => write!(f, "weak subjectivity check failed: {e}"),
            ClientError::Io(e) => write!(f, "I/O error during startup: {e}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// A bootstrapped node. Owns the quarantine tick handler and the slot scheduler; every other
/// collaborator (DB, ChainDAG, validator pool, RPC server) is owned by whoever constructed `G`,
/// `P` and `D` and outlives this struct by construction (§3's ownership list), so dropping
/// `Client` after [`Client::run`] returns is what tears those down.
pub struct Client<G, P, D, R>
where
    G: GossipService + 'static,
    P: Processor,
    D: ValidatorDuties + 'static,
    R: RequestManager + 'static,
{
    executor: TaskExecutor,
    config: ClientConfig,
    genesis: GenesisOutcome,
    fork_digest: ForkDigest,
    network_globals: Arc<NetworkGlobals>,
    quarantine_handler: Arc<QuarantineTickHandler<R>>,
    scheduler: Option<SlotScheduler<SystemTimeSlotClock, G, P, D>>,
}

impl<G, P, D, R> Client<G, P, D, R>
where
    G: GossipService + 'static,
    P: Processor,
    D: ValidatorDuties + 'static,
    R: RequestManager + 'static,
{
    /// Runs §4.7 steps 1-9. `active_validators` is the head state's active validator count, used
    /// only by the weak-subjectivity check (step 5) and supplied by the caller since the
    /// `BeaconState` itself is out of scope here. `is_syncing` gates which work items the beacon
    /// processor drops rather than queues (shared with the gossip gate's sync-queue reading,
    /// but sourced independently since the processor has no `SyncStatus` handle of its own).
    #[allow(clippy::too_many_arguments)]
    pub async fn bootstrap(
        executor: TaskExecutor,
        config: ClientConfig,
        spec: ChainSpec,
        genesis_source: GenesisSource<'_>,
        active_validators: u64,
        gossip: Arc<G>,
        processor: Arc<P>,
        duties: Arc<D>,
        request_manager: Arc<R>,
        sync_status: Arc<dyn SyncStatus>,
        eth1_monitor: Option<Arc<dyn Eth1Monitor>>,
        is_syncing: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Result<Self, ClientError> {
        // Step 1: DB open + persistent net keys. The real key-value store and libp2p identity
        // are out of scope; the lifecycle only needs the data directory to exist before it can
        // write a PID file or an ENR.
        directory::ensure_dir_exists(&config.data_dir).map_err(ClientError::Io)?;

        // Step 2: genesis source, in priority order.
        let genesis = match genesis_source {
            GenesisSource::Checkpoint {
                state_bytes,
                block_bytes,
            } => genesis::from_checkpoint(state_bytes, block_bytes)
                .map_err(|e| ClientError::Genesis(e.to_string()))?,
            GenesisSource::Baked(net_config) => match genesis::from_baked(net_config) {
                Some(result) => result.map_err(ClientError::Genesis)?,
                None => {
                    let monitor = eth1_monitor.clone().ok_or_else(|| {
                        ClientError::Genesis(
                            "network has no baked genesis blob and no eth1 monitor is configured"
                                .to_string(),
                        )
                    })?;
                    genesis::from_eth1_monitor(&*monitor)
                        .await
                        .map_err(ClientError::Genesis)?
                }
            },
            GenesisSource::Eth1Monitor => {
                let monitor = eth1_monitor.clone().ok_or_else(|| {
                    ClientError::Genesis(
                        "eth1-monitor genesis source selected but none is configured".to_string(),
                    )
                })?;
                genesis::from_eth1_monitor(&*monitor)
                    .await
                    .map_err(ClientError::Genesis)?
            }
        };

        // Steps 3-4: DAG preInit/construction are the ChainDAG's job (out of scope, §1). What
        // this lifecycle needs out of that process -- a fork digest to qualify every gossip
        // topic -- is derived directly from the genesis outcome. The current fork version itself
        // belongs to the state-transition function; phase0's all-zero version is used here since
        // fork upgrades are out of scope for this core.
        let fork_digest = ForkDigest::compute([0, 0, 0, 0], *genesis.genesis_validators_root);

        // Step 5: weak-subjectivity check, only when the operator supplied a checkpoint root.
        if let Some(checkpoint) = &config.weak_subjectivity_checkpoint {
            let clock = BeaconClock::<SystemTimeSlotClock>::new(
                genesis.genesis_time,
                Duration::from_secs(spec.seconds_per_slot),
            );
            let current_slot = clock.slot_or_zero();
            if !is_within_weak_subjectivity_period(&spec, current_slot, active_validators, checkpoint)
            {
                return Err(ClientError::WeakSubjectivity(format!(
                    "checkpoint at epoch {} is stale relative to current slot {current_slot}",
                    checkpoint.epoch
                )));
            }
        }

        // Step 6: the validator pool and its slashing-protection DB (keyed by
        // `genesis_validators_root`) are constructed by the caller and handed in as `duties`;
        // this core only reasons about how many validators are attached.

        // Step 7: start the eth1 monitor if validators are attached and a web3 endpoint is
        // configured. The monitor's own polling loop is spawned by whoever constructed it; this
        // lifecycle only gates on the precondition and logs the decision.
        if duties.attached_validator_count() > 0 && config.web3_url.is_some() {
            if eth1_monitor.is_some() {
                tracing::info!("eth1 monitor left running for post-genesis deposit observation");
            } else {
                tracing::warn!(
                    "validators attached and web3Url configured, but no eth1 monitor was supplied"
                );
            }
        }

        // Step 8: install message validators (C8), persisting across every later gossip
        // enable/disable cycle.
        let sender = beacon_processor::spawn(&executor, processor.clone(), is_syncing);
        install_message_validators(&*gossip, sender, &spec);

        let network_globals = Arc::new(NetworkGlobals::new());

        let quarantine_handler = Arc::new(QuarantineTickHandler::new(
            Quarantine::new(Duration::from_secs(spec.seconds_per_slot)),
            request_manager,
            sync_status.clone(),
        ));

        let clock = BeaconClock::<SystemTimeSlotClock>::new(
            genesis.genesis_time,
            Duration::from_secs(spec.seconds_per_slot),
        );
        let mut scheduler = SlotScheduler::new(
            clock,
            spec,
            gossip,
            fork_digest,
            processor,
            duties,
            sync_status,
        );

        // §4.3 `initialSubscribe`, run once before the first slot tick (§4.7 step 9) so the
        // gossip gate's first enable has a full attestation-subnet fan-out and a stability
        // subnet to subscribe rather than an empty set.
        scheduler.initial_subscribe().await;

        status::set_running();

        Ok(Self {
            executor,
            config,
            genesis,
            fork_digest,
            network_globals,
            quarantine_handler,
            scheduler: Some(scheduler),
        })
    }

    /// Step 9 (§4.7): spawns the second ticker and runs the slot scheduler's tick loop, starting
    /// one slot after the genesis/tail slot. Consumes `self` -- once this is running, the slot
    /// scheduler exclusively owns the gossip gate and subnet manager for the remainder of the
    /// process's life (§5), and there is nothing left to call through `Client` except the handles
    /// already handed out at `bootstrap` time.
    pub async fn run(mut self) {
        timer::spawn_second_ticker(self.executor.clone(), self.quarantine_handler.clone());

        let scheduler = self
            .scheduler
            .take()
            .expect("scheduler is only ever taken once, by run()");
        let start_slot = self.genesis.tail_slot;
        scheduler.run(start_slot).await;
    }

    pub fn quarantine_handler(&self) -> Arc<QuarantineTickHandler<R>> {
        self.quarantine_handler.clone()
    }

    pub fn network_globals(&self) -> Arc<NetworkGlobals> {
        self.network_globals.clone()
    }

    pub fn fork_digest(&self) -> ForkDigest {
        self.fork_digest
    }

    pub fn genesis(&self) -> GenesisOutcome {
        self.genesis
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Shutdown on interrupt (§4.7): advances the process-wide status (monotone, never backward --
/// §3), then tears down what this crate itself owns. The DB, network listeners, and validator
/// sidecar are owned by the caller's concrete `G`/`P`/`D` and are expected to be dropped by the
/// caller after this returns; this function only removes the PID file and logs the DB close, per
/// the persisted-state contract in §6.
pub fn shutdown(config: &ClientConfig) {
    status::set_stopping();
    match std::fs::remove_file(config.pid_file()) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(%e, "failed to remove pid file on shutdown"),
    }
    tracing::info!("database closed");
}

/// Writes `beacon_node.pid` (§6) so that external tooling (and a future `shutdown`) can locate
/// this process.
pub fn write_pid_file(config: &ClientConfig) -> Result<(), ClientError> {
    std::fs::write(config.pid_file(), std::process::id().to_string())
        .map_err(|e| ClientError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use beacon_processor::NoopProcessor;
    use lighthouse_network::{GossipKind, GossipTopic, NullGossipService, StaticSyncStatus, ValidationResult};
    use network::{NoValidators, NullRequestManager};
    use std::collections::HashSet;
    use tempfile::TempDir;
    use types::{Epoch, Slot, SubnetId};

    struct NullGossip;
    #[async_trait]
    impl GossipService for NullGossip {
        async fn subscribe(&self, _topic: GossipTopic) -> Result<(), String> {
            Ok(())
        }
        async fn unsubscribe(&self, _topic: GossipTopic) -> Result<(), String> {
            Ok(())
        }
        fn register_validator(
            &self,
            _kind: GossipKind,
            _validator: Box<dyn Fn(&[u8]) -> ValidationResult + Send + Sync>,
        ) {
        }
    }

    fn test_config(data_dir: &std::path::Path) -> ClientConfig {
        ClientConfig {
            data_dir: data_dir.to_path_buf(),
            database_dir: data_dir.join("beacon"),
            validators_dir: data_dir.join("validators"),
            secrets_dir: data_dir.join("secrets"),
            ..ClientConfig::default()
        }
    }

    fn genesis_state_bytes(slot: u64, genesis_time: u64) -> Vec<u8> {
        let mut out = vec![0u8; 80];
        out[0..8].copy_from_slice(&slot.to_le_bytes());
        out[8..16].copy_from_slice(&genesis_time.to_le_bytes());
        out
    }

    #[tokio::test]
    async fn bootstrap_from_genesis_checkpoint_reaches_running() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _exit, _rx) = task_executor::build(rt);
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());

        let state = genesis_state_bytes(0, 100);
        let client = Client::<NullGossip, NoopProcessor, NoValidators, NullRequestManager>::bootstrap(
            executor,
            config,
            ChainSpec::minimal(),
            GenesisSource::Checkpoint {
                state_bytes: &state,
                block_bytes: None,
            },
            0,
            Arc::new(NullGossip),
            Arc::new(NoopProcessor),
            Arc::new(NoValidators),
            Arc::new(NullRequestManager),
            Arc::new(StaticSyncStatus::not_syncing()),
            None,
            || false,
        )
        .await
        .unwrap();

        assert_eq!(node_status(), NodeStatus::Running);
        assert_eq!(client.genesis().genesis_time, 100);
    }

    #[tokio::test]
    async fn missing_eth1_monitor_is_a_fatal_genesis_error() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _exit, _rx) = task_executor::build(rt);
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());

        let err = Client::<NullGossip, NoopProcessor, NoValidators, NullRequestManager>::bootstrap(
            executor,
            config,
            ChainSpec::minimal(),
            GenesisSource::Eth1Monitor,
            0,
            Arc::new(NullGossip),
            Arc::new(NoopProcessor),
            Arc::new(NoValidators),
            Arc::new(NullRequestManager),
            Arc::new(StaticSyncStatus::not_syncing()),
            None,
            || false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::Genesis(_)));
    }

    #[tokio::test]
    async fn stale_weak_subjectivity_checkpoint_is_fatal() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _exit, _rx) = task_executor::build(rt);
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(tmp.path());
        let spec = ChainSpec::minimal();

        // Genesis far enough in the past that "now" is way beyond any plausible weak
        // subjectivity window for an epoch-0 checkpoint.
        config.weak_subjectivity_checkpoint = Some(WeakSubjectivityCheckpoint {
            epoch: Epoch::new(0),
            root: types::Hash256::ZERO,
        });

        let state = genesis_state_bytes(0, 1);
        let err = Client::<NullGossip, NoopProcessor, NoValidators, NullRequestManager>::bootstrap(
            executor,
            config,
            spec,
            GenesisSource::Checkpoint {
                state_bytes: &state,
                block_bytes: None,
            },
            0,
            Arc::new(NullGossip),
            Arc::new(NoopProcessor),
            Arc::new(NoValidators),
            Arc::new(NullRequestManager),
            Arc::new(StaticSyncStatus::not_syncing()),
            None,
            || false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::WeakSubjectivity(_)));
    }

    #[test]
    fn shutdown_removes_pid_file_and_sets_stopping() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        write_pid_file(&config).unwrap();
        assert!(config.pid_file().exists());

        shutdown(&config);

        assert!(!config.pid_file().exists());
        assert_eq!(node_status(), NodeStatus::Stopping);
    }

    #[allow(dead_code)]
    fn unused_imports_reference(_s: HashSet<SubnetId>, _slot: Slot) {}
}
