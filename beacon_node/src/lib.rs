//! Composition root: builds the concrete collaborator set [`client::Client`] is generic over and
//! drives it to completion. Every collaborator supplied here is the null/default implementation
//! its owning crate exports (gossip, validator duties, ancestor-request fetching), standing in
//! for the libp2p swarm, ChainDAG/fork-choice, validator client and peer-parallel request manager
//! that are out of scope for this core. A binary that eventually wires up the real subsystems
//! would replace these type parameters, not this crate's call sequence.

use beacon_processor::NoopProcessor;
use client::{Client, ClientConfig, ClientError, GenesisSource};
use eth1::Eth1Monitor;
use lighthouse_network::{NullGossipService, StaticSyncStatus};
use network::{NoValidators, NullRequestManager};
use std::sync::Arc;
use task_executor::TaskExecutor;
use types::ChainSpec;

/// The node shape this crate is able to assemble today: every out-of-scope collaborator is the
/// null implementation its crate exports. See the module doc for why.
pub type ProductionClient = Client<NullGossipService, NoopProcessor, NoValidators, NullRequestManager>;

/// A fully bootstrapped node, ready for [`ProductionBeaconNode::run`].
pub struct ProductionBeaconNode {
    client: ProductionClient,
}

impl ProductionBeaconNode {
    /// Runs bootstrap (§4.7 steps 1-9) against the null collaborator set. `eth1_monitor` is
    /// taken as a parameter rather than constructed here, since even the null/delayed monitors
    /// this workspace provides still need caller-supplied genesis parameters to be useful in
    /// tests; a production deployment would instead pass a real deposit-contract watcher.
    pub async fn new(
        executor: TaskExecutor,
        config: ClientConfig,
        spec: ChainSpec,
        genesis_source: GenesisSource<'_>,
        active_validators: u64,
        eth1_monitor: Option<Arc<dyn Eth1Monitor>>,
    ) -> Result<Self, ClientError> {
        let sync_status = Arc::new(StaticSyncStatus::not_syncing());

        let client = Client::bootstrap(
            executor,
            config,
            spec,
            genesis_source,
            active_validators,
            Arc::new(NullGossipService),
            Arc::new(NoopProcessor),
            Arc::new(NoValidators),
            Arc::new(NullRequestManager),
            sync_status,
            eth1_monitor,
            || false,
        )
        .await?;

        Ok(Self { client })
    }

    /// Runs until the process is asked to stop (§4.7 step 9). See [`client::Client::run`].
    pub async fn run(self) {
        self.client.run().await;
    }

    pub fn client(&self) -> &ProductionClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn genesis_state_bytes(slot: u64, genesis_time: u64) -> Vec<u8> {
        let mut out = vec![0u8; 80];
        out[0..8].copy_from_slice(&slot.to_le_bytes());
        out[8..16].copy_from_slice(&genesis_time.to_le_bytes());
        out
    }

    #[tokio::test]
    async fn assembles_and_reaches_running_from_a_checkpoint() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _exit, _rx) = task_executor::build(rt);
        let tmp = TempDir::new().unwrap();
        let config = ClientConfig {
            data_dir: tmp.path().to_path_buf(),
            database_dir: tmp.path().join("beacon"),
            validators_dir: tmp.path().join("validators"),
            secrets_dir: tmp.path().join("secrets"),
            ..ClientConfig::default()
        };

        let state = genesis_state_bytes(0, 42);
        let node = ProductionBeaconNode::new(
            executor,
            config,
            ChainSpec::minimal(),
            GenesisSource::Checkpoint {
                state_bytes: &state,
                block_bytes: None,
            },
            0,
            None,
        )
        .await
        .unwrap();

        assert_eq!(client::node_status(), client::NodeStatus::Running);
        assert_eq!(node.client().genesis().genesis_time, 42);
    }
}
