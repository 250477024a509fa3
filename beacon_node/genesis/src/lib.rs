//! The three genesis sources the lifecycle (C7) tries in priority order (§4.7 step 2):
//! a user-supplied finalized checkpoint, the baked-in network metadata, or live deposit-contract
//! monitoring. Each produces a [`GenesisOutcome`] -- the minimal summary the DAG's `preInit`
//! needs -- without constructing a full `BeaconState`, which belongs to the state-transition
//! function and is out of scope here.

mod checkpoint;
mod interop;

pub use checkpoint::{from_checkpoint, CheckpointError};

use types::{Epoch, Hash256, Slot};

/// What the DAG's `preInit` needs to bootstrap persistent state, regardless of which of the
/// three sources produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisOutcome {
    pub genesis_time: u64,
    pub genesis_validators_root: Hash256,
    /// The slot of the tail (first persisted) state/block. Zero for a from-genesis start, equal
    /// to the checkpoint slot for a checkpoint-sync start.
    pub tail_slot: Slot,
}

impl GenesisOutcome {
    pub fn tail_epoch(&self, slots_per_epoch: u64) -> Epoch {
        self.tail_slot.epoch(slots_per_epoch)
    }
}

/// Awaits genesis detection from a live deposit-contract watcher (§4.7 step 2, third source).
/// A monitor failure here is fatal to startup (§7): there is no fourth source to fall back to.
pub async fn from_eth1_monitor<M: eth1::Eth1Monitor + ?Sized>(
    monitor: &M,
) -> Result<GenesisOutcome, String> {
    let trigger = monitor.await_genesis().await?;
    Ok(GenesisOutcome {
        genesis_time: trigger.genesis_time,
        genesis_validators_root: derive_validators_root(trigger.deposit_count),
        tail_slot: types::GENESIS_SLOT,
    })
}

/// Decodes the baked-in genesis blob for a hardcoded network, if one is bundled (§4.7 step 2,
/// second source). Returns `None` (not an error) when the network has no baked blob, which the
/// lifecycle treats as "fall through to the eth1 monitor".
pub fn from_baked(config: &eth2_network_config::Eth2NetworkConfig) -> Option<Result<GenesisOutcome, String>> {
    config.genesis_state_summary().map(|summary| {
        summary.map(|s| GenesisOutcome {
            genesis_time: s.genesis_time,
            genesis_validators_root: Hash256::from(s.genesis_validators_root),
            tail_slot: types::GENESIS_SLOT,
        })
    })
}

/// A placeholder `genesis_validators_root` derived from the deposit count observed at genesis,
/// standing in for `hash_tree_root(validator registry)` -- the full tree-hash computation over
/// the actual validator set belongs to the state-transition function.
fn derive_validators_root(deposit_count: u64) -> Hash256 {
    let digest = ethereum_hashing::hash(&deposit_count.to_le_bytes());
    Hash256::from_slice(&digest)
}
