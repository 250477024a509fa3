use crate::{Epoch, Slot};
use serde::{Deserialize, Serialize};

/// Protocol-level constants consumed by the node orchestration core.
///
/// This is a deliberately small slice of the real consensus `ChainSpec`: only the fields that
/// the slot scheduler, subnet manager and weak-subjectivity check actually read. The full
/// fork-versioned spec (far larger, and reloaded from YAML per network) lives in the
/// state-transition crate and is out of scope here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub genesis_slot: Slot,
    pub slots_per_epoch: u64,
    pub seconds_per_slot: u64,
    pub attestation_subnet_count: u64,
    pub attestation_subnet_extra_bits: u64,
    pub attestation_subnet_prefix_bits: u64,
    pub epochs_per_subnet_subscription: u64,
    pub min_validator_withdrawability_delay: Epoch,
    pub safety_decay: u64,
    pub churn_limit_quotient: u64,
    pub min_per_epoch_churn_limit: u64,
}

impl ChainSpec {
    /// Mainnet-equivalent defaults. Real deployments load these from the network's
    /// `config.yaml`; the loader lives in `eth2_network_config` and is out of scope here.
    pub fn mainnet() -> Self {
        ChainSpec {
            genesis_slot: Slot::new(0),
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            attestation_subnet_count: 64,
            attestation_subnet_extra_bits: 0,
            attestation_subnet_prefix_bits: 6,
            epochs_per_subnet_subscription: 256,
            min_validator_withdrawability_delay: Epoch::new(256),
            safety_decay: 10,
            churn_limit_quotient: 65_536,
            min_per_epoch_churn_limit: 4,
        }
    }

    pub fn minimal() -> Self {
        ChainSpec {
            slots_per_epoch: 8,
            seconds_per_slot: 6,
            attestation_subnet_count: 4,
            epochs_per_subnet_subscription: 4,
            ..ChainSpec::mainnet()
        }
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        ChainSpec::mainnet()
    }
}
