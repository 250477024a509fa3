//! Baked-in network metadata: the genesis source consulted first by [`genesis::baked`] after a
//! user-supplied checkpoint, per the lifecycle's genesis-source precedence (§4.7).
//!
//! The full fidelity here -- downloading `config.yaml`/`genesis.ssz`/`deposit_contract_block.txt`
//! from the network-configs repo at build time and decoding a complete `BeaconState` -- belongs
//! to the state-transition function and is out of scope. What this crate actually needs to
//! provide the orchestration core is much smaller: "does this network name have a known genesis
//! blob, and if so what does it decode to".

use discv5::enr::{CombinedKey, Enr};
use std::sync::Arc;
use types::ChainSpec;

pub const DEFAULT_HARDCODED_NETWORK: &str = "mainnet";
pub const HARDCODED_NET_NAMES: &[&str] = &["mainnet", "holesky", "sepolia", "hoodi"];

/// A 20-byte summary decoded from a baked genesis blob: enough for the lifecycle to construct
/// `(genesis_time, genesis_validators_root)` without depending on the full `BeaconState` SSZ
/// container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisStateSummary {
    pub genesis_time: u64,
    pub genesis_validators_root: [u8; 32],
}

impl GenesisStateSummary {
    /// Layout: 8 bytes little-endian `genesis_time`, followed by the 32-byte
    /// `genesis_validators_root`. A stand-in for the real SSZ `BeaconState` header, which is
    /// out of scope here.
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < 40 {
            return Err(format!(
                "genesis blob too short: {} bytes, need at least 40",
                bytes.len()
            ));
        }
        let mut genesis_time_bytes = [0u8; 8];
        genesis_time_bytes.copy_from_slice(&bytes[0..8]);
        let mut genesis_validators_root = [0u8; 32];
        genesis_validators_root.copy_from_slice(&bytes[8..40]);
        Ok(GenesisStateSummary {
            genesis_time: u64::from_le_bytes(genesis_time_bytes),
            genesis_validators_root,
        })
    }
}

/// Everything the node needs from a hardcoded network: its chain spec, optional baked genesis
/// state bytes, and optional boot ENRs.
#[derive(Clone)]
pub struct Eth2NetworkConfig {
    pub name: String,
    pub spec: ChainSpec,
    pub genesis_state_bytes: Option<Arc<[u8]>>,
    pub boot_enr: Vec<Enr<CombinedKey>>,
}

impl Eth2NetworkConfig {
    /// Looks up one of the small set of networks this binary ships configuration for. Returns
    /// `None` for an unrecognized name, which the caller treats the same as "no baked genesis
    /// blob available" and falls through to the eth1-monitor genesis source.
    pub fn constant(name: &str) -> Option<Self> {
        if !HARDCODED_NET_NAMES.contains(&name) {
            return None;
        }
        Some(Eth2NetworkConfig {
            name: name.to_string(),
            spec: ChainSpec::mainnet(),
            // Real deployments embed a `genesis.ssz.zip` at build time; this core doesn't decode
            // full `BeaconState`s, so hardcoded long-lived networks are treated as "no baked
            // blob" and deferred to the other genesis sources.
            genesis_state_bytes: None,
            boot_enr: Vec::new(),
        })
    }

    pub fn genesis_state_summary(&self) -> Option<Result<GenesisStateSummary, String>> {
        self.genesis_state_bytes
            .as_ref()
            .map(|bytes| GenesisStateSummary::decode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_network_is_none() {
        assert!(Eth2NetworkConfig::constant("not-a-real-network").is_none());
    }

    #[test]
    fn decode_round_trips_genesis_time() {
        let mut bytes = vec![0u8; 40];
        bytes[0..8].copy_from_slice(&1_606_824_000u64.to_le_bytes());
        let summary = GenesisStateSummary::decode(&bytes).unwrap();
        assert_eq!(summary.genesis_time, 1_606_824_000);
    }

    #[test]
    fn decode_rejects_short_input() {
        assert!(GenesisStateSummary::decode(&[0u8; 10]).is_err());
    }
}
