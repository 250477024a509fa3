//! Minimal slice of the consensus `types` crate: the slot/epoch arithmetic, chain-spec
//! constants, and gossip-identity types that the node orchestration core (client/network/timer)
//! is built against. The full SSZ container zoo (`BeaconState`, `BeaconBlock`, operations, etc.)
//! belongs to the state-transition function, which is out of scope for this core.

mod chain_spec;
mod fork_digest;
mod slot_epoch;

pub use chain_spec::ChainSpec;
pub use fork_digest::ForkDigest;
pub use slot_epoch::{Epoch, Slot, FAR_FUTURE_EPOCH, GENESIS_EPOCH, GENESIS_SLOT};

/// 32-byte root/hash type used throughout, e.g. block roots and `genesis_validators_root`.
pub type Hash256 = alloy_primitives::B256;

/// Index of an attestation subnet, `0..ATTESTATION_SUBNET_COUNT`.
pub type SubnetId = u64;

/// Validator registry index.
pub type ValidatorIndex = u64;
