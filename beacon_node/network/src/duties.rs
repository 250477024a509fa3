//! The validator-duties boundary (out of scope: committee assignment, attestation production,
//! aggregation -- all of which read the `BeaconState` and belong to the state-transition /
//! validator-client side of the system). The slot scheduler (C5) and subnet manager (C3) only
//! need to know which subnets are required for a given epoch and how many validators are
//! attached; everything else is opaque.

use async_trait::async_trait;
use std::collections::HashSet;
use types::{Epoch, Slot, SubnetId};

/// Supplies the per-epoch attestation-subnet requirement and drives per-slot validator duties
/// (attestation production, aggregation, block proposal). Implemented by the validator-client
/// integration, which is out of scope here.
#[async_trait]
pub trait ValidatorDuties: Send + Sync {
    /// Number of validators currently attached to this node. Zero means the subnet manager
    /// retains its initial full-fan-out subscription (§4.3 edge policy).
    fn attached_validator_count(&self) -> usize;

    /// The attestation subnets required by all attached validators' committee assignments for
    /// `epoch`. An empty-validator node returns an empty set; callers only call this when at
    /// least one validator is attached.
    fn subnets_for_epoch(&self, epoch: Epoch) -> HashSet<SubnetId>;

    /// Runs attestation/aggregation/proposal duties spanning `last_slot..=wall_slot`. May
    /// suspend at `.await` points (attestation aggregation windows); the slot scheduler waits for
    /// this to return before continuing (§4.5 step 6, §5).
    async fn handle(&self, last_slot: Slot, wall_slot: Slot);
}

/// A `ValidatorDuties` with no attached validators, used when the node runs in pure beacon-node
/// (no in-process validators) mode.
pub struct NoValidators;

#[async_trait]
impl ValidatorDuties for NoValidators {
    fn attached_validator_count(&self) -> usize {
        0
    }

    fn subnets_for_epoch(&self, _epoch: Epoch) -> HashSet<SubnetId> {
        HashSet::new()
    }

    async fn handle(&self, _last_slot: Slot, _wall_slot: Slot) {}
}
