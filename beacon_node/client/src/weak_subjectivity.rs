//! Weak-subjectivity checkpoint validation (§4.7 step 5): run once at startup, only when the
//! operator supplied a checkpoint root, to reject a sync source that is stale enough for
//! fork-choice equivocations to become plausible.

use types::{ChainSpec, Epoch, Hash256, Slot};

/// A checkpoint supplied out-of-band by the operator (e.g. from a trusted block explorer),
/// distinct from the finalized-checkpoint *state* genesis source (§4.7 step 2): this one only
/// gates staleness, it never itself supplies genesis data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeakSubjectivityCheckpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}

/// `wsp = MIN_VALIDATOR_WITHDRAWABILITY_DELAY + SAFETY_DECAY * Q / 200` (§4.7 step 5), all
/// arithmetic integer with truncation. `active_validators` is the head state's active validator
/// count, which belongs to the state-transition function and is out of scope here -- callers
/// read it off the real `BeaconState` and pass it in.
pub fn weak_subjectivity_period(spec: &ChainSpec, active_validators: u64) -> Epoch {
    let churn_limit_quotient = spec.churn_limit_quotient;
    let min_per_epoch_churn_limit = spec.min_per_epoch_churn_limit.max(1);

    let q = if active_validators >= min_per_epoch_churn_limit.saturating_mul(churn_limit_quotient) {
        churn_limit_quotient
    } else {
        active_validators / min_per_epoch_churn_limit
    };

    let decay = spec.safety_decay.saturating_mul(q) / 200;
    Epoch::new(spec.min_validator_withdrawability_delay.as_u64() + decay)
}

/// `is_within_weak_subjectivity_period(currentSlot, headState, checkpoint)` (§4.7 step 5):
/// whether `current_slot` still falls within `wsp` epochs of the checkpoint.
pub fn is_within_weak_subjectivity_period(
    spec: &ChainSpec,
    current_slot: Slot,
    active_validators: u64,
    checkpoint: &WeakSubjectivityCheckpoint,
) -> bool {
    let wsp = weak_subjectivity_period(spec, active_validators);
    let checkpoint_slot = checkpoint.epoch.start_slot(spec.slots_per_epoch);
    let window_end = checkpoint_slot.as_u64() + wsp.as_u64() * spec.slots_per_epoch;
    current_slot.as_u64() <= window_end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_active_validators_uses_only_the_withdrawability_delay() {
        let spec = ChainSpec::mainnet();
        let wsp = weak_subjectivity_period(&spec, 0);
        assert_eq!(wsp, spec.min_validator_withdrawability_delay);
    }

    #[test]
    fn large_validator_set_caps_q_at_churn_limit_quotient() {
        let spec = ChainSpec::mainnet();
        let huge = spec.min_per_epoch_churn_limit * spec.churn_limit_quotient * 10;
        let wsp = weak_subjectivity_period(&spec, huge);
        let expected_decay = spec.safety_decay * spec.churn_limit_quotient / 200;
        assert_eq!(
            wsp,
            Epoch::new(spec.min_validator_withdrawability_delay.as_u64() + expected_decay)
        );
    }

    #[test]
    fn checkpoint_at_slot_8192_passes_when_within_window() {
        let spec = ChainSpec::mainnet();
        let checkpoint = WeakSubjectivityCheckpoint {
            epoch: Epoch::new(8192 / spec.slots_per_epoch),
            root: Hash256::ZERO,
        };
        // current_slot - checkpoint_slot <= wsp * slots_per_epoch with zero active validators.
        let wsp = weak_subjectivity_period(&spec, 0);
        let current_slot = Slot::new(8192 + wsp.as_u64() * spec.slots_per_epoch);
        assert!(is_within_weak_subjectivity_period(
            &spec,
            current_slot,
            0,
            &checkpoint
        ));
    }

    #[test]
    fn checkpoint_fails_once_past_the_window() {
        let spec = ChainSpec::mainnet();
        let checkpoint = WeakSubjectivityCheckpoint {
            epoch: Epoch::new(8192 / spec.slots_per_epoch),
            root: Hash256::ZERO,
        };
        let wsp = weak_subjectivity_period(&spec, 0);
        let stale_slot = Slot::new(8192 + wsp.as_u64() * spec.slots_per_epoch + 1);
        assert!(!is_within_weak_subjectivity_period(
            &spec,
            stale_slot,
            0,
            &checkpoint
        ));
    }
}
