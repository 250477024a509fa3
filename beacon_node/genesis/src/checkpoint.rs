use crate::GenesisOutcome;
use types::{Hash256, Slot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    StateTooShort { len: usize },
    MissingBlock { state_slot: Slot },
    BlockRootMismatch { expected: Hash256, got: Hash256 },
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::StateTooShort { len } => {
                write!(f, "checkpoint state blob too short ({len} bytes)")
            }
            CheckpointError::MissingBlock { state_slot } => write!(
                f,
                "checkpoint state is at slot {state_slot} but no matching block was supplied"
            ),
            CheckpointError::BlockRootMismatch { expected, got } => write!(
                f,
                "checkpoint block root mismatch: state expects {expected}, block hashes to {got}"
            ),
        }
    }
}

impl std::error::Error for CheckpointError {}

/// Layout: 8 bytes `slot` (LE), 8 bytes `genesis_time` (LE), 32 bytes `genesis_validators_root`,
/// 32 bytes `latest_block_root`. A stand-in for a real SSZ-encoded `BeaconState`.
fn decode_state(bytes: &[u8]) -> Result<(Slot, u64, Hash256, Hash256), CheckpointError> {
    if bytes.len() < 80 {
        return Err(CheckpointError::StateTooShort { len: bytes.len() });
    }
    let slot = Slot::new(u64::from_le_bytes(bytes[0..8].try_into().unwrap()));
    let genesis_time = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    let genesis_validators_root = Hash256::from_slice(&bytes[16..48]);
    let latest_block_root = Hash256::from_slice(&bytes[48..80]);
    Ok((slot, genesis_time, genesis_validators_root, latest_block_root))
}

/// A trivial stand-in for `hash_tree_root(block)`: the real block container is out of scope, so
/// callers pass the bytes they'd otherwise tree-hash and this hashes them directly.
fn block_root(block_bytes: &[u8]) -> Hash256 {
    Hash256::from_slice(&ethereum_hashing::hash(block_bytes))
}

/// Loads genesis state from a user-supplied finalized checkpoint (§4.7 step 2, first and
/// highest-priority source). Per §4.7 step 2: a matching checkpoint block is required unless the
/// state's slot is 0 (i.e. the "checkpoint" is actually genesis itself).
pub fn from_checkpoint(
    state_bytes: &[u8],
    block_bytes: Option<&[u8]>,
) -> Result<GenesisOutcome, CheckpointError> {
    let (slot, genesis_time, genesis_validators_root, latest_block_root) =
        decode_state(state_bytes)?;

    if slot != types::GENESIS_SLOT {
        let block_bytes =
            block_bytes.ok_or(CheckpointError::MissingBlock { state_slot: slot })?;
        let got = block_root(block_bytes);
        if got != latest_block_root {
            return Err(CheckpointError::BlockRootMismatch {
                expected: latest_block_root,
                got,
            });
        }
    }

    Ok(GenesisOutcome {
        genesis_time,
        genesis_validators_root,
        tail_slot: slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_state(slot: u64, genesis_time: u64, gvr: Hash256, block_root: Hash256) -> Vec<u8> {
        let mut out = Vec::with_capacity(80);
        out.extend_from_slice(&slot.to_le_bytes());
        out.extend_from_slice(&genesis_time.to_le_bytes());
        out.extend_from_slice(gvr.as_slice());
        out.extend_from_slice(block_root.as_slice());
        out
    }

    #[test]
    fn genesis_slot_needs_no_block() {
        let state = encode_state(0, 100, Hash256::repeat_byte(1), Hash256::ZERO);
        let outcome = from_checkpoint(&state, None).unwrap();
        assert_eq!(outcome.tail_slot, types::GENESIS_SLOT);
        assert_eq!(outcome.genesis_time, 100);
    }

    #[test]
    fn nonzero_slot_requires_matching_block() {
        let block_bytes = b"a block";
        let root = block_root(block_bytes);
        let state = encode_state(8192, 100, Hash256::repeat_byte(2), root);
        let outcome = from_checkpoint(&state, Some(block_bytes)).unwrap();
        assert_eq!(outcome.tail_slot, Slot::new(8192));
    }

    #[test]
    fn nonzero_slot_without_block_errors() {
        let state = encode_state(8192, 100, Hash256::repeat_byte(2), Hash256::ZERO);
        let err = from_checkpoint(&state, None).unwrap_err();
        assert_eq!(
            err,
            CheckpointError::MissingBlock {
                state_slot: Slot::new(8192)
            }
        );
    }

    #[test]
    fn mismatched_block_root_errors() {
        let state = encode_state(8192, 100, Hash256::repeat_byte(2), Hash256::repeat_byte(9));
        let err = from_checkpoint(&state, Some(b"wrong block")).unwrap_err();
        assert!(matches!(err, CheckpointError::BlockRootMismatch { .. }));
    }
}
