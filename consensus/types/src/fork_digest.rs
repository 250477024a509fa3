use ethereum_hashing::hash;
use std::fmt;

/// The 4-byte fork identifier that prefixes every gossip topic name, e.g.
/// `/eth2/<fork_digest>/beacon_block/ssz_snappy`.
///
/// Derived from `hash_tree_root(ForkData{current_version, genesis_validators_root})[..4]`. The
/// real tree-hash computation lives in `state_processing`/`types::ForkData`; this crate exposes
/// a standalone helper so the network layer can compute it without depending on SSZ containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ForkDigest(pub [u8; 4]);

impl ForkDigest {
    pub fn compute(current_version: [u8; 4], genesis_validators_root: [u8; 32]) -> Self {
        let mut preimage = Vec::with_capacity(36);
        preimage.extend_from_slice(&current_version);
        preimage.extend_from_slice(&genesis_validators_root);
        let digest = hash(&preimage);
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest[..4]);
        ForkDigest(out)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ForkDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 4]> for ForkDigest {
    fn from(b: [u8; 4]) -> Self {
        ForkDigest(b)
    }
}
