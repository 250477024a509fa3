//! Gossip topic identity: the vocabulary the subnet manager, gossip gate, and message router
//! (C3/C4/C8) speak when they ask the transport to subscribe or unsubscribe.
//!
//! The transport itself — the libp2p swarm, gossipsub scoring, discv5 discovery — is out of
//! scope for the orchestration core and lives behind [`crate::GossipService`].

use std::fmt;
use types::{ForkDigest, SubnetId};

/// One of the gossip topics the node subscribes to as a fixed set, independent of subnet
/// rotation (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GossipKind {
    BeaconBlock,
    AttesterSlashing,
    ProposerSlashing,
    VoluntaryExit,
    AggregateAndProof,
    Attestation(SubnetId),
}

impl fmt::Display for GossipKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GossipKind::BeaconBlock => write!(f, "beacon_block"),
            GossipKind::AttesterSlashing => write!(f, "attester_slashing"),
            GossipKind::ProposerSlashing => write!(f, "proposer_slashing"),
            GossipKind::VoluntaryExit => write!(f, "voluntary_exit"),
            GossipKind::AggregateAndProof => write!(f, "beacon_aggregate_and_proof"),
            GossipKind::Attestation(subnet_id) => write!(f, "beacon_attestation_{subnet_id}"),
        }
    }
}

/// A fully-qualified gossip topic: `/<fork_digest>/<kind>/ssz_snappy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GossipTopic {
    pub fork_digest: ForkDigest,
    pub kind: GossipKind,
}

impl GossipTopic {
    pub fn new(fork_digest: ForkDigest, kind: GossipKind) -> Self {
        Self { fork_digest, kind }
    }
}

impl fmt::Display for GossipTopic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "/{}/{}/ssz_snappy", self.fork_digest, self.kind)
    }
}

/// A discovered peer's self-reported node record. The real type wraps `discv5::enr::Enr`; the
/// full discovery/ENR-update machinery is part of the p2p transport and out of scope here.
pub type Enr = discv5::enr::Enr<discv5::enr::CombinedKey>;

/// Result returned synchronously to the gossip substrate by a message validator (C8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Accept,
    Reject,
    Ignore,
}

/// How far behind the chain head the forward synchronizer believes it is, and whether it is
/// actively range-syncing. Read by the gossip gate and the second ticker's missing-block
/// check; written by the (out-of-scope) `SyncManager`.
pub trait SyncStatus: Send + Sync {
    /// Estimated number of slots between the current head and the target head.
    fn sync_queue_len(&self) -> u64;
    /// True while a forward (non-backfill) sync is actively running.
    fn is_syncing(&self) -> bool;
}

/// A `SyncStatus` backed by two atomics rather than a live `SyncManager`. The real range-sync
/// state machine is out of scope for this core; this is what a binary that hasn't wired one up
/// yet reports instead, and it's also handy for driving the gossip gate/second ticker from a
/// test or an admin RPC without standing up a fake sync manager each time.
pub struct StaticSyncStatus {
    sync_queue_len: std::sync::atomic::AtomicU64,
    is_syncing: std::sync::atomic::AtomicBool,
}

impl StaticSyncStatus {
    pub fn new(sync_queue_len: u64, is_syncing: bool) -> Self {
        Self {
            sync_queue_len: std::sync::atomic::AtomicU64::new(sync_queue_len),
            is_syncing: std::sync::atomic::AtomicBool::new(is_syncing),
        }
    }

    pub fn not_syncing() -> Self {
        Self::new(0, false)
    }

    pub fn set_sync_queue_len(&self, len: u64) {
        self.sync_queue_len.store(len, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn set_is_syncing(&self, syncing: bool) {
        self.is_syncing.store(syncing, std::sync::atomic::Ordering::Relaxed);
    }
}

impl SyncStatus for StaticSyncStatus {
    fn sync_queue_len(&self) -> u64 {
        self.sync_queue_len.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn is_syncing(&self) -> bool {
        self.is_syncing.load(std::sync::atomic::Ordering::Relaxed)
    }
}
