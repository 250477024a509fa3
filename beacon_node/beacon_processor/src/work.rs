use lighthouse_network::ValidationResult;
use types::{Hash256, SubnetId};

/// The kinds of work the chain/DAG boundary (the `Processor` trait) can be asked to perform.
/// Mirrors the message types the gossip router (C8) and RPC handlers hand off -- never the
/// internal state-transition logic itself, which lives behind [`Processor`].
#[derive(Debug, Clone)]
pub enum Work {
    GossipBlock { peer: Hash256, block: Vec<u8> },
    GossipAttestation { subnet_id: SubnetId, attestation: Vec<u8> },
    GossipAggregate { aggregate: Vec<u8> },
    GossipAttesterSlashing { attester_slashing: Vec<u8> },
    GossipProposerSlashing { proposer_slashing: Vec<u8> },
    GossipVoluntaryExit { voluntary_exit: Vec<u8> },
    RpcBlock { block: Vec<u8> },
}

impl Work {
    pub fn label(&self) -> &'static str {
        match self {
            Work::GossipBlock { .. } => "gossip_block",
            Work::GossipAttestation { .. } => "gossip_attestation",
            Work::GossipAggregate { .. } => "gossip_aggregate",
            Work::GossipAttesterSlashing { .. } => "gossip_attester_slashing",
            Work::GossipProposerSlashing { .. } => "gossip_proposer_slashing",
            Work::GossipVoluntaryExit { .. } => "gossip_voluntary_exit",
            Work::RpcBlock { .. } => "rpc_block",
        }
    }

    /// Whether this item should be dropped rather than queued while the node is syncing (§4 /
    /// §7): attestations and aggregates are cheap to lose and numerous during a sync; blocks,
    /// slashings and voluntary exits never are -- they're rare and each one matters.
    pub fn drop_during_sync(&self) -> bool {
        matches!(
            self,
            Work::GossipAttestation { .. } | Work::GossipAggregate { .. }
        )
    }
}

/// A unit of work paired with the result channel the gossip layer needs to apply the libp2p
/// validation decision (accept / reject / ignore).
pub struct WorkEvent {
    pub work: Work,
    pub result_tx: Option<tokio::sync::oneshot::Sender<ValidationResult>>,
}

impl WorkEvent {
    pub fn new(work: Work, result_tx: tokio::sync::oneshot::Sender<ValidationResult>) -> Self {
        Self {
            work,
            result_tx: Some(result_tx),
        }
    }

    pub fn fire_and_forget(work: Work) -> Self {
        Self {
            work,
            result_tx: None,
        }
    }
}
