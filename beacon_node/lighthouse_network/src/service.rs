//! The interface boundary to the p2p/gossip transport (out of scope for this core).
//!
//! Everything downstream of [`GossipService`] — libp2p swarm driving, gossipsub peer scoring,
//! discv5 discovery, ENR signing — belongs to the real network stack and is exercised only
//! through this trait, so that the subnet manager, gossip gate, and message router can be tested
//! without a live swarm.

use crate::types::{Enr, GossipKind, GossipTopic, ValidationResult};
use async_trait::async_trait;
use types::{ForkDigest, SubnetId};

/// Subscribe/unsubscribe and message-validator registration, as seen by C3/C4/C8.
///
/// All subscribe/unsubscribe calls are suspension points (§5): the caller must `await` them to
/// completion before reasoning about the resulting subscription state, and their failure is
/// always logged-and-continued, never propagated as fatal (§7).
#[async_trait]
pub trait GossipService: Send + Sync {
    async fn subscribe(&self, topic: GossipTopic) -> Result<(), String>;
    async fn unsubscribe(&self, topic: GossipTopic) -> Result<(), String>;

    /// Registers the synchronous validator callback invoked by the gossip substrate for every
    /// message received on `kind`, across every fork digest. Installed once (C8) and persists
    /// across enable/disable cycles; re-registering the same kind is a no-op.
    fn register_validator(
        &self,
        kind: GossipKind,
        validator: Box<dyn Fn(&[u8]) -> ValidationResult + Send + Sync>,
    );
}

/// Convenience helpers built only from the trait above.
pub async fn subscribe_all<G: GossipService + ?Sized>(
    service: &G,
    fork_digest: ForkDigest,
    kinds: impl IntoIterator<Item = GossipKind> + Send,
) {
    for kind in kinds {
        if let Err(e) = service.subscribe(GossipTopic::new(fork_digest, kind)).await {
            tracing::warn!(%e, %kind, "failed to subscribe to gossip topic");
        }
    }
}

pub async fn unsubscribe_all<G: GossipService + ?Sized>(
    service: &G,
    fork_digest: ForkDigest,
    kinds: impl IntoIterator<Item = GossipKind> + Send,
) {
    for kind in kinds {
        if let Err(e) = service.unsubscribe(GossipTopic::new(fork_digest, kind)).await {
            tracing::warn!(%e, %kind, "failed to unsubscribe from gossip topic");
        }
    }
}

pub async fn subscribe_subnets<G: GossipService + ?Sized>(
    service: &G,
    fork_digest: ForkDigest,
    subnets: impl IntoIterator<Item = SubnetId> + Send,
) {
    subscribe_all(
        service,
        fork_digest,
        subnets.into_iter().map(GossipKind::Attestation),
    )
    .await
}

pub async fn unsubscribe_subnets<G: GossipService + ?Sized>(
    service: &G,
    fork_digest: ForkDigest,
    subnets: impl IntoIterator<Item = SubnetId> + Send,
) {
    unsubscribe_all(
        service,
        fork_digest,
        subnets.into_iter().map(GossipKind::Attestation),
    )
    .await
}

/// A [`GossipService`] that accepts every subscribe/unsubscribe call and never calls a
/// registered validator. Used wherever a live libp2p swarm isn't wired up: the orchestration
/// core's own test doubles aside, this is the one a production binary reaches for when it has no
/// real transport to drive, e.g. during early bring-up or in a configuration with gossip
/// permanently disabled.
#[derive(Default)]
pub struct NullGossipService;

#[async_trait]
impl GossipService for NullGossipService {
    async fn subscribe(&self, _topic: GossipTopic) -> Result<(), String> {
        Ok(())
    }

    async fn unsubscribe(&self, _topic: GossipTopic) -> Result<(), String> {
        Ok(())
    }

    fn register_validator(
        &self,
        _kind: GossipKind,
        _validator: Box<dyn Fn(&[u8]) -> ValidationResult + Send + Sync>,
    ) {
    }
}

/// Node-wide networking state shared by read-only observers: the local ENR and sync status.
/// Mutation of the ENR's `attnets`/`seq_number` fields is the subnet manager's job; this struct
/// only exposes the current value for the metadata RPC and ENR-update dispatch.
pub struct NetworkGlobals {
    pub local_enr: parking_lot::RwLock<Option<Enr>>,
}

impl NetworkGlobals {
    pub fn new() -> Self {
        Self {
            local_enr: parking_lot::RwLock::new(None),
        }
    }

    pub fn local_enr(&self) -> Option<Enr> {
        self.local_enr.read().clone()
    }
}

impl Default for NetworkGlobals {
    fn default() -> Self {
        Self::new()
    }
}
