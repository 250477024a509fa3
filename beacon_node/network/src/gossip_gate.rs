//! Sync-state gossip gate (C4): enables or disables the full set of topic subscriptions based on
//! how far behind the chain head the forward synchronizer reports, with hysteresis so the node
//! doesn't flap at the threshold.

use crate::subnet_manager::SubnetManager;
use lighthouse_network::{GossipKind, GossipService};
use types::{ForkDigest, Slot};

pub const SUBSCRIBE_THRESHOLD_SLOTS: u64 = 64;
pub const HYSTERESIS: u64 = 16;

const ALWAYS_ON_KINDS: [GossipKind; 4] = [
    GossipKind::BeaconBlock,
    GossipKind::AttesterSlashing,
    GossipKind::ProposerSlashing,
    GossipKind::VoluntaryExit,
];

/// Evaluated once per slot, at slot end (§4.4). Holds only the boolean that the transition table
/// is defined in terms of; the subnet bookkeeping it drives lives in [`SubnetManager`].
pub struct GossipGate {
    enabled: bool,
}

impl Default for GossipGate {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl GossipGate {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Applies the transition table and performs the corresponding subscribe/unsubscribe, if
    /// any. `current_slot` is used only for the upper-bound underflow guard (§4.4, §9's open
    /// question about its reliability at low slots).
    pub async fn evaluate<G: GossipService>(
        &mut self,
        sync_queue_len: u64,
        current_slot: Slot,
        gossip: &G,
        fork_digest: ForkDigest,
        subnets: &mut SubnetManager<G>,
    ) {
        if !self.enabled && sync_queue_len < SUBSCRIBE_THRESHOLD_SLOTS {
            self.add_message_handlers(gossip, fork_digest, subnets).await;
            self.enabled = true;
        } else if self.enabled {
            let upper_guard = 2 * current_slot.as_u64();
            let lower = SUBSCRIBE_THRESHOLD_SLOTS + HYSTERESIS;
            if lower < sync_queue_len && sync_queue_len < upper_guard {
                self.remove_message_handlers(gossip, fork_digest, subnets).await;
                self.enabled = false;
            }
        }
    }

    async fn add_message_handlers<G: GossipService>(
        &self,
        gossip: &G,
        fork_digest: ForkDigest,
        subnets: &mut SubnetManager<G>,
    ) {
        let always_on = lighthouse_network::subscribe_all(gossip, fork_digest, ALWAYS_ON_KINDS);
        let aggregate = lighthouse_network::subscribe_all(
            gossip,
            fork_digest,
            [GossipKind::AggregateAndProof],
        );
        let initial = {
            let current: Vec<_> = subnets
                .state()
                .subscribed_subnets
                .iter()
                .flatten()
                .copied()
                .collect();
            lighthouse_network::subscribe_subnets(gossip, fork_digest, current)
        };
        futures::join!(always_on, aggregate, initial);
    }

    async fn remove_message_handlers<G: GossipService>(
        &self,
        gossip: &G,
        fork_digest: ForkDigest,
        subnets: &mut SubnetManager<G>,
    ) {
        let always_on = lighthouse_network::unsubscribe_all(gossip, fork_digest, ALWAYS_ON_KINDS);
        let aggregate = lighthouse_network::unsubscribe_all(
            gossip,
            fork_digest,
            [GossipKind::AggregateAndProof],
        );
        let current: Vec<_> = subnets
            .state()
            .subscribed_subnets
            .iter()
            .flatten()
            .copied()
            .collect();
        let subnet_unsub = lighthouse_network::unsubscribe_subnets(gossip, fork_digest, current);
        futures::join!(always_on, aggregate, subnet_unsub);
        subnets.clear_rotation_buckets();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use lighthouse_network::{GossipTopic, ValidationResult};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;
    use types::ChainSpec;

    struct MockGossip {
        subscribed: Mutex<HashSet<String>>,
    }

    impl MockGossip {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                subscribed: Mutex::new(HashSet::new()),
            })
        }
    }

    #[async_trait]
    impl GossipService for MockGossip {
        async fn subscribe(&self, topic: GossipTopic) -> Result<(), String> {
            self.subscribed.lock().insert(topic.to_string());
            Ok(())
        }

        async fn unsubscribe(&self, topic: GossipTopic) -> Result<(), String> {
            self.subscribed.lock().remove(&topic.to_string());
            Ok(())
        }

        fn register_validator(
            &self,
            _kind: GossipKind,
            _validator: Box<dyn Fn(&[u8]) -> ValidationResult + Send + Sync>,
        ) {
        }
    }

    #[tokio::test]
    async fn enables_below_threshold_and_subscribes() {
        let gossip = MockGossip::new();
        let mut subnets = SubnetManager::new(ChainSpec::minimal(), gossip.clone(), ForkDigest::default());
        let mut gate = GossipGate::default();

        gate.evaluate(10, Slot::new(100), &*gossip, ForkDigest::default(), &mut subnets)
            .await;

        assert!(gate.is_enabled());
        assert!(!gossip.subscribed.lock().is_empty());
    }

    #[tokio::test]
    async fn strict_greater_than_at_exact_boundary_stays_enabled() {
        let gossip = MockGossip::new();
        let mut subnets = SubnetManager::new(ChainSpec::minimal(), gossip.clone(), ForkDigest::default());
        let mut gate = GossipGate::default();
        gate.evaluate(0, Slot::new(100), &*gossip, ForkDigest::default(), &mut subnets)
            .await;
        assert!(gate.is_enabled());

        // Property 10: syncQueueLen = 80 while enabled remains enabled (80 < 80 is false).
        gate.evaluate(80, Slot::new(100), &*gossip, ForkDigest::default(), &mut subnets)
            .await;
        assert!(gate.is_enabled());
    }

    #[tokio::test]
    async fn disables_past_hysteresis_and_clears_subnets() {
        let gossip = MockGossip::new();
        let mut subnets = SubnetManager::new(ChainSpec::minimal(), gossip.clone(), ForkDigest::default());
        let mut gate = GossipGate::default();
        gate.evaluate(0, Slot::new(1000), &*gossip, ForkDigest::default(), &mut subnets)
            .await;
        assert!(gate.is_enabled());

        gate.evaluate(81, Slot::new(1000), &*gossip, ForkDigest::default(), &mut subnets)
            .await;
        assert!(!gate.is_enabled());
        assert!(subnets.state().subscribed_subnets[0].is_empty());
        assert!(subnets.state().subscribed_subnets[1].is_empty());
    }
}
