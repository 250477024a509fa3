//! Attestation-subnet subscription management (C3). Owns the set of subscribed subnets, rotates
//! them per epoch as validator committee assignments change, and keeps the advertised metadata
//! bitfield consistent with the live subscription set (Invariant A) under a strictly-increasing
//! sequence number (Invariant B).
//!
//! Exclusively mutated from the slot scheduler's call chain (§5): no two `cycle` invocations, or
//! a `cycle` and an `initial_subscribe`, ever interleave.

use crate::duties::ValidatorDuties;
use lighthouse_network::{GossipKind, GossipService};
use rand::Rng;
use std::collections::HashSet;
use types::{ChainSpec, Epoch, ForkDigest, SubnetId};

/// Live subscription bookkeeping, mutated only through [`SubnetManager`]'s methods.
#[derive(Debug, Clone)]
pub struct SubnetState {
    /// Two rotation buckets, indexed by epoch parity (§3).
    pub subscribed_subnets: [HashSet<SubnetId>; 2],
    pub stability_subnet: SubnetId,
    pub stability_subnet_expiration_epoch: Epoch,
    /// `advertisedAttnets[i]` iff `i` is subscribed via either bucket or is the stability subnet.
    pub advertised_attnets: Vec<bool>,
    pub seq_number: u64,
}

impl SubnetState {
    fn new(subnet_count: u64) -> Self {
        Self {
            subscribed_subnets: [HashSet::new(), HashSet::new()],
            stability_subnet: 0,
            stability_subnet_expiration_epoch: Epoch::new(0),
            advertised_attnets: vec![false; subnet_count as usize],
            seq_number: 0,
        }
    }

    /// Invariant A (§3, §8 property 1): the advertised bitfield exactly mirrors the union of
    /// both rotation buckets plus the stability subnet.
    pub fn assert_invariant_a(&self) {
        let union: HashSet<SubnetId> = self.subscribed_subnets[0]
            .union(&self.subscribed_subnets[1])
            .copied()
            .chain(std::iter::once(self.stability_subnet))
            .collect();
        for (i, &bit) in self.advertised_attnets.iter().enumerate() {
            let expected = union.contains(&(i as SubnetId));
            assert_eq!(
                bit, expected,
                "invariant A violated at subnet {i}: advertised={bit}, expected={expected}"
            );
        }
    }

    fn set_bit(&mut self, subnet: SubnetId, value: bool) -> bool {
        let slot = &mut self.advertised_attnets[subnet as usize];
        let changed = *slot != value;
        *slot = value;
        changed
    }
}

pub struct SubnetManager<G> {
    spec: ChainSpec,
    gossip: std::sync::Arc<G>,
    fork_digest: ForkDigest,
    state: SubnetState,
}

impl<G: GossipService> SubnetManager<G> {
    pub fn new(spec: ChainSpec, gossip: std::sync::Arc<G>, fork_digest: ForkDigest) -> Self {
        let state = SubnetState::new(spec.attestation_subnet_count);
        Self {
            spec,
            gossip,
            fork_digest,
            state,
        }
    }

    pub fn state(&self) -> &SubnetState {
        &self.state
    }

    /// `stabilityLength()`: a jittered duration so that not every node on the network reshuffles
    /// its stability subnet on the same epoch boundary.
    fn stability_length(&self) -> u64 {
        let base = self.spec.epochs_per_subnet_subscription.max(1);
        rand::rng().random_range(base..=2 * base)
    }

    /// Subscribes to every attestation subnet plus the aggregate-and-proofs topic, and seeds a
    /// fresh stability subnet (§4.3 `initialSubscribe`).
    pub async fn initial_subscribe(&mut self, current_epoch: Epoch) {
        let count = self.spec.attestation_subnet_count;
        let all: HashSet<SubnetId> = (0..count).collect();

        lighthouse_network::subscribe_subnets(&*self.gossip, self.fork_digest, all.iter().copied())
            .await;
        lighthouse_network::subscribe_all(
            &*self.gossip,
            self.fork_digest,
            [GossipKind::AggregateAndProof],
        )
        .await;

        self.state.subscribed_subnets = [all.clone(), all];
        self.state.stability_subnet = rand::rng().random_range(0..count);
        self.state.stability_subnet_expiration_epoch =
            Epoch::new(current_epoch.as_u64() + self.stability_length());
        self.state.seq_number += 1;
        for i in 0..count as usize {
            self.state.advertised_attnets[i] = true;
        }

        self.state.assert_invariant_a();
    }

    /// Idempotent subscribe for an arbitrary subnet set (§4.3 `installHandlers`). Subscribing to
    /// an already-subscribed subnet is a no-op at the transport level; this does not touch
    /// `advertised_attnets` or `seq_number` on its own -- callers that want the bitfield/seq kept
    /// in sync use [`SubnetManager::cycle`].
    pub async fn install_handlers(&self, subnets: impl IntoIterator<Item = SubnetId> + Send) {
        lighthouse_network::subscribe_subnets(&*self.gossip, self.fork_digest, subnets).await;
    }

    /// Rotates subscriptions for the first slot of `epoch` (§4.3 `cycle`). A no-op, per the edge
    /// policy, when no validators are attached -- the node keeps whatever it had (typically the
    /// initial full fan-out) until the gossip gate closes it.
    pub async fn cycle<D: ValidatorDuties>(&mut self, epoch: Epoch, duties: &D) {
        if duties.attached_validator_count() == 0 {
            return;
        }

        let next_epoch = Epoch::new(epoch.as_u64() + 1);
        let required_current = duties.subnets_for_epoch(epoch);
        let required_next = duties.subnets_for_epoch(next_epoch);
        let required_union: HashSet<SubnetId> = required_current
            .union(&required_next)
            .copied()
            .collect();

        let prior_union: HashSet<SubnetId> = self.state.subscribed_subnets[0]
            .union(&self.state.subscribed_subnets[1])
            .copied()
            .collect();

        let stability = self.state.stability_subnet;
        let newly_joined: HashSet<SubnetId> = required_union
            .difference(&prior_union)
            .copied()
            .collect();
        let expiring: HashSet<SubnetId> = prior_union
            .difference(&required_union)
            .filter(|s| **s != stability)
            .copied()
            .collect();

        // Step 1: unsubscribe expiring subnets first.
        lighthouse_network::unsubscribe_subnets(
            &*self.gossip,
            self.fork_digest,
            expiring.iter().copied(),
        )
        .await;

        // Step 2: bump seq, then clear the corresponding bits, iff anything is actually expiring.
        if !expiring.is_empty() {
            self.state.seq_number += 1;
            for &s in &expiring {
                self.state.set_bit(s, false);
            }
        }

        // Step 3: install handlers for newly-joined subnets, then set bits and bump seq iff the
        // bitfield actually changed.
        self.install_handlers(newly_joined.iter().copied()).await;
        if !newly_joined.is_empty() {
            let mut changed = false;
            for &s in &newly_joined {
                changed |= self.state.set_bit(s, true);
            }
            if changed {
                self.state.seq_number += 1;
            }
        }

        self.state.subscribed_subnets[epoch.parity()] = required_current;
        self.state.subscribed_subnets[next_epoch.parity()] = required_next;

        if epoch >= self.state.stability_subnet_expiration_epoch {
            self.reshuffle_stability_subnet(epoch).await;
        }

        self.state.assert_invariant_a();
    }

    async fn reshuffle_stability_subnet(&mut self, current_epoch: Epoch) {
        let count = self.spec.attestation_subnet_count;
        let old = self.state.stability_subnet;
        let new = rand::rng().random_range(0..count);
        if new == old {
            return;
        }

        let still_needed = self.state.subscribed_subnets[0].contains(&old)
            || self.state.subscribed_subnets[1].contains(&old);
        if !still_needed {
            lighthouse_network::unsubscribe_subnets(&*self.gossip, self.fork_digest, [old]).await;
            self.state.seq_number += 1;
            self.state.set_bit(old, false);
        }

        self.install_handlers([new]).await;
        self.state.stability_subnet = new;
        if self.state.set_bit(new, true) {
            self.state.seq_number += 1;
        }
        self.state.stability_subnet_expiration_epoch =
            Epoch::new(current_epoch.as_u64() + self.stability_length());
    }

    /// Clears both rotation buckets, leaving only the stability subnet advertised. Called by the
    /// gossip gate's `removeMessageHandlers` (§4.4).
    pub fn clear_rotation_buckets(&mut self) {
        let stability = self.state.stability_subnet;
        let cleared: HashSet<SubnetId> = self.state.subscribed_subnets[0]
            .union(&self.state.subscribed_subnets[1])
            .copied()
            .filter(|s| *s != stability)
            .collect();
        self.state.subscribed_subnets = [HashSet::new(), HashSet::new()];
        if !cleared.is_empty() {
            self.state.seq_number += 1;
            for s in cleared {
                self.state.set_bit(s, false);
            }
        }
        self.state.assert_invariant_a();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lighthouse_network::{GossipTopic, ValidationResult};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use types::Slot;

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

    struct FixedDuties {
        count: usize,
        by_epoch: std::collections::HashMap<u64, HashSet<SubnetId>>,
    }

    #[async_trait]
    impl ValidatorDuties for FixedDuties {
        fn attached_validator_count(&self) -> usize {
            self.count
        }

        fn subnets_for_epoch(&self, epoch: Epoch) -> HashSet<SubnetId> {
            self.by_epoch.get(&epoch.as_u64()).cloned().unwrap_or_default()
        }

        async fn handle(&self, _last_slot: Slot, _wall_slot: Slot) {}
    }

    fn test_spec() -> ChainSpec {
        ChainSpec::minimal()
    }

    #[tokio::test]
    async fn initial_subscribe_sets_full_fanout() {
        let gossip = MockGossip::new();
        let mut mgr = SubnetManager::new(test_spec(), gossip, ForkDigest::default());
        mgr.initial_subscribe(Epoch::new(0)).await;
        assert!(mgr.state().advertised_attnets.iter().all(|&b| b));
        assert_eq!(mgr.state().seq_number, 1);
    }

    #[tokio::test]
    async fn cycle_is_noop_without_validators() {
        let gossip = MockGossip::new();
        let mut mgr = SubnetManager::new(test_spec(), gossip, ForkDigest::default());
        mgr.initial_subscribe(Epoch::new(0)).await;
        let before = mgr.state().clone();
        mgr.cycle(Epoch::new(1), &FixedDuties { count: 0, by_epoch: Default::default() })
            .await;
        assert_eq!(mgr.state().seq_number, before.seq_number);
        assert_eq!(
            mgr.state().subscribed_subnets,
            before.subscribed_subnets
        );
    }

    #[tokio::test]
    async fn cycle_rotates_subnets_and_preserves_invariant_a() {
        let gossip = MockGossip::new();
        let mut mgr = SubnetManager::new(test_spec(), gossip, ForkDigest::default());
        // Start from a clean slate (no initial full fan-out) to isolate the diff behavior.
        mgr.state.stability_subnet = 0;
        mgr.state.advertised_attnets[0] = true;

        let mut by_epoch = std::collections::HashMap::new();
        by_epoch.insert(1, HashSet::from([3u64]));
        by_epoch.insert(2, HashSet::from([1u64]));
        let duties = FixedDuties { count: 1, by_epoch };

        mgr.state.subscribed_subnets[1] = HashSet::from([3u64]);
        mgr.state.advertised_attnets[3] = true;

        mgr.cycle(Epoch::new(1), &duties).await;

        mgr.state().assert_invariant_a();
        assert!(mgr.state().advertised_attnets[1]);
        assert!(!mgr.state().advertised_attnets[3] || mgr.state().subscribed_subnets.iter().any(|s| s.contains(&3)));
    }
}
