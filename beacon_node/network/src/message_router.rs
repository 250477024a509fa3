//! Installs gossip validator callbacks that forward payloads to the processor (C8). Installed
//! once at startup and persists across gossip enable/disable cycles (§4.8) -- the gate only
//! subscribes/unsubscribes topics, it never re-registers validators.

use beacon_processor::{BeaconProcessorSend, Work, WorkEvent};
use lighthouse_network::{GossipKind, GossipService, ValidationResult};
use std::sync::Arc;
use types::{ChainSpec, Hash256};

/// Registers one validator per always-on topic kind (§4.8) plus one generic attestation-subnet
/// validator (the gossip substrate dispatches by subnet index internally; the callback itself is
/// subnet-agnostic and reads the index out of the kind it's invoked with).
pub fn install_message_validators<G: GossipService>(gossip: &G, sender: BeaconProcessorSend, spec: &ChainSpec) {
    register_block_validator(gossip, sender.clone());
    register_aggregate_validator(gossip, sender.clone());
    register_attester_slashing_validator(gossip, sender.clone());
    register_proposer_slashing_validator(gossip, sender.clone());
    register_voluntary_exit_validator(gossip, sender.clone());
    for subnet_id in 0..spec.attestation_subnet_count {
        register_attestation_validator(gossip, sender.clone(), subnet_id);
    }
    tracing::info!("gossip message validators installed");
}

fn register_block_validator<G: GossipService>(gossip: &G, sender: BeaconProcessorSend) {
    gossip.register_validator(
        GossipKind::BeaconBlock,
        Box::new(move |payload: &[u8]| {
            let work = Work::GossipBlock {
                peer: Hash256::ZERO,
                block: payload.to_vec(),
            };
            blocking_enqueue(&sender, work)
        }),
    );
}

fn register_aggregate_validator<G: GossipService>(gossip: &G, sender: BeaconProcessorSend) {
    gossip.register_validator(
        GossipKind::AggregateAndProof,
        Box::new(move |payload: &[u8]| {
            let work = Work::GossipAggregate {
                aggregate: payload.to_vec(),
            };
            blocking_enqueue(&sender, work)
        }),
    );
}

fn register_attester_slashing_validator<G: GossipService>(gossip: &G, sender: BeaconProcessorSend) {
    gossip.register_validator(
        GossipKind::AttesterSlashing,
        Box::new(move |payload: &[u8]| {
            let work = Work::GossipAttesterSlashing {
                attester_slashing: payload.to_vec(),
            };
            blocking_enqueue(&sender, work)
        }),
    );
}

fn register_proposer_slashing_validator<G: GossipService>(gossip: &G, sender: BeaconProcessorSend) {
    gossip.register_validator(
        GossipKind::ProposerSlashing,
        Box::new(move |payload: &[u8]| {
            let work = Work::GossipProposerSlashing {
                proposer_slashing: payload.to_vec(),
            };
            blocking_enqueue(&sender, work)
        }),
    );
}

fn register_voluntary_exit_validator<G: GossipService>(gossip: &G, sender: BeaconProcessorSend) {
    gossip.register_validator(
        GossipKind::VoluntaryExit,
        Box::new(move |payload: &[u8]| {
            let work = Work::GossipVoluntaryExit {
                voluntary_exit: payload.to_vec(),
            };
            blocking_enqueue(&sender, work)
        }),
    );
}

fn register_attestation_validator<G: GossipService>(
    gossip: &G,
    sender: BeaconProcessorSend,
    subnet_id: types::SubnetId,
) {
    gossip.register_validator(
        GossipKind::Attestation(subnet_id),
        Box::new(move |payload: &[u8]| {
            let work = Work::GossipAttestation {
                subnet_id,
                attestation: payload.to_vec(),
            };
            blocking_enqueue(&sender, work)
        }),
    );
}

/// The gossip substrate calls validators synchronously (§4.8): we enqueue the item and return
/// `Ignore` immediately rather than blocking on the processor's verdict, since the processor
/// queue is the authoritative accept/reject path and its own verdict is reported back via the
/// work item's result channel, not this call's return value. A full queue degrades to `Ignore`
/// rather than panicking -- backpressure here must never crash the gossip substrate.
fn blocking_enqueue(sender: &BeaconProcessorSend, work: Work) -> ValidationResult {
    match sender.try_send(WorkEvent::fire_and_forget(work)) {
        Ok(()) => ValidationResult::Ignore,
        Err(e) => {
            tracing::warn!(%e, "beacon processor queue full, dropping gossip message");
            ValidationResult::Ignore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lighthouse_network::GossipTopic;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingGossip {
        validators: Mutex<Vec<GossipKind>>,
    }

    #[async_trait]
    impl GossipService for RecordingGossip {
        async fn subscribe(&self, _topic: GossipTopic) -> Result<(), String> {
            Ok(())
        }
        async fn unsubscribe(&self, _topic: GossipTopic) -> Result<(), String> {
            Ok(())
        }
        fn register_validator(
            &self,
            kind: GossipKind,
            _validator: Box<dyn Fn(&[u8]) -> ValidationResult + Send + Sync>,
        ) {
            self.validators.lock().push(kind);
        }
    }

    #[tokio::test]
    async fn installs_one_validator_per_subnet_plus_always_on_kinds() {
        let rt = tokio::runtime::Handle::current();
        let (executor, _signal, _rx) = task_executor::build(rt);
        struct NullProcessor(AtomicUsize);
        impl beacon_processor::Processor for NullProcessor {
            fn process_gossip_block(&self, _b: &[u8]) -> ValidationResult {
                self.0.fetch_add(1, Ordering::SeqCst);
                ValidationResult::Accept
            }
            fn process_gossip_attestation(&self, _s: types::SubnetId, _a: &[u8]) -> ValidationResult {
                ValidationResult::Accept
            }
            fn process_gossip_aggregate(&self, _a: &[u8]) -> ValidationResult {
                ValidationResult::Accept
            }
            fn process_gossip_attester_slashing(&self, _a: &[u8]) -> ValidationResult {
                ValidationResult::Accept
            }
            fn process_gossip_proposer_slashing(&self, _p: &[u8]) -> ValidationResult {
                ValidationResult::Accept
            }
            fn process_gossip_voluntary_exit(&self, _e: &[u8]) -> ValidationResult {
                ValidationResult::Accept
            }
            fn process_rpc_block(&self, _b: &[u8]) {}
            fn update_head(&self, _s: types::Slot) {}
            fn finalized_epoch(&self) -> types::Epoch {
                types::Epoch::new(0)
            }
        }

        let processor = Arc::new(NullProcessor(AtomicUsize::new(0)));
        let sender = beacon_processor::spawn(&executor, processor, || false);
        let gossip = RecordingGossip {
            validators: Mutex::new(Vec::new()),
        };
        let spec = ChainSpec::minimal();

        install_message_validators(&gossip, sender, &spec);

        let installed = gossip.validators.lock();
        assert_eq!(installed.len(), 5 + spec.attestation_subnet_count as usize);
        assert!(installed.contains(&GossipKind::BeaconBlock));
        assert!(installed.contains(&GossipKind::AggregateAndProof));
        assert!(installed.contains(&GossipKind::AttesterSlashing));
        assert!(installed.contains(&GossipKind::ProposerSlashing));
        assert!(installed.contains(&GossipKind::VoluntaryExit));
    }
}
