//! The node orchestration core's network-facing components: the quarantine/backfill loop (C2),
//! the attestation-subnet manager (C3), the gossip gate (C4), the slot scheduler (C5), the
//! second-ticker wiring (C6), and the gossip message router (C8). Lifecycle/bootstrap (C7) lives
//! in the `client` crate, which owns and wires together everything here.

pub mod duties;
pub mod gossip_gate;
pub mod message_router;
pub mod quarantine;
pub mod second_tick;
pub mod slot_scheduler;
pub mod subnet_manager;

pub use duties::{NoValidators, ValidatorDuties};
pub use gossip_gate::GossipGate;
pub use message_router::install_message_validators;
pub use quarantine::{NullRequestManager, Quarantine, RequestManager};
pub use second_tick::QuarantineTickHandler;
pub use slot_scheduler::SlotScheduler;
pub use subnet_manager::{SubnetManager, SubnetState};
