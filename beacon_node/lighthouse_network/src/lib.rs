//! p2p/gossip transport interface. The swarm, peer scoring, and discovery are out of scope for
//! the node orchestration core; this crate exposes only the subscribe/unsubscribe/validator
//! surface ([`GossipService`]) and the shared read-only network state ([`NetworkGlobals`]) that
//! the core's components are built against.

mod service;
mod types;

pub use service::{
    subscribe_all, subscribe_subnets, unsubscribe_all, unsubscribe_subnets, GossipService,
    NetworkGlobals, NullGossipService,
};
pub use types::{Enr, GossipKind, GossipTopic, StaticSyncStatus, SyncStatus, ValidationResult};
