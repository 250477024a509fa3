//! Maps wall-clock time to slots and back.
//!
//! The [`SlotClock`] trait is the low-level, duration-based primitive: every node component that
//! needs to reason about "what slot is it" or "how long until slot N" goes through an
//! implementation of it rather than reading the system clock directly, so that tests can swap in
//! [`ManualSlotClock`] and drive the whole orchestration core without sleeping.
//!
//! [`BeaconClock`] and [`BeaconTime`] are the higher-level wrapper described as the node's "C1"
//! component: a `BeaconTime` is a *signed* offset from genesis (it can be negative, pre-genesis),
//! whereas `SlotClock` itself only speaks in non-negative durations since the UNIX epoch.

mod beacon_clock;
mod manual_slot_clock;
mod system_time_slot_clock;

use std::time::Duration;
use types::Slot;

pub use crate::beacon_clock::{BeaconClock, BeaconTime};
pub use manual_slot_clock::ManualSlotClock;
pub use system_time_slot_clock::SystemTimeSlotClock;

/// A clock that reports the current slot.
///
/// The `new`, `now`, `duration_to_next_slot` and `duration_to_next_epoch` methods are the only
/// ones required to build a fully functioning `SlotClock`.
///
/// ## Note
///
/// `SlotClock` is not tied to any particular implementation of time source: `now()` returning
/// `None` always means "prior to genesis", never an error. Implementations must never panic from
/// a clock regression; the slot scheduler is responsible for detecting and handling those.
pub trait SlotClock: Send + Sync + Sized + Clone {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self;

    /// Returns the slot at this moment, or `None` if the genesis time has not yet been reached.
    fn now(&self) -> Option<Slot>;

    /// Returns `Some(true)` if the current wall time is prior to `self.genesis_duration`.
    fn is_prior_to_genesis(&self) -> Option<bool>;

    /// Returns the duration since the UNIX epoch, if available.
    fn now_duration(&self) -> Option<Duration>;

    /// Returns the slot that `now` (a duration since the UNIX epoch) falls within.
    fn slot_of(&self, now: Duration) -> Option<Slot>;

    /// Returns the duration between `now` and the start of the next slot.
    fn duration_to_next_slot(&self) -> Option<Duration>;

    /// Returns the duration between `now` and the start of the next epoch.
    fn duration_to_next_epoch(&self, slots_per_epoch: u64) -> Option<Duration>;

    /// Returns the duration of a single slot.
    fn slot_duration(&self) -> Duration;

    /// Returns the duration from `now` until the start of `slot`, or `None` if `slot` has
    /// already started.
    fn duration_to_slot(&self, slot: Slot) -> Option<Duration>;

    /// Returns the duration between the UNIX epoch and the start of `slot`.
    fn start_of(&self, slot: Slot) -> Option<Duration>;

    fn genesis_slot(&self) -> Slot;

    fn genesis_duration(&self) -> Duration;

    /// Returns the present slot, applying `tolerance` to treat a slot that starts within
    /// `tolerance` in the future as already current (used to absorb scheduling jitter).
    fn now_with_future_tolerance(&self, tolerance: Duration) -> Option<Slot> {
        self.now_duration()
            .and_then(|now| self.slot_of(now + tolerance))
    }

    /// As above, but for a slot that ended within `tolerance` in the past.
    fn now_with_past_tolerance(&self, tolerance: Duration) -> Option<Slot> {
        self.now_duration()
            .and_then(|now| self.slot_of(now.saturating_sub(tolerance)))
    }
}
