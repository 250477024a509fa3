use crate::SlotClock;
use std::cmp::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use types::{Slot, GENESIS_SLOT};

/// A signed offset from genesis, with millisecond precision.
///
/// Unlike [`SlotClock`], which only speaks in non-negative `Duration`s since the UNIX epoch,
/// `BeaconTime` can represent "three seconds before genesis" directly — this is what lets
/// [`BeaconClock::from_now`] describe a slot that has already passed without the caller having
/// to special-case the sign themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconTime {
    millis_since_genesis: i128,
}

impl BeaconTime {
    pub fn from_millis(millis_since_genesis: i128) -> Self {
        Self {
            millis_since_genesis,
        }
    }

    pub fn zero() -> Self {
        Self::from_millis(0)
    }

    /// True iff this instant is at or after genesis.
    pub fn is_after_genesis(&self) -> bool {
        self.millis_since_genesis >= 0
    }

    /// Converts to a non-negative `Duration`, clamping negative offsets to zero. Used wherever a
    /// "time until slot N" reading feeds a timer (`tokio::time::sleep` cannot take a negative
    /// duration).
    pub fn saturating_duration(&self) -> Duration {
        if self.millis_since_genesis <= 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(self.millis_since_genesis as u64)
        }
    }

    /// Splits this instant into `(after_genesis, slot)`, where `slot` is clamped to
    /// [`GENESIS_SLOT`] when `self` is prior to genesis.
    pub fn to_slot(&self, slot_duration: Duration) -> (bool, Slot) {
        if self.millis_since_genesis < 0 {
            return (false, GENESIS_SLOT);
        }
        let slot_millis = slot_duration.as_millis() as i128;
        if slot_millis == 0 {
            return (true, GENESIS_SLOT);
        }
        let slot = (self.millis_since_genesis / slot_millis) as u64;
        (true, Slot::new(slot))
    }
}

impl PartialOrd for BeaconTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.millis_since_genesis.cmp(&other.millis_since_genesis))
    }
}

impl std::ops::Sub for BeaconTime {
    type Output = BeaconTime;
    fn sub(self, rhs: BeaconTime) -> BeaconTime {
        BeaconTime::from_millis(self.millis_since_genesis - rhs.millis_since_genesis)
    }
}

/// C1: maps wall-time to slots and reports "time until slot N", tolerating a clock that has not
/// yet reached genesis.
///
/// This is the thin, genesis-time-aware wrapper the rest of the orchestration core is built
/// against; the actual duration arithmetic is delegated to an inner [`SlotClock`]
/// implementation (`SystemTimeSlotClock` in production, `ManualSlotClock` in tests).
#[derive(Clone)]
pub struct BeaconClock<T> {
    genesis_time: u64,
    inner: T,
}

impl<T: SlotClock> BeaconClock<T> {
    /// Constructs a clock from a reference `BeaconState`'s `genesis_time` (seconds since the
    /// UNIX epoch) and the network's slot duration.
    pub fn new(genesis_time: u64, slot_duration: Duration) -> Self {
        Self {
            genesis_time,
            inner: T::new(
                GENESIS_SLOT,
                Duration::from_secs(genesis_time),
                slot_duration,
            ),
        }
    }

    pub fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    pub fn slot_clock(&self) -> &T {
        &self.inner
    }

    /// Returns the present instant as a signed offset from genesis. Never fails: prior to
    /// genesis this is simply negative.
    pub fn now(&self) -> BeaconTime {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.beacon_time_of(now)
    }

    fn beacon_time_of(&self, now: Duration) -> BeaconTime {
        let genesis = Duration::from_secs(self.genesis_time);
        let millis = now.as_millis() as i128 - genesis.as_millis() as i128;
        BeaconTime::from_millis(millis)
    }

    /// Returns the signed offset between now and the start of `slot`; negative if `slot` has
    /// already started.
    pub fn from_now(&self, slot: Slot) -> BeaconTime {
        let now = self.now();
        let slot_start_millis =
            slot.as_u64() as i128 * self.inner.slot_duration().as_millis() as i128;
        BeaconTime::from_millis(slot_start_millis) - now
    }

    /// Returns the current slot, or [`GENESIS_SLOT`] if we have not yet reached genesis.
    pub fn slot_or_zero(&self) -> Slot {
        self.inner.now().unwrap_or(GENESIS_SLOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualSlotClock;

    #[test]
    fn from_now_is_negative_for_past_slots() {
        let clock = BeaconClock::<ManualSlotClock>::new(0, Duration::from_secs(12));
        // Pretend 100 slots have elapsed by constructing `now` relative to genesis directly.
        let past = BeaconTime::from_millis(-1);
        assert!(!past.is_after_genesis());
        assert_eq!(past.saturating_duration(), Duration::ZERO);
    }

    #[test]
    fn slot_or_zero_before_genesis() {
        let clock = BeaconClock::<ManualSlotClock>::new(1_000_000_000, Duration::from_secs(12));
        assert_eq!(clock.slot_or_zero(), GENESIS_SLOT);
    }

    #[test]
    fn to_slot_splits_after_genesis() {
        let t = BeaconTime::from_millis(25_000);
        let (after, slot) = t.to_slot(Duration::from_secs(12));
        assert!(after);
        assert_eq!(slot, Slot::new(2));
    }

    #[test]
    fn to_slot_before_genesis_clamps() {
        let t = BeaconTime::from_millis(-5_000);
        let (after, slot) = t.to_slot(Duration::from_secs(12));
        assert!(!after);
        assert_eq!(slot, GENESIS_SLOT);
    }
}
