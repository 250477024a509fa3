use crate::SlotClock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use types::Slot;

/// A wall-clock-backed [`SlotClock`], and the implementation actually wired up in production.
///
/// Intentionally panics never: `now()` returning `None` is how "we are prior to genesis" is
/// represented, and monotonicity of `SystemTime` is *not* assumed (NTP can step the clock
/// backwards). The [`crate::BeaconClock`]/slot-scheduler layer is what turns a clock regression
/// into a handled event rather than a crash.
#[derive(Clone)]
pub struct SystemTimeSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    slot_duration: Duration,
}

impl SystemTimeSlotClock {
    fn duration_since_unix_epoch() -> Option<Duration> {
        SystemTime::now().duration_since(UNIX_EPOCH).ok()
    }
}

impl SlotClock for SystemTimeSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        if slot_duration.as_millis() == 0 {
            panic!("SystemTimeSlotClock cannot have a < 1ms slot duration");
        }

        Self {
            genesis_slot,
            genesis_duration,
            slot_duration,
        }
    }

    fn now(&self) -> Option<Slot> {
        self.now_duration().and_then(|now| self.slot_of(now))
    }

    fn is_prior_to_genesis(&self) -> Option<bool> {
        Self::duration_since_unix_epoch().map(|now| now < self.genesis_duration)
    }

    fn now_duration(&self) -> Option<Duration> {
        Self::duration_since_unix_epoch()
    }

    fn slot_of(&self, now: Duration) -> Option<Slot> {
        let since_genesis = now.checked_sub(self.genesis_duration)?;
        let slot = since_genesis.as_millis() / self.slot_duration.as_millis();
        Some(Slot::from(slot as u64) + self.genesis_slot)
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        let now = self.now_duration()?;
        self.duration_to_slot(self.slot_of(now).unwrap_or(self.genesis_slot) + 1)
            .or_else(|| self.genesis_duration.checked_sub(now))
    }

    fn duration_to_next_epoch(&self, slots_per_epoch: u64) -> Option<Duration> {
        let now = self.now_duration()?;
        if now < self.genesis_duration {
            return self.genesis_duration.checked_sub(now);
        }
        let next_epoch_start = (self.slot_of(now)?.epoch(slots_per_epoch) + 1)
            .start_slot(slots_per_epoch);
        self.duration_to_slot(next_epoch_start)
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn duration_to_slot(&self, slot: Slot) -> Option<Duration> {
        let now = self.now_duration()?;
        self.start_of(slot)?.checked_sub(now)
    }

    fn start_of(&self, slot: Slot) -> Option<Duration> {
        let slots_since_genesis: u32 = slot
            .as_u64()
            .checked_sub(self.genesis_slot.as_u64())?
            .try_into()
            .ok()?;
        let offset = self.slot_duration.checked_mul(slots_since_genesis)?;
        self.genesis_duration.checked_add(offset)
    }

    fn genesis_slot(&self) -> Slot {
        self.genesis_slot
    }

    fn genesis_duration(&self) -> Duration {
        self.genesis_duration
    }
}
