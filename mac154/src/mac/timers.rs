//! The typed timer table.
//!
//! Every wait in the MAC is expressed as an armed timer plus a later
//! continuation; the [`Timeout`] enum names the continuation and carries
//! the data it needs. The table is serviced from the task loop.

use heapless::Vec;

use crate::time::{Duration, Instant};

/// The timer continuations of the MAC engine.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// The beacon interval elapsed; transmit the prepared beacon.
    Beacon,
    /// The beacon preparation lead time was reached; rebuild the beacon.
    BeaconPreparation,
    /// The active portion of the superframe ended.
    SuperframeEnd,
    /// The contention access period ended; enter the CFP.
    CapEnd,
    /// The given CFP slot begins.
    GtsSlot(u8),
    /// The association response wait time elapsed.
    ResponseWait,
    /// The poll wait time elapsed without a data response.
    PollWait,
    /// The per-channel scan duration elapsed.
    ScanDuration,
    /// Indirect transactions are due for aging.
    DataPersistence,
    /// The requested receiver-on window ended.
    RxEnable,
    /// Too many parent beacons were missed.
    MissedBeacon,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    timeout: Timeout,
    deadline: Instant,
}

/// Error returned when an absolute deadline already passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePassed;

const MAX_TIMERS: usize = 12;

/// The set of armed timers, serviced from `wpan_task`.
#[derive(Default)]
pub(crate) struct TimerTable {
    armed: Vec<Entry, MAX_TIMERS>,
}

impl TimerTable {
    /// Arm `timeout` to fire `delay` after `now`, replacing any armed
    /// timer of the same kind.
    pub fn arm_after(&mut self, timeout: Timeout, now: Instant, delay: Duration) {
        self.stop(timeout);
        // The table is sized for every timer kind, so the push cannot
        // fail after the removal above.
        let _ = self.armed.push(Entry {
            timeout,
            deadline: now + delay,
        });
    }

    /// Arm `timeout` to fire at the absolute `deadline`, replacing any
    /// armed timer of the same kind. Fails when the deadline is not in
    /// the future, so callers can retry with a later one.
    pub fn arm_at(
        &mut self,
        timeout: Timeout,
        now: Instant,
        deadline: Instant,
    ) -> Result<(), DeadlinePassed> {
        if deadline <= now {
            return Err(DeadlinePassed);
        }

        self.stop(timeout);
        let _ = self.armed.push(Entry { timeout, deadline });
        Ok(())
    }

    /// Stop the armed timer equal to `timeout`, if any.
    pub fn stop(&mut self, timeout: Timeout) {
        if let Some(index) = self.armed.iter().position(|e| e.timeout == timeout) {
            self.armed.remove(index);
        }
    }

    /// Stop every armed timer.
    pub fn stop_all(&mut self) {
        self.armed.clear();
    }

    /// Query whether a timer of the given kind is armed.
    pub fn is_armed(&self, timeout: Timeout) -> bool {
        self.armed.iter().any(|e| e.timeout == timeout)
    }

    /// Remove and return the earliest timer that is due at `now`.
    pub fn next_due(&mut self, now: Instant) -> Option<Timeout> {
        let mut due: Option<(usize, Instant)> = None;

        for (index, entry) in self.armed.iter().enumerate() {
            if entry.deadline <= now && due.map_or(true, |(_, d)| entry.deadline < d) {
                due = Some((index, entry.deadline));
            }
        }

        due.map(|(index, _)| self.armed.remove(index).timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_and_expire() {
        let mut timers = TimerTable::default();
        let now = Instant::from_us(0);

        timers.arm_after(Timeout::ScanDuration, now, Duration::from_us(100));
        timers.arm_after(Timeout::PollWait, now, Duration::from_us(50));

        assert_eq!(timers.next_due(now), None);
        assert_eq!(
            timers.next_due(Instant::from_us(60)),
            Some(Timeout::PollWait)
        );
        assert_eq!(timers.next_due(Instant::from_us(60)), None);
        assert_eq!(
            timers.next_due(Instant::from_us(100)),
            Some(Timeout::ScanDuration)
        );
    }

    #[test]
    fn rearm_replaces() {
        let mut timers = TimerTable::default();
        let now = Instant::from_us(0);

        timers.arm_after(Timeout::Beacon, now, Duration::from_us(100));
        timers.arm_after(Timeout::Beacon, now, Duration::from_us(500));

        assert_eq!(timers.next_due(Instant::from_us(200)), None);
        assert_eq!(timers.next_due(Instant::from_us(500)), Some(Timeout::Beacon));
    }

    #[test]
    fn distinct_gts_slots_coexist() {
        let mut timers = TimerTable::default();
        let now = Instant::from_us(0);

        timers.arm_after(Timeout::GtsSlot(10), now, Duration::from_us(100));
        timers.arm_after(Timeout::GtsSlot(12), now, Duration::from_us(200));

        assert_eq!(
            timers.next_due(Instant::from_us(100)),
            Some(Timeout::GtsSlot(10))
        );
        assert_eq!(
            timers.next_due(Instant::from_us(200)),
            Some(Timeout::GtsSlot(12))
        );
    }

    #[test]
    fn absolute_deadline_in_past_fails() {
        let mut timers = TimerTable::default();
        let now = Instant::from_us(1_000);

        assert_eq!(
            timers.arm_at(Timeout::Beacon, now, Instant::from_us(500)),
            Err(DeadlinePassed)
        );
        assert!(timers
            .arm_at(Timeout::Beacon, now, Instant::from_us(1_500))
            .is_ok());
    }
}
