//! Counters on the host's monotonic clock.
//!
//! Used for hosted builds and to check the delay and timeout primitives
//! against real elapsed time.  There are no bus pins on the host - pair
//! these timers with [`SimBus`](super::sim::SimBus) if a bus is needed.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use std::time::Instant;

use super::Clock;
use super::soft::SoftTimers;

/// Nanoseconds since the clock was created, from [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now_ns(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Timer peripherals on the host clock.
pub type HostTimers = SoftTimers<HostClock>;

/// Create a set of host timers, clocked as if by a `core_clock_hz` core.
#[must_use]
pub fn host_timers(core_clock_hz: u32) -> HostTimers {
    SoftTimers::new(HostClock::new(), core_clock_hz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{ChannelId, ControlFlags, CounterChannel, Peripheral, TimerHardware};

    #[test]
    fn clock_is_monotonic() {
        let clock = HostClock::new();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }

    #[test]
    fn counter_tracks_wall_clock() {
        let mut timers = host_timers(1_000_000);
        timers.power_up(Peripheral::DelayCounter);
        let counter = timers.counter(ChannelId::Delay);
        let start = Instant::now();
        counter.set_control(ControlFlags::ENABLE);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let count = counter.count();
        let elapsed_us = u32::try_from(start.elapsed().as_micros()).unwrap();
        assert!(count >= 5_000);
        assert!(count <= elapsed_us);
    }
}
