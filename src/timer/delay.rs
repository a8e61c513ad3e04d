//! Blocking delays on the delay channel.
//!
//! These spin on the channel's MATCH flag, so the caller never yields.  Use
//! them where timing is critical - bus settling, bit setup and hold times.
//! For anything longer, arm a timeout and poll it instead.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embedded_hal::delay::DelayNs;

use super::{Timebase, us_to_ticks};
use crate::constants::{BUS_SETTLE_US, US_PER_MS};
use crate::hal::{ChannelId, ControlFlags, CounterChannel, TimerHardware};

impl<H: TimerHardware> Timebase<H> {
    /// Block for at least `us` microseconds.
    #[inline(always)]
    pub fn delay_us(&mut self, us: u32) {
        debug_assert!(us > 0, "zero length delay");
        self.delay_ticks(us_to_ticks(us));
    }

    /// Block for at least `ms` milliseconds.  Durations beyond the range of
    /// the counter are clamped to it.
    pub fn delay_ms(&mut self, ms: u32) {
        debug_assert!(ms > 0, "zero length delay");
        self.delay_ticks(us_to_ticks(ms.saturating_mul(US_PER_MS)));
    }

    /// Briefly delay in order to let the bus lines settle.
    #[inline(always)]
    pub fn settle(&mut self) {
        self.delay_us(BUS_SETTLE_US);
    }

    #[inline(always)]
    fn delay_ticks(&mut self, ticks: u32) {
        self.arm(ChannelId::Delay, ticks);

        let counter = self.hw.counter(ChannelId::Delay);
        while !counter.control().contains(ControlFlags::MATCH) {}

        counter.modify_control(|flags| flags.difference(ControlFlags::ENABLE));
    }
}

/// Zero length delays return immediately.  Nanosecond delays are rounded up
/// to the next whole microsecond.
impl<H: TimerHardware> DelayNs for Timebase<H> {
    fn delay_ns(&mut self, ns: u32) {
        if ns > 0 {
            self.delay_ticks(us_to_ticks(ns.div_ceil(1_000)));
        }
    }

    fn delay_us(&mut self, us: u32) {
        if us > 0 {
            self.delay_ticks(us_to_ticks(us));
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        if ms > 0 {
            self.delay_ticks(us_to_ticks(ms.saturating_mul(US_PER_MS)));
        }
    }
}
