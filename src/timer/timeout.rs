//! Non-blocking timeouts on the timeout channel.
//!
//! A timeout is armed with [`Timebase::start_timeout`] and then polled with
//! [`Timebase::has_timed_out`], typically alongside checking the state of a
//! bus line.  The channel stops itself when the deadline is reached, so once
//! expired a timeout stays expired until it is armed again.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

use super::{Timebase, us_to_ticks};
use crate::constants::US_PER_MS;
use crate::hal::{ChannelId, ControlFlags, CounterChannel, TimerHardware};
use crate::util::log::{log_debug, log_trace};

/// The deadline passed before the awaited condition became true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Expired;

impl fmt::Display for Expired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("timed out")
    }
}

impl core::error::Error for Expired {}

impl<H: TimerHardware> Timebase<H> {
    /// Arm the timeout to expire `us` microseconds from now, replacing any
    /// timeout already pending.  Returns immediately.
    #[inline(always)]
    pub fn start_timeout(&mut self, us: u32) {
        debug_assert!(us > 0, "zero length timeout");
        self.arm(ChannelId::Timeout, us_to_ticks(us));
        log_trace!("Timeout armed: {}us", us);
    }

    /// Arm the timeout to expire `ms` milliseconds from now.
    pub fn start_timeout_ms(&mut self, ms: u32) {
        debug_assert!(ms > 0, "zero length timeout");
        self.start_timeout(ms.saturating_mul(US_PER_MS));
    }

    /// Returns true once the armed timeout has expired.  Stays true until the
    /// timeout is armed again.  Returns false if no timeout has ever been
    /// armed.
    #[inline(always)]
    pub fn has_timed_out(&mut self) -> bool {
        !self
            .hw
            .counter(ChannelId::Timeout)
            .control()
            .contains(ControlFlags::ENABLE)
    }

    /// Arm a timeout of `us` microseconds, then poll `condition` until it
    /// returns true or the timeout expires.
    ///
    /// The condition is checked once more after expiry, so a condition that
    /// became true right on the deadline still succeeds.
    pub fn wait_until<F>(&mut self, us: u32, mut condition: F) -> Result<(), Expired>
    where
        F: FnMut() -> bool,
    {
        self.start_timeout(us);
        loop {
            // Hard loop, as we want to block anyway
            if condition() {
                break Ok(());
            }

            if self.has_timed_out() {
                if condition() {
                    break Ok(());
                }
                log_debug!("Timed out after {}us", us);
                break Err(Expired);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::config::TimerConfig;
    use crate::constants::iec::{IEC_T_AT, IEC_T_RY};
    use crate::hal::sim::{SimClock, SimTimers};

    fn timebase() -> (SimClock, Timebase<SimTimers>) {
        let clock = SimClock::new();
        let timers = SimTimers::new(clock.clone(), 150_000_000);
        (clock, Timebase::init(timers, TimerConfig::from_mhz(150)))
    }

    #[test]
    fn not_timed_out_before_first_arm() {
        let (clock, mut timebase) = timebase();
        assert!(!timebase.has_timed_out());
        clock.advance_us(1_000_000);
        assert!(!timebase.has_timed_out());
    }

    #[test]
    fn expires_after_duration() {
        let (clock, mut timebase) = timebase();
        timebase.start_timeout(IEC_T_AT);
        assert!(!timebase.has_timed_out());

        clock.advance_us(u64::from(IEC_T_AT) - 1);
        assert!(!timebase.has_timed_out());

        clock.advance_us(1);
        assert!(timebase.has_timed_out());
    }

    #[test]
    fn stays_expired_until_rearmed() {
        let (clock, mut timebase) = timebase();
        timebase.start_timeout(10);
        clock.advance_us(10);
        assert!(timebase.has_timed_out());
        clock.advance_us(1_000_000);
        assert!(timebase.has_timed_out());

        timebase.start_timeout(10);
        assert!(!timebase.has_timed_out());
        clock.advance_us(10);
        assert!(timebase.has_timed_out());
    }

    #[test]
    fn rearm_replaces_pending_timeout() {
        let (clock, mut timebase) = timebase();
        timebase.start_timeout(100);
        clock.advance_us(90);
        timebase.start_timeout(100);
        clock.advance_us(90);
        assert!(!timebase.has_timed_out());
        clock.advance_us(10);
        assert!(timebase.has_timed_out());
    }

    #[test]
    fn rearm_with_shorter_timeout() {
        let (clock, mut timebase) = timebase();
        timebase.start_timeout(1_000);
        clock.advance_us(500);
        timebase.start_timeout(20);
        clock.advance_us(20);
        assert!(timebase.has_timed_out());
    }

    #[test]
    fn expired_channel_holds_compare() {
        let (clock, mut timebase) = timebase();
        timebase.start_timeout(60);
        clock.advance_us(500);
        assert!(timebase.has_timed_out());
        let counter = timebase.hardware_mut().counter(ChannelId::Timeout);
        assert_eq!(counter.count(), 60);
        assert!(counter.control().contains(ControlFlags::MATCH));
    }

    #[test]
    fn start_timeout_ms() {
        let (clock, mut timebase) = timebase();
        timebase.start_timeout_ms(2);
        clock.advance_us(1_999);
        assert!(!timebase.has_timed_out());
        clock.advance_us(1);
        assert!(timebase.has_timed_out());
    }

    #[test]
    fn wait_until_condition_met() {
        let (clock, mut timebase) = timebase();
        let polls = Cell::new(0);
        let result = timebase.wait_until(IEC_T_RY, || {
            polls.set(polls.get() + 1);
            if polls.get() == 5 {
                true
            } else {
                clock.advance_us(1);
                false
            }
        });
        assert_eq!(result, Ok(()));
        assert_eq!(polls.get(), 5);
    }

    #[test]
    fn wait_until_expires() {
        let (clock, mut timebase) = timebase();
        let start = clock.peek_ns();
        let result = timebase.wait_until(IEC_T_RY, || false);
        assert_eq!(result, Err(Expired));
        assert!(clock.peek_ns() - start >= u64::from(IEC_T_RY) * 1_000);
        assert!(timebase.has_timed_out());
    }

    #[test]
    fn wait_until_succeeds_at_deadline() {
        let (clock, mut timebase) = timebase();
        let deadline = clock.peek_ns() + u64::from(IEC_T_RY) * 1_000;
        let result = timebase.wait_until(IEC_T_RY, || clock.peek_ns() >= deadline);
        assert_eq!(result, Ok(()));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "zero length timeout")]
    fn zero_timeout_panics_in_debug() {
        let (_, mut timebase) = timebase();
        timebase.start_timeout(0);
    }

    #[test]
    fn expired_displays() {
        assert_eq!(Expired.to_string(), "timed out");
    }
}
