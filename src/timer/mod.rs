//! This file implements the microsecond timebase used to time the IEC bus.
//!
//! Two independent counter channels are used, both ticking once per
//! microsecond:
//! - the delay channel, which backs the blocking [`Timebase::delay_us`] and
//!   [`Timebase::delay_ms`], and
//! - the timeout channel, which backs the non-blocking
//!   [`Timebase::start_timeout`] / [`Timebase::has_timed_out`] pair.
//!
//! As they are separate counters, the protocol layer can arm a timeout and
//! then issue short delays while polling for it, without one disturbing the
//! other.
//!
//! There is also a coarse heartbeat, ticking every 10ms by default, for
//! anything which doesn't need microsecond precision.
//!
//! A [`Timebase`] can only be obtained from [`Timebase::init`], which takes
//! ownership of the timer hardware.  It is therefore impossible to use the
//! timers before they are configured, or to configure them twice.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::config::TimerConfig;
use crate::constants::TICKS_PER_US;
use crate::hal::{ChannelId, ControlFlags, CounterChannel, Peripheral, TimerHardware};
use crate::util::log::{log_debug, log_info};

pub mod delay;
pub mod timeout;

pub use timeout::Expired;

/// Convert microseconds to counter ticks, saturating at the width of the
/// compare register.
#[inline(always)]
#[must_use]
pub const fn us_to_ticks(us: u32) -> u32 {
    us.saturating_mul(TICKS_PER_US)
}

/// Owner of the timer hardware, once configured.
pub struct Timebase<H> {
    hw: H,
    config: TimerConfig,
}

impl<H: TimerHardware> Timebase<H> {
    /// Configure the timer hardware and take ownership of it.
    ///
    /// Both counter channels are prescaled to a 1us tick and left running
    /// with no compare value, so neither will match until armed.  The
    /// timeout channel is set to stop itself on match.
    pub fn init(mut hw: H, config: TimerConfig) -> Self {
        for peripheral in Peripheral::ALL {
            hw.power_up(peripheral);
        }

        let prescale = config.prescale();
        for id in ChannelId::ALL {
            let counter = hw.counter(id);
            counter.set_control(ControlFlags::RESET);
            counter.set_prescale(prescale);
            counter.set_compare(0);
            counter.set_count(0);
        }

        hw.counter(ChannelId::Timeout).set_control(
            ControlFlags::RESET | ControlFlags::STOP_ON_MATCH | ControlFlags::CAPTURE_IRQ,
        );
        hw.counter(ChannelId::Delay)
            .set_control(ControlFlags::RESET | ControlFlags::CAPTURE_IRQ);

        // Release reset and start both channels
        for id in ChannelId::ALL {
            hw.counter(id)
                .modify_control(|flags| flags.difference(ControlFlags::RESET) | ControlFlags::ENABLE);
        }

        hw.start_heartbeat(config.heartbeat_period_us());

        log_info!(
            "Timebase initialized: core clock {}MHz, prescale {}, heartbeat {}us",
            config.core_clock_mhz(),
            prescale,
            config.heartbeat_period_us()
        );

        Self { hw, config }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Heartbeat periods elapsed since `init()`.
    pub fn heartbeat_ticks(&mut self) -> u32 {
        self.hw.heartbeat_ticks()
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Stop both channels and hand the hardware back.
    pub fn release(mut self) -> H {
        for id in ChannelId::ALL {
            self.hw
                .counter(id)
                .modify_control(|flags| flags.difference(ControlFlags::ENABLE));
        }
        log_debug!("Timebase released");
        self.hw
    }

    #[cfg(test)]
    pub(crate) fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    // Stop a channel and clear any previous match, then arm it to match
    // after `ticks`.  The channel is stopped before its count and compare
    // are rewritten, so a stale compare can't match part way through.
    #[inline(always)]
    fn arm(&mut self, id: ChannelId, ticks: u32) {
        let counter = self.hw.counter(id);
        counter.modify_control(|flags| flags.difference(ControlFlags::ENABLE | ControlFlags::MATCH));
        counter.set_count(0);
        counter.set_compare(ticks.max(1));
        counter.modify_control(|flags| flags | ControlFlags::ENABLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::{SimClock, SimTimers};

    const CORE_MHZ: u32 = 100;

    fn timebase() -> (SimClock, Timebase<SimTimers>) {
        let clock = SimClock::new();
        let timers = SimTimers::new(clock.clone(), CORE_MHZ * 1_000_000);
        (clock, Timebase::init(timers, TimerConfig::from_mhz(CORE_MHZ)))
    }

    #[test]
    fn init_powers_everything() {
        let (_, timebase) = timebase();
        for peripheral in Peripheral::ALL {
            assert!(timebase.hardware().is_powered(peripheral));
        }
    }

    #[test]
    fn init_prescales_to_1us() {
        let (_, mut timebase) = timebase();
        for id in ChannelId::ALL {
            assert_eq!(timebase.hardware_mut().counter(id).tick_ns(), 1_000);
        }
    }

    #[test]
    fn init_leaves_channels_running_unarmed() {
        let (clock, mut timebase) = timebase();
        clock.advance_us(5_000);

        let timeout = timebase.hardware_mut().counter(ChannelId::Timeout);
        let control = timeout.control();
        assert_eq!(
            control,
            ControlFlags::ENABLE | ControlFlags::STOP_ON_MATCH | ControlFlags::CAPTURE_IRQ
        );
        assert_eq!(timeout.compare(), 0);
        assert!(timeout.count() >= 5_000);

        let delay = timebase.hardware_mut().counter(ChannelId::Delay);
        assert_eq!(
            delay.control(),
            ControlFlags::ENABLE | ControlFlags::CAPTURE_IRQ
        );
        assert_eq!(delay.compare(), 0);
    }

    #[test]
    fn heartbeat_ticks_every_10ms() {
        let (clock, mut timebase) = timebase();
        assert_eq!(timebase.heartbeat_ticks(), 0);
        clock.advance_us(35_000);
        assert_eq!(timebase.heartbeat_ticks(), 3);
    }

    #[test]
    fn custom_heartbeat_period() {
        let clock = SimClock::new();
        let timers = SimTimers::new(clock.clone(), 125_000_000);
        let config = TimerConfig::from_mhz(125)
            .with_heartbeat_period_us(1_000)
            .unwrap();
        let mut timebase = Timebase::init(timers, config);
        clock.advance_us(4_500);
        assert_eq!(timebase.heartbeat_ticks(), 4);
        assert_eq!(timebase.config().prescale(), 124);
    }

    #[test]
    fn release_stops_channels() {
        let (clock, timebase) = timebase();
        let mut timers = timebase.release();
        for id in ChannelId::ALL {
            let counter = timers.counter(id);
            let count = counter.count();
            clock.advance_us(100);
            assert_eq!(counter.count(), count);
            assert!(!counter.control().contains(ControlFlags::ENABLE));
        }
    }

    #[test]
    fn us_to_ticks_saturates() {
        assert_eq!(us_to_ticks(1), 1);
        assert_eq!(us_to_ticks(1_000), 1_000);
        assert_eq!(us_to_ticks(u32::MAX), u32::MAX);
    }
}
