//! Hardware capabilities used by the bus and timer components.
//!
//! The register layout of the board is hidden behind these traits, so the
//! rest of the crate never touches a register directly.  A board hands an
//! implementation of [`BusPins`] to [`IecBus`](crate::IecBus), and an
//! implementation of [`TimerHardware`] to [`Timebase`](crate::Timebase).
//!
//! Backends:
//! - [`soft`] - a register-accurate counter model driven by any [`Clock`].
//! - [`sim`] - a simulated register file and wired-AND bus, on a virtual
//!   clock.  Used by the tests.
//! - [`host`] - counters on the host's monotonic clock.
//! - `rp` - Raspberry Pi Pico pins, embassy-time and SysTick.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use bitflags::bitflags;

use crate::bus::BusLine;

pub mod soft;

#[cfg(any(test, feature = "std"))]
pub mod host;
#[cfg(any(test, feature = "std"))]
pub mod sim;

#[cfg(feature = "rp")]
pub mod rp;

/// Physical level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[must_use]
    pub const fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }

    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

/// Access to the output latch and input register bits of the four bus
/// lines.  Implementations deal purely in physical levels - the polarity of
/// the bus is applied by [`IecBus`](crate::IecBus).
pub trait BusPins {
    /// Write the output register bit for `line`.
    fn set_output(&mut self, line: BusLine, level: Level);

    /// Read back the output register bit for `line`.
    fn output(&self, line: BusLine) -> Level;

    /// Read the input register bit for `line`.  This is the level actually
    /// present on the bus.
    fn input(&self, line: BusLine) -> Level;

    /// Force the pin register bit for `line` high, bypassing the output
    /// latch.  Only used for SRQ strobes.
    fn force_input_high(&mut self, line: BusLine);
}

bitflags! {
    /// Control register of a counter channel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u32 {
        /// Counter is counting.
        const ENABLE = 1 << 0;
        /// Counter is held at zero.
        const RESET = 1 << 1;
        /// Clear ENABLE when the count reaches the compare value.
        const STOP_ON_MATCH = 1 << 2;
        /// Set by the hardware when the count reaches the compare value.
        const MATCH = 1 << 3;
        /// Capture interrupts enabled (consumed by the protocol layer).
        const CAPTURE_IRQ = 1 << 4;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControlFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ControlFlags({=u32:#x})", self.bits());
    }
}

/// The two independent microsecond counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelId {
    /// Channel A - armed by `start_timeout()`, stops itself on match.
    Timeout,

    /// Channel B - used by the blocking delays.
    Delay,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::Timeout, ChannelId::Delay];

    /// The peripheral that must be powered for this channel to count.
    #[must_use]
    pub const fn peripheral(self) -> Peripheral {
        match self {
            ChannelId::Timeout => Peripheral::TimeoutCounter,
            ChannelId::Delay => Peripheral::DelayCounter,
        }
    }
}

/// Peripherals which are power/clock gated until `Timebase::init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    TimeoutCounter = 0,
    DelayCounter,
    Heartbeat,
}

impl Peripheral {
    pub const ALL: [Peripheral; 3] = [
        Peripheral::TimeoutCounter,
        Peripheral::DelayCounter,
        Peripheral::Heartbeat,
    ];
}

/// Registers of a single counter channel.
///
/// While ENABLE is set and RESET is clear the count increments once per
/// tick, where a tick is `prescale + 1` core clock cycles.  When the count
/// reaches a non-zero compare value MATCH is set, and if STOP_ON_MATCH is
/// set ENABLE is cleared and the count holds.
///
/// Reads take `&mut self` as the registers are volatile.
pub trait CounterChannel {
    fn set_prescale(&mut self, prescale: u32);
    fn control(&mut self) -> ControlFlags;
    fn set_control(&mut self, flags: ControlFlags);
    fn count(&mut self) -> u32;
    fn set_count(&mut self, count: u32);
    fn compare(&mut self) -> u32;
    fn set_compare(&mut self, compare: u32);

    /// Read-modify-write of the control register.
    fn modify_control<F>(&mut self, f: F)
    where
        F: FnOnce(ControlFlags) -> ControlFlags,
    {
        let flags = self.control();
        self.set_control(f(flags));
    }
}

/// The timer peripherals of a board.
pub trait TimerHardware {
    type Counter: CounterChannel;

    /// Enable power and clock to a peripheral.
    fn power_up(&mut self, peripheral: Peripheral);

    /// Access one of the counter channels.
    fn counter(&mut self, id: ChannelId) -> &mut Self::Counter;

    /// Start the coarse heartbeat with the given period.
    fn start_heartbeat(&mut self, period_us: u32);

    /// Number of heartbeat periods since `start_heartbeat()`.
    fn heartbeat_ticks(&mut self) -> u32;
}

/// A monotonic time source, in nanoseconds from an arbitrary origin.
pub trait Clock {
    fn now_ns(&self) -> u64;
}
