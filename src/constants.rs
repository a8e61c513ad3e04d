//! This module contains constants for pico2iec.
//!
//! Timing constants are expressed in microseconds unless the name says
//! otherwise, as that is the tick of both counter channels.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use static_assertions::const_assert;

//
// Timebase
//

/// Rate every counter channel is prescaled to by `Timebase::init`.
pub const TICK_HZ: u32 = 1_000_000;

/// Counter ticks per microsecond.
pub const TICKS_PER_US: u32 = TICK_HZ / 1_000_000;

/// Microseconds per millisecond, used when converting `delay_ms` and
/// `start_timeout_ms` durations to ticks.
pub const US_PER_MS: u32 = 1_000;

/// Default period of the coarse system heartbeat.  This matches the 10ms
/// SysTick used by sd2iec.
pub const HEARTBEAT_PERIOD_US: u32 = 10_000;

/// The heartbeat is coarse by definition - anything faster than this should
/// be using one of the microsecond channels instead.
pub const MIN_HEARTBEAT_PERIOD_US: u32 = 1_000;

/// Brief delay to let the bus lines settle after a change, before reading
/// them back.
pub const BUS_SETTLE_US: u32 = 2;

//
// Platform clocks
//

/// Default system clock of the Pico (RP2040).
pub const PICO_CORE_CLOCK_MHZ: u32 = 125;

/// Default system clock of the Pico 2 (RP235x).
pub const PICO2_CORE_CLOCK_MHZ: u32 = 150;

/// Number of GPIOs on the RP2040/RP235xA, numbered 0 to 29.
pub const TOTAL_GPIOS: u8 = 30;

const_assert!(TICKS_PER_US == 1);
const_assert!(HEARTBEAT_PERIOD_US >= MIN_HEARTBEAT_PERIOD_US);
const_assert!(HEARTBEAT_PERIOD_US % US_PER_MS == 0);
const_assert!(BUS_SETTLE_US > 0);

// The Cortex-M SysTick reload register is 24 bits wide, so the heartbeat
// must fit within it at the fastest supported core clock.
const_assert!(PICO2_CORE_CLOCK_MHZ * HEARTBEAT_PERIOD_US <= 0x00FF_FFFF);

pub mod iec {
    //! A set of low-level IEC bus timings, taken from xum1541.  All are in
    //! us.  These are the windows the protocol layer times with
    //! `start_timeout()` and `delay_us()`.

    /// Max ATN response required time
    pub const IEC_T_AT: u32 = 1000;

    /// Typical non-EOI response to RFD time
    pub const IEC_T_NE: u32 = 40;

    /// Min talker bit setup time (70 typical)
    pub const IEC_T_S: u32 = 20;

    /// Min data valid time (20 typical)
    pub const IEC_T_V: u32 = 20;

    /// Max frame handshake time (20 typical)
    pub const IEC_T_F: u32 = 1000;

    /// Min frame to release of ATN time
    pub const IEC_T_R: u32 = 20;

    /// Min time between bytes
    pub const IEC_T_BB: u32 = 100;

    /// Min EOI response time (250 typical)
    pub const IEC_T_YE: u32 = 200;

    /// Min EOI response hold time
    pub const IEC_T_EI: u32 = 60;

    /// Max talker response limit (30 typical)
    pub const IEC_T_RY: u32 = 60;

    /// Min byte acknowledge hold time (30 typical)
    pub const IEC_T_PR: u32 = 20;

    /// Min talk-attention ack hold time
    pub const IEC_T_DA: u32 = 80;

    /// Min EOI acknowledge time
    pub const IEC_T_FR: u32 = 60;
}
