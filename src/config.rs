//! This file contains board configuration - the bus pin assignments, the
//! output driver fitted, and the clocks the timebase is built from.
//!
//! The source code serves as the master list of pin assignments for the
//! supported boards, see [`boards`].

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

use crate::bus::{BusLine, OutputDriver};
use crate::constants::{
    HEARTBEAT_PERIOD_US, MIN_HEARTBEAT_PERIOD_US, PICO_CORE_CLOCK_MHZ, PICO2_CORE_CLOCK_MHZ,
    TICK_HZ, TOTAL_GPIOS,
};

/// Configuration errors, reported before any hardware is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Core clock in Hz is not a whole number of MHz, so no prescale gives
    /// an exact 1us tick
    CoreClockNotWholeMhz(u32),
    /// Core clock in Hz is below the tick rate
    CoreClockTooSlow(u32),
    /// Heartbeat period in us is too short
    HeartbeatTooShort(u32),
    /// GPIO assigned to more than one line
    DuplicatePin(u8),
    /// GPIO doesn't exist
    PinOutOfRange(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::CoreClockNotWholeMhz(hz) => {
                write!(f, "core clock {hz}Hz is not a whole number of MHz")
            }
            ConfigError::CoreClockTooSlow(hz) => {
                write!(f, "core clock {hz}Hz is below {TICK_HZ}Hz")
            }
            ConfigError::HeartbeatTooShort(us) => write!(
                f,
                "heartbeat period {us}us is shorter than {MIN_HEARTBEAT_PERIOD_US}us"
            ),
            ConfigError::DuplicatePin(pin) => write!(f, "GPIO {pin} assigned more than once"),
            ConfigError::PinOutOfRange(pin) => {
                write!(f, "GPIO {pin} out of range (max {})", TOTAL_GPIOS - 1)
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Clock configuration for [`Timebase`](crate::Timebase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    core_clock_hz: u32,
    heartbeat_period_us: u32,
}

impl TimerConfig {
    /// Build a configuration for a core clocked at `mhz`, with the default
    /// heartbeat period.
    ///
    /// # Panics
    /// If `mhz` is zero or too large to express in Hz.  Intended for
    /// constants, where this fails the build.
    #[must_use]
    pub const fn from_mhz(mhz: u32) -> Self {
        assert!(mhz > 0 && mhz <= u32::MAX / TICK_HZ, "invalid core clock");
        Self {
            core_clock_hz: mhz * TICK_HZ,
            heartbeat_period_us: HEARTBEAT_PERIOD_US,
        }
    }

    /// Build a configuration from a core clock read at runtime, e.g. from
    /// `embassy_rp::clocks::clk_sys_freq()`.
    pub const fn from_hz(hz: u32) -> Result<Self, ConfigError> {
        if hz < TICK_HZ {
            return Err(ConfigError::CoreClockTooSlow(hz));
        }
        if hz % TICK_HZ != 0 {
            return Err(ConfigError::CoreClockNotWholeMhz(hz));
        }
        Ok(Self {
            core_clock_hz: hz,
            heartbeat_period_us: HEARTBEAT_PERIOD_US,
        })
    }

    /// Change the heartbeat period.
    pub const fn with_heartbeat_period_us(self, period_us: u32) -> Result<Self, ConfigError> {
        if period_us < MIN_HEARTBEAT_PERIOD_US {
            return Err(ConfigError::HeartbeatTooShort(period_us));
        }
        Ok(Self {
            heartbeat_period_us: period_us,
            ..self
        })
    }

    /// Prescale which turns the core clock into a 1us tick.
    #[must_use]
    pub const fn prescale(&self) -> u32 {
        self.core_clock_hz / TICK_HZ - 1
    }

    #[must_use]
    pub const fn core_clock_hz(&self) -> u32 {
        self.core_clock_hz
    }

    #[must_use]
    pub const fn core_clock_mhz(&self) -> u32 {
        self.core_clock_hz / TICK_HZ
    }

    #[must_use]
    pub const fn heartbeat_period_us(&self) -> u32 {
        self.heartbeat_period_us
    }
}

/// IEC bus pin configuration.  Each line is a pair of GPIOs - one input
/// reading the bus, one output driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusPinConfig {
    pub clock_in: u8,
    pub clock_out: u8,
    pub data_in: u8,
    pub data_out: u8,
    pub atn_in: u8,
    pub atn_out: u8,
    pub srq_in: u8,
    pub srq_out: u8,
}

impl BusPinConfig {
    /// The (input, output) GPIO pair for `line`.
    #[must_use]
    pub const fn pins_for(&self, line: BusLine) -> (u8, u8) {
        match line {
            BusLine::Atn => (self.atn_in, self.atn_out),
            BusLine::Clock => (self.clock_in, self.clock_out),
            BusLine::Data => (self.data_in, self.data_out),
            BusLine::Srq => (self.srq_in, self.srq_out),
        }
    }

    /// Check every pin exists and none is used twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut used = [false; TOTAL_GPIOS as usize];
        for pin in self {
            let slot = used
                .get_mut(usize::from(pin))
                .ok_or(ConfigError::PinOutOfRange(pin))?;
            if *slot {
                return Err(ConfigError::DuplicatePin(pin));
            }
            *slot = true;
        }
        Ok(())
    }
}

/// Iterates over every GPIO in the configuration, inputs and outputs.
impl IntoIterator for &BusPinConfig {
    type Item = u8;
    type IntoIter = core::array::IntoIter<u8, 8>;

    fn into_iter(self) -> Self::IntoIter {
        [
            self.clock_in,
            self.clock_out,
            self.data_in,
            self.data_out,
            self.atn_in,
            self.atn_out,
            self.srq_in,
            self.srq_out,
        ]
        .into_iter()
    }
}

/// Everything needed to bring up the bus and timebase on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub bus_pins: BusPinConfig,
    pub driver: OutputDriver,
    pub timer: TimerConfig,
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bus_pins.validate()
    }
}

/// Default board configuration
impl Default for BoardConfig {
    fn default() -> Self {
        #[cfg(not(feature = "pico2"))]
        {
            boards::pico1541_v0_1()
        }

        #[cfg(feature = "pico2")]
        {
            boards::pico2_1541_v0_1()
        }
    }
}

/// Configurations for supported boards
pub mod boards {
    use super::*;

    // Pinout used for pico1541 v0.1 board
    const PICO1541_BUS_PINS: BusPinConfig = BusPinConfig {
        clock_in: 19,
        clock_out: 11,
        data_in: 20,
        data_out: 13,
        atn_in: 17,
        atn_out: 12,
        srq_in: 16,
        srq_out: 14,
    };

    /// pico1541 v0.1 fitted with a Pico.  Outputs drive the bus through a
    /// 7406 inverter.
    #[must_use]
    pub const fn pico1541_v0_1() -> BoardConfig {
        BoardConfig {
            bus_pins: PICO1541_BUS_PINS,
            driver: OutputDriver::Inverting,
            timer: TimerConfig::from_mhz(PICO_CORE_CLOCK_MHZ),
        }
    }

    /// pico1541 v0.1 fitted with a Pico 2.
    #[must_use]
    pub const fn pico2_1541_v0_1() -> BoardConfig {
        BoardConfig {
            bus_pins: PICO1541_BUS_PINS,
            driver: OutputDriver::Inverting,
            timer: TimerConfig::from_mhz(PICO2_CORE_CLOCK_MHZ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prescale_gives_1us_tick() {
        assert_eq!(TimerConfig::from_mhz(100).prescale(), 99);
        assert_eq!(TimerConfig::from_mhz(125).prescale(), 124);
        assert_eq!(TimerConfig::from_mhz(1).prescale(), 0);
        assert_eq!(TimerConfig::from_hz(150_000_000).unwrap().prescale(), 149);
    }

    #[test]
    fn from_hz_rejects_bad_clocks() {
        assert_eq!(
            TimerConfig::from_hz(999_999),
            Err(ConfigError::CoreClockTooSlow(999_999))
        );
        assert_eq!(
            TimerConfig::from_hz(133_333_333),
            Err(ConfigError::CoreClockNotWholeMhz(133_333_333))
        );
    }

    #[test]
    fn heartbeat_period() {
        let config = TimerConfig::from_mhz(125);
        assert_eq!(config.heartbeat_period_us(), HEARTBEAT_PERIOD_US);

        let config = config.with_heartbeat_period_us(1_000).unwrap();
        assert_eq!(config.heartbeat_period_us(), 1_000);
        assert_eq!(config.core_clock_hz(), 125_000_000);

        assert_eq!(
            config.with_heartbeat_period_us(999),
            Err(ConfigError::HeartbeatTooShort(999))
        );
    }

    #[test]
    fn boards_validate() {
        let pico = boards::pico1541_v0_1();
        assert!(pico.validate().is_ok());
        assert_eq!(pico.timer.core_clock_mhz(), PICO_CORE_CLOCK_MHZ);
        assert_eq!(pico.driver, OutputDriver::Inverting);

        let pico2 = boards::pico2_1541_v0_1();
        assert!(pico2.validate().is_ok());
        assert_eq!(pico2.timer.core_clock_mhz(), PICO2_CORE_CLOCK_MHZ);
        assert_eq!(pico2.bus_pins, pico.bus_pins);

        assert!(BoardConfig::default().validate().is_ok());
    }

    #[test]
    fn pins_for_each_line() {
        let pins = boards::pico1541_v0_1().bus_pins;
        assert_eq!(pins.pins_for(BusLine::Clock), (19, 11));
        assert_eq!(pins.pins_for(BusLine::Data), (20, 13));
        assert_eq!(pins.pins_for(BusLine::Atn), (17, 12));
        assert_eq!(pins.pins_for(BusLine::Srq), (16, 14));
        assert_eq!(pins.into_iter().count(), 8);
    }

    #[test]
    fn duplicate_pin_rejected() {
        let mut pins = boards::pico1541_v0_1().bus_pins;
        pins.srq_out = pins.atn_in;
        assert_eq!(pins.validate(), Err(ConfigError::DuplicatePin(17)));
    }

    #[test]
    fn out_of_range_pin_rejected() {
        let mut pins = boards::pico1541_v0_1().bus_pins;
        pins.data_in = TOTAL_GPIOS;
        assert_eq!(pins.validate(), Err(ConfigError::PinOutOfRange(TOTAL_GPIOS)));
    }

    #[test]
    fn errors_display() {
        assert_eq!(
            ConfigError::DuplicatePin(4).to_string(),
            "GPIO 4 assigned more than once"
        );
        assert_eq!(
            ConfigError::PinOutOfRange(40).to_string(),
            "GPIO 40 out of range (max 29)"
        );
    }
}
