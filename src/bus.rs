//! This file implements the logical view of the Commodore IEC bus lines.
//!
//! Every line on the bus is open-collector: any device may pull it low, and
//! it only reads high when nobody does.  Callers deal purely in "asserted"
//! (pulled low) and "released" (floating high).  The board's output stage
//! decides which physical level on the MCU pin that corresponds to - see
//! [`OutputDriver`].

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use bitflags::bitflags;

use crate::hal::{BusPins, Level};

// IEC protocol bit masks - these are used by external applications.  RESET
// (0x08) is not one of the lines handled here.
pub const IEC_DATA: u8 = 0x01;
pub const IEC_CLOCK: u8 = 0x02;
pub const IEC_ATN: u8 = 0x04;
pub const IEC_SRQ: u8 = 0x10;

/// One of the bus lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusLine {
    Atn,
    Clock,
    Data,
    Srq,
}

impl BusLine {
    pub const ALL: [BusLine; 4] = [BusLine::Atn, BusLine::Clock, BusLine::Data, BusLine::Srq];

    /// Position of this line within per-line arrays.
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            BusLine::Atn => 0,
            BusLine::Clock => 1,
            BusLine::Data => 2,
            BusLine::Srq => 3,
        }
    }

    /// The single-line mask for this line.
    #[inline(always)]
    #[must_use]
    pub const fn mask(self) -> Lines {
        match self {
            BusLine::Atn => Lines::ATN,
            BusLine::Clock => Lines::CLOCK,
            BusLine::Data => Lines::DATA,
            BusLine::Srq => Lines::SRQ,
        }
    }
}

bitflags! {
    /// A set of bus lines.  Uses the same bit values as the external IEC
    /// masks to reduce the possibility of bugs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lines: u8 {
        const DATA = IEC_DATA;
        const CLOCK = IEC_CLOCK;
        const ATN = IEC_ATN;
        const SRQ = IEC_SRQ;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Lines {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Lines({=u8:#x})", self.bits());
    }
}

/// How the MCU output pin reaches the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputDriver {
    /// Open-drain output wired straight onto the bus - a 0 bit pulls the
    /// line low.
    Direct,

    /// Output drives an inverting buffer (e.g. a 7406) - a 1 bit pulls the
    /// line low.  The pico1541 and the LPC17xx sd2iec boards are wired this
    /// way.
    Inverting,
}

impl OutputDriver {
    /// Output register level which asserts (`true`) or releases (`false`)
    /// a line.
    #[inline(always)]
    #[must_use]
    pub const fn level_for(self, asserted: bool) -> Level {
        match (self, asserted) {
            (OutputDriver::Direct, true) | (OutputDriver::Inverting, false) => Level::Low,
            (OutputDriver::Direct, false) | (OutputDriver::Inverting, true) => Level::High,
        }
    }

    /// Whether an output register level pulls the line low.
    #[inline(always)]
    #[must_use]
    pub const fn is_asserting(self, level: Level) -> bool {
        match self {
            OutputDriver::Direct => level.is_low(),
            OutputDriver::Inverting => level.is_high(),
        }
    }

    /// How to drive the output pin to put `level` on the bus.  Direct
    /// outputs emulate open drain, so never drive high.
    #[must_use]
    pub const fn pin_drive(self, level: Level) -> PinDrive {
        match (self, level) {
            (OutputDriver::Direct, Level::Low) => PinDrive::Low,
            (OutputDriver::Direct, Level::High) => PinDrive::Float,
            (OutputDriver::Inverting, Level::Low) => PinDrive::Low,
            (OutputDriver::Inverting, Level::High) => PinDrive::High,
        }
    }

    /// How to drive the output pin so the line is released.
    #[must_use]
    pub const fn release_drive(self) -> PinDrive {
        self.pin_drive(self.level_for(false))
    }
}

/// Output pin state, for backends without an open-drain mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinDrive {
    Low,
    High,
    Float,
}

/// The physical IEC bus, as seen by this device.
pub struct IecBus<P> {
    pins: P,
    driver: OutputDriver,
}

impl<P: BusPins> IecBus<P> {
    /// Take ownership of the bus pins and release every line.
    pub fn new(pins: P, driver: OutputDriver) -> Self {
        let mut bus = Self { pins, driver };
        bus.release_lines(Lines::all());
        bus
    }

    /// Assert (pull low) or release `line`.  Setting a line to the state it
    /// is already in is harmless.
    #[inline(always)]
    pub fn set_line(&mut self, line: BusLine, asserted: bool) {
        self.pins.set_output(line, self.driver.level_for(asserted));
    }

    /// Returns true if `line` is currently low on the bus, whoever is pulling
    /// it.  After asserting or releasing a line, allow it to settle before
    /// reading it back.
    #[inline(always)]
    pub fn read_line(&self, line: BusLine) -> bool {
        self.pins.input(line).is_low()
    }

    /// Force the SRQ pin register bit high, regardless of the output driver.
    /// Used to strobe SRQ for fast serial clocking.
    #[inline(always)]
    pub fn toggle_srq(&mut self) {
        self.pins.force_input_high(BusLine::Srq);
    }

    /// Assert every line in `lines`.
    #[inline(always)]
    pub fn set_lines(&mut self, lines: Lines) {
        for line in BusLine::ALL {
            if lines.contains(line.mask()) {
                self.set_line(line, true);
            }
        }
    }

    /// Release every line in `lines`.
    #[inline(always)]
    pub fn release_lines(&mut self, lines: Lines) {
        for line in BusLine::ALL {
            if lines.contains(line.mask()) {
                self.set_line(line, false);
            }
        }
    }

    /// Assert `set`, then release `release`.
    pub fn set_release(&mut self, set: Lines, release: Lines) {
        self.set_lines(set);
        self.release_lines(release);
    }

    /// Poll all lines - returns the set of lines currently low on the bus.
    pub fn poll_lines(&self) -> Lines {
        BusLine::ALL
            .into_iter()
            .filter(|line| self.read_line(*line))
            .fold(Lines::empty(), |acc, line| acc | line.mask())
    }

    /// Check whether this device is pulling `line` low, by reading back the
    /// output latch.
    pub fn is_driving(&self, line: BusLine) -> bool {
        self.driver.is_asserting(self.pins.output(line))
    }

    pub fn driver(&self) -> OutputDriver {
        self.driver
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    /// Give the pins back, e.g. to hand them to another driver.
    pub fn into_pins(self) -> P {
        self.pins
    }
}
