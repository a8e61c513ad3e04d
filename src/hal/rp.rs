//! Raspberry Pi Pico (RP2040) and Pico 2 (RP235x) backend.
//!
//! - Bus lines are pairs of embassy-rp [`Flex`] pins, one reading the bus
//!   and one driving it, as on the pico1541 boards.
//! - The two counter channels are [`SoftCounter`]s on embassy-time, which
//!   already owns the RP's 1MHz TIMER peripheral.
//! - The heartbeat is the Cortex-M SysTick, counting in its exception
//!   handler.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;
use embassy_rp::gpio::{AnyPin, Flex, Pull};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use super::soft::{SoftCounter, SoftTimers};
use super::{BusPins, ChannelId, Clock, Level, Peripheral, TimerHardware};
use crate::bus::{BusLine, OutputDriver, PinDrive};
use crate::config::BusPinConfig;
use crate::constants::{TICK_HZ, TOTAL_GPIOS};
use crate::util::log::{log_debug, log_info, log_warn};

// Widest value the SysTick reload register holds.
const SYST_MAX_RELOAD: u32 = 0x00FF_FFFF;

// Incremented by the SysTick exception.
static HEARTBEAT_TICKS: AtomicU32 = AtomicU32::new(0);

// Set once the timers have been handed out.
static TIMERS_TAKEN: AtomicBool = AtomicBool::new(false);

#[cortex_m_rt::exception]
#[allow(non_snake_case)]
fn SysTick() {
    HEARTBEAT_TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Nanoseconds since boot, from embassy-time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpClock;

impl Clock for RpClock {
    #[inline(always)]
    fn now_ns(&self) -> u64 {
        embassy_time::Instant::now().as_micros() * 1_000
    }
}

/// The RP's timer peripherals.  Only one instance can exist.
pub struct RpTimers {
    counters: SoftTimers<RpClock>,
    syst: SYST,
    core_clock_mhz: u32,
}

impl RpTimers {
    /// Take the timers.  If they have already been taken, `syst` is handed
    /// back.
    pub fn take(syst: SYST, core_clock_hz: u32) -> Result<Self, SYST> {
        if TIMERS_TAKEN.swap(true, Ordering::AcqRel) {
            log_warn!("Timers already taken");
            return Err(syst);
        }
        Ok(Self {
            counters: SoftTimers::new(RpClock, core_clock_hz),
            syst,
            core_clock_mhz: core_clock_hz / TICK_HZ,
        })
    }
}

impl TimerHardware for RpTimers {
    type Counter = SoftCounter<RpClock>;

    fn power_up(&mut self, peripheral: Peripheral) {
        // SysTick is part of the core, and always clocked
        self.counters.power_up(peripheral);
    }

    #[inline(always)]
    fn counter(&mut self, id: ChannelId) -> &mut SoftCounter<RpClock> {
        self.counters.counter(id)
    }

    fn start_heartbeat(&mut self, period_us: u32) {
        let cycles = self.core_clock_mhz.saturating_mul(period_us);
        let reload = if cycles > SYST_MAX_RELOAD + 1 {
            log_warn!(
                "Heartbeat period {}us too long for SysTick, clamping",
                period_us
            );
            SYST_MAX_RELOAD
        } else {
            cycles.saturating_sub(1)
        };

        self.syst.disable_counter();
        HEARTBEAT_TICKS.store(0, Ordering::Relaxed);
        self.syst.set_clock_source(SystClkSource::Core);
        self.syst.set_reload(reload);
        self.syst.clear_current();
        self.syst.enable_interrupt();
        self.syst.enable_counter();
        log_debug!("SysTick heartbeat started, reload {}", reload);
    }

    fn heartbeat_ticks(&mut self) -> u32 {
        HEARTBEAT_TICKS.load(Ordering::Relaxed)
    }
}

/// Represents a single bidirectional IEC bus line using separate input/output
/// pins.
pub struct RpLine {
    input: Flex<'static>,
    output: Flex<'static>,
    driver: OutputDriver,
    latched: Level,
}

impl RpLine {
    /// Create a Line with the specified input and output pins, released.
    pub fn new(input_pin: AnyPin, output_pin: AnyPin, driver: OutputDriver) -> Self {
        let mut input = Flex::new(input_pin);
        input.set_as_input();
        input.set_pull(Pull::Up);

        let mut line = Self {
            input,
            output: Flex::new(output_pin),
            driver,
            latched: Level::Low,
        };
        line.write(driver.level_for(false));
        line
    }

    fn write(&mut self, level: Level) {
        self.latched = level;
        self.drive(self.driver.pin_drive(level));
    }

    fn drive(&mut self, drive: PinDrive) {
        match drive {
            PinDrive::Low => {
                self.output.set_low();
                self.output.set_as_output();
            }
            PinDrive::High => {
                self.output.set_high();
                self.output.set_as_output();
            }
            PinDrive::Float => {
                self.output.set_low();
                self.output.set_as_input();
            }
        }
    }
}

/// The four bus lines on RP GPIOs.
pub struct RpBusPins {
    lines: [RpLine; 4],
}

impl BusPins for RpBusPins {
    #[inline(always)]
    fn set_output(&mut self, line: BusLine, level: Level) {
        self.lines[line.index()].write(level);
    }

    #[inline(always)]
    fn output(&self, line: BusLine) -> Level {
        self.lines[line.index()].latched
    }

    #[inline(always)]
    fn input(&self, line: BusLine) -> Level {
        if self.lines[line.index()].input.is_low() {
            Level::Low
        } else {
            Level::High
        }
    }

    fn force_input_high(&mut self, line: BusLine) {
        // The RP has no writable pin register, so release the line at the
        // output pin, leaving the latch alone.  The next write to the line
        // restores its latched level.
        let line = &mut self.lines[line.index()];
        line.drive(line.driver.release_drive());
    }
}

/// Object which hands out GPIO pins by number.
pub struct RpGpio {
    pins: [Option<AnyPin>; TOTAL_GPIOS as usize],
}

impl RpGpio {
    pub fn new(pins: [AnyPin; TOTAL_GPIOS as usize]) -> Self {
        Self {
            pins: pins.map(Some),
        }
    }

    /// Take the pins for the IEC bus lines.  Returns None if the
    /// configuration is invalid or any pin has already been taken.
    pub fn take_bus_pins(
        &mut self,
        config: &BusPinConfig,
        driver: OutputDriver,
    ) -> Option<RpBusPins> {
        if let Err(e) = config.validate() {
            log_warn!("Invalid bus pin configuration: {}", e);
            return None;
        }
        if let Some(pin) = config
            .into_iter()
            .find(|pin| self.pins[usize::from(*pin)].is_none())
        {
            log_warn!("GPIO {} already taken", pin);
            return None;
        }

        let [atn, clock, data, srq] = BusLine::ALL.map(|line| {
            let (input, output) = config.pins_for(line);
            let input = self.pins[usize::from(input)].take()?;
            let output = self.pins[usize::from(output)].take()?;
            Some(RpLine::new(input, output, driver))
        });
        log_info!("IEC bus pins taken, driver {:?}", driver);
        Some(RpBusPins {
            lines: [atn?, clock?, data?, srq?],
        })
    }
}

/// Build the pin array for [`RpGpio::new`] from `embassy_rp::Peripherals`.
#[macro_export]
macro_rules! rp_gpio_pins {
    ($p:ident) => {
        [
            $p.PIN_0.into(),
            $p.PIN_1.into(),
            $p.PIN_2.into(),
            $p.PIN_3.into(),
            $p.PIN_4.into(),
            $p.PIN_5.into(),
            $p.PIN_6.into(),
            $p.PIN_7.into(),
            $p.PIN_8.into(),
            $p.PIN_9.into(),
            $p.PIN_10.into(),
            $p.PIN_11.into(),
            $p.PIN_12.into(),
            $p.PIN_13.into(),
            $p.PIN_14.into(),
            $p.PIN_15.into(),
            $p.PIN_16.into(),
            $p.PIN_17.into(),
            $p.PIN_18.into(),
            $p.PIN_19.into(),
            $p.PIN_20.into(),
            $p.PIN_21.into(),
            $p.PIN_22.into(),
            $p.PIN_23.into(),
            $p.PIN_24.into(),
            $p.PIN_25.into(),
            $p.PIN_26.into(),
            $p.PIN_27.into(),
            $p.PIN_28.into(),
            $p.PIN_29.into(),
        ]
    };
}
