//! test_lines
//!
//! Walks each IEC bus line through assert and release, logging what is read
//! back after the bus has settled.  Run with nothing else on the bus, and
//! check every line reads back as driven.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![no_std]
#![no_main]

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_time::Timer;
use pico2iec_rs::hal::rp::{RpGpio, RpTimers};
use pico2iec_rs::util::built::log_fw_info;
use pico2iec_rs::{BoardConfig, BusLine, IecBus, Lines, Timebase};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    log_fw_info("test_lines");

    let p = embassy_rp::init(Default::default());
    let core = cortex_m::Peripherals::take().unwrap();

    let config = BoardConfig::default();
    info!("Board config: {}", config);

    let mut gpio = RpGpio::new(pico2iec_rs::rp_gpio_pins!(p));
    let pins = gpio.take_bus_pins(&config.bus_pins, config.driver).unwrap();
    let mut bus = IecBus::new(pins, config.driver);

    let Ok(timers) = RpTimers::take(core.SYST, config.timer.core_clock_hz()) else {
        defmt::panic!("Timers already taken");
    };
    let mut timebase = Timebase::init(timers, config.timer);

    loop {
        let mut failures = 0u32;

        for line in BusLine::ALL {
            bus.set_line(line, true);
            timebase.settle();
            let asserted = bus.read_line(line);

            bus.set_line(line, false);
            timebase.settle();
            let released = !bus.read_line(line);

            if asserted && released {
                info!("{}: ok", line);
            } else {
                warn!(
                    "{}: FAILED asserted {} released {}",
                    line, asserted, released
                );
                failures += 1;
            }
        }

        // All at once
        bus.set_lines(Lines::all());
        timebase.settle();
        info!("All asserted, reading {}", bus.poll_lines());
        bus.release_lines(Lines::all());
        timebase.settle();
        info!("All released, reading {}", bus.poll_lines());

        // SRQ strobe
        bus.set_line(BusLine::Srq, true);
        timebase.settle();
        bus.toggle_srq();
        timebase.settle();
        if bus.read_line(BusLine::Srq) {
            warn!("SRQ: still asserted after strobe");
            failures += 1;
        } else {
            info!("SRQ: released by strobe");
        }
        bus.set_line(BusLine::Srq, false);

        info!("Pass complete, {} failures", failures);
        Timer::after_secs(2).await;
    }
}
