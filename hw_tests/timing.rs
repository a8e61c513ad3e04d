//! test_timing
//!
//! Checks the accuracy of the blocking delays and the timeout against
//! embassy-time, and logs the results over RTT.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![no_std]
#![no_main]

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_time::{Instant, Timer};
use pico2iec_rs::constants::iec::{IEC_T_AT, IEC_T_BB, IEC_T_F, IEC_T_NE, IEC_T_S};
use pico2iec_rs::hal::rp::RpTimers;
use pico2iec_rs::util::built::log_fw_info;
use pico2iec_rs::{BoardConfig, Timebase, TimerConfig};
use {defmt_rtt as _, panic_probe as _};

// embassy-time on the RP ticks at 1MHz, so allow a tick either side of the
// measurement, plus the overshoot of the delay itself.
const TOLERANCE_US: u64 = 3;

const DELAYS_US: [u32; 5] = [1, IEC_T_S, IEC_T_NE, IEC_T_BB, 10_000];
const TIMEOUTS_US: [u32; 2] = [IEC_T_AT, IEC_T_F];

fn check(what: &str, requested_us: u32, elapsed_us: u64) {
    let requested_us = u64::from(requested_us);
    if elapsed_us + 1 < requested_us {
        warn!("{} {}us: SHORT, took {}us", what, requested_us, elapsed_us);
    } else if elapsed_us > requested_us + TOLERANCE_US {
        warn!("{} {}us: LONG, took {}us", what, requested_us, elapsed_us);
    } else {
        info!("{} {}us: ok, took {}us", what, requested_us, elapsed_us);
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    log_fw_info("test_timing");

    let _p = embassy_rp::init(Default::default());
    let core = cortex_m::Peripherals::take().unwrap();

    let config = TimerConfig::from_hz(embassy_rp::clocks::clk_sys_freq())
        .unwrap_or(BoardConfig::default().timer);
    let Ok(timers) = RpTimers::take(core.SYST, config.core_clock_hz()) else {
        defmt::panic!("Timers already taken");
    };
    let mut timebase = Timebase::init(timers, config);

    loop {
        for us in DELAYS_US {
            let start = Instant::now();
            timebase.delay_us(us);
            check("delay", us, start.elapsed().as_micros());
        }

        for us in TIMEOUTS_US {
            let start = Instant::now();
            timebase.start_timeout(us);
            let mut polls = 0u32;
            while !timebase.has_timed_out() {
                polls += 1;
            }
            check("timeout", us, start.elapsed().as_micros());
            info!("  polled {} times", polls);
        }

        // Timeout with short delays interleaved, as the protocol layer does
        let start = Instant::now();
        timebase.start_timeout(IEC_T_AT);
        while !timebase.has_timed_out() {
            timebase.delay_us(50);
        }
        check("interleaved timeout", IEC_T_AT, start.elapsed().as_micros());

        info!("Heartbeat ticks: {}", timebase.heartbeat_ticks());

        Timer::after_secs(1).await;
    }
}
