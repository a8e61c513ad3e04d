//! pico2iec
//!
//! The bus signalling and microsecond timing core of a Commodore IEC bus
//! device.
//!
//! It provides:
//! - [`IecBus`] - assert, release and read the ATN, CLOCK, DATA and SRQ
//!   lines, hiding the inverted, open-collector nature of the bus.
//! - [`Timebase`] - blocking microsecond delays, plus a non-blocking timeout
//!   that can be polled while the lines are watched, each on its own
//!   hardware counter.
//!
//! The protocol state machine built on top of these lives elsewhere.
//!
//! The hardware is accessed through the traits in [`hal`], so the same code
//! runs on a Raspberry Pi Pico (features `pico` and `pico2`) and, with the
//! `std` feature, against a simulated register file on the host.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Provide some feature guidance when compiling the library.
#[cfg(all(feature = "pico", feature = "pico2"))]
compile_error!("Features 'pico' and 'pico2' cannot be enabled simultaneously");
#[cfg(all(feature = "rp", not(any(feature = "pico", feature = "pico2"))))]
compile_error!("Either 'pico' or 'pico2' feature must be enabled for hardware builds");

// Declare all of this library's modules.
pub mod bus;
pub mod config;
pub mod constants;
pub mod hal;
pub mod timer;
pub mod util;

pub use bus::{BusLine, IecBus, Lines, OutputDriver};
pub use config::{BoardConfig, BusPinConfig, ConfigError, TimerConfig};
pub use timer::{Expired, Timebase};

// Extra binary information that picotool can read.
#[cfg(feature = "rp")]
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"pico2iec by piers.rocks"),
    embassy_rp::binary_info::rp_program_description!(
        c"Commodore IEC bus signalling and microsecond timing, with hardware test binaries."
    ),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];
