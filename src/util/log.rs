//! Logging macros used throughout pico2iec.
//!
//! On hardware these forward to defmt, which ships the log over RTT.  Host
//! test builds print to stdout instead, so a failing test shows what the
//! timebase was doing.  Any other build compiles them away entirely, while
//! still type-checking the arguments.
//!
//! Format strings must stick to `{}` and `{:?}` so they are valid for both
//! defmt and `core::fmt`.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

/// Dispatches a log line to whichever backend is compiled in.
macro_rules! emit {
    ($level:ident, $tag:literal, $($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        ::std::println!(concat!("[", $tag, "] {}"), format_args!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}
pub(crate) use emit;

macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::util::log::emit!(trace, "TRACE", $($arg)*)
    };
}
pub(crate) use log_trace;

macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::util::log::emit!(debug, "DEBUG", $($arg)*)
    };
}
pub(crate) use log_debug;

macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::util::log::emit!(info, "INFO", $($arg)*)
    };
}
pub(crate) use log_info;

macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::util::log::emit!(warn, "WARN", $($arg)*)
    };
}
pub(crate) use log_warn;

#[cfg(test)]
mod tests {
    use super::{log_debug, log_info, log_trace, log_warn};

    #[test]
    fn every_level_expands() {
        let us = 60;
        log_trace!("trace {}us", us);
        log_debug!("debug {}us", us);
        log_info!("info {}us", us);
        log_warn!("warn {:?}", Some(us));
    }
}
