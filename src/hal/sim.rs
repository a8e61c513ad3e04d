//! Simulated register file, used to exercise the bus and timer components
//! without hardware.
//!
//! Everything runs on a [`SimClock`], a virtual nanosecond clock shared
//! between all simulated peripherals.  Each register read costs a small,
//! fixed amount of simulated time, which models bus access latency and
//! guarantees that busy-wait loops make progress.  Tests can also move the
//! clock on explicitly, to stand in for work done between polls.
//!
//! [`SimBus`] models the four open-collector lines.  Each participant can
//! independently pull a line low, and a line reads high only when nobody is
//! pulling it - and, after the last pull is released, only once the pull-up
//! has had time to raise it.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::cell::Cell;
use std::rc::Rc;

use super::soft::SoftTimers;
use super::{BusPins, Clock, Level};
use crate::bus::{BusLine, OutputDriver};

/// Simulated time consumed by each register read.
pub const DEFAULT_ACCESS_NS: u64 = 20;

/// Time the pull-up takes to raise a released line.
pub const DEFAULT_RISE_NS: u64 = 1_000;

struct ClockState {
    now_ns: Cell<u64>,
    access_ns: u64,
}

/// Virtual clock.  Clones share the same time.
#[derive(Clone)]
pub struct SimClock {
    state: Rc<ClockState>,
}

impl SimClock {
    #[must_use]
    pub fn new() -> Self {
        Self::with_access_ns(DEFAULT_ACCESS_NS)
    }

    /// Create a clock where every read costs `access_ns`.  Zero gives a
    /// clock that only moves when advanced explicitly.
    #[must_use]
    pub fn with_access_ns(access_ns: u64) -> Self {
        Self {
            state: Rc::new(ClockState {
                now_ns: Cell::new(0),
                access_ns,
            }),
        }
    }

    pub fn advance_ns(&self, ns: u64) {
        self.state.now_ns.set(self.state.now_ns.get() + ns);
    }

    pub fn advance_us(&self, us: u64) {
        self.advance_ns(us * 1_000);
    }

    /// Current time, without charging an access.
    #[must_use]
    pub fn peek_ns(&self) -> u64 {
        self.state.now_ns.get()
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now_ns(&self) -> u64 {
        let now = self.state.now_ns.get() + self.state.access_ns;
        self.state.now_ns.set(now);
        now
    }
}

/// Simulated timer peripherals.
pub type SimTimers = SoftTimers<SimClock>;

#[derive(Clone, Copy)]
struct SimLine {
    // Raw output latch.
    output: Level,

    // Another device on the bus pulling the line low.
    external_pull: bool,

    // When the most recent pull on the line was let go.  None if the line
    // has never been pulled.
    released_at_ns: Option<u64>,

    // Pin register bit forced high by a strobe.  Cleared by the next write
    // to the output latch.
    forced_high: bool,

    // Number of times the output latch changed level.
    edges: u32,
}

/// The four bus lines, as seen through the board's output driver.
pub struct SimBus {
    clock: SimClock,
    driver: OutputDriver,
    rise_ns: u64,
    lines: [SimLine; BusLine::ALL.len()],
}

impl SimBus {
    /// Create a bus with nothing pulling any line.  The output latch starts
    /// at the released level for `driver`.
    #[must_use]
    pub fn new(clock: SimClock, driver: OutputDriver) -> Self {
        let line = SimLine {
            output: driver.level_for(false),
            external_pull: false,
            released_at_ns: None,
            forced_high: false,
            edges: 0,
        };
        Self {
            clock,
            driver,
            rise_ns: DEFAULT_RISE_NS,
            lines: [line; BusLine::ALL.len()],
        }
    }

    #[must_use]
    pub fn with_rise_ns(mut self, rise_ns: u64) -> Self {
        self.rise_ns = rise_ns;
        self
    }

    /// Have another device on the bus pull `line` low, or let it go.
    pub fn set_external(&mut self, line: BusLine, pull_low: bool) {
        let now = self.clock.peek_ns();
        let state = &mut self.lines[line.index()];
        if state.external_pull && !pull_low {
            state.released_at_ns = Some(now);
        }
        state.external_pull = pull_low;
    }

    /// Number of level changes written to the output latch of `line`.
    #[must_use]
    pub fn edges(&self, line: BusLine) -> u32 {
        self.lines[line.index()].edges
    }

    fn we_pull(&self, line: BusLine) -> bool {
        self.driver.is_asserting(self.lines[line.index()].output)
    }
}

impl BusPins for SimBus {
    fn set_output(&mut self, line: BusLine, level: Level) {
        let was_pulling = self.we_pull(line);
        let now = self.clock.peek_ns();
        let state = &mut self.lines[line.index()];
        state.forced_high = false;
        if state.output == level {
            return;
        }
        state.output = level;
        state.edges += 1;
        if was_pulling && !self.driver.is_asserting(level) {
            state.released_at_ns = Some(now);
        }
    }

    fn output(&self, line: BusLine) -> Level {
        self.lines[line.index()].output
    }

    fn input(&self, line: BusLine) -> Level {
        let now = self.clock.now_ns();
        let state = &self.lines[line.index()];
        if state.forced_high {
            Level::High
        } else if self.we_pull(line) || state.external_pull {
            Level::Low
        } else if state
            .released_at_ns
            .is_some_and(|released| now < released + self.rise_ns)
        {
            // Still rising
            Level::Low
        } else {
            Level::High
        }
    }

    fn force_input_high(&mut self, line: BusLine) {
        self.lines[line.index()].forced_high = true;
    }
}
