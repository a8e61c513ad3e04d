//! Software model of the counter registers.
//!
//! [`SoftCounter`] reproduces the behaviour of a prescaled match/compare
//! counter on top of any monotonic [`Clock`].  The count is brought up to
//! date lazily, whenever a register is accessed, so there is no background
//! activity to schedule.  This is what lets a hosted build, or a target
//! whose timer is already owned by embassy-time, present the same registers
//! to `Timebase` as dedicated hardware would.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use super::{ChannelId, Clock, ControlFlags, CounterChannel, Peripheral, TimerHardware};

const NS_PER_SEC: u64 = 1_000_000_000;
const COUNT_WRAP: u64 = 1 << 32;
const NUM_PERIPHERALS: usize = Peripheral::ALL.len();

/// A single counter channel driven by `clock`.
pub struct SoftCounter<C> {
    clock: C,
    core_clock_hz: u32,
    tick_ns: u64,
    control: ControlFlags,
    count: u32,
    compare: u32,

    // Clock time at which the last whole tick was folded into `count`.
    synced_ns: u64,
}

impl<C: Clock> SoftCounter<C> {
    /// Create a counter in its power-on state: stopped, prescale 0.
    pub fn new(clock: C, core_clock_hz: u32) -> Self {
        debug_assert!(core_clock_hz > 0);
        let synced_ns = clock.now_ns();
        Self {
            clock,
            core_clock_hz,
            tick_ns: Self::tick_ns_for(0, core_clock_hz),
            control: ControlFlags::empty(),
            count: 0,
            compare: 0,
            synced_ns,
        }
    }

    /// Length of one tick at the current prescale.
    #[must_use]
    pub fn tick_ns(&self) -> u64 {
        self.tick_ns
    }

    fn tick_ns_for(prescale: u32, core_clock_hz: u32) -> u64 {
        let ns = (u64::from(prescale) + 1) * NS_PER_SEC / u64::from(core_clock_hz);
        ns.max(1)
    }

    fn running(&self) -> bool {
        self.control.contains(ControlFlags::ENABLE) && !self.control.contains(ControlFlags::RESET)
    }

    // Fold elapsed ticks into the count, raising MATCH (and stopping) if the
    // compare value was crossed.  Returns the clock reading used.
    fn sync(&mut self) -> u64 {
        let now = self.clock.now_ns();
        if !self.running() {
            self.synced_ns = now;
            return now;
        }

        let ticks = now.saturating_sub(self.synced_ns) / self.tick_ns;
        if ticks == 0 {
            return now;
        }
        self.synced_ns += ticks * self.tick_ns;

        let before = u64::from(self.count);
        let after = before + ticks;
        let compare = u64::from(self.compare);
        let crossed = |target: u64| before < target && target <= after;
        if compare != 0 && (crossed(compare) || crossed(compare + COUNT_WRAP)) {
            self.control.insert(ControlFlags::MATCH);
            if self.control.contains(ControlFlags::STOP_ON_MATCH) {
                self.control.remove(ControlFlags::ENABLE);
                self.count = self.compare;
                return now;
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let wrapped = (after % COUNT_WRAP) as u32;
        self.count = wrapped;
        now
    }
}

impl<C: Clock> CounterChannel for SoftCounter<C> {
    fn set_prescale(&mut self, prescale: u32) {
        self.sync();
        self.tick_ns = Self::tick_ns_for(prescale, self.core_clock_hz);
    }

    fn control(&mut self) -> ControlFlags {
        self.sync();
        self.control
    }

    fn set_control(&mut self, flags: ControlFlags) {
        let now = self.sync();
        let was_running = self.running();
        self.control = flags;
        if flags.contains(ControlFlags::RESET) {
            self.count = 0;
        }
        if !was_running && self.running() {
            // Counting starts from a whole tick boundary now.
            self.synced_ns = now;
        }
    }

    fn count(&mut self) -> u32 {
        self.sync();
        self.count
    }

    fn set_count(&mut self, count: u32) {
        let now = self.sync();
        self.count = count;
        self.synced_ns = now;
    }

    fn compare(&mut self) -> u32 {
        self.sync();
        self.compare
    }

    fn set_compare(&mut self, compare: u32) {
        self.sync();
        self.compare = compare;
    }
}

/// A coarse periodic tick driven by `clock`.
pub struct SoftHeartbeat<C> {
    clock: C,
    period_ns: u64,
    started_ns: Option<u64>,
}

impl<C: Clock> SoftHeartbeat<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            period_ns: 0,
            started_ns: None,
        }
    }

    pub fn start(&mut self, period_us: u32) {
        debug_assert!(period_us > 0);
        self.period_ns = u64::from(period_us) * 1_000;
        self.started_ns = Some(self.clock.now_ns());
    }

    /// Whole periods since `start()`, wrapping like a 32 bit tick counter.
    pub fn ticks(&self) -> u32 {
        match self.started_ns {
            Some(started) => {
                let periods = self.clock.now_ns().saturating_sub(started) / self.period_ns;
                #[allow(clippy::cast_possible_truncation)]
                let ticks = (periods % COUNT_WRAP) as u32;
                ticks
            }
            None => 0,
        }
    }
}

/// A full set of timer peripherals built from [`SoftCounter`]s and a
/// [`SoftHeartbeat`] sharing one clock.
pub struct SoftTimers<C> {
    timeout: SoftCounter<C>,
    delay: SoftCounter<C>,
    heartbeat: SoftHeartbeat<C>,
    powered: [bool; NUM_PERIPHERALS],
}

impl<C: Clock + Clone> SoftTimers<C> {
    pub fn new(clock: C, core_clock_hz: u32) -> Self {
        Self {
            timeout: SoftCounter::new(clock.clone(), core_clock_hz),
            delay: SoftCounter::new(clock.clone(), core_clock_hz),
            heartbeat: SoftHeartbeat::new(clock),
            powered: [false; NUM_PERIPHERALS],
        }
    }
}

impl<C> SoftTimers<C> {
    #[must_use]
    pub fn is_powered(&self, peripheral: Peripheral) -> bool {
        self.powered[peripheral as usize]
    }
}

impl<C: Clock> TimerHardware for SoftTimers<C> {
    type Counter = SoftCounter<C>;

    fn power_up(&mut self, peripheral: Peripheral) {
        self.powered[peripheral as usize] = true;
    }

    fn counter(&mut self, id: ChannelId) -> &mut SoftCounter<C> {
        debug_assert!(
            self.powered[id.peripheral() as usize],
            "counter accessed before power up"
        );
        match id {
            ChannelId::Timeout => &mut self.timeout,
            ChannelId::Delay => &mut self.delay,
        }
    }

    fn start_heartbeat(&mut self, period_us: u32) {
        debug_assert!(self.powered[Peripheral::Heartbeat as usize]);
        self.heartbeat.start(period_us);
    }

    fn heartbeat_ticks(&mut self) -> u32 {
        self.heartbeat.ticks()
    }
}
