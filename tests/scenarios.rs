//! End to end scenarios, driving the bus and timebase together the way the
//! protocol layer does, against the simulated register file.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use pico2iec_rs::config::boards;
use pico2iec_rs::constants::iec::{IEC_T_AT, IEC_T_NE, IEC_T_R};
use pico2iec_rs::hal::host::host_timers;
use pico2iec_rs::hal::sim::{SimBus, SimClock, SimTimers};
use pico2iec_rs::hal::{ChannelId, CounterChannel, TimerHardware};
use pico2iec_rs::{BoardConfig, BusLine, Expired, IecBus, Lines, Timebase, TimerConfig};

fn board() -> (SimClock, IecBus<SimBus>, Timebase<SimTimers>) {
    let config = BoardConfig::default();
    config.validate().unwrap();

    let clock = SimClock::new();
    let pins = SimBus::new(clock.clone(), config.driver);
    let bus = IecBus::new(pins, config.driver);
    let timers = SimTimers::new(clock.clone(), config.timer.core_clock_hz());
    let timebase = Timebase::init(timers, config.timer);
    (clock, bus, timebase)
}

#[test]
fn atn_response_window_with_interleaved_delays() {
    let (clock, _bus, mut timebase) = board();

    let start = clock.peek_ns();
    timebase.start_timeout(IEC_T_AT);

    let mut first_expired_ns = None;
    for _ in 0..40 {
        let expired = timebase.has_timed_out();
        let elapsed_ns = clock.peek_ns() - start;
        match first_expired_ns {
            None if expired => first_expired_ns = Some(elapsed_ns),
            None => assert!(elapsed_ns <= u64::from(IEC_T_AT) * 1_000 + 1_000),
            // Once expired, stays expired
            Some(_) => assert!(expired),
        }
        timebase.delay_us(50);
    }

    let first_expired_ns = first_expired_ns.expect("timeout never expired");
    assert!(first_expired_ns >= u64::from(IEC_T_AT) * 1_000);
    // Detected within one poll interval of the deadline
    assert!(first_expired_ns <= u64::from(IEC_T_AT + 50 + 1) * 1_000);
}

#[test]
fn delay_does_not_disturb_pending_timeout() {
    let (clock, _bus, mut timebase) = board();
    timebase.start_timeout(500);
    let armed_ns = clock.peek_ns();

    timebase.delay_us(499);
    assert!(!timebase.has_timed_out());

    while !timebase.has_timed_out() {}
    let elapsed = clock.peek_ns() - armed_ns;
    assert!(elapsed >= 500_000);
    assert!(elapsed < 502_000);
}

#[test]
fn timeout_does_not_disturb_delay_channel() {
    let (clock, _bus, mut timebase) = board();
    timebase.delay_us(10);
    timebase.start_timeout(IEC_T_NE);

    // Timeout expires part way through the delay, which runs to completion
    let start = clock.peek_ns();
    timebase.delay_us(100);
    assert!(clock.peek_ns() - start >= 100_000);
    assert!(timebase.has_timed_out());

    timebase.start_timeout(IEC_T_NE);
    while !timebase.has_timed_out() {}
    let mut timers = timebase.release();
    assert_eq!(timers.counter(ChannelId::Delay).compare(), 100);
    assert_eq!(timers.counter(ChannelId::Timeout).compare(), IEC_T_NE);
}

#[test]
fn assert_and_read_back_own_line() {
    let (_clock, mut bus, mut timebase) = board();
    for line in BusLine::ALL {
        bus.set_line(line, true);
        timebase.settle();
        assert!(bus.read_line(line), "{line:?} not asserted");

        bus.set_line(line, false);
        // Still rising
        assert!(bus.read_line(line));
        timebase.settle();
        assert!(!bus.read_line(line), "{line:?} not released");
    }
}

#[test]
fn set_line_twice_is_one_edge() {
    let (_clock, mut bus, _timebase) = board();
    bus.set_line(BusLine::Clock, true);
    bus.set_line(BusLine::Clock, true);
    assert_eq!(bus.pins().edges(BusLine::Clock), 1);
    bus.set_line(BusLine::Clock, false);
    bus.set_line(BusLine::Clock, false);
    assert_eq!(bus.pins().edges(BusLine::Clock), 2);
}

#[test]
fn wait_for_device_to_release_data() {
    let (clock, mut bus, mut timebase) = board();

    // Device holds DATA, then lets go after 30us
    bus.pins_mut().set_external(BusLine::Data, true);
    bus.set_release(Lines::ATN, Lines::empty());

    let release_at = clock.peek_ns() + 30_000;
    let result = timebase.wait_until(IEC_T_AT, || {
        if clock.peek_ns() >= release_at {
            bus.pins_mut().set_external(BusLine::Data, false);
        }
        bus.poll_lines() == Lines::ATN
    });
    assert_eq!(result, Ok(()));
    let elapsed = clock.peek_ns() - (release_at - 30_000);
    assert!(elapsed >= 30_000 + 1_000, "returned before DATA rose");
}

#[test]
fn wait_for_device_that_never_responds() {
    let (_clock, mut bus, mut timebase) = board();
    bus.pins_mut().set_external(BusLine::Clock, true);
    let result = timebase.wait_until(IEC_T_R, || !bus.read_line(BusLine::Clock));
    assert_eq!(result, Err(Expired));
    assert!(timebase.has_timed_out());
}

#[test]
fn pico2_board_timebase() {
    let config = boards::pico2_1541_v0_1();
    let clock = SimClock::new();
    let timers = SimTimers::new(clock.clone(), config.timer.core_clock_hz());
    let mut timebase = Timebase::init(timers, config.timer);
    assert_eq!(timebase.config().prescale(), 149);

    let start = clock.peek_ns();
    timebase.delay_ms(1);
    assert!(clock.peek_ns() - start >= 1_000_000);
    assert_eq!(timebase.heartbeat_ticks(), 0);
    clock.advance_us(10_000);
    assert_eq!(timebase.heartbeat_ticks(), 1);
}

#[test]
fn delay_against_host_clock() {
    let config = TimerConfig::from_mhz(125);
    let mut timebase = Timebase::init(host_timers(config.core_clock_hz()), config);
    for us in [50, 500, 5_000] {
        let start = std::time::Instant::now();
        timebase.delay_us(us);
        assert!(start.elapsed() >= std::time::Duration::from_micros(u64::from(us)));
    }

    let start = std::time::Instant::now();
    timebase.start_timeout(1_000);
    while !timebase.has_timed_out() {}
    assert!(start.elapsed() >= std::time::Duration::from_millis(1));
    assert!(timebase.has_timed_out());
}
