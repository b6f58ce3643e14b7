//! End-to-end tests: scripted radio line through sampler, mailbox,
//! telegram decoder and mode controller, plus the firmware board glue.

use core::sync::atomic::Ordering;

use clock_core::hal::mock::{MockClockHal, MockSignal};
use clock_core::hal::{ClockHal, ReceiverPower, SignalInput, TickSource};
use clock_core::shared::ClockShared;
use clock_core::test_utils::{corrupt_bit, encode_frame, script_frame, script_minute_start, FrameSpec};
use clock_core::types::{ClockConfig, Mode, SyncStatus, WallClock};
use clock_core::{BitSampler, ModeController};

/// Feed a scripted line through the sampler at the 10 ms rate, posting
/// into the mailbox and polling the controller once per tick.
fn run_radio(
    signal: &mut MockSignal,
    sampler: &mut BitSampler,
    controller: &mut ModeController,
    hal: &mut MockClockHal,
    shared: &ClockShared,
) {
    while !signal.exhausted() {
        let level = signal.is_high().unwrap();
        if let Some(event) = sampler.sample(level) {
            shared.mailbox.post(event);
        }
        controller.poll(hal, shared).unwrap();
    }
}

#[test]
fn radio_stream_syncs_the_clock() {
    let spec = FrameSpec {
        hours: 9,
        minutes: 30,
        ..FrameSpec::default()
    };
    let mut signal = MockSignal::new();
    script_frame(&mut signal, &encode_frame(&spec));
    script_minute_start(&mut signal);

    let mut sampler = BitSampler::new();
    let mut controller = ModeController::new(ClockConfig::default());
    let mut hal = MockClockHal::new();
    let shared = ClockShared::new();

    run_radio(&mut signal, &mut sampler, &mut controller, &mut hal, &shared);

    assert_eq!(controller.mode(), Mode::Idle);
    assert_eq!(shared.sync.get(), SyncStatus::Synced);
    assert_eq!(shared.clock.get(), WallClock::new(9, 30, 0));
    assert_eq!(controller.get_time(&shared), (9, 30));
    assert_eq!(hal.rtc.restarts, 1);
    assert!(!hal.power.is_powered().unwrap());
    assert!(!hal.sampler_tick.is_enabled());
    assert_eq!(hal.display.last, Some((9, 30)));
}

// Sync once from a clean scripted frame; the sampler and controller
// keep their state for whatever the test feeds next.
fn synced_pipeline() -> (BitSampler, ModeController, MockClockHal, ClockShared) {
    let mut signal = MockSignal::new();
    script_frame(&mut signal, &encode_frame(&FrameSpec::default()));
    script_minute_start(&mut signal);

    let mut sampler = BitSampler::new();
    let mut controller = ModeController::new(ClockConfig::default());
    let mut hal = MockClockHal::new();
    let shared = ClockShared::new();
    run_radio(&mut signal, &mut sampler, &mut controller, &mut hal, &shared);
    assert_eq!(shared.clock.get(), WallClock::new(12, 34, 0));
    (sampler, controller, hal, shared)
}

#[test]
fn corrupted_resync_leaves_the_clock_untouched() {
    let (mut sampler, mut controller, mut hal, shared) = synced_pipeline();

    shared.sync.set(SyncStatus::ResyncRequested);
    controller.poll(&mut hal, &shared).unwrap();
    assert_eq!(controller.mode(), Mode::Resync);

    let mut bad = encode_frame(&FrameSpec {
        minutes: 35,
        ..FrameSpec::default()
    });
    corrupt_bit(&mut bad, 24);
    let mut signal = MockSignal::new();
    script_frame(&mut signal, &bad);
    script_minute_start(&mut signal);
    run_radio(&mut signal, &mut sampler, &mut controller, &mut hal, &shared);

    assert_eq!(controller.mode(), Mode::Resync);
    assert_eq!(shared.clock.get(), WallClock::new(12, 34, 0));
    assert_eq!(hal.rtc.restarts, 1);
}

#[test]
fn resync_retries_until_a_clean_frame_arrives() {
    let (mut sampler, mut controller, mut hal, shared) = synced_pipeline();

    shared.sync.set(SyncStatus::ResyncRequested);
    controller.poll(&mut hal, &shared).unwrap();

    // One corrupted minute followed by a clean one, as one continuous
    // transmission.
    let mut bad = encode_frame(&FrameSpec {
        minutes: 35,
        ..FrameSpec::default()
    });
    corrupt_bit(&mut bad, 24);
    let good = encode_frame(&FrameSpec {
        minutes: 36,
        ..FrameSpec::default()
    });
    let mut signal = MockSignal::new();
    script_frame(&mut signal, &bad);
    script_frame(&mut signal, &good);
    script_minute_start(&mut signal);
    run_radio(&mut signal, &mut sampler, &mut controller, &mut hal, &shared);

    assert_eq!(controller.mode(), Mode::Idle);
    assert_eq!(shared.clock.get(), WallClock::new(12, 36, 0));
    assert_eq!(hal.rtc.restarts, 2);
}

#[test]
fn firmware_board_gates_tasks_through_the_hal() {
    use funkuhr_firmware::{Board, RADIO_LEVEL, SAMPLER_GATE, WAVEFORM_GATE};

    let mut board = Board::new();

    board.sampler_tick().enable().unwrap();
    assert!(SAMPLER_GATE.load(Ordering::Acquire));
    board.sampler_tick().disable().unwrap();
    assert!(!SAMPLER_GATE.load(Ordering::Acquire));

    board.waveform_tick().enable().unwrap();
    assert!(WAVEFORM_GATE.load(Ordering::Acquire));
    board.waveform_tick().disable().unwrap();

    RADIO_LEVEL.store(true, Ordering::Release);
    assert!(board.signal().is_high().unwrap());
    RADIO_LEVEL.store(false, Ordering::Release);
    assert!(!board.signal().is_high().unwrap());

    // The controller's first resync poll powers the receiver and opens
    // the sampler gate on this board too.
    let shared = ClockShared::new();
    let mut controller = ModeController::new(ClockConfig::default());
    controller.poll(&mut board, &shared).unwrap();
    assert!(board.power.is_powered().unwrap());
    assert!(SAMPLER_GATE.load(Ordering::Acquire));
    SAMPLER_GATE.store(false, Ordering::Release);
}
