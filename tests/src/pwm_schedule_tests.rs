//! PWM scheduler and generator properties: per-channel on-time,
//! period exactness and swap atomicity.

use clock_core::hal::mock::MockPwmPort;
use clock_core::pwm::{build_schedule, PwmHandoff, Schedule, WaveformGenerator, PWM_CHANNELS};
use proptest::prelude::*;

/// Run the generator through exactly one cycle of the published
/// schedule, accumulating how long each channel line stayed high.
fn channel_on_times(duties: [u8; PWM_CHANNELS], ticks_per_step: u16) -> [u32; PWM_CHANNELS] {
    let handoff = PwmHandoff::new();
    handoff.publish(build_schedule(&duties, ticks_per_step));
    let mut generator = WaveformGenerator::new();
    let mut port = MockPwmPort::new();

    // Run out the idle schedule so the swap lands.
    while !handoff.take_cycle_complete() {
        generator.on_compare(&handoff, &mut port).unwrap();
    }

    let mut on = [0u32; PWM_CHANNELS];
    loop {
        let delta = generator.on_compare(&handoff, &mut port).unwrap();
        for (channel, acc) in on.iter_mut().enumerate() {
            if port.state() & (1 << channel) != 0 {
                *acc += delta as u32;
            }
        }
        if handoff.take_cycle_complete() {
            break;
        }
    }
    on
}

/// Collect the deltas of one full generator cycle.
fn one_cycle(generator: &mut WaveformGenerator, handoff: &PwmHandoff, port: &mut MockPwmPort) -> Vec<u16> {
    let mut deltas = Vec::new();
    loop {
        deltas.push(generator.on_compare(handoff, port).unwrap());
        if handoff.take_cycle_complete() {
            return deltas;
        }
    }
}

proptest! {
    #[test]
    fn deltas_sum_to_one_period(d0: u8, d1: u8, d2: u8, tps in 1u16..=255) {
        let schedule = build_schedule(&[d0, d1, d2], tps);
        prop_assert_eq!(schedule.period_ticks(), 256 * tps as u32);
    }

    #[test]
    fn on_time_equals_duty_times_step(d0: u8, d1: u8, d2: u8) {
        let tps = 39;
        let on = channel_on_times([d0, d1, d2], tps);
        let expected = [d0, d1, d2].map(|d| d as u32 * tps as u32);
        prop_assert_eq!(on, expected);
    }
}

#[test]
fn mid_cycle_publish_never_tears_a_cycle() {
    let first = build_schedule(&[40, 80, 120], 1);
    let second = build_schedule(&[200, 10, 0], 1);

    let handoff = PwmHandoff::new();
    handoff.publish(first);
    let mut generator = WaveformGenerator::new();
    let mut port = MockPwmPort::new();
    while !handoff.take_cycle_complete() {
        generator.on_compare(&handoff, &mut port).unwrap();
    }

    // Interrupt the first schedule's cycle with a new publish.
    let partial = generator.on_compare(&handoff, &mut port).unwrap();
    handoff.publish(second);
    assert!(handoff.swap_pending());

    let mut cycle = vec![partial];
    loop {
        cycle.push(generator.on_compare(&handoff, &mut port).unwrap());
        if handoff.take_cycle_complete() {
            break;
        }
    }
    // The interrupted cycle still ran entirely on the first schedule.
    assert_eq!(cycle.as_slice(), first.deltas());
    assert!(!handoff.swap_pending());

    // And the following cycle is entirely the second schedule.
    let next = one_cycle(&mut generator, &handoff, &mut port);
    assert_eq!(next.as_slice(), second.deltas());
    assert_eq!(handoff.active_schedule(), second);
}

#[test]
fn republishing_overwrites_the_back_slot() {
    let handoff = PwmHandoff::new();
    handoff.publish(build_schedule(&[1, 2, 3], 1));
    handoff.publish(build_schedule(&[9, 9, 9], 1));

    let mut generator = WaveformGenerator::new();
    let mut port = MockPwmPort::new();
    while !handoff.take_cycle_complete() {
        generator.on_compare(&handoff, &mut port).unwrap();
    }
    // Only the latest publish survives the swap.
    assert_eq!(handoff.active_schedule(), build_schedule(&[9, 9, 9], 1));
}

#[test]
fn all_off_schedule_still_cycles() {
    let schedule: Schedule = build_schedule(&[0, 0, 0], 10);
    assert_eq!(schedule.set_mask(), 0);
    assert_eq!(schedule.event_count(), 2);
    assert_eq!(schedule.period_ticks(), 2560);
    assert_eq!(channel_on_times([0, 0, 0], 10), [0, 0, 0]);
}
