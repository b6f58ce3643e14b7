//! Test utilities: DCF77 frame encoding and receiver-line scripting.
//!
//! Everything here is host-side tooling. Frames are encoded with correct
//! parities so tests corrupt exactly the bit they mean to.

use crate::hal::mock::MockSignal;
use crate::hal::SignalInput;
use crate::sampler::BitSampler;
use crate::types::DecodeEvent;

/// Parameters of one synthetic minute frame
#[derive(Copy, Clone, Debug)]
pub struct FrameSpec {
    pub hours: u8,
    pub minutes: u8,
    pub day: u8,
    pub weekday: u8,
    pub month: u8,
    pub year: u8,
    pub summer_time: bool,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            hours: 12,
            minutes: 34,
            day: 15,
            weekday: 6,
            month: 6,
            year: 24,
            summer_time: true,
        }
    }
}

fn put_bcd(bits: &mut [u8; 59], start: usize, width: usize, value: u8) {
    let ones = value % 10;
    let tens = value / 10;
    for j in 0..width {
        bits[start + j] = if j < 4 {
            (ones >> j) & 1
        } else {
            (tens >> (j - 4)) & 1
        };
    }
}

fn parity(bits: &[u8]) -> u8 {
    bits.iter().fold(0, |acc, &b| acc ^ b)
}

/// Encode a frame spec into the 59 transmitted bit values, parities
/// included
pub fn encode_frame(spec: &FrameSpec) -> [u8; 59] {
    let mut bits = [0u8; 59];
    bits[17] = spec.summer_time as u8;
    bits[18] = !spec.summer_time as u8;
    bits[20] = 1;
    put_bcd(&mut bits, 21, 7, spec.minutes);
    bits[28] = parity(&bits[21..28]);
    put_bcd(&mut bits, 29, 6, spec.hours);
    bits[35] = parity(&bits[29..35]);
    put_bcd(&mut bits, 36, 6, spec.day);
    put_bcd(&mut bits, 42, 3, spec.weekday);
    put_bcd(&mut bits, 45, 5, spec.month);
    put_bcd(&mut bits, 50, 8, spec.year);
    bits[58] = parity(&bits[36..58]);
    bits
}

/// Flip one transmitted bit in place
pub fn corrupt_bit(bits: &mut [u8; 59], index: usize) {
    bits[index] ^= 1;
}

/// The decode-event sequence a perfect receiver would deliver for these
/// bits: 59 bit events followed by the minute mark
pub fn frame_events(bits: &[u8; 59]) -> heapless::Vec<DecodeEvent, 60> {
    let mut events = heapless::Vec::new();
    for &b in bits {
        let event = if b != 0 {
            DecodeEvent::One
        } else {
            DecodeEvent::Zero
        };
        let _ = events.push(event);
    }
    let _ = events.push(DecodeEvent::MinuteMark);
    events
}

/// Script one minute of receiver line activity onto a mock signal:
/// a 100 ms pulse per 0 bit, 200 ms per 1 bit, one second per bit, and
/// the missing 59th pulse.
///
/// The minute mark itself is only emitted on the NEXT rising edge, so
/// append another frame (or [`script_minute_start`]) after this one.
pub fn script_frame(signal: &mut MockSignal, bits: &[u8; 59]) {
    for &b in bits {
        let high: u16 = if b != 0 { 20 } else { 10 };
        signal.push(true, high);
        signal.push(false, 100 - high);
    }
    // Second 59 carries no pulse.
    signal.push(false, 100);
}

/// The first pulse of the following minute, enough to fire the mark.
/// The tail stays short of the 95-tick window so the partial bit never
/// decodes.
pub fn script_minute_start(signal: &mut MockSignal) {
    signal.push(true, 10);
    signal.push(false, 80);
}

/// Drive the sampler over the whole script at the 10 ms rate and collect
/// every decode event
pub fn run_script(
    signal: &mut MockSignal,
    sampler: &mut BitSampler,
) -> heapless::Vec<DecodeEvent, 128> {
    let mut events = heapless::Vec::new();
    while !signal.exhausted() {
        let level = signal.is_high().unwrap_or(false);
        if let Some(event) = sampler.sample(level) {
            let _ = events.push(event);
        }
    }
    events
}
