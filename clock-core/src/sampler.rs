//! Bit-level DCF77 sampler: a fixed finite-state machine run once per
//! 10 ms tick over the demodulated receiver line.
//!
//! The FSM discriminates pulse widths against a fixed timing grid: a
//! 100 ms carrier dip encodes a 0, a 200 ms dip encodes a 1, and the
//! missing dip of the 59th second marks the start of a minute. The seven
//! window boundaries and the transition table are the receiver's pulse
//! discriminator; they must not be altered.

use crate::types::{DecodeEvent, SamplerOutput, Symbol};

/// Timing-window boundaries in 10 ms units since the last counter reset
pub const TIMING_WINDOWS: [u8; 7] = [6, 15, 17, 25, 95, 120, 220];

/// Number of FSM states
pub const SAMPLER_STATES: usize = 13;

#[derive(Copy, Clone)]
struct Transition {
    next: u8,
    out: SamplerOutput,
}

const fn t(next: u8, out: SamplerOutput) -> Transition {
    Transition { next, out }
}

use SamplerOutput::{Error, MinuteMark, None as No, One, Reset, Zero};

/// Transition table indexed by (state, symbol); symbol order is
/// TimingWindow, High, Low.
#[rustfmt::skip]
const ZETA: [[Transition; 3]; SAMPLER_STATES] = [
    /* S0  */ [t(0, Error),      t(1, Reset),      t(0, No)],
    /* S1  */ [t(2, No),         t(1, No),         t(0, Error)],
    /* S2  */ [t(7, No),         t(2, No),         t(3, No)],
    /* S3  */ [t(4, No),         t(0, Error),      t(3, No)],
    /* S4  */ [t(5, No),         t(0, Error),      t(4, No)],
    /* S5  */ [t(6, No),         t(0, Error),      t(5, No)],
    /* S6  */ [t(11, Zero),      t(0, Error),      t(6, No)],
    /* S7  */ [t(8, No),         t(7, No),         t(0, Error)],
    /* S8  */ [t(0, Error),      t(8, No),         t(9, No)],
    /* S9  */ [t(10, No),        t(0, Error),      t(9, No)],
    /* S10 */ [t(11, One),       t(0, Error),      t(10, No)],
    /* S11 */ [t(12, No),        t(1, Reset),      t(11, No)],
    /* S12 */ [t(0, Error),      t(1, MinuteMark), t(12, No)],
];

/// Pure table lookup: next state and output for a (state, symbol) pair
pub fn transition(state: u8, symbol: Symbol) -> (u8, SamplerOutput) {
    let column = match symbol {
        Symbol::TimingWindow => 0,
        Symbol::High => 1,
        Symbol::Low => 2,
    };
    let entry = ZETA[state as usize][column];
    (entry.next, entry.out)
}

/// The bit-level sampler FSM.
///
/// Owned exclusively by the 10 ms interrupt context; the only thing that
/// leaves it is the [`DecodeEvent`] posted into the mailbox.
pub struct BitSampler {
    state: u8,
    ten_ms: u8,
}

impl BitSampler {
    pub const fn new() -> Self {
        Self { state: 0, ten_ms: 0 }
    }

    /// Current FSM state (S0..S12)
    pub fn state(&self) -> u8 {
        self.state
    }

    /// Ticks since the last counter reset, in 10 ms units
    pub fn tick_count(&self) -> u8 {
        self.ten_ms
    }

    /// Evaluate one 10 ms tick against the current line level.
    ///
    /// The timing-window symbol takes priority over the line level. The
    /// tick counter restarts on `Reset`/`MinuteMark` and increments after
    /// every evaluation regardless of output.
    pub fn step(&mut self, line_high: bool) -> SamplerOutput {
        let symbol = if TIMING_WINDOWS.contains(&self.ten_ms) {
            Symbol::TimingWindow
        } else if line_high {
            Symbol::High
        } else {
            Symbol::Low
        };

        let (next, out) = transition(self.state, symbol);
        #[cfg(feature = "defmt")]
        if out != SamplerOutput::None {
            defmt::trace!("sampler S{} -> S{} ({:?})", self.state, next, out);
        }
        self.state = next;

        if out.restarts_counter() {
            self.ten_ms = 0;
        }
        self.ten_ms = self.ten_ms.wrapping_add(1);
        out
    }

    /// [`Self::step`] with `None`/`Reset` filtered out: the event to post
    /// into the mailbox, if any
    pub fn sample(&mut self, line_high: bool) -> Option<DecodeEvent> {
        self.step(line_high).event()
    }

    /// Return to S0 with a cleared tick counter (used when the sampler
    /// interrupt is re-enabled after a power-down)
    pub fn reset(&mut self) {
        self.state = 0;
        self.ten_ms = 0;
    }
}

impl Default for BitSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Async wrapper driving the sampler at its 10 ms rate.
///
/// Runs forever; gating happens through the `enabled` check so the task
/// mirrors an ISR that the mode controller masks and unmasks.
#[cfg(feature = "embassy-time")]
pub async fn sampler_loop<S>(
    mut signal: S,
    shared: &crate::shared::ClockShared,
    enabled: impl Fn() -> bool,
) -> Result<(), S::Error>
where
    S: crate::hal::SignalInput,
{
    use embassy_time::{Duration, Ticker};

    let mut sampler = BitSampler::new();
    let mut ticker = Ticker::every(Duration::from_millis(10));
    loop {
        ticker.next().await;
        if !enabled() {
            sampler.reset();
            continue;
        }
        if let Some(event) = sampler.sample(signal.is_high()?) {
            shared.mailbox.post(event);
        }
    }
}
