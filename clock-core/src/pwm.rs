//! Software PWM: schedule builder, double-buffered handoff and the
//! waveform generator driven by the variable-period compare interrupt.
//!
//! The scheduler turns per-channel duty values into a compact event list:
//! one leading "set all active channels" event followed by at most one
//! clear event per distinct duty threshold, each carrying the tick delta
//! to the next event. The generator walks that list, ANDing clear masks
//! into the output port and re-arming the compare register by free-running
//! accumulation, so the cycle period is exact regardless of interrupt
//! latency jitter.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::hal::PwmOutput;

/// Number of software PWM channels
pub const PWM_CHANNELS: usize = 3;

/// Duty steps per PWM cycle
pub const PWM_STEPS: u16 = 256;

/// Maximum events per cycle: the leading set event plus one clear event
/// per channel
pub const MAX_EVENTS: usize = PWM_CHANNELS + 1;

/// Errors of the PWM handoff path
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmError {
    /// The generator did not complete a cycle within the allowed window
    SwapTimeout,
}

/// One compiled PWM event schedule.
///
/// Index 0 is the set event (mask written to the port at cycle start);
/// indices 1..=last are clear events (mask ANDed into the port). Deltas
/// are in hardware timer ticks and always sum to one full cycle.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Schedule {
    masks: [u8; MAX_EVENTS],
    deltas: [u16; MAX_EVENTS],
    last: u8,
}

impl Schedule {
    /// Placeholder schedule used before the first build: all channels
    /// off, two dummy half-cycles of one step each
    pub const fn idle() -> Self {
        let mut deltas = [0; MAX_EVENTS];
        deltas[0] = PWM_STEPS / 2;
        deltas[1] = PWM_STEPS / 2;
        let mut masks = [0; MAX_EVENTS];
        masks[1] = 0xFF;
        Self {
            masks,
            deltas,
            last: 1,
        }
    }

    /// Mask written to the output port at the start of each cycle
    pub fn set_mask(&self) -> u8 {
        self.masks[0]
    }

    /// Number of events per cycle (set event included)
    pub fn event_count(&self) -> usize {
        self.last as usize + 1
    }

    /// Per-event tick deltas, set event first
    pub fn deltas(&self) -> &[u16] {
        &self.deltas[..self.event_count()]
    }

    /// Clear masks of events 1..=last
    pub fn clear_masks(&self) -> &[u8] {
        &self.masks[1..self.event_count()]
    }

    /// Total cycle length in hardware timer ticks
    pub fn period_ticks(&self) -> u32 {
        self.deltas().iter().map(|&d| d as u32).sum()
    }
}

/// Compile channel duty values into an event schedule.
///
/// Thresholds are sorted ascending (ties broken by channel order),
/// equal thresholds merge into one event by AND-combining their clear
/// masks, zero-duty channels are dropped. The all-off case degenerates
/// into two half-period events so the generator loop stays uniform.
pub fn build_schedule(duties: &[u8; PWM_CHANNELS], ticks_per_step: u16) -> Schedule {
    // Thresholds as (duty, channel) so the sort is stable by channel order.
    let mut thresholds: heapless::Vec<(u8, u8), PWM_CHANNELS> = heapless::Vec::new();
    let mut set_mask = 0u8;
    for (channel, &duty) in duties.iter().enumerate() {
        if duty != 0 {
            set_mask |= 1 << channel;
            // Capacity equals the channel count, the push cannot fail.
            let _ = thresholds.push((duty, channel as u8));
        }
    }
    thresholds.sort_unstable_by_key(|&(duty, channel)| (duty, channel));

    // Merge equal thresholds into one clear event.
    let mut merged: heapless::Vec<(u8, u8), PWM_CHANNELS> = heapless::Vec::new();
    for &(duty, channel) in &thresholds {
        let clear = !(1u8 << channel);
        match merged.last_mut() {
            Some((last_duty, mask)) if *last_duty == duty => *mask &= clear,
            _ => {
                let _ = merged.push((duty, clear));
            }
        }
    }

    let mut schedule = Schedule {
        masks: [0; MAX_EVENTS],
        deltas: [0; MAX_EVENTS],
        last: 1,
    };
    schedule.masks[0] = set_mask;

    if merged.is_empty() {
        // All channels off: split the period into two dummy events.
        let half = ticks_per_step * (PWM_STEPS / 2);
        schedule.deltas[0] = half;
        schedule.deltas[1] = half;
        schedule.masks[1] = 0xFF;
        return schedule;
    }

    for (i, &(_, mask)) in merged.iter().enumerate() {
        schedule.masks[i + 1] = mask;
    }
    // Delta from the set event to the first clear, then between clears,
    // then from the highest threshold back to the cycle start.
    schedule.deltas[0] = merged[0].0 as u16 * ticks_per_step;
    for i in 1..merged.len() {
        schedule.deltas[i] = (merged[i].0 - merged[i - 1].0) as u16 * ticks_per_step;
    }
    let highest = merged[merged.len() - 1].0 as u16;
    schedule.deltas[merged.len()] = (PWM_STEPS - highest) * ticks_per_step;
    schedule.last = merged.len() as u8;
    schedule
}

struct Slots {
    slots: [Schedule; 2],
    /// Index of the slot the generator is walking
    active: usize,
    /// The inactive slot holds a schedule waiting for a cycle boundary
    pending: bool,
}

/// Double-buffered producer/consumer handoff for PWM schedules.
///
/// The producer stores a new schedule into the inactive slot; the
/// generator swaps it in at its next cycle boundary, inside the same
/// critical section it reads events under. The generator therefore never
/// observes a half-replaced schedule, and the producer never blocks.
pub struct PwmHandoff {
    inner: Mutex<RefCell<Slots>>,
    cycle_complete: AtomicBool,
}

impl PwmHandoff {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Slots {
                slots: [Schedule::idle(), Schedule::idle()],
                active: 0,
                pending: false,
            })),
            cycle_complete: AtomicBool::new(false),
        }
    }

    /// Publish a new schedule; it takes effect at the generator's next
    /// cycle boundary
    pub fn publish(&self, schedule: Schedule) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let back = 1 - inner.active;
            inner.slots[back] = schedule;
            inner.pending = true;
        });
    }

    /// True while a published schedule has not been swapped in yet
    pub fn swap_pending(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).pending)
    }

    /// Consume the cycle-complete flag raised by the generator
    pub fn take_cycle_complete(&self) -> bool {
        self.cycle_complete.swap(false, Ordering::AcqRel)
    }

    /// Snapshot of the schedule the generator is currently walking
    pub fn active_schedule(&self) -> Schedule {
        critical_section::with(|cs| {
            let inner = self.inner.borrow_ref(cs);
            inner.slots[inner.active]
        })
    }

    /// Publish and wait until the generator has taken the schedule over,
    /// with an explicit timeout bounding producer latency
    #[cfg(feature = "embassy-time")]
    pub async fn publish_and_sync(
        &self,
        schedule: Schedule,
        timeout: embassy_time::Duration,
    ) -> Result<(), PwmError> {
        use embassy_time::{Duration, Instant, Timer};

        self.publish(schedule);
        let deadline = Instant::now() + timeout;
        while self.swap_pending() {
            if Instant::now() >= deadline {
                return Err(PwmError::SwapTimeout);
            }
            Timer::after(Duration::from_millis(1)).await;
        }
        Ok(())
    }
}

impl Default for PwmHandoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the active schedule from the compare interrupt.
///
/// Owned exclusively by the interrupt context; the schedule lives in the
/// handoff and is read one event at a time under a critical section.
pub struct WaveformGenerator {
    index: u8,
}

impl WaveformGenerator {
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    /// Current event index within the cycle
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Process one compare event: apply the event's mask to the output
    /// port and return the tick delta the caller must add to the compare
    /// register. At the end of a cycle the cycle-complete flag is raised
    /// and a pending schedule swap is applied.
    pub fn on_compare<O: PwmOutput>(
        &mut self,
        handoff: &PwmHandoff,
        out: &mut O,
    ) -> Result<u16, O::Error> {
        critical_section::with(|cs| {
            let mut inner = handoff.inner.borrow_ref_mut(cs);
            let schedule = inner.slots[inner.active];
            let index = self.index as usize;

            if index == 0 {
                out.write(schedule.set_mask())?;
            } else {
                out.and(schedule.masks[index])?;
            }
            let delta = schedule.deltas[index];

            if index >= schedule.last as usize {
                self.index = 0;
                handoff.cycle_complete.store(true, Ordering::Release);
                if inner.pending {
                    inner.active = 1 - inner.active;
                    inner.pending = false;
                }
            } else {
                self.index += 1;
            }
            Ok(delta)
        })
    }
}

impl Default for WaveformGenerator {
    fn default() -> Self {
        Self::new()
    }
}
