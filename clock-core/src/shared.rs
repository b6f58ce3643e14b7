//! State shared between interrupt and main-loop contexts.
//!
//! Single-word values live in `core::sync::atomic` cells; anything wider
//! (the wall clock, the PWM duty table) sits behind a
//! `critical_section::Mutex` and is only touched inside
//! `critical_section::with`, which masks interrupts for the span of the
//! closure and restores the prior state on every exit path.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use critical_section::Mutex;

use crate::pwm::PwmHandoff;
use crate::rtc::SharedClock;
use crate::types::{DecodeEvent, SyncStatus};

/// Single-slot, latest-wins mailbox for decode events.
///
/// The 10 ms interrupt posts at most one event per tick; an unconsumed
/// event is silently overwritten. A main loop polling slower than the
/// tick rate loses bits — accepted tradeoff, not a queue to be added.
pub struct EventMailbox {
    slot: AtomicU8,
}

const MAILBOX_EMPTY: u8 = 0;

const fn encode(event: DecodeEvent) -> u8 {
    match event {
        DecodeEvent::Zero => 1,
        DecodeEvent::One => 2,
        DecodeEvent::MinuteMark => 3,
        DecodeEvent::Error => 4,
    }
}

const fn decode(raw: u8) -> Option<DecodeEvent> {
    match raw {
        1 => Some(DecodeEvent::Zero),
        2 => Some(DecodeEvent::One),
        3 => Some(DecodeEvent::MinuteMark),
        4 => Some(DecodeEvent::Error),
        _ => None,
    }
}

impl EventMailbox {
    pub const fn new() -> Self {
        Self {
            slot: AtomicU8::new(MAILBOX_EMPTY),
        }
    }

    /// Post an event, overwriting any unconsumed one (interrupt context)
    pub fn post(&self, event: DecodeEvent) {
        self.slot.store(encode(event), Ordering::Release);
    }

    /// Drain the mailbox (main-loop context)
    pub fn take(&self) -> Option<DecodeEvent> {
        decode(self.slot.swap(MAILBOX_EMPTY, Ordering::AcqRel))
    }
}

impl Default for EventMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Atomic wrapper around [`SyncStatus`]
pub struct SyncFlag {
    status: AtomicU8,
}

impl SyncFlag {
    pub const fn new() -> Self {
        Self {
            status: AtomicU8::new(SyncStatus::Unsynced as u8),
        }
    }

    pub fn get(&self) -> SyncStatus {
        SyncStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set(&self, status: SyncStatus) {
        self.status.store(status as u8, Ordering::Release);
    }
}

impl Default for SyncFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-channel duty settings written by the control surface and read by
/// the scheduler on its next pass
pub struct DutyTable {
    duties: Mutex<Cell<[u8; crate::pwm::PWM_CHANNELS]>>,
    dirty: AtomicBool,
}

impl DutyTable {
    pub const fn new() -> Self {
        Self {
            duties: Mutex::new(Cell::new([0; crate::pwm::PWM_CHANNELS])),
            dirty: AtomicBool::new(true),
        }
    }

    /// Set one channel's duty value; marks the table dirty so the
    /// scheduler recomputes on the next main-loop pass
    pub fn set(&self, channel: usize, value: u8) -> Result<(), &'static str> {
        if channel >= crate::pwm::PWM_CHANNELS {
            return Err("PWM channel index out of range");
        }
        critical_section::with(|cs| {
            let cell = self.duties.borrow(cs);
            let mut duties = cell.get();
            duties[channel] = value;
            cell.set(duties);
        });
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// Overwrite the whole table at once
    pub fn set_all(&self, duties: [u8; crate::pwm::PWM_CHANNELS]) {
        critical_section::with(|cs| self.duties.borrow(cs).set(duties));
        self.dirty.store(true, Ordering::Release);
    }

    pub fn get(&self) -> [u8; crate::pwm::PWM_CHANNELS] {
        critical_section::with(|cs| self.duties.borrow(cs).get())
    }

    /// Consume the dirty flag; true means the schedule must be rebuilt
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

impl Default for DutyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// All state shared across contexts, aggregated so the firmware can hold
/// a single `static`
pub struct ClockShared {
    pub mailbox: EventMailbox,
    pub clock: SharedClock,
    pub sync: SyncFlag,
    pub duties: DutyTable,
    pub pwm: PwmHandoff,
}

impl ClockShared {
    pub const fn new() -> Self {
        Self {
            mailbox: EventMailbox::new(),
            clock: SharedClock::new(),
            sync: SyncFlag::new(),
            duties: DutyTable::new(),
            pwm: PwmHandoff::new(),
        }
    }
}

impl Default for ClockShared {
    fn default() -> Self {
        Self::new()
    }
}
