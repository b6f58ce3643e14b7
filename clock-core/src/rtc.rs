//! Real-time counter: wall-clock time driven by the 1 Hz tick of the
//! independent low-power oscillator.
//!
//! The counter state is shared between the 1 Hz interrupt (increment)
//! and the main loop (reads, telegram commits), so it lives behind a
//! critical-section mutex. Phase-aligning the underlying hardware
//! prescaler after a sync is a HAL concern ([`crate::hal::RtcControl`]).

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::types::{TimeOfDay, WallClock};

/// Wall clock shared between the 1 Hz interrupt and the main loop
pub struct SharedClock {
    time: Mutex<Cell<WallClock>>,
    second_flag: AtomicBool,
    minute_flag: AtomicBool,
    /// Set once the first telegram has been committed; before that,
    /// readers get the unsynced sentinel.
    ever_synced: AtomicBool,
}

impl SharedClock {
    pub const fn new() -> Self {
        Self {
            time: Mutex::new(Cell::new(WallClock::new(0, 0, 0))),
            second_flag: AtomicBool::new(false),
            minute_flag: AtomicBool::new(false),
            ever_synced: AtomicBool::new(false),
        }
    }

    /// 1 Hz tick (interrupt context): rollover increment plus the flags
    /// the main loop polls for display refresh
    pub fn tick_second(&self) {
        let minute_changed = critical_section::with(|cs| {
            let cell = self.time.borrow(cs);
            let mut clock = cell.get();
            let changed = clock.tick_second();
            cell.set(clock);
            changed
        });
        self.second_flag.store(true, Ordering::Release);
        if minute_changed {
            self.minute_flag.store(true, Ordering::Release);
        }
    }

    /// Snapshot of the current time
    pub fn get(&self) -> WallClock {
        critical_section::with(|cs| self.time.borrow(cs).get())
    }

    /// Commit a decoded time: overwrite hour/minute, zero seconds
    pub fn set_time(&self, time: TimeOfDay) {
        critical_section::with(|cs| {
            let cell = self.time.borrow(cs);
            let mut clock = cell.get();
            clock.set_time(time);
            cell.set(clock);
        });
        self.ever_synced.store(true, Ordering::Release);
    }

    /// Consume the once-per-second flag
    pub fn take_second_flag(&self) -> bool {
        self.second_flag.swap(false, Ordering::AcqRel)
    }

    /// Consume the minute-rollover flag
    pub fn take_minute_flag(&self) -> bool {
        self.minute_flag.swap(false, Ordering::AcqRel)
    }

    /// True once a telegram has ever been committed
    pub fn ever_synced(&self) -> bool {
        self.ever_synced.load(Ordering::Acquire)
    }
}

impl Default for SharedClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Async wrapper standing in for the 1 Hz oscillator interrupt
#[cfg(feature = "embassy-time")]
pub async fn rtc_loop(shared: &crate::shared::ClockShared) -> ! {
    use embassy_time::{Duration, Ticker};

    let mut ticker = Ticker::every(Duration::from_secs(1));
    loop {
        ticker.next().await;
        shared.clock.tick_second();
    }
}
