//! Core data types for the radio clock

/// Discrete events produced by the bit-level sampler, at most one per 10 ms tick
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeEvent {
    /// A logical 0 bit was received
    Zero,
    /// A logical 1 bit was received
    One,
    /// The minute mark (missing 59th second pulse) was detected
    MinuteMark,
    /// The pulse train violated the timing grid
    Error,
}

impl DecodeEvent {
    /// Returns the bit value carried by this event, if it carries one
    pub const fn bit(&self) -> Option<u8> {
        match self {
            DecodeEvent::Zero => Some(0),
            DecodeEvent::One => Some(1),
            DecodeEvent::MinuteMark | DecodeEvent::Error => None,
        }
    }
}

/// Raw output alphabet of the sampler FSM.
///
/// `Reset` restarts the tick counter without reporting anything upstream;
/// everything except `None` and `Reset` is forwarded as a [`DecodeEvent`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplerOutput {
    None,
    Reset,
    Zero,
    One,
    MinuteMark,
    Error,
}

impl SamplerOutput {
    /// The decode event to forward to the telegram decoder, if any
    pub const fn event(&self) -> Option<DecodeEvent> {
        match self {
            SamplerOutput::Zero => Some(DecodeEvent::Zero),
            SamplerOutput::One => Some(DecodeEvent::One),
            SamplerOutput::MinuteMark => Some(DecodeEvent::MinuteMark),
            SamplerOutput::Error => Some(DecodeEvent::Error),
            SamplerOutput::None | SamplerOutput::Reset => None,
        }
    }

    /// Returns true if this output restarts the tick counter
    pub const fn restarts_counter(&self) -> bool {
        matches!(self, SamplerOutput::Reset | SamplerOutput::MinuteMark)
    }
}

/// Ternary input symbol of the sampler FSM, derived once per 10 ms tick
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Symbol {
    /// The tick counter sits on one of the fixed timing-window boundaries
    TimingWindow,
    /// The demodulated line reads logic-high
    High,
    /// The demodulated line reads logic-low
    Low,
}

/// Synchronization state of the clock
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SyncStatus {
    /// No valid telegram received yet
    Unsynced = 0,
    /// Wall clock carries a decoded time
    Synced = 1,
    /// A daily trigger asked for a fresh sync
    ResyncRequested = 2,
}

impl SyncStatus {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SyncStatus::Synced,
            2 => SyncStatus::ResyncRequested,
            _ => SyncStatus::Unsynced,
        }
    }
}

/// Hour/minute pair as decoded from a telegram or configured as a trigger
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    pub hours: u8,
    pub minutes: u8,
}

impl TimeOfDay {
    pub const fn new(hours: u8, minutes: u8) -> Self {
        Self { hours, minutes }
    }
}

/// One fully validated DCF77 minute frame.
///
/// Only `hours`/`minutes` feed the clock path; the date fields are decoded
/// because they participate in the date parity check.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telegram {
    pub hours: u8,
    pub minutes: u8,
    pub day: u8,
    pub month: u8,
    /// Two-digit year (2000-based)
    pub year: u8,
    /// CEST announced (bit 17 set)
    pub summer_time: bool,
}

impl Telegram {
    pub const fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::new(self.hours, self.minutes)
    }
}

/// Wall-clock time kept by the 1 Hz real-time counter
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WallClock {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// Raw display value reported while the clock has never been synced
pub const UNSYNCED_SENTINEL: (u8, u8) = (0xFF, 0xFF);

impl WallClock {
    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Advance by one second with full rollover.
    ///
    /// Returns true when the minute changed, so callers can refresh a
    /// minute-granular display without re-reading the clock.
    pub fn tick_second(&mut self) -> bool {
        self.seconds += 1;
        if self.seconds < 60 {
            return false;
        }
        self.seconds = 0;
        self.minutes += 1;
        if self.minutes >= 60 {
            self.minutes = 0;
            self.hours += 1;
            if self.hours >= 24 {
                self.hours = 0;
            }
        }
        true
    }

    /// Overwrite hour and minute from a decoded telegram, zeroing seconds
    pub fn set_time(&mut self, time: TimeOfDay) {
        self.hours = time.hours;
        self.minutes = time.minutes;
        self.seconds = 0;
    }

    pub const fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::new(self.hours, self.minutes)
    }
}

/// Operating modes of the clock controller
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Receiver powered, sampler running, waiting for a valid telegram
    Resync,
    /// Free-running on the low-power oscillator
    Idle,
    /// Bounded PWM demonstration ramp
    PwmSequence,
}

/// When the hour/minute display is rewritten
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayRefresh {
    /// Rewrite on every second tick
    EverySecond,
    /// Rewrite only when the minute rolls over
    OnMinuteRollover,
}

/// Clock configuration parameters
#[derive(Copy, Clone, Debug)]
pub struct ClockConfig {
    /// Hardware timer ticks per PWM duty step (256 steps per cycle)
    pub ticks_per_step: u16,
    /// Daily wall-clock instants that request a resync
    pub resync_times: [TimeOfDay; 2],
    /// Display refresh policy
    pub display_refresh: DisplayRefresh,
    /// Number of full duty sweeps run by the PWM demonstration ramp
    pub demo_passes: u8,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ticks_per_step: 39, // 8 MHz / (8 * 50 Hz * 256 steps)
            resync_times: [TimeOfDay::new(5, 45), TimeOfDay::new(18, 48)],
            display_refresh: DisplayRefresh::EverySecond,
            demo_passes: 5,
        }
    }
}

impl ClockConfig {
    /// Create a new configuration with validation
    pub fn new(
        ticks_per_step: u16,
        resync_times: [TimeOfDay; 2],
        display_refresh: DisplayRefresh,
        demo_passes: u8,
    ) -> Result<Self, &'static str> {
        if ticks_per_step == 0 {
            return Err("ticks_per_step must be at least 1");
        }
        // One full cycle (256 steps) must fit the 16-bit compare register.
        if ticks_per_step > u16::MAX / crate::pwm::PWM_STEPS {
            return Err("PWM period exceeds the 16-bit timer range");
        }
        for time in &resync_times {
            if time.hours >= 24 || time.minutes >= 60 {
                return Err("resync time out of range");
            }
        }
        if demo_passes == 0 {
            return Err("demo ramp needs at least one pass");
        }
        Ok(Self {
            ticks_per_step,
            resync_times,
            display_refresh,
            demo_passes,
        })
    }

    /// Length of one full PWM cycle in hardware timer ticks
    pub const fn pwm_period_ticks(&self) -> u32 {
        self.ticks_per_step as u32 * crate::pwm::PWM_STEPS as u32
    }
}
