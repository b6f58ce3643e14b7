#![no_std]

//! Firmware glue: board types behind the core HAL traits and embassy
//! tasks driving the clock components at their nominal rates.
//!
//! Register-level bring-up lives with the board crate that owns the
//! entry point; everything here is target-independent, so the same
//! tasks run against the scripted board in host tests.

use core::sync::atomic::AtomicBool;

pub use embassy_executor::Spawner;
pub use embassy_time::Duration;
pub use static_cell::StaticCell;

pub use clock_core::*;

pub use crate::board::*;
pub use crate::tasks::*;

/// Gate flipped by the mode controller to mask the 10 ms sampler task
pub static SAMPLER_GATE: AtomicBool = AtomicBool::new(false);

/// Gate for the waveform generator task
pub static WAVEFORM_GATE: AtomicBool = AtomicBool::new(false);

/// Demodulated receiver line level, written by the radio front end
/// interrupt (or by a test script)
pub static RADIO_LEVEL: AtomicBool = AtomicBool::new(false);

pub mod board {
    //! Task-gated board: HAL trait implementations whose "interrupt
    //! masking" flips the atomics the async tasks poll.

    use core::sync::atomic::{AtomicBool, Ordering};

    use clock_core::hal::{
        ClockHal, HalError, PwmOutput, ReceiverPower, RtcControl, SignalInput, TickSource,
        TimeDisplay,
    };

    /// Receiver line read from a shared level flag
    pub struct LevelSignal {
        level: &'static AtomicBool,
    }

    impl LevelSignal {
        pub const fn new(level: &'static AtomicBool) -> Self {
            Self { level }
        }
    }

    impl SignalInput for LevelSignal {
        type Error = HalError;

        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.level.load(Ordering::Acquire))
        }
    }

    /// Tick source that gates an async task instead of a timer interrupt
    pub struct GatedTick {
        gate: &'static AtomicBool,
    }

    impl GatedTick {
        pub const fn new(gate: &'static AtomicBool) -> Self {
            Self { gate }
        }
    }

    impl TickSource for GatedTick {
        type Error = HalError;

        fn enable(&mut self) -> Result<(), Self::Error> {
            self.gate.store(true, Ordering::Release);
            Ok(())
        }

        fn disable(&mut self) -> Result<(), Self::Error> {
            self.gate.store(false, Ordering::Release);
            Ok(())
        }
    }

    /// Radio module power rail
    #[derive(Default)]
    pub struct RadioPower {
        on: bool,
    }

    impl RadioPower {
        pub const fn new() -> Self {
            Self { on: false }
        }
    }

    impl ReceiverPower for RadioPower {
        type Error = HalError;

        fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
            #[cfg(feature = "defmt")]
            if on != self.on {
                defmt::info!("receiver power {}", if on { "on" } else { "off" });
            }
            self.on = on;
            Ok(())
        }

        fn is_powered(&self) -> Result<bool, Self::Error> {
            Ok(self.on)
        }
    }

    /// Raw hour/minute display, logged instead of latched
    #[derive(Default)]
    pub struct ConsoleDisplay {
        pub last: Option<(u8, u8)>,
    }

    impl ConsoleDisplay {
        pub const fn new() -> Self {
            Self { last: None }
        }
    }

    impl TimeDisplay for ConsoleDisplay {
        type Error = HalError;

        fn show(&mut self, hours: u8, minutes: u8) -> Result<(), Self::Error> {
            #[cfg(feature = "defmt")]
            if self.last != Some((hours, minutes)) {
                defmt::info!("display {:02}:{:02}", hours, minutes);
            }
            self.last = Some((hours, minutes));
            Ok(())
        }
    }

    /// The three PWM output lines as one latched byte
    #[derive(Default)]
    pub struct PortLines {
        state: u8,
    }

    impl PortLines {
        pub const fn new() -> Self {
            Self { state: 0 }
        }

        pub fn state(&self) -> u8 {
            self.state
        }
    }

    impl PwmOutput for PortLines {
        type Error = HalError;

        fn write(&mut self, bits: u8) -> Result<(), Self::Error> {
            self.state = bits;
            Ok(())
        }

        fn and(&mut self, mask: u8) -> Result<(), Self::Error> {
            self.state &= mask;
            Ok(())
        }
    }

    /// The 1 Hz tick on this board comes from an embassy ticker; a phase
    /// restart is a no-op because the ticker is recreated by the task.
    pub struct PrescalerStub;

    impl RtcControl for PrescalerStub {
        type Error = HalError;

        fn restart(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    /// Hardware collection handed to the mode controller
    pub struct Board {
        pub signal: LevelSignal,
        pub power: RadioPower,
        pub sampler_tick: GatedTick,
        pub waveform_tick: GatedTick,
        pub display: ConsoleDisplay,
        pub pwm_port: PortLines,
        pub rtc: PrescalerStub,
    }

    impl Board {
        pub const fn new() -> Self {
            Self {
                signal: LevelSignal::new(&crate::RADIO_LEVEL),
                power: RadioPower::new(),
                sampler_tick: GatedTick::new(&crate::SAMPLER_GATE),
                waveform_tick: GatedTick::new(&crate::WAVEFORM_GATE),
                display: ConsoleDisplay::new(),
                pwm_port: PortLines::new(),
                rtc: PrescalerStub,
            }
        }
    }

    impl Default for Board {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ClockHal for Board {
        type Error = HalError;
        type Signal = LevelSignal;
        type Power = RadioPower;
        type SamplerTick = GatedTick;
        type WaveformTick = GatedTick;
        type Display = ConsoleDisplay;
        type PwmPort = PortLines;
        type Rtc = PrescalerStub;

        fn signal(&mut self) -> &mut Self::Signal {
            &mut self.signal
        }

        fn receiver_power(&mut self) -> &mut Self::Power {
            &mut self.power
        }

        fn sampler_tick(&mut self) -> &mut Self::SamplerTick {
            &mut self.sampler_tick
        }

        fn waveform_tick(&mut self) -> &mut Self::WaveformTick {
            &mut self.waveform_tick
        }

        fn display(&mut self) -> &mut Self::Display {
            &mut self.display
        }

        fn pwm_port(&mut self) -> &mut Self::PwmPort {
            &mut self.pwm_port
        }

        fn rtc(&mut self) -> &mut Self::Rtc {
            &mut self.rtc
        }
    }
}

pub mod tasks {
    //! Embassy task wrappers around the core loops.

    use core::sync::atomic::Ordering;

    use embassy_time::{Duration, Ticker, Timer};

    use clock_core::shared::ClockShared;
    use clock_core::types::ClockConfig;
    use clock_core::{ModeController, WaveformGenerator};

    use crate::board;

    /// Microseconds per PWM timer tick (1 MHz compare clock)
    const PWM_TICK_US: u64 = 1;

    /// 10 ms receiver sampling, gated by the mode controller
    #[embassy_executor::task]
    pub async fn sampler_task(shared: &'static ClockShared) {
        #[cfg(feature = "defmt")]
        defmt::info!("sampler task started");
        let signal = board::LevelSignal::new(&crate::RADIO_LEVEL);
        if let Err(_e) =
            clock_core::sampler_loop(signal, shared, || crate::SAMPLER_GATE.load(Ordering::Acquire))
                .await
        {
            #[cfg(feature = "defmt")]
            defmt::error!("sampler stopped: {:?}", _e);
        }
    }

    /// 1 Hz wall-clock tick
    #[embassy_executor::task]
    pub async fn rtc_task(shared: &'static ClockShared) {
        #[cfg(feature = "defmt")]
        defmt::info!("rtc task started");
        clock_core::rtc_loop(shared).await
    }

    /// Waveform generator: sleeps each returned event delta instead of
    /// re-arming a compare register
    #[embassy_executor::task]
    pub async fn waveform_task(shared: &'static ClockShared) {
        #[cfg(feature = "defmt")]
        defmt::info!("waveform task started");
        let mut generator = WaveformGenerator::new();
        let mut port = board::PortLines::new();
        loop {
            if !crate::WAVEFORM_GATE.load(Ordering::Acquire) {
                Timer::after(Duration::from_millis(10)).await;
                continue;
            }
            match generator.on_compare(&shared.pwm, &mut port) {
                Ok(delta) => Timer::after(Duration::from_micros(delta as u64 * PWM_TICK_US)).await,
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("waveform port write failed: {:?}", _e);
                    Timer::after(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Main-loop stand-in polling the mode controller once per millisecond
    #[embassy_executor::task]
    pub async fn controller_task(shared: &'static ClockShared, config: ClockConfig) {
        #[cfg(feature = "defmt")]
        defmt::info!("controller task started");
        let mut hal = board::Board::new();
        let mut controller = ModeController::new(config);
        let mut ticker = Ticker::every(Duration::from_millis(1));
        loop {
            ticker.next().await;
            if controller.poll(&mut hal, shared).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("controller poll failed");
            }
        }
    }
}
