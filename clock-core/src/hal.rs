//! Hardware abstraction for the radio clock.
//!
//! Register-level bring-up, pin wiring, power rails and display encoding
//! are external collaborators; they appear here only as narrow traits so
//! the core state machines stay host-testable.

use embedded_hal::digital::{InputPin, OutputPin};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Timer operation failed
    TimerError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::TimerError => write!(f, "timer operation failed"),
            HalError::NotInitialized => write!(f, "hardware not initialized"),
            HalError::InvalidConfig => write!(f, "invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Demodulated receiver output line, sampled once per 10 ms tick
pub trait SignalInput {
    type Error: From<HalError>;

    fn is_high(&mut self) -> Result<bool, Self::Error>;
}

/// Power rail of the radio receiver module
pub trait ReceiverPower {
    type Error: From<HalError>;

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error>;

    fn is_powered(&self) -> Result<bool, Self::Error>;
}

/// A maskable periodic interrupt source (the 10 ms sampler timer, the
/// PWM compare timer)
pub trait TickSource {
    type Error: From<HalError>;

    fn enable(&mut self) -> Result<(), Self::Error>;

    fn disable(&mut self) -> Result<(), Self::Error>;
}

/// Raw hour/minute display output; values are written as-is
pub trait TimeDisplay {
    type Error: From<HalError>;

    fn show(&mut self, hours: u8, minutes: u8) -> Result<(), Self::Error>;
}

/// The digital output lines driven by the waveform generator
pub trait PwmOutput {
    type Error: From<HalError>;

    /// Replace the whole port state (start of a PWM cycle)
    fn write(&mut self, bits: u8) -> Result<(), Self::Error>;

    /// AND a clear mask into the port state
    fn and(&mut self, mask: u8) -> Result<(), Self::Error>;
}

/// The low-power oscillator prescaler behind the 1 Hz tick
pub trait RtcControl {
    type Error: From<HalError>;

    /// Zero the prescaler so the next second boundary is phase-aligned
    /// to the moment of a telegram commit
    fn restart(&mut self) -> Result<(), Self::Error>;
}

/// Complete clock HAL interface.
///
/// All peripherals share the aggregate error type so the mode controller
/// can propagate failures with `?`.
pub trait ClockHal {
    type Error: From<HalError>;
    type Signal: SignalInput<Error = Self::Error>;
    type Power: ReceiverPower<Error = Self::Error>;
    type SamplerTick: TickSource<Error = Self::Error>;
    type WaveformTick: TickSource<Error = Self::Error>;
    type Display: TimeDisplay<Error = Self::Error>;
    type PwmPort: PwmOutput<Error = Self::Error>;
    type Rtc: RtcControl<Error = Self::Error>;

    fn signal(&mut self) -> &mut Self::Signal;

    fn receiver_power(&mut self) -> &mut Self::Power;

    fn sampler_tick(&mut self) -> &mut Self::SamplerTick;

    fn waveform_tick(&mut self) -> &mut Self::WaveformTick;

    fn display(&mut self) -> &mut Self::Display;

    fn pwm_port(&mut self) -> &mut Self::PwmPort;

    fn rtc(&mut self) -> &mut Self::Rtc;
}

/// [`SignalInput`] over any embedded-hal input pin
pub struct SignalPin<P> {
    pin: P,
}

impl<P> SignalPin<P>
where
    P: InputPin,
{
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P> SignalInput for SignalPin<P>
where
    P: InputPin,
{
    type Error = HalError;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_high().map_err(|_| HalError::GpioError)
    }
}

/// [`ReceiverPower`] over any embedded-hal output pin (active high)
pub struct PowerPin<P> {
    pin: P,
    on: bool,
}

impl<P> PowerPin<P>
where
    P: OutputPin,
{
    pub fn new(pin: P) -> Self {
        Self { pin, on: false }
    }
}

impl<P> ReceiverPower for PowerPin<P>
where
    P: OutputPin,
{
    type Error = HalError;

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|_| HalError::GpioError)?;
        self.on = on;
        Ok(())
    }

    fn is_powered(&self) -> Result<bool, Self::Error> {
        Ok(self.on)
    }
}

/// [`PwmOutput`] over a bank of embedded-hal output pins, bit i driving
/// pin i
pub struct PinPort<P, const N: usize> {
    pins: [P; N],
    state: u8,
}

impl<P, const N: usize> PinPort<P, N>
where
    P: OutputPin,
{
    pub fn new(pins: [P; N]) -> Self {
        Self { pins, state: 0 }
    }

    fn apply(&mut self, bits: u8) -> Result<(), HalError> {
        for (i, pin) in self.pins.iter_mut().enumerate() {
            let result = if bits & (1 << i) != 0 {
                pin.set_high()
            } else {
                pin.set_low()
            };
            result.map_err(|_| HalError::GpioError)?;
        }
        self.state = bits;
        Ok(())
    }
}

impl<P, const N: usize> PwmOutput for PinPort<P, N>
where
    P: OutputPin,
{
    type Error = HalError;

    fn write(&mut self, bits: u8) -> Result<(), Self::Error> {
        self.apply(bits)
    }

    fn and(&mut self, mask: u8) -> Result<(), Self::Error> {
        self.apply(self.state & mask)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;

    /// Scripted receiver line: a run-length list of (level, ticks)
    /// entries, consuming one tick per read
    #[derive(Default)]
    pub struct MockSignal {
        runs: heapless::Vec<(bool, u16), 512>,
        pos: usize,
        consumed: u16,
    }

    impl MockSignal {
        pub fn new() -> Self {
            Self::default()
        }

        /// Append `ticks` samples of `level` to the script
        pub fn push(&mut self, level: bool, ticks: u16) {
            if let Some(last) = self.runs.last_mut() {
                if last.0 == level {
                    last.1 += ticks;
                    return;
                }
            }
            self.runs
                .push((level, ticks))
                .expect("signal script capacity exceeded");
        }

        /// True when every scripted sample has been consumed
        pub fn exhausted(&self) -> bool {
            self.pos >= self.runs.len()
        }
    }

    impl SignalInput for MockSignal {
        type Error = HalError;

        // Past the end of the script the line idles low.
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            match self.runs.get(self.pos) {
                Some(&(level, ticks)) => {
                    self.consumed += 1;
                    if self.consumed >= ticks {
                        self.pos += 1;
                        self.consumed = 0;
                    }
                    Ok(level)
                }
                None => Ok(false),
            }
        }
    }

    #[derive(Default)]
    pub struct MockPower {
        on: bool,
        /// Number of off→on transitions, for asserting power cycling
        pub power_ups: usize,
    }

    impl MockPower {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl ReceiverPower for MockPower {
        type Error = HalError;

        fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
            if on && !self.on {
                self.power_ups += 1;
            }
            self.on = on;
            Ok(())
        }

        fn is_powered(&self) -> Result<bool, Self::Error> {
            Ok(self.on)
        }
    }

    #[derive(Default)]
    pub struct MockTick {
        enabled: bool,
    }

    impl MockTick {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    impl TickSource for MockTick {
        type Error = HalError;

        fn enable(&mut self) -> Result<(), Self::Error> {
            self.enabled = true;
            Ok(())
        }

        fn disable(&mut self) -> Result<(), Self::Error> {
            self.enabled = false;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockDisplay {
        pub last: Option<(u8, u8)>,
        pub writes: usize,
    }

    impl MockDisplay {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl TimeDisplay for MockDisplay {
        type Error = HalError;

        fn show(&mut self, hours: u8, minutes: u8) -> Result<(), Self::Error> {
            self.last = Some((hours, minutes));
            self.writes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockPwmPort {
        state: u8,
    }

    impl MockPwmPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn state(&self) -> u8 {
            self.state
        }
    }

    impl PwmOutput for MockPwmPort {
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

    #[derive(Default)]
    pub struct MockRtc {
        pub restarts: usize,
    }

    impl MockRtc {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl RtcControl for MockRtc {
        type Error = HalError;

        fn restart(&mut self) -> Result<(), Self::Error> {
            self.restarts += 1;
            Ok(())
        }
    }

    /// Mock hardware collection
    #[derive(Default)]
    pub struct MockClockHal {
        pub signal: MockSignal,
        pub power: MockPower,
        pub sampler_tick: MockTick,
        pub waveform_tick: MockTick,
        pub display: MockDisplay,
        pub pwm_port: MockPwmPort,
        pub rtc: MockRtc,
    }

    impl MockClockHal {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl ClockHal for MockClockHal {
        type Error = HalError;
        type Signal = MockSignal;
        type Power = MockPower;
        type SamplerTick = MockTick;
        type WaveformTick = MockTick;
        type Display = MockDisplay;
        type PwmPort = MockPwmPort;
        type Rtc = MockRtc;

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
