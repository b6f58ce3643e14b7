#![cfg_attr(not(feature = "std"), no_std)]

//! # Clock Core
//!
//! DCF77 radio clock core logic library for embedded systems.
//! Decodes the 59-bit DCF77 minute telegram from a 10 ms-sampled receiver
//! line, keeps wall-clock time between syncs, and drives a 3-channel
//! software PWM through a double-buffered event schedule.

pub mod hal;
pub mod mode;
pub mod pwm;
pub mod rtc;
pub mod sampler;
pub mod shared;
pub mod telegram;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use mode::*;
pub use pwm::{build_schedule, PwmHandoff, Schedule, WaveformGenerator, PWM_CHANNELS, PWM_STEPS};
pub use rtc::*;
pub use sampler::*;
pub use shared::*;
pub use telegram::*;
pub use types::*;

/// Clock library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration matching the reference receiver board
pub fn default_config() -> types::ClockConfig {
    types::ClockConfig::default()
}
