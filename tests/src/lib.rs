//! Host-based integration tests for the DCF77 clock workspace.
//!
//! Everything runs against the core crate's mock HAL and the firmware
//! board types; no target hardware involved.

#[cfg(test)]
mod clock_integration_tests;
#[cfg(test)]
mod pwm_schedule_tests;
#[cfg(test)]
mod sampler_fsm_tests;
#[cfg(test)]
mod telegram_tests;
