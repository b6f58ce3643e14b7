//! Mode controller: the main-loop state machine tying receiver, clock,
//! display and PWM together, plus the external control surface.
//!
//! `poll` is called once per main-loop iteration and never blocks: the
//! resync drains at most the single mailbox slot, the demo ramp advances
//! one duty step per call, and schedule rebuilds publish into the PWM
//! double buffer without waiting for the generator.

use crate::hal::{ClockHal, ReceiverPower, RtcControl, TickSource, TimeDisplay};
use crate::pwm::{build_schedule, PWM_CHANNELS};
use crate::shared::ClockShared;
use crate::telegram::TelegramDecoder;
use crate::types::{ClockConfig, DisplayRefresh, Mode, SyncStatus, UNSYNCED_SENTINEL};

pub struct ModeController {
    mode: Mode,
    config: ClockConfig,
    decoder: TelegramDecoder,
    /// Receiver rail and sampler tick are currently on
    receiver_running: bool,
    demo_requested: bool,
    ramp_duty: u8,
    ramp_pass: u8,
}

impl ModeController {
    /// Starts in `Resync`: the clock is useless until a first telegram
    /// has been committed.
    pub fn new(config: ClockConfig) -> Self {
        Self {
            mode: Mode::Resync,
            config,
            decoder: TelegramDecoder::new(),
            receiver_running: false,
            demo_requested: false,
            ramp_duty: 0,
            ramp_pass: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// One main-loop iteration: second-tick housekeeping, the current
    /// mode's work, and a schedule rebuild if duty settings changed.
    pub fn poll<H: ClockHal>(&mut self, hal: &mut H, shared: &ClockShared) -> Result<(), H::Error> {
        if shared.clock.take_second_flag() {
            let minute_rolled = shared.clock.take_minute_flag();
            let refresh = match self.config.display_refresh {
                DisplayRefresh::EverySecond => true,
                DisplayRefresh::OnMinuteRollover => minute_rolled,
            };
            if refresh {
                self.show_time(hal, shared)?;
            }
            let now = shared.clock.get();
            if now.seconds == 0 && shared.sync.get() == SyncStatus::Synced {
                for trigger in self.config.resync_times {
                    if now.time_of_day() == trigger {
                        #[cfg(feature = "defmt")]
                        defmt::info!("daily resync at {:02}:{:02}", now.hours, now.minutes);
                        shared.sync.set(SyncStatus::ResyncRequested);
                    }
                }
            }
        }

        match self.mode {
            Mode::Resync => self.poll_resync(hal, shared)?,
            Mode::Idle => self.poll_idle(hal, shared)?,
            Mode::PwmSequence => self.poll_demo(hal, shared)?,
        }

        if shared.duties.take_dirty() {
            let duties = shared.duties.get();
            shared
                .pwm
                .publish(build_schedule(&duties, self.config.ticks_per_step));
            // The waveform timer only runs while some channel is active.
            if duties.iter().any(|&d| d != 0) {
                hal.waveform_tick().enable()?;
            } else if self.mode != Mode::PwmSequence {
                hal.waveform_tick().disable()?;
            }
        }
        Ok(())
    }

    fn poll_resync<H: ClockHal>(
        &mut self,
        hal: &mut H,
        shared: &ClockShared,
    ) -> Result<(), H::Error> {
        if !self.receiver_running {
            hal.receiver_power().set_power(true)?;
            hal.sampler_tick().enable()?;
            self.decoder = TelegramDecoder::new();
            self.receiver_running = true;
        }

        while let Some(event) = shared.mailbox.take() {
            if let Some(telegram) = self.decoder.feed(event) {
                shared.clock.set_time(telegram.time_of_day());
                hal.rtc().restart()?;
                hal.sampler_tick().disable()?;
                hal.receiver_power().set_power(false)?;
                self.receiver_running = false;
                shared.sync.set(SyncStatus::Synced);
                self.show_time(hal, shared)?;
                #[cfg(feature = "defmt")]
                defmt::info!("synced {:02}:{:02}", telegram.hours, telegram.minutes);
                self.mode = Mode::Idle;
                break;
            }
        }
        Ok(())
    }

    fn poll_idle<H: ClockHal>(&mut self, hal: &mut H, shared: &ClockShared) -> Result<(), H::Error> {
        match shared.sync.get() {
            SyncStatus::Unsynced | SyncStatus::ResyncRequested => {
                self.mode = Mode::Resync;
            }
            SyncStatus::Synced => {
                if self.demo_requested {
                    self.demo_requested = false;
                    self.ramp_duty = 0;
                    self.ramp_pass = 0;
                    hal.waveform_tick().enable()?;
                    #[cfg(feature = "defmt")]
                    defmt::debug!("demo ramp started");
                    self.mode = Mode::PwmSequence;
                }
            }
        }
        Ok(())
    }

    fn poll_demo<H: ClockHal>(
        &mut self,
        hal: &mut H,
        shared: &ClockShared,
    ) -> Result<(), H::Error> {
        // One duty step per poll keeps the main loop cooperative.
        shared.duties.set(1, self.ramp_duty).ok();
        if self.ramp_duty == u8::MAX {
            self.ramp_duty = 0;
            self.ramp_pass += 1;
            if self.ramp_pass >= self.config.demo_passes {
                shared.duties.set_all([0; PWM_CHANNELS]);
                hal.waveform_tick().disable()?;
                #[cfg(feature = "defmt")]
                defmt::debug!("demo ramp finished");
                self.mode = Mode::Idle;
            }
        } else {
            self.ramp_duty += 1;
        }
        Ok(())
    }

    fn show_time<H: ClockHal>(&mut self, hal: &mut H, shared: &ClockShared) -> Result<(), H::Error> {
        let (hours, minutes) = self.time_reading(shared);
        hal.display().show(hours, minutes)
    }

    fn time_reading(&self, shared: &ClockShared) -> (u8, u8) {
        if !shared.clock.ever_synced() {
            return UNSYNCED_SENTINEL;
        }
        let now = shared.clock.get();
        (now.hours, now.minutes)
    }

    /// Current hour/minute, or the sentinel while never synced
    pub fn get_time(&self, shared: &ClockShared) -> (u8, u8) {
        self.time_reading(shared)
    }

    pub fn get_sync_status(&self, shared: &ClockShared) -> SyncStatus {
        shared.sync.get()
    }

    /// Set one PWM channel's duty; the schedule is rebuilt and published
    /// on the next poll
    pub fn set_channel_duty(
        &self,
        shared: &ClockShared,
        channel: usize,
        value: u8,
    ) -> Result<(), &'static str> {
        shared.duties.set(channel, value)
    }

    /// Request the bounded PWM demonstration ramp; honored from Idle
    pub fn request_demo(&mut self) {
        self.demo_requested = true;
    }
}
