//! Telegram decoder: assembles 59 decode events into one parity-checked
//! DCF77 minute frame.
//!
//! Runs entirely in the main-loop context. Any violation (bad start bit,
//! daylight-saving bits equal, parity mismatch, unexpected event) forces
//! the bit index to the FAIL sentinel; the increment that follows every
//! processed event wraps FAIL back to 0, so a failed frame is simply a
//! restarted one. Nothing previously published is ever touched by a
//! failed frame.

use crate::types::{DecodeEvent, Telegram};

/// Bit index sentinel marking a discarded frame; wraps to 0 on the next
/// post-event increment
const FAIL: u8 = 0xFF;

/// Positional BCD weights shared by all telegram fields
const BCD: [u8; 8] = [1, 2, 4, 8, 10, 20, 40, 80];

/// Accumulator state for the minute frame in flight
pub struct TelegramDecoder {
    bit_no: u8,
    parity: u8,
    summer_time: u8,
    minute: u8,
    hour: u8,
    day: u8,
    month: u8,
    year: u8,
}

impl TelegramDecoder {
    pub const fn new() -> Self {
        Self {
            bit_no: 0,
            parity: 0,
            summer_time: 0,
            minute: 0,
            hour: 0,
            day: 1,
            month: 1,
            year: 0,
        }
    }

    /// Current bit index. A failing event wraps the FAIL sentinel back
    /// to 0 before returning, so a discarded frame reads as a restarted
    /// one.
    pub fn bit_index(&self) -> u8 {
        self.bit_no
    }

    /// Consume one decode event.
    ///
    /// Returns the completed telegram when a minute mark arrives with all
    /// 59 bits accumulated and every parity group intact. The bit index
    /// restarts after any minute mark, successful or not.
    pub fn feed(&mut self, event: DecodeEvent) -> Option<Telegram> {
        let committed = if event == DecodeEvent::MinuteMark && self.bit_no == 59 {
            #[cfg(feature = "defmt")]
            defmt::debug!("telegram complete: {:02}:{:02}", self.hour, self.minute);
            Some(Telegram {
                hours: self.hour,
                minutes: self.minute,
                day: self.day,
                month: self.month,
                year: self.year,
                summer_time: self.summer_time != 0,
            })
        } else {
            None
        };

        let bit = match event {
            DecodeEvent::Zero => 0,
            DecodeEvent::One => 1,
            // A mark or a sampling error restarts the frame either way.
            DecodeEvent::MinuteMark | DecodeEvent::Error => {
                self.bit_no = FAIL;
                0
            }
        };
        self.parity ^= bit;

        match self.bit_no {
            // Spare and weather bits
            0..=16 => {}
            // Daylight-saving announcement pair must be complementary
            17 => self.summer_time = bit,
            18 => {
                if bit == self.summer_time {
                    self.fail();
                }
            }
            // Leap-second announcement
            19 => {}
            // Start-of-time bit is always 1
            20 => {
                if bit == 0 {
                    self.fail();
                }
            }
            // Minute group with even parity at bit 28
            21..=27 => {
                if self.bit_no == 21 {
                    self.parity = bit;
                    self.minute = 0;
                }
                if bit != 0 {
                    self.minute += BCD[(self.bit_no - 21) as usize];
                }
            }
            28 => {
                if self.parity != 0 {
                    self.fail();
                }
            }
            // Hour group with even parity at bit 35
            29..=34 => {
                if self.bit_no == 29 {
                    self.parity = bit;
                    self.hour = 0;
                }
                if bit != 0 {
                    self.hour += BCD[(self.bit_no - 29) as usize];
                }
            }
            35 => {
                if self.parity != 0 {
                    self.fail();
                }
            }
            // Date group: one parity accumulator spans bits 36..=57
            36..=41 => {
                if self.bit_no == 36 {
                    self.parity = bit;
                    self.day = 0;
                }
                if bit != 0 {
                    self.day += BCD[(self.bit_no - 36) as usize];
                }
            }
            // Weekday, unused
            42..=44 => {}
            45..=49 => {
                if self.bit_no == 45 {
                    self.month = 0;
                }
                if bit != 0 {
                    self.month += BCD[(self.bit_no - 45) as usize];
                }
            }
            50..=57 => {
                if self.bit_no == 50 {
                    self.year = 0;
                }
                if bit != 0 {
                    self.year += BCD[(self.bit_no - 50) as usize];
                }
            }
            58 => {
                if self.parity != 0 {
                    self.fail();
                }
            }
            // FAIL sentinel or an index past the frame end
            _ => self.fail(),
        }
        self.bit_no = self.bit_no.wrapping_add(1);

        committed
    }

    fn fail(&mut self) {
        #[cfg(feature = "defmt")]
        if self.bit_no != FAIL {
            defmt::trace!("telegram discarded at bit {}", self.bit_no);
        }
        self.bit_no = FAIL;
    }
}

impl Default for TelegramDecoder {
    fn default() -> Self {
        Self::new()
    }
}
