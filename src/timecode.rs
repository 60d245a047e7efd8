// smpte-ltc
// Copyright (C) 2021  Wesley Merkel
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Timecode values and frame arithmetic.
//!
//! A [`Timecode`] is a plain `HH:MM:SS:FF` label. It does not know its own frame rate; every
//! operation that depends on the rate takes a [`FrameRate`] alongside it. The frame rate carries
//! two distinct numbers:
//!
//! * the integer frame counter bound, [`FrameRate::frames_per_second`], used when counting and
//!   BCD-encoding frames, and
//! * the real frame rate, [`FrameRate::exact_rate`], used when converting frames to samples.
//!
//! These differ for 29.97 drop-frame, which counts 30 frames per nominal second while actually
//! running slightly slower. Drop-frame numbering skips frame labels 0 and 1 at the start of every
//! minute that is not a multiple of ten so that the label tracks wall-clock time.
//!
//! ```
//! use smpte_ltc::timecode::{FrameRate, Timecode};
//!
//! let rate = FrameRate::Fps2997Drop;
//! let tc = Timecode::new(0, 0, 59, 29, rate)?;
//! assert_eq!(tc.advance(rate), Timecode::new(0, 1, 0, 2, rate)?);
//! # smpte_ltc::timecode::Result::Ok(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A specialized [`Result`] type for timecode validation.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when constructing timecode values from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("hours out of range: {0} (expected 0-23)")]
    Hours(u8),
    #[error("minutes out of range: {0} (expected 0-59)")]
    Minutes(u8),
    #[error("seconds out of range: {0} (expected 0-59)")]
    Seconds(u8),
    #[error("frame {frame} out of range at {rate} fps (expected 0-{max})")]
    Frame { frame: u8, rate: FrameRate, max: u8 },
    #[error("unknown frame rate type: {0} (expected 0-3)")]
    UnknownRateType(u8),
}

/// One of the four SMPTE frame rates.
///
/// The discriminant order matches the rate type code used by LTC generators, Art-Net and OSC:
/// `0` = 24, `1` = 25, `2` = 29.97 drop-frame, `3` = 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameRate {
    #[serde(rename = "24")]
    Fps24,
    #[serde(rename = "25")]
    Fps25,
    #[serde(rename = "29.97df")]
    Fps2997Drop,
    #[serde(rename = "30")]
    Fps30,
}

impl FrameRate {
    /// Looks up a frame rate by its type code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRateType`] for codes above 3.
    pub fn from_type_code(code: u8) -> Result<FrameRate> {
        match code {
            0 => Ok(FrameRate::Fps24),
            1 => Ok(FrameRate::Fps25),
            2 => Ok(FrameRate::Fps2997Drop),
            3 => Ok(FrameRate::Fps30),
            _ => Err(Error::UnknownRateType(code)),
        }
    }

    /// The type code of this rate, `0..=3`.
    pub fn type_code(self) -> u8 {
        match self {
            FrameRate::Fps24 => 0,
            FrameRate::Fps25 => 1,
            FrameRate::Fps2997Drop => 2,
            FrameRate::Fps30 => 3,
        }
    }

    /// The number of frame labels per second. Drop-frame counts 30.
    pub fn frames_per_second(self) -> u8 {
        match self {
            FrameRate::Fps24 => 24,
            FrameRate::Fps25 => 25,
            FrameRate::Fps2997Drop | FrameRate::Fps30 => 30,
        }
    }

    /// The real number of frames per second, used for sample timing.
    pub fn exact_rate(self) -> f64 {
        match self {
            FrameRate::Fps24 => 24.0,
            FrameRate::Fps25 => 25.0,
            FrameRate::Fps2997Drop => 29.97,
            FrameRate::Fps30 => 30.0,
        }
    }

    pub fn is_drop_frame(self) -> bool {
        self == FrameRate::Fps2997Drop
    }

    /// The number of distinct labels in a 24 hour day.
    pub fn frames_per_day(self) -> u32 {
        let nominal = u32::from(self.frames_per_second()) * 86_400;
        if self.is_drop_frame() {
            // Two labels per minute, except every tenth minute.
            nominal - 2 * (24 * 60 - 24 * 6)
        } else {
            nominal
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRate::Fps24 => write!(f, "24"),
            FrameRate::Fps25 => write!(f, "25"),
            FrameRate::Fps2997Drop => write!(f, "29.97 DF"),
            FrameRate::Fps30 => write!(f, "30"),
        }
    }
}

/// An `HH:MM:SS:FF` timecode label.
///
/// Values are immutable; [`Timecode::advance`] returns a new value. Every field is always within
/// range for the frame rate it was validated against.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode {
    hours: u8,
    minutes: u8,
    seconds: u8,
    frames: u8,
}

impl Timecode {
    /// Creates a timecode, checking every field against its range.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first field that is out of range. The frame bound depends on
    /// `rate`.
    pub fn new(hours: u8, minutes: u8, seconds: u8, frames: u8, rate: FrameRate) -> Result<Self> {
        if hours > 23 {
            return Err(Error::Hours(hours));
        }
        if minutes > 59 {
            return Err(Error::Minutes(minutes));
        }
        if seconds > 59 {
            return Err(Error::Seconds(seconds));
        }
        let max = rate.frames_per_second() - 1;
        if frames > max {
            return Err(Error::Frame {
                frame: frames,
                rate,
                max,
            });
        }
        Ok(Timecode {
            hours,
            minutes,
            seconds,
            frames,
        })
    }

    /// `00:00:00:00`.
    pub fn midnight() -> Self {
        Timecode::default()
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn frames(&self) -> u8 {
        self.frames
    }

    /// Returns the label of the next frame.
    ///
    /// Carries frames into seconds, seconds into minutes and minutes into hours. Hours wrap from
    /// 23 back to 0 without any signal. At 29.97 drop-frame, a carry into a minute that is not a
    /// multiple of ten lands on frame 2 instead of frame 0.
    pub fn advance(self, rate: FrameRate) -> Timecode {
        let Timecode {
            mut hours,
            mut minutes,
            mut seconds,
            mut frames,
        } = self;

        frames += 1;
        if frames >= rate.frames_per_second() {
            frames = 0;
            seconds += 1;
            if seconds >= 60 {
                seconds = 0;
                minutes += 1;
                if rate.is_drop_frame() && minutes % 10 != 0 {
                    frames = 2;
                }
                if minutes >= 60 {
                    minutes = 0;
                    hours = (hours + 1) % 24;
                }
            }
        }

        Timecode {
            hours,
            minutes,
            seconds,
            frames,
        }
    }

    /// The number of frames elapsed between midnight and this label.
    ///
    /// For drop-frame rates the skipped labels are not counted, so this is the inverse of
    /// [`Timecode::from_frame_number`].
    pub fn frame_number(&self, rate: FrameRate) -> u32 {
        let fps = u32::from(rate.frames_per_second());
        let total_minutes = 60 * u32::from(self.hours) + u32::from(self.minutes);
        let nominal = (total_minutes * 60 + u32::from(self.seconds)) * fps + u32::from(self.frames);
        if rate.is_drop_frame() {
            nominal - 2 * (total_minutes - total_minutes / 10)
        } else {
            nominal
        }
    }

    /// Builds the label of the `frame_number`th frame after midnight, wrapping every 24 hours.
    pub fn from_frame_number(frame_number: u32, rate: FrameRate) -> Timecode {
        let mut n = frame_number % rate.frames_per_day();
        if rate.is_drop_frame() {
            const FRAMES_PER_TEN_MINUTES: u32 = 17_982;
            const FRAMES_PER_DROPPED_MINUTE: u32 = 1_798;
            let tens = n / FRAMES_PER_TEN_MINUTES;
            let rest = n % FRAMES_PER_TEN_MINUTES;
            n += 18 * tens;
            if rest > 1 {
                n += 2 * ((rest - 2) / FRAMES_PER_DROPPED_MINUTE);
            }
        }

        let fps = u32::from(rate.frames_per_second());
        let frames = n % fps;
        let total_seconds = n / fps;
        Timecode {
            hours: (total_seconds / 3600) as u8,
            minutes: (total_seconds / 60 % 60) as u8,
            seconds: (total_seconds % 60) as u8,
            frames: frames as u8,
        }
    }
}

impl fmt::Display for Timecode {
    /// Formats as `HH:MM:SS:FF`. The alternate form (`{:#}`) uses the drop-frame separator
    /// `HH:MM:SS;FF`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if f.alternate() { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hours, self.minutes, self.seconds, separator, self.frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_RATES: [FrameRate; 4] = [
        FrameRate::Fps24,
        FrameRate::Fps25,
        FrameRate::Fps2997Drop,
        FrameRate::Fps30,
    ];

    fn tc(h: u8, m: u8, s: u8, f: u8) -> Timecode {
        Timecode {
            hours: h,
            minutes: m,
            seconds: s,
            frames: f,
        }
    }

    #[test]
    fn test_type_codes() {
        for (code, rate) in ALL_RATES.iter().enumerate() {
            assert_eq!(FrameRate::from_type_code(code as u8), Ok(*rate));
            assert_eq!(rate.type_code(), code as u8);
        }
        assert_eq!(
            FrameRate::from_type_code(4),
            Err(Error::UnknownRateType(4))
        );
    }

    #[test]
    fn test_rate_constants() {
        assert_eq!(FrameRate::Fps2997Drop.frames_per_second(), 30);
        assert!((FrameRate::Fps2997Drop.exact_rate() - 29.97).abs() < 1e-9);
        assert_eq!(FrameRate::Fps24.frames_per_day(), 2_073_600);
        assert_eq!(FrameRate::Fps25.frames_per_day(), 2_160_000);
        assert_eq!(FrameRate::Fps2997Drop.frames_per_day(), 2_589_408);
        assert_eq!(FrameRate::Fps30.frames_per_day(), 2_592_000);
    }

    #[test]
    fn test_new_validates_fields() {
        let rate = FrameRate::Fps25;
        assert_eq!(Timecode::new(23, 59, 59, 24, rate), Ok(tc(23, 59, 59, 24)));
        assert_eq!(Timecode::new(24, 0, 0, 0, rate), Err(Error::Hours(24)));
        assert_eq!(Timecode::new(0, 60, 0, 0, rate), Err(Error::Minutes(60)));
        assert_eq!(Timecode::new(0, 0, 60, 0, rate), Err(Error::Seconds(60)));
        assert_eq!(
            Timecode::new(0, 0, 0, 25, rate),
            Err(Error::Frame {
                frame: 25,
                rate,
                max: 24
            })
        );
        assert!(Timecode::new(0, 0, 0, 29, FrameRate::Fps2997Drop).is_ok());
        assert!(Timecode::new(0, 0, 0, 24, FrameRate::Fps24).is_err());
    }

    #[test]
    fn test_simple_advance() {
        assert_eq!(tc(0, 0, 0, 0).advance(FrameRate::Fps25), tc(0, 0, 0, 1));
    }

    #[test]
    fn test_frame_rollover() {
        assert_eq!(tc(0, 0, 0, 23).advance(FrameRate::Fps24), tc(0, 0, 1, 0));
        assert_eq!(tc(0, 0, 0, 24).advance(FrameRate::Fps25), tc(0, 0, 1, 0));
        assert_eq!(tc(0, 0, 0, 29).advance(FrameRate::Fps30), tc(0, 0, 1, 0));
    }

    #[test]
    fn test_second_minute_and_hour_rollover() {
        let rate = FrameRate::Fps25;
        assert_eq!(tc(0, 0, 59, 24).advance(rate), tc(0, 1, 0, 0));
        assert_eq!(tc(0, 59, 59, 24).advance(rate), tc(1, 0, 0, 0));
        assert_eq!(tc(23, 59, 59, 24).advance(rate), tc(0, 0, 0, 0));
    }

    #[test]
    fn test_drop_frame_skips_at_minute() {
        let rate = FrameRate::Fps2997Drop;
        assert_eq!(tc(0, 0, 59, 29).advance(rate), tc(0, 1, 0, 2));
        assert_eq!(tc(0, 0, 59, 28).advance(rate), tc(0, 0, 59, 29));
        assert_eq!(tc(1, 58, 59, 29).advance(rate), tc(1, 59, 0, 2));
    }

    #[test]
    fn test_drop_frame_no_skip_at_tenth_minute() {
        let rate = FrameRate::Fps2997Drop;
        assert_eq!(tc(0, 9, 59, 29).advance(rate), tc(0, 10, 0, 0));
        assert_eq!(tc(0, 19, 59, 29).advance(rate), tc(0, 20, 0, 0));
        assert_eq!(tc(0, 59, 59, 29).advance(rate), tc(1, 0, 0, 0));
        assert_eq!(tc(23, 59, 59, 29).advance(rate), tc(0, 0, 0, 0));
    }

    #[test]
    fn test_non_drop_never_skips() {
        assert_eq!(tc(0, 0, 59, 29).advance(FrameRate::Fps30), tc(0, 1, 0, 0));
    }

    #[test]
    fn test_full_day_at_25fps() {
        let rate = FrameRate::Fps25;
        let mut value = Timecode::midnight();
        for _ in 0..2_160_000 {
            value = value.advance(rate);
        }
        assert_eq!(value, Timecode::midnight());
    }

    #[test]
    fn test_full_day_at_drop_frame() {
        let rate = FrameRate::Fps2997Drop;
        let mut value = Timecode::midnight();
        for i in 1..=2_589_408u32 {
            value = value.advance(rate);
            if i < 2_589_408 {
                assert_ne!(value, Timecode::midnight(), "early wrap after {} frames", i);
            }
        }
        assert_eq!(value, Timecode::midnight());
    }

    #[test]
    fn test_frame_number_follows_advance() {
        for &rate in ALL_RATES.iter() {
            let mut value = Timecode::midnight();
            for n in 0..40_000u32 {
                assert_eq!(value.frame_number(rate), n, "{} at {} fps", value, rate);
                assert_eq!(Timecode::from_frame_number(n, rate), value);
                value = value.advance(rate);
            }
        }
    }

    #[test]
    fn test_frame_number_wraps_at_day() {
        let rate = FrameRate::Fps2997Drop;
        let last = Timecode::from_frame_number(rate.frames_per_day() - 1, rate);
        assert_eq!(last, tc(23, 59, 59, 29));
        assert_eq!(
            Timecode::from_frame_number(rate.frames_per_day(), rate),
            Timecode::midnight()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(tc(1, 23, 45, 12).to_string(), "01:23:45:12");
        assert_eq!(format!("{:#}", tc(0, 1, 0, 2)), "00:01:00;02");
        assert_eq!(FrameRate::Fps2997Drop.to_string(), "29.97 DF");
    }

    #[test]
    fn test_rate_serde_names() {
        let json = serde_json::to_string(&FrameRate::Fps2997Drop).unwrap();
        assert_eq!(json, "\"29.97df\"");
        let rate: FrameRate = serde_json::from_str("\"25\"").unwrap();
        assert_eq!(rate, FrameRate::Fps25);
    }
}
