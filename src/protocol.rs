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

//! The line-oriented text protocol spoken by the drivers.
//!
//! A host application feeds timecode to the network relay one line per frame, and transport
//! commands to the playback driver one line per change:
//!
//! ```text
//! 1 23 45 12 1          <hours> <minutes> <seconds> <frames> <type>
//! play 1 23 45 12 1     start or relocate playback
//! stop 1 23 45 12 1     stop playback, outputting silence
//! ```
//!
//! `type` is the frame rate type code: `0` = 24, `1` = 25, `2` = 29.97 drop-frame, `3` = 30.
//! Fields are separated by any whitespace and must all be in range.

use crate::timecode::{self, FrameRate, Timecode};
use std::{num::ParseIntError, str::FromStr};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("unexpected trailing field: {0:?}")]
    TrailingField(String),
    #[error("invalid {field}: {source}")]
    BadInteger {
        field: &'static str,
        source: ParseIntError,
    },
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
    #[error(transparent)]
    Timecode(#[from] timecode::Error),
}

/// A timecode label together with the rate it runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    pub timecode: Timecode,
    pub rate: FrameRate,
}

impl Cue {
    fn parse<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Result<Cue> {
        let hours = next_u8(fields, "hours")?;
        let minutes = next_u8(fields, "minutes")?;
        let seconds = next_u8(fields, "seconds")?;
        let frames = next_u8(fields, "frames")?;
        let rate = FrameRate::from_type_code(next_u8(fields, "type")?)?;
        let timecode = Timecode::new(hours, minutes, seconds, frames, rate)?;
        if let Some(extra) = fields.next() {
            return Err(Error::TrailingField(extra.to_owned()));
        }
        Ok(Cue { timecode, rate })
    }
}

impl FromStr for Cue {
    type Err = Error;

    /// Parses `<hours> <minutes> <seconds> <frames> <type>`.
    fn from_str(line: &str) -> Result<Cue> {
        Cue::parse(&mut line.split_whitespace())
    }
}

/// A playback transport command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    /// Start playing from the cue, or relocate if already playing.
    Play(Cue),
    /// Stop playing. The cue is remembered as the new position.
    Stop(Cue),
}

impl TransportCommand {
    pub fn cue(&self) -> Cue {
        match *self {
            TransportCommand::Play(cue) | TransportCommand::Stop(cue) => cue,
        }
    }
}

impl FromStr for TransportCommand {
    type Err = Error;

    /// Parses `play <cue>` or `stop <cue>`.
    fn from_str(line: &str) -> Result<TransportCommand> {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("play") => Ok(TransportCommand::Play(Cue::parse(&mut fields)?)),
            Some("stop") => Ok(TransportCommand::Stop(Cue::parse(&mut fields)?)),
            Some(other) => Err(Error::UnknownCommand(other.to_owned())),
            None => Err(Error::MissingField("command")),
        }
    }
}

fn next_u8<'a>(fields: &mut impl Iterator<Item = &'a str>, field: &'static str) -> Result<u8> {
    fields
        .next()
        .ok_or(Error::MissingField(field))?
        .parse()
        .map_err(|source| Error::BadInteger { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cue() {
        let cue: Cue = "1 23 45 12 1".parse().unwrap();
        assert_eq!(
            cue,
            Cue {
                timecode: Timecode::new(1, 23, 45, 12, FrameRate::Fps25).unwrap(),
                rate: FrameRate::Fps25,
            }
        );
        let cue: Cue = "  0\t0 0 0   2 ".parse().unwrap();
        assert_eq!(cue.rate, FrameRate::Fps2997Drop);
    }

    #[test]
    fn test_cue_errors() {
        assert_eq!("1 23 45".parse::<Cue>(), Err(Error::MissingField("frames")));
        assert!(matches!(
            "1 x 45 12 1".parse::<Cue>(),
            Err(Error::BadInteger {
                field: "minutes",
                ..
            })
        ));
        assert!(matches!(
            "256 0 0 0 1".parse::<Cue>(),
            Err(Error::BadInteger { field: "hours", .. })
        ));
        assert_eq!(
            "24 0 0 0 1".parse::<Cue>(),
            Err(Error::Timecode(timecode::Error::Hours(24)))
        );
        assert_eq!(
            "0 0 0 0 4".parse::<Cue>(),
            Err(Error::Timecode(timecode::Error::UnknownRateType(4)))
        );
        assert_eq!(
            "0 0 0 0 1 9".parse::<Cue>(),
            Err(Error::TrailingField("9".to_owned()))
        );
    }

    #[test]
    fn test_frame_bound_depends_on_rate() {
        assert!("0 0 0 29 3".parse::<Cue>().is_ok());
        assert!(matches!(
            "0 0 0 29 1".parse::<Cue>(),
            Err(Error::Timecode(timecode::Error::Frame { .. }))
        ));
    }

    #[test]
    fn test_parse_transport_commands() {
        let cue: Cue = "10 0 0 0 0".parse().unwrap();
        assert_eq!(
            "play 10 0 0 0 0".parse::<TransportCommand>(),
            Ok(TransportCommand::Play(cue))
        );
        assert_eq!(
            "stop 10 0 0 0 0".parse::<TransportCommand>(),
            Ok(TransportCommand::Stop(cue))
        );
        assert_eq!(TransportCommand::Stop(cue).cue(), cue);
    }

    #[test]
    fn test_transport_errors() {
        assert_eq!(
            "".parse::<TransportCommand>(),
            Err(Error::MissingField("command"))
        );
        assert_eq!(
            "pause 0 0 0 0 1".parse::<TransportCommand>(),
            Err(Error::UnknownCommand("pause".to_owned()))
        );
        assert_eq!(
            "play 0 0 0".parse::<TransportCommand>(),
            Err(Error::MissingField("frames"))
        );
    }
}
