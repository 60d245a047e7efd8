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

//! Writing LTC to mono 16-bit PCM WAV files.
//!
//! [`write_ltc`] is the batch driver: it streams frames from a
//! [`Generator`](crate::ltc::encoder::Generator) straight into a [`hound::WavWriter`], so a long
//! run of timecode never has to be held in memory.

use crate::{
    config::Config,
    ltc::encoder::{frame_start_sample, generate_sequence},
    timecode::{FrameRate, Timecode},
};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::{
    io::{Seek, Write},
    path::Path,
    time::Duration,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("writing WAV file: {0}")]
    Wav(#[from] hound::Error),
}

/// The format LTC is written in: one channel of signed 16-bit integers.
pub fn ltc_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// How much timecode to render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// A whole number of frames.
    Frames(u64),
    /// A wall-clock duration, trimmed to the nearest sample.
    Duration(Duration),
}

impl Length {
    fn frames_and_samples(self, rate: FrameRate, sample_rate: u32) -> (u64, u64) {
        match self {
            Length::Frames(frames) => (frames, frame_start_sample(frames, sample_rate, rate)),
            Length::Duration(duration) => {
                let seconds = duration.as_secs_f64();
                let frames = (seconds * rate.exact_rate()).ceil() as u64;
                let samples = (seconds * f64::from(sample_rate)).round() as u64;
                (frames, samples)
            }
        }
    }
}

/// Renders LTC starting at `start` into a new WAV file at `path`.
///
/// Uses the sample rate and amplitude from `config`. Returns the number of samples written.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_ltc<P: AsRef<Path>>(
    path: P,
    start: Timecode,
    rate: FrameRate,
    length: Length,
    config: &Config,
) -> Result<u64> {
    let path = path.as_ref();
    log::info!(
        "writing {:?} of {} fps LTC from {} to {}",
        length,
        rate,
        start,
        path.display()
    );
    let writer = WavWriter::create(path, ltc_spec(config.sample_rate))?;
    let written = encode(writer, start, rate, length, config)?;
    log::info!("wrote {} samples to {}", written, path.display());
    Ok(written)
}

fn encode<W: Write + Seek>(
    mut writer: WavWriter<W>,
    start: Timecode,
    rate: FrameRate,
    length: Length,
    config: &Config,
) -> Result<u64> {
    let (frames, total) = length.frames_and_samples(rate, config.sample_rate);
    let mut remaining = total;
    let sequence =
        generate_sequence(start, rate, frames, config.sample_rate).amplitude(config.amplitude);
    for frame in sequence {
        if remaining == 0 {
            break;
        }
        let take = (frame.samples.len() as u64).min(remaining) as usize;
        for &sample in &frame.samples[..take] {
            writer.write_sample(sample)?;
        }
        remaining -= take as u64;
    }
    writer.finalize()?;
    Ok(total - remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;
    use std::io::Cursor;

    fn encode_to_memory(
        start: Timecode,
        rate: FrameRate,
        length: Length,
        config: &Config,
    ) -> (u64, Vec<u8>) {
        let mut data = Cursor::new(Vec::new());
        let writer = WavWriter::new(&mut data, ltc_spec(config.sample_rate)).unwrap();
        let written = encode(writer, start, rate, length, config).unwrap();
        (written, data.into_inner())
    }

    #[test]
    fn test_reads_back_through_hound() {
        let rate = FrameRate::Fps25;
        let start = Timecode::new(1, 23, 45, 12, rate).unwrap();
        let (written, data) = encode_to_memory(start, rate, Length::Frames(2), &Config::default());
        assert_eq!(written, 3840);

        let mut reader = WavReader::new(Cursor::new(data)).unwrap();
        assert_eq!(reader.spec(), ltc_spec(48_000));
        assert_eq!(reader.len(), 3840);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        let expected: Vec<i16> = generate_sequence(start, rate, 2, 48_000)
            .flat_map(|frame| frame.samples)
            .collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn test_duration_trims_last_frame() {
        let mut config = Config::default();
        config.sample_rate = 44_100;
        let length = Length::Duration(Duration::from_millis(1010));
        let (written, data) =
            encode_to_memory(Timecode::midnight(), FrameRate::Fps25, length, &config);

        // 26 frames are rendered but only 44541 samples are kept.
        assert_eq!(written, 44_541);
        let reader = WavReader::new(Cursor::new(data)).unwrap();
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.len(), 44_541);
    }

    #[test]
    fn test_zero_length() {
        let (written, data) = encode_to_memory(
            Timecode::midnight(),
            FrameRate::Fps30,
            Length::Frames(0),
            &Config::default(),
        );
        assert_eq!(written, 0);
        assert_eq!(WavReader::new(Cursor::new(data)).unwrap().len(), 0);
    }

    #[test]
    fn test_length_in_frames() {
        assert_eq!(
            Length::Frames(2).frames_and_samples(FrameRate::Fps25, 48_000),
            (2, 3840)
        );
        assert_eq!(
            Length::Frames(30).frames_and_samples(FrameRate::Fps2997Drop, 48_000),
            (30, 48_048)
        );
    }

    #[test]
    fn test_length_as_duration() {
        let length = Length::Duration(Duration::from_millis(1500));
        assert_eq!(
            length.frames_and_samples(FrameRate::Fps25, 48_000),
            (38, 72_000)
        );
        assert_eq!(
            length.frames_and_samples(FrameRate::Fps2997Drop, 48_000),
            (45, 72_000)
        );
    }
}
