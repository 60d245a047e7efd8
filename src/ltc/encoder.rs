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

//! Biphase-mark rendering of LTC words into 16-bit PCM.
//!
//! Every bit cell starts with a polarity flip; a `1` bit flips again at the middle of the cell.
//! Cell boundaries are placed by rounding an ideal, real-valued sample position, so cells that do
//! not span a whole number of samples never accumulate drift.
//!
//! [`render_frame`] renders a single word. [`Generator`] drives a whole run of frames: it builds
//! each word, renders it for that frame's share of samples and advances the timecode, carrying the
//! [`EncoderState`] from one frame to the next so the concatenated output is one continuous signal.
//!
//! ```
//! use smpte_ltc::{ltc::encoder::generate_sequence, timecode::{FrameRate, Timecode}};
//!
//! let start = Timecode::new(1, 23, 45, 12, FrameRate::Fps25)?;
//! let samples: usize = generate_sequence(start, FrameRate::Fps25, 2, 48_000)
//!     .map(|frame| frame.samples.len())
//!     .sum();
//! assert_eq!(samples, 3840);
//! # smpte_ltc::timecode::Result::Ok(())
//! ```

use super::{LtcWord, BITS_PER_FRAME};
use crate::timecode::{FrameRate, Timecode};

/// Default peak sample value, about half of full scale.
pub const DEFAULT_AMPLITUDE: i16 = 16383;

const HALF_CELLS_PER_FRAME: usize = 2 * BITS_PER_FRAME;

/// The output level of the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn flip(self) -> Polarity {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }

    fn level(self, amplitude: i16) -> i16 {
        match self {
            Polarity::Positive => amplitude,
            Polarity::Negative => -amplitude,
        }
    }
}

/// State carried from one rendered frame to the next.
///
/// Start a contiguous segment with [`EncoderState::default`] and feed each returned state into the
/// next [`render_frame`] call. Only start over when the output is not contiguous with what came
/// before.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderState {
    /// The level of the most recently emitted sample.
    pub polarity: Polarity,
    /// Fractional part of the ideal, real-valued sample position at which the next frame begins,
    /// in `[0, 1)`. Bit cell boundaries are rounded from this offset.
    pub phase: f64,
}

impl Default for EncoderState {
    fn default() -> EncoderState {
        EncoderState {
            polarity: Polarity::Positive,
            phase: 0.0,
        }
    }
}

/// Renders `word` as exactly `sample_count` samples of biphase-mark PCM.
///
/// Returns the samples together with the state to pass to the next call. Because every word built
/// by [`LtcWord::new`] has even parity, the returned polarity equals the incoming one.
///
/// The frame ideally starts `state.phase` samples into a run whose sample grid is shifted by
/// `round(state.phase)`; half-cell boundaries are rounded from there. Half-cell lengths are the
/// differences of rounded boundaries, so they always add up to `sample_count`. A whole number of
/// samples moves the ideal position by a whole number, so the returned phase is unchanged;
/// [`Generator`] advances it by the exact, fractional frame length instead. Below two samples per
/// bit some half-cells come out empty; such a frame cannot carry a decodable signal anyway.
///
/// `amplitude` is clamped to `1..=i16::MAX`.
pub fn render_frame(
    word: &LtcWord,
    sample_count: usize,
    state: EncoderState,
    amplitude: i16,
) -> (Vec<i16>, EncoderState) {
    let amplitude = amplitude.max(1);
    let step = sample_count as f64 / HALF_CELLS_PER_FRAME as f64;
    let origin = state.phase.round();
    let boundary = |half_cell: usize| -> usize {
        if half_cell == HALF_CELLS_PER_FRAME {
            sample_count
        } else {
            (state.phase + half_cell as f64 * step).round().max(origin) as usize - origin as usize
        }
    };

    let mut samples = Vec::with_capacity(sample_count);
    let mut polarity = state.polarity;
    for (index, bit) in word.bits().enumerate() {
        let start = boundary(2 * index);
        let mid = boundary(2 * index + 1);
        let end = boundary(2 * index + 2);

        polarity = polarity.flip();
        fill(&mut samples, polarity.level(amplitude), mid - start);
        if bit {
            polarity = polarity.flip();
        }
        fill(&mut samples, polarity.level(amplitude), end - mid);
    }
    debug_assert_eq!(samples.len(), sample_count);

    (
        samples,
        EncoderState {
            polarity,
            phase: state.phase,
        },
    )
}

fn fill(samples: &mut Vec<i16>, level: i16, count: usize) {
    samples.extend(std::iter::repeat(level).take(count));
}

/// The ideal, real-valued sample position at which frame `index` begins in a run starting at
/// sample 0.
pub fn frame_start_position(index: u64, sample_rate: u32, rate: FrameRate) -> f64 {
    index as f64 * f64::from(sample_rate) / rate.exact_rate()
}

/// The first sample of frame `index` in a run starting at sample 0.
pub fn frame_start_sample(index: u64, sample_rate: u32, rate: FrameRate) -> u64 {
    frame_start_position(index, sample_rate, rate).round() as u64
}

/// The number of samples frame `index` spans in a run starting at sample 0.
///
/// Spans alternate between neighbouring integers for fractional rates so that the first `n`
/// frames always span exactly `frame_start_sample(n, ..)` samples.
pub fn frame_sample_count(index: u64, sample_rate: u32, rate: FrameRate) -> usize {
    let start = frame_start_sample(index, sample_rate, rate);
    (frame_start_sample(index + 1, sample_rate, rate) - start) as usize
}

/// One rendered LTC frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub timecode: Timecode,
    pub word: LtcWord,
    pub samples: Vec<i16>,
}

/// A forward-only sequence of rendered LTC frames.
///
/// Created by [`generate_sequence`] for a fixed number of frames or by [`Generator::unbounded`]
/// for live output.
#[derive(Debug, Clone)]
pub struct Generator {
    timecode: Timecode,
    rate: FrameRate,
    sample_rate: u32,
    amplitude: i16,
    state: EncoderState,
    index: u64,
    remaining: Option<u64>,
}

/// Renders `frame_count` consecutive frames starting at `start`.
///
/// Frame `i` spans [`frame_sample_count(i, ..)`](frame_sample_count) samples, so the whole run is
/// exactly `round(frame_count * sample_rate / rate.exact_rate())` samples long.
pub fn generate_sequence(
    start: Timecode,
    rate: FrameRate,
    frame_count: u64,
    sample_rate: u32,
) -> Generator {
    Generator {
        remaining: Some(frame_count),
        ..Generator::unbounded(start, rate, sample_rate)
    }
}

impl Generator {
    /// A generator that never runs out of frames.
    pub fn unbounded(start: Timecode, rate: FrameRate, sample_rate: u32) -> Generator {
        Generator {
            timecode: start,
            rate,
            sample_rate,
            amplitude: DEFAULT_AMPLITUDE,
            state: EncoderState::default(),
            index: 0,
            remaining: None,
        }
    }

    /// Sets the peak sample value, clamped to `1..=i16::MAX`. Defaults to [`DEFAULT_AMPLITUDE`].
    pub fn amplitude(mut self, amplitude: i16) -> Self {
        self.amplitude = amplitude.max(1);
        self
    }

    /// The timecode of the next frame to be rendered.
    pub fn timecode(&self) -> Timecode {
        self.timecode
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }
}

impl Iterator for Generator {
    type Item = EncodedFrame;

    fn next(&mut self) -> Option<EncodedFrame> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let sample_count = frame_sample_count(self.index, self.sample_rate, self.rate);
        let word = LtcWord::new(self.timecode, self.rate);
        let (samples, state) = render_frame(&word, sample_count, self.state, self.amplitude);
        let frame = EncodedFrame {
            timecode: self.timecode,
            word,
            samples,
        };

        self.index += 1;
        self.state = EncoderState {
            polarity: state.polarity,
            phase: frame_start_position(self.index, self.sample_rate, self.rate).fract(),
        };
        self.timecode = self.timecode.advance(self.rate);
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(remaining) => (remaining as usize, Some(remaining as usize)),
            None => (usize::MAX, None),
        }
    }
}
