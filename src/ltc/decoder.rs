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

//! Recovers LTC words from biphase-mark PCM.
//!
//! The decoder watches for sign changes, measures the time between them and classifies each
//! interval as a half or a full bit cell. A full cell is a `0` bit and two half cells are a `1`
//! bit. Decoded bits are shifted into an 80-bit window; whenever the window ends in the sync word
//! and has even parity, a frame is queued.
//!
//! The bit length estimate starts from the expected samples per frame and then follows the
//! signal, so moderately varying playback speed is tolerated. An interval much longer than a bit
//! cell (a dropout or silence) resets the decoder.
//!
//! ```
//! use smpte_ltc::{
//!     ltc::{decoder::Decoder, encoder::generate_sequence},
//!     timecode::{FrameRate, Timecode},
//! };
//!
//! let rate = FrameRate::Fps25;
//! let mut decoder = Decoder::new(48_000.0 / 25.0);
//! for frame in generate_sequence(Timecode::midnight(), rate, 3, 48_000) {
//!     decoder.write(&frame.samples);
//! }
//! decoder.flush();
//!
//! let decoded: Vec<_> = std::iter::from_fn(|| decoder.read())
//!     .map(|frame| frame.word.timecode(rate).unwrap().frames())
//!     .collect();
//! assert_eq!(decoded, vec![0, 1, 2]);
//! ```

use super::{LtcWord, BITS_PER_FRAME, SYNC_WORD};
use std::collections::VecDeque;

const SHORT_LIMIT: f64 = 0.75;
const LONG_LIMIT: f64 = 1.5;
const TRACKING: f64 = 0.1;

/// A frame recovered by a [`Decoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    pub word: LtcWord,
    /// Index of the sample at which the frame's first bit cell began, counted from the first
    /// sample written to the decoder.
    pub start_sample: u64,
    /// Index one past the frame's last sample.
    pub end_sample: u64,
}

/// A streaming LTC decoder.
#[derive(Debug, Clone)]
pub struct Decoder {
    samples_per_bit: f64,
    position: u64,
    last_sign: i8,
    last_edge: Option<u64>,
    cell_start: u64,
    half_pending: bool,
    window: u128,
    bit_starts: VecDeque<u64>,
    frames: VecDeque<DecodedFrame>,
}

impl Decoder {
    /// Creates a decoder expecting roughly `samples_per_frame` samples per LTC frame.
    pub fn new(samples_per_frame: f64) -> Decoder {
        Decoder {
            samples_per_bit: samples_per_frame / BITS_PER_FRAME as f64,
            position: 0,
            last_sign: 0,
            last_edge: None,
            cell_start: 0,
            half_pending: false,
            window: 0,
            bit_starts: VecDeque::with_capacity(BITS_PER_FRAME),
            frames: VecDeque::new(),
        }
    }

    /// Feeds samples to the decoder. Zero samples never count as a transition.
    pub fn write(&mut self, samples: &[i16]) {
        for &sample in samples {
            let sign = sample.signum() as i8;
            if sign != 0 && sign != self.last_sign {
                self.last_sign = sign;
                self.edge(self.position);
            }
            self.position += 1;
        }
    }

    /// Marks the end of the signal.
    ///
    /// The last bit of a frame only ends at the next transition. Calling `flush` treats the end of
    /// the written samples as that transition so that a trailing frame is decoded.
    pub fn flush(&mut self) {
        if self.last_edge.is_some() {
            self.edge(self.position);
        }
        self.last_edge = None;
        self.last_sign = 0;
    }

    /// Takes the oldest decoded frame, if any.
    pub fn read(&mut self) -> Option<DecodedFrame> {
        self.frames.pop_front()
    }

    /// The current estimate of the bit cell length in samples.
    pub fn samples_per_bit(&self) -> f64 {
        self.samples_per_bit
    }

    fn edge(&mut self, at: u64) {
        let last_edge = match self.last_edge.replace(at) {
            Some(last_edge) => last_edge,
            None => {
                self.resync(at);
                return;
            }
        };

        let interval = (at - last_edge) as f64;
        if interval < SHORT_LIMIT * self.samples_per_bit {
            if self.half_pending {
                self.half_pending = false;
                self.track((at - self.cell_start) as f64);
                self.push_bit(true, at);
            } else {
                self.half_pending = true;
            }
        } else if interval <= LONG_LIMIT * self.samples_per_bit && !self.half_pending {
            self.track(interval);
            self.push_bit(false, at);
        } else {
            log::trace!("ltc decoder lost sync at sample {}", at);
            self.resync(at);
        }
    }

    fn track(&mut self, cell_length: f64) {
        self.samples_per_bit += TRACKING * (cell_length - self.samples_per_bit);
    }

    fn resync(&mut self, at: u64) {
        self.cell_start = at;
        self.half_pending = false;
        self.window = 0;
        self.bit_starts.clear();
    }

    fn push_bit(&mut self, bit: bool, cell_end: u64) {
        self.window = (self.window >> 1) | (u128::from(bit) << (BITS_PER_FRAME - 1));
        if self.bit_starts.len() == BITS_PER_FRAME {
            self.bit_starts.pop_front();
        }
        self.bit_starts.push_back(self.cell_start);
        self.cell_start = cell_end;

        if self.bit_starts.len() < BITS_PER_FRAME {
            return;
        }
        let word = LtcWord::from_bits(self.window);
        if word.sync_word() == SYNC_WORD && word.has_even_parity() {
            self.frames.push_back(DecodedFrame {
                word,
                start_sample: self.bit_starts[0],
                end_sample: cell_end,
            });
        }
    }
}
