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

//! Linear Timecode (LTC) generation and decoding, plus Art-Net and OSC network timecode.
//!
//! # Introduction
//!
//! [SMPTE linear timecode] carries hours, minutes, seconds and frames as an audio signal. Each
//! frame is an 80-bit word, biphase-mark coded so that it survives polarity inversion and can be
//! read at varying tape or playback speeds. This crate covers the whole path from a timecode label
//! to samples and back:
//!
//! * [`timecode`] - Frame rates and timecode values, including drop-frame counting at 29.97 fps.
//!
//! * [`ltc`] - The 80-bit timecode word, the [biphase-mark encoder](ltc::encoder) that renders it
//!   to PCM with sample-accurate frame boundaries, and a streaming [decoder](ltc::decoder).
//!
//! * [`wav`] - Renders a run of timecode to a 16-bit mono WAV file.
//!
//! * [`playback`] - A background producer and a non-blocking output for feeding an audio
//!   callback, with play/stop/relocate commands.
//!
//! * [`net`] - Art-Net TimeCode and OSC timecode packets, and a UDP relay driven by the line
//!   protocol in [`protocol`].
//!
//! Two command line tools are built from this crate: `ltcgen` writes LTC WAV files and `tcrelay`
//! relays timecode read from stdin to Art-Net or OSC receivers.
//!
//! # Examples
//!
//! Render two frames of 25 fps timecode at 48 kHz. Every frame spans exactly
//! `sample_rate / fps` samples on average, here 1920.
//!
//! ```
//! use smpte_ltc::{
//!     ltc::encoder::generate_sequence,
//!     timecode::{FrameRate, Timecode},
//! };
//!
//! let rate = FrameRate::Fps25;
//! let start = Timecode::new(1, 23, 45, 12, rate)?;
//!
//! let frames: Vec<_> = generate_sequence(start, rate, 2, 48_000).collect();
//! assert_eq!(frames[0].timecode.to_string(), "01:23:45:12");
//! assert_eq!(frames[1].timecode.to_string(), "01:23:45:13");
//!
//! let samples: usize = frames.iter().map(|frame| frame.samples.len()).sum();
//! assert_eq!(samples, 3840);
//! # smpte_ltc::timecode::Result::Ok(())
//! ```
//!
//! [SMPTE linear timecode]: https://en.wikipedia.org/wiki/Linear_timecode

pub mod config;
pub mod ltc;
pub mod net;
pub mod playback;
pub mod protocol;
pub mod timecode;
pub mod wav;
