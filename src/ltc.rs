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

//! The 80-bit SMPTE linear timecode word.
//!
//! Each LTC frame carries one [`LtcWord`]. Bits are numbered in transmission order, 0 through 79,
//! and every multi-bit field is stored LSB-first:
//!
//! | bits    | field                                   |
//! |---------|-----------------------------------------|
//! | 0-3     | frame units                             |
//! | 8-9     | frame tens                              |
//! | 10      | drop-frame flag                         |
//! | 16-19   | seconds units                           |
//! | 24-26   | seconds tens                            |
//! | 27      | biphase mark polarity correction        |
//! | 32-35   | minutes units                           |
//! | 40-42   | minutes tens                            |
//! | 48-51   | hours units                             |
//! | 56-57   | hours tens                              |
//! | 64-79   | sync word [`SYNC_WORD`]                 |
//!
//! All other bits are user bits and are always zero. The correction bit is chosen so that the
//! whole word has an even number of set bits, which makes a biphase-mark rendering of the word end
//! at the polarity it started with.
//!
//! Rendering words to audio lives in [`encoder`]; recovering words from audio in [`decoder`].

pub mod decoder;
pub mod encoder;

use crate::timecode::{self, FrameRate, Timecode};
use std::fmt;
use thiserror::Error;

/// Number of bits in one LTC frame.
pub const BITS_PER_FRAME: usize = 80;

/// The sync word occupying bits 64-79, read LSB-first.
pub const SYNC_WORD: u16 = 0x3FFD;

const WORD_MASK: u128 = (1u128 << BITS_PER_FRAME) - 1;
const SYNC_OFFSET: u32 = 64;
const PARITY_BIT: u32 = 27;
const DROP_FRAME_BIT: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    offset: u32,
    width: u32,
}

const FRAME_UNITS: Field = Field::new("frame units", 0, 4);
const FRAME_TENS: Field = Field::new("frame tens", 8, 2);
const SECONDS_UNITS: Field = Field::new("seconds units", 16, 4);
const SECONDS_TENS: Field = Field::new("seconds tens", 24, 3);
const MINUTES_UNITS: Field = Field::new("minutes units", 32, 4);
const MINUTES_TENS: Field = Field::new("minutes tens", 40, 3);
const HOURS_UNITS: Field = Field::new("hours units", 48, 4);
const HOURS_TENS: Field = Field::new("hours tens", 56, 2);

impl Field {
    const fn new(name: &'static str, offset: u32, width: u32) -> Field {
        Field {
            name,
            offset,
            width,
        }
    }

    fn mask(self) -> u128 {
        ((1u128 << self.width) - 1) << self.offset
    }
}

/// A specialized [`Result`] type for reading fields out of an [`LtcWord`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors found when interpreting a received [`LtcWord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("bad sync word: {0:#06x}")]
    BadSyncWord(u16),
    #[error("word has odd parity")]
    OddParity,
    #[error("{field} is not a BCD digit: {value}")]
    InvalidBcd { field: &'static str, value: u8 },
    #[error("decoded timecode is invalid: {0}")]
    Timecode(#[from] timecode::Error),
}

/// One 80-bit LTC frame.
///
/// Built fresh for every frame with [`LtcWord::new`]. Bit `i` of the word is bit `i` of the inner
/// integer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LtcWord(u128);

impl LtcWord {
    /// Builds the word for `timecode` at `rate`.
    ///
    /// Fields are BCD-encoded, the drop-frame flag is set for drop-frame rates, the sync word is
    /// written and bit 27 is set so that the total number of set bits is even.
    ///
    /// # Examples
    ///
    /// ```
    /// use smpte_ltc::{ltc::{LtcWord, SYNC_WORD}, timecode::{FrameRate, Timecode}};
    ///
    /// let rate = FrameRate::Fps25;
    /// let word = LtcWord::new(Timecode::new(1, 23, 45, 12, rate)?, rate);
    /// assert_eq!(word.sync_word(), SYNC_WORD);
    /// assert!(word.has_even_parity());
    /// assert_eq!(word.timecode(rate).unwrap(), Timecode::new(1, 23, 45, 12, rate)?);
    /// # smpte_ltc::timecode::Result::Ok(())
    /// ```
    pub fn new(timecode: Timecode, rate: FrameRate) -> LtcWord {
        let mut word = LtcWord(0);
        word.write_bcd(FRAME_UNITS, FRAME_TENS, timecode.frames());
        word.write_bcd(SECONDS_UNITS, SECONDS_TENS, timecode.seconds());
        word.write_bcd(MINUTES_UNITS, MINUTES_TENS, timecode.minutes());
        word.write_bcd(HOURS_UNITS, HOURS_TENS, timecode.hours());
        if rate.is_drop_frame() {
            word.0 |= 1u128 << DROP_FRAME_BIT;
        }
        word.0 |= u128::from(SYNC_WORD) << SYNC_OFFSET;

        if word.count_ones() % 2 == 1 {
            word.0 |= 1u128 << PARITY_BIT;
        }
        word
    }

    /// Wraps raw bits. Bits above 79 are discarded.
    pub fn from_bits(bits: u128) -> LtcWord {
        LtcWord(bits & WORD_MASK)
    }

    pub fn to_bits(self) -> u128 {
        self.0
    }

    /// The value of bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`BITS_PER_FRAME`].
    pub fn bit(self, index: usize) -> bool {
        assert!(index < BITS_PER_FRAME, "bit index out of range: {}", index);
        self.0 >> index & 1 == 1
    }

    /// Iterates over the bits in transmission order.
    pub fn bits(self) -> impl Iterator<Item = bool> {
        (0..BITS_PER_FRAME).map(move |i| self.bit(i))
    }

    pub fn count_ones(self) -> u32 {
        self.0.count_ones()
    }

    pub fn has_even_parity(self) -> bool {
        self.count_ones() % 2 == 0
    }

    /// Bits 64-79 read LSB-first.
    pub fn sync_word(self) -> u16 {
        (self.0 >> SYNC_OFFSET) as u16
    }

    pub fn is_drop_frame(self) -> bool {
        self.0 >> DROP_FRAME_BIT & 1 == 1
    }

    /// The word as ten bytes, bit 0 in the least significant bit of the first byte.
    pub fn to_bytes(self) -> [u8; 10] {
        let mut bytes = [0; 10];
        bytes.copy_from_slice(&self.0.to_le_bytes()[..10]);
        bytes
    }

    /// Decodes the timecode carried by this word.
    ///
    /// # Errors
    ///
    /// * [`Error::BadSyncWord`] if bits 64-79 are not [`SYNC_WORD`].
    /// * [`Error::OddParity`] if the word fails the parity check.
    /// * [`Error::InvalidBcd`] if a units or tens field holds a value above 9.
    /// * [`Error::Timecode`] if the decoded fields are out of range for `rate`.
    pub fn timecode(self, rate: FrameRate) -> Result<Timecode> {
        let sync = self.sync_word();
        if sync != SYNC_WORD {
            return Err(Error::BadSyncWord(sync));
        }
        if !self.has_even_parity() {
            return Err(Error::OddParity);
        }
        let timecode = Timecode::new(
            self.read_bcd(HOURS_UNITS, HOURS_TENS)?,
            self.read_bcd(MINUTES_UNITS, MINUTES_TENS)?,
            self.read_bcd(SECONDS_UNITS, SECONDS_TENS)?,
            self.read_bcd(FRAME_UNITS, FRAME_TENS)?,
            rate,
        )?;
        Ok(timecode)
    }

    fn write_bcd(&mut self, units: Field, tens: Field, value: u8) {
        self.write(units, value % 10);
        self.write(tens, value / 10);
    }

    fn write(&mut self, field: Field, value: u8) {
        self.0 = (self.0 & !field.mask()) | (u128::from(value) << field.offset & field.mask());
    }

    fn read(self, field: Field) -> u8 {
        ((self.0 & field.mask()) >> field.offset) as u8
    }

    fn read_bcd(self, units: Field, tens: Field) -> Result<u8> {
        let digit = |field: Field| match self.read(field) {
            value if value > 9 => Err(Error::InvalidBcd {
                field: field.name,
                value,
            }),
            value => Ok(value),
        };
        Ok(digit(tens)? * 10 + digit(units)?)
    }
}

impl fmt::Debug for LtcWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = self.bits().map(|b| if b { '1' } else { '0' }).collect();
        f.debug_tuple("LtcWord").field(&bits).finish()
    }
}
