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

//! Settings shared by the drivers.
//!
//! Every field has a default, so an empty JSON object is a valid configuration.
//!
//! ```
//! use smpte_ltc::config::Config;
//!
//! let config = Config::from_reader(r#"{"sample_rate": 44100}"#.as_bytes())?;
//! assert_eq!(config.sample_rate, 44_100);
//! assert_eq!(config.amplitude, 16_383);
//! # smpte_ltc::config::Result::Ok(())
//! ```

use crate::ltc::encoder::DEFAULT_AMPLITUDE;
use serde::Deserialize;
use std::{fs::File, io, io::Read, path::Path};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open config file: {0}")]
    Open(io::Error),
    #[error("failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("amplitude must be between 1 and {}, got {0}", i16::MAX)]
    Amplitude(i16),
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_amplitude() -> i16 {
    DEFAULT_AMPLITUDE
}

fn default_buffer_seconds() -> f64 {
    1.0
}

fn default_artnet_port() -> u16 {
    crate::net::ARTNET_PORT
}

fn default_osc_address() -> String {
    "/tc".to_string()
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Peak sample value of the rendered square wave, `1..=32767`.
    #[serde(default = "default_amplitude")]
    pub amplitude: i16,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            amplitude: default_amplitude(),
            playback: PlaybackConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    pub fn from_reader<R: Read>(reader: R) -> Result<Config> {
        let config: Config = serde_json::from_reader(reader).map_err(Error::Parse)?;
        if config.amplitude < 1 {
            return Err(Error::Amplitude(config.amplitude));
        }
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
        let file = File::open(path).map_err(Error::Open)?;
        Config::from_reader(io::BufReader::new(file))
    }
}

/// Streaming playback settings.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// How much audio the producer keeps queued ahead of the consumer.
    ///
    /// The queue holds one block per frame and is sized for 30 fps, so at lower frame rates up to
    /// `30 / fps` times this much audio is queued (1.25 times at 24 fps).
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: default_buffer_seconds(),
        }
    }
}

/// Network timecode settings.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_artnet_port")]
    pub artnet_port: u16,
    #[serde(default = "default_osc_address")]
    pub osc_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            artnet_port: default_artnet_port(),
            osc_address: default_osc_address(),
        }
    }
}
