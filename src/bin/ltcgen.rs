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

//! Writes LTC to a WAV file.

use clap::Parser;
use smpte_ltc::{
    config::Config,
    timecode::{FrameRate, Timecode},
    wav::{self, Length},
};
use std::{path::PathBuf, process, time::Duration};
use tracing_subscriber::filter::LevelFilter;

/// Render SMPTE linear timecode to a 16-bit mono WAV file
#[derive(Parser)]
#[command(name = "ltcgen")]
#[command(version)]
struct Cli {
    /// Output WAV file path
    output: PathBuf,

    /// Frame rate type: 0 = 24, 1 = 25, 2 = 29.97 drop-frame, 3 = 30
    #[arg(short = 't', long = "type", default_value = "1")]
    #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
    rate_type: u8,

    /// Timecode of the first frame, HH:MM:SS:FF
    #[arg(short, long, default_value = "00:00:00:00")]
    start: String,

    /// Number of frames to render
    #[arg(short, long, conflicts_with = "duration", required_unless_present = "duration")]
    frames: Option<u64>,

    /// Length to render in seconds, trimmed to the nearest sample
    #[arg(short, long, value_parser = parse_seconds)]
    duration: Option<Duration>,

    /// Sample rate in Hz (defaults to the configured sample rate)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..))]
    sample_rate: Option<u32>,

    /// Peak sample value (defaults to the configured amplitude)
    #[arg(short, long, value_parser = clap::value_parser!(i16).range(1..))]
    amplitude: Option<i16>,

    /// JSON configuration file
    #[arg(short, long, env = "SMPTE_LTC_CONFIG")]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    if let Err(err) = run(Cli::parse()) {
        log::error!("{}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path).map_err(|err| err.to_string())?,
        None => Config::default(),
    };
    if let Some(sample_rate) = cli.sample_rate {
        config.sample_rate = sample_rate;
    }
    if let Some(amplitude) = cli.amplitude {
        config.amplitude = amplitude;
    }

    let rate = FrameRate::from_type_code(cli.rate_type).map_err(|err| err.to_string())?;
    let start = parse_timecode(&cli.start, rate)?;
    let length = match (cli.frames, cli.duration) {
        (_, Some(duration)) => Length::Duration(duration),
        (Some(frames), None) => Length::Frames(frames),
        (None, None) => return Err("one of --frames or --duration is required".to_string()),
    };

    wav::write_ltc(&cli.output, start, rate, length, &config)
        .map_err(|err| format!("{}: {}", cli.output.display(), err))?;
    Ok(())
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value.parse().map_err(|err| format!("{}", err))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("{} is not a length in seconds", value));
    }
    Ok(Duration::from_secs_f64(seconds))
}

// Accepts `:` or the drop-frame `;` before the frames field.
fn parse_timecode(value: &str, rate: FrameRate) -> Result<Timecode, String> {
    let fields = value
        .split(|c| c == ':' || c == ';')
        .map(|field| field.parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid timecode {:?}: {}", value, err))?;
    match fields[..] {
        [hours, minutes, seconds, frames] => {
            Timecode::new(hours, minutes, seconds, frames, rate).map_err(|err| err.to_string())
        }
        _ => Err(format!("invalid timecode {:?}: expected HH:MM:SS:FF", value)),
    }
}
