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

//! Relays timecode lines from stdin to Art-Net or OSC receivers.
//!
//! Input is one `<hours> <minutes> <seconds> <frames> <type>` line per frame, where type is
//! `0` = 24, `1` = 25, `2` = 29.97 drop-frame or `3` = 30.

use clap::{Parser, Subcommand};
use smpte_ltc::{
    config::Config,
    net::{self, TimecodeSender},
};
use std::{io, path::PathBuf, process};
use tracing_subscriber::filter::LevelFilter;

/// Send timecode read from stdin over UDP
#[derive(Parser)]
#[command(name = "tcrelay")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "SMPTE_LTC_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send Art-Net TimeCode packets
    Artnet {
        /// Destination address, may be a broadcast address
        ip: String,

        /// Destination UDP port (defaults to the configured Art-Net port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send OSC messages with the arguments H M S F type
    Osc {
        /// Destination address
        ip: String,

        /// Destination UDP port
        port: u16,

        /// OSC address pattern (defaults to the configured address)
        #[arg(short, long)]
        address: Option<String>,
    },
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
    let config = match &cli.config {
        Some(path) => Config::from_path(path).map_err(|err| err.to_string())?,
        None => Config::default(),
    };

    let sender = match cli.command {
        Commands::Artnet { ip, port } => {
            TimecodeSender::artnet(&ip, port.unwrap_or(config.network.artnet_port))
        }
        Commands::Osc { ip, port, address } => {
            let address = address.unwrap_or(config.network.osc_address);
            TimecodeSender::osc((ip.as_str(), port), &address)
        }
    }
    .map_err(|err| err.to_string())?;

    let stdin = io::stdin();
    net::relay(stdin.lock(), &sender).map_err(|err| err.to_string())?;
    Ok(())
}
