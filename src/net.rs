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

//! Timecode over the network.
//!
//! Two packet formats are supported, both sent as one UDP datagram per frame:
//!
//! * [Art-Net] TimeCode (`OpTimeCode`), a fixed 19 byte packet usually broadcast to port 6454.
//! * An [OSC] message carrying five int32 arguments: hours, minutes, seconds, frames and the
//!   frame rate type code.
//!
//! [`relay`] reads the line protocol from [`crate::protocol`] and forwards each line with a
//! [`TimecodeSender`].
//!
//! [Art-Net]: https://art-net.org.uk/
//! [OSC]: http://opensoundcontrol.org/

use crate::{
    protocol::Cue,
    timecode::{FrameRate, Timecode},
};
use rosc::{encoder::encode, OscError, OscMessage, OscPacket, OscType};
use std::{
    io::{self, BufRead},
    net::{ToSocketAddrs, UdpSocket},
};
use thiserror::Error;

/// The UDP port Art-Net nodes listen on.
pub const ARTNET_PORT: u16 = 6454;

/// Length of an Art-Net TimeCode packet.
pub const ARTNET_PACKET_LEN: usize = 19;

const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
const OP_TIMECODE: u16 = 0x9700;
const PROTOCOL_VERSION: u16 = 14;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("binding to UDP socket: {0}")]
    UdpBind(#[source] io::Error),
    #[error("connecting UDP socket: {0}")]
    UdpConnect(#[source] io::Error),
    #[error("sending timecode: {0}")]
    Send(#[source] io::Error),
    #[error("encoding OSC packet: {0:?}")]
    OscEncode(OscError),
    #[error("reading timecode input: {0}")]
    Read(#[source] io::Error),
}

/// Builds an Art-Net TimeCode packet.
///
/// ```
/// use smpte_ltc::{net::artnet_timecode_packet, timecode::{FrameRate, Timecode}};
///
/// let tc = Timecode::new(1, 23, 45, 12, FrameRate::Fps25)?;
/// let packet = artnet_timecode_packet(tc, FrameRate::Fps25);
/// assert_eq!(&packet[..8], b"Art-Net\0");
/// assert_eq!(&packet[14..], &[12, 45, 23, 1, 1]);
/// # smpte_ltc::timecode::Result::Ok(())
/// ```
pub fn artnet_timecode_packet(timecode: Timecode, rate: FrameRate) -> [u8; ARTNET_PACKET_LEN] {
    let mut packet = [0; ARTNET_PACKET_LEN];
    packet[..8].copy_from_slice(ARTNET_ID);
    packet[8..10].copy_from_slice(&OP_TIMECODE.to_le_bytes());
    packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    // 12..14 are filler
    packet[14] = timecode.frames();
    packet[15] = timecode.seconds();
    packet[16] = timecode.minutes();
    packet[17] = timecode.hours();
    packet[18] = rate.type_code();
    packet
}

/// Builds an OSC message at `address` with the arguments `H M S F type`.
pub fn osc_timecode_packet(address: &str, timecode: Timecode, rate: FrameRate) -> Result<Vec<u8>> {
    let args = [
        timecode.hours(),
        timecode.minutes(),
        timecode.seconds(),
        timecode.frames(),
        rate.type_code(),
    ]
    .iter()
    .map(|&value| OscType::Int(i32::from(value)))
    .collect();

    encode(&OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args,
    }))
    .map_err(Error::OscEncode)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Format {
    ArtNet,
    Osc { address: String },
}

/// Sends one packet per timecode value to a fixed destination.
#[derive(Debug)]
pub struct TimecodeSender {
    socket: UdpSocket,
    format: Format,
}

impl TimecodeSender {
    /// Sends Art-Net TimeCode to `host`. Broadcast destinations are allowed.
    pub fn artnet(host: &str, port: u16) -> Result<TimecodeSender> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::UdpBind)?;
        socket.set_broadcast(true).map_err(Error::UdpBind)?;
        socket.connect((host, port)).map_err(Error::UdpConnect)?;
        Ok(TimecodeSender {
            socket,
            format: Format::ArtNet,
        })
    }

    /// Sends OSC timecode messages with the given address pattern to `destination`.
    pub fn osc<A: ToSocketAddrs>(destination: A, address: &str) -> Result<TimecodeSender> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::UdpBind)?;
        socket.connect(destination).map_err(Error::UdpConnect)?;
        Ok(TimecodeSender {
            socket,
            format: Format::Osc {
                address: address.to_string(),
            },
        })
    }

    pub fn send(&self, timecode: Timecode, rate: FrameRate) -> Result<()> {
        let bytes = match &self.format {
            Format::ArtNet => artnet_timecode_packet(timecode, rate).to_vec(),
            Format::Osc { address } => osc_timecode_packet(address, timecode, rate)?,
        };
        self.socket.send(&bytes).map_err(Error::Send)?;
        log::debug!("sent {} ({})", timecode, rate);
        Ok(())
    }
}

/// Forwards timecode lines from `reader` until end of input.
///
/// Blank lines are ignored. Malformed lines and failed sends are logged and skipped. Returns the
/// number of packets sent.
pub fn relay<R: BufRead>(reader: R, sender: &TimecodeSender) -> Result<usize> {
    let mut sent = 0;
    for line in reader.lines() {
        let line = line.map_err(Error::Read)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cue: Cue = match line.parse() {
            Ok(cue) => cue,
            Err(err) => {
                log::warn!("skipping {:?}: {}", line, err);
                continue;
            }
        };
        match sender.send(cue.timecode, cue.rate) {
            Ok(()) => sent += 1,
            Err(err) => log::warn!("{}", err),
        }
    }
    log::info!("end of input after {} packets", sent);
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::decoder::decode;
    use std::time::Duration;

    fn receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        socket
    }

    fn recv(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = [0; 1024];
        let len = socket.recv(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    fn osc_args(bytes: &[u8]) -> (String, Vec<OscType>) {
        match decode(bytes).unwrap() {
            OscPacket::Message(msg) => (msg.addr, msg.args),
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn test_artnet_packet_layout() {
        let rate = FrameRate::Fps2997Drop;
        let tc = Timecode::new(23, 59, 59, 29, rate).unwrap();
        assert_eq!(
            artnet_timecode_packet(tc, rate),
            [
                b'A', b'r', b't', b'-', b'N', b'e', b't', 0, // ID
                0x00, 0x97, // OpCode
                0x00, 0x0e, // ProtVer
                0x00, 0x00, // filler
                29, 59, 59, 23, 2,
            ]
        );
    }

    #[test]
    fn test_osc_packet() {
        let rate = FrameRate::Fps25;
        let tc = Timecode::new(1, 23, 45, 12, rate).unwrap();
        let bytes = osc_timecode_packet("/tc", tc, rate).unwrap();

        // "/tc\0" + ",iiiii\0\0" + 5 * 4
        assert_eq!(bytes.len(), 4 + 8 + 20);
        assert_eq!(&bytes[..12], b"/tc\0,iiiii\0\0");
        assert_eq!(&bytes[12..16], &[0, 0, 0, 1]);
        assert_eq!(
            osc_args(&bytes),
            (
                "/tc".to_string(),
                vec![
                    OscType::Int(1),
                    OscType::Int(23),
                    OscType::Int(45),
                    OscType::Int(12),
                    OscType::Int(1),
                ]
            )
        );
    }

    #[test]
    fn test_send_artnet() {
        let socket = receiver();
        let port = socket.local_addr().unwrap().port();
        let sender = TimecodeSender::artnet("127.0.0.1", port).unwrap();

        let rate = FrameRate::Fps24;
        let tc = Timecode::new(10, 0, 0, 23, rate).unwrap();
        sender.send(tc, rate).unwrap();
        assert_eq!(recv(&socket), artnet_timecode_packet(tc, rate).to_vec());
    }

    #[test]
    fn test_relay_skips_bad_lines() {
        let socket = receiver();
        let sender = TimecodeSender::osc(socket.local_addr().unwrap(), "/show/tc").unwrap();

        let input = "1 23 45 12 1\n\nnot timecode\n0 0 0 29 1\n  1 23 45 13 1  \n";
        assert_eq!(relay(input.as_bytes(), &sender).unwrap(), 2);

        let (addr, first) = osc_args(&recv(&socket));
        assert_eq!(addr, "/show/tc");
        assert_eq!(first[3], OscType::Int(12));
        let (_, second) = osc_args(&recv(&socket));
        assert_eq!(second[3], OscType::Int(13));
    }
}
