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

//! Continuous LTC playback.
//!
//! A background producer thread renders LTC one frame at a time into a bounded queue of sample
//! blocks. The [`Output`] end is meant to be drained from a real-time audio callback: it never
//! blocks and pads with silence whenever the producer falls behind.
//!
//! Transport commands are sent through the [`Player`]. Every command starts a new *epoch*. The
//! producer restarts its generator from the command's cue, and the output drops any queued block
//! rendered before the command, so a relocate is heard immediately instead of after the buffered
//! audio drains.
//!
//! ```no_run
//! use smpte_ltc::{config::Config, playback::Player};
//!
//! let (player, mut output) = Player::spawn(&Config::default());
//! player.apply("play 1 0 0 0 1".parse().unwrap());
//!
//! let mut buffer = [0i16; 512];
//! loop {
//!     output.fill(&mut buffer);
//!     // hand `buffer` to the audio device
//! }
//! ```

use crate::{
    config::Config,
    ltc::encoder::{frame_sample_count, Generator},
    protocol::{Cue, TransportCommand},
    timecode::{FrameRate, Timecode},
};
use std::{
    io::{self, BufRead, Read},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError},
        Arc,
    },
    thread,
    time::Duration,
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

// Blocks are one frame long and the queue is sized for the fastest rate.
const MAX_BLOCKS_PER_SECOND: f64 = 30.0;

/// The number of one-frame blocks queued for `buffer_seconds` of audio.
///
/// This is exact at 30 fps. Slower rates have longer frames, so the same number of blocks holds
/// `30 / fps` times as much audio: 1.25 times `buffer_seconds` at 24 fps.
fn queue_capacity(buffer_seconds: f64) -> usize {
    ((buffer_seconds * MAX_BLOCKS_PER_SECOND).ceil() as usize).max(1)
}

#[derive(Debug)]
struct Command {
    epoch: u64,
    transport: TransportCommand,
}

#[derive(Debug)]
struct Block {
    epoch: u64,
    samples: Vec<i16>,
}

#[derive(Debug, Clone)]
struct CommandSender {
    epoch: Arc<AtomicU64>,
    commands: Sender<Command>,
}

impl CommandSender {
    fn apply(&self, transport: TransportCommand) -> bool {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.commands.send(Command { epoch, transport }).is_ok()
    }
}

/// Controls a running producer thread.
///
/// The producer stops once the `Player` and every command forwarder it started are gone, or once
/// the [`Output`] is dropped.
#[derive(Debug)]
pub struct Player {
    sender: CommandSender,
}

impl Player {
    /// Starts a producer thread, initially stopped, and returns its control and output ends.
    pub fn spawn(config: &Config) -> (Player, Output) {
        let epoch = Arc::new(AtomicU64::new(0));
        let (commands_tx, commands_rx) = mpsc::channel();
        let capacity = queue_capacity(config.playback.buffer_seconds);
        let (blocks_tx, blocks_rx) = mpsc::sync_channel(capacity);

        let producer = Producer {
            commands: commands_rx,
            blocks: blocks_tx,
            sample_rate: config.sample_rate,
            amplitude: config.amplitude,
            epoch: 0,
            transport: Transport::Stopped {
                cue: Cue {
                    timecode: Timecode::midnight(),
                    rate: FrameRate::Fps25,
                },
                index: 0,
            },
            pending: None,
        };
        thread::spawn(move || producer.run());

        let player = Player {
            sender: CommandSender {
                epoch: Arc::clone(&epoch),
                commands: commands_tx,
            },
        };
        (player, Output::new(epoch, blocks_rx))
    }

    /// Applies a transport command, discarding any audio queued before it.
    pub fn apply(&self, command: TransportCommand) {
        if !self.sender.apply(command) {
            log::warn!("playback producer has stopped, dropping {:?}", command);
        }
    }

    /// Spawns a thread that applies one `play`/`stop` command per line read from `reader`.
    ///
    /// Lines that fail to parse are logged and skipped. The thread exits at end of input.
    pub fn forward_commands<R>(&self, reader: R) -> thread::JoinHandle<()>
    where
        R: Read + Send + 'static,
    {
        let sender = self.sender.clone();
        thread::spawn(move || {
            for line in io::BufReader::new(reader).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        log::error!("failed to read command: {}", err);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse() {
                    Ok(command) => {
                        if !sender.apply(command) {
                            break;
                        }
                    }
                    Err(err) => log::warn!("ignoring command {:?}: {}", line.trim(), err),
                }
            }
        })
    }
}

#[derive(Debug)]
enum Transport {
    Playing(Generator),
    Stopped { cue: Cue, index: u64 },
}

struct Producer {
    commands: Receiver<Command>,
    blocks: SyncSender<Block>,
    sample_rate: u32,
    amplitude: i16,
    epoch: u64,
    transport: Transport,
    pending: Option<Block>,
}

impl Producer {
    fn run(mut self) {
        loop {
            loop {
                match self.commands.try_recv() {
                    Ok(command) => self.apply(command),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        log::debug!("playback producer exiting: no more commands");
                        return;
                    }
                }
            }

            let block = match self.pending.take() {
                Some(block) => block,
                None => self.next_block(),
            };
            match self.blocks.try_send(block) {
                Ok(()) => {}
                Err(TrySendError::Full(block)) => {
                    self.pending = Some(block);
                    thread::sleep(POLL_INTERVAL);
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::debug!("playback producer exiting: output dropped");
                    return;
                }
            }
        }
    }

    fn apply(&mut self, command: Command) {
        self.epoch = command.epoch;
        self.pending = None;
        self.transport = match command.transport {
            TransportCommand::Play(cue) => {
                log::info!("playing from {} ({} fps)", cue.timecode, cue.rate);
                Transport::Playing(
                    Generator::unbounded(cue.timecode, cue.rate, self.sample_rate)
                        .amplitude(self.amplitude),
                )
            }
            TransportCommand::Stop(cue) => {
                log::info!("stopped at {} ({} fps)", cue.timecode, cue.rate);
                Transport::Stopped { cue, index: 0 }
            }
        };
    }

    fn next_block(&mut self) -> Block {
        let samples = match &mut self.transport {
            Transport::Playing(generator) => match generator.next() {
                Some(frame) => frame.samples,
                None => Vec::new(),
            },
            Transport::Stopped { cue, index } => {
                let len = frame_sample_count(*index, self.sample_rate, cue.rate);
                *index += 1;
                vec![0; len]
            }
        };
        Block {
            epoch: self.epoch,
            samples,
        }
    }
}

/// The consuming end of a [`Player`].
#[derive(Debug)]
pub struct Output {
    epoch: Arc<AtomicU64>,
    blocks: Receiver<Block>,
    current: Option<Block>,
    offset: usize,
}

impl Output {
    fn new(epoch: Arc<AtomicU64>, blocks: Receiver<Block>) -> Output {
        Output {
            epoch,
            blocks,
            current: None,
            offset: 0,
        }
    }

    /// Fills `buffer` without blocking.
    ///
    /// Copies whatever audio is ready and pads the rest with silence. Returns the number of
    /// samples that came from the producer.
    pub fn fill(&mut self, buffer: &mut [i16]) -> usize {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut written = 0;

        while written < buffer.len() {
            let exhausted = match &self.current {
                Some(block) => block.epoch < epoch || self.offset >= block.samples.len(),
                None => true,
            };
            if exhausted {
                self.offset = 0;
                match self.blocks.try_recv() {
                    Ok(block) if block.epoch >= epoch => self.current = Some(block),
                    Ok(_) => self.current = None,
                    Err(_) => {
                        self.current = None;
                        break;
                    }
                }
                continue;
            }

            let block = match &self.current {
                Some(block) => block,
                None => break,
            };
            let available = &block.samples[self.offset..];
            let len = available.len().min(buffer.len() - written);
            buffer[written..written + len].copy_from_slice(&available[..len]);
            written += len;
            self.offset += len;
        }

        for sample in &mut buffer[written..] {
            *sample = 0;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltc::decoder::Decoder;
    use std::time::Instant;

    fn config() -> Config {
        let mut config = Config::default();
        config.playback.buffer_seconds = 0.2;
        config
    }

    fn block(epoch: u64, samples: &[i16]) -> Block {
        Block {
            epoch,
            samples: samples.to_vec(),
        }
    }

    // Drains `count` samples from the producer, skipping padding.
    fn collect(output: &mut Output, count: usize) -> Vec<i16> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut collected = Vec::with_capacity(count);
        let mut buffer = [0; 256];
        while collected.len() < count {
            assert!(Instant::now() < deadline, "timed out waiting for audio");
            let want = (count - collected.len()).min(buffer.len());
            let written = output.fill(&mut buffer[..want]);
            collected.extend_from_slice(&buffer[..written]);
            if written == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
        collected
    }

    fn decode(samples: &[i16], rate: FrameRate) -> Vec<Timecode> {
        let mut decoder = Decoder::new(48_000.0 / rate.exact_rate());
        decoder.write(samples);
        decoder.flush();
        std::iter::from_fn(|| decoder.read())
            .map(|frame| frame.word.timecode(rate).unwrap())
            .collect()
    }

    fn play(hours: u8, rate: FrameRate) -> TransportCommand {
        TransportCommand::Play(Cue {
            timecode: Timecode::new(hours, 0, 0, 0, rate).unwrap(),
            rate,
        })
    }

    #[test]
    fn test_queue_capacity() {
        assert_eq!(queue_capacity(1.0), 30);
        assert_eq!(queue_capacity(0.2), 6);
        assert_eq!(queue_capacity(0.01), 1);
        assert_eq!(queue_capacity(0.0), 1);
        assert_eq!(queue_capacity(-3.0), 1);
        assert_eq!(queue_capacity(f64::NAN), 1);

        // At 24 fps one second of blocks holds 1.25 seconds of audio.
        let queued: usize = (0..queue_capacity(1.0) as u64)
            .map(|i| frame_sample_count(i, 48_000, FrameRate::Fps24))
            .sum();
        assert_eq!(queued, 60_000);
    }

    #[test]
    fn test_fill_pads_with_silence() {
        let (tx, rx) = mpsc::sync_channel(4);
        let mut output = Output::new(Arc::new(AtomicU64::new(0)), rx);
        tx.send(block(0, &[1, 2, 3])).unwrap();

        let mut buffer = [9; 5];
        assert_eq!(output.fill(&mut buffer), 3);
        assert_eq!(buffer, [1, 2, 3, 0, 0]);
        assert_eq!(output.fill(&mut buffer), 0);
        assert_eq!(buffer, [0; 5]);
    }

    #[test]
    fn test_fill_spans_blocks() {
        let (tx, rx) = mpsc::sync_channel(4);
        let mut output = Output::new(Arc::new(AtomicU64::new(0)), rx);
        tx.send(block(0, &[1, 2, 3])).unwrap();
        tx.send(block(0, &[4, 5, 6])).unwrap();

        let mut buffer = [0; 2];
        assert_eq!(output.fill(&mut buffer), 2);
        assert_eq!(buffer, [1, 2]);
        assert_eq!(output.fill(&mut buffer), 2);
        assert_eq!(buffer, [3, 4]);
        assert_eq!(output.fill(&mut buffer), 2);
        assert_eq!(buffer, [5, 6]);
    }

    #[test]
    fn test_fill_discards_stale_blocks() {
        let epoch = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::sync_channel(4);
        let mut output = Output::new(Arc::clone(&epoch), rx);
        tx.send(block(0, &[1, 2, 3, 4])).unwrap();

        let mut buffer = [0; 2];
        assert_eq!(output.fill(&mut buffer), 2);

        epoch.store(1, Ordering::SeqCst);
        tx.send(block(0, &[5, 6])).unwrap();
        tx.send(block(1, &[7])).unwrap();
        let mut buffer = [0; 3];
        assert_eq!(output.fill(&mut buffer), 1);
        assert_eq!(buffer, [7, 0, 0]);
    }

    #[test]
    fn test_plays_ltc() {
        let rate = FrameRate::Fps25;
        let (player, mut output) = Player::spawn(&config());
        player.apply(play(1, rate));

        let samples = collect(&mut output, 1920 * 5);
        let decoded = decode(&samples, rate);
        assert_eq!(decoded.len(), 5);
        let mut expected = Timecode::new(1, 0, 0, 0, rate).unwrap();
        for timecode in decoded {
            assert_eq!(timecode, expected);
            expected = expected.advance(rate);
        }
    }

    #[test]
    fn test_stop_outputs_silence() {
        let rate = FrameRate::Fps30;
        let (player, mut output) = Player::spawn(&config());
        player.apply(play(1, rate));
        collect(&mut output, 1600);
        player.apply(TransportCommand::Stop(Cue {
            timecode: Timecode::new(1, 0, 0, 1, rate).unwrap(),
            rate,
        }));

        let samples = collect(&mut output, 1600 * 3);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_relocate_flushes_queue() {
        let rate = FrameRate::Fps24;
        let (player, mut output) = Player::spawn(&config());
        player.apply(play(1, rate));
        collect(&mut output, 2000 * 2);

        player.apply(play(7, rate));
        let decoded = decode(&collect(&mut output, 2000 * 3), rate);
        assert_eq!(decoded.first(), Some(&Timecode::new(7, 0, 0, 0, rate).unwrap()));
    }

    #[test]
    fn test_forward_commands() {
        let rate = FrameRate::Fps25;
        let (player, mut output) = Player::spawn(&config());
        let input: &[u8] = b"bogus\n\nplay 2 0 0 0 1\n";
        player.forward_commands(input).join().unwrap();

        let decoded = decode(&collect(&mut output, 1920 * 2), rate);
        assert_eq!(decoded.first(), Some(&Timecode::new(2, 0, 0, 0, rate).unwrap()));
    }
}
