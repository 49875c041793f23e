//! The packet lexer.
//!
//! A [Lexer] owns one connection's worth of recognition state: the input
//! buffer, the automaton state and the slot holding the most recently accepted
//! packet. Drive it with [Lexer::get] from a non-blocking reader, or push bytes
//! in with [Lexer::feed] and call [Lexer::parse].
//!
//! # Example
//! ```
//! use gnsslex::{Fetch, Lexer, PacketType};
//!
//! let mut lexer = Lexer::default();
//! let mut dat: &[u8] = b"\x00\r\n$GPGSA,A,3,,,,,,,,,,,,,1.0,1.0,1.0*33\r\n";
//!
//! let fetch = lexer.get(&mut dat).unwrap();
//! assert!(matches!(fetch, Fetch::Packet(_)));
//! assert_eq!(lexer.packet_type(), Some(PacketType::Nmea));
//! assert!(lexer.output().starts_with(b"$GPGSA"));
//! ```
mod accept;
mod chains;
mod chunked;
pub mod registry;
mod state;

use std::io::Read;

use tracing::{debug, error, trace, warn};
use typed_builder::TypedBuilder;

use crate::buffer::InputBuffer;
use crate::packet::{Packet, PacketType, MAX_PACKET_LENGTH};
use crate::Result;
use chains::rtcm2::Isgps;
use chunked::Dechunker;
pub use registry::{Protocol, ProtocolSet};
use registry::Dispatch;
use state::{Action, Context, Frame, State};

/// Capacity of the input and output buffers, room for two maximum length
/// packets plus a terminating NUL.
pub const BUFFER_CAPACITY: usize = MAX_PACKET_LENGTH * 2 + 1;

/// Longest partial NMEA sentence that can be set aside while an interrupting
/// sentence is recognized.
pub const STASH_CAPACITY: usize = MAX_PACKET_LENGTH;

/// Default bound on an HTTP chunk size.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 10_000;

/// Runtime options for a [Lexer].
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LexerConfig {
    /// Protocols to recognize. Everything is enabled by default.
    #[builder(default)]
    pub protocols: ProtocolSet,
    /// Set aside an NMEA sentence interrupted by another `$` sentence and
    /// resume it once the interrupting sentence has been accepted. Some
    /// receivers inject status sentences in the middle of others.
    #[builder(default = false)]
    pub stash: bool,
    /// The byte stream is an HTTP/1.1 chunked body, typically from an NTRIP
    /// caster, carrying RTCM3.
    #[builder(default = false)]
    pub chunked: bool,
    /// Chunk sizes beyond this are treated as a broken stream.
    #[builder(default = DEFAULT_MAX_CHUNK_SIZE)]
    pub max_chunk_size: usize,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Diagnostic counters, monotonically increasing for the life of a lexer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LexerStats {
    /// Bytes examined by the automaton. Pushed back bytes count once.
    pub bytes: u64,
    /// Packets accepted, bad ones included.
    pub packets: u64,
    /// Packets accepted as [PacketType::Bad].
    pub bad_packets: u64,
    /// Bytes dropped without becoming part of any packet.
    pub discarded: u64,
    /// Times the input buffer filled up without producing a packet.
    pub overflows: u64,
}

/// Result of one [Lexer::get] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetch {
    /// A packet of this length is available from [Lexer::output].
    Packet(usize),
    /// Input was buffered but no packet is complete yet.
    Fragment,
    /// Nothing was read and nothing unexamined is buffered. A partial packet
    /// may still be held. For a blocking reader this means end of stream.
    Empty,
}

pub struct Lexer {
    config: LexerConfig,
    dispatch: Dispatch,
    state: State,
    input: InputBuffer,
    /// Most recently accepted packet followed by a NUL, or empty.
    output: Vec<u8>,
    last_type: Option<PacketType>,
    stash: Vec<u8>,
    isgps: Isgps,
    dechunker: Dechunker,
    stats: LexerStats,
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new(LexerConfig::default())
    }
}

impl std::fmt::Debug for Lexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("state", &self.state)
            .field("buffered", &self.input.len())
            .field("packet_type", &self.packet_type())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Lexer {
    #[must_use]
    pub fn new(config: LexerConfig) -> Self {
        Lexer {
            dispatch: Dispatch::new(config.protocols),
            dechunker: Dechunker::new(config.max_chunk_size),
            config,
            state: State::Ground,
            input: InputBuffer::new(BUFFER_CAPACITY),
            output: Vec::with_capacity(BUFFER_CAPACITY),
            last_type: None,
            stash: Vec::with_capacity(STASH_CAPACITY),
            isgps: Isgps::default(),
            stats: LexerStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LexerConfig {
        &self.config
    }

    /// Type of the packet in the output slot, `None` if the last call did not
    /// produce one.
    #[must_use]
    pub fn packet_type(&self) -> Option<PacketType> {
        if self.output.is_empty() {
            None
        } else {
            self.last_type
        }
    }

    /// The accepted packet.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        match self.output.split_last() {
            Some((_, packet)) => packet,
            None => &[],
        }
    }

    /// The accepted packet including its terminating NUL, for decoders that
    /// treat text packets as C strings.
    #[must_use]
    pub fn output_with_nul(&self) -> &[u8] {
        &self.output
    }

    /// Take the accepted packet as an owned [Packet].
    #[must_use]
    pub fn packet(&self) -> Option<Packet> {
        Some(Packet {
            packet_type: self.packet_type()?,
            data: self.output().to_vec(),
        })
    }

    /// Parity checked data words of the last RTCM2 message, D1 in bit 29. The
    /// raw RTCM2 bytes in [Lexer::output] are still 6-of-8 encoded and
    /// inverted, so decoders want these instead.
    #[must_use]
    pub fn rtcm2_words(&self) -> &[u32] {
        self.isgps.message()
    }

    #[must_use]
    pub fn stats(&self) -> LexerStats {
        self.stats
    }

    /// True between packets, when no candidate is being recognized.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.state.is_ground()
    }

    /// Bytes read but not yet examined.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.input.available()
    }

    /// Forget everything buffered and start over in ground state. Counters
    /// survive.
    pub fn reset(&mut self) {
        debug!("lexer reset");
        self.state = State::Ground;
        self.input.clear();
        self.output.clear();
        self.last_type = None;
        self.stash.clear();
        self.isgps.reset();
        self.dechunker.reset();
    }

    /// Append bytes obtained some other way than [Lexer::get].
    ///
    /// # Errors
    /// [crate::Error::Overflow] if they do not fit the input buffer; nothing is
    /// appended in that case.
    pub fn feed(&mut self, dat: &[u8]) -> Result<()> {
        self.input.extend(dat)?;
        if self.config.chunked {
            self.dechunker.extend_raw(dat.len());
        }
        Ok(())
    }

    /// Read what `reader` has ready and lex it.
    ///
    /// At most one packet is produced per call. Bytes after it stay buffered
    /// and are examined by the next call, so keep calling until [Fetch::Empty]
    /// or the reader's next readiness notification.
    ///
    /// # Errors
    /// I/O errors from `reader` other than would-block and interrupted.
    pub fn get<R: Read>(&mut self, reader: &mut R) -> Result<Fetch> {
        if self.config.chunked {
            return self.get_chunked(reader);
        }
        let n = self.input.fill_from(reader, usize::MAX)?;
        trace!(n, buffered = self.input.len(), "read");
        if n == 0 && self.input.available() == 0 {
            return Ok(Fetch::Empty);
        }
        Ok(self.lex_buffered(0))
    }

    fn get_chunked<R: Read>(&mut self, reader: &mut R) -> Result<Fetch> {
        let n = if self.input.len() < chunked::READ_THRESHOLD {
            self.input.fill_from(reader, usize::MAX)?
        } else {
            0
        };
        self.dechunker.extend_raw(n);
        trace!(n, buffered = self.input.len(), "read chunked");
        if let Some(fetch) = self.dechunk() {
            return Ok(fetch);
        }
        // an incomplete chunk header cannot make progress without more input
        if n == 0 && self.input.available() <= self.dechunker.raw() {
            return Ok(Fetch::Empty);
        }
        self.skip_to_rtcm3();
        Ok(self.lex_buffered(self.dechunker.raw()))
    }

    /// Strip chunk framing from the raw tail of the input. A malformed chunk
    /// ends the attempt, its undecoded bytes becoming a bad packet.
    fn dechunk(&mut self) -> Option<Fetch> {
        let reason = self.dechunker.dechunk(&mut self.input).err()?;
        warn!(%reason, "malformed chunked transfer encoding");
        let start = self.input.len() - self.dechunker.raw();
        let bad = self.input.as_slice()[start..].to_vec();
        self.input.truncate(start);
        self.dechunker.reset();
        if bad.len() >= BUFFER_CAPACITY {
            error!(len = bad.len(), "rejected too long malformed chunk");
            self.output.clear();
            self.stats.discarded += bad.len() as u64;
            return Some(Fetch::Fragment);
        }
        self.emit(PacketType::Bad, &bad);
        Some(Fetch::Packet(bad.len()))
    }

    fn skip_to_rtcm3(&mut self) {
        if !self.state.is_ground() {
            return;
        }
        let skipped = chunked::skip_to_rtcm3(&mut self.input, self.dechunker.raw());
        if skipped > 0 {
            trace!(skipped, "skipped to RTCM3 preamble");
            self.stats.discarded += skipped as u64;
        }
    }

    /// Parse buffered bytes, leaving the last `reserved` bytes alone, and clear
    /// the buffer if it is full without having produced anything.
    fn lex_buffered(&mut self, reserved: usize) -> Fetch {
        if let Some(len) = self.parse_reserving(reserved) {
            return Fetch::Packet(len);
        }
        let stalled = if self.config.chunked {
            self.input.len() >= chunked::READ_THRESHOLD
        } else {
            self.input.is_full()
        };
        if stalled {
            warn!(
                len = self.input.len(),
                "input buffer full without a packet, discarding"
            );
            self.stats.overflows += 1;
            self.stats.discarded += self.input.len() as u64;
            self.input.clear();
            self.dechunker.reset();
            self.state = State::Ground;
        }
        Fetch::Fragment
    }

    /// Run the automaton over buffered bytes until a packet is accepted or the
    /// buffer is exhausted. Returns the accepted packet's length.
    ///
    /// In chunked mode the chunk framing of fed bytes is stripped first, and a
    /// chunk still incomplete stays buffered.
    pub fn parse(&mut self) -> Option<usize> {
        if !self.config.chunked {
            return self.parse_reserving(0);
        }
        match self.dechunk() {
            Some(Fetch::Packet(len)) => return Some(len),
            Some(_) => return None,
            None => {}
        }
        self.skip_to_rtcm3();
        self.parse_reserving(self.dechunker.raw())
    }

    fn parse_reserving(&mut self, reserved: usize) -> Option<usize> {
        self.output.clear();
        while self.input.available() > reserved {
            let Some(c) = self.input.next() else {
                break;
            };
            self.stats.bytes += 1;
            if self.state.is_ground() && !self.stash.is_empty() {
                trace!(len = self.stash.len(), "dropping stashed sentence");
                self.stash.clear();
            }

            let mut ctx = Context {
                protocols: self.config.protocols,
                dispatch: &self.dispatch,
                rtcm2: &mut self.isgps,
                stash: self.config.stash,
            };
            let step = self.state.step(c, &mut ctx);
            self.state = step.state;
            match step.action {
                Action::Consume => {}
                Action::Pushback => {
                    self.push_back();
                    if self.state.is_ground() {
                        self.discard_candidate();
                    }
                }
                Action::Discard => self.discard_candidate(),
                Action::Accept(frame) => {
                    if let Some(len) = self.accept(frame) {
                        return Some(len);
                    }
                }
                Action::AcceptBefore(frame) => {
                    self.push_back();
                    if let Some(len) = self.accept(frame) {
                        return Some(len);
                    }
                }
                Action::Stash => {
                    self.push_back();
                    self.stash_candidate();
                }
            }
        }
        None
    }

    fn push_back(&mut self) {
        self.input.push_back();
        self.stats.bytes -= 1;
    }

    fn discard_candidate(&mut self) {
        let n = self.input.discard_consumed();
        if n > 0 {
            trace!(n, "discarded");
            self.stats.discarded += n as u64;
        }
    }

    fn accept(&mut self, frame: Frame) -> Option<usize> {
        let verdict = accept::validate(
            frame,
            self.input.candidate(),
            self.last_type,
            self.config.protocols,
        );
        let len = self.input.cursor();
        if len >= BUFFER_CAPACITY {
            error!(len, ?frame, "rejected too long packet");
            self.discard_candidate();
            self.state = State::Ground;
            return None;
        }
        let candidate = self.input.candidate().to_vec();
        self.emit(verdict.packet_type, &candidate);
        self.input.discard_consumed();
        self.state = verdict.next;
        if verdict.packet_type == PacketType::Nmea && !self.stash.is_empty() {
            self.unstash();
        }
        Some(len)
    }

    /// Fill the output slot.
    fn emit(&mut self, packet_type: PacketType, packet: &[u8]) {
        self.output.clear();
        self.output.extend_from_slice(packet);
        self.output.push(0);
        self.last_type = Some(packet_type);
        self.stats.packets += 1;
        if packet_type == PacketType::Bad {
            self.stats.bad_packets += 1;
        }
        debug!(
            %packet_type,
            len = packet.len(),
            "packet accepted"
        );
    }

    fn stash_candidate(&mut self) {
        let candidate = self.input.candidate();
        if candidate.len() > STASH_CAPACITY {
            error!(len = candidate.len(), "sentence too long to stash");
            self.stash.clear();
        } else {
            trace!(len = candidate.len(), "stashing interrupted sentence");
            self.stash.clear();
            self.stash.extend_from_slice(candidate);
        }
        self.input.discard_consumed();
    }

    /// Put a stashed sentence back in front of the unexamined input so the rest
    /// of it, which follows in the stream, completes it.
    fn unstash(&mut self) {
        let stash = std::mem::take(&mut self.stash);
        match self.input.prepend(&stash) {
            Ok(()) => trace!(len = stash.len(), "unstashed sentence"),
            Err(err) => error!(%err, "no room to unstash, dropping it"),
        }
        self.stash = stash;
        self.stash.clear();
    }

    /// Iterate over the packets lexed from `reader` until it has nothing more.
    pub fn packets<R: Read>(&mut self, reader: R) -> Packets<'_, R> {
        Packets {
            lexer: self,
            reader,
            failed: false,
        }
    }
}

/// Iterator returned by [Lexer::packets].
pub struct Packets<'a, R> {
    lexer: &'a mut Lexer,
    reader: R,
    failed: bool,
}

impl<R: Read> Iterator for Packets<'_, R> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.lexer.get(&mut self.reader) {
                Ok(Fetch::Packet(_)) => return self.lexer.packet().map(Ok),
                Ok(Fetch::Fragment) => continue,
                Ok(Fetch::Empty) => return None,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
