//! RTCM 2 over the IS-GPS-200 style 30-bit word transport.
//!
//! RTCM 2 is not byte aligned. Each input byte carries six data bits, least
//! significant first, tagged with `01` in its top two bits. Words are found by
//! sliding a 32-bit window over the bit stream until a preamble with good
//! parity shows up, after which words are taken 30 bits at a time until the
//! length given in the second header word has been collected.
use tracing::trace;

use crate::lexer::state::{self, Context, Frame, Step};

const PREAMBLE: u32 = 0x66;
/// D30* of the previous word, set when this word's data bits are inverted.
const P_30_MASK: u32 = 0x4000_0000;
const W_DATA_MASK: u32 = 0x3fff_ffc0;
const WORD_MASK: u32 = 0x3fff_ffff;
/// Parity equations for D25 through D30, over D29*, D30* and the data bits.
const PARITY: [u32; 6] = [
    0xbb1f_3480,
    0x5d8f_9a40,
    0xaec7_cd00,
    0x5763_e680,
    0x6bb1_f340,
    0x8b7a_89c0,
];
/// Longest message in words, header included.
pub const MAX_WORDS: usize = 33;

fn parity(w: u32) -> u32 {
    PARITY
        .iter()
        .fold(0, |p, mask| (p << 1) | ((w & mask).count_ones() & 1))
}

fn parity_ok(w: u32) -> bool {
    parity(w) == w & 0x3f
}

fn preamble(w: u32) -> bool {
    (w >> 22) & 0xff == PREAMBLE
}

/// Undo the inversion of data bits implied by D30*.
fn uninvert(w: u32) -> u32 {
    if w & P_30_MASK != 0 {
        w ^ W_DATA_MASK
    } else {
        w
    }
}

/// Bit order of the six data bits is reversed on the wire.
fn reverse6(c: u8) -> u8 {
    (c & 0x3f).reverse_bits() >> 2
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    /// Not a data byte.
    Skip,
    NoSync,
    Sync,
    /// A complete message is available from [Isgps::message].
    Message,
}

/// Bit level synchronizer and word collector.
#[derive(Debug, Default)]
pub(crate) struct Isgps {
    locked: bool,
    /// Sliding window used while hunting for a preamble.
    window: u32,
    /// D29* and D30* of the previous word, in bits 31 and 30.
    prev: u32,
    acc: u32,
    bits: u32,
    words: Vec<u32>,
    message: Vec<u32>,
}

impl Isgps {
    pub fn reset(&mut self) {
        *self = Isgps::default();
    }

    /// Words of the most recently completed message, D1 in bit 29 of each.
    pub fn message(&self) -> &[u32] {
        &self.message
    }

    pub fn decode(&mut self, c: u8) -> Status {
        if c & 0xc0 != 0x40 {
            trace!(byte = c, "ISGPS word tag not correct, skipping byte");
            return Status::Skip;
        }
        let data = reverse6(c);
        let mut completed = false;
        for i in (0..6).rev() {
            if self.push_bit(u32::from((data >> i) & 1)) == Status::Message {
                completed = true;
            }
        }
        match (completed, self.locked) {
            (true, _) => Status::Message,
            (false, true) => Status::Sync,
            (false, false) => Status::NoSync,
        }
    }

    fn push_bit(&mut self, bit: u32) -> Status {
        if !self.locked {
            self.window = (self.window << 1) | bit;
            let w = uninvert(self.window);
            if preamble(w) && parity_ok(w) {
                trace!(word = format_args!("{w:#010x}"), "ISGPS locked");
                self.locked = true;
                self.acc = 0;
                self.bits = 0;
                self.words.clear();
                self.words.push(w & WORD_MASK);
                self.prev = (w & 0x3) << 30;
                return Status::Sync;
            }
            return Status::NoSync;
        }

        self.acc = (self.acc << 1) | bit;
        self.bits += 1;
        if self.bits < 30 {
            return Status::Sync;
        }
        let w = uninvert(self.prev | self.acc);
        self.acc = 0;
        self.bits = 0;
        if !parity_ok(w) || (self.words.is_empty() && !preamble(w)) {
            trace!(word = format_args!("{w:#010x}"), "ISGPS lost lock");
            return self.unlock();
        }
        self.prev = (w & 0x3) << 30;
        self.words.push(w & WORD_MASK);

        if self.words.len() >= 2 {
            let frame_len = ((self.words[1] >> 9) & 0x1f) as usize;
            if self.words.len() >= frame_len + 2 {
                self.message = std::mem::take(&mut self.words);
                return Status::Message;
            }
        }
        if self.words.len() >= MAX_WORDS {
            return self.unlock();
        }
        Status::Sync
    }

    fn unlock(&mut self) -> Status {
        self.locked = false;
        self.window = 0;
        self.words.clear();
        Status::NoSync
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// Locked on, collecting message words.
    Sync,
}

/// Try a byte no other chain wants on the bit synchronizer.
pub(crate) fn offer(c: u8, ctx: &mut Context) -> Step {
    match ctx.rtcm2.decode(c) {
        Status::Sync => Step::next(State::Sync),
        Status::Message => Step::accept(Frame::Rtcm2),
        Status::Skip | Status::NoSync => Step::discard(state::State::Ground),
    }
}

/// First byte after an accepted message. Messages usually follow each other
/// without a gap, so the synchronizer gets first claim on it. Bytes it cannot
/// carry go back to ground dispatch.
pub(crate) fn after_message(c: u8, ctx: &mut Context) -> Step {
    match ctx.rtcm2.decode(c) {
        Status::Sync => Step::next(State::Sync),
        Status::Message => Step::accept(Frame::Rtcm2),
        Status::Skip => Step::reset(),
        Status::NoSync => Step::discard(state::State::Ground),
    }
}

impl State {
    pub fn step(self, c: u8, ctx: &mut Context) -> Step {
        match ctx.rtcm2.decode(c) {
            Status::Message => Step::accept(Frame::Rtcm2),
            Status::NoSync => Step::discard(state::State::Ground),
            Status::Skip | Status::Sync => Step::next(self),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode 24-bit data words for transmission, returning the wire bytes and
    /// the 30-bit words a decoder should report.
    pub fn encode(data: &[u32]) -> (Vec<u8>, Vec<u32>) {
        let mut prev = 0u32;
        let mut bytes = Vec::new();
        let mut words = Vec::new();
        for d in data {
            let d = d & 0x00ff_ffff;
            let p = parity((prev << 30) | (d << 6));
            words.push((d << 6) | p);
            let sent = if prev & 1 != 0 { d ^ 0x00ff_ffff } else { d };
            let tx = (sent << 6) | p;
            for i in (0..5).rev() {
                let group = ((tx >> (i * 6)) & 0x3f) as u8;
                bytes.push(0x40 | reverse6(group));
            }
            prev = p & 0x3;
        }
        (bytes, words)
    }

    /// Header words for a message of `len` data words.
    pub fn header(msg_type: u32, station: u32, len: u32) -> [u32; 2] {
        [
            (PREAMBLE << 16) | ((msg_type & 0x3f) << 10) | (station & 0x3ff),
            ((len & 0x1f) << 3) | (1 << 11),
        ]
    }

    #[test]
    fn reverse6_flips_six_bits() {
        assert_eq!(reverse6(0b000001), 0b100000);
        assert_eq!(reverse6(0b110100), 0b001011);
        assert_eq!(reverse6(0x7f), 0x3f);
    }

    #[test]
    fn decodes_message() {
        let [h1, h2] = header(1, 42, 2);
        let (bytes, words) = encode(&[h1, h2, 0x00ab_cdef, 0x0012_3456]);

        let mut isgps = Isgps::default();
        let statuses: Vec<Status> = bytes.iter().map(|c| isgps.decode(*c)).collect();

        assert_eq!(statuses[..4], [Status::NoSync; 4]);
        assert_eq!(statuses[4], Status::Sync, "should lock at end of first word");
        assert!(statuses[5..19].iter().all(|s| *s == Status::Sync));
        assert_eq!(statuses[19], Status::Message);
        assert_eq!(isgps.message(), &words[..]);
    }

    #[test]
    fn back_to_back_messages_stay_locked() {
        let [h1, h2] = header(3, 1, 0);
        // the second message continues the parity chain of the first
        let (bytes, words) = encode(&[h1, h2, h1, h2]);

        let mut isgps = Isgps::default();
        let statuses: Vec<Status> = bytes.iter().map(|c| isgps.decode(*c)).collect();
        assert_eq!(statuses[9], Status::Message);
        assert_eq!(statuses[19], Status::Message);
        assert_eq!(isgps.message(), &words[2..]);
    }

    #[test]
    fn untagged_bytes_are_skipped() {
        let mut isgps = Isgps::default();
        assert_eq!(isgps.decode(b'$'), Status::Skip);
        assert_eq!(isgps.decode(0xff), Status::Skip);
    }

    #[test]
    fn corrupt_word_loses_lock() {
        let [h1, h2] = header(1, 42, 2);
        let (mut bytes, _) = encode(&[h1, h2, 0x00ab_cdef, 0x0012_3456]);
        bytes[12] ^= 0x01;

        let mut isgps = Isgps::default();
        let statuses: Vec<Status> = bytes.iter().map(|c| isgps.decode(*c)).collect();
        assert_eq!(statuses[14], Status::NoSync);
        assert!(!statuses.contains(&Status::Message));
    }
}
