//! Rockwell/Conexant Zodiac binary protocol.
//!
//! A ten byte header of five little-endian words (`FF 81`, id, data word
//! count, flags, header checksum) followed, when the count is nonzero, by the
//! data words and a data checksum word.
use tracing::debug;

use crate::lexer::state::{self, countdown, Context, Frame, Step};
use crate::packet::MAX_PACKET_LENGTH;

pub(crate) const HEADER_LEN: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Sync2,
    Header { buf: [u8; HEADER_LEN], pos: usize },
    /// Data and checksum bytes still to come.
    Payload { remaining: usize },
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Sync2)
}

/// Little-endian word `n` of a Zodiac packet.
pub(crate) fn word(buf: &[u8], n: usize) -> i16 {
    i16::from_le_bytes([buf[2 * n], buf[2 * n + 1]])
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Sync2 => match c {
                0x81 => {
                    let mut buf = [0; HEADER_LEN];
                    buf[0] = 0xff;
                    buf[1] = 0x81;
                    Step::next(State::Header { buf, pos: 2 })
                }
                _ => Step::reset(),
            },
            State::Header { mut buf, pos } => {
                buf[pos] = c;
                if pos + 1 < HEADER_LEN {
                    return Step::next(State::Header { buf, pos: pos + 1 });
                }
                header_complete(&buf)
            }
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::accept(Frame::Zodiac),
            },
        }
    }
}

fn header_complete(buf: &[u8; HEADER_LEN]) -> Step {
    let sum = (0..4)
        .map(|n| word(buf, n))
        .fold(0i16, i16::wrapping_add)
        .wrapping_neg();
    if sum != word(buf, 4) {
        debug!(
            computed = sum,
            expected = word(buf, 4),
            "Zodiac header checksum mismatch"
        );
        return Step::discard(state::State::Ground);
    }
    let words = usize::from(u16::from_le_bytes([buf[4], buf[5]]));
    if words == 0 {
        return Step::accept(Frame::Zodiac);
    }
    let remaining = words * 2 + 2;
    if remaining > MAX_PACKET_LENGTH - HEADER_LEN {
        return Step::reset();
    }
    Step::next(State::Payload { remaining })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{run, Outcome};
    use super::*;
    use crate::lexer::registry::ProtocolSet;

    fn header(id: u16, words: u16, flags: u16) -> Vec<u8> {
        let fields = [0x81ffu16, id, words, flags];
        let sum = fields
            .iter()
            .fold(0u16, |acc, w| acc.wrapping_add(*w))
            .wrapping_neg();
        fields
            .iter()
            .chain(std::iter::once(&sum))
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    #[test]
    fn header_only_frames() {
        let dat = header(1000, 0, 0);
        let outcome = run(ProtocolSet::all(), &dat);
        assert_eq!(outcome, Outcome::Accepted(Frame::Zodiac, 0..HEADER_LEN));
    }

    #[test]
    fn frames_with_data() {
        let mut dat = header(1002, 2, 0);
        dat.extend_from_slice(&[1, 0, 2, 0, 0xfd, 0xff]);
        let outcome = run(ProtocolSet::all(), &dat);
        assert_eq!(outcome, Outcome::Accepted(Frame::Zodiac, 0..dat.len()));
    }

    #[test]
    fn bad_header_checksum_discards() {
        let mut dat = header(1000, 0, 0);
        dat[8] ^= 0x01;
        assert_eq!(run(ProtocolSet::all(), &dat).frame(), None);
    }
}
