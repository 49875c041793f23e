//! GeoStar binary protocol.
//!
//! `PSGG id(le16) words(le16) payload checksum(le32)`. The payload is
//! `words` little-endian 32-bit words and the checksum makes the XOR of every
//! word in the packet zero.
use crate::lexer::state::{countdown, Context, Frame, Step};
use crate::packet::MAX_PACKET_LENGTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// Matched this many bytes of `PSGG`.
    Leader(usize),
    Id1,
    Id2,
    Len1,
    Len2 { lo: u8 },
    Payload { remaining: usize },
    Checksum { remaining: usize },
}

const LEADER: &[u8; 4] = b"PSGG";

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Leader(1))
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Leader(n) if c != LEADER[n] => Step::reset(),
            State::Leader(n) if n + 1 == LEADER.len() => Step::next(State::Id1),
            State::Leader(n) => Step::next(State::Leader(n + 1)),
            State::Id1 => Step::next(State::Id2),
            State::Id2 => Step::next(State::Len1),
            State::Len1 => Step::next(State::Len2 { lo: c }),
            State::Len2 { lo } => match usize::from(u16::from_le_bytes([lo, c])) * 4 {
                0 => Step::next(State::Checksum { remaining: 4 }),
                n if n > MAX_PACKET_LENGTH => Step::reset(),
                remaining => Step::next(State::Payload { remaining }),
            },
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::next(State::Checksum { remaining: 4 }),
            },
            State::Checksum { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Checksum { remaining }),
                None => Step::accept(Frame::GeoStar),
            },
        }
    }
}
