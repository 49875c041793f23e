//! CASIC binary protocol.
//!
//! `BA CE len(le16) class id payload checksum(le32)`, where the payload length
//! is a multiple of 4 below 2048.
use crate::lexer::state::{countdown, Context, Frame, Step};

/// Payloads must be shorter than this.
pub(crate) const MAX_PAYLOAD: usize = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Sync2,
    Len1,
    Len2 { lo: u8 },
    Class { len: usize },
    Id { len: usize },
    Payload { remaining: usize },
    /// Checksum bytes still to come.
    Checksum { remaining: usize },
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Sync2)
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Sync2 => match c {
                0xce => Step::next(State::Len1),
                _ => Step::reset(),
            },
            State::Len1 => Step::next(State::Len2 { lo: c }),
            State::Len2 { lo } => match usize::from(u16::from_le_bytes([lo, c])) {
                len if len >= MAX_PAYLOAD || len % 4 != 0 => Step::reset(),
                len => Step::next(State::Class { len }),
            },
            State::Class { len } => Step::next(State::Id { len }),
            State::Id { len: 0 } => Step::next(State::Checksum { remaining: 4 }),
            State::Id { len } => Step::next(State::Payload { remaining: len }),
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::next(State::Checksum { remaining: 4 }),
            },
            State::Checksum { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Checksum { remaining }),
                None => Step::accept(Frame::Casic),
            },
        }
    }
}
