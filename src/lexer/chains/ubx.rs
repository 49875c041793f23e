//! u-blox UBX binary protocol.
//!
//! `B5 62 class id len(le16) payload ck_a ck_b`
use crate::lexer::state::{countdown, Context, Frame, Step};
use crate::packet::MAX_PACKET_LENGTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Sync2,
    Class,
    Id,
    Len1,
    Len2 { lo: u8 },
    Payload { remaining: usize },
    CkA,
    CkB,
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Sync2)
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Sync2 => match c {
                0x62 => Step::next(State::Class),
                _ => Step::reset(),
            },
            State::Class => Step::next(State::Id),
            State::Id => Step::next(State::Len1),
            State::Len1 => Step::next(State::Len2 { lo: c }),
            State::Len2 { lo } => match usize::from(u16::from_le_bytes([lo, c])) {
                0 => Step::next(State::CkA),
                n if n > MAX_PACKET_LENGTH => Step::reset(),
                remaining => Step::next(State::Payload { remaining }),
            },
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::next(State::CkA),
            },
            State::CkA => Step::next(State::CkB),
            State::CkB => Step::accept(Frame::Ubx),
        }
    }
}
