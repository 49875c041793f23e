//! Navcom binary protocol.
//!
//! `02 99 66 id len(le16) data checksum 03`, where `len` counts the data plus
//! four bytes of overhead and the checksum is the XOR of id through data.
use crate::lexer::state::{countdown, Context, Frame, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Sync2,
    Sync3,
    Id,
    Len1,
    Len2 { lo: u8 },
    Data { remaining: usize },
    Checksum,
    Etx,
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Sync2)
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Sync2 => match c {
                0x99 => Step::next(State::Sync3),
                _ => Step::reset(),
            },
            State::Sync3 => match c {
                b'f' => Step::next(State::Id),
                _ => Step::reset(),
            },
            State::Id => Step::next(State::Len1),
            State::Len1 => Step::next(State::Len2 { lo: c }),
            State::Len2 { lo } => match usize::from(u16::from_le_bytes([lo, c])) {
                len if len < 5 => Step::reset(),
                len => Step::next(State::Data { remaining: len - 4 }),
            },
            State::Data { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Data { remaining }),
                None => Step::next(State::Checksum),
            },
            State::Checksum => Step::next(State::Etx),
            State::Etx => match c {
                0x03 => Step::accept(Frame::Navcom),
                _ => Step::reset(),
            },
        }
    }
}
