//! Novatel SuperStar II binary protocol.
//!
//! `01 id ~id len data checksum(le16)`, the checksum being the 16-bit sum of
//! everything before it.
use crate::lexer::state::{countdown, Context, Frame, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Id,
    IdComplement { id: u8 },
    Len,
    Payload { remaining: usize },
    Checksum1,
    Checksum2,
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Id)
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Id => Step::next(State::IdComplement { id: c }),
            State::IdComplement { id } if c == id ^ 0xff => Step::next(State::Len),
            State::IdComplement { .. } => Step::reset(),
            State::Len => match c {
                0 => Step::next(State::Checksum1),
                n => Step::next(State::Payload {
                    remaining: usize::from(n),
                }),
            },
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::next(State::Checksum1),
            },
            State::Checksum1 => Step::next(State::Checksum2),
            State::Checksum2 => Step::accept(Frame::SuperStar2),
        }
    }
}
