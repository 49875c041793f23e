//! iTalk binary protocol from iTrax receivers.
//!
//! `<! src dst type flags len data checksum(le16) >`, where `len` counts 16-bit
//! data words.
use crate::lexer::state::{countdown, Context, Frame, Step};

/// Offset of the data word count.
pub(crate) const LEN_OFFSET: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Bang,
    /// Next header byte to read, counted from the start of the packet.
    Header(usize),
    Payload { remaining: usize },
    Trailer,
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Bang)
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Bang => match c {
                b'!' => Step::next(State::Header(2)),
                _ => Step::reset(),
            },
            State::Header(LEN_OFFSET) => Step::next(State::Payload {
                remaining: usize::from(c) * 2 + 2,
            }),
            State::Header(n) => Step::next(State::Header(n + 1)),
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::next(State::Trailer),
            },
            State::Trailer => match c {
                b'>' => Step::accept(Frame::Italk),
                _ => Step::reset(),
            },
        }
    }
}
