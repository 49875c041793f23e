//! Javad GREIS messages.
//!
//! Two id characters, three hex digits of body length, and the body. Outside
//! of replies (`RE`) and errors (`ER`) the body ends with a checksum byte.
//! GREIS receivers stream messages separated by arbitrary line ends, so after
//! one message the chain keeps expecting another.
use super::text;
use crate::lexer::state::{countdown, Context, Frame, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// Between messages.
    Expected,
    SecondId,
    /// `R` seen, an `E` makes it a reply.
    ReplyE,
    /// Reading hex digit `digit` of the body length.
    Len { digit: u8, len: usize },
    Payload { remaining: usize },
}

pub(crate) fn enter_message(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::SecondId)
}

pub(crate) fn enter_reply(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::ReplyE)
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Expected => match c {
                c if !c.is_ascii() => Step::reset(),
                // NMEA and JSON leaders always start a new packet
                b'$' | b'{' => Step::reset(),
                b'#' => Step::next(text::State::CommentBody),
                b'\r' | b'\n' => Step::discard(State::Expected),
                _ => Step::next(State::SecondId),
            },
            State::SecondId if c.is_ascii() => Step::next(State::Len { digit: 0, len: 0 }),
            State::SecondId => Step::reset(),
            State::ReplyE => match c {
                b'E' => Step::next(State::Len { digit: 0, len: 0 }),
                _ => Step::reset(),
            },
            State::Len { digit, len } => {
                let Some(nibble) = (c as char).to_digit(16) else {
                    return Step::reset();
                };
                let len = (len << 4) | nibble as usize;
                match digit {
                    0 | 1 => Step::next(State::Len {
                        digit: digit + 1,
                        len,
                    }),
                    _ if len == 0 => Step::accept(Frame::Greis),
                    _ => Step::next(State::Payload { remaining: len }),
                }
            }
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::accept(Frame::Greis),
            },
        }
    }
}
