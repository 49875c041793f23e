//! JSON objects and arrays as emitted by gpsd-compatible receivers.
//!
//! This is a shape check, not a parser: nesting is tracked so the frame ends at
//! the closing bracket of the outermost value, and string escapes are honored so
//! brackets inside strings do not count.
use super::space;
use crate::lexer::state::{self, Frame, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Leader { depth: u32 },
    Str { depth: u32, after: AfterString },
    Escape { depth: u32, after: AfterString },
    EndAttribute { depth: u32 },
    ExpectValue { depth: u32 },
    Number { depth: u32 },
    /// `true`, `false` or `null`.
    Special { depth: u32 },
    EndValue { depth: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AfterString {
    EndAttribute,
    EndValue,
}

pub(crate) fn enter(_c: u8, _ctx: &mut state::Context) -> Step {
    Step::back(State::Leader { depth: 0 })
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Leader { depth } => match c {
                b'{' | b'[' => Step::next(State::Leader {
                    depth: depth.saturating_add(1),
                }),
                b'}' | b']' if depth <= 1 => Step::accept(Frame::Json),
                b'}' | b']' => Step::next(State::Leader { depth: depth - 1 }),
                b'"' => Step::next(State::Str {
                    depth,
                    after: AfterString::EndAttribute,
                }),
                b',' => Step::next(self),
                c if space(c) => Step::next(self),
                _ => Step::discard(state::State::Ground),
            },
            State::Str { depth, after } => match c {
                b'\\' => Step::next(State::Escape { depth, after }),
                b'"' => Step::next(match after {
                    AfterString::EndAttribute => State::EndAttribute { depth },
                    AfterString::EndValue => State::EndValue { depth },
                }),
                _ => Step::next(self),
            },
            State::Escape { depth, after } => Step::next(State::Str { depth, after }),
            State::EndAttribute { depth } => match c {
                b':' => Step::next(State::ExpectValue { depth }),
                c if space(c) => Step::next(self),
                _ => Step::reset(),
            },
            State::ExpectValue { depth } => match c {
                b'"' => Step::next(State::Str {
                    depth,
                    after: AfterString::EndValue,
                }),
                b'{' | b'[' => Step::back(State::Leader { depth }),
                b'-' | b'0'..=b'9' => Step::next(State::Number { depth }),
                b't' | b'f' | b'n' => Step::next(State::Special { depth }),
                c if space(c) => Step::next(self),
                _ => Step::reset(),
            },
            State::Number { depth } => match c {
                c if b"1234567890.eE+-".contains(&c) => Step::next(self),
                _ => Step::back(State::EndValue { depth }),
            },
            State::Special { depth } => match c {
                c if b"truefalsnil".contains(&c) => Step::next(self),
                _ => Step::back(State::EndValue { depth }),
            },
            State::EndValue { depth } => match c {
                b',' => Step::next(State::Leader { depth }),
                b'}' | b']' => Step::back(State::Leader { depth }),
                c if space(c) => Step::next(self),
                _ => Step::reset(),
            },
        }
    }
}
