//! Sentences led by `@`: Garmin simple text, True North compass sentences
//! (`@*`), and Motorola OnCore binary messages (`@@`).
use super::{printable, text};
use crate::lexer::registry::Protocol;
use crate::lexer::state::{countdown, Context, Frame, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    /// `@` seen, text follows unless the next byte says otherwise.
    Leader,
    OnCoreAt2,
    OnCoreId1(u8),
    /// Payload bytes and the checksum byte still to come.
    OnCorePayload { remaining: usize },
    OnCoreCr,
    OnCoreLf,
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Leader)
}

/// Payload plus checksum length for known OnCore messages, i.e., the total
/// message length less the `@@`, two id bytes and `\r\n`.
pub(crate) fn oncore_body_length(id1: u8, id2: u8) -> Option<usize> {
    let total = match (id1, id2) {
        (b'A', b'a' | b'b') => 10,
        (b'A', b'c' | b'd' | b'e' | b'y' | b'z') => 11,
        (b'A', b'f') => 15,
        (b'A', b'g' | b'q' | b't' | b'v' | b'w' | b'N' | b'O' | b'P') => 8,
        (b'A', b'p') => 25,
        (b'A', b's') => 20,
        (b'A', b'u') => 12,
        (b'B', b'b') => 92,
        (b'B', b'j' | b'o') => 8,
        (b'C', b'b') => 33,
        (b'C', b'c') => 80,
        (b'C', b'f' | b'k') => 7,
        (b'C', b'h') => 9,
        (b'C', b'j') => 294,
        (b'E', b'a') => 76,
        (b'E', b'n') => 69,
        (b'E', b'q') => 96,
        (b'F', b'a') => 9,
        (b'S', b'z') => 8,
        _ => return None,
    };
    Some(total - 6)
}

impl State {
    pub fn step(self, c: u8, ctx: &mut Context) -> Step {
        match self {
            State::Leader => match c {
                b'@' if ctx.enabled(Protocol::OnCore) => Step::next(State::OnCoreAt2),
                b'*' if ctx.enabled(Protocol::Tnt) => Step::next(text::State::NmeaBody),
                b'\r' => Step::next(self),
                b'\n' if ctx.enabled(Protocol::GarminTxt) => Step::accept(Frame::GarminTxt),
                c if printable(c) => Step::next(self),
                _ => Step::reset(),
            },
            State::OnCoreAt2 => match c {
                c if c.is_ascii_uppercase() => Step::next(State::OnCoreId1(c)),
                _ => Step::reset(),
            },
            State::OnCoreId1(id1) => {
                match oncore_body_length(id1, c).filter(|_| c.is_ascii_alphabetic()) {
                    Some(remaining) => Step::next(State::OnCorePayload { remaining }),
                    None => Step::reset(),
                }
            }
            State::OnCorePayload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::OnCorePayload { remaining }),
                None => Step::next(State::OnCoreCr),
            },
            State::OnCoreCr => match c {
                b'\r' => Step::next(State::OnCoreLf),
                _ => Step::reset(),
            },
            State::OnCoreLf => match c {
                b'\n' => Step::accept(Frame::OnCore),
                _ => Step::reset(),
            },
        }
    }
}
