//! SiRF binary (`A0 A2`) and SkyTraq binary (`A0 A1`), which share a leader.
//!
//! SiRF: `A0 A2 len(be16) payload checksum(be16) B0 B3`
//! SkyTraq: `A0 A1 len(be16) payload checksum(u8) 0D 0A`
use crate::lexer::registry::Protocol;
use crate::lexer::state::{countdown, Context, Frame, Step};
use crate::packet::MAX_PACKET_LENGTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Leader { sirf: bool, sky: bool },
    SirfLen1,
    SirfLen2 { hi: u8 },
    /// Payload and checksum bytes still to come.
    SirfPayload { remaining: usize },
    SirfTrailer1,
    SirfTrailer2,
    SkyLen1,
    SkyLen2 { hi: u8 },
    SkyPayload { remaining: usize },
    SkyChecksum,
    SkyCr,
    SkyLf,
}

pub(crate) fn enter(_c: u8, ctx: &mut Context) -> Step {
    Step::next(State::Leader {
        sirf: ctx.enabled(Protocol::Sirf),
        sky: ctx.enabled(Protocol::SkyTraq),
    })
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Leader { sky: true, .. } if c == 0xa1 => Step::next(State::SkyLen1),
            State::Leader { sirf: true, .. } if c == 0xa2 => Step::next(State::SirfLen1),
            State::Leader { .. } => Step::reset(),
            State::SirfLen1 => Step::next(State::SirfLen2 { hi: c }),
            State::SirfLen2 { hi } => {
                let remaining = usize::from(u16::from_be_bytes([hi, c])) + 2;
                if remaining > MAX_PACKET_LENGTH {
                    return Step::reset();
                }
                Step::next(State::SirfPayload { remaining })
            }
            State::SirfPayload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::SirfPayload { remaining }),
                None => Step::next(State::SirfTrailer1),
            },
            State::SirfTrailer1 => match c {
                0xb0 => Step::next(State::SirfTrailer2),
                _ => Step::reset(),
            },
            State::SirfTrailer2 => match c {
                0xb3 => Step::accept(Frame::Sirf),
                _ => Step::reset(),
            },
            State::SkyLen1 => Step::next(State::SkyLen2 { hi: c }),
            State::SkyLen2 { hi } => match usize::from(u16::from_be_bytes([hi, c])) {
                0 => Step::reset(),
                n if n > MAX_PACKET_LENGTH => Step::reset(),
                remaining => Step::next(State::SkyPayload { remaining }),
            },
            State::SkyPayload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::SkyPayload { remaining }),
                None => Step::next(State::SkyChecksum),
            },
            State::SkyChecksum => Step::next(State::SkyCr),
            State::SkyCr => match c {
                b'\r' => Step::next(State::SkyLf),
                _ => Step::reset(),
            },
            State::SkyLf => match c {
                b'\n' => Step::accept(Frame::Sky),
                _ => Step::reset(),
            },
        }
    }
}
