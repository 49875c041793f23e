//! DLE stuffed protocols: Trimble TSIP, Garmin binary and EverMore.
//!
//! TSIP and Garmin share the shape `DLE id ... DLE ETX` and can only be told
//! apart once the whole frame is in hand, so they are framed together and
//! classified on accept. EverMore frames start with `DLE STX` and carry a length.
use crate::lexer::registry::Protocol;
use crate::lexer::state::{self, countdown, Context, Frame, Step};

pub(crate) const DLE: u8 = 0x10;
pub(crate) const STX: u8 = 0x02;
pub(crate) const ETX: u8 = 0x03;

/// Longest run of TSIP bytes without a DLE before the frame is given up on.
pub(crate) const TSIP_MAX_PACKET: usize = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Leader { evermore: bool, tsip: bool },
    TsipPayload { remaining: usize },
    TsipDle,
    EverMoreLength,
    EverMorePayload { remaining: usize },
    EverMoreDle { remaining: usize },
}

pub(crate) fn enter(_c: u8, ctx: &mut Context) -> Step {
    Step::next(State::Leader {
        evermore: ctx.enabled(Protocol::EverMore),
        tsip: ctx.enabled(Protocol::Tsip) || ctx.enabled(Protocol::Garmin),
    })
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Leader { evermore: true, .. } if c == STX => {
                Step::next(State::EverMoreLength)
            }
            State::Leader { tsip: true, .. } if c >= 0x13 => Step::next(State::TsipPayload {
                remaining: TSIP_MAX_PACKET,
            }),
            State::Leader { .. } => Step::discard(state::State::Ground),
            State::TsipPayload { remaining } => match countdown(remaining) {
                // too long, probably never was TSIP
                None => Step::discard(state::State::Ground),
                Some(_) if c == DLE => Step::next(State::TsipDle),
                Some(remaining) => Step::next(State::TsipPayload { remaining }),
            },
            State::TsipDle => match c {
                ETX => Step::accept(Frame::DleEtx),
                DLE => Step::next(State::TsipPayload {
                    remaining: TSIP_MAX_PACKET,
                }),
                _ => Step::discard(state::State::Ground),
            },
            State::EverMoreLength => match c {
                DLE => Step::next(State::EverMoreDle {
                    remaining: usize::from(c),
                }),
                _ => Step::next(State::EverMorePayload {
                    remaining: usize::from(c),
                }),
            },
            State::EverMorePayload { remaining } if c == DLE => {
                Step::next(State::EverMoreDle { remaining })
            }
            State::EverMorePayload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::EverMorePayload { remaining }),
                None => Step::reset(),
            },
            State::EverMoreDle { remaining } => match c {
                DLE => Step::next(State::EverMorePayload { remaining }),
                ETX => Step::accept(Frame::EverMore),
                _ => Step::discard(state::State::Ground),
            },
        }
    }
}

/// Iterator over the bytes of a DLE stuffed body, collapsing each doubled DLE.
/// Yields `None` for a DLE that is not doubled.
pub(crate) struct Unstuff<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Unstuff<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Unstuff { data, pos: 0 }
    }

    /// Offset of the next unread byte in the stuffed data.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Unstuff<'_> {
    type Item = Option<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        if b != DLE {
            return Some(Some(b));
        }
        if self.data.get(self.pos) == Some(&DLE) {
            self.pos += 1;
            return Some(Some(DLE));
        }
        Some(None)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{run, Outcome};
    use super::*;
    use crate::lexer::registry::ProtocolSet;

    #[test]
    fn tsip_frames_through_stuffed_dle() {
        let dat = [DLE, 0x46, DLE, DLE, 0x00, DLE, ETX];
        let outcome = run(ProtocolSet::all(), &dat);
        assert_eq!(outcome, Outcome::Accepted(Frame::DleEtx, 0..dat.len()));
    }

    #[test]
    fn evermore_frames() {
        let dat = [DLE, STX, 0x04, 0x02, 0x01, 0x03, DLE, ETX];
        let outcome = run(ProtocolSet::all(), &dat);
        assert_eq!(outcome, Outcome::Accepted(Frame::EverMore, 0..dat.len()));
    }

    #[test]
    fn evermore_overrun_resets() {
        let dat = [DLE, STX, 0x02, 0x20, 0x21, 0x22];
        assert!(matches!(
            run(ProtocolSet::all(), &dat),
            Outcome::Incomplete(state::State::Ground)
        ));
    }

    #[test]
    fn low_id_is_not_tsip() {
        let dat = [DLE, 0x05, 0x33, DLE, ETX];
        assert_eq!(run(ProtocolSet::all(), &dat).frame(), None);
    }

    #[test]
    fn unstuff_collapses_doubled_dle() {
        let dat = [0x01, DLE, DLE, 0x02, DLE, ETX];
        let mut it = Unstuff::new(&dat);
        assert_eq!(it.next(), Some(Some(0x01)));
        assert_eq!(it.next(), Some(Some(DLE)));
        assert_eq!(it.next(), Some(Some(0x02)));
        assert_eq!(it.position(), 4);
        assert_eq!(it.next(), Some(None), "lone DLE");
        assert_eq!(it.next(), Some(Some(ETX)));
        assert_eq!(it.next(), None);
    }
}
