//! RTCM 3 transport frames.
//!
//! `D3 000000ll llllllll payload crc24q`, the top six bits of the length word
//! being reserved and required to be zero.
use crate::lexer::state::{countdown, Context, Frame, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Len1,
    Len2 { hi: u8 },
    /// Payload and CRC bytes still to come.
    Payload { remaining: usize },
}

pub(crate) fn enter(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Len1)
}

/// Whether `c` can follow a `D3` preamble.
pub(crate) fn reserved_bits_clear(c: u8) -> bool {
    c & 0xfc == 0
}

impl State {
    pub fn step(self, c: u8) -> Step {
        match self {
            State::Len1 if reserved_bits_clear(c) => Step::next(State::Len2 { hi: c }),
            State::Len1 => Step::reset(),
            State::Len2 { hi } => {
                let len = usize::from(u16::from_be_bytes([hi, c]));
                Step::next(State::Payload {
                    remaining: len + crate::checksum::CRC24Q_SIZE,
                })
            }
            State::Payload { remaining } => match countdown(remaining) {
                Some(remaining) => Step::next(State::Payload { remaining }),
                None => Step::accept(Frame::Rtcm3),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{run, Outcome};
    use super::*;
    use crate::checksum::crc24q_encode;
    use crate::lexer::registry::ProtocolSet;

    #[test]
    fn frames() {
        let mut dat = vec![0xd3, 0x00, 0x04, 0x3e, 0xd0, 0x00, 0x03];
        crc24q_encode(&mut dat);
        let outcome = run(ProtocolSet::all(), &dat);
        assert_eq!(outcome, Outcome::Accepted(Frame::Rtcm3, 0..dat.len()));
    }

    #[test]
    fn empty_message_is_only_a_crc() {
        let mut dat = vec![0xd3, 0x00, 0x00];
        crc24q_encode(&mut dat);
        let outcome = run(ProtocolSet::all(), &dat);
        assert_eq!(outcome, Outcome::Accepted(Frame::Rtcm3, 0..6));
    }

    #[test]
    fn reserved_bits_must_be_clear() {
        assert_eq!(run(ProtocolSet::all(), &[0xd3, 0x04, 0x00]).frame(), None);
    }
}
