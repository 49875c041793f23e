//! Line oriented text: `#` comments, `$` NMEA sentences, `!` AIS sentences and
//! the Ashtech `$PASHR` binary hybrid.
use super::printable;
use crate::lexer::state::{Context, Frame, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    CommentBody,
    /// `$` seen.
    Dollar,
    /// `$` and the first talker character, one of those in [talker_seconds].
    Talker(u8),
    /// `$A`: AIS talker, SiRF `$Ack` or an `$AP` autopilot.
    LeadA,
    SirfAck,
    /// `$P`: proprietary sentence, possibly `$PASHR`.
    Vendor,
    PashrA,
    PashrS,
    PashrH,
    /// `$PASHR` followed by binary data running up to `\r\n$`.
    Binary,
    BinaryCr,
    BinaryLf,
    NmeaBody,
    NmeaCr,
    /// A sentence was interrupted by `$` and set aside.
    Stashed,
    /// `!` seen.
    Bang,
    AisLeadA,
    AisAltB,
    AisAltS,
    /// Two talker characters seen, one more letter is required.
    AisLead2,
    AisBody,
    AisCr,
}

/// Valid second talker characters for a given first one. `A` and `P` have
/// states of their own.
fn talker_seconds(first: u8) -> Option<&'static [u8]> {
    let seconds: &[u8] = match first {
        b'B' => b"D",
        b'E' => b"C",
        b'G' => b"ABLNPY",
        b'H' => b"CE",
        b'I' => b"IN",
        b'Q' => b"Z",
        b'S' => b"DNT",
        b'T' => b"I",
        b'W' => b"I",
        b'Y' => b"X",
        _ => return None,
    };
    Some(seconds)
}

pub(crate) fn enter_comment(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::CommentBody)
}

pub(crate) fn enter_nmea(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Dollar)
}

pub(crate) fn enter_ais(_c: u8, _ctx: &mut Context) -> Step {
    Step::next(State::Bang)
}

impl State {
    pub fn step(self, c: u8, ctx: &mut Context) -> Step {
        match self {
            State::CommentBody => match c {
                b'\n' => Step::accept(Frame::Comment),
                b'\r' | b'\t' => Step::next(self),
                c if printable(c) => Step::next(self),
                _ => Step::reset(),
            },
            State::Stashed => match c {
                b'$' => Step::next(State::Dollar),
                _ => Step::reset(),
            },
            State::Dollar => match c {
                b'A' => Step::next(State::LeadA),
                b'P' => Step::next(State::Vendor),
                c if talker_seconds(c).is_some() => Step::next(State::Talker(c)),
                _ => Step::reset(),
            },
            State::Talker(first) => match talker_seconds(first) {
                Some(seconds) if seconds.contains(&c) => Step::next(State::NmeaBody),
                _ => Step::reset(),
            },
            State::LeadA => match c {
                b'c' => Step::next(State::SirfAck),
                b'I' => Step::next(State::AisLead2),
                b'P' => Step::next(State::NmeaBody),
                _ => Step::reset(),
            },
            State::SirfAck => match c {
                b'k' => Step::next(State::NmeaBody),
                _ => Step::reset(),
            },
            State::Vendor => vendor(c, b'A', State::PashrA),
            State::PashrA => vendor(c, b'S', State::PashrS),
            State::PashrS => vendor(c, b'H', State::PashrH),
            State::PashrH => vendor(c, b'R', State::Binary),
            State::Binary => match c {
                b'\r' => Step::next(State::BinaryCr),
                _ => Step::next(self),
            },
            State::BinaryCr => match c {
                b'\n' => Step::next(State::BinaryLf),
                _ => Step::next(State::Binary),
            },
            State::BinaryLf => match c {
                b'$' => Step::accept_before(Frame::Nmea),
                _ => Step::next(State::Binary),
            },
            State::NmeaBody => match c {
                b'\r' => Step::next(State::NmeaCr),
                b'\n' => Step::accept(Frame::Nmea),
                b'$' if ctx.stash => Step::stash(State::Stashed),
                b'$' => Step::reset(),
                c if printable(c) => Step::next(self),
                _ => Step::reset(),
            },
            State::NmeaCr => match c {
                b'\n' => Step::accept(Frame::Nmea),
                b'\r' => Step::next(self),
                _ => Step::reset(),
            },
            State::Bang => match c {
                b'A' => Step::next(State::AisLeadA),
                b'B' => Step::next(State::AisAltB),
                b'S' => Step::next(State::AisAltS),
                _ => Step::reset(),
            },
            State::AisLeadA => match c {
                c if b"BDINRSTX".contains(&c) => Step::next(State::AisLead2),
                _ => Step::reset(),
            },
            State::AisAltB => match c {
                b'S' => Step::next(State::AisLead2),
                _ => Step::reset(),
            },
            State::AisAltS => match c {
                b'A' => Step::next(State::AisLead2),
                _ => Step::reset(),
            },
            State::AisLead2 => match c {
                c if c.is_ascii_alphabetic() => Step::next(State::AisBody),
                _ => Step::reset(),
            },
            State::AisBody => match c {
                b'\r' => Step::next(State::AisCr),
                b'\n' => Step::accept(Frame::Ais),
                c if printable(c) => Step::next(self),
                _ => Step::reset(),
            },
            State::AisCr => match c {
                b'\n' => Step::accept(Frame::Ais),
                _ => Step::reset(),
            },
        }
    }
}

/// One letter of the `$PASHR` prefix. Any other letter makes this an ordinary
/// proprietary sentence.
fn vendor(c: u8, expect: u8, next: State) -> Step {
    match c {
        c if c == expect => Step::next(next),
        c if c.is_ascii_alphabetic() => Step::next(State::NmeaBody),
        _ => Step::reset(),
    }
}
