//! Automaton state and the single-byte transition function.
//!
//! Each protocol family owns a sub-state enum in its own module under
//! [super::chains]; [State] is the tagged union of those plus ground. A
//! transition never touches the input buffer, it only reports what should happen
//! to the byte it was given via [Action].
use derive_more::From;

use super::chains::{
    allystar, at, casic, dle, geostar, greis, italk, json, navcom, rtcm2, rtcm3, sirf,
    superstar2, text, ubx, zodiac,
};
use super::registry::{Dispatch, Protocol, ProtocolSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, From)]
pub(crate) enum State {
    /// Waiting for the first byte of any packet.
    #[from(ignore)]
    Ground,
    /// A packet of this protocol was just accepted.
    #[from(ignore)]
    Recognized(Protocol),
    Text(text::State),
    Json(json::State),
    At(at::State),
    Ubx(ubx::State),
    Allystar(allystar::State),
    Casic(casic::State),
    Rtcm2(rtcm2::State),
    Rtcm3(rtcm3::State),
    Sirf(sirf::State),
    Dle(dle::State),
    Zodiac(zodiac::State),
    Navcom(navcom::State),
    SuperStar2(superstar2::State),
    GeoStar(geostar::State),
    Greis(greis::State),
    Italk(italk::State),
}

/// Framing that has been completed and is waiting on final validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Comment,
    /// NMEA text sentence, including TNT and `$PASHR` sentences.
    Nmea,
    Ais,
    Json,
    GarminTxt,
    OnCore,
    Ubx,
    Allystar,
    Casic,
    Rtcm2,
    Rtcm3,
    Sirf,
    Sky,
    /// DLE framed packet that is either Garmin binary or TSIP.
    DleEtx,
    EverMore,
    Zodiac,
    Navcom,
    SuperStar2,
    GeoStar,
    Greis,
    Italk,
}

/// What the lexer does with the byte just handed to a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// The byte extends the candidate packet.
    Consume,
    /// The byte does not belong here. Un-consume it and examine it again in the
    /// new state.
    Pushback,
    /// Drop the candidate, including this byte.
    Discard,
    /// The byte completes the framing of a candidate.
    Accept(Frame),
    /// The candidate ended just before this byte, which is pushed back.
    AcceptBefore(Frame),
    /// Push the byte back and set the candidate aside until the next good NMEA
    /// sentence has been accepted.
    Stash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Step {
    pub state: State,
    pub action: Action,
}

impl Step {
    pub fn next(state: impl Into<State>) -> Self {
        Step {
            state: state.into(),
            action: Action::Consume,
        }
    }

    pub fn back(state: impl Into<State>) -> Self {
        Step {
            state: state.into(),
            action: Action::Pushback,
        }
    }

    /// Give up on the candidate and let ground state look at this byte.
    pub fn reset() -> Self {
        Step {
            state: State::Ground,
            action: Action::Pushback,
        }
    }

    pub fn discard(state: impl Into<State>) -> Self {
        Step {
            state: state.into(),
            action: Action::Discard,
        }
    }

    /// The state recorded here is provisional; validation decides where the
    /// automaton goes after an accept.
    pub fn accept(frame: Frame) -> Self {
        Step {
            state: State::Ground,
            action: Action::Accept(frame),
        }
    }

    pub fn accept_before(frame: Frame) -> Self {
        Step {
            state: State::Ground,
            action: Action::AcceptBefore(frame),
        }
    }

    pub fn stash(state: impl Into<State>) -> Self {
        Step {
            state: state.into(),
            action: Action::Stash,
        }
    }
}

/// Everything outside the state itself a transition may consult.
pub(crate) struct Context<'a> {
    pub protocols: ProtocolSet,
    pub dispatch: &'a Dispatch,
    pub rtcm2: &'a mut rtcm2::Isgps,
    pub stash: bool,
}

impl Context<'_> {
    pub fn enabled(&self, protocol: Protocol) -> bool {
        self.protocols.contains(protocol)
    }
}

/// Next value of a payload countdown, or `None` when the current byte is the
/// last one of the payload.
///
/// Chains only enter a payload state with a nonzero count, so this never has to
/// decrement past zero.
pub(crate) fn countdown(remaining: usize) -> Option<usize> {
    remaining.checked_sub(1).filter(|n| *n > 0)
}

impl State {
    #[must_use]
    pub fn is_ground(&self) -> bool {
        matches!(self, State::Ground)
    }

    pub fn step(self, c: u8, ctx: &mut Context) -> Step {
        match self {
            State::Ground => ground(c, ctx),
            State::Recognized(protocol) => recognized(protocol, c, ctx),
            State::Text(s) => s.step(c, ctx),
            State::Json(s) => s.step(c),
            State::At(s) => s.step(c, ctx),
            State::Ubx(s) => s.step(c),
            State::Allystar(s) => s.step(c),
            State::Casic(s) => s.step(c),
            State::Rtcm2(s) => s.step(c, ctx),
            State::Rtcm3(s) => s.step(c),
            State::Sirf(s) => s.step(c),
            State::Dle(s) => s.step(c),
            State::Zodiac(s) => s.step(c),
            State::Navcom(s) => s.step(c),
            State::SuperStar2(s) => s.step(c),
            State::GeoStar(s) => s.step(c),
            State::Greis(s) => s.step(c),
            State::Italk(s) => s.step(c),
        }
    }
}

fn ground(c: u8, ctx: &mut Context) -> Step {
    if let Some(enter) = ctx.dispatch.lookup(c) {
        return enter(c, ctx);
    }
    if ctx.enabled(Protocol::Rtcm2) {
        return rtcm2::offer(c, ctx);
    }
    Step::discard(State::Ground)
}

/// Right after an accept. Most protocols simply resume ground dispatch, which
/// gives same-protocol leaders first claim on the next byte anyway.
fn recognized(protocol: Protocol, c: u8, ctx: &mut Context) -> Step {
    match protocol {
        Protocol::Greis => greis::State::Expected.step(c),
        Protocol::Rtcm2 => rtcm2::after_message(c, ctx),
        _ => Step::reset(),
    }
}
