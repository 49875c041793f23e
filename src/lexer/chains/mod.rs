//! Per-protocol recognizer chains.
//!
//! Each module owns the sub-states for one protocol family, an `enter`
//! transition for its leader byte, and the framing rules up to the point where
//! the packet is complete. Validation of a complete frame lives in
//! [super::accept].
pub(crate) mod allystar;
pub(crate) mod at;
pub(crate) mod casic;
pub(crate) mod dle;
pub(crate) mod geostar;
pub(crate) mod greis;
pub(crate) mod italk;
pub(crate) mod json;
pub(crate) mod navcom;
pub(crate) mod rtcm2;
pub(crate) mod rtcm3;
pub(crate) mod sirf;
pub(crate) mod superstar2;
pub(crate) mod text;
pub(crate) mod ubx;
pub(crate) mod zodiac;

/// Printable ASCII, space included.
pub(crate) fn printable(c: u8) -> bool {
    (0x20..0x7f).contains(&c)
}

/// ASCII whitespace including vertical tab.
pub(crate) fn space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}
