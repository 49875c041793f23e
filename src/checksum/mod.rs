//! Checksum and CRC algorithms used to validate framed packets.
//!
//! Every function here is pure; callers decide which bytes of a packet are
//! covered and how the result is compared.
mod crc24q;

pub use crc24q::*;

use tracing::warn;

/// XOR of all bytes. NMEA, AIS, SkyTraq, Navcom and OnCore all use this.
#[must_use]
pub fn xor8(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Wrapping 8-bit sum.
#[must_use]
pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Wrapping 16-bit sum of individual bytes.
#[must_use]
pub fn sum16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)))
}

/// SiRF checksum: 15-bit sum of the payload bytes.
#[must_use]
pub fn sirf(payload: &[u8]) -> u16 {
    sum16(payload) & 0x7fff
}

/// 8-bit Fletcher checksum as used by UBX and ALLYSTAR, returned as `(ck_a, ck_b)`.
#[must_use]
pub fn fletcher8(data: &[u8]) -> (u8, u8) {
    data.iter().fold((0u8, 0u8), |(a, b), byte| {
        let a = a.wrapping_add(*byte);
        (a, b.wrapping_add(a))
    })
}

/// CASIC checksum: wrapping sum of little-endian 32-bit words.
///
/// Trailing bytes that do not fill a whole word are ignored; CASIC payloads are
/// always a multiple of 4 bytes.
#[must_use]
pub fn casic(data: &[u8]) -> u32 {
    data.chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .fold(0u32, u32::wrapping_add)
}

/// GeoStar checksum: XOR fold of little-endian 32-bit words. A packet including
/// its trailing checksum word folds to zero.
#[must_use]
pub fn geostar(data: &[u8]) -> u32 {
    data.chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .fold(0, |acc, w| acc ^ w)
}

/// GREIS checksum: rotate left by 2 then XOR each byte, with a final rotation.
///
/// Computed over a whole packet, including its trailing checksum byte, the
/// result is zero.
#[must_use]
pub fn greis(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |acc, b| acc.rotate_left(2) ^ b)
        .rotate_left(2)
}

/// Sentences that carry no checksum but are accepted anyway: SkyTraq debug
/// output, MTK-3301 `$POLYN`, and old Ashtech binary position sentences.
const NMEA_UNCHECKED: &[&[u8]] = &[b"$STI,", b"$POLYN", b"$PASHR,MCA", b"$PASHR,PBN"];

/// Verify the `*hh` checksum of an NMEA or AIS sentence.
///
/// The checksum is the XOR of everything between the leading `$`/`!` and the
/// last `*` in the sentence, written as two hex digits in either case. Text after
/// the hex digits (line terminators, AIS trailers) is ignored.
#[must_use]
pub fn nmea_sentence_ok(sentence: &[u8]) -> bool {
    if NMEA_UNCHECKED.iter().any(|p| sentence.starts_with(p)) {
        return true;
    }
    let Some(star) = sentence.iter().skip(1).rposition(|b| *b == b'*').map(|i| i + 1) else {
        return false;
    };
    let (Some(hi), Some(lo)) = (sentence.get(star + 1), sentence.get(star + 2)) else {
        return false;
    };
    let (Some(hi), Some(lo)) = ((*hi as char).to_digit(16), (*lo as char).to_digit(16)) else {
        return false;
    };
    let claimed = (hi << 4) | lo;
    let computed = xor8(&sentence[1..star]);
    if u32::from(computed) != claimed {
        warn!(
            got = format_args!("{claimed:02X}"),
            expected = format_args!("{computed:02X}"),
            "bad checksum in NMEA packet"
        );
        return false;
    }
    true
}

/// Format the two-digit checksum suffix for an NMEA sentence body (the bytes
/// between `$` and `*`).
#[must_use]
pub fn nmea_suffix(body: &[u8]) -> [u8; 2] {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let c = xor8(body);
    [HEX[usize::from(c >> 4)], HEX[usize::from(c & 0x0f)]]
}
