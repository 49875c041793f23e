//! Final validation of framed packets.
//!
//! A chain only establishes that a candidate has the right shape. Here the
//! checksum, or for protocols without one a table of plausible lengths, decides
//! whether it is delivered as its protocol's type or as [PacketType::Bad].
use tracing::debug;

use super::chains::dle::{Unstuff, DLE, ETX, STX};
use super::chains::{greis, italk, zodiac};
use super::registry::{Protocol, ProtocolSet};
use super::state::{Frame, State};
use crate::bits::{getbeu16, getles16, getleu16, getleu32};
use crate::checksum::{self, crc24q_check, fletcher8, nmea_sentence_ok, xor8};
use crate::packet::PacketType;

/// Outcome of validating one framed candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub packet_type: PacketType,
    /// Where the automaton continues from.
    pub next: State,
}

impl Frame {
    fn protocol(self) -> Protocol {
        match self {
            Frame::Comment => Protocol::Comment,
            Frame::Nmea => Protocol::Nmea,
            Frame::Ais => Protocol::Ais,
            Frame::Json => Protocol::Json,
            Frame::GarminTxt => Protocol::GarminTxt,
            Frame::OnCore => Protocol::OnCore,
            Frame::Ubx => Protocol::Ubx,
            Frame::Allystar => Protocol::Allystar,
            Frame::Casic => Protocol::Casic,
            Frame::Rtcm2 => Protocol::Rtcm2,
            Frame::Rtcm3 => Protocol::Rtcm3,
            Frame::Sirf => Protocol::Sirf,
            Frame::Sky => Protocol::SkyTraq,
            Frame::DleEtx => Protocol::Tsip,
            Frame::EverMore => Protocol::EverMore,
            Frame::Zodiac => Protocol::Zodiac,
            Frame::Navcom => Protocol::Navcom,
            Frame::SuperStar2 => Protocol::SuperStar2,
            Frame::GeoStar => Protocol::GeoStar,
            Frame::Greis => Protocol::Greis,
            Frame::Italk => Protocol::Italk,
        }
    }
}

/// Classify a framed `packet`.
///
/// `last` is the type of the previously delivered packet; a TSIP stream is
/// not second guessed as Garmin binary.
pub(crate) fn validate(
    frame: Frame,
    packet: &[u8],
    last: Option<PacketType>,
    protocols: ProtocolSet,
) -> Verdict {
    let packet_type = classify(frame, packet, last, protocols);
    let next = match (frame, packet_type) {
        // got this far, fair to expect more GREIS
        (Frame::Greis, PacketType::Bad) => greis::State::Expected.into(),
        (_, PacketType::Bad) => State::Ground,
        (frame, _) => State::Recognized(frame.protocol()),
    };
    Verdict { packet_type, next }
}

fn verdict(ok: bool, packet_type: PacketType) -> PacketType {
    if ok {
        packet_type
    } else {
        PacketType::Bad
    }
}

fn classify(
    frame: Frame,
    packet: &[u8],
    last: Option<PacketType>,
    protocols: ProtocolSet,
) -> PacketType {
    let len = packet.len();
    match frame {
        Frame::Comment => PacketType::Comment,
        Frame::Nmea => verdict(nmea_sentence_ok(packet), PacketType::Nmea),
        Frame::Ais => verdict(nmea_sentence_ok(packet), PacketType::Aivdm),
        // shortest useful object is {"class":x}
        Frame::Json => verdict(len >= 11, PacketType::Json),
        Frame::GarminTxt => verdict(len >= 57, PacketType::GarminTxt),
        Frame::Rtcm2 => PacketType::Rtcm2,
        Frame::OnCore => verdict(oncore_ok(packet), PacketType::OnCore),
        Frame::Ubx => verdict(ubx_ok(packet), PacketType::Ubx),
        Frame::Allystar => verdict(allystar_ok(packet), PacketType::Allystar),
        Frame::Casic => verdict(casic_ok(packet), PacketType::Casic),
        Frame::Rtcm3 => {
            let ok = crc24q_check(packet);
            if !ok {
                debug!(len, "RTCM3 data crc failure");
            }
            verdict(ok, PacketType::Rtcm3)
        }
        Frame::Sirf => verdict(sirf_ok(packet), PacketType::Sirf),
        Frame::Sky => verdict(sky_ok(packet), PacketType::Sky),
        Frame::DleEtx => dle_etx(packet, last, protocols),
        Frame::EverMore => verdict(evermore_ok(packet).unwrap_or(false), PacketType::EverMore),
        Frame::Zodiac => verdict(zodiac_ok(packet).unwrap_or(false), PacketType::Zodiac),
        Frame::Navcom => verdict(navcom_ok(packet), PacketType::Navcom),
        Frame::SuperStar2 => verdict(superstar2_ok(packet).unwrap_or(false), PacketType::SuperStar2),
        Frame::GeoStar => {
            let ok = checksum::geostar(packet) == 0;
            if !ok {
                debug!(len, "GeoStar checksum failed");
            }
            verdict(ok, PacketType::GeoStar)
        }
        Frame::Greis => verdict(greis_ok(packet), PacketType::Greis),
        Frame::Italk => verdict(italk_ok(packet).unwrap_or(false), PacketType::Italk),
    }
}

fn oncore_ok(packet: &[u8]) -> bool {
    let len = packet.len();
    if len < 7 {
        return false;
    }
    let ok = xor8(&packet[2..len - 2]) == 0;
    if !ok {
        debug!(
            id = %String::from_utf8_lossy(&packet[2..4]),
            len,
            "REJECT OnCore packet"
        );
    }
    ok
}

fn ubx_ok(packet: &[u8]) -> bool {
    let len = packet.len();
    if len < 8 {
        return false;
    }
    let (ck_a, ck_b) = fletcher8(&packet[2..len - 2]);
    let ok = (ck_a, ck_b) == (packet[len - 2], packet[len - 1]);
    if !ok {
        debug!(
            computed = format_args!("{ck_a:02x}{ck_b:02x}"),
            expected = format_args!("{:02x}{:02x}", packet[len - 2], packet[len - 1]),
            class = packet[2],
            id = packet[3],
            "UBX checksum mismatch"
        );
    }
    ok
}

fn allystar_ok(packet: &[u8]) -> bool {
    let Some(data_len) = getleu16(packet, 4).map(usize::from) else {
        return false;
    };
    if packet.len() < data_len + 8 {
        debug!(len = packet.len(), data_len, "ALLYSTAR bad length");
        return false;
    }
    let (ck_a, ck_b) = fletcher8(&packet[2..data_len + 6]);
    let ok = (ck_a, ck_b) == (packet[data_len + 6], packet[data_len + 7]);
    if !ok {
        debug!(data_len, "ALLYSTAR checksum mismatch");
    }
    ok
}

fn casic_ok(packet: &[u8]) -> bool {
    let Some(data_len) = getleu16(packet, 2).map(usize::from) else {
        return false;
    };
    if packet.len() < data_len + 10 {
        debug!(len = packet.len(), data_len, "CASIC bad length");
        return false;
    }
    let computed = checksum::casic(&packet[2..data_len + 6]);
    let expected = getleu32(packet, data_len + 6);
    if Some(computed) != expected {
        debug!(
            computed = format_args!("{computed:#010x}"),
            class = packet[4],
            id = packet[5],
            "CASIC checksum mismatch"
        );
        return false;
    }
    true
}

fn sirf_ok(packet: &[u8]) -> bool {
    let len = packet.len();
    if len < 8 {
        return false;
    }
    let computed = checksum::sirf(&packet[4..len - 4]);
    let ok = getbeu16(packet, len - 4) == Some(computed);
    if !ok {
        debug!(computed, len, "SiRF checksum mismatch");
    }
    ok
}

fn sky_ok(packet: &[u8]) -> bool {
    let len = packet.len();
    if len < 8 {
        return false;
    }
    let computed = xor8(&packet[4..len - 3]);
    let ok = computed == packet[len - 3];
    if !ok {
        debug!(
            computed,
            expected = packet[len - 3],
            "SkyTraq bad checksum"
        );
    }
    ok
}

fn navcom_ok(packet: &[u8]) -> bool {
    let len = packet.len();
    if len < 8 {
        return false;
    }
    let computed = xor8(&packet[3..len - 2]);
    let ok = computed == packet[len - 2];
    if !ok {
        debug!(
            id = packet[3],
            computed,
            expected = packet[len - 2],
            "Navcom bad checksum"
        );
    }
    ok
}

fn superstar2_ok(packet: &[u8]) -> Option<bool> {
    let covered = 4 + usize::from(*packet.get(3)?);
    let expected = getleu16(packet, covered)?;
    let computed = checksum::sum16(&packet[..covered]);
    if computed != expected {
        debug!(id = packet[1], computed, expected, "REJECT SuperStarII packet");
    }
    Some(computed == expected)
}

fn greis_ok(packet: &[u8]) -> bool {
    // replies and errors carry no checksum
    if packet.starts_with(b"RE") || packet.starts_with(b"ER") {
        return true;
    }
    let computed = checksum::greis(packet);
    if computed != 0 {
        debug!(
            len = packet.len(),
            computed,
            id = %String::from_utf8_lossy(&packet[..packet.len().min(2)]),
            "REJECT GREIS packet"
        );
    }
    computed == 0
}

fn italk_ok(packet: &[u8]) -> Option<bool> {
    let words = usize::from(*packet.get(italk::LEN_OFFSET)?);
    let expected = getleu16(packet, 7 + 2 * words)?;
    if words == 0 {
        return Some(true);
    }
    let mut computed = 0u32;
    for i in 0..words {
        let w = u32::from(getleu16(packet, 7 + 2 * i)?);
        let tmp = (computed + 1).wrapping_mul(w + i as u32);
        computed ^= (tmp & 0xffff) ^ (tmp >> 16);
    }
    if computed != u32::from(expected) {
        debug!(
            kind = packet[4],
            computed,
            expected,
            "iTalk checksum failed"
        );
    }
    Some(computed == u32::from(expected))
}

fn zodiac_ok(packet: &[u8]) -> Option<bool> {
    let words = usize::from(getleu16(packet, 4)?);
    if words == 0 {
        return Some(true);
    }
    let sum = (0..=words)
        .map(|n| getles16(packet, zodiac::HEADER_LEN + 2 * n))
        .try_fold(0i16, |acc, w| w.map(|w| acc.wrapping_add(w)))?;
    if sum != 0 {
        debug!(words, sum, "Zodiac data checksum mismatch");
    }
    Some(sum == 0)
}

/// Length of a DLE stuffed packet with the doubled DLEs collapsed. The framing
/// DLEs at both ends are not stuffing.
fn unstuffed_len(packet: &[u8]) -> usize {
    match packet.iter().filter(|b| **b == DLE).count() {
        n if n > 2 => packet.len() - (n - 2) / 2,
        _ => packet.len(),
    }
}

fn dle_etx(packet: &[u8], last: Option<PacketType>, protocols: ProtocolSet) -> PacketType {
    let len = unstuffed_len(packet);
    if len < 5 {
        // no room for an id and data
        return PacketType::Bad;
    }
    if protocols.contains(Protocol::Garmin) && last != Some(PacketType::Tsip) {
        if garmin_ok(packet) {
            return PacketType::Garmin;
        }
        debug!("Not a Garmin packet");
    }
    if protocols.contains(Protocol::Tsip) {
        if tsip_plausible(packet[1], len) {
            return PacketType::Tsip;
        }
        debug!(id = packet[1], len, "TSIP REJECT");
    }
    PacketType::Bad
}

/// Garmin binary: `DLE id len data checksum DLE ETX` with every DLE past the
/// leader doubled, and the id, length, data and checksum summing to zero.
fn garmin_ok(packet: &[u8]) -> bool {
    let Some(trailer) = garmin_trailer(packet) else {
        return false;
    };
    packet[trailer..].starts_with(&[DLE, ETX])
}

/// Offset of the trailer of a Garmin packet whose checksum is good.
fn garmin_trailer(packet: &[u8]) -> Option<usize> {
    let mut body = Unstuff::new(packet.get(1..)?);
    let id = body.next()??;
    let len = body.next()??;
    let mut sum = id.wrapping_add(len);
    for _ in 0..=len {
        sum = sum.wrapping_add(body.next()??);
    }
    if sum != 0 {
        debug!(sum, "Garmin checksum failed");
        return None;
    }
    Some(1 + body.position())
}

/// Known TSIP data lengths, excluding the DLE id header and DLE ETX trailer.
const TSIP_LENGTHS: &[(u8, usize)] = &[
    (0x41, 10),
    (0x42, 16),
    (0x43, 20),
    (0x45, 10),
    (0x46, 2),
    (0x48, 22),
    (0x49, 32),
    (0x4a, 20),
    (0x4b, 3),
    (0x4c, 17),
    (0x54, 12),
    (0x55, 4),
    (0x56, 20),
    (0x57, 8),
    (0x5a, 25),
    (0x5b, 16),
    (0x5c, 24),
    (0x5d, 26),
    (0x5e, 2),
    (0x5f, 66),
    (0x82, 1),
    (0x83, 36),
    (0x84, 36),
    (0xbb, 40),
    (0xbb, 43),
];

/// TSIP has neither length nor checksum, so accept only ids we know with a
/// length that fits them. `len` is the unstuffed packet length.
fn tsip_plausible(id: u8, len: usize) -> bool {
    let data = len - 4;
    match id {
        // variable length
        0x13 | 0x8f..=0x93 | 0xa1..=0xa3 => true,
        0x1c => len >= 11,
        // 1 + 5 * numSV data bytes
        0x47 => len % 5 == 0,
        0x6c => (22..=246).contains(&len),
        0x6d => (21..=53).contains(&len),
        _ => TSIP_LENGTHS.contains(&(id, data)),
    }
}

/// EverMore: `DLE STX len body checksum DLE ETX`, with `len - 2` body bytes
/// whose sum is the checksum. DLEs past the leader are doubled.
fn evermore_ok(packet: &[u8]) -> Option<bool> {
    let body = packet.strip_prefix(&[DLE, STX])?;
    let mut it = Unstuff::new(body);
    let len = it.next()??;
    // shortest message carries 8
    if len < 8 {
        return Some(false);
    }
    let mut sum = 0u8;
    for _ in 0..len - 2 {
        sum = sum.wrapping_add(it.next()??);
    }
    let expected = it.next()??;
    if !body[it.position()..].starts_with(&[DLE, ETX]) {
        return Some(false);
    }
    if sum != expected {
        debug!(computed = sum, expected, "EverMore checksum failed");
    }
    Some(sum == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn validate_all(frame: Frame, packet: &[u8]) -> Verdict {
        validate(frame, packet, None, ProtocolSet::all())
    }

    /// DLE stuff everything after the leader byte.
    fn stuff(raw: &[u8]) -> Vec<u8> {
        raw.iter()
            .flat_map(|b| if *b == DLE { vec![DLE, DLE] } else { vec![*b] })
            .collect()
    }

    fn garmin(id: u8, data: &[u8]) -> Vec<u8> {
        let len = data.len() as u8;
        let sum = data
            .iter()
            .fold(id.wrapping_add(len), |acc, b| acc.wrapping_add(*b));
        let mut body = vec![id, len];
        body.extend_from_slice(data);
        body.push(sum.wrapping_neg());
        let mut dat = vec![DLE];
        dat.extend(stuff(&body));
        dat.extend_from_slice(&[DLE, ETX]);
        dat
    }

    fn tsip(id: u8, data: &[u8]) -> Vec<u8> {
        let mut dat = vec![DLE, id];
        dat.extend(stuff(data));
        dat.extend_from_slice(&[DLE, ETX]);
        dat
    }

    #[test]
    fn good_packets_are_recognized() {
        let dat = [0xb5, 0x62, 0x05, 0x01, 0x02, 0x00, 0x06, 0x00, 0x0e, 0x37];
        let verdict = validate_all(Frame::Ubx, &dat);
        assert_eq!(verdict.packet_type, PacketType::Ubx);
        assert_eq!(verdict.next, State::Recognized(Protocol::Ubx));
    }

    #[test]
    fn bad_packets_go_to_ground() {
        let dat = [0xb5, 0x62, 0x05, 0x01, 0x02, 0x00, 0x06, 0x00, 0x0e, 0x38];
        let verdict = validate_all(Frame::Ubx, &dat);
        assert_eq!(verdict.packet_type, PacketType::Bad);
        assert_eq!(verdict.next, State::Ground);
    }

    #[test]
    fn bad_greis_keeps_expecting_greis() {
        let verdict = validate_all(Frame::Greis, b"~~005\x01\x02\x03\x04\x05");
        assert_eq!(verdict.packet_type, PacketType::Bad);
        assert_eq!(verdict.next, State::Greis(greis::State::Expected));
    }

    #[test_case(b"RE002%%"; "reply")]
    #[test_case(b"ER00Aunknown id"; "error")]
    fn greis_replies_skip_checksum(dat: &[u8]) {
        assert_eq!(validate_all(Frame::Greis, dat).packet_type, PacketType::Greis);
    }

    #[test_case(br#"{"a":1}"#, PacketType::Bad; "too short")]
    #[test_case(br#"{"class":"TPV"}"#, PacketType::Json; "long enough")]
    fn json_length(dat: &[u8], expected: PacketType) {
        assert_eq!(validate_all(Frame::Json, dat).packet_type, expected);
    }

    #[test]
    fn garmin_wins_over_tsip() {
        let dat = garmin(0x33, &[0x01, DLE, 0x03, 0x04]);
        assert_eq!(validate_all(Frame::DleEtx, &dat).packet_type, PacketType::Garmin);
    }

    #[test]
    fn garmin_skipped_after_tsip() {
        // a Garmin shaped packet that also passes as TSIP 0x46
        let dat = garmin(0x46, &[]);
        assert_eq!(unstuffed_len(&dat), 6);
        let verdict = validate(Frame::DleEtx, &dat, Some(PacketType::Tsip), ProtocolSet::all());
        assert_eq!(verdict.packet_type, PacketType::Tsip);
        let verdict = validate(Frame::DleEtx, &dat, None, ProtocolSet::all());
        assert_eq!(verdict.packet_type, PacketType::Garmin);
    }

    #[test_case(0x41, 10, PacketType::Tsip; "gps time")]
    #[test_case(0x41, 9, PacketType::Bad; "gps time short")]
    #[test_case(0x8f, 3, PacketType::Tsip; "superpacket")]
    #[test_case(0x38, 4, PacketType::Bad; "unlisted id")]
    #[test_case(0xbb, 43, PacketType::Tsip; "accutime config")]
    fn tsip_lengths(id: u8, data_len: usize, expected: PacketType) {
        let data: Vec<u8> = (0..data_len).map(|i| (i as u8) | 0x20).collect();
        let dat = tsip(id, &data);
        let protocols = ProtocolSet::all().without(Protocol::Garmin);
        let verdict = validate(Frame::DleEtx, &dat, None, protocols);
        assert_eq!(verdict.packet_type, expected);
    }

    #[test]
    fn tsip_counts_unstuffed_length() {
        let dat = tsip(0x46, &[DLE, 0x00]);
        assert_eq!(dat.len(), 7);
        let verdict = validate(Frame::DleEtx, &dat, Some(PacketType::Tsip), ProtocolSet::all());
        assert_eq!(verdict.packet_type, PacketType::Tsip);
    }

    #[test]
    fn evermore_checksum() {
        let body = [0x02, 0x01, 0x00, 0x00, DLE, 0x05];
        let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        let mut dat = vec![DLE, STX];
        dat.extend(stuff(&[body.len() as u8 + 2]));
        dat.extend(stuff(&body));
        dat.extend(stuff(&[sum]));
        dat.extend_from_slice(&[DLE, ETX]);
        assert_eq!(
            validate_all(Frame::EverMore, &dat).packet_type,
            PacketType::EverMore
        );

        let last = dat.len() - 3;
        dat[last] ^= 0x40;
        assert_eq!(validate_all(Frame::EverMore, &dat).packet_type, PacketType::Bad);
    }

    #[test]
    fn italk_checksum() {
        let words = [0x1234u16, 0x0042];
        let mut computed = 0u32;
        for (i, w) in words.iter().enumerate() {
            let tmp = (computed + 1).wrapping_mul(u32::from(*w) + i as u32);
            computed ^= (tmp & 0xffff) ^ (tmp >> 16);
        }
        let mut dat = vec![b'<', b'!', 1, 2, 3, 0, words.len() as u8];
        for w in words {
            dat.extend_from_slice(&w.to_le_bytes());
        }
        dat.extend_from_slice(&(computed as u16).to_le_bytes());
        dat.push(b'>');
        assert_eq!(validate_all(Frame::Italk, &dat).packet_type, PacketType::Italk);

        dat[8] ^= 0x01;
        assert_eq!(validate_all(Frame::Italk, &dat).packet_type, PacketType::Bad);
    }

    #[test]
    fn garmin_text_needs_full_line() {
        assert_eq!(
            validate_all(Frame::GarminTxt, b"@0001\r\n").packet_type,
            PacketType::Bad
        );
    }
}
