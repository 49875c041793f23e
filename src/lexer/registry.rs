//! Runtime registry of protocol recognizers.
//!
//! Ground state routes a byte to a recognizer chain by looking it up in a
//! 256-entry leader table built from the enabled [ProtocolSet]. Protocols that
//! are disabled simply have no entries, so their leaders fall through to RTCM2
//! bit-sync or are discarded.
use std::fmt::Display;

use super::chains::{
    allystar, at, casic, dle, geostar, greis, italk, json, navcom, rtcm3, sirf, superstar2,
    text, ubx, zodiac,
};
use super::state::{Context, Step};

/// A recognizer chain that can be switched on or off at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Protocol {
    Comment,
    Nmea,
    Ais,
    Json,
    /// `@` led text sentences from True North Technologies compasses.
    Tnt,
    GarminTxt,
    OnCore,
    Ubx,
    Allystar,
    Casic,
    Rtcm2,
    Rtcm3,
    Sirf,
    SkyTraq,
    Tsip,
    Garmin,
    EverMore,
    Zodiac,
    Navcom,
    SuperStar2,
    GeoStar,
    Greis,
    Italk,
}

impl Protocol {
    pub const ALL: [Protocol; 23] = [
        Protocol::Comment,
        Protocol::Nmea,
        Protocol::Ais,
        Protocol::Json,
        Protocol::Tnt,
        Protocol::GarminTxt,
        Protocol::OnCore,
        Protocol::Ubx,
        Protocol::Allystar,
        Protocol::Casic,
        Protocol::Rtcm2,
        Protocol::Rtcm3,
        Protocol::Sirf,
        Protocol::SkyTraq,
        Protocol::Tsip,
        Protocol::Garmin,
        Protocol::EverMore,
        Protocol::Zodiac,
        Protocol::Navcom,
        Protocol::SuperStar2,
        Protocol::GeoStar,
        Protocol::Greis,
        Protocol::Italk,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Set of enabled protocols. The default enables everything.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtocolSet(u32);

impl ProtocolSet {
    #[must_use]
    pub fn all() -> Self {
        Protocol::ALL.into_iter().collect()
    }

    #[must_use]
    pub fn empty() -> Self {
        ProtocolSet(0)
    }

    #[must_use]
    pub fn contains(self, protocol: Protocol) -> bool {
        self.0 & protocol.bit() != 0
    }

    #[must_use]
    pub fn with(self, protocol: Protocol) -> Self {
        ProtocolSet(self.0 | protocol.bit())
    }

    #[must_use]
    pub fn without(self, protocol: Protocol) -> Self {
        ProtocolSet(self.0 & !protocol.bit())
    }

    pub fn iter(self) -> impl Iterator<Item = Protocol> {
        Protocol::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl Default for ProtocolSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Protocol> for ProtocolSet {
    fn from_iter<T: IntoIterator<Item = Protocol>>(iter: T) -> Self {
        iter.into_iter().fold(ProtocolSet::empty(), ProtocolSet::with)
    }
}

impl std::fmt::Debug for ProtocolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Entry transition of a chain, invoked on its leader byte in ground state.
pub(crate) type Enter = fn(u8, &mut Context) -> Step;

/// One row of the leader table: a lead byte, the protocols whose chain starts
/// with it, and the chain's entry transition.
pub(crate) struct Leader {
    pub byte: u8,
    pub protocols: &'static [Protocol],
    pub enter: Enter,
}

/// Leader bytes recognized in ground state. Bytes shared by several protocols
/// enter a common chain that branches once the protocols can be told apart.
pub(crate) static LEADERS: &[Leader] = &[
    Leader { byte: b'#', protocols: &[Protocol::Comment], enter: text::enter_comment },
    Leader { byte: b'$', protocols: &[Protocol::Nmea], enter: text::enter_nmea },
    Leader { byte: b'!', protocols: &[Protocol::Ais], enter: text::enter_ais },
    Leader { byte: b'{', protocols: &[Protocol::Json], enter: json::enter },
    Leader {
        byte: b'@',
        protocols: &[Protocol::Tnt, Protocol::GarminTxt, Protocol::OnCore],
        enter: at::enter,
    },
    Leader { byte: 0xb5, protocols: &[Protocol::Ubx], enter: ubx::enter },
    Leader { byte: 0xf1, protocols: &[Protocol::Allystar], enter: allystar::enter },
    Leader { byte: 0xba, protocols: &[Protocol::Casic], enter: casic::enter },
    Leader { byte: 0xd3, protocols: &[Protocol::Rtcm3], enter: rtcm3::enter },
    Leader {
        byte: 0xa0,
        protocols: &[Protocol::Sirf, Protocol::SkyTraq],
        enter: sirf::enter,
    },
    Leader {
        byte: dle::DLE,
        protocols: &[Protocol::Tsip, Protocol::Garmin, Protocol::EverMore],
        enter: dle::enter,
    },
    Leader { byte: 0xff, protocols: &[Protocol::Zodiac], enter: zodiac::enter },
    Leader { byte: 0x02, protocols: &[Protocol::Navcom], enter: navcom::enter },
    Leader { byte: 0x01, protocols: &[Protocol::SuperStar2], enter: superstar2::enter },
    Leader { byte: b'P', protocols: &[Protocol::GeoStar], enter: geostar::enter },
    Leader { byte: b'~', protocols: &[Protocol::Greis], enter: greis::enter_message },
    Leader { byte: b'R', protocols: &[Protocol::Greis], enter: greis::enter_reply },
    Leader { byte: b'<', protocols: &[Protocol::Italk], enter: italk::enter },
];

/// Leader table resolved against a [ProtocolSet].
pub(crate) struct Dispatch {
    table: [Option<Enter>; 256],
}

impl Dispatch {
    pub fn new(protocols: ProtocolSet) -> Self {
        let mut table: [Option<Enter>; 256] = [None; 256];
        for leader in LEADERS {
            if leader.protocols.iter().any(|p| protocols.contains(*p)) {
                table[usize::from(leader.byte)] = Some(leader.enter);
            }
        }
        Dispatch { table }
    }

    pub fn lookup(&self, c: u8) -> Option<Enter> {
        self.table[usize::from(c)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn leader_bytes_are_unique() {
        let bytes: HashSet<u8> = LEADERS.iter().map(|l| l.byte).collect();
        assert_eq!(bytes.len(), LEADERS.len());
    }

    #[test]
    fn every_protocol_but_rtcm2_has_a_leader() {
        for protocol in Protocol::ALL {
            let has_leader = LEADERS.iter().any(|l| l.protocols.contains(&protocol));
            assert_eq!(
                has_leader,
                protocol != Protocol::Rtcm2,
                "leader registration for {protocol}"
            );
        }
    }

    #[test]
    fn dispatch_skips_disabled_protocols() {
        let dispatch = Dispatch::new(ProtocolSet::all().without(Protocol::Ubx));
        assert!(dispatch.lookup(0xb5).is_none());
        assert!(dispatch.lookup(b'$').is_some());

        // a shared leader stays while any of its protocols is enabled
        let dispatch = Dispatch::new(
            ProtocolSet::all()
                .without(Protocol::Tsip)
                .without(Protocol::Garmin),
        );
        assert!(dispatch.lookup(dle::DLE).is_some());
    }

    #[test]
    fn set_operations() {
        let set: ProtocolSet = [Protocol::Nmea, Protocol::Ubx].into_iter().collect();
        assert!(set.contains(Protocol::Nmea));
        assert!(!set.contains(Protocol::Rtcm3));
        assert_eq!(set.iter().count(), 2);
        assert_eq!(ProtocolSet::all().iter().count(), Protocol::ALL.len());
        assert!(!ProtocolSet::empty().contains(Protocol::Comment));
        assert_eq!(set.without(Protocol::Ubx).with(Protocol::Ubx), set);
    }
}
