//! Packet classification tags shared with downstream decoders.
//!
//! The numeric values are a wire contract: fixtures and monitoring clients
//! record them, so they never change and retired numbers are not reused.
use std::fmt::Display;

/// Longest packet the lexer will accept, in bytes.
pub const MAX_PACKET_LENGTH: usize = 9216;

/// Classification of an accepted packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PacketType {
    /// Framing was complete but validation failed.
    Bad,
    Comment,
    Nmea,
    Aivdm,
    GarminTxt,
    Sirf,
    Zodiac,
    Tsip,
    EverMore,
    Italk,
    Garmin,
    Navcom,
    Ubx,
    SuperStar2,
    OnCore,
    GeoStar,
    Greis,
    Sky,
    Allystar,
    Casic,
    Rtcm2,
    Rtcm3,
    Json,
}

impl PacketType {
    /// Every tag, in numeric order.
    pub const ALL: [PacketType; 23] = [
        Self::Bad,
        Self::Comment,
        Self::Nmea,
        Self::Aivdm,
        Self::GarminTxt,
        Self::Sirf,
        Self::Zodiac,
        Self::Tsip,
        Self::EverMore,
        Self::Italk,
        Self::Garmin,
        Self::Navcom,
        Self::Ubx,
        Self::SuperStar2,
        Self::OnCore,
        Self::GeoStar,
        Self::Greis,
        Self::Sky,
        Self::Allystar,
        Self::Casic,
        Self::Rtcm2,
        Self::Rtcm3,
        Self::Json,
    ];

    /// Stable numeric tag.
    #[must_use]
    pub fn number(self) -> i32 {
        match self {
            Self::Bad => -1,
            Self::Comment => 0,
            Self::Nmea => 1,
            Self::Aivdm => 2,
            Self::GarminTxt => 3,
            Self::Sirf => 4,
            Self::Zodiac => 5,
            Self::Tsip => 6,
            Self::EverMore => 7,
            Self::Italk => 8,
            Self::Garmin => 9,
            Self::Navcom => 10,
            Self::Ubx => 11,
            Self::SuperStar2 => 12,
            Self::OnCore => 13,
            Self::GeoStar => 14,
            Self::Greis => 16,
            Self::Sky => 17,
            Self::Allystar => 18,
            Self::Casic => 19,
            Self::Rtcm2 => 21,
            Self::Rtcm3 => 22,
            Self::Json => 23,
        }
    }

    /// Look up a tag by its numeric value.
    #[must_use]
    pub fn from_number(n: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.number() == n)
    }

    /// Stable textual tag.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bad => "BAD_PACKET",
            Self::Comment => "COMMENT_PACKET",
            Self::Nmea => "NMEA_PACKET",
            Self::Aivdm => "AIVDM_PACKET",
            Self::GarminTxt => "GARMINTXT_PACKET",
            Self::Sirf => "SIRF_PACKET",
            Self::Zodiac => "ZODIAC_PACKET",
            Self::Tsip => "TSIP_PACKET",
            Self::EverMore => "EVERMORE_PACKET",
            Self::Italk => "ITALK_PACKET",
            Self::Garmin => "GARMIN_PACKET",
            Self::Navcom => "NAVCOM_PACKET",
            Self::Ubx => "UBX_PACKET",
            Self::SuperStar2 => "SUPERSTAR2_PACKET",
            Self::OnCore => "ONCORE_PACKET",
            Self::GeoStar => "GEOSTAR_PACKET",
            Self::Greis => "GREIS_PACKET",
            Self::Sky => "SKY_PACKET",
            Self::Allystar => "ALLYSTAR_PACKET",
            Self::Casic => "CASIC_PACKET",
            Self::Rtcm2 => "RTCM2_PACKET",
            Self::Rtcm3 => "RTCM3_PACKET",
            Self::Json => "JSON_PACKET",
        }
    }

    /// Packets that carry text rather than binary data.
    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Comment | Self::Nmea | Self::Aivdm | Self::GarminTxt | Self::Json
        )
    }
}

/// An accepted packet, detached from the lexer that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet {
    pub packet_type: PacketType,
    /// All packet bytes, leader and trailer included.
    pub data: Vec<u8>,
}

impl Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for PacketType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or(value)
    }
}

impl From<PacketType> for i32 {
    fn from(value: PacketType) -> Self {
        value.number()
    }
}
