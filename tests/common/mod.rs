//! Builders for well formed packets of every supported protocol.
#![allow(dead_code)]

use std::io::{self, ErrorKind, Read};

use gnsslex::checksum::{self, crc24q_encode, fletcher8, nmea_suffix, sum16, xor8};

pub const DLE: u8 = 0x10;
pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;

pub const GGA: &[u8] =
    b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";

pub fn nmea(body: &str) -> Vec<u8> {
    let mut dat = format!("${body}*").into_bytes();
    dat.extend_from_slice(&nmea_suffix(body.as_bytes()));
    dat.extend_from_slice(b"\r\n");
    dat
}

pub fn ais(body: &str) -> Vec<u8> {
    let mut dat = nmea(body);
    dat[0] = b'!';
    dat
}

pub fn ubx(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut dat = vec![0xb5, 0x62, class, id];
    dat.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    dat.extend_from_slice(payload);
    let (a, b) = fletcher8(&dat[2..]);
    dat.extend_from_slice(&[a, b]);
    dat
}

pub fn allystar(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut dat = vec![0xf1, 0xd9, class, id];
    dat.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    dat.extend_from_slice(payload);
    let (a, b) = fletcher8(&dat[2..]);
    dat.extend_from_slice(&[a, b]);
    dat
}

/// `payload` must be a multiple of 4 bytes long.
pub fn casic(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut dat = vec![0xba, 0xce];
    dat.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    dat.extend_from_slice(&[class, id]);
    dat.extend_from_slice(payload);
    let cs = checksum::casic(&dat[2..]);
    dat.extend_from_slice(&cs.to_le_bytes());
    dat
}

pub fn rtcm3(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u16;
    let mut dat = vec![0xd3];
    dat.extend_from_slice(&len.to_be_bytes());
    dat.extend_from_slice(payload);
    crc24q_encode(&mut dat);
    dat
}

pub fn sirf(payload: &[u8]) -> Vec<u8> {
    let mut dat = vec![0xa0, 0xa2];
    dat.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    dat.extend_from_slice(payload);
    dat.extend_from_slice(&checksum::sirf(payload).to_be_bytes());
    dat.extend_from_slice(&[0xb0, 0xb3]);
    dat
}

pub fn sky(payload: &[u8]) -> Vec<u8> {
    let mut dat = vec![0xa0, 0xa1];
    dat.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    dat.extend_from_slice(payload);
    dat.push(xor8(payload));
    dat.extend_from_slice(b"\r\n");
    dat
}

pub fn zodiac(id: u16, data: &[u16]) -> Vec<u8> {
    let mut header = [0xff81u16, id, data.len() as u16, 0, 0];
    header[4] = header[..4]
        .iter()
        .fold(0u16, |acc, w| acc.wrapping_add(*w))
        .wrapping_neg();
    let mut dat: Vec<u8> = header.iter().flat_map(|w| w.to_le_bytes()).collect();
    if !data.is_empty() {
        let cs = data
            .iter()
            .fold(0u16, |acc, w| acc.wrapping_add(*w))
            .wrapping_neg();
        dat.extend(data.iter().chain([cs].iter()).flat_map(|w| w.to_le_bytes()));
    }
    dat
}

pub fn navcom(id: u8, data: &[u8]) -> Vec<u8> {
    let mut dat = vec![0x02, 0x99, b'f', id];
    dat.extend_from_slice(&(data.len() as u16 + 4).to_le_bytes());
    dat.extend_from_slice(data);
    dat.push(xor8(&dat[3..]));
    dat.push(0x03);
    dat
}

pub fn superstar2(id: u8, data: &[u8]) -> Vec<u8> {
    let mut dat = vec![0x01, id, id ^ 0xff, data.len() as u8];
    dat.extend_from_slice(data);
    let cs = sum16(&dat);
    dat.extend_from_slice(&cs.to_le_bytes());
    dat
}

pub fn geostar(id: u16, words: &[u32]) -> Vec<u8> {
    let mut dat = b"PSGG".to_vec();
    dat.extend_from_slice(&id.to_le_bytes());
    dat.extend_from_slice(&(words.len() as u16).to_le_bytes());
    for w in words {
        dat.extend_from_slice(&w.to_le_bytes());
    }
    let cs = checksum::geostar(&dat);
    dat.extend_from_slice(&cs.to_le_bytes());
    dat
}

pub fn greis(id: &[u8; 2], body: &[u8]) -> Vec<u8> {
    let mut dat = id.to_vec();
    dat.extend_from_slice(format!("{:03X}", body.len() + 1).as_bytes());
    dat.extend_from_slice(body);
    let cs = checksum::greis(&dat);
    dat.push(cs);
    dat
}

pub fn italk(kind: u8, words: &[u16]) -> Vec<u8> {
    let mut dat = vec![b'<', b'!', 0x01, 0x02, kind, 0x00, words.len() as u8];
    let mut crc = 0u32;
    for (i, w) in words.iter().enumerate() {
        dat.extend_from_slice(&w.to_le_bytes());
        let tmp = (crc + 1).wrapping_mul(u32::from(*w) + i as u32);
        crc ^= (tmp & 0xffff) ^ (tmp >> 16);
    }
    dat.extend_from_slice(&(crc as u16).to_le_bytes());
    dat.push(b'>');
    dat
}

/// `payload` must fit the fixed length of message `id`.
pub fn oncore(id: &[u8; 2], payload: &[u8]) -> Vec<u8> {
    let mut dat = b"@@".to_vec();
    dat.extend_from_slice(id);
    dat.extend_from_slice(payload);
    dat.push(xor8(&dat[2..]));
    dat.extend_from_slice(b"\r\n");
    dat
}

fn stuff(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .flat_map(|b| if *b == DLE { vec![DLE, DLE] } else { vec![*b] })
        .collect()
}

pub fn tsip(id: u8, data: &[u8]) -> Vec<u8> {
    let mut dat = vec![DLE, id];
    dat.extend(stuff(data));
    dat.extend_from_slice(&[DLE, ETX]);
    dat
}

pub fn garmin(id: u8, data: &[u8]) -> Vec<u8> {
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

/// `body` must be at least 6 bytes.
pub fn evermore(body: &[u8]) -> Vec<u8> {
    let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    let mut dat = vec![DLE, STX];
    dat.extend(stuff(&[body.len() as u8 + 2]));
    dat.extend(stuff(body));
    dat.extend(stuff(&[sum]));
    dat.extend_from_slice(&[DLE, ETX]);
    dat
}

/// Garmin simple text: `@` then 55 characters of fix data.
pub fn garmin_txt() -> Vec<u8> {
    let mut dat = b"@".to_vec();
    dat.extend_from_slice(b"240101120000N4807038E01131000G008+00545E0000N0000D0000");
    dat.extend_from_slice(b"\r\n");
    dat
}

const RTCM2_PREAMBLE: u32 = 0x66;
const RTCM2_PARITY: [u32; 6] = [
    0xbb1f_3480,
    0x5d8f_9a40,
    0xaec7_cd00,
    0x5763_e680,
    0x6bb1_f340,
    0x8b7a_89c0,
];

fn rtcm2_parity(w: u32) -> u32 {
    RTCM2_PARITY
        .iter()
        .fold(0, |p, mask| (p << 1) | ((w & mask).count_ones() & 1))
}

/// Header and data words of an RTCM2 message.
pub fn rtcm2_message(msg_type: u32, station: u32, data: &[u32]) -> Vec<u32> {
    let mut words = vec![
        (RTCM2_PREAMBLE << 16) | ((msg_type & 0x3f) << 10) | (station & 0x3ff),
        ((data.len() as u32 & 0x1f) << 3) | (1 << 11),
    ];
    words.extend_from_slice(data);
    words
}

/// Encode 24-bit RTCM2 words for the wire, returning the bytes and the 30-bit
/// words the lexer should report. Parity chains from word to word, so
/// consecutive messages must be encoded in one call.
pub fn rtcm2(words: &[u32]) -> (Vec<u8>, Vec<u32>) {
    let mut prev = 0u32;
    let mut bytes = Vec::new();
    let mut expected = Vec::new();
    for d in words {
        let d = d & 0x00ff_ffff;
        let p = rtcm2_parity((prev << 30) | (d << 6));
        expected.push((d << 6) | p);
        let sent = if prev & 1 != 0 { d ^ 0x00ff_ffff } else { d };
        let tx = (sent << 6) | p;
        for i in (0..5).rev() {
            let group = ((tx >> (i * 6)) & 0x3f) as u8;
            bytes.push(0x40 | (group.reverse_bits() >> 2));
        }
        prev = p & 0x3;
    }
    (bytes, expected)
}

/// Reader handing out at most `chunk` bytes per read and reporting would-block
/// every other call, like a non-blocking serial port.
pub struct Trickle<'a> {
    data: &'a [u8],
    chunk: usize,
    block_next: bool,
}

impl<'a> Trickle<'a> {
    pub fn new(data: &'a [u8], chunk: usize) -> Self {
        Trickle {
            data,
            chunk,
            block_next: false,
        }
    }
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.block_next = !self.block_next;
        if !self.block_next {
            return Err(io::Error::from(ErrorKind::WouldBlock));
        }
        let n = self.chunk.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}
