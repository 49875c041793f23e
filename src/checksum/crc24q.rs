use crc::{Crc, CRC_24_LTE_A};

/// CRC-24Q as used by RTCM3 (and SBAS): polynomial 0x1864CFB, zero init, no
/// reflection. The `crc` catalog carries it as CRC-24/LTE-A.
const CRC24Q: Crc<u32> = Crc::<u32>::new(&CRC_24_LTE_A);

/// Number of trailing CRC bytes on a CRC-24Q protected frame.
pub const CRC24Q_SIZE: usize = 3;

/// Compute the 24-bit CRC over `data`.
#[must_use]
pub fn crc24q(data: &[u8]) -> u32 {
    CRC24Q.checksum(data)
}

/// Check a frame whose last 3 bytes are the big-endian CRC-24Q of everything
/// before them.
#[must_use]
pub fn crc24q_check(frame: &[u8]) -> bool {
    if frame.len() < CRC24Q_SIZE {
        return false;
    }
    let (data, crc) = frame.split_at(frame.len() - CRC24Q_SIZE);
    let expected = u32::from_be_bytes([0, crc[0], crc[1], crc[2]]);
    crc24q(data) == expected
}

/// Append the big-endian CRC-24Q of `data` to it.
pub fn crc24q_encode(data: &mut Vec<u8>) {
    let crc = crc24q(data).to_be_bytes();
    data.extend_from_slice(&crc[1..]);
}
