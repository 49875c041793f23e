//! Field extraction from raw packet buffers.
//!
//! All accessors are bounds checked and return `None` when the requested field
//! does not fit inside the buffer.

/// Widest field [ubits] can extract without losing precision.
pub const MAX_FIELD_WIDTH: u32 = 56;

/// Extract an unsigned field `width` bits wide starting at bit `start` (zero
/// origin, MSB first) of `buf`.
///
/// With `le` set the extracted bits are reversed, i.e., the field is read as a
/// little-endian bit string.
///
/// Returns `None` when `width` is 0 or wider than [MAX_FIELD_WIDTH], or when the
/// field extends past the end of `buf`.
#[must_use]
pub fn ubits(buf: &[u8], start: usize, width: u32, le: bool) -> Option<u64> {
    if width == 0 || width > MAX_FIELD_WIDTH {
        return None;
    }
    let end_bit = start + width as usize;
    let bytes = buf.get(start / 8..end_bit.div_ceil(8))?;

    let mut fld = bytes
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    let tail = end_bit % 8;
    if tail != 0 {
        fld >>= 8 - tail;
    }
    fld &= !(!0u64 << width);

    if le {
        fld = fld.reverse_bits() >> (64 - width);
    }
    Some(fld)
}

/// Signed counterpart of [ubits]; the field is sign-extended from its top bit.
#[must_use]
pub fn sbits(buf: &[u8], start: usize, width: u32, le: bool) -> Option<i64> {
    let fld = ubits(buf, start, width, le)?;
    let shift = 64 - width;
    Some(((fld << shift) as i64) >> shift)
}

macro_rules! accessor {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $conv:ident) => {
        $(#[$doc])*
        #[must_use]
        pub fn $name(buf: &[u8], off: usize) -> Option<$ty> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes: [u8; N] = buf.get(off..off + N)?.try_into().ok()?;
            Some(<$ty>::$conv(bytes))
        }
    };
}

accessor!(
    /// Big-endian `u16` at byte offset `off`.
    getbeu16, u16, from_be_bytes
);
accessor!(getbeu32, u32, from_be_bytes);
accessor!(getbeu64, u64, from_be_bytes);
accessor!(getbes16, i16, from_be_bytes);
accessor!(getbes32, i32, from_be_bytes);
accessor!(getbes64, i64, from_be_bytes);
accessor!(
    /// Little-endian `u16` at byte offset `off`.
    getleu16, u16, from_le_bytes
);
accessor!(getleu32, u32, from_le_bytes);
accessor!(getleu64, u64, from_le_bytes);
accessor!(getles16, i16, from_le_bytes);
accessor!(getles32, i32, from_le_bytes);
accessor!(getles64, i64, from_le_bytes);

/// Little-endian IEEE-754 single at byte offset `off`.
#[must_use]
pub fn getlef32(buf: &[u8], off: usize) -> Option<f32> {
    getleu32(buf, off).map(f32::from_bits)
}

/// Little-endian IEEE-754 double at byte offset `off`.
#[must_use]
pub fn getled64(buf: &[u8], off: usize) -> Option<f64> {
    getleu64(buf, off).map(f64::from_bits)
}

/// Big-endian IEEE-754 single at byte offset `off`.
#[must_use]
pub fn getbef32(buf: &[u8], off: usize) -> Option<f32> {
    getbeu32(buf, off).map(f32::from_bits)
}

/// Big-endian IEEE-754 double at byte offset `off`.
#[must_use]
pub fn getbed64(buf: &[u8], off: usize) -> Option<f64> {
    getbeu64(buf, off).map(f64::from_bits)
}
