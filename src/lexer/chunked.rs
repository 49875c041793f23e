//! HTTP/1.1 chunked transfer decoding in place.
//!
//! Raw bytes from the transport are appended to the tail of the input buffer.
//! [Dechunker::dechunk] strips chunk framing from that tail and slides the
//! payload down so it joins the already decoded bytes ahead of it. Whatever
//! cannot be decoded yet, such as a chunk header split across reads, stays at
//! the very end and is not offered to the automaton.
use tracing::trace;

use crate::buffer::InputBuffer;

/// The chunked path only reads while fewer than this many bytes are buffered.
pub(crate) const READ_THRESHOLD: usize = 2048;

/// Longest chunk header, size and extensions included, waited on before
/// giving up on the stream.
const MAX_HEADER: usize = 64;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum Malformed {
    #[error("chunk size is not hexadecimal")]
    BadSize,
    #[error("chunk size exceeds {max}")]
    TooBig { max: usize },
    #[error("chunk header longer than {MAX_HEADER} bytes")]
    LongHeader,
    #[error("chunk data not followed by CRLF")]
    MissingCrlf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Header,
    Data { remaining: usize },
    /// Expecting the CRLF that ends chunk data.
    DataEnd,
}

#[derive(Debug)]
pub(crate) struct Dechunker {
    max_chunk_size: usize,
    phase: Phase,
    /// Undecoded bytes at the end of the input buffer.
    raw: usize,
}

impl Dechunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Dechunker {
            max_chunk_size,
            phase: Phase::Header,
            raw: 0,
        }
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Header;
        self.raw = 0;
    }

    pub fn raw(&self) -> usize {
        self.raw
    }

    /// Account for `n` bytes appended to the input buffer.
    pub fn extend_raw(&mut self, n: usize) {
        self.raw += n;
    }

    /// Decode as much of the raw tail of `input` as possible.
    ///
    /// On error the offending bytes are left in the raw tail.
    pub fn dechunk(&mut self, input: &mut InputBuffer) -> Result<(), Malformed> {
        let len = input.len();
        self.raw = self.raw.min(len);
        let start = len - self.raw;
        let mut read = start;
        let mut write = start;
        let buf = input.as_mut_slice();

        let result = loop {
            match self.phase {
                Phase::Data { remaining } => {
                    let n = remaining.min(len - read);
                    if n == 0 {
                        break Ok(());
                    }
                    buf.copy_within(read..read + n, write);
                    read += n;
                    write += n;
                    self.phase = match remaining - n {
                        0 => Phase::DataEnd,
                        remaining => Phase::Data { remaining },
                    };
                }
                Phase::DataEnd => {
                    if len - read < 2 {
                        break Ok(());
                    }
                    if &buf[read..read + 2] != b"\r\n" {
                        break Err(Malformed::MissingCrlf);
                    }
                    read += 2;
                    self.phase = Phase::Header;
                }
                Phase::Header => {
                    let pending = &buf[read..len];
                    let Some(end) = pending.windows(2).position(|w| w == b"\r\n") else {
                        if pending.len() > MAX_HEADER {
                            break Err(Malformed::LongHeader);
                        }
                        break Ok(());
                    };
                    let size = match chunk_size(&pending[..end], self.max_chunk_size) {
                        Ok(size) => size,
                        Err(err) => break Err(err),
                    };
                    trace!(size, "chunk header");
                    read += end + 2;
                    // the last chunk is empty and still followed by CRLF
                    self.phase = match size {
                        0 => Phase::DataEnd,
                        remaining => Phase::Data { remaining },
                    };
                }
            }
        };

        buf.copy_within(read..len, write);
        input.truncate(write + (len - read));
        self.raw = len - read;
        result
    }
}

/// Parse the hex size of a chunk header line, ignoring any `;` extensions.
fn chunk_size(header: &[u8], max: usize) -> Result<usize, Malformed> {
    let digits = match header.iter().position(|b| *b == b';') {
        Some(i) => &header[..i],
        None => header,
    };
    if digits.is_empty() {
        return Err(Malformed::BadSize);
    }
    digits.iter().try_fold(0usize, |acc, d| {
        let d = (*d as char).to_digit(16).ok_or(Malformed::BadSize)?;
        let size = acc * 16 + d as usize;
        if size > max {
            return Err(Malformed::TooBig { max });
        }
        Ok(size)
    })
}

/// Drop decoded bytes ahead of the first plausible RTCM3 preamble, a `0xd3`
/// followed by a byte whose reserved bits are clear. The last `reserved` bytes
/// are not decoded yet and left alone. Returns how many bytes were dropped.
pub(crate) fn skip_to_rtcm3(input: &mut InputBuffer, reserved: usize) -> usize {
    if input.cursor() != 0 {
        return 0;
    }
    let region = &input.as_slice()[..input.len() - reserved];
    let skip = region
        .windows(2)
        .position(|w| w[0] == 0xd3 && w[1] & 0xfc == 0)
        .unwrap_or(match region.last() {
            // the byte that settles it has not arrived
            Some(0xd3) => region.len() - 1,
            _ => region.len(),
        });
    input.discard_front(skip);
    skip
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn feed(dechunker: &mut Dechunker, input: &mut InputBuffer, dat: &[u8]) -> Result<(), Malformed> {
        input.extend(dat).expect("extend should fit");
        dechunker.extend_raw(dat.len());
        dechunker.dechunk(input)
    }

    #[test]
    fn joins_chunks() {
        let mut input = InputBuffer::new(256);
        let mut dechunker = Dechunker::new(100);
        feed(&mut dechunker, &mut input, b"3\r\nabc\r\n4;name=x\r\ndefg\r\n").expect("dechunk");
        assert_eq!(input.as_slice(), b"abcdefg");
        assert_eq!(dechunker.raw(), 0);
    }

    #[test]
    fn header_split_across_reads() {
        let mut input = InputBuffer::new(256);
        let mut dechunker = Dechunker::new(100);
        feed(&mut dechunker, &mut input, b"3\r\nabc\r\n1").expect("dechunk");
        assert_eq!(input.as_slice(), b"abc1");
        assert_eq!(dechunker.raw(), 1);

        feed(&mut dechunker, &mut input, b"0\r\n0123").expect("dechunk");
        assert_eq!(input.as_slice(), b"abc0123");
        assert_eq!(dechunker.raw(), 0);

        feed(&mut dechunker, &mut input, b"456789abcdef\r").expect("dechunk");
        assert_eq!(input.as_slice(), b"abc0123456789abcdef\r");
        assert_eq!(dechunker.raw(), 1, "CR of the data trailer");

        feed(&mut dechunker, &mut input, b"\n0\r\n\r\n").expect("dechunk");
        assert_eq!(input.as_slice(), b"abc0123456789abcdef");
        assert_eq!(dechunker.raw(), 0);
    }

    #[test_case(b"zz\r\n", Malformed::BadSize; "not hex")]
    #[test_case(b"\r\n", Malformed::BadSize; "empty size")]
    #[test_case(b"fffffffffffffffffffff\r\n", Malformed::TooBig { max: 100 }; "huge")]
    #[test_case(b"65\r\n", Malformed::TooBig { max: 100 }; "just over")]
    #[test_case(b"2\r\nabXY", Malformed::MissingCrlf; "data overrun")]
    fn malformed(dat: &[u8], expected: Malformed) {
        let mut input = InputBuffer::new(256);
        let mut dechunker = Dechunker::new(100);
        assert_eq!(feed(&mut dechunker, &mut input, dat), Err(expected));
    }

    #[test]
    fn long_header_is_malformed() {
        let mut input = InputBuffer::new(256);
        let mut dechunker = Dechunker::new(100);
        let header = [b'1'; MAX_HEADER + 1];
        assert_eq!(
            feed(&mut dechunker, &mut input, &header),
            Err(Malformed::LongHeader)
        );
        assert_eq!(dechunker.raw(), header.len());
    }

    #[test]
    fn skip_finds_preamble() {
        let mut input = InputBuffer::new(64);
        input
            .extend(&[0x01, 0xd3, 0xff, 0x20, 0xd3, 0x00, 0x13, 0x99])
            .expect("extend should fit");
        assert_eq!(skip_to_rtcm3(&mut input, 1), 4);
        assert_eq!(input.as_slice(), &[0xd3, 0x00, 0x13, 0x99]);
    }

    #[test]
    fn skip_keeps_trailing_preamble_byte() {
        let mut input = InputBuffer::new(64);
        input.extend(&[0x01, 0x02, 0xd3]).expect("extend should fit");
        assert_eq!(skip_to_rtcm3(&mut input, 0), 2);
        assert_eq!(input.as_slice(), &[0xd3]);
    }
}
