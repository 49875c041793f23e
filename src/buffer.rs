use std::io::{self, ErrorKind, Read};

use crate::{Error, Result};

/// Fixed-capacity accumulation buffer with a read cursor.
///
/// Bytes before the cursor belong to the candidate packet currently being
/// recognized; bytes after it have been read from the device but not yet
/// examined. Consumed bytes can be pushed back one at a time, which rewinds the
/// cursor so the same byte is examined again.
#[derive(Debug)]
pub(crate) struct InputBuffer {
    data: Vec<u8>,
    capacity: usize,
    cursor: usize,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        InputBuffer {
            data: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.data.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes read but not yet examined.
    pub fn available(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// The candidate packet, i.e., everything before the cursor.
    pub fn candidate(&self) -> &[u8] {
        &self.data[..self.cursor]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Examine the next byte, advancing the cursor.
    pub fn next(&mut self) -> Option<u8> {
        let b = *self.data.get(self.cursor)?;
        self.cursor += 1;
        Some(b)
    }

    /// Un-consume the most recently examined byte.
    ///
    /// # Panics
    /// If nothing has been consumed, which would mean the state machine pushed
    /// back a byte it never saw.
    pub fn push_back(&mut self) {
        assert!(self.cursor > 0, "push back with nothing consumed");
        self.cursor -= 1;
    }

    /// Drop the candidate bytes, returning how many were dropped.
    pub fn discard_consumed(&mut self) -> usize {
        let n = self.cursor;
        self.data.drain(..n);
        self.cursor = 0;
        n
    }

    /// Drop the first `n` bytes. The cursor moves with the remaining data.
    pub fn discard_front(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.drain(..n);
        self.cursor = self.cursor.saturating_sub(n);
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.cursor = 0;
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        self.cursor = self.cursor.min(self.data.len());
    }

    /// Append bytes at the tail.
    ///
    /// # Errors
    /// [Error::Overflow] if `dat` does not fit; nothing is appended in that case.
    pub fn extend(&mut self, dat: &[u8]) -> Result<()> {
        if dat.len() > self.remaining_capacity() {
            return Err(Error::Overflow {
                requested: dat.len(),
                available: self.remaining_capacity(),
            });
        }
        self.data.extend_from_slice(dat);
        Ok(())
    }

    /// Insert bytes ahead of everything currently buffered. The cursor is reset to
    /// the start so the inserted bytes are examined first.
    ///
    /// # Errors
    /// [Error::Overflow] if `dat` does not fit; nothing is inserted in that case.
    pub fn prepend(&mut self, dat: &[u8]) -> Result<()> {
        if dat.len() > self.remaining_capacity() {
            return Err(Error::Overflow {
                requested: dat.len(),
                available: self.remaining_capacity(),
            });
        }
        self.data.splice(0..0, dat.iter().copied());
        self.cursor = 0;
        Ok(())
    }

    /// Read whatever `reader` has ready into the tail of the buffer, up to
    /// `limit` bytes and never past capacity.
    ///
    /// A reader that would block or was interrupted counts as having nothing
    /// ready.
    ///
    /// # Errors
    /// Any other I/O error from `reader`.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R, limit: usize) -> io::Result<usize> {
        let want = limit.min(self.remaining_capacity());
        if want == 0 {
            return Ok(0);
        }
        let start = self.data.len();
        self.data.resize(start + want, 0);
        let result = reader.read(&mut self.data[start..]);
        let n = match result {
            Ok(n) => n,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => 0,
            Err(err) => {
                self.data.truncate(start);
                return Err(err);
            }
        };
        self.data.truncate(start + n);
        Ok(n)
    }
}
