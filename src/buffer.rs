//! The bounded byte arena the protocol parsers operate inside.

use std::io;

/// A bounded, manually-managed byte buffer.
///
/// Holds a fixed-capacity allocation and a cursor marking how many bytes
/// are populated from the front. All parsing in the chunked decoder runs
/// against one of these instead of allocating per chunk.
///
/// Every operation is O(n) in the shifted region; chunk boundaries are
/// small relative to buffer size so this never dominates.
#[derive(Debug)]
pub struct InterceptorBuffer {
    data: Vec<u8>,
    len: usize,
}

impl InterceptorBuffer {
    /// Create a buffer with the given fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of populated bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bytes are populated.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The populated prefix.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The free tail after the populated prefix. Fill it directly, then
    /// commit with [`advance`][Self::advance].
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Mark `n` more bytes as populated after an external fill.
    ///
    /// Panics if `n` exceeds the free tail.
    pub fn advance(&mut self, n: usize) {
        assert!(self.len + n <= self.data.len(), "advance past capacity");
        self.len += n;
    }

    /// Append `bytes` at the cursor, failing if capacity would be exceeded.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.len + bytes.len() > self.data.len() {
            return Err(overflow_err());
        }
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Remove `length` bytes starting at `offset`, shifting the remainder
    /// of the populated region left.
    ///
    /// Out-of-range arguments are a programming error and panic.
    pub fn remove_block(&mut self, offset: usize, length: usize) {
        assert!(
            offset + length <= self.len,
            "remove_block out of range: {}+{} > {}",
            offset,
            length,
            self.len
        );
        self.data.copy_within(offset + length..self.len, offset);
        self.len -= length;
    }

    /// Insert `bytes` at `offset`, shifting the tail right. Fails if the
    /// populated region would exceed capacity.
    ///
    /// Panics if `offset` lies beyond the populated prefix.
    pub fn insert_block(&mut self, bytes: &[u8], offset: usize) -> io::Result<()> {
        assert!(offset <= self.len, "insert_block past populated region");
        if self.len + bytes.len() > self.data.len() {
            return Err(overflow_err());
        }
        self.data
            .copy_within(offset..self.len, offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Locate the first occurrence of `pattern` within the populated
    /// prefix. Naive forward search; `None` if absent or empty.
    pub fn index_of(&self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() || pattern.len() > self.len {
            return None;
        }
        self.filled()
            .windows(pattern.len())
            .position(|window| window == pattern)
    }

    /// Grow capacity to `new_capacity`, preserving populated bytes. Fails
    /// if `new_capacity` is smaller than the current capacity; a buffer
    /// never shrinks.
    pub fn expand(&mut self, new_capacity: usize) -> io::Result<()> {
        if new_capacity < self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot shrink interceptor buffer",
            ));
        }
        self.data.resize(new_capacity, 0);
        Ok(())
    }
}

fn overflow_err() -> io::Error {
    io::Error::new(
        io::ErrorKind::WriteZero,
        "interceptor buffer capacity exceeded",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_remove() {
        let mut buf = InterceptorBuffer::new(16);
        buf.append(b"hello world").unwrap();
        assert_eq!(buf.len(), 11);

        buf.remove_block(0, 6);
        assert_eq!(buf.filled(), b"world");

        buf.remove_block(4, 1);
        assert_eq!(buf.filled(), b"worl");
    }

    #[test]
    fn append_past_capacity_fails() {
        let mut buf = InterceptorBuffer::new(4);
        buf.append(b"abc").unwrap();
        assert!(buf.append(b"de").is_err());
        // failed append must not corrupt the populated prefix
        assert_eq!(buf.filled(), b"abc");
    }

    #[test]
    fn insert_block_shifts_tail() {
        let mut buf = InterceptorBuffer::new(16);
        buf.append(b"held").unwrap();
        buf.insert_block(b"ra", 2).unwrap();
        assert_eq!(buf.filled(), b"herald");

        buf.insert_block(b">>", 0).unwrap();
        assert_eq!(buf.filled(), b">>herald");
    }

    #[test]
    fn index_of_searches_populated_bytes_only() {
        let mut buf = InterceptorBuffer::new(32);
        buf.append(b"4\r\nWiki\r\n").unwrap();
        assert_eq!(buf.index_of(b"\r\n"), Some(1));
        assert_eq!(buf.index_of(b"Wiki"), Some(3));
        assert_eq!(buf.index_of(b"pedia"), None);

        buf.remove_block(0, 3);
        assert_eq!(buf.index_of(b"\r\n"), Some(4));
    }

    #[test]
    fn expand_preserves_and_never_shrinks() {
        let mut buf = InterceptorBuffer::new(4);
        buf.append(b"abcd").unwrap();
        assert!(buf.expand(2).is_err());

        buf.expand(8).unwrap();
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.filled(), b"abcd");
        buf.append(b"efgh").unwrap();
        assert_eq!(buf.filled(), b"abcdefgh");
    }

    #[test]
    fn unfilled_advance_roundtrip() {
        let mut buf = InterceptorBuffer::new(8);
        buf.unfilled()[..3].copy_from_slice(b"xyz");
        buf.advance(3);
        assert_eq!(buf.filled(), b"xyz");
        assert_eq!(buf.unfilled().len(), 5);
    }

    #[test]
    #[should_panic]
    fn remove_block_out_of_range_panics() {
        let mut buf = InterceptorBuffer::new(8);
        buf.append(b"ab").unwrap();
        buf.remove_block(1, 4);
    }

    // Mirror a random-ish op sequence against a plain Vec<u8>.
    #[test]
    fn matches_reference_vec() {
        enum Op<'a> {
            Append(&'a [u8]),
            Remove(usize, usize),
            Insert(&'a [u8], usize),
        }

        let ops = [
            Op::Append(b"chunk"),
            Op::Insert(b"9\r\n", 0),
            Op::Append(b"\r\ntail"),
            Op::Remove(0, 3),
            Op::Insert(b"mid", 2),
            Op::Remove(5, 4),
            Op::Append(b"!"),
        ];

        let mut buf = InterceptorBuffer::new(64);
        let mut reference: Vec<u8> = Vec::new();

        for op in &ops {
            match op {
                Op::Append(bytes) => {
                    buf.append(bytes).unwrap();
                    reference.extend_from_slice(bytes);
                }
                Op::Remove(offset, len) => {
                    buf.remove_block(*offset, *len);
                    reference.drain(*offset..*offset + *len);
                }
                Op::Insert(bytes, offset) => {
                    buf.insert_block(bytes, *offset).unwrap();
                    reference.splice(*offset..*offset, bytes.iter().copied());
                }
            }
            assert_eq!(buf.filled(), reference.as_slice());
        }
    }
}
