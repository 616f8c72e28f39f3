//! Length-capped reader.

use super::ByteReader;
use std::io;

/// A reader that stops delivering after a declared number of bytes, even if
/// the underlying stream has more. Used for stream payloads whose extent is
/// fixed by /Length.
#[derive(Debug)]
pub struct LimitedReader<R: ByteReader> {
    inner: R,
    remaining: u64,
}

impl<R: ByteReader> LimitedReader<R> {
    /// Caps `inner` at `limit` bytes.
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }

    /// Bytes still deliverable under the cap.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Unwraps the adapter.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ByteReader> ByteReader for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.inner.read(&mut buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }

    fn not_ended(&self) -> bool {
        self.remaining > 0 && self.inner.not_ended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{read_to_end, MemoryReader};

    #[test]
    fn test_limit_enforced() {
        let mut r = LimitedReader::new(MemoryReader::new(b"abcdefgh".to_vec()), 5);
        let got = read_to_end(&mut r).unwrap();
        assert_eq!(got, b"abcde");
        assert!(!r.not_ended());
    }

    #[test]
    fn test_underlying_shorter_than_limit() {
        let mut r = LimitedReader::new(MemoryReader::new(b"ab".to_vec()), 10);
        let got = read_to_end(&mut r).unwrap();
        assert_eq!(got, b"ab");
        assert_eq!(r.remaining(), 8);
        assert!(!r.not_ended());
    }
}
