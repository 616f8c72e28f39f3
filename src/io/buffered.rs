//! Buffered reader/writer adapters.

use super::{ByteReader, ByteWriter, PositionedReader, PositionedWriter};
use std::io::{self, Write};

/// Default internal buffer size for the buffered adapters.
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// A buffered adapter over a positioned reader.
///
/// `position()` reports the logical position: the underlying stream position
/// minus the bytes buffered but not yet handed out. Seeking drops the buffer.
#[derive(Debug)]
pub struct BufferedReader<R: PositionedReader> {
    inner: R,
    buffer: Vec<u8>,
    // valid window inside `buffer`
    start: usize,
    end: usize,
}

impl<R: PositionedReader> BufferedReader<R> {
    /// Wraps a reader with the default 256 KiB buffer.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    /// Wraps a reader with a specific buffer capacity.
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buffer: vec![0u8; capacity.max(1)],
            start: 0,
            end: 0,
        }
    }

    fn buffered(&self) -> usize {
        self.end - self.start
    }

    fn fill(&mut self) -> io::Result<usize> {
        self.start = 0;
        self.end = self.inner.read(&mut self.buffer)?;
        Ok(self.end)
    }

    /// Unwraps the adapter, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: PositionedReader> ByteReader for BufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Large reads bypass the buffer once it is drained.
        if self.buffered() == 0 && buf.len() >= self.buffer.len() {
            return self.inner.read(buf);
        }
        if self.buffered() == 0 && self.fill()? == 0 {
            return Ok(0);
        }
        let n = self.buffered().min(buf.len());
        buf[..n].copy_from_slice(&self.buffer[self.start..self.start + n]);
        self.start += n;
        Ok(n)
    }

    fn not_ended(&self) -> bool {
        self.buffered() > 0 || self.inner.not_ended()
    }
}

impl<R: PositionedReader> PositionedReader for BufferedReader<R> {
    fn position(&self) -> u64 {
        self.inner.position() - self.buffered() as u64
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.start = 0;
        self.end = 0;
        self.inner.seek(pos)
    }

    fn seek_from_end(&mut self, back: u64) -> io::Result<()> {
        self.start = 0;
        self.end = 0;
        self.inner.seek_from_end(back)
    }
}

/// A buffered adapter over a `std::io::Write` sink.
///
/// `position()` reports bytes accepted so far, including bytes still pending
/// in the buffer.
#[derive(Debug)]
pub struct BufferedWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    position: u64,
}

impl<W: Write> BufferedWriter<W> {
    /// Wraps a writer with the default 256 KiB buffer.
    pub fn new(inner: W) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    /// Wraps a writer with a specific buffer capacity.
    pub fn with_capacity(inner: W, capacity: usize) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(capacity.max(1)),
            position: 0,
        }
    }

    /// Flushes pending bytes to the underlying sink.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.inner.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        self.inner.flush()
    }

    /// Flushes and unwraps the adapter.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> ByteWriter for BufferedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.buffer.len() + buf.len() > self.buffer.capacity() {
            self.inner.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        if buf.len() >= self.buffer.capacity() {
            self.inner.write_all(buf)?;
        } else {
            self.buffer.extend_from_slice(buf);
        }
        self.position += buf.len() as u64;
        Ok(buf.len())
    }
}

impl<W: Write> PositionedWriter for BufferedWriter<W> {
    fn position(&self) -> u64 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;

    #[test]
    fn test_buffered_read_position() {
        let mut r = BufferedReader::with_capacity(MemoryReader::new(b"abcdefgh".to_vec()), 4);
        let mut buf = [0u8; 2];
        r.read(&mut buf).unwrap();
        // underlying has advanced by 4 (one fill), logical position is 2
        assert_eq!(r.position(), 2);
        assert_eq!(&buf, b"ab");
    }

    #[test]
    fn test_buffered_seek_resets() {
        let mut r = BufferedReader::with_capacity(MemoryReader::new(b"abcdefgh".to_vec()), 4);
        let mut buf = [0u8; 3];
        r.read(&mut buf).unwrap();
        r.seek(6).unwrap();
        assert_eq!(r.position(), 6);
        let n = r.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"gh");
    }

    #[test]
    fn test_buffered_writer_positions_include_pending() {
        let mut w = BufferedWriter::with_capacity(Vec::new(), 16);
        w.write(b"hello").unwrap();
        assert_eq!(w.position(), 5);
        let out = w.into_inner().unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_buffered_writer_large_write_bypasses() {
        let mut w = BufferedWriter::with_capacity(Vec::new(), 4);
        w.write(b"0123456789").unwrap();
        assert_eq!(w.position(), 10);
        assert_eq!(w.into_inner().unwrap(), b"0123456789");
    }
}
