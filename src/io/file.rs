//! File-backed positioned reader.

use super::{ByteReader, PositionedReader};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A positioned reader over an open file.
///
/// Holds the OS handle for the lifetime of the reader; the file length is
/// sampled at open so `not_ended` stays cheap.
#[derive(Debug)]
pub struct FileReader {
    file: File,
    len: u64,
    pos: u64,
}

impl FileReader {
    /// Opens a file for positioned reading.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len, pos: 0 })
    }

    /// Total length of the file at open time.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the file was empty at open time.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ByteReader for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn not_ended(&self) -> bool {
        self.pos < self.len
    }
}

impl PositionedReader for FileReader {
    fn position(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    fn seek_from_end(&mut self, back: u64) -> io::Result<()> {
        let target = self.len.saturating_sub(back);
        self.seek(target)
    }
}
