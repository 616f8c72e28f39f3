//! Token-level PDF syntax emitter.

use crate::object::{
    encode_hex, escape_literal, format_real, name_needs_escape, Object, PdfName,
};
use crate::types::ObjectId;
use std::io::{self, Write};

/// What to emit after a token so the next one does not join it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    None,
    Space,
    Newline,
}

/// Emits PDF tokens to a byte sink, tracking the output position.
pub struct PrimitiveWriter<W: Write> {
    sink: W,
    position: u64,
}

impl<W: Write> PrimitiveWriter<W> {
    /// Wraps a sink, starting at position zero.
    pub fn new(sink: W) -> Self {
        Self { sink, position: 0 }
    }

    /// Wraps a sink whose position counter starts at `base` (appending to an
    /// existing file).
    pub fn with_base_position(sink: W, base: u64) -> Self {
        Self {
            sink,
            position: base,
        }
    }

    /// Bytes emitted so far (plus the base, when appending).
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Writes raw bytes, advancing the position.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn separator(&mut self, sep: Separator) -> io::Result<()> {
        match sep {
            Separator::None => Ok(()),
            Separator::Space => self.write_bytes(b" "),
            Separator::Newline => self.write_bytes(b"\n"),
        }
    }

    /// Writes a bare keyword.
    pub fn write_keyword(&mut self, keyword: &str, sep: Separator) -> io::Result<()> {
        self.write_bytes(keyword.as_bytes())?;
        self.separator(sep)
    }

    /// Writes an integer.
    pub fn write_integer(&mut self, value: i64, sep: Separator) -> io::Result<()> {
        self.write_bytes(value.to_string().as_bytes())?;
        self.separator(sep)
    }

    /// Writes a real in fixed-point form with trailing zeros trimmed.
    pub fn write_real(&mut self, value: f64, sep: Separator) -> io::Result<()> {
        self.write_bytes(format_real(value).as_bytes())?;
        self.separator(sep)
    }

    /// Writes a name with `#xx` escaping.
    pub fn write_name(&mut self, name: &PdfName, sep: Separator) -> io::Result<()> {
        self.write_bytes(b"/")?;
        for &byte in name.as_bytes() {
            if name_needs_escape(byte) {
                self.write_bytes(format!("#{:02X}", byte).as_bytes())?;
            } else {
                self.write_bytes(&[byte])?;
            }
        }
        self.separator(sep)
    }

    /// Writes a literal string with the full escape set.
    pub fn write_literal_string(&mut self, bytes: &[u8], sep: Separator) -> io::Result<()> {
        self.write_bytes(escape_literal(bytes).as_bytes())?;
        self.separator(sep)
    }

    /// Writes a hex string.
    pub fn write_hex_string(&mut self, bytes: &[u8], sep: Separator) -> io::Result<()> {
        self.write_bytes(encode_hex(bytes).as_bytes())?;
        self.separator(sep)
    }

    /// Writes `id gen R`.
    pub fn write_reference(&mut self, id: ObjectId, sep: Separator) -> io::Result<()> {
        self.write_bytes(id.reference_string().as_bytes())?;
        self.separator(sep)
    }

    /// Writes a `%` comment through end of line.
    pub fn write_comment(&mut self, text: &str) -> io::Result<()> {
        self.write_bytes(b"%")?;
        self.write_bytes(text.as_bytes())?;
        self.write_bytes(b"\n")
    }

    /// Writes any direct object in one call. Streams are rejected here; the
    /// payload framing belongs to the object-context writer.
    pub fn write_direct_object(&mut self, obj: &Object, sep: Separator) -> io::Result<()> {
        debug_assert!(
            !matches!(obj, Object::Stream(_)),
            "streams go through the stream path"
        );
        self.write_bytes(obj.to_pdf_string().as_bytes())?;
        self.separator(sep)
    }

    /// Flushes the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    /// Unwraps the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}
