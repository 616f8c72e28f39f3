//! PDF Stream object.

use super::{Object, PdfDictionary};

/// Where a stream's payload bytes live.
///
/// A stream produced by the writer (or fully decoded) carries its bytes. A
/// stream met during parsing carries only the byte offset of its payload in
/// the source file; the bytes are materialized on demand through the filter
/// chain so that no payload sits in memory unless asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    /// Resident bytes.
    Bytes(Vec<u8>),
    /// Absolute byte offset of the payload start in the source stream.
    Position(u64),
}

/// A PDF stream object: a dictionary plus a payload.
///
/// ```text
/// << /Length 123 >>
/// stream
/// ...binary data...
/// endstream
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    /// The stream dictionary.
    pub dictionary: PdfDictionary,
    /// The payload, resident or positioned.
    pub payload: StreamPayload,
}

impl PdfStream {
    /// Creates a stream from resident data; /Length is set from the data.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let mut dictionary = PdfDictionary::new();
        dictionary.set("Length", Object::Integer(data.len() as i64));
        Self {
            dictionary,
            payload: StreamPayload::Bytes(data),
        }
    }

    /// Creates a stream with a custom dictionary; /Length is overwritten
    /// from the actual data length.
    pub fn with_dictionary(mut dictionary: PdfDictionary, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        dictionary.set("Length", Object::Integer(data.len() as i64));
        Self {
            dictionary,
            payload: StreamPayload::Bytes(data),
        }
    }

    /// Creates a stream from a dictionary and data without touching the
    /// dictionary (for payloads that are already encrypted or encoded).
    pub fn from_raw(dictionary: PdfDictionary, data: Vec<u8>) -> Self {
        Self {
            dictionary,
            payload: StreamPayload::Bytes(data),
        }
    }

    /// Creates a parsed stream whose payload starts at `offset` in the
    /// source file.
    pub fn at_position(dictionary: PdfDictionary, offset: u64) -> Self {
        Self {
            dictionary,
            payload: StreamPayload::Position(offset),
        }
    }

    /// Returns the resident payload bytes, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            StreamPayload::Bytes(b) => Some(b),
            StreamPayload::Position(_) => None,
        }
    }

    /// Returns the payload start offset for a positioned stream.
    pub fn payload_position(&self) -> Option<u64> {
        match &self.payload {
            StreamPayload::Position(p) => Some(*p),
            StreamPayload::Bytes(_) => None,
        }
    }

    /// Returns true if the dictionary names at least one filter.
    pub fn has_filters(&self) -> bool {
        self.dictionary.contains_key("Filter")
    }
}
