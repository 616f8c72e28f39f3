//! PDF Name object.

use crate::error::ObjectError;
use std::fmt;

/// A PDF name object (e.g., /Type, /Page, /Font).
///
/// A name is a raw byte sequence. Equality and hashing are by byte value;
/// the `#xx` hexadecimal notation is a syntactic detail applied only when a
/// name is written out and removed when one is lexed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PdfName(Vec<u8>);

impl PdfName {
    /// Creates a new PDF name from bytes or a string slice.
    ///
    /// The input must not include the leading slash. The empty name is legal
    /// PDF but almost always a bug, so it is rejected here.
    pub fn new(name: impl Into<Vec<u8>>) -> Result<Self, ObjectError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ObjectError::InvalidName("name cannot be empty".to_string()));
        }
        if name.contains(&0) {
            return Err(ObjectError::InvalidName(
                "name cannot contain null bytes".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Creates a PDF name without validation, for known-good names.
    pub fn new_unchecked(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into())
    }

    /// Returns the raw name bytes without the leading slash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the name as UTF-8 when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Serializes the name to PDF syntax with `#xx` escaping.
    ///
    /// Bytes outside `!`..=`~`, the `#` itself, and all delimiter characters
    /// are escaped.
    pub fn to_pdf_string(&self) -> String {
        let mut result = String::with_capacity(self.0.len() + 4);
        result.push('/');
        for &byte in &self.0 {
            if needs_escape(byte) {
                result.push('#');
                result.push_str(&format!("{:02X}", byte));
            } else {
                result.push(byte as char);
            }
        }
        result
    }
}

/// Checks if a byte needs `#xx` escaping in name syntax.
pub(crate) fn needs_escape(byte: u8) -> bool {
    !(33..=126).contains(&byte)
        || matches!(
            byte,
            b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
        )
}

impl fmt::Debug for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdfName({})", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for PdfName {
    fn from(s: &str) -> Self {
        Self::new_unchecked(s.as_bytes().to_vec())
    }
}

impl From<String> for PdfName {
    fn from(s: String) -> Self {
        Self::new_unchecked(s.into_bytes())
    }
}

impl From<&[u8]> for PdfName {
    fn from(bytes: &[u8]) -> Self {
        Self::new_unchecked(bytes.to_vec())
    }
}

// Lets dictionaries be queried with plain byte slices.
impl indexmap::Equivalent<PdfName> for [u8] {
    fn equivalent(&self, key: &PdfName) -> bool {
        self == key.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        let name = PdfName::new("Type").unwrap();
        assert_eq!(name.to_pdf_string(), "/Type");
    }

    #[test]
    fn test_name_with_space() {
        let name = PdfName::new("Hello World").unwrap();
        assert_eq!(name.to_pdf_string(), "/Hello#20World");
    }

    #[test]
    fn test_name_with_hash() {
        let name = PdfName::new("Name#1").unwrap();
        assert_eq!(name.to_pdf_string(), "/Name#231");
    }

    #[test]
    fn test_name_with_delimiters() {
        let name = PdfName::new("A(B)C").unwrap();
        assert_eq!(name.to_pdf_string(), "/A#28B#29C");
    }

    #[test]
    fn test_non_utf8_name() {
        let name = PdfName::new(vec![b'A', 0xC3, b'B']).unwrap();
        assert_eq!(name.as_str(), None);
        assert_eq!(name.to_pdf_string(), "/A#C3B");
    }

    #[test]
    fn test_empty_name_error() {
        assert!(PdfName::new("").is_err());
    }

    #[test]
    fn test_byte_value_equality() {
        assert_eq!(PdfName::from("Type"), PdfName::new_unchecked(b"Type".to_vec()));
    }
}
