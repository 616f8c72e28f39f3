//! PDF String object.

/// A PDF string object, either literal or hexadecimal.
///
/// Literal strings are enclosed in parentheses: `(Hello)`. Hexadecimal
/// strings are enclosed in angle brackets: `<48656C6C6F>`. Both carry raw
/// bytes; the escape round-trip preserves all 256 byte values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfString {
    /// A literal string enclosed in parentheses.
    Literal(Vec<u8>),
    /// A hexadecimal string enclosed in angle brackets.
    Hex(Vec<u8>),
}

impl PdfString {
    /// Creates a new literal string from text.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into().into_bytes())
    }

    /// Creates a new literal string from bytes.
    pub fn literal_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Literal(bytes.into())
    }

    /// Creates a new hexadecimal string from bytes.
    pub fn hex(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Hex(bytes.into())
    }

    /// Builds a text string using the standard heuristic: ASCII-safe text is
    /// stored as PDFDocEncoding, anything else as UTF-16BE with a BOM.
    pub fn from_text(text: &str) -> Self {
        if text.bytes().all(|b| b < 0x80) {
            Self::Literal(text.as_bytes().to_vec())
        } else {
            let mut bytes = vec![0xFE, 0xFF];
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
            Self::Literal(bytes)
        }
    }

    /// Decodes a text string: UTF-16BE when it starts with the `FE FF` BOM,
    /// PDFDocEncoding (read as Latin-1 here) otherwise.
    ///
    /// The BOM test is a convention inherited from common producers rather
    /// than a PDF requirement.
    pub fn to_text(&self) -> String {
        let bytes = self.as_bytes();
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let units: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        } else {
            bytes.iter().map(|&b| b as char).collect()
        }
    }

    /// Returns the raw bytes of the string.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Literal(bytes) | Self::Hex(bytes) => bytes,
        }
    }

    /// Serializes the string to PDF syntax.
    pub fn to_pdf_string(&self) -> String {
        match self {
            Self::Literal(bytes) => escape_literal(bytes),
            Self::Hex(bytes) => encode_hex(bytes),
        }
    }
}

/// Escapes a literal string for PDF output, parentheses included.
pub(crate) fn escape_literal(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() + 8);
    result.push('(');
    for &byte in bytes {
        match byte {
            b'\\' => result.push_str("\\\\"),
            b'(' => result.push_str("\\("),
            b')' => result.push_str("\\)"),
            b'\n' => result.push_str("\\n"),
            b'\r' => result.push_str("\\r"),
            b'\t' => result.push_str("\\t"),
            b'\x08' => result.push_str("\\b"),
            b'\x0C' => result.push_str("\\f"),
            0..=31 | 127..=255 => {
                result.push_str(&format!("\\{:03o}", byte));
            }
            _ => result.push(byte as char),
        }
    }
    result.push(')');
    result
}

/// Encodes bytes as a hexadecimal string, angle brackets included.
pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 2 + 2);
    result.push('<');
    for byte in bytes {
        result.push_str(&format!("{:02X}", byte));
    }
    result.push('>');
    result
}

impl From<&str> for PdfString {
    fn from(s: &str) -> Self {
        Self::literal(s)
    }
}

impl From<String> for PdfString {
    fn from(s: String) -> Self {
        Self::literal(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_simple() {
        assert_eq!(PdfString::literal("Hello").to_pdf_string(), "(Hello)");
    }

    #[test]
    fn test_literal_with_parentheses() {
        let s = PdfString::literal("Hello (World)");
        assert_eq!(s.to_pdf_string(), "(Hello \\(World\\))");
    }

    #[test]
    fn test_literal_with_backslash() {
        assert_eq!(PdfString::literal("C:\\path").to_pdf_string(), "(C:\\\\path)");
    }

    #[test]
    fn test_literal_control_bytes_use_octal() {
        let s = PdfString::literal_bytes(vec![0x01, 0x7F]);
        assert_eq!(s.to_pdf_string(), "(\\001\\177)");
    }

    #[test]
    fn test_hex_string() {
        let s = PdfString::hex(vec![0x48, 0x65, 0x6C, 0x6C, 0x6F]);
        assert_eq!(s.to_pdf_string(), "<48656C6C6F>");
    }

    #[test]
    fn test_text_roundtrip_ascii() {
        let s = PdfString::from_text("plain");
        assert_eq!(s.as_bytes(), b"plain");
        assert_eq!(s.to_text(), "plain");
    }

    #[test]
    fn test_text_roundtrip_utf16() {
        let s = PdfString::from_text("Grüße");
        assert_eq!(&s.as_bytes()[..2], &[0xFE, 0xFF]);
        assert_eq!(s.to_text(), "Grüße");
    }
}
