//! ASCIIHex filter.

use crate::error::FilterError;

/// Decodes hex digits to bytes. Whitespace is skipped, `>` ends the data,
/// and a trailing odd nibble is padded with zero.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &byte in data {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' => continue,
            b'>' => break,
            other => {
                return Err(FilterError::DecodeFailed {
                    filter: "ASCIIHexDecode",
                    reason: format!("invalid hex byte 0x{:02X}", other),
                })
            }
        };
        match high.take() {
            None => high = Some(digit),
            Some(h) => out.push((h << 4) | digit),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

/// Encodes bytes as hex digits followed by the `>` terminator.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for &byte in data {
        out.extend_from_slice(format!("{:02X}", byte).as_bytes());
    }
    out.push(b'>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
        assert_eq!(decode(&encode(&data)).unwrap(), data);
    }

    #[test]
    fn test_whitespace_ignored() {
        assert_eq!(decode(b"48 65\n6C 6C\t6F>").unwrap(), b"Hello");
        assert_eq!(decode(b"48656C6C6F>").unwrap(), b"Hello");
    }

    #[test]
    fn test_odd_nibble_padded() {
        assert_eq!(decode(b"7>").unwrap(), vec![0x70]);
    }

    #[test]
    fn test_invalid_byte_rejected() {
        assert!(decode(b"4G>").is_err());
    }
}
