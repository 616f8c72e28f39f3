//! Flate (zlib/deflate) filter.

use crate::error::FilterError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

// Chunk size for streaming through the codec.
const CHUNK: usize = 256 * 1024;

/// Inflates zlib-wrapped deflate data. A bad header or checksum is fatal to
/// the surrounding object.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    let mut chunk = vec![0u8; CHUNK];
    loop {
        let n = decoder.read(&mut chunk).map_err(|e| FilterError::DecodeFailed {
            filter: "FlateDecode",
            reason: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

/// Deflates data with a zlib wrapper at the default compression level.
pub fn encode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for chunk in data.chunks(CHUNK) {
        encoder.write_all(chunk).map_err(|e| FilterError::EncodeFailed {
            filter: "FlateDecode",
            reason: e.to_string(),
        })?;
    }
    encoder.finish().map_err(|e| FilterError::EncodeFailed {
        filter: "FlateDecode",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"Hello, world! Hello, world! Hello, world!".repeat(20);
        let packed = encode(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(decode(&packed).unwrap(), data);
    }

    #[test]
    fn test_empty_roundtrip() {
        let packed = encode(b"").unwrap();
        assert_eq!(decode(&packed).unwrap(), b"");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode(b"not zlib data at all").is_err());
    }
}
