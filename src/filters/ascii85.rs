//! ASCII-85 filter.

use crate::error::FilterError;

/// Decodes base-85 text. `z` stands for four zero bytes, `~>` ends the data,
/// whitespace is skipped, and any other out-of-range byte is rejected.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut count = 0;
    for &byte in data {
        match byte {
            b'~' => break,
            b'z' if count == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[count] = byte - b'!';
                count += 1;
                if count == 5 {
                    push_group(&mut out, &group, 5)?;
                    count = 0;
                }
            }
            b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' => {}
            other => {
                return Err(FilterError::DecodeFailed {
                    filter: "ASCII85Decode",
                    reason: format!("invalid base-85 byte 0x{:02X}", other),
                })
            }
        }
    }

    if count == 1 {
        return Err(FilterError::DecodeFailed {
            filter: "ASCII85Decode",
            reason: "dangling single digit in final group".to_string(),
        });
    }
    if count > 1 {
        // Pad the partial group with the highest digit, then drop the
        // padding bytes from the output.
        for slot in group.iter_mut().skip(count) {
            *slot = 84;
        }
        push_group(&mut out, &group, count)?;
    }
    Ok(out)
}

fn push_group(out: &mut Vec<u8>, group: &[u8; 5], count: usize) -> Result<(), FilterError> {
    let mut value: u32 = 0;
    for &digit in group {
        value = value.checked_mul(85).and_then(|v| v.checked_add(digit as u32)).ok_or(
            FilterError::DecodeFailed {
                filter: "ASCII85Decode",
                reason: "group value overflow".to_string(),
            },
        )?;
    }
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[..count - 1]);
    Ok(())
}

/// Encodes bytes as base-85 text ending in `~>`.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 5 / 4 + 2);
    for chunk in data.chunks(4) {
        let mut quad = [0u8; 4];
        quad[..chunk.len()].copy_from_slice(chunk);
        let value = u32::from_be_bytes(quad);
        if value == 0 && chunk.len() == 4 {
            out.push(b'z');
            continue;
        }
        let mut digits = [0u8; 5];
        let mut v = value;
        for slot in digits.iter_mut().rev() {
            *slot = (v % 85) as u8 + b'!';
            v /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}
