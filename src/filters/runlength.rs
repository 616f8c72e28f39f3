//! RunLength (PackBits-style) filter.

use crate::error::FilterError;

const EOD: u8 = 128;

/// Decodes run-length data: a length byte 0..=127 copies the next length+1
/// bytes literally, 129..=255 repeats the next byte 257-length times, and
/// 128 marks end of data.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            EOD => return Ok(out),
            0..=127 => {
                let count = length as usize + 1;
                if i + count > data.len() {
                    return Err(FilterError::DecodeFailed {
                        filter: "RunLengthDecode",
                        reason: "literal run past end of data".to_string(),
                    });
                }
                out.extend_from_slice(&data[i..i + count]);
                i += count;
            }
            _ => {
                if i >= data.len() {
                    return Err(FilterError::DecodeFailed {
                        filter: "RunLengthDecode",
                        reason: "repeat run missing its byte".to_string(),
                    });
                }
                let count = 257 - length as usize;
                out.extend(std::iter::repeat(data[i]).take(count));
                i += 1;
            }
        }
    }
    // Missing EOD is tolerated; the data simply ends.
    Ok(out)
}

/// Encodes bytes as run-length data ending in the EOD marker.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 1);
    let mut i = 0;
    while i < data.len() {
        // measure the run starting here
        let run_byte = data[i];
        let mut run_len = 1;
        while i + run_len < data.len() && data[i + run_len] == run_byte && run_len < 128 {
            run_len += 1;
        }
        if run_len >= 2 {
            out.push((257 - run_len) as u8);
            out.push(run_byte);
            i += run_len;
        } else {
            // collect literals until the next run of at least 3
            let start = i;
            let mut len = 0;
            while i < data.len() && len < 128 {
                let mut ahead = 1;
                while i + ahead < data.len() && data[i + ahead] == data[i] && ahead < 3 {
                    ahead += 1;
                }
                if ahead >= 3 {
                    break;
                }
                i += 1;
                len += 1;
            }
            out.push((len - 1) as u8);
            out.extend_from_slice(&data[start..start + len]);
        }
    }
    out.push(EOD);
    out
}
