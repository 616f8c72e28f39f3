//! LZW filter (decode direction).

use crate::error::FilterError;

const CLEAR_CODE: u16 = 256;
const EOD_CODE: u16 = 257;
const FIRST_FREE: u16 = 258;
const MAX_CODE_BITS: u32 = 12;

/// Decodes LZW-compressed data as stored in PDF streams: MSB-first code
/// packing, 9-bit initial width, dictionary reset on code 256, end of data
/// on 257. `early_change` is the /EarlyChange parameter (default 1): code
/// width grows one code before the table actually fills.
pub fn decode(data: &[u8], early_change: bool) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::with_capacity(data.len() * 3);
    let mut table: Vec<Vec<u8>> = Vec::new();
    reset_table(&mut table);

    let mut code_bits: u32 = 9;
    let mut bit_pos: usize = 0;
    let mut previous: Option<Vec<u8>> = None;
    let change_offset = if early_change { 1 } else { 0 };

    loop {
        let code = match read_code(data, &mut bit_pos, code_bits) {
            Some(c) => c,
            None => break, // ran out of bits without an EOD marker
        };

        match code {
            CLEAR_CODE => {
                reset_table(&mut table);
                code_bits = 9;
                previous = None;
            }
            EOD_CODE => break,
            _ => {
                let entry = if (code as usize) < table.len() {
                    table[code as usize].clone()
                } else if code as usize == table.len() {
                    // the code being defined right now: previous + its first byte
                    match &previous {
                        Some(prev) => {
                            let mut e = prev.clone();
                            e.push(prev[0]);
                            e
                        }
                        None => {
                            return Err(FilterError::DecodeFailed {
                                filter: "LZWDecode",
                                reason: "self-referential code with no prefix".to_string(),
                            })
                        }
                    }
                } else {
                    return Err(FilterError::DecodeFailed {
                        filter: "LZWDecode",
                        reason: format!("code {} outside table of {}", code, table.len()),
                    });
                };

                out.extend_from_slice(&entry);

                if let Some(prev) = previous.take() {
                    let mut new_entry = prev;
                    new_entry.push(entry[0]);
                    table.push(new_entry);
                }
                previous = Some(entry);

                let next = table.len() + change_offset;
                if next >= (1 << code_bits) && code_bits < MAX_CODE_BITS {
                    code_bits += 1;
                }
            }
        }
    }
    Ok(out)
}

fn reset_table(table: &mut Vec<Vec<u8>>) {
    table.clear();
    for b in 0u16..256 {
        table.push(vec![b as u8]);
    }
    // placeholders for the clear and EOD codes so indices line up
    table.push(Vec::new());
    table.push(Vec::new());
    debug_assert_eq!(table.len() as u16, FIRST_FREE);
}

fn read_code(data: &[u8], bit_pos: &mut usize, code_bits: u32) -> Option<u16> {
    let mut code: u32 = 0;
    for _ in 0..code_bits {
        let byte_index = *bit_pos / 8;
        if byte_index >= data.len() {
            return None;
        }
        let bit = (data[byte_index] >> (7 - (*bit_pos % 8))) & 1;
        code = (code << 1) | bit as u32;
        *bit_pos += 1;
    }
    Some(code as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from the format documentation: the byte sequence
    // 45 45 45 45 45 65 45 45 45 45 encodes to these codes, packed MSB-first.
    fn pack_codes(codes: &[u16], initial_bits: u32) -> Vec<u8> {
        let mut bits: Vec<bool> = Vec::new();
        let mut width = initial_bits;
        let mut table_len = 258usize;
        let mut first_after_clear = true;
        for &code in codes {
            for i in (0..width).rev() {
                bits.push((code >> i) & 1 == 1);
            }
            match code {
                CLEAR_CODE => {
                    table_len = 258;
                    width = initial_bits;
                    first_after_clear = true;
                }
                EOD_CODE => {}
                _ => {
                    if !first_after_clear {
                        table_len += 1;
                    }
                    first_after_clear = false;
                    if table_len + 1 >= (1 << width) && width < MAX_CODE_BITS {
                        width += 1;
                    }
                }
            }
        }
        let mut out = vec![0u8; (bits.len() + 7) / 8];
        for (i, bit) in bits.iter().enumerate() {
            if *bit {
                out[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        out
    }

    #[test]
    fn test_known_vector() {
        // 45 45 45 45 45 65 45 45 45 45 -> 256 45 258 258 65 259 45 257
        let packed = pack_codes(&[256, 69, 258, 258, 101, 259, 69, 257], 9);
        let decoded = decode(&packed, true).unwrap();
        assert_eq!(decoded, vec![69, 69, 69, 69, 69, 101, 69, 69, 69, 69]);
    }

    #[test]
    fn test_clear_code_resets() {
        // two independent runs separated by a clear code
        let packed = pack_codes(&[256, 65, 66, 256, 67, 68, 257], 9);
        let decoded = decode(&packed, true).unwrap();
        assert_eq!(decoded, b"ABCD");
    }

    #[test]
    fn test_bad_code_rejected() {
        // code 300 with an empty table
        let packed = pack_codes(&[256, 300], 9);
        assert!(decode(&packed, true).is_err());
    }
}
