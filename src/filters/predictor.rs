//! Predictor post-pass for Flate and LZW data.
//!
//! When /Predictor is 2 the rows were TIFF horizontal-differenced; when it is
//! 10 or more each row carries a PNG filter-type byte. Either way the pass
//! runs after decompression and reconstructs the original sample rows.

use crate::error::FilterError;

/// Row-prediction parameters from /DecodeParms.
#[derive(Debug, Clone, Copy)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: i64,
    pub bits_per_component: i64,
    pub columns: i64,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    fn bytes_per_pixel(&self) -> usize {
        (((self.colors * self.bits_per_component) as usize) + 7) / 8
    }

    fn bytes_per_row(&self) -> usize {
        (((self.colors * self.bits_per_component * self.columns) as usize) + 7) / 8
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.colors < 1 || self.columns < 1 || !matches!(self.bits_per_component, 1 | 2 | 4 | 8 | 16)
        {
            return Err(FilterError::InvalidParameters {
                filter: "Predictor",
                reason: format!(
                    "colors {} columns {} bits {}",
                    self.colors, self.columns, self.bits_per_component
                ),
            });
        }
        Ok(())
    }
}

/// Undoes row prediction. Predictor 1 passes data through unchanged.
pub fn decode(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => {
            params.validate()?;
            decode_tiff(data, params)
        }
        10..=15 => {
            params.validate()?;
            decode_png(data, params)
        }
        other => Err(FilterError::InvalidParameters {
            filter: "Predictor",
            reason: format!("unknown predictor {}", other),
        }),
    }
}

fn decode_tiff(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    if params.bits_per_component != 8 {
        return Err(FilterError::InvalidParameters {
            filter: "Predictor",
            reason: format!(
                "TIFF predictor with {} bits per component is not supported",
                params.bits_per_component
            ),
        });
    }
    let row_len = params.bytes_per_row();
    let stride = params.colors as usize;
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_len) {
        for i in stride..row.len() {
            row[i] = row[i].wrapping_add(row[i - stride]);
        }
    }
    Ok(out)
}

fn decode_png(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    let row_len = params.bytes_per_row();
    let bpp = params.bytes_per_pixel();
    if data.len() % (row_len + 1) != 0 {
        return Err(FilterError::DecodeFailed {
            filter: "Predictor",
            reason: format!(
                "data length {} is not a multiple of row length {}",
                data.len(),
                row_len + 1
            ),
        });
    }

    let rows = data.len() / (row_len + 1);
    let mut out = vec![0u8; rows * row_len];
    let mut prior = vec![0u8; row_len];

    for r in 0..rows {
        let src = &data[r * (row_len + 1)..(r + 1) * (row_len + 1)];
        let filter_type = src[0];
        let row = &mut out[r * row_len..(r + 1) * row_len];
        row.copy_from_slice(&src[1..]);

        match filter_type {
            0 => {}
            1 => {
                for i in bpp..row_len {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            2 => {
                for i in 0..row_len {
                    row[i] = row[i].wrapping_add(prior[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                    let up = prior[i] as u16;
                    row[i] = row[i].wrapping_add(((left + up) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] } else { 0 };
                    let up = prior[i];
                    let up_left = if i >= bpp { prior[i - bpp] } else { 0 };
                    row[i] = row[i].wrapping_add(paeth(left, up, up_left));
                }
            }
            other => {
                return Err(FilterError::DecodeFailed {
                    filter: "Predictor",
                    reason: format!("unknown PNG filter type {}", other),
                })
            }
        }
        prior.copy_from_slice(row);
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Applies PNG "up" prediction, the common choice when writing xref streams.
pub fn encode_png_up(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    params.validate()?;
    let row_len = params.bytes_per_row();
    if data.len() % row_len != 0 {
        return Err(FilterError::EncodeFailed {
            filter: "Predictor",
            reason: format!(
                "data length {} is not a multiple of row length {}",
                data.len(),
                row_len
            ),
        });
    }
    let mut out = Vec::with_capacity(data.len() + data.len() / row_len);
    let mut prior = vec![0u8; row_len];
    for row in data.chunks(row_len) {
        out.push(2);
        for i in 0..row_len {
            out.push(row[i].wrapping_sub(prior[i]));
        }
        prior.copy_from_slice(row);
    }
    Ok(out)
}
