//! Stream filter pipeline.
//!
//! Filters are named, invertible byte transforms declared by a stream's
//! /Filter entry, with per-filter parameters in /DecodeParms. Decoding walks
//! the declared chain in order; the decryption layer has already run by the
//! time the first filter sees the bytes, so ciphers always operate on the
//! compressed form.

mod ascii85;
mod asciihex;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use predictor::PredictorParams;

use crate::error::FilterError;
use crate::object::{Object, PdfDictionary};

/// The filters this crate knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Flate,
    AsciiHex,
    Ascii85,
    Lzw,
    RunLength,
    /// JPEG data. Decode is out of scope; the payload passes through for an
    /// image subsystem to interpret.
    Dct,
    /// Positioned crypt filter; the cipher work happens in the encryption
    /// layer, so at this level it is an identity.
    Crypt,
    CcittFax,
    Jbig2,
}

impl FilterKind {
    /// Maps a /Filter name to a kind. Unknown names stay unknown so the
    /// caller can report which one was missing.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"FlateDecode" => Some(Self::Flate),
            b"ASCIIHexDecode" => Some(Self::AsciiHex),
            b"ASCII85Decode" => Some(Self::Ascii85),
            b"LZWDecode" => Some(Self::Lzw),
            b"RunLengthDecode" => Some(Self::RunLength),
            b"DCTDecode" => Some(Self::Dct),
            b"Crypt" => Some(Self::Crypt),
            b"CCITTFaxDecode" => Some(Self::CcittFax),
            b"JBIG2Decode" => Some(Self::Jbig2),
            _ => None,
        }
    }

    /// The canonical /Filter name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flate => "FlateDecode",
            Self::AsciiHex => "ASCIIHexDecode",
            Self::Ascii85 => "ASCII85Decode",
            Self::Lzw => "LZWDecode",
            Self::RunLength => "RunLengthDecode",
            Self::Dct => "DCTDecode",
            Self::Crypt => "Crypt",
            Self::CcittFax => "CCITTFaxDecode",
            Self::Jbig2 => "JBIG2Decode",
        }
    }
}

/// One step of a filter chain: the filter plus its decode parameters.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub parms: Option<PdfDictionary>,
}

impl FilterSpec {
    /// Builds the chain from already-resolved /Filter and /DecodeParms
    /// values. /Filter may be a single name or an array of names;
    /// /DecodeParms may be a dictionary, an array with null holes, or absent.
    pub fn chain_from_objects(
        filter: Option<&Object>,
        parms: Option<&Object>,
    ) -> Result<Vec<FilterSpec>, FilterError> {
        let names: Vec<&[u8]> = match filter {
            None | Some(Object::Null) => return Ok(Vec::new()),
            Some(Object::Name(n)) => vec![n.as_bytes()],
            Some(Object::Array(arr)) => {
                let mut names = Vec::with_capacity(arr.len());
                for element in arr.iter() {
                    match element {
                        Object::Name(n) => names.push(n.as_bytes()),
                        other => {
                            return Err(FilterError::InvalidParameters {
                                filter: "Filter",
                                reason: format!("array holds a {}", other.type_label()),
                            })
                        }
                    }
                }
                names
            }
            Some(other) => {
                return Err(FilterError::InvalidParameters {
                    filter: "Filter",
                    reason: format!("expected name or array, found {}", other.type_label()),
                })
            }
        };

        let parm_at = |i: usize| -> Option<PdfDictionary> {
            match parms {
                Some(Object::Dictionary(d)) if i == 0 => Some(d.clone()),
                Some(Object::Array(arr)) => match arr.get(i) {
                    Some(Object::Dictionary(d)) => Some(d.clone()),
                    _ => None,
                },
                _ => None,
            }
        };

        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = FilterKind::from_name(name).ok_or_else(|| {
                    FilterError::Unsupported(String::from_utf8_lossy(name).into_owned())
                })?;
                Ok(FilterSpec {
                    kind,
                    parms: parm_at(i),
                })
            })
            .collect()
    }
}

/// Reads the predictor parameters out of a /DecodeParms dictionary.
fn predictor_params(parms: Option<&PdfDictionary>) -> PredictorParams {
    let mut p = PredictorParams::default();
    if let Some(dict) = parms {
        if let Some(v) = dict.get_integer("Predictor") {
            p.predictor = v;
        }
        if let Some(v) = dict.get_integer("Colors") {
            p.colors = v;
        }
        if let Some(v) = dict.get_integer("BitsPerComponent") {
            p.bits_per_component = v;
        }
        if let Some(v) = dict.get_integer("Columns") {
            p.columns = v;
        }
    }
    p
}

/// Applies one filter in the decode direction.
pub fn decode_one(
    kind: FilterKind,
    parms: Option<&PdfDictionary>,
    data: &[u8],
) -> Result<Vec<u8>, FilterError> {
    match kind {
        FilterKind::Flate => {
            let inflated = flate::decode(data)?;
            let p = predictor_params(parms);
            if p.predictor >= 2 {
                predictor::decode(&inflated, &p)
            } else {
                Ok(inflated)
            }
        }
        FilterKind::Lzw => {
            let early_change = parms
                .and_then(|d| d.get_integer("EarlyChange"))
                .map(|v| v != 0)
                .unwrap_or(true);
            let expanded = lzw::decode(data, early_change)?;
            let p = predictor_params(parms);
            if p.predictor >= 2 {
                predictor::decode(&expanded, &p)
            } else {
                Ok(expanded)
            }
        }
        FilterKind::AsciiHex => asciihex::decode(data),
        FilterKind::Ascii85 => ascii85::decode(data),
        FilterKind::RunLength => runlength::decode(data),
        // interpreted elsewhere; the bytes pass through untouched
        FilterKind::Dct | FilterKind::Crypt => Ok(data.to_vec()),
        FilterKind::CcittFax | FilterKind::Jbig2 => {
            Err(FilterError::Unsupported(kind.name().to_string()))
        }
    }
}

/// Applies one filter in the encode direction.
pub fn encode_one(kind: FilterKind, data: &[u8]) -> Result<Vec<u8>, FilterError> {
    match kind {
        FilterKind::Flate => flate::encode(data),
        FilterKind::AsciiHex => Ok(asciihex::encode(data)),
        FilterKind::Ascii85 => Ok(ascii85::encode(data)),
        FilterKind::RunLength => Ok(runlength::encode(data)),
        _ => Err(FilterError::Unsupported(kind.name().to_string())),
    }
}

/// Runs the whole chain in the decode direction, first declared filter
/// first, as the chain is stored.
pub fn decode_chain(data: &[u8], chain: &[FilterSpec]) -> Result<Vec<u8>, FilterError> {
    let mut current = data.to_vec();
    for spec in chain {
        current = decode_one(spec.kind, spec.parms.as_ref(), &current)?;
    }
    Ok(current)
}

/// Runs the whole chain in the encode direction. Encoding applies the
/// filters in reverse declaration order so that decoding them in declared
/// order restores the input.
pub fn encode_chain(data: &[u8], chain: &[FilterSpec]) -> Result<Vec<u8>, FilterError> {
    let mut current = data.to_vec();
    for spec in chain.iter().rev() {
        current = encode_one(spec.kind, &current)?;
    }
    Ok(current)
}

/// Applies PNG "up" row prediction before compression (used for xref
/// streams).
pub fn predict_rows_for_encoding(
    data: &[u8],
    params: &PredictorParams,
) -> Result<Vec<u8>, FilterError> {
    predictor::encode_png_up(data, params)
}
