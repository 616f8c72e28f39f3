//! PDF trailer parsing.

use super::lexer::{parse_trailer_keyword, skip_whitespace};
use super::objects::parse_object;
use crate::error::ParseError;
use crate::object::{Object, PdfDictionary};
use crate::types::ObjectId;
use nom::IResult;

/// Typed view of a trailer dictionary.
#[derive(Debug, Clone)]
pub struct Trailer {
    /// The raw trailer dictionary.
    pub dict: PdfDictionary,
    /// Reference to the catalog.
    pub root: ObjectId,
    /// Reference to the info dictionary.
    pub info: Option<ObjectId>,
    /// Reference to the encryption dictionary.
    pub encrypt: Option<ObjectId>,
    /// The two document id halves.
    pub id: Option<(Vec<u8>, Vec<u8>)>,
    /// Offset of the previous xref section in an update chain.
    pub prev: Option<u64>,
    /// Offset of a hybrid-reference xref stream.
    pub xref_stm: Option<u64>,
    /// Declared table size (max id + 1).
    pub size: u32,
}

impl Trailer {
    /// Builds a typed trailer from its dictionary.
    pub fn from_dictionary(dict: PdfDictionary) -> Result<Self, ParseError> {
        let root = match dict.get("Root") {
            Some(Object::Reference(id)) => *id,
            _ => return Err(ParseError::InvalidTrailer),
        };

        let size = match dict.get_integer("Size") {
            Some(n) if n > 0 => n as u32,
            _ => return Err(ParseError::InvalidTrailer),
        };

        let info = dict.get("Info").and_then(Object::as_reference);

        let encrypt = match dict.get("Encrypt") {
            Some(Object::Reference(id)) => Some(*id),
            Some(Object::Dictionary(_)) => {
                // tolerated by some readers, but the object has no id to key
                // decryption on, so it is out of range here
                return Err(ParseError::CorruptXref(
                    "inline /Encrypt dictionary".to_string(),
                ));
            }
            _ => None,
        };

        let id = match dict.get("ID") {
            Some(Object::Array(arr)) if arr.len() >= 2 => {
                let first = arr.get(0).and_then(Object::as_string);
                let second = arr.get(1).and_then(Object::as_string);
                match (first, second) {
                    (Some(a), Some(b)) => Some((a.as_bytes().to_vec(), b.as_bytes().to_vec())),
                    _ => None,
                }
            }
            _ => None,
        };

        let prev = dict.get_integer("Prev").map(|n| n as u64);
        let xref_stm = dict.get_integer("XRefStm").map(|n| n as u64);

        Ok(Self {
            dict,
            root,
            info,
            encrypt,
            id,
            prev,
            xref_stm,
            size,
        })
    }
}

/// Parses the `trailer` keyword and the dictionary after it.
pub fn parse_trailer<'a>(base: &'a [u8], input: &'a [u8]) -> IResult<&'a [u8], PdfDictionary> {
    let (input, _) = parse_trailer_keyword(input)?;
    let (input, _) = skip_whitespace(input)?;
    let (input, obj) = parse_object(base, input)?;
    match obj {
        Object::Dictionary(dict) => Ok((input, dict)),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}
