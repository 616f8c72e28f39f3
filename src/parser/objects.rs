//! PDF object assembly from tokens.

use super::lexer::*;
use crate::object::{Object, PdfArray, PdfDictionary, PdfName, PdfStream, PdfString};
use crate::types::ObjectId;
use nom::IResult;

// Nesting deeper than this is treated as pathological input.
const MAX_DEPTH: usize = 512;

/// Byte offset of `rest` within `base`. `rest` must be a suffix of `base`.
pub fn offset_of(base: &[u8], rest: &[u8]) -> u64 {
    (rest.as_ptr() as usize - base.as_ptr() as usize) as u64
}

/// Maps a lexer failure at a known offset to the right error kind: running
/// out of bytes mid-token is truncation, anything else is a plain parse
/// failure.
pub fn classify_error(offset: u64, err: nom::Err<nom::error::Error<&[u8]>>) -> crate::error::ParseError {
    use crate::error::ParseError;
    match &err {
        nom::Err::Incomplete(_) => ParseError::TruncatedInput(offset),
        nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
            nom::error::ErrorKind::Eof => ParseError::TruncatedInput(offset),
            nom::error::ErrorKind::TooLarge => {
                ParseError::LimitExceeded("object nesting too deep".to_string())
            }
            code => ParseError::ObjectParse(offset, format!("{:?}", code)),
        },
    }
}

/// Parses any PDF object. `base` is the whole source buffer so that stream
/// payload offsets come out absolute.
pub fn parse_object<'a>(base: &'a [u8], input: &'a [u8]) -> IResult<&'a [u8], Object> {
    parse_object_depth(base, input, 0)
}

fn parse_object_depth<'a>(
    base: &'a [u8],
    input: &'a [u8],
    depth: usize,
) -> IResult<&'a [u8], Object> {
    if depth > MAX_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }
    let (input, _) = skip_whitespace(input)?;

    match input.first() {
        Some(b'/') => {
            let (rest, name) = parse_name(input)?;
            Ok((rest, Object::Name(PdfName::new_unchecked(name))))
        }
        Some(b'(') => {
            let (rest, bytes) = parse_literal_string(input)?;
            Ok((rest, Object::String(PdfString::Literal(bytes))))
        }
        Some(b'<') => {
            if input.get(1) == Some(&b'<') {
                parse_dictionary_or_stream(base, input, depth)
            } else {
                let (rest, bytes) = parse_hex_string(input)?;
                Ok((rest, Object::String(PdfString::Hex(bytes))))
            }
        }
        Some(b'[') => parse_array(base, input, depth),
        Some(c) if c.is_ascii_digit() || *c == b'+' || *c == b'-' || *c == b'.' => {
            parse_number_or_reference(input)
        }
        _ => {
            let (rest, word) = parse_keyword(input)?;
            match word {
                b"true" => Ok((rest, Object::Boolean(true))),
                b"false" => Ok((rest, Object::Boolean(false))),
                b"null" => Ok((rest, Object::Null)),
                _ => Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Tag,
                ))),
            }
        }
    }
}

/// Parses an integer, a real, or an `id gen R` reference. The reference is
/// recognized by two-token look-ahead over the same bytes.
fn parse_number_or_reference(input: &[u8]) -> IResult<&[u8], Object> {
    if let Ok((rest, reference)) = parse_reference(input) {
        return Ok((rest, reference));
    }
    if let Ok((rest, value)) = parse_real(input) {
        return Ok((rest, Object::Real(value)));
    }
    let (rest, value) = parse_integer(input)?;
    Ok((rest, Object::Integer(value)))
}

fn parse_reference(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, number) = parse_integer(input)?;
    let (rest, _) = skip_whitespace(rest)?;
    let (rest, generation) = parse_integer(rest)?;
    let (rest, _) = skip_whitespace(rest)?;
    let (rest, _) = parse_r(rest)?;

    if number < 0 || generation < 0 || number > u32::MAX as i64 || generation > u16::MAX as i64 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((
        rest,
        Object::Reference(ObjectId::with_generation(number as u32, generation as u16)),
    ))
}

fn parse_array<'a>(base: &'a [u8], input: &'a [u8], depth: usize) -> IResult<&'a [u8], Object> {
    let (mut rest, _) = nom::character::complete::char::<_, nom::error::Error<&[u8]>>('[')(input)?;
    let mut array = PdfArray::new();
    loop {
        let (input, _) = skip_whitespace(rest)?;
        if input.first() == Some(&b']') {
            return Ok((&input[1..], Object::Array(array)));
        }
        if input.is_empty() {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Eof,
            )));
        }
        let (input, element) = parse_object_depth(base, input, depth + 1)?;
        array.push(element);
        rest = input;
    }
}

fn parse_dictionary_or_stream<'a>(
    base: &'a [u8],
    input: &'a [u8],
    depth: usize,
) -> IResult<&'a [u8], Object> {
    let (mut rest, _) = nom::bytes::complete::tag::<_, _, nom::error::Error<&[u8]>>(b"<<")(input)?;
    let mut dict = PdfDictionary::new();

    loop {
        let (input, _) = skip_whitespace(rest)?;
        if input.starts_with(b">>") {
            rest = &input[2..];
            break;
        }
        if input.is_empty() {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Eof,
            )));
        }
        let (input, key) = parse_name(input)?;
        let (input, value) = parse_object_depth(base, input, depth + 1)?;
        // a duplicate key keeps the first occurrence
        dict.set_if_absent(PdfName::new_unchecked(key), value);
        rest = input;
    }

    // a dictionary immediately followed by `stream` is a stream object; the
    // payload is not consumed, only its start offset recorded
    let (after_ws, _) = skip_whitespace(rest)?;
    if let Ok((payload, _eol)) = parse_stream_keyword(after_ws) {
        let stream = PdfStream::at_position(dict, offset_of(base, payload));
        return Ok((payload, Object::Stream(stream)));
    }

    Ok((rest, Object::Dictionary(dict)))
}

/// Parses an indirect object frame: `id gen obj <body>`.
///
/// For non-stream bodies the closing `endobj` is consumed. For streams the
/// parse stops at the payload start; the caller skips the payload using the
/// resolved /Length and is free to verify `endstream endobj` itself.
pub fn parse_indirect_object<'a>(
    base: &'a [u8],
    input: &'a [u8],
) -> IResult<&'a [u8], (ObjectId, Object)> {
    let (input, _) = skip_whitespace(input)?;
    let (input, number) = parse_integer(input)?;
    let (input, _) = skip_whitespace(input)?;
    let (input, generation) = parse_integer(input)?;
    let (input, _) = skip_whitespace(input)?;
    let (input, _) = parse_obj(input)?;

    if number <= 0 || generation < 0 || number > u32::MAX as i64 || generation > u16::MAX as i64 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    let id = ObjectId::with_generation(number as u32, generation as u16);

    let (input, body) = parse_object(base, input)?;

    if matches!(body, Object::Stream(_)) {
        return Ok((input, (id, body)));
    }

    let (input, _) = skip_whitespace(input)?;
    let (input, _) = parse_endobj(input)?;
    Ok((input, (id, body)))
}
