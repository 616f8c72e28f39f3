//! PDF lexer: token recognition over byte slices.
//!
//! The delicate cases live here: balanced literal strings with the full
//! escape set, hex strings with interior whitespace, names with `#xx`
//! escapes, and comments that vanish between any two tokens.

use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map_res, opt, recognize, value},
    sequence::pair,
    IResult,
};

/// PDF whitespace: NUL, tab, LF, FF, CR, space.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// PDF delimiters; together with whitespace these end any regular token.
pub fn is_delimiter(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

/// Skips whitespace and comments. Comments run from `%` to end of line and
/// are transparent to every caller.
pub fn skip_whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    let mut rest = input;
    loop {
        let trimmed = match rest.iter().position(|&c| !is_whitespace(c)) {
            Some(n) => &rest[n..],
            None => &rest[rest.len()..],
        };
        if trimmed.first() == Some(&b'%') {
            let after = match trimmed.iter().position(|&c| c == b'\n' || c == b'\r') {
                Some(n) => &trimmed[n..],
                None => &trimmed[trimmed.len()..],
            };
            rest = after;
        } else {
            return Ok((trimmed, ()));
        }
    }
}

/// Parses a signed integer.
pub fn parse_integer(input: &[u8]) -> IResult<&[u8], i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &[u8]| {
        std::str::from_utf8(s)
            .map_err(|_| "invalid utf8")
            .and_then(|s| s.parse::<i64>().map_err(|_| "invalid integer"))
    })(input)
}

/// Parses a real number: digits with a decimal point somewhere, sign
/// optional. `4.`, `.5`, and `-3.62` are all valid forms.
pub fn parse_real(input: &[u8]) -> IResult<&[u8], f64> {
    fn sign_digits(i: &[u8]) -> IResult<&[u8], ()> {
        let (i, _) = opt(one_of("+-"))(i)?;
        let (i, int_part) = opt(digit1)(i)?;
        let (i, _) = char('.')(i)?;
        let (i, frac_part) = opt(digit1)(i)?;
        if int_part.is_none() && frac_part.is_none() {
            return Err(nom::Err::Error(nom::error::Error::new(
                i,
                nom::error::ErrorKind::Digit,
            )));
        }
        Ok((i, ()))
    }
    let (rest, text) = recognize(sign_digits)(input)?;

    let s = std::str::from_utf8(text)
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))?;
    // normalize forms like "4." and "-.5" that str::parse would reject
    let normalized = if s.ends_with('.') {
        format!("{}0", s)
    } else {
        s.to_string()
    };
    let normalized = normalized.replace("-.", "-0.").replace("+.", "+0.");
    let normalized = if normalized.starts_with('.') {
        format!("0{}", normalized)
    } else {
        normalized
    };
    normalized
        .parse::<f64>()
        .map(|v| (rest, v))
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float)))
}

/// Parses a name: `/` then regular bytes, with `#xx` escapes decoded.
pub fn parse_name(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, _) = char('/')(input)?;
    let (input, raw) = take_while(is_regular)(input)?;

    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            if let Some(hex) = raw.get(i + 1..i + 3) {
                if let Ok(byte) = u8::from_str_radix(std::str::from_utf8(hex).unwrap_or("zz"), 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    Ok((input, out))
}

/// Parses a literal string with balanced parentheses and the full escape
/// set. A backslash before CR, LF, or CRLF is a line continuation producing
/// nothing; CR and CRLF inside the string normalize to LF.
pub fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (mut input, _) = char('(')(input)?;
    let mut result = Vec::new();
    let mut depth = 1;

    while depth > 0 {
        let Some((&c, rest)) = input.split_first() else {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Eof,
            )));
        };
        input = rest;

        match c {
            b'(' => {
                depth += 1;
                result.push(c);
            }
            b')' => {
                depth -= 1;
                if depth > 0 {
                    result.push(c);
                }
            }
            b'\r' => {
                // raw EOL inside the string reads as a single LF
                if input.first() == Some(&b'\n') {
                    input = &input[1..];
                }
                result.push(b'\n');
            }
            b'\\' => {
                let Some((&escaped, rest)) = input.split_first() else {
                    return Err(nom::Err::Error(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::Eof,
                    )));
                };
                input = rest;
                match escaped {
                    b'n' => result.push(b'\n'),
                    b'r' => result.push(b'\r'),
                    b't' => result.push(b'\t'),
                    b'b' => result.push(0x08),
                    b'f' => result.push(0x0C),
                    b'(' => result.push(b'('),
                    b')' => result.push(b')'),
                    b'\\' => result.push(b'\\'),
                    b'\r' => {
                        // continuation: CR then optional LF, one path for both
                        if input.first() == Some(&b'\n') {
                            input = &input[1..];
                        }
                    }
                    b'\n' => {}
                    b'0'..=b'7' => {
                        let mut octal = (escaped - b'0') as u16;
                        for _ in 0..2 {
                            match input.first() {
                                Some(&d @ b'0'..=b'7') => {
                                    octal = octal * 8 + (d - b'0') as u16;
                                    input = &input[1..];
                                }
                                _ => break,
                            }
                        }
                        result.push(octal as u8);
                    }
                    other => result.push(other),
                }
            }
            _ => result.push(c),
        }
    }
    Ok((input, result))
}

/// Parses a hex string: `<` hex digits with arbitrary whitespace `>`. A
/// trailing odd nibble is padded with zero.
pub fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, _) = char('<')(input)?;
    let (input, body) =
        take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c))(input)?;
    let (input, _) = char('>')(input)?;

    let mut out = Vec::with_capacity(body.len() / 2);
    let mut high: Option<u8> = None;
    for &c in body {
        if is_whitespace(c) {
            continue;
        }
        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => c - b'A' + 10,
        };
        match high.take() {
            None => high = Some(digit),
            Some(h) => out.push((h << 4) | digit),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok((input, out))
}

/// Parses a bare keyword: regular bytes up to the next delimiter.
pub fn parse_keyword(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_regular)(input)
}

/// How the `stream` keyword was terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEol {
    CrLf,
    Lf,
    /// A lone CR: accepted for robustness, reported as a diagnostic, and
    /// never produced on write.
    LoneCr,
}

/// Parses the `stream` keyword plus its line terminator.
pub fn parse_stream_keyword(input: &[u8]) -> IResult<&[u8], StreamEol> {
    let (input, _) = tag(b"stream")(input)?;
    if let Ok((rest, _)) = tag::<_, _, nom::error::Error<&[u8]>>(b"\r\n")(input) {
        return Ok((rest, StreamEol::CrLf));
    }
    if let Ok((rest, _)) = char::<_, nom::error::Error<&[u8]>>('\n')(input) {
        return Ok((rest, StreamEol::Lf));
    }
    if let Ok((rest, _)) = char::<_, nom::error::Error<&[u8]>>('\r')(input) {
        return Ok((rest, StreamEol::LoneCr));
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Tag,
    )))
}

pub fn parse_obj(input: &[u8]) -> IResult<&[u8], ()> {
    value((), tag(b"obj"))(input)
}

pub fn parse_endobj(input: &[u8]) -> IResult<&[u8], ()> {
    value((), tag(b"endobj"))(input)
}

/// Parses the `R` of an indirect reference; the R must stand alone.
pub fn parse_r(input: &[u8]) -> IResult<&[u8], ()> {
    let (rest, _) = char('R')(input)?;
    match rest.first() {
        Some(&c) if is_regular(c) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        ))),
        _ => Ok((rest, ())),
    }
}

pub fn parse_xref_keyword(input: &[u8]) -> IResult<&[u8], ()> {
    value((), tag(b"xref"))(input)
}

pub fn parse_trailer_keyword(input: &[u8]) -> IResult<&[u8], ()> {
    value((), tag(b"trailer"))(input)
}
