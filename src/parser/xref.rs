//! Cross-reference table parsing: classical sections, xref streams, and the
//! linear-scan rebuild used when both are beyond saving.

use super::lexer::*;
use super::objects::{offset_of, parse_indirect_object};
use crate::error::ParseError;
use crate::object::{Object, PdfDictionary};
use crate::types::ObjectId;
use nom::{
    bytes::complete::take_while1,
    character::complete::one_of,
    combinator::map_res,
    IResult,
};
use std::collections::HashMap;

/// An entry in the cross-reference table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XrefEntry {
    /// Object is free; `next_free` chains the free list, `generation` is the
    /// generation the id would reincarnate at.
    Free { next_free: u32, generation: u16 },
    /// Object lives at a byte offset in the file.
    InUse { offset: u64, generation: u16 },
    /// Object is packed inside an object stream at the given index.
    InStream { stream_id: u32, index: u32 },
}

impl XrefEntry {
    /// Returns the byte offset when the entry is in use at one.
    pub fn offset(&self) -> Option<u64> {
        match self {
            XrefEntry::InUse { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Returns true if this entry is free.
    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. })
    }
}

/// The cross-reference table: object number to entry.
///
/// Ids absent from the map are undefined and resolve to null.
#[derive(Debug, Default)]
pub struct XrefTable {
    entries: HashMap<u32, XrefEntry>,
    max_id: u32,
}

impl XrefTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an entry by object number.
    pub fn get(&self, number: u32) -> Option<&XrefEntry> {
        self.entries.get(&number)
    }

    /// Inserts an entry, tracking the highest id seen.
    pub fn insert(&mut self, number: u32, entry: XrefEntry) {
        self.max_id = self.max_id.max(number);
        self.entries.insert(number, entry);
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest object id recorded.
    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    /// Folds an older section into this one. Existing entries win: sections
    /// are parsed newest-first, and a more recent update overrides anything
    /// an older section says about the same id.
    pub fn merge_older(&mut self, older: XrefTable) {
        for (number, entry) in older.entries {
            self.max_id = self.max_id.max(number);
            self.entries.entry(number).or_insert(entry);
        }
    }

    /// Iterates over the entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XrefEntry)> {
        self.entries.iter()
    }
}

/// Parses a classical xref section: the `xref` keyword, then subsections of
/// `first count` headers with fixed-width entries, up to `trailer`.
pub fn parse_xref_table(input: &[u8]) -> IResult<&[u8], XrefTable> {
    let (input, _) = parse_xref_keyword(input)?;

    let mut table = XrefTable::new();
    let mut rest = input;
    loop {
        let (input, _) = skip_whitespace(rest)?;
        if input.starts_with(b"trailer") || input.is_empty() {
            return Ok((input, table));
        }

        let (input, first) = parse_section_integer(input)?;
        let (input, _) = skip_whitespace(input)?;
        let (input, count) = parse_section_integer(input)?;

        let mut current = input;
        for i in 0..count {
            let (input, entry) = parse_xref_entry(current)?;
            table.insert(first + i, entry);
            current = input;
        }
        rest = current;
    }
}

/// One 20-byte entry: ten-digit offset, five-digit generation, `n` or `f`.
fn parse_xref_entry(input: &[u8]) -> IResult<&[u8], XrefEntry> {
    let (input, _) = skip_whitespace(input)?;
    let (input, offset) = parse_section_integer_u64(input)?;
    let (input, _) = skip_whitespace(input)?;
    let (input, generation) = parse_section_integer(input)?;
    let (input, _) = skip_whitespace(input)?;
    let (input, flag) = one_of("nf")(input)?;

    let entry = if flag == 'n' {
        XrefEntry::InUse {
            offset,
            generation: generation.min(u16::MAX as u32) as u16,
        }
    } else {
        XrefEntry::Free {
            next_free: offset as u32,
            generation: generation.min(u16::MAX as u32) as u16,
        }
    };
    Ok((input, entry))
}

fn parse_section_integer(input: &[u8]) -> IResult<&[u8], u32> {
    map_res(take_while1(|c: u8| c.is_ascii_digit()), |s: &[u8]| {
        std::str::from_utf8(s)
            .map_err(|_| "utf8")
            .and_then(|s| s.parse::<u32>().map_err(|_| "u32"))
    })(input)
}

fn parse_section_integer_u64(input: &[u8]) -> IResult<&[u8], u64> {
    map_res(take_while1(|c: u8| c.is_ascii_digit()), |s: &[u8]| {
        std::str::from_utf8(s)
            .map_err(|_| "utf8")
            .and_then(|s| s.parse::<u64>().map_err(|_| "u64"))
    })(input)
}

/// Decodes the payload of an xref stream into a table. `w` comes from /W,
/// `index` from /Index (defaulting to one run from zero), both already
/// resolved by the caller.
pub fn parse_xref_stream_data(
    data: &[u8],
    w: [usize; 3],
    index: &[(u32, u32)],
) -> Result<XrefTable, ParseError> {
    let entry_size = w[0] + w[1] + w[2];
    if entry_size == 0 {
        return Err(ParseError::CorruptXref("zero-width /W".to_string()));
    }

    let mut table = XrefTable::new();
    let mut at = 0usize;
    for &(first, count) in index {
        for i in 0..count {
            if at + entry_size > data.len() {
                return Err(ParseError::CorruptXref(format!(
                    "xref stream data ends inside entry for object {}",
                    first + i
                )));
            }
            // a missing type field defaults to type 1
            let kind = if w[0] == 0 {
                1
            } else {
                read_be(&data[at..at + w[0]])
            };
            let f2 = read_be(&data[at + w[0]..at + w[0] + w[1]]);
            let f3 = read_be(&data[at + w[0] + w[1]..at + entry_size]);
            at += entry_size;

            let entry = match kind {
                0 => XrefEntry::Free {
                    next_free: f2 as u32,
                    generation: f3 as u16,
                },
                1 => XrefEntry::InUse {
                    offset: f2,
                    generation: f3 as u16,
                },
                2 => XrefEntry::InStream {
                    stream_id: f2 as u32,
                    index: f3 as u32,
                },
                other => {
                    return Err(ParseError::CorruptXref(format!(
                        "xref stream entry type {}",
                        other
                    )))
                }
            };
            table.insert(first + i, entry);
        }
    }
    Ok(table)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Reads /W and /Index out of an xref stream dictionary.
pub fn xref_stream_layout(
    dict: &PdfDictionary,
) -> Result<([usize; 3], Vec<(u32, u32)>), ParseError> {
    let w_arr = match dict.get("W") {
        Some(Object::Array(a)) if a.len() == 3 => a,
        _ => return Err(ParseError::CorruptXref("missing or malformed /W".to_string())),
    };
    let mut w = [0usize; 3];
    for (i, slot) in w.iter_mut().enumerate() {
        *slot = match w_arr.get(i).and_then(Object::as_integer) {
            Some(v) if (0..=8).contains(&v) => v as usize,
            _ => return Err(ParseError::CorruptXref("bad /W field width".to_string())),
        };
    }

    let size = dict
        .get_integer("Size")
        .ok_or_else(|| ParseError::CorruptXref("missing /Size".to_string()))? as u32;

    let index = match dict.get("Index") {
        Some(Object::Array(arr)) => {
            let mut pairs = Vec::new();
            let mut iter = arr.iter();
            while let (Some(first), Some(count)) = (iter.next(), iter.next()) {
                match (first.as_integer(), count.as_integer()) {
                    (Some(f), Some(c)) if f >= 0 && c >= 0 => {
                        pairs.push((f as u32, c as u32));
                    }
                    _ => {
                        return Err(ParseError::CorruptXref(
                            "non-integer /Index pair".to_string(),
                        ))
                    }
                }
            }
            pairs
        }
        _ => vec![(0, size)],
    };
    Ok((w, index))
}

/// Locates the primary xref offset: find `%%EOF` near the end, then scan
/// backwards for `startxref` and read the integer after it.
pub fn find_startxref(data: &[u8]) -> Result<u64, ParseError> {
    let tail_len = data.len().min(2048);
    let tail = &data[data.len() - tail_len..];

    let eof_pos = tail
        .windows(5)
        .rposition(|w| w == b"%%EOF")
        .ok_or(ParseError::InvalidTrailer)?;

    let before_eof = &tail[..eof_pos];
    let sx_pos = before_eof
        .windows(9)
        .rposition(|w| w == b"startxref")
        .ok_or(ParseError::InvalidTrailer)?;

    let after = &before_eof[sx_pos + 9..];
    let digits_start = after
        .iter()
        .position(|c| c.is_ascii_digit())
        .ok_or(ParseError::InvalidTrailer)?;
    let digits_end = after[digits_start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map(|p| digits_start + p)
        .unwrap_or(after.len());

    std::str::from_utf8(&after[digits_start..digits_end])
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(ParseError::InvalidTrailer)
}

/// Rebuilds the table by scanning the whole file for `id gen obj` headers.
///
/// Later headers override earlier ones, matching the "most recent wins" rule
/// of a /Prev chain. Any `trailer` dictionaries met along the way are parsed
/// so the caller can still find /Root; failing that, the scan remembers any
/// catalog dictionary it saw.
pub struct ScanRecovery {
    pub table: XrefTable,
    pub trailer_dicts: Vec<PdfDictionary>,
    pub catalog_id: Option<u32>,
}

pub fn rebuild_by_scan(data: &[u8]) -> ScanRecovery {
    let mut table = XrefTable::new();
    let mut trailer_dicts = Vec::new();
    let mut catalog_id = None;

    let mut at = 0usize;
    while at < data.len() {
        // candidate positions: the start of a digit run at a token boundary
        if !data[at].is_ascii_digit() || (at > 0 && !is_token_boundary(data[at - 1])) {
            if data[at..].starts_with(b"trailer") {
                let after = &data[at + 7..];
                if let Ok((_, obj)) = super::objects::parse_object(data, after) {
                    if let Object::Dictionary(dict) = obj {
                        trailer_dicts.push(dict);
                    }
                }
            }
            at += 1;
            continue;
        }

        match try_header(data, &data[at..]) {
            Some((id, generation, body_is_catalog, consumed)) => {
                table.insert(
                    id,
                    XrefEntry::InUse {
                        offset: at as u64,
                        generation,
                    },
                );
                if body_is_catalog {
                    catalog_id = Some(id);
                }
                // skip past the header only; bodies may contain digit runs
                // that are themselves headers in damaged files
                at += consumed.max(1);
            }
            None => {
                // skip the whole digit run
                while at < data.len() && data[at].is_ascii_digit() {
                    at += 1;
                }
            }
        }
    }

    // object headers never describe the free-list head, so a rebuilt table
    // has to put the mandatory entry back itself
    if !table.is_empty() {
        table.insert(
            0,
            XrefEntry::Free {
                next_free: 0,
                generation: ObjectId::TERMINAL_GENERATION,
            },
        );
    }

    ScanRecovery {
        table,
        trailer_dicts,
        catalog_id,
    }
}

fn is_token_boundary(c: u8) -> bool {
    is_whitespace(c) || is_delimiter(c)
}

/// Checks whether `input` starts an `id gen obj` header; returns the id,
/// generation, whether the body is a catalog dictionary, and the header
/// length in bytes.
fn try_header(base: &[u8], input: &[u8]) -> Option<(u32, u16, bool, usize)> {
    let (rest, number) = parse_integer(input).ok()?;
    let (rest, _) = skip_whitespace(rest).ok()?;
    let (rest, generation) = parse_integer(rest).ok()?;
    let (rest, _) = skip_whitespace(rest).ok()?;
    let (rest, _) = parse_obj(rest).ok()?;

    if number <= 0 || number > u32::MAX as i64 || generation < 0 || generation > u16::MAX as i64 {
        return None;
    }

    let consumed = offset_of(input, rest) as usize;
    let body_is_catalog = parse_indirect_object(base, input)
        .ok()
        .map(|(_, (_, obj))| {
            obj.as_dictionary()
                .and_then(|d| d.get_name("Type"))
                .map(|n| n.as_bytes() == b"Catalog")
                .unwrap_or(false)
        })
        .unwrap_or(false);

    Some((number as u32, generation as u16, body_is_catalog, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classical_entry() {
        let (_, entry) = parse_xref_entry(b"0000000015 00000 n \n").unwrap();
        assert_eq!(
            entry,
            XrefEntry::InUse {
                offset: 15,
                generation: 0
            }
        );
        let (_, entry) = parse_xref_entry(b"0000000000 65535 f \n").unwrap();
        assert!(entry.is_free());
    }

    #[test]
    fn test_parse_xref_table_subsections() {
        let input =
            b"xref\n0 2\n0000000000 65535 f \n0000000015 00000 n \n5 1\n0000000100 00000 n \ntrailer";
        let (remaining, table) = parse_xref_table(input).unwrap();
        assert!(remaining.starts_with(b"trailer"));
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(5).unwrap().offset(), Some(100));
        assert_eq!(table.max_id(), 5);
    }

    #[test]
    fn test_merge_newer_wins() {
        let mut newer = XrefTable::new();
        newer.insert(1, XrefEntry::InUse { offset: 900, generation: 0 });
        let mut older = XrefTable::new();
        older.insert(1, XrefEntry::InUse { offset: 15, generation: 0 });
        older.insert(2, XrefEntry::InUse { offset: 80, generation: 0 });

        newer.merge_older(older);
        assert_eq!(newer.get(1).unwrap().offset(), Some(900));
        assert_eq!(newer.get(2).unwrap().offset(), Some(80));
    }

    #[test]
    fn test_xref_stream_entries() {
        // W = [1 2 1], two entries: free head, in-use at 0x0102 gen 0
        let data = [0u8, 0, 0, 255, 1, 1, 2, 0];
        let table = parse_xref_stream_data(&data, [1, 2, 1], &[(0, 2)]).unwrap();
        assert!(table.get(0).unwrap().is_free());
        assert_eq!(table.get(1).unwrap().offset(), Some(0x0102));
    }

    #[test]
    fn test_xref_stream_default_type() {
        // W = [0 2 1]: type field missing, defaults to in-use
        let data = [0, 64, 0];
        let table = parse_xref_stream_data(&data, [0, 2, 1], &[(3, 1)]).unwrap();
        assert_eq!(table.get(3).unwrap().offset(), Some(64));
    }

    #[test]
    fn test_xref_stream_in_stream_entry() {
        let data = [2, 0, 9, 0, 4];
        let table = parse_xref_stream_data(&data, [1, 2, 2], &[(7, 1)]).unwrap();
        assert_eq!(
            table.get(7),
            Some(&XrefEntry::InStream {
                stream_id: 9,
                index: 4
            })
        );
    }

    #[test]
    fn test_find_startxref() {
        let data = b"%PDF-1.4\ncontent\nstartxref\n12345\n%%EOF\n";
        assert_eq!(find_startxref(data).unwrap(), 12345);
    }

    #[test]
    fn test_find_startxref_requires_eof() {
        assert!(find_startxref(b"startxref\n12345\n").is_err());
    }

    #[test]
    fn test_rebuild_by_scan() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n";
        let recovery = rebuild_by_scan(data);
        assert_eq!(recovery.table.len(), 3);
        assert_eq!(recovery.catalog_id, Some(1));
        let offset = recovery.table.get(1).unwrap().offset().unwrap();
        assert!(data[offset as usize..].starts_with(b"1 0 obj"));
        // the mandatory head entry is synthesized alongside the found objects
        assert_eq!(
            recovery.table.get(0),
            Some(&XrefEntry::Free {
                next_free: 0,
                generation: ObjectId::TERMINAL_GENERATION,
            })
        );
    }

    #[test]
    fn test_rebuild_later_header_wins() {
        let data = b"3 0 obj\n<< /A 1 >>\nendobj\njunk\n3 0 obj\n<< /A 2 >>\nendobj\n";
        let recovery = rebuild_by_scan(data);
        let offset = recovery.table.get(3).unwrap().offset().unwrap();
        assert!(offset > 10);
    }
}
