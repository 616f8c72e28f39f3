//! PDF parsing: discovery, the xref engine, and object resolution.
//!
//! Reading is lazy. Opening a document parses the header, walks the xref
//! chain (or rebuilds it by scanning when the chain is broken), and
//! authenticates against the encryption dictionary when one is present.
//! Objects are parsed on demand from their recorded byte offsets; stream
//! payloads are materialized only when asked for, through the declared
//! filter chain, with decryption applied first.

mod lexer;
mod objects;
mod pages;
mod trailer;
mod xref;

pub use trailer::Trailer;
pub use xref::{XrefEntry, XrefTable};

use crate::diagnostics::{DiagnosticKind, DiagnosticSink, NullSink};
use crate::encryption::SecurityHandler;
use crate::error::{ParseError, PdfResult};
use crate::filters::FilterSpec;
use crate::io::{read_to_end, FileReader};
use crate::object::{Object, PdfArray, PdfDictionary, PdfStream, PdfString, StreamPayload};
use crate::types::{ObjectId, PdfVersion};
use objects::parse_indirect_object;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use trailer::parse_trailer;
use xref::{find_startxref, parse_xref_table, rebuild_by_scan};

// A /Prev chain longer than this is treated as a cycle by other means.
const MAX_XREF_SECTIONS: usize = 1024;

/// A parsed PDF document with read-only access to its objects.
pub struct PdfReader {
    data: Vec<u8>,
    version: PdfVersion,
    xref: XrefTable,
    trailer: Trailer,
    startxref: u64,
    security: Option<SecurityHandler>,
    encrypt_id: Option<ObjectId>,
    cache: RefCell<HashMap<u32, Object>>,
    diagnostics: RefCell<Box<dyn DiagnosticSink>>,
}

impl std::fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReader")
            .field("version", &self.version)
            .field("size", &self.trailer.size)
            .field("encrypted", &self.security.is_some())
            .finish()
    }
}

impl PdfReader {
    /// Opens a PDF file.
    pub fn from_file(path: impl AsRef<Path>) -> PdfResult<Self> {
        let mut reader = FileReader::open(path)?;
        let data = read_to_end(&mut reader)?;
        Self::from_bytes(data)
    }

    /// Opens a PDF from bytes with an empty password.
    pub fn from_bytes(data: Vec<u8>) -> PdfResult<Self> {
        Self::open(data, "", Box::new(NullSink))
    }

    /// Opens a PDF from bytes, authenticating with the given password when
    /// the document is encrypted.
    pub fn from_bytes_with_password(data: Vec<u8>, password: &str) -> PdfResult<Self> {
        Self::open(data, password, Box::new(NullSink))
    }

    /// Opens a PDF with a caller-supplied diagnostic sink.
    pub fn open(
        data: Vec<u8>,
        password: &str,
        sink: Box<dyn DiagnosticSink>,
    ) -> PdfResult<Self> {
        let diagnostics = RefCell::new(sink);
        let version = Self::parse_header(&data)?;
        let startxref = find_startxref(&data).unwrap_or(0);

        let (xref, trailer) = match Self::build_xref(&data) {
            Ok(built) => built,
            Err(err) => {
                diagnostics.borrow_mut().report(
                    DiagnosticKind::XrefRepaired,
                    &format!("xref chain unusable ({}), rebuilt by scan", err),
                );
                Self::recover(&data)?
            }
        };

        let mut reader = Self {
            data,
            version,
            xref,
            trailer,
            startxref,
            security: None,
            encrypt_id: None,
            cache: RefCell::new(HashMap::new()),
            diagnostics,
        };

        if let Some(encrypt_ref) = reader.trailer.encrypt {
            let encrypt_obj = reader.parse_at_entry(encrypt_ref.number)?;
            let encrypt_dict = match encrypt_obj {
                Object::Dictionary(d) => d,
                _ => {
                    return Err(ParseError::TypeMismatch {
                        expected: "dictionary",
                        context: "/Encrypt",
                    }
                    .into())
                }
            };
            let id_first = reader
                .trailer
                .id
                .as_ref()
                .map(|(first, _)| first.clone())
                .unwrap_or_default();
            let handler = SecurityHandler::authenticate(&encrypt_dict, &id_first, password)?;
            reader.security = Some(handler);
            reader.encrypt_id = Some(encrypt_ref);
        }

        Ok(reader)
    }

    fn parse_header(data: &[u8]) -> Result<PdfVersion, ParseError> {
        if data.len() < 8 || !data.starts_with(b"%PDF-") {
            return Err(ParseError::InvalidHeader);
        }
        let line_end = data[..data.len().min(16)]
            .iter()
            .position(|&c| c == b'\r' || c == b'\n')
            .unwrap_or(8);
        std::str::from_utf8(&data[5..line_end])
            .ok()
            .and_then(PdfVersion::parse)
            .ok_or(ParseError::InvalidHeader)
    }

    /// Walks the xref chain from `startxref`, following /Prev (and /XRefStm
    /// in hybrid files) with newer sections taking precedence.
    ///
    /// Sections merge in visit order and an id already present never gets
    /// overridden, so the FIFO queue is what makes "most recent wins" hold:
    /// the current section lands first, then its hybrid stream, then the
    /// /Prev chain.
    fn build_xref(data: &[u8]) -> Result<(XrefTable, Trailer), ParseError> {
        let mut combined = XrefTable::new();
        let mut final_trailer: Option<Trailer> = None;
        let mut visited: HashSet<u64> = HashSet::new();
        let mut queue: VecDeque<u64> = VecDeque::from([find_startxref(data)?]);

        while let Some(offset) = queue.pop_front() {
            if !visited.insert(offset) {
                return Err(ParseError::CorruptXref(format!(
                    "offset {} appears twice in the chain",
                    offset
                )));
            }
            if visited.len() > MAX_XREF_SECTIONS {
                return Err(ParseError::CorruptXref("chain too long".to_string()));
            }
            if offset as usize >= data.len() {
                return Err(ParseError::CorruptXref(format!(
                    "offset {} beyond end of file",
                    offset
                )));
            }

            let section = &data[offset as usize..];
            let (section_table, section_trailer) = if section.starts_with(b"xref") {
                let (rest, table) = parse_xref_table(section)
                    .map_err(|_| ParseError::CorruptXref("malformed classical table".to_string()))?;
                let (_, dict) = parse_trailer(data, rest)
                    .map_err(|_| ParseError::InvalidTrailer)?;
                let trailer = Trailer::from_dictionary(dict)?;
                // hybrid files point at a supplementary xref stream
                if let Some(stm_offset) = trailer.xref_stm {
                    queue.push_back(stm_offset);
                }
                (table, trailer)
            } else {
                Self::parse_xref_stream_section(data, section)?
            };

            if let Some(prev) = section_trailer.prev {
                queue.push_back(prev);
            }
            combined.merge_older(section_table);
            if final_trailer.is_none() {
                final_trailer = Some(section_trailer);
            }
        }

        let trailer = final_trailer.ok_or(ParseError::InvalidTrailer)?;
        Ok((combined, trailer))
    }

    /// Parses one xref-stream section: an indirect stream object whose
    /// dictionary doubles as the trailer.
    fn parse_xref_stream_section(
        data: &[u8],
        section: &[u8],
    ) -> Result<(XrefTable, Trailer), ParseError> {
        let (_, (_, obj)) = parse_indirect_object(data, section).map_err(|_| {
            ParseError::CorruptXref("expected xref table or xref stream".to_string())
        })?;
        let stream = match obj {
            Object::Stream(s) => s,
            _ => {
                return Err(ParseError::CorruptXref(
                    "object at xref offset is not a stream".to_string(),
                ))
            }
        };

        match stream.dictionary.get_name("Type") {
            Some(name) if name.as_bytes() == b"XRef" => {}
            _ => {
                return Err(ParseError::CorruptXref(
                    "stream at xref offset lacks /Type /XRef".to_string(),
                ))
            }
        }

        // xref streams are never encrypted and their /Length is direct
        let length = stream
            .dictionary
            .get_integer("Length")
            .ok_or_else(|| ParseError::CorruptXref("xref stream without /Length".to_string()))?
            as usize;
        let start = stream
            .payload_position()
            .expect("parsed streams are positioned") as usize;
        if start + length > data.len() {
            return Err(ParseError::CorruptXref(
                "xref stream payload truncated".to_string(),
            ));
        }
        let raw = &data[start..start + length];

        let chain = FilterSpec::chain_from_objects(
            stream.dictionary.get("Filter"),
            stream.dictionary.get("DecodeParms"),
        )
        .map_err(|e| ParseError::CorruptXref(e.to_string()))?;
        let decoded = crate::filters::decode_chain(raw, &chain)
            .map_err(|e| ParseError::CorruptXref(e.to_string()))?;

        let (w, index) = xref::xref_stream_layout(&stream.dictionary)?;
        let table = xref::parse_xref_stream_data(&decoded, w, &index)?;
        let trailer = Trailer::from_dictionary(stream.dictionary)?;
        Ok((table, trailer))
    }

    /// Linear-scan fallback: rebuild the table from object headers and
    /// synthesize a trailer.
    fn recover(data: &[u8]) -> PdfResult<(XrefTable, Trailer)> {
        let recovery = rebuild_by_scan(data);
        if recovery.table.is_empty() {
            return Err(ParseError::CorruptXref("nothing recoverable by scan".to_string()).into());
        }

        // prefer the last trailer dictionary that names a root
        for dict in recovery.trailer_dicts.iter().rev() {
            let mut dict = dict.clone();
            dict.set("Size", Object::Integer(recovery.table.max_id() as i64 + 1));
            if let Ok(trailer) = Trailer::from_dictionary(dict) {
                return Ok((recovery.table, trailer));
            }
        }

        // otherwise fall back to the catalog the scan saw
        let catalog_id = recovery
            .catalog_id
            .ok_or_else(|| ParseError::CorruptXref("no catalog found by scan".to_string()))?;
        let mut dict = PdfDictionary::new();
        dict.set("Root", Object::Reference(ObjectId::new(catalog_id)));
        dict.set("Size", Object::Integer(recovery.table.max_id() as i64 + 1));
        let trailer = Trailer::from_dictionary(dict)?;
        Ok((recovery.table, trailer))
    }

    /// The PDF version from the header.
    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// The typed trailer.
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// The cross-reference table.
    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    /// True when the document carries an encryption dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.security.is_some()
    }

    /// The raw file bytes.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Offset of the primary xref section, as named by `startxref`. An
    /// incremental update carries this in its /Prev entry.
    pub fn startxref_offset(&self) -> u64 {
        self.startxref
    }

    fn report(&self, kind: DiagnosticKind, message: &str) {
        self.diagnostics.borrow_mut().report(kind, message);
    }

    /// Resolves an object by number, consulting the table.
    ///
    /// Free and undefined ids resolve to null, never to an error.
    pub fn resolve_number(&self, number: u32) -> PdfResult<Object> {
        if let Some(cached) = self.cache.borrow().get(&number) {
            return Ok(cached.clone());
        }

        let resolved = match self.xref.get(number) {
            Some(XrefEntry::InUse { .. }) => {
                let mut obj = self.parse_at_entry(number)?;
                if let Some(security) = &self.security {
                    let skip = self.encrypt_id.map(|id| id.number) == Some(number);
                    if !skip {
                        let entry_generation = match self.xref.get(number) {
                            Some(XrefEntry::InUse { generation, .. }) => *generation,
                            _ => 0,
                        };
                        let owner = ObjectId::with_generation(number, entry_generation);
                        obj = decrypt_strings(obj, owner, security)?;
                    }
                }
                obj
            }
            Some(XrefEntry::InStream { stream_id, index }) => {
                self.resolve_in_object_stream(*stream_id, *index)?
            }
            Some(XrefEntry::Free { .. }) | None => Object::Null,
        };

        self.cache.borrow_mut().insert(number, resolved.clone());
        Ok(resolved)
    }

    /// Resolves a reference id, checking the generation against the table.
    pub fn resolve(&self, id: ObjectId) -> PdfResult<Object> {
        if id.is_free_list_head() {
            return Ok(Object::Null);
        }
        if let Some(XrefEntry::InUse { generation, .. }) = self.xref.get(id.number) {
            if *generation != id.generation {
                // a stale reference into an older generation reads as null
                return Ok(Object::Null);
            }
        }
        self.resolve_number(id.number)
    }

    /// Follows a reference one step; other objects pass through unchanged.
    pub fn resolve_object(&self, obj: &Object) -> PdfResult<Object> {
        match obj {
            Object::Reference(id) => self.resolve(*id),
            other => Ok(other.clone()),
        }
    }

    /// Parses the body of an in-use entry, verifying the header.
    fn parse_at_entry(&self, number: u32) -> PdfResult<Object> {
        let entry = self
            .xref
            .get(number)
            .copied()
            .ok_or_else(|| ParseError::ObjectParse(0, format!("object {} not in table", number)))?;
        let offset = match entry {
            XrefEntry::InUse { offset, .. } => offset,
            _ => {
                return Err(
                    ParseError::ObjectParse(0, format!("object {} is not at an offset", number))
                        .into(),
                )
            }
        };
        if offset as usize >= self.data.len() {
            return Err(ParseError::ObjectParse(offset, "offset beyond end of file".to_string())
                .into());
        }

        let (_, (parsed_id, obj)) = parse_indirect_object(&self.data, &self.data[offset as usize..])
            .map_err(|e| objects::classify_error(offset, e))?;

        if parsed_id.number != number {
            self.report(
                DiagnosticKind::ObjectHeaderMismatch,
                &format!(
                    "entry for object {} points at header of object {}",
                    number, parsed_id.number
                ),
            );
            return Err(ParseError::CorruptXref(format!(
                "object {} resolves to a header for object {}",
                number, parsed_id.number
            ))
            .into());
        }
        Ok(obj)
    }

    /// Resolves one object out of an object stream.
    fn resolve_in_object_stream(&self, stream_id: u32, index: u32) -> PdfResult<Object> {
        // the container must itself sit at a file offset
        match self.xref.get(stream_id) {
            Some(XrefEntry::InUse { .. }) => {}
            Some(XrefEntry::InStream { .. }) => {
                return Err(ParseError::InvalidObjectStream(format!(
                    "object stream {} is itself inside an object stream",
                    stream_id
                ))
                .into())
            }
            _ => return Ok(Object::Null),
        }

        let container = self.parse_at_entry(stream_id)?;
        let stream = match container {
            Object::Stream(s) => s,
            other => {
                return Err(ParseError::InvalidObjectStream(format!(
                    "object {} is a {}, not a stream",
                    stream_id,
                    other.type_label()
                ))
                .into())
            }
        };
        match stream.dictionary.get_name("Type") {
            Some(name) if name.as_bytes() == b"ObjStm" => {}
            _ => {
                return Err(
                    ParseError::InvalidObjectStream("missing /Type /ObjStm".to_string()).into(),
                )
            }
        }

        let count = stream
            .dictionary
            .get_integer("N")
            .ok_or_else(|| ParseError::InvalidObjectStream("missing /N".to_string()))?
            as usize;
        let first = stream
            .dictionary
            .get_integer("First")
            .ok_or_else(|| ParseError::InvalidObjectStream("missing /First".to_string()))?
            as usize;

        let payload = self.stream_data_with_owner(&stream, ObjectId::new(stream_id))?;
        if first > payload.len() {
            return Err(
                ParseError::InvalidObjectStream("/First beyond payload".to_string()).into(),
            );
        }

        // header: N pairs of (object number, relative offset)
        let header = &payload[..first];
        let numbers: Vec<i64> = std::str::from_utf8(header)
            .ok()
            .map(|s| s.split_whitespace().filter_map(|t| t.parse().ok()).collect())
            .unwrap_or_default();
        if numbers.len() < count * 2 || (index as usize) >= count {
            return Err(ParseError::InvalidObjectStream(format!(
                "index {} outside {} packed objects",
                index, count
            ))
            .into());
        }

        let rel = numbers[index as usize * 2 + 1] as usize;
        let at = first + rel;
        if at > payload.len() {
            return Err(
                ParseError::InvalidObjectStream("entry offset beyond payload".to_string()).into(),
            );
        }

        // strings inside the payload were covered by the container's key
        // when the payload was decrypted, so no per-string pass here
        let (_, obj) = objects::parse_object(&payload, &payload[at..])
            .map_err(|e| ParseError::InvalidObjectStream(format!("{:?}", e)))?;
        Ok(obj)
    }

    /// Materializes a stream's payload: locate, decrypt, and run the filter
    /// chain. `owner` keys the decryption.
    pub fn stream_data_with_owner(
        &self,
        stream: &PdfStream,
        owner: ObjectId,
    ) -> PdfResult<Vec<u8>> {
        let raw = self.raw_stream_data(stream, owner)?;
        let filter = self.resolve_object(stream.dictionary.get("Filter").unwrap_or(&Object::Null))?;
        let parms = self
            .resolve_object(stream.dictionary.get("DecodeParms").unwrap_or(&Object::Null))?;
        let chain = FilterSpec::chain_from_objects(
            (!filter.is_null()).then_some(&filter),
            (!parms.is_null()).then_some(&parms),
        )?;
        Ok(crate::filters::decode_chain(&raw, &chain)?)
    }

    /// Returns the stored (still encoded) payload bytes, decrypted but with
    /// no filters applied.
    pub fn raw_stream_data(&self, stream: &PdfStream, owner: ObjectId) -> PdfResult<Vec<u8>> {
        let raw = match &stream.payload {
            StreamPayload::Bytes(bytes) => return Ok(bytes.clone()),
            StreamPayload::Position(pos) => {
                let pos = *pos as usize;
                let length = self
                    .resolve_object(
                        stream
                            .dictionary
                            .get("Length")
                            .ok_or(crate::error::ObjectError::StreamMissingLength)?,
                    )?
                    .as_integer()
                    .ok_or(crate::error::ObjectError::StreamMissingLength)?;
                if length < 0 {
                    return Err(ParseError::CorruptStream("negative /Length".to_string()).into());
                }
                let length = self.repair_length(pos, length as usize)?;

                if pos > 0 && self.data[pos - 1] == b'\r' && self.data.get(pos) != Some(&b'\n') {
                    self.report(
                        DiagnosticKind::LoneCarriageReturn,
                        &format!("stream payload at {} delimited by lone CR", pos),
                    );
                }
                self.data[pos..pos + length].to_vec()
            }
        };

        match &self.security {
            Some(security) => Ok(security.decrypt_stream(&raw, owner)?),
            None => Ok(raw),
        }
    }

    /// Validates a declared payload length against the actual `endstream`
    /// position, repairing it when they disagree.
    fn repair_length(&self, pos: usize, declared: usize) -> PdfResult<usize> {
        let fits = pos + declared <= self.data.len();
        if fits {
            let after = &self.data[pos + declared..];
            let trimmed = match after.iter().position(|&c| !lexer::is_whitespace(c)) {
                Some(n) => &after[n..],
                None => after,
            };
            if trimmed.starts_with(b"endstream") {
                return Ok(declared);
            }
        }

        // scan forward for the keyword and trust it over /Length
        let window = &self.data[pos..];
        let found = window
            .windows(9)
            .position(|w| w == b"endstream")
            .ok_or_else(|| {
                ParseError::CorruptStream(format!(
                    "no endstream after payload at offset {}",
                    pos
                ))
            })?;
        // back off the EOL that separates payload from keyword
        let mut end = found;
        if end > 0 && window[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && window[end - 1] == b'\r' {
            end -= 1;
        }
        self.report(
            DiagnosticKind::StreamLengthRepaired,
            &format!(
                "stream at {} declared {} bytes, actual {}",
                pos, declared, end
            ),
        );
        Ok(end)
    }
}

/// Walks an object, decrypting every string under the owner's key.
fn decrypt_strings(
    obj: Object,
    owner: ObjectId,
    security: &SecurityHandler,
) -> PdfResult<Object> {
    Ok(match obj {
        Object::String(s) => {
            let decrypted = security.decrypt_string(s.as_bytes(), owner)?;
            Object::String(match s {
                PdfString::Literal(_) => PdfString::Literal(decrypted),
                PdfString::Hex(_) => PdfString::Hex(decrypted),
            })
        }
        Object::Array(arr) => {
            let mut out = PdfArray::with_capacity(arr.len());
            for element in arr {
                out.push(decrypt_strings(element, owner, security)?);
            }
            Object::Array(out)
        }
        Object::Dictionary(dict) => {
            Object::Dictionary(decrypt_dictionary_strings(dict, owner, security)?)
        }
        Object::Stream(stream) => {
            let dictionary = decrypt_dictionary_strings(stream.dictionary, owner, security)?;
            Object::Stream(PdfStream {
                dictionary,
                payload: stream.payload,
            })
        }
        other => other,
    })
}

fn decrypt_dictionary_strings(
    dict: PdfDictionary,
    owner: ObjectId,
    security: &SecurityHandler,
) -> PdfResult<PdfDictionary> {
    let mut out = PdfDictionary::with_capacity(dict.len());
    for (key, value) in dict.iter() {
        out.set(key.clone(), decrypt_strings(value.clone(), owner, security)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // A handwritten minimal single-page file with a classical xref whose
    // offsets are patched in by the builder below.
    fn minimal_pdf() -> Vec<u8> {
        build_pdf(&[
            (1, b"<< /Type /Catalog /Pages 2 0 R >>".to_vec()),
            (2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec()),
            (
                3,
                b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_vec(),
            ),
        ])
    }

    // Assembles a well-formed file from (id, body) pairs.
    fn build_pdf(objects: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::new();
        for (id, body) in objects {
            offsets.push((*id, out.len()));
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref_at = out.len();
        let max = objects.iter().map(|(id, _)| *id).max().unwrap_or(0);
        out.extend_from_slice(format!("xref\n0 {}\n", max + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for id in 1..=max {
            let off = offsets.iter().find(|(n, _)| *n == id).map(|(_, o)| *o).unwrap_or(0);
            out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                max + 1,
                xref_at
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_open_minimal() {
        let reader = PdfReader::from_bytes(minimal_pdf()).unwrap();
        assert_eq!(reader.version(), PdfVersion::V1_4);
        assert_eq!(reader.trailer().size, 4);
        assert!(!reader.is_encrypted());
    }

    #[test]
    fn test_resolve_objects() {
        let reader = PdfReader::from_bytes(minimal_pdf()).unwrap();
        let catalog = reader.resolve_number(1).unwrap();
        let dict = catalog.as_dictionary().unwrap();
        assert_eq!(dict.get_name("Type").unwrap().as_bytes(), b"Catalog");

        // undefined and free ids read as null
        assert!(reader.resolve_number(0).unwrap().is_null());
        assert!(reader.resolve_number(99).unwrap().is_null());
    }

    #[test]
    fn test_resolve_reference_chain() {
        let reader = PdfReader::from_bytes(minimal_pdf()).unwrap();
        let catalog = reader.resolve_number(1).unwrap();
        let pages_ref = catalog.as_dictionary().unwrap().get("Pages").unwrap().clone();
        let pages = reader.resolve_object(&pages_ref).unwrap();
        assert_eq!(
            pages.as_dictionary().unwrap().get_integer("Count"),
            Some(1)
        );
    }

    #[test]
    fn test_invalid_header() {
        assert!(PdfReader::from_bytes(b"not a pdf at all".to_vec()).is_err());
    }

    #[test]
    fn test_corrupt_startxref_recovers_by_scan() {
        use crate::diagnostics::RecordingSink;
        let mut data = minimal_pdf();
        // smash the startxref digits
        let pos = data
            .windows(9)
            .rposition(|w| w == b"startxref")
            .unwrap();
        data[pos + 11] = b'x';

        let sink = RecordingSink::new();
        // open with a recording sink wired through a small shim
        struct Shim(std::rc::Rc<std::cell::RefCell<RecordingSink>>);
        impl DiagnosticSink for Shim {
            fn report(&mut self, kind: DiagnosticKind, message: &str) {
                self.0.borrow_mut().report(kind, message);
            }
        }
        let shared = std::rc::Rc::new(std::cell::RefCell::new(sink));
        let reader = PdfReader::open(data, "", Box::new(Shim(shared.clone()))).unwrap();

        assert!(shared.borrow().has(DiagnosticKind::XrefRepaired));
        let catalog = reader.resolve_number(1).unwrap();
        assert!(catalog.as_dictionary().unwrap().contains_key("Pages"));
    }

    #[test]
    fn test_stream_length_as_reference() {
        let data = build_pdf(&[
            (1, b"<< /Type /Catalog /Pages 2 0 R >>".to_vec()),
            (2, b"<< /Type /Pages /Kids [] /Count 0 >>".to_vec()),
            (3, b"<< /Length 4 0 R >>\nstream\nHello, indirect length\nendstream".to_vec()),
            (4, b"22".to_vec()),
        ]);
        let reader = PdfReader::from_bytes(data).unwrap();
        let obj = reader.resolve_number(3).unwrap();
        let stream = obj.as_stream().unwrap();
        let payload = reader
            .stream_data_with_owner(stream, ObjectId::new(3))
            .unwrap();
        assert_eq!(payload, b"Hello, indirect length");
    }

    #[test]
    fn test_stream_length_repair() {
        use crate::diagnostics::RecordingSink;
        struct Shim(std::rc::Rc<std::cell::RefCell<RecordingSink>>);
        impl DiagnosticSink for Shim {
            fn report(&mut self, kind: DiagnosticKind, message: &str) {
                self.0.borrow_mut().report(kind, message);
            }
        }

        let data = build_pdf(&[
            (1, b"<< /Type /Catalog /Pages 2 0 R >>".to_vec()),
            (2, b"<< /Type /Pages /Kids [] /Count 0 >>".to_vec()),
            // declared length is wrong; the keyword is the truth
            (3, b"<< /Length 99 >>\nstream\nshort\nendstream".to_vec()),
        ]);
        let shared = std::rc::Rc::new(std::cell::RefCell::new(RecordingSink::new()));
        let reader = PdfReader::open(data, "", Box::new(Shim(shared.clone()))).unwrap();
        let obj = reader.resolve_number(3).unwrap();
        let payload = reader
            .stream_data_with_owner(obj.as_stream().unwrap(), ObjectId::new(3))
            .unwrap();
        assert_eq!(payload, b"short");
        assert!(shared.borrow().has(DiagnosticKind::StreamLengthRepaired));
    }
}
