//! PDF assembly: the indirect-object registry, the object write context,
//! and trailer/xref emission on finalization.
//!
//! A writer session is a strict state machine. One indirect object may be
//! open at a time; dictionaries and arrays nest inside it; a stream installs
//! a payload writer whose bytes run through the configured compression and,
//! when encryption is active, the cipher outside the compression. Stream
//! /Length entries are always indirect and filled in after the payload is
//! committed. Finalizing sweeps the registry into a classical xref section
//! or an xref stream, then emits the trailer and `startxref`.

mod copying;
mod primitives;
mod registry;

pub use copying::CopyingContext;
pub use primitives::{PrimitiveWriter, Separator};
pub use registry::{ObjectRegistry, ObjectState, RegistryEntry};

use crate::encryption::{generate_file_id, EncryptionConfig, SecurityHandler};
use crate::error::{PdfError, PdfResult, WriterError};
use crate::filters::{encode_one, FilterKind};
use crate::object::{Object, PdfArray, PdfDictionary, PdfName, PdfString, StreamPayload};
use crate::parser::PdfReader;
use crate::types::{ObjectId, PdfVersion};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// How the cross-reference section is serialized at the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefStyle {
    /// Classical table for versions up to 1.4, xref stream beyond.
    Auto,
    /// Always the classical `xref` table.
    Classical,
    /// Always a /Type /XRef stream.
    Stream,
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub version: PdfVersion,
    pub xref_style: XrefStyle,
    /// Flate-compress stream payloads that declare no filter of their own.
    pub compress_streams: bool,
    pub encryption: Option<EncryptionConfig>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            version: PdfVersion::default(),
            xref_style: XrefStyle::Auto,
            compress_streams: false,
            encryption: None,
        }
    }
}

enum Frame {
    IndirectObject { id: ObjectId, has_body: bool },
    Dictionary { expecting_key: bool },
    Array,
    Stream { length_id: ObjectId, payload: Vec<u8>, filtered: bool },
}

struct IncrementalBase {
    prev_startxref: u64,
    root: ObjectId,
    info: Option<ObjectId>,
    id_first: Vec<u8>,
}

/// A PDF document writer.
pub struct PdfWriter<W: Write> {
    out: PrimitiveWriter<W>,
    registry: ObjectRegistry,
    config: WriterConfig,
    security: Option<SecurityHandler>,
    file_id: (Vec<u8>, Vec<u8>),
    frames: Vec<Frame>,
    pending_lengths: Vec<(ObjectId, u64)>,
    incremental: Option<IncrementalBase>,
    failed: Option<String>,
}

impl PdfWriter<BufWriter<File>> {
    /// Creates a writer over a new file.
    pub fn create_file(path: impl AsRef<Path>, config: WriterConfig) -> PdfResult<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), config)
    }
}

impl PdfWriter<Vec<u8>> {
    /// Creates a writer over an in-memory buffer.
    pub fn create_memory(config: WriterConfig) -> PdfResult<Self> {
        Self::new(Vec::new(), config)
    }
}

impl<W: Write> PdfWriter<W> {
    /// Creates a writer and emits the header.
    pub fn new(sink: W, config: WriterConfig) -> PdfResult<Self> {
        let file_id = (generate_file_id(), generate_file_id());
        let security = match &config.encryption {
            Some(encryption) => Some(SecurityHandler::for_writing(encryption, &file_id.0)?),
            None => None,
        };

        let mut writer = Self {
            out: PrimitiveWriter::new(sink),
            registry: ObjectRegistry::new(),
            config,
            security,
            file_id,
            frames: Vec::new(),
            pending_lengths: Vec::new(),
            incremental: None,
            failed: None,
        };
        writer.write_header()?;
        Ok(writer)
    }

    /// Opens a parsed document for modification. The source bytes are copied
    /// to the sink verbatim and everything written afterwards becomes an
    /// incremental update section: new objects, rewrites of source ids, a
    /// delta xref with /Prev, and a trailer that keeps the first document id
    /// half.
    pub fn modify(source: &PdfReader, sink: W, mut config: WriterConfig) -> PdfResult<Self> {
        if source.is_encrypted() || config.encryption.is_some() {
            return Err(crate::error::EncryptionError::Unsupported(
                "incremental update of encrypted documents".to_string(),
            )
            .into());
        }
        config.version = config.version.max(source.version());

        let trailer = source.trailer().clone();
        let id_first = trailer
            .id
            .as_ref()
            .map(|(first, _)| first.clone())
            .unwrap_or_else(generate_file_id);

        let mut out = PrimitiveWriter::new(sink);
        out.write_bytes(source.raw_data())?;
        // keep the appended section off the source's last line
        out.write_bytes(b"\n")?;

        Ok(Self {
            out,
            registry: ObjectRegistry::for_incremental(trailer.size),
            config,
            security: None,
            file_id: (id_first.clone(), generate_file_id()),
            frames: Vec::new(),
            pending_lengths: Vec::new(),
            incremental: Some(IncrementalBase {
                prev_startxref: source.startxref_offset(),
                root: trailer.root,
                info: trailer.info,
                id_first,
            }),
            failed: None,
        })
    }

    fn write_header(&mut self) -> PdfResult<()> {
        self.out
            .write_comment(&format!("PDF-{}", self.config.version))?;
        // binary marker: four bytes above 0x7F
        self.out.write_bytes(b"%\xE2\xE3\xCF\xD3\n")?;
        Ok(())
    }

    fn check_live(&self) -> PdfResult<()> {
        match &self.failed {
            Some(reason) => Err(PdfError::AlreadyFailed(reason.clone())),
            None => Ok(()),
        }
    }

    fn fail<T>(&mut self, err: PdfError) -> PdfResult<T> {
        self.failed = Some(err.to_string());
        Err(err)
    }

    fn state_error<T>(&mut self, message: impl Into<String>) -> PdfResult<T> {
        let err = WriterError::InvalidState(message.into());
        self.fail(err.into())
    }

    /// Allocates the next object id.
    pub fn allocate(&mut self) -> ObjectId {
        self.registry.allocate()
    }

    /// The registry, for inspection.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Current output position.
    pub fn position(&self) -> u64 {
        self.out.position()
    }

    // ---- object write context ------------------------------------------

    /// Allocates an id and opens an indirect object for it.
    pub fn start_new_indirect_object(&mut self) -> PdfResult<ObjectId> {
        let id = self.registry.allocate();
        self.start_indirect_object(id)?;
        Ok(id)
    }

    /// Opens an indirect object for a previously allocated id, recording its
    /// offset in the registry.
    pub fn start_indirect_object(&mut self, id: ObjectId) -> PdfResult<()> {
        self.check_live()?;
        if !self.frames.is_empty() {
            return self.state_error("an indirect object is already open");
        }
        let offset = self.out.position();
        if let Err(e) = self.registry.mark_written(id, offset) {
            return self.fail(e.into());
        }
        self.out
            .write_keyword(&id.definition_string(), Separator::Newline)?;
        self.frames.push(Frame::IndirectObject {
            id,
            has_body: false,
        });
        Ok(())
    }

    /// Closes the open indirect object and flushes any deferred /Length
    /// objects committed by streams inside it.
    pub fn end_indirect_object(&mut self) -> PdfResult<()> {
        self.check_live()?;
        match self.frames.last() {
            Some(Frame::IndirectObject { has_body, .. }) => {
                if !*has_body {
                    return self.state_error("indirect object has no body");
                }
            }
            _ => return self.state_error("no indirect object open"),
        }
        self.frames.pop();
        self.out.write_keyword("endobj", Separator::Newline)?;

        let pending = std::mem::take(&mut self.pending_lengths);
        for (length_id, value) in pending {
            self.start_indirect_object(length_id)?;
            self.write_integer(value as i64)?;
            self.end_indirect_object()?;
        }
        Ok(())
    }

    fn before_value(&mut self) -> PdfResult<()> {
        match self.frames.last_mut() {
            Some(Frame::IndirectObject { has_body, .. }) => {
                if *has_body {
                    return self.state_error("indirect object already has a body");
                }
                *has_body = true;
                Ok(())
            }
            Some(Frame::Dictionary { expecting_key }) => {
                if *expecting_key {
                    return self.state_error("dictionary expects a key, not a value");
                }
                *expecting_key = true;
                Ok(())
            }
            Some(Frame::Array) => Ok(()),
            Some(Frame::Stream { .. }) => {
                self.state_error("stream payload is open; write bytes or end it")
            }
            None => self.state_error("no container open for a value"),
        }
    }

    /// Writes a dictionary key. Valid only directly inside a dictionary that
    /// is waiting for one.
    pub fn write_key(&mut self, key: impl Into<PdfName>) -> PdfResult<()> {
        self.check_live()?;
        match self.frames.last_mut() {
            Some(Frame::Dictionary { expecting_key }) if *expecting_key => {
                *expecting_key = false;
            }
            Some(Frame::Dictionary { .. }) => {
                return self.state_error("dictionary expects a value, not a key")
            }
            _ => return self.state_error("no dictionary open"),
        }
        self.out.write_name(&key.into(), Separator::Space)?;
        Ok(())
    }

    /// Opens a dictionary.
    pub fn start_dictionary(&mut self) -> PdfResult<()> {
        self.check_live()?;
        self.before_value()?;
        self.out.write_keyword("<<", Separator::Space)?;
        self.frames.push(Frame::Dictionary {
            expecting_key: true,
        });
        Ok(())
    }

    /// Closes the open dictionary.
    pub fn end_dictionary(&mut self) -> PdfResult<()> {
        self.check_live()?;
        match self.frames.last() {
            Some(Frame::Dictionary { expecting_key }) => {
                if !*expecting_key {
                    return self.state_error("dictionary key is missing its value");
                }
            }
            _ => return self.state_error("no dictionary open"),
        }
        self.frames.pop();
        // trailing separator so the next token cannot join the closer
        self.out.write_keyword(">>", Separator::Newline)?;
        Ok(())
    }

    /// Opens an array.
    pub fn start_array(&mut self) -> PdfResult<()> {
        self.check_live()?;
        self.before_value()?;
        self.out.write_keyword("[", Separator::None)?;
        self.frames.push(Frame::Array);
        Ok(())
    }

    /// Closes the open array.
    pub fn end_array(&mut self) -> PdfResult<()> {
        self.check_live()?;
        match self.frames.last() {
            Some(Frame::Array) => {}
            _ => return self.state_error("no array open"),
        }
        self.frames.pop();
        self.out.write_keyword("]", Separator::Space)?;
        Ok(())
    }

    /// Writes one scalar value in the current container.
    fn write_value(&mut self, obj: &Object) -> PdfResult<()> {
        self.check_live()?;
        self.before_value()?;
        self.out.write_direct_object(obj, Separator::Space)?;
        Ok(())
    }

    pub fn write_null(&mut self) -> PdfResult<()> {
        self.write_value(&Object::Null)
    }

    pub fn write_boolean(&mut self, value: bool) -> PdfResult<()> {
        self.write_value(&Object::Boolean(value))
    }

    pub fn write_integer(&mut self, value: i64) -> PdfResult<()> {
        self.write_value(&Object::Integer(value))
    }

    pub fn write_real(&mut self, value: f64) -> PdfResult<()> {
        self.write_value(&Object::Real(value))
    }

    pub fn write_name(&mut self, name: impl Into<PdfName>) -> PdfResult<()> {
        self.write_value(&Object::Name(name.into()))
    }

    pub fn write_literal_string(&mut self, bytes: impl AsRef<[u8]>) -> PdfResult<()> {
        let string = self.maybe_encrypt_string(PdfString::Literal(bytes.as_ref().to_vec()))?;
        self.write_value(&Object::String(string))
    }

    pub fn write_hex_string(&mut self, bytes: impl AsRef<[u8]>) -> PdfResult<()> {
        let string = self.maybe_encrypt_string(PdfString::Hex(bytes.as_ref().to_vec()))?;
        self.write_value(&Object::String(string))
    }

    pub fn write_reference(&mut self, id: ObjectId) -> PdfResult<()> {
        self.write_value(&Object::Reference(id))
    }

    /// Writes a whole direct object (no streams) in the current container,
    /// encrypting any strings inside it.
    pub fn write_direct_object(&mut self, obj: &Object) -> PdfResult<()> {
        self.check_live()?;
        if matches!(obj, Object::Stream(_)) {
            return self.state_error("streams are written with start_stream/end_stream");
        }
        let prepared = match (&self.security, self.current_object_id()) {
            (Some(_), Some(owner)) => self.encrypt_object_strings(obj.clone(), owner)?,
            _ => obj.clone(),
        };
        self.before_value()?;
        self.out.write_direct_object(&prepared, Separator::Space)?;
        Ok(())
    }

    fn current_object_id(&self) -> Option<ObjectId> {
        self.frames.iter().find_map(|f| match f {
            Frame::IndirectObject { id, .. } => Some(*id),
            _ => None,
        })
    }

    fn maybe_encrypt_string(&self, string: PdfString) -> PdfResult<PdfString> {
        match (&self.security, self.current_object_id()) {
            (Some(security), Some(owner)) => {
                let encrypted = security.encrypt_string(string.as_bytes(), owner)?;
                Ok(match string {
                    PdfString::Literal(_) => PdfString::Literal(encrypted),
                    PdfString::Hex(_) => PdfString::Hex(encrypted),
                })
            }
            _ => Ok(string),
        }
    }

    fn encrypt_object_strings(&self, obj: Object, owner: ObjectId) -> PdfResult<Object> {
        let security = match &self.security {
            Some(s) => s,
            None => return Ok(obj),
        };
        fn walk(
            obj: Object,
            owner: ObjectId,
            security: &SecurityHandler,
        ) -> PdfResult<Object> {
            Ok(match obj {
                Object::String(s) => {
                    let encrypted = security.encrypt_string(s.as_bytes(), owner)?;
                    Object::String(match s {
                        PdfString::Literal(_) => PdfString::Literal(encrypted),
                        PdfString::Hex(_) => PdfString::Hex(encrypted),
                    })
                }
                Object::Array(arr) => {
                    let mut out = PdfArray::with_capacity(arr.len());
                    for element in arr {
                        out.push(walk(element, owner, security)?);
                    }
                    Object::Array(out)
                }
                Object::Dictionary(dict) => {
                    let mut out = PdfDictionary::with_capacity(dict.len());
                    for (key, value) in dict.iter() {
                        out.set(key.clone(), walk(value.clone(), owner, security)?);
                    }
                    Object::Dictionary(out)
                }
                other => other,
            })
        }
        walk(obj, owner, security)
    }

    /// Starts a stream inside the open indirect object. The header
    /// dictionary is emitted with an indirect /Length that is filled in at
    /// `end_indirect_object` time; the payload then accumulates through
    /// `write_stream_data` and runs through compression and encryption when
    /// the stream ends.
    pub fn start_stream(&mut self, header: &PdfDictionary) -> PdfResult<()> {
        self.check_live()?;
        match self.frames.last() {
            Some(Frame::IndirectObject { has_body: false, .. }) => {}
            _ => return self.state_error("streams open directly inside an indirect object"),
        }

        let owner = self.current_object_id().expect("frame checked above");
        let length_id = self.registry.allocate();
        let already_filtered = header.contains_key("Filter");

        let mut dict = header.clone();
        dict.remove("Length");
        if self.config.compress_streams && !already_filtered {
            dict.set("Filter", Object::Name("FlateDecode".into()));
        }
        let dict = match self.encrypt_object_strings(Object::Dictionary(dict), owner)? {
            Object::Dictionary(d) => d,
            _ => unreachable!("walk preserves the variant"),
        };

        match self.frames.last_mut() {
            Some(Frame::IndirectObject { has_body, .. }) => *has_body = true,
            _ => unreachable!("frame checked above"),
        }

        // emit << ... /Length n 0 R >> by hand so the deferred entry lands
        // inside the header
        self.out.write_keyword("<<", Separator::Space)?;
        for (key, value) in dict.iter() {
            self.out.write_name(key, Separator::Space)?;
            self.out.write_direct_object(value, Separator::Space)?;
        }
        self.out.write_name(&PdfName::from("Length"), Separator::Space)?;
        self.out.write_reference(length_id, Separator::Space)?;
        self.out.write_keyword(">>", Separator::Newline)?;
        self.out.write_bytes(b"stream\r\n")?;

        self.frames.push(Frame::Stream {
            length_id,
            payload: Vec::new(),
            filtered: already_filtered,
        });
        Ok(())
    }

    /// Appends payload bytes to the open stream.
    pub fn write_stream_data(&mut self, data: &[u8]) -> PdfResult<()> {
        self.check_live()?;
        match self.frames.last_mut() {
            Some(Frame::Stream { payload, .. }) => {
                payload.extend_from_slice(data);
                Ok(())
            }
            _ => self.state_error("no stream open"),
        }
    }

    /// Commits the stream: runs the payload through compression (unless the
    /// header declared its own filters) and the cipher, writes it, and
    /// records the final byte count for the deferred /Length.
    pub fn end_stream(&mut self) -> PdfResult<()> {
        self.check_live()?;
        let (length_id, payload, filtered) = match self.frames.pop() {
            Some(Frame::Stream {
                length_id,
                payload,
                filtered,
            }) => (length_id, payload, filtered),
            Some(other) => {
                self.frames.push(other);
                return self.state_error("no stream open");
            }
            None => return self.state_error("no stream open"),
        };

        let encoded = if self.config.compress_streams && !filtered {
            encode_one(FilterKind::Flate, &payload)?
        } else {
            payload
        };
        let committed = match (&self.security, self.current_object_id()) {
            (Some(security), Some(owner)) => security.encrypt_stream(&encoded, owner)?,
            _ => encoded,
        };

        self.out.write_bytes(&committed)?;
        self.out.write_bytes(b"\nendstream\n")?;
        self.pending_lengths.push((length_id, committed.len() as u64));
        Ok(())
    }

    // ---- whole-object convenience --------------------------------------

    /// Writes a complete object as the body of a fresh indirect object and
    /// returns its id.
    pub fn write_object(&mut self, obj: &Object) -> PdfResult<ObjectId> {
        let id = self.registry.allocate();
        self.write_object_with_id(id, obj)?;
        Ok(id)
    }

    /// Writes a complete object under a specific allocated id.
    pub fn write_object_with_id(&mut self, id: ObjectId, obj: &Object) -> PdfResult<()> {
        self.check_live()?;
        match obj {
            Object::Stream(stream) => {
                let bytes = match &stream.payload {
                    StreamPayload::Bytes(b) => b.clone(),
                    StreamPayload::Position(_) => {
                        return self.state_error(
                            "positioned stream payloads must be materialized before writing",
                        )
                    }
                };
                self.start_indirect_object(id)?;
                self.start_stream(&stream.dictionary)?;
                self.write_stream_data(&bytes)?;
                self.end_stream()?;
                self.end_indirect_object()
            }
            _ => {
                self.start_indirect_object(id)?;
                self.write_direct_object(obj)?;
                self.end_indirect_object()
            }
        }
    }

    // ---- finalization ---------------------------------------------------

    /// Finalizes a fresh document: xref, trailer, `startxref`, `%%EOF`.
    pub fn finalize(mut self, root: ObjectId, info: Option<ObjectId>) -> PdfResult<W> {
        self.check_live()?;
        if self.incremental.is_some() {
            return Err(WriterError::InvalidState(
                "incremental sessions end with finalize_incremental".to_string(),
            )
            .into());
        }
        self.finish(root, info, None)
    }

    /// Finalizes an incremental update, carrying /Prev and the preserved
    /// first document id half.
    pub fn finalize_incremental(mut self) -> PdfResult<W> {
        self.check_live()?;
        let base = match self.incremental.take() {
            Some(base) => base,
            None => {
                return Err(WriterError::InvalidState(
                    "writer is not in incremental mode".to_string(),
                )
                .into())
            }
        };
        self.file_id.0 = base.id_first.clone();
        self.finish(base.root, base.info, Some(base.prev_startxref))
    }

    fn finish(
        mut self,
        root: ObjectId,
        info: Option<ObjectId>,
        prev: Option<u64>,
    ) -> PdfResult<W> {
        if !self.frames.is_empty() {
            return Err(WriterError::InvalidState(
                "finalize with an object still open".to_string(),
            )
            .into());
        }

        // taking the handler first keeps the encryption dictionary itself
        // out of the cipher's reach
        let encrypt_id = match self.security.take() {
            Some(security) => {
                let dict = security.encryption_dictionary()?;
                let id = self.registry.allocate();
                self.write_object_with_id(id, &Object::Dictionary(dict))?;
                Some(id)
            }
            None => None,
        };

        let use_stream = match self.config.xref_style {
            XrefStyle::Classical => false,
            XrefStyle::Stream => true,
            XrefStyle::Auto => self.config.version.supports_xref_streams(),
        };

        if use_stream {
            self.finish_with_xref_stream(root, info, encrypt_id, prev)?;
        } else {
            self.finish_with_classical_xref(root, info, encrypt_id, prev)?;
        }

        self.out.flush()?;
        Ok(self.out.into_inner())
    }

    fn trailer_entries(
        &self,
        root: ObjectId,
        info: Option<ObjectId>,
        encrypt_id: Option<ObjectId>,
        prev: Option<u64>,
    ) -> PdfDictionary {
        let mut dict = PdfDictionary::new();
        dict.set("Size", Object::Integer(self.registry.size() as i64));
        dict.set("Root", Object::Reference(root));
        if let Some(info_id) = info {
            dict.set("Info", Object::Reference(info_id));
        }
        if let Some(encrypt) = encrypt_id {
            dict.set("Encrypt", Object::Reference(encrypt));
        }
        let mut id_array = PdfArray::with_capacity(2);
        id_array.push(Object::String(PdfString::Hex(self.file_id.0.clone())));
        id_array.push(Object::String(PdfString::Hex(self.file_id.1.clone())));
        dict.set("ID", Object::Array(id_array));
        if let Some(prev_offset) = prev {
            dict.set("Prev", Object::Integer(prev_offset as i64));
        }
        dict
    }

    fn finish_with_classical_xref(
        &mut self,
        root: ObjectId,
        info: Option<ObjectId>,
        encrypt_id: Option<ObjectId>,
        prev: Option<u64>,
    ) -> PdfResult<()> {
        let xref_offset = self.out.position();
        self.out.write_keyword("xref", Separator::Newline)?;

        if prev.is_none() {
            // full table: one subsection covering every id
            let size = self.registry.size();
            self.out
                .write_keyword(&format!("0 {}", size), Separator::Newline)?;
            for (number, entry) in self.registry.full_entries() {
                self.out.write_bytes(classical_entry_line(number, entry).as_bytes())?;
            }
        } else {
            // delta table: the free head plus runs of touched ids
            let touched = self.registry.touched_entries();
            let mut numbers: Vec<u32> = touched.iter().map(|(n, _)| *n).collect();
            numbers.sort_unstable();

            self.out.write_keyword("0 1", Separator::Newline)?;
            self.out.write_bytes(b"0000000000 65535 f \n")?;

            let mut i = 0;
            while i < numbers.len() {
                let start = numbers[i];
                let mut run = 1;
                while i + run < numbers.len() && numbers[i + run] == start + run as u32 {
                    run += 1;
                }
                self.out
                    .write_keyword(&format!("{} {}", start, run), Separator::Newline)?;
                for offset in 0..run {
                    let number = start + offset as u32;
                    let entry = self.registry.get(number).expect("touched id exists");
                    self.out.write_bytes(classical_entry_line(number, entry).as_bytes())?;
                }
                i += run;
            }
        }

        self.out.write_keyword("trailer", Separator::Newline)?;
        let dict = self.trailer_entries(root, info, encrypt_id, prev);
        self.out
            .write_direct_object(&Object::Dictionary(dict), Separator::Newline)?;
        self.write_startxref(xref_offset)
    }

    fn finish_with_xref_stream(
        &mut self,
        root: ObjectId,
        info: Option<ObjectId>,
        encrypt_id: Option<ObjectId>,
        prev: Option<u64>,
    ) -> PdfResult<()> {
        // the xref stream is itself an object and appears in its own table
        let xref_id = self.registry.allocate();
        let xref_offset = self.out.position();
        self.registry.mark_written(xref_id, xref_offset).map_err(PdfError::from)?;

        let mut numbers: Vec<u32> = if prev.is_none() {
            (0..self.registry.size()).collect()
        } else {
            let mut touched: Vec<u32> = self
                .registry
                .touched_entries()
                .iter()
                .map(|(n, _)| *n)
                .collect();
            touched.push(0);
            touched.sort_unstable();
            touched.dedup();
            touched
        };
        numbers.sort_unstable();

        // rows: type 1 byte, offset 4 bytes, generation 2 bytes
        let mut rows = Vec::with_capacity(numbers.len() * 7);
        let mut index = PdfArray::new();
        let mut i = 0;
        while i < numbers.len() {
            let start = numbers[i];
            let mut run = 1;
            while i + run < numbers.len() && numbers[i + run] == start + run as u32 {
                run += 1;
            }
            index.push(Object::Integer(start as i64));
            index.push(Object::Integer(run as i64));
            for offset in 0..run {
                let number = start + offset as u32;
                let entry = self.registry.get(number).expect("id in range");
                let (kind, field2, field3): (u8, u64, u16) = match entry.state {
                    ObjectState::Written if entry.offset.is_some() => {
                        (1, entry.offset.unwrap(), entry.generation)
                    }
                    _ => (
                        0,
                        0,
                        if number == 0 {
                            ObjectId::TERMINAL_GENERATION
                        } else {
                            entry.generation
                        },
                    ),
                };
                rows.push(kind);
                rows.extend_from_slice(&(field2 as u32).to_be_bytes());
                rows.extend_from_slice(&field3.to_be_bytes());
            }
            i += run;
        }

        let compressed = encode_one(FilterKind::Flate, &rows)?;

        let mut dict = self.trailer_entries(root, info, encrypt_id, prev);
        dict.set("Type", Object::Name("XRef".into()));
        let mut w = PdfArray::with_capacity(3);
        w.push(Object::Integer(1));
        w.push(Object::Integer(4));
        w.push(Object::Integer(2));
        dict.set("W", Object::Array(w));
        dict.set("Index", Object::Array(index));
        dict.set("Filter", Object::Name("FlateDecode".into()));
        dict.set("Length", Object::Integer(compressed.len() as i64));

        self.out
            .write_keyword(&xref_id.definition_string(), Separator::Newline)?;
        self.out
            .write_direct_object(&Object::Dictionary(dict), Separator::Newline)?;
        self.out.write_bytes(b"stream\r\n")?;
        self.out.write_bytes(&compressed)?;
        self.out.write_bytes(b"\nendstream\n")?;
        self.out.write_keyword("endobj", Separator::Newline)?;

        self.write_startxref(xref_offset)
    }

    fn write_startxref(&mut self, xref_offset: u64) -> PdfResult<()> {
        self.out.write_keyword("startxref", Separator::Newline)?;
        self.out
            .write_keyword(&xref_offset.to_string(), Separator::Newline)?;
        self.out.write_keyword("%%EOF", Separator::Newline)?;
        Ok(())
    }
}

fn classical_entry_line(number: u32, entry: &RegistryEntry) -> String {
    match entry.state {
        ObjectState::Written if entry.offset.is_some() => {
            format!("{:010} {:05} n \n", entry.offset.unwrap(), entry.generation)
        }
        _ => {
            let generation = if number == 0 {
                ObjectId::TERMINAL_GENERATION
            } else {
                entry.generation
            };
            format!("{:010} {:05} f \n", 0, generation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_writer() -> PdfWriter<Vec<u8>> {
        PdfWriter::create_memory(WriterConfig::default()).unwrap()
    }

    fn write_minimal(writer: &mut PdfWriter<Vec<u8>>) -> (ObjectId, ObjectId) {
        let catalog_id = writer.allocate();
        let pages_id = writer.allocate();

        writer.start_indirect_object(catalog_id).unwrap();
        writer.start_dictionary().unwrap();
        writer.write_key("Type").unwrap();
        writer.write_name("Catalog").unwrap();
        writer.write_key("Pages").unwrap();
        writer.write_reference(pages_id).unwrap();
        writer.end_dictionary().unwrap();
        writer.end_indirect_object().unwrap();

        writer.start_indirect_object(pages_id).unwrap();
        writer.start_dictionary().unwrap();
        writer.write_key("Type").unwrap();
        writer.write_name("Pages").unwrap();
        writer.write_key("Kids").unwrap();
        writer.start_array().unwrap();
        writer.end_array().unwrap();
        writer.write_key("Count").unwrap();
        writer.write_integer(0).unwrap();
        writer.end_dictionary().unwrap();
        writer.end_indirect_object().unwrap();

        (catalog_id, pages_id)
    }

    #[test]
    fn test_minimal_document_shape() {
        let mut writer = memory_writer();
        let (catalog_id, _) = write_minimal(&mut writer);
        let bytes = writer.finalize(catalog_id, None).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.contains("1 0 obj"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("xref"));
        assert!(text.contains("trailer"));
        assert!(text.contains("/Size 3"));
        assert!(text.contains("startxref"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn test_xref_offsets_point_at_headers() {
        let mut writer = memory_writer();
        let (catalog_id, _) = write_minimal(&mut writer);
        let bytes = writer.finalize(catalog_id, None).unwrap();

        let reader = PdfReader::from_bytes(bytes).unwrap();
        for number in 1..reader.trailer().size {
            if let Some(entry) = reader.xref().get(number) {
                if let Some(offset) = entry.offset() {
                    let header = format!("{} 0 obj", number);
                    assert!(
                        reader.raw_data()[offset as usize..].starts_with(header.as_bytes()),
                        "object {} offset {} does not point at its header",
                        number,
                        offset
                    );
                }
            }
        }
    }

    #[test]
    fn test_key_value_alternation_enforced() {
        let mut writer = memory_writer();
        writer.start_new_indirect_object().unwrap();
        writer.start_dictionary().unwrap();
        // a value with no key is a state error
        assert!(writer.write_integer(1).is_err());
    }

    #[test]
    fn test_end_dictionary_inside_array_rejected() {
        let mut writer = memory_writer();
        writer.start_new_indirect_object().unwrap();
        writer.start_array().unwrap();
        assert!(writer.end_dictionary().is_err());
    }

    #[test]
    fn test_two_open_objects_rejected() {
        let mut writer = memory_writer();
        let id = writer.allocate();
        let other = writer.allocate();
        writer.start_indirect_object(id).unwrap();
        assert!(writer.start_indirect_object(other).is_err());
    }

    #[test]
    fn test_failed_writer_latches() {
        let mut writer = memory_writer();
        writer.start_new_indirect_object().unwrap();
        writer.start_dictionary().unwrap();
        assert!(writer.write_integer(1).is_err());
        // every further call reports the latched failure
        assert!(matches!(
            writer.write_integer(2),
            Err(PdfError::AlreadyFailed(_))
        ));
    }

    #[test]
    fn test_stream_length_is_indirect_and_deferred() {
        let mut writer = memory_writer();
        let id = writer.allocate();
        writer.start_indirect_object(id).unwrap();
        let mut header = PdfDictionary::new();
        header.set("Type", Object::Name("XObject".into()));
        writer.start_stream(&header).unwrap();
        writer.write_stream_data(b"0 0 m 10 10 l S").unwrap();
        writer.end_stream().unwrap();
        writer.end_indirect_object().unwrap();

        let (catalog_id, _) = write_minimal(&mut writer);
        let bytes = writer.finalize(catalog_id, None).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Length 2 0 R"));
        assert!(text.contains("2 0 obj\n15"));

        // the reader resolves the indirect length
        let reader = PdfReader::from_bytes(bytes).unwrap();
        let obj = reader.resolve_number(1).unwrap();
        let payload = reader
            .stream_data_with_owner(obj.as_stream().unwrap(), ObjectId::new(1))
            .unwrap();
        assert_eq!(payload, b"0 0 m 10 10 l S");
    }

    #[test]
    fn test_compressed_stream_roundtrip() {
        let config = WriterConfig {
            compress_streams: true,
            ..WriterConfig::default()
        };
        let mut writer = PdfWriter::new(Vec::new(), config).unwrap();
        let id = writer.allocate();
        let body = b"BT /F1 12 Tf 72 720 Td (Hi) Tj ET ".repeat(20);
        writer.start_indirect_object(id).unwrap();
        writer.start_stream(&PdfDictionary::new()).unwrap();
        writer.write_stream_data(&body).unwrap();
        writer.end_stream().unwrap();
        writer.end_indirect_object().unwrap();

        let (catalog_id, _) = write_minimal(&mut writer);
        let bytes = writer.finalize(catalog_id, None).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/Filter /FlateDecode"));

        let reader = PdfReader::from_bytes(bytes).unwrap();
        let obj = reader.resolve_number(1).unwrap();
        let payload = reader
            .stream_data_with_owner(obj.as_stream().unwrap(), ObjectId::new(1))
            .unwrap();
        assert_eq!(payload, body);
    }

    #[test]
    fn test_xref_stream_finalize_roundtrip() {
        let config = WriterConfig {
            version: PdfVersion::V1_5,
            xref_style: XrefStyle::Stream,
            ..WriterConfig::default()
        };
        let mut writer = PdfWriter::new(Vec::new(), config).unwrap();
        let (catalog_id, _) = write_minimal(&mut writer);
        let bytes = writer.finalize(catalog_id, None).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Type /XRef"));
        assert!(!text.contains("trailer"));

        let reader = PdfReader::from_bytes(bytes).unwrap();
        let catalog = reader.resolve_number(1).unwrap();
        assert_eq!(
            catalog.as_dictionary().unwrap().get_name("Type").unwrap().as_bytes(),
            b"Catalog"
        );
    }

    #[test]
    fn test_write_object_convenience() {
        let mut writer = memory_writer();
        let id = writer
            .write_object(&Object::String(PdfString::literal("hello")))
            .unwrap();
        assert_eq!(id.number, 1);
        let (catalog_id, _) = write_minimal(&mut writer);
        let bytes = writer.finalize(catalog_id, None).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("(hello)"));
    }
}
