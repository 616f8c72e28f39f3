//! Copying objects from a parsed document into a writer.
//!
//! References are remapped through an injective source-to-destination map;
//! the first time a source id is seen it gets a destination id and joins a
//! pending queue, which `copy_new_objects` drains by deep-copying bodies
//! (and whatever they reference in turn). Stream payloads travel in their
//! stored, still-encoded form so a Flate-compressed stream stays compressed.

use super::PdfWriter;
use crate::error::PdfResult;
use crate::object::{Object, PdfArray, PdfDictionary, PdfStream, StreamPayload};
use crate::parser::PdfReader;
use crate::types::ObjectId;
use std::collections::HashMap;
use std::io::Write;

/// A copy session from one source document.
pub struct CopyingContext<'a> {
    source: &'a PdfReader,
    id_map: HashMap<u32, ObjectId>,
    pending: Vec<u32>,
}

impl<'a> CopyingContext<'a> {
    /// Starts a copy session over the given source.
    pub fn new(source: &'a PdfReader) -> Self {
        Self {
            source,
            id_map: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// The destination id a source id maps to, when already assigned.
    pub fn mapped(&self, source_id: u32) -> Option<ObjectId> {
        self.id_map.get(&source_id).copied()
    }

    /// Rewrites a direct object for the destination document, assigning
    /// destination ids to any references encountered and queueing their
    /// bodies. The caller writes the result.
    pub fn copy_direct_object<W: Write>(
        &mut self,
        writer: &mut PdfWriter<W>,
        obj: &Object,
    ) -> PdfResult<Object> {
        Ok(match obj {
            Object::Reference(id) => Object::Reference(self.map_reference(writer, id.number)),
            Object::Array(arr) => {
                let mut out = PdfArray::with_capacity(arr.len());
                for element in arr.iter() {
                    out.push(self.copy_direct_object(writer, element)?);
                }
                Object::Array(out)
            }
            Object::Dictionary(dict) => {
                Object::Dictionary(self.copy_dictionary(writer, dict)?)
            }
            Object::Stream(stream) => {
                // /Length is dropped rather than remapped; the destination
                // writer derives its own
                let mut trimmed = stream.dictionary.clone();
                trimmed.remove("Length");
                let dictionary = self.copy_dictionary(writer, &trimmed)?;
                Object::Stream(PdfStream {
                    dictionary,
                    payload: stream.payload.clone(),
                })
            }
            other => other.clone(),
        })
    }

    fn copy_dictionary<W: Write>(
        &mut self,
        writer: &mut PdfWriter<W>,
        dict: &PdfDictionary,
    ) -> PdfResult<PdfDictionary> {
        let mut out = PdfDictionary::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            out.set(key.clone(), self.copy_direct_object(writer, value)?);
        }
        Ok(out)
    }

    /// Copies a direct object without touching its references. Meant for
    /// merging into the same document the source was parsed from, where ids
    /// keep their meaning.
    pub fn copy_direct_object_as_is(&self, obj: &Object) -> Object {
        obj.clone()
    }

    /// Deep-copies the object behind a source id, returning its destination
    /// id. The body and everything it references are written before this
    /// returns.
    pub fn copy_object<W: Write>(
        &mut self,
        writer: &mut PdfWriter<W>,
        source_id: u32,
    ) -> PdfResult<ObjectId> {
        let dest = self.map_reference(writer, source_id);
        self.copy_new_objects(writer)?;
        Ok(dest)
    }

    /// Drains the pending queue: parses each queued source body, rewrites
    /// it, and writes it at its destination id. Bodies may enqueue further
    /// sources; the loop runs until the queue is dry.
    pub fn copy_new_objects<W: Write>(&mut self, writer: &mut PdfWriter<W>) -> PdfResult<()> {
        while let Some(source_id) = self.pending.pop() {
            let dest = self.id_map[&source_id];
            let body = self.source.resolve_number(source_id)?;

            let to_write = match &body {
                Object::Stream(original) => {
                    // materialize in stored form before the rewrite drops
                    // /Length; the declared filters still describe the bytes
                    let raw = match &original.payload {
                        StreamPayload::Position(_) => self
                            .source
                            .raw_stream_data(original, ObjectId::new(source_id))?,
                        StreamPayload::Bytes(bytes) => bytes.clone(),
                    };
                    match self.copy_direct_object(writer, &body)? {
                        Object::Stream(rewritten) => {
                            Object::Stream(PdfStream::from_raw(rewritten.dictionary, raw))
                        }
                        other => other,
                    }
                }
                _ => self.copy_direct_object(writer, &body)?,
            };

            writer.write_object_with_id(dest, &to_write)?;
        }
        Ok(())
    }

    fn map_reference<W: Write>(&mut self, writer: &mut PdfWriter<W>, source_id: u32) -> ObjectId {
        if let Some(&dest) = self.id_map.get(&source_id) {
            return dest;
        }
        let dest = writer.allocate();
        self.id_map.insert(source_id, dest);
        self.pending.push(source_id);
        dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriterConfig;

    fn source_pdf() -> PdfReader {
        let mut writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
        let catalog_id = writer.allocate();
        let pages_id = writer.allocate();
        let page_id = writer.allocate();
        let extra_id = writer.allocate();

        let mut catalog = PdfDictionary::new();
        catalog.set("Type", Object::Name("Catalog".into()));
        catalog.set("Pages", Object::Reference(pages_id));
        writer.write_object_with_id(catalog_id, &Object::Dictionary(catalog)).unwrap();

        let mut pages = PdfDictionary::new();
        pages.set("Type", Object::Name("Pages".into()));
        let mut kids = PdfArray::new();
        kids.push(Object::Reference(page_id));
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(1));
        writer.write_object_with_id(pages_id, &Object::Dictionary(pages)).unwrap();

        let mut page = PdfDictionary::new();
        page.set("Type", Object::Name("Page".into()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Extra", Object::Reference(extra_id));
        writer.write_object_with_id(page_id, &Object::Dictionary(page)).unwrap();

        writer
            .write_object_with_id(extra_id, &Object::String("payload".into()))
            .unwrap();

        let bytes = writer.finalize(catalog_id, None).unwrap();
        PdfReader::from_bytes(bytes).unwrap()
    }

    #[test]
    fn test_copy_assigns_one_destination_per_source() {
        let source = source_pdf();
        let mut writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
        let mut copier = CopyingContext::new(&source);

        let a = copier.copy_object(&mut writer, 3).unwrap();
        // copying again returns the same destination, no duplicate work
        let b = copier.copy_object(&mut writer, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_copy_pulls_transitive_references() {
        let source = source_pdf();
        let mut writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
        let mut copier = CopyingContext::new(&source);

        // copying the page pulls its parent tree and the extra string
        let page_dest = copier.copy_object(&mut writer, 3).unwrap();
        assert!(copier.mapped(2).is_some());
        assert!(copier.mapped(4).is_some());

        let mut catalog = PdfDictionary::new();
        catalog.set("Type", Object::Name("Catalog".into()));
        catalog.set("Pages", Object::Reference(copier.mapped(2).unwrap()));
        let catalog_id = writer.write_object(&Object::Dictionary(catalog)).unwrap();
        let bytes = writer.finalize(catalog_id, None).unwrap();

        let copied = PdfReader::from_bytes(bytes).unwrap();
        let page = copied.resolve(page_dest).unwrap();
        let extra_ref = page.as_dictionary().unwrap().get("Extra").unwrap().clone();
        let extra = copied.resolve_object(&extra_ref).unwrap();
        assert_eq!(extra.as_string().unwrap().as_bytes(), b"payload");
    }

    #[test]
    fn test_copy_direct_object_remaps_nested() {
        let source = source_pdf();
        let mut writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
        let mut copier = CopyingContext::new(&source);

        let mut dict = PdfDictionary::new();
        dict.set("First", Object::Reference(ObjectId::new(4)));
        dict.set("Again", Object::Reference(ObjectId::new(4)));
        let rewritten = copier
            .copy_direct_object(&mut writer, &Object::Dictionary(dict))
            .unwrap();

        let rewritten = rewritten.as_dictionary().unwrap();
        // both references remap to the same destination id
        assert_eq!(
            rewritten.get("First").unwrap().as_reference(),
            rewritten.get("Again").unwrap().as_reference()
        );
    }

    #[test]
    fn test_copy_as_is_preserves_references() {
        let source = source_pdf();
        let copier = CopyingContext::new(&source);
        let obj = Object::Reference(ObjectId::new(9));
        assert_eq!(copier.copy_direct_object_as_is(&obj), obj);
    }
}
