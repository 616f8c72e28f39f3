//! End-to-end tests: write documents, read them back, break them, repair
//! them.

use pdf_core::diagnostics::{DiagnosticKind, DiagnosticSink, RecordingSink};
use pdf_core::filters::{self, FilterKind, FilterSpec};
use pdf_core::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Builds a single-page document and returns (bytes, page id, catalog id).
fn single_page_document(config: WriterConfig) -> (Vec<u8>, ObjectId, ObjectId) {
    let mut writer = PdfWriter::new(Vec::new(), config).unwrap();
    let catalog_id = writer.allocate();
    let pages_id = writer.allocate();
    let page_id = writer.allocate();

    let mut page = PdfDictionary::new();
    page.set("Type", Object::Name("Page".into()));
    page.set("Parent", Object::Reference(pages_id));
    let mut media_box = PdfArray::new();
    for v in [0, 0, 612, 792] {
        media_box.push(Object::Integer(v));
    }
    page.set("MediaBox", Object::Array(media_box));
    writer
        .write_object_with_id(page_id, &Object::Dictionary(page))
        .unwrap();

    let mut pages = PdfDictionary::new();
    pages.set("Type", Object::Name("Pages".into()));
    let mut kids = PdfArray::new();
    kids.push(Object::Reference(page_id));
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", Object::Integer(1));
    writer
        .write_object_with_id(pages_id, &Object::Dictionary(pages))
        .unwrap();

    let mut catalog = PdfDictionary::new();
    catalog.set("Type", Object::Name("Catalog".into()));
    catalog.set("Pages", Object::Reference(pages_id));
    writer
        .write_object_with_id(catalog_id, &Object::Dictionary(catalog))
        .unwrap();

    let bytes = writer.finalize(catalog_id, None).unwrap();
    (bytes, page_id, catalog_id)
}

/// A sink that forwards into a shared recorder, so tests can look at what a
/// reader reported after the fact.
struct SharedSink(Rc<RefCell<RecordingSink>>);

impl DiagnosticSink for SharedSink {
    fn report(&mut self, kind: DiagnosticKind, message: &str) {
        self.0.borrow_mut().report(kind, message);
    }
}

fn open_with_recorder(data: Vec<u8>) -> (PdfReader, Rc<RefCell<RecordingSink>>) {
    let recorder = Rc::new(RefCell::new(RecordingSink::new()));
    let reader = PdfReader::open(data, "", Box::new(SharedSink(recorder.clone()))).unwrap();
    (reader, recorder)
}

#[test]
fn fresh_document_with_one_empty_page() {
    let (bytes, _, _) = single_page_document(WriterConfig::default());

    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    let text = String::from_utf8_lossy(&bytes);
    assert_eq!(text.matches("/Type /Page ").count(), 1, "exactly one page object");

    let reader = PdfReader::from_bytes(bytes).unwrap();
    assert_eq!(reader.page_count().unwrap(), 1);

    let page = reader.page(0).unwrap();
    let media_box = reader.page_attribute(&page, "MediaBox").unwrap().unwrap();
    let media_box = media_box.as_array().unwrap();
    let values: Vec<i64> = media_box.iter().filter_map(Object::as_integer).collect();
    assert_eq!(values, vec![0, 0, 612, 792]);

    // /Size covers every id: max recorded id + 1
    assert_eq!(reader.trailer().size, reader.xref().max_id() + 1);
}

#[test]
fn xref_offsets_point_at_object_headers() {
    let (bytes, _, _) = single_page_document(WriterConfig::default());
    let reader = PdfReader::from_bytes(bytes).unwrap();

    for number in 1..reader.trailer().size {
        if let Some(offset) = reader.xref().get(number).and_then(|e| e.offset()) {
            let header = format!("{} 0 obj", number);
            assert!(
                reader.raw_data()[offset as usize..].starts_with(header.as_bytes()),
                "object {} offset {} does not start its header",
                number,
                offset
            );
        }
    }
}

#[test]
fn incremental_annotation_update() {
    let (original, page_id, _) = single_page_document(WriterConfig::default());
    let original_len = original.len();

    let source = PdfReader::from_bytes(original.clone()).unwrap();
    let prev_startxref = source.startxref_offset();

    let mut writer = PdfWriter::modify(&source, Vec::new(), WriterConfig::default()).unwrap();

    // new annotation object
    let mut annot = PdfDictionary::new();
    annot.set("Type", Object::Name("Annot".into()));
    annot.set("Subtype", Object::Name("Text".into()));
    let mut rect = PdfArray::new();
    for v in [100, 500, 200, 600] {
        rect.push(Object::Integer(v));
    }
    annot.set("Rect", Object::Array(rect));
    let annot_id = writer.write_object(&Object::Dictionary(annot)).unwrap();

    // rewrite the page with /Annots pointing at it
    let mut page = source.page(0).unwrap();
    let mut annots = PdfArray::new();
    annots.push(Object::Reference(annot_id));
    page.set("Annots", Object::Array(annots));
    writer
        .write_object_with_id(page_id, &Object::Dictionary(page))
        .unwrap();

    let updated = writer.finalize_incremental().unwrap();

    // the original bytes are a strict prefix
    assert!(updated.len() > original_len);
    assert_eq!(&updated[..original_len], &original[..]);

    let reader = PdfReader::from_bytes(updated).unwrap();
    assert_eq!(reader.trailer().prev, Some(prev_startxref));

    let page = reader.page(0).unwrap();
    let annots = reader.page_attribute(&page, "Annots").unwrap().unwrap();
    let annots = annots.as_array().unwrap();
    assert_eq!(annots.len(), 1);
    let annot = reader.resolve_object(annots.get(0).unwrap()).unwrap();
    let rect = annot.as_dictionary().unwrap().get("Rect").unwrap();
    let values: Vec<i64> = rect
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Object::as_integer)
        .collect();
    assert_eq!(values, vec![100, 500, 200, 600]);

    // both document id halves present, first preserved from the source
    let source_id = source.trailer().id.clone().unwrap();
    let updated_id = reader.trailer().id.clone().unwrap();
    assert_eq!(source_id.0, updated_id.0);
    assert_ne!(updated_id.0, updated_id.1);
}

#[test]
fn encrypted_document_roundtrip_and_clear_rewrite() {
    // V=2, R=3, 128-bit RC4, user password "user"
    let config = WriterConfig {
        encryption: Some(
            EncryptionConfig::new(EncryptionAlgorithm::Rc4_128).user_password("user"),
        ),
        ..WriterConfig::default()
    };

    let mut writer = PdfWriter::new(Vec::new(), config).unwrap();
    let catalog_id = writer.allocate();
    let pages_id = writer.allocate();
    let page_id = writer.allocate();
    let content_id = writer.allocate();

    let content = b"BT /F1 12 Tf 72 720 Td (top secret) Tj ET";
    let content_stream = PdfStream::from_raw(PdfDictionary::new(), content.to_vec());
    writer
        .write_object_with_id(content_id, &Object::Stream(content_stream))
        .unwrap();

    let mut page = PdfDictionary::new();
    page.set("Type", Object::Name("Page".into()));
    page.set("Parent", Object::Reference(pages_id));
    page.set("Contents", Object::Reference(content_id));
    let mut media_box = PdfArray::new();
    for v in [0, 0, 612, 792] {
        media_box.push(Object::Integer(v));
    }
    page.set("MediaBox", Object::Array(media_box));
    writer
        .write_object_with_id(page_id, &Object::Dictionary(page))
        .unwrap();

    let mut pages = PdfDictionary::new();
    pages.set("Type", Object::Name("Pages".into()));
    let mut kids = PdfArray::new();
    kids.push(Object::Reference(page_id));
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", Object::Integer(1));
    writer
        .write_object_with_id(pages_id, &Object::Dictionary(pages))
        .unwrap();

    let mut catalog = PdfDictionary::new();
    catalog.set("Type", Object::Name("Catalog".into()));
    catalog.set("Pages", Object::Reference(pages_id));
    writer
        .write_object_with_id(catalog_id, &Object::Dictionary(catalog))
        .unwrap();

    let mut info = PdfDictionary::new();
    info.set("Title", Object::String(PdfString::literal("Confidential")));
    let info_id = writer.write_object(&Object::Dictionary(info)).unwrap();

    let bytes = writer.finalize(catalog_id, Some(info_id)).unwrap();

    // the stored bytes do not contain the plaintext
    assert!(!bytes
        .windows(b"top secret".len())
        .any(|w| w == b"top secret"));

    // wrong password fails to open
    assert!(PdfReader::from_bytes(bytes.clone()).is_err());
    assert!(PdfReader::from_bytes_with_password(bytes.clone(), "nope").is_err());

    let reader = PdfReader::from_bytes_with_password(bytes, "user").unwrap();
    assert!(reader.is_encrypted());

    let page = reader.page(0).unwrap();
    assert_eq!(reader.page_content(&page).unwrap(), content);
    let title = reader.info().unwrap().unwrap();
    assert_eq!(
        title.get("Title").unwrap().as_string().unwrap().as_bytes(),
        b"Confidential"
    );

    // rewrite in the clear: the copied tree reads identically, minus /Encrypt
    let mut clear_writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
    let mut copier = CopyingContext::new(&reader);
    let new_catalog = copier
        .copy_object(&mut clear_writer, reader.trailer().root.number)
        .unwrap();
    let clear_bytes = clear_writer.finalize(new_catalog, None).unwrap();

    let clear = PdfReader::from_bytes(clear_bytes).unwrap();
    assert!(!clear.is_encrypted());
    assert!(clear.trailer().encrypt.is_none());
    let clear_page = clear.page(0).unwrap();
    assert_eq!(clear.page_content(&clear_page).unwrap(), content);
}

#[test]
fn filter_chain_ascii85_over_flate() {
    let plain = b"Hello, world!\n".to_vec();
    let chain = vec![
        FilterSpec {
            kind: FilterKind::Ascii85,
            parms: None,
        },
        FilterSpec {
            kind: FilterKind::Flate,
            parms: None,
        },
    ];
    let stored = filters::encode_chain(&plain, &chain).unwrap();
    assert_ne!(stored, plain);

    let mut writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
    let mut dict = PdfDictionary::new();
    let mut filter_names = PdfArray::new();
    filter_names.push(Object::Name("ASCII85Decode".into()));
    filter_names.push(Object::Name("FlateDecode".into()));
    dict.set("Filter", Object::Array(filter_names));
    let stream_id = writer
        .write_object(&Object::Stream(PdfStream::from_raw(dict, stored)))
        .unwrap();

    let mut catalog = PdfDictionary::new();
    catalog.set("Type", Object::Name("Catalog".into()));
    let catalog_id = writer.write_object(&Object::Dictionary(catalog)).unwrap();
    let bytes = writer.finalize(catalog_id, None).unwrap();

    // the file carries the encoded form, not the plaintext
    assert!(!bytes.windows(plain.len()).any(|w| w == plain));

    let reader = PdfReader::from_bytes(bytes).unwrap();
    let obj = reader.resolve(stream_id).unwrap();
    let stream = obj.as_stream().unwrap();

    // with the filter chain the payload comes back exactly
    assert_eq!(
        reader.stream_data_with_owner(stream, stream_id).unwrap(),
        plain
    );
    // without it, the stored bytes stay encoded
    assert_ne!(reader.raw_stream_data(stream, stream_id).unwrap(), plain);
}

#[test]
fn corrupted_startxref_recovers_by_scan() {
    let (mut bytes, _, _) = single_page_document(WriterConfig::default());

    // corrupt the first digit of the startxref offset
    let pos = bytes.windows(9).rposition(|w| w == b"startxref").unwrap();
    bytes[pos + 10] = 0x00;

    let (reader, recorder) = open_with_recorder(bytes);
    assert!(recorder.borrow().has(DiagnosticKind::XrefRepaired));

    // every original object is recovered
    assert_eq!(reader.page_count().unwrap(), 1);
    let page = reader.page(0).unwrap();
    assert_eq!(page.get_name("Type").unwrap().as_bytes(), b"Page");
    let media_box = reader.page_attribute(&page, "MediaBox").unwrap().unwrap();
    assert_eq!(media_box.as_array().unwrap().len(), 4);
}

// Builds a file whose document objects all live inside an object stream,
// indexed by an xref stream.
fn object_stream_pdf() -> Vec<u8> {
    let bodies: [&[u8]; 3] = [
        b"<< /Type /Catalog /Pages 2 0 R >>",
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
        b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>",
    ];

    // pair table then bodies
    let mut offsets = Vec::new();
    let mut body_blob = Vec::new();
    for body in &bodies {
        offsets.push(body_blob.len());
        body_blob.extend_from_slice(body);
        body_blob.push(b' ');
    }
    let mut header = String::new();
    for (i, off) in offsets.iter().enumerate() {
        header.push_str(&format!("{} {} ", i + 1, off));
    }
    let first = header.len();
    let mut payload = header.into_bytes();
    payload.extend_from_slice(&body_blob);
    let packed = filters::encode_one(FilterKind::Flate, &payload).unwrap();

    let mut out = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();

    let objstm_offset = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /ObjStm /N 3 /First {} /Filter /FlateDecode /Length {} >>\nstream\r\n",
            first,
            packed.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&packed);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    // xref stream: 0 free; 1..3 in object stream 4; 4 and 5 at offsets
    let xref_offset = out.len();
    let mut rows = Vec::new();
    let mut push_row = |kind: u8, f2: u64, f3: u16| {
        rows.push(kind);
        rows.extend_from_slice(&(f2 as u32).to_be_bytes());
        rows.extend_from_slice(&f3.to_be_bytes());
    };
    push_row(0, 0, u16::MAX);
    for index in 0..3u64 {
        push_row(2, 4, index as u16);
    }
    push_row(1, objstm_offset as u64, 0);
    push_row(1, xref_offset as u64, 0);
    let packed_rows = filters::encode_one(FilterKind::Flate, &rows).unwrap();

    out.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /XRef /Size 6 /Root 1 0 R /W [1 4 2] /Filter /FlateDecode /Length {} >>\nstream\r\n",
            packed_rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&packed_rows);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    out
}

#[test]
fn object_stream_resolution() {
    let reader = PdfReader::from_bytes(object_stream_pdf()).unwrap();

    // /Size still accounts for the packed ids
    assert_eq!(reader.trailer().size, 6);

    // resolution through the object stream matches a classical placement
    let page = reader.page(0).unwrap();
    assert_eq!(page.get_name("Type").unwrap().as_bytes(), b"Page");
    let media_box = reader.page_attribute(&page, "MediaBox").unwrap().unwrap();
    let values: Vec<i64> = media_box
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Object::as_integer)
        .collect();
    assert_eq!(values, vec![0, 0, 612, 792]);

    let catalog = reader.catalog().unwrap();
    assert_eq!(catalog.get_name("Type").unwrap().as_bytes(), b"Catalog");
}

#[test]
fn mixed_classical_and_stream_xref_chain() {
    // classical base file, then an incremental update whose delta is an
    // xref stream; each id must resolve to its most recent entry
    let (original, page_id, _) = single_page_document(WriterConfig::default());
    let source = PdfReader::from_bytes(original).unwrap();

    let config = WriterConfig {
        xref_style: XrefStyle::Stream,
        version: PdfVersion::V1_5,
        ..WriterConfig::default()
    };
    let mut writer = PdfWriter::modify(&source, Vec::new(), config).unwrap();

    let mut page = source.page(0).unwrap();
    page.set("Rotate", Object::Integer(90));
    writer
        .write_object_with_id(page_id, &Object::Dictionary(page))
        .unwrap();
    let updated = writer.finalize_incremental().unwrap();

    let reader = PdfReader::from_bytes(updated).unwrap();
    let page = reader.page(0).unwrap();
    // the rewritten page is found through the stream section
    assert_eq!(page.get_integer("Rotate"), Some(90));
    // untouched objects still resolve through the classical section
    assert_eq!(
        reader.catalog().unwrap().get_name("Type").unwrap().as_bytes(),
        b"Catalog"
    );
}

#[test]
fn literal_string_with_all_byte_values_roundtrips() {
    let all_bytes: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();

    let mut writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
    let string_id = writer
        .write_object(&Object::String(PdfString::Literal(all_bytes.clone())))
        .unwrap();
    let mut catalog = PdfDictionary::new();
    catalog.set("Type", Object::Name("Catalog".into()));
    let catalog_id = writer.write_object(&Object::Dictionary(catalog)).unwrap();
    let bytes = writer.finalize(catalog_id, None).unwrap();

    let reader = PdfReader::from_bytes(bytes).unwrap();
    let parsed = reader.resolve(string_id).unwrap();
    assert_eq!(parsed.as_string().unwrap().as_bytes(), &all_bytes[..]);
}

#[test]
fn primitive_roundtrip_battery() {
    let mut samples = PdfArray::new();
    samples.push(Object::Null);
    samples.push(Object::Boolean(true));
    samples.push(Object::Boolean(false));
    samples.push(Object::Integer(0));
    samples.push(Object::Integer(-987654321));
    samples.push(Object::Real(0.5));
    samples.push(Object::Real(-3.25));
    samples.push(Object::Name("Needs#Escaping Here".into()));
    samples.push(Object::String(PdfString::literal("nested (parens) \\ ok")));
    samples.push(Object::String(PdfString::Hex(vec![0xDE, 0xAD, 0xBE, 0xEF])));
    samples.push(Object::Reference(ObjectId::with_generation(42, 7)));
    let mut inner = PdfDictionary::new();
    inner.set("A", Object::Integer(1));
    inner.set("B", Object::Array(PdfArray::from_objects(vec![
        Object::Integer(1),
        Object::Real(2.5),
    ])));
    samples.push(Object::Dictionary(inner));
    let samples = Object::Array(samples);

    let mut writer = PdfWriter::create_memory(WriterConfig::default()).unwrap();
    let sample_id = writer.write_object(&samples).unwrap();
    let mut catalog = PdfDictionary::new();
    catalog.set("Type", Object::Name("Catalog".into()));
    let catalog_id = writer.write_object(&Object::Dictionary(catalog)).unwrap();
    let bytes = writer.finalize(catalog_id, None).unwrap();

    let reader = PdfReader::from_bytes(bytes).unwrap();
    let parsed = reader.resolve(sample_id).unwrap();
    assert_eq!(parsed, samples);
}

#[test]
fn file_backed_write_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.pdf");

    let (bytes, _, _) = single_page_document(WriterConfig::default());
    std::fs::write(&path, &bytes).unwrap();

    let reader = PdfReader::from_file(&path).unwrap();
    assert_eq!(reader.page_count().unwrap(), 1);
}

#[test]
fn aes256_document_roundtrip() {
    let config = WriterConfig {
        version: PdfVersion::V2_0,
        xref_style: XrefStyle::Classical,
        encryption: Some(
            EncryptionConfig::new(EncryptionAlgorithm::Aes256)
                .user_password("reader")
                .owner_password("editor"),
        ),
        ..WriterConfig::default()
    };
    let mut writer = PdfWriter::new(Vec::new(), config).unwrap();
    let secret_id = writer
        .write_object(&Object::String(PdfString::literal("hidden payload")))
        .unwrap();
    let mut catalog = PdfDictionary::new();
    catalog.set("Type", Object::Name("Catalog".into()));
    let catalog_id = writer.write_object(&Object::Dictionary(catalog)).unwrap();
    let bytes = writer.finalize(catalog_id, None).unwrap();

    assert!(!bytes
        .windows(b"hidden payload".len())
        .any(|w| w == b"hidden payload"));

    for password in ["reader", "editor"] {
        let reader = PdfReader::from_bytes_with_password(bytes.clone(), password).unwrap();
        let secret = reader.resolve(secret_id).unwrap();
        assert_eq!(secret.as_string().unwrap().as_bytes(), b"hidden payload");
    }
}
