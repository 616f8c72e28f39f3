//! # pdf-core
//!
//! The core of a PDF reading and writing engine: the typed object model,
//! the tokenizer and object parser, the cross-reference machinery that ties
//! logical objects to physical bytes, the stream filter pipeline, the
//! standard security handler, and the document assembly writer with
//! incremental-update support.
//!
//! ## Reading
//!
//! ```no_run
//! use pdf_core::PdfReader;
//!
//! let reader = PdfReader::from_file("document.pdf")?;
//! println!("pages: {}", reader.page_count()?);
//! let first = reader.page(0)?;
//! if let Some(media_box) = reader.page_attribute(&first, "MediaBox")? {
//!     println!("media box: {}", media_box.to_pdf_string());
//! }
//! # Ok::<(), pdf_core::PdfError>(())
//! ```
//!
//! ## Writing
//!
//! ```
//! use pdf_core::{Object, PdfDictionary, PdfWriter, WriterConfig};
//!
//! let mut writer = PdfWriter::create_memory(WriterConfig::default())?;
//! let catalog_id = writer.allocate();
//! let pages_id = writer.allocate();
//!
//! let mut pages = PdfDictionary::new();
//! pages.set("Type", Object::Name("Pages".into()));
//! pages.set("Kids", Object::Array(Default::default()));
//! pages.set("Count", Object::Integer(0));
//! writer.write_object_with_id(pages_id, &Object::Dictionary(pages))?;
//!
//! let mut catalog = PdfDictionary::new();
//! catalog.set("Type", Object::Name("Catalog".into()));
//! catalog.set("Pages", Object::Reference(pages_id));
//! writer.write_object_with_id(catalog_id, &Object::Dictionary(catalog))?;
//!
//! let bytes = writer.finalize(catalog_id, None)?;
//! assert!(bytes.starts_with(b"%PDF-"));
//! # Ok::<(), pdf_core::PdfError>(())
//! ```

pub mod diagnostics;
pub mod encryption;
pub mod error;
pub mod filters;
pub mod io;
pub mod object;
pub mod parser;
pub mod types;
pub mod writer;

pub use diagnostics::{DiagnosticKind, DiagnosticSink, NullSink, RecordingSink};
pub use encryption::{
    EncryptionAlgorithm, EncryptionConfig, PermissionFlags, Permissions, SecurityHandler,
};
pub use error::{
    EncryptionError, FilterError, ObjectError, ParseError, PdfError, PdfResult, WriterError,
};
pub use object::{
    DictionaryBuilder, Object, PdfArray, PdfDictionary, PdfName, PdfStream, PdfString,
    StreamPayload,
};
pub use parser::{PdfReader, Trailer, XrefEntry, XrefTable};
pub use types::{ObjectId, PdfVersion};
pub use writer::{CopyingContext, PdfWriter, WriterConfig, XrefStyle};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::encryption::{EncryptionAlgorithm, EncryptionConfig, Permissions};
    pub use crate::error::{PdfError, PdfResult};
    pub use crate::object::{
        Object, PdfArray, PdfDictionary, PdfName, PdfStream, PdfString,
    };
    pub use crate::parser::PdfReader;
    pub use crate::types::{ObjectId, PdfVersion};
    pub use crate::writer::{CopyingContext, PdfWriter, WriterConfig, XrefStyle};
}
