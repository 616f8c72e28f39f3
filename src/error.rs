//! Error types for the pdf-core library.

use thiserror::Error;

/// The main error type for PDF operations.
#[derive(Debug, Error)]
pub enum PdfError {
    /// Error in the object model or primitive serialization.
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    /// Error while parsing a PDF file.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error in a stream filter.
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Error in the encryption layer.
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// Error on the write side.
    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document or writer already failed; further calls are refused.
    #[error("Instance already failed: {0}")]
    AlreadyFailed(String),
}

/// Errors in the object model.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Invalid PDF name.
    #[error("Invalid PDF name: {0}")]
    InvalidName(String),

    /// Expected one object type, found another.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Stream without a usable /Length entry.
    #[error("Stream missing required Length entry")]
    StreamMissingLength,
}

/// Errors while parsing an existing PDF.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Missing or malformed %PDF- header.
    #[error("Invalid PDF: missing or invalid header")]
    InvalidHeader,

    /// End of input hit mid-token or mid-structure.
    #[error("Truncated input at offset {0}")]
    TruncatedInput(u64),

    /// Xref header mismatch, invalid entry, or /Prev cycle.
    #[error("Corrupt xref: {0}")]
    CorruptXref(String),

    /// Stream payload shorter than /Length or filter decode failure.
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    /// Expected a particular object type during traversal.
    #[error("Type mismatch: expected {expected} at {context}")]
    TypeMismatch {
        expected: &'static str,
        context: &'static str,
    },

    /// Missing or malformed trailer dictionary.
    #[error("Invalid PDF: missing or invalid trailer")]
    InvalidTrailer,

    /// Object parse failure at a known offset.
    #[error("Failed to parse object at offset {0}: {1}")]
    ObjectParse(u64, String),

    /// Nesting depth or object id beyond the configured maximum.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Malformed object stream.
    #[error("Invalid object stream: {0}")]
    InvalidObjectStream(String),
}

/// Errors in the stream filter pipeline.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Filter name with no implementation.
    #[error("Unsupported filter: /{0}")]
    Unsupported(String),

    /// Decode failure (bad header, bad code, premature end).
    #[error("Failed to decode {filter} data: {reason}")]
    DecodeFailed { filter: &'static str, reason: String },

    /// Encode failure.
    #[error("Failed to encode {filter} data: {reason}")]
    EncodeFailed { filter: &'static str, reason: String },

    /// Invalid /DecodeParms for a filter.
    #[error("Invalid decode parameters for {filter}: {reason}")]
    InvalidParameters { filter: &'static str, reason: String },
}

/// Errors in the encryption layer.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Password does not match /U (or /O for the owner password).
    #[error("Authentication failed: password does not match")]
    AuthenticationFailed,

    /// /V or /R outside the supported range, or an unknown crypt filter.
    #[error("Unsupported encryption: {0}")]
    Unsupported(String),

    /// Cipher operation failed.
    #[error("Cipher operation failed: {0}")]
    CipherFailed(String),

    /// Malformed encryption dictionary.
    #[error("Invalid encryption dictionary: {0}")]
    InvalidDictionary(String),

    /// Encryption requires the document /ID.
    #[error("File ID required for encryption")]
    MissingFileId,
}

/// Errors on the write side. These are programmer errors and always surface.
#[derive(Debug, Error)]
pub enum WriterError {
    /// API misuse in the object write context.
    #[error("Writer state error: {0}")]
    InvalidState(String),

    /// An object id was used that the registry never allocated.
    #[error("Unallocated object id: {0}")]
    UnallocatedId(u32),

    /// The same indirect object was written twice in one session.
    #[error("Object {0} already written")]
    AlreadyWritten(u32),
}

/// A specialized Result type for PDF operations.
pub type PdfResult<T> = Result<T, PdfError>;
