//! Small shared value types.

mod object_id;
mod version;

pub use object_id::ObjectId;
pub use version::PdfVersion;
