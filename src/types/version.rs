//! PDF version numbers.

use std::fmt;

/// A PDF version as it appears in the `%PDF-M.N` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub const V1_4: PdfVersion = PdfVersion { major: 1, minor: 4 };
    pub const V1_5: PdfVersion = PdfVersion { major: 1, minor: 5 };
    pub const V1_7: PdfVersion = PdfVersion { major: 1, minor: 7 };
    pub const V2_0: PdfVersion = PdfVersion { major: 2, minor: 0 };

    /// Creates a version from its components.
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parses `M.N` as found after `%PDF-`.
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// True when the version supports cross-reference streams (1.5+).
    pub fn supports_xref_streams(&self) -> bool {
        *self >= Self::V1_5
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::V1_4
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
