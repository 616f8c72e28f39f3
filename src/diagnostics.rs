//! Per-document diagnostic sink.
//!
//! Recoverable oddities in a parsed file (repaired xref, mismatched stream
//! length, lone-CR stream delimiters) are reported here rather than failing
//! the parse. The sink is a capability handed to the reader at construction;
//! correctness never depends on it.

use std::fmt;

/// The kind of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The xref chain could not be parsed and was rebuilt by linear scan.
    XrefRepaired,
    /// A stream's /Length disagreed with the actual endstream position.
    StreamLengthRepaired,
    /// The `stream` keyword was terminated by a lone carriage return.
    LoneCarriageReturn,
    /// An object header did not match its xref entry.
    ObjectHeaderMismatch,
    /// Anything else worth noting.
    Note,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::XrefRepaired => "XrefRepaired",
            DiagnosticKind::StreamLengthRepaired => "StreamLengthRepaired",
            DiagnosticKind::LoneCarriageReturn => "LoneCarriageReturn",
            DiagnosticKind::ObjectHeaderMismatch => "ObjectHeaderMismatch",
            DiagnosticKind::Note => "Note",
        };
        f.write_str(s)
    }
}

/// Receives human-readable diagnostic lines from a reader or writer.
pub trait DiagnosticSink {
    /// Reports one event.
    fn report(&mut self, kind: DiagnosticKind, message: &str);
}

/// A sink that discards every event. The default.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _kind: DiagnosticKind, _message: &str) {}
}

/// A sink that records events in memory, mostly for tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<(DiagnosticKind, String)>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events.
    pub fn events(&self) -> &[(DiagnosticKind, String)] {
        &self.events
    }

    /// Returns true if an event of the given kind was recorded.
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.events.iter().any(|(k, _)| *k == kind)
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&mut self, kind: DiagnosticKind, message: &str) {
        self.events.push((kind, message.to_string()));
    }
}
