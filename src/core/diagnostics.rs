//! Diagnostic sink for raised errors
//!
//! The mapper hands every error it raises to a [`DiagnosticSink`] before returning it.
//! Sinks cannot fail, so recording never replaces the error the caller receives.

use super::error::{DatabaseError, ErrorKind};
use parking_lot::Mutex;
use std::panic::Location;

/// One raised error, as seen by a sink
#[derive(Debug, Clone)]
pub struct DiagnosticRecord {
    pub kind: ErrorKind,
    pub code: u32,
    pub message: String,
    /// Mapper operation that raised the error (`find_all`, `save`, ...)
    pub operation: &'static str,
    pub table: String,
    /// Source location of the raise inside the mapper, identifying the raising operation's
    /// code path rather than the application call site
    pub location: &'static Location<'static>,
}

impl DiagnosticRecord {
    /// Capture a record for `err`, located at the caller
    #[track_caller]
    pub fn capture(err: &DatabaseError, operation: &'static str, table: &str) -> Self {
        Self {
            kind: err.kind(),
            code: err.code(),
            message: err.to_string(),
            operation,
            table: table.to_string(),
            location: Location::caller(),
        }
    }
}

/// Receiver of raised errors
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: &DiagnosticRecord);
}

/// Sink writing through the `log` facade at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, record: &DiagnosticRecord) {
        log::error!(
            "[{} {}] {} on `{}` at {}:{}: {}",
            record.kind,
            record.code,
            record.operation,
            record.table,
            record.location.file(),
            record.location.line(),
            record.message
        );
    }
}

/// Sink keeping every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, record: &DiagnosticRecord) {
        self.records.lock().push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_record() {
        let err = DatabaseError::query("no such column: nme");
        let record = DiagnosticRecord::capture(&err, "find_all", "users");
        assert_eq!(record.kind, ErrorKind::QueryExecution);
        assert_eq!(record.code, 10001);
        assert_eq!(record.operation, "find_all");
        assert_eq!(record.table, "users");
        assert!(record.message.contains("no such column"));
        assert!(record.location.file().ends_with("diagnostics.rs"));
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        let err = DatabaseError::schema_retrieval("ghosts");
        sink.record(&DiagnosticRecord::capture(&err, "get_attributes", "ghosts"));
        LogSink.record(&DiagnosticRecord::capture(&err, "get_attributes", "ghosts"));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].kind, ErrorKind::SchemaRetrieval);
    }
}
