//! Append-only call audit log.
//!
//! Every call attempt through the proxy is recorded as one JSON line in an
//! append-only file. The log is insertion-ordered and supports retroactive
//! search with AND-combined filters plus windowed aggregation.

pub mod entry;
pub mod store;

pub use entry::{AuditEntry, CallStatus, LogSummary, SearchFilters};
pub use store::{AppendOutcome, AuditError, AuditLog, Result};
