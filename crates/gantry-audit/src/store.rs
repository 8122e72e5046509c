//! NDJSON audit log store
//!
//! One serialized entry per line, append-only. Appenders rely on the
//! filesystem's atomic-append guarantee for line-sized writes, so concurrent
//! appenders need no extra locking. Entries are never rewritten or removed.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::entry::{AuditEntry, CallStatus, LogSummary, SearchFilters};

/// Default cap on query results
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Result type for audit read operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors reading the audit log.
///
/// Write failures never surface as errors; see [`AppendOutcome`].
#[derive(Debug, Error)]
pub enum AuditError {
    /// IO error reading the log file
    #[error("IO error reading audit log: {0}")]
    Io(#[from] std::io::Error),
}

/// Best-effort result of an append.
///
/// Callers may inspect this for diagnostics but must never propagate it as an
/// error to the operation being instrumented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The line reached the log file
    Written,
    /// The append failed; the reason is informational only
    Failed(String),
}

impl AppendOutcome {
    /// Whether the entry was written
    pub fn is_written(&self) -> bool {
        matches!(self, AppendOutcome::Written)
    }
}

/// Handle to the append-only log file
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Create a log handle for the file at `path`.
    ///
    /// The file does not need to exist; a missing log reads as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, best-effort.
    ///
    /// Failures are swallowed into the outcome and logged at warn level;
    /// observability must never break the call path it instruments.
    pub fn append(&self, entry: &AuditEntry) -> AppendOutcome {
        match self.try_append(entry) {
            Ok(()) => AppendOutcome::Written,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "audit append failed");
                AppendOutcome::Failed(err.to_string())
            }
        }
    }

    fn try_append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }

    /// Query entries matching `filters`.
    ///
    /// Filters first, then keeps the most recent `limit` matches (default
    /// 50) in their original chronological order.
    pub fn query(&self, filters: &SearchFilters) -> Result<Vec<AuditEntry>> {
        let limit = filters.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let mut matches: Vec<AuditEntry> = self
            .read_all()?
            .into_iter()
            .filter(|e| filters.matches(e))
            .collect();

        if matches.len() > limit {
            matches = matches.split_off(matches.len() - limit);
        }
        Ok(matches)
    }

    /// Aggregate entries from the last `window_hours` hours.
    pub fn summarize(&self, window_hours: u64) -> Result<LogSummary> {
        self.summarize_at(window_hours, Utc::now())
    }

    /// Aggregate entries within `[now - window_hours, now]` for a fixed
    /// clock, so results are reproducible.
    pub fn summarize_at(&self, window_hours: u64, now: DateTime<Utc>) -> Result<LogSummary> {
        let period_start = now - Duration::hours(window_hours as i64);
        let entries: Vec<AuditEntry> = self
            .read_all()?
            .into_iter()
            .filter(|e| e.timestamp >= period_start && e.timestamp <= now)
            .collect();

        let mut summary = LogSummary {
            total_calls: entries.len(),
            success_count: 0,
            error_count: 0,
            by_team: Default::default(),
            by_tool: Default::default(),
            by_status: Default::default(),
            avg_duration_ms: 0,
            period_start,
            period_end: now,
        };

        let mut total_duration: u64 = 0;
        for entry in &entries {
            match entry.status {
                CallStatus::Success => summary.success_count += 1,
                CallStatus::Error => summary.error_count += 1,
            }
            *summary.by_team.entry(entry.team.clone()).or_default() += 1;
            *summary.by_tool.entry(entry.tool.clone()).or_default() += 1;
            *summary
                .by_status
                .entry(entry.status.to_string())
                .or_default() += 1;
            total_duration += entry.duration_ms;
        }

        if !entries.is_empty() {
            summary.avg_duration_ms =
                (total_duration as f64 / entries.len() as f64).round() as u64;
        }

        Ok(summary)
    }

    /// Read every parsable entry in append order.
    ///
    /// Corrupt lines are skipped with a warning; one bad line never aborts a
    /// read.
    fn read_all(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;

        let mut entries = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(line = idx + 1, %err, "skipping corrupt audit log line");
                }
            }
        }
        debug!(path = %self.path.display(), count = entries.len(), "audit log read");
        Ok(entries)
    }
}
