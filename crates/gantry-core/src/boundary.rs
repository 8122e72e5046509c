//! Instrumented call boundary
//!
//! The seam between this core and the external API caller. It resolves the
//! team secret, times the call, and records the outcome in the audit log
//! best-effort, whether the call succeeded or not. No network code lives
//! here.

use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use gantry_audit::{AuditEntry, AuditLog, CallStatus};

use crate::error::{GantryError, Result};
use crate::resolver::TeamResolver;

/// Cap on the audited response preview
const SUMMARY_MAX_CHARS: usize = 500;

/// Run one proxied call with resolution and audit instrumentation.
///
/// `call` receives the resolved API key and returns the serialized response.
/// The outcome is appended to `audit` regardless of success or failure; a
/// failed append never affects the returned result. Resolution misses are
/// audited as error entries under the attempted name.
pub fn instrument_call<E>(
    audit: &AuditLog,
    resolver: &TeamResolver,
    tool: &str,
    team: Option<&str>,
    params: serde_json::Value,
    call: impl FnOnce(&str) -> std::result::Result<String, E>,
) -> Result<String>
where
    E: std::fmt::Display,
{
    let resolved = match resolver.resolve(team) {
        Ok(resolved) => resolved,
        Err(err) => {
            let entry = AuditEntry {
                timestamp: Utc::now(),
                tool: tool.to_string(),
                team: team.map(|t| t.trim().to_lowercase()).unwrap_or_default(),
                params,
                status: CallStatus::Error,
                response_summary: truncate_summary(&err.to_string()),
                duration_ms: 0,
            };
            audit.append(&entry);
            return Err(err);
        }
    };

    let started = Instant::now();
    let outcome = call(&resolved.api_key);
    let duration_ms = started.elapsed().as_millis() as u64;

    let (status, summary) = match &outcome {
        Ok(response) => (CallStatus::Success, truncate_summary(response)),
        Err(err) => (CallStatus::Error, truncate_summary(&err.to_string())),
    };

    let entry = AuditEntry {
        timestamp: Utc::now(),
        tool: tool.to_string(),
        team: resolved.name.clone(),
        params,
        status,
        response_summary: summary,
        duration_ms,
    };
    let append = audit.append(&entry);
    debug!(tool, team = %resolved.name, %status, duration_ms, appended = append.is_written(), "call instrumented");

    outcome.map_err(|err| GantryError::CallFailed {
        tool: tool.to_string(),
        message: err.to_string(),
    })
}

fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    format!("{truncated}...")
}
