//! Audit entry types, search filters, and summaries

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a proxied call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// Upstream call succeeded
    Success,
    /// Upstream call or resolution failed
    Error,
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Success => write!(f, "success"),
            CallStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(CallStatus::Success),
            "error" => Ok(CallStatus::Error),
            other => Err(format!("invalid status '{other}' (expected success or error)")),
        }
    }
}

/// One recorded call attempt. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the call was made
    pub timestamp: DateTime<Utc>,

    /// Tool identifier that was invoked
    pub tool: String,

    /// Canonical team name the call ran under
    pub team: String,

    /// Call parameters, arbitrary shape
    pub params: serde_json::Value,

    /// Whether the call succeeded
    pub status: CallStatus,

    /// Truncated preview of the response or error
    pub response_summary: String,

    /// Wall-clock duration of the call in milliseconds
    pub duration_ms: u64,
}

/// Search filters for [`crate::AuditLog::query`].
///
/// Each filter is independently optional; set filters combine with logical
/// AND.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Case-insensitive substring match against tool, team, response summary,
    /// or the serialized params
    pub keyword: Option<String>,

    /// Substring match on the tool identifier
    pub tool: Option<String>,

    /// Exact team name match, case-insensitive
    pub team: Option<String>,

    /// Exact status match
    pub status: Option<CallStatus>,

    /// Inclusive lower timestamp bound
    pub start_time: Option<DateTime<Utc>>,

    /// Inclusive upper timestamp bound
    pub end_time: Option<DateTime<Utc>>,

    /// Cap on returned entries, most recent kept (default 50)
    pub limit: Option<usize>,
}

impl SearchFilters {
    /// Whether `entry` passes every set filter
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(tool) = &self.tool {
            if !entry.tool.to_lowercase().contains(&tool.to_lowercase()) {
                return false;
            }
        }
        if let Some(team) = &self.team {
            if !entry.team.eq_ignore_ascii_case(team) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if entry.timestamp > end {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            let kw = keyword.to_lowercase();
            let params = serde_json::to_string(&entry.params).unwrap_or_default();
            let hit = entry.tool.to_lowercase().contains(&kw)
                || entry.team.to_lowercase().contains(&kw)
                || entry.response_summary.to_lowercase().contains(&kw)
                || params.to_lowercase().contains(&kw);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Aggregate over a time window, produced by [`crate::AuditLog::summarize`]
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    /// Entries inside the window
    pub total_calls: usize,

    /// Entries with success status
    pub success_count: usize,

    /// Entries with error status
    pub error_count: usize,

    /// Call count per team
    pub by_team: BTreeMap<String, usize>,

    /// Call count per tool
    pub by_tool: BTreeMap<String, usize>,

    /// Call count per status
    pub by_status: BTreeMap<String, usize>,

    /// Average duration rounded to the nearest millisecond, 0 when empty
    pub avg_duration_ms: u64,

    /// Inclusive window start actually used
    pub period_start: DateTime<Utc>,

    /// Inclusive window end actually used
    pub period_end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tool: &str, team: &str, status: CallStatus) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            tool: tool.to_string(),
            team: team.to_string(),
            params: serde_json::json!({"uuid": "app-42"}),
            status,
            response_summary: "deployment queued".to_string(),
            duration_ms: 120,
        }
    }

    #[test]
    fn test_status_parse_roundtrip() {
        assert_eq!("success".parse::<CallStatus>().unwrap(), CallStatus::Success);
        assert_eq!("ERROR".parse::<CallStatus>().unwrap(), CallStatus::Error);
        assert!("pending".parse::<CallStatus>().is_err());
        assert_eq!(CallStatus::Success.to_string(), "success");
    }

    #[test]
    fn test_empty_filters_match_everything() {
        let filters = SearchFilters::default();
        assert!(filters.matches(&entry("deploy_application", "acme", CallStatus::Success)));
    }

    #[test]
    fn test_keyword_searches_params() {
        let filters = SearchFilters {
            keyword: Some("APP-42".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&entry("deploy_application", "acme", CallStatus::Success)));
    }

    #[test]
    fn test_team_filter_is_exact() {
        let filters = SearchFilters {
            team: Some("ACME".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&entry("deploy_application", "acme", CallStatus::Success)));
        assert!(!filters.matches(&entry("deploy_application", "acme-staging", CallStatus::Success)));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let filters = SearchFilters {
            tool: Some("deploy".to_string()),
            status: Some(CallStatus::Error),
            ..Default::default()
        };
        assert!(!filters.matches(&entry("deploy_application", "acme", CallStatus::Success)));
        assert!(filters.matches(&entry("deploy_application", "acme", CallStatus::Error)));
    }
}
