use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Running,
    Paused,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerStatus::Running => write!(f, "running"),
            TimerStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Server-authoritative timer as returned by `/time-entry-timers/`.
///
/// The client never mutates `accumulated_seconds` or `last_resumed_at`; it only
/// derives the live elapsed value from them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimerRecord {
    pub id: u64,
    pub project: u64,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub user: Option<u64>,
    #[serde(default)]
    pub user_email: String,
    pub status: TimerStatus,
    /// Informational only, not used for elapsed time.
    pub started_at: DateTime<Utc>,
    pub last_resumed_at: Option<DateTime<Utc>>,
    pub accumulated_seconds: u64,
    /// Server-side snapshot at response time.
    #[serde(default)]
    pub elapsed_seconds: Option<u64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TimerRecord {
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_running_timer() {
        let json = json!({
            "id": 12,
            "project": 3,
            "project_name": "Website revamp",
            "user": 7,
            "user_email": "ana@example.com",
            "status": "running",
            "started_at": "2026-01-07T09:00:00Z",
            "last_resumed_at": "2026-01-07T09:00:00Z",
            "accumulated_seconds": 0,
            "elapsed_seconds": 42,
            "notes": "",
            "created_at": "2026-01-07T09:00:00Z",
            "updated_at": "2026-01-07T09:00:00Z"
        });

        let timer: TimerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(timer.id, 12);
        assert_eq!(timer.status, TimerStatus::Running);
        assert!(timer.is_running());
        assert!(timer.last_resumed_at.is_some());
        assert_eq!(timer.elapsed_seconds, Some(42));
    }

    #[test]
    fn test_deserialize_minimal_paused_timer() {
        let json = json!({
            "id": 5,
            "project": 1,
            "status": "paused",
            "started_at": "2026-01-07T09:00:00Z",
            "last_resumed_at": null,
            "accumulated_seconds": 90,
            "some_future_field": true
        });

        let timer: TimerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(timer.status, TimerStatus::Paused);
        assert_eq!(timer.accumulated_seconds, 90);
        assert!(timer.last_resumed_at.is_none());
        assert_eq!(timer.project_name, "");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let json = json!({
            "id": 5,
            "project": 1,
            "status": "stopped",
            "started_at": "2026-01-07T09:00:00Z",
            "last_resumed_at": null,
            "accumulated_seconds": 0
        });

        assert!(serde_json::from_value::<TimerRecord>(json).is_err());
    }
}
