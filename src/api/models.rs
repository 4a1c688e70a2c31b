use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page-number pagination envelope used by list endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Request body for starting a timer
#[derive(Debug, Serialize)]
pub struct CreateTimerRequest {
    pub project: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Request body for stopping a timer
#[derive(Debug, Serialize)]
pub struct StopTimerRequest {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub billable: bool,
}

/// Time entry produced by stopping a timer
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeEntry {
    pub id: u64,
    pub project: u64,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub user_email: String,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub duration_minutes: u64,
    pub task: String,
    #[serde(default)]
    pub notes: String,
    pub billable: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Pull the first human-readable message out of an error body.
///
/// Handles `{"detail": "..."}` as well as field maps like
/// `{"non_field_errors": ["..."]}` or `{"summary": "..."}`.
pub fn error_message(body: &Value) -> Option<String> {
    fn first_string(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.iter().find_map(first_string),
            Value::Object(map) => map.values().find_map(first_string),
            _ => None,
        }
    }

    if let Some(detail) = body.get("detail").and_then(first_string) {
        return Some(detail);
    }
    first_string(body)
}
