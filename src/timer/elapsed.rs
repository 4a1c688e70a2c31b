//! Live elapsed time for a timer record.
//!
//! The server banks time in `accumulated_seconds` on every pause; while a timer
//! runs, the open interval since `last_resumed_at` is added on top. The open
//! interval never contributes a negative amount, so a client clock that lags the
//! server only freezes the display instead of rewinding it.

use crate::timer::record::{TimerRecord, TimerStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Recoverable oddities absorbed while computing elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElapsedAnomaly {
    /// `running` record without `last_resumed_at`.
    MalformedRecord,
    /// Reference instant precedes `last_resumed_at`.
    NegativeInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub seconds: u64,
    pub anomaly: Option<ElapsedAnomaly>,
}

/// Elapsed seconds for `record` as of `reference`, with any absorbed anomaly.
pub fn reconcile(record: &TimerRecord, reference: DateTime<Utc>) -> Reconciled {
    let banked = record.accumulated_seconds;

    if record.status == TimerStatus::Paused {
        return Reconciled {
            seconds: banked,
            anomaly: None,
        };
    }

    let Some(resumed_at) = record.last_resumed_at else {
        return Reconciled {
            seconds: banked,
            anomaly: Some(ElapsedAnomaly::MalformedRecord),
        };
    };

    // num_seconds truncates toward zero, which is floor for the non-negative case
    let delta = reference.signed_duration_since(resumed_at).num_seconds();
    if delta < 0 {
        return Reconciled {
            seconds: banked,
            anomaly: Some(ElapsedAnomaly::NegativeInterval),
        };
    }

    Reconciled {
        seconds: banked.saturating_add(delta as u64),
        anomaly: None,
    }
}

pub fn compute_elapsed_seconds(record: &TimerRecord, reference: DateTime<Utc>) -> u64 {
    let reconciled = reconcile(record, reference);
    if let Some(anomaly) = reconciled.anomaly {
        tracing::debug!(timer_id = record.id, ?anomaly, "absorbed elapsed-time anomaly");
    }
    reconciled.seconds
}

/// `HH:MM:SS`, hours unbounded. Negative input renders as zero.
pub fn format_elapsed(total_seconds: i64) -> String {
    let secs = total_seconds.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Convenience for the common `u64` path.
pub fn format_elapsed_secs(total_seconds: u64) -> String {
    format_elapsed(i64::try_from(total_seconds).unwrap_or(i64::MAX))
}
