use crate::timer::lifecycle::{TimerAction, TimerPhase};
use thiserror::Error;

/// Failures that are surfaced to the user. Display-only anomalies in the
/// elapsed computation never end up here.
#[derive(Debug, Error)]
pub enum WorktraceError {
    /// The server refused a pause/resume/stop request.
    #[error("Could not {action} timer: {message}")]
    TransitionRejected { action: TimerAction, message: String },

    /// The requested action is not offered from the timer's current phase.
    #[error("Cannot {action} a {phase} timer")]
    InvalidTransition {
        phase: TimerPhase,
        action: TimerAction,
    },

    #[error("A non-empty summary is required to stop a timer")]
    MissingSummary,

    #[error("Worktrace API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("API token not found. Run 'wt login --token <TOKEN>' to configure")]
    MissingToken,
}

impl WorktraceError {
    /// True when the user can reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorktraceError::TransitionRejected { .. } => true,
            WorktraceError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_rejected_message() {
        let err = WorktraceError::TransitionRejected {
            action: TimerAction::Pause,
            message: "Timer is not running.".to_string(),
        };
        assert_eq!(err.to_string(), "Could not pause timer: Timer is not running.");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = WorktraceError::InvalidTransition {
            phase: TimerPhase::Stopped,
            action: TimerAction::Resume,
        };
        assert_eq!(err.to_string(), "Cannot resume a stopped timer");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_api_error_retryable_on_server_failure() {
        let server = WorktraceError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        let client = WorktraceError::Api {
            status: 404,
            message: "not found".to_string(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }
}
