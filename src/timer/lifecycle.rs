use crate::error::WorktraceError;
use crate::timer::record::TimerStatus;
use serde::Serialize;
use std::fmt;

/// Client-observed phase of a timer. `Stopped` only exists on the client side:
/// once stopped, the server turns the timer into a time entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Running,
    Paused,
    Stopped,
}

impl From<TimerStatus> for TimerPhase {
    fn from(status: TimerStatus) -> Self {
        match status {
            TimerStatus::Running => TimerPhase::Running,
            TimerStatus::Paused => TimerPhase::Paused,
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerPhase::Running => write!(f, "running"),
            TimerPhase::Paused => write!(f, "paused"),
            TimerPhase::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerAction::Pause => write!(f, "pause"),
            TimerAction::Resume => write!(f, "resume"),
            TimerAction::Stop => write!(f, "stop"),
        }
    }
}

/// Phase the server is expected to report after `action` succeeds.
///
/// This only decides which controls to offer. The record the server returns
/// is what gets displayed.
pub fn next_phase(phase: TimerPhase, action: TimerAction) -> Result<TimerPhase, WorktraceError> {
    match (phase, action) {
        (TimerPhase::Running, TimerAction::Pause) => Ok(TimerPhase::Paused),
        (TimerPhase::Paused, TimerAction::Resume) => Ok(TimerPhase::Running),
        (TimerPhase::Running | TimerPhase::Paused, TimerAction::Stop) => Ok(TimerPhase::Stopped),
        (phase, action) => Err(WorktraceError::InvalidTransition { phase, action }),
    }
}

/// Actions offered for a timer in `phase`.
pub fn available_actions(phase: TimerPhase) -> &'static [TimerAction] {
    match phase {
        TimerPhase::Running => &[TimerAction::Pause, TimerAction::Stop],
        TimerPhase::Paused => &[TimerAction::Resume, TimerAction::Stop],
        TimerPhase::Stopped => &[],
    }
}
