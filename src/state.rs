//! Local state file: the last synced timer snapshot and the timer this client
//! started most recently. Writers serialize through an exclusive file lock.

use crate::timer::record::TimerRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::Path;

pub const STATE_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct State {
    pub version: String,
    #[serde(default)]
    pub last_started_timer: Option<u64>,
    #[serde(default)]
    pub snapshot: Option<TimerSnapshot>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            last_started_timer: None,
            snapshot: None,
        }
    }
}

/// Timer records exactly as last returned by the server.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimerSnapshot {
    pub synced_at: DateTime<Utc>,
    pub timers: Vec<TimerRecord>,
}

impl State {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).context("Failed to read state file")?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&content).context("Failed to parse state JSON")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // write-then-rename so a crash never leaves a half-written file
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Record a fresh server listing.
    pub fn record_snapshot(&mut self, timers: Vec<TimerRecord>, synced_at: DateTime<Utc>) {
        self.snapshot = Some(TimerSnapshot { synced_at, timers });
    }

    /// Replace one timer in the snapshot with the server's latest copy.
    pub fn update_timer(&mut self, timer: &TimerRecord) {
        if let Some(snapshot) = &mut self.snapshot {
            match snapshot.timers.iter_mut().find(|t| t.id == timer.id) {
                Some(existing) => *existing = timer.clone(),
                None => snapshot.timers.push(timer.clone()),
            }
        }
    }

    /// Forget a stopped timer.
    pub fn forget_timer(&mut self, id: u64) {
        if let Some(snapshot) = &mut self.snapshot {
            snapshot.timers.retain(|t| t.id != id);
        }
        if self.last_started_timer == Some(id) {
            self.last_started_timer = None;
        }
    }
}

/// Run `f` against the state under an exclusive lock, saving on success.
pub fn with_state_lock<F, R>(lock_path: &Path, state_path: &Path, f: F) -> Result<R>
where
    F: FnOnce(&mut State) -> Result<R>,
{
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(lock_path)
        .context("Failed to open lock file")?;

    file.lock_exclusive().context("Failed to acquire lock")?;

    let mut state = State::load(state_path)?;

    let result = f(&mut state);

    if result.is_ok() {
        state.save(state_path)?;
    }

    file.unlock().context("Failed to unlock")?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::record::TimerStatus;
    use chrono::TimeZone;

    fn timer(id: u64, status: TimerStatus, accumulated: u64) -> TimerRecord {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 7, 9, 0, 0).unwrap();
        TimerRecord {
            id,
            project: 1,
            project_name: "Website revamp".to_string(),
            user: Some(1),
            user_email: "ana@example.com".to_string(),
            status,
            started_at: t0,
            last_resumed_at: (status == TimerStatus::Running).then_some(t0),
            accumulated_seconds: accumulated,
            elapsed_seconds: None,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_update_and_forget_timer() {
        let mut state = State::default();
        state.last_started_timer = Some(1);
        state.record_snapshot(vec![timer(1, TimerStatus::Running, 0)], Utc::now());

        state.update_timer(&timer(1, TimerStatus::Paused, 90));
        state.update_timer(&timer(2, TimerStatus::Running, 0));
        let snapshot = state.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.timers.len(), 2);
        assert_eq!(snapshot.timers[0].accumulated_seconds, 90);

        state.forget_timer(1);
        assert_eq!(state.snapshot.as_ref().unwrap().timers.len(), 1);
        assert_eq!(state.last_started_timer, None);
    }

    #[test]
    fn test_update_without_snapshot_is_noop() {
        let mut state = State::default();
        state.update_timer(&timer(1, TimerStatus::Running, 0));
        assert!(state.snapshot.is_none());
    }
}
