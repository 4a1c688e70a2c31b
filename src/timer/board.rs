//! Client-side cache of the timers currently on display.
//!
//! Records are only ever replaced wholesale by what the server returns; the
//! board never edits `accumulated_seconds` or `last_resumed_at` itself.

use crate::timer::elapsed::{compute_elapsed_seconds, format_elapsed_secs};
use crate::timer::lifecycle::{available_actions, TimerAction, TimerPhase};
use crate::timer::record::{TimerRecord, TimerStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// One display row, derived from a cached record at a given instant.
#[derive(Debug, Clone, Serialize)]
pub struct TimerRow {
    pub id: u64,
    pub project_name: String,
    pub user_email: String,
    pub status: TimerStatus,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub elapsed: String,
    pub actions: Vec<TimerAction>,
    pub pending: bool,
}

#[derive(Debug, Default)]
pub struct TimerBoard {
    timers: BTreeMap<u64, TimerRecord>,
    in_flight: HashSet<u64>,
    last_sync: Option<DateTime<Utc>>,
    revision: u64,
}

impl TimerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with a fresh list from the server.
    pub fn replace_all(&mut self, records: Vec<TimerRecord>, synced_at: DateTime<Utc>) {
        self.timers = records.into_iter().map(|r| (r.id, r)).collect();
        self.in_flight.retain(|id| self.timers.contains_key(id));
        self.last_sync = Some(synced_at);
        self.revision += 1;
    }

    /// Accept a record returned by a mutation as authoritative.
    pub fn apply(&mut self, record: TimerRecord) {
        self.timers.insert(record.id, record);
        self.revision += 1;
    }

    /// Drop a timer that has been stopped.
    pub fn remove(&mut self, id: u64) -> Option<TimerRecord> {
        self.in_flight.remove(&id);
        self.revision += 1;
        self.timers.remove(&id)
    }

    pub fn get(&self, id: u64) -> Option<&TimerRecord> {
        self.timers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Bumped on every change to the cached records or pending set.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True while at least one displayed timer needs a per-second refresh.
    pub fn has_running(&self) -> bool {
        self.timers.values().any(TimerRecord::is_running)
    }

    /// Mark a mutation for `id` as in flight. Returns false if one already is,
    /// in which case the caller must not send another request.
    pub fn begin_mutation(&mut self, id: u64) -> bool {
        let inserted = self.in_flight.insert(id);
        if inserted {
            self.revision += 1;
        }
        inserted
    }

    pub fn finish_mutation(&mut self, id: u64) {
        if self.in_flight.remove(&id) {
            self.revision += 1;
        }
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.in_flight.contains(&id)
    }

    /// Rows ordered by id, newest first, with elapsed time as of `now`.
    pub fn rows(&self, now: DateTime<Utc>) -> Vec<TimerRow> {
        self.timers
            .values()
            .rev()
            .map(|record| {
                let elapsed_seconds = compute_elapsed_seconds(record, now);
                let pending = self.is_pending(record.id);
                let actions = if pending {
                    Vec::new()
                } else {
                    available_actions(TimerPhase::from(record.status)).to_vec()
                };
                TimerRow {
                    id: record.id,
                    project_name: record.project_name.clone(),
                    user_email: record.user_email.clone(),
                    status: record.status,
                    started_at: record.started_at,
                    elapsed_seconds,
                    elapsed: format_elapsed_secs(elapsed_seconds),
                    actions,
                    pending,
                }
            })
            .collect()
    }
}
