//! The application context.
//!
//! One `Session` is built at startup and passed by reference to whatever needs
//! configuration, the API client, the timer cache or the clock. Nothing in the
//! crate keeps these in globals.

use crate::api::client::WorktraceClient;
use crate::api::models::TimeEntry;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::WorktraceError;
use crate::platform::{state_paths, StatePaths};
use crate::state::{with_state_lock, State};
use crate::timer::board::{TimerBoard, TimerRow};
use crate::timer::lifecycle::{next_phase, TimerAction, TimerPhase};
use crate::timer::record::TimerRecord;
use crate::timer::ticker::{lock_board, SharedBoard};
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

pub struct Session {
    config: Config,
    client: Arc<WorktraceClient>,
    board: SharedBoard,
    clock: Arc<dyn Clock>,
    paths: StatePaths,
}

impl Session {
    /// Build a session from configuration, resolving the token and state dir.
    pub fn open(config: Config) -> Result<Self> {
        let token = config.get_token()?;
        let client = WorktraceClient::with_timeout(&token, config.api.timeout())?
            .with_base_url(&config.api.base_url)
            .with_max_retries(config.api.max_retries)
            .with_page_size(config.display.page_size);
        let paths = state_paths(config.state.state_dir_override.as_deref())?;

        Ok(Self::from_parts(
            config,
            Arc::new(client),
            Arc::new(SystemClock),
            paths,
        ))
    }

    pub fn from_parts(
        config: Config,
        client: Arc<WorktraceClient>,
        clock: Arc<dyn Clock>,
        paths: StatePaths,
    ) -> Self {
        Self {
            config,
            client,
            board: Arc::new(Mutex::new(TimerBoard::new())),
            clock,
            paths,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> Arc<WorktraceClient> {
        self.client.clone()
    }

    pub fn board(&self) -> SharedBoard {
        self.board.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn rows(&self) -> Vec<TimerRow> {
        lock_board(&self.board).rows(self.clock.now())
    }

    /// Refetch every timer and remember the result locally.
    pub fn refresh(&self) -> Result<Vec<TimerRow>> {
        let timers = self.client.list_timers()?;
        let synced_at = self.clock.now();

        self.with_state(|state| {
            state.record_snapshot(timers.clone(), synced_at);
            Ok(())
        })?;
        lock_board(&self.board).replace_all(timers, synced_at);

        Ok(self.rows())
    }

    /// Load the last snapshot into the board without touching the network.
    pub fn load_snapshot(&self) -> Result<Vec<TimerRow>> {
        let state = State::load(&self.paths.state)?;
        let Some(snapshot) = state.snapshot else {
            anyhow::bail!("No cached timers yet. Run 'wt status' while online first.");
        };
        lock_board(&self.board).replace_all(snapshot.timers, snapshot.synced_at);
        Ok(self.rows())
    }

    /// The timer a command targets: `id` when given, else the one this client
    /// started most recently.
    pub fn resolve_timer(&self, id: Option<u64>) -> Result<u64> {
        if let Some(id) = id {
            return Ok(id);
        }
        State::load(&self.paths.state)?
            .last_started_timer
            .context("No timer ID given and no timer started from this machine")
    }

    /// Fetch one timer and fold it into the board and the local snapshot.
    pub fn show(&self, id: u64) -> Result<TimerRecord> {
        let timer = self.client.get_timer(id)?;

        self.with_state(|state| {
            state.update_timer(&timer);
            Ok(())
        })?;
        lock_board(&self.board).apply(timer.clone());

        Ok(timer)
    }

    pub fn start(&self, project: u64, notes: Option<String>) -> Result<TimerRecord> {
        let timer = self.client.create_timer(project, notes)?;

        self.with_state(|state| {
            state.last_started_timer = Some(timer.id);
            state.update_timer(&timer);
            Ok(())
        })?;
        lock_board(&self.board).apply(timer.clone());

        Ok(timer)
    }

    pub fn pause(&self, id: u64) -> Result<TimerRecord> {
        self.transition(id, TimerAction::Pause, |client| client.pause_timer(id))
    }

    pub fn resume(&self, id: u64) -> Result<TimerRecord> {
        self.transition(id, TimerAction::Resume, |client| client.resume_timer(id))
    }

    pub fn stop(
        &self,
        id: u64,
        summary: &str,
        task: Option<String>,
        billable: bool,
    ) -> Result<TimeEntry> {
        if summary.trim().is_empty() {
            return Err(WorktraceError::MissingSummary.into());
        }

        let entry = self.guarded(id, TimerAction::Stop, |client| {
            client.stop_timer(id, summary, task, billable)
        })?;

        lock_board(&self.board).remove(id);
        self.with_state(|state| {
            state.forget_timer(id);
            Ok(())
        })?;

        Ok(entry)
    }

    /// Forget the stored token and every cached timer.
    pub fn logout(&self) -> Result<()> {
        clear_credentials(&self.config, &self.paths)?;
        lock_board(&self.board).replace_all(Vec::new(), self.clock.now());
        Ok(())
    }

    fn transition<F>(&self, id: u64, action: TimerAction, request: F) -> Result<TimerRecord>
    where
        F: FnOnce(&WorktraceClient) -> Result<TimerRecord>,
    {
        let timer = self.guarded(id, action, request)?;

        self.with_state(|state| {
            state.update_timer(&timer);
            Ok(())
        })?;
        lock_board(&self.board).apply(timer.clone());

        Ok(timer)
    }

    /// Send one mutation for `id`, refusing a second while the first is in
    /// flight. On failure the cached record is left exactly as it was.
    fn guarded<T, F>(&self, id: u64, action: TimerAction, request: F) -> Result<T>
    where
        F: FnOnce(&WorktraceClient) -> Result<T>,
    {
        {
            let mut board = lock_board(&self.board);
            if let Some(cached) = board.get(id) {
                next_phase(TimerPhase::from(cached.status), action)?;
            }
            if !board.begin_mutation(id) {
                anyhow::bail!("A request for timer {} is already in progress", id);
            }
        }

        let result = request(&self.client);
        lock_board(&self.board).finish_mutation(id);

        if let Err(e) = &result {
            tracing::warn!(timer_id = id, %action, "Timer request failed: {:#}", e);
        }
        result
    }

    fn with_state<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut State) -> Result<R>,
    {
        with_state_lock(&self.paths.lock, &self.paths.state, f).context("Failed to update local state")
    }
}

/// Delete the keyring token and reset the local state file. Works without a
/// valid token, so a broken login can always be cleared.
pub fn clear_credentials(config: &Config, paths: &StatePaths) -> Result<()> {
    if config.api.use_keyring {
        match crate::keyring::delete_api_token(&config.api.base_url) {
            Ok(removed) => tracing::debug!(removed, "Keyring token cleared"),
            Err(e) => tracing::warn!("Could not clear keyring token: {:#}", e),
        }
    }
    with_state_lock(&paths.lock, &paths.state, |state| {
        *state = State::default();
        Ok(())
    })
    .context("Failed to reset local state")
}
