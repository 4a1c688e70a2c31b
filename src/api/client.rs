use crate::api::models::{error_message, CreateTimerRequest, Paginated, StopTimerRequest, TimeEntry};
use crate::api::retry::{is_transient, with_retry_if};
use crate::error::WorktraceError;
use crate::timer::lifecycle::TimerAction;
use crate::timer::record::TimerRecord;
use crate::timer::ticker::TimerSource;
use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

pub struct WorktraceClient {
    client: Client,
    base_url: String,
    token: String,
    max_retries: u32,
    page_size: u32,
}

impl WorktraceClient {
    pub fn new(token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.to_string(),
            max_retries: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Client with a request timeout applied to every call.
    pub fn with_timeout(token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            ..Self::new(token)
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Retries for read requests. Status transitions are never retried.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn timer_url(&self, id: u64, action: Option<TimerAction>) -> String {
        match action {
            Some(action) => format!("{}/time-entry-timers/{}/{}/", self.base_url, id, action),
            None => format!("{}/time-entry-timers/{}/", self.base_url, id),
        }
    }

    /// All timers visible to the caller, following pagination.
    pub fn list_timers(&self) -> Result<Vec<TimerRecord>> {
        let mut url = format!(
            "{}/time-entry-timers/?page_size={}",
            self.base_url, self.page_size
        );
        let mut timers = Vec::new();

        loop {
            let page: Paginated<TimerRecord> =
                with_retry_if(|| self.get_json(&url), self.max_retries, is_transient)?;
            timers.extend(page.results);
            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(timers)
    }

    pub fn get_timer(&self, id: u64) -> Result<TimerRecord> {
        let url = self.timer_url(id, None);
        with_retry_if(|| self.get_json(&url), self.max_retries, is_transient)
    }

    pub fn create_timer(&self, project: u64, notes: Option<String>) -> Result<TimerRecord> {
        let url = format!("{}/time-entry-timers/", self.base_url);
        let request_body = CreateTimerRequest { project, notes };

        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&request_body)
            .send()
            .context("Failed to start timer")?;

        if !response.status().is_success() {
            return Err(api_error(response).into());
        }

        let timer = response
            .json::<TimerRecord>()
            .context("Failed to parse timer response")?;
        info!(timer_id = timer.id, project, "Timer started");
        Ok(timer)
    }

    pub fn pause_timer(&self, id: u64) -> Result<TimerRecord> {
        self.transition(id, TimerAction::Pause)
    }

    pub fn resume_timer(&self, id: u64) -> Result<TimerRecord> {
        self.transition(id, TimerAction::Resume)
    }

    /// Finalize a timer into a time entry. `summary` must not be blank.
    pub fn stop_timer(
        &self,
        id: u64,
        summary: &str,
        task: Option<String>,
        billable: bool,
    ) -> Result<TimeEntry> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(WorktraceError::MissingSummary.into());
        }

        let request_body = StopTimerRequest {
            summary: summary.to_string(),
            task: task.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            billable,
        };

        let url = self.timer_url(id, Some(TimerAction::Stop));
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&request_body)
            .send()
            .context("Failed to stop timer")?;

        if !response.status().is_success() {
            return Err(rejected(TimerAction::Stop, response).into());
        }

        let entry = response
            .json::<TimeEntry>()
            .context("Failed to parse time entry response")?;
        info!(timer_id = id, entry_id = entry.id, "Timer stopped");
        Ok(entry)
    }

    fn transition(&self, id: u64, action: TimerAction) -> Result<TimerRecord> {
        let url = self.timer_url(id, Some(action));
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .send()
            .with_context(|| format!("Failed to {} timer", action))?;

        if !response.status().is_success() {
            return Err(rejected(action, response).into());
        }

        let timer = response
            .json::<TimerRecord>()
            .context("Failed to parse timer response")?;
        info!(timer_id = id, status = %timer.status, "Timer {}d", action);
        Ok(timer)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .context("Failed to reach Worktrace API")?;

        if !response.status().is_success() {
            return Err(api_error(response).into());
        }

        response
            .json::<T>()
            .context("Failed to parse Worktrace API response")
    }
}

impl TimerSource for WorktraceClient {
    fn fetch(&self) -> Result<Vec<TimerRecord>> {
        self.list_timers()
    }
}

fn read_message(response: Response) -> (u16, String) {
    let status = response.status();
    let message = response
        .json::<serde_json::Value>()
        .ok()
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| format!("status {}", status));
    (status.as_u16(), message)
}

fn api_error(response: Response) -> WorktraceError {
    let (status, message) = read_message(response);
    WorktraceError::Api { status, message }
}

fn rejected(action: TimerAction, response: Response) -> WorktraceError {
    let (_, message) = read_message(response);
    WorktraceError::TransitionRejected { action, message }
}
