use crate::error::WorktraceError;
use anyhow::Result;
use std::thread::sleep;
use std::time::Duration;
use tracing::warn;

/// Retry an operation with exponential backoff, giving up immediately on
/// errors `retryable` rejects.
pub fn with_retry_if<F, T, P>(operation: F, max_retries: u32, retryable: P) -> Result<T>
where
    F: Fn() -> Result<T>,
    P: Fn(&anyhow::Error) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries && retryable(&e) => {
                let backoff_ms = 2_u64.pow(attempt) * 100; // 100ms, 200ms, 400ms, 800ms...
                warn!(
                    "API call failed (attempt {}/{}): {:#}. Retrying in {}ms...",
                    attempt + 1,
                    max_retries,
                    e,
                    backoff_ms
                );
                sleep(Duration::from_millis(backoff_ms));
                attempt += 1;
            }
            Err(e) => {
                if attempt > 0 {
                    warn!("API call failed after {} attempts", attempt + 1);
                }
                return Err(e);
            }
        }
    }
}

/// Connection failures and 5xx/429 responses are worth another try. Client
/// errors and bodies that fail to deserialize are not.
pub fn is_transient(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<WorktraceError>() {
        return e.is_retryable();
    }
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        return !e.is_decode();
    }
    err.downcast_ref::<serde_json::Error>().is_none()
}
