//! API tokens in the OS keyring, one entry per Worktrace server.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE: &str = "worktrace-api";

/// Keyring account for a server, so tokens for different deployments never
/// overwrite each other. `https://Host/api/` and `https://host/api` share one.
pub fn account_for(base_url: &str) -> String {
    let url = base_url.trim().trim_end_matches('/');
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
            let mut account = format!("{}://{}", scheme.to_ascii_lowercase(), host.to_ascii_lowercase());
            if !path.is_empty() {
                account.push('/');
                account.push_str(path);
            }
            account
        }
        None => url.to_ascii_lowercase(),
    }
}

fn entry(base_url: &str) -> Result<Entry> {
    Entry::new(SERVICE, &account_for(base_url)).context("Failed to open keyring entry")
}

pub fn store_api_token(base_url: &str, token: &str) -> Result<()> {
    entry(base_url)?
        .set_password(token)
        .with_context(|| format!("Failed to store API token for {}", base_url))
}

/// `None` when no token was ever stored for this server.
pub fn get_api_token(base_url: &str) -> Result<Option<String>> {
    match entry(base_url)?.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e).context("Failed to read API token from keyring"),
    }
}

/// Returns whether a token was actually removed.
pub fn delete_api_token(base_url: &str) -> Result<bool> {
    match entry(base_url)?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => Err(e).context("Failed to delete API token from keyring"),
    }
}
