use crate::config::Config;
use crate::platform::state_paths;
use crate::session::clear_credentials;
use anyhow::{Context, Result};

/// Store an API access token. Obtaining the token is up to the backend.
pub fn login(config: &Config, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token must not be empty");
    }
    if !config.api.use_keyring {
        anyhow::bail!(
            "Keyring storage is disabled (api.use_keyring = false). \
             Set api.token in ~/.worktrace/config.toml instead."
        );
    }

    crate::keyring::store_api_token(&config.api.base_url, token)
        .context("Failed to store API token")?;
    println!("✓ Token for {} stored in system keyring", config.api.base_url);
    Ok(())
}

/// Drop the stored token and every locally cached timer.
pub fn logout(config: &Config) -> Result<()> {
    let paths = state_paths(config.state.state_dir_override.as_deref())?;
    clear_credentials(config, &paths)?;
    println!("✓ Logged out");
    Ok(())
}
