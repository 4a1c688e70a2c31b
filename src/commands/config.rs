use crate::config::Config;
use anyhow::{Context, Result};

/// Print the effective configuration as TOML, with any token redacted.
pub fn list(config: &Config) -> Result<()> {
    let toml_str = toml::to_string_pretty(&redacted(config)).context("Failed to serialize config")?;
    println!("{}", toml_str);
    Ok(())
}

/// Print a single value addressed by dotted path, e.g. `api.base_url`.
pub fn get(key: &str, config: &Config) -> Result<()> {
    println!("{}", lookup(key, config)?);
    Ok(())
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.api.token.is_some() {
        config.api.token = Some("********".to_string());
    }
    config
}

pub fn lookup(key: &str, config: &Config) -> Result<String> {
    let value = serde_json::to_value(redacted(config)).context("Failed to serialize config")?;

    let mut current = &value;
    for part in key.split('.') {
        current = current
            .get(part)
            .with_context(|| format!("Key not found: {}", key))?;
    }

    Ok(match current {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        v => v.to_string(),
    })
}
