//! Where Worktrace keeps its local files.
//!
//! The state directory is resolved through a chain of candidates, each checked
//! for write access before it is used.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".worktrace";

/// Lock and snapshot file locations inside a state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub lock: PathBuf,
    pub state: PathBuf,
}

impl StatePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            lock: dir.join("state.lock"),
            state: dir.join("state.json"),
        }
    }
}

/// Resolve the state directory.
///
/// Order: explicit override, `~/.worktrace`, the platform data directory
/// (`~/.local/share/worktrace` and friends), then `./.worktrace`.
pub fn get_state_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        ensure_writable(dir)?;
        return Ok(dir.to_path_buf());
    }

    let candidates = home::home_dir()
        .map(|home| home.join(APP_DIR))
        .into_iter()
        .chain(dirs::data_local_dir().map(|data| data.join("worktrace")));

    for dir in candidates {
        match ensure_writable(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) => tracing::warn!("Cannot use {}: {:#}. Trying fallback.", dir.display(), e),
        }
    }

    let dir = PathBuf::from(APP_DIR);
    ensure_writable(&dir).context(
        "Cannot create state directory in any location. \
         Check file permissions or set state.state_dir_override in config.",
    )?;
    Ok(dir)
}

/// Create `dir` if needed and confirm we can write into it.
pub fn ensure_writable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let probe = dir.join(".write_test");
    fs::write(&probe, b"test")
        .with_context(|| format!("Directory {} is not writable", dir.display()))?;

    // best effort; the probe file is harmless if it lingers
    let _ = fs::remove_file(&probe);

    Ok(())
}

pub fn state_paths(state_dir_override: Option<&Path>) -> Result<StatePaths> {
    let dir = get_state_dir(state_dir_override)?;
    Ok(StatePaths::in_dir(&dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_override_dir_takes_priority() {
        let temp = TempDir::new().unwrap();

        let result = get_state_dir(Some(temp.path())).unwrap();
        assert_eq!(result, temp.path());
    }

    #[test]
    fn test_ensure_writable_creates_nested_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_writable(&nested).unwrap();
        assert!(nested.exists());
        assert!(!nested.join(".write_test").exists());
    }

    #[test]
    fn test_state_paths_with_override() {
        let temp = TempDir::new().unwrap();

        let paths = state_paths(Some(temp.path())).unwrap();
        assert_eq!(paths.lock, temp.path().join("state.lock"));
        assert_eq!(paths.state, temp.path().join("state.json"));
    }
}
