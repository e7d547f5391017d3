//! Centralised toon-metrics user-directory resolution.
//!
//! When `TOON_METRICS_HOME` is set, it replaces the platform-native config and
//! data directories. Project-local `.toon-metrics/` directories are unaffected.
//!
//! History file priority:
//!   1. `--history-file` flag
//!   2. `TOON_METRICS_HISTORY` env var
//!   3. `[history] path` in config
//!   4. `{user_data_dir}/metrics-history.json`

use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "TOON_METRICS_HOME";
pub const HISTORY_ENV: &str = "TOON_METRICS_HISTORY";
pub const HISTORY_FILE_NAME: &str = "metrics-history.json";

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn resolve_user_path(dirs_fallback: Option<PathBuf>) -> Option<PathBuf> {
    non_empty_env(HOME_ENV).map(PathBuf::from).or(dirs_fallback)
}

/// Base directory for user-level config (`config.toml`).
pub fn user_dir() -> Option<PathBuf> {
    resolve_user_path(dirs::config_dir().map(|d| d.join("toon-metrics")))
}

/// Base directory for the history file. Same as [`user_dir`] under `TOON_METRICS_HOME`.
pub fn user_data_dir() -> Option<PathBuf> {
    resolve_user_path(dirs::data_local_dir().map(|d| d.join("toon-metrics")))
}

/// Resolve the history file path. `None` only when no platform data
/// directory exists and nothing was configured.
pub fn history_path(flag: Option<&Path>, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = flag {
        return Some(p.to_path_buf());
    }
    if let Some(p) = non_empty_env(HISTORY_ENV) {
        return Some(PathBuf::from(p));
    }
    if let Some(p) = configured {
        return Some(p.to_path_buf());
    }
    user_data_dir().map(|d| d.join(HISTORY_FILE_NAME))
}
