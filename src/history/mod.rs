//! Bounded, append-only log of past runs persisted as one JSON array.
//!
//! Every `collect` does load → append → save. The cycle is not atomic across
//! processes: two concurrent invocations both read the same file and the later
//! save wins, dropping the other run. The save itself goes through a temp file
//! and rename, so readers never observe a half-written file.

use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregator::RunSnapshot;
use crate::error::{MetricsError, Result};
use crate::fs;

/// Maximum number of runs kept; older entries are evicted first.
pub const MAX_ENTRIES: usize = 50;

/// Past runs, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<RunSnapshot>,
}

impl History {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RunSnapshot] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RunSnapshot> {
        self.entries.iter()
    }

    /// The last `n` runs, oldest first.
    pub fn recent(&self, n: usize) -> &[RunSnapshot] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }
}

impl From<Vec<RunSnapshot>> for History {
    fn from(entries: Vec<RunSnapshot>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a RunSnapshot;
    type IntoIter = std::slice::Iter<'a, RunSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Load the history at `path`. A missing file is an empty history.
///
/// Entries whose percentages are `NaN`/`Infinity` are skipped with a warning
/// and disappear from the file on the next save.
///
/// # Errors
/// [`MetricsError::Io`] if the file exists but cannot be read,
/// [`MetricsError::MalformedHistory`] if it is not a JSON array of runs.
pub fn load(path: &Path) -> Result<History> {
    let Some(content) = fs::read_text(path)? else {
        tracing::debug!(path = %path.display(), "no history file yet");
        return Ok(History::default());
    };
    let malformed = |source| MetricsError::MalformedHistory {
        path: path.to_path_buf(),
        source,
    };
    let raw: Vec<Value> = serde_json::from_str(&content).map_err(malformed)?;
    let total = raw.len();
    let kept: Vec<Value> = raw
        .into_iter()
        .enumerate()
        .filter(|(idx, entry)| {
            let usable = !has_unrepresentable_percent(entry);
            if !usable {
                tracing::warn!(
                    path = %path.display(),
                    entry = idx,
                    "skipping history entry with a non-finite savedPercent"
                );
            }
            usable
        })
        .map(|(_, entry)| entry)
        .collect();
    let history: History = serde_json::from_value(Value::Array(kept)).map_err(malformed)?;
    tracing::debug!(
        path = %path.display(),
        entries = history.len(),
        skipped = total - history.len(),
        "loaded history"
    );
    Ok(history)
}

/// True when the run's total or any category carries a percentage such as
/// `"NaN%"`, left behind by zero-token runs of older writers.
fn has_unrepresentable_percent(entry: &Value) -> bool {
    let non_finite = |stats: &Value| {
        stats
            .get("savedPercent")
            .and_then(Value::as_str)
            .and_then(|s| s.trim().trim_end_matches('%').trim_end().parse::<f64>().ok())
            .is_some_and(|v| !v.is_finite())
    };
    entry.get("total").is_some_and(non_finite)
        || entry
            .get("perCategory")
            .and_then(Value::as_object)
            .is_some_and(|cats| cats.values().any(non_finite))
}

/// Append `snapshot`, evicting the oldest runs beyond [`MAX_ENTRIES`].
#[must_use]
pub fn append(mut history: History, snapshot: RunSnapshot) -> History {
    history.entries.push(snapshot);
    let excess = history.entries.len().saturating_sub(MAX_ENTRIES);
    if excess > 0 {
        tracing::debug!(evicted = excess, "history over capacity");
        history.entries.drain(..excess);
    }
    history
}

/// Persist `history` to `path`, creating parent directories as needed.
///
/// # Errors
/// [`MetricsError::Io`] if the directory, temp file or rename fails.
pub fn save(path: &Path, history: &History) -> Result<()> {
    let parent = fs::ensure_parent(path)?;
    let json = serde_json::to_string_pretty(history)
        .map_err(|e| MetricsError::Encoding(format!("history: {e}")))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)
        .map_err(|e| MetricsError::io("create temp file in", &parent, e))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| MetricsError::io("write", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| MetricsError::io("replace", path, e.error))?;

    tracing::info!(path = %path.display(), entries = history.len(), "history saved");
    Ok(())
}
