//! Verbose-vs-compact comparison for a single document.
//!
//! Token counts are an estimate, not a tokenizer: `ceil(bytes / 4)` applied to
//! each serialized form independently. Treat absolute values as approximate;
//! ratios between the two forms are what matter.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::codec::Codec;
use crate::error::{MetricsError, Result};

const BYTES_PER_TOKEN: u64 = 4;

/// Estimated token count for `bytes` of serialized text.
pub const fn estimate_tokens(bytes: u64) -> u64 {
    bytes.div_ceil(BYTES_PER_TOKEN)
}

/// Savings percentage rounded to one decimal, written as `"NN.N%"`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SavedPercent(f64);

impl SavedPercent {
    /// `saved / verbose × 100`, rounded to one decimal.
    ///
    /// # Errors
    /// Returns [`MetricsError::DivideByZero`] when `verbose_tokens` is zero.
    pub fn from_tokens(saved_tokens: i64, verbose_tokens: u64) -> Result<Self> {
        if verbose_tokens == 0 {
            return Err(MetricsError::DivideByZero);
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = saved_tokens as f64 / verbose_tokens as f64 * 100.0;
        Ok(Self::rounded(pct))
    }

    fn rounded(pct: f64) -> Self {
        let r = (pct * 10.0).round() / 10.0;
        // Avoid rendering "-0.0%".
        Self(if r == 0.0 { 0.0 } else { r })
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for SavedPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl std::str::FromStr for SavedPercent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
        number
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self::rounded)
            .ok_or_else(|| format!("invalid percentage {s:?}"))
    }
}

impl Serialize for SavedPercent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SavedPercent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Verbose vs compact comparison for one document or an aggregate of several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub verbose_tokens: u64,
    pub compact_tokens: u64,
    pub verbose_size: u64,
    pub compact_size: u64,
    pub saved_tokens: i64,
    pub saved_percent: SavedPercent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_count: Option<u64>,
}

impl Stats {
    /// Build from token and byte counts, deriving `saved_tokens` and `saved_percent`.
    ///
    /// # Errors
    /// Returns [`MetricsError::DivideByZero`] when `verbose_tokens` is zero and
    /// [`MetricsError::Validation`] when a count does not fit the signed delta.
    pub fn from_counts(
        verbose_tokens: u64,
        compact_tokens: u64,
        verbose_size: u64,
        compact_size: u64,
    ) -> Result<Self> {
        let saved_tokens = i64::try_from(verbose_tokens)
            .ok()
            .zip(i64::try_from(compact_tokens).ok())
            .and_then(|(v, c)| v.checked_sub(c))
            .ok_or_else(|| {
                MetricsError::Validation(format!(
                    "token counts out of range: {verbose_tokens} verbose, {compact_tokens} compact"
                ))
            })?;
        Ok(Self {
            verbose_tokens,
            compact_tokens,
            verbose_size,
            compact_size,
            saved_tokens,
            saved_percent: SavedPercent::from_tokens(saved_tokens, verbose_tokens)?,
            item_count: None,
            node_count: None,
            edge_count: None,
            step_count: None,
        })
    }

    /// Build from the byte lengths of the two serialized forms.
    ///
    /// # Errors
    /// Returns [`MetricsError::DivideByZero`] when the verbose form is empty.
    pub fn from_sizes(verbose_size: u64, compact_size: u64) -> Result<Self> {
        Self::from_counts(
            estimate_tokens(verbose_size),
            estimate_tokens(compact_size),
            verbose_size,
            compact_size,
        )
    }
}

/// Serialize `doc` both ways and compare.
///
/// # Errors
/// Returns [`MetricsError::Encoding`] if either encoding fails.
pub fn compute(codec: &impl Codec, doc: &Value) -> Result<Stats> {
    let verbose = serde_json::to_string_pretty(doc)
        .map_err(|e| MetricsError::Encoding(format!("verbose form: {e}")))?;
    let compact = codec.encode(doc).map_err(|e| {
        tracing::debug!(error = %e, "compact encoding rejected document");
        MetricsError::Encoding(e.to_string())
    })?;
    Stats::from_sizes(verbose.len() as u64, compact.len() as u64)
}
