//! Per-run accumulation of category stats into a frozen [`RunSnapshot`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categories::Category;
use crate::error::{MetricsError, Result};
use crate::savings::Stats;

/// One pipeline run: per-category stats plus the total derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default)]
    pub per_category: BTreeMap<Category, Stats>,
    pub total: Stats,
}

impl RunSnapshot {
    pub fn category(&self, category: Category) -> Option<&Stats> {
        self.per_category.get(&category)
    }
}

/// Sum verbose/compact tokens and sizes, then derive savings from the sums.
///
/// Percentages are never averaged: a large category dominates the total
/// exactly as much as it dominates the token count.
///
/// # Errors
/// [`MetricsError::NoData`] for an empty input, [`MetricsError::Validation`]
/// if a sum overflows.
pub fn total<'a>(stats: impl IntoIterator<Item = &'a Stats>) -> Result<Stats> {
    let overflow = || MetricsError::Validation("category totals overflow".to_owned());
    let mut count = 0usize;
    let (mut vt, mut ct, mut vs, mut cs) = (0u64, 0u64, 0u64, 0u64);
    for s in stats {
        count += 1;
        vt = vt.checked_add(s.verbose_tokens).ok_or_else(overflow)?;
        ct = ct.checked_add(s.compact_tokens).ok_or_else(overflow)?;
        vs = vs.checked_add(s.verbose_size).ok_or_else(overflow)?;
        cs = cs.checked_add(s.compact_size).ok_or_else(overflow)?;
    }
    if count == 0 {
        return Err(MetricsError::NoData);
    }
    Stats::from_counts(vt, ct, vs, cs)
}

/// Immutable builder for one run's metrics.
///
/// Each [`add_category`](Self::add_category) returns a new aggregator; totals
/// are only ever computed from the current category map.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    timestamp: DateTime<Utc>,
    project_name: String,
    workflow_name: String,
    categories: BTreeMap<Category, Stats>,
}

impl MetricsAggregator {
    pub fn new(project_name: impl Into<String>, workflow_name: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            project_name: project_name.into(),
            workflow_name: workflow_name.into(),
            categories: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Record `stats` for `category`. A repeated category replaces the earlier stats.
    #[must_use]
    pub fn add_category(mut self, category: Category, stats: Stats) -> Self {
        if self.categories.insert(category, stats).is_some() {
            tracing::debug!(%category, "replacing previously recorded category");
        }
        self
    }

    pub const fn categories(&self) -> &BTreeMap<Category, Stats> {
        &self.categories
    }

    /// # Errors
    /// [`MetricsError::NoData`] if no category has been recorded.
    pub fn calculate_total(&self) -> Result<Stats> {
        total(self.categories.values())
    }

    /// Freeze the run into a snapshot with a freshly computed total.
    ///
    /// # Errors
    /// [`MetricsError::NoData`] if no category has been recorded.
    pub fn snapshot(&self) -> Result<RunSnapshot> {
        Ok(RunSnapshot {
            timestamp: self.timestamp,
            project_name: self.project_name.clone(),
            workflow_name: self.workflow_name.clone(),
            per_category: self.categories.clone(),
            total: self.calculate_total()?,
        })
    }
}
