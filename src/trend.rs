//! Cross-run statistics over the persisted history.

use serde::Serialize;

use crate::error::{MetricsError, Result};
use crate::history::History;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub run_count: usize,
    pub average_saved_tokens: f64,
    /// Mean of the per-run percentages, in percent units.
    pub average_saved_percent: f64,
    pub best_saved_percent: f64,
    pub worst_saved_percent: f64,
}

/// Averages and extrema of the total savings across every run in `history`.
///
/// # Errors
/// [`MetricsError::EmptyHistory`] when there are no runs.
pub fn analyze(history: &History) -> Result<TrendSummary> {
    if history.is_empty() {
        return Err(MetricsError::EmptyHistory);
    }

    let mut token_sum = 0i64;
    let mut percent_sum = 0.0;
    let mut best = f64::NEG_INFINITY;
    let mut worst = f64::INFINITY;
    for run in history {
        let pct = run.total.saved_percent.value();
        token_sum += run.total.saved_tokens;
        percent_sum += pct;
        best = best.max(pct);
        worst = worst.min(pct);
    }

    #[allow(clippy::cast_precision_loss)]
    let n = history.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let average_saved_tokens = token_sum as f64 / n;
    Ok(TrendSummary {
        run_count: history.len(),
        average_saved_tokens,
        average_saved_percent: percent_sum / n,
        best_saved_percent: best,
        worst_saved_percent: worst,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::aggregator::{MetricsAggregator, RunSnapshot};
    use crate::categories::Category;
    use crate::history;
    use crate::savings::Stats;

    fn run(verbose: u64, compact: u64) -> RunSnapshot {
        let stats = Stats::from_counts(verbose, compact, verbose * 4, compact * 4).unwrap();
        MetricsAggregator::new("p", "w")
            .add_category(Category::Components, stats)
            .snapshot()
            .unwrap()
    }

    fn history_of(runs: &[(u64, u64)]) -> History {
        runs.iter()
            .fold(History::default(), |h, &(v, c)| history::append(h, run(v, c)))
    }

    #[test]
    fn empty_history_is_an_error() {
        assert!(matches!(
            analyze(&History::default()),
            Err(MetricsError::EmptyHistory)
        ));
    }

    #[test]
    fn twenty_forty_sixty() {
        let h = history_of(&[(100, 80), (100, 60), (100, 40)]);
        let t = analyze(&h).unwrap();
        assert_eq!(t.run_count, 3);
        assert_eq!(t.average_saved_percent, 40.0);
        assert_eq!(t.best_saved_percent, 60.0);
        assert_eq!(t.worst_saved_percent, 20.0);
        assert_eq!(t.average_saved_tokens, 40.0);
    }

    #[test]
    fn single_run_is_its_own_extrema() {
        let t = analyze(&history_of(&[(200, 150)])).unwrap();
        assert_eq!(t.best_saved_percent, t.worst_saved_percent);
        assert_eq!(t.average_saved_percent, 25.0);
    }

    #[test]
    fn negative_runs_lower_the_worst() {
        let t = analyze(&history_of(&[(100, 120), (100, 50)])).unwrap();
        assert_eq!(t.worst_saved_percent, -20.0);
        assert_eq!(t.best_saved_percent, 50.0);
        assert_eq!(t.average_saved_tokens, 15.0);
    }

    #[test]
    fn serializes_camel_case() {
        let t = analyze(&history_of(&[(100, 50)])).unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["runCount"], 1);
        assert_eq!(json["bestSavedPercent"], 50.0);
    }
}
