use serde::Serialize;

use toon_metrics::MetricsError;
use toon_metrics::aggregator::RunSnapshot;
use toon_metrics::history;
use toon_metrics::report;
use toon_metrics::trend::{self, TrendSummary};

use crate::Settings;

const NO_HISTORY: &str = "No historical data available";

pub fn cmd_history(limit: usize, settings: &Settings) -> anyhow::Result<i32> {
    let history = history::load(&settings.history_path()?)?;

    if settings.json {
        crate::output::print_json(history.recent(limit));
        return Ok(0);
    }
    if history.is_empty() {
        println!("{NO_HISTORY}");
        return Ok(0);
    }

    println!("Historical Metrics ({} entries):\n", history.len());
    for run in history.recent(limit) {
        println!("{}", report::render_history_line(run));
    }
    Ok(0)
}

#[derive(Serialize)]
struct TrendJson<'a> {
    summary: Option<&'a TrendSummary>,
    runs: &'a [RunSnapshot],
}

pub fn cmd_trend(settings: &Settings) -> anyhow::Result<i32> {
    let history = history::load(&settings.history_path()?)?;

    let summary = match trend::analyze(&history) {
        Ok(s) => s,
        Err(MetricsError::EmptyHistory) => {
            if settings.json {
                crate::output::print_json(&TrendJson {
                    summary: None,
                    runs: history.entries(),
                });
            } else {
                println!("{NO_HISTORY}");
            }
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    if settings.json {
        crate::output::print_json(&TrendJson {
            summary: Some(&summary),
            runs: history.entries(),
        });
    } else {
        print!("{}", report::render_trend(&summary, &history));
    }
    Ok(0)
}
