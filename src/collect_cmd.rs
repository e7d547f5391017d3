use std::path::Path;

use serde::Serialize;

use toon_metrics::aggregator::{MetricsAggregator, RunSnapshot};
use toon_metrics::categories::{self, Extraction};
use toon_metrics::codec::Codec;
use toon_metrics::cost::{self, CostProjection};
use toon_metrics::history;
use toon_metrics::report::{self, format_count, format_num};

use crate::Settings;

/// Measure `file`. `None` means the document was already compact and the
/// precomputed savings it carries have been printed instead.
fn measure(file: &Path, settings: &Settings, codec: &impl Codec) -> anyhow::Result<Option<RunSnapshot>> {
    let doc = crate::read_json(file)?;
    match categories::extract(codec, &doc)? {
        Extraction::AlreadyCompact { token_savings } => {
            eprintln!("[toon-metrics] document is already in compact form; nothing measured");
            crate::output::print_json(&token_savings);
            Ok(None)
        }
        Extraction::Measured(measured) => {
            let aggregator = measured.into_iter().fold(
                MetricsAggregator::new(settings.project.as_str(), settings.workflow.as_str()),
                |agg, (category, stats)| agg.add_category(category, stats),
            );
            Ok(Some(aggregator.snapshot()?))
        }
    }
}

pub fn cmd_collect(file: &Path, settings: &Settings, codec: &impl Codec) -> anyhow::Result<i32> {
    // Measure fully before touching the history file.
    let Some(run) = measure(file, settings, codec)? else {
        return Ok(0);
    };
    let path = settings.history_path()?;
    let existing = history::load(&path)?;
    let updated = history::append(existing, run.clone());
    history::save(&path, &updated)?;

    if settings.json {
        crate::output::print_json(&run);
        return Ok(0);
    }

    let total = &run.total;
    println!("toon-metrics collect");
    println!("  project:        {}", run.project_name);
    println!("  categories:     {}", run.per_category.len());
    println!("  verbose tokens: {} est.", format_count(total.verbose_tokens));
    println!("  compact tokens: {} est.", format_count(total.compact_tokens));
    println!(
        "  tokens saved:   {} est. ({})",
        format_num(total.saved_tokens),
        total.saved_percent
    );
    eprintln!(
        "[toon-metrics] recorded run in {} ({} runs)",
        path.display(),
        updated.len()
    );
    Ok(0)
}

#[derive(Serialize)]
struct ReportJson<'a> {
    run: &'a RunSnapshot,
    cost: &'a CostProjection,
}

pub fn cmd_report(
    file: &Path,
    price: Option<f64>,
    runs: Option<u32>,
    settings: &Settings,
    codec: &impl Codec,
) -> anyhow::Result<i32> {
    let Some(run) = measure(file, settings, codec)? else {
        return Ok(0);
    };
    let projection = cost::project(
        &run.total,
        price.unwrap_or(settings.config.price_per_1k),
        runs.unwrap_or(settings.config.runs_per_month),
    )?;

    if settings.json {
        crate::output::print_json(&ReportJson {
            run: &run,
            cost: &projection,
        });
    } else {
        print!("{}", report::render(&run, &projection));
    }
    Ok(0)
}
