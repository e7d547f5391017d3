//! Markdown rendering of a single run and of the history trend.

use std::fmt::Write;

use chrono::SecondsFormat;

use crate::aggregator::RunSnapshot;
use crate::categories::Category;
use crate::cost::CostProjection;
use crate::history::History;
use crate::savings::{SavedPercent, Stats};
use crate::trend::TrendSummary;

const LOW_SAVINGS_BELOW: f64 = 30.0;
const EXCELLENT_SAVINGS_ABOVE: f64 = 50.0;

/// Recommendation tier for a total savings percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingsBand {
    /// Below 30%: the compact form is not worth it for this data.
    Low,
    /// 30% to 50% inclusive.
    Standard,
    /// Above 50%.
    Excellent,
}

impl SavingsBand {
    pub fn classify(percent: SavedPercent) -> Self {
        let p = percent.value();
        if p < LOW_SAVINGS_BELOW {
            Self::Low
        } else if p > EXCELLENT_SAVINGS_ABOVE {
            Self::Excellent
        } else {
            Self::Standard
        }
    }
}

/// Thousands-separated integer, e.g. `-73,080`.
pub fn format_num(n: i64) -> String {
    let grouped = format_count(n.unsigned_abs());
    if n < 0 { format!("-{grouped}") } else { grouped }
}

/// Thousands-separated unsigned count.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn count(n: Option<u64>) -> String {
    n.unwrap_or(0).to_string()
}

/// Header labels and values of the count columns shown for `category`.
fn count_columns(category: Category, stats: &Stats) -> Vec<(&'static str, String)> {
    match category {
        Category::Components | Category::QualityAttributes => {
            vec![("Count", count(stats.item_count))]
        }
        Category::DependencyGraph => vec![
            ("Nodes", count(stats.node_count)),
            ("Edges", count(stats.edge_count)),
        ],
        Category::DataFlow => vec![("Steps", count(stats.step_count))],
    }
}

fn render_category(out: &mut String, category: Category, stats: &Stats) {
    let columns = count_columns(category, stats);
    let labels: String = columns.iter().map(|(l, _)| format!(" {l} |")).collect();
    let rules: String = columns.iter().map(|(l, _)| format!("{}|", "-".repeat(l.len() + 2))).collect();
    let values: String = columns.iter().map(|(_, v)| format!(" {v} |")).collect();

    let _ = writeln!(out, "\n### {}\n", category.title());
    let _ = writeln!(out, "| Format | Tokens | Size (bytes) |{labels} Savings |");
    let _ = writeln!(out, "|--------|--------|--------------|{rules}---------|");
    let _ = writeln!(
        out,
        "| Verbose (JSON) | {} | {} |{values} - |",
        stats.verbose_tokens, stats.verbose_size
    );
    let _ = writeln!(
        out,
        "| Compact (TOON) | {} | {} |{values} {} |",
        stats.compact_tokens, stats.compact_size, stats.saved_percent
    );
}

fn render_recommendation(out: &mut String, run: &RunSnapshot) {
    let pct = run.total.saved_percent;
    match SavingsBand::classify(pct) {
        SavingsBand::Low => {
            let _ = writeln!(out, "\n⚠️ **Low savings** ({pct} < 30%)\n");
            out.push_str("**Possible reasons:**\n");
            out.push_str("- Small dataset (fewer than 10 components)\n");
            out.push_str("- Deeply nested metadata (more than 3 levels)\n");
            out.push_str("- Irregular schema (mixed record shapes)\n\n");
            out.push_str("**Action:** Consider keeping the verbose form for this dataset.\n");
        }
        SavingsBand::Standard => {
            let _ = writeln!(out, "\n✓ **Good savings** (30% ≤ {pct} ≤ 50%)\n");
            out.push_str("**Analysis:**\n");
            out.push_str("- Mixed data shapes (components and graphs)\n");
            out.push_str("- Standard dataset size\n\n");
            out.push_str("**Action:** Maintain current compact-format usage.\n");
        }
        SavingsBand::Excellent => {
            let components = run
                .category(Category::Components)
                .and_then(|s| s.item_count)
                .unwrap_or(0);
            let _ = writeln!(out, "\n✅ **Excellent savings** ({pct} > 50%)\n");
            out.push_str("**Analysis:**\n");
            out.push_str("- Tabular data with a consistent schema\n");
            let _ = writeln!(out, "- Large dataset ({components} components)\n");
            out.push_str("**Action:** Continue using the compact format for similar workflows.\n");
        }
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() { "Unknown" } else { s }
}

/// Full markdown report for one run.
pub fn render(run: &RunSnapshot, cost: &CostProjection) -> String {
    let total = &run.total;
    let mut out = String::from("# Token Savings Report\n\n");
    let _ = writeln!(
        out,
        "**Generated:** {}",
        run.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    let _ = writeln!(out, "**Project:** {}", or_unknown(&run.project_name));
    let _ = writeln!(out, "**Workflow:** {}", or_unknown(&run.workflow_name));

    out.push_str("\n---\n\n## Summary\n\n| Metric | Value |\n|--------|-------|\n");
    let _ = writeln!(out, "| **Total Verbose Tokens** | {} |", total.verbose_tokens);
    let _ = writeln!(out, "| **Total Compact Tokens** | {} |", total.compact_tokens);
    let _ = writeln!(out, "| **Absolute Savings** | {} tokens |", total.saved_tokens);
    let _ = writeln!(out, "| **Percentage Savings** | {} |", total.saved_percent);
    let _ = writeln!(out, "| **API Cost Saved** | ${:.2} / month |", cost.monthly_cost);

    out.push_str("\n---\n\n## Data Breakdown\n");
    for (category, stats) in &run.per_category {
        render_category(&mut out, *category, stats);
    }

    out.push_str("\n---\n\n## Cost Savings\n\n**Assumptions:**\n");
    let _ = writeln!(out, "- API pricing: ${} per 1K tokens", cost.price_per_1k_tokens);
    let _ = writeln!(out, "- Workflow runs per month: {}", cost.runs_per_month);
    out.push_str("\n**Monthly savings:**\n");
    let _ = writeln!(out, "- Tokens saved per run: {}", format_num(cost.saved_tokens_per_run));
    let _ = writeln!(
        out,
        "- Total monthly savings: {} tokens",
        format_num(cost.monthly_saved_tokens)
    );
    let _ = writeln!(out, "- **Cost savings: ${:.2} / month**", cost.monthly_cost);
    out.push_str("\n**Annual savings:**\n");
    let _ = writeln!(out, "- **${:.2} / year**", cost.annual_cost);

    out.push_str("\n---\n\n## Recommendations\n");
    render_recommendation(&mut out, run);
    out
}

/// One-line summary used when listing history.
pub fn render_history_line(run: &RunSnapshot) -> String {
    format!(
        "{}: {} - {} tokens saved ({})",
        run.timestamp.format("%Y-%m-%d"),
        or_unknown(&run.project_name),
        run.total.saved_tokens,
        run.total.saved_percent
    )
}

/// Markdown trend report: one row per run, then the aggregate statistics.
pub fn render_trend(summary: &TrendSummary, history: &History) -> String {
    let mut out = String::from("# Token Savings Trend Report\n\n");
    if let Some(latest) = history.entries().last() {
        let _ = writeln!(
            out,
            "**Latest run:** {}",
            latest.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    let _ = writeln!(out, "**Historical Data:** {} workflow runs", summary.run_count);

    out.push_str("\n---\n\n## Trend Analysis\n\n");
    out.push_str("| Date | Project | Components | Dependencies | Total Savings | Percentage |\n");
    out.push_str("|------|---------|------------|--------------|---------------|------------|\n");
    for run in history {
        let components = run.category(Category::Components).and_then(|s| s.item_count);
        let dependencies = run.category(Category::DependencyGraph).and_then(|s| s.edge_count);
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            run.timestamp.format("%Y-%m-%d"),
            or_unknown(&run.project_name),
            count(components),
            count(dependencies),
            run.total.saved_tokens,
            run.total.saved_percent
        );
    }

    out.push_str("\n---\n\n## Statistics\n\n| Metric | Value |\n|--------|-------|\n");
    let _ = writeln!(
        out,
        "| **Average Token Savings** | {:.0} tokens |",
        summary.average_saved_tokens
    );
    let _ = writeln!(
        out,
        "| **Average Percentage Savings** | {:.1}% |",
        summary.average_saved_percent
    );
    let _ = writeln!(out, "| **Total Workflow Runs** | {} |", summary.run_count);
    let _ = writeln!(out, "| **Best Savings** | {:.1}% |", summary.best_saved_percent);
    let _ = writeln!(out, "| **Worst Savings** | {:.1}% |", summary.worst_saved_percent);
    out
}
