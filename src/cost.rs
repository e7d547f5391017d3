use serde::Serialize;

use crate::error::{MetricsError, Result};
use crate::savings::Stats;

/// Recurring savings implied by one run's total. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostProjection {
    pub price_per_1k_tokens: f64,
    pub runs_per_month: u32,
    pub saved_tokens_per_run: i64,
    pub monthly_saved_tokens: i64,
    /// Rounded to cents. Negative when the compact form is larger.
    pub monthly_cost: f64,
    pub annual_cost: f64,
}

fn round_cents(amount: f64) -> f64 {
    let r = (amount * 100.0).round() / 100.0;
    if r == 0.0 { 0.0 } else { r }
}

/// Project `total.saved_tokens` over `runs_per_month` runs at `price_per_1k`.
///
/// # Errors
/// [`MetricsError::Validation`] if the price is not a positive finite number,
/// `runs_per_month` is zero, or the monthly token count overflows.
pub fn project(total: &Stats, price_per_1k: f64, runs_per_month: u32) -> Result<CostProjection> {
    if !price_per_1k.is_finite() || price_per_1k <= 0.0 {
        return Err(MetricsError::Validation(format!(
            "price per 1K tokens must be positive, got {price_per_1k}"
        )));
    }
    if runs_per_month == 0 {
        return Err(MetricsError::Validation(
            "runs per month must be at least 1".to_owned(),
        ));
    }

    let monthly_saved_tokens = total
        .saved_tokens
        .checked_mul(i64::from(runs_per_month))
        .ok_or_else(|| {
            MetricsError::Validation(format!(
                "{} tokens over {runs_per_month} runs overflows",
                total.saved_tokens
            ))
        })?;
    #[allow(clippy::cast_precision_loss)]
    let monthly_cost = round_cents(monthly_saved_tokens as f64 / 1000.0 * price_per_1k);
    Ok(CostProjection {
        price_per_1k_tokens: price_per_1k,
        runs_per_month,
        saved_tokens_per_run: total.saved_tokens,
        monthly_saved_tokens,
        monthly_cost,
        annual_cost: round_cents(monthly_cost * 12.0),
    })
}
