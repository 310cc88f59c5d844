//! Fact-only grounding document handed to the language model.
//!
//! The text is a pure function of the projected series, the KPI set and the
//! anomaly list with its detection threshold. It reads no clock or locale, so
//! identical inputs give byte-identical output.

use crate::anomaly::AnomalyRecord;
use crate::engine::WeeklyBucket;
use crate::kpi::{KpiSet, Runway};
use crate::utils::{format_currency, format_one_decimal, format_signed_pct};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display-only flag line, independent of the configurable safety threshold.
pub const DISPLAY_FLAG_THRESHOLD: Decimal = dec!(50000);

/// Anomaly lines included in the document.
pub const MAX_CONTEXT_ANOMALIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialContext(String);

impl FinancialContext {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FinancialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders the grounding document. `threshold_pct` is the deviation band the
/// anomalies were detected with and is echoed in the anomaly header.
pub fn build_context(
    series: &[WeeklyBucket],
    kpis: &KpiSet,
    anomalies: &[AnomalyRecord],
    threshold_pct: Decimal,
) -> FinancialContext {
    let mut lines = vec![
        format!("=== CASH FORECAST SUMMARY ({} WEEKS) ===", series.len()),
        String::new(),
        "WEEKLY CASH POSITION:".to_string(),
    ];

    for bucket in series {
        let mut flags = Vec::new();
        if bucket.week_index == kpis.lowest_cash_week {
            flags.push("LOWEST CASH POINT".to_string());
        }
        if bucket.balance < DISPLAY_FLAG_THRESHOLD {
            flags.push(format!("BELOW {}", format_currency(DISPLAY_FLAG_THRESHOLD)));
        }
        let flag_str = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };

        lines.push(format!(
            "Week {} (ending {}): Net {} | Ending Cash {}{}",
            bucket.week_index,
            bucket.period_end(),
            format_currency(bucket.net),
            format_currency(bucket.balance),
            flag_str
        ));
    }

    let runway = match kpis.weeks_of_runway {
        Runway::Finite(weeks) => format!("{} weeks", format_one_decimal(weeks)),
        Runway::Unbounded => "unbounded (no measurable burn)".to_string(),
    };
    lines.extend([
        String::new(),
        "=== KEY PERFORMANCE INDICATORS ===".to_string(),
        format!(
            "Lowest Cash Point: Week {} at {}",
            kpis.lowest_cash_week,
            format_currency(kpis.lowest_cash_value)
        ),
        format!("Weeks of Runway: {}", runway),
        format!("Weeks Below Threshold: {} weeks", kpis.weeks_below_threshold),
        format!("Payroll Risk Weeks: {} weeks", kpis.payroll_risk_weeks),
        format!(
            "Cash Flow Volatility: {} (std dev {})",
            kpis.volatility_rating,
            format_currency(kpis.volatility_score)
        ),
        format!(
            "Average Burn Rate: {}/week",
            format_currency(kpis.average_burn_rate)
        ),
        String::new(),
    ]);

    if anomalies.is_empty() {
        lines.push("=== ANOMALIES ===".to_string());
        lines.push("No significant anomalies detected.".to_string());
    } else {
        lines.push(format!(
            "=== DETECTED ANOMALIES (>±{}% from average) ===",
            threshold_pct.normalize()
        ));
        lines.extend(anomalies.iter().take(MAX_CONTEXT_ANOMALIES).map(|anomaly| {
            format!(
                "{} ({}, {}): {} ({} vs avg {})",
                anomaly.category,
                anomaly.flow_type,
                anomaly.occurred_on,
                format_currency(anomaly.amount),
                format_signed_pct(anomaly.pct_deviation),
                format_currency(anomaly.category_average)
            )
        }));
    }

    // Joined, so the last line carries no trailing newline
    FinancialContext(lines.join("\n"))
}
