use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;

/// Category name whose outflows drive the payroll risk indicator.
pub const PAYROLL_CATEGORY: &str = "Payroll";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum FlowType {
    #[schemars(description = "Cash received: sales receipts, customer collections, financing draws")]
    Inflow,

    #[schemars(description = "Cash paid out: payroll, rent, vendors, operating expenses")]
    Outflow,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Inflow => "Inflow",
            FlowType::Outflow => "Outflow",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("inflow") {
            Ok(FlowType::Inflow)
        } else if trimmed.eq_ignore_ascii_case("outflow") {
            Ok(FlowType::Outflow)
        } else {
            Err(format!(
                "unknown flow type '{}': expected 'Inflow' or 'Outflow'",
                s
            ))
        }
    }
}

/// A single categorized cash movement. Never mutated after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Transaction {
    #[schemars(description = "Identifier of the company (entity) that owns this ledger line")]
    pub entity_id: String,

    #[schemars(description = "Date the cash moves, YYYY-MM-DD")]
    pub occurred_on: NaiveDate,

    #[schemars(description = "Ledger category, e.g. 'Sales Revenue', 'Payroll', 'Rent'")]
    pub category: String,

    pub flow_type: FlowType,

    #[schemars(description = "Non-negative amount; direction is carried by flow_type")]
    pub amount: Decimal,

    #[serde(default)]
    pub description: String,
}

impl Transaction {
    pub fn new(
        entity_id: impl Into<String>,
        occurred_on: NaiveDate,
        category: impl Into<String>,
        flow_type: FlowType,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            occurred_on,
            category: category.into(),
            flow_type,
            amount,
            description: description.into(),
        }
    }

    pub fn is_payroll_outflow(&self) -> bool {
        self.category == PAYROLL_CATEGORY && self.flow_type == FlowType::Outflow
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ScenarioParameters {
    #[schemars(description = "Percentage applied to every inflow (recommended 70-120)")]
    pub revenue_confidence_pct: Decimal,

    #[schemars(description = "Percentage applied to every outflow (recommended 90-150)")]
    pub expense_buffer_pct: Decimal,
}

impl ScenarioParameters {
    pub const REVENUE_CONFIDENCE_RANGE: (Decimal, Decimal) = (dec!(70), dec!(120));
    pub const EXPENSE_BUFFER_RANGE: (Decimal, Decimal) = (dec!(90), dec!(150));

    pub fn new(revenue_confidence_pct: Decimal, expense_buffer_pct: Decimal) -> Self {
        Self {
            revenue_confidence_pct,
            expense_buffer_pct,
        }
    }

    /// True when both multipliers sit inside the ranges the dashboard offers.
    /// Values outside are still honoured as given.
    pub fn is_within_recommended_range(&self) -> bool {
        let (rev_lo, rev_hi) = Self::REVENUE_CONFIDENCE_RANGE;
        let (exp_lo, exp_hi) = Self::EXPENSE_BUFFER_RANGE;
        (rev_lo..=rev_hi).contains(&self.revenue_confidence_pct)
            && (exp_lo..=exp_hi).contains(&self.expense_buffer_pct)
    }
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Self::new(dec!(100), dec!(100))
    }
}

/// Per-entity forecast settings as held by the settings store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CompanySettings {
    #[schemars(description = "Cash on hand at the start of the forecast")]
    pub opening_cash: Decimal,

    #[schemars(description = "Balance under which a week counts as a threshold breach")]
    pub safety_threshold: Decimal,

    #[schemars(description = "Balance under which a payroll week is at risk")]
    pub payroll_threshold: Decimal,

    #[schemars(description = "Forecast horizon in weeks")]
    pub forecast_weeks: u32,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            opening_cash: dec!(250000),
            safety_threshold: dec!(50000),
            payroll_threshold: dec!(30000),
            forecast_weeks: 13,
        }
    }
}

impl CompanySettings {
    /// Parses a settings record. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let partial: PartialSettings = serde_json::from_str(json)?;
        let defaults = Self::default();
        Ok(Self {
            opening_cash: partial.opening_cash.unwrap_or(defaults.opening_cash),
            safety_threshold: partial.safety_threshold.unwrap_or(defaults.safety_threshold),
            payroll_threshold: partial
                .payroll_threshold
                .unwrap_or(defaults.payroll_threshold),
            forecast_weeks: partial.forecast_weeks.unwrap_or(defaults.forecast_weeks),
        })
    }
}

#[derive(Deserialize)]
struct PartialSettings {
    opening_cash: Option<Decimal>,
    safety_threshold: Option<Decimal>,
    payroll_threshold: Option<Decimal>,
    forecast_weeks: Option<u32>,
}

/// A seven-day bucket closing on a Monday (Tuesday..=Monday).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
pub struct WeekPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for WeekPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}
