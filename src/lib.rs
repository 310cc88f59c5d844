//! # Cash Forecast Engine
//!
//! A deterministic pipeline that turns a categorized cash ledger into a
//! rolling 13-week direct-method forecast, executive liquidity KPIs,
//! anomaly flags and a fact-only grounding document for a language model.
//!
//! ## Core Concepts
//!
//! - **Direct Method**: weekly inflow and outflow totals summed straight from the ledger
//! - **Scenario**: percentage multipliers on inflows (revenue confidence) and outflows (expense buffer)
//! - **Week**: a Monday-closing seven-day bucket (Tuesday through Monday)
//! - **Runway**: first-week ending balance over the average weekly burn
//! - **Grounding Context**: the only text a language model is allowed to see
//!
//! ## Example
//!
//! ```rust,ignore
//! use cash_forecast_engine::*;
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
//! let ledger = vec![
//!     Transaction::new("acme", day, "Sales Revenue", FlowType::Inflow, dec!(45000), "Weekly sales"),
//!     Transaction::new("acme", day, "Payroll", FlowType::Outflow, dec!(38000), "Bi-weekly payroll"),
//! ];
//!
//! let request = ForecastRequest::new("acme", ledger, CompanySettings::default())
//!     .with_scenario(ScenarioParameters::new(dec!(90), dec!(110)));
//!
//! let result = process_forecast(&request).unwrap();
//! println!("{}", result.context);
//! ```

pub mod anomaly;
pub mod context;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod kpi;
pub mod llm;
pub mod scenario;
pub mod schema;
pub mod store;
pub mod synthetic;
pub mod utils;

pub use anomaly::{detect_anomalies, AnomalyRecord, DEFAULT_DEVIATION_THRESHOLD_PCT};
pub use context::{build_context, FinancialContext};
pub use engine::{run_forecast, ForecastEngine, WeekIndexing, WeeklyBucket, WeeklyTotals};
pub use error::{ForecastError, Result};
pub use ingestion::*;
pub use kpi::{compute_kpis, KpiHealth, KpiSet, RiskLevel, Runway, VolatilityRating};
pub use scenario::apply_scenario;
pub use schema::*;
pub use store::{load_settings, load_transactions, InMemoryStore, SettingsStore, TransactionStore};
pub use synthetic::{default_transactions, SyntheticLedger};

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything one forecast run needs. No state outside this value is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub entity_id: String,
    pub transactions: Vec<Transaction>,
    pub settings: CompanySettings,
    pub scenario: ScenarioParameters,
    pub week_indexing: WeekIndexing,
    pub anomaly_threshold_pct: Decimal,
    /// Anchor for the synthetic ledger when the request carries no transactions
    pub as_of: NaiveDate,
    pub synthetic_seed: Option<u64>,
}

impl ForecastRequest {
    pub fn new(
        entity_id: impl Into<String>,
        transactions: Vec<Transaction>,
        settings: CompanySettings,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            transactions,
            settings,
            scenario: ScenarioParameters::default(),
            week_indexing: WeekIndexing::Observed,
            anomaly_threshold_pct: DEFAULT_DEVIATION_THRESHOLD_PCT,
            as_of: Utc::now().date_naive(),
            synthetic_seed: None,
        }
    }

    /// Builds a request from the record stores, degrading to synthetic
    /// transactions and default settings when they are unavailable.
    pub fn from_stores<T, S>(
        transactions: &T,
        settings: &S,
        entity_id: &str,
        scenario: ScenarioParameters,
    ) -> Self
    where
        T: TransactionStore + ?Sized,
        S: SettingsStore + ?Sized,
    {
        let settings = load_settings(settings, entity_id);
        let as_of = Utc::now().date_naive();
        let ledger = load_transactions(transactions, entity_id, as_of, settings.forecast_weeks, None);
        Self::new(entity_id, ledger, settings).with_scenario(scenario)
    }

    pub fn with_scenario(mut self, scenario: ScenarioParameters) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_week_indexing(mut self, week_indexing: WeekIndexing) -> Self {
        self.week_indexing = week_indexing;
        self
    }

    pub fn with_anomaly_threshold(mut self, threshold_pct: Decimal) -> Self {
        self.anomaly_threshold_pct = threshold_pct;
        self
    }

    pub fn with_synthetic_fallback(mut self, as_of: NaiveDate, seed: Option<u64>) -> Self {
        self.as_of = as_of;
        self.synthetic_seed = seed;
        self
    }
}

/// One complete, internally consistent forecast run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub series: Vec<WeeklyBucket>,
    pub kpis: KpiSet,
    pub anomalies: Vec<AnomalyRecord>,
    pub context: FinancialContext,
    /// The request had no transactions and the default ledger was used
    pub used_synthetic_data: bool,
}

pub struct CashForecastProcessor;

impl CashForecastProcessor {
    pub fn process(request: &ForecastRequest) -> Result<ForecastResult> {
        validate_settings(&request.settings)?;

        info!(
            "Running cash forecast for entity: {}",
            request.entity_id
        );

        let used_synthetic_data = request.transactions.is_empty();
        let synthetic;
        let raw: &[Transaction] = if used_synthetic_data {
            warn!(
                "No transactions for {}; forecasting on the default ledger",
                request.entity_id
            );
            synthetic = default_transactions(
                &request.entity_id,
                request.as_of,
                request.settings.forecast_weeks,
                request.synthetic_seed,
            );
            &synthetic
        } else {
            &request.transactions
        };

        let adjusted = apply_scenario(raw, &request.scenario);

        let series = ForecastEngine::new(request.settings.opening_cash)
            .with_indexing(request.week_indexing)
            .with_horizon_weeks(request.settings.forecast_weeks)
            .forecast(&adjusted);

        if series.is_empty() {
            return Err(ForecastError::EmptyInput(request.entity_id.clone()));
        }

        let kpis = compute_kpis(
            &series,
            request.settings.safety_threshold,
            request.settings.payroll_threshold,
            raw,
        )?;
        let anomalies = detect_anomalies(raw, request.anomaly_threshold_pct);
        let context = build_context(&series, &kpis, &anomalies, request.anomaly_threshold_pct);

        debug!(
            "Forecast for {}: {} weeks, {} anomalies, lowest week {}",
            request.entity_id,
            series.len(),
            anomalies.len(),
            kpis.lowest_cash_week
        );

        Ok(ForecastResult {
            series,
            kpis,
            anomalies,
            context,
            used_synthetic_data,
        })
    }
}

pub fn process_forecast(request: &ForecastRequest) -> Result<ForecastResult> {
    CashForecastProcessor::process(request)
}

fn validate_settings(settings: &CompanySettings) -> Result<()> {
    if settings.forecast_weeks == 0 {
        return Err(ForecastError::InvalidSettings(
            "forecast_weeks must be at least 1".to_string(),
        ));
    }
    Ok(())
}
