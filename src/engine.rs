use crate::scenario::apply_scenario;
use crate::schema::{FlowType, ScenarioParameters, Transaction, WeekPeriod};
use crate::utils::{next_week_period, week_period_for, week_periods_between};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inflow/outflow totals for one observed week, before projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTotals {
    pub period: WeekPeriod,
    pub inflow_total: Decimal,
    pub outflow_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub period: WeekPeriod,
    pub inflow_total: Decimal,
    pub outflow_total: Decimal,
    pub net: Decimal,
    /// 1-based position in the projected series
    pub week_index: usize,
    /// Ending cash for the week
    pub balance: Decimal,
}

impl WeeklyBucket {
    pub fn period_start(&self) -> NaiveDate {
        self.period.start
    }

    pub fn period_end(&self) -> NaiveDate {
        self.period.end
    }

    pub fn is_cash_positive(&self) -> bool {
        self.net > Decimal::ZERO
    }
}

/// How week indices relate to the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WeekIndexing {
    /// Only weeks that have transactions appear; indices are positions among
    /// them, so gaps in the ledger compress the timeline.
    #[default]
    Observed,
    /// Missing weeks are zero-filled and the series covers at least the
    /// engine's horizon from the first observed week.
    Calendar,
}

pub const DEFAULT_HORIZON_WEEKS: u32 = 13;

pub struct ForecastEngine {
    opening_cash: Decimal,
    indexing: WeekIndexing,
    horizon_weeks: u32,
}

impl ForecastEngine {
    pub fn new(opening_cash: Decimal) -> Self {
        Self {
            opening_cash,
            indexing: WeekIndexing::Observed,
            horizon_weeks: DEFAULT_HORIZON_WEEKS,
        }
    }

    pub fn with_indexing(mut self, indexing: WeekIndexing) -> Self {
        self.indexing = indexing;
        self
    }

    /// Minimum series length under calendar indexing. Ignored when observed.
    pub fn with_horizon_weeks(mut self, horizon_weeks: u32) -> Self {
        self.horizon_weeks = horizon_weeks;
        self
    }

    /// Buckets transactions into Monday-closing weeks and sums each flow type.
    /// Only weeks with at least one transaction are returned, ascending.
    pub fn aggregate_weekly(&self, transactions: &[Transaction]) -> Vec<WeeklyTotals> {
        let mut grid: BTreeMap<WeekPeriod, (Decimal, Decimal)> = BTreeMap::new();

        for txn in transactions {
            let slot = grid
                .entry(week_period_for(txn.occurred_on))
                .or_insert((Decimal::ZERO, Decimal::ZERO));
            match txn.flow_type {
                FlowType::Inflow => slot.0 += txn.amount,
                FlowType::Outflow => slot.1 += txn.amount,
            }
        }

        grid.into_iter()
            .map(|(period, (inflow_total, outflow_total))| WeeklyTotals {
                period,
                inflow_total,
                outflow_total,
            })
            .collect()
    }

    /// Zero-fills every missing week between the first observed week and the
    /// later of the last observed week and the horizon end.
    pub fn densify(&self, totals: &[WeeklyTotals], horizon_weeks: u32) -> Vec<WeeklyTotals> {
        let (first, last) = match (totals.first(), totals.last()) {
            (Some(first), Some(last)) => (first.period, last.period),
            _ => return Vec::new(),
        };

        let mut horizon_end = first;
        for _ in 1..horizon_weeks {
            horizon_end = next_week_period(horizon_end);
        }
        let end = last.max(horizon_end);

        let observed: BTreeMap<WeekPeriod, &WeeklyTotals> =
            totals.iter().map(|t| (t.period, t)).collect();

        week_periods_between(first, end)
            .into_iter()
            .map(|period| match observed.get(&period) {
                Some(found) => **found,
                None => WeeklyTotals {
                    period,
                    inflow_total: Decimal::ZERO,
                    outflow_total: Decimal::ZERO,
                },
            })
            .collect()
    }

    /// Strict left-to-right running balance seeded with the opening cash.
    pub fn project(&self, totals: &[WeeklyTotals]) -> Vec<WeeklyBucket> {
        let mut balance = self.opening_cash;

        totals
            .iter()
            .enumerate()
            .map(|(i, week)| {
                let net = week.inflow_total - week.outflow_total;
                balance += net;
                WeeklyBucket {
                    period: week.period,
                    inflow_total: week.inflow_total,
                    outflow_total: week.outflow_total,
                    net,
                    week_index: i + 1,
                    balance,
                }
            })
            .collect()
    }

    /// Aggregates already-adjusted transactions and projects the balance.
    pub fn forecast(&self, adjusted: &[Transaction]) -> Vec<WeeklyBucket> {
        let observed = self.aggregate_weekly(adjusted);
        let totals = match self.indexing {
            WeekIndexing::Observed => observed,
            WeekIndexing::Calendar => self.densify(&observed, self.horizon_weeks),
        };

        debug!(
            "Projecting {} weeks from {} transactions ({:?})",
            totals.len(),
            adjusted.len(),
            self.indexing
        );

        self.project(&totals)
    }
}

/// Scenario-adjusts the raw ledger, then aggregates and projects it using
/// observed-week indexing.
pub fn run_forecast(
    transactions: &[Transaction],
    scenario: &ScenarioParameters,
    opening_cash: Decimal,
) -> Vec<WeeklyBucket> {
    let adjusted = apply_scenario(transactions, scenario);
    ForecastEngine::new(opening_cash).forecast(&adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(on: NaiveDate, flow_type: FlowType, amount: Decimal) -> Transaction {
        let category = match flow_type {
            FlowType::Inflow => "Sales Revenue",
            FlowType::Outflow => "Operating Expenses",
        };
        Transaction::new("acme", on, category, flow_type, amount, "")
    }

    #[test]
    fn test_aggregation_sums_per_week_and_flow() {
        let ledger = vec![
            txn(date(2024, 1, 2), FlowType::Inflow, dec!(1000)),
            txn(date(2024, 1, 8), FlowType::Inflow, dec!(500)),
            txn(date(2024, 1, 5), FlowType::Outflow, dec!(300)),
            txn(date(2024, 1, 9), FlowType::Outflow, dec!(700)),
        ];

        let totals = ForecastEngine::new(dec!(0)).aggregate_weekly(&ledger);
        assert_eq!(totals.len(), 2);

        assert_eq!(totals[0].period.end, date(2024, 1, 8));
        assert_eq!(totals[0].inflow_total, dec!(1500));
        assert_eq!(totals[0].outflow_total, dec!(300));

        // Tuesday opens the next week; no inflow that week defaults to zero
        assert_eq!(totals[1].period.end, date(2024, 1, 15));
        assert_eq!(totals[1].inflow_total, dec!(0));
        assert_eq!(totals[1].outflow_total, dec!(700));
    }

    #[test]
    fn test_empty_ledger_yields_empty_series() {
        let series = run_forecast(&[], &ScenarioParameters::default(), dec!(250000));
        assert!(series.is_empty());
    }

    #[test]
    fn test_running_balance_matches_cumulative_net() {
        let ledger = vec![
            txn(date(2024, 1, 8), FlowType::Inflow, dec!(10000.25)),
            txn(date(2024, 1, 8), FlowType::Outflow, dec!(4000.10)),
            txn(date(2024, 1, 15), FlowType::Outflow, dec!(9000.05)),
            txn(date(2024, 1, 22), FlowType::Inflow, dec!(1.01)),
        ];
        let opening = dec!(5000);
        let series = run_forecast(&ledger, &ScenarioParameters::default(), opening);

        let mut cumulative = Decimal::ZERO;
        for bucket in &series {
            cumulative += bucket.net;
            assert_eq!(bucket.balance, opening + cumulative);
            assert_eq!(bucket.net, bucket.inflow_total - bucket.outflow_total);
        }
        assert_eq!(series[1].balance, dec!(2000.10));
    }

    #[test]
    fn test_observed_indexing_compresses_gaps() {
        let ledger = vec![
            txn(date(2024, 1, 8), FlowType::Inflow, dec!(100)),
            txn(date(2024, 2, 5), FlowType::Inflow, dec!(100)),
        ];
        let series = ForecastEngine::new(dec!(0)).forecast(&ledger);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].week_index, 1);
        assert_eq!(series[1].week_index, 2);
        assert_eq!(series[1].period_end(), date(2024, 2, 5));
    }

    #[test]
    fn test_calendar_indexing_fills_gaps_and_horizon() {
        let ledger = vec![
            txn(date(2024, 1, 8), FlowType::Inflow, dec!(100)),
            txn(date(2024, 1, 29), FlowType::Outflow, dec!(40)),
        ];
        let series = ForecastEngine::new(dec!(1000))
            .with_indexing(WeekIndexing::Calendar)
            .with_horizon_weeks(6)
            .forecast(&ledger);

        assert_eq!(series.len(), 6);
        assert_eq!(series[1].net, dec!(0));
        assert_eq!(series[1].balance, dec!(1100));
        assert_eq!(series[3].week_index, 4);
        assert_eq!(series[3].period_end(), date(2024, 1, 29));
        assert_eq!(series[5].balance, dec!(1060));
    }

    #[test]
    fn test_calendar_indexing_never_truncates_observed_weeks() {
        let ledger = vec![
            txn(date(2024, 1, 8), FlowType::Inflow, dec!(100)),
            txn(date(2024, 2, 5), FlowType::Inflow, dec!(100)),
        ];
        let series = ForecastEngine::new(dec!(0))
            .with_indexing(WeekIndexing::Calendar)
            .with_horizon_weeks(2)
            .forecast(&ledger);
        assert_eq!(series.len(), 5);
        assert_eq!(series[4].balance, dec!(200));
    }

    #[test]
    fn test_horizon_only_applies_to_calendar_indexing() {
        let ledger = vec![txn(date(2024, 1, 8), FlowType::Inflow, dec!(100))];

        let observed = ForecastEngine::new(dec!(0))
            .with_horizon_weeks(4)
            .forecast(&ledger);
        assert_eq!(observed.len(), 1);

        let calendar = ForecastEngine::new(dec!(0))
            .with_indexing(WeekIndexing::Calendar)
            .forecast(&ledger);
        assert_eq!(calendar.len(), DEFAULT_HORIZON_WEEKS as usize);
    }

    #[test]
    fn test_cash_positive_week() {
        let series = ForecastEngine::new(dec!(0)).forecast(&[
            txn(date(2024, 1, 8), FlowType::Inflow, dec!(10)),
            txn(date(2024, 1, 15), FlowType::Outflow, dec!(10)),
        ]);
        assert!(series[0].is_cash_positive());
        assert!(!series[1].is_cash_positive());
    }
}
