use crate::engine::WeeklyBucket;
use crate::error::{ForecastError, Result};
use crate::schema::{Transaction, WeekPeriod};
use crate::utils::{format_currency, week_period_for};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const VOLATILITY_MEDIUM_FLOOR: Decimal = dec!(10000);
const VOLATILITY_HIGH_FLOOR: Decimal = dec!(25000);

/// Weeks of cash left at the average burn rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "weeks")]
pub enum Runway {
    Finite(Decimal),
    /// No week in the series burns cash.
    Unbounded,
}

impl Runway {
    pub fn weeks(&self) -> Option<Decimal> {
        match self {
            Runway::Finite(weeks) => Some(*weeks),
            Runway::Unbounded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRating {
    Low,
    Medium,
    High,
}

impl VolatilityRating {
    pub fn from_score(score: Decimal) -> Self {
        if score < VOLATILITY_MEDIUM_FLOOR {
            VolatilityRating::Low
        } else if score < VOLATILITY_HIGH_FLOOR {
            VolatilityRating::Medium
        } else {
            VolatilityRating::High
        }
    }
}

impl fmt::Display for VolatilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VolatilityRating::Low => "Low",
            VolatilityRating::Medium => "Medium",
            VolatilityRating::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub lowest_cash_week: usize,
    pub lowest_cash_value: Decimal,
    pub average_burn_rate: Decimal,
    pub weeks_of_runway: Runway,
    pub weeks_below_threshold: usize,
    pub payroll_risk_weeks: usize,
    pub payroll_risk_week_list: Vec<WeekPeriod>,
    /// Sample standard deviation of weekly net flow
    pub volatility_score: Decimal,
    pub volatility_rating: VolatilityRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Healthy,
    Watch,
    Critical,
}

/// Traffic-light reading of each indicator for executive tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiHealth {
    pub runway: RiskLevel,
    pub threshold_breaches: RiskLevel,
    pub payroll: RiskLevel,
    pub volatility: RiskLevel,
}

impl KpiSet {
    pub fn health(&self) -> KpiHealth {
        let runway = match self.weeks_of_runway {
            Runway::Unbounded => RiskLevel::Healthy,
            Runway::Finite(weeks) if weeks > dec!(10) => RiskLevel::Healthy,
            Runway::Finite(weeks) if weeks > dec!(5) => RiskLevel::Watch,
            Runway::Finite(_) => RiskLevel::Critical,
        };

        let threshold_breaches = match self.weeks_below_threshold {
            0 => RiskLevel::Healthy,
            1 | 2 => RiskLevel::Watch,
            _ => RiskLevel::Critical,
        };

        let payroll = if self.payroll_risk_weeks == 0 {
            RiskLevel::Healthy
        } else {
            RiskLevel::Critical
        };

        let volatility = match self.volatility_rating {
            VolatilityRating::Low => RiskLevel::Healthy,
            VolatilityRating::Medium => RiskLevel::Watch,
            VolatilityRating::High => RiskLevel::Critical,
        };

        KpiHealth {
            runway,
            threshold_breaches,
            payroll,
            volatility,
        }
    }

    /// Alert line for the balance chart when the trough dips under the
    /// safety threshold.
    pub fn liquidity_alert(&self, safety_threshold: Decimal) -> Option<String> {
        if self.lowest_cash_value < safety_threshold {
            Some(format!(
                "ALERT: Cash drops below safety threshold in Week {} ({})",
                self.lowest_cash_week,
                format_currency(self.lowest_cash_value)
            ))
        } else {
            None
        }
    }
}

/// Derives the liquidity indicator set from a projected series.
///
/// Payroll risk is read from the raw (unadjusted) ledger: every week holding a
/// payroll outflow is looked up in the series and counted once if its ending
/// balance is under `payroll_threshold`. Weeks absent from the series are
/// skipped.
pub fn compute_kpis(
    series: &[WeeklyBucket],
    safety_threshold: Decimal,
    payroll_threshold: Decimal,
    raw_transactions: &[Transaction],
) -> Result<KpiSet> {
    let first = series.first().ok_or(ForecastError::EmptySeries)?;

    // First minimum wins ties
    let mut lowest = first;
    for bucket in series.iter().skip(1) {
        if bucket.balance < lowest.balance {
            lowest = bucket;
        }
    }

    let burning: Vec<Decimal> = series
        .iter()
        .filter(|b| b.net < Decimal::ZERO)
        .map(|b| b.net.abs())
        .collect();
    let average_burn_rate = if burning.is_empty() {
        Decimal::ZERO
    } else {
        burning.iter().copied().sum::<Decimal>() / Decimal::from(burning.len())
    };

    // Ending balance of the first week, not the opening cash
    let weeks_of_runway = if average_burn_rate > Decimal::ZERO {
        Runway::Finite(first.balance / average_burn_rate)
    } else {
        Runway::Unbounded
    };

    let weeks_below_threshold = series
        .iter()
        .filter(|b| b.balance < safety_threshold)
        .count();

    let payroll_risk_week_list = payroll_risk_weeks(series, payroll_threshold, raw_transactions);

    let volatility_score = sample_std_dev(series.iter().map(|b| b.net));

    Ok(KpiSet {
        lowest_cash_week: lowest.week_index,
        lowest_cash_value: lowest.balance,
        average_burn_rate,
        weeks_of_runway,
        weeks_below_threshold,
        payroll_risk_weeks: payroll_risk_week_list.len(),
        payroll_risk_week_list,
        volatility_score,
        volatility_rating: VolatilityRating::from_score(volatility_score),
    })
}

fn payroll_risk_weeks(
    series: &[WeeklyBucket],
    payroll_threshold: Decimal,
    raw_transactions: &[Transaction],
) -> Vec<WeekPeriod> {
    let payroll_weeks: BTreeSet<WeekPeriod> = raw_transactions
        .iter()
        .filter(|t| t.is_payroll_outflow())
        .map(|t| week_period_for(t.occurred_on))
        .collect();

    let balances: BTreeMap<WeekPeriod, Decimal> =
        series.iter().map(|b| (b.period, b.balance)).collect();

    payroll_weeks
        .into_iter()
        .filter(|week| {
            balances
                .get(week)
                .is_some_and(|balance| *balance < payroll_threshold)
        })
        .collect()
}

/// Sample (n - 1) standard deviation. Fewer than two points gives zero.
fn sample_std_dev(values: impl Iterator<Item = Decimal>) -> Decimal {
    let values: Vec<Decimal> = values.collect();
    if values.len() < 2 {
        return Decimal::ZERO;
    }

    let count = Decimal::from(values.len());
    let mean = values.iter().copied().sum::<Decimal>() / count;
    let deviations: Vec<Decimal> = values.iter().map(|v| *v - mean).collect();
    let degrees = count - Decimal::ONE;

    if let Some(squared) = sum_of_squares(&deviations) {
        return (squared / degrees).sqrt().unwrap_or(Decimal::ZERO);
    }

    // Squares overflow Decimal: factor out the largest deviation first
    let scale = deviations
        .iter()
        .map(|d| d.abs())
        .max()
        .unwrap_or(Decimal::ZERO);
    if scale.is_zero() {
        return Decimal::ZERO;
    }
    let normalized: Vec<Decimal> = deviations.iter().map(|d| *d / scale).collect();
    let squared = sum_of_squares(&normalized).unwrap_or(Decimal::ZERO);
    scale * (squared / degrees).sqrt().unwrap_or(Decimal::ZERO)
}

fn sum_of_squares(values: &[Decimal]) -> Option<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(d.checked_mul(*d)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ForecastEngine, WeeklyTotals};
    use crate::schema::FlowType;
    use chrono::{Duration, NaiveDate};

    fn monday(week: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap() + Duration::weeks(week)
    }

    /// Builds a projected series from (inflow, outflow) pairs on consecutive weeks.
    fn series(opening: Decimal, flows: &[(Decimal, Decimal)]) -> Vec<WeeklyBucket> {
        let totals: Vec<WeeklyTotals> = flows
            .iter()
            .enumerate()
            .map(|(i, (inflow, outflow))| WeeklyTotals {
                period: week_period_for(monday(i as i64)),
                inflow_total: *inflow,
                outflow_total: *outflow,
            })
            .collect();
        ForecastEngine::new(opening).project(&totals)
    }

    fn payroll(week: i64, amount: Decimal) -> Transaction {
        Transaction::new("acme", monday(week), "Payroll", FlowType::Outflow, amount, "Payroll")
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let result = compute_kpis(&[], dec!(50000), dec!(30000), &[]);
        assert!(matches!(result, Err(ForecastError::EmptySeries)));
    }

    #[test]
    fn test_lowest_point_prefers_first_occurrence() {
        let s = series(
            dec!(100),
            &[(dec!(0), dec!(50)), (dec!(50), dec!(0)), (dec!(0), dec!(50))],
        );
        let kpis = compute_kpis(&s, dec!(0), dec!(0), &[]).unwrap();
        assert_eq!(kpis.lowest_cash_value, dec!(50));
        assert_eq!(kpis.lowest_cash_week, 1);
    }

    #[test]
    fn test_burn_rate_and_runway_use_first_week_balance() {
        let s = series(
            dec!(100000),
            &[(dec!(0), dec!(10000)), (dec!(0), dec!(30000)), (dec!(5000), dec!(0))],
        );
        let kpis = compute_kpis(&s, dec!(0), dec!(0), &[]).unwrap();
        assert_eq!(kpis.average_burn_rate, dec!(20000));
        // first ending balance 90,000 / 20,000
        assert_eq!(kpis.weeks_of_runway, Runway::Finite(dec!(4.5)));
    }

    #[test]
    fn test_zero_burn_gives_unbounded_runway() {
        let s = series(dec!(0), &[(dec!(0), dec!(0)), (dec!(0), dec!(0))]);
        let kpis = compute_kpis(&s, dec!(50000), dec!(30000), &[]).unwrap();
        assert_eq!(kpis.average_burn_rate, Decimal::ZERO);
        assert_eq!(kpis.weeks_of_runway, Runway::Unbounded);
        assert_eq!(kpis.weeks_of_runway.weeks(), None);
    }

    #[test]
    fn test_threshold_boundary_is_strict() {
        let s = series(
            dec!(50000),
            &[(dec!(0), dec!(0)), (dec!(0), dec!(1)), (dec!(1), dec!(0))],
        );
        let kpis = compute_kpis(&s, dec!(50000), dec!(0), &[]).unwrap();
        assert_eq!(kpis.weeks_below_threshold, 1);
    }

    #[test]
    fn test_payroll_week_counted_once() {
        let s = series(
            dec!(40000),
            &[(dec!(0), dec!(20000)), (dec!(0), dec!(0)), (dec!(0), dec!(0))],
        );
        let ledger = vec![
            payroll(0, dec!(10000)),
            payroll(0, dec!(10000)),
            payroll(2, dec!(0)),
        ];
        let kpis = compute_kpis(&s, dec!(0), dec!(30000), &ledger).unwrap();
        assert_eq!(kpis.payroll_risk_weeks, 2);
        assert_eq!(kpis.payroll_risk_week_list[0], week_period_for(monday(0)));
        assert_eq!(kpis.payroll_risk_week_list[1], week_period_for(monday(2)));
    }

    #[test]
    fn test_payroll_week_without_forecast_row_is_skipped() {
        let s = series(dec!(0), &[(dec!(0), dec!(0))]);
        let ledger = vec![payroll(5, dec!(38000))];
        let kpis = compute_kpis(&s, dec!(0), dec!(30000), &ledger).unwrap();
        assert_eq!(kpis.payroll_risk_weeks, 0);
        assert!(kpis.payroll_risk_week_list.is_empty());
    }

    #[test]
    fn test_payroll_inflows_and_other_categories_ignored() {
        let s = series(dec!(0), &[(dec!(0), dec!(0))]);
        let ledger = vec![
            Transaction::new("acme", monday(0), "Payroll", FlowType::Inflow, dec!(5), ""),
            Transaction::new("acme", monday(0), "Rent", FlowType::Outflow, dec!(5), ""),
        ];
        let kpis = compute_kpis(&s, dec!(0), dec!(30000), &ledger).unwrap();
        assert_eq!(kpis.payroll_risk_weeks, 0);
    }

    #[test]
    fn test_volatility_uses_sample_std_dev() {
        let s = series(
            dec!(0),
            &[(dec!(10000), dec!(0)), (dec!(30000), dec!(0)), (dec!(50000), dec!(0))],
        );
        let kpis = compute_kpis(&s, dec!(0), dec!(0), &[]).unwrap();
        // deviations of 20,000 around 30,000: variance 8e8 / 2
        assert!((kpis.volatility_score - dec!(20000)).abs() < dec!(0.0001));
        assert_eq!(kpis.volatility_rating, VolatilityRating::Medium);
    }

    #[test]
    fn test_volatility_survives_very_large_nets() {
        let s = series(
            dec!(0),
            &[(dec!(1000000000000000), dec!(0)), (dec!(0), dec!(0))],
        );
        let kpis = compute_kpis(&s, dec!(0), dec!(0), &[]).unwrap();
        // sqrt(2) * 5e14
        assert!((kpis.volatility_score - dec!(707106781186547.52)).abs() < dec!(1));
        assert_eq!(kpis.volatility_rating, VolatilityRating::High);
    }

    #[test]
    fn test_single_week_volatility_is_zero() {
        let s = series(dec!(0), &[(dec!(90000), dec!(0))]);
        let kpis = compute_kpis(&s, dec!(0), dec!(0), &[]).unwrap();
        assert_eq!(kpis.volatility_score, Decimal::ZERO);
        assert_eq!(kpis.volatility_rating, VolatilityRating::Low);
    }

    #[test]
    fn test_volatility_rating_bands() {
        assert_eq!(VolatilityRating::from_score(dec!(9999.99)), VolatilityRating::Low);
        assert_eq!(VolatilityRating::from_score(dec!(10000)), VolatilityRating::Medium);
        assert_eq!(VolatilityRating::from_score(dec!(24999)), VolatilityRating::Medium);
        assert_eq!(VolatilityRating::from_score(dec!(25000)), VolatilityRating::High);
    }

    #[test]
    fn test_health_and_alert() {
        let s = series(
            dec!(60000),
            &[(dec!(0), dec!(20000)), (dec!(0), dec!(20000)), (dec!(0), dec!(20000))],
        );
        let kpis = compute_kpis(&s, dec!(50000), dec!(30000), &[]).unwrap();
        let health = kpis.health();
        // 40,000 / 20,000 = 2 weeks
        assert_eq!(health.runway, RiskLevel::Critical);
        assert_eq!(health.threshold_breaches, RiskLevel::Critical);
        assert_eq!(health.payroll, RiskLevel::Healthy);
        assert_eq!(health.volatility, RiskLevel::Healthy);

        let alert = kpis.liquidity_alert(dec!(50000)).unwrap();
        assert_eq!(alert, "ALERT: Cash drops below safety threshold in Week 3 ($0)");
        assert!(kpis.liquidity_alert(dec!(0)).is_none());
    }
}
