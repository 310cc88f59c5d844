use crate::schema::{FlowType, Transaction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default deviation band, in percent, around a category's mean.
pub const DEFAULT_DEVIATION_THRESHOLD_PCT: Decimal = dec!(20);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub occurred_on: NaiveDate,
    pub category: String,
    pub flow_type: FlowType,
    pub amount: Decimal,
    pub category_average: Decimal,
    pub pct_deviation: Decimal,
}

/// Flags transactions whose amount sits more than `threshold_pct` away from
/// the mean of their (category, flow type) group. Results are ordered by
/// deviation, largest overshoot first.
///
/// A group whose mean is zero is never flagged.
pub fn detect_anomalies(transactions: &[Transaction], threshold_pct: Decimal) -> Vec<AnomalyRecord> {
    let mut groups: HashMap<(&str, FlowType), (Decimal, usize)> = HashMap::new();
    for txn in transactions {
        let entry = groups
            .entry((txn.category.as_str(), txn.flow_type))
            .or_insert((Decimal::ZERO, 0));
        entry.0 += txn.amount;
        entry.1 += 1;
    }

    let averages: HashMap<(&str, FlowType), Decimal> = groups
        .into_iter()
        .map(|(key, (total, count))| (key, total / Decimal::from(count)))
        .collect();

    let mut anomalies: Vec<AnomalyRecord> = transactions
        .iter()
        .filter_map(|txn| {
            let average = *averages.get(&(txn.category.as_str(), txn.flow_type))?;
            if average.is_zero() {
                return None;
            }

            let pct_deviation = (txn.amount - average) / average * Decimal::ONE_HUNDRED;
            if pct_deviation.abs() > threshold_pct {
                Some(AnomalyRecord {
                    occurred_on: txn.occurred_on,
                    category: txn.category.clone(),
                    flow_type: txn.flow_type,
                    amount: txn.amount,
                    category_average: average,
                    pct_deviation,
                })
            } else {
                None
            }
        })
        .collect();

    anomalies.sort_by(|a, b| {
        b.pct_deviation
            .cmp(&a.pct_deviation)
            .then_with(|| a.occurred_on.cmp(&b.occurred_on))
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.amount.cmp(&b.amount))
    });

    anomalies
}
