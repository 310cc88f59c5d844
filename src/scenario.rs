use crate::schema::{FlowType, ScenarioParameters, Transaction};
use log::warn;
use rust_decimal::Decimal;

/// Applies the scenario multipliers and returns an owned, adjusted copy of
/// the ledger. The caller's transactions are never touched.
pub fn apply_scenario(transactions: &[Transaction], scenario: &ScenarioParameters) -> Vec<Transaction> {
    if !scenario.is_within_recommended_range() {
        warn!(
            "Scenario outside recommended range (revenue {}%, expenses {}%); applying as given",
            scenario.revenue_confidence_pct, scenario.expense_buffer_pct
        );
    }

    let hundred = Decimal::ONE_HUNDRED;
    let inflow_factor = scenario.revenue_confidence_pct / hundred;
    let outflow_factor = scenario.expense_buffer_pct / hundred;

    transactions
        .iter()
        .map(|txn| {
            let factor = match txn.flow_type {
                FlowType::Inflow => inflow_factor,
                FlowType::Outflow => outflow_factor,
            };
            Transaction {
                amount: txn.amount * factor,
                ..txn.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ledger() -> Vec<Transaction> {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        vec![
            Transaction::new("acme", day, "Sales Revenue", FlowType::Inflow, dec!(40000), "Weekly sales"),
            Transaction::new("acme", day, "Payroll", FlowType::Outflow, dec!(20000), "Payroll"),
        ]
    }

    #[test]
    fn test_multipliers_follow_flow_type() {
        let adjusted = apply_scenario(&ledger(), &ScenarioParameters::new(dec!(80), dec!(125)));
        assert_eq!(adjusted[0].amount, dec!(32000));
        assert_eq!(adjusted[1].amount, dec!(25000));
        assert_eq!(adjusted[0].flow_type, FlowType::Inflow);
        assert_eq!(adjusted[1].category, "Payroll");
    }

    #[test]
    fn test_neutral_scenario_is_identity() {
        let original = ledger();
        let adjusted = apply_scenario(&original, &ScenarioParameters::default());
        assert_eq!(adjusted, original);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let original = ledger();
        let snapshot = original.clone();
        let _ = apply_scenario(&original, &ScenarioParameters::new(dec!(70), dec!(150)));
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_out_of_range_values_are_not_clamped() {
        let adjusted = apply_scenario(&ledger(), &ScenarioParameters::new(dec!(200), dec!(0)));
        assert_eq!(adjusted[0].amount, dec!(80000));
        assert_eq!(adjusted[1].amount, dec!(0));
    }
}
