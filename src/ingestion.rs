use crate::error::{ForecastError, Result};
use crate::schema::{FlowType, Transaction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// A ledger line as handed over by a record store or spreadsheet export,
/// before any typing is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub entity_id: String,
    pub occurred_on: String,
    pub category: String,
    pub flow_type: String,
    pub amount: String,
    #[serde(default)]
    pub description: String,
}

pub fn validate_raw_transaction(row: usize, raw: &RawTransaction) -> Result<Transaction> {
    let invalid = |details: String| ForecastError::InvalidTransaction { row, details };

    let flow_type = FlowType::from_str(&raw.flow_type).map_err(invalid)?;

    let occurred_on = NaiveDate::parse_from_str(raw.occurred_on.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(format!("invalid date '{}', expected YYYY-MM-DD", raw.occurred_on)))?;

    let amount = Decimal::from_str(raw.amount.trim())
        .map_err(|_| invalid(format!("invalid amount '{}'", raw.amount)))?;
    if amount < Decimal::ZERO {
        return Err(invalid(format!(
            "negative amount {}: direction belongs in flow_type",
            amount
        )));
    }

    let category = raw.category.trim();
    if category.is_empty() {
        return Err(invalid("missing category".to_string()));
    }

    Ok(Transaction {
        entity_id: raw.entity_id.trim().to_string(),
        occurred_on,
        category: category.to_string(),
        flow_type,
        amount,
        description: raw.description.clone(),
    })
}

/// Types every row, rejecting the whole batch on the first bad one.
/// Row numbers in errors are 1-based.
pub fn validate_raw_transactions(rows: &[RawTransaction]) -> Result<Vec<Transaction>> {
    rows.iter()
        .enumerate()
        .map(|(idx, raw)| validate_raw_transaction(idx + 1, raw))
        .collect()
}

/// Reads `entity_id,occurred_on,category,flow_type,amount,description` rows.
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.deserialize::<RawTransaction>() {
        rows.push(record?);
    }
    validate_raw_transactions(&rows)
}

pub fn read_transactions_csv_file<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
    let file = File::open(path)?;
    read_transactions_csv(file)
}

/// Accepts either fully typed transactions or raw text rows.
pub fn parse_transactions_json(json: &str) -> Result<Vec<Transaction>> {
    if let Ok(typed) = serde_json::from_str::<Vec<Transaction>>(json) {
        return Ok(typed);
    }
    let rows: Vec<RawTransaction> = serde_json::from_str(json)?;
    validate_raw_transactions(&rows)
}

/// JSON schema of a stored transaction record.
pub fn transaction_json_schema() -> Result<String> {
    let schema = schemars::schema_for!(Transaction);
    Ok(serde_json::to_string_pretty(&schema)?)
}
