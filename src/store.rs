use crate::error::{ForecastError, Result};
use crate::schema::{CompanySettings, Transaction};
use crate::synthetic::default_transactions;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::RwLock;

/// Record store holding each entity's ledger.
pub trait TransactionStore {
    fn list_transactions(&self, entity_id: &str) -> Result<Vec<Transaction>>;
    fn insert_transactions(&self, entity_id: &str, transactions: &[Transaction]) -> Result<()>;
}

/// Record store holding each entity's forecast settings.
pub trait SettingsStore {
    fn get_settings(&self, entity_id: &str) -> Result<CompanySettings>;
}

/// Process-local store, used for demo mode and tests.
#[derive(Default)]
pub struct InMemoryStore {
    transactions: RwLock<HashMap<String, Vec<Transaction>>>,
    settings: RwLock<HashMap<String, CompanySettings>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_settings(&self, entity_id: &str, settings: CompanySettings) -> Result<()> {
        let mut guard = self
            .settings
            .write()
            .map_err(|_| ForecastError::UpstreamUnavailable("settings lock poisoned".to_string()))?;
        guard.insert(entity_id.to_string(), settings);
        Ok(())
    }
}

impl TransactionStore for InMemoryStore {
    fn list_transactions(&self, entity_id: &str) -> Result<Vec<Transaction>> {
        let guard = self.transactions.read().map_err(|_| {
            ForecastError::UpstreamUnavailable("transaction lock poisoned".to_string())
        })?;
        Ok(guard.get(entity_id).cloned().unwrap_or_default())
    }

    fn insert_transactions(&self, entity_id: &str, transactions: &[Transaction]) -> Result<()> {
        let mut guard = self.transactions.write().map_err(|_| {
            ForecastError::UpstreamUnavailable("transaction lock poisoned".to_string())
        })?;
        guard
            .entry(entity_id.to_string())
            .or_default()
            .extend_from_slice(transactions);
        Ok(())
    }
}

impl SettingsStore for InMemoryStore {
    fn get_settings(&self, entity_id: &str) -> Result<CompanySettings> {
        let guard = self
            .settings
            .read()
            .map_err(|_| ForecastError::UpstreamUnavailable("settings lock poisoned".to_string()))?;
        guard.get(entity_id).cloned().ok_or_else(|| {
            ForecastError::UpstreamUnavailable(format!("no settings stored for {}", entity_id))
        })
    }
}

/// Loads an entity's ledger, never failing.
///
/// An empty ledger is seeded with the synthetic default and written back
/// (a failed write is only logged). A failing store yields the synthetic
/// default without persisting it.
pub fn load_transactions<S: TransactionStore + ?Sized>(
    store: &S,
    entity_id: &str,
    anchor: NaiveDate,
    weeks: u32,
    seed: Option<u64>,
) -> Vec<Transaction> {
    match store.list_transactions(entity_id) {
        Ok(transactions) if !transactions.is_empty() => {
            info!("Loaded {} transactions for {}", transactions.len(), entity_id);
            transactions
        }
        Ok(_) => {
            info!("No transactions stored for {}; seeding default ledger", entity_id);
            let defaults = default_transactions(entity_id, anchor, weeks, seed);
            if let Err(e) = store.insert_transactions(entity_id, &defaults) {
                warn!("Could not persist default ledger for {}: {}", entity_id, e);
            }
            defaults
        }
        Err(e) => {
            warn!("Could not load transactions for {}: {}; using default ledger", entity_id, e);
            default_transactions(entity_id, anchor, weeks, seed)
        }
    }
}

/// Loads an entity's settings, falling back to the built-in defaults.
pub fn load_settings<S: SettingsStore + ?Sized>(store: &S, entity_id: &str) -> CompanySettings {
    store.get_settings(entity_id).unwrap_or_else(|e| {
        warn!("Using default settings for {}: {}", entity_id, e);
        CompanySettings::default()
    })
}
