use crate::schema::{FlowType, Transaction, PAYROLL_CATEGORY};
use chrono::{Duration, NaiveDate};
use log::debug;
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use rust_decimal::Decimal;

/// One recurring ledger line of the default demo ledger.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTemplate {
    pub category: &'static str,
    pub flow_type: FlowType,
    pub base_amount: i64,
    /// Uniform jitter drawn from `[-spread, spread)`
    pub spread: i64,
    /// Occurs on weeks where `week % every_n_weeks == 0`
    pub every_n_weeks: u32,
    pub description: &'static str,
}

pub const DEFAULT_TEMPLATES: [CategoryTemplate; 6] = [
    CategoryTemplate {
        category: "Sales Revenue",
        flow_type: FlowType::Inflow,
        base_amount: 45_000,
        spread: 5_000,
        every_n_weeks: 1,
        description: "Weekly sales",
    },
    CategoryTemplate {
        category: "AR Collections",
        flow_type: FlowType::Inflow,
        base_amount: 25_000,
        spread: 3_000,
        every_n_weeks: 2,
        description: "Customer payments",
    },
    CategoryTemplate {
        category: "Operating Expenses",
        flow_type: FlowType::Outflow,
        base_amount: 12_000,
        spread: 2_000,
        every_n_weeks: 1,
        description: "Weekly OPEX",
    },
    CategoryTemplate {
        category: PAYROLL_CATEGORY,
        flow_type: FlowType::Outflow,
        base_amount: 38_000,
        spread: 2_000,
        every_n_weeks: 2,
        description: "Bi-weekly payroll",
    },
    CategoryTemplate {
        category: "Vendor Payments",
        flow_type: FlowType::Outflow,
        base_amount: 8_000,
        spread: 1_000,
        every_n_weeks: 1,
        description: "Supplier payments",
    },
    CategoryTemplate {
        category: "Rent",
        flow_type: FlowType::Outflow,
        base_amount: 15_000,
        spread: 0,
        every_n_weeks: 4,
        description: "Monthly rent",
    },
];

/// Generates the default weekly ledger used when no real data is available.
pub struct SyntheticLedger {
    anchor: NaiveDate,
    weeks: u32,
    templates: Vec<CategoryTemplate>,
}

impl SyntheticLedger {
    pub fn new(anchor: NaiveDate, weeks: u32) -> Self {
        Self {
            anchor,
            weeks,
            templates: DEFAULT_TEMPLATES.to_vec(),
        }
    }

    pub fn with_templates(mut self, templates: Vec<CategoryTemplate>) -> Self {
        self.templates = templates;
        self
    }

    pub fn generate<R: Rng>(&self, entity_id: &str, rng: &mut R) -> Vec<Transaction> {
        let mut ledger = Vec::new();

        for week in 0..self.weeks {
            let occurred_on = self.anchor + Duration::weeks(week as i64);

            for template in &self.templates {
                if template.every_n_weeks == 0 || week % template.every_n_weeks != 0 {
                    continue;
                }
                let jitter = if template.spread > 0 {
                    rng.gen_range(-template.spread..template.spread)
                } else {
                    0
                };
                ledger.push(Transaction::new(
                    entity_id,
                    occurred_on,
                    template.category,
                    template.flow_type,
                    Decimal::from(template.base_amount + jitter),
                    template.description,
                ));
            }
        }

        debug!(
            "Generated {} synthetic transactions over {} weeks for {}",
            ledger.len(),
            self.weeks,
            entity_id
        );
        ledger
    }
}

/// Default ledger for `entity_id`; reproducible when `seed` is given.
pub fn default_transactions(
    entity_id: &str,
    anchor: NaiveDate,
    weeks: u32,
    seed: Option<u64>,
) -> Vec<Transaction> {
    let ledger = SyntheticLedger::new(anchor, weeks);
    match seed {
        Some(seed) => ledger.generate(entity_id, &mut StdRng::seed_from_u64(seed)),
        None => ledger.generate(entity_id, &mut thread_rng()),
    }
}
