use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One apartment complex and the URL of its leasing widget page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub complex_id: String,
    pub url: String,
}

/// One floorplan tile as read from the leasing widget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityRow {
    pub plan: String,
    pub specs: String,
    pub min_price: Decimal,
    pub unit_count: u32,
}

/// Rows scraped in one run, keyed by complex id
pub type ListingResult = BTreeMap<String, Vec<AvailabilityRow>>;

/// Persisted historical record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub complex: String,
    pub plan: String,
    pub specs: String,
    pub price: Decimal,
    pub availability: u32,
}

/// Identity of a ledger row: at most one row per key survives reconciliation
pub type LedgerKey = (NaiveDate, String, String, String);

impl LedgerRow {
    pub fn from_availability(date: NaiveDate, complex: &str, row: &AvailabilityRow) -> Self {
        Self {
            date,
            complex: complex.to_string(),
            plan: row.plan.clone(),
            specs: row.specs.clone(),
            price: row.min_price,
            availability: row.unit_count,
        }
    }

    pub fn key(&self) -> LedgerKey {
        (
            self.date,
            self.complex.clone(),
            self.plan.clone(),
            self.specs.clone(),
        )
    }
}
