//! Merging a run's rows into the historical ledger.
//!
//! The ledger is collapsed and rewritten rather than appended to: rows are
//! grouped by `(date, complex, plan, specs)` and each group is reduced to a
//! single row with the configured aggregate applied to price and availability
//! independently. Re-running the same day therefore leaves one row per key, and
//! reconciling the same batch twice gives the same ledger.

use crate::models::{LedgerKey, LedgerRow, ListingResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How duplicate rows for one key are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    #[default]
    Min,
    Max,
}

impl Aggregate {
    fn pick<T: Ord>(self, a: T, b: T) -> T {
        match self {
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

/// Output of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Full ledger to persist, sorted by key
    pub ledger: Vec<LedgerRow>,
    /// Today's contribution alone, collapsed the same way
    pub today: Vec<LedgerRow>,
}

/// Stamp every scraped row with `date`
pub fn stamp(result: &ListingResult, date: NaiveDate) -> Vec<LedgerRow> {
    result
        .iter()
        .flat_map(|(complex, rows)| {
            rows.iter()
                .map(move |row| LedgerRow::from_availability(date, complex, row))
        })
        .collect()
}

/// Reduce rows to one per key, ordered by key
pub fn collapse(rows: impl IntoIterator<Item = LedgerRow>, aggregate: Aggregate) -> Vec<LedgerRow> {
    let mut groups: BTreeMap<LedgerKey, (Decimal, u32)> = BTreeMap::new();

    for row in rows {
        groups
            .entry(row.key())
            .and_modify(|(price, availability)| {
                *price = aggregate.pick(*price, row.price);
                *availability = aggregate.pick(*availability, row.availability);
            })
            .or_insert((row.price, row.availability));
    }

    groups
        .into_iter()
        .map(|((date, complex, plan, specs), (price, availability))| LedgerRow {
            date,
            complex,
            plan,
            specs,
            price,
            availability,
        })
        .collect()
}

/// Merge today's scrape into the existing ledger
pub fn reconcile(
    existing: Vec<LedgerRow>,
    result: &ListingResult,
    date: NaiveDate,
    aggregate: Aggregate,
) -> Reconciliation {
    let today = collapse(stamp(result, date), aggregate);
    let ledger = collapse(existing.into_iter().chain(today.iter().cloned()), aggregate);
    Reconciliation { ledger, today }
}
