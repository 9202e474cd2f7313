pub mod reconcile;

pub use reconcile::{reconcile, Aggregate};

use crate::error::ScoutError;
use crate::models::LedgerRow;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

pub const HEADERS: [&str; 6] = ["Date", "Complex", "Plan", "Specs", "Price", "Availability"];

/// Where the historical ledger lives. Both operations act on the whole ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn read_all(&self) -> Result<Vec<LedgerRow>, ScoutError>;

    /// Replace the stored ledger with `rows`
    async fn write_all(&self, rows: &[LedgerRow]) -> Result<(), ScoutError>;
}

/// Ledger kept as a CSV file with a header row
pub struct CsvLedgerStore {
    path: PathBuf,
}

impl CsvLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_err(&self, e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> ScoutError {
        ScoutError::ledger_io(&self.path, e)
    }
}

/// Parse a ledger body; prices tolerate `$` and thousands separators
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<LedgerRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i + 2;
        let record = record.map_err(|e| format!("row {}: {}", line, e))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != HEADERS.len() {
            return Err(format!("row {}: expected {} fields, got {}", line, HEADERS.len(), record.len()));
        }

        let date = NaiveDate::parse_from_str(&record[0], "%Y-%m-%d")
            .map_err(|e| format!("row {}: bad date {:?}: {}", line, &record[0], e))?;
        let price_text: String = record[4].chars().filter(|c| *c != '$' && *c != ',').collect();
        let price = if price_text.is_empty() {
            Decimal::ZERO
        } else {
            price_text
                .parse::<Decimal>()
                .map_err(|e| format!("row {}: bad price {:?}: {}", line, &record[4], e))?
        };
        let availability = if record[5].is_empty() {
            0
        } else {
            record[5]
                .parse::<u32>()
                .map_err(|e| format!("row {}: bad availability {:?}: {}", line, &record[5], e))?
        };

        rows.push(LedgerRow {
            date,
            complex: record[1].to_string(),
            plan: record[2].to_string(),
            specs: record[3].to_string(),
            price,
            availability,
        });
    }

    Ok(rows)
}

pub fn encode_rows(rows: &[LedgerRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            row.complex.clone(),
            row.plan.clone(),
            row.specs.clone(),
            row.price.to_string(),
            row.availability.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[async_trait]
impl LedgerStore for CsvLedgerStore {
    async fn read_all(&self) -> Result<Vec<LedgerRow>, ScoutError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = ?self.path, "No ledger yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_err(e)),
        };

        let rows = decode_rows(&bytes).map_err(|e| self.io_err(e))?;
        debug!(path = ?self.path, rows = rows.len(), "Read ledger");
        Ok(rows)
    }

    async fn write_all(&self, rows: &[LedgerRow]) -> Result<(), ScoutError> {
        let body = encode_rows(rows).map_err(|e| self.io_err(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_err(e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await.map_err(|e| self.io_err(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;

        info!(path = ?self.path, rows = rows.len(), "Wrote ledger");
        Ok(())
    }
}
