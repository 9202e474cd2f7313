use crate::models::ListingResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

/// Human-readable summary of a run.
///
/// One section per complex with rows, in complex order. Complexes with no rows
/// are left out, as are complexes outside `only` when it is non-empty.
pub fn format_summary(result: &ListingResult, only: &[String], ledger_link: Option<&str>) -> String {
    let mut out = String::new();

    for (complex, rows) in result {
        if rows.is_empty() || (!only.is_empty() && !only.contains(complex)) {
            continue;
        }

        let total: u64 = rows.iter().map(|r| u64::from(r.unit_count)).sum();
        let _ = writeln!(out, "------------ {} ----------------", complex);
        for row in rows {
            let _ = writeln!(out, "{}, {}, {}, {}", row.plan, row.specs, row.min_price, row.unit_count);
        }
        let _ = writeln!(out, "Total Available: {}", total);
    }

    if let Some(link) = ledger_link {
        if !out.is_empty() {
            let _ = writeln!(out, "For historical data click the link below:\n{}", link);
        }
    }

    out
}

/// Destination for the run summary
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, summary: &str) -> Result<()>;
}

pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, summary: &str) -> Result<()> {
        if summary.is_empty() {
            info!("Nothing to send");
            return Ok(());
        }
        print!("{}", summary);
        Ok(())
    }
}

/// Writes the summary to a file, replacing the previous run's
pub struct FileNotifier {
    path: PathBuf,
}

impl FileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Notifier for FileNotifier {
    async fn send(&self, summary: &str) -> Result<()> {
        if summary.is_empty() {
            info!("Nothing to send");
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, summary)
            .await
            .with_context(|| format!("Failed to write summary to {:?}", self.path))?;
        info!(path = ?self.path, "Saved summary");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AvailabilityRow;
    use rust_decimal::Decimal;

    fn result() -> ListingResult {
        ListingResult::from([
            (
                "alpha".to_string(),
                vec![
                    AvailabilityRow {
                        plan: "A1".into(),
                        specs: "1 Bed".into(),
                        min_price: Decimal::from(2100),
                        unit_count: 4,
                    },
                    AvailabilityRow {
                        plan: "B2".into(),
                        specs: "2 Bed".into(),
                        min_price: Decimal::ZERO,
                        unit_count: 1,
                    },
                ],
            ),
            ("beta".to_string(), vec![]),
        ])
    }

    #[test]
    fn test_summary_sections() {
        let text = format_summary(&result(), &[], None);
        assert_eq!(
            text,
            "------------ alpha ----------------\n\
             A1, 1 Bed, 2100, 4\n\
             B2, 2 Bed, 0, 1\n\
             Total Available: 5\n"
        );
        assert!(!text.contains("beta"));
    }

    #[test]
    fn test_summary_filter_and_link() {
        let only = vec!["gamma".to_string()];
        assert_eq!(format_summary(&result(), &only, Some("https://x")), "");

        let text = format_summary(&result(), &[], Some("https://sheet"));
        assert!(text.ends_with("For historical data click the link below:\nhttps://sheet\n"));
    }

    #[tokio::test]
    async fn test_file_notifier_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        let notifier = FileNotifier::new(&path);

        notifier.send("").await.unwrap();
        assert!(!path.exists());

        notifier.send("hello\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
