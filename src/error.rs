use std::path::PathBuf;
use thiserror::Error;

use crate::scrapers::availability::ExtractState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures a run can report.
///
/// Only `Discovery` and `LedgerIo` ever abort a run. The per-listing kinds are
/// absorbed at the extractor boundary and exist so logs can tell them apart.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("no listings discovered across {search_pages} search page(s)")]
    Discovery { search_pages: usize },

    #[error("timed out in {state:?} after {waited_secs}s")]
    ExtractionTimeout { state: ExtractState, waited_secs: u64 },

    #[error("could not parse floorplan tiles: {0}")]
    Parse(String),

    #[error("browser session failed in {state:?}: {message}")]
    Session { state: ExtractState, message: String },

    #[error("ledger {path:?}: {source}")]
    LedgerIo {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl ScoutError {
    pub fn ledger_io(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::LedgerIo {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn session(state: ExtractState, err: impl std::fmt::Display) -> Self {
        Self::Session {
            state,
            message: err.to_string(),
        }
    }

    /// Widget state a per-listing failure happened in
    pub fn state(&self) -> Option<ExtractState> {
        match self {
            Self::ExtractionTimeout { state, .. } | Self::Session { state, .. } => Some(*state),
            Self::Parse(_) => Some(ExtractState::TileParsing),
            Self::Discovery { .. } | Self::LedgerIo { .. } => None,
        }
    }

    /// Short class name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "discovery",
            Self::ExtractionTimeout { .. } => "timeout",
            Self::Parse(_) => "parse",
            Self::Session { .. } => "session",
            Self::LedgerIo { .. } => "ledger_io",
        }
    }
}
