//! Market data provider abstraction.
//!
//! The pipeline only needs two things per symbol: a daily price history and a
//! raw fundamentals snapshot. [`CsvCacheProvider`] serves both from files on
//! disk; [`InMemoryProvider`] serves preloaded values.

use ipostat::core::io::{DataError, FundamentalSnapshot, PriceSeries, read_info_json, read_price_csv};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Provider Error
// ============================================================================

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),
    #[error("no price rows for {0}")]
    Empty(String),
    #[error(transparent)]
    Data(#[from] DataError),
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Source of per-symbol price histories and fundamentals.
///
/// Calls for different symbols are independent and may run concurrently.
pub trait MarketDataProvider: Send + Sync {
    /// Full daily history, chronological with unique dates.
    fn price_history(&self, symbol: &str) -> Result<PriceSeries, ProviderError>;

    /// Every numeric attribute known for the symbol.
    fn fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, ProviderError>;
}

// ============================================================================
// File Cache
// ============================================================================

/// Reads `<root>/<SYMBOL>.csv` and `<root>/<SYMBOL>-info.json`.
#[derive(Debug, Clone)]
pub struct CsvCacheProvider {
    root: PathBuf,
}

impl CsvCacheProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn existing(&self, symbol: &str, file_name: String) -> Result<PathBuf, ProviderError> {
        let path = self.root.join(file_name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ProviderError::UnknownSymbol(symbol.to_string()))
        }
    }
}

impl MarketDataProvider for CsvCacheProvider {
    fn price_history(&self, symbol: &str) -> Result<PriceSeries, ProviderError> {
        let path = self.existing(symbol, format!("{}.csv", symbol))?;
        match read_price_csv(path) {
            Err(DataError::Empty { .. }) => Err(ProviderError::Empty(symbol.to_string())),
            other => Ok(other?),
        }
    }

    fn fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, ProviderError> {
        let path = self.existing(symbol, format!("{}-info.json", symbol))?;
        Ok(read_info_json(path)?)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Serves preloaded series and snapshots.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<String, PriceSeries>,
    fundamentals: HashMap<String, FundamentalSnapshot>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<String>, series: PriceSeries) -> Self {
        self.series.insert(symbol.into(), series);
        self
    }

    pub fn with_fundamentals(mut self, symbol: impl Into<String>, snapshot: FundamentalSnapshot) -> Self {
        self.fundamentals.insert(symbol.into(), snapshot);
        self
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn price_history(&self, symbol: &str) -> Result<PriceSeries, ProviderError> {
        match self.series.get(symbol) {
            Some(s) if s.is_empty() => Err(ProviderError::Empty(symbol.to_string())),
            Some(s) => Ok(s.clone()),
            None => Err(ProviderError::UnknownSymbol(symbol.to_string())),
        }
    }

    fn fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, ProviderError> {
        self.fundamentals
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))
    }
}
