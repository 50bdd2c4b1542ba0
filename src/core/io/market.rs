use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use super::DataError;

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 3] = ["%d%m%Y", "%Y-%m-%d", "%Y%m%d"];

/// One daily OHLCV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Daily price history of one symbol, strictly chronological with unique dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sort by date and drop repeated dates. The first occurrence of a date wins.
    pub fn from_bars(mut bars: Vec<PriceBar>) -> Self {
        // Stable, so the earliest input row of a date is first among equals.
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self { bars }
    }

    /// Keep the earliest `max_rows` rows.
    pub fn truncated(mut self, max_rows: usize) -> Self {
        self.bars.truncate(max_rows);
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Rows `[start, end)` clamped to the series length.
    pub fn window(&self, start: usize, end: usize) -> PriceSeries {
        let end = end.min(self.bars.len());
        let start = start.min(end);
        PriceSeries {
            bars: self.bars[start..end].to_vec(),
        }
    }
}

/// Parse a date in any of the accepted layouts.
///
/// `%d%m%Y` also matches some `%Y%m%d` strings with a nonsense year, so only
/// years in 1900..=2100 are accepted.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .find(|d| (1900..=2100).contains(&d.year()))
}

/// Read a daily OHLCV CSV file.
///
/// The header row must name `Date` and `Close`; `Open`, `High`, `Low` and
/// `Volume` default to NaN when absent. Header matching ignores case. Rows
/// whose date or close does not parse are skipped.
pub fn read_price_csv<P: AsRef<Path>>(path: P) -> Result<PriceSeries, DataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let header_map = build_header_map(&headers);

    let column = |name: &str| -> Result<usize, DataError> {
        header_map.get(name).copied().ok_or_else(|| DataError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
    };
    let date_idx = column("date")?;
    let close_idx = column("close")?;
    let open_idx = header_map.get("open").copied();
    let high_idx = header_map.get("high").copied();
    let low_idx = header_map.get("low").copied();
    let volume_idx = header_map.get("volume").copied();

    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result.map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let date = record.get(date_idx).and_then(parse_date);
        let close = field(&record, Some(close_idx));
        let Some(date) = date.filter(|_| close.is_finite()) else {
            skipped += 1;
            continue;
        };

        bars.push(PriceBar {
            date,
            open: field(&record, open_idx),
            high: field(&record, high_idx),
            low: field(&record, low_idx),
            close,
            volume: field(&record, volume_idx),
        });
    }

    if skipped > 0 {
        debug!("{}: skipped {} unparseable rows", path.display(), skipped);
    }
    if bars.is_empty() {
        return Err(DataError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(PriceSeries::from_bars(bars))
}

fn field(record: &StringRecord, idx: Option<usize>) -> f64 {
    idx.and_then(|i| record.get(i))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase(), idx))
        .collect()
}
