//! Market data sources.
//!
//! The runner never reads files or generates data itself; it asks a
//! [`DataSource`] for a symbol's series over an inclusive calendar-date
//! range. Three implementations ship here:
//! - [`MemorySource`]: preloaded series, for tests and embedding
//! - [`CsvDirSource`]: `<dir>/<SYMBOL>.csv` minute files
//! - [`SyntheticSource`]: deterministic random walks

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hermes_core::domain::{Candle, Series};
use hermes_core::synthetic::SyntheticWalk;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data for symbol '{0}'")]
    NotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },
    #[error("no bars for '{symbol}' between {start:?} and {end:?}")]
    EmptyRange {
        symbol: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

pub trait DataSource: Send + Sync {
    /// Candles for `symbol` whose calendar date falls within `[start, end]`.
    fn load(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Series, DataError>;

    /// Every symbol this source can serve, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, DataError>;
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

fn non_empty(
    series: Series,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Series, DataError> {
    if series.is_empty() {
        return Err(DataError::EmptyRange {
            symbol: series.symbol,
            start,
            end,
        });
    }
    Ok(series)
}

// ── Memory ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    series: BTreeMap<String, Series>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: Series) {
        self.series.insert(normalize(&series.symbol), series);
    }

    pub fn with(mut self, series: Series) -> Self {
        self.insert(series);
        self
    }
}

impl DataSource for MemorySource {
    fn load(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Series, DataError> {
        let key = normalize(symbol);
        let series = self
            .series
            .get(&key)
            .ok_or_else(|| DataError::NotFound(key.clone()))?;
        non_empty(series.between(start, end), start, end)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DataError> {
        Ok(self.series.keys().cloned().collect())
    }
}

// ── CSV directory ───────────────────────────────────────────────────

/// One row of a minute-bar CSV: `timestamp,open,high,low,close,volume`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Accepts unix seconds, RFC 3339, or a naive `YYYY-MM-DD[T ]HH:MM[:SS]`
/// taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp(secs, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn read(&self, symbol: &str, path: &Path) -> Result<Series, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| DataError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

        let mut candles = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|source| DataError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Parse {
                path: path.to_path_buf(),
                line: candles.len() as u64 + 2,
                message: format!("unrecognized timestamp '{}'", row.timestamp),
            })?;
            candles.push(Candle::new(
                timestamp, row.open, row.high, row.low, row.close, row.volume,
            ));
        }
        debug!(symbol, rows = candles.len(), path = %path.display(), "loaded CSV");
        Ok(Series::new(symbol, candles))
    }
}

impl DataSource for CsvDirSource {
    fn load(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Series, DataError> {
        let key = normalize(symbol);
        let path = self.path_for(&key);
        if !path.is_file() {
            return Err(DataError::NotFound(key));
        }
        let series = self.read(&key, &path)?;
        non_empty(series.between(start, end), start, end)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DataError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| DataError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut symbols: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(normalize))
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

// ── Synthetic ───────────────────────────────────────────────────────

/// Seeded random walks for any symbol. Open-ended ranges fall back to the
/// configured default window.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    walk: SyntheticWalk,
    symbols: Vec<String>,
    default_start: NaiveDate,
    default_end: NaiveDate,
}

impl SyntheticSource {
    pub fn new<I, S>(symbols: I, default_start: NaiveDate, default_end: NaiveDate) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: Vec<String> = symbols.into_iter().map(|s| normalize(s.as_ref())).collect();
        symbols.sort();
        symbols.dedup();
        Self {
            walk: SyntheticWalk::default(),
            symbols,
            default_start,
            default_end,
        }
    }

    pub fn with_walk(mut self, walk: SyntheticWalk) -> Self {
        self.walk = walk;
        self
    }
}

impl DataSource for SyntheticSource {
    fn load(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Series, DataError> {
        let from = start.unwrap_or(self.default_start);
        let to = end.unwrap_or(self.default_end);
        non_empty(self.walk.between(&normalize(symbol), from, to), start, end)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DataError> {
        Ok(self.symbols.clone())
    }
}
