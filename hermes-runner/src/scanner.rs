//! Batch scanner: one strategy over many symbols on a bounded worker pool.
//!
//! The strategy is validated once up front. Each symbol then runs
//! independently; a failure is recorded on that symbol's row and never
//! affects the others. Results come back ranked by total return.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use hermes_core::backtest::BacktestConfig;
use hermes_core::strategy::PreparedStrategy;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::{NoCache, ResultCache};
use crate::contract::{ScanRequest, ScanResponse, ScanResult, ScanStatus};
use crate::error::RunError;
use crate::runner::Runner;

#[derive(Clone)]
pub struct Scanner {
    runner: Runner,
    cache: Arc<dyn ResultCache>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

/// Upper-case, trim, drop blanks and repeats. First occurrence keeps its slot.
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Best total return first. Rows without a total return sink to the bottom,
/// errors ahead of not-attempted; ties keep their input order.
fn rank(results: &mut [ScanResult]) {
    fn bucket(r: &ScanResult) -> u8 {
        match (r.status, r.total_return()) {
            (ScanStatus::Success, Some(_)) => 0,
            (ScanStatus::Success, None) => 1,
            (ScanStatus::Error, _) => 2,
            (ScanStatus::NotAttempted, _) => 3,
        }
    }
    results.sort_by(|a, b| {
        bucket(a).cmp(&bucket(b)).then_with(|| {
            match (a.total_return(), b.total_return()) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        })
    });
}

impl Scanner {
    /// A scanner that always recomputes.
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            cache: Arc::new(NoCache),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, RunError> {
        let started = Instant::now();
        let settings = self.runner.settings();

        let prepared = self
            .runner
            .prepare(&request.strategy_config(), request.timeframe)?;
        let config = request.backtest_config(settings);
        config.validate()?;

        let symbols = match &request.symbols {
            Some(list) => normalize_symbols(list),
            None => normalize_symbols(self.runner.source().list_symbols()?),
        };

        let workers = request
            .max_concurrency
            .unwrap_or(settings.default_max_concurrency)
            .max(1);
        let deadline = settings.scan_timeout().map(|t| started + t);
        info!(
            strategy = prepared.name(),
            symbols = symbols.len(),
            workers,
            "starting scan"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        let mut results: Vec<ScanResult> = pool.install(|| {
            symbols
                .par_iter()
                .map(|symbol| {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return ScanResult::not_attempted(symbol);
                    }
                    self.scan_symbol(symbol, &prepared, request, &config)
                })
                .collect()
        });
        rank(&mut results);

        let count = |status: ScanStatus| results.iter().filter(|r| r.status == status).count();
        let completed = count(ScanStatus::Success);
        let failed = count(ScanStatus::Error);
        let not_attempted = count(ScanStatus::NotAttempted);
        let cached_count = results.iter().filter(|r| r.cached).count();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            strategy = prepared.name(),
            completed,
            failed,
            not_attempted,
            cached = cached_count,
            elapsed_ms,
            "scan finished"
        );

        Ok(ScanResponse {
            strategy: prepared.name().to_string(),
            total_symbols: results.len(),
            completed,
            failed,
            not_attempted,
            cached_count,
            fresh_count: completed - cached_count,
            results,
            elapsed_ms,
        })
    }

    fn scan_symbol(
        &self,
        symbol: &str,
        prepared: &PreparedStrategy,
        request: &ScanRequest,
        config: &BacktestConfig,
    ) -> ScanResult {
        let key = match self.runner.fingerprint(
            symbol,
            prepared,
            request.start_date,
            request.end_date,
            config,
        ) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(symbol, error = %e, "fingerprint failed, skipping cache");
                None
            }
        };

        if let Some(hit) = key.as_ref().and_then(|k| self.cache.get(k)) {
            debug!(symbol, "cache hit");
            return ScanResult {
                cached: true,
                ..hit
            };
        }

        match self
            .runner
            .run_prepared(symbol, prepared, request.start_date, request.end_date, config)
        {
            Ok(bt) => {
                let result = ScanResult::from_backtest(&bt);
                if let Some(k) = &key {
                    self.cache.put(k, &result);
                }
                result
            }
            Err(e) => {
                warn!(symbol, kind = e.kind(), error = %e, "symbol failed");
                ScanResult::failed(symbol, e.to_string())
            }
        }
    }
}
