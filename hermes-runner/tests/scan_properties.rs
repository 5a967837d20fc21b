//! Property tests for scan symbol handling and ranking.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use hermes_core::synthetic::SyntheticWalk;
use hermes_runner::scanner::normalize_symbols;
use hermes_runner::{EngineSettings, MemorySource, Runner, ScanRequest, ScanStatus, Scanner};
use proptest::prelude::*;

fn symbol() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["aa", "AA", " bb", "Bb", "cc ", "DD", "ee", ""]).prop_map(String::from)
}

proptest! {
    #[test]
    fn normalized_symbols_are_unique_and_stable(raw in prop::collection::vec(symbol(), 0..20)) {
        let once = normalize_symbols(&raw);
        let unique: HashSet<&String> = once.iter().collect();
        prop_assert_eq!(unique.len(), once.len());
        prop_assert!(once.iter().all(|s| !s.is_empty() && *s == s.trim().to_ascii_uppercase()));
        prop_assert_eq!(normalize_symbols(&once), once);
    }

    #[test]
    fn every_requested_symbol_gets_exactly_one_row(
        raw in prop::collection::vec(symbol(), 1..10),
        workers in 1usize..6,
    ) {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let walk = SyntheticWalk::default();
        // AA and BB have data; the rest fail to load.
        let source = MemorySource::new()
            .with(walk.bars("AA", day, 400))
            .with(walk.bars("BB", day, 400));
        let scanner = Scanner::new(Runner::new(Arc::new(source), EngineSettings::default()));

        let mut req = ScanRequest::new("rsi").with_symbols(raw.clone());
        req.max_concurrency = Some(workers);
        let resp = scanner.scan(&req).unwrap();

        let expected = normalize_symbols(&raw);
        prop_assert_eq!(resp.total_symbols, expected.len());
        prop_assert_eq!(resp.completed + resp.failed + resp.not_attempted, expected.len());
        let got: HashSet<&str> = resp.results.iter().map(|r| r.symbol.as_str()).collect();
        prop_assert_eq!(got, expected.iter().map(String::as_str).collect::<HashSet<_>>());

        // Successes rank ahead of failures.
        let first_failure = resp.results.iter().position(|r| r.status != ScanStatus::Success);
        if let Some(i) = first_failure {
            prop_assert!(resp.results[i..].iter().all(|r| r.status != ScanStatus::Success));
        }
    }
}
