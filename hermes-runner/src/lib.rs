//! Hermes Runner: single runs and batch scans over `hermes-core`.
//!
//! - Request/response payloads for runs and scans
//! - Data sources (in-memory, CSV directory, synthetic)
//! - Fingerprint-keyed scan result caches
//! - Bounded-concurrency batch scanner
//! - TOML engine settings

pub mod cache;
pub mod contract;
pub mod error;
pub mod runner;
pub mod scanner;
pub mod settings;
pub mod source;

pub use cache::{JsonFileCache, MemoryCache, NoCache, ResultCache};
pub use contract::{
    RunRequest, RunResult, RunStatus, ScanRequest, ScanResponse, ScanResult, ScanStatus,
};
pub use error::RunError;
pub use runner::Runner;
pub use scanner::Scanner;
pub use settings::{ConfigError, EngineSettings};
pub use source::{CsvDirSource, DataError, DataSource, MemorySource, SyntheticSource};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn services_are_send_sync() {
        assert_send::<Runner>();
        assert_sync::<Runner>();
        assert_send::<Scanner>();
        assert_sync::<Scanner>();
    }

    #[test]
    fn caches_are_send_sync() {
        assert_send::<MemoryCache>();
        assert_sync::<MemoryCache>();
        assert_send::<JsonFileCache>();
        assert_sync::<JsonFileCache>();
    }

    #[test]
    fn payloads_are_send_sync() {
        assert_send::<RunResult>();
        assert_sync::<RunResult>();
        assert_send::<ScanResponse>();
        assert_sync::<ScanResponse>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
