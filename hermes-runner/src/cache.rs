//! Scan result cache keyed by run fingerprint.
//!
//! The cache is a collaborator handed to the scanner, never a global. Only
//! successful results are stored. Entries older than the TTL read as misses.
//! Two workers racing on the same fresh key both compute; the first write
//! wins and the second is dropped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hermes_core::fingerprint::RunFingerprint;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contract::ScanResult;

pub trait ResultCache: Send + Sync {
    fn get(&self, key: &RunFingerprint) -> Option<ScanResult>;
    fn put(&self, key: &RunFingerprint, result: &ScanResult);
}

/// A stored result and when it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub stored_at: DateTime<Utc>,
    pub result: ScanResult,
}

impl CachedEntry {
    fn new(result: &ScanResult) -> Self {
        Self {
            stored_at: Utc::now(),
            result: result.clone(),
        }
    }

    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(age) => age < ttl,
            // Stored "in the future" (clock skew): treat as fresh.
            Err(_) => true,
        }
    }
}

// ── No-op ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl ResultCache for NoCache {
    fn get(&self, _key: &RunFingerprint) -> Option<ScanResult> {
        None
    }

    fn put(&self, _key: &RunFingerprint, _result: &ScanResult) {}
}

// ── In-memory ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<RunFingerprint, CachedEntry>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl ResultCache for MemoryCache {
    /// A stale hit is evicted before reporting the miss.
    fn get(&self, key: &RunFingerprint) -> Option<ScanResult> {
        let now = Utc::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl, now) => return Some(entry.result.clone()),
            Some(_) => {}
            None => return None,
        }
        // The read guard is released here. Re-check under the write lock so a
        // fresh entry put in between survives.
        self.entries.remove_if(key, |_, entry| !entry.is_fresh(self.ttl, now));
        None
    }

    fn put(&self, key: &RunFingerprint, result: &ScanResult) {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut existing) => {
                if !existing.get().is_fresh(self.ttl, Utc::now()) {
                    existing.insert(CachedEntry::new(result));
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(CachedEntry::new(result));
            }
        }
    }
}

// ── JSON files ──────────────────────────────────────────────────────

/// Per-process sequence for temp file names; the pid alone is shared by
/// every scan worker.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

fn tmp_path(path: &Path) -> PathBuf {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()))
}

/// One `<fingerprint>.json` per entry. I/O failures are logged and treated
/// as misses; the cache never fails a scan.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl JsonFileCache {
    /// The directory is created if it doesn't exist.
    pub fn new(dir: impl AsRef<Path>, ttl: Duration) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &RunFingerprint) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read(&self, path: &Path) -> Option<CachedEntry> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache entry ignored");
                None
            }
        }
    }

    /// Number of entry files, fresh or not.
    pub fn len(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for JsonFileCache {
    fn get(&self, key: &RunFingerprint) -> Option<ScanResult> {
        self.read(&self.entry_path(key))
            .filter(|entry| entry.is_fresh(self.ttl, Utc::now()))
            .map(|entry| entry.result)
    }

    fn put(&self, key: &RunFingerprint, result: &ScanResult) {
        let path = self.entry_path(key);
        if self
            .read(&path)
            .is_some_and(|existing| existing.is_fresh(self.ttl, Utc::now()))
        {
            return;
        }

        let json = match serde_json::to_string(&CachedEntry::new(result)) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "cache entry not serializable");
                return;
            }
        };
        // Write-then-rename so readers never see a partial file.
        let tmp = tmp_path(&path);
        let written = std::fs::write(&tmp, json).and_then(|_| std::fs::rename(&tmp, &path));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "cache write failed");
            let _ = std::fs::remove_file(&tmp);
        }
    }
}
