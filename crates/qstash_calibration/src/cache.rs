//! Snapshot cache
//!
//! Gantree: L3_Calibration → CalibrationCache
//!
//! Keeps fetched snapshots for a time-to-live so that building several
//! simulators for one backend costs a single remote fetch.

use crate::snapshot::CalibrationSnapshot;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    snapshot: CalibrationSnapshot,
    stored_at: Instant,
}

/// TTL cache of calibration snapshots keyed by backend name
///
/// Clones share storage.
/// Gantree: CalibrationCache // TTL cache
#[derive(Debug, Clone)]
pub struct CalibrationCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl CalibrationCache {
    /// Default time-to-live (1 hour)
    pub const DEFAULT_TTL_SECS: u64 = 3600;

    /// Create a cache whose entries live `ttl_seconds`
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    // ========================================================================
    // Cache Operations
    // ========================================================================

    /// Fresh snapshot for `backend`, if any
    pub fn get(&self, backend: &str) -> Option<CalibrationSnapshot> {
        let entries = self.entries.read().ok()?;
        entries
            .get(backend)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.snapshot.clone())
    }

    /// Store a snapshot under `backend`
    pub fn insert(&self, backend: &str, snapshot: CalibrationSnapshot) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                backend.to_string(),
                Entry {
                    snapshot,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the snapshot of `backend`
    pub fn invalidate(&self, backend: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(backend);
        }
    }

    /// Drop every snapshot
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Cached snapshot, or the result of `fetch` which is then cached
    ///
    /// Fetch errors are returned unchanged and nothing is stored.
    /// Gantree: get_or_try_fetch(backend, fetch) -> Result<Snapshot, E> // read-through
    pub fn get_or_try_fetch<F, E>(&self, backend: &str, fetch: F) -> Result<CalibrationSnapshot, E>
    where
        F: FnOnce() -> Result<CalibrationSnapshot, E>,
    {
        if let Some(snapshot) = self.get(backend) {
            return Ok(snapshot);
        }
        let snapshot = fetch()?;
        self.insert(backend, snapshot.clone());
        Ok(snapshot)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of stored entries, expired included
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remove expired entries
    pub fn purge_expired(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        }
    }
}

impl Default for CalibrationCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL_SECS)
    }
}

// ============================================================================
// Tests
// ============================================================================
