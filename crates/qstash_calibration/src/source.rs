//! Calibration sources
//!
//! Gantree: L3_Calibration → CalibrationSource
//!
//! Anything that can hand out a snapshot for a backend name: the remote
//! runtime service in production, fixed snapshots in tests.

use crate::snapshot::CalibrationSnapshot;
use std::collections::HashMap;
use thiserror::Error;

/// Failure to produce a snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Backend unknown to the source
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// Source reachable but refused or failed
    #[error("Calibration source error: {0}")]
    Unavailable(String),

    /// Data received but unusable
    #[error("Invalid calibration data for {backend}: {reason}")]
    InvalidData {
        /// Backend name
        backend: String,
        /// What was wrong
        reason: String,
    },
}

/// Provider of backend calibration snapshots
/// Gantree: CalibrationSource // trait seam
pub trait CalibrationSource {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Current snapshot of `backend`
    fn backend_snapshot(&self, backend: &str) -> Result<CalibrationSnapshot, SourceError>;
}

/// In-memory source serving fixed snapshots
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    snapshots: HashMap<String, CalibrationSnapshot>,
}

impl StaticSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot under its backend name
    pub fn with_snapshot(mut self, snapshot: CalibrationSnapshot) -> Self {
        self.snapshots.insert(snapshot.backend_name.clone(), snapshot);
        self
    }
}

impl CalibrationSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn backend_snapshot(&self, backend: &str) -> Result<CalibrationSnapshot, SourceError> {
        self.snapshots
            .get(backend)
            .cloned()
            .ok_or_else(|| SourceError::BackendNotFound(backend.to_string()))
    }
}
