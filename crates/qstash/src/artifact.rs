//! Simulator artifacts
//!
//! Gantree: L6_Store → Artifact
//!
//! A simulator is persisted as a versioned JSON record holding the
//! calibration snapshot plus the method it was configured for. Loading
//! rebuilds a [`SimulatorBackend`] from the record.
//!
//! Layout: `{base_path}/ibm_simulators/{backend}/{method}.json`

use crate::backend_name::IbmBackendName;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use qstash_calibration::CalibrationSnapshot;
use qstash_core::QstashResult;
use qstash_sim::{Device, Representation, SimulationMethod, SimulatorBackend, SimulatorOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Current record layout version
pub const FORMAT_VERSION: u32 = 1;

/// Producer tag written into every record
pub const PRODUCER: &str = concat!("qstash/", env!("CARGO_PKG_VERSION"));

/// Directory below the base path holding all artifacts
pub const ARTIFACT_DIR: &str = "ibm_simulators";

/// Artifact file extension
pub const ARTIFACT_EXT: &str = "json";

// ============================================================================
// Record
// ============================================================================

/// Persisted simulator configuration
/// Gantree: SimulatorArtifact // versioned record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorArtifact {
    /// Record layout version
    pub format_version: u32,

    /// Crate that wrote the record
    pub producer: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Mirrored backend
    pub backend: IbmBackendName,

    /// Simulation method
    pub method: SimulationMethod,

    /// Device class of `method`
    pub device: Device,

    /// Representation of `method`
    pub representation: Representation,

    /// Backend calibration at build time
    pub calibration: CalibrationSnapshot,

    /// Run options
    pub options: SimulatorOptions,
}

impl SimulatorArtifact {
    /// Create a record for `backend` and `method` from a snapshot
    pub fn new(
        backend: IbmBackendName,
        method: SimulationMethod,
        calibration: CalibrationSnapshot,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            producer: PRODUCER.to_string(),
            created_at: Utc::now(),
            backend,
            method,
            device: method.device(),
            representation: method.representation(),
            calibration,
            options: SimulatorOptions::default(),
        }
    }

    /// Set run options
    pub fn with_options(mut self, options: SimulatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the record is a runnable simulator for `backend` and `method`
    pub fn check(&self, backend: IbmBackendName, method: SimulationMethod) -> Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.backend != backend {
            return Err(format!("record is for backend '{}'", self.backend));
        }
        if self.method != method {
            return Err(format!("record is for method '{}'", self.method));
        }
        if self.device != method.device() || self.representation != method.representation() {
            return Err(format!(
                "record declares {} on {}, method '{}' needs {} on {}",
                self.representation,
                self.device,
                method,
                method.representation(),
                method.device()
            ));
        }
        if self.calibration.num_qubits == 0 {
            return Err("empty calibration".to_string());
        }
        if self.calibration.backend_name != backend.as_str() {
            return Err(format!(
                "calibration is for backend '{}'",
                self.calibration.backend_name
            ));
        }
        self.calibration.validate().map_err(|e| e.to_string())
    }

    /// Rebuild the simulator
    pub fn into_simulator(self) -> QstashResult<SimulatorBackend> {
        SimulatorBackend::from_snapshot(self.calibration, self.method, self.options)
    }
}

// ============================================================================
// Store
// ============================================================================

/// Filesystem artifact store rooted at a base path
/// Gantree: ArtifactStore // path layout + atomic IO
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    base_path: PathBuf,
}

impl ArtifactStore {
    /// Create a store under `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `{base_path}/ibm_simulators`
    pub fn root(&self) -> PathBuf {
        self.base_path.join(ARTIFACT_DIR)
    }

    /// `{base_path}/ibm_simulators/{backend}`
    pub fn backend_dir(&self, backend: IbmBackendName) -> PathBuf {
        self.root().join(backend.as_str())
    }

    /// `{base_path}/ibm_simulators/{backend}/{method}.json`
    pub fn artifact_path(&self, backend: IbmBackendName, method: SimulationMethod) -> PathBuf {
        self.backend_dir(backend)
            .join(format!("{}.{}", method.as_str(), ARTIFACT_EXT))
    }

    /// Create the artifact root if missing
    pub fn ensure_root(&self) -> StoreResult<PathBuf> {
        create_dir(self.root())
    }

    /// Create the backend directory if missing
    pub fn ensure_backend_dir(&self, backend: IbmBackendName) -> StoreResult<PathBuf> {
        create_dir(self.backend_dir(backend))
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Write `artifact`, replacing any existing file
    ///
    /// The record goes to a temporary file in the target directory which
    /// is then renamed over the destination.
    pub fn save(&self, artifact: &SimulatorArtifact) -> StoreResult<PathBuf> {
        let dir = self.ensure_backend_dir(artifact.backend)?;
        let path = self.artifact_path(artifact.backend, artifact.method);
        let save_err = |reason: String| StoreError::Save {
            path: path.clone(),
            reason,
        };

        let mut file = NamedTempFile::new_in(&dir).map_err(|e| save_err(e.to_string()))?;
        serde_json::to_writer_pretty(&mut file, artifact).map_err(|e| save_err(e.to_string()))?;
        file.write_all(b"\n")
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| save_err(e.to_string()))?;
        file.persist(&path).map_err(|e| save_err(e.error.to_string()))?;

        log::debug!("Wrote {} ({})", path.display(), artifact.calibration);
        Ok(path)
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Read and check the record for `backend` and `method`
    pub fn load(
        &self,
        backend: IbmBackendName,
        method: SimulationMethod,
    ) -> StoreResult<SimulatorArtifact> {
        let path = self.artifact_path(backend, method);
        let text = fs::read_to_string(&path).map_err(|e| StoreError::load(&path, e))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| StoreError::load(&path, e))?;

        // Version first so older layouts fail with a clear reason
        match value.get("format_version").and_then(|v| v.as_u64()) {
            Some(v) if v == u64::from(FORMAT_VERSION) => {}
            Some(v) => {
                return Err(StoreError::load(
                    &path,
                    format!("unsupported format version {} (expected {})", v, FORMAT_VERSION),
                ))
            }
            None => return Err(StoreError::load(&path, "missing format_version")),
        }

        let artifact: SimulatorArtifact =
            serde_json::from_value(value).map_err(|e| StoreError::load(&path, e))?;
        artifact
            .check(backend, method)
            .map_err(|reason| StoreError::load(&path, reason))?;

        if artifact.producer != PRODUCER {
            log::warn!(
                "{} was written by {}, loading with {}",
                path.display(),
                artifact.producer,
                PRODUCER
            );
        }
        Ok(artifact)
    }

    /// Load and rebuild the simulator for `backend` and `method`
    pub fn load_simulator(
        &self,
        backend: IbmBackendName,
        method: SimulationMethod,
    ) -> StoreResult<SimulatorBackend> {
        let path = self.artifact_path(backend, method);
        self.load(backend, method)?
            .into_simulator()
            .map_err(|e| StoreError::load(&path, e))
    }

    /// Pairs with an artifact file on disk, in build order
    pub fn saved(&self) -> Vec<(IbmBackendName, SimulationMethod)> {
        IbmBackendName::ALL
            .iter()
            .flat_map(|&b| SimulationMethod::ALL.iter().map(move |&m| (b, m)))
            .filter(|&(b, m)| self.artifact_path(b, m).is_file())
            .collect()
    }
}

fn create_dir(path: PathBuf) -> StoreResult<PathBuf> {
    fs::create_dir_all(&path).map_err(|source| StoreError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================
