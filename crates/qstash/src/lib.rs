//! # qstash
//!
//! Calibrated IBM backend simulators, persisted as versioned artifacts.
//!
//! The builder fetches calibration for each supported backend and
//! writes one artifact per simulation method. The runner loads an
//! artifact, transpiles caller circuits against it and samples them.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qstash // L6: Artifact Store
//!     IbmBackendName // closed backend set
//!     StoreConfig // .env + environment
//!     SimulatorArtifact // versioned record
//!     ArtifactStore // {base}/ibm_simulators/{backend}/{method}.json
//!     Builder
//!         save_all(source, base_path, verbose) -> BuildReport
//!         save_ibm_simulators(channel, token, base_path, verbose)
//!     QuantumSimulator // load -> transpile -> sample
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qstash::prelude::*;
//! use qstash_calibration::{CalibrationSnapshot, StaticSource};
//! use qstash_core::CircuitBuilder;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let source = StaticSource::new()
//!     .with_snapshot(CalibrationSnapshot::ibm_typical("ibm_brisbane", 5))
//!     .with_snapshot(CalibrationSnapshot::ibm_typical("ibm_sherbrooke", 5));
//! let report = save_all(&source, dir.path(), false).unwrap();
//! assert_eq!(report.saved_count(), 20);
//!
//! let sim = QuantumSimulator::new(dir.path(), "ibm_brisbane", "aer_simulator_stabilizer").unwrap();
//! let circuit = CircuitBuilder::new(2).h(0).cx(0, 1).measure_all().build();
//! let result = sim.run(&circuit).unwrap().wait().unwrap();
//! assert_eq!(result[0].shots, 1024);
//! ```
//!
//! ## Environment Variables
//!
//! ```bash
//! export IBM_SIMULATORS_BASE_PATH="/data"
//! export IBM_API_TOKEN="your-api-token"
//! export IBM_QUANTUM_CHANNEL="ibm_quantum"  # optional
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Error types (Gantree: L6_Store → Errors)
pub mod error;

/// Backend names (Gantree: L6_Store → BackendName)
pub mod backend_name;

/// Configuration (Gantree: L6_Store → Config)
pub mod config;

/// Artifact record and store (Gantree: L6_Store → Artifact)
pub mod artifact;

/// Artifact builder (Gantree: L6_Store → Builder)
pub mod builder;

/// Artifact runner (Gantree: L6_Store → Runner)
pub mod runner;

// ============================================================================
// Re-exports
// ============================================================================

pub use artifact::{ArtifactStore, SimulatorArtifact, ARTIFACT_DIR, FORMAT_VERSION, PRODUCER};
pub use backend_name::IbmBackendName;
pub use builder::{
    save_all, save_from_config, save_ibm_simulators, ArtifactBuilder, BuildEntry, BuildOutcome,
    BuildReport,
};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use runner::QuantumSimulator;

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports
    //!
    //! ```rust
    //! use qstash::prelude::*;
    //! ```

    pub use crate::artifact::{ArtifactStore, SimulatorArtifact};
    pub use crate::backend_name::IbmBackendName;
    pub use crate::builder::{save_all, save_ibm_simulators, BuildOutcome, BuildReport};
    pub use crate::config::StoreConfig;
    pub use crate::error::StoreError;
    pub use crate::runner::QuantumSimulator;
    pub use qstash_sim::SimulationMethod;
}

// ============================================================================
// Integration Tests
// ============================================================================
