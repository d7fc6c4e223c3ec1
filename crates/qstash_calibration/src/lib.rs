//! # qstash Calibration
//!
//! Backend calibration snapshots, their cache, and the sources that
//! produce them.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qstash_calibration // L3: Calibration
//!     CalibrationSnapshot // device snapshot
//!         basis_gates, coupling_map, per-qubit and per-coupling data
//!         to_noise_model(), to_topology()
//!     CalibrationCache // TTL cache
//!         get(), insert(), get_or_try_fetch()
//!     CalibrationSource // trait seam
//!         StaticSource // in-memory
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qstash_calibration::prelude::*;
//!
//! let snapshot = CalibrationSnapshot::ibm_typical("ibm_test", 5);
//! let noise = snapshot.to_noise_model();
//! let topology = snapshot.to_topology().unwrap();
//! assert_eq!(noise.num_qubits(), 5);
//! assert!(topology.is_connected(0, 1));
//!
//! let cache = CalibrationCache::new(3600);
//! let source = StaticSource::new().with_snapshot(snapshot);
//! let fetched = cache
//!     .get_or_try_fetch("ibm_test", || source.backend_snapshot("ibm_test"))
//!     .unwrap();
//! assert_eq!(fetched.backend_name, "ibm_test");
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Calibration snapshot (Gantree: L3_Calibration → CalibrationSnapshot)
pub mod snapshot;

/// Snapshot cache (Gantree: L3_Calibration → CalibrationCache)
pub mod cache;

/// Snapshot sources (Gantree: L3_Calibration → CalibrationSource)
pub mod source;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::CalibrationCache;
pub use snapshot::{CalibrationSnapshot, QubitCalibration, TwoQubitCalibration};
pub use source::{CalibrationSource, SourceError, StaticSource};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports
    //!
    //! ```rust
    //! use qstash_calibration::prelude::*;
    //! ```

    pub use crate::cache::CalibrationCache;
    pub use crate::snapshot::{CalibrationSnapshot, QubitCalibration, TwoQubitCalibration};
    pub use crate::source::{CalibrationSource, SourceError, StaticSource};
}
