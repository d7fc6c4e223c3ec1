//! # qstash Simulation
//!
//! Calibrated circuit simulators for the ten supported simulation
//! methods.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qstash_sim // L4: Simulation
//!     SimulationMethod // ten method names, device, representation
//!     BackendTrait // execute(circuit, shots) -> ExecutionResult
//!     Program // idle-qubit truncation + attached noise
//!     Engines
//!         StateVector // trajectories
//!         DensityMatrix // exact channels
//!         Tableau // CHP stabilizer
//!     SimulatorBackend // snapshot + method -> counts
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qstash_sim::prelude::*;
//! use qstash_core::CircuitBuilder;
//! use qstash_calibration::CalibrationSnapshot;
//!
//! let snapshot = CalibrationSnapshot::ibm_typical("ibm_test", 3);
//! let sim = SimulatorBackend::from_snapshot(
//!     snapshot,
//!     "aer_simulator_density_matrix".parse().unwrap(),
//!     SimulatorOptions::default().with_seed(7),
//! )
//! .unwrap();
//!
//! let circuit = CircuitBuilder::new(2).h(0).cx(0, 1).measure_all().build();
//! let result = sim.execute(&circuit, 1000).unwrap();
//! assert_eq!(result.total_counts(), 1000);
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Simulation methods (Gantree: L4_Simulation → SimulationMethod)
pub mod method;

/// Execution interface (Gantree: L4_Simulation → BackendTrait)
pub mod execution;

mod engine;
mod program;

/// Simulator backend (Gantree: L4_Simulation → SimulatorBackend)
pub mod simulator;

// ============================================================================
// Re-exports
// ============================================================================

pub use execution::{Backend, ExecutionMetadata, ExecutionResult};
pub use method::{Device, Representation, SimulationMethod, UnknownMethod};
pub use simulator::{SimulatorBackend, SimulatorOptions, DEFAULT_SHOTS};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports
    //!
    //! ```rust
    //! use qstash_sim::prelude::*;
    //! ```

    pub use crate::execution::{Backend, ExecutionResult};
    pub use crate::method::{Device, Representation, SimulationMethod};
    pub use crate::simulator::{SimulatorBackend, SimulatorOptions};
}
