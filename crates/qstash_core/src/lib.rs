//! # qstash Core
//!
//! Gates, circuits and coupling topology shared by the qstash crates.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qstash_core // L0+L1: Foundation + Circuit
//!     L0_Foundation
//!         CoreTypes // QubitId, Counts, Probability, Matrix2
//!         Errors // QstashError, QstashResult
//!     L1_Circuit
//!         Gate // gate enum with 1Q matrices
//!         Circuit // validated gate list, QASM2 import/export
//!         CircuitBuilder // fluent builder
//!         Topology // coupling graph, BFS routing paths
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qstash_core::prelude::*;
//!
//! let circuit = CircuitBuilder::new(3)
//!     .h(0)
//!     .cx(0, 1)
//!     .cx(1, 2)
//!     .measure_all()
//!     .build();
//!
//! let topo = Topology::linear(3);
//! assert!(topo.validate_circuit(&circuit).is_ok());
//! println!("{}", circuit.to_qasm());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Core types (Gantree: L0_Foundation → CoreTypes)
pub mod types;

/// Error types (Gantree: L0_Foundation → Errors)
pub mod error;

/// Quantum gates (Gantree: L1_Circuit → Gate)
pub mod gate;

/// Circuit structure (Gantree: L1_Circuit → Circuit)
pub mod circuit;

/// Circuit builder (Gantree: L1_Circuit → CircuitBuilder)
pub mod builder;

/// Qubit topology (Gantree: L1_Circuit → Topology)
pub mod topology;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::CircuitBuilder;
pub use circuit::Circuit;
pub use error::{QstashError, QstashResult};
pub use gate::Gate;
pub use topology::Topology;
pub use types::{Angle, ClbitId, Counts, Matrix2, Probability, QubitId};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases
    //!
    //! ```rust
    //! use qstash_core::prelude::*;
    //! ```

    pub use crate::builder::CircuitBuilder;
    pub use crate::circuit::Circuit;
    pub use crate::error::{QstashError, QstashResult};
    pub use crate::gate::Gate;
    pub use crate::topology::Topology;
    pub use crate::types::{Angle, ClbitId, Counts, Probability, QubitId};
}

// ============================================================================
// Integration Tests
// ============================================================================
