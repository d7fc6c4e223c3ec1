//! # qstash Noise
//!
//! Device noise for calibrated simulators.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qstash_noise // L2: Noise
//!     Channels // Pauli, Relaxation, NoiseOp
//!     NoiseModel // per-qubit and per-coupling noise
//!         ops_for(gate) // noise events after a gate
//!         readout_error(q)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qstash_core::Gate;
//! use qstash_noise::prelude::*;
//!
//! let model = NoiseModel::uniform(5, 120.0, 80.0, 3e-4, 8e-3, 1.5e-2).unwrap();
//! let ops = model.ops_for(&Gate::Sx(2));
//! assert!(!ops.is_empty());
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Noise channels (Gantree: L2_Noise → Channels)
pub mod channel;

/// Noise model (Gantree: L2_Noise → NoiseModel)
pub mod noise_model;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{NoiseOp, Pauli, Relaxation};
pub use noise_model::{EdgeNoise, NoiseModel, QubitNoise};

// ============================================================================
// Prelude
// ============================================================================

/// Convenient imports for common use cases
pub mod prelude {
    pub use crate::channel::{NoiseOp, Pauli, Relaxation};
    pub use crate::noise_model::{EdgeNoise, NoiseModel, QubitNoise};
}
