//! # qstash IBM
//!
//! IBM Quantum integration: calibration data from the runtime service,
//! a transpiler targeting IBM basis gates, and a local sampler.
//!
//! ## Gantree Architecture
//!
//! ```text
//! qstash_ibm // L5: IBM Quantum
//!     Auth // channel + token, IAM exchange on ibm_cloud
//!     Client // async REST: backends, status, configuration, properties
//!     RuntimeService // sync facade, CalibrationSource impl
//!         snapshot_from_api() // configuration + properties -> snapshot
//!     Transpiler // level 1: decompose, route, translate, fuse, cancel
//!     Sampler // background jobs over any Backend
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use qstash_ibm::prelude::*;
//! use qstash_calibration::CalibrationSnapshot;
//! use qstash_core::CircuitBuilder;
//! use qstash_sim::{SimulationMethod, SimulatorBackend, SimulatorOptions};
//! use std::sync::Arc;
//!
//! let snapshot = CalibrationSnapshot::ibm_typical("ibm_test", 3);
//! let transpiler = Transpiler::for_snapshot(&snapshot).unwrap();
//! let simulator = SimulatorBackend::from_snapshot(
//!     snapshot,
//!     SimulationMethod::Statevector,
//!     SimulatorOptions::default().with_seed(7),
//! )
//! .unwrap();
//!
//! let circuit = CircuitBuilder::new(3).h(0).cx(0, 2).measure_all().build();
//! let compiled = transpiler.transpile(&circuit).unwrap();
//!
//! let job = Sampler::new(Arc::new(simulator)).run(vec![compiled]);
//! let result = job.wait().unwrap();
//! assert_eq!(result[0].shots, 1024);
//! ```
//!
//! ## Environment Variables
//!
//! ```bash
//! export IBM_API_TOKEN="your-api-token"
//! export IBM_QUANTUM_CHANNEL="ibm_quantum"  # or ibm_cloud, ibm_quantum_platform
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Authentication (Gantree: L5_Ibm → Auth)
pub mod auth;

/// REST API client (Gantree: L5_Ibm → Client)
pub mod client;

/// Runtime service facade (Gantree: L5_Ibm → RuntimeService)
pub mod service;

/// Circuit transpilation (Gantree: L5_Ibm → Transpiler)
pub mod transpiler;

/// Local sampler (Gantree: L5_Ibm → Sampler)
pub mod sampler;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::{AuthError, IbmChannel, IbmCredentials};
pub use client::{
    BackendConfig, BackendProperties, BackendStatus, ClientError, GateProperty, IbmClient,
    NamedValue,
};
pub use sampler::{JobStatus, PubResult, Sampler, SamplerError, SamplerJob, SamplerResult};
pub use service::{snapshot_from_api, IbmRuntimeService, ServiceError};
pub use transpiler::{Transpiler, TranspilerConfig, IBM_BASIS_GATES};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports
    //!
    //! ```rust
    //! use qstash_ibm::prelude::*;
    //! ```

    pub use crate::auth::{IbmChannel, IbmCredentials};
    pub use crate::sampler::{JobStatus, Sampler, SamplerJob, SamplerResult};
    pub use crate::service::IbmRuntimeService;
    pub use crate::transpiler::{Transpiler, TranspilerConfig};
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qstash_calibration::{CalibrationSnapshot, CalibrationSource};
    use qstash_core::CircuitBuilder;
    use qstash_sim::{SimulationMethod, SimulatorBackend, SimulatorOptions};
    use std::sync::Arc;

    fn simulator(snapshot: CalibrationSnapshot, method: SimulationMethod) -> SimulatorBackend {
        SimulatorBackend::from_snapshot(snapshot, method, SimulatorOptions::default().with_seed(3))
            .unwrap()
    }

    #[test]
    fn test_transpile_then_sample_ghz() {
        let snapshot = CalibrationSnapshot::ibm_typical("ibm_test", 3);
        let transpiler = Transpiler::for_snapshot(&snapshot).unwrap();
        let sim = simulator(snapshot, SimulationMethod::DensityMatrix);

        let circuit = CircuitBuilder::new(3).h(0).cx(0, 2).cx(2, 1).measure_all().build();
        let compiled = transpiler.transpile(&circuit).unwrap();
        assert!(compiled
            .gates()
            .iter()
            .all(|g| !g.is_unitary() || IBM_BASIS_GATES.contains(&g.name())));

        let result = Sampler::new(Arc::new(sim))
            .with_shots(2000)
            .run(vec![compiled])
            .wait()
            .unwrap();
        let good = result[0].counts.get("000").copied().unwrap_or(0)
            + result[0].counts.get("111").copied().unwrap_or(0);
        assert!(good > 1600, "ghz fidelity too low: {:?}", result[0].counts);
    }

    #[test]
    fn test_stabilizer_accepts_transpiled_clifford() {
        let snapshot = CalibrationSnapshot::ibm_typical("ibm_test", 3);
        let transpiler = Transpiler::for_snapshot(&snapshot).unwrap();
        let sim = simulator(snapshot, SimulationMethod::Stabilizer);

        let circuit = CircuitBuilder::new(3).h(1).cx(1, 0).cx(1, 2).measure_all().build();
        let compiled = transpiler.transpile(&circuit).unwrap();
        let result = Sampler::new(Arc::new(sim)).run(vec![compiled]).wait().unwrap();
        assert_eq!(result[0].counts.values().sum::<u64>(), 1024);
    }

    #[test]
    fn test_runtime_service_is_calibration_source() {
        let creds = IbmCredentials::new("token", IbmChannel::IbmQuantum);
        let client = IbmClient::with_base_url(creds, "http://127.0.0.1:9").unwrap();
        let service = IbmRuntimeService::with_client(client).unwrap();
        service
            .cache()
            .insert("ibm_cached", CalibrationSnapshot::ibm_typical("ibm_cached", 2));

        let source: &dyn CalibrationSource = &service;
        let snapshot = source.backend_snapshot("ibm_cached").unwrap();
        assert_eq!(snapshot.num_qubits, 2);
    }
}
