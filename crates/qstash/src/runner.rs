//! Artifact runner
//!
//! Gantree: L6_Store → Runner
//!
//! Loads one saved simulator and runs caller circuits on it: transpile
//! against the simulator's target, then sample in the background.

use crate::artifact::ArtifactStore;
use crate::backend_name::IbmBackendName;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use qstash_core::Circuit;
use qstash_ibm::{Sampler, SamplerJob, Transpiler, TranspilerConfig};
use qstash_sim::{SimulationMethod, SimulatorBackend};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Optimization level used for every run
pub const RUN_OPTIMIZATION_LEVEL: u8 = 1;

/// A loaded simulator ready to run circuits
/// Gantree: QuantumSimulator // load -> transpile -> sample
pub struct QuantumSimulator {
    backend: IbmBackendName,
    method: SimulationMethod,
    path: PathBuf,
    simulator: Arc<SimulatorBackend>,
    transpiler: Transpiler,
    sampler: Sampler,
}

impl fmt::Debug for QuantumSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantumSimulator")
            .field("backend", &self.backend)
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

impl QuantumSimulator {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Load the artifact for `backend` and `method` under `base_path`
    ///
    /// The backend is validated before the method; both are checked
    /// before touching the filesystem.
    pub fn new(base_path: impl Into<PathBuf>, backend: &str, method: &str) -> StoreResult<Self> {
        let backend: IbmBackendName = backend.parse()?;
        let method = parse_method(method)?;
        Self::load(ArtifactStore::new(base_path), backend, method)
    }

    /// Load with the default method (`aer_simulator_statevector`)
    pub fn with_default_method(base_path: impl Into<PathBuf>, backend: &str) -> StoreResult<Self> {
        Self::new(base_path, backend, SimulationMethod::default().as_str())
    }

    /// Load from the artifact root configured in the environment
    pub fn from_env(backend: &str, method: &str) -> StoreResult<Self> {
        let config = StoreConfig::from_env()?;
        Self::new(config.base_path, backend, method)
    }

    fn load(
        store: ArtifactStore,
        backend: IbmBackendName,
        method: SimulationMethod,
    ) -> StoreResult<Self> {
        let path = store.artifact_path(backend, method);
        let simulator = Arc::new(store.load_simulator(backend, method)?);
        let target = TranspilerConfig::from_snapshot(simulator.snapshot())
            .with_optimization_level(RUN_OPTIMIZATION_LEVEL);
        let transpiler = Transpiler::new(target).map_err(|e| StoreError::load(&path, e))?;
        let sampler =
            Sampler::new(simulator.clone()).with_shots(simulator.options().default_shots);

        log::info!("Loaded simulator '{}'", path.display());
        Ok(Self {
            backend,
            method,
            path,
            simulator,
            transpiler,
            sampler,
        })
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Compile `circuit` to the simulator's basis gates and coupling map
    pub fn transpile(&self, circuit: &Circuit) -> StoreResult<Circuit> {
        self.transpiler.transpile(circuit).map_err(StoreError::Transpile)
    }

    /// Transpile `circuit` and submit it to the sampler
    pub fn run(&self, circuit: &Circuit) -> StoreResult<SamplerJob> {
        let compiled = self.transpile(circuit)?;
        log::debug!(
            "Running {} gates (depth {}) on {}",
            compiled.gate_count(),
            compiled.depth(),
            self.backend
        );
        Ok(self.sampler.run(vec![compiled]))
    }

    /// Like [`run`](Self::run) with explicit shots
    pub fn run_with_shots(&self, circuit: &Circuit, shots: u64) -> StoreResult<SamplerJob> {
        let compiled = self.transpile(circuit)?;
        Ok(self.sampler.run_with_shots(vec![compiled], shots))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Backend
    pub fn backend(&self) -> IbmBackendName {
        self.backend
    }

    /// Method
    pub fn method(&self) -> SimulationMethod {
        self.method
    }

    /// Loaded simulator
    pub fn simulator(&self) -> &SimulatorBackend {
        &self.simulator
    }

    /// Artifact path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transpiler bound to the simulator's target
    pub fn transpiler(&self) -> &Transpiler {
        &self.transpiler
    }

    /// Valid backend names
    pub fn available_backends() -> Vec<&'static str> {
        IbmBackendName::names()
    }

    /// Valid method names
    pub fn available_methods() -> Vec<&'static str> {
        SimulationMethod::names()
    }
}

fn parse_method(name: &str) -> StoreResult<SimulationMethod> {
    name.parse().map_err(|_| StoreError::UnsupportedMethod {
        name: name.to_string(),
        supported: SimulationMethod::names().join(", "),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::save_all;
    use qstash_calibration::{CalibrationSnapshot, StaticSource};
    use qstash_core::CircuitBuilder;
    use crate::builder::ArtifactBuilder;
    use qstash_ibm::{JobStatus, SamplerError};
    use qstash_sim::SimulatorOptions;
    use tempfile::TempDir;

    fn built_store() -> TempDir {
        let dir = TempDir::new().unwrap();
        let source = StaticSource::new()
            .with_snapshot(CalibrationSnapshot::ibm_typical("ibm_brisbane", 5));
        save_all(&source, dir.path(), false).unwrap();
        dir
    }

    #[test]
    fn test_unknown_backend() {
        let err = QuantumSimulator::new("/nowhere", "ibm_kyiv", "aer_simulator_statevector")
            .unwrap_err();
        assert!(matches!(&err, StoreError::UnsupportedBackend { name, .. } if name == "ibm_kyiv"));
        assert!(err.to_string().contains("ibm_brisbane, ibm_sherbrooke"));
    }

    #[test]
    fn test_unknown_method() {
        let err = QuantumSimulator::new("/nowhere", "ibm_brisbane", "statevector").unwrap_err();
        assert!(matches!(&err, StoreError::UnsupportedMethod { name, .. } if name == "statevector"));
        assert!(err.to_string().contains("aer_simulator_unitary_gpu"));

        // Method validity does not depend on the backend being valid
        let err = QuantumSimulator::new("/nowhere", "ibm_kyiv", "statevector").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let err = QuantumSimulator::new(dir.path(), "ibm_sherbrooke", "aer_simulator_superop")
            .unwrap_err();
        let expected = ArtifactStore::new(dir.path())
            .artifact_path(IbmBackendName::IbmSherbrooke, SimulationMethod::Superop);
        assert!(matches!(err, StoreError::Load { ref path, .. } if *path == expected));
        assert!(err.to_string().contains(&expected.display().to_string()));
    }

    #[test]
    fn test_loads_and_exposes_accessors() {
        let dir = built_store();
        let sim = QuantumSimulator::new(dir.path(), "ibm_brisbane", "aer_simulator_density_matrix")
            .unwrap();
        assert_eq!(sim.backend(), IbmBackendName::IbmBrisbane);
        assert_eq!(sim.method(), SimulationMethod::DensityMatrix);
        assert!(sim.path().ends_with("ibm_brisbane/aer_simulator_density_matrix.json"));
        assert_eq!(sim.simulator().snapshot().num_qubits, 5);
        assert_eq!(sim.transpiler().config().optimization_level, RUN_OPTIMIZATION_LEVEL);
        assert_eq!(QuantumSimulator::available_backends().len(), 2);
        assert_eq!(QuantumSimulator::available_methods().len(), 10);
    }

    #[test]
    fn test_default_method() {
        let dir = built_store();
        let sim = QuantumSimulator::with_default_method(dir.path(), "ibm_brisbane").unwrap();
        assert_eq!(sim.method(), SimulationMethod::Statevector);
    }

    #[test]
    fn test_transpile_targets_native_gates() {
        let dir = built_store();
        let sim = QuantumSimulator::new(dir.path(), "ibm_brisbane", "aer_simulator_stabilizer")
            .unwrap();
        let circuit = CircuitBuilder::new(3).h(0).cx(0, 2).measure_all().build();
        let compiled = sim.transpile(&circuit).unwrap();
        let basis = sim.simulator().basis_gates();
        assert!(compiled
            .gates()
            .iter()
            .filter(|g| g.is_unitary())
            .all(|g| basis.iter().any(|b| b == g.name())));
        assert_eq!(compiled.num_clbits(), 3);
    }

    #[test]
    fn test_run_bell() {
        let dir = built_store();
        let sim = QuantumSimulator::new(dir.path(), "ibm_brisbane", "aer_simulator_statevector")
            .unwrap();
        let bell = CircuitBuilder::new(2).h(0).cx(0, 1).measure_all().build();

        let job = sim.run(&bell).unwrap();
        let result = job.wait().unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(result[0].shots, 1024);
        let correlated = result[0].counts.get("00").copied().unwrap_or(0)
            + result[0].counts.get("11").copied().unwrap_or(0);
        assert!(correlated > 900, "{:?}", result[0].counts);
    }

    #[test]
    fn test_run_uses_stored_default_shots() {
        let dir = TempDir::new().unwrap();
        let source = StaticSource::new()
            .with_snapshot(CalibrationSnapshot::ibm_typical("ibm_brisbane", 3));
        ArtifactBuilder::new(&source, dir.path())
            .with_options(SimulatorOptions::default().with_default_shots(100))
            .build_all()
            .unwrap();

        let sim = QuantumSimulator::new(dir.path(), "ibm_brisbane", "aer_simulator_statevector")
            .unwrap();
        assert_eq!(sim.simulator().options().default_shots, 100);

        let circuit = CircuitBuilder::new(1).h(0).measure_all().build();
        let result = sim.run(&circuit).unwrap().wait().unwrap();
        assert_eq!(result[0].shots, 100);
        assert_eq!(result[0].counts.values().sum::<u64>(), 100);

        let result = sim.run_with_shots(&circuit, 40).unwrap().wait().unwrap();
        assert_eq!(result[0].shots, 40);
    }

    #[test]
    fn test_run_on_unitary_reports_method() {
        let dir = built_store();
        let sim = QuantumSimulator::new(dir.path(), "ibm_brisbane", "aer_simulator_unitary").unwrap();
        let circuit = CircuitBuilder::new(1).h(0).measure_all().build();
        let err = sim.run_with_shots(&circuit, 10).unwrap().wait().unwrap_err();
        assert!(matches!(err, SamplerError::Execution { index: 0, .. }));
        assert!(err.to_string().contains("aer_simulator_unitary"));
    }

    #[test]
    fn test_too_wide_circuit_fails_transpile() {
        let dir = built_store();
        let sim = QuantumSimulator::new(dir.path(), "ibm_brisbane", "aer_simulator_statevector")
            .unwrap();
        let circuit = CircuitBuilder::new(6).h(5).build();
        assert!(matches!(sim.run(&circuit), Err(StoreError::Transpile(_))));
    }
}
