//! Calibrated simulator backend
//!
//! Gantree: L4_Simulation → SimulatorBackend
//!
//! A simulator mirroring one device calibration with one simulation
//! method. Only the qubits a circuit touches are simulated.

use crate::engine::density_matrix::DensityMatrix;
use crate::engine::stabilizer::Tableau;
use crate::engine::statevector::StateVector;
use crate::engine::{sample_counts, unsupported, zero_counts};
use crate::execution::{Backend, ExecutionMetadata, ExecutionResult};
use crate::method::{Device, Representation, SimulationMethod};
use crate::program::Program;
use qstash_calibration::CalibrationSnapshot;
use qstash_core::{Circuit, Counts, QstashError, QstashResult};
use qstash_noise::NoiseModel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Default shots when the caller does not choose
pub const DEFAULT_SHOTS: u64 = 1024;

/// Run options stored with a simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorOptions {
    /// Shots used when the caller does not choose
    pub default_shots: u64,

    /// Seed for reproducible sampling
    pub seed: Option<u64>,
}

impl SimulatorOptions {
    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the default shots
    pub fn with_default_shots(mut self, shots: u64) -> Self {
        self.default_shots = shots;
        self
    }
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            default_shots: DEFAULT_SHOTS,
            seed: None,
        }
    }
}

/// Noise-aware simulator built from a calibration snapshot
/// Gantree: SimulatorBackend // calibrated simulator
#[derive(Debug, Clone)]
pub struct SimulatorBackend {
    name: String,
    method: SimulationMethod,
    calibration: CalibrationSnapshot,
    noise_model: NoiseModel,
    options: SimulatorOptions,
}

impl SimulatorBackend {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Build a simulator mirroring `calibration`
    /// Gantree: from_snapshot(snapshot, method, options) -> Result<Self>
    pub fn from_snapshot(
        calibration: CalibrationSnapshot,
        method: SimulationMethod,
        options: SimulatorOptions,
    ) -> QstashResult<Self> {
        calibration.validate()?;
        if method.device() == Device::Gpu {
            log::warn!(
                "{} requested for {}: no GPU engine, running on the host",
                method,
                calibration.backend_name
            );
        }
        let noise_model = calibration.to_noise_model();
        log::debug!("{} noise: {}", calibration.backend_name, noise_model);

        Ok(Self {
            name: format!("aer_simulator_from({})", calibration.backend_name),
            method,
            calibration,
            noise_model,
            options,
        })
    }

    /// Noiseless all-to-all simulator (tests and examples)
    pub fn ideal(num_qubits: usize, method: SimulationMethod) -> Self {
        let mut calibration = CalibrationSnapshot::new("ideal", num_qubits);
        calibration.basis_gates = ["cx", "id", "rz", "sx", "x"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            name: "aer_simulator".to_string(),
            method,
            calibration,
            noise_model: NoiseModel::ideal(),
            options: SimulatorOptions::default(),
        }
    }

    /// Set the sampling seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Simulation method
    pub fn method(&self) -> SimulationMethod {
        self.method
    }

    /// Representation of the simulated state
    pub fn representation(&self) -> Representation {
        self.method.representation()
    }

    /// Requested device class
    pub fn device(&self) -> Device {
        self.method.device()
    }

    /// Calibration mirrored by the simulator
    pub fn snapshot(&self) -> &CalibrationSnapshot {
        &self.calibration
    }

    /// Device noise model
    pub fn noise_model(&self) -> &NoiseModel {
        &self.noise_model
    }

    /// Run options
    pub fn options(&self) -> &SimulatorOptions {
        &self.options
    }

    /// Native gate names
    pub fn basis_gates(&self) -> &[String] {
        &self.calibration.basis_gates
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    /// Run with the default shot count
    pub fn run(&self, circuit: &Circuit) -> QstashResult<ExecutionResult> {
        self.execute(circuit, self.options.default_shots)
    }

    fn check_width(&self, program: &Program, representation: Representation) -> QstashResult<()> {
        match representation.max_qubits() {
            Some(max) if program.num_qubits() > max => Err(QstashError::TooManyQubits {
                qubits: program.num_qubits(),
                max,
                method: self.method.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn simulate(&self, program: &Program, shots: u64, rng: &mut StdRng) -> QstashResult<Counts> {
        let n = program.num_qubits();
        let method = self.method.as_str();
        let representation = self.representation();

        match representation {
            Representation::Unitary | Representation::Superop => {
                if let Some(instruction) = program.first_non_unitary() {
                    return Err(unsupported(instruction, method));
                }
                self.check_width(program, representation)?;
                Ok(zero_counts(program.num_clbits, shots))
            }
            Representation::Stabilizer => {
                if let Some(gate) = program.first_non_clifford() {
                    return Err(unsupported(gate.name(), method));
                }
                sample_counts(program, shots, rng, || Tableau::new(n))
            }
            Representation::ExtendedStabilizer => {
                if program.first_non_clifford().is_none() {
                    sample_counts(program, shots, rng, || Tableau::new(n))
                } else {
                    self.check_width(program, Representation::Statevector)?;
                    sample_counts(program, shots, rng, || StateVector::new(n))
                }
            }
            Representation::Statevector | Representation::MatrixProductState => {
                self.check_width(program, representation)?;
                sample_counts(program, shots, rng, || StateVector::new(n))
            }
            Representation::DensityMatrix => {
                self.check_width(program, representation)?;
                sample_counts(program, shots, rng, || DensityMatrix::new(n))
            }
        }
    }
}

impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_qubits(&self) -> usize {
        self.calibration.num_qubits
    }

    fn execute(&self, circuit: &Circuit, shots: u64) -> QstashResult<ExecutionResult> {
        let max_shots = self.max_shots();
        if shots == 0 || shots > max_shots {
            return Err(QstashError::ShotsOutOfRange(shots, 1, max_shots));
        }
        if circuit.num_qubits() > self.num_qubits() {
            return Err(QstashError::CircuitTooWide {
                required: circuit.num_qubits(),
                available: self.num_qubits(),
            });
        }

        let started = Instant::now();
        let program = Program::compile(circuit, &self.noise_model);
        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let counts = self.simulate(&program, shots, &mut rng)?;

        log::debug!(
            "{} ran {} shots on {} active qubits",
            self.name,
            shots,
            program.num_qubits()
        );

        Ok(ExecutionResult {
            counts,
            shots,
            metadata: ExecutionMetadata {
                backend: self.name.clone(),
                method: Some(self.method),
                active_qubits: program.num_qubits(),
                execution_time_ms: Some(started.elapsed().as_millis() as u64),
                seed: self.options.seed,
            },
        })
    }

    fn calibration(&self) -> Option<&CalibrationSnapshot> {
        Some(&self.calibration)
    }
}

impl fmt::Display for SimulatorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimulatorBackend({}, {}, {}Q)",
            self.name, self.method, self.calibration.num_qubits
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qstash_core::CircuitBuilder;

    fn noisy(method: SimulationMethod) -> SimulatorBackend {
        let snapshot = CalibrationSnapshot::uniform("ibm_test", 5, 100.0, 80.0, 0.002, 0.02, 0.03);
        SimulatorBackend::from_snapshot(snapshot, method, SimulatorOptions::default().with_seed(42))
            .unwrap()
    }

    fn bell() -> Circuit {
        CircuitBuilder::with_clbits(2, 2)
            .h(0)
            .cx(0, 1)
            .measure(0, 0)
            .measure(1, 1)
            .build()
    }

    #[test]
    fn test_ideal_bell_counts() {
        for method in [
            SimulationMethod::Statevector,
            SimulationMethod::DensityMatrix,
            SimulationMethod::Stabilizer,
            SimulationMethod::MatrixProductState,
            SimulationMethod::ExtendedStabilizer,
            SimulationMethod::StatevectorGpu,
        ] {
            let sim = SimulatorBackend::ideal(2, method).with_seed(1);
            let result = sim.execute(&bell(), 2000).unwrap();
            assert_eq!(result.total_counts(), 2000);
            let correlated = result.counts.get("00").copied().unwrap_or(0)
                + result.counts.get("11").copied().unwrap_or(0);
            assert_eq!(correlated, 2000, "{}", method);
            assert!(result.probability("11") > 0.4, "{}", method);
        }
    }

    #[test]
    fn test_noisy_methods_produce_errors() {
        for method in [
            SimulationMethod::Statevector,
            SimulationMethod::DensityMatrix,
            SimulationMethod::Stabilizer,
        ] {
            let result = noisy(method).execute(&bell(), 4000).unwrap();
            let errors = result.counts.get("01").copied().unwrap_or(0)
                + result.counts.get("10").copied().unwrap_or(0);
            assert!(errors > 0, "{}", method);
            assert!(errors < 1000, "{}", method);
        }
    }

    #[test]
    fn test_seed_makes_runs_reproducible() {
        let sim = noisy(SimulationMethod::Statevector);
        let a = sim.execute(&bell(), 500).unwrap();
        let b = sim.execute(&bell(), 500).unwrap();
        assert_eq!(a.counts, b.counts);
    }

    #[test]
    fn test_idle_qubits_are_truncated() {
        let sim = SimulatorBackend::ideal(127, SimulationMethod::Statevector).with_seed(3);
        let circuit = CircuitBuilder::with_clbits(127, 1)
            .x(100)
            .measure(100, 0)
            .build();
        let result = sim.execute(&circuit, 10).unwrap();
        assert_eq!(result.metadata.active_qubits, 1);
        assert_eq!(result.counts.get("1"), Some(&10));
    }

    #[test]
    fn test_stabilizer_rejects_non_clifford() {
        let sim = SimulatorBackend::ideal(1, SimulationMethod::Stabilizer);
        let circuit = CircuitBuilder::new(1).t(0).measure_all().build();
        let err = sim.execute(&circuit, 10).unwrap_err();
        assert!(matches!(err, QstashError::UnsupportedInstruction { .. }));
        assert!(err.to_string().contains("aer_simulator_stabilizer"));
    }

    #[test]
    fn test_extended_stabilizer_falls_back() {
        let sim = SimulatorBackend::ideal(1, SimulationMethod::ExtendedStabilizer).with_seed(2);
        let circuit = CircuitBuilder::new(1).t(0).x(0).measure_all().build();
        let result = sim.execute(&circuit, 10).unwrap();
        assert_eq!(result.counts.get("1"), Some(&10));
    }

    #[test]
    fn test_unitary_rejects_measurement() {
        for method in [
            SimulationMethod::Unitary,
            SimulationMethod::Superop,
            SimulationMethod::UnitaryGpu,
        ] {
            let sim = SimulatorBackend::ideal(2, method);
            let err = sim.execute(&bell(), 10).unwrap_err();
            assert_eq!(
                err,
                QstashError::UnsupportedInstruction {
                    instruction: "measure".to_string(),
                    method: method.to_string(),
                }
            );
        }
        let sim = SimulatorBackend::ideal(2, SimulationMethod::Unitary);
        let circuit = CircuitBuilder::new(2).h(0).cx(0, 1).build();
        assert_eq!(sim.execute(&circuit, 10).unwrap().counts.get("00"), Some(&10));
    }

    #[test]
    fn test_width_limit() {
        let sim = SimulatorBackend::ideal(13, SimulationMethod::DensityMatrix);
        let mut builder = CircuitBuilder::new(13);
        for q in 0..13 {
            builder = builder.h(q);
        }
        let err = sim.execute(&builder.build(), 1).unwrap_err();
        assert!(matches!(err, QstashError::TooManyQubits { qubits: 13, max: 12, .. }));
    }

    #[test]
    fn test_shot_and_width_validation() {
        let sim = SimulatorBackend::ideal(2, SimulationMethod::Statevector);
        assert!(matches!(
            sim.execute(&bell(), 0),
            Err(QstashError::ShotsOutOfRange(0, 1, _))
        ));
        let wide = CircuitBuilder::new(3).h(2).build();
        assert!(matches!(
            sim.execute(&wide, 1),
            Err(QstashError::CircuitTooWide { required: 3, available: 2 })
        ));
    }

    #[test]
    fn test_readout_error_only_affects_measured_bits() {
        let mut snapshot = CalibrationSnapshot::new("ro", 2);
        snapshot.qubits[1].readout_error = Some(1.0);
        let sim = SimulatorBackend::from_snapshot(
            snapshot,
            SimulationMethod::Statevector,
            SimulatorOptions::default().with_seed(0),
        )
        .unwrap();
        let circuit = CircuitBuilder::with_clbits(2, 2).measure(1, 1).build();
        let result = sim.execute(&circuit, 20).unwrap();
        assert_eq!(result.counts.get("10"), Some(&20));
    }

    #[test]
    fn test_invalid_snapshot_is_rejected() {
        let snapshot = CalibrationSnapshot::new("empty", 0);
        assert!(SimulatorBackend::from_snapshot(
            snapshot,
            SimulationMethod::Statevector,
            SimulatorOptions::default()
        )
        .is_err());
    }
}
