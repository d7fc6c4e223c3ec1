//! Calibration snapshot of a quantum backend
//!
//! Gantree: L3_Calibration → CalibrationSnapshot
//!
//! Everything a simulator needs to mimic a device: qubit count, native
//! gates, coupling map, coherence times, gate and readout errors, and
//! gate durations. This is the payload persisted inside artifacts.

use chrono::{DateTime, Utc};
use qstash_core::{QstashError, QstashResult, QubitId, Topology};
use qstash_noise::noise_model::{DEFAULT_GATE_TIME_1Q_NS, DEFAULT_GATE_TIME_2Q_NS};
use qstash_noise::{NoiseModel, QubitNoise};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calibration of a single qubit
///
/// Missing values mean the backend did not report them; the qubit is
/// then noiseless in that respect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QubitCalibration {
    /// T1 relaxation time (µs)
    pub t1_us: Option<f64>,

    /// T2 dephasing time (µs)
    pub t2_us: Option<f64>,

    /// Readout assignment error
    pub readout_error: Option<f64>,

    /// Error of the physical single-qubit gate (`sx`)
    pub gate_error_1q: Option<f64>,

    /// Duration of the physical single-qubit gate (ns)
    pub gate_time_1q_ns: Option<f64>,
}

/// Calibration of a native two-qubit gate on one coupling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoQubitCalibration {
    /// Qubits as reported (direction preserved)
    pub qubits: (QubitId, QubitId),

    /// Gate name (`ecr`, `cx`, `cz`)
    pub gate: String,

    /// Gate error
    pub error: f64,

    /// Gate duration (ns)
    pub duration_ns: Option<f64>,
}

/// Calibration data of one backend at one point in time
/// Gantree: CalibrationSnapshot // device snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSnapshot {
    /// Backend name
    pub backend_name: String,

    /// Number of physical qubits
    pub num_qubits: usize,

    /// Native gate names as reported by the backend configuration
    pub basis_gates: Vec<String>,

    /// Directed coupling map
    pub coupling_map: Vec<(QubitId, QubitId)>,

    /// Per-qubit calibration, indexed by qubit
    pub qubits: Vec<QubitCalibration>,

    /// Per-coupling two-qubit gate calibration
    pub gates_2q: Vec<TwoQubitCalibration>,

    /// Backend-reported calibration date
    pub last_update: Option<DateTime<Utc>>,

    /// When the snapshot was taken
    pub fetched_at: DateTime<Utc>,
}

impl CalibrationSnapshot {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create an uncalibrated snapshot
    pub fn new(backend_name: &str, num_qubits: usize) -> Self {
        Self {
            backend_name: backend_name.to_string(),
            num_qubits,
            basis_gates: Vec::new(),
            coupling_map: Vec::new(),
            qubits: vec![QubitCalibration::default(); num_qubits],
            gates_2q: Vec::new(),
            last_update: None,
            fetched_at: Utc::now(),
        }
    }

    /// Uniform linear-chain device with an ECR basis (tests and demos)
    pub fn uniform(
        backend_name: &str,
        num_qubits: usize,
        t1_us: f64,
        t2_us: f64,
        error_1q: f64,
        error_2q: f64,
        readout_error: f64,
    ) -> Self {
        let mut snapshot = Self::new(backend_name, num_qubits);
        snapshot.basis_gates = ["ecr", "id", "rz", "sx", "x"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for q in snapshot.qubits.iter_mut() {
            *q = QubitCalibration {
                t1_us: Some(t1_us),
                t2_us: Some(t2_us),
                readout_error: Some(readout_error),
                gate_error_1q: Some(error_1q),
                gate_time_1q_ns: Some(DEFAULT_GATE_TIME_1Q_NS),
            };
        }

        for q in 0..num_qubits.saturating_sub(1) {
            snapshot.coupling_map.push((q, q + 1));
            snapshot.coupling_map.push((q + 1, q));
            snapshot.gates_2q.push(TwoQubitCalibration {
                qubits: (q, q + 1),
                gate: "ecr".to_string(),
                error: error_2q,
                duration_ns: Some(DEFAULT_GATE_TIME_2Q_NS),
            });
        }

        snapshot
    }

    /// Eagle-like typical values (tests and demos)
    pub fn ibm_typical(backend_name: &str, num_qubits: usize) -> Self {
        Self::uniform(backend_name, num_qubits, 250.0, 150.0, 2.5e-4, 8e-3, 1.5e-2)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check internal consistency
    /// Gantree: validate(&self) -> Result // consistency
    pub fn validate(&self) -> QstashResult<()> {
        if self.num_qubits == 0 {
            return Err(QstashError::CalibrationError(format!(
                "backend '{}' reports no qubits",
                self.backend_name
            )));
        }
        if self.qubits.len() != self.num_qubits {
            return Err(QstashError::CalibrationError(format!(
                "{} qubit records for {} qubits",
                self.qubits.len(),
                self.num_qubits
            )));
        }
        let max = self.num_qubits - 1;
        let pairs = self
            .coupling_map
            .iter()
            .chain(self.gates_2q.iter().map(|g| &g.qubits));
        for &(a, b) in pairs {
            for q in [a, b] {
                if q > max {
                    return Err(QstashError::QubitOutOfRange { qubit: q, max });
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Target
    // ========================================================================

    /// Native two-qubit gate name (`ecr` preferred, then `cx`, then `cz`)
    pub fn two_qubit_gate(&self) -> Option<&str> {
        ["ecr", "cx", "cz"]
            .into_iter()
            .find(|g| self.basis_gates.iter().any(|b| b == g))
    }

    /// Check whether `gate` is native on this backend
    pub fn supports_gate(&self, gate: &str) -> bool {
        self.basis_gates.iter().any(|b| b == gate)
    }

    // ========================================================================
    // Averages
    // ========================================================================

    /// Average T1 over reporting qubits (µs)
    pub fn avg_t1(&self) -> Option<f64> {
        mean(self.qubits.iter().filter_map(|q| q.t1_us))
    }

    /// Average T2 over reporting qubits (µs)
    pub fn avg_t2(&self) -> Option<f64> {
        mean(self.qubits.iter().filter_map(|q| q.t2_us))
    }

    /// Average single-qubit gate error
    pub fn avg_error_1q(&self) -> Option<f64> {
        mean(self.qubits.iter().filter_map(|q| q.gate_error_1q))
    }

    /// Average two-qubit gate error
    pub fn avg_error_2q(&self) -> Option<f64> {
        mean(self.gates_2q.iter().map(|g| g.error))
    }

    /// Average readout error
    pub fn avg_readout(&self) -> Option<f64> {
        mean(self.qubits.iter().filter_map(|q| q.readout_error))
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Convert to a device noise model
    /// Gantree: to_noise_model(&self) -> NoiseModel // noise conversion
    pub fn to_noise_model(&self) -> NoiseModel {
        let mut model = NoiseModel::ideal();

        for (q, cal) in self.qubits.iter().enumerate() {
            let noise = QubitNoise::from_calibration(
                cal.t1_us.unwrap_or(f64::INFINITY),
                cal.t2_us.unwrap_or(f64::INFINITY),
                cal.gate_error_1q.unwrap_or(0.0),
                cal.readout_error.unwrap_or(0.0),
            )
            .with_gate_time(cal.gate_time_1q_ns.unwrap_or(DEFAULT_GATE_TIME_1Q_NS));
            model = model.with_qubit(q, noise);
        }

        for gate in &self.gates_2q {
            let (a, b) = gate.qubits;
            let duration = gate.duration_ns.unwrap_or(DEFAULT_GATE_TIME_2Q_NS);
            // Both directions may be reported; keep the worse one
            let error = match model.edge(a, b) {
                Some(existing) => existing.gate_error.max(gate.error),
                None => gate.error,
            };
            model = model.with_edge(a, b, error, duration);
        }

        model
    }

    /// Convert to topology
    /// Gantree: to_topology(&self) -> Result<Topology> // topology conversion
    pub fn to_topology(&self) -> QstashResult<Topology> {
        if self.coupling_map.is_empty() && self.num_qubits > 1 {
            // Simulator-style backends report no coupling map
            return Ok(all_to_all(self.num_qubits).with_name(self.backend_name.clone()));
        }
        Ok(Topology::from_coupling_map(self.coupling_map.clone(), self.num_qubits)?
            .with_name(self.backend_name.clone()))
    }
}

impl fmt::Display for CalibrationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationSnapshot({}, {}Q, T1={:.0}μs, T2={:.0}μs, 1Q={:.2e}, 2Q={:.2e}, RO={:.2e})",
            self.backend_name,
            self.num_qubits,
            self.avg_t1().unwrap_or(f64::NAN),
            self.avg_t2().unwrap_or(f64::NAN),
            self.avg_error_1q().unwrap_or(0.0),
            self.avg_error_2q().unwrap_or(0.0),
            self.avg_readout().unwrap_or(0.0)
        )
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn all_to_all(n: usize) -> Topology {
    let pairs = (0..n)
        .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
        .collect();
    // Pairs are in range and distinct by construction
    Topology::from_coupling_map(pairs, n).unwrap_or_else(|_| Topology::linear(n))
}

// ============================================================================
// Tests
// ============================================================================
