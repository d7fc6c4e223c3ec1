//! Noise model for qstash
//!
//! Gantree: L2_Noise → NoiseModel
//!
//! Per-qubit device noise: depolarizing gate errors, thermal relaxation
//! over gate durations, and readout errors. Reported gate errors are
//! treated as average gate infidelities; the share explained by
//! relaxation is removed before the depolarizing part is derived.

use crate::channel::{NoiseOp, Relaxation};
use qstash_core::{Gate, Probability, QstashError, QstashResult, QubitId};
use std::collections::BTreeMap;
use std::fmt;

/// Default single-qubit gate duration (ns) when calibration has none
pub const DEFAULT_GATE_TIME_1Q_NS: f64 = 35.5;

/// Default two-qubit gate duration (ns) when calibration has none
pub const DEFAULT_GATE_TIME_2Q_NS: f64 = 660.0;

/// Noise parameters of one qubit
/// Gantree: QubitNoise // per-qubit noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QubitNoise {
    /// T1 relaxation time (µs)
    pub t1_us: f64,

    /// T2 dephasing time (µs)
    pub t2_us: f64,

    /// Average infidelity of a physical single-qubit gate
    pub gate_error_1q: f64,

    /// Probability of reading the wrong bit
    pub readout_error: f64,

    /// Duration of a physical single-qubit gate (ns)
    pub gate_time_1q_ns: f64,
}

impl QubitNoise {
    /// Create with validation
    pub fn new(t1_us: f64, t2_us: f64, gate_error_1q: f64, readout_error: f64) -> QstashResult<Self> {
        if t1_us <= 0.0 || t2_us <= 0.0 {
            return Err(QstashError::CalibrationError(format!(
                "T1/T2 must be positive: T1={}, T2={}",
                t1_us, t2_us
            )));
        }
        if t1_us.is_finite() && t2_us > 2.0 * t1_us {
            return Err(QstashError::InvalidT2 { t2_us, t1_us });
        }
        Probability::new(gate_error_1q)?;
        Probability::new(readout_error)?;

        Ok(Self {
            t1_us,
            t2_us,
            gate_error_1q,
            readout_error,
            gate_time_1q_ns: DEFAULT_GATE_TIME_1Q_NS,
        })
    }

    /// Create from raw calibration values, repairing what is unphysical
    ///
    /// Non-positive or missing coherence times become infinite, T2 is
    /// clamped to 2·T1 and probabilities are clamped into [0, 1].
    pub fn from_calibration(t1_us: f64, t2_us: f64, gate_error_1q: f64, readout_error: f64) -> Self {
        let sanitize = |t: f64| if t.is_finite() && t > 0.0 { t } else { f64::INFINITY };
        let t1_us = sanitize(t1_us);
        let t2_us = sanitize(t2_us).min(2.0 * t1_us);

        Self {
            t1_us,
            t2_us,
            gate_error_1q: Probability::clamped(gate_error_1q).value(),
            readout_error: Probability::clamped(readout_error).value(),
            gate_time_1q_ns: DEFAULT_GATE_TIME_1Q_NS,
        }
    }

    /// Noiseless qubit
    pub fn ideal() -> Self {
        Self {
            t1_us: f64::INFINITY,
            t2_us: f64::INFINITY,
            gate_error_1q: 0.0,
            readout_error: 0.0,
            gate_time_1q_ns: 0.0,
        }
    }

    /// Set the single-qubit gate duration
    pub fn with_gate_time(mut self, gate_time_1q_ns: f64) -> Self {
        self.gate_time_1q_ns = gate_time_1q_ns.max(0.0);
        self
    }

    /// Relaxation over `duration_ns`
    pub fn relaxation(&self, duration_ns: f64) -> Relaxation {
        Relaxation::new(self.t1_us, self.t2_us, duration_ns)
    }
}

/// Two-qubit gate noise on one coupling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeNoise {
    /// Average infidelity of the native two-qubit gate
    pub gate_error: f64,

    /// Duration of the native two-qubit gate (ns)
    pub gate_time_ns: f64,
}

/// Device noise model
/// Gantree: NoiseModel // device noise
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoiseModel {
    /// Per-qubit parameters; missing qubits are ideal
    qubits: BTreeMap<QubitId, QubitNoise>,

    /// Per-coupling parameters keyed by (min, max)
    edges: BTreeMap<(QubitId, QubitId), EdgeNoise>,
}

impl NoiseModel {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create ideal (noiseless) model
    pub fn ideal() -> Self {
        Self::default()
    }

    /// Uniform model on a linear chain (for tests and examples)
    pub fn uniform(
        num_qubits: usize,
        t1_us: f64,
        t2_us: f64,
        error_1q: f64,
        error_2q: f64,
        readout_error: f64,
    ) -> QstashResult<Self> {
        let mut model = Self::ideal();
        for q in 0..num_qubits {
            model = model.with_qubit(q, QubitNoise::new(t1_us, t2_us, error_1q, readout_error)?);
        }
        for q in 0..num_qubits.saturating_sub(1) {
            model = model.with_edge(q, q + 1, error_2q, DEFAULT_GATE_TIME_2Q_NS);
        }
        Ok(model)
    }

    // ========================================================================
    // Builder Methods
    // ========================================================================

    /// Set the noise of one qubit
    pub fn with_qubit(mut self, qubit: QubitId, noise: QubitNoise) -> Self {
        self.qubits.insert(qubit, noise);
        self
    }

    /// Set the two-qubit gate noise of one coupling (either direction)
    pub fn with_edge(mut self, a: QubitId, b: QubitId, gate_error: f64, gate_time_ns: f64) -> Self {
        self.edges.insert(
            edge_key(a, b),
            EdgeNoise {
                gate_error: Probability::clamped(gate_error).value(),
                gate_time_ns: gate_time_ns.max(0.0),
            },
        );
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Check whether the model adds no noise at all
    pub fn is_ideal(&self) -> bool {
        self.qubits.values().all(is_noiseless)
            && self.edges.values().all(|e| e.gate_error == 0.0)
    }

    /// Noise of one qubit (ideal when uncalibrated)
    pub fn qubit(&self, qubit: QubitId) -> QubitNoise {
        self.qubits.get(&qubit).copied().unwrap_or_else(QubitNoise::ideal)
    }

    /// Noise of one coupling, if calibrated
    pub fn edge(&self, a: QubitId, b: QubitId) -> Option<EdgeNoise> {
        self.edges.get(&edge_key(a, b)).copied()
    }

    /// Readout error of one qubit
    pub fn readout_error(&self, qubit: QubitId) -> f64 {
        self.qubit(qubit).readout_error
    }

    /// Number of calibrated qubits
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    // ========================================================================
    // Gate Noise
    // ========================================================================

    /// Noise events that follow `gate` on physical qubits
    ///
    /// Virtual gates (`rz`, `p`), barriers, resets and three-qubit gates
    /// carry no noise. Measurement noise is the readout error.
    /// Gantree: ops_for(&self, Gate) -> Vec<NoiseOp> // gate noise
    pub fn ops_for(&self, gate: &Gate) -> Vec<NoiseOp> {
        match gate {
            Gate::Rz(..) | Gate::P(..) => Vec::new(),
            g if g.is_single_qubit() => {
                let q = g.qubits()[0];
                let noise = self.qubit(q);
                let relax = noise.relaxation(noise.gate_time_1q_ns);
                let mut ops = Vec::with_capacity(2);
                if !matches!(g, Gate::Id(_)) {
                    let p = depolarizing_probability(noise.gate_error_1q, relax.infidelity(), 2);
                    if p > 0.0 {
                        ops.push(NoiseOp::Depolarizing1 { qubit: q, p });
                    }
                }
                if !relax.is_identity() {
                    ops.push(NoiseOp::Relax {
                        qubit: q,
                        channel: relax,
                    });
                }
                ops
            }
            g if g.is_two_qubit() => {
                let qs = g.qubits();
                let (a, b) = (qs[0], qs[1]);
                let Some(edge) = self.edge(a, b) else {
                    return Vec::new();
                };
                let relax_a = self.qubit(a).relaxation(edge.gate_time_ns);
                let relax_b = self.qubit(b).relaxation(edge.gate_time_ns);
                let relax_infidelity = relax_a.infidelity() + relax_b.infidelity();

                let mut ops = Vec::with_capacity(3);
                let p = depolarizing_probability(edge.gate_error, relax_infidelity, 4);
                if p > 0.0 {
                    ops.push(NoiseOp::Depolarizing2 { qubits: (a, b), p });
                }
                for (q, relax) in [(a, relax_a), (b, relax_b)] {
                    if !relax.is_identity() {
                        ops.push(NoiseOp::Relax { qubit: q, channel: relax });
                    }
                }
                ops
            }
            _ => Vec::new(),
        }
    }

    // ========================================================================
    // Summary
    // ========================================================================

    /// Mean readout error over calibrated qubits
    pub fn avg_readout_error(&self) -> f64 {
        mean(self.qubits.values().map(|q| q.readout_error))
    }

    /// Mean two-qubit gate error over calibrated couplings
    pub fn avg_gate_error_2q(&self) -> f64 {
        mean(self.edges.values().map(|e| e.gate_error))
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NoiseModel({} qubits, {} couplings, 2Q={:.4}, RO={:.4})",
            self.qubits.len(),
            self.edges.len(),
            self.avg_gate_error_2q(),
            self.avg_readout_error()
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn edge_key(a: QubitId, b: QubitId) -> (QubitId, QubitId) {
    (a.min(b), a.max(b))
}

fn is_noiseless(q: &QubitNoise) -> bool {
    q.gate_error_1q == 0.0
        && q.readout_error == 0.0
        && q.relaxation(q.gate_time_1q_ns).is_identity()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Probability of a non-identity Pauli for a depolarizing channel on a
/// `dim`-dimensional system whose infidelity is `gate_error` minus the
/// relaxation share
pub fn depolarizing_probability(gate_error: f64, relax_infidelity: f64, dim: usize) -> f64 {
    let d = dim as f64;
    let infidelity = (gate_error - relax_infidelity).max(0.0);
    // Depolarizing parameter λ has infidelity λ(d-1)/d and Pauli weight λ(d²-1)/d²
    (infidelity * (d + 1.0) / d).min(1.0)
}

// ============================================================================
// Tests
// ============================================================================
