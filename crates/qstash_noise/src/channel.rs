//! Noise channels
//!
//! Gantree: L2_Noise → Channels
//!
//! Channels attached to gates by the noise model. Engines decide how to
//! apply them: trajectories sample them, the density matrix applies them
//! exactly.

use qstash_core::QubitId;
use serde::{Deserialize, Serialize};

/// Single-qubit Pauli operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Identity
    I,
    /// Bit flip
    X,
    /// Bit and phase flip
    Y,
    /// Phase flip
    Z,
}

impl Pauli {
    /// The three non-identity Paulis
    pub const NON_IDENTITY: [Pauli; 3] = [Pauli::X, Pauli::Y, Pauli::Z];

    /// Pauli from a 2-bit index (0 = I, 1 = X, 2 = Y, 3 = Z)
    pub fn from_index(index: usize) -> Pauli {
        match index & 3 {
            0 => Pauli::I,
            1 => Pauli::X,
            2 => Pauli::Y,
            _ => Pauli::Z,
        }
    }

    /// Two-qubit Pauli pair for index 1..=15 (index 0 is I⊗I)
    pub fn pair(index: usize) -> (Pauli, Pauli) {
        (Pauli::from_index(index & 3), Pauli::from_index(index >> 2))
    }
}

/// Thermal relaxation over one gate duration
///
/// Bloch-vector picture: transverse components scale by `coherence`,
/// the population of |1⟩ decays by `gamma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relaxation {
    /// Amplitude damping probability 1 - exp(-t/T1)
    pub gamma: f64,

    /// Transverse decay exp(-t/T2)
    pub coherence: f64,
}

impl Relaxation {
    /// Relaxation for `duration_ns` on a qubit with `t1_us`/`t2_us`
    ///
    /// Infinite times yield the identity channel. T2 is clamped to 2·T1.
    pub fn new(t1_us: f64, t2_us: f64, duration_ns: f64) -> Self {
        if duration_ns <= 0.0 {
            return Self::identity();
        }
        let t_us = duration_ns * 1e-3;
        let t2_us = if t1_us.is_finite() { t2_us.min(2.0 * t1_us) } else { t2_us };

        let gamma = if t1_us.is_finite() && t1_us > 0.0 {
            1.0 - (-t_us / t1_us).exp()
        } else {
            0.0
        };
        let coherence = if t2_us.is_finite() && t2_us > 0.0 {
            (-t_us / t2_us).exp()
        } else {
            1.0
        };
        Self { gamma, coherence }
    }

    /// No relaxation
    pub fn identity() -> Self {
        Self {
            gamma: 0.0,
            coherence: 1.0,
        }
    }

    /// Check whether the channel is the identity
    pub fn is_identity(&self) -> bool {
        self.gamma == 0.0 && self.coherence == 1.0
    }

    /// Probability of a Z flip applied after amplitude damping
    ///
    /// Amplitude damping alone scales coherences by sqrt(1 - γ); the
    /// remaining decay down to `coherence` is pure dephasing.
    pub fn dephasing_probability(&self) -> f64 {
        let damping = (1.0 - self.gamma).sqrt();
        if damping <= 0.0 {
            return 0.0;
        }
        ((1.0 - self.coherence / damping) / 2.0).clamp(0.0, 0.5)
    }

    /// Average gate infidelity of the channel
    pub fn infidelity(&self) -> f64 {
        // F = 1/2 + (2a + b)/6 with Bloch scalings a (transverse) and b (longitudinal)
        let b = 1.0 - self.gamma;
        (0.5 - (2.0 * self.coherence + b) / 6.0).max(0.0)
    }

    /// Pauli-twirled approximation as (p_x, p_y, p_z)
    pub fn pauli_twirl(&self) -> (f64, f64, f64) {
        let b = 1.0 - self.gamma;
        let pxy = ((1.0 - b) / 4.0).max(0.0);
        let pz = ((1.0 - self.coherence) / 2.0 - pxy).max(0.0);
        (pxy, pxy, pz)
    }
}

/// One noise event attached to a gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoiseOp {
    /// With probability `p`, apply a uniformly random non-identity Pauli
    Depolarizing1 {
        /// Target qubit
        qubit: QubitId,
        /// Total Pauli error probability
        p: f64,
    },

    /// With probability `p`, apply a uniformly random non-identity two-qubit Pauli
    Depolarizing2 {
        /// Target qubits
        qubits: (QubitId, QubitId),
        /// Total Pauli error probability
        p: f64,
    },

    /// Thermal relaxation on one qubit
    Relax {
        /// Target qubit
        qubit: QubitId,
        /// Channel parameters
        channel: Relaxation,
    },
}

impl NoiseOp {
    /// Return the same op acting on remapped qubits
    pub fn map_qubits<F>(&self, f: F) -> NoiseOp
    where
        F: Fn(QubitId) -> QubitId,
    {
        match self {
            NoiseOp::Depolarizing1 { qubit, p } => NoiseOp::Depolarizing1 {
                qubit: f(*qubit),
                p: *p,
            },
            NoiseOp::Depolarizing2 { qubits, p } => NoiseOp::Depolarizing2 {
                qubits: (f(qubits.0), f(qubits.1)),
                p: *p,
            },
            NoiseOp::Relax { qubit, channel } => NoiseOp::Relax {
                qubit: f(*qubit),
                channel: *channel,
            },
        }
    }

    /// Check whether the op can be simulated on a stabilizer tableau as is
    pub fn is_pauli(&self) -> bool {
        !matches!(self, NoiseOp::Relax { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
