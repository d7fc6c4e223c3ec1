//! Quantum gate definitions for qstash
//!
//! Gantree: L1_Circuit → Gate
//!
//! Gate enum covering the standard library gates, the IBM native set
//! (`rz`, `sx`, `x`, `ecr`, `cx`) and the non-unitary instructions.

use crate::types::{Angle, ClbitId, Matrix2, QubitId};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};
use std::fmt;

/// Tolerance used when classifying rotation angles
const ANGLE_EPS: f64 = 1e-9;

/// Quantum gate enumeration
/// Gantree: Gate // gate enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gate {
    // ========================================================================
    // Single-Qubit Gates (Non-Parameterized)
    // ========================================================================
    /// Hadamard gate
    H(QubitId),

    /// Pauli-X gate (NOT)
    X(QubitId),

    /// Pauli-Y gate
    Y(QubitId),

    /// Pauli-Z gate
    Z(QubitId),

    /// S gate (sqrt(Z))
    S(QubitId),

    /// S-dagger gate
    Sdg(QubitId),

    /// T gate (fourth root of Z)
    T(QubitId),

    /// T-dagger gate
    Tdg(QubitId),

    /// SX gate (sqrt(X)), IBM native
    Sx(QubitId),

    /// SX-dagger gate
    Sxdg(QubitId),

    /// Identity gate
    Id(QubitId),

    // ========================================================================
    // Single-Qubit Parameterized Gates
    // ========================================================================
    /// Rotation around X-axis
    Rx(QubitId, Angle),

    /// Rotation around Y-axis
    Ry(QubitId, Angle),

    /// Rotation around Z-axis, IBM native
    Rz(QubitId, Angle),

    /// Phase gate P(λ) = diag(1, e^{iλ})
    P(QubitId, Angle),

    /// General single-qubit rotation U(θ, φ, λ)
    U(QubitId, Angle, Angle, Angle),

    // ========================================================================
    // Two-Qubit Gates
    // ========================================================================
    /// Controlled-NOT (control, target)
    Cnot(QubitId, QubitId),

    /// Controlled-Z
    Cz(QubitId, QubitId),

    /// Controlled-Y
    Cy(QubitId, QubitId),

    /// SWAP gate
    Swap(QubitId, QubitId),

    /// Echoed cross-resonance gate, IBM Eagle native
    ///
    /// ECR = (IX - XY)/√2 with the first qubit carrying the X/Y factor.
    Ecr(QubitId, QubitId),

    /// Controlled Rz
    Crz(QubitId, QubitId, Angle),

    // ========================================================================
    // Three-Qubit Gates
    // ========================================================================
    /// Toffoli (control, control, target)
    Ccx(QubitId, QubitId, QubitId),

    /// Fredkin (control, target, target)
    Cswap(QubitId, QubitId, QubitId),

    // ========================================================================
    // Measurement and Control
    // ========================================================================
    /// Measure a qubit into a classical bit
    Measure(QubitId, ClbitId),

    /// Measure every qubit `i` into classical bit `i`
    MeasureAll,

    /// Barrier (empty list means all qubits)
    Barrier(Vec<QubitId>),

    /// Reset qubit to |0⟩
    Reset(QubitId),
}

impl Gate {
    // ========================================================================
    // Gate Properties
    // ========================================================================

    /// Get qubits involved in this gate
    /// Gantree: qubits(&self) -> Vec<QubitId> // involved qubits
    pub fn qubits(&self) -> Vec<QubitId> {
        match self {
            Gate::H(q)
            | Gate::X(q)
            | Gate::Y(q)
            | Gate::Z(q)
            | Gate::S(q)
            | Gate::Sdg(q)
            | Gate::T(q)
            | Gate::Tdg(q)
            | Gate::Sx(q)
            | Gate::Sxdg(q)
            | Gate::Id(q)
            | Gate::Rx(q, _)
            | Gate::Ry(q, _)
            | Gate::Rz(q, _)
            | Gate::P(q, _)
            | Gate::U(q, _, _, _)
            | Gate::Measure(q, _)
            | Gate::Reset(q) => vec![*q],

            Gate::Cnot(a, b)
            | Gate::Cz(a, b)
            | Gate::Cy(a, b)
            | Gate::Swap(a, b)
            | Gate::Ecr(a, b)
            | Gate::Crz(a, b, _) => vec![*a, *b],

            Gate::Ccx(a, b, c) | Gate::Cswap(a, b, c) => vec![*a, *b, *c],

            Gate::MeasureAll => vec![],
            Gate::Barrier(qs) => qs.clone(),
        }
    }

    /// Check if gate is a single-qubit unitary
    pub fn is_single_qubit(&self) -> bool {
        matches!(
            self,
            Gate::H(_)
                | Gate::X(_)
                | Gate::Y(_)
                | Gate::Z(_)
                | Gate::S(_)
                | Gate::Sdg(_)
                | Gate::T(_)
                | Gate::Tdg(_)
                | Gate::Sx(_)
                | Gate::Sxdg(_)
                | Gate::Id(_)
                | Gate::Rx(_, _)
                | Gate::Ry(_, _)
                | Gate::Rz(_, _)
                | Gate::P(_, _)
                | Gate::U(_, _, _, _)
        )
    }

    /// Check if gate is two-qubit
    pub fn is_two_qubit(&self) -> bool {
        matches!(
            self,
            Gate::Cnot(_, _)
                | Gate::Cz(_, _)
                | Gate::Cy(_, _)
                | Gate::Swap(_, _)
                | Gate::Ecr(_, _)
                | Gate::Crz(_, _, _)
        )
    }

    /// Check if gate is three-qubit
    pub fn is_three_qubit(&self) -> bool {
        matches!(self, Gate::Ccx(_, _, _) | Gate::Cswap(_, _, _))
    }

    /// Check if gate is unitary (not measure, reset or barrier)
    pub fn is_unitary(&self) -> bool {
        self.is_single_qubit() || self.is_two_qubit() || self.is_three_qubit()
    }

    /// Check if gate is parameterized
    pub fn is_parameterized(&self) -> bool {
        matches!(
            self,
            Gate::Rx(_, _) | Gate::Ry(_, _) | Gate::Rz(_, _) | Gate::P(_, _) | Gate::U(..) | Gate::Crz(..)
        )
    }

    /// Check if gate is measurement
    pub fn is_measurement(&self) -> bool {
        matches!(self, Gate::Measure(_, _) | Gate::MeasureAll)
    }

    /// Check if gate is a barrier
    pub fn is_barrier(&self) -> bool {
        matches!(self, Gate::Barrier(_))
    }

    /// Check if the gate is in the Clifford group
    ///
    /// Rotations count as Clifford when their angle is a multiple of π/2.
    pub fn is_clifford(&self) -> bool {
        match self {
            Gate::H(_)
            | Gate::X(_)
            | Gate::Y(_)
            | Gate::Z(_)
            | Gate::S(_)
            | Gate::Sdg(_)
            | Gate::Sx(_)
            | Gate::Sxdg(_)
            | Gate::Id(_)
            | Gate::Cnot(_, _)
            | Gate::Cz(_, _)
            | Gate::Cy(_, _)
            | Gate::Swap(_, _)
            | Gate::Ecr(_, _) => true,
            Gate::Rx(_, a) | Gate::Ry(_, a) | Gate::Rz(_, a) | Gate::P(_, a) => {
                quarter_turns(*a).is_some()
            }
            _ => false,
        }
    }

    /// Check if applying the gate twice is the identity
    pub fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            Gate::H(_)
                | Gate::X(_)
                | Gate::Y(_)
                | Gate::Z(_)
                | Gate::Id(_)
                | Gate::Cnot(_, _)
                | Gate::Cz(_, _)
                | Gate::Cy(_, _)
                | Gate::Swap(_, _)
                | Gate::Ecr(_, _)
                | Gate::Ccx(_, _, _)
                | Gate::Cswap(_, _, _)
        )
    }

    /// Get gate name (as used in OpenQASM and basis-gate lists)
    pub fn name(&self) -> &'static str {
        match self {
            Gate::H(_) => "h",
            Gate::X(_) => "x",
            Gate::Y(_) => "y",
            Gate::Z(_) => "z",
            Gate::S(_) => "s",
            Gate::Sdg(_) => "sdg",
            Gate::T(_) => "t",
            Gate::Tdg(_) => "tdg",
            Gate::Sx(_) => "sx",
            Gate::Sxdg(_) => "sxdg",
            Gate::Id(_) => "id",
            Gate::Rx(_, _) => "rx",
            Gate::Ry(_, _) => "ry",
            Gate::Rz(_, _) => "rz",
            Gate::P(_, _) => "p",
            Gate::U(_, _, _, _) => "u",
            Gate::Cnot(_, _) => "cx",
            Gate::Cz(_, _) => "cz",
            Gate::Cy(_, _) => "cy",
            Gate::Swap(_, _) => "swap",
            Gate::Ecr(_, _) => "ecr",
            Gate::Crz(_, _, _) => "crz",
            Gate::Ccx(_, _, _) => "ccx",
            Gate::Cswap(_, _, _) => "cswap",
            Gate::Measure(_, _) | Gate::MeasureAll => "measure",
            Gate::Barrier(_) => "barrier",
            Gate::Reset(_) => "reset",
        }
    }

    /// Return the same gate acting on remapped qubits
    pub fn map_qubits<F>(&self, f: F) -> Gate
    where
        F: Fn(QubitId) -> QubitId,
    {
        match self {
            Gate::H(q) => Gate::H(f(*q)),
            Gate::X(q) => Gate::X(f(*q)),
            Gate::Y(q) => Gate::Y(f(*q)),
            Gate::Z(q) => Gate::Z(f(*q)),
            Gate::S(q) => Gate::S(f(*q)),
            Gate::Sdg(q) => Gate::Sdg(f(*q)),
            Gate::T(q) => Gate::T(f(*q)),
            Gate::Tdg(q) => Gate::Tdg(f(*q)),
            Gate::Sx(q) => Gate::Sx(f(*q)),
            Gate::Sxdg(q) => Gate::Sxdg(f(*q)),
            Gate::Id(q) => Gate::Id(f(*q)),
            Gate::Rx(q, a) => Gate::Rx(f(*q), *a),
            Gate::Ry(q, a) => Gate::Ry(f(*q), *a),
            Gate::Rz(q, a) => Gate::Rz(f(*q), *a),
            Gate::P(q, a) => Gate::P(f(*q), *a),
            Gate::U(q, t, p, l) => Gate::U(f(*q), *t, *p, *l),
            Gate::Cnot(a, b) => Gate::Cnot(f(*a), f(*b)),
            Gate::Cz(a, b) => Gate::Cz(f(*a), f(*b)),
            Gate::Cy(a, b) => Gate::Cy(f(*a), f(*b)),
            Gate::Swap(a, b) => Gate::Swap(f(*a), f(*b)),
            Gate::Ecr(a, b) => Gate::Ecr(f(*a), f(*b)),
            Gate::Crz(a, b, t) => Gate::Crz(f(*a), f(*b), *t),
            Gate::Ccx(a, b, c) => Gate::Ccx(f(*a), f(*b), f(*c)),
            Gate::Cswap(a, b, c) => Gate::Cswap(f(*a), f(*b), f(*c)),
            Gate::Measure(q, c) => Gate::Measure(f(*q), *c),
            Gate::MeasureAll => Gate::MeasureAll,
            Gate::Barrier(qs) => Gate::Barrier(qs.iter().map(|&q| f(q)).collect()),
            Gate::Reset(q) => Gate::Reset(f(*q)),
        }
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// 2x2 unitary of a single-qubit gate, `None` for anything else
    /// Gantree: matrix(&self) -> Option<Matrix2> // 1Q unitary
    pub fn matrix(&self) -> Option<Matrix2> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let i = Complex64::new(0.0, 1.0);

        let m = match self {
            Gate::H(_) => {
                let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
                [[h, h], [h, -h]]
            }
            Gate::X(_) => [[zero, one], [one, zero]],
            Gate::Y(_) => [[zero, -i], [i, zero]],
            Gate::Z(_) => [[one, zero], [zero, -one]],
            Gate::S(_) => [[one, zero], [zero, i]],
            Gate::Sdg(_) => [[one, zero], [zero, -i]],
            Gate::T(_) => [[one, zero], [zero, Complex64::from_polar(1.0, FRAC_PI_4)]],
            Gate::Tdg(_) => [[one, zero], [zero, Complex64::from_polar(1.0, -FRAC_PI_4)]],
            Gate::Sx(_) => {
                let a = Complex64::new(0.5, 0.5);
                let b = Complex64::new(0.5, -0.5);
                [[a, b], [b, a]]
            }
            Gate::Sxdg(_) => {
                let a = Complex64::new(0.5, -0.5);
                let b = Complex64::new(0.5, 0.5);
                [[a, b], [b, a]]
            }
            Gate::Id(_) => identity2(),
            Gate::Rx(_, theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new(0.0, -(theta / 2.0).sin());
                [[c, s], [s, c]]
            }
            Gate::Ry(_, theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new((theta / 2.0).sin(), 0.0);
                [[c, -s], [s, c]]
            }
            Gate::Rz(_, theta) => [
                [Complex64::from_polar(1.0, -theta / 2.0), zero],
                [zero, Complex64::from_polar(1.0, theta / 2.0)],
            ],
            Gate::P(_, lambda) => [[one, zero], [zero, Complex64::from_polar(1.0, *lambda)]],
            Gate::U(_, theta, phi, lambda) => u_matrix(*theta, *phi, *lambda),
            _ => return None,
        };
        Some(m)
    }

    // ========================================================================
    // QASM
    // ========================================================================

    /// Convert to OpenQASM 2.0 string
    /// Gantree: to_qasm(&self) -> String // QASM
    pub fn to_qasm(&self) -> String {
        match self {
            Gate::Rx(q, t) | Gate::Ry(q, t) | Gate::Rz(q, t) | Gate::P(q, t) => {
                format!("{}({}) q[{}];", self.name(), t, q)
            }
            Gate::U(q, theta, phi, lambda) => {
                format!("u({},{},{}) q[{}];", theta, phi, lambda, q)
            }
            Gate::Crz(c, t, theta) => format!("crz({}) q[{}],q[{}];", theta, c, t),
            Gate::Measure(q, c) => format!("measure q[{}] -> c[{}];", q, c),
            Gate::MeasureAll => "measure q -> c;".to_string(),
            Gate::Barrier(qs) => {
                if qs.is_empty() {
                    "barrier q;".to_string()
                } else {
                    let qubits: Vec<String> = qs.iter().map(|q| format!("q[{}]", q)).collect();
                    format!("barrier {};", qubits.join(","))
                }
            }
            _ => {
                let qubits: Vec<String> = self.qubits().iter().map(|q| format!("q[{}]", q)).collect();
                format!("{} {};", self.name(), qubits.join(","))
            }
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_qasm())
    }
}

// ============================================================================
// Matrix helpers
// ============================================================================

/// 2x2 identity
pub fn identity2() -> Matrix2 {
    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    [[one, zero], [zero, one]]
}

/// Matrix of U(θ, φ, λ) in the OpenQASM convention
pub fn u_matrix(theta: Angle, phi: Angle, lambda: Angle) -> Matrix2 {
    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    [
        [
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
        ],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        ],
    ]
}

/// Product `a · b` (b is applied first)
pub fn mat2_mul(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut out = [[Complex64::new(0.0, 0.0); 2]; 2];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = a[r][0] * b[0][c] + a[r][1] * b[1][c];
        }
    }
    out
}

/// Check whether two matrices are equal up to a global phase
pub fn mat2_equiv(a: &Matrix2, b: &Matrix2, tol: f64) -> bool {
    // |tr(a† b)| = 2 exactly when a = e^{iφ} b for unitaries
    let mut tr = Complex64::new(0.0, 0.0);
    for r in 0..2 {
        for c in 0..2 {
            tr += a[r][c].conj() * b[r][c];
        }
    }
    (tr.norm() - 2.0).abs() < tol
}

/// Number of quarter turns if `angle` is a multiple of π/2
pub fn quarter_turns(angle: Angle) -> Option<u8> {
    let k = angle / FRAC_PI_2;
    let rounded = k.round();
    if (k - rounded).abs() > ANGLE_EPS {
        return None;
    }
    Some(rounded.rem_euclid(4.0) as u8)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn is_unitary(m: &Matrix2) -> bool {
        let dagger = [
            [m[0][0].conj(), m[1][0].conj()],
            [m[0][1].conj(), m[1][1].conj()],
        ];
        mat2_equiv(&mat2_mul(&dagger, m), &identity2(), 1e-12)
    }

    #[test]
    fn test_gate_qubits() {
        assert_eq!(Gate::H(0).qubits(), vec![0]);
        assert_eq!(Gate::Cnot(0, 1).qubits(), vec![0, 1]);
        assert_eq!(Gate::Ccx(0, 1, 2).qubits(), vec![0, 1, 2]);
        assert_eq!(Gate::Measure(3, 0).qubits(), vec![3]);
    }

    #[test]
    fn test_gate_classification() {
        assert!(Gate::H(0).is_single_qubit());
        assert!(Gate::Ecr(0, 1).is_two_qubit());
        assert!(Gate::Cswap(0, 1, 2).is_three_qubit());
        assert!(!Gate::Measure(0, 0).is_unitary());
        assert!(Gate::Rz(0, 0.3).is_parameterized());
    }

    #[test]
    fn test_clifford_classification() {
        assert!(Gate::H(0).is_clifford());
        assert!(Gate::Ecr(0, 1).is_clifford());
        assert!(Gate::Rz(0, PI / 2.0).is_clifford());
        assert!(Gate::Rz(0, -3.0 * PI / 2.0).is_clifford());
        assert!(!Gate::T(0).is_clifford());
        assert!(!Gate::Rz(0, 0.1).is_clifford());
        assert!(!Gate::Ccx(0, 1, 2).is_clifford());
    }

    #[test]
    fn test_quarter_turns() {
        assert_eq!(quarter_turns(0.0), Some(0));
        assert_eq!(quarter_turns(PI), Some(2));
        assert_eq!(quarter_turns(-PI / 2.0), Some(3));
        assert_eq!(quarter_turns(0.3), None);
    }

    #[test]
    fn test_matrices_are_unitary() {
        let gates = [
            Gate::H(0),
            Gate::Y(0),
            Gate::T(0),
            Gate::Sx(0),
            Gate::Sxdg(0),
            Gate::Rx(0, 0.7),
            Gate::Ry(0, -1.1),
            Gate::U(0, 0.4, 1.3, -0.2),
        ];
        for g in &gates {
            let m = g.matrix().unwrap();
            assert!(is_unitary(&m), "{} is not unitary", g);
        }
        assert!(Gate::Cnot(0, 1).matrix().is_none());
    }

    #[test]
    fn test_sx_squared_is_x() {
        let sx = Gate::Sx(0).matrix().unwrap();
        let x = Gate::X(0).matrix().unwrap();
        assert!(mat2_equiv(&mat2_mul(&sx, &sx), &x, 1e-12));
    }

    #[test]
    fn test_u_matches_named_gates() {
        let h = Gate::H(0).matrix().unwrap();
        assert!(mat2_equiv(&u_matrix(PI / 2.0, 0.0, PI), &h, 1e-12));

        let rz = Gate::Rz(0, 0.8).matrix().unwrap();
        let p = Gate::P(0, 0.8).matrix().unwrap();
        assert!(mat2_equiv(&rz, &p, 1e-12));

        let u = u_matrix(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(u[0][0].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_map_qubits() {
        let g = Gate::Cnot(0, 1).map_qubits(|q| q + 5);
        assert_eq!(g, Gate::Cnot(5, 6));
        let m = Gate::Measure(2, 2).map_qubits(|q| q * 10);
        assert_eq!(m, Gate::Measure(20, 2));
    }

    #[test]
    fn test_gate_to_qasm() {
        assert_eq!(Gate::H(0).to_qasm(), "h q[0];");
        assert_eq!(Gate::Cnot(0, 1).to_qasm(), "cx q[0],q[1];");
        assert_eq!(Gate::Ecr(2, 3).to_qasm(), "ecr q[2],q[3];");
        assert_eq!(Gate::Rz(1, 0.5).to_qasm(), "rz(0.5) q[1];");
        assert_eq!(Gate::Measure(1, 0).to_qasm(), "measure q[1] -> c[0];");
    }
}
