//! Dense gate kernels
//!
//! Gantree: L4_Simulation → Engines → Kernel
//!
//! Gate actions on a little-endian amplitude slice. The density matrix
//! engine reuses them on its vectorised form.

use num_complex::Complex64;
use qstash_core::{Gate, Matrix2, QstashError, QstashResult, QubitId};
use qstash_noise::Pauli;
use std::f64::consts::FRAC_1_SQRT_2;

/// 4x4 matrix over the basis index `bit(a) + 2·bit(b)`
pub(crate) type Matrix4 = [[Complex64; 4]; 4];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A gate reduced to a dense action
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Kernel {
    /// Single-qubit unitary
    Single(Matrix2, QubitId),
    /// Two-qubit unitary on (a, b)
    Pair(Matrix4, QubitId, QubitId),
    /// Toffoli (control, control, target)
    Toffoli(QubitId, QubitId, QubitId),
    /// Fredkin (control, target, target)
    Fredkin(QubitId, QubitId, QubitId),
}

impl Kernel {
    /// Kernel of a unitary gate
    pub(crate) fn from_gate(gate: &Gate) -> QstashResult<Kernel> {
        if let Some(m) = gate.matrix() {
            return Ok(Kernel::Single(m, gate.qubits()[0]));
        }
        let kernel = match *gate {
            Gate::Cnot(c, t) => Kernel::Pair(permutation([0, 3, 2, 1]), c, t),
            Gate::Cz(a, b) => Kernel::Pair(diagonal([ONE, ONE, ONE, -ONE]), a, b),
            Gate::Cy(c, t) => {
                let mut m = diagonal([ONE, ZERO, ONE, ZERO]);
                m[3][1] = I;
                m[1][3] = -I;
                Kernel::Pair(m, c, t)
            }
            Gate::Swap(a, b) => Kernel::Pair(permutation([0, 2, 1, 3]), a, b),
            Gate::Ecr(a, b) => Kernel::Pair(ecr_matrix(), a, b),
            Gate::Crz(c, t, theta) => {
                let lo = Complex64::from_polar(1.0, -theta / 2.0);
                let hi = Complex64::from_polar(1.0, theta / 2.0);
                Kernel::Pair(diagonal([ONE, lo, ONE, hi]), c, t)
            }
            Gate::Ccx(a, b, c) => Kernel::Toffoli(a, b, c),
            Gate::Cswap(a, b, c) => Kernel::Fredkin(a, b, c),
            _ => {
                return Err(QstashError::BackendError(format!(
                    "'{}' has no unitary action",
                    gate.name()
                )))
            }
        };
        Ok(kernel)
    }

    /// Kernel of a non-identity Pauli
    pub(crate) fn pauli(pauli: Pauli, qubit: QubitId) -> Option<Kernel> {
        let gate = match pauli {
            Pauli::I => return None,
            Pauli::X => Gate::X(qubit),
            Pauli::Y => Gate::Y(qubit),
            Pauli::Z => Gate::Z(qubit),
        };
        gate.matrix().map(|m| Kernel::Single(m, qubit))
    }

    /// Same action with every qubit index shifted by `offset`
    pub(crate) fn shifted(&self, offset: usize) -> Kernel {
        match self {
            Kernel::Single(m, q) => Kernel::Single(*m, q + offset),
            Kernel::Pair(m, a, b) => Kernel::Pair(*m, a + offset, b + offset),
            Kernel::Toffoli(a, b, c) => Kernel::Toffoli(a + offset, b + offset, c + offset),
            Kernel::Fredkin(a, b, c) => Kernel::Fredkin(a + offset, b + offset, c + offset),
        }
    }

    /// Elementwise complex conjugate
    pub(crate) fn conj(&self) -> Kernel {
        match self {
            Kernel::Single(m, q) => Kernel::Single(m.map(|row| row.map(|c| c.conj())), *q),
            Kernel::Pair(m, a, b) => Kernel::Pair(m.map(|row| row.map(|c| c.conj())), *a, *b),
            other => other.clone(),
        }
    }

    /// Apply to a little-endian amplitude slice
    pub(crate) fn apply(&self, amps: &mut [Complex64]) {
        match self {
            Kernel::Single(m, q) => apply_single(amps, m, *q),
            Kernel::Pair(m, a, b) => apply_pair(amps, m, *a, *b),
            Kernel::Toffoli(c1, c2, t) => {
                let controls = (1usize << c1) | (1usize << c2);
                let target = 1usize << t;
                for i in 0..amps.len() {
                    if i & controls == controls && i & target == 0 {
                        amps.swap(i, i | target);
                    }
                }
            }
            Kernel::Fredkin(c, t1, t2) => {
                let (c, t1, t2) = (1usize << c, 1usize << t1, 1usize << t2);
                for i in 0..amps.len() {
                    if i & c != 0 && i & t1 != 0 && i & t2 == 0 {
                        amps.swap(i, (i & !t1) | t2);
                    }
                }
            }
        }
    }
}

fn apply_single(amps: &mut [Complex64], m: &Matrix2, q: QubitId) {
    let bit = 1usize << q;
    for i in 0..amps.len() {
        if i & bit == 0 {
            let (a0, a1) = (amps[i], amps[i | bit]);
            amps[i] = m[0][0] * a0 + m[0][1] * a1;
            amps[i | bit] = m[1][0] * a0 + m[1][1] * a1;
        }
    }
}

fn apply_pair(amps: &mut [Complex64], m: &Matrix4, a: QubitId, b: QubitId) {
    let (ba, bb) = (1usize << a, 1usize << b);
    let offsets = [0, ba, bb, ba | bb];
    for base in 0..amps.len() {
        if base & (ba | bb) != 0 {
            continue;
        }
        let v = offsets.map(|o| amps[base | o]);
        for (r, o) in offsets.iter().enumerate() {
            amps[base | o] = (0..4).map(|k| m[r][k] * v[k]).sum();
        }
    }
}

fn diagonal(d: [Complex64; 4]) -> Matrix4 {
    let mut m = [[ZERO; 4]; 4];
    for (k, value) in d.into_iter().enumerate() {
        m[k][k] = value;
    }
    m
}

/// Matrix sending basis state `k` to `to[k]`
fn permutation(to: [usize; 4]) -> Matrix4 {
    let mut m = [[ZERO; 4]; 4];
    for (k, &r) in to.iter().enumerate() {
        m[r][k] = ONE;
    }
    m
}

/// ECR = (IX - XY)/√2, X acting on the first qubit alone
fn ecr_matrix() -> Matrix4 {
    let s = FRAC_1_SQRT_2;
    let (one, i) = (ONE * s, I * s);
    [
        [ZERO, one, ZERO, i],
        [one, ZERO, -i, ZERO],
        [ZERO, i, ZERO, one],
        [-i, ZERO, one, ZERO],
    ]
}

// ============================================================================
// Tests
// ============================================================================
