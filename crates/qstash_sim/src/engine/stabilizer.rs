//! Stabilizer engine
//!
//! Gantree: L4_Simulation → Engines → Tableau
//!
//! CHP tableau (Aaronson-Gottesman). Rows 0..n are destabilizers, rows
//! n..2n stabilizers, row 2n is scratch space for deterministic
//! measurements. Every Clifford gate is lowered to H, S and CX.

use super::{unsupported, Engine};
use qstash_core::gate::quarter_turns;
use qstash_core::{Gate, QstashResult, QubitId};
use qstash_noise::{NoiseOp, Pauli};
use rand::rngs::StdRng;
use rand::Rng;

/// Stabilizer tableau over `num_qubits` qubits
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    num_qubits: usize,
    x: Vec<Vec<bool>>,
    z: Vec<Vec<bool>>,
    r: Vec<bool>,
}

impl Tableau {
    /// |0…0⟩
    pub fn new(num_qubits: usize) -> Self {
        let rows = 2 * num_qubits + 1;
        let mut x = vec![vec![false; num_qubits]; rows];
        let mut z = vec![vec![false; num_qubits]; rows];
        for q in 0..num_qubits {
            x[q][q] = true;
            z[num_qubits + q][q] = true;
        }
        Self {
            num_qubits,
            x,
            z,
            r: vec![false; rows],
        }
    }

    // ========================================================================
    // Primitive Gates
    // ========================================================================

    fn h(&mut self, q: QubitId) {
        for i in 0..2 * self.num_qubits {
            self.r[i] ^= self.x[i][q] && self.z[i][q];
            let tmp = self.x[i][q];
            self.x[i][q] = self.z[i][q];
            self.z[i][q] = tmp;
        }
    }

    fn s(&mut self, q: QubitId) {
        for i in 0..2 * self.num_qubits {
            self.r[i] ^= self.x[i][q] && self.z[i][q];
            self.z[i][q] ^= self.x[i][q];
        }
    }

    fn cx(&mut self, c: QubitId, t: QubitId) {
        for i in 0..2 * self.num_qubits {
            let (xc, zc, xt, zt) = (self.x[i][c], self.z[i][c], self.x[i][t], self.z[i][t]);
            self.r[i] ^= xc && zt && (xt == zc);
            self.x[i][t] = xt ^ xc;
            self.z[i][c] = zc ^ zt;
        }
    }

    fn s_power(&mut self, q: QubitId, k: u8) {
        for _ in 0..k {
            self.s(q);
        }
    }

    fn pauli(&mut self, pauli: Pauli, q: QubitId) {
        match pauli {
            Pauli::I => {}
            Pauli::X => {
                self.h(q);
                self.s_power(q, 2);
                self.h(q);
            }
            Pauli::Z => self.s_power(q, 2),
            Pauli::Y => {
                self.pauli(Pauli::Z, q);
                self.pauli(Pauli::X, q);
            }
        }
    }

    // ========================================================================
    // Measurement
    // ========================================================================

    fn g(x1: bool, z1: bool, x2: bool, z2: bool) -> i32 {
        match (x1, z1) {
            (false, false) => 0,
            (true, true) => z2 as i32 - x2 as i32,
            (true, false) => z2 as i32 * (2 * x2 as i32 - 1),
            (false, true) => x2 as i32 * (1 - 2 * z2 as i32),
        }
    }

    /// Row `h` ← row `h` · row `i`
    fn rowsum(&mut self, h: usize, i: usize) {
        let mut phase = 2 * self.r[h] as i32 + 2 * self.r[i] as i32;
        for j in 0..self.num_qubits {
            phase += Self::g(self.x[i][j], self.z[i][j], self.x[h][j], self.z[h][j]);
        }
        self.r[h] = phase.rem_euclid(4) == 2;
        for j in 0..self.num_qubits {
            self.x[h][j] ^= self.x[i][j];
            self.z[h][j] ^= self.z[i][j];
        }
    }

    /// Check whether measuring `q` has a random outcome
    #[cfg(test)]
    pub fn is_random(&self, q: QubitId) -> bool {
        (self.num_qubits..2 * self.num_qubits).any(|p| self.x[p][q])
    }
}

impl Engine for Tableau {
    const EXACT_NOISE: bool = false;

    fn apply_gate(&mut self, gate: &Gate) -> QstashResult<()> {
        match *gate {
            Gate::H(q) => self.h(q),
            Gate::S(q) => self.s(q),
            Gate::Sdg(q) => self.s_power(q, 3),
            Gate::X(q) => self.pauli(Pauli::X, q),
            Gate::Y(q) => self.pauli(Pauli::Y, q),
            Gate::Z(q) => self.pauli(Pauli::Z, q),
            Gate::Id(_) => {}
            Gate::Sx(q) => {
                self.h(q);
                self.s(q);
                self.h(q);
            }
            Gate::Sxdg(q) => {
                self.h(q);
                self.s_power(q, 3);
                self.h(q);
            }
            Gate::Cnot(c, t) => self.cx(c, t),
            Gate::Cz(a, b) => {
                self.h(b);
                self.cx(a, b);
                self.h(b);
            }
            Gate::Cy(c, t) => {
                self.s_power(t, 3);
                self.cx(c, t);
                self.s(t);
            }
            Gate::Swap(a, b) => {
                self.cx(a, b);
                self.cx(b, a);
                self.cx(a, b);
            }
            Gate::Ecr(a, b) => {
                // RZX(π/2) on (a, b) followed by X on a
                self.h(b);
                self.cx(a, b);
                self.s(b);
                self.cx(a, b);
                self.h(b);
                self.pauli(Pauli::X, a);
            }
            Gate::Rz(q, angle) | Gate::P(q, angle) => match quarter_turns(angle) {
                Some(k) => self.s_power(q, k),
                None => return Err(unsupported(gate.name(), "stabilizer")),
            },
            Gate::Rx(q, angle) => match quarter_turns(angle) {
                Some(k) => {
                    self.h(q);
                    self.s_power(q, k);
                    self.h(q);
                }
                None => return Err(unsupported(gate.name(), "stabilizer")),
            },
            Gate::Ry(q, angle) => match quarter_turns(angle) {
                Some(k) => {
                    self.s_power(q, 3);
                    self.h(q);
                    self.s_power(q, k);
                    self.h(q);
                    self.s(q);
                }
                None => return Err(unsupported(gate.name(), "stabilizer")),
            },
            _ => return Err(unsupported(gate.name(), "stabilizer")),
        }
        Ok(())
    }

    fn apply_noise(&mut self, op: &NoiseOp, rng: &mut StdRng) {
        match op {
            NoiseOp::Depolarizing1 { qubit, p } => {
                if rng.gen::<f64>() < *p {
                    self.pauli(Pauli::NON_IDENTITY[rng.gen_range(0..3)], *qubit);
                }
            }
            NoiseOp::Depolarizing2 { qubits: (a, b), p } => {
                if rng.gen::<f64>() < *p {
                    let (pa, pb) = Pauli::pair(rng.gen_range(1..16));
                    self.pauli(pa, *a);
                    self.pauli(pb, *b);
                }
            }
            NoiseOp::Relax { qubit, channel } => {
                let (px, py, pz) = channel.pauli_twirl();
                let r = rng.gen::<f64>();
                if r < px {
                    self.pauli(Pauli::X, *qubit);
                } else if r < px + py {
                    self.pauli(Pauli::Y, *qubit);
                } else if r < px + py + pz {
                    self.pauli(Pauli::Z, *qubit);
                }
            }
        }
    }

    fn measure(&mut self, q: QubitId, rng: &mut StdRng) -> bool {
        let n = self.num_qubits;
        if let Some(p) = (n..2 * n).find(|&p| self.x[p][q]) {
            for i in 0..2 * n {
                if i != p && self.x[i][q] {
                    self.rowsum(i, p);
                }
            }
            self.x[p - n] = self.x[p].clone();
            self.z[p - n] = self.z[p].clone();
            self.r[p - n] = self.r[p];
            self.x[p].iter_mut().for_each(|b| *b = false);
            self.z[p].iter_mut().for_each(|b| *b = false);
            self.z[p][q] = true;
            let outcome = rng.gen::<bool>();
            self.r[p] = outcome;
            outcome
        } else {
            let scratch = 2 * n;
            self.x[scratch].iter_mut().for_each(|b| *b = false);
            self.z[scratch].iter_mut().for_each(|b| *b = false);
            self.r[scratch] = false;
            for i in 0..n {
                if self.x[i][q] {
                    self.rowsum(scratch, i + n);
                }
            }
            self.r[scratch]
        }
    }

    fn reset(&mut self, qubit: QubitId, rng: &mut StdRng) {
        if self.measure(qubit, rng) {
            self.pauli(Pauli::X, qubit);
        }
    }

    fn probabilities(&self) -> Option<Vec<f64>> {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
