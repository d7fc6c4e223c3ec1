//! Density matrix engine
//!
//! Gantree: L4_Simulation → Engines → DensityMatrix
//!
//! Exact mixed-state evolution. ρ is stored row-major as a vector over
//! 2n bits: row bits high, column bits low. A unitary U acts as U on the
//! row bits and conj(U) on the column bits.

use super::kernel::Kernel;
use super::Engine;
use num_complex::Complex64;
use qstash_core::{Gate, QstashResult, QubitId};
use qstash_noise::{NoiseOp, Relaxation};
use rand::rngs::StdRng;
use rand::Rng;

/// Mixed state over `num_qubits` qubits
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrix {
    num_qubits: usize,
    rho: Vec<Complex64>,
}

impl DensityMatrix {
    /// |0…0⟩⟨0…0|
    pub fn new(num_qubits: usize) -> Self {
        let mut rho = vec![Complex64::new(0.0, 0.0); 1 << (2 * num_qubits)];
        rho[0] = Complex64::new(1.0, 0.0);
        Self { num_qubits, rho }
    }

    /// Matrix dimension 2^n
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Entry ρ[row][col]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.rho[self.index(row, col)]
    }

    /// Trace (1 for a valid state)
    #[cfg(test)]
    pub fn trace(&self) -> f64 {
        (0..self.dim()).map(|i| self.get(i, i).re).sum()
    }

    fn index(&self, row: usize, col: usize) -> usize {
        (row << self.num_qubits) | col
    }

    /// Probability of reading 1 on `qubit`
    pub fn probability_one(&self, qubit: QubitId) -> f64 {
        let bit = 1usize << qubit;
        (0..self.dim())
            .filter(|i| i & bit != 0)
            .map(|i| self.get(i, i).re)
            .sum()
    }

    /// Depolarize the qubits in `qubits` with total Pauli error `p`
    ///
    /// ρ ↦ λρ + (1-λ)·Tr_Q(ρ)⊗I/d with λ = 1 - p·d²/(d²-1).
    fn depolarize(&mut self, qubits: &[QubitId], p: f64) {
        let d = 1usize << qubits.len();
        let d2 = (d * d) as f64;
        let mixing = p * d2 / (d2 - 1.0);
        let keep = 1.0 - mixing;

        let mask: usize = qubits.iter().map(|q| 1usize << q).sum();
        let spread: Vec<usize> = (0..d)
            .map(|k| {
                qubits
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| (k >> j) & 1 == 1)
                    .map(|(_, q)| 1usize << q)
                    .sum()
            })
            .collect();

        for row in (0..self.dim()).filter(|r| r & mask == 0) {
            for col in (0..self.dim()).filter(|c| c & mask == 0) {
                let partial: Complex64 = spread
                    .iter()
                    .map(|&s| self.rho[self.index(row | s, col | s)])
                    .sum();
                for &s1 in &spread {
                    for &s2 in &spread {
                        let i = self.index(row | s1, col | s2);
                        self.rho[i] *= keep;
                        if s1 == s2 {
                            self.rho[i] += partial * (mixing / d as f64);
                        }
                    }
                }
            }
        }
    }

    fn relax(&mut self, qubit: QubitId, channel: &Relaxation) {
        let bit = 1usize << qubit;
        for row in (0..self.dim()).filter(|r| r & bit == 0) {
            for col in (0..self.dim()).filter(|c| c & bit == 0) {
                let i00 = self.index(row, col);
                let i01 = self.index(row, col | bit);
                let i10 = self.index(row | bit, col);
                let i11 = self.index(row | bit, col | bit);
                let excited = self.rho[i11];
                self.rho[i00] += excited * channel.gamma;
                self.rho[i11] = excited * (1.0 - channel.gamma);
                self.rho[i01] *= channel.coherence;
                self.rho[i10] *= channel.coherence;
            }
        }
    }

    /// Project onto `qubit` = `outcome` and renormalize
    fn project(&mut self, qubit: QubitId, outcome: bool, probability: f64) {
        let bit = 1usize << qubit;
        let n = self.num_qubits;
        let col_mask = (1usize << n) - 1;
        for (i, entry) in self.rho.iter_mut().enumerate() {
            let (row, col) = (i >> n, i & col_mask);
            if (row & bit != 0) != outcome || (col & bit != 0) != outcome {
                *entry = Complex64::new(0.0, 0.0);
            } else if probability > 0.0 {
                *entry /= probability;
            }
        }
    }
}

impl Engine for DensityMatrix {
    const EXACT_NOISE: bool = true;

    fn apply_gate(&mut self, gate: &Gate) -> QstashResult<()> {
        let kernel = Kernel::from_gate(gate)?;
        kernel.shifted(self.num_qubits).apply(&mut self.rho);
        kernel.conj().apply(&mut self.rho);
        Ok(())
    }

    fn apply_noise(&mut self, op: &NoiseOp, _rng: &mut StdRng) {
        match op {
            NoiseOp::Depolarizing1 { qubit, p } => self.depolarize(&[*qubit], *p),
            NoiseOp::Depolarizing2 { qubits: (a, b), p } => self.depolarize(&[*a, *b], *p),
            NoiseOp::Relax { qubit, channel } => self.relax(*qubit, channel),
        }
    }

    fn measure(&mut self, qubit: QubitId, rng: &mut StdRng) -> bool {
        let p1 = self.probability_one(qubit);
        let outcome = rng.gen::<f64>() < p1;
        let probability = if outcome { p1 } else { 1.0 - p1 };
        self.project(qubit, outcome, probability);
        outcome
    }

    fn reset(&mut self, qubit: QubitId, _rng: &mut StdRng) {
        let bit = 1usize << qubit;
        for row in (0..self.dim()).filter(|r| r & bit == 0) {
            for col in (0..self.dim()).filter(|c| c & bit == 0) {
                let excited = self.rho[self.index(row | bit, col | bit)];
                let ground = self.index(row, col);
                self.rho[ground] += excited;
                for i in [
                    self.index(row | bit, col | bit),
                    self.index(row | bit, col),
                    self.index(row, col | bit),
                ] {
                    self.rho[i] = Complex64::new(0.0, 0.0);
                }
            }
        }
    }

    fn probabilities(&self) -> Option<Vec<f64>> {
        Some((0..self.dim()).map(|i| self.get(i, i).re.max(0.0)).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
