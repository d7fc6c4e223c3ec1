//! Statevector engine
//!
//! Gantree: L4_Simulation → Engines → StateVector
//!
//! Dense pure-state evolution. Noise is unravelled into trajectories:
//! Pauli errors are drawn per event, thermal relaxation picks a Kraus
//! branch (decay or no decay) followed by a sampled phase flip.

use super::kernel::Kernel;
use super::Engine;
use num_complex::Complex64;
use qstash_core::{Gate, QstashResult, QubitId};
use qstash_noise::{NoiseOp, Pauli, Relaxation};
use rand::rngs::StdRng;
use rand::Rng;

/// Pure state over `num_qubits` qubits, little-endian
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    amps: Vec<Complex64>,
}

impl StateVector {
    /// |0…0⟩
    pub fn new(num_qubits: usize) -> Self {
        let mut amps = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amps[0] = Complex64::new(1.0, 0.0);
        Self { amps }
    }

    /// Probability of reading 1 on `qubit`
    pub fn probability_one(&self, qubit: QubitId) -> f64 {
        let bit = 1usize << qubit;
        self.amps
            .iter()
            .enumerate()
            .filter(|(i, _)| i & bit != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    fn apply_pauli(&mut self, pauli: Pauli, qubit: QubitId) {
        if let Some(kernel) = Kernel::pauli(pauli, qubit) {
            kernel.apply(&mut self.amps);
        }
    }

    fn normalize(&mut self) {
        let norm = self.amps.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        if norm > 0.0 {
            self.amps.iter_mut().for_each(|a| *a /= norm);
        }
    }

    /// Keep the branch where `qubit` reads `outcome`
    fn collapse(&mut self, qubit: QubitId, outcome: bool) {
        let bit = 1usize << qubit;
        for (i, a) in self.amps.iter_mut().enumerate() {
            if (i & bit != 0) != outcome {
                *a = Complex64::new(0.0, 0.0);
            }
        }
        self.normalize();
    }

    fn relax(&mut self, qubit: QubitId, channel: &Relaxation, rng: &mut StdRng) {
        let bit = 1usize << qubit;
        let decay = channel.gamma * self.probability_one(qubit);
        if rng.gen::<f64>() < decay {
            for i in 0..self.amps.len() {
                if i & bit == 0 {
                    self.amps[i] = self.amps[i | bit];
                    self.amps[i | bit] = Complex64::new(0.0, 0.0);
                }
            }
        } else {
            let damping = (1.0 - channel.gamma).sqrt();
            for (i, a) in self.amps.iter_mut().enumerate() {
                if i & bit != 0 {
                    *a *= damping;
                }
            }
        }
        self.normalize();

        if rng.gen::<f64>() < channel.dephasing_probability() {
            self.apply_pauli(Pauli::Z, qubit);
        }
    }
}

impl Engine for StateVector {
    const EXACT_NOISE: bool = false;

    fn apply_gate(&mut self, gate: &Gate) -> QstashResult<()> {
        Kernel::from_gate(gate)?.apply(&mut self.amps);
        Ok(())
    }

    fn apply_noise(&mut self, op: &NoiseOp, rng: &mut StdRng) {
        match op {
            NoiseOp::Depolarizing1 { qubit, p } => {
                if rng.gen::<f64>() < *p {
                    let pauli = Pauli::NON_IDENTITY[rng.gen_range(0..3)];
                    self.apply_pauli(pauli, *qubit);
                }
            }
            NoiseOp::Depolarizing2 { qubits: (a, b), p } => {
                if rng.gen::<f64>() < *p {
                    let (pa, pb) = Pauli::pair(rng.gen_range(1..16));
                    self.apply_pauli(pa, *a);
                    self.apply_pauli(pb, *b);
                }
            }
            NoiseOp::Relax { qubit, channel } => self.relax(*qubit, channel, rng),
        }
    }

    fn measure(&mut self, qubit: QubitId, rng: &mut StdRng) -> bool {
        let outcome = rng.gen::<f64>() < self.probability_one(qubit);
        self.collapse(qubit, outcome);
        outcome
    }

    fn reset(&mut self, qubit: QubitId, rng: &mut StdRng) {
        if self.measure(qubit, rng) {
            self.apply_pauli(Pauli::X, qubit);
        }
    }

    fn probabilities(&self) -> Option<Vec<f64>> {
        Some(self.amps.iter().map(|a| a.norm_sqr()).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    #[test]
    fn test_bell_state() {
        let mut sv = StateVector::new(2);
        sv.apply_gate(&Gate::H(0)).unwrap();
        sv.apply_gate(&Gate::Cnot(0, 1)).unwrap();
        let probs = sv.probabilities().unwrap();
        assert_abs_diff_eq!(probs[0b00], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[0b11], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_measure_collapses() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut sv = StateVector::new(2);
        sv.apply_gate(&Gate::H(0)).unwrap();
        sv.apply_gate(&Gate::Cnot(0, 1)).unwrap();
        let first = sv.measure(0, &mut rng);
        assert_eq!(sv.measure(1, &mut rng), first);
        assert_abs_diff_eq!(sv.probability_one(1), if first { 1.0 } else { 0.0 }, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sv = StateVector::new(1);
        sv.apply_gate(&Gate::X(0)).unwrap();
        sv.reset(0, &mut rng);
        assert_abs_diff_eq!(sv.probability_one(0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_full_decay_empties_excited_state() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sv = StateVector::new(1);
        sv.apply_gate(&Gate::X(0)).unwrap();
        let channel = Relaxation {
            gamma: 1.0,
            coherence: 0.0,
        };
        sv.apply_noise(&NoiseOp::Relax { qubit: 0, channel }, &mut rng);
        assert_abs_diff_eq!(sv.probability_one(0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_certain_depolarizing_flips_basis_state_or_phase() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut flips = 0;
        for _ in 0..300 {
            let mut sv = StateVector::new(1);
            sv.apply_noise(&NoiseOp::Depolarizing1 { qubit: 0, p: 1.0 }, &mut rng);
            if sv.probability_one(0) > 0.5 {
                flips += 1;
            }
        }
        // X and Y flip |0⟩, Z does not
        assert!((150..250).contains(&flips));
    }
}
