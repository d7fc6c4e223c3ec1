//! Simulation engines
//!
//! Gantree: L4_Simulation → Engines
//!
//! Engines evolve one state; [`sample_counts`] turns a program into
//! counts, either by evolving once and sampling the outcome distribution
//! or by running one trajectory per shot.

pub(crate) mod density_matrix;
pub(crate) mod kernel;
pub(crate) mod stabilizer;
pub(crate) mod statevector;

use crate::program::{Op, Program};
use qstash_core::{Counts, Gate, QstashError, QstashResult, QubitId};
use qstash_noise::NoiseOp;
use rand::rngs::StdRng;
use rand::Rng;

/// State evolution primitives
pub(crate) trait Engine {
    /// Noise ops are applied as exact channels rather than sampled
    const EXACT_NOISE: bool;

    /// Apply a unitary gate
    fn apply_gate(&mut self, gate: &Gate) -> QstashResult<()>;

    /// Apply a noise event
    fn apply_noise(&mut self, op: &NoiseOp, rng: &mut StdRng);

    /// Projective Z measurement, collapsing the state
    fn measure(&mut self, qubit: QubitId, rng: &mut StdRng) -> bool;

    /// Reset to |0⟩
    fn reset(&mut self, qubit: QubitId, rng: &mut StdRng);

    /// Outcome distribution over basis states, if the engine has one
    fn probabilities(&self) -> Option<Vec<f64>>;
}

/// Run `program` for `shots` shots on engines produced by `fresh`
pub(crate) fn sample_counts<E, F>(
    program: &Program,
    shots: u64,
    rng: &mut StdRng,
    fresh: F,
) -> QstashResult<Counts>
where
    E: Engine,
    F: Fn() -> E,
{
    let mut counts = Counts::new();
    let mut clbits = vec![false; program.num_clbits];

    if program.terminal_measurements() && (E::EXACT_NOISE || !program.has_noise()) {
        let mut engine = fresh();
        for op in &program.ops {
            match op {
                Op::Gate(g) => engine.apply_gate(g)?,
                Op::Noise(n) => engine.apply_noise(n, rng),
                Op::Measure { .. } | Op::Reset(_) => {}
            }
        }
        if let Some(probs) = engine.probabilities() {
            let cumulative: Vec<f64> = probs
                .iter()
                .scan(0.0, |acc, p| {
                    *acc += p;
                    Some(*acc)
                })
                .collect();
            let total = cumulative.last().copied().unwrap_or(0.0);
            let measurements = program.measurements();

            for _ in 0..shots {
                let r = rng.gen::<f64>() * total;
                let outcome = cumulative
                    .partition_point(|&c| c <= r)
                    .min(cumulative.len().saturating_sub(1));
                clbits.iter_mut().for_each(|b| *b = false);
                for &(qubit, clbit, readout) in &measurements {
                    let bit = (outcome >> qubit) & 1 == 1;
                    clbits[clbit] = apply_readout(bit, readout, rng);
                }
                *counts.entry(bitstring(&clbits)).or_insert(0) += 1;
            }
            return Ok(counts);
        }
    }

    for _ in 0..shots {
        let mut engine = fresh();
        clbits.iter_mut().for_each(|b| *b = false);
        for op in &program.ops {
            match op {
                Op::Gate(g) => engine.apply_gate(g)?,
                Op::Noise(n) => engine.apply_noise(n, rng),
                Op::Measure {
                    qubit,
                    clbit,
                    readout,
                } => {
                    let bit = engine.measure(*qubit, rng);
                    clbits[*clbit] = apply_readout(bit, *readout, rng);
                }
                Op::Reset(q) => engine.reset(*q, rng),
            }
        }
        *counts.entry(bitstring(&clbits)).or_insert(0) += 1;
    }
    Ok(counts)
}

/// All-zero register counts for methods that do not sample
pub(crate) fn zero_counts(num_clbits: usize, shots: u64) -> Counts {
    let mut counts = Counts::new();
    counts.insert("0".repeat(num_clbits), shots);
    counts
}

fn apply_readout(bit: bool, readout: f64, rng: &mut StdRng) -> bool {
    if readout > 0.0 && rng.gen::<f64>() < readout {
        !bit
    } else {
        bit
    }
}

/// Render a classical register with clbit 0 rightmost
fn bitstring(clbits: &[bool]) -> String {
    clbits.iter().rev().map(|&b| if b { '1' } else { '0' }).collect()
}

pub(crate) fn unsupported(instruction: &str, method: &str) -> QstashError {
    QstashError::UnsupportedInstruction {
        instruction: instruction.to_string(),
        method: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitstring_order() {
        assert_eq!(bitstring(&[true, false, false]), "001");
        assert_eq!(bitstring(&[]), "");
        assert_eq!(zero_counts(2, 10).get("00"), Some(&10));
    }
}
