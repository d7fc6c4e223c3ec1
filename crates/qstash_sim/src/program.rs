//! Executable program
//!
//! Gantree: L4_Simulation → Program
//!
//! A circuit lowered for the engines: idle qubits dropped, active qubits
//! renumbered densely, and device noise attached after every gate.
//! Noise is looked up by physical qubit before renumbering.

use qstash_core::{Circuit, ClbitId, Gate, QubitId};
use qstash_noise::{NoiseModel, NoiseOp};

/// One engine step
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    /// Unitary gate on dense qubits
    Gate(Gate),
    /// Noise event on dense qubits
    Noise(NoiseOp),
    /// Measurement with its readout error
    Measure {
        qubit: QubitId,
        clbit: ClbitId,
        readout: f64,
    },
    /// Reset to |0⟩
    Reset(QubitId),
}

/// Circuit lowered onto its active qubits
#[derive(Debug, Clone)]
pub(crate) struct Program {
    /// Physical qubit of each dense index
    pub physical: Vec<QubitId>,

    /// Classical register width
    pub num_clbits: usize,

    /// Steps in execution order
    pub ops: Vec<Op>,
}

impl Program {
    /// Lower `circuit` with noise from `noise`
    pub(crate) fn compile(circuit: &Circuit, noise: &NoiseModel) -> Program {
        let physical: Vec<QubitId> = circuit.used_qubits().into_iter().collect();
        let mut dense = vec![usize::MAX; circuit.num_qubits()];
        for (index, &q) in physical.iter().enumerate() {
            dense[q] = index;
        }
        let to_dense = |q: QubitId| dense[q];

        let mut ops = Vec::with_capacity(circuit.gate_count());
        for gate in circuit.gates() {
            match gate {
                Gate::Barrier(_) => {}
                Gate::MeasureAll => {
                    for q in 0..circuit.num_qubits() {
                        ops.push(Op::Measure {
                            qubit: to_dense(q),
                            clbit: q,
                            readout: noise.readout_error(q),
                        });
                    }
                }
                Gate::Measure(q, c) => ops.push(Op::Measure {
                    qubit: to_dense(*q),
                    clbit: *c,
                    readout: noise.readout_error(*q),
                }),
                Gate::Reset(q) => ops.push(Op::Reset(to_dense(*q))),
                g => {
                    ops.push(Op::Gate(g.map_qubits(to_dense)));
                    ops.extend(
                        noise
                            .ops_for(g)
                            .iter()
                            .map(|op| Op::Noise(op.map_qubits(to_dense))),
                    );
                }
            }
        }

        Program {
            physical,
            num_clbits: circuit.num_clbits(),
            ops,
        }
    }

    /// Number of simulated qubits
    pub(crate) fn num_qubits(&self) -> usize {
        self.physical.len()
    }

    /// Check for stochastic noise events
    pub(crate) fn has_noise(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, Op::Noise(_)))
    }

    /// First instruction that is not a unitary gate or noise
    pub(crate) fn first_non_unitary(&self) -> Option<&'static str> {
        self.ops.iter().find_map(|op| match op {
            Op::Measure { .. } => Some("measure"),
            Op::Reset(_) => Some("reset"),
            _ => None,
        })
    }

    /// First gate outside the Clifford group
    pub(crate) fn first_non_clifford(&self) -> Option<&Gate> {
        self.ops.iter().find_map(|op| match op {
            Op::Gate(g) if !g.is_clifford() => Some(g),
            _ => None,
        })
    }

    /// Measurements as (dense qubit, clbit, readout error)
    pub(crate) fn measurements(&self) -> Vec<(QubitId, ClbitId, f64)> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                Op::Measure {
                    qubit,
                    clbit,
                    readout,
                } => Some((qubit, clbit, readout)),
                _ => None,
            })
            .collect()
    }

    /// Check that no qubit is touched after it was measured, and there is no reset
    ///
    /// Such programs can be evolved once and sampled.
    pub(crate) fn terminal_measurements(&self) -> bool {
        let mut measured = vec![false; self.num_qubits()];
        for op in &self.ops {
            let touched = match op {
                Op::Gate(g) => g.qubits(),
                Op::Noise(NoiseOp::Depolarizing1 { qubit, .. })
                | Op::Noise(NoiseOp::Relax { qubit, .. }) => vec![*qubit],
                Op::Noise(NoiseOp::Depolarizing2 { qubits, .. }) => vec![qubits.0, qubits.1],
                Op::Measure { qubit, .. } => {
                    if measured[*qubit] {
                        return false;
                    }
                    measured[*qubit] = true;
                    continue;
                }
                Op::Reset(_) => return false,
            };
            if touched.iter().any(|&q| measured[q]) {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qstash_core::CircuitBuilder;

    #[test]
    fn test_idle_qubits_are_dropped() {
        let circuit = CircuitBuilder::with_clbits(10, 2)
            .h(3)
            .cx(3, 7)
            .measure(3, 0)
            .measure(7, 1)
            .build();
        let program = Program::compile(&circuit, &NoiseModel::ideal());
        assert_eq!(program.physical, vec![3, 7]);
        assert_eq!(program.num_qubits(), 2);
        assert_eq!(program.ops[1], Op::Gate(Gate::Cnot(0, 1)));
        assert_eq!(program.measurements(), vec![(0, 0, 0.0), (1, 1, 0.0)]);
        assert!(program.terminal_measurements());
        assert!(!program.has_noise());
    }

    #[test]
    fn test_noise_uses_physical_qubits() {
        let noise = NoiseModel::ideal()
            .with_qubit(5, qstash_noise::QubitNoise::from_calibration(100.0, 80.0, 0.001, 0.03))
            .with_edge(2, 5, 0.01, 600.0);
        let circuit = CircuitBuilder::new(6).x(5).cx(2, 5).measure(5, 5).build();
        let program = Program::compile(&circuit, &noise);

        assert!(program.has_noise());
        assert_eq!(program.physical, vec![2, 5]);
        assert!(program.ops.contains(&Op::Noise(NoiseOp::Depolarizing1 {
            qubit: 1,
            p: match noise.ops_for(&Gate::X(5))[0] {
                NoiseOp::Depolarizing1 { p, .. } => p,
                _ => unreachable!(),
            },
        })));
        assert_eq!(program.measurements(), vec![(1, 5, 0.03)]);
    }

    #[test]
    fn test_measure_all_expands() {
        let circuit = CircuitBuilder::new(3).h(0).measure_all().build();
        let program = Program::compile(&circuit, &NoiseModel::ideal());
        assert_eq!(program.num_qubits(), 3);
        assert_eq!(program.measurements().len(), 3);
    }

    #[test]
    fn test_mid_circuit_measurement_is_not_terminal() {
        let circuit = CircuitBuilder::new(2).h(0).measure(0, 0).cx(0, 1).build();
        let program = Program::compile(&circuit, &NoiseModel::ideal());
        assert!(!program.terminal_measurements());

        let circuit = CircuitBuilder::new(1).reset(0).h(0).build();
        let program = Program::compile(&circuit, &NoiseModel::ideal());
        assert!(!program.terminal_measurements());
        assert_eq!(program.first_non_unitary(), Some("reset"));
    }

    #[test]
    fn test_first_non_clifford() {
        let circuit = CircuitBuilder::new(2).h(0).cx(0, 1).t(1).build();
        let program = Program::compile(&circuit, &NoiseModel::ideal());
        assert_eq!(program.first_non_clifford(), Some(&Gate::T(1)));
    }
}
