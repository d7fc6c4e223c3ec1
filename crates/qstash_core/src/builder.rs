//! Circuit builder for qstash
//!
//! Gantree: L1_Circuit → CircuitBuilder
//!
//! Fluent builder for constructing circuits in tests and callers.

use crate::circuit::Circuit;
use crate::error::{QstashError, QstashResult};
use crate::gate::Gate;
use crate::types::{Angle, ClbitId, QubitId};

/// Fluent circuit builder (consuming self pattern)
///
/// The first invalid gate is remembered and reported by [`CircuitBuilder::try_build`].
/// Gantree: CircuitBuilder // builder pattern
pub struct CircuitBuilder {
    circuit: Circuit,
    error: Option<QstashError>,
}

impl CircuitBuilder {
    // ========================================================================
    // Constructor
    // ========================================================================

    /// Create a new circuit builder (one clbit per qubit)
    pub fn new(num_qubits: usize) -> Self {
        Self {
            circuit: Circuit::new(num_qubits),
            error: None,
        }
    }

    /// Create with an explicit classical register width
    pub fn with_clbits(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            circuit: Circuit::with_clbits(num_qubits, num_clbits),
            error: None,
        }
    }

    /// Create with circuit name
    pub fn with_name(num_qubits: usize, name: impl Into<String>) -> Self {
        Self {
            circuit: Circuit::with_name(num_qubits, name),
            error: None,
        }
    }

    /// Append an arbitrary gate
    pub fn gate(mut self, gate: Gate) -> Self {
        if let Err(e) = self.circuit.add_gate(gate) {
            self.error.get_or_insert(e);
        }
        self
    }

    // ========================================================================
    // Single-Qubit Gates
    // ========================================================================

    /// Add Hadamard gate
    pub fn h(self, qubit: QubitId) -> Self {
        self.gate(Gate::H(qubit))
    }

    /// Add Pauli-X gate
    pub fn x(self, qubit: QubitId) -> Self {
        self.gate(Gate::X(qubit))
    }

    /// Add Pauli-Y gate
    pub fn y(self, qubit: QubitId) -> Self {
        self.gate(Gate::Y(qubit))
    }

    /// Add Pauli-Z gate
    pub fn z(self, qubit: QubitId) -> Self {
        self.gate(Gate::Z(qubit))
    }

    /// Add S gate
    pub fn s(self, qubit: QubitId) -> Self {
        self.gate(Gate::S(qubit))
    }

    /// Add S-dagger gate
    pub fn sdg(self, qubit: QubitId) -> Self {
        self.gate(Gate::Sdg(qubit))
    }

    /// Add T gate
    pub fn t(self, qubit: QubitId) -> Self {
        self.gate(Gate::T(qubit))
    }

    /// Add T-dagger gate
    pub fn tdg(self, qubit: QubitId) -> Self {
        self.gate(Gate::Tdg(qubit))
    }

    /// Add SX gate
    pub fn sx(self, qubit: QubitId) -> Self {
        self.gate(Gate::Sx(qubit))
    }

    /// Add RX rotation
    pub fn rx(self, qubit: QubitId, angle: Angle) -> Self {
        self.gate(Gate::Rx(qubit, angle))
    }

    /// Add RY rotation
    pub fn ry(self, qubit: QubitId, angle: Angle) -> Self {
        self.gate(Gate::Ry(qubit, angle))
    }

    /// Add RZ rotation
    pub fn rz(self, qubit: QubitId, angle: Angle) -> Self {
        self.gate(Gate::Rz(qubit, angle))
    }

    /// Add phase gate
    pub fn p(self, qubit: QubitId, lambda: Angle) -> Self {
        self.gate(Gate::P(qubit, lambda))
    }

    /// Add general U gate
    pub fn u(self, qubit: QubitId, theta: Angle, phi: Angle, lambda: Angle) -> Self {
        self.gate(Gate::U(qubit, theta, phi, lambda))
    }

    // ========================================================================
    // Multi-Qubit Gates
    // ========================================================================

    /// Add CNOT gate
    pub fn cx(self, control: QubitId, target: QubitId) -> Self {
        self.gate(Gate::Cnot(control, target))
    }

    /// Add CZ gate
    pub fn cz(self, control: QubitId, target: QubitId) -> Self {
        self.gate(Gate::Cz(control, target))
    }

    /// Add SWAP gate
    pub fn swap(self, a: QubitId, b: QubitId) -> Self {
        self.gate(Gate::Swap(a, b))
    }

    /// Add ECR gate
    pub fn ecr(self, a: QubitId, b: QubitId) -> Self {
        self.gate(Gate::Ecr(a, b))
    }

    /// Add controlled-RZ gate
    pub fn crz(self, control: QubitId, target: QubitId, angle: Angle) -> Self {
        self.gate(Gate::Crz(control, target, angle))
    }

    /// Add Toffoli gate
    pub fn ccx(self, c1: QubitId, c2: QubitId, target: QubitId) -> Self {
        self.gate(Gate::Ccx(c1, c2, target))
    }

    /// Add Fredkin gate
    pub fn cswap(self, control: QubitId, t1: QubitId, t2: QubitId) -> Self {
        self.gate(Gate::Cswap(control, t1, t2))
    }

    // ========================================================================
    // Measurement and Control
    // ========================================================================

    /// Measure `qubit` into clbit `clbit`
    pub fn measure(self, qubit: QubitId, clbit: ClbitId) -> Self {
        self.gate(Gate::Measure(qubit, clbit))
    }

    /// Measure every qubit into the clbit of the same index
    pub fn measure_all(self) -> Self {
        self.gate(Gate::MeasureAll)
    }

    /// Add a barrier across all qubits
    pub fn barrier(self) -> Self {
        self.gate(Gate::Barrier(Vec::new()))
    }

    /// Reset a qubit
    pub fn reset(self, qubit: QubitId) -> Self {
        self.gate(Gate::Reset(qubit))
    }

    // ========================================================================
    // Composite Patterns
    // ========================================================================

    /// GHZ preparation: H on qubit 0 followed by a CX chain
    pub fn ghz(self) -> Self {
        let n = self.circuit.num_qubits();
        let mut builder = self.h(0);
        for q in 0..n.saturating_sub(1) {
            builder = builder.cx(q, q + 1);
        }
        builder
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the circuit, dropping gates that failed validation
    pub fn build(self) -> Circuit {
        self.circuit
    }

    /// Build the circuit, reporting the first invalid gate
    pub fn try_build(self) -> QstashResult<Circuit> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.circuit),
        }
    }

    /// Peek at the circuit being built
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bell_circuit() {
        let circuit = CircuitBuilder::new(2).h(0).cx(0, 1).measure_all().build();
        assert_eq!(circuit.gate_count(), 3);
        assert_eq!(circuit.count_2q(), 1);
        assert!(circuit.has_measurements());
    }

    #[test]
    fn test_ghz() {
        let circuit = CircuitBuilder::new(4).ghz().build();
        assert_eq!(circuit.count_1q(), 1);
        assert_eq!(circuit.count_2q(), 3);
        assert_eq!(circuit.depth(), 4);
    }

    #[test]
    fn test_try_build_reports_first_error() {
        let result = CircuitBuilder::new(2).h(0).cx(0, 5).x(7).try_build();
        assert!(matches!(
            result,
            Err(QstashError::GateQubitMismatch { qubit: 5, .. })
        ));
    }

    #[test]
    fn test_build_drops_invalid_gates() {
        let circuit = CircuitBuilder::new(1).h(0).x(3).build();
        assert_eq!(circuit.gate_count(), 1);
    }

    #[test]
    fn test_build_keeps_valid_gates_after_invalid_one() {
        let builder = CircuitBuilder::new(2).h(0).cx(0, 5).x(1).cx(0, 1);
        assert_eq!(builder.circuit().gates(), &[Gate::H(0), Gate::X(1), Gate::Cnot(0, 1)]);
        assert!(matches!(
            builder.try_build(),
            Err(QstashError::GateQubitMismatch { qubit: 5, .. })
        ));
    }

    #[test]
    fn test_explicit_clbits() {
        let circuit = CircuitBuilder::with_clbits(3, 1)
            .h(2)
            .measure(2, 0)
            .try_build()
            .unwrap();
        assert_eq!(circuit.num_clbits(), 1);
    }
}
