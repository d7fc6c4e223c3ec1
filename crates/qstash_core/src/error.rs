//! Error types for qstash
//!
//! Gantree: L0_Foundation → Errors
//!
//! Errors shared by the circuit model, the simulators and the transpiler.

// Error variant fields are self-documenting via error messages
#![allow(missing_docs)]

use thiserror::Error;

/// Main error type for qstash
/// Gantree: QstashError // enum
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QstashError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Probability value out of range [0, 1]
    #[error("Invalid probability {0}: must be in range [0, 1]")]
    InvalidProbability(f64),

    /// Qubit index out of range
    #[error("Qubit {qubit} out of range: max is {max}")]
    QubitOutOfRange { qubit: usize, max: usize },

    /// Invalid T2 value (must be <= 2*T1)
    #[error("Invalid T2 ({t2_us:.2}µs): must be <= 2*T1 ({t1_us:.2}µs)")]
    InvalidT2 { t2_us: f64, t1_us: f64 },

    /// Invalid angle
    #[error("Invalid angle {0}: must be finite")]
    InvalidAngle(f64),

    // ========================================================================
    // Circuit Errors
    // ========================================================================
    /// Gate on non-existent qubit
    #[error("Gate references qubit {qubit} but circuit has only {num_qubits} qubits")]
    GateQubitMismatch { qubit: usize, num_qubits: usize },

    /// Measurement into non-existent classical bit
    #[error("Measurement writes clbit {clbit} but circuit has only {num_clbits} clbits")]
    ClbitMismatch { clbit: usize, num_clbits: usize },

    /// Gate applied twice to the same qubit
    #[error("Gate '{0}' uses the same qubit more than once")]
    DuplicateQubit(String),

    /// Topology violation (qubits not connected)
    #[error("Topology violation: qubits {q1} and {q2} are not connected")]
    TopologyViolation { q1: usize, q2: usize },

    /// Circuit wider than its target
    #[error("Circuit needs {required} qubits but target has {available}")]
    CircuitTooWide { required: usize, available: usize },

    /// Invalid QASM format
    #[error("Invalid QASM: {0}")]
    InvalidQasm(String),

    // ========================================================================
    // Topology Errors
    // ========================================================================
    /// Empty coupling map
    #[error("Coupling map is empty")]
    EmptyCouplingMap,

    /// Invalid coupling
    #[error("Invalid coupling ({0}, {1}): qubits must be different")]
    InvalidCoupling(usize, usize),

    /// Path not found between qubits
    #[error("No path found between qubits {0} and {1}")]
    PathNotFound(usize, usize),

    // ========================================================================
    // Simulation Errors
    // ========================================================================
    /// Instruction not supported by the simulation method
    #[error("Instruction '{instruction}' is not supported by simulation method '{method}'")]
    UnsupportedInstruction { instruction: String, method: String },

    /// Too many active qubits for the representation
    #[error("Circuit has {qubits} active qubits, '{method}' supports at most {max}")]
    TooManyQubits {
        qubits: usize,
        max: usize,
        method: String,
    },

    /// Shots out of range
    #[error("Shots {0} out of range [{1}, {2}]")]
    ShotsOutOfRange(u64, u64, u64),

    /// Backend execution error
    #[error("Backend error: {0}")]
    BackendError(String),

    // ========================================================================
    // Calibration / Transpiler Errors
    // ========================================================================
    /// Calibration error
    #[error("Calibration error: {0}")]
    CalibrationError(String),

    /// Transpilation failure
    #[error("Transpiler error: {0}")]
    TranspileError(String),
}

/// Result type alias for qstash operations
/// Gantree: QstashResult<T> // type alias
pub type QstashResult<T> = Result<T, QstashError>;

// ============================================================================
// Error Helpers
// ============================================================================

impl QstashError {
    /// Check if error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            QstashError::InvalidProbability(_)
                | QstashError::QubitOutOfRange { .. }
                | QstashError::InvalidT2 { .. }
                | QstashError::InvalidAngle(_)
        )
    }

    /// Check if error is a circuit error
    pub fn is_circuit_error(&self) -> bool {
        matches!(
            self,
            QstashError::GateQubitMismatch { .. }
                | QstashError::ClbitMismatch { .. }
                | QstashError::DuplicateQubit(_)
                | QstashError::TopologyViolation { .. }
                | QstashError::CircuitTooWide { .. }
                | QstashError::InvalidQasm(_)
        )
    }

    /// Check if error was raised by a simulator at run time
    pub fn is_simulation_error(&self) -> bool {
        matches!(
            self,
            QstashError::UnsupportedInstruction { .. }
                | QstashError::TooManyQubits { .. }
                | QstashError::ShotsOutOfRange(..)
                | QstashError::BackendError(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QstashError::InvalidProbability(1.5);
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_unsupported_instruction_display() {
        let err = QstashError::UnsupportedInstruction {
            instruction: "t".into(),
            method: "stabilizer".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'t'"));
        assert!(msg.contains("stabilizer"));
    }

    #[test]
    fn test_error_classification() {
        assert!(QstashError::InvalidProbability(1.5).is_validation_error());
        assert!(!QstashError::BackendError("x".into()).is_validation_error());
        assert!(QstashError::InvalidQasm("x".into()).is_circuit_error());
        assert!(QstashError::TooManyQubits {
            qubits: 30,
            max: 24,
            method: "statevector".into()
        }
        .is_simulation_error());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: QstashError = io.into();
        assert!(matches!(err, QstashError::FileError(ref m) if m.contains("gone")));
    }
}
