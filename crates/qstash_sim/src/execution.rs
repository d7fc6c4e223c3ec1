//! Backend execution types and traits
//!
//! Gantree: L4_Simulation → BackendTrait
//!
//! Interface shared by everything that executes circuits.

use crate::method::SimulationMethod;
use qstash_calibration::CalibrationSnapshot;
use qstash_core::{Circuit, Counts, QstashResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of circuit execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Measurement counts over the classical register (clbit 0 rightmost)
    pub counts: Counts,

    /// Number of shots executed
    pub shots: u64,

    /// Execution metadata
    pub metadata: ExecutionMetadata,
}

/// Execution metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Backend name
    pub backend: String,

    /// Simulation method
    pub method: Option<SimulationMethod>,

    /// Qubits actually simulated after idle-qubit truncation
    pub active_qubits: usize,

    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: Option<u64>,

    /// Seed used (if any)
    pub seed: Option<u64>,
}

impl ExecutionResult {
    /// Create new execution result
    pub fn new(counts: Counts, shots: u64, backend: &str) -> Self {
        Self {
            counts,
            shots,
            metadata: ExecutionMetadata {
                backend: backend.to_string(),
                ..Default::default()
            },
        }
    }

    /// Sum of all counts (equals shots)
    pub fn total_counts(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Relative frequency of a bitstring
    pub fn probability(&self, bitstring: &str) -> f64 {
        if self.shots == 0 {
            return 0.0;
        }
        let count = self.counts.get(bitstring).copied().unwrap_or(0);
        count as f64 / self.shots as f64
    }

    /// Most frequent bitstring
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(bs, &count)| (bs.as_str(), count))
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExecutionResult(backend={}, shots={}, unique={})",
            self.metadata.backend,
            self.shots,
            self.counts.len()
        )
    }
}

/// Circuit executor
/// Gantree: BackendTrait // backend interface
pub trait Backend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Number of physical qubits
    fn num_qubits(&self) -> usize;

    /// Execute a circuit
    /// Gantree: execute(circuit, shots) -> Result<ExecutionResult>
    fn execute(&self, circuit: &Circuit, shots: u64) -> QstashResult<ExecutionResult>;

    /// Execute several circuits
    fn execute_batch(&self, circuits: &[Circuit], shots: u64) -> QstashResult<Vec<ExecutionResult>> {
        circuits.iter().map(|c| self.execute(c, shots)).collect()
    }

    /// Calibration the backend mirrors
    fn calibration(&self) -> Option<&CalibrationSnapshot> {
        None
    }

    /// Check if backend is a simulator
    fn is_simulator(&self) -> bool {
        true
    }

    /// Maximum shots per execution
    fn max_shots(&self) -> u64 {
        1_000_000
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn counts() -> Counts {
        let mut counts = HashMap::new();
        counts.insert("00".to_string(), 600);
        counts.insert("11".to_string(), 350);
        counts.insert("01".to_string(), 50);
        counts
    }

    #[test]
    fn test_execution_result() {
        let result = ExecutionResult::new(counts(), 1000, "test");
        assert_eq!(result.total_counts(), 1000);
        assert_eq!(result.metadata.backend, "test");
        assert!((result.probability("11") - 0.35).abs() < 1e-12);
        assert_eq!(result.probability("10"), 0.0);
        assert_eq!(result.most_frequent(), Some(("00", 600)));
    }

    #[test]
    fn test_display() {
        let result = ExecutionResult::new(counts(), 1000, "ibm_test");
        assert_eq!(
            result.to_string(),
            "ExecutionResult(backend=ibm_test, shots=1000, unique=3)"
        );
    }
}
