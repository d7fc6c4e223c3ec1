//! Simulation methods
//!
//! Gantree: L4_Simulation → SimulationMethod
//!
//! The ten method names a simulator artifact can be built for. Each name
//! is `aer_simulator_{representation}` with an optional `_gpu` suffix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix shared by every method name
pub const METHOD_PREFIX: &str = "aer_simulator_";

/// Suffix marking GPU methods
pub const GPU_SUFFIX: &str = "_gpu";

/// Unknown method or representation name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported simulation method '{0}'")]
pub struct UnknownMethod(pub String);

// ============================================================================
// Device
// ============================================================================

/// Device class a method targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Device {
    /// Host CPU
    Cpu,
    /// CUDA GPU
    Gpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "CPU"),
            Device::Gpu => write!(f, "GPU"),
        }
    }
}

// ============================================================================
// Representation
// ============================================================================

/// Computational representation of the simulated state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Dense state vector
    Statevector,
    /// Dense density matrix
    DensityMatrix,
    /// Clifford stabilizer tableau
    Stabilizer,
    /// Matrix product state
    MatrixProductState,
    /// Stabilizer with non-Clifford extension
    ExtendedStabilizer,
    /// Circuit unitary
    Unitary,
    /// Circuit superoperator
    Superop,
}

impl Representation {
    /// Every representation
    pub const ALL: [Representation; 7] = [
        Representation::Statevector,
        Representation::DensityMatrix,
        Representation::Stabilizer,
        Representation::MatrixProductState,
        Representation::ExtendedStabilizer,
        Representation::Unitary,
        Representation::Superop,
    ];

    /// Name as used in method names
    pub fn as_str(&self) -> &'static str {
        match self {
            Representation::Statevector => "statevector",
            Representation::DensityMatrix => "density_matrix",
            Representation::Stabilizer => "stabilizer",
            Representation::MatrixProductState => "matrix_product_state",
            Representation::ExtendedStabilizer => "extended_stabilizer",
            Representation::Unitary => "unitary",
            Representation::Superop => "superop",
        }
    }

    /// Largest number of active qubits the representation simulates
    ///
    /// Dense representations stop at 2^24 complex entries.
    pub fn max_qubits(&self) -> Option<usize> {
        match self {
            Representation::Statevector | Representation::MatrixProductState => Some(24),
            Representation::DensityMatrix | Representation::Unitary => Some(12),
            Representation::Superop => Some(6),
            Representation::Stabilizer | Representation::ExtendedStabilizer => None,
        }
    }

    /// Check whether shots can be sampled from the representation
    pub fn supports_sampling(&self) -> bool {
        !matches!(self, Representation::Unitary | Representation::Superop)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Representation {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Representation::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

// ============================================================================
// Simulation Method
// ============================================================================

/// One of the ten supported simulation methods
/// Gantree: SimulationMethod // closed method set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimulationMethod {
    /// Statevector on CPU
    #[default]
    #[serde(rename = "aer_simulator_statevector")]
    Statevector,
    /// Density matrix on CPU
    #[serde(rename = "aer_simulator_density_matrix")]
    DensityMatrix,
    /// Stabilizer on CPU
    #[serde(rename = "aer_simulator_stabilizer")]
    Stabilizer,
    /// Matrix product state on CPU
    #[serde(rename = "aer_simulator_matrix_product_state")]
    MatrixProductState,
    /// Extended stabilizer on CPU
    #[serde(rename = "aer_simulator_extended_stabilizer")]
    ExtendedStabilizer,
    /// Unitary on CPU
    #[serde(rename = "aer_simulator_unitary")]
    Unitary,
    /// Superoperator on CPU
    #[serde(rename = "aer_simulator_superop")]
    Superop,
    /// Statevector on GPU
    #[serde(rename = "aer_simulator_statevector_gpu")]
    StatevectorGpu,
    /// Density matrix on GPU
    #[serde(rename = "aer_simulator_density_matrix_gpu")]
    DensityMatrixGpu,
    /// Unitary on GPU
    #[serde(rename = "aer_simulator_unitary_gpu")]
    UnitaryGpu,
}

impl SimulationMethod {
    /// Every method, in build order
    pub const ALL: [SimulationMethod; 10] = [
        SimulationMethod::Statevector,
        SimulationMethod::DensityMatrix,
        SimulationMethod::Stabilizer,
        SimulationMethod::MatrixProductState,
        SimulationMethod::ExtendedStabilizer,
        SimulationMethod::Unitary,
        SimulationMethod::Superop,
        SimulationMethod::StatevectorGpu,
        SimulationMethod::DensityMatrixGpu,
        SimulationMethod::UnitaryGpu,
    ];

    /// Full method name
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationMethod::Statevector => "aer_simulator_statevector",
            SimulationMethod::DensityMatrix => "aer_simulator_density_matrix",
            SimulationMethod::Stabilizer => "aer_simulator_stabilizer",
            SimulationMethod::MatrixProductState => "aer_simulator_matrix_product_state",
            SimulationMethod::ExtendedStabilizer => "aer_simulator_extended_stabilizer",
            SimulationMethod::Unitary => "aer_simulator_unitary",
            SimulationMethod::Superop => "aer_simulator_superop",
            SimulationMethod::StatevectorGpu => "aer_simulator_statevector_gpu",
            SimulationMethod::DensityMatrixGpu => "aer_simulator_density_matrix_gpu",
            SimulationMethod::UnitaryGpu => "aer_simulator_unitary_gpu",
        }
    }

    /// All method names
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }

    /// Device class (GPU when the name ends with `_gpu`)
    pub fn device(&self) -> Device {
        if self.as_str().ends_with(GPU_SUFFIX) {
            Device::Gpu
        } else {
            Device::Cpu
        }
    }

    /// Base representation (the name without prefix and `_gpu` suffix)
    pub fn representation(&self) -> Representation {
        match self {
            SimulationMethod::Statevector | SimulationMethod::StatevectorGpu => {
                Representation::Statevector
            }
            SimulationMethod::DensityMatrix | SimulationMethod::DensityMatrixGpu => {
                Representation::DensityMatrix
            }
            SimulationMethod::Stabilizer => Representation::Stabilizer,
            SimulationMethod::MatrixProductState => Representation::MatrixProductState,
            SimulationMethod::ExtendedStabilizer => Representation::ExtendedStabilizer,
            SimulationMethod::Unitary | SimulationMethod::UnitaryGpu => Representation::Unitary,
            SimulationMethod::Superop => Representation::Superop,
        }
    }
}

impl fmt::Display for SimulationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SimulationMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SimulationMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_names() {
        for method in SimulationMethod::ALL {
            assert_eq!(method.as_str().parse::<SimulationMethod>(), Ok(method));
        }
        assert_eq!(SimulationMethod::names().len(), 10);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        for bad in ["statevector", "aer_simulator", "aer_simulator_stabilizer_gpu", ""] {
            assert_eq!(
                bad.parse::<SimulationMethod>(),
                Err(UnknownMethod(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_representation_matches_name_stripping() {
        for method in SimulationMethod::ALL {
            let name = method.as_str();
            let stripped = name
                .strip_prefix(METHOD_PREFIX)
                .map(|s| s.strip_suffix(GPU_SUFFIX).unwrap_or(s))
                .unwrap();
            assert_eq!(stripped.parse::<Representation>(), Ok(method.representation()));
        }
    }

    #[test]
    fn test_device() {
        assert_eq!(SimulationMethod::Statevector.device(), Device::Cpu);
        assert_eq!(SimulationMethod::UnitaryGpu.device(), Device::Gpu);
        let gpu = SimulationMethod::ALL
            .iter()
            .filter(|m| m.device() == Device::Gpu)
            .count();
        assert_eq!(gpu, 3);
    }

    #[test]
    fn test_default_method() {
        assert_eq!(SimulationMethod::default().as_str(), "aer_simulator_statevector");
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&SimulationMethod::DensityMatrixGpu).unwrap();
        assert_eq!(json, "\"aer_simulator_density_matrix_gpu\"");
        assert_eq!(serde_json::to_string(&Device::Gpu).unwrap(), "\"GPU\"");
        assert_eq!(
            serde_json::to_string(&Representation::MatrixProductState).unwrap(),
            "\"matrix_product_state\""
        );
    }
}
