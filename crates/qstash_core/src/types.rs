//! Core types for qstash
//!
//! Gantree: L0_Foundation → CoreTypes
//!
//! Type aliases and validated wrappers shared by every crate.

use crate::error::{QstashError, QstashResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Qubit identifier (0-indexed)
/// Gantree: QubitId // pub type QubitId = usize
pub type QubitId = usize;

/// Classical bit identifier (0-indexed)
pub type ClbitId = usize;

/// Rotation angle in radians
/// Gantree: Angle // pub type Angle = f64
pub type Angle = f64;

/// Measurement counts: bitstring -> count
///
/// Bitstrings are little-endian over the classical register:
/// the rightmost character is classical bit 0.
pub type Counts = HashMap<String, u64>;

/// Row-major 2x2 complex matrix
pub type Matrix2 = [[Complex64; 2]; 2];

// ============================================================================
// Probability (Validated Wrapper)
// ============================================================================

/// Probability value in range [0, 1]
/// Gantree: Probability // validated wrapper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probability(f64);

impl Probability {
    /// Zero probability
    pub const ZERO: Self = Self(0.0);

    /// Create a new Probability with validation
    pub fn new(value: f64) -> QstashResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(QstashError::InvalidProbability(value));
        }
        Ok(Self(value))
    }

    /// Clamp an arbitrary value into [0, 1]
    ///
    /// Calibration feeds occasionally report values slightly above 1.0
    /// or NaN for broken qubits; NaN maps to 1.0.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(1.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Get the probability value
    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Get the complement (1 - p)
    #[inline]
    pub fn complement(&self) -> f64 {
        1.0 - self.0
    }
}

impl Default for Probability {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

impl TryFrom<f64> for Probability {
    type Error = QstashError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
