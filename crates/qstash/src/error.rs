//! Error types for the artifact store
//!
//! Gantree: L6_Store → Errors

// Error variant fields are self-documenting via error messages
#![allow(missing_docs)]

use qstash_core::QstashError;
use std::path::PathBuf;
use thiserror::Error;

/// Artifact store error
/// Gantree: StoreError // enum
#[derive(Error, Debug)]
pub enum StoreError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Backend name outside the allow-list
    #[error("Unsupported backend '{name}'. Available backends: {available}")]
    UnsupportedBackend { name: String, available: String },

    /// Method name outside the allow-list
    #[error("Unsupported simulation method '{name}'. Supported methods: {supported}")]
    UnsupportedMethod { name: String, supported: String },

    /// Required configuration missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Build Errors
    // ========================================================================
    /// Directory could not be created
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Remote service could not be set up
    #[error("Failed to initialize runtime service: {0}")]
    ServiceInit(String),

    /// Artifact could not be written
    #[error("Failed to write simulator to {path}: {reason}")]
    Save { path: PathBuf, reason: String },

    // ========================================================================
    // Load Errors
    // ========================================================================
    /// Artifact missing, corrupt or not runnable
    #[error("Failed to load simulator from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    // ========================================================================
    // Run Errors
    // ========================================================================
    /// Transpilation failed
    #[error("Transpilation failed: {0}")]
    Transpile(#[source] QstashError),
}

impl StoreError {
    /// Check if the error is an allow-list rejection
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::UnsupportedBackend { .. } | StoreError::UnsupportedMethod { .. }
        )
    }

    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for the artifact store
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_message_names_path() {
        let err = StoreError::load("/data/ibm_simulators/x/y.json", "No such file");
        assert_eq!(
            err.to_string(),
            "Failed to load simulator from /data/ibm_simulators/x/y.json: No such file"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_kinds() {
        let err = StoreError::UnsupportedBackend {
            name: "ibm_kyiv".into(),
            available: "ibm_brisbane, ibm_sherbrooke".into(),
        };
        assert!(err.is_validation());
        assert!(err.to_string().contains("'ibm_kyiv'"));
        assert!(err.to_string().contains("ibm_sherbrooke"));
    }
}
