//! Supported hardware backends
//!
//! Gantree: L6_Store → BackendName

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IBM device a simulator artifact mirrors
/// Gantree: IbmBackendName // closed backend set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IbmBackendName {
    /// 127-qubit Eagle r3
    IbmBrisbane,
    /// 127-qubit Eagle r3
    IbmSherbrooke,
}

impl IbmBackendName {
    /// Every backend, in build order
    pub const ALL: [IbmBackendName; 2] = [IbmBackendName::IbmBrisbane, IbmBackendName::IbmSherbrooke];

    /// Backend name as used by the service
    pub fn as_str(&self) -> &'static str {
        match self {
            IbmBackendName::IbmBrisbane => "ibm_brisbane",
            IbmBackendName::IbmSherbrooke => "ibm_sherbrooke",
        }
    }

    /// All backend names
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|b| b.as_str()).collect()
    }
}

impl fmt::Display for IbmBackendName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IbmBackendName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| StoreError::UnsupportedBackend {
                name: s.to_string(),
                available: Self::names().join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known() {
        assert_eq!(
            "ibm_brisbane".parse::<IbmBackendName>().unwrap(),
            IbmBackendName::IbmBrisbane
        );
        assert_eq!(
            "ibm_sherbrooke".parse::<IbmBackendName>().unwrap(),
            IbmBackendName::IbmSherbrooke
        );
    }

    #[test]
    fn test_parse_is_exact() {
        for bad in ["IBM_BRISBANE", " ibm_brisbane", "ibm_kyiv", ""] {
            let err = bad.parse::<IbmBackendName>().unwrap_err();
            assert!(err.is_validation(), "{bad}");
            assert!(err.to_string().contains("ibm_brisbane, ibm_sherbrooke"));
        }
    }

    #[test]
    fn test_serde_uses_service_names() {
        let json = serde_json::to_string(&IbmBackendName::IbmSherbrooke).unwrap();
        assert_eq!(json, "\"ibm_sherbrooke\"");
        for backend in IbmBackendName::ALL {
            assert_eq!(backend.to_string(), backend.as_str());
        }
    }
}
