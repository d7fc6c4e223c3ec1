//! IBM Quantum REST API client
//!
//! Gantree: L5_Ibm → Client
//!
//! Read-only access to the backend endpoints: listing, status,
//! configuration and properties. No request is retried.

use crate::auth::{AuthError, IbmCredentials};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// API version header value
const API_VERSION: &str = "2025-01-01";

/// Request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Resource not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimited {
        /// Seconds to wait before retry
        retry_after: u64,
    },

    /// Service unavailable (HTTP 503)
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    /// Any other error response
    #[error("API error ({code}): {message}")]
    ApiError {
        /// HTTP status code
        code: u16,
        /// Response body
        message: String,
    },
}

/// IBM Quantum API client
#[derive(Debug, Clone)]
pub struct IbmClient {
    client: reqwest::Client,
    credentials: IbmCredentials,
    base_url: String,
}

impl IbmClient {
    /// Create a client for the credentials' channel
    pub fn new(credentials: IbmCredentials) -> Result<Self, ClientError> {
        let base_url = credentials.channel().api_url();
        Self::with_base_url(credentials, base_url)
    }

    /// Create a client against an explicit API root
    pub fn with_base_url(
        credentials: IbmCredentials,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        credentials.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("qstash/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            HeaderName::from_static("ibm-api-version"),
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(instance) = credentials.instance() {
            let value = HeaderValue::from_str(instance)
                .map_err(|e| AuthError::AuthFailed(format!("invalid instance: {}", e)))?;
            headers.insert(HeaderName::from_static("service-crn"), value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.into(),
        })
    }

    // ========================================================================
    // Low-level HTTP
    // ========================================================================

    /// GET `path` below the API root and decode the JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let body = self.get_text(path).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_text(&self, path: &str) -> Result<String, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.credentials.auth_header().await?)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        match status.as_u16() {
            401 => Err(ClientError::Auth(AuthError::AuthFailed(
                "Invalid or expired token".to_string(),
            ))),
            404 => Err(ClientError::NotFound(path.to_string())),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                Err(ClientError::RateLimited { retry_after })
            }
            503 => Err(ClientError::ServiceUnavailable),
            code => Err(ClientError::ApiError {
                code,
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    // ========================================================================
    // Backend APIs
    // ========================================================================

    /// List backend names visible to these credentials
    pub async fn list_backends(&self) -> Result<Vec<String>, ClientError> {
        let listing: BackendListing = self.get("/backends").await?;
        Ok(listing.names())
    }

    /// Backend status
    pub async fn backend_status(&self, name: &str) -> Result<BackendStatus, ClientError> {
        self.get(&format!("/backends/{}/status", name)).await
    }

    /// Backend configuration (qubits, basis gates, coupling map)
    pub async fn backend_configuration(&self, name: &str) -> Result<BackendConfig, ClientError> {
        self.get(&format!("/backends/{}/configuration", name)).await
    }

    /// Backend properties (calibration data)
    pub async fn backend_properties(&self, name: &str) -> Result<BackendProperties, ClientError> {
        self.get(&format!("/backends/{}/properties", name)).await
    }

    /// API root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credentials
    pub fn credentials(&self) -> &IbmCredentials {
        &self.credentials
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Entry of a backend listing
#[derive(Debug, Clone, Deserialize)]
pub struct BackendEntry {
    /// Backend name
    pub name: String,
}

/// Backend listing in any of the shapes the service has used
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BackendListing {
    /// `{"devices": [...]}`
    Devices {
        /// Entries
        devices: Vec<BackendEntry>,
    },
    /// `{"backends": [...]}`
    Backends {
        /// Entries
        backends: Vec<BackendEntry>,
    },
    /// Bare array
    Plain(Vec<BackendEntry>),
}

impl BackendListing {
    /// Backend names in listing order
    pub fn names(self) -> Vec<String> {
        let entries = match self {
            BackendListing::Devices { devices } => devices,
            BackendListing::Backends { backends } => backends,
            BackendListing::Plain(entries) => entries,
        };
        entries.into_iter().map(|e| e.name).collect()
    }
}

/// Backend status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Backend name
    pub backend_name: Option<String>,

    /// Operational status
    #[serde(default)]
    pub operational: bool,

    /// Pending jobs
    pub pending_jobs: Option<u64>,

    /// Status message
    pub status_msg: Option<String>,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name
    pub backend_name: Option<String>,

    /// Number of qubits
    pub n_qubits: Option<usize>,

    /// Basis gates
    pub basis_gates: Option<Vec<String>>,

    /// Directed coupling map as `[control, target]` pairs
    pub coupling_map: Option<Vec<Vec<usize>>>,

    /// Max shots
    pub max_shots: Option<u64>,
}

/// Backend properties (calibration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendProperties {
    /// Last calibration time (RFC 3339)
    pub last_update_date: Option<String>,

    /// Per-qubit properties
    #[serde(default)]
    pub qubits: Vec<Vec<NamedValue>>,

    /// Per-gate properties
    #[serde(default)]
    pub gates: Vec<GateProperty>,
}

/// Named measured value (`T1`, `readout_error`, `gate_error`, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedValue {
    /// Property name
    pub name: String,

    /// Value
    pub value: f64,

    /// Unit (`us`, `ns`, `ms`, `s` or empty)
    #[serde(default)]
    pub unit: Option<String>,
}

/// Gate property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateProperty {
    /// Gate name
    pub gate: String,

    /// Qubits
    pub qubits: Vec<usize>,

    /// Parameters (`gate_error`, `gate_length`)
    #[serde(default)]
    pub parameters: Vec<NamedValue>,
}

impl GateProperty {
    /// Parameter by name
    pub fn parameter(&self, name: &str) -> Option<&NamedValue> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
