//! IBM Quantum authentication
//!
//! Gantree: L5_Ibm → Auth
//!
//! Credentials are a token plus the channel it belongs to. On the
//! `ibm_quantum` and `ibm_quantum_platform` channels the token is sent
//! as a bearer token. On `ibm_cloud` it is an IBM Cloud API key that is
//! first exchanged for an IAM access token.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// IAM token endpoint
const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Refresh IAM tokens this long before they expire
const IAM_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing API token
    #[error("IBM Quantum API token not provided")]
    MissingToken,

    /// Channel name not recognised
    #[error("Unknown channel '{0}', expected one of: ibm_quantum, ibm_cloud, ibm_quantum_platform")]
    UnknownChannel(String),

    /// Token rejected by the service
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// IAM token exchange error
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchangeFailed(String),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpError(String),
}

// ============================================================================
// Channel
// ============================================================================

/// IBM Quantum channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IbmChannel {
    /// IBM Quantum
    #[default]
    IbmQuantum,

    /// IBM Cloud (API key + service CRN)
    IbmCloud,

    /// IBM Quantum Platform
    IbmQuantumPlatform,
}

impl IbmChannel {
    /// Channel name as accepted by `FromStr`
    pub fn as_str(&self) -> &'static str {
        match self {
            IbmChannel::IbmQuantum => "ibm_quantum",
            IbmChannel::IbmCloud => "ibm_cloud",
            IbmChannel::IbmQuantumPlatform => "ibm_quantum_platform",
        }
    }

    /// Service host
    pub fn base_url(&self) -> &'static str {
        "https://quantum.cloud.ibm.com"
    }

    /// REST API root
    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.base_url())
    }

    /// Whether the token is an API key needing IAM exchange
    pub fn uses_iam(&self) -> bool {
        matches!(self, IbmChannel::IbmCloud)
    }
}

impl fmt::Display for IbmChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IbmChannel {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ibm_quantum" => Ok(IbmChannel::IbmQuantum),
            "ibm_cloud" => Ok(IbmChannel::IbmCloud),
            "ibm_quantum_platform" => Ok(IbmChannel::IbmQuantumPlatform),
            other => Err(AuthError::UnknownChannel(other.to_string())),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// IBM Quantum credentials
#[derive(Clone)]
pub struct IbmCredentials {
    token: String,
    channel: IbmChannel,
    instance: Option<String>,
    iam_token: Arc<RwLock<Option<CachedToken>>>,
}

impl fmt::Debug for IbmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmCredentials")
            .field("token", &"***")
            .field("channel", &self.channel)
            .field("instance", &self.instance)
            .finish()
    }
}

impl IbmCredentials {
    /// Create credentials for a channel
    pub fn new(token: impl Into<String>, channel: IbmChannel) -> Self {
        Self {
            token: token.into(),
            channel,
            instance: None,
            iam_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the instance (hub/group/project, or service CRN on IBM Cloud)
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Raw token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Channel
    pub fn channel(&self) -> IbmChannel {
        self.channel
    }

    /// Instance, if any
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Reject obviously unusable credentials
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(())
    }

    /// `Authorization` header value, exchanging the API key on IBM Cloud
    pub async fn auth_header(&self) -> Result<String, AuthError> {
        if !self.channel.uses_iam() {
            return Ok(format!("Bearer {}", self.token));
        }

        if let Some(cached) = self.iam_token.read().await.as_ref() {
            if cached.expires_at > Instant::now() + IAM_REFRESH_MARGIN {
                return Ok(format!("Bearer {}", cached.access_token));
            }
        }

        let access_token = self.exchange_api_key().await?;
        Ok(format!("Bearer {}", access_token))
    }

    async fn exchange_api_key(&self) -> Result<String, AuthError> {
        let params = [
            ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
            ("apikey", self.token.as_str()),
        ];

        let response = reqwest::Client::new()
            .post(IAM_TOKEN_URL)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::IamTokenExchangeFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let token: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::IamTokenExchangeFailed(e.to_string()))?;

        *self.iam_token.write().await = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        log::debug!("IAM token obtained, expires in {}s", token.expires_in);

        Ok(token.access_token)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parsing() {
        assert_eq!("ibm_quantum".parse::<IbmChannel>().unwrap(), IbmChannel::IbmQuantum);
        assert_eq!("IBM_CLOUD".parse::<IbmChannel>().unwrap(), IbmChannel::IbmCloud);
        assert_eq!(
            "ibm_quantum_platform".parse::<IbmChannel>().unwrap(),
            IbmChannel::IbmQuantumPlatform
        );
        let err = "ibmq".parse::<IbmChannel>().unwrap_err();
        assert!(err.to_string().contains("'ibmq'"));
    }

    #[test]
    fn test_channel_round_trips_through_display() {
        for channel in [
            IbmChannel::IbmQuantum,
            IbmChannel::IbmCloud,
            IbmChannel::IbmQuantumPlatform,
        ] {
            assert_eq!(channel.to_string().parse::<IbmChannel>().unwrap(), channel);
        }
    }

    #[test]
    fn test_only_cloud_uses_iam() {
        assert!(IbmChannel::IbmCloud.uses_iam());
        assert!(!IbmChannel::IbmQuantum.uses_iam());
        assert!(IbmChannel::IbmQuantum.api_url().ends_with("/api/v1"));
    }

    #[test]
    fn test_validate() {
        assert!(IbmCredentials::new("abc", IbmChannel::IbmQuantum).validate().is_ok());
        assert!(matches!(
            IbmCredentials::new("  ", IbmChannel::IbmQuantum).validate(),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_debug_hides_token() {
        let creds = IbmCredentials::new("secret-token", IbmChannel::IbmQuantum)
            .with_instance("ibm-q/open/main");
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("secret-token"));
        assert_eq!(creds.instance(), Some("ibm-q/open/main"));
    }

    #[test]
    fn test_bearer_header() {
        let creds = IbmCredentials::new("my_token", IbmChannel::IbmQuantum);
        let header = tokio_test::block_on(creds.auth_header()).unwrap();
        assert_eq!(header, "Bearer my_token");
    }
}
