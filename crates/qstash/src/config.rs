//! Environment configuration
//!
//! Gantree: L6_Store → Config
//!
//! Settings come from the process environment after an optional `.env`
//! file has been loaded:
//!
//! | variable                   | meaning                          |
//! |----------------------------|----------------------------------|
//! | `IBM_SIMULATORS_BASE_PATH` | artifact root                    |
//! | `IBM_API_TOKEN`            | service token                    |
//! | `IBM_QUANTUM_CHANNEL`      | channel, default `ibm_quantum`   |

use crate::error::{StoreError, StoreResult};
use qstash_ibm::IbmChannel;
use std::fmt;
use std::path::{Path, PathBuf};

/// Artifact root variable
pub const BASE_PATH_VAR: &str = "IBM_SIMULATORS_BASE_PATH";

/// Token variable
pub const TOKEN_VAR: &str = "IBM_API_TOKEN";

/// Channel variable
pub const CHANNEL_VAR: &str = "IBM_QUANTUM_CHANNEL";

/// Store configuration
/// Gantree: StoreConfig // env-derived settings
#[derive(Clone, PartialEq)]
pub struct StoreConfig {
    /// Artifact root
    pub base_path: PathBuf,

    /// Service token (needed only for building)
    pub token: Option<String>,

    /// Service channel
    pub channel: IbmChannel,

    /// Log per-item outcomes while building
    pub verbose: bool,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_path", &self.base_path)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("channel", &self.channel)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl StoreConfig {
    /// Create with a root path, no token, default channel, verbose on
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            token: None,
            channel: IbmChannel::default(),
            verbose: true,
        }
    }

    /// Load `.env` if present, then read the environment
    pub fn from_env() -> StoreResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(StoreError::Config(format!("invalid .env file: {}", e))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_path = lookup(BASE_PATH_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| StoreError::Config(format!("{} is not set", BASE_PATH_VAR)))?;

        let channel = match lookup(CHANNEL_VAR).filter(|v| !v.trim().is_empty()) {
            Some(value) => value
                .parse()
                .map_err(|e| StoreError::Config(format!("{}: {}", CHANNEL_VAR, e)))?,
            None => IbmChannel::default(),
        };

        Ok(Self {
            base_path: PathBuf::from(base_path),
            token: lookup(TOKEN_VAR).filter(|v| !v.trim().is_empty()),
            channel,
            verbose: true,
        })
    }

    /// Set the artifact root
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the channel
    pub fn with_channel(mut self, channel: IbmChannel) -> Self {
        self.channel = channel;
        self
    }

    /// Set verbosity
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Artifact root
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Token, or a configuration error naming the variable
    pub fn require_token(&self) -> StoreResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| StoreError::Config(format!("{} is not set", TOKEN_VAR)))
    }
}
