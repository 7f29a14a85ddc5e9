//! Connection settings for the Logseq HTTP API
//!
//! Values come from explicit overrides first, then `LOGSEQ_API_*`
//! environment variables, then defaults that match a stock Logseq
//! desktop install with the API server enabled.

use crate::error::{LogseqMcpError, Result};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

pub const ENV_API_HOST: &str = "LOGSEQ_API_HOST";
pub const ENV_API_PORT: &str = "LOGSEQ_API_PORT";
pub const ENV_API_TOKEN: &str = "LOGSEQ_API_TOKEN";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 12315;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Logseq API connection configuration
#[derive(Clone, PartialEq, Eq)]
pub struct LogseqConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token configured in Logseq's API server settings
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for LogseqConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// The token never appears in debug output
impl std::fmt::Debug for LogseqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogseqConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LogseqConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_API_HOST).filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }

        if let Some(port) = lookup(ENV_API_PORT) {
            match port.trim().parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(
                    "Ignoring invalid {} value, using default port {}",
                    ENV_API_PORT, DEFAULT_PORT
                ),
            }
        }

        config.token = lookup(ENV_API_TOKEN).filter(|t| !t.is_empty());
        if config.token.is_none() {
            debug!("No Logseq API token configured");
        }

        config
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        token: Option<String>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if token.is_some() {
            self.token = token;
        }
        self
    }

    /// `http://<host>:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Endpoint receiving every API call
    pub fn api_url(&self) -> String {
        format!("{}/api", self.base_url())
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(LogseqMcpError::Config("API host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(LogseqMcpError::Config("API port cannot be 0".to_string()));
        }
        Ok(())
    }
}
