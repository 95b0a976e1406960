//! Runstream configuration types and loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::events::DEFAULT_HISTORY_CAP;
use crate::stream::{
    BearerToken, CredentialProvider, DEFAULT_MAX_LINE_LEN, Endpoint, NoCredentials, StaticHeaders, StreamClient,
};

/// Main runstream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Prefix joined between the base URL and every stream path
    #[serde(rename = "api-prefix")]
    pub api_prefix: String,

    /// Number of events kept in history
    #[serde(rename = "history-cap")]
    pub history_cap: usize,

    /// Longest stream line decoded, in bytes; longer lines are dropped
    #[serde(rename = "max-line-bytes")]
    pub max_line_bytes: usize,

    /// Connection setup timeout in milliseconds
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Delay before reconnecting after a stream ends, in milliseconds
    #[serde(rename = "reconnect-delay-ms")]
    pub reconnect_delay_ms: u64,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Request credentials
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_prefix: "/api/v1".to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            max_line_bytes: DEFAULT_MAX_LINE_LEN,
            connect_timeout_ms: 10_000,
            reconnect_delay_ms: 3_000,
            log_level: None,
            auth: AuthConfig::default(),
        }
    }
}

/// Credentials attached to stream requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding a bearer token
    #[serde(rename = "token-env", skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Extra headers sent with every request
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.base_url).context(format!("Invalid base-url '{}'", self.base_url))?;
        if self.history_cap == 0 {
            return Err(eyre::eyre!("history-cap must be greater than 0"));
        }
        if self.max_line_bytes == 0 {
            return Err(eyre::eyre!("max-line-bytes must be greater than 0"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .runstream.yml
        let local_config = PathBuf::from(".runstream.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/runstream/runstream.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("runstream").join("runstream.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed: the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.base_url, &self.api_prefix)
    }

    /// Build the credential provider described by `auth`
    pub fn credentials(&self) -> Result<Arc<dyn CredentialProvider>> {
        let headers = StaticHeaders::from_pairs(
            self.auth
                .headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
        .context("Invalid auth header")?;

        let provider: Arc<dyn CredentialProvider> = match &self.auth.token_env {
            Some(env_var) => Arc::new(BearerToken::from_env(env_var).with_headers(headers)),
            None if headers.is_empty() => Arc::new(NoCredentials),
            None => Arc::new(headers),
        };
        Ok(provider)
    }

    /// Build a stream client for this configuration
    pub fn stream_client(&self) -> Result<StreamClient> {
        let client = StreamClient::with_connect_timeout(self.endpoint(), self.credentials()?, self.connect_timeout())
            .context("Failed to create stream client")?;
        Ok(client.with_max_line_len(self.max_line_bytes))
    }
}
