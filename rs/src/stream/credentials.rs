//! Credential providers - supply request headers per connection attempt
//!
//! The stream client asks its provider for headers each time it connects and
//! never keeps them around afterwards.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use super::StreamError;

/// Source of headers attached to every stream request
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Headers for the next connection attempt
    async fn headers(&self) -> Result<HeaderMap, StreamError>;
}

/// Provider that attaches nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn headers(&self) -> Result<HeaderMap, StreamError> {
        Ok(HeaderMap::new())
    }
}

/// Fixed header set
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: HeaderMap,
}

impl StaticHeaders {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// Build from name/value string pairs, validating each header
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, StreamError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| StreamError::InvalidHeader {
                name: name.to_string(),
                message: e.to_string(),
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| StreamError::InvalidHeader {
                name: name.to_string(),
                message: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(Self { headers })
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for StaticHeaders {
    async fn headers(&self) -> Result<HeaderMap, StreamError> {
        Ok(self.headers.clone())
    }
}

/// Bearer token read from an environment variable at connect time
///
/// Extra static headers are sent alongside the token.
#[derive(Debug, Clone)]
pub struct BearerToken {
    env_var: String,
    extra: StaticHeaders,
}

impl BearerToken {
    pub fn from_env(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            extra: StaticHeaders::default(),
        }
    }

    pub fn with_headers(mut self, extra: StaticHeaders) -> Self {
        self.extra = extra;
        self
    }
}

#[async_trait]
impl CredentialProvider for BearerToken {
    async fn headers(&self) -> Result<HeaderMap, StreamError> {
        debug!(env_var = %self.env_var, "BearerToken::headers: called");
        let token = std::env::var(&self.env_var)
            .map_err(|_| StreamError::Credentials(format!("environment variable {} is not set", self.env_var)))?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|e| {
            StreamError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                message: e.to_string(),
            }
        })?;
        value.set_sensitive(true);

        let mut headers = self.extra.headers.clone();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}
