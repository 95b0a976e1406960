//! Endpoint - resolves a logical stream path to a concrete URL

use reqwest::Url;
use tracing::debug;

use super::StreamError;

/// Base URL plus API prefix that stream paths are resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    api_prefix: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, api_prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: api_prefix.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` to a full URL
    ///
    /// Relative paths are joined as `base_url/api_prefix/path`. A path that is
    /// already an absolute `http(s)` URL is used as-is.
    pub fn resolve(&self, path: &str) -> Result<Url, StreamError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(StreamError::EmptyPath);
        }

        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            let mut raw = self.base_url.trim_end_matches('/').to_string();
            for segment in [self.api_prefix.as_str(), path] {
                let segment = segment.trim_matches('/');
                if !segment.is_empty() {
                    raw.push('/');
                    raw.push_str(segment);
                }
            }
            raw
        };

        let url = Url::parse(&raw).map_err(|e| StreamError::InvalidUrl {
            url: raw.clone(),
            message: e.to_string(),
        })?;
        debug!(%path, %url, "Endpoint::resolve: resolved");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_prefix() {
        let endpoint = Endpoint::new("http://localhost:8080/", "/api/v1/");
        let url = endpoint.resolve("/runs/42/stream").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/runs/42/stream");
    }

    #[test]
    fn test_resolve_without_prefix() {
        let endpoint = Endpoint::new("http://localhost:8080", "");
        let url = endpoint.resolve("runs/42/stream").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/runs/42/stream");
    }

    #[test]
    fn test_resolve_keeps_query() {
        let endpoint = Endpoint::new("http://localhost:8080", "/api/v1");
        let url = endpoint.resolve("events?run=7").unwrap();
        assert_eq!(url.query(), Some("run=7"));
    }

    #[test]
    fn test_resolve_absolute_url() {
        let endpoint = Endpoint::new("http://localhost:8080", "/api/v1");
        let url = endpoint.resolve("https://other.example/stream").unwrap();
        assert_eq!(url.as_str(), "https://other.example/stream");
    }

    #[test]
    fn test_resolve_empty_path() {
        let endpoint = Endpoint::new("http://localhost:8080", "/api/v1");
        assert!(matches!(endpoint.resolve("  "), Err(StreamError::EmptyPath)));
    }

    #[test]
    fn test_resolve_bad_base() {
        let endpoint = Endpoint::new("not a url", "/api/v1");
        assert!(matches!(endpoint.resolve("runs"), Err(StreamError::InvalidUrl { .. })));
    }
}
